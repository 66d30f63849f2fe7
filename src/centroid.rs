use crate::error::EvalError;
use crate::types::FeatureVector;

/// Media elemento a elemento de los vectores de una clase.
///
/// Devuelve `Ok(None)` si no hay vectores: la clase queda sin referencia,
/// que no es lo mismo que un centroide de ceros. Los vectores deben llegar
/// ya limpios y con la misma longitud.
pub fn build_centroid(vectors: &[FeatureVector]) -> Result<Option<FeatureVector>, EvalError> {
    let Some(first) = vectors.first() else {
        return Ok(None);
    };
    let len = first.len();

    let mut sums = vec![0.0; len];
    for v in vectors {
        if v.len() != len {
            return Err(EvalError::InvalidFeatureSize {
                expected: len,
                actual: v.len(),
            });
        }
        for (acc, value) in sums.iter_mut().zip(v) {
            *acc += value;
        }
    }

    if vectors.len() == 1 {
        return Ok(Some(first.clone()));
    }

    let n = vectors.len() as f64;
    Ok(Some(sums.into_iter().map(|s| s / n).collect()))
}
