use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Transformación de distancia a similitud
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    /// 1 / (1 + d)
    #[default]
    InverseDistance,
    /// exp(-d)
    Exp,
}

impl SimilarityMethod {
    /// Nombre textual. Cualquier nombre desconocido cae en `InverseDistance`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "inverse_distance" => Self::InverseDistance,
            "exp" => Self::Exp,
            other => {
                log::warn!(
                    "Método de similitud desconocido '{}', se usa inverse_distance",
                    other
                );
                Self::InverseDistance
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::InverseDistance => "inverse_distance",
            Self::Exp => "exp",
        }
    }

    /// Convierte una distancia (>= 0) en similitud en (0, 1]. Las distancias
    /// enormes no llegan a 0: el resultado se acota en `f64::MIN_POSITIVE`.
    pub fn transform(&self, distance: f64) -> f64 {
        let similarity = match self {
            Self::InverseDistance => 1.0 / (1.0 + distance),
            Self::Exp => (-distance).exp(),
        };
        similarity.max(f64::MIN_POSITIVE)
    }
}

impl fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resultado de calificar un intento contra una clase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreOutcome {
    Scored(f64),
    /// La clase no tiene centroide (sin datos de entrenamiento)
    NoReference,
}

impl ScoreOutcome {
    /// Valor numérico para la capa de presentación; `NoReference` vale 0.0
    pub fn value(&self) -> f64 {
        match self {
            Self::Scored(v) => *v,
            Self::NoReference => 0.0,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Scored(_))
    }
}

impl fmt::Display for ScoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scored(v) => write!(f, "{:.4}", v),
            Self::NoReference => f.write_str("sin datos de referencia"),
        }
    }
}

/// Norma euclidiana de (a - b), acumulada con `hypot` (sin desbordamiento
/// intermedio con componentes enormes). Longitudes distintas indican una
/// configuración de sensores incoherente y se rechazan.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64, EvalError> {
    if a.len() != b.len() {
        return Err(EvalError::InvalidFeatureSize {
            expected: b.len(),
            actual: a.len(),
        });
    }
    Ok(a.iter().zip(b).fold(0.0, |acc: f64, (x, y)| acc.hypot(x - y)))
}

/// Similitud en (0, 1] entre un intento y el centroide de su clase
pub fn score(
    attempt: &[f64],
    centroid: &[f64],
    method: SimilarityMethod,
) -> Result<f64, EvalError> {
    let distance = euclidean_distance(attempt, centroid)?;
    Ok(method.transform(distance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![1.0, -2.0, 3.5];
        assert_eq!(score(&v, &v, SimilarityMethod::InverseDistance).unwrap(), 1.0);
        assert_eq!(score(&v, &v, SimilarityMethod::Exp).unwrap(), 1.0);
    }

    #[test]
    fn inverse_distance_matches_formula() {
        let s = score(&[3.0, 4.0], &[0.0, 0.0], SimilarityMethod::InverseDistance).unwrap();
        assert!((s - 1.0 / 6.0).abs() < 1e-12);
        let e = score(&[3.0, 4.0], &[0.0, 0.0], SimilarityMethod::Exp).unwrap();
        assert!((e - (-5.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn score_strictly_decreases_with_distance() {
        let centroid = vec![0.5, 0.5];
        for method in [SimilarityMethod::InverseDistance, SimilarityMethod::Exp] {
            let mut prev = f64::INFINITY;
            for step in 0..20 {
                let attempt = vec![0.5 + step as f64 * 0.25, 0.5];
                let s = score(&attempt, &centroid, method).unwrap();
                assert!(s > 0.0 && s <= 1.0);
                assert!(s < prev);
                prev = s;
            }
        }
    }

    #[test]
    fn inverse_distance_is_positive_for_sanitized_extremes() {
        let s = score(&[1e10, -1e10], &[-1e10, 1e10], SimilarityMethod::InverseDistance)
            .unwrap();
        assert!(s > 0.0);
    }

    #[test]
    fn huge_finite_components_do_not_overflow() {
        let d = euclidean_distance(&[1e200, 1e200], &[0.0, -1e200]).unwrap();
        assert!(d.is_finite());
        assert!((d / 1e200 - 5f64.sqrt()).abs() < 1e-12);

        for method in [SimilarityMethod::InverseDistance, SimilarityMethod::Exp] {
            let s = score(&[f64::MAX, 0.0], &[-f64::MAX, 0.0], method).unwrap();
            assert!(s > 0.0 && s <= 1.0, "{} -> {}", method, s);
        }
    }

    #[test]
    fn length_mismatch_is_fatal() {
        let err = score(&[1.0, 2.0, 3.0], &[1.0, 2.0], SimilarityMethod::Exp).unwrap_err();
        assert!(matches!(err, EvalError::InvalidFeatureSize { expected: 2, actual: 3 }));
    }

    #[test]
    fn unknown_method_falls_back() {
        assert_eq!(SimilarityMethod::from_name("exp"), SimilarityMethod::Exp);
        assert_eq!(
            SimilarityMethod::from_name("cosine"),
            SimilarityMethod::InverseDistance
        );
        assert_eq!(SimilarityMethod::default(), SimilarityMethod::InverseDistance);
    }

    #[test]
    fn no_reference_reads_as_zero() {
        assert_eq!(ScoreOutcome::NoReference.value(), 0.0);
        assert!(!ScoreOutcome::NoReference.is_authoritative());
        assert!(ScoreOutcome::Scored(0.0).is_authoritative());
    }
}
