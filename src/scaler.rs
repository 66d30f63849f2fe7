use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Normalización a media 0 y varianza 1 por columna, ajustada una vez
/// sobre los datos de entrenamiento y reutilizada tal cual en inferencia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Usa varianza poblacional; columnas constantes quedan con escala 1.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, EvalError> {
        let first = rows.first().ok_or(EvalError::EmptyTrainingSet)?;
        let dims = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; dims];
        for row in rows {
            if row.len() != dims {
                return Err(EvalError::InvalidFeatureSize {
                    expected: dims,
                    actual: row.len(),
                });
            }
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; dims];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }

        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn dims(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, EvalError> {
        if row.len() != self.dims() {
            return Err(EvalError::InvalidFeatureSize {
                expected: self.dims(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformed_columns_are_standardized() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        let t: Vec<Vec<f64>> = rows.iter().map(|r| scaler.transform(r).unwrap()).collect();

        let mean0: f64 = t.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        let var0: f64 = t.iter().map(|r| r[0] * r[0]).sum::<f64>() / 3.0;
        assert!(mean0.abs() < 1e-12);
        assert!((var0 - 1.0).abs() < 1e-12);
        // columna constante: solo se centra
        assert!(t.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]]).unwrap();
        assert!(scaler.transform(&[1.0]).is_err());
    }

    #[test]
    fn empty_fit_fails() {
        assert!(matches!(StandardScaler::fit(&[]), Err(EvalError::EmptyTrainingSet)));
    }
}
