use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::random_forest::{self, ForestParams, RandomForest};
use crate::sanitizer;
use crate::scaler::StandardScaler;

/// Clasificador de movimientos: escalador + bosque aleatorio.
/// El escalador se ajusta una vez y viaja con el modelo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementClassifier {
    labels: Vec<String>,
    scaler: StandardScaler,
    forest: RandomForest,
}

impl MovementClassifier {
    /// Cada ejemplo es (etiqueta, vector). Las etiquetas conservan el orden
    /// en que aparecen por primera vez.
    pub fn train(
        examples: &[(String, Vec<f64>)],
        params: &ForestParams,
    ) -> Result<Self, EvalError> {
        if examples.is_empty() {
            return Err(EvalError::EmptyTrainingSet);
        }

        let mut labels: Vec<String> = Vec::new();
        let mut y = Vec::with_capacity(examples.len());
        for (label, _) in examples {
            let idx = match labels.iter().position(|l| l == label) {
                Some(idx) => idx,
                None => {
                    labels.push(label.clone());
                    labels.len() - 1
                }
            };
            y.push(idx);
        }

        let raw: Vec<Vec<f64>> = examples.iter().map(|(_, v)| v.clone()).collect();
        let cleaned = sanitizer::clean_matrix(&raw);
        let scaler = StandardScaler::fit(&cleaned)?;
        let x = cleaned
            .iter()
            .map(|row| scaler.transform(row))
            .collect::<Result<Vec<_>, _>>()?;

        let forest = RandomForest::fit(&x, &y, labels.len(), params)?;
        log::info!(
            "Clasificador entrenado: {} árboles, clases {:?}",
            forest.n_trees(),
            labels
        );

        Ok(Self {
            labels,
            scaler,
            forest,
        })
    }

    fn probabilities(&self, features: &[f64]) -> Result<Vec<f64>, EvalError> {
        if features.len() != self.scaler.dims() {
            return Err(EvalError::InvalidFeatureSize {
                expected: self.scaler.dims(),
                actual: features.len(),
            });
        }
        let scaled = self.scaler.transform(&sanitizer::clean(features))?;
        self.forest.predict_proba(&scaled)
    }

    /// Predice el movimiento de un vector; devuelve (etiqueta, probabilidad)
    pub fn predict_single(&self, features: &[f64]) -> Result<(String, f64), EvalError> {
        let proba = self.probabilities(features)?;
        let best = random_forest::best_class(&proba);
        Ok((self.labels[best].clone(), proba[best]))
    }

    /// Probabilidad para cada clase
    pub fn predict_scores(&self, features: &[f64]) -> Result<HashMap<String, f64>, EvalError> {
        let proba = self.probabilities(features)?;
        Ok(self.labels.iter().cloned().zip(proba).collect())
    }

    /// Obtiene las etiquetas de clases
    pub fn get_labels(&self) -> &[String] {
        &self.labels
    }

    pub fn feature_len(&self) -> usize {
        self.forest.n_features()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn examples() -> Vec<(String, Vec<f64>)> {
        vec![
            ("Curl".to_string(), vec![9.0, 0.5, 0.1, 2.0]),
            ("CrossoverArm".to_string(), vec![1.0, 3.0, 0.1, 0.5]),
            ("Pendulum".to_string(), vec![-4.0, 0.0, 2.5, 7.0]),
        ]
    }

    #[test]
    fn labels_follow_training_order() {
        let clf = MovementClassifier::train(&examples(), &ForestParams::default()).unwrap();
        assert_eq!(clf.get_labels(), &["Curl", "CrossoverArm", "Pendulum"]);
    }

    #[test]
    fn recognizes_its_own_training_examples() {
        let clf = MovementClassifier::train(&examples(), &ForestParams::default()).unwrap();
        for (label, v) in examples() {
            let (predicted, p) = clf.predict_single(&v).unwrap();
            assert_eq!(predicted, label);
            assert!(p > 0.0 && p <= 1.0);
        }
    }

    #[test]
    fn scores_cover_all_labels() {
        let clf = MovementClassifier::train(&examples(), &ForestParams::default()).unwrap();
        let scores = clf.predict_scores(&[0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(scores.len(), 3);
        assert!((scores.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_input_is_cleaned() {
        let clf = MovementClassifier::train(&examples(), &ForestParams::default()).unwrap();
        assert!(clf.predict_single(&[f64::NAN, f64::INFINITY, 0.0, 0.0]).is_ok());
    }

    #[test]
    fn rejects_wrong_feature_size() {
        let clf = MovementClassifier::train(&examples(), &ForestParams::default()).unwrap();
        assert!(matches!(
            clf.predict_single(&[1.0]),
            Err(EvalError::InvalidFeatureSize { expected: 4, actual: 1 })
        ));
    }
}
