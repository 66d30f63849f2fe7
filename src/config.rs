use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::random_forest::ForestParams;
use crate::similarity::SimilarityMethod;

/// Parámetros de configuración del sistema de evaluación
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Movimientos, en el orden que usan el clasificador y la rotación del juego
    pub movements: Vec<String>,
    /// Sensores a utilizar; su orden define la disposición del vector
    pub sensors: Vec<String>,
    pub similarity: SimilarityMethod,
    pub forest: ForestParams,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            movements: vec!["Curl".into(), "CrossoverArm".into(), "Pendulum".into()],
            sensors: vec!["accel".into(), "gyro".into()],
            similarity: SimilarityMethod::InverseDistance,
            forest: ForestParams::default(),
        }
    }
}

impl EvaluationConfig {
    /// Lee un TOML; los campos ausentes toman el valor por defecto
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EvalError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        log::info!("Configuración cargada desde {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        if self.movements.is_empty() {
            return Err(EvalError::InvalidConfig("la lista de movimientos está vacía".into()));
        }
        if self.sensors.is_empty() {
            return Err(EvalError::InvalidConfig("la lista de sensores está vacía".into()));
        }
        for (i, m) in self.movements.iter().enumerate() {
            if self.movements[..i].contains(m) {
                return Err(EvalError::InvalidConfig(format!("movimiento repetido: {}", m)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_lab_setup() {
        let cfg = EvaluationConfig::default();
        assert_eq!(cfg.movements, vec!["Curl", "CrossoverArm", "Pendulum"]);
        assert_eq!(cfg.sensors, vec!["accel", "gyro"]);
        assert_eq!(cfg.similarity, SimilarityMethod::InverseDistance);
        assert_eq!(cfg.forest.n_trees, 100);
        assert_eq!(cfg.forest.seed, 42);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: EvaluationConfig = toml::from_str(
            r#"
            sensors = ["accel"]
            similarity = "exp"

            [forest]
            n_trees = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sensors, vec!["accel"]);
        assert_eq!(cfg.similarity, SimilarityMethod::Exp);
        assert_eq!(cfg.forest.n_trees, 10);
        assert_eq!(cfg.forest.seed, 42);
        assert_eq!(cfg.movements.len(), 3);
    }

    #[test]
    fn validation_rejects_empty_and_duplicate_lists() {
        let mut cfg = EvaluationConfig::default();
        cfg.sensors.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = EvaluationConfig::default();
        cfg.movements.push("Curl".into());
        assert!(cfg.validate().is_err());
    }
}
