//! Artefacto persistido del sistema de evaluación.
//!
//! Solo se guardan datos (configuración, centroides, escalador y árboles);
//! la lógica de extracción y calificación se reconstruye desde el código.
//! El formato es JSON versionado y los `f64` se conservan bit a bit.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::EvaluationConfig;
use crate::error::EvalError;
use crate::evaluation::EvaluationSystem;
use crate::movement_classifier::MovementClassifier;
use crate::types::FeatureVector;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidEntry {
    pub movement: String,
    /// `None` = clase sin datos de referencia
    pub centroid: Option<FeatureVector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub config: EvaluationConfig,
    /// En el orden del registro de movimientos
    pub centroids: Vec<CentroidEntry>,
    pub classifier: Option<MovementClassifier>,
}

impl ModelArtifact {
    pub fn from_system(system: &EvaluationSystem) -> Self {
        let centroids = system
            .movements()
            .iter()
            .map(|m| CentroidEntry {
                movement: m.clone(),
                centroid: system.centroids().get(m).cloned().flatten(),
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION,
            config: system.config().clone(),
            centroids,
            classifier: system.classifier().cloned(),
        }
    }

    pub fn into_system(self) -> Result<EvaluationSystem, EvalError> {
        if self.format_version != FORMAT_VERSION {
            return Err(EvalError::UnsupportedFormat {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }
        let centroids = self
            .centroids
            .into_iter()
            .map(|entry| (entry.movement, entry.centroid))
            .collect();
        EvaluationSystem::from_parts(self.config, centroids, self.classifier)
    }

    pub fn to_json(&self) -> Result<String, EvalError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EvalError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Exporta el sistema completo para cargarlo desde otro programa
pub fn save_system(system: &EvaluationSystem, path: impl AsRef<Path>) -> Result<(), EvalError> {
    let path = path.as_ref();
    fs::write(path, ModelArtifact::from_system(system).to_json()?)?;
    log::info!("Sistema exportado en {:?}", path);
    Ok(())
}

pub fn load_system(path: impl AsRef<Path>) -> Result<EvaluationSystem, EvalError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let system = ModelArtifact::from_json(&contents)?.into_system()?;
    log::info!("Sistema cargado desde {:?}", path);
    Ok(system)
}
