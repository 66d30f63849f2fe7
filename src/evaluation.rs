use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::centroid::build_centroid;
use crate::config::EvaluationConfig;
use crate::csv_loader::load_tables_from_dir;
use crate::error::EvalError;
use crate::feature_extractor::FeatureExtractor;
use crate::movement_classifier::MovementClassifier;
use crate::sanitizer;
use crate::similarity::{self, ScoreOutcome, SimilarityMethod};
use crate::types::{FeatureVector, TelemetryTable, UNKNOWN_LABEL};

/// Carpeta de pruebas con grabaciones de movimientos mezclados
pub const MIXED_FOLDER: &str = "mixed";

/// Cuántas grabaciones válidas se usaron por movimiento
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub recordings: Vec<(String, usize)>,
    pub classifier_trained: bool,
}

/// Calificación de un archivo de prueba contra el centroide de su carpeta
#[derive(Debug, Clone, PartialEq)]
pub struct IndividualResult {
    pub movement: String,
    pub file: PathBuf,
    pub outcome: ScoreOutcome,
}

/// Orquestador: centroides por movimiento, clasificador opcional y el
/// punto de entrada de calificación que usa el juego.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSystem {
    config: EvaluationConfig,
    extractor: FeatureExtractor,
    centroids: BTreeMap<String, Option<FeatureVector>>,
    classifier: Option<MovementClassifier>,
}

impl EvaluationSystem {
    /// Sistema sin entrenar: todas las clases sin centroide
    pub fn new(config: EvaluationConfig) -> Result<Self, EvalError> {
        config.validate()?;
        let centroids = config.movements.iter().map(|m| (m.clone(), None)).collect();
        Ok(Self {
            extractor: FeatureExtractor::new(config.sensors.clone()),
            config,
            centroids,
            classifier: None,
        })
    }

    /// Reconstruye un sistema entrenado a partir de sus datos
    pub(crate) fn from_parts(
        config: EvaluationConfig,
        centroids: BTreeMap<String, Option<FeatureVector>>,
        classifier: Option<MovementClassifier>,
    ) -> Result<Self, EvalError> {
        let mut system = Self::new(config)?;
        let expected = system.extractor.feature_len();

        for (movement, centroid) in centroids {
            if !system.centroids.contains_key(&movement) {
                return Err(EvalError::UnknownMovement(movement));
            }
            if let Some(c) = &centroid {
                if c.len() != expected {
                    return Err(EvalError::InvalidFeatureSize {
                        expected,
                        actual: c.len(),
                    });
                }
            }
            system.centroids.insert(movement, centroid);
        }
        if let Some(clf) = &classifier {
            if clf.feature_len() != expected {
                return Err(EvalError::InvalidFeatureSize {
                    expected,
                    actual: clf.feature_len(),
                });
            }
        }
        system.classifier = classifier;
        Ok(system)
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn movements(&self) -> &[String] {
        &self.config.movements
    }

    pub fn sensors(&self) -> &[String] {
        self.extractor.sensors()
    }

    pub fn centroid(&self, movement: &str) -> Option<&FeatureVector> {
        self.centroids.get(movement).and_then(|c| c.as_ref())
    }

    pub(crate) fn centroids(&self) -> &BTreeMap<String, Option<FeatureVector>> {
        &self.centroids
    }

    pub fn classifier(&self) -> Option<&MovementClassifier> {
        self.classifier.as_ref()
    }

    /// Vector de características ya limpio, listo para comparar
    pub fn features(&self, table: &TelemetryTable) -> FeatureVector {
        let mut features = self.extractor.extract(table);
        sanitizer::clean_in_place(&mut features);
        features
    }

    /// Cambia la transformación distancia -> similitud; los centroides no cambian
    pub fn set_similarity(&mut self, method: SimilarityMethod) {
        self.config.similarity = method;
    }

    /// Entrena a partir de `<root>/<movimiento>/*.csv`.
    ///
    /// Cada archivo aporta un vector al centroide de su clase; la concatenación
    /// de todos los archivos de la clase es un único ejemplo del clasificador.
    /// Las clases sin grabaciones quedan sin centroide y fuera del clasificador.
    pub fn train(&mut self, training_root: impl AsRef<Path>) -> Result<TrainingReport, EvalError> {
        let root = training_root.as_ref();
        let mut report = TrainingReport::default();
        let mut classifier_examples: Vec<(String, FeatureVector)> = Vec::new();

        for movement in self.config.movements.clone() {
            let folder = root.join(&movement);
            let tables = if folder.is_dir() {
                match load_tables_from_dir(&folder) {
                    Ok(tables) => tables,
                    Err(e) => {
                        log::warn!("No se pudo leer {:?}: {}", folder, e);
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };

            report.recordings.push((movement.clone(), tables.len()));

            if tables.is_empty() {
                log::warn!("No se encontraron datos para {} en {:?}", movement, root);
                self.centroids.insert(movement, None);
                continue;
            }

            let per_file: Vec<FeatureVector> =
                tables.iter().map(|(_, t)| self.features(t)).collect();
            let centroid = build_centroid(&per_file)?;
            self.centroids.insert(movement.clone(), centroid);

            let aggregate = TelemetryTable::concat(tables.iter().map(|(_, t)| t));
            classifier_examples.push((movement.clone(), self.features(&aggregate)));

            log::info!("{}: {} grabaciones", movement, tables.len());
        }

        if classifier_examples.is_empty() {
            log::warn!("Sin datos de entrenamiento: no se entrena el clasificador");
            self.classifier = None;
        } else {
            log::info!("Entrenando el modelo de clasificación...");
            self.classifier = Some(MovementClassifier::train(
                &classifier_examples,
                &self.config.forest,
            )?);
            report.classifier_trained = true;
        }

        log::info!("Entrenamiento completado");
        Ok(report)
    }

    /// Califica un vector contra el centroide de `movement`. El vector se
    /// limpia antes de medir la distancia.
    pub fn score_features(
        &self,
        features: &[f64],
        movement: &str,
    ) -> Result<ScoreOutcome, EvalError> {
        let Some(centroid) = self.centroids.get(movement) else {
            log::warn!("Movimiento {} no registrado", movement);
            return Ok(ScoreOutcome::NoReference);
        };
        let Some(centroid) = centroid else {
            log::warn!("No hay datos de referencia para {}", movement);
            return Ok(ScoreOutcome::NoReference);
        };

        let features = sanitizer::clean(features);
        let value = similarity::score(&features, centroid, self.config.similarity).map_err(|e| {
            log::error!("Vector incompatible con el centroide de {}: {}", movement, e);
            e
        })?;
        Ok(ScoreOutcome::Scored(value))
    }

    /// Punto de entrada del juego: grabación recién cerrada + movimiento pedido
    pub fn score(
        &self,
        attempt: &TelemetryTable,
        movement: &str,
    ) -> Result<ScoreOutcome, EvalError> {
        self.score_features(&self.features(attempt), movement)
    }

    /// Identifica el movimiento de una grabación sin etiqueta
    pub fn classify(&self, table: &TelemetryTable) -> Result<(String, f64), EvalError> {
        let classifier = self.classifier.as_ref().ok_or(EvalError::NotTrained)?;
        classifier.predict_single(&self.features(table))
    }

    /// Califica cada CSV de `<test_root>/<movimiento>/` contra su centroide
    pub fn evaluate_individual(
        &self,
        test_root: impl AsRef<Path>,
    ) -> Result<Vec<IndividualResult>, EvalError> {
        let root = test_root.as_ref();
        let mut results = Vec::new();

        for movement in &self.config.movements {
            let folder = root.join(movement);
            if !folder.is_dir() {
                log::warn!("No se encontraron datos de prueba para {}", movement);
                continue;
            }

            let tables = load_tables_from_dir(&folder)?;
            if tables.is_empty() {
                log::warn!("No hay archivos CSV en {:?}", folder);
                continue;
            }

            for (file, table) in tables {
                let outcome = self.score(&table, movement)?;
                results.push(IndividualResult {
                    movement: movement.clone(),
                    file,
                    outcome,
                });
            }
        }

        Ok(results)
    }

    /// Clasifica los CSV de `<test_root>/mixed/`. La etiqueta real se toma del
    /// nombre del archivo (primer movimiento cuyo nombre aparece en él).
    pub fn evaluate_mixed(
        &self,
        test_root: impl AsRef<Path>,
    ) -> Result<Option<ClassificationReport>, EvalError> {
        let folder = test_root.as_ref().join(MIXED_FOLDER);
        if !folder.is_dir() {
            log::warn!("No se encontraron datos de prueba mixtos en {:?}", folder);
            return Ok(None);
        }

        let tables = load_tables_from_dir(&folder)?;
        if tables.is_empty() {
            log::warn!("No hay archivos CSV en {:?}", folder);
            return Ok(None);
        }

        let mut y_true = Vec::with_capacity(tables.len());
        let mut y_pred = Vec::with_capacity(tables.len());
        for (file, table) in &tables {
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            y_true.push(self.label_from_file_name(name));
            y_pred.push(self.classify(table)?.0);
        }

        Ok(Some(ClassificationReport::new(&y_true, &y_pred)))
    }

    fn label_from_file_name(&self, file_name: &str) -> String {
        let lower = file_name.to_lowercase();
        self.config
            .movements
            .iter()
            .find(|m| lower.contains(&m.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }
}

/// Métricas por etiqueta
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Exactitud global y precisión / recall / f1 por etiqueta
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub per_label: Vec<LabelMetrics>,
    pub total: usize,
}

impl ClassificationReport {
    pub fn new(y_true: &[String], y_pred: &[String]) -> Self {
        let total = y_true.len().min(y_pred.len());
        let pairs = || y_true.iter().zip(y_pred.iter()).take(total);

        let correct = pairs().filter(|(t, p)| t == p).count();
        let accuracy = if total > 0 { correct as f64 / total as f64 } else { 0.0 };

        let labels: BTreeSet<&String> = pairs().flat_map(|(t, p)| [t, p]).collect();
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        let per_label = labels
            .into_iter()
            .map(|label| {
                let tp = pairs().filter(|(t, p)| *t == label && *p == label).count();
                let predicted = pairs().filter(|(_, p)| *p == label).count();
                let support = pairs().filter(|(t, _)| *t == label).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                LabelMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            accuracy,
            per_label,
            total,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>15} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for m in &self.per_label {
            writeln!(
                f,
                "{:>15} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        write!(f, "\n{:>15} {:>32.2} {:>10}", "accuracy", self.accuracy, self.total)
    }
}
