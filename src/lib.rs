//! Evaluación de movimientos a partir de telemetría de sensores.
//!
//! Una grabación cerrada (`TelemetryTable`) se reduce a un vector fijo de
//! características (7 por sensor), se limpia de NaN/infinitos y se compara
//! contra el centroide de su movimiento para obtener una similitud en (0, 1].
//! Un bosque aleatorio opcional identifica el movimiento de grabaciones sin
//! etiqueta.

pub mod centroid;
pub mod config;
pub mod csv_loader;
pub mod error;
pub mod evaluation;
pub mod feature_extractor;
pub mod model_store;
pub mod movement_classifier;
pub mod random_forest;
pub mod rating;
pub mod recording;
pub mod sanitizer;
pub mod scaler;
pub mod similarity;
pub mod types;

pub use config::EvaluationConfig;
pub use error::EvalError;
pub use evaluation::EvaluationSystem;
pub use similarity::{ScoreOutcome, SimilarityMethod};
pub use types::{FeatureVector, TelemetryRecord, TelemetryTable};
