/// Vector de características: 7 valores por sensor configurado, en orden.
pub type FeatureVector = Vec<f64>;

/// Una lectura del dispositivo: (timestamp, sensor, x, y, z, w, accuracy).
/// `w` y `accuracy` solo existen en sensores de 5 componentes (rot_vector).
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Segundos desde epoch, con fracción
    pub timestamp: f64,
    pub sensor: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: Option<f64>,
    pub accuracy: Option<f64>,
}

impl TelemetryRecord {
    /// Lectura de 3 ejes (accel, gyro, ...)
    pub fn new(timestamp: f64, sensor: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp,
            sensor: sensor.into(),
            x,
            y,
            z,
            w: None,
            accuracy: None,
        }
    }

    /// Magnitud euclidiana de (x, y, z), sin desbordamiento intermedio
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y).hypot(self.z)
    }
}

/// Grabación cerrada de una sesión. Se ordena por timestamp al construirse
/// y no se puede modificar después.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryTable {
    records: Vec<TelemetryRecord>,
}

impl TelemetryTable {
    pub fn new(mut records: Vec<TelemetryRecord>) -> Self {
        // Orden estable: lecturas con el mismo timestamp conservan su orden de llegada
        records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { records }
    }

    /// Concatena varias grabaciones en una sola tabla (agregado por clase)
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a TelemetryTable>) -> Self {
        let records = tables
            .into_iter()
            .flat_map(|t| t.records.iter().cloned())
            .collect();
        Self::new(records)
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    /// Filas de un sensor concreto, en orden temporal
    pub fn sensor_rows<'a>(
        &'a self,
        sensor: &'a str,
    ) -> impl Iterator<Item = &'a TelemetryRecord> + 'a {
        self.records.iter().filter(move |r| r.sensor == sensor)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Constantes del sistema
pub const FEATURES_PER_SENSOR: usize = 7; // mean xyz, std xyz, mean |v|
pub const POS_INF_REPLACEMENT: f64 = 1e10;
pub const NEG_INF_REPLACEMENT: f64 = -1e10;
pub const CSV_HEADER: [&str; 7] = ["timestamp", "sensor", "x", "y", "z", "w", "accuracy"];
pub const UNKNOWN_LABEL: &str = "Desconocido";
