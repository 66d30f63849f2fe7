use crate::types::{FeatureVector, TelemetryTable, FEATURES_PER_SENSOR};

/// Reduce una grabación de longitud variable a un vector fijo de
/// 7 * sensores características.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureExtractor {
    sensors: Vec<String>,
}

impl FeatureExtractor {
    pub fn new(sensors: Vec<String>) -> Self {
        Self { sensors }
    }

    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    /// Longitud del vector que produce `extract`
    pub fn feature_len(&self) -> usize {
        self.sensors.len() * FEATURES_PER_SENSOR
    }

    /// Por cada sensor, en el orden configurado:
    /// [mean_x, mean_y, mean_z, std_x, std_y, std_z, mean(|v|)]
    ///
    /// Un sensor sin filas aporta 7 ceros. Con una sola fila la desviación
    /// queda en NaN; la limpieza la hace `sanitizer::clean`.
    pub fn extract(&self, table: &TelemetryTable) -> FeatureVector {
        let mut features = Vec::with_capacity(self.feature_len());

        for sensor in &self.sensors {
            let (xs, ys, zs, mags) = self.extract_sensor_channels(table, sensor);

            if xs.is_empty() {
                features.extend([0.0; FEATURES_PER_SENSOR]);
                continue;
            }

            features.push(mean(&xs));
            features.push(mean(&ys));
            features.push(mean(&zs));
            features.push(sample_std(&xs));
            features.push(sample_std(&ys));
            features.push(sample_std(&zs));
            features.push(mean(&mags));
        }

        debug_assert_eq!(features.len(), self.feature_len());
        features
    }

    /// Extrae los canales x, y, z y la magnitud de un sensor
    fn extract_sensor_channels(
        &self,
        table: &TelemetryTable,
        sensor: &str,
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut zs = Vec::new();
        let mut mags = Vec::new();

        for r in table.sensor_rows(sensor) {
            xs.push(r.x);
            ys.push(r.y);
            zs.push(r.z);
            mags.push(r.magnitude());
        }

        (xs, ys, zs, mags)
    }
}

/// Atajo sin estado sobre `FeatureExtractor::extract`
pub fn extract_features(table: &TelemetryTable, sensors: &[String]) -> FeatureVector {
    FeatureExtractor::new(sensors.to_vec()).extract(table)
}

// ========== Funciones estadísticas ==========

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Desviación estándar muestral (n-1). Indefinida (NaN) con menos de 2 muestras.
fn sample_std(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return f64::NAN;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TelemetryRecord;

    fn sensors(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn accel_table() -> TelemetryTable {
        TelemetryTable::new(vec![
            TelemetryRecord::new(0.0, "accel", 1.0, 0.0, 0.0),
            TelemetryRecord::new(0.1, "accel", 2.0, 0.0, 0.0),
            TelemetryRecord::new(0.2, "accel", 3.0, 0.0, 0.0),
        ])
    }

    #[test]
    fn computes_the_seven_statistics() {
        let features = extract_features(&accel_table(), &sensors(&["accel"]));
        assert_eq!(features, vec![2.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn missing_sensor_yields_seven_zeros() {
        let features = extract_features(&accel_table(), &sensors(&["gyro", "accel", "magnet"]));
        assert_eq!(features.len(), 21);
        assert!(features[0..7].iter().all(|&v| v == 0.0));
        assert_eq!(&features[7..14], &[2.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0]);
        assert!(features[14..21].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_table_is_all_zeros() {
        let features = extract_features(&TelemetryTable::default(), &sensors(&["accel", "gyro"]));
        assert_eq!(features, vec![0.0; 14]);
    }

    #[test]
    fn single_row_std_is_nan() {
        let table = TelemetryTable::new(vec![TelemetryRecord::new(0.0, "gyro", 0.5, 1.0, -1.0)]);
        let features = extract_features(&table, &sensors(&["gyro"]));
        assert_eq!(&features[0..3], &[0.5, 1.0, -1.0]);
        assert!(features[3..6].iter().all(|v| v.is_nan()));
        assert_eq!(features[6], 1.5);
    }

    #[test]
    fn sensor_order_defines_layout() {
        let table = TelemetryTable::new(vec![
            TelemetryRecord::new(0.0, "accel", 1.0, 0.0, 0.0),
            TelemetryRecord::new(0.0, "gyro", 0.0, 4.0, 0.0),
        ]);
        let ag = extract_features(&table, &sensors(&["accel", "gyro"]));
        let ga = extract_features(&table, &sensors(&["gyro", "accel"]));
        assert_eq!(ag[0], 1.0);
        assert_eq!(ga[1], 4.0);
        assert_eq!(ag[7..14].len(), 7);
    }

    #[test]
    fn extraction_is_bit_deterministic() {
        let table = TelemetryTable::new(
            (0..50)
                .map(|i| {
                    let t = i as f64 * 0.02;
                    TelemetryRecord::new(t, "accel", t.sin(), t.cos(), 0.3 * t)
                })
                .collect(),
        );
        let s = sensors(&["accel"]);
        let a: Vec<u64> = extract_features(&table, &s).iter().map(|v| v.to_bits()).collect();
        let b: Vec<u64> = extract_features(&table, &s).iter().map(|v| v.to_bits()).collect();
        assert_eq!(a, b);
    }
}
