use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use serde::Deserialize;

use crate::csv_loader::write_table_to_csv;
use crate::error::EvalError;
use crate::types::{TelemetryRecord, TelemetryTable};

/// Lecturas de un sensor: cada entrada es [timestamp_ms, [v0, v1, v2, (w), (accuracy)]]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorChannel {
    #[serde(default)]
    pub data: Vec<(f64, Vec<f64>)>,
}

/// Respuesta de sensors.json del dispositivo: nombre de sensor -> lecturas
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SensorPayload {
    pub sensors: BTreeMap<String, SensorChannel>,
}

impl SensorPayload {
    pub fn from_json(json: &str) -> Result<Self, EvalError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Grabación en curso. Sustituye al estado global: quien graba posee la
/// sesión y al terminar entrega una tabla cerrada y ordenada.
#[derive(Debug)]
pub struct RecordingSession {
    output_folder: PathBuf,
    started_at: DateTime<Local>,
    records: Vec<TelemetryRecord>,
    seen: HashSet<(String, u64)>,
}

impl RecordingSession {
    pub fn start(output_folder: impl AsRef<Path>) -> Result<Self, EvalError> {
        let output_folder = output_folder.as_ref().to_path_buf();
        fs::create_dir_all(&output_folder)?;
        log::info!("Grabación iniciada en {:?}", output_folder);
        Ok(Self {
            output_folder,
            started_at: Local::now(),
            records: Vec::new(),
            seen: HashSet::new(),
        })
    }

    /// Añade las lecturas nuevas de un payload; devuelve cuántas se añadieron.
    /// Un mismo (sensor, timestamp) solo se guarda una vez.
    pub fn ingest(&mut self, payload: &SensorPayload) -> usize {
        let mut added = 0;
        for (sensor, channel) in &payload.sensors {
            for (timestamp_ms, values) in &channel.data {
                if values.len() < 3 {
                    log::warn!("Lectura de {} con {} valores, se descarta", sensor, values.len());
                    continue;
                }

                let timestamp = timestamp_ms / 1000.0;
                if !self.seen.insert((sensor.clone(), timestamp.to_bits())) {
                    continue;
                }

                let (x, y, z) = (values[0], values[1], values[2]);
                let mut record = TelemetryRecord::new(timestamp, sensor.as_str(), x, y, z);
                record.w = values.get(3).copied();
                record.accuracy = values.get(4).copied();
                self.records.push(record);
                added += 1;
            }
        }
        added
    }

    /// Procesa todos los payloads que ya estén en el canal, sin bloquear
    pub fn drain(&mut self, rx: &Receiver<SensorPayload>) -> usize {
        rx.try_iter().map(|payload| self.ingest(&payload)).sum()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cierra la grabación, la guarda como CSV y devuelve (ruta, tabla)
    pub fn finish(self) -> Result<(PathBuf, TelemetryTable), EvalError> {
        let ended_at = Local::now();
        let filename = format!(
            "sensor_data_{}_to_{}.csv",
            self.started_at.format("%Y%m%d_%H%M%S"),
            ended_at.format("%Y%m%d_%H%M%S")
        );
        let path = self.output_folder.join(filename);

        let table = TelemetryTable::new(self.records);
        write_table_to_csv(&table, &path)?;
        log::info!("Grabación finalizada: {} filas en {:?}", table.len(), path);
        Ok((path, table))
    }
}

/// Origen de datos del dispositivo (p. ej. petición HTTP a sensors.json)
pub trait SensorSource: Send {
    fn fetch(&mut self) -> Result<SensorPayload, EvalError>;
}

/// Hilo de sondeo en segundo plano; se detiene con `stop()` o al soltarse
pub struct PollerHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Cerrar el canal despierta al hilo
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("El hilo de sondeo terminó con pánico");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Consulta `source` cada `interval` y envía cada payload por el canal.
/// Los errores de consulta se registran y el sondeo continúa.
pub fn spawn_poller<S>(mut source: S, interval: Duration) -> (Receiver<SensorPayload>, PollerHandle)
where
    S: SensorSource + 'static,
{
    let (tx, rx) = unbounded::<SensorPayload>();
    let (stop_tx, stop_rx) = bounded::<()>(0);

    let thread = thread::spawn(move || loop {
        match source.fetch() {
            Ok(payload) => {
                if tx.send(payload).is_err() {
                    break;
                }
            }
            Err(e) => log::warn!("Error al obtener datos: {}", e),
        }

        let stopped = select! {
            recv(stop_rx) -> _ => true,
            default(interval) => false,
        };
        if stopped {
            break;
        }
    });

    (
        rx,
        PollerHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_loader::load_table_from_csv;
    use std::time::Instant;

    const PAYLOAD: &str = r#"{
        "accel": {"data": [[1700000000100, [0.1, 9.8, 0.3]], [1700000000000, [0.2, 9.7, 0.1]]]},
        "rot_vector": {"data": [[1700000000050, [0.1, 0.2, 0.3, 0.9, 3.0]]]},
        "light": {"unit": "lx"}
    }"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("movimetro_rec_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn parses_device_payload() {
        let payload = SensorPayload::from_json(PAYLOAD).unwrap();
        assert_eq!(payload.sensors.len(), 3);
        assert_eq!(payload.sensors["accel"].data.len(), 2);
        assert!(payload.sensors["light"].data.is_empty());
    }

    #[test]
    fn ingest_deduplicates_and_fills_rotation_fields() {
        let mut session = RecordingSession::start(scratch_dir("ingest")).unwrap();
        let payload = SensorPayload::from_json(PAYLOAD).unwrap();

        assert_eq!(session.ingest(&payload), 3);
        assert_eq!(session.ingest(&payload), 0);
        assert_eq!(session.len(), 3);

        let (path, table) = session.finish().unwrap();
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("sensor_data_"));

        let ts: Vec<f64> = table.records().iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![1700000000.0, 1700000000.05, 1700000000.1]);
        let rot = &table.records()[1];
        assert_eq!(rot.sensor, "rot_vector");
        assert_eq!(rot.w, Some(0.9));
        assert_eq!(rot.accuracy, Some(3.0));
        assert_eq!(table.records()[0].w, None);

        assert_eq!(load_table_from_csv(&path).unwrap(), table);
    }

    #[test]
    fn short_readings_are_dropped() {
        let mut session = RecordingSession::start(scratch_dir("short")).unwrap();
        let payload =
            SensorPayload::from_json(r#"{"gyro": {"data": [[10, [0.1, 0.2]]]}}"#).unwrap();
        assert_eq!(session.ingest(&payload), 0);
        assert!(session.is_empty());
    }

    struct CountingSource {
        calls: u64,
    }

    impl SensorSource for CountingSource {
        fn fetch(&mut self) -> Result<SensorPayload, EvalError> {
            self.calls += 1;
            if self.calls == 2 {
                return Err(EvalError::InvalidConfig("sin conexión".into()));
            }
            let json = format!(
                r#"{{"accel": {{"data": [[{}, [1.0, 2.0, 3.0]]]}}}}"#,
                self.calls * 10
            );
            SensorPayload::from_json(&json)
        }
    }

    #[test]
    fn poller_feeds_the_session_until_stopped() {
        let (rx, handle) = spawn_poller(CountingSource { calls: 0 }, Duration::from_millis(2));
        let mut session = RecordingSession::start(scratch_dir("poller")).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while session.len() < 3 && Instant::now() < deadline {
            session.drain(&rx);
            thread::sleep(Duration::from_millis(1));
        }
        handle.stop();

        assert!(session.len() >= 3);
        let (_, table) = session.finish().unwrap();
        // la consulta fallida (calls == 2) no aporta filas
        assert!(table.records().iter().all(|r| r.timestamp != 0.02));
    }
}
