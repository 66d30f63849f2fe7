use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::EvalError;
use crate::types::{TelemetryRecord, TelemetryTable, CSV_HEADER};

/// Posición de cada columna dentro del CSV; las columnas se buscan por nombre
/// para tolerar un orden distinto o columnas extra.
struct ColumnLayout {
    timestamp: usize,
    sensor: usize,
    x: usize,
    y: usize,
    z: usize,
    w: Option<usize>,
    accuracy: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord, path: &Path) -> Result<Self, EvalError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &'static str| {
            find(name).ok_or_else(|| EvalError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
        };

        Ok(Self {
            timestamp: require("timestamp")?,
            sensor: require("sensor")?,
            x: require("x")?,
            y: require("y")?,
            z: require("z")?,
            w: find("w"),
            accuracy: find("accuracy"),
        })
    }
}

fn parse_required(
    record: &StringRecord,
    idx: usize,
    row: usize,
    column: &'static str,
) -> Result<f64, EvalError> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse().map_err(|_| EvalError::InvalidValue {
        row,
        column,
        value: raw.to_string(),
    })
}

fn parse_optional(
    record: &StringRecord,
    idx: Option<usize>,
    row: usize,
    column: &'static str,
) -> Result<Option<f64>, EvalError> {
    let Some(idx) = idx else {
        return Ok(None);
    };
    let raw = record.get(idx).unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| EvalError::InvalidValue {
        row,
        column,
        value: raw.to_string(),
    })
}

/// Carga una grabación desde un CSV con columnas
/// timestamp,sensor,x,y,z,w,accuracy (w y accuracy pueden ir vacías).
pub fn load_table_from_csv(path: impl AsRef<Path>) -> Result<TelemetryTable, EvalError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let layout = ColumnLayout::from_headers(reader.headers()?, path)?;

    let mut records = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let row = row_idx + 1;

        records.push(TelemetryRecord {
            timestamp: parse_required(&record, layout.timestamp, row, "timestamp")?,
            sensor: record.get(layout.sensor).unwrap_or("").trim().to_string(),
            x: parse_required(&record, layout.x, row, "x")?,
            y: parse_required(&record, layout.y, row, "y")?,
            z: parse_required(&record, layout.z, row, "z")?,
            w: parse_optional(&record, layout.w, row, "w")?,
            accuracy: parse_optional(&record, layout.accuracy, row, "accuracy")?,
        });
    }

    log::debug!("{} filas cargadas desde {:?}", records.len(), path);
    Ok(TelemetryTable::new(records))
}

/// Guarda la tabla en el mismo formato que lee `load_table_from_csv`.
pub fn write_table_to_csv(table: &TelemetryTable, path: impl AsRef<Path>) -> Result<(), EvalError> {
    let mut writer = WriterBuilder::new().from_path(path.as_ref())?;
    writer.write_record(CSV_HEADER)?;

    let opt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for r in table.records() {
        writer.write_record([
            r.timestamp.to_string(),
            r.sensor.clone(),
            r.x.to_string(),
            r.y.to_string(),
            r.z.to_string(),
            opt(r.w),
            opt(r.accuracy),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Lista los .csv de una carpeta, ordenados por nombre para que el
/// entrenamiento sea reproducible.
pub fn list_csv_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, EvalError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Carga todas las grabaciones de una carpeta. Un CSV mal formado se descarta
/// con un aviso y el resto se sigue procesando.
pub fn load_tables_from_dir(
    dir: impl AsRef<Path>,
) -> Result<Vec<(PathBuf, TelemetryTable)>, EvalError> {
    let mut tables = Vec::new();
    for path in list_csv_files(dir)? {
        match load_table_from_csv(&path) {
            Ok(table) => tables.push((path, table)),
            Err(e) => log::warn!("Se omite {:?}: {}", path, e),
        }
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("movimetro_csv_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_rows_with_optional_columns() {
        let dir = scratch_dir("optional");
        let path = dir.join("rec.csv");
        fs::write(
            &path,
            "timestamp,sensor,x,y,z,w,accuracy\n\
             2.5,rot_vector,0.1,0.2,0.3,0.9,3\n\
             1.5,accel,1,2,3,,\n",
        )
        .unwrap();

        let table = load_table_from_csv(&path).unwrap();
        assert_eq!(table.len(), 2);
        // ordenada por timestamp
        assert_eq!(table.records()[0].sensor, "accel");
        assert_eq!(table.records()[0].w, None);
        assert_eq!(table.records()[1].w, Some(0.9));
        assert_eq!(table.records()[1].accuracy, Some(3.0));
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let dir = scratch_dir("missing");
        let path = dir.join("bad.csv");
        fs::write(&path, "timestamp,sensor,x,y\n1.0,accel,1,2\n").unwrap();

        let err = load_table_from_csv(&path).unwrap_err();
        assert!(matches!(err, EvalError::MissingColumn { column: "z", .. }));
    }

    #[test]
    fn write_then_load_preserves_values() {
        let dir = scratch_dir("write");
        let path = dir.join("out.csv");
        let mut rot = TelemetryRecord::new(10.125, "rot_vector", 0.5, -0.25, 0.125);
        rot.w = Some(0.75);
        rot.accuracy = Some(2.0);
        let table =
            TelemetryTable::new(vec![TelemetryRecord::new(10.0, "accel", 1.1, 2.2, 3.3), rot]);

        write_table_to_csv(&table, &path).unwrap();
        let loaded = load_table_from_csv(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn malformed_files_are_skipped_in_batch() {
        let dir = scratch_dir("batch");
        fs::write(dir.join("a.csv"), "timestamp,sensor,x,y,z\n1,accel,1,1,1\n").unwrap();
        fs::write(dir.join("b.csv"), "sensor,x\naccel,1\n").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let tables = load_tables_from_dir(&dir).unwrap();
        assert_eq!(tables.len(), 1);
        assert!(tables[0].0.ends_with("a.csv"));
    }
}
