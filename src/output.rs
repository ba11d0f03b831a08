//! File sink for raw and normalized feed output.
//!
//! Files are named `<source>_<timestamp>.<ext>` inside the saver's directory.

use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::error::{Error, Result};

/// Writes timestamped JSON and CSV files into one directory.
#[derive(Debug, Clone)]
pub struct FileSaver {
    dir: PathBuf,
    timestamp: String,
}

impl FileSaver {
    /// Creates the directory (and parents) if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>, timestamp: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            timestamp: timestamp.into(),
        })
    }

    fn filename(&self, source: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.{}", source, self.timestamp, ext))
    }

    /// Writes `data` as pretty-printed JSON (2-space indent).
    pub fn write_json<T: Serialize + ?Sized>(&self, source: &str, data: &T) -> Result<PathBuf> {
        let path = self.filename(source, "json");
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush()?;

        debug!(path = %path.display(), "Wrote JSON");
        Ok(path)
    }

    /// Writes `rows` as CSV with a header row taken from the first record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] if `rows` is empty.
    pub fn write_csv<T: Serialize>(&self, source: &str, rows: &[T]) -> Result<PathBuf> {
        if rows.is_empty() {
            return Err(Error::EmptyInput {
                name: source.to_string(),
            });
        }

        let path = self.filename(source, "csv");
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_path(&path)?;

        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{InformedEntityRecord, VehiclePositionRecord};
    use std::fs;

    fn position(vehicle_id: Option<&str>, lat: Option<f32>) -> VehiclePositionRecord {
        VehiclePositionRecord {
            vehicle_id: vehicle_id.map(str::to_string),
            trip_id: None,
            route_id: Some("6641".to_string()),
            lat,
            lon: lat.map(|l| -l),
            timestamp: Some(1_700_000_000),
        }
    }

    #[test]
    fn test_new_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("clean/realtime/position_updates");

        let saver = FileSaver::new(&dir, "2024-01-01T00-00").unwrap();
        let path = saver.write_json("position_updates", &Vec::<VehiclePositionRecord>::new()).unwrap();

        assert!(dir.is_dir());
        assert_eq!(path.parent().unwrap(), dir.as_path());
    }

    #[test]
    fn test_write_json_filename_and_indent() {
        let tmp = tempfile::tempdir().unwrap();
        let saver = FileSaver::new(tmp.path(), "2024-01-01T08-30").unwrap();

        let path = saver
            .write_json("position_updates", &vec![position(Some("1"), Some(49.5))])
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "position_updates_2024-01-01T08-30.json"
        );
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n  {\n    \"vehicle_id\": \"1\""));
    }

    #[test]
    fn test_json_round_trip_keeps_absent_values() {
        let tmp = tempfile::tempdir().unwrap();
        let saver = FileSaver::new(tmp.path(), "t").unwrap();
        let records = vec![position(Some("1"), Some(49.25)), position(None, None)];

        let path = saver.write_json("position_updates", &records).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let back: Vec<VehiclePositionRecord> = serde_json::from_str(&content).unwrap();

        assert_eq!(back, records);
        assert!(content.contains("\"lat\": null"));
    }

    #[test]
    fn test_write_csv_header_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let saver = FileSaver::new(tmp.path(), "t").unwrap();

        let path = saver
            .write_csv(
                "informed",
                &[
                    InformedEntityRecord {
                        trip_id: None,
                        route_id: Some("099".to_string()),
                        stop_id: None,
                    },
                    InformedEntityRecord {
                        trip_id: Some("t1".to_string()),
                        route_id: None,
                        stop_id: Some("50".to_string()),
                    },
                ],
            )
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["trip_id,route_id,stop_id", ",099,", "t1,,50"]);
    }

    #[test]
    fn test_write_csv_rejects_empty_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let saver = FileSaver::new(tmp.path(), "t").unwrap();

        let err = saver
            .write_csv::<VehiclePositionRecord>("position_updates", &[])
            .unwrap_err();

        assert!(matches!(err, Error::EmptyInput { .. }));
        assert!(!tmp.path().join("position_updates_t.csv").exists());
    }
}
