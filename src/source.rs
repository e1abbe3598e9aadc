//! Where series come from: a run's event files or an exported CSV.

use crate::csv_io;
use crate::errors::*;
use crate::event::EventLog;
use crate::series::MetricSeries;
use std::path::{Path, PathBuf};

/// Produces the series of a metric key.
pub trait MetricSource {
    /// Loads the series for `key`. An empty series means no data.
    fn load(&self, key: &str) -> Result<MetricSeries>;
}

/// The event files of one run, in the order they were written.
#[derive(Debug, Clone)]
pub struct EventLogSource {
    files: Vec<PathBuf>,
}

impl EventLogSource {
    /// Creates a source over `files`.
    pub fn new(files: Vec<PathBuf>) -> Self {
        EventLogSource { files: files }
    }

    /// Reads all files into one log.
    pub fn open(&self) -> Result<EventLog> {
        let mut log = EventLog::new();
        for file in &self.files {
            log.load_file(file)?;
        }
        Ok(log)
    }
}

impl MetricSource for EventLogSource {
    fn load(&self, key: &str) -> Result<MetricSeries> {
        let log = self.open()?;
        match log.scalars(key) {
            Some(series) => Ok(series.clone()),
            None => {
                debug!("no {} among tags {:?}", key, log.tags());
                Ok(MetricSeries::new())
            }
        }
    }
}

/// A CSV file written by the reporter. The file holds exactly one metric, so
/// the key is not consulted.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Creates a source over `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvSource { path: path.as_ref().to_path_buf() }
    }
}

impl MetricSource for CsvSource {
    fn load(&self, _key: &str) -> Result<MetricSeries> {
        csv_io::read_series(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::testing::{scalar_event, write_events};
    use crate::series::SeriesKind;
    use std::fs::File;

    #[test]
    fn event_files_are_concatenated() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("events.out.tfevents.1.host");
        let second = dir.path().join("events.out.tfevents.2.host");
        write_events(
            &mut File::create(&first).unwrap(),
            &[scalar_event(0, "performance/tflops", 1.0), scalar_event(1, "performance/tflops", 2.0)],
        );
        write_events(
            &mut File::create(&second).unwrap(),
            &[scalar_event(2, "performance/tflops", 3.0)],
        );

        let source = EventLogSource::new(vec![first, second]);
        let series = source.load("performance/tflops").unwrap();
        assert_eq!(series.steps(), &[0, 1, 2]);
        assert!(source.load("performance/peak_memory_gb").unwrap().is_empty());
    }

    #[test]
    fn missing_event_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = EventLogSource::new(vec![dir.path().join("events.out.tfevents.gone")]);
        assert!(source.load("performance/tflops").is_err());
    }

    #[test]
    fn csv_source_ignores_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory_run.csv");
        let series: MetricSeries = vec![(0, 1.5)].into_iter().collect();
        csv_io::write_series(&path, SeriesKind::Memory, &series).unwrap();
        assert_eq!(CsvSource::new(&path).load("anything").unwrap(), series);
    }
}
