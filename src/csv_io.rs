//! Exported series files.
//!
//! ```ignore
//! ,step,tflops
//! 0,0,10.0
//! 1,1,20.0
//! ```
//!
//! The first column is the row index, the header row is recognised by its
//! second column being `step`.

use crate::errors::*;
use crate::series::{MetricSeries, SeriesKind};
use csv;
use std::io::{Read, Write};
use std::path::Path;

/// Writes `series` to `path`, replacing any existing file.
pub fn write_series<P: AsRef<Path>>(path: P, kind: SeriesKind, series: &MetricSeries) -> Result<()> {
    let path = path.as_ref();
    let writer = csv::Writer::from_path(path)
        .chain_err(|| format!("failed to create {}", path.display()))?;
    write_to(writer, kind, series)
}

fn write_to<W: Write>(mut writer: csv::Writer<W>, kind: SeriesKind, series: &MetricSeries) -> Result<()> {
    writer.write_record(&["", "step", kind.column()])?;
    for (i, (step, value)) in series.points().enumerate() {
        writer.serialize((i, step, value))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a series written by `write_series`. Any malformed row fails the
/// whole file.
pub fn read_series<P: AsRef<Path>>(path: P) -> Result<MetricSeries> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .chain_err(|| format!("failed to open {}", path.display()))?;
    read_from(reader).chain_err(|| format!("failed to load {}", path.display()))
}

fn read_from<R: Read>(mut reader: csv::Reader<R>) -> Result<MetricSeries> {
    let mut series = MetricSeries::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.get(1) == Some("step") {
            continue;
        }
        let (step, value) = match (record.get(1), record.get(2)) {
            (Some(step), Some(value)) => (step.trim(), value.trim()),
            _ => bail!("line {} has {} columns, expected 3", line + 1, record.len()),
        };
        series.push(step.parse::<i64>()?, value.parse::<f64>()?);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_str(data: &str) -> Result<MetricSeries> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());
        read_from(reader)
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tflops_run.csv");
        let series: MetricSeries = vec![(0, 10.0), (5, 22.125), (10, 1.0 / 3.0), (15, 0.0)]
            .into_iter()
            .collect();

        write_series(&path, SeriesKind::Tflops, &series).unwrap();
        assert_eq!(read_series(&path).unwrap(), series);
    }

    #[test]
    fn written_layout() {
        let series: MetricSeries = vec![(0, 10.0), (1, 20.5)].into_iter().collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.csv");
        write_series(&path, SeriesKind::Memory, &series).unwrap();
        let text = ::std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, ",step,memory_gb\n0,0,10.0\n1,1,20.5\n");
    }

    #[test]
    fn reads_pandas_output() {
        let series = read_str(",step,tflops_pct\n0,100,0\n1,200,42.5\n").unwrap();
        assert_eq!(series.steps(), &[100, 200]);
        assert_eq!(series.values(), &[0.0, 42.5]);
    }

    #[test]
    fn header_only_is_empty() {
        assert!(read_str(",step,tflops\n").unwrap().is_empty());
    }

    #[test]
    fn malformed_row_fails() {
        assert!(read_str(",step,tflops\n0,1,abc\n").is_err());
        assert!(read_str(",step,tflops\n0,1.5,3.0\n").is_err());
        assert!(read_str(",step,tflops\n0,1\n").is_err());
    }
}
