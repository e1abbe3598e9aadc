//! Writes the outputs of an invocation: per-run CSV exports and combined
//! plots, all under one timestamped directory.

use crate::aggregate::{Collected, RunRecord};
use crate::csv_io;
use crate::errors::*;
use crate::plot::{Figure, PlotStyle};
use crate::series::SeriesKind;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Format of the per-invocation directory name.
pub const OUTPUT_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

/// The directory receiving every output of one invocation.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Creates `<root>/<YYYYMMDD_HHMMSS>` for the current local time.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<OutputDir> {
        OutputDir::create_at(root, Local::now())
    }

    /// Creates the directory named after `time`. An existing directory is
    /// reused.
    pub fn create_at<P: AsRef<Path>>(root: P, time: DateTime<Local>) -> Result<OutputDir> {
        let path = root.as_ref().join(time.format(OUTPUT_DIR_FORMAT).to_string());
        fs::create_dir_all(&path).chain_err(|| format!("failed to create {}", path.display()))?;
        info!("writing outputs to {}", path.display());
        Ok(OutputDir { path: path })
    }

    /// The directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file inside the directory.
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

/// Export file name of `run`: the kind prefix, the user prefix, the analyzer
/// fragment and the run configuration.
pub fn csv_file_name(kind: SeriesKind, prefix: &str, run: &RunRecord) -> String {
    run.config
        .file_name(&format!("{}{}{}.csv", kind.file_prefix(), prefix, run.csv_name))
}

/// Writes one CSV per run. Returns the files written.
pub fn write_csvs(dir: &OutputDir, collected: &Collected, prefix: &str) -> Result<Vec<PathBuf>> {
    let kind = collected.kind();
    let mut written = Vec::with_capacity(collected.len());
    for run in collected.runs() {
        let path = dir.join(&csv_file_name(kind, prefix, run));
        csv_io::write_series(&path, kind, &run.series)?;
        debug!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Renders the combined plot under `name`. The name does not depend on the
/// runs, so a re-run with other runs replaces the same file. Returns `None`
/// when there is nothing to draw.
pub fn write_plot(dir: &OutputDir, collected: &Collected, name: &str, style: &PlotStyle) -> Result<Option<PathBuf>> {
    if collected.is_empty() {
        warn!("no {} data, skipping {}", collected.kind(), name);
        return Ok(None);
    }
    let path = dir.join(name);
    Figure::new(collected, style)
        .render(&path, style)
        .chain_err(|| format!("failed to render {}", path.display()))?;
    info!("saved {}", path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfiguration, ZeroStage};
    use crate::series::MetricSeries;
    use chrono::TimeZone;

    fn run(tp: u32) -> RunRecord {
        RunRecord {
            path: PathBuf::from(format!("/logs/z1_tp{}_pp1_dp4_sp1_mbsz4", tp)),
            config: RunConfiguration::new(ZeroStage::One, tp, 1, 4, 1, 4),
            label: String::new(),
            csv_name: format!("uc_out_tp_{}_pp_1_dp_4_sp_1", tp),
            series: vec![(0, 1.0), (1, 2.0)].into_iter().collect::<MetricSeries>(),
        }
    }

    #[test]
    fn output_dir_is_timestamped() {
        let root = tempfile::tempdir().unwrap();
        let time = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let dir = OutputDir::create_at(root.path(), time).unwrap();
        assert_eq!(dir.path(), root.path().join("20240309_070501").as_path());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn csv_names() {
        assert_eq!(
            csv_file_name(SeriesKind::Tflops, "gpt_", &run(2)),
            "tflops_gpt_uc_out_tp_2_pp_1_dp_4_sp_1_z1_tp2_pp1_dp4_sp1_mbsz4.csv"
        );
        assert_eq!(
            csv_file_name(SeriesKind::TflopsPct, "", &run(2)),
            "tflops_pct_uc_out_tp_2_pp_1_dp_4_sp_1_z1_tp2_pp1_dp4_sp1_mbsz4.csv"
        );
        assert_ne!(
            csv_file_name(SeriesKind::Memory, "", &run(1)),
            csv_file_name(SeriesKind::Memory, "", &run(2))
        );
    }

    #[test]
    fn writes_one_csv_per_run_and_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let dir = OutputDir::create(root.path()).unwrap();
        let runs = vec![run(1), run(2)].into_iter().map(|r| (r.path.clone(), r)).collect();
        let collected = Collected::new(SeriesKind::Memory, runs);

        let first = write_csvs(&dir, &collected, "").unwrap();
        let second = write_csvs(&dir, &collected, "").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
        for path in &first {
            assert_eq!(csv_io::read_series(path).unwrap().values(), &[1.0, 2.0]);
        }
    }

    #[test]
    fn empty_plot_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let dir = OutputDir::create(root.path()).unwrap();
        let style = PlotStyle {
            title: String::new(),
            x_label: String::new(),
            size: (640, 480),
            seaborn: false,
        };
        let empty = Collected::new(SeriesKind::Tflops, Default::default());
        assert_eq!(write_plot(&dir, &empty, "perf_tflops.png", &style).unwrap(), None);
        assert!(!dir.join("perf_tflops.png").exists());
    }
}
