//! Cross-run aggregation: the global peak and percent-of-peak series.

use average::{Estimate, Max, Mean};
use crate::config::RunConfiguration;
use crate::series::{MetricSeries, SeriesKind};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One run's series of one metric plus what is needed to name it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Run directory (or exported file) the series came from.
    pub path: PathBuf,

    /// Parallelism configuration of the run.
    pub config: RunConfiguration,

    /// Legend label.
    pub label: String,

    /// Analyzer fragment of exported file names.
    pub csv_name: String,

    /// The series.
    pub series: MetricSeries,
}

/// Quick numbers about one run's series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Number of points.
    pub points: usize,

    /// Largest value.
    pub max: f64,

    /// Mean value.
    pub mean: f64,
}

impl RunSummary {
    /// Summarizes `series`; `None` when it is empty.
    pub fn of(series: &MetricSeries) -> Option<RunSummary> {
        if series.is_empty() {
            return None;
        }
        let mut max = Max::new();
        let mut mean = Mean::new();
        for &v in series.values() {
            max.add(v);
            mean.add(v);
        }
        Some(RunSummary {
            points: series.len(),
            max: max.max(),
            mean: mean.mean(),
        })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} points, max {:.3}, mean {:.3}", self.points, self.max, self.mean)
    }
}

/// Largest value over all series, never below `0`; `0` without data.
pub fn global_max<'a, I>(series: I) -> f64
where
    I: IntoIterator<Item = &'a MetricSeries>,
{
    let mut max = Max::new();
    for s in series {
        for &v in s.values() {
            max.add(v);
        }
    }
    max.max().max(0.0)
}

/// Expresses each value as a percentage of `max`. All zeros when `max` is
/// not positive.
pub fn percent_of_peak(series: &MetricSeries, max: f64) -> MetricSeries {
    if max > 0.0 {
        series.map_values(|v| 100.0 * v / max)
    } else {
        series.map_values(|_| 0.0)
    }
}

/// Output of the collection stage: every run with data for one metric and
/// the metric's global maximum. Immutable once built.
#[derive(Debug, Clone)]
pub struct Collected {
    kind: SeriesKind,
    runs: BTreeMap<PathBuf, RunRecord>,
    max: f64,
}

impl Collected {
    /// Freezes the collected runs and computes the global maximum.
    pub fn new(kind: SeriesKind, runs: BTreeMap<PathBuf, RunRecord>) -> Self {
        let max = global_max(runs.values().map(|r| &r.series));
        Collected {
            kind: kind,
            runs: runs,
            max: max,
        }
    }

    /// The metric.
    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    /// Global maximum over all runs.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Runs in path order.
    pub fn runs(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs.values()
    }

    /// Number of runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True when no run had data.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The same runs as percentages of this collection's peak.
    pub fn percent_of_peak(&self) -> Collected {
        let runs = self.runs
            .iter()
            .map(|(path, record)| {
                let mut record = record.clone();
                record.series = percent_of_peak(&record.series, self.max);
                (path.clone(), record)
            })
            .collect::<BTreeMap<_, _>>();
        Collected {
            kind: SeriesKind::TflopsPct,
            max: global_max(runs.values().map(|r| &r.series)),
            runs: runs,
        }
    }

    /// Logs per-run summaries.
    pub fn log_summaries(&self) {
        for run in self.runs() {
            if let Some(summary) = RunSummary::of(&run.series) {
                info!("{} for {}: {}", self.kind, run.path.display(), summary);
            }
        }
    }
}
