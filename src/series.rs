//! Scalar time series and the kinds of series this crate reports.

use std::fmt;

/// Steps and values of one metric of one run, in recording order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricSeries {
    steps: Vec<i64>,
    values: Vec<f64>,
}

impl MetricSeries {
    /// Creates an empty series.
    pub fn new() -> Self {
        MetricSeries::default()
    }

    /// Appends one point.
    pub fn push(&mut self, step: i64, value: f64) {
        self.steps.push(step);
        self.values.push(value);
    }

    /// Recorded steps.
    pub fn steps(&self) -> &[i64] {
        &self.steps
    }

    /// Recorded values, aligned with `steps()`.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates over `(step, value)` pairs.
    pub fn points<'a>(&'a self) -> impl Iterator<Item = (i64, f64)> + 'a {
        self.steps.iter().cloned().zip(self.values.iter().cloned())
    }

    /// Keeps only the points recorded before `step`.
    pub fn retain_before(&mut self, step: i64) {
        let (steps, values): (Vec<i64>, Vec<f64>) =
            self.points().filter(|&(s, _)| s < step).unzip();
        self.steps = steps;
        self.values = values;
    }

    /// Builds a series with the same steps and transformed values.
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> MetricSeries {
        MetricSeries {
            steps: self.steps.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }
}

impl ::std::iter::FromIterator<(i64, f64)> for MetricSeries {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        let mut series = MetricSeries::new();
        for (step, value) in iter {
            series.push(step, value);
        }
        series
    }
}

/// The three series this crate extracts, exports and plots.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum SeriesKind {
    /// Throughput in TFLOPs.
    Tflops,

    /// Throughput as a percentage of the peak over all runs.
    TflopsPct,

    /// Peak device memory in GB.
    Memory,
}

impl SeriesKind {
    /// Name of the value column in exported CSV files.
    pub fn column(self) -> &'static str {
        match self {
            SeriesKind::Tflops => "tflops",
            SeriesKind::TflopsPct => "tflops_pct",
            SeriesKind::Memory => "memory_gb",
        }
    }

    /// File name prefix of exported CSV files.
    pub fn file_prefix(self) -> &'static str {
        match self {
            SeriesKind::Tflops => "tflops_",
            SeriesKind::TflopsPct => "tflops_pct_",
            SeriesKind::Memory => "memory_",
        }
    }

    /// Suffix appended to the plot title.
    pub fn title(self) -> &'static str {
        match self {
            SeriesKind::Tflops => "TFLOPs",
            SeriesKind::TflopsPct => "TFLOPs (% of Peak)",
            SeriesKind::Memory => "Peak Memory",
        }
    }

    /// Label of the y axis.
    pub fn y_label(self) -> &'static str {
        match self {
            SeriesKind::Tflops => "TFLOPs",
            SeriesKind::TflopsPct => "TFLOPs (% of Peak)",
            SeriesKind::Memory => "Peak Memory (GB)",
        }
    }

    /// Fixed y range, if the kind has one.
    pub fn y_range(self) -> Option<(f64, f64)> {
        match self {
            SeriesKind::TflopsPct => Some((0.0, 105.0)),
            _ => None,
        }
    }

    /// Classifies an exported CSV by its file name. `tflops_pct_` is checked
    /// before `tflops_` since the latter is a prefix of the former.
    pub fn classify(file_name: &str) -> Option<SeriesKind> {
        [SeriesKind::TflopsPct, SeriesKind::Tflops, SeriesKind::Memory]
            .iter()
            .cloned()
            .find(|kind| file_name.starts_with(kind.file_prefix()))
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_and_values_stay_aligned() {
        let mut s: MetricSeries = vec![(0, 1.0), (1, 2.0)].into_iter().collect();
        s.push(2, 3.0);
        s.push(3, 4.0);
        assert_eq!(s.steps(), &[0, 1, 2, 3]);
        assert_eq!(s.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn classify_by_prefix() {
        assert_eq!(SeriesKind::classify("tflops_uc_z1.csv"), Some(SeriesKind::Tflops));
        assert_eq!(SeriesKind::classify("tflops_pct_uc_z1.csv"), Some(SeriesKind::TflopsPct));
        assert_eq!(SeriesKind::classify("memory_uc_z1.csv"), Some(SeriesKind::Memory));
        assert_eq!(SeriesKind::classify("loss_uc_z1.csv"), None);
    }
}
