//! Combined line plots, one line per run.

use crate::aggregate::Collected;
use crate::errors::*;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;

/// Cosmetics shared by every figure of an invocation.
#[derive(Debug, Clone)]
pub struct PlotStyle {
    /// Title prefix; the metric is appended.
    pub title: String,

    /// X axis label.
    pub x_label: String,

    /// Image size in pixels.
    pub size: (u32, u32),

    /// Grey panel with a white grid instead of white with a grey grid.
    pub seaborn: bool,
}

/// One labelled line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Legend label.
    pub label: String,

    /// `(step, value)` points.
    pub points: Vec<(f64, f64)>,
}

/// Everything needed to draw one figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    /// Caption.
    pub title: String,

    /// X axis label.
    pub x_label: String,

    /// Y axis label.
    pub y_label: String,

    /// Lines in legend order.
    pub lines: Vec<Line>,

    /// Fixed y range, otherwise derived from the data.
    pub fixed_y: Option<(f64, f64)>,
}

const SEABORN_PANEL: RGBColor = RGBColor(234, 234, 242);

fn plot_err<E: Display>(e: E) -> Error {
    ErrorKind::Plot(e.to_string()).into()
}

/// `(lo, hi)` with `hi > lo`.
fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo, lo + 1.0)
    }
}

impl Figure {
    /// Lays out one line per collected run.
    pub fn new(collected: &Collected, style: &PlotStyle) -> Figure {
        let kind = collected.kind();
        let lines = collected
            .runs()
            .map(|run| Line {
                label: run.label.clone(),
                points: run.series.points().map(|(s, v)| (s as f64, v)).collect(),
            })
            .collect();
        Figure {
            title: format!("{} - {}", style.title, kind.title()),
            x_label: style.x_label.clone(),
            y_label: kind.y_label().to_string(),
            lines: lines,
            fixed_y: kind.y_range(),
        }
    }

    fn all_points<'a>(&'a self) -> impl Iterator<Item = &'a (f64, f64)> + 'a {
        self.lines.iter().flat_map(|l| l.points.iter())
    }

    /// Step range covered by the lines.
    pub fn x_range(&self) -> (f64, f64) {
        let (lo, hi) = self.all_points().fold((::std::f64::INFINITY, ::std::f64::NEG_INFINITY), |r, p| {
            (r.0.min(p.0), r.1.max(p.0))
        });
        if lo.is_finite() { widen(lo, hi) } else { (0.0, 1.0) }
    }

    /// Value range: the fixed range, or zero (or the lowest value if
    /// negative) up to the highest value plus 5% headroom.
    pub fn y_range(&self) -> (f64, f64) {
        if let Some(range) = self.fixed_y {
            return range;
        }
        let (lo, hi) = self.all_points().fold((0.0f64, 0.0f64), |r, p| (r.0.min(p.1), r.1.max(p.1)));
        widen(lo, hi * 1.05)
    }

    /// Draws the figure into a PNG file.
    pub fn render(&self, path: &Path, style: &PlotStyle) -> Result<()> {
        let root = BitMapBackend::new(path, style.size).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let (x0, x1) = self.x_range();
        let (y0, y1) = self.y_range();
        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(plot_err)?;

        if style.seaborn {
            chart.plotting_area().fill(&SEABORN_PANEL).map_err(plot_err)?;
        }
        {
            let mut mesh = chart.configure_mesh();
            mesh.x_desc(self.x_label.as_str()).y_desc(self.y_label.as_str());
            if style.seaborn {
                mesh.bold_line_style(WHITE).light_line_style(WHITE.mix(0.5));
            }
            mesh.draw().map_err(plot_err)?;
        }

        for (i, line) in self.lines.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(LineSeries::new(line.points.iter().cloned(), color.stroke_width(2)))
                .map_err(plot_err)?
                .label(line.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;
        root.present().map_err(plot_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::RunRecord;
    use crate::config::{RunConfiguration, ZeroStage};
    use crate::series::{MetricSeries, SeriesKind};
    use std::path::PathBuf;

    fn style() -> PlotStyle {
        PlotStyle {
            title: "Megatron-GPT Universal Checkpointing".to_string(),
            x_label: "Training Step".to_string(),
            size: (1200, 800),
            seaborn: false,
        }
    }

    fn collected(kind: SeriesKind, runs: &[(&str, &[f64])]) -> Collected {
        let runs = runs
            .iter()
            .map(|&(path, values)| {
                let series: MetricSeries = values.iter().enumerate().map(|(i, &v)| (i as i64 * 10, v)).collect();
                let record = RunRecord {
                    path: PathBuf::from(path),
                    config: RunConfiguration::new(ZeroStage::One, 1, 1, 1, 1, 4),
                    label: format!("{}, MBSZ=4", path),
                    csv_name: String::new(),
                    series: series,
                };
                (PathBuf::from(path), record)
            })
            .collect();
        Collected::new(kind, runs)
    }

    #[test]
    fn one_line_per_run() {
        let c = collected(SeriesKind::Tflops, &[("b", &[1.0, 2.0][..]), ("a", &[3.0][..])]);
        let figure = Figure::new(&c, &style());
        assert_eq!(figure.title, "Megatron-GPT Universal Checkpointing - TFLOPs");
        assert_eq!(figure.y_label, "TFLOPs");
        let labels = figure.lines.iter().map(|l| l.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["a, MBSZ=4", "b, MBSZ=4"]);
        assert_eq!(figure.lines[1].points, vec![(0.0, 1.0), (10.0, 2.0)]);
        assert_eq!(figure.x_range(), (0.0, 10.0));
        let (lo, hi) = figure.y_range();
        assert_eq!(lo, 0.0);
        assert!((hi - 3.15).abs() < 1e-9);
    }

    #[test]
    fn percentage_axis_is_fixed() {
        let c = collected(SeriesKind::Tflops, &[("a", &[10.0, 40.0][..])]).percent_of_peak();
        let figure = Figure::new(&c, &style());
        assert_eq!(figure.y_range(), (0.0, 105.0));
        assert_eq!(figure.y_label, "TFLOPs (% of Peak)");
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        let c = collected(SeriesKind::Memory, &[("a", &[0.0][..])]);
        let figure = Figure::new(&c, &style());
        assert_eq!(figure.x_range(), (0.0, 1.0));
        assert_eq!(figure.y_range(), (0.0, 1.0));

        let empty = Figure::new(&collected(SeriesKind::Memory, &[]), &style());
        assert_eq!(empty.x_range(), (0.0, 1.0));
    }
}
