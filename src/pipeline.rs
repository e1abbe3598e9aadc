//! Drives one invocation: either from raw event logs or from previously
//! exported CSV files.

use crate::aggregate::{Collected, RunRecord};
use crate::analyzer::{get_analyzer, Analyzer, RunNames};
use crate::config::{extract_params_from_path, RunConfiguration};
use crate::discover;
use crate::errors::*;
use crate::plot::PlotStyle;
use crate::report::{self, OutputDir};
use crate::series::{MetricSeries, SeriesKind};
use crate::setting::Setting;
use crate::source::{CsvSource, EventLogSource, MetricSource};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

/// Command line options.
#[derive(StructOpt, Debug, Clone)]
#[structopt(name = "tb_analysis")]
#[structopt(about = "Compare TFLOPs and peak memory across distributed training runs.")]
pub struct Options {
    /// Directory searched recursively for event files.
    #[structopt(long = "tb-dir", parse(from_os_str))]
    pub tb_dir: Option<PathBuf>,

    /// Directory searched recursively for exported CSV files (with --plot-only).
    #[structopt(long = "csv-dir", parse(from_os_str))]
    pub csv_dir: Option<PathBuf>,

    /// How runs are labelled and named.
    #[structopt(long = "analyzer", default_value = "universal_checkpointing")]
    pub analyzer: String,

    /// Scalar tag holding throughput.
    #[structopt(long = "tflops-event-key", default_value = "performance/tflops")]
    pub tflops_event_key: String,

    /// Scalar tag holding peak memory.
    #[structopt(long = "memory-event-key", default_value = "performance/peak_memory_gb")]
    pub memory_event_key: String,

    /// Plot title prefix.
    #[structopt(long = "plot-title", default_value = "Megatron-GPT Universal Checkpointing")]
    pub plot_title: String,

    /// X axis label.
    #[structopt(long = "plot-x-label", default_value = "Training Step")]
    pub plot_x_label: String,

    /// File name of the throughput plot.
    #[structopt(long = "plot-tflops-name", default_value = "perf_tflops.png")]
    pub plot_tflops_name: String,

    /// File name of the memory plot.
    #[structopt(long = "plot-memory-name", default_value = "perf_memory.png")]
    pub plot_memory_name: String,

    /// File name of the percent-of-peak plot.
    #[structopt(long = "plot-tflops-pct-name", default_value = "perf_tflops_pct.png")]
    pub plot_tflops_pct_name: String,

    /// Prefix inserted into exported CSV names.
    #[structopt(long = "csv-name")]
    pub csv_name: Option<String>,

    /// Do not export CSV files.
    #[structopt(long = "skip-csv")]
    pub skip_csv: bool,

    /// Do not render plots.
    #[structopt(long = "skip-plot")]
    pub skip_plot: bool,

    /// Plot previously exported CSV files instead of reading event logs.
    #[structopt(long = "plot-only")]
    pub plot_only: bool,

    /// Seaborn-like plot theme.
    #[structopt(long = "use-sns")]
    pub use_sns: bool,

    /// TOML setting file.
    #[structopt(long = "setting", parse(from_os_str))]
    pub setting: Option<PathBuf>,
}

impl Options {
    fn plot_style(&self, setting: &Setting) -> PlotStyle {
        PlotStyle {
            title: self.plot_title.clone(),
            x_label: self.plot_x_label.clone(),
            size: (setting.plot_width, setting.plot_height),
            seaborn: self.use_sns,
        }
    }

    fn csv_prefix(&self) -> &str {
        self.csv_name.as_ref().map_or("", String::as_str)
    }
}

/// What an invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// The timestamped directory holding every output.
    pub output_dir: PathBuf,

    /// Files written, in write order.
    pub files: Vec<PathBuf>,

    /// Global TFLOPs peak the percentages are relative to.
    pub tflops_max: f64,
}

/// Identity of a run: where it lives, its configuration and its names.
struct RunInfo {
    path: PathBuf,
    config: RunConfiguration,
    names: RunNames,
}

impl RunInfo {
    fn record(&self, series: MetricSeries) -> RunRecord {
        RunRecord {
            path: self.path.clone(),
            config: self.config,
            label: format!("{}, MBSZ={}", self.names.label, self.config.micro_batch_size),
            csv_name: self.names.csv_name.clone(),
            series: series,
        }
    }
}

/// Writes CSVs and plots according to the options, remembering each file.
struct Writer<'a> {
    opts: &'a Options,
    dir: OutputDir,
    style: PlotStyle,
    files: Vec<PathBuf>,
}

impl<'a> Writer<'a> {
    fn csvs(&mut self, collected: &Collected) -> Result<()> {
        if !self.opts.skip_csv {
            let written = report::write_csvs(&self.dir, collected, self.opts.csv_prefix())?;
            self.files.extend(written);
        }
        Ok(())
    }

    fn plot(&mut self, collected: &Collected, name: &str) -> Result<()> {
        if !self.opts.skip_plot {
            if let Some(path) = report::write_plot(&self.dir, collected, name, &self.style)? {
                self.files.push(path);
            }
        }
        Ok(())
    }

    fn finish(self, tflops_max: f64) -> Report {
        Report {
            output_dir: self.dir.path().to_path_buf(),
            files: self.files,
            tflops_max: tflops_max,
        }
    }
}

/// Runs one invocation.
pub fn run(opts: &Options, setting: &Setting) -> Result<Report> {
    let analyzer = get_analyzer(&opts.analyzer)?;
    let mut writer = Writer {
        opts: opts,
        dir: OutputDir::create(&setting.output_root)?,
        style: opts.plot_style(setting),
        files: Vec::new(),
    };
    let tflops_max = if opts.plot_only {
        let dir = opts.csv_dir.as_ref().ok_or("--csv-dir is required with --plot-only")?;
        run_from_csv(dir, analyzer.as_ref(), &mut writer)?
    } else {
        let dir = opts.tb_dir.as_ref().ok_or("--tb-dir is required without --plot-only")?;
        run_from_logs(dir, analyzer.as_ref(), setting, &mut writer)?
    };
    Ok(writer.finish(tflops_max))
}

/// Texts a run's configuration may be read from, most specific first: its
/// path below the search root, below the root's parent, then the full path.
fn run_names(root: &Path, path: &Path) -> Vec<String> {
    let bases = vec![Some(root), root.parent()];
    let mut names = bases
        .into_iter()
        .filter_map(|base| base.and_then(|b| path.strip_prefix(b).ok()))
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(|rel| rel.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.push(path.to_string_lossy().into_owned());
    names
}

/// The first name of the run that carries a full configuration. The error
/// of the full path is reported when none does.
fn run_configuration(root: &Path, path: &Path) -> Result<(String, RunConfiguration)> {
    let mut names = run_names(root, path);
    let full = names.pop().unwrap_or_default();
    for name in names {
        match extract_params_from_path(&name) {
            Ok(config) => return Ok((name, config)),
            Err(e) => debug!("{}: {}", name, e),
        }
    }
    let config = extract_params_from_path(&full)?;
    Ok((full, config))
}

fn run_from_logs(dir: &Path, analyzer: &dyn Analyzer, setting: &Setting, writer: &mut Writer) -> Result<f64> {
    let files = discover::find_files_prefix(dir, &setting.event_prefix)?;
    info!("Found {} matching files", files.len());

    let mut runs = Vec::new();
    for (path, files) in discover::group_by_run(files) {
        let (name, config) = run_configuration(dir, &path)
            .chain_err(|| format!("cannot derive the configuration of {}", path.display()))?;
        match analyzer.names(&name) {
            Ok(names) => {
                let info = RunInfo {
                    path: path,
                    config: config,
                    names: names,
                };
                runs.push((info, EventLogSource::new(files)));
            }
            Err(e) => error!("skipping {}: {}", path.display(), e.iter().join(": ")),
        }
    }

    let opts = writer.opts;
    let tflops = collect(&runs, &opts.tflops_event_key, SeriesKind::Tflops);
    info!("Overall max TFLOPs: {:.3}", tflops.max());
    tflops.log_summaries();
    writer.plot(&tflops, &opts.plot_tflops_name)?;
    writer.csvs(&tflops)?;

    let pct = tflops.percent_of_peak();
    writer.plot(&pct, &opts.plot_tflops_pct_name)?;
    writer.csvs(&pct)?;

    let memory = collect(&runs, &opts.memory_event_key, SeriesKind::Memory);
    memory.log_summaries();
    writer.plot(&memory, &opts.plot_memory_name)?;
    writer.csvs(&memory)?;

    Ok(tflops.max())
}

/// Loads `key` from every run. Runs that fail to load are logged and left
/// out; runs without data are left out silently.
fn collect<S: MetricSource>(runs: &[(RunInfo, S)], key: &str, kind: SeriesKind) -> Collected {
    let mut collected = BTreeMap::new();
    for &(ref info, ref source) in runs {
        match source.load(key) {
            Ok(ref series) if series.is_empty() => debug!("no {} in {}", key, info.path.display()),
            Ok(series) => {
                collected.insert(info.path.clone(), info.record(series));
            }
            Err(e) => error!("skipping {}: {}", info.path.display(), e.iter().join(": ")),
        }
    }
    Collected::new(kind, collected)
}

/// Exported series grouped by metric.
struct Exported {
    tflops: Collected,
    tflops_pct: Collected,
    memory: Collected,
}

/// Loads every exported CSV under `dir`. The percentages are recomputed from
/// the throughput series when there are any.
fn load_exported(dir: &Path, analyzer: &dyn Analyzer) -> Result<Exported> {
    let files = discover::find_files_suffix(dir, ".csv")?;
    info!("Found {} matching files", files.len());

    let mut runs: BTreeMap<SeriesKind, BTreeMap<PathBuf, RunRecord>> = BTreeMap::new();
    for file in files {
        // the extension would end up in the `mbsz` value
        let name = match file.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        let kind = match SeriesKind::classify(&name) {
            Some(kind) => kind,
            None => {
                debug!("ignoring {}", file.display());
                continue;
            }
        };
        let info = RunInfo {
            config: extract_params_from_path(&name)?,
            names: analyzer.names(&name)?,
            path: file,
        };
        let series = CsvSource::new(&info.path).load(kind.column())?;
        if series.is_empty() {
            debug!("{} holds no rows", info.path.display());
            continue;
        }
        runs.entry(kind).or_insert_with(BTreeMap::new).insert(info.path.clone(), info.record(series));
    }

    let mut take = |kind: SeriesKind| Collected::new(kind, runs.remove(&kind).unwrap_or_default());
    let tflops = take(SeriesKind::Tflops);
    let stored_pct = take(SeriesKind::TflopsPct);
    let memory = take(SeriesKind::Memory);
    let tflops_pct = if tflops.is_empty() {
        stored_pct
    } else {
        tflops.percent_of_peak()
    };
    Ok(Exported {
        tflops: tflops,
        tflops_pct: tflops_pct,
        memory: memory,
    })
}

fn run_from_csv(dir: &Path, analyzer: &dyn Analyzer, writer: &mut Writer) -> Result<f64> {
    let opts = writer.opts;
    let exported = load_exported(dir, analyzer)?;
    info!("Overall max TFLOPs: {:.3}", exported.tflops.max());
    exported.tflops.log_summaries();
    exported.memory.log_summaries();

    writer.plot(&exported.tflops, &opts.plot_tflops_name)?;
    writer.plot(&exported.tflops_pct, &opts.plot_tflops_pct_name)?;
    writer.plot(&exported.memory, &opts.plot_memory_name)?;
    Ok(exported.tflops.max())
}
