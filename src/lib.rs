//! tb-analysis: compare performance of distributed training runs.
//!
//! This crate reads the scalar metrics (TFLOPs and peak memory) that training
//! jobs record in TensorBoard event files, recovers each run's parallelism
//! configuration from its directory name, and writes comparison plots and CSV
//! exports.
//!
//! The flow has two stages. The first stage collects one `MetricSeries` per
//! run and the global peak; the second stage renders them.
//!
//! ```text
//! events.out.tfevents.* --(event)--> MetricSeries --(aggregate)--> Collected
//! *.csv                 --(csv_io)-->                               |
//!                                                    (report / plot) v
//!                                                   data/<timestamp>/*.{csv,png}
//! ```
#![recursion_limit = "1024"]
#![deny(missing_docs)]

extern crate average;
extern crate byteorder;
extern crate chrono;
extern crate csv;
#[macro_use]
extern crate error_chain;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate plotters;
extern crate prost;
extern crate regex;
extern crate serde;
extern crate structopt;
#[macro_use]
extern crate serde_derive;
extern crate toml;
extern crate walkdir;

pub mod errors;

mod setting;
pub use crate::setting::Setting;

mod config;
pub use crate::config::{extract_params_from_path, RunConfiguration, ZeroStage};

mod series;
pub use crate::series::{MetricSeries, SeriesKind};

pub mod analyzer;
pub mod event;
mod tfrecord;

mod source;
pub use crate::source::{CsvSource, EventLogSource, MetricSource};

pub mod csv_io;

mod aggregate;
pub use crate::aggregate::{global_max, percent_of_peak, Collected, RunRecord, RunSummary};

pub mod discover;
pub mod plot;
pub mod report;

pub mod pipeline;
pub use crate::pipeline::{Options, Report};

/// Prefix of the event files written by TensorBoard summary writers.
pub const EVENT_FILE_PREFIX: &str = "events.out.tfevents";
