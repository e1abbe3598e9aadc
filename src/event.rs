//! Scalars from TensorBoard event files.
//!
//! An event file is a TFRecord stream of `Event` protobufs. Only the fields
//! needed to recover scalar summaries are declared here; prost skips the rest.
//!
//! Scalars come in two encodings: `simple_value` (legacy writers, including
//! `torch.utils.tensorboard`) and a rank-0 `tensor` (TF2 writers). Both end up
//! in the same per-tag series.
//!
//! Like TensorBoard itself, the log discards data orphaned by a restart. Files
//! of version 2 and later (`brain.Event:2`) mark restarts explicitly: a
//! `SessionLog::START` drops the recorded points at or after its step for
//! every tag, and steps going back are otherwise kept as recorded. Older files
//! have no such marker, so a summary whose step goes back in time drops the
//! points of its own tags at or after that step.

use crate::errors::*;
use crate::series::MetricSeries;
use crate::tfrecord::RecordReader;
use byteorder::{ByteOrder, LittleEndian};
use prost::Message;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One record of an event file.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    /// Seconds since the epoch.
    #[prost(double, tag = "1")]
    pub wall_time: f64,

    /// Global step of the event.
    #[prost(int64, tag = "2")]
    pub step: i64,

    /// Present in the first record of every file.
    #[prost(string, optional, tag = "3")]
    pub file_version: Option<String>,

    /// Summary values recorded at this step.
    #[prost(message, optional, tag = "5")]
    pub summary: Option<Summary>,

    /// Session status changes.
    #[prost(message, optional, tag = "7")]
    pub session_log: Option<SessionLog>,
}

/// A set of tagged values.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Summary {
    /// Tagged values.
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<SummaryValue>,
}

/// One tagged value of a summary.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SummaryValue {
    /// Tag, e.g. `performance/tflops`.
    #[prost(string, tag = "1")]
    pub tag: String,

    /// Legacy scalar encoding.
    #[prost(float, optional, tag = "2")]
    pub simple_value: Option<f32>,

    /// Tensor encoding.
    #[prost(message, optional, tag = "8")]
    pub tensor: Option<TensorProto>,

    /// Plugin metadata, only sent with the first value of a tag.
    #[prost(message, optional, tag = "9")]
    pub metadata: Option<SummaryMetadata>,
}

/// Metadata attached to a summary value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SummaryMetadata {
    /// Plugin owning the value.
    #[prost(message, optional, tag = "1")]
    pub plugin_data: Option<PluginData>,
}

/// Plugin identification.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PluginData {
    /// Plugin name, `scalars` for scalar summaries.
    #[prost(string, tag = "1")]
    pub plugin_name: String,
}

/// The subset of `tensorflow.TensorProto` that can carry a scalar.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TensorProto {
    /// `tensorflow.DataType`.
    #[prost(int32, tag = "1")]
    pub dtype: i32,

    /// Raw little-endian content.
    #[prost(bytes = "vec", tag = "4")]
    pub tensor_content: Vec<u8>,

    /// Float values.
    #[prost(float, repeated, tag = "5")]
    pub float_val: Vec<f32>,

    /// Double values.
    #[prost(double, repeated, tag = "6")]
    pub double_val: Vec<f64>,
}

/// Session status change.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionLog {
    /// `SessionStatus`; `1` is `START`.
    #[prost(int32, tag = "1")]
    pub status: i32,
}

const DT_FLOAT: i32 = 1;
const DT_DOUBLE: i32 = 2;
const SESSION_START: i32 = 1;

impl TensorProto {
    /// The value of a single-element float or double tensor.
    pub fn scalar(&self) -> Option<f64> {
        match self.dtype {
            DT_FLOAT => match (self.float_val.as_slice(), self.tensor_content.len()) {
                (&[v], _) => Some(f64::from(v)),
                (&[], 4) => Some(f64::from(LittleEndian::read_f32(&self.tensor_content))),
                _ => None,
            },
            DT_DOUBLE => match (self.double_val.as_slice(), self.tensor_content.len()) {
                (&[v], _) => Some(v),
                (&[], 8) => Some(LittleEndian::read_f64(&self.tensor_content)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl SummaryValue {
    /// The scalar carried by this value, if it is one.
    pub fn scalar(&self) -> Option<f64> {
        match (self.simple_value, &self.tensor) {
            (Some(v), _) => Some(f64::from(v)),
            (None, &Some(ref t)) => t.scalar(),
            (None, &None) => None,
        }
    }
}

/// Scalar series of one run, keyed by tag.
#[derive(Debug, Default)]
pub struct EventLog {
    scalars: BTreeMap<String, MetricSeries>,
    most_recent_step: Option<i64>,
    file_version: Option<f64>,
}

/// Version number of a `brain.Event:<n>` string.
fn parse_file_version(version: &str) -> Option<f64> {
    version.rsplit(':').next().and_then(|v| v.trim().parse().ok())
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        EventLog::default()
    }

    /// Adds the events of `path`. Files of a run must be loaded in the order
    /// they were written.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path).chain_err(|| format!("failed to open {}", path.display()))?;
        self.load(BufReader::new(file))
            .chain_err(|| format!("failed to read {}", path.display()))
    }

    /// Adds the events of a record stream.
    pub fn load<R: Read>(&mut self, rdr: R) -> Result<()> {
        for record in RecordReader::new(rdr) {
            let event = Event::decode(record?.as_slice())?;
            self.add_event(event);
        }
        Ok(())
    }

    fn add_event(&mut self, event: Event) {
        if let Some(ref version) = event.file_version {
            debug!("event file version {}", version);
            self.file_version = parse_file_version(version);
        }

        if self.file_version.map_or(false, |v| v >= 2.0) {
            if let Some(ref session) = event.session_log {
                if session.status == SESSION_START {
                    self.purge(event.step, None);
                }
            }
        } else if let (Some(recent), Some(summary)) = (self.most_recent_step, &event.summary) {
            if event.step < recent {
                let tags = summary.value.iter().map(|v| v.tag.as_str()).collect::<Vec<_>>();
                self.purge(event.step, Some(&tags));
            }
        }

        let summary = match event.summary {
            Some(summary) => summary,
            None => return,
        };
        self.most_recent_step = Some(event.step);

        for value in &summary.value {
            match value.scalar() {
                Some(v) => self.scalars
                    .entry(value.tag.clone())
                    .or_insert_with(MetricSeries::new)
                    .push(event.step, v),
                None => trace!("skipping non-scalar value {}", value.tag),
            }
        }
    }

    /// Drops points at or after `step`, for `tags` or for every tag.
    fn purge(&mut self, step: i64, tags: Option<&[&str]>) {
        for (tag, series) in self.scalars.iter_mut() {
            if tags.map_or(true, |t| t.contains(&tag.as_str())) {
                let before = series.len();
                series.retain_before(step);
                if series.len() < before {
                    warn!(
                        "discarded {} orphaned points of {} at step >= {}",
                        before - series.len(),
                        tag,
                        step
                    );
                }
            }
        }
    }

    /// Tags that have scalar data.
    pub fn tags(&self) -> Vec<&str> {
        self.scalars.keys().map(|k| k.as_str()).collect()
    }

    /// The series recorded under `tag`.
    pub fn scalars(&self, tag: &str) -> Option<&MetricSeries> {
        self.scalars.get(tag)
    }
}
