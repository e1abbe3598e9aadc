//! Recovers a run's parallelism configuration from its path.
//!
//! Training jobs encode their configuration in the run directory name, e.g.
//! `z2_tp2_pp1_dp4_sp1_mbsz8_gpt`. Each field is a marker (`tp`, `pp`, ...)
//! immediately followed by an unsigned integer and terminated by `_`, a path
//! separator or the end of the string.

use crate::errors::*;
use std::fmt;

/// ZeRO optimizer partitioning level.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum ZeroStage {
    /// Optimizer states partitioned.
    One,
    /// Optimizer states and gradients partitioned.
    Two,
    /// Optimizer states, gradients and parameters partitioned.
    Three,
}

impl ZeroStage {
    /// Numeric stage as used in directory names.
    pub fn as_u8(self) -> u8 {
        match self {
            ZeroStage::One => 1,
            ZeroStage::Two => 2,
            ZeroStage::Three => 3,
        }
    }

    /// Scans `path` for `z1`, `z2` and `z3` in that order; the first one
    /// present at the start of a field wins. Defaults to stage 1.
    pub fn from_path(path: &str) -> ZeroStage {
        let stages = [
            ("z1", ZeroStage::One),
            ("z2", ZeroStage::Two),
            ("z3", ZeroStage::Three),
        ];
        stages
            .iter()
            .find(|&&(token, _)| {
                // `mbsz16` and `gbsz16` carry a `z1` in the middle of a field
                path.match_indices(token)
                    .any(|(i, _)| path[..i].chars().next_back().map_or(true, is_delimiter))
            })
            .map(|&(_, stage)| stage)
            .unwrap_or(ZeroStage::One)
    }
}

impl Default for ZeroStage {
    fn default() -> Self {
        ZeroStage::One
    }
}

impl fmt::Display for ZeroStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A required `<token><value>` field of the path grammar.
struct Marker {
    token: &'static str,
}

const TENSOR_PARALLEL: Marker = Marker { token: "tp" };
const PIPELINE_PARALLEL: Marker = Marker { token: "pp" };
const DATA_PARALLEL: Marker = Marker { token: "dp" };
const SEQUENCE_PARALLEL: Marker = Marker { token: "sp" };
const MICRO_BATCH: Marker = Marker { token: "mbsz" };

#[inline]
fn is_delimiter(c: char) -> bool {
    c == '_' || c == '/' || c == '\\'
}

impl Marker {
    /// Returns the raw text after the first occurrence of the token that is
    /// followed by a digit, up to the next delimiter.
    fn raw_value<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.match_indices(self.token)
            .map(|(i, _)| &path[i + self.token.len()..])
            .find(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            .map(|rest| {
                let end = rest.find(is_delimiter).unwrap_or_else(|| rest.len());
                &rest[..end]
            })
    }

    fn parse(&self, path: &str) -> Result<u32> {
        match self.raw_value(path) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ErrorKind::InvalidMarkerValue(self.token.to_string(), raw.to_string()).into()
            }),
            None => Err(ErrorKind::MissingMarker(self.token.to_string(), path.to_string()).into()),
        }
    }
}

/// Parallelism configuration of one training run. Derived once per run path.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct RunConfiguration {
    /// ZeRO stage.
    pub zero_stage: ZeroStage,

    /// Tensor parallel degree.
    pub tensor_parallel: u32,

    /// Pipeline parallel degree.
    pub pipeline_parallel: u32,

    /// Data parallel degree.
    pub data_parallel: u32,

    /// Sequence parallel degree.
    pub sequence_parallel: u32,

    /// Micro batch size.
    pub micro_batch_size: u32,
}

/// Extracts the run configuration from a run path. Fails when any of the
/// `tp`, `pp`, `dp`, `sp` or `mbsz` markers is missing.
pub fn extract_params_from_path(path: &str) -> Result<RunConfiguration> {
    Ok(RunConfiguration {
        zero_stage: ZeroStage::from_path(path),
        tensor_parallel: TENSOR_PARALLEL.parse(path)?,
        pipeline_parallel: PIPELINE_PARALLEL.parse(path)?,
        data_parallel: DATA_PARALLEL.parse(path)?,
        sequence_parallel: SEQUENCE_PARALLEL.parse(path)?,
        micro_batch_size: MICRO_BATCH.parse(path)?,
    })
}

impl RunConfiguration {
    /// Creates a new `RunConfiguration`.
    pub fn new(zero_stage: ZeroStage, tp: u32, pp: u32, dp: u32, sp: u32, mbsz: u32) -> Self {
        RunConfiguration {
            zero_stage: zero_stage,
            tensor_parallel: tp,
            pipeline_parallel: pp,
            data_parallel: dp,
            sequence_parallel: sp,
            micro_batch_size: mbsz,
        }
    }

    /// Appends the configuration to a file name, before its extension:
    /// `tflops_run.csv` becomes `tflops_run_z1_tp2_pp1_dp4_sp1_mbsz8.csv`.
    pub fn file_name(&self, base: &str) -> String {
        let (stem, ext) = match base.rfind('.') {
            Some(i) if i > 0 => base.split_at(i),
            _ => (base, ""),
        };
        format!("{}_{}{}", stem, self, ext)
    }
}

impl fmt::Display for RunConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "z{}_tp{}_pp{}_dp{}_sp{}_mbsz{}",
            self.zero_stage,
            self.tensor_parallel,
            self.pipeline_parallel,
            self.data_parallel,
            self.sequence_parallel,
            self.micro_batch_size
        )
    }
}
