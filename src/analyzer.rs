//! Analyzers decide how a run is labelled in plots and named in CSV exports.
//! The analyzer is picked by name on the command line.

use crate::errors::*;
use regex::Regex;

/// Display label and CSV file name fragment of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunNames {
    /// Legend label.
    pub label: String,

    /// Fragment inserted into exported CSV file names.
    pub csv_name: String,
}

/// The strategy that names runs.
pub trait Analyzer {
    /// Derives names for the run at `path`.
    fn names(&self, path: &str) -> Result<RunNames>;
}

/// Names runs of the universal checkpointing experiments by their tensor,
/// pipeline, data and sequence parallel degrees.
pub struct UniversalCheckpointing {
    pattern: Regex,
}

const UC_PATTERN: &str = r".*tp(\d+).*pp(\d+).*dp(\d+).*sp(\d+)";

impl UniversalCheckpointing {
    /// Creates the analyzer.
    pub fn new() -> Result<Self> {
        Ok(UniversalCheckpointing { pattern: Regex::new(UC_PATTERN)? })
    }
}

impl Analyzer for UniversalCheckpointing {
    fn names(&self, path: &str) -> Result<RunNames> {
        let caps = self.pattern.captures(path).ok_or_else(|| {
            Error::from_kind(ErrorKind::PathMismatch(path.to_string(), UC_PATTERN.to_string()))
        })?;
        let (tp, pp, dp, sp) = (&caps[1], &caps[2], &caps[3], &caps[4]);
        Ok(RunNames {
            label: format!("Training Run: TP: {}, PP: {}, DP: {}", tp, pp, dp),
            csv_name: format!("uc_out_tp_{}_pp_{}_dp_{}_sp_{}", tp, pp, dp, sp),
        })
    }
}

/// Returns the analyzer registered under `name`.
pub fn get_analyzer(name: &str) -> Result<Box<dyn Analyzer>> {
    match name {
        "universal_checkpointing" => Ok(Box::new(UniversalCheckpointing::new()?)),
        _ => bail!(ErrorKind::UnknownAnalyzer(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universal_checkpointing_names() {
        let analyzer = get_analyzer("universal_checkpointing").unwrap();
        let names = analyzer.names("/logs/z1_tp2_pp1_dp4_sp1_mbsz8_run").unwrap();
        assert_eq!(names.label, "Training Run: TP: 2, PP: 1, DP: 4");
        assert_eq!(names.csv_name, "uc_out_tp_2_pp_1_dp_4_sp_1");
    }

    #[test]
    fn mismatch_is_reported() {
        let analyzer = UniversalCheckpointing::new().unwrap();
        match analyzer.names("/logs/baseline") {
            Err(Error(ErrorKind::PathMismatch(path, _), _)) => assert_eq!(path, "/logs/baseline"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_analyzer() {
        assert!(get_analyzer("loss_curves").is_err());
    }
}
