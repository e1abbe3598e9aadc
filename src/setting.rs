//! Analysis settings in TOML. Every field is optional in the file.

use crate::errors::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use toml;

/// The analysis setting.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Setting {
    /// Directory under which each invocation creates its timestamped
    /// output directory.
    pub output_root: String,

    /// File name prefix identifying event files.
    pub event_prefix: String,

    /// Plot width in pixels.
    pub plot_width: u32,

    /// Plot height in pixels.
    pub plot_height: u32,
}

impl Default for Setting {
    fn default() -> Self {
        Setting {
            output_root: "data".to_string(),
            event_prefix: super::EVENT_FILE_PREFIX.to_string(),
            plot_width: 1200,
            plot_height: 800,
        }
    }
}

impl Setting {
    /// Initialize from a file.
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Setting> {
        let mut file = File::open(path.as_ref())
            .chain_err(|| format!("failed to open setting {:?}", path.as_ref()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Setting::parse(&contents)
    }

    /// Parses settings from TOML text.
    pub fn parse(contents: &str) -> Result<Setting> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_setting_keeps_defaults() {
        let setting = Setting::parse("output_root = \"out\"\nplot_width = 640\n").unwrap();
        assert_eq!(setting.output_root, "out");
        assert_eq!(setting.plot_width, 640);
        assert_eq!(setting.plot_height, 800);
        assert_eq!(setting.event_prefix, "events.out.tfevents");
    }

    #[test]
    fn empty_setting_is_default() {
        assert_eq!(Setting::parse("").unwrap(), Setting::default());
    }

    #[test]
    fn bad_type_is_rejected() {
        assert!(Setting::parse("plot_width = \"wide\"").is_err());
    }
}
