//! Error types for tb-analysis.
#![allow(missing_docs)]

/// Creates the Error, ErrorKind, ResultExt, and Result types
error_chain! {
    errors {
        /// A required marker (`tp`, `pp`, ...) is absent from a run path.
        MissingMarker(marker: String, path: String) {
            description("missing configuration marker in run path")
            display("no `{}` marker followed by a value in path {}", marker, path)
        }
        /// A marker is followed by something that is not an unsigned integer.
        InvalidMarkerValue(marker: String, value: String) {
            description("configuration marker carries a non-numeric value")
            display("`{}` marker has invalid value {:?}", marker, value)
        }
        /// An event file record failed framing or checksum validation.
        CorruptRecord(offset: u64, reason: &'static str) {
            description("corrupted record in event file")
            display("corrupted record at byte {}: {}", offset, reason)
        }
        /// No analyzer is registered under the requested name.
        UnknownAnalyzer(name: String) {
            description("unknown analyzer")
            display("unknown analyzer {:?}", name)
        }
        /// A run path does not match the analyzer's pattern.
        PathMismatch(path: String, pattern: String) {
            description("path does not match the analyzer pattern")
            display("path ({}) did not match regex ({})", path, pattern)
        }
        /// The plotting backend reported an error.
        Plot(t: String) {
            description("error in rendering a plot")
            display("plotting failed: {}", t)
        }
    }

    foreign_links {
        Io(::std::io::Error);
        Csv(::csv::Error);
        Decode(::prost::DecodeError);
        Walk(::walkdir::Error);
        Toml(::toml::de::Error);
        Regex(::regex::Error);
        ParseInt(::std::num::ParseIntError);
        ParseFloat(::std::num::ParseFloatError);
    }
}
