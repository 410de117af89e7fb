use std::path::PathBuf;

use miette::Diagnostic;

/// Errors that can occur across gitvitals.
///
/// Library crates use this type directly; the binary crate reports it
/// through `miette` at the boundary.
///
/// Small or empty histories are never an error: analyzers return a
/// degenerate result with an `UNKNOWN` risk level instead.
///
/// # Examples
///
/// ```
/// use gitvitals_core::VitalsError;
///
/// let err = VitalsError::invalid_option("bus_factor.knowledge_threshold", "must be in (0, 1]");
/// assert!(err.to_string().contains("knowledge_threshold"));
/// ```
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum VitalsError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An analyzer option lies outside its documented domain.
    #[error("invalid option `{option}`: {reason}")]
    #[diagnostic(
        code(gitvitals::invalid_option),
        help("check the [metrics] section of .gitvitals.toml or the matching CLI flag")
    )]
    InvalidOption {
        /// Dotted option name, e.g. `bus_factor.lookback_months`.
        option: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A metric name that is not in the registry.
    #[error("unknown metric '{name}'")]
    #[diagnostic(code(gitvitals::unknown_metric), help("available metrics: {available}"))]
    UnknownMetric {
        /// The name that failed to resolve.
        name: String,
        /// Comma-separated list of registered metric names.
        available: String,
    },

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A configuration file passed explicitly does not exist.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(
        code(gitvitals::file_not_found),
        help("run `gitvitals init` to create a default .gitvitals.toml")
    )]
    FileNotFound(PathBuf),
}

impl VitalsError {
    /// Shorthand for [`VitalsError::InvalidOption`].
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: VitalsError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn invalid_option_names_the_option() {
        let err = VitalsError::invalid_option("velocity_trend.weeks_lookback", "must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid option `velocity_trend.weeks_lookback`: must be > 0"
        );
    }

    #[test]
    fn unknown_metric_help_lists_available() {
        let err = VitalsError::UnknownMetric {
            name: "happiness".into(),
            available: "bus_factor, cycle_time".into(),
        };
        assert_eq!(err.to_string(), "unknown metric 'happiness'");
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("bus_factor"));
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = VitalsError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }
}
