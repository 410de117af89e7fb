use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Categorical risk classification shared by every analyzer.
///
/// `Unknown` marks a degenerate result: the history held too little data
/// for the metric to say anything.
///
/// # Examples
///
/// ```
/// use gitvitals_core::RiskLevel;
///
/// let level: RiskLevel = serde_json::from_str("\"CRITICAL\"").unwrap();
/// assert_eq!(level, RiskLevel::Critical);
/// assert!(RiskLevel::Critical.is_at_least(RiskLevel::High));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Healthy.
    Low,
    /// Worth watching.
    Medium,
    /// Needs attention soon.
    High,
    /// Needs attention now.
    Critical,
    /// Not enough data to judge.
    Unknown,
}

impl RiskLevel {
    /// Returns `true` if `self` is at least as severe as `threshold`.
    ///
    /// `Unknown` never meets a threshold and nothing meets an `Unknown`
    /// threshold.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitvitals_core::RiskLevel;
    ///
    /// assert!(RiskLevel::High.is_at_least(RiskLevel::Medium));
    /// assert!(!RiskLevel::Low.is_at_least(RiskLevel::Medium));
    /// assert!(!RiskLevel::Unknown.is_at_least(RiskLevel::Low));
    /// ```
    pub fn is_at_least(self, threshold: RiskLevel) -> bool {
        match (self.rank(), threshold.rank()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }

    fn rank(self) -> Option<u8> {
        match self {
            RiskLevel::Low => Some(0),
            RiskLevel::Medium => Some(1),
            RiskLevel::High => Some(2),
            RiskLevel::Critical => Some(3),
            RiskLevel::Unknown => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
            RiskLevel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            "unknown" => Ok(RiskLevel::Unknown),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use gitvitals_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
