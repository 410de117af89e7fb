mod render;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gitvitals_core::{OutputFormat, RiskLevel, VitalsConfig, DEFAULT_CONFIG_FILE};
use gitvitals_history::GitHistory;
use gitvitals_metrics::{create_analyzer, AnalysisResult, MetricKind};

#[derive(Parser)]
#[command(
    name = "gitvitals",
    version,
    about = "Repository health metrics from git history",
    long_about = "gitvitals reads a repository's commit and branch history and reports\n\
                   knowledge risk (bus factor, knowledge spread, critical files, single\n\
                   points of failure) and delivery flow (flow efficiency, branch lifecycle,\n\
                   velocity trend, cycle time).\n\n\
                   Examples:\n  \
                     gitvitals analyze                       Run every metric on the current repo\n  \
                     gitvitals analyze --metric bus_factor   Run one metric\n  \
                     gitvitals analyze --format json         Machine-readable output\n  \
                     gitvitals metrics                       List available metrics\n  \
                     gitvitals init                          Write a default .gitvitals.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .gitvitals.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compute health metrics for a repository
    #[command(long_about = "Compute health metrics for a repository.\n\n\
        Mines the history with git2 and runs the selected metrics (all by default)\n\
        as seen at --as-of (default: now).\n\n\
        Examples:\n  gitvitals analyze --path .\n  gitvitals analyze --metric cycle_time --branch-pattern 'feat/*'\n  \
        gitvitals analyze --as-of 2024-06-01T00:00:00Z --lookback-months 3\n  gitvitals analyze --fail-on high")]
    Analyze {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Metric to run; repeat for several (default: all)
        #[arg(long)]
        metric: Vec<String>,

        /// Instant to analyze at, RFC 3339 (default: now)
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<DateTime<Utc>>,

        /// Override the lookback window of every windowed metric
        #[arg(long)]
        lookback_months: Option<u32>,

        /// Branch glob for branch-based metrics; repeat for several
        #[arg(long)]
        branch_pattern: Vec<String>,

        /// Maximum rows per list in text and markdown output (default: 10)
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Exit with code 1 if any metric is at or above this risk level
        #[arg(
            long,
            long_help = "Exit with non-zero code if any metric reaches this risk level.\n\n\
                Ranking: critical > high > medium > low. UNKNOWN never fails the run.\n\
                Useful in CI pipelines."
        )]
        fail_on: Option<RiskLevel>,
    },
    /// List available metrics
    Metrics,
    /// Create a default .gitvitals.toml configuration file
    #[command(long_about = "Create a default .gitvitals.toml configuration file.\n\n\
        Generates a commented template with every option and its default.\n\
        Fails if .gitvitals.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn parse_as_of(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp like 2024-06-01T00:00:00Z: {e}"))
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!("gitvitals v{version}: repository health from git history\n");
    println!("Quick start:");
    println!("  gitvitals init                Create a .gitvitals.toml config file");
    println!("  gitvitals analyze             Run every metric on the current repository");
    println!("  gitvitals metrics             List available metrics\n");
    println!("Run 'gitvitals <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<VitalsConfig> {
    match path {
        Some(path) => Ok(VitalsConfig::from_file(path)?),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Ok(VitalsConfig::from_file(default_path)?)
            } else {
                Ok(VitalsConfig::default())
            }
        }
    }
}

/// Parse `--metric` values in order, dropping repeats; empty means all.
fn resolve_metrics(names: &[String]) -> Result<Vec<MetricKind>> {
    if names.is_empty() {
        return Ok(MetricKind::ALL.to_vec());
    }
    let mut kinds: Vec<MetricKind> = Vec::new();
    for name in names {
        let kind: MetricKind = name.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn spinner(message: &str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn run_metrics(
    history: &GitHistory,
    kinds: &[MetricKind],
    config: &VitalsConfig,
    as_of: DateTime<Utc>,
) -> Result<Vec<AnalysisResult>> {
    // Kinds are already deduplicated, so a `ResultCache` would never hit here.
    let progress = spinner("Mining git history...");
    let mut results = Vec::with_capacity(kinds.len());

    for kind in kinds {
        if let Some(pb) = &progress {
            pb.set_message(format!("Computing {}...", kind.title()));
        }
        let analyzer = create_analyzer(*kind, history);
        let result = analyzer
            .calculate(&config.metrics, as_of)
            .inspect_err(|_| {
                if let Some(pb) = &progress {
                    pb.finish_with_message("Failed");
                }
            })?;
        results.push(result);
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    Ok(results)
}

const DEFAULT_CONFIG: &str = r#"# gitvitals configuration
# See: https://github.com/Meru143/gitvitals

[history]
# max_files_per_commit = 25
# main_branch = "main"
# include_remote_branches = false

[metrics.bus_factor]
# lookback_months = 6
# knowledge_threshold = 0.8
# decay_half_life_days = 90.0

[metrics.knowledge_distribution]
# lookback_months = 6
# decay_half_life_days = 90.0

[metrics.critical_files]
# lookback_months = 6
# critical_percentile = 0.9
# high_percentile = 0.65
# medium_percentile = 0.4

[metrics.single_point_of_failure]
# lookback_months = 6
# decay_half_life_days = 90.0
# dominance_threshold = 0.8
# max_contributors = 2

[metrics.flow_efficiency]
# branch_patterns = ["feature/*", "bugfix/*", "hotfix/*"]

[metrics.branch_lifecycle]
# branch_patterns = ["feature/*", "bugfix/*", "hotfix/*"]
# include_open = true

[metrics.velocity_trend]
# weeks_lookback = 12
# min_t_statistic = 2.0

[metrics.cycle_time]
# branch_patterns = ["feature/*", "bugfix/*", "hotfix/*"]
# lookback_months = 6
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        None => print_welcome(),
        Some(Command::Analyze {
            ref path,
            ref metric,
            as_of,
            lookback_months,
            ref branch_pattern,
            limit,
            fail_on,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(months) = lookback_months {
                config.metrics.set_lookback_months(months);
            }
            if !branch_pattern.is_empty() {
                config.metrics.set_branch_patterns(branch_pattern.clone());
            }
            config.validate()?;
            let kinds = resolve_metrics(metric)?;
            let as_of = as_of.unwrap_or_else(Utc::now);

            let history = GitHistory::open(path, &config.history).map_err(|e| {
                miette::miette!(
                    help = "Run gitvitals from inside a git repository, or specify --path to one",
                    "cannot read repository at {}: {e}",
                    path.display()
                )
            })?;
            tracing::debug!(path = %path.display(), %as_of, metrics = kinds.len(), "analyzing");

            let results = run_metrics(&history, &kinds, &config, as_of)?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&results).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => print!("{}", render::markdown(&results, limit)),
                OutputFormat::Text => print!("{}", render::text(&results, limit)),
            }

            if let Some(threshold) = fail_on {
                if results.iter().any(|r| r.risk_level.is_at_least(threshold)) {
                    std::process::exit(1);
                }
            }
        }
        Some(Command::Metrics) => match cli.format {
            OutputFormat::Json => {
                let list: Vec<serde_json::Value> = MetricKind::ALL
                    .iter()
                    .map(|kind| {
                        serde_json::json!({
                            "name": kind.name(),
                            "title": kind.title(),
                            "description": kind.description(),
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&list).into_diagnostic()?
                );
            }
            OutputFormat::Markdown => {
                println!("| Metric | Description |");
                println!("|--------|-------------|");
                for kind in MetricKind::ALL {
                    println!("| `{}` | {} |", kind.name(), kind.description());
                }
            }
            OutputFormat::Text => {
                for kind in MetricKind::ALL {
                    println!("{:<26}{}", kind.name(), kind.description());
                }
            }
        },
        Some(Command::Init) => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                miette::bail!("{DEFAULT_CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {DEFAULT_CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "gitvitals", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses_to_defaults() {
        let config = VitalsConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.metrics, gitvitals_core::MetricsConfig::default());
    }

    #[test]
    fn metrics_resolve_in_order_without_repeats() {
        let names = vec![
            "cycle_time".to_string(),
            "bus-factor".to_string(),
            "cycle_time".to_string(),
        ];
        assert_eq!(
            resolve_metrics(&names).unwrap(),
            vec![MetricKind::CycleTime, MetricKind::BusFactor]
        );
        assert_eq!(resolve_metrics(&[]).unwrap().len(), 8);
        assert!(resolve_metrics(&["vibes".to_string()]).is_err());
    }

    #[test]
    fn as_of_accepts_offsets() {
        let t = parse_as_of("2024-06-01T02:00:00+02:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert!(parse_as_of("yesterday").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
