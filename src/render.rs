//! Text and Markdown rendering of analysis results.

use gitvitals_metrics::analyzers::{
    BranchLifecycleReport, BusFactorReport, CriticalFileReport, CycleTimeReport,
    FlowEfficiencyReport, KnowledgeDistributionReport, PhaseStats, SinglePointOfFailureReport,
    VelocityTrendReport,
};
use gitvitals_metrics::{AnalysisResult, MetricReport};

fn pct(share: f64) -> String {
    format!("{:.0}%", share * 100.0)
}

/// Plain-text report, one block per metric.
pub fn text(results: &[AnalysisResult], limit: usize) -> String {
    let mut out = String::new();
    for result in results {
        out.push_str(&format!(
            "{} [{}]\n",
            result.metric.title(),
            result.risk_level
        ));
        for line in details(&result.report, limit) {
            out.push_str(&format!("  {line}\n"));
        }
        if !result.recommendations.is_empty() {
            out.push_str("  Recommendations:\n");
            for rec in &result.recommendations {
                out.push_str(&format!("    - {rec}\n"));
            }
        }
        out.push('\n');
    }
    out
}

/// GitHub-flavored Markdown report.
pub fn markdown(results: &[AnalysisResult], limit: usize) -> String {
    let mut out = String::from("# Repository Health\n\n");
    if let Some(first) = results.first() {
        out.push_str(&format!("_As of {}_\n\n", first.as_of.to_rfc3339()));
        out.push_str("| Metric | Risk |\n|--------|------|\n");
        for result in results {
            out.push_str(&format!(
                "| {} | **{}** |\n",
                result.metric.title(),
                result.risk_level
            ));
        }
        out.push('\n');
    }

    for result in results {
        out.push_str(&format!(
            "## {}: {}\n\n",
            result.metric.title(),
            result.risk_level
        ));
        for line in details(&result.report, limit) {
            out.push_str(&format!("- {line}\n"));
        }
        if !result.recommendations.is_empty() {
            out.push_str("\n### Recommendations\n\n");
            for rec in &result.recommendations {
                out.push_str(&format!("- {rec}\n"));
            }
        }
        out.push('\n');
    }
    out
}

/// Key figures of a report as short lines.
fn details(report: &MetricReport, limit: usize) -> Vec<String> {
    match report {
        MetricReport::BusFactor(r) => bus_factor(r),
        MetricReport::KnowledgeDistribution(r) => knowledge_distribution(r, limit),
        MetricReport::CriticalFiles(r) => critical_files(r, limit),
        MetricReport::SinglePointOfFailure(r) => single_point_of_failure(r, limit),
        MetricReport::FlowEfficiency(r) => flow_efficiency(r, limit),
        MetricReport::BranchLifecycle(r) => branch_lifecycle(r),
        MetricReport::VelocityTrend(r) => velocity_trend(r),
        MetricReport::CycleTime(r) => cycle_time(r),
    }
}

fn bus_factor(r: &BusFactorReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Bus factor: {} of {} contributors hold {} of knowledge",
        r.bus_factor,
        r.total_contributors,
        pct(r.knowledge_threshold)
    )];
    for c in &r.covering_contributors {
        lines.push(format!("  {} ({})", c.contributor, pct(c.share)));
    }
    lines
}

fn knowledge_distribution(r: &KnowledgeDistributionReport, limit: usize) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Gini coefficient: {:.3} ({})",
            r.gini_coefficient, r.distribution_quality
        ),
        format!(
            "Top contributor {}, top 3 {}, bottom half {}",
            pct(r.top_contributor_share),
            pct(r.top3_share),
            pct(r.bottom_half_share)
        ),
    ];
    for c in r.per_contributor_share.iter().take(limit) {
        lines.push(format!("  {} ({})", c.contributor, pct(c.share)));
    }
    lines
}

fn critical_files(r: &CriticalFileReport, limit: usize) -> Vec<String> {
    let counts = &r.category_counts;
    let mut lines = vec![format!(
        "Files analyzed: {} (critical {}, high {}, medium {}, low {})",
        r.total_files_analyzed, counts.critical, counts.high, counts.medium, counts.low
    )];
    for f in r.critical_files.iter().take(limit) {
        lines.push(format!(
            "  {} score {:.2} {} ({} changes, complexity {:.0})",
            f.path, f.risk_score, f.category, f.change_frequency, f.complexity
        ));
    }
    lines
}

fn single_point_of_failure(r: &SinglePointOfFailureReport, limit: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "Flagged files: {} of {} ({} high criticality)",
        r.spof_files.len(),
        r.files_analyzed,
        r.high_criticality_count
    )];
    for f in r.spof_files.iter().take(limit) {
        let marker = if f.high_criticality { " [critical]" } else { "" };
        lines.push(format!(
            "  {}: {} ({}){marker}",
            f.path,
            f.dominant_contributor,
            pct(f.share)
        ));
    }
    for d in &r.multi_file_dominators {
        lines.push(format!("Sole expert on {} files: {}", d.files.len(), d.contributor));
    }
    lines
}

fn flow_efficiency(r: &FlowEfficiencyReport, limit: usize) -> Vec<String> {
    let (Some(aggregate), Some(band)) = (r.aggregate_efficiency, r.aggregate_band) else {
        return vec!["No branches measured".into()];
    };
    let mut lines = vec![format!(
        "Aggregate efficiency: {} ({band}) over {} branches",
        pct(aggregate),
        r.per_branch_efficiency.len()
    )];
    if let Some(median) = r.median_efficiency {
        lines.push(format!("Median efficiency: {}", pct(median)));
    }
    for b in r.per_branch_efficiency.iter().take(limit) {
        let state = if b.in_progress { ", open" } else { "" };
        lines.push(format!(
            "  {}: {} ({} active of {} days{state})",
            b.name,
            pct(b.efficiency),
            b.active_days,
            b.flow_days
        ));
    }
    if !r.bottlenecks.is_empty() {
        lines.push(format!("Bottlenecks: {}", r.bottlenecks.join(", ")));
    }
    lines
}

fn phase_line(name: &str, stats: Option<&PhaseStats>) -> Option<String> {
    let s = stats?;
    Some(format!(
        "{name}: mean {:.1}h, median {:.1}h, p90 {:.1}h",
        s.mean, s.median, s.p90
    ))
}

fn branch_lifecycle(r: &BranchLifecycleReport) -> Vec<String> {
    let Some(mean_days) = r.mean_total_days else {
        return vec!["No branches measured".into()];
    };
    let d = &r.delivery_patterns;
    let mut lines = vec![
        format!(
            "Branches: {} ({} open), mean lifetime {mean_days:.1} days",
            r.branches.len(),
            r.open_branches
        ),
        format!(
            "Delivery: {} fast, {} normal, {} slow",
            d.fast, d.normal, d.slow
        ),
    ];
    let stats = &r.aggregate_stats;
    lines.extend(
        [
            phase_line("Creation to first commit", stats.creation_to_first_commit.as_ref()),
            phase_line("Development", stats.development_duration.as_ref()),
            phase_line("Waiting for merge", stats.merge_duration.as_ref()),
        ]
        .into_iter()
        .flatten(),
    );
    lines
}

fn velocity_trend(r: &VelocityTrendReport) -> Vec<String> {
    let weekly: Vec<String> = r
        .weekly_counts
        .iter()
        .map(|w| w.commits.to_string())
        .collect();
    let mut lines = vec![
        format!(
            "Commits: {} ({:+.2}/week, confidence {})",
            r.commit_trend.direction, r.commit_trend.slope, r.commit_trend.confidence
        ),
        format!("Authors: {}", r.author_trend.direction),
        format!("Churn: {}", r.churn_trend.direction),
        format!("Weekly commits: {}", weekly.join(" ")),
    ];
    if let Some(next) = r.predicted_next_week {
        lines.push(format!("Predicted next week: {next:.1} commits"));
    }
    lines
}

fn cycle_time(r: &CycleTimeReport) -> Vec<String> {
    let (Some(mean), Some(p)) = (r.mean_days, &r.percentiles) else {
        return vec!["No merged branches in the window".into()];
    };
    let c = &r.categories;
    vec![
        format!(
            "Samples: {}, mean {mean:.1} days, std dev {:.1} days",
            r.samples.len(),
            r.std_dev_days
        ),
        format!(
            "p50 {:.1}d, p75 {:.1}d, p90 {:.1}d, p95 {:.1}d, p99 {:.1}d",
            p.p50, p.p75, p.p90, p.p95, p.p99
        ),
        format!(
            "Very fast {}, fast {}, normal {}, slow {}, very slow {}",
            c.very_fast, c.fast, c.normal, c.slow, c.very_slow
        ),
    ]
}
