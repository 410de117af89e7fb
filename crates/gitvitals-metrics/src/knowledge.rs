//! Recency-weighted contributor × file knowledge matrix.
//!
//! Every commit in the window adds
//! `decay(age) · complexity(f) · criticality(f) · lines_touched(f)` to the
//! weight of its author on each file it touches, where
//! `decay(age) = 0.5 ^ (age_days / half_life_days)`. Storage uses ordered
//! maps so iteration and floating-point summation order are deterministic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gitvitals_history::{Commit, Contributor, HistoryFeed};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// One cell of the knowledge matrix.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::knowledge::KnowledgeWeight;
///
/// let cell = KnowledgeWeight {
///     contributor: "alice@example.com".into(),
///     path: "src/lib.rs".into(),
///     weight: 12.5,
/// };
/// assert!(cell.weight >= 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeWeight {
    /// Contributor identity key.
    pub contributor: Contributor,
    /// File path relative to repo root.
    pub path: String,
    /// Accumulated, decayed contribution (≥ 0).
    pub weight: f64,
}

/// Weighted contributor × file matrix for one analysis window.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeModel {
    by_contributor: BTreeMap<Contributor, BTreeMap<String, f64>>,
    by_file: BTreeMap<String, BTreeMap<Contributor, f64>>,
}

impl KnowledgeModel {
    /// Build the matrix from `commits` as seen at `as_of`.
    ///
    /// Commits after `as_of` are ignored. Per-file complexity and
    /// criticality come from `feed`, defaulting to 1.0.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, TimeZone, Utc};
    /// use gitvitals_history::{ChangeStatus, Commit, Contributor, FileChange, MemoryHistory};
    /// use gitvitals_metrics::KnowledgeModel;
    ///
    /// let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    /// let commit = Commit {
    ///     hash: "a".into(),
    ///     author: "alice".into(),
    ///     email: "alice@example.com".into(),
    ///     timestamp: as_of - Duration::days(90),
    ///     message: "work".into(),
    ///     files_changed: vec![FileChange {
    ///         path: "lib.rs".into(),
    ///         lines_added: 8,
    ///         lines_deleted: 2,
    ///         status: ChangeStatus::Modified,
    ///     }],
    /// };
    /// let model = KnowledgeModel::build(&[commit], as_of, 90.0, &MemoryHistory::new());
    /// let alice = Contributor::from("alice@example.com");
    /// // one half-life old: 10 lines count as 5
    /// assert!((model.weight(&alice, "lib.rs") - 5.0).abs() < 1e-9);
    /// ```
    pub fn build(
        commits: &[Commit],
        as_of: DateTime<Utc>,
        half_life_days: f64,
        feed: &dyn HistoryFeed,
    ) -> Self {
        let mut model = Self::default();
        let mut factors: BTreeMap<String, f64> = BTreeMap::new();

        for commit in commits {
            if commit.timestamp > as_of {
                continue;
            }
            let age_days = (as_of - commit.timestamp).num_milliseconds() as f64 / MILLIS_PER_DAY;
            let decay = 0.5f64.powf(age_days / half_life_days);
            let contributor = commit.contributor();

            for file in &commit.files_changed {
                let factor = *factors.entry(file.path.clone()).or_insert_with(|| {
                    sanitize_factor("complexity", &file.path, feed.complexity(&file.path))
                        * sanitize_factor("criticality", &file.path, feed.criticality(&file.path))
                });
                let contribution = decay * factor * file.lines_touched() as f64;
                model.add(contributor.clone(), &file.path, contribution);
            }
        }

        debug!(
            contributors = model.contributor_count(),
            files = model.file_count(),
            "built knowledge model"
        );
        model
    }

    /// Build the matrix directly from precomputed cells.
    ///
    /// Repeated (contributor, path) pairs are summed. Negative or
    /// non-finite weights are dropped with a warning.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitvitals_history::Contributor;
    /// use gitvitals_metrics::KnowledgeModel;
    ///
    /// let model = KnowledgeModel::from_weights(vec![
    ///     (Contributor::from("a"), "x.rs".to_string(), 3.0),
    ///     (Contributor::from("a"), "x.rs".to_string(), 1.0),
    ///     (Contributor::from("b"), "y.rs".to_string(), 4.0),
    /// ]);
    /// assert_eq!(model.contributor_total(&Contributor::from("a")), 4.0);
    /// assert_eq!(model.total_knowledge(), 8.0);
    /// ```
    pub fn from_weights(cells: impl IntoIterator<Item = (Contributor, String, f64)>) -> Self {
        let mut model = Self::default();
        for (contributor, path, weight) in cells {
            if !weight.is_finite() || weight < 0.0 {
                warn!(%contributor, %path, weight, "dropping invalid knowledge weight");
                continue;
            }
            model.add(contributor, &path, weight);
        }
        model
    }

    fn add(&mut self, contributor: Contributor, path: &str, amount: f64) {
        *self
            .by_file
            .entry(path.to_string())
            .or_default()
            .entry(contributor.clone())
            .or_default() += amount;
        *self
            .by_contributor
            .entry(contributor)
            .or_default()
            .entry(path.to_string())
            .or_default() += amount;
    }

    /// Weight of `contributor` on `path`, 0 if they never touched it.
    pub fn weight(&self, contributor: &Contributor, path: &str) -> f64 {
        self.by_contributor
            .get(contributor)
            .and_then(|files| files.get(path))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of a contributor's weights over every file.
    pub fn contributor_total(&self, contributor: &Contributor) -> f64 {
        self.by_contributor
            .get(contributor)
            .map_or(0.0, |files| files.values().sum())
    }

    /// Sum of every contributor's weight on `path`.
    pub fn file_total(&self, path: &str) -> f64 {
        self.by_file
            .get(path)
            .map_or(0.0, |contributors| contributors.values().sum())
    }

    /// Sum of every weight in the matrix.
    pub fn total_knowledge(&self) -> f64 {
        self.by_contributor
            .keys()
            .map(|c| self.contributor_total(c))
            .sum()
    }

    /// Contributors with their totals, descending by total, ties by identity.
    pub fn ranked_contributors(&self) -> Vec<(Contributor, f64)> {
        let mut ranked: Vec<(Contributor, f64)> = self
            .by_contributor
            .keys()
            .map(|c| (c.clone(), self.contributor_total(c)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Per-file contributor shares of the file's total weight.
    ///
    /// Files with zero total weight are omitted. Within a file, shares are
    /// sorted descending, ties by identity.
    pub fn file_shares(&self) -> BTreeMap<String, Vec<(Contributor, f64)>> {
        let mut shares = BTreeMap::new();
        for (path, contributors) in &self.by_file {
            let total: f64 = contributors.values().sum();
            if total <= 0.0 {
                continue;
            }
            let mut row: Vec<(Contributor, f64)> = contributors
                .iter()
                .map(|(c, w)| (c.clone(), w / total))
                .collect();
            row.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            shares.insert(path.clone(), row);
        }
        shares
    }

    /// Every cell of the matrix, ordered by contributor then path.
    pub fn triples(&self) -> Vec<KnowledgeWeight> {
        self.by_contributor
            .iter()
            .flat_map(|(contributor, files)| {
                files.iter().map(move |(path, weight)| KnowledgeWeight {
                    contributor: contributor.clone(),
                    path: path.clone(),
                    weight: *weight,
                })
            })
            .collect()
    }

    /// Number of distinct contributors.
    pub fn contributor_count(&self) -> usize {
        self.by_contributor.len()
    }

    /// Number of distinct files.
    pub fn file_count(&self) -> usize {
        self.by_file.len()
    }

    /// Whether the matrix has no cells.
    pub fn is_empty(&self) -> bool {
        self.by_contributor.is_empty()
    }
}

/// Replace a missing, negative or non-finite factor with 1.0.
pub(crate) fn sanitize_factor(kind: &str, path: &str, value: Option<f64>) -> f64 {
    match value {
        None => 1.0,
        Some(v) if v.is_finite() && v >= 0.0 => v,
        Some(v) => {
            warn!(%path, value = v, "invalid {kind} factor, using 1.0");
            1.0
        }
    }
}
