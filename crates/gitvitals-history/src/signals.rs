//! Per-file signals derived from the working tree.

use std::path::Path;

/// File stems that usually mark an entry point or shared foundation.
const CRITICAL_STEMS: &[&str] = &[
    "main",
    "index",
    "app",
    "core",
    "base",
    "config",
    "__init__",
    "setup",
    "requirements",
];

/// Criticality weight given to files matching [`CRITICAL_STEMS`].
pub const CRITICAL_WEIGHT: f64 = 1.5;

/// Count non-blank lines in a file on disk.
///
/// Returns `None` if the file is missing or is not UTF-8 text.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use gitvitals_history::signals::count_lines;
///
/// let lines = count_lines(Path::new("src/main.rs"));
/// ```
pub fn count_lines(path: &Path) -> Option<usize> {
    let content = std::fs::read_to_string(path).ok()?;
    Some(content.lines().filter(|l| !l.trim().is_empty()).count())
}

/// Criticality weight inferred from a file's name.
///
/// # Examples
///
/// ```
/// use gitvitals_history::signals::path_criticality;
///
/// assert_eq!(path_criticality("src/main.rs"), 1.5);
/// assert_eq!(path_criticality("pkg/__init__.py"), 1.5);
/// assert_eq!(path_criticality("src/parser.rs"), 1.0);
/// ```
pub fn path_criticality(path: &str) -> f64 {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if CRITICAL_STEMS.contains(&stem.as_str()) {
        CRITICAL_WEIGHT
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_lines_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.rs");
        std::fs::write(&path, "fn a() {}\n\n   \nfn b() {}\n").unwrap();
        assert_eq!(count_lines(&path), Some(2));
    }

    #[test]
    fn count_lines_of_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(count_lines(&dir.path().join("nope.rs")), None);
    }

    #[test]
    fn criticality_ignores_case_and_directories() {
        assert_eq!(path_criticality("web/App.tsx"), CRITICAL_WEIGHT);
        assert_eq!(path_criticality("requirements.txt"), CRITICAL_WEIGHT);
        assert_eq!(path_criticality("core/parser.rs"), 1.0);
        assert_eq!(path_criticality("docs/mainline.md"), 1.0);
    }
}
