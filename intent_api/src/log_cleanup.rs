// src/log_cleanup.rs

use chrono::{Datelike, NaiveDate};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Year and month encoded in a log file name of the form
/// `<prefix>.<YYYY-MM-DD>` or `<prefix>.<YYYY-MM-DD>.<suffix>`.
pub fn log_file_month(name: &str, prefix: &str) -> Option<(i32, u32)> {
    if name.len() < 4 {
        return None;
    }
    let rest = name.strip_prefix(prefix)?.strip_prefix('.')?;
    let date = rest.split('.').next()?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some((date.year(), date.month()))
}

/// Removes log files from months before `today`'s month. Returns the removed paths.
///
/// Files that don't follow the naming convention are left alone, and a missing
/// directory means there is nothing to clean.
pub fn clean_logs(dir: &Path, prefix: &str, today: NaiveDate) -> io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let current = (today.year(), today.month());
    let mut removed = Vec::new();

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(month) = log_file_month(&name.to_string_lossy(), prefix) else {
            continue;
        };
        if month >= current {
            continue;
        }

        let path = entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("removed stale log file {}", path.display());
                removed.push(path);
            }
            // Raced with another request's cleanup.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove log file {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_dated_names() {
        assert_eq!(log_file_month("intent.2026-10-19.log", "intent"), Some((2026, 10)));
        assert_eq!(log_file_month("intent.2025-01-02", "intent"), Some((2025, 1)));
    }

    #[test]
    fn ignores_foreign_names() {
        assert_eq!(log_file_month("log", "intent"), None);
        assert_eq!(log_file_month("intent", "intent"), None);
        assert_eq!(log_file_month("intent.log", "intent"), None);
        assert_eq!(log_file_month("other.2026-10-19.log", "intent"), None);
        assert_eq!(log_file_month("intent.2026-13-01.log", "intent"), None);
        assert_eq!(log_file_month("intent2026-10-19.log", "intent"), None);
    }

    #[test]
    fn removes_only_earlier_months() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "intent.2026-10-01.log");
        touch(dir.path(), "intent.2026-10-19.log");
        touch(dir.path(), "intent.2026-09-30.log");
        touch(dir.path(), "intent.2025-12-31.log");
        touch(dir.path(), "intent.2025-11-05.log");
        touch(dir.path(), "notes.txt");

        let mut removed: Vec<String> = clean_logs(dir.path(), "intent", date(2026, 10, 19))
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        removed.sort();

        assert_eq!(
            removed,
            vec![
                "intent.2025-11-05.log",
                "intent.2025-12-31.log",
                "intent.2026-09-30.log"
            ]
        );
        assert!(dir.path().join("intent.2026-10-01.log").exists());
        assert!(dir.path().join("intent.2026-10-19.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn december_files_go_in_january() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "intent.2025-12-31.log");
        let removed = clean_logs(dir.path(), "intent", date(2026, 1, 1)).unwrap();
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn skips_directories_with_dated_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("intent.2020-01-01")).unwrap();
        let removed = clean_logs(dir.path(), "intent", date(2026, 10, 19)).unwrap();
        assert!(removed.is_empty());
        assert!(dir.path().join("intent.2020-01-01").is_dir());
    }

    #[test]
    fn missing_dir_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let removed = clean_logs(&dir.path().join("nope"), "intent", date(2026, 10, 19)).unwrap();
        assert!(removed.is_empty());
    }
}
