//! Command implementations.

pub mod analytics;
pub mod backlog;
pub mod board;
pub mod column;
pub mod completions;
pub mod doctor;
pub mod init;
pub mod item;
pub mod task;
pub mod transfer;
pub mod version;
pub mod workspace;

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::config::{StoreConfig, default_actor, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::{Store, initialize};

/// Resolve the database path and require that it exists.
pub(crate) fn require_db_path(db_path: Option<&PathBuf>) -> Result<PathBuf> {
    let path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;
    if !path.exists() {
        return Err(Error::NotInitialized);
    }
    Ok(path)
}

/// Open the database within the configured sync timeout.
///
/// A command can't do useful work on a throwaway in-memory store, so the
/// startup fallback surfaces here as the error that caused it.
pub(crate) fn open_store(db_path: Option<&PathBuf>, actor: &str) -> Result<Store> {
    let path = require_db_path(db_path)?;
    let config = StoreConfig::from_env()?;
    let rt = tokio::runtime::Runtime::new()?;
    let startup = rt.block_on(initialize(Some(path), &config, actor))?;
    match startup.error {
        Some(err) => Err(err),
        None => Ok(startup.store),
    }
}

/// The explicit actor, or the configured default.
pub fn resolve_actor(actor: Option<&str>) -> String {
    actor.map(ToString::to_string).unwrap_or_else(default_actor)
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Parse `YYYY-MM-DD` as midnight UTC in Unix milliseconds.
pub(crate) fn parse_due_date(input: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidArgument(format!("Invalid due date '{input}'. Expected YYYY-MM-DD"))
    })?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| Error::InvalidArgument(format!("Invalid due date '{input}'")))
}

/// `"none"` (any case) means "clear this field".
pub(crate) fn is_clear(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("none")
}

pub(crate) fn format_date(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}

pub(crate) fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

/// Compact duration, e.g. `3d 4h`, `12m`, `40s`.
pub(crate) fn format_duration(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else if mins > 0 {
        format!("{mins}m")
    } else {
        format!("{secs}s")
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_due_date() {
        assert_eq!(parse_due_date("1970-01-02").unwrap(), 86_400_000);
        assert!(matches!(parse_due_date("tomorrow"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(40_000), "40s");
        assert_eq!(format_duration(12 * 60_000), "12m");
        assert_eq!(format_duration((3 * 86_400 + 4 * 3600) * 1000), "3d 4h");
        assert_eq!(format_duration(-5), "0s");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_missing_database_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert!(matches!(
            require_db_path(Some(&path)),
            Err(Error::NotInitialized)
        ));
    }
}
