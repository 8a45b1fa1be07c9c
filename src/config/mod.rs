//! Configuration management.
//!
//! Boardkeep keeps one database per user at
//! `~/.boardkeep/data/boardkeep.db`. Every tunable of the store has a
//! default and an environment override; the CLI can replace the database
//! path and the actor with flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Runtime settings for the store and the backlog sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long a cached list query stays valid
    pub cache_ttl: Duration,
    /// Upper bound on opening and syncing the database at startup
    pub sync_timeout: Duration,
    /// Open tasks idle this long are moved to the backlog
    pub stale_threshold_days: u32,
    /// Period of the background backlog sweep
    pub sweep_interval: Duration,
    /// Moves per lock acquisition during a sweep
    pub sweep_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl: crate::storage::cache::DEFAULT_CACHE_TTL,
            sync_timeout: Duration::from_secs(10),
            stale_threshold_days: 14,
            sweep_interval: Duration::from_secs(60 * 60),
            sweep_batch_size: 50,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `BK_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a variable is set but not a valid number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`StoreConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a variable is set but not a valid number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(ms) = parse_var::<u64>(&lookup, "BK_CACHE_TTL_MS")? {
            config.cache_ttl = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "BK_SYNC_TIMEOUT_MS")? {
            config.sync_timeout = Duration::from_millis(ms);
        }
        if let Some(days) = parse_var::<u32>(&lookup, "BK_STALE_DAYS")? {
            config.stale_threshold_days = days;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "BK_SWEEP_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(Error::Config("BK_SWEEP_INTERVAL_SECS must be positive".into()));
            }
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(batch) = parse_var::<usize>(&lookup, "BK_SWEEP_BATCH")? {
            config.sweep_batch_size = batch.max(1);
        }
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} must be a number, got '{raw}'"))),
        _ => Ok(None),
    }
}

/// Get the global Boardkeep directory location (`~/.boardkeep/`).
#[must_use]
pub fn global_boardkeep_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".boardkeep"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `BK_TEST_DB=1` (or any non-empty value
/// other than `0`/`false`).
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("BK_TEST_DB").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Get the test database path (`~/.boardkeep/test/boardkeep.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_boardkeep_dir().map(|dir| dir.join("test").join("boardkeep.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `BK_TEST_DB` environment variable → uses test database
/// 3. `BOARDKEEP_DB` environment variable
/// 4. Global location: `~/.boardkeep/data/boardkeep.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("BOARDKEEP_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_boardkeep_dir().map(|dir| dir.join("data").join("boardkeep.db"))
}

/// Get the default actor name.
///
/// Priority:
/// 1. `BK_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("BK_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}
