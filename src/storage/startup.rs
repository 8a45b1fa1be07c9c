//! Store startup: open, sync with a deadline, seed first-run content.
//!
//! Opening and syncing run on a blocking thread under
//! `tokio::time::timeout`. When the deadline passes or the open fails, the
//! caller still gets a usable in-memory store together with the error, so
//! the application never hangs on a slow or broken database.

use std::path::PathBuf;

use super::sqlite::Store;
use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// Outcome of [`initialize`].
#[derive(Debug)]
pub struct Startup {
    pub store: Store,
    /// Why the store is a fallback, if it is one
    pub error: Option<Error>,
    /// True if first-run content was seeded
    pub seeded: bool,
}

impl Startup {
    /// True if the requested database could not be used.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Open `path` (or an in-memory store for `None`), sync it within
/// `config.sync_timeout` and seed defaults on first run.
///
/// # Errors
///
/// Only fails if even the in-memory fallback cannot be opened or seeded.
pub async fn initialize(path: Option<PathBuf>, config: &StoreConfig, actor: &str) -> Result<Startup> {
    let open_config = config.clone();
    initialize_with(config, actor, move || {
        let store = match &path {
            Some(path) => Store::open_with_config(path, &open_config)?,
            None => Store::open_memory_with_config(&open_config)?,
        };
        store.sync()?;
        Ok(store)
    })
    .await
}

/// [`initialize`] with a custom open-and-sync step.
///
/// # Errors
///
/// Only fails if even the in-memory fallback cannot be opened or seeded.
pub async fn initialize_with<F>(config: &StoreConfig, actor: &str, open: F) -> Result<Startup>
where
    F: FnOnce() -> Result<Store> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(open);

    let outcome = match tokio::time::timeout(config.sync_timeout, handle).await {
        Ok(Ok(Ok(store))) => Ok(store),
        Ok(Ok(Err(err))) => Err(err),
        Ok(Err(join_err)) => Err(Error::Other(format!("storage task failed: {join_err}"))),
        Err(_) => Err(Error::SyncTimeout {
            timeout_ms: u64::try_from(config.sync_timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    };

    let (mut store, error) = match outcome {
        Ok(store) => (store, None),
        Err(err) => {
            tracing::warn!(error = %err, "storage unavailable, using in-memory store");
            (Store::open_memory_with_config(config)?, Some(err))
        }
    };

    let seeded = store.bootstrap_defaults(actor)?;
    Ok(Startup {
        store,
        error,
        seeded,
    })
}
