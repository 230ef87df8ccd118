//! History ledger
//!
//! Persisted, most-recent-first list of identified species:
//! - at most one entry per species id
//! - at most `HISTORY_CAPACITY` entries, oldest evicted silently
//! - stored as one JSON array in the `treeHistory` settings slot
//!
//! There is no in-memory cache. Every read loads the whole slot and every
//! write replaces it. Mutations hold a single-writer lock across the
//! read-modify-write cycle so concurrent appends cannot clobber each other.

use lens_common::{DuplicatePolicy, HistoryEntry};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::db::settings;

/// Maximum number of stored entries
pub const HISTORY_CAPACITY: usize = 50;

/// Settings key of the ledger slot
pub const HISTORY_KEY: &str = "treeHistory";

/// History ledger errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Storage could not be read or written
    #[error("History unavailable: {0}")]
    Unavailable(#[from] lens_common::Error),

    /// Entry rejected before touching storage
    #[error("Invalid history entry: {0}")]
    InvalidEntry(String),

    /// Ledger could not be serialized for storage
    #[error("History encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Effect of an append on the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// New entry placed at the front; entries pushed past capacity are returned
    Inserted { evicted: Vec<HistoryEntry> },
    /// Species already present, ledger unchanged
    AlreadyPresent,
    /// Species already present and moved to the front (`MoveToFront` policy)
    MovedToFront,
}

/// Bounded, deduplicated history of identified species
pub struct HistoryLedger {
    db: SqlitePool,
    policy: DuplicatePolicy,
    write_lock: Mutex<()>,
}

impl HistoryLedger {
    pub fn new(db: SqlitePool, policy: DuplicatePolicy) -> Self {
        Self {
            db,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Append an entry, idempotent with respect to `species_id`
    pub async fn append(&self, entry: HistoryEntry) -> Result<AppendOutcome, HistoryError> {
        let entry = normalize_entry(entry)?;

        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        let outcome = apply_append(&mut entries, entry.clone(), self.policy, HISTORY_CAPACITY);

        if outcome == AppendOutcome::AlreadyPresent {
            debug!(species_id = %entry.species_id, "Species already in history");
            return Ok(outcome);
        }

        self.store(&entries).await?;

        if let AppendOutcome::Inserted { evicted } = &outcome {
            for old in evicted {
                debug!(species_id = %old.species_id, "Evicted from history");
            }
        }
        info!(
            species_id = %entry.species_id,
            len = entries.len(),
            "Added to history"
        );

        Ok(outcome)
    }

    /// Full ledger in stored order (most recent first)
    ///
    /// A never-written ledger is empty, not an error.
    pub async fn read_all(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        self.load().await
    }

    /// Remove every entry
    pub async fn clear(&self) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;
        settings::delete_setting(&self.db, HISTORY_KEY).await?;
        info!("History cleared");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let Some(raw) = settings::get_setting(&self.db, HISTORY_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    error = %e,
                    stored_bytes = raw.len(),
                    "Stored history is corrupt, treating it as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn store(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let raw = serde_json::to_string(entries)?;
        settings::set_setting(&self.db, HISTORY_KEY, raw).await?;
        Ok(())
    }
}

/// Apply one append to an in-memory ledger
pub fn apply_append(
    entries: &mut Vec<HistoryEntry>,
    entry: HistoryEntry,
    policy: DuplicatePolicy,
    capacity: usize,
) -> AppendOutcome {
    if let Some(pos) = entries.iter().position(|e| e.species_id == entry.species_id) {
        return match policy {
            DuplicatePolicy::KeepPosition => AppendOutcome::AlreadyPresent,
            DuplicatePolicy::MoveToFront => {
                entries.remove(pos);
                entries.insert(0, entry);
                entries.truncate(capacity);
                AppendOutcome::MovedToFront
            }
        };
    }

    entries.insert(0, entry);
    let evicted = if entries.len() > capacity {
        entries.split_off(capacity)
    } else {
        Vec::new()
    };

    AppendOutcome::Inserted { evicted }
}

fn normalize_entry(entry: HistoryEntry) -> Result<HistoryEntry, HistoryError> {
    let normalized = HistoryEntry::new(
        entry.species_id.trim(),
        entry.common_name.trim(),
        entry.scientific_name.trim(),
    );

    if normalized.species_id.is_empty() {
        return Err(HistoryError::InvalidEntry("species id is empty".to_string()));
    }
    if normalized.common_name.is_empty() || normalized.scientific_name.is_empty() {
        return Err(HistoryError::InvalidEntry(format!(
            "names missing for species {}",
            normalized.species_id
        )));
    }

    Ok(normalized)
}
