//! Read-only dark-horse store backed by SQLite.
//!
//! The whole `dark_horses` table is loaded into memory before the first
//! evaluation, so scoring never touches the database and needs no locking.

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::path::Path;

/// Curated longshot evaluation row.
#[derive(Debug, Clone)]
pub struct DarkHorseRecord {
    pub evaluation_score: f64,
    pub evaluation_reason: String,
}

/// In-memory lookup keyed by horse name.
#[derive(Debug, Default)]
pub struct DarkHorseStore {
    records: HashMap<String, DarkHorseRecord>,
}

impl DarkHorseStore {
    /// Open the store, degrading to an empty lookup when the database is
    /// missing or unreadable. Store absence never fails an evaluation; the
    /// evaluator falls back to odds buckets.
    pub fn open(path: &Path) -> Self {
        match Self::load(path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Dark-horse store unavailable ({e}); using odds fallback only");
                Self::default()
            }
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open dark-horse database")?;

        let mut stmt = conn
            .prepare("SELECT horse_name, evaluation_score, evaluation_reason FROM dark_horses")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                DarkHorseRecord {
                    evaluation_score: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    evaluation_reason: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                },
            ))
        })?;

        let mut records = HashMap::new();
        for row in rows {
            let (name, record) = row?;
            records.insert(name, record);
        }

        Ok(Self { records })
    }

    /// Build a store from already-loaded rows (for testing)
    #[cfg(test)]
    pub fn from_records(records: HashMap<String, DarkHorseRecord>) -> Self {
        Self { records }
    }

    pub fn search(&self, name: &str) -> Option<&DarkHorseRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
