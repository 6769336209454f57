use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Could not prepare store location {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Novelty store is corrupted: {0}")]
    Corrupted(String),

    #[error("Novelty store lock was poisoned by a panicking writer")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Whether a repository is fresh within the lookback window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Novelty {
    New,
    Recurring,
}

impl Novelty {
    pub fn is_new(&self) -> bool {
        matches!(self, Novelty::New)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Novelty::New => "NEW",
            Novelty::Recurring => "RECURRING",
        }
    }
}

/// Rough shape of the history, for `trendwatch stats`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total_repositories: u64,
    pub total_observations: u64,
    pub first_seen_today: u64,
}

/// Durable (repository, date) observation history
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - A unique key on (repo, date) gives us idempotent upserts for free
/// - Doesn't require a separate process
///
/// The store itself is just a location. Call [`NoveltyStore::session`] around a
/// run to get a live connection; dropping the session releases it.
#[derive(Debug, Clone)]
pub struct NoveltyStore {
    path: PathBuf,
}

impl NoveltyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection, make sure the schema exists and the file is sane
    pub fn session(&self) -> Result<NoveltySession> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        Self::check_integrity(&conn)?;
        Self::init_schema(&conn)?;

        debug!("Opened novelty store at {}", self.path.display());
        Ok(NoveltySession {
            conn: Mutex::new(conn),
        })
    }

    fn check_integrity(conn: &Connection) -> Result<()> {
        let verdict: String = conn
            .query_row("PRAGMA quick_check", [], |row| row.get(0))
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;

        if verdict != "ok" {
            return Err(StoreError::Corrupted(verdict));
        }
        Ok(())
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        // repo_key is the lowercased owner/name; full_name keeps the display casing
        conn.execute(
            "CREATE TABLE IF NOT EXISTS observations (
                repo_key TEXT NOT NULL,
                observed_on TEXT NOT NULL,
                full_name TEXT NOT NULL,
                PRIMARY KEY (repo_key, observed_on)
            )",
            [],
        )?;

        Ok(())
    }
}

/// A live handle on the history for the duration of one run
///
/// Writes go through a single connection behind a mutex, so classification and
/// recording for any one identity can never interleave with itself.
pub struct NoveltySession {
    conn: Mutex<Connection>,
}

impl NoveltySession {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Classify against prior history, then upsert today's observation
    ///
    /// NEW when the latest observation on or before `date` is missing or more
    /// than `lookback_days` old. A row already written for `date` counts as a
    /// zero-day-old sighting, so repeating the call is RECURRING and writes nothing new.
    pub fn classify_and_record(
        &self,
        full_name: &str,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Novelty> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let novelty = classify(&tx, full_name, date, lookback_days)?;
        record(&tx, full_name, date)?;
        tx.commit()?;
        Ok(novelty)
    }

    /// Classify and record a whole batch atomically
    ///
    /// Either every observation lands or none does, so a failed run leaves no
    /// half-written date behind. Results line up with `full_names`.
    pub fn classify_batch<S: AsRef<str>>(
        &self,
        full_names: &[S],
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Vec<Novelty>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut verdicts = Vec::with_capacity(full_names.len());
        for name in full_names {
            let name = name.as_ref();
            verdicts.push(classify(&tx, name, date, lookback_days)?);
            record(&tx, name, date)?;
        }

        tx.commit()?;

        let fresh = verdicts.iter().filter(|n| n.is_new()).count();
        info!(
            "Recorded {} observations for {} ({} new)",
            verdicts.len(),
            date,
            fresh
        );
        Ok(verdicts)
    }

    /// Classify without writing anything (dry runs)
    pub fn peek(&self, full_name: &str, date: NaiveDate, lookback_days: u32) -> Result<Novelty> {
        let conn = self.conn()?;
        classify(&conn, full_name, date, lookback_days)
    }

    /// Most recent observation on or before `date`
    pub fn last_seen(&self, full_name: &str, date: NaiveDate) -> Result<Option<NaiveDate>> {
        let conn = self.conn()?;
        last_seen(&conn, full_name, date)
    }

    /// Every date this repository was observed, newest first
    pub fn history(&self, full_name: &str) -> Result<Vec<NaiveDate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT observed_on FROM observations WHERE repo_key = ?1 ORDER BY observed_on DESC",
        )?;

        let rows = stmt.query_map(params![repo_key(full_name)], |row| row.get::<_, String>(0))?;

        let mut dates = Vec::new();
        for raw in rows {
            dates.push(parse_date(&raw?)?);
        }
        Ok(dates)
    }

    /// How many distinct days the repository showed up on
    pub fn appearance_count(&self, full_name: &str) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM observations WHERE repo_key = ?1",
            params![repo_key(full_name)],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    pub fn statistics(&self, today: NaiveDate) -> Result<StoreStats> {
        let conn = self.conn()?;

        let (repos, observations): (i64, i64) = conn.query_row(
            "SELECT COUNT(DISTINCT repo_key), COUNT(*) FROM observations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let first_seen_today: i64 = conn.query_row(
            "SELECT COUNT(*) FROM (
                SELECT repo_key FROM observations
                GROUP BY repo_key
                HAVING MIN(observed_on) = ?1
            )",
            params![format_date(today)],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            total_repositories: repos.max(0) as u64,
            total_observations: observations.max(0) as u64,
            first_seen_today: first_seen_today.max(0) as u64,
        })
    }

    /// Drop observations strictly older than `cutoff`; returns rows removed
    pub fn prune_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM observations WHERE observed_on < ?1",
            params![format_date(cutoff)],
        )?;

        info!("Pruned {} observations older than {}", removed, cutoff);
        Ok(removed)
    }
}

/// Comparison key: identities are case-insensitive
pub fn repo_key(full_name: &str) -> String {
    full_name.trim().to_lowercase()
}

fn classify(
    conn: &Connection,
    full_name: &str,
    date: NaiveDate,
    lookback_days: u32,
) -> Result<Novelty> {
    let novelty = match last_seen(conn, full_name, date)? {
        None => Novelty::New,
        Some(previous) => {
            let age = (date - previous).num_days();
            if age > i64::from(lookback_days) {
                Novelty::New
            } else {
                Novelty::Recurring
            }
        }
    };

    debug!("{} classified as {}", full_name, novelty.label());
    Ok(novelty)
}

fn last_seen(conn: &Connection, full_name: &str, date: NaiveDate) -> Result<Option<NaiveDate>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT MAX(observed_on) FROM observations
             WHERE repo_key = ?1 AND observed_on <= ?2",
            params![repo_key(full_name), format_date(date)],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();

    raw.as_deref().map(parse_date).transpose()
}

fn record(conn: &Connection, full_name: &str, date: NaiveDate) -> Result<()> {
    conn.execute(
        "INSERT INTO observations (repo_key, observed_on, full_name)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (repo_key, observed_on) DO UPDATE SET full_name = excluded.full_name",
        params![repo_key(full_name), format_date(date), full_name.trim()],
    )?;
    Ok(())
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| StoreError::Corrupted(format!("bad observation date '{}': {}", raw, e)))
}
