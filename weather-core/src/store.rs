//! SQLite-backed append-only log of weather observations.
//!
//! `ObservationStore` creates its table on open, appends one row per
//! observation inside its own transaction, and answers per-day aggregate
//! queries. `observed_at` is stored as `YYYY-MM-DD HH:MM:SS` text (UTC), so a
//! calendar day is a half-open lexicographic range.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, params, types::Type};
use std::{fmt, fs, path::Path, time::Duration};

use crate::{
    error::StorageError,
    model::{DailySummary, Observation, TIMESTAMP_FORMAT},
};

const SELECT_COLUMNS: &str =
    "SELECT location, observed_at, temperature_celsius, humidity_percent, description
     FROM weather_observations";

pub struct ObservationStore {
    conn: Connection,
}

impl fmt::Debug for ObservationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationStore").field("path", &self.conn.path()).finish()
    }
}

impl ObservationStore {
    /// Open (or create) the store at `path`.
    ///
    /// Missing parent directories and the schema are created on first use.
    /// `busy_timeout` bounds how long a call waits on a locked database.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|source| StorageError::Open { path: path.to_path_buf(), source })?;
        conn.busy_timeout(busy_timeout)?;

        tracing::debug!(path = %path.display(), "opened observation store");

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store; contents vanish when dropped.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|source| StorageError::Open { path: ":memory:".into(), source })?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS weather_observations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    location TEXT NOT NULL,
                    observed_at TEXT NOT NULL,
                    temperature_celsius REAL NOT NULL,
                    humidity_percent REAL NOT NULL,
                    description TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_weather_observations_observed_at
                    ON weather_observations(observed_at);
                "#,
            )
            .map_err(StorageError::Schema)
    }

    /// Record one observation. Equivalent observations are stored as separate rows.
    pub fn append(&mut self, observation: &Observation) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO weather_observations
                (location, observed_at, temperature_celsius, humidity_percent, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                observation.location,
                observation.observed_at_text(),
                observation.temperature_celsius,
                observation.humidity_percent,
                observation.description,
            ],
        )?;
        tx.commit()?;

        tracing::debug!(
            location = %observation.location,
            observed_at = %observation.observed_at_text(),
            "appended observation"
        );
        Ok(())
    }

    /// Mean temperature and humidity over observations made on `date` (UTC).
    ///
    /// Returns `None` when nothing was recorded that day.
    pub fn daily_average(&self, date: NaiveDate) -> Result<Option<DailySummary>, StorageError> {
        let Some((start, end)) = day_bounds(date) else {
            return Ok(None);
        };

        let (count, avg_temp, avg_humidity): (i64, Option<f64>, Option<f64>) =
            self.conn.query_row(
                "SELECT COUNT(*), AVG(temperature_celsius), AVG(humidity_percent)
                 FROM weather_observations
                 WHERE observed_at >= ?1 AND observed_at < ?2",
                params![start, end],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let summary = match (count, avg_temp, avg_humidity) {
            (0, _, _) => None,
            (n, Some(t), Some(h)) => Some(DailySummary {
                date,
                observation_count: n as u64,
                avg_temperature_celsius: t,
                avg_humidity_percent: h,
            }),
            _ => None,
        };
        Ok(summary)
    }

    /// Observations made on `date` (UTC), in insertion order.
    pub fn observations_on(&self, date: NaiveDate) -> Result<Vec<Observation>, StorageError> {
        let Some((start, end)) = day_bounds(date) else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE observed_at >= ?1 AND observed_at < ?2 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![start, end], Self::row_to_observation)?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All observations, in insertion order.
    pub fn all(&self) -> Result<Vec<Observation>, StorageError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let rows = stmt.query_map([], Self::row_to_observation)?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<u64, StorageError> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM weather_observations", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn row_to_observation(row: &rusqlite::Row) -> rusqlite::Result<Observation> {
        let observed_at: String = row.get(1)?;
        let observed_at = NaiveDateTime::parse_from_str(&observed_at, TIMESTAMP_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?
            .and_utc();

        Ok(Observation {
            location: row.get(0)?,
            observed_at,
            temperature_celsius: row.get(2)?,
            humidity_percent: row.get(3)?,
            description: row.get(4)?,
        })
    }
}

/// `[date 00:00:00, next day 00:00:00)` as stored text.
fn day_bounds(date: NaiveDate) -> Option<(String, String)> {
    let next = date.succ_opt()?;
    let start = date.and_time(NaiveTime::MIN).format(TIMESTAMP_FORMAT).to_string();
    let end = next.and_time(NaiveTime::MIN).format(TIMESTAMP_FORMAT).to_string();
    Some((start, end))
}
