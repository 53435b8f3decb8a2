use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::models::{Event, RawMeasurement, ReferenceScan};

/// Read side of the measurement store, as consumed by calibration and
/// reporting.
pub trait MeasurementSource {
    /// All raw measurements on or after `since`, ascending by date
    fn measurements(&self, since: Option<NaiveDate>) -> Result<Vec<RawMeasurement>, DatabaseError>;
}

/// Local-first SQLite store of raw scale readings
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path.as_ref())?;
        let db = Self { conn };
        db.init_schema()?;

        debug!(path = %db_path.as_ref().display(), "Opened measurement database");
        Ok(db)
    }

    /// In-memory database, used by tests
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS measurements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date DATE NOT NULL,
                weight REAL NOT NULL,
                fat_percent REAL,
                source TEXT DEFAULT 'app',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_measurements_date ON measurements(date);

            CREATE TABLE IF NOT EXISTS inbody_scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date DATE NOT NULL,
                weight REAL,
                fat_percent REAL,
                muscle_mass REAL
            );

            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date DATE NOT NULL,
                label TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Store one reading, replacing any existing reading for the same day
    pub fn add_measurement(
        &self,
        date: NaiveDate,
        weight: f64,
        fat_percent: Option<f64>,
        source: &str,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO measurements (date, weight, fat_percent, source) VALUES (?1, ?2, ?3, ?4)",
            params![date, weight, fat_percent, source],
        )?;

        info!(%date, weight, ?fat_percent, source, "Measurement saved");
        Ok(())
    }

    /// Insert many readings in one transaction, keeping existing days.
    ///
    /// Records without a weight are skipped. Returns the number of rows
    /// actually inserted.
    pub fn bulk_insert(
        &mut self,
        records: &[RawMeasurement],
        source: &str,
    ) -> Result<usize, DatabaseError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO measurements (date, weight, fat_percent, source) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                let Some(weight) = record.weight else {
                    continue;
                };
                inserted += stmt.execute(params![record.date, weight, record.fat_percent, source])?;
            }
        }
        tx.commit()?;

        info!(offered = records.len(), inserted, source, "Bulk insert complete");
        Ok(inserted)
    }

    /// Most recent `limit` readings, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<RawMeasurement>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, weight, fat_percent FROM measurements ORDER BY date DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_measurement)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
    }

    /// Remove the reading for a day; returns whether one existed
    pub fn delete_measurement(&self, date: NaiveDate) -> Result<bool, DatabaseError> {
        let removed = self
            .conn
            .execute("DELETE FROM measurements WHERE date = ?1", params![date])?;
        Ok(removed > 0)
    }

    pub fn count(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM measurements", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Record a reference scan. Several scans may share a date.
    pub fn add_scan(&self, scan: &ReferenceScan) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO inbody_scans (date, weight, fat_percent, muscle_mass) VALUES (?1, ?2, ?3, ?4)",
            params![scan.date, scan.weight, scan.fat_percent, scan.muscle_mass],
        )?;

        info!(date = %scan.date, weight = ?scan.weight, fat_percent = ?scan.fat_percent, "Reference scan saved");
        Ok(())
    }

    /// All reference scans, ascending by date
    pub fn scans(&self) -> Result<Vec<ReferenceScan>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, weight, fat_percent, muscle_mass FROM inbody_scans ORDER BY date, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ReferenceScan {
                date: row.get(0)?,
                weight: row.get(1)?,
                fat_percent: row.get(2)?,
                muscle_mass: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
    }

    pub fn add_event(&self, date: NaiveDate, label: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO events (date, label) VALUES (?1, ?2)",
            params![date, label],
        )?;

        info!(%date, label, "Event saved");
        Ok(())
    }

    /// All events, ascending by date then insertion order
    pub fn events(&self) -> Result<Vec<Event>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, label FROM events ORDER BY date, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Event {
                date: row.get(0)?,
                label: row.get(1)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
    }

    fn row_to_measurement(row: &Row) -> rusqlite::Result<RawMeasurement> {
        Ok(RawMeasurement {
            date: row.get(0)?,
            weight: row.get(1)?,
            fat_percent: row.get(2)?,
        })
    }
}

impl MeasurementSource for Database {
    fn measurements(&self, since: Option<NaiveDate>) -> Result<Vec<RawMeasurement>, DatabaseError> {
        let measurements = match since {
            Some(since) => {
                let mut stmt = self.conn.prepare(
                    "SELECT date, weight, fat_percent FROM measurements WHERE date >= ?1 ORDER BY date",
                )?;
                let rows = stmt.query_map(params![since], Self::row_to_measurement)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT date, weight, fat_percent FROM measurements ORDER BY date")?;
                let rows = stmt.query_map([], Self::row_to_measurement)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        debug!(count = measurements.len(), ?since, "Loaded measurements");
        Ok(measurements)
    }
}
