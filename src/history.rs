use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::location::Location;
use crate::session::ScoredRound;

/// A scored round as stored on disk
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    pub played_at: DateTime<Local>,
    pub target: Location,
    pub guess: Location,
    pub distance_meters: f64,
    pub score: u32,
}

/// Totals across every round ever recorded
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LifetimeSummary {
    pub rounds: i64,
    pub average_score: f64,
    pub best_score: Option<u32>,
}

/// Log of scored rounds, kept by the host between sessions
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open the database at the default location, creating it if needed
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::history_db_path().unwrap_or_else(|| PathBuf::from("geoguess_history.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS rounds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                played_at TEXT NOT NULL,
                target_lat REAL NOT NULL,
                target_lon REAL NOT NULL,
                guess_lat REAL NOT NULL,
                guess_lon REAL NOT NULL,
                distance_meters REAL NOT NULL,
                score INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rounds_played_at ON rounds(played_at)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    pub fn record_round(&self, round: &ScoredRound) -> Result<()> {
        self.record_round_at(round, Local::now())
    }

    /// Timestamps are stored as fixed-width UTC so text order is time order.
    pub fn record_round_at<Tz: TimeZone>(
        &self,
        round: &ScoredRound,
        played_at: DateTime<Tz>,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO rounds
            (played_at, target_lat, target_lon, guess_lat, guess_lon, distance_meters, score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                played_at
                    .with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                round.target.latitude(),
                round.target.longitude(),
                round.guess.latitude(),
                round.guess.longitude(),
                round.distance_meters,
                round.score,
            ],
        )?;

        Ok(())
    }

    /// Most recent rounds first
    pub fn recent_rounds(&self, limit: usize) -> Result<Vec<RoundRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT played_at, target_lat, target_lon, guess_lat, guess_lon, distance_meters, score
            FROM rounds
            ORDER BY played_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let played_at_str: String = row.get(0)?;
            let played_at = DateTime::parse_from_rfc3339(&played_at_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "played_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            let location = |lat_idx: usize, lon_idx: usize| -> Result<Location> {
                let lat: f64 = row.get(lat_idx)?;
                let lon: f64 = row.get(lon_idx)?;
                Location::new(lat, lon).map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        lat_idx,
                        "location".to_string(),
                        rusqlite::types::Type::Real,
                    )
                })
            };

            Ok(RoundRecord {
                played_at,
                target: location(1, 2)?,
                guess: location(3, 4)?,
                distance_meters: row.get(5)?,
                score: row.get(6)?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }

        Ok(records)
    }

    pub fn lifetime_summary(&self) -> Result<LifetimeSummary> {
        let mut stmt = self
            .conn
            .prepare("SELECT COUNT(*), AVG(score), MAX(score) FROM rounds")?;

        stmt.query_row([], |row| {
            let rounds: i64 = row.get(0)?;
            let average_score: Option<f64> = row.get(1)?;
            let best_score: Option<u32> = row.get(2)?;
            Ok(LifetimeSummary {
                rounds,
                average_score: average_score.unwrap_or(0.0),
                best_score,
            })
        })
    }

    /// Clear all history (for testing or reset purposes)
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM rounds", [])?;
        Ok(())
    }
}
