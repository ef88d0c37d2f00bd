//! SQLite history store adapter.

use crate::domain::error::IgTraderError;
use crate::domain::market::{PricePoint, PriceRecord, Snapshot};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};

const DATE_FMT: &str = "%Y-%m-%d";
const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteStoreAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStoreAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, IgTraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| IgTraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| IgTraderError::Storage {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, IgTraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| IgTraderError::Storage {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), IgTraderError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| IgTraderError::Storage {
                reason: e.to_string(),
            })?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS price_records (
                epic TEXT NOT NULL,
                date TEXT NOT NULL,
                interval INTEGER NOT NULL,
                open REAL NOT NULL,
                close REAL NOT NULL,
                bid REAL NOT NULL,
                offer REAL NOT NULL,
                PRIMARY KEY (epic, date)
            );
            CREATE TABLE IF NOT EXISTS price_points (
                epic TEXT NOT NULL,
                date TEXT NOT NULL,
                ts TEXT NOT NULL,
                close REAL NOT NULL,
                PRIMARY KEY (epic, date, ts)
            );
            CREATE INDEX IF NOT EXISTS idx_price_records_epic_date
                ON price_records(epic, date);",
        )
        .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn load_points(
        conn: &Connection,
        epic: &str,
        date_str: &str,
    ) -> Result<Vec<PricePoint>, IgTraderError> {
        let mut stmt = conn
            .prepare(
                "SELECT ts, close FROM price_points
                 WHERE epic = ?1 AND date = ?2
                 ORDER BY ts ASC",
            )
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map(params![epic, date_str], |row| {
                let ts_str: String = row.get(0)?;
                let timestamp = NaiveDateTime::parse_from_str(&ts_str, TS_FMT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        ts_str.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(PricePoint {
                    timestamp,
                    close: row.get(1)?,
                })
            })
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

        let mut points = Vec::new();
        for row in rows {
            points.push(
                row.map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(points)
    }

    fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PriceRecord> {
        let date_str: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FMT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                date_str.len(),
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(PriceRecord {
            epic: row.get(0)?,
            date,
            interval: row.get::<_, i64>(2)? as u32,
            snapshot: Snapshot {
                open: row.get(3)?,
                close: row.get(4)?,
                bid: row.get(5)?,
                offer: row.get(6)?,
            },
            points: Vec::new(),
        })
    }
}

impl StorePort for SqliteStoreAdapter {
    fn save(&self, records: &[PriceRecord]) -> Result<(), IgTraderError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| IgTraderError::Storage {
                reason: e.to_string(),
            })?;

        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

        for record in records {
            let date_str = record.date.format(DATE_FMT).to_string();

            tx.execute(
                "INSERT OR REPLACE INTO price_records
                     (epic, date, interval, open, close, bid, offer)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.epic,
                    date_str,
                    record.interval as i64,
                    record.snapshot.open,
                    record.snapshot.close,
                    record.snapshot.bid,
                    record.snapshot.offer,
                ],
            )
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

            // Replacing a record replaces its series wholesale.
            tx.execute(
                "DELETE FROM price_points WHERE epic = ?1 AND date = ?2",
                params![record.epic, date_str],
            )
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

            for point in &record.points {
                tx.execute(
                    "INSERT OR REPLACE INTO price_points (epic, date, ts, close)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        record.epic,
                        date_str,
                        point.timestamp.format(TS_FMT).to_string(),
                        point.close,
                    ],
                )
                .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                    reason: e.to_string(),
                })?;
            }
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn latest_for(&self, epic: &str) -> Result<Option<PriceRecord>, IgTraderError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| IgTraderError::Storage {
                reason: e.to_string(),
            })?;

        let mut stmt = conn
            .prepare(
                "SELECT epic, date, interval, open, close, bid, offer
                 FROM price_records
                 WHERE epic = ?1
                 ORDER BY date DESC
                 LIMIT 1",
            )
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

        let mut rows = stmt
            .query_map(params![epic], Self::record_from_row)
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

        let Some(row) = rows.next() else {
            return Ok(None);
        };
        let mut record = row.map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
            reason: e.to_string(),
        })?;

        let date_str = record.date.format(DATE_FMT).to_string();
        record.points = Self::load_points(&conn, &record.epic, &date_str)?;

        Ok(Some(record))
    }

    fn all_records(&self) -> Result<Vec<PriceRecord>, IgTraderError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| IgTraderError::Storage {
                reason: e.to_string(),
            })?;

        let mut stmt = conn
            .prepare(
                "SELECT epic, date, interval, open, close, bid, offer
                 FROM price_records
                 ORDER BY epic ASC, date ASC",
            )
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map([], Self::record_from_row)
            .map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                reason: e.to_string(),
            })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(
                row.map_err(|e: rusqlite::Error| IgTraderError::StorageQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        for record in &mut records {
            let date_str = record.date.format(DATE_FMT).to_string();
            record.points = Self::load_points(&conn, &record.epic, &date_str)?;
        }

        Ok(records)
    }
}
