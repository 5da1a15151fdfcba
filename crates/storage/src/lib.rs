//! Advisory record persistence using SQLite with sqlx.
//!
//! Stores pollen forecast and dust advisory batches and answers the point
//! lookups the dashboard query needs. Batch inserts are transactional:
//! either every row of a batch lands or none do.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use advisory_common::{AdvisoryError, AdvisoryResult, DustRecord, PollenForecastRecord};

/// Row counts for status reporting.
#[derive(Debug, Clone, Copy)]
pub struct StoreCounts {
    pub pollen_rows: u64,
    pub dust_rows: u64,
}

/// Database connection pool and advisory storage operations.
pub struct AdvisoryStore {
    pool: SqlitePool,
}

impl AdvisoryStore {
    /// Open or create the database at the given path.
    pub async fn open(path: &Path) -> AdvisoryResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AdvisoryError::Database(format!("Connection failed: {}", e)))?;

        let store = Self { pool };
        store.migrate().await?;

        info!(path = %path.display(), "Opened advisory database");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> AdvisoryResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| AdvisoryError::Database(format!("Connection failed: {}", e)))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if they don't exist.
    async fn migrate(&self) -> AdvisoryResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pollen_forecast (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                region_code TEXT NOT NULL,
                forecast_date TEXT NOT NULL,
                type TEXT NOT NULL,
                index_name TEXT,
                index_value INTEGER,
                index_category TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AdvisoryError::Database(format!("Migration failed: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pollen_date_type ON pollen_forecast(forecast_date, type)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AdvisoryError::Database(format!("Migration failed: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dust_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site_name TEXT NOT NULL,
                create_time TEXT NOT NULL,
                health_parameter TEXT,
                average_value REAL,
                health_advice TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AdvisoryError::Database(format!("Migration failed: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_dust_time_site ON dust_records(create_time, site_name)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AdvisoryError::Database(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    /// Insert a pollen forecast batch in a single transaction.
    pub async fn insert_pollen_batch(
        &self,
        records: &[PollenForecastRecord],
    ) -> AdvisoryResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AdvisoryError::Database(format!("Begin failed: {}", e)))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO pollen_forecast
                    (region_code, forecast_date, type, index_name, index_value, index_category)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.region_code)
            .bind(record.forecast_date)
            .bind(&record.pollen_type)
            .bind(record.index_name.as_deref())
            .bind(record.index_value)
            .bind(record.index_category.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(|e| AdvisoryError::Database(format!("Insert failed: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AdvisoryError::Database(format!("Commit failed: {}", e)))?;

        debug!(count = records.len(), "Inserted pollen forecast batch");
        Ok(())
    }

    /// Insert a dust advisory batch in a single transaction.
    pub async fn insert_dust_batch(&self, records: &[DustRecord]) -> AdvisoryResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AdvisoryError::Database(format!("Begin failed: {}", e)))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO dust_records
                    (site_name, create_time, health_parameter, average_value, health_advice)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.site_name)
            .bind(record.create_time)
            .bind(record.health_parameter.as_deref())
            .bind(record.average_value)
            .bind(record.health_advice.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(|e| AdvisoryError::Database(format!("Insert failed: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AdvisoryError::Database(format!("Commit failed: {}", e)))?;

        debug!(count = records.len(), "Inserted dust advisory batch");
        Ok(())
    }

    /// Look up the index category for a pollen type on a forecast date.
    pub async fn get_category(
        &self,
        date: NaiveDate,
        pollen_type: &str,
    ) -> AdvisoryResult<Option<String>> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT index_category FROM pollen_forecast WHERE forecast_date = ? AND type = ? LIMIT 1",
        )
        .bind(date)
        .bind(pollen_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AdvisoryError::Database(format!("Query failed: {}", e)))?;

        Ok(row.and_then(|(category,)| category))
    }

    /// Look up the health advice for a site at an observation timestamp.
    ///
    /// If several rows match, the most recently inserted one wins.
    pub async fn get_dust_advice(
        &self,
        timestamp: NaiveDateTime,
        site_name: &str,
    ) -> AdvisoryResult<Option<String>> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT health_advice FROM dust_records \
             WHERE create_time = ? AND site_name = ? \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(timestamp)
        .bind(site_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AdvisoryError::Database(format!("Query failed: {}", e)))?;

        Ok(row.and_then(|(advice,)| advice))
    }

    /// Get row counts for status reporting.
    pub async fn counts(&self) -> AdvisoryResult<StoreCounts> {
        let pollen: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pollen_forecast")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AdvisoryError::Database(format!("Query failed: {}", e)))?;

        let dust: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dust_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AdvisoryError::Database(format!("Query failed: {}", e)))?;

        Ok(StoreCounts {
            pollen_rows: pollen.0 as u64,
            dust_rows: dust.0 as u64,
        })
    }
}
