//! Report storage
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{error, info};

use crate::{
    config::DatabaseConfig,
    errors::TrawlTrackerError,
    models::{CollectionKey, Report, StoredReport},
};

mod models;

use models::ReportRow;

const REPORT_COLUMNS: &str = "id, date, lat, lon, vessel_id, photo, comment, heading, \
     location_typed, date_time_typed";

/// Report store.
///
/// Every query is scoped to one collection; within a collection reads see a
/// consistent snapshot ordered by report date.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run pending migrations.
    ///
    /// The configuration is expected to be validated by the caller.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, TrawlTrackerError> {
        info!(
            "Connecting to database: url={}, max_connections={}",
            config.url, config.max_connections
        );

        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .inspect_err(|e| error!("Failed to open database: {}", e))?;

        Self::new(pool).await
    }

    /// Wrap an existing pool, running pending migrations
    pub async fn new(pool: SqlitePool) -> Result<Self, TrawlTrackerError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .inspect_err(|e| error!("Failed to run migrations: {}", e))?;

        Ok(Self { pool })
    }

    /// Store a new report under `key`, returning its assigned id
    pub async fn put_report(
        &self,
        key: &CollectionKey,
        report: &Report,
    ) -> Result<i64, TrawlTrackerError> {
        let result = sqlx::query(
            "INSERT INTO reports (
                collection, date, lat, lon, vessel_id, photo,
                comment, heading, location_typed, date_time_typed
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(key.name())
        .bind(report.date)
        .bind(report.location.map(|l| l.lat()))
        .bind(report.location.map(|l| l.lon()))
        .bind(report.vessel_id.as_deref())
        .bind(report.photo.as_deref())
        .bind(report.comment.as_deref())
        .bind(report.heading.as_deref())
        .bind(report.location_typed.as_deref())
        .bind(report.date_time_typed.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent reports of a collection, newest first.
    ///
    /// Reports without a date come last.
    pub async fn list_reports(
        &self,
        key: &CollectionKey,
        limit: u32,
    ) -> Result<Vec<StoredReport>, TrawlTrackerError> {
        let rows: Vec<ReportRow> = sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports
             WHERE collection = ?
             ORDER BY date DESC, id DESC
             LIMIT ?"
        ))
        .bind(key.name())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredReport::from).collect())
    }

    /// Fetch one report of a collection by id
    pub async fn get_report(
        &self,
        key: &CollectionKey,
        id: i64,
    ) -> Result<Option<StoredReport>, TrawlTrackerError> {
        let row: Option<ReportRow> = sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE collection = ? AND id = ?"
        ))
        .bind(key.name())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredReport::from))
    }
}
