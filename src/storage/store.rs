//! Report persistence.
//!
//! `ReportStore` is the seam the orchestrator writes through. `SqliteStore`
//! keeps reports and their append-only change history in SQLite.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};

use super::migrations::run_migrations;
use super::models::{NewChangeEvent, NewReport, Report, ReportSource};
use super::pool::{init_db_pool_with_path, init_memory_pool};
use crate::change::{ChangeEvent, ChangeType};
use crate::error_handling::DatabaseError;
use crate::forensics::ImageFormat;

const REPORT_COLUMNS: &str = "id, source, source_url, resolved_url, final_url, filename, \
    redirect_chain, http_status, content_hash, byte_size, detected_format, mime_type, entropy, \
    provenance, headers, created_at_ms";

const EVENT_COLUMNS: &str =
    "id, report_id, checked_at_ms, content_hash, change_type, etag, last_modified";

/// Storage for reports and change events.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Inserts a report and returns its id.
    async fn insert_report(&self, report: NewReport) -> Result<i64, sqlx::Error>;

    /// Inserts a report and its first change event atomically. Either both
    /// rows are written or neither is. `event.report_id` is replaced by the
    /// new report's id.
    async fn insert_report_with_event(
        &self,
        report: NewReport,
        event: NewChangeEvent,
    ) -> Result<(i64, ChangeEvent), sqlx::Error>;

    /// Loads a report by id.
    async fn get_report(&self, id: i64) -> Result<Option<Report>, sqlx::Error>;

    /// Appends an event to a report's history.
    async fn append_change_event(&self, event: NewChangeEvent) -> Result<ChangeEvent, sqlx::Error>;

    /// Most recent event for a report.
    async fn latest_change_event(&self, report_id: i64)
        -> Result<Option<ChangeEvent>, sqlx::Error>;

    /// Every event for a report, oldest first.
    async fn change_history(&self, report_id: i64) -> Result<Vec<ChangeEvent>, sqlx::Error>;
}

#[async_trait]
impl<S: ReportStore + ?Sized> ReportStore for Arc<S> {
    async fn insert_report(&self, report: NewReport) -> Result<i64, sqlx::Error> {
        (**self).insert_report(report).await
    }

    async fn insert_report_with_event(
        &self,
        report: NewReport,
        event: NewChangeEvent,
    ) -> Result<(i64, ChangeEvent), sqlx::Error> {
        (**self).insert_report_with_event(report, event).await
    }

    async fn get_report(&self, id: i64) -> Result<Option<Report>, sqlx::Error> {
        (**self).get_report(id).await
    }

    async fn append_change_event(&self, event: NewChangeEvent) -> Result<ChangeEvent, sqlx::Error> {
        (**self).append_change_event(event).await
    }

    async fn latest_change_event(
        &self,
        report_id: i64,
    ) -> Result<Option<ChangeEvent>, sqlx::Error> {
        (**self).latest_change_event(report_id).await
    }

    async fn change_history(&self, report_id: i64) -> Result<Vec<ChangeEvent>, sqlx::Error> {
        (**self).change_history(report_id).await
    }
}

/// SQLite-backed `ReportStore`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let pool = init_db_pool_with_path(path).await?;
        run_migrations(&pool).await?;
        Ok(SqliteStore { pool })
    }

    /// Opens a private in-memory database with migrations applied.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let pool = init_memory_pool().await?;
        run_migrations(&pool).await?;
        Ok(SqliteStore { pool })
    }

    /// Wraps a pool whose schema is already migrated.
    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    /// Underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn insert_report(&self, report: NewReport) -> Result<i64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_report_row(&mut *conn, &report).await
    }

    async fn insert_report_with_event(
        &self,
        report: NewReport,
        mut event: NewChangeEvent,
    ) -> Result<(i64, ChangeEvent), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let id = insert_report_row(&mut *tx, &report).await?;
        event.report_id = id;
        let event = insert_event_row(&mut *tx, event).await?;
        tx.commit().await?;
        Ok((id, event))
    }

    async fn get_report(&self, id: i64) -> Result<Option<Report>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| report_from_row(&row)).transpose()
    }

    async fn append_change_event(&self, event: NewChangeEvent) -> Result<ChangeEvent, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_event_row(&mut *conn, event).await
    }

    async fn latest_change_event(
        &self,
        report_id: i64,
    ) -> Result<Option<ChangeEvent>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM change_events WHERE report_id = ?
             ORDER BY checked_at_ms DESC, id DESC LIMIT 1"
        ))
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| event_from_row(&row)).transpose()
    }

    async fn change_history(&self, report_id: i64) -> Result<Vec<ChangeEvent>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM change_events WHERE report_id = ?
             ORDER BY checked_at_ms ASC, id ASC"
        ))
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(event_from_row).collect()
    }
}

async fn insert_report_row(
    conn: &mut SqliteConnection,
    report: &NewReport,
) -> Result<i64, sqlx::Error> {
    let redirect_chain = to_json(&report.redirect_chain)?;
    let provenance = to_json(&report.provenance)?;
    let headers = to_json(&report.headers)?;
    let byte_size = i64::try_from(report.byte_size).map_err(|e| encode_error("byte_size", e))?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO reports (
            source, source_url, resolved_url, final_url, filename, redirect_chain,
            http_status, content_hash, byte_size, detected_format, mime_type, entropy,
            etag, last_modified, content_type, server, provenance, headers, created_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id",
    )
    .bind(report.source.as_str())
    .bind(&report.source_url)
    .bind(&report.resolved_url)
    .bind(&report.final_url)
    .bind(&report.filename)
    .bind(redirect_chain)
    .bind(report.http_status.map(i64::from))
    .bind(&report.content_hash)
    .bind(byte_size)
    .bind(report.detected_format.map(|f| f.as_str()))
    .bind(report.detected_format.map(|f| f.mime_type()))
    .bind(report.entropy)
    .bind(&report.provenance.etag)
    .bind(&report.provenance.last_modified)
    .bind(&report.provenance.content_type)
    .bind(&report.provenance.server)
    .bind(provenance)
    .bind(headers)
    .bind(report.created_at.timestamp_millis())
    .fetch_one(&mut *conn)
    .await?;

    debug!("Stored report {id} ({})", report.content_hash);
    Ok(id)
}

async fn insert_event_row(
    conn: &mut SqliteConnection,
    event: NewChangeEvent,
) -> Result<ChangeEvent, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO change_events (
            report_id, checked_at_ms, content_hash, change_type, etag, last_modified
        ) VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id",
    )
    .bind(event.report_id)
    .bind(event.checked_at.timestamp_millis())
    .bind(&event.content_hash)
    .bind(event.change_type.as_str())
    .bind(&event.etag)
    .bind(&event.last_modified)
    .fetch_one(&mut *conn)
    .await?;

    debug!(
        "Recorded {} for report {} (event {id})",
        event.change_type, event.report_id
    );

    Ok(ChangeEvent {
        id,
        report_id: event.report_id,
        // Stored at millisecond precision; return what a reload would give
        checked_at: millis_to_datetime(event.checked_at.timestamp_millis())?,
        content_hash: event.content_hash,
        change_type: event.change_type,
        etag: event.etag,
        last_modified: event.last_modified,
    })
}

fn report_from_row(row: &SqliteRow) -> Result<Report, sqlx::Error> {
    let source: String = row.try_get("source")?;
    let http_status: Option<i64> = row.try_get("http_status")?;
    let byte_size: i64 = row.try_get("byte_size")?;
    let detected_format: Option<String> = row.try_get("detected_format")?;

    Ok(Report {
        id: row.try_get("id")?,
        source: source
            .parse::<ReportSource>()
            .map_err(|e| decode_error("source", e))?,
        source_url: row.try_get("source_url")?,
        resolved_url: row.try_get("resolved_url")?,
        final_url: row.try_get("final_url")?,
        filename: row.try_get("filename")?,
        redirect_chain: from_json(row, "redirect_chain")?,
        http_status: http_status
            .map(u16::try_from)
            .transpose()
            .map_err(|e| decode_error("http_status", e))?,
        content_hash: row.try_get("content_hash")?,
        byte_size: u64::try_from(byte_size).map_err(|e| decode_error("byte_size", e))?,
        detected_format: detected_format.as_deref().and_then(ImageFormat::from_name),
        mime_type: row.try_get("mime_type")?,
        entropy: row.try_get("entropy")?,
        provenance: from_json(row, "provenance")?,
        headers: from_json(row, "headers")?,
        created_at: millis_to_datetime(row.try_get("created_at_ms")?)?,
    })
}

fn event_from_row(row: &SqliteRow) -> Result<ChangeEvent, sqlx::Error> {
    let change_type: String = row.try_get("change_type")?;
    Ok(ChangeEvent {
        id: row.try_get("id")?,
        report_id: row.try_get("report_id")?,
        checked_at: millis_to_datetime(row.try_get("checked_at_ms")?)?,
        content_hash: row.try_get("content_hash")?,
        change_type: change_type
            .parse::<ChangeType>()
            .map_err(|e| decode_error("change_type", e))?,
        etag: row.try_get("etag")?,
        last_modified: row.try_get("last_modified")?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

fn from_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| decode_error(column, e))
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: "timestamp".to_string(),
        source: format!("timestamp {ms} ms is out of range").into(),
    })
}

fn decode_error<E>(column: &str, e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    }
}

fn encode_error<E>(field: &str, e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Encode(format!("{field}: {e}").into())
}
