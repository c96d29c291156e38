// SQLite persistence for dumps: one row per decoded record (versioned wincode BLOB),
// header identity and analysis output as JSON, plus a status row per dump.

mod blob;

use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

use crate::decoder::{BaseTime, TimestampSource};
use crate::models::{AnalysisResult, DeviceInfo, DeviceType, TelemetryRecord};

/// Receives decoded batches in file order.
pub trait RecordSink {
    fn persist_batch(
        &self,
        dump_id: i64,
        records: &[TelemetryRecord],
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Every persisted record of a dump, in file order.
pub trait RecordSource {
    fn fetch_all(
        &self,
        dump_id: i64,
    ) -> impl Future<Output = anyhow::Result<Vec<TelemetryRecord>>> + Send;
}

pub trait ResultSink {
    fn persist_analysis(
        &self,
        dump_id: i64,
        result: &AnalysisResult,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Dump bookkeeping: registration, header identity, processing status.
pub trait DumpCatalog {
    fn register_dump(
        &self,
        filename: &str,
        device_type: DeviceType,
        base_time: BaseTime,
    ) -> impl Future<Output = anyhow::Result<i64>> + Send;

    fn save_device_info(
        &self,
        dump_id: i64,
        info: &DeviceInfo,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn set_status(
        &self,
        dump_id: i64,
        status: DumpStatus,
        error: Option<&str>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Everything the dump pipeline needs from a backend.
pub trait DumpStore:
    DumpCatalog + RecordSink + RecordSource + ResultSink + Send + Sync + 'static
{
}

impl<T> DumpStore for T where
    T: DumpCatalog + RecordSink + RecordSource + ResultSink + Send + Sync + 'static
{
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpStatus {
    Processing,
    Complete,
    Errored,
}

impl DumpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DumpStatus::Processing => "processing",
            DumpStatus::Complete => "complete",
            DumpStatus::Errored => "errored",
        }
    }

    fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "processing" => Ok(DumpStatus::Processing),
            "complete" => Ok(DumpStatus::Complete),
            "errored" => Ok(DumpStatus::Errored),
            other => anyhow::bail!("unknown dump status {:?}", other),
        }
    }
}

/// One row of the `dumps` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRow {
    pub id: i64,
    pub filename: String,
    pub device_type: DeviceType,
    pub status: DumpStatus,
    pub base_time: i64,
    pub timestamp_source: TimestampSource,
    pub created_at: i64,
    pub error: Option<String>,
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dumps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                device_type TEXT NOT NULL,
                status TEXT NOT NULL,
                base_time INTEGER NOT NULL,
                timestamp_source TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS telemetry_records (
                dump_id INTEGER NOT NULL,
                seq INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                data BLOB NOT NULL,
                PRIMARY KEY (dump_id, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS device_info (dump_id INTEGER PRIMARY KEY, data TEXT NOT NULL)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analysis_results (
                dump_id INTEGER PRIMARY KEY,
                overall_status TEXT NOT NULL,
                critical_count INTEGER NOT NULL,
                warning_count INTEGER NOT NULL,
                data TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(repo = "dumps", operation = "get_dump"))]
    pub async fn get_dump(&self, dump_id: i64) -> anyhow::Result<Option<DumpRow>> {
        let row = sqlx::query(
            "SELECT id, filename, device_type, status, base_time, timestamp_source, created_at, error
             FROM dumps WHERE id = $1",
        )
        .bind(dump_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let device_type: String = row.try_get("device_type")?;
        let status: String = row.try_get("status")?;
        let timestamp_source: String = row.try_get("timestamp_source")?;
        Ok(Some(DumpRow {
            id: row.try_get("id")?,
            filename: row.try_get("filename")?,
            device_type: device_type.parse()?,
            status: DumpStatus::parse(&status)?,
            base_time: row.try_get("base_time")?,
            timestamp_source: parse_timestamp_source(&timestamp_source)?,
            created_at: row.try_get("created_at")?,
            error: row.try_get("error")?,
        }))
    }

    pub async fn record_count(&self, dump_id: i64) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM telemetry_records WHERE dump_id = $1")
            .bind(dump_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn load_device_info(&self, dump_id: i64) -> anyhow::Result<Option<DeviceInfo>> {
        let row = sqlx::query("SELECT data FROM device_info WHERE dump_id = $1")
            .bind(dump_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let data: String = row.try_get("data")?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub async fn load_analysis(&self, dump_id: i64) -> anyhow::Result<Option<AnalysisResult>> {
        let row = sqlx::query("SELECT data FROM analysis_results WHERE dump_id = $1")
            .bind(dump_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let data: String = row.try_get("data")?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

fn parse_timestamp_source(s: &str) -> anyhow::Result<TimestampSource> {
    match s {
        "filename" => Ok(TimestampSource::Filename),
        "wallClock" => Ok(TimestampSource::WallClock),
        other => anyhow::bail!("unknown timestamp source {:?}", other),
    }
}

fn now_millis() -> anyhow::Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64)
}

impl DumpCatalog for SqliteStore {
    #[instrument(skip(self, base_time), fields(repo = "dumps", operation = "register_dump"))]
    async fn register_dump(
        &self,
        filename: &str,
        device_type: DeviceType,
        base_time: BaseTime,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO dumps (filename, device_type, status, base_time, timestamp_source, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(filename)
        .bind(device_type.as_str())
        .bind(DumpStatus::Processing.as_str())
        .bind(base_time.millis)
        .bind(base_time.source.as_str())
        .bind(now_millis()?)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    #[instrument(skip(self, info), fields(repo = "dumps", operation = "save_device_info"))]
    async fn save_device_info(&self, dump_id: i64, info: &DeviceInfo) -> anyhow::Result<()> {
        let data = serde_json::to_string(info)?;
        sqlx::query("INSERT OR REPLACE INTO device_info (dump_id, data) VALUES ($1, $2)")
            .bind(dump_id)
            .bind(&data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, error), fields(repo = "dumps", operation = "set_status", status = status.as_str()))]
    async fn set_status(
        &self,
        dump_id: i64,
        status: DumpStatus,
        error: Option<&str>,
    ) -> anyhow::Result<()> {
        let updated = sqlx::query("UPDATE dumps SET status = $1, error = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(error)
            .bind(dump_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        anyhow::ensure!(updated == 1, "dump {} not found", dump_id);
        Ok(())
    }
}

impl RecordSink for SqliteStore {
    /// Appends after the highest `seq` already stored for the dump, in one transaction.
    #[instrument(skip(self, records), fields(repo = "records", operation = "persist_batch", records_count = records.len()))]
    async fn persist_batch(&self, dump_id: i64, records: &[TelemetryRecord]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        let next_seq: i64 = sqlx::query(
            "SELECT COALESCE(MAX(seq) + 1, 0) AS next_seq FROM telemetry_records WHERE dump_id = $1",
        )
        .bind(dump_id)
        .fetch_one(&mut *tx)
        .await?
        .try_get("next_seq")?;

        for (i, record) in records.iter().enumerate() {
            let data = blob::encode_record(record)?;
            sqlx::query(
                "INSERT INTO telemetry_records (dump_id, seq, timestamp, data) VALUES ($1, $2, $3, $4)",
            )
            .bind(dump_id)
            .bind(next_seq + i as i64)
            .bind(record.timestamp)
            .bind(&data)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

impl RecordSource for SqliteStore {
    #[instrument(skip(self), fields(repo = "records", operation = "fetch_all"))]
    async fn fetch_all(&self, dump_id: i64) -> anyhow::Result<Vec<TelemetryRecord>> {
        let rows =
            sqlx::query("SELECT data FROM telemetry_records WHERE dump_id = $1 ORDER BY seq ASC")
                .bind(dump_id)
                .fetch_all(&self.pool)
                .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let data: Vec<u8> = row.try_get("data")?;
            out.push(blob::decode_record(&data)?);
        }
        Ok(out)
    }
}

impl ResultSink for SqliteStore {
    #[instrument(skip(self, result), fields(repo = "analysis", operation = "persist_analysis"))]
    async fn persist_analysis(&self, dump_id: i64, result: &AnalysisResult) -> anyhow::Result<()> {
        let data = serde_json::to_string(result)?;
        sqlx::query(
            "INSERT OR REPLACE INTO analysis_results (dump_id, overall_status, critical_count, warning_count, data)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(dump_id)
        .bind(result.overall_status.as_str())
        .bind(result.critical_count as i64)
        .bind(result.warning_count as i64)
        .bind(&data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
