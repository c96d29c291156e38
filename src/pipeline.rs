// Dump processing: register, extract header identity, decode on a blocking thread while a writer
// task persists batches, then analyze the complete persisted series.

use anyhow::Context as _;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::analysis::{Analyzer, FieldSummary, summarize};
use crate::config::AppConfig;
use crate::decoder::{DecodeSummary, Decoder, DumpSource};
use crate::error::FormatError;
use crate::header;
use crate::models::{AnalysisResult, DeviceInfo, DeviceType, TelemetryRecord};
use crate::store::{DumpStatus, DumpStore, RecordSink};

/// Everything learned about one dump.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpReport {
    pub dump_id: i64,
    pub filename: String,
    pub device_type: DeviceType,
    pub decode: DecodeSummary,
    pub device_info: DeviceInfo,
    pub analysis: AnalysisResult,
    pub fields: Vec<FieldSummary>,
}

/// Explicit device type, else one guessed from the filename.
pub fn resolve_device_type(
    filename: &str,
    explicit: Option<DeviceType>,
) -> Result<DeviceType, FormatError> {
    match explicit {
        Some(device_type) => Ok(device_type),
        None => DeviceType::from_filename(filename)
            .ok_or_else(|| FormatError::UnknownDeviceType(filename.to_string())),
    }
}

/// Spawns the task that persists decoded batches in arrival order. Returns the number of
/// records persisted. On the first failure the receiver is dropped, so the decoder's next
/// send fails and decoding stops at that batch boundary.
pub fn spawn_batch_writer<S>(
    mut batch_rx: mpsc::Receiver<Vec<TelemetryRecord>>,
    sink: Arc<S>,
    dump_id: i64,
) -> tokio::task::JoinHandle<anyhow::Result<u64>>
where
    S: RecordSink + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut persisted: u64 = 0;
        let mut batches: usize = 0;
        while let Some(batch) = batch_rx.recv().await {
            sink.persist_batch(dump_id, &batch)
                .await
                .with_context(|| format!("persist batch {} of dump {}", batches, dump_id))?;
            persisted += batch.len() as u64;
            batches += 1;
            debug!(
                operation = "persist_batch",
                dump_id,
                records_count = batch.len(),
                "Batch persisted"
            );
        }
        debug!(dump_id, batches, persisted, "Batch writer finished");
        Ok(persisted)
    })
}

/// Decode, persist and analyze one dump file. Any failure after registration marks the dump
/// errored before the error is returned.
pub async fn process_dump<S: DumpStore>(
    path: &Path,
    device_type: Option<DeviceType>,
    store: Arc<S>,
    config: &AppConfig,
) -> anyhow::Result<DumpReport> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let device_type = resolve_device_type(&filename, device_type)?;
    let source =
        DumpSource::open(path).with_context(|| format!("open dump {}", path.display()))?;

    let dump_id = store
        .register_dump(&filename, device_type, source.base_time())
        .await?;
    info!(dump_id, filename = %filename, device = %device_type, "Dump registered");

    match run_stages(dump_id, source, &filename, device_type, &store, config).await {
        Ok(report) => Ok(report),
        Err(e) => {
            let message = format!("{:#}", e);
            if let Err(mark_err) = store
                .set_status(dump_id, DumpStatus::Errored, Some(&message))
                .await
            {
                warn!(dump_id, error = %mark_err, "failed to mark dump errored");
            }
            warn!(dump_id, error = %message, "Dump processing failed");
            Err(e)
        }
    }
}

async fn run_stages<S: DumpStore>(
    dump_id: i64,
    mut source: DumpSource<File>,
    filename: &str,
    device_type: DeviceType,
    store: &Arc<S>,
    config: &AppConfig,
) -> anyhow::Result<DumpReport> {
    let header_bytes = source.read_header().context("read dump header")?;
    let device_info = header::extract_device_info(&header_bytes, filename, device_type);
    store.save_device_info(dump_id, &device_info).await?;
    info!(
        dump_id,
        derived_items = device_info.derived_count(),
        "Device info extracted"
    );

    let (batch_tx, batch_rx) = mpsc::channel(config.decoder.channel_capacity);
    let writer = spawn_batch_writer(batch_rx, store.clone(), dump_id);
    let decoder = Decoder::new(config.decoder.decode_options());
    let decoded = tokio::task::spawn_blocking(move || {
        decoder.decode(&mut source, device_type, |batch, _| {
            batch_tx.blocking_send(batch).is_ok()
        })
    })
    .await
    .context("decoder thread panicked")?;
    let persisted = writer.await.context("batch writer panicked")??;
    let summary = decoded?;
    anyhow::ensure!(
        !summary.cancelled && persisted == summary.records_decoded,
        "decoded {} records but persisted {}",
        summary.records_decoded,
        persisted
    );
    info!(
        dump_id,
        records = summary.records_decoded,
        batches = summary.batches,
        rejected_values = summary.rejected_values,
        timestamp_source = summary.timestamp_source.as_str(),
        "Dump decoded and persisted"
    );

    let records = store.fetch_all(dump_id).await?;
    let analyzer = Analyzer::new(config.analysis.analysis_config());
    let (analysis, fields) = tokio::task::spawn_blocking(move || {
        let analysis = analyzer.analyze(&records);
        let fields = summarize(&records);
        (analysis, fields)
    })
    .await
    .context("analysis thread panicked")?;
    store.persist_analysis(dump_id, &analysis).await?;
    store.set_status(dump_id, DumpStatus::Complete, None).await?;
    info!(
        dump_id,
        issues = analysis.issues.len(),
        status = analysis.overall_status.as_str(),
        "Dump analyzed"
    );

    Ok(DumpReport {
        dump_id,
        filename: filename.to_string(),
        device_type,
        decode: summary,
        device_info,
        analysis,
        fields,
    })
}
