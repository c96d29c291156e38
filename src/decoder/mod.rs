// Binary dump decoder: skips the header, decodes fixed-size records in bounded batches,
// and hands each batch to the caller by value.

pub(crate) mod reader;
pub mod timestamp;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

use crate::error::{FormatError, Result};
use crate::layout::{self, FieldSpec, HEADER_SIZE};
use crate::models::{DeviceType, TelemetryRecord};
pub use timestamp::{BaseTime, TimestampSource};

pub const DEFAULT_BATCH_SIZE: usize = 1_000;
pub const DEFAULT_RECLAIM_EVERY: usize = 3;

/// Batch sizing and buffer tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Records per batch handed to the callback.
    pub batch_size: usize,
    /// Release the pooled read buffer every N batches. `None` keeps it for the whole decode.
    pub reclaim_every: Option<usize>,
    /// Soft cap on memory for one batch (raw bytes plus decoded records). Lowers the
    /// effective batch size, never below one record.
    pub memory_ceiling_bytes: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            reclaim_every: Some(DEFAULT_RECLAIM_EVERY),
            memory_ceiling_bytes: None,
        }
    }
}

impl DecodeOptions {
    pub fn effective_batch_size(&self, device_type: DeviceType) -> usize {
        let requested = self.batch_size.max(1);
        match self.memory_ceiling_bytes {
            Some(ceiling) => {
                let per_record =
                    device_type.record_size() + std::mem::size_of::<TelemetryRecord>();
                (ceiling / per_record).clamp(1, requested)
            }
            None => requested,
        }
    }
}

/// Outcome of one decode run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeSummary {
    pub device_type: DeviceType,
    pub base_time: i64,
    pub timestamp_source: TimestampSource,
    /// Whole records present in the file.
    pub total_records: u64,
    /// Records handed to the callback.
    pub records_decoded: u64,
    pub batches: usize,
    pub batch_size: usize,
    /// The callback asked to stop before the last record.
    pub cancelled: bool,
    /// Field values nulled for being out of range or non-finite.
    pub rejected_values: u64,
    /// Field reads that ran past the record slice.
    pub short_reads: u64,
    /// Bytes after the last whole record.
    pub trailing_bytes: u64,
}

/// A seekable dump plus the name its base timestamp was derived from.
pub struct DumpSource<R> {
    reader: R,
    filename: String,
    base_time: BaseTime,
}

impl DumpSource<File> {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file, path.to_string_lossy()))
    }
}

impl<R: Read + Seek> DumpSource<R> {
    pub fn new(reader: R, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let base_time = BaseTime::from_filename(&filename);
        Self {
            reader,
            filename,
            base_time,
        }
    }

    pub fn base_time(&self) -> BaseTime {
        self.base_time
    }

    /// Header region bytes; shorter than `HEADER_SIZE` when the file is.
    pub fn read_header(&mut self) -> std::io::Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut header = Vec::with_capacity(HEADER_SIZE);
        (&mut self.reader)
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut header)?;
        Ok(header)
    }
}

#[derive(Default)]
struct FieldCounters {
    rejected_values: u64,
    short_reads: u64,
}

pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Decode every whole record of `source`, calling `on_batch(batch, batch_index)` per batch
    /// in file order. The batch is moved into the callback. Returning `false` stops at that
    /// batch boundary.
    pub fn decode<R, F>(
        &self,
        source: &mut DumpSource<R>,
        device_type: DeviceType,
        mut on_batch: F,
    ) -> Result<DecodeSummary>
    where
        R: Read + Seek,
        F: FnMut(Vec<TelemetryRecord>, usize) -> bool,
    {
        let span = tracing::debug_span!("decode", device = %device_type, filename = %source.filename);
        let _guard = span.enter();

        let file_size = source.reader.seek(SeekFrom::End(0))?;
        if file_size < HEADER_SIZE as u64 {
            return Err(FormatError::FileTooSmall {
                size: file_size,
                minimum: HEADER_SIZE,
            }
            .into());
        }

        let record_size = device_type.record_size();
        let total_records = layout::record_count(file_size, device_type);
        let trailing_bytes = (file_size - HEADER_SIZE as u64) % record_size as u64;
        let batch_size = self.options.effective_batch_size(device_type);
        let table = layout::layout(device_type);
        let interval = device_type.interval_ms();
        let base = source.base_time.millis;

        source.reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;

        let mut scratch: Vec<u8> = Vec::new();
        let mut counters = FieldCounters::default();
        let mut records_decoded: u64 = 0;
        let mut batches: usize = 0;
        let mut cancelled = false;

        while records_decoded < total_records {
            let n = (total_records - records_decoded).min(batch_size as u64) as usize;
            scratch.resize(n * record_size, 0);
            source.reader.read_exact(&mut scratch)?;

            let mut batch = Vec::with_capacity(n);
            for (i, raw) in scratch.chunks_exact(record_size).enumerate() {
                let index = (records_decoded + i as u64) as i64;
                let timestamp = base + index * interval;
                batch.push(decode_record(raw, table, timestamp, device_type, &mut counters));
            }
            records_decoded += n as u64;

            debug!(batch_index = batches, records = n, "batch decoded");
            let keep_going = on_batch(batch, batches);
            batches += 1;

            if let Some(every) = self.options.reclaim_every
                && every > 0
                && batches % every == 0
            {
                scratch = Vec::new();
                trace!(batch_index = batches - 1, "read buffer released");
            }

            if !keep_going {
                cancelled = records_decoded < total_records;
                if cancelled {
                    debug!(records_decoded, total_records, "decode cancelled by sink");
                }
                break;
            }
        }

        Ok(DecodeSummary {
            device_type,
            base_time: base,
            timestamp_source: source.base_time.source,
            total_records,
            records_decoded,
            batches,
            batch_size,
            cancelled,
            rejected_values: counters.rejected_values,
            short_reads: counters.short_reads,
            trailing_bytes,
        })
    }

    /// Decode a whole dump into memory. For small dumps and tests.
    pub fn decode_to_vec<R: Read + Seek>(
        &self,
        source: &mut DumpSource<R>,
        device_type: DeviceType,
    ) -> Result<(Vec<TelemetryRecord>, DecodeSummary)> {
        let mut records = Vec::new();
        let summary = self.decode(source, device_type, |batch, _| {
            records.extend(batch);
            true
        })?;
        Ok((records, summary))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

/// Apply the field table to one raw record. Bad values null their field only.
fn decode_record(
    raw: &[u8],
    table: &[FieldSpec],
    timestamp: i64,
    device_type: DeviceType,
    counters: &mut FieldCounters,
) -> TelemetryRecord {
    let mut record = TelemetryRecord::new(timestamp, device_type);
    for spec in table {
        let Some(raw_value) = reader::read_primitive(raw, spec.offset, spec.primitive) else {
            counters.short_reads += 1;
            continue;
        };
        let value = spec.conversion.apply(raw_value);
        if spec.in_range(value) {
            record.set(spec.field, value);
        } else {
            counters.rejected_values += 1;
        }
    }
    record
}
