// Shared test helpers: synthetic dump bytes and record series

#![allow(dead_code)]

use drilldump::layout::HEADER_SIZE;
use drilldump::models::*;
use std::path::{Path, PathBuf};

/// 2024-03-15T14:30:22Z, the stamp in the filenames below.
pub const BASE_TIME: i64 = 1_710_513_022_000;
pub const MP_FILENAME: &str = "MP_2207_20240315_143022.bin";
pub const MDG_FILENAME: &str = "MDG_4411_20240315_143022.bin";

/// Header plus zeroed records, with typed little-endian pokes.
pub struct DumpBuilder {
    header: Vec<u8>,
    records: Vec<Vec<u8>>,
    record_size: usize,
    trailing: usize,
}

impl DumpBuilder {
    pub fn new(device_type: DeviceType, records: usize) -> Self {
        let record_size = device_type.record_size();
        Self {
            header: vec![0; HEADER_SIZE],
            records: vec![vec![0; record_size]; records],
            record_size,
            trailing: 0,
        }
    }

    pub fn mp(records: usize) -> Self {
        Self::new(DeviceType::Mp, records)
    }

    pub fn mdg(records: usize) -> Self {
        Self::new(DeviceType::Mdg, records)
    }

    pub fn f32_at(mut self, record: usize, offset: usize, value: f32) -> Self {
        self.records[record][offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u16_at(mut self, record: usize, offset: usize, value: u16) -> Self {
        self.records[record][offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u8_at(mut self, record: usize, offset: usize, value: u8) -> Self {
        self.records[record][offset] = value;
        self
    }

    /// Same f32 at `offset` in every record.
    pub fn f32_all(mut self, offset: usize, value: f32) -> Self {
        for record in &mut self.records {
            record[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        self
    }

    pub fn header_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.header[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn header_f32(self, offset: usize, value: f32) -> Self {
        self.header_bytes(offset, &value.to_le_bytes())
    }

    pub fn header_u16(self, offset: usize, value: u16) -> Self {
        self.header_bytes(offset, &value.to_le_bytes())
    }

    pub fn header_u32(self, offset: usize, value: u32) -> Self {
        self.header_bytes(offset, &value.to_le_bytes())
    }

    /// Partial record appended after the last whole one.
    pub fn trailing(mut self, bytes: usize) -> Self {
        assert!(bytes < self.record_size);
        self.trailing = bytes;
        self
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header.clone();
        for record in &self.records {
            out.extend_from_slice(record);
        }
        out.extend(std::iter::repeat_n(0xAB, self.trailing));
        out
    }

    pub fn write_to(&self, dir: &Path, filename: &str) -> PathBuf {
        let path = dir.join(filename);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

/// `n` records one interval apart from `BASE_TIME`, each shaped by `fill(index, readings)`.
pub fn series(
    device_type: DeviceType,
    n: usize,
    fill: impl Fn(usize, &mut SensorReadings),
) -> Vec<TelemetryRecord> {
    (0..n)
        .map(|i| {
            let mut record =
                TelemetryRecord::new(BASE_TIME + i as i64 * device_type.interval_ms(), device_type);
            fill(i, &mut record.readings);
            record
        })
        .collect()
}

/// MP series with a steady 100°F temperature unless `fill` overrides it, so the temperature
/// detector stays quiet in tests aimed at other fields.
pub fn mp_series(n: usize, fill: impl Fn(usize, &mut SensorReadings)) -> Vec<TelemetryRecord> {
    series(DeviceType::Mp, n, |i, r| {
        r.temperature = Some(100.0);
        fill(i, r);
    })
}

pub fn mdg_series(n: usize, fill: impl Fn(usize, &mut SensorReadings)) -> Vec<TelemetryRecord> {
    series(DeviceType::Mdg, n, fill)
}

pub fn issues_labelled<'a>(result: &'a AnalysisResult, label: &str) -> Vec<&'a Issue> {
    result.issues.iter().filter(|i| i.label == label).collect()
}
