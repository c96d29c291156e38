// Device identity and operational counters read from a dump header

use serde::{Deserialize, Serialize};
use std::fmt;

use super::DeviceType;

/// Why a header value had to be synthesized instead of read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DerivationBasis {
    /// Parsed from a token in the dump filename.
    Filename,
    /// Deterministic hash of the filename and header bytes; not a measurement.
    ContentHash,
}

/// A header value tagged with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum HeaderValue<T> {
    /// Read at `offset` in the header and inside the plausible range.
    Measured { value: T, offset: usize },
    /// No valid header value; synthesized.
    Derived { value: T, basis: DerivationBasis },
}

impl<T> HeaderValue<T> {
    pub fn value(&self) -> &T {
        match self {
            HeaderValue::Measured { value, .. } | HeaderValue::Derived { value, .. } => value,
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, HeaderValue::Measured { .. })
    }

    /// Transform the value, keeping its provenance (e.g. °C → °F).
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> HeaderValue<U> {
        match self {
            HeaderValue::Measured { value, offset } => HeaderValue::Measured {
                value: f(value),
                offset,
            },
            HeaderValue::Derived { value, basis } => HeaderValue::Derived {
                value: f(value),
                basis,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Identity and lifetime counters for one dump. Every value is populated; check
/// `HeaderValue::is_measured` to tell readings from synthesized filler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub mp_serial: HeaderValue<u32>,
    pub mdg_serial: HeaderValue<u32>,
    pub mp_firmware: HeaderValue<FirmwareVersion>,
    pub mdg_firmware: HeaderValue<FirmwareVersion>,
    pub max_temperature_c: HeaderValue<f32>,
    pub max_temperature_f: HeaderValue<f32>,
    pub avg_temperature_c: HeaderValue<f32>,
    pub avg_temperature_f: HeaderValue<f32>,
    pub circulation_hours: HeaderValue<f32>,
    pub pulse_count: HeaderValue<u32>,
    pub motor_on_minutes: HeaderValue<f32>,
    pub comm_error_seconds: HeaderValue<f32>,
    pub comm_error_percent: HeaderValue<f32>,
    pub hall_status_seconds: HeaderValue<f32>,
    pub hall_status_percent: HeaderValue<f32>,
    /// MDG only.
    pub edt_hours: Option<HeaderValue<f32>>,
    /// MDG only.
    pub extreme_shock_index: Option<HeaderValue<f32>>,
}

impl DeviceInfo {
    /// Number of values that were synthesized rather than measured.
    pub fn derived_count(&self) -> usize {
        let flags = [
            self.mp_serial.is_measured(),
            self.mdg_serial.is_measured(),
            self.mp_firmware.is_measured(),
            self.mdg_firmware.is_measured(),
            self.max_temperature_c.is_measured(),
            self.avg_temperature_c.is_measured(),
            self.circulation_hours.is_measured(),
            self.pulse_count.is_measured(),
            self.motor_on_minutes.is_measured(),
            self.comm_error_seconds.is_measured(),
            self.comm_error_percent.is_measured(),
            self.hall_status_seconds.is_measured(),
            self.hall_status_percent.is_measured(),
            self.edt_hours.is_none_or(|v| v.is_measured()),
            self.extreme_shock_index.is_none_or(|v| v.is_measured()),
        ];
        flags.iter().filter(|measured| !**measured).count()
    }
}
