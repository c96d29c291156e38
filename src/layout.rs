// Field offset table: byte layout of MP and MDG records.
// Ranges are inclusive and apply to the converted value.

use crate::models::{DeviceType, Field};
use Primitive::{F32, U8, U16};

/// Fixed header region at the start of every dump; skipped by the record decoder.
pub const HEADER_SIZE: usize = 256;
pub const MP_RECORD_SIZE: usize = 64;
pub const MDG_RECORD_SIZE: usize = 128;
pub const MP_INTERVAL_MS: i64 = 1_000;
pub const MDG_INTERVAL_MS: i64 = 2_000;

/// Little-endian primitive stored at a field offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    F32,
    U8,
    U16,
    U32,
}

impl Primitive {
    pub fn width(self) -> usize {
        match self {
            Primitive::U8 => 1,
            Primitive::U16 => 2,
            Primitive::F32 | Primitive::U32 => 4,
        }
    }
}

/// Unit conversion applied to the raw value before the range check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    None,
    /// Raw integer counts divided down to engineering units.
    Divisor(f64),
    CelsiusToFahrenheit,
}

impl Conversion {
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            Conversion::None => raw,
            Conversion::Divisor(divisor) => raw / divisor,
            Conversion::CelsiusToFahrenheit => raw * 9.0 / 5.0 + 32.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub field: Field,
    pub offset: usize,
    pub primitive: Primitive,
    pub conversion: Conversion,
    pub min: f64,
    pub max: f64,
}

impl FieldSpec {
    const fn new(field: Field, offset: usize, primitive: Primitive, min: f64, max: f64) -> Self {
        Self {
            field,
            offset,
            primitive,
            conversion: Conversion::None,
            min,
            max,
        }
    }

    const fn converted(mut self, conversion: Conversion) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn in_range(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

pub static MP_LAYOUT: &[FieldSpec] = &[
    FieldSpec::new(Field::Temperature, 0, F32, -40.0, 350.0)
        .converted(Conversion::CelsiusToFahrenheit),
    FieldSpec::new(Field::Reset, 4, U8, 0.0, 1.0),
    FieldSpec::new(Field::FlowStatus, 5, U8, 0.0, 1.0),
    FieldSpec::new(Field::MotorHall, 6, U16, 0.0, 10_000.0),
    FieldSpec::new(Field::BatteryVoltage, 8, F32, 0.0, 50.0),
    FieldSpec::new(Field::BatteryCurrent, 12, F32, 0.0, 10.0),
    FieldSpec::new(Field::VibrationX, 16, F32, -100.0, 100.0),
    FieldSpec::new(Field::VibrationY, 20, F32, -100.0, 100.0),
    FieldSpec::new(Field::VibrationZ, 24, F32, -100.0, 100.0),
    FieldSpec::new(Field::VibrationThreshold, 28, F32, 0.0, 100.0),
    FieldSpec::new(Field::MotorMin, 32, F32, 0.0, 20.0),
    FieldSpec::new(Field::MotorAvg, 36, F32, 0.0, 20.0),
    FieldSpec::new(Field::MotorMax, 40, F32, 0.0, 20.0),
    FieldSpec::new(Field::ActuationTime, 44, F32, 0.0, 10_000.0),
    // Secondary RPM range; bytes 54..64 are reserved.
    FieldSpec::new(Field::RpmMax, 48, U16, 0.0, 5_000.0),
    FieldSpec::new(Field::RpmAvg, 50, U16, 0.0, 5_000.0),
    FieldSpec::new(Field::RpmMin, 52, U16, 0.0, 5_000.0),
];

pub static MDG_LAYOUT: &[FieldSpec] = &[
    FieldSpec::new(Field::AccelX, 0, F32, -100.0, 100.0),
    FieldSpec::new(Field::AccelY, 4, F32, -100.0, 100.0),
    FieldSpec::new(Field::AccelZ, 8, F32, -100.0, 100.0),
    FieldSpec::new(Field::ShockX, 12, F32, -500.0, 500.0),
    FieldSpec::new(Field::ShockY, 16, F32, -500.0, 500.0),
    FieldSpec::new(Field::ShockZ, 20, F32, -500.0, 500.0),
    FieldSpec::new(Field::ShockAxial50g, 24, U16, 0.0, 10_000.0),
    FieldSpec::new(Field::ShockAxial100g, 26, U16, 0.0, 10_000.0),
    FieldSpec::new(Field::ShockLateral50g, 28, U16, 0.0, 10_000.0),
    FieldSpec::new(Field::ShockLateral100g, 30, U16, 0.0, 10_000.0),
    FieldSpec::new(Field::RpmMax, 32, F32, 0.0, 5_000.0),
    FieldSpec::new(Field::RpmAvg, 36, F32, 0.0, 5_000.0),
    FieldSpec::new(Field::RpmMin, 40, F32, 0.0, 5_000.0),
    FieldSpec::new(Field::Rail1V2, 44, F32, 0.0, 10.0),
    FieldSpec::new(Field::Rail1V8, 48, F32, 0.0, 10.0),
    FieldSpec::new(Field::Rail2V5, 52, F32, 0.0, 10.0),
    FieldSpec::new(Field::Rail3V3, 56, F32, 0.0, 10.0),
    FieldSpec::new(Field::Rail5V, 60, F32, 0.0, 10.0),
    FieldSpec::new(Field::RailAnalog, 64, F32, 0.0, 10.0),
    FieldSpec::new(Field::RailReference, 68, F32, 0.0, 10.0),
    FieldSpec::new(Field::CurrentMain, 72, F32, 0.0, 20.0),
    FieldSpec::new(Field::CurrentSensor, 76, F32, 0.0, 20.0),
    FieldSpec::new(Field::CurrentTelemetry, 80, F32, 0.0, 20.0),
    FieldSpec::new(Field::Gamma, 84, F32, 0.0, 1_000.0),
    FieldSpec::new(Field::StabilityX, 88, F32, 0.0, 100.0),
    FieldSpec::new(Field::StabilityY, 92, F32, 0.0, 100.0),
    FieldSpec::new(Field::StabilityZ, 96, F32, 0.0, 100.0),
    FieldSpec::new(Field::StabilityTotal, 100, F32, 0.0, 100.0),
    FieldSpec::new(Field::Inclination, 104, F32, 0.0, 180.0),
    FieldSpec::new(Field::Azimuth, 108, F32, 0.0, 360.0),
    FieldSpec::new(Field::GravityToolface, 112, F32, 0.0, 360.0),
    FieldSpec::new(Field::TotalGravity, 116, F32, 0.0, 2.0),
    FieldSpec::new(Field::MagneticToolface, 120, U16, 0.0, 360.0)
        .converted(Conversion::Divisor(10.0)),
    FieldSpec::new(Field::DipAngle, 122, U16, 0.0, 90.0)
        .converted(Conversion::Divisor(100.0)),
    FieldSpec::new(Field::TotalMagneticField, 124, U16, 0.0, 2.0)
        .converted(Conversion::Divisor(1000.0)),
];

/// Field table for a device type.
pub fn layout(device_type: DeviceType) -> &'static [FieldSpec] {
    match device_type {
        DeviceType::Mp => MP_LAYOUT,
        DeviceType::Mdg => MDG_LAYOUT,
    }
}

/// Whether records of this device type can ever carry `field`.
pub fn carries(device_type: DeviceType, field: Field) -> bool {
    layout(device_type).iter().any(|s| s.field == field)
}

/// Number of whole records after the header; a trailing partial record is ignored.
pub fn record_count(file_size: u64, device_type: DeviceType) -> u64 {
    file_size.saturating_sub(HEADER_SIZE as u64) / device_type.record_size() as u64
}
