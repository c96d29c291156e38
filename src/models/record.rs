// Decoded telemetry records: device type, field catalogue, one sample per record

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use wincode::{SchemaRead, SchemaWrite};

use crate::error::FormatError;
use crate::layout;

/// Tool class that produced a dump. Each has its own record layout and sampling interval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SchemaRead, SchemaWrite,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    Mp,
    Mdg,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Mp => "MP",
            DeviceType::Mdg => "MDG",
        }
    }

    /// Bytes per record in the dump body.
    pub fn record_size(self) -> usize {
        match self {
            DeviceType::Mp => layout::MP_RECORD_SIZE,
            DeviceType::Mdg => layout::MDG_RECORD_SIZE,
        }
    }

    /// Fixed sampling interval between consecutive records, in milliseconds.
    pub fn interval_ms(self) -> i64 {
        match self {
            DeviceType::Mp => layout::MP_INTERVAL_MS,
            DeviceType::Mdg => layout::MDG_INTERVAL_MS,
        }
    }

    /// Guess the device type from a dump filename ("MDG_4411_...", "run-mp2-...").
    /// MDG tokens win over MP tokens.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename)
            .to_ascii_uppercase();
        let tokens: Vec<&str> = name
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.iter().any(|t| t.starts_with("MDG")) {
            return Some(DeviceType::Mdg);
        }
        let is_mp = |t: &&str| {
            t.strip_prefix("MP")
                .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
        };
        if tokens.iter().any(is_mp) {
            return Some(DeviceType::Mp);
        }
        None
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp" => Ok(DeviceType::Mp),
            "mdg" => Ok(DeviceType::Mdg),
            other => Err(FormatError::UnknownDeviceType(other.to_string())),
        }
    }
}

/// Every optional sensor field a record can carry. Order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Temperature,
    Reset,
    FlowStatus,
    BatteryVoltage,
    BatteryCurrent,
    VibrationX,
    VibrationY,
    VibrationZ,
    VibrationThreshold,
    MotorMin,
    MotorAvg,
    MotorMax,
    MotorHall,
    ActuationTime,
    AccelX,
    AccelY,
    AccelZ,
    ShockX,
    ShockY,
    ShockZ,
    ShockAxial50g,
    ShockAxial100g,
    ShockLateral50g,
    ShockLateral100g,
    RpmMax,
    RpmAvg,
    RpmMin,
    Rail1V2,
    Rail1V8,
    Rail2V5,
    Rail3V3,
    Rail5V,
    RailAnalog,
    RailReference,
    CurrentMain,
    CurrentSensor,
    CurrentTelemetry,
    Gamma,
    StabilityX,
    StabilityY,
    StabilityZ,
    StabilityTotal,
    Inclination,
    Azimuth,
    GravityToolface,
    TotalGravity,
    MagneticToolface,
    DipAngle,
    TotalMagneticField,
}

impl Field {
    pub const ALL: [Field; 49] = [
        Field::Temperature,
        Field::Reset,
        Field::FlowStatus,
        Field::BatteryVoltage,
        Field::BatteryCurrent,
        Field::VibrationX,
        Field::VibrationY,
        Field::VibrationZ,
        Field::VibrationThreshold,
        Field::MotorMin,
        Field::MotorAvg,
        Field::MotorMax,
        Field::MotorHall,
        Field::ActuationTime,
        Field::AccelX,
        Field::AccelY,
        Field::AccelZ,
        Field::ShockX,
        Field::ShockY,
        Field::ShockZ,
        Field::ShockAxial50g,
        Field::ShockAxial100g,
        Field::ShockLateral50g,
        Field::ShockLateral100g,
        Field::RpmMax,
        Field::RpmAvg,
        Field::RpmMin,
        Field::Rail1V2,
        Field::Rail1V8,
        Field::Rail2V5,
        Field::Rail3V3,
        Field::Rail5V,
        Field::RailAnalog,
        Field::RailReference,
        Field::CurrentMain,
        Field::CurrentSensor,
        Field::CurrentTelemetry,
        Field::Gamma,
        Field::StabilityX,
        Field::StabilityY,
        Field::StabilityZ,
        Field::StabilityTotal,
        Field::Inclination,
        Field::Azimuth,
        Field::GravityToolface,
        Field::TotalGravity,
        Field::MagneticToolface,
        Field::DipAngle,
        Field::TotalMagneticField,
    ];

    /// The seven system voltage rails, checked independently for instability.
    pub const SYSTEM_RAILS: [Field; 7] = [
        Field::Rail1V2,
        Field::Rail1V8,
        Field::Rail2V5,
        Field::Rail3V3,
        Field::Rail5V,
        Field::RailAnalog,
        Field::RailReference,
    ];

    /// Display name used in issue labels and summaries.
    pub fn label(self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Reset => "reset",
            Field::FlowStatus => "flow status",
            Field::BatteryVoltage => "battery voltage",
            Field::BatteryCurrent => "battery current",
            Field::VibrationX => "vibration X",
            Field::VibrationY => "vibration Y",
            Field::VibrationZ => "vibration Z",
            Field::VibrationThreshold => "vibration threshold",
            Field::MotorMin => "motor current min",
            Field::MotorAvg => "motor current avg",
            Field::MotorMax => "motor current max",
            Field::MotorHall => "motor hall",
            Field::ActuationTime => "actuation time",
            Field::AccelX => "acceleration X",
            Field::AccelY => "acceleration Y",
            Field::AccelZ => "acceleration Z",
            Field::ShockX => "shock X",
            Field::ShockY => "shock Y",
            Field::ShockZ => "shock Z",
            Field::ShockAxial50g => "axial shock count >50g",
            Field::ShockAxial100g => "axial shock count >100g",
            Field::ShockLateral50g => "lateral shock count >50g",
            Field::ShockLateral100g => "lateral shock count >100g",
            Field::RpmMax => "rotation max",
            Field::RpmAvg => "rotation avg",
            Field::RpmMin => "rotation min",
            Field::Rail1V2 => "1.2V rail",
            Field::Rail1V8 => "1.8V rail",
            Field::Rail2V5 => "2.5V rail",
            Field::Rail3V3 => "3.3V rail",
            Field::Rail5V => "5V rail",
            Field::RailAnalog => "analog rail",
            Field::RailReference => "reference rail",
            Field::CurrentMain => "main current",
            Field::CurrentSensor => "sensor current",
            Field::CurrentTelemetry => "telemetry current",
            Field::Gamma => "gamma",
            Field::StabilityX => "stability X",
            Field::StabilityY => "stability Y",
            Field::StabilityZ => "stability Z",
            Field::StabilityTotal => "stability total",
            Field::Inclination => "inclination",
            Field::Azimuth => "azimuth",
            Field::GravityToolface => "gravity toolface",
            Field::TotalGravity => "total gravity",
            Field::MagneticToolface => "magnetic toolface",
            Field::DipAngle => "dip angle",
            Field::TotalMagneticField => "total magnetic field",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional sensor values of one sample. A field the device does not report is always `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadings {
    /// Degrees Fahrenheit (converted from the device's Celsius).
    pub temperature: Option<f32>,
    pub reset: Option<bool>,
    pub flow_on: Option<bool>,
    pub battery_voltage: Option<f32>,
    pub battery_current: Option<f32>,
    pub vibration_x: Option<f32>,
    pub vibration_y: Option<f32>,
    pub vibration_z: Option<f32>,
    pub vibration_threshold: Option<f32>,
    pub motor_min: Option<f32>,
    pub motor_avg: Option<f32>,
    pub motor_max: Option<f32>,
    pub motor_hall: Option<u16>,
    /// Milliseconds.
    pub actuation_time: Option<f32>,
    pub accel_x: Option<f32>,
    pub accel_y: Option<f32>,
    pub accel_z: Option<f32>,
    pub shock_x: Option<f32>,
    pub shock_y: Option<f32>,
    pub shock_z: Option<f32>,
    pub shock_axial_50g: Option<u16>,
    pub shock_axial_100g: Option<u16>,
    pub shock_lateral_50g: Option<u16>,
    pub shock_lateral_100g: Option<u16>,
    pub rpm_max: Option<f32>,
    pub rpm_avg: Option<f32>,
    pub rpm_min: Option<f32>,
    pub rail_1v2: Option<f32>,
    pub rail_1v8: Option<f32>,
    pub rail_2v5: Option<f32>,
    pub rail_3v3: Option<f32>,
    pub rail_5v: Option<f32>,
    pub rail_analog: Option<f32>,
    pub rail_reference: Option<f32>,
    pub current_main: Option<f32>,
    pub current_sensor: Option<f32>,
    pub current_telemetry: Option<f32>,
    /// Counts per second.
    pub gamma: Option<f32>,
    pub stability_x: Option<f32>,
    pub stability_y: Option<f32>,
    pub stability_z: Option<f32>,
    pub stability_total: Option<f32>,
    pub inclination: Option<f32>,
    pub azimuth: Option<f32>,
    pub gravity_toolface: Option<f32>,
    pub total_gravity: Option<f32>,
    pub magnetic_toolface: Option<f32>,
    pub dip_angle: Option<f32>,
    pub total_magnetic_field: Option<f32>,
}

/// One decoded sample. Created by the decoder, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// Unix epoch milliseconds (UTC).
    pub timestamp: i64,
    pub device_type: DeviceType,
    #[serde(flatten)]
    pub readings: SensorReadings,
}

impl TelemetryRecord {
    pub fn new(timestamp: i64, device_type: DeviceType) -> Self {
        Self {
            timestamp,
            device_type,
            readings: SensorReadings::default(),
        }
    }

    /// Numeric view of a field; flags read as 0.0 / 1.0.
    pub fn get(&self, field: Field) -> Option<f64> {
        let r = &self.readings;
        let flag = |v: Option<bool>| v.map(|b| if b { 1.0 } else { 0.0 });
        let count = |v: Option<u16>| v.map(f64::from);
        let float = |v: Option<f32>| v.map(f64::from);
        match field {
            Field::Temperature => float(r.temperature),
            Field::Reset => flag(r.reset),
            Field::FlowStatus => flag(r.flow_on),
            Field::BatteryVoltage => float(r.battery_voltage),
            Field::BatteryCurrent => float(r.battery_current),
            Field::VibrationX => float(r.vibration_x),
            Field::VibrationY => float(r.vibration_y),
            Field::VibrationZ => float(r.vibration_z),
            Field::VibrationThreshold => float(r.vibration_threshold),
            Field::MotorMin => float(r.motor_min),
            Field::MotorAvg => float(r.motor_avg),
            Field::MotorMax => float(r.motor_max),
            Field::MotorHall => count(r.motor_hall),
            Field::ActuationTime => float(r.actuation_time),
            Field::AccelX => float(r.accel_x),
            Field::AccelY => float(r.accel_y),
            Field::AccelZ => float(r.accel_z),
            Field::ShockX => float(r.shock_x),
            Field::ShockY => float(r.shock_y),
            Field::ShockZ => float(r.shock_z),
            Field::ShockAxial50g => count(r.shock_axial_50g),
            Field::ShockAxial100g => count(r.shock_axial_100g),
            Field::ShockLateral50g => count(r.shock_lateral_50g),
            Field::ShockLateral100g => count(r.shock_lateral_100g),
            Field::RpmMax => float(r.rpm_max),
            Field::RpmAvg => float(r.rpm_avg),
            Field::RpmMin => float(r.rpm_min),
            Field::Rail1V2 => float(r.rail_1v2),
            Field::Rail1V8 => float(r.rail_1v8),
            Field::Rail2V5 => float(r.rail_2v5),
            Field::Rail3V3 => float(r.rail_3v3),
            Field::Rail5V => float(r.rail_5v),
            Field::RailAnalog => float(r.rail_analog),
            Field::RailReference => float(r.rail_reference),
            Field::CurrentMain => float(r.current_main),
            Field::CurrentSensor => float(r.current_sensor),
            Field::CurrentTelemetry => float(r.current_telemetry),
            Field::Gamma => float(r.gamma),
            Field::StabilityX => float(r.stability_x),
            Field::StabilityY => float(r.stability_y),
            Field::StabilityZ => float(r.stability_z),
            Field::StabilityTotal => float(r.stability_total),
            Field::Inclination => float(r.inclination),
            Field::Azimuth => float(r.azimuth),
            Field::GravityToolface => float(r.gravity_toolface),
            Field::TotalGravity => float(r.total_gravity),
            Field::MagneticToolface => float(r.magnetic_toolface),
            Field::DipAngle => float(r.dip_angle),
            Field::TotalMagneticField => float(r.total_magnetic_field),
        }
    }

    /// Store an already validated value. Flags are set for any non-zero value.
    pub fn set(&mut self, field: Field, value: f64) {
        let r = &mut self.readings;
        let flag = Some(value != 0.0);
        let count = Some(value as u16);
        let float = Some(value as f32);
        match field {
            Field::Temperature => r.temperature = float,
            Field::Reset => r.reset = flag,
            Field::FlowStatus => r.flow_on = flag,
            Field::BatteryVoltage => r.battery_voltage = float,
            Field::BatteryCurrent => r.battery_current = float,
            Field::VibrationX => r.vibration_x = float,
            Field::VibrationY => r.vibration_y = float,
            Field::VibrationZ => r.vibration_z = float,
            Field::VibrationThreshold => r.vibration_threshold = float,
            Field::MotorMin => r.motor_min = float,
            Field::MotorAvg => r.motor_avg = float,
            Field::MotorMax => r.motor_max = float,
            Field::MotorHall => r.motor_hall = count,
            Field::ActuationTime => r.actuation_time = float,
            Field::AccelX => r.accel_x = float,
            Field::AccelY => r.accel_y = float,
            Field::AccelZ => r.accel_z = float,
            Field::ShockX => r.shock_x = float,
            Field::ShockY => r.shock_y = float,
            Field::ShockZ => r.shock_z = float,
            Field::ShockAxial50g => r.shock_axial_50g = count,
            Field::ShockAxial100g => r.shock_axial_100g = count,
            Field::ShockLateral50g => r.shock_lateral_50g = count,
            Field::ShockLateral100g => r.shock_lateral_100g = count,
            Field::RpmMax => r.rpm_max = float,
            Field::RpmAvg => r.rpm_avg = float,
            Field::RpmMin => r.rpm_min = float,
            Field::Rail1V2 => r.rail_1v2 = float,
            Field::Rail1V8 => r.rail_1v8 = float,
            Field::Rail2V5 => r.rail_2v5 = float,
            Field::Rail3V3 => r.rail_3v3 = float,
            Field::Rail5V => r.rail_5v = float,
            Field::RailAnalog => r.rail_analog = float,
            Field::RailReference => r.rail_reference = float,
            Field::CurrentMain => r.current_main = float,
            Field::CurrentSensor => r.current_sensor = float,
            Field::CurrentTelemetry => r.current_telemetry = float,
            Field::Gamma => r.gamma = float,
            Field::StabilityX => r.stability_x = float,
            Field::StabilityY => r.stability_y = float,
            Field::StabilityZ => r.stability_z = float,
            Field::StabilityTotal => r.stability_total = float,
            Field::Inclination => r.inclination = float,
            Field::Azimuth => r.azimuth = float,
            Field::GravityToolface => r.gravity_toolface = float,
            Field::TotalGravity => r.total_gravity = float,
            Field::MagneticToolface => r.magnetic_toolface = float,
            Field::DipAngle => r.dip_angle = float,
            Field::TotalMagneticField => r.total_magnetic_field = float,
        }
    }
}
