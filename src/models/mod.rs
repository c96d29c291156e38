// Domain models: decoded telemetry records, header identity, analysis output

mod analysis;
mod device;
mod record;

pub use analysis::{AnalysisResult, Issue, OverallStatus, Severity};
pub use device::{DerivationBasis, DeviceInfo, FirmwareVersion, HeaderValue};
pub use record::{DeviceType, Field, SensorReadings, TelemetryRecord};
