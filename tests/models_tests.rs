// Model serialization tests (JSON camelCase, wincode roundtrip)

use drilldump::models::*;

#[test]
fn test_record_serializes_flat_camel_case() {
    let mut record = TelemetryRecord::new(1_710_513_022_000, DeviceType::Mdg);
    record.readings.shock_axial_50g = Some(12);
    record.readings.rail_3v3 = Some(3.3);
    record.readings.gamma = Some(42.5);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["timestamp"], 1_710_513_022_000i64);
    assert_eq!(json["deviceType"], "MDG");
    assert_eq!(json["shockAxial50g"], 12);
    assert_eq!(json["gamma"], 42.5);
    assert!(json["temperature"].is_null());
    assert!(json.get("readings").is_none());

    let back: TelemetryRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_record_wincode_roundtrip() {
    let mut record = TelemetryRecord::new(5_000, DeviceType::Mp);
    record.readings.temperature = Some(212.0);
    record.readings.flow_on = Some(false);
    record.readings.motor_hall = Some(1200);
    let bytes = wincode::serialize(&record).unwrap();
    let back: TelemetryRecord = wincode::deserialize(&bytes).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_record_get_reads_flags_as_numbers() {
    let mut record = TelemetryRecord::new(0, DeviceType::Mp);
    record.readings.flow_on = Some(true);
    record.readings.reset = Some(false);
    record.readings.motor_hall = Some(900);
    assert_eq!(record.get(Field::FlowStatus), Some(1.0));
    assert_eq!(record.get(Field::Reset), Some(0.0));
    assert_eq!(record.get(Field::MotorHall), Some(900.0));
    assert_eq!(record.get(Field::Gamma), None);
}

#[test]
fn test_device_type_parsing_and_filename_detection() {
    assert_eq!("mp".parse::<DeviceType>().unwrap(), DeviceType::Mp);
    assert_eq!(" MDG ".parse::<DeviceType>().unwrap(), DeviceType::Mdg);
    assert!("gyro".parse::<DeviceType>().is_err());

    assert_eq!(
        DeviceType::from_filename("MP_2207_20240315_143022.bin"),
        Some(DeviceType::Mp)
    );
    assert_eq!(
        DeviceType::from_filename("/data/dumps/mdg_4411.bin"),
        Some(DeviceType::Mdg)
    );
    // "MPX" is not a device tag
    assert_eq!(DeviceType::from_filename("MPX_log.bin"), None);
    assert_eq!(DeviceType::Mdg.to_string(), "MDG");
}

#[test]
fn test_severity_and_status_serialize_lowercase() {
    assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
    assert_eq!(
        serde_json::to_string(&OverallStatus::Operational).unwrap(),
        "\"operational\""
    );
    assert!(Severity::Critical > Severity::Warning);
    assert!(Severity::Warning > Severity::Info);
}

#[test]
fn test_issue_caps_occurrences_but_keeps_totals() {
    let ts: Vec<i64> = (0..10).map(|i| i * 1_000).collect();
    let issue = Issue::new("Label", "why", Severity::Info, &ts, 3);
    assert_eq!(issue.count, 10);
    assert_eq!(issue.occurrences, vec![0, 1_000, 2_000]);
    assert_eq!(issue.first_timestamp, Some(0));
    assert_eq!(issue.last_timestamp, Some(9_000));

    let json = serde_json::to_value(&issue).unwrap();
    assert_eq!(json["firstTimestamp"], 0);
    assert_eq!(json["severity"], "info");
}

#[test]
fn test_analysis_result_status_follows_issues() {
    let info = Issue::new("a", "", Severity::Info, &[1], 10);
    let warning = Issue::new("b", "", Severity::Warning, &[1], 10);
    let critical = Issue::new("c", "", Severity::Critical, &[1], 10);

    let empty = AnalysisResult::from_issues(0, vec![]);
    assert_eq!(empty.overall_status, OverallStatus::Operational);
    let only_info = AnalysisResult::from_issues(5, vec![info.clone()]);
    assert_eq!(only_info.overall_status, OverallStatus::Operational);
    let warned = AnalysisResult::from_issues(5, vec![info.clone(), warning.clone()]);
    assert_eq!(warned.overall_status, OverallStatus::Warning);
    assert_eq!(warned.warning_count, 1);
    let critical = AnalysisResult::from_issues(5, vec![info, warning, critical]);
    assert_eq!(critical.overall_status, OverallStatus::Critical);
    assert_eq!((critical.critical_count, critical.warning_count), (1, 1));
}
