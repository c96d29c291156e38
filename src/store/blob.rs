// Record BLOB layout: [version: u8][wincode TelemetryRecord].

use crate::models::TelemetryRecord;

pub(super) const RECORD_BLOB_VERSION: u8 = 1;

pub(super) fn with_version_prefix(version: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(version);
    out.extend_from_slice(&payload);
    out
}

pub(super) fn blob_version(bytes: &[u8]) -> u8 {
    bytes.first().copied().unwrap_or(0)
}

/// Payload after the version byte. Rows written by an unknown version are an error, not a guess.
pub(super) fn blob_payload(bytes: &[u8], expected_version: u8) -> anyhow::Result<&[u8]> {
    let version = blob_version(bytes);
    anyhow::ensure!(
        version == expected_version,
        "record blob version {} not supported (expected {})",
        version,
        expected_version
    );
    Ok(&bytes[1..])
}

pub(super) fn encode_record(record: &TelemetryRecord) -> anyhow::Result<Vec<u8>> {
    let payload = wincode::serialize(record).map_err(|e| anyhow::anyhow!("wincode: {}", e))?;
    Ok(with_version_prefix(RECORD_BLOB_VERSION, payload))
}

pub(super) fn decode_record(bytes: &[u8]) -> anyhow::Result<TelemetryRecord> {
    let payload = blob_payload(bytes, RECORD_BLOB_VERSION)?;
    wincode::deserialize(payload)
        .map_err(|e| anyhow::anyhow!("wincode deserialize telemetry record: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceType;

    #[test]
    fn encoded_record_carries_version_byte() {
        let mut record = TelemetryRecord::new(1_000, DeviceType::Mdg);
        record.readings.shock_z = Some(12.5);
        record.readings.shock_axial_50g = Some(3);

        let blob = encode_record(&record).unwrap();
        assert_eq!(blob_version(&blob), RECORD_BLOB_VERSION);
        assert_eq!(decode_record(&blob).unwrap(), record);
    }

    #[test]
    fn unknown_or_empty_blob_is_rejected() {
        assert!(blob_payload(&[], RECORD_BLOB_VERSION).is_err());
        assert!(blob_payload(&[9, 1, 2], RECORD_BLOB_VERSION).is_err());
        assert_eq!(blob_payload(&[1, 7], RECORD_BLOB_VERSION).unwrap(), &[7]);
    }
}
