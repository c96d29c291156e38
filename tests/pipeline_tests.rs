// Dump pipeline tests: end-to-end processing, device type resolution, failure marking

mod common;

use common::*;
use drilldump::config::AppConfig;
use drilldump::decoder::BaseTime;
use drilldump::error::{DecodeError, FormatError};
use drilldump::models::*;
use drilldump::pipeline::{process_dump, resolve_device_type};
use drilldump::store::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn config_for(dir: &TempDir, batch_size: usize, channel_capacity: usize) -> AppConfig {
    let db = dir.path().join("drilldump.db");
    AppConfig::load_from_str(&format!(
        r#"
[database]
path = "{}"
max_pool_size = 2

[decoder]
batch_size = {}
channel_capacity = {}
"#,
        db.display(),
        batch_size,
        channel_capacity
    ))
    .unwrap()
}

async fn sqlite_store(config: &AppConfig) -> Arc<SqliteStore> {
    let store = SqliteStore::connect(&config.database.path, config.database.max_pool_size)
        .await
        .unwrap();
    store.init().await.unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn mdg_dump_is_decoded_persisted_and_analyzed() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 2, 1);
    let store = sqlite_store(&config).await;
    let path = DumpBuilder::mdg(10)
        .f32_at(4, 20, 30.0)
        .f32_all(84, 30.0)
        .trailing(17)
        .write_to(dir.path(), MDG_FILENAME);

    let report = process_dump(&path, None, store.clone(), &config)
        .await
        .unwrap();

    assert_eq!(report.filename, MDG_FILENAME);
    assert_eq!(report.device_type, DeviceType::Mdg);
    assert_eq!(report.decode.records_decoded, 10);
    assert_eq!(report.decode.batches, 5);
    assert_eq!(report.decode.trailing_bytes, 17);
    assert_eq!(report.decode.base_time, BASE_TIME);
    assert_eq!(
        report.device_info.mdg_serial,
        HeaderValue::Derived {
            value: 4411,
            basis: DerivationBasis::Filename
        }
    );

    let shock = issues_labelled(&report.analysis, "Shock events");
    assert_eq!(shock.len(), 1);
    assert_eq!(shock[0].occurrences, vec![BASE_TIME + 8_000]);
    assert_eq!(report.analysis.records_analyzed, 10);
    assert_eq!(report.analysis.overall_status, OverallStatus::Critical);
    assert!(report.fields.iter().any(|f| f.field == Field::Gamma && f.mean == 30.0));

    let row = store.get_dump(report.dump_id).await.unwrap().unwrap();
    assert_eq!(row.status, DumpStatus::Complete);
    assert_eq!(store.record_count(report.dump_id).await.unwrap(), 10);
    assert_eq!(
        store.load_analysis(report.dump_id).await.unwrap(),
        Some(report.analysis.clone())
    );
    assert!(store.load_device_info(report.dump_id).await.unwrap().is_some());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["dumpId"], report.dump_id);
    assert_eq!(json["decode"]["timestampSource"], "filename");
}

#[test]
fn device_type_comes_from_argument_then_filename() {
    assert_eq!(
        resolve_device_type("anything.bin", Some(DeviceType::Mp)).unwrap(),
        DeviceType::Mp
    );
    assert_eq!(
        resolve_device_type("run-mdg2_4411.bin", None).unwrap(),
        DeviceType::Mdg
    );
    assert_eq!(
        resolve_device_type("MP_2207.bin", None).unwrap(),
        DeviceType::Mp
    );
    assert!(matches!(
        resolve_device_type("dump_20240315_143022.bin", None),
        Err(FormatError::UnknownDeviceType(_))
    ));
}

#[tokio::test]
async fn unknown_device_type_fails_before_registration() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 100, 4);
    let store = sqlite_store(&config).await;
    let path = DumpBuilder::mp(3).write_to(dir.path(), "dump_20240315_143022.bin");

    let err = process_dump(&path, None, store.clone(), &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FormatError>(),
        Some(FormatError::UnknownDeviceType(_))
    ));
    assert!(store.get_dump(1).await.unwrap().is_none());

    let report = process_dump(&path, Some(DeviceType::Mp), store, &config)
        .await
        .unwrap();
    assert_eq!(report.decode.records_decoded, 3);
}

#[tokio::test]
async fn too_small_dump_is_marked_errored() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 100, 4);
    let store = sqlite_store(&config).await;
    let path = dir.path().join(MP_FILENAME);
    std::fs::write(&path, [0u8; 100]).unwrap();

    let err = process_dump(&path, None, store.clone(), &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DecodeError>(),
        Some(DecodeError::Format(FormatError::FileTooSmall { size: 100, .. }))
    ));

    let row = store.get_dump(1).await.unwrap().unwrap();
    assert_eq!(row.status, DumpStatus::Errored);
    assert!(row.error.unwrap().contains("256-byte header"));
    assert!(store.load_analysis(1).await.unwrap().is_none());
}

/// Store whose batch writes fail from the `fail_at`-th batch on.
struct FlakyStore {
    fail_at: usize,
    batches_seen: AtomicUsize,
    statuses: Mutex<Vec<(DumpStatus, Option<String>)>>,
    analyses: AtomicUsize,
}

impl FlakyStore {
    fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            batches_seen: AtomicUsize::new(0),
            statuses: Mutex::new(Vec::new()),
            analyses: AtomicUsize::new(0),
        }
    }
}

impl DumpCatalog for FlakyStore {
    async fn register_dump(
        &self,
        _filename: &str,
        _device_type: DeviceType,
        _base_time: BaseTime,
    ) -> anyhow::Result<i64> {
        Ok(7)
    }

    async fn save_device_info(&self, _dump_id: i64, _info: &DeviceInfo) -> anyhow::Result<()> {
        Ok(())
    }

    async fn set_status(
        &self,
        _dump_id: i64,
        status: DumpStatus,
        error: Option<&str>,
    ) -> anyhow::Result<()> {
        self.statuses
            .lock()
            .unwrap()
            .push((status, error.map(str::to_owned)));
        Ok(())
    }
}

impl RecordSink for FlakyStore {
    async fn persist_batch(&self, _dump_id: i64, _records: &[TelemetryRecord]) -> anyhow::Result<()> {
        let n = self.batches_seen.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(n < self.fail_at, "disk full");
        Ok(())
    }
}

impl RecordSource for FlakyStore {
    async fn fetch_all(&self, _dump_id: i64) -> anyhow::Result<Vec<TelemetryRecord>> {
        Ok(Vec::new())
    }
}

impl ResultSink for FlakyStore {
    async fn persist_analysis(&self, _dump_id: i64, _result: &AnalysisResult) -> anyhow::Result<()> {
        self.analyses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn persistence_failure_stops_decoding_and_marks_dump_errored() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 1, 1);
    let path = DumpBuilder::mp(50).write_to(dir.path(), MP_FILENAME);
    let store = Arc::new(FlakyStore::new(1));

    let err = process_dump(&path, None, store.clone(), &config)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("disk full"));

    // The writer gives up on the failing batch and takes no more.
    assert_eq!(store.batches_seen.load(Ordering::SeqCst), 2);
    assert_eq!(store.analyses.load(Ordering::SeqCst), 0);
    let statuses = store.statuses.lock().unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].0, DumpStatus::Errored);
    assert!(statuses[0].1.as_deref().unwrap().contains("disk full"));
}
