// SqliteStore tests: connect, init, dump rows, batch persistence, analysis round trip

mod common;

use common::*;
use drilldump::analysis::analyze;
use drilldump::decoder::{BaseTime, TimestampSource};
use drilldump::header::extract_device_info;
use drilldump::models::*;
use drilldump::store::*;
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> SqliteStore {
    let path = dir.path().join("nested").join("drilldump.db");
    let store = SqliteStore::connect(path.to_str().unwrap(), 2).await.unwrap();
    store.init().await.unwrap();
    store
}

fn base_time() -> BaseTime {
    BaseTime {
        millis: BASE_TIME,
        source: TimestampSource::Filename,
    }
}

#[tokio::test]
async fn store_connect_and_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    // Second init is no-op (IF NOT EXISTS)
    store.init().await.unwrap();
    assert!(dir.path().join("nested").join("drilldump.db").exists());
}

#[tokio::test]
async fn registered_dump_starts_processing_and_records_status_changes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let id = store
        .register_dump(MDG_FILENAME, DeviceType::Mdg, base_time())
        .await
        .unwrap();
    let row = store.get_dump(id).await.unwrap().unwrap();
    assert_eq!(row.filename, MDG_FILENAME);
    assert_eq!(row.device_type, DeviceType::Mdg);
    assert_eq!(row.status, DumpStatus::Processing);
    assert_eq!(row.base_time, BASE_TIME);
    assert_eq!(row.timestamp_source, TimestampSource::Filename);
    assert_eq!(row.error, None);

    store
        .set_status(id, DumpStatus::Errored, Some("boom"))
        .await
        .unwrap();
    let row = store.get_dump(id).await.unwrap().unwrap();
    assert_eq!(row.status, DumpStatus::Errored);
    assert_eq!(row.error.as_deref(), Some("boom"));

    assert!(store.get_dump(id + 100).await.unwrap().is_none());
    assert!(
        store
            .set_status(id + 100, DumpStatus::Complete, None)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn batches_append_in_order_and_fetch_back_intact() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let id = store
        .register_dump(MDG_FILENAME, DeviceType::Mdg, base_time())
        .await
        .unwrap();
    let other = store
        .register_dump("MDG_other.bin", DeviceType::Mdg, base_time())
        .await
        .unwrap();

    let records = mdg_series(5, |i, r| {
        r.shock_z = Some(i as f32 * 2.5);
        r.shock_axial_50g = Some(i as u16);
        r.gamma = if i == 2 { None } else { Some(30.0) };
    });
    store.persist_batch(id, &records[..3]).await.unwrap();
    store.persist_batch(other, &records[..1]).await.unwrap();
    store.persist_batch(id, &records[3..]).await.unwrap();
    store.persist_batch(id, &[]).await.unwrap();

    let fetched = store.fetch_all(id).await.unwrap();
    assert_eq!(fetched, records);
    assert_eq!(fetched[2].readings.gamma, None);
    assert_eq!(store.record_count(id).await.unwrap(), 5);
    assert_eq!(store.record_count(other).await.unwrap(), 1);
    assert!(store.fetch_all(other + 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn device_info_and_analysis_round_trip_as_json() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let id = store
        .register_dump(MP_FILENAME, DeviceType::Mp, base_time())
        .await
        .unwrap();

    let header = DumpBuilder::mp(0).header_u16(0x04, 2207);
    let info = extract_device_info(header.header(), MP_FILENAME, DeviceType::Mp);
    store.save_device_info(id, &info).await.unwrap();
    assert_eq!(store.load_device_info(id).await.unwrap(), Some(info));

    let records = mp_series(20, |i, r| r.battery_voltage = Some(if i < 5 { 10.0 } else { 12.5 }));
    let result = analyze(&records);
    store.persist_analysis(id, &result).await.unwrap();
    let loaded = store.load_analysis(id).await.unwrap().unwrap();
    assert_eq!(loaded, result);
    assert_eq!(loaded.overall_status, OverallStatus::Critical);

    assert!(store.load_analysis(id + 1).await.unwrap().is_none());
}
