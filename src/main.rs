use anyhow::{Context, Result};
use drilldump::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const USAGE: &str = "usage: drilldump <DUMP_PATH> [mp|mdg]";

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let dump_path = PathBuf::from(args.next().context(USAGE)?);
    let device_type = args
        .next()
        .map(|s| s.parse::<models::DeviceType>())
        .transpose()?;
    anyhow::ensure!(args.next().is_none(), USAGE);

    let app_config = config::AppConfig::load()?;
    let store = Arc::new(
        store::SqliteStore::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    store.init().await?;

    let report = pipeline::process_dump(&dump_path, device_type, store, &app_config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
