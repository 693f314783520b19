use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod worker;

mod error;

pub use error::{Error, Result};

use quill_engine::MemoryService;
use quill_store::memory::MemStore;

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
}

/// Standalone entry point over the in-process store, the single-binary
/// deployment. Hosts embedding the engine in a larger process should spawn
/// [`worker::run_worker`] on their own service instead.
pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = quill_config::load(&args.config)?;
	let filter = EnvFilter::new(config.engine.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let interval = std::time::Duration::from_secs(config.worker.interval_seconds);
	let project_ids = config.worker.project_ids.clone();
	let service = Arc::new(MemoryService::new(config, Arc::new(MemStore::new())));

	worker::run_worker(worker::WorkerState { service, interval, project_ids }).await;

	Ok(())
}
