//! DataProvider indexer process
//!
//! Runs the render indexer against a ledger session; with the playback module
//! configured the session comes from a recorded file.

use std::sync::Arc;

use anyhow::Result;
use caryatid_process::Process;
use caryatid_sdk::module_registry::ModuleRegistry;
use clap::Parser;
use config::{Config, Environment, File};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dataprovider_common::messages::Message;
use dataprovider_module_ledger_playback::LedgerPlayback;
use dataprovider_module_render_indexer::RenderIndexer;

#[derive(Debug, clap::Parser)]
#[command(about = "Indexes rendered ledger actions into the record store")]
struct Args {
    #[arg(long, value_name = "PATH", default_values_t = vec!["indexer.toml".to_string()])]
    config: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Get arguments and config
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,fjall=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("DataProvider indexer process");

    let mut builder = Config::builder();
    for file in &args.config {
        builder = builder.add_source(File::with_name(file));
    }
    let config = Arc::new(builder.add_source(Environment::with_prefix("DATAPROVIDER")).build()?);

    let mut process = Process::<Message>::create(config).await;

    RenderIndexer::register(&mut process);
    LedgerPlayback::register(&mut process);

    process.run().await?;

    info!("Exiting");
    Ok(())
}
