//! DataProvider render indexer module for Caryatid
//!
//! Consumes block appends, action renders and action unrenders from a ledger
//! session, derives typed records from each evaluated action and commits them
//! to the record store in batches, one every `flush-interval` appended blocks.
//! The last fully committed block index is kept in a checkpoint file so an
//! ingestion restart can resume from it.

pub mod buffer;
pub mod checkpoint;
pub mod compensator;
pub mod configuration;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod scheduler;
pub mod session;
pub mod store;

use std::sync::Arc;

use anyhow::Result;
use caryatid_sdk::{module, Context, Module};
use config::Config;
use dataprovider_common::messages::{LedgerMessage, Message};
use tracing::{debug_span, error, info, Instrument};

use crate::{
    checkpoint::FileCheckpointStore,
    configuration::{RenderIndexerConfig, StoreKind},
    extractor::ExtractorRegistry,
    session::IngestionSession,
    store::{FjallRecordStore, InMemoryRecordStore, RecordStore},
};

/// Render indexer module
#[module(
    message_type(Message),
    name = "render-indexer",
    description = "Indexes rendered ledger actions into the record store"
)]
pub struct RenderIndexer;

impl RenderIndexer {
    pub async fn init(&self, context: Arc<Context<Message>>, config: Arc<Config>) -> Result<()> {
        let cfg = RenderIndexerConfig::try_load(&config)?;

        let store: Arc<dyn RecordStore> = match cfg.store {
            StoreKind::Fjall => {
                info!("Opening record store at '{}'", cfg.database_path);
                Arc::new(FjallRecordStore::new(&cfg.database_path, cfg.clear_on_start)?)
            }
            StoreKind::Memory => Arc::new(InMemoryRecordStore::new()),
        };

        let checkpoints = FileCheckpointStore::new(&cfg.checkpoint_dir);
        info!("Using checkpoint file {}", checkpoints.path().display());

        let session = Arc::new(
            IngestionSession::start(
                ExtractorRegistry::with_defaults(),
                store,
                checkpoints,
                cfg.flush_interval,
            )
            .await?,
        );
        match session.committed().await {
            Some(index) => info!("Resuming after block {index}"),
            None => info!("No checkpoint, indexing from the start of the session"),
        }

        // Appends and renders arrive in ledger order on one track
        info!("Creating subscriber on '{}'", cfg.render_topic);
        let mut render_subscription = context.subscribe(&cfg.render_topic).await?;
        let render_session = session.clone();
        context.run(async move {
            loop {
                let Ok((_, message)) = render_subscription.read().await else {
                    error!("Render subscription closed");
                    return;
                };
                match message.as_ref() {
                    Message::Ledger(LedgerMessage::BlockAppended(block)) => {
                        let span = debug_span!("render_indexer.append", block_index = block.index);
                        render_session.on_block_appended(block).instrument(span).await;
                    }
                    Message::Ledger(LedgerMessage::ActionRendered(ev)) => {
                        let span = debug_span!("render_indexer.render", block_index = ev.block_index);
                        render_session.on_action_rendered(ev).instrument(span).await;
                    }
                    _ => error!("Unexpected message type on render topic: {message:?}"),
                }
            }
        });

        info!("Creating subscriber on '{}'", cfg.unrender_topic);
        let mut unrender_subscription = context.subscribe(&cfg.unrender_topic).await?;
        let unrender_session = session;
        context.run(async move {
            loop {
                let Ok((_, message)) = unrender_subscription.read().await else {
                    error!("Unrender subscription closed");
                    return;
                };
                match message.as_ref() {
                    Message::Ledger(LedgerMessage::ActionUnrendered(ev)) => {
                        let span =
                            debug_span!("render_indexer.unrender", block_index = ev.block_index);
                        unrender_session.on_action_unrendered(ev).instrument(span).await;
                    }
                    _ => error!("Unexpected message type on unrender topic: {message:?}"),
                }
            }
        });

        Ok(())
    }
}
