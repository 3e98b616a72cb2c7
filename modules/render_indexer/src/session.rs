//! One ingestion session: buffers extracted records, commits them in batches
//! every N appended blocks and compensates for unrendered actions

use std::{sync::Arc, time::Instant};

use anyhow::Result;
use dataprovider_common::{
    ledger::{ActionEvaluation, BlockHeader},
    records::{BlockRecord, TransactionRecord},
    Record,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    buffer::Buffer,
    checkpoint::{CheckpointStore, CheckpointTracker},
    compensator::CompensationPlan,
    dedup::dedup,
    error::IndexerError,
    extractor::{Dispatch, ExtractorRegistry},
    scheduler::FlushScheduler,
    store::RecordStore,
};

/// Result of one flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Committed {
        records: usize,
        checkpoint: Option<u64>,
    },
    /// The store rejected the batch; it was dropped and the checkpoint kept
    Failed,
}

struct AppendCursor {
    scheduler: FlushScheduler,
    last_appended: Option<u64>,
}

pub struct IngestionSession<C: CheckpointStore> {
    registry: ExtractorRegistry,
    store: Arc<dyn RecordStore>,
    buffer: Mutex<Buffer>,
    cursor: Mutex<AppendCursor>,
    /// Serialises commits and compensations against the store
    commit: Mutex<CheckpointTracker<C>>,
}

impl<C: CheckpointStore> IngestionSession<C> {
    pub async fn start(
        registry: ExtractorRegistry,
        store: Arc<dyn RecordStore>,
        checkpoints: C,
        flush_interval: usize,
    ) -> Result<Self> {
        let tracker = CheckpointTracker::open(checkpoints).await?;
        let scheduler = FlushScheduler::new(flush_interval);
        info!(
            checkpoint = ?tracker.committed(),
            flush_interval = scheduler.interval(),
            extractors = registry.len(),
            "Starting ingestion session"
        );

        Ok(Self {
            registry,
            store,
            buffer: Mutex::new(Buffer::new()),
            cursor: Mutex::new(AppendCursor {
                scheduler,
                last_appended: None,
            }),
            commit: Mutex::new(tracker),
        })
    }

    /// Last block index known to be fully committed
    pub async fn committed(&self) -> Option<u64> {
        self.commit.lock().await.committed()
    }

    pub async fn buffered_len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Buffer the block and its transactions; flushes when the interval is
    /// reached
    pub async fn on_block_appended(&self, block: &BlockHeader) -> Option<FlushOutcome> {
        let (previous, fire) = {
            let mut cursor = self.cursor.lock().await;
            let previous = cursor.last_appended.replace(block.index);
            (previous, cursor.scheduler.on_append())
        };

        {
            let mut buffer = self.buffer.lock().await;
            buffer.observe(None, Record::Block(block_record(block)));
            for tx in &block.transactions {
                buffer.observe(
                    None,
                    Record::Transaction(TransactionRecord {
                        block_index: block.index,
                        block_hash: block.hash,
                        tx_id: tx.id,
                        signer: tx.signer,
                        action_type: tx.action_types.first().cloned(),
                        nonce: tx.nonce,
                        public_key: tx.public_key.clone(),
                        updated_addresses_count: tx.updated_addresses_count,
                        timestamp: tx.timestamp,
                    }),
                );
            }
        }

        if !fire {
            return None;
        }

        // Every action of the previous block has been rendered by now
        Some(self.flush(previous).await)
    }

    /// Commit everything buffered and, on success, advance the checkpoint to
    /// `target`
    pub async fn flush(&self, target: Option<u64>) -> FlushOutcome {
        let mut tracker = self.commit.lock().await;
        let drained = self.buffer.lock().await.drain();
        let started = Instant::now();

        let mut committed = 0;
        for (kind, records) in drained {
            let records = dedup(kind, records);
            let count = records.len();
            if let Err(source) = self.store.upsert_batch(kind, records).await {
                let e = IndexerError::Commit { kind, source };
                error!(checkpoint = ?tracker.committed(), "{e}; batch dropped");
                return FlushOutcome::Failed;
            }
            debug!(%kind, count, "Committed records");
            committed += count;
        }

        if let Some(target) = target {
            if let Err(e) = tracker.advance(target).await {
                error!("{}", IndexerError::Checkpoint(e));
            }
        }

        info!(
            records = committed,
            checkpoint = ?tracker.committed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Flushed batch"
        );
        FlushOutcome::Committed {
            records: committed,
            checkpoint: tracker.committed(),
        }
    }

    pub async fn on_action_rendered(&self, ev: &ActionEvaluation) {
        if let Some(exception) = &ev.exception {
            debug!(action_id = %ev.action_id(), type_id = ev.type_id(), exception, "Skipping failed action");
            return;
        }

        match self.registry.dispatch(ev) {
            Dispatch::Unknown => {
                debug!(type_id = ev.type_id(), "No extractor for action type");
            }
            Dispatch::Failed(e) => error!(block_index = ev.block_index, "{e}"),
            Dispatch::Extracted(records) => {
                let count = records.len();
                let mut buffer = self.buffer.lock().await;
                for record in records {
                    buffer.observe(Some(ev.action_id()), record);
                }
                debug!(
                    action_id = %ev.action_id(),
                    type_id = ev.type_id(),
                    block_index = ev.block_index,
                    records = count,
                    "Stored action"
                );
            }
        }
    }

    /// Withdraw an action's records. Buffered copies are dropped and the
    /// store is compensated as well, since an earlier render of the same
    /// action may already have been committed.
    pub async fn on_action_unrendered(&self, ev: &ActionEvaluation) {
        if ev.exception.is_some() {
            return;
        }
        let action_id = ev.action_id();

        let plan = match self.registry.dispatch(ev) {
            Dispatch::Unknown => None,
            Dispatch::Failed(e) => {
                error!("{e}; cannot compensate");
                None
            }
            Dispatch::Extracted(records) => Some(CompensationPlan::from_records(records)),
        };

        // Same lock order as flush: commit, then buffer
        let _commit = self.commit.lock().await;
        let removed = self.buffer.lock().await.retract(&action_id);
        if removed > 0 {
            warn!(%action_id, removed, "Retracted buffered records of unrendered action");
        }

        let Some(plan) = plan.filter(|p| !p.is_empty()) else {
            return;
        };
        let failures = plan.apply(self.store.as_ref(), action_id).await;
        if failures > 0 {
            warn!(%action_id, failures, "Compensation incomplete");
        }
    }
}

fn block_record(block: &BlockHeader) -> BlockRecord {
    BlockRecord {
        index: block.index,
        hash: block.hash,
        miner: block.miner,
        difficulty: block.difficulty,
        nonce: block.nonce.clone(),
        previous_hash: block.previous_hash,
        protocol_version: block.protocol_version,
        public_key: block.public_key.clone(),
        state_root_hash: block.state_root_hash,
        total_difficulty: block.total_difficulty,
        tx_count: block.transactions.len() as u32,
        tx_hash: block.tx_hash,
        timestamp: block.timestamp,
    }
}
