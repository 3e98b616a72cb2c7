use dataprovider_common::{ActionId, RecordKind};
use thiserror::Error;

/// Failures the engine contains and logs instead of propagating
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("extractor '{type_id}' failed on action {action_id}: {reason}")]
    Extraction {
        type_id: String,
        action_id: ActionId,
        reason: String,
    },

    #[error("commit of '{kind}' batch failed: {source:#}")]
    Commit {
        kind: RecordKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("compensation for action {action_id} failed on '{kind}': {source:#}")]
    Compensation {
        action_id: ActionId,
        kind: RecordKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("checkpoint write failed: {0:#}")]
    Checkpoint(#[source] anyhow::Error),
}
