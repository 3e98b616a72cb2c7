//! Record store the indexer commits into

use anyhow::Result;
use async_trait::async_trait;
use dataprovider_common::{Record, RecordKind};

pub mod fjall;
pub mod in_memory;

pub use self::fjall::FjallRecordStore;
pub use self::in_memory::InMemoryRecordStore;

/// Keyed record storage, one table per record kind.
///
/// Both mutations must be idempotent and apply a batch as one unit.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Insert or replace the given records, all of `kind`
    async fn upsert_batch(&self, kind: RecordKind, records: Vec<Record>) -> Result<()>;

    /// Delete the given logical keys of `kind`; unknown keys are ignored
    async fn delete_batch(&self, kind: RecordKind, keys: Vec<String>) -> Result<()>;

    /// Look up one record
    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Record>>;

    /// Number of records held for `kind`
    async fn count(&self, kind: RecordKind) -> Result<usize>;
}
