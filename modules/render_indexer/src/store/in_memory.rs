//! In-memory record store

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dataprovider_common::{Record, RecordKind};
use tracing::info;

use super::RecordStore;

pub type Tables = BTreeMap<RecordKind, BTreeMap<String, Record>>;

#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        info!("Storing records in memory");
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| anyhow!("record store lock poisoned"))
    }

    /// Copy of everything stored, for comparing end states
    pub fn snapshot(&self) -> Result<Tables> {
        let mut tables = self.tables()?.clone();
        tables.retain(|_, rows| !rows.is_empty());
        Ok(tables)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn upsert_batch(&self, kind: RecordKind, records: Vec<Record>) -> Result<()> {
        let mut tables = self.tables()?;
        let table = tables.entry(kind).or_default();
        for record in records {
            table.insert(record.key(), record);
        }
        Ok(())
    }

    async fn delete_batch(&self, kind: RecordKind, keys: Vec<String>) -> Result<()> {
        let mut tables = self.tables()?;
        if let Some(table) = tables.get_mut(&kind) {
            for key in keys {
                table.remove(&key);
            }
        }
        Ok(())
    }

    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Record>> {
        Ok(self.tables()?.get(&kind).and_then(|t| t.get(key)).cloned())
    }

    async fn count(&self, kind: RecordKind) -> Result<usize> {
        Ok(self.tables()?.get(&kind).map_or(0, BTreeMap::len))
    }
}
