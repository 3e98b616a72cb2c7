//! On-disk record store using Fjall, one keyspace per record kind

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dataprovider_common::{Record, RecordKind};
use fjall::{Database, Keyspace, KeyspaceCreateOptions, PersistMode};
use tracing::info;

use super::RecordStore;

pub struct FjallRecordStore {
    database: Database,
    keyspaces: BTreeMap<RecordKind, Keyspace>,
}

impl FjallRecordStore {
    pub fn new(path: impl AsRef<Path>, clear_on_start: bool) -> Result<Self> {
        let path = path.as_ref();
        info!("Storing records with Fjall on disk ({})", path.display());

        if clear_on_start && path.exists() {
            fs::remove_dir_all(path)?;
        }

        let database = Database::builder(path).open()?;
        let mut keyspaces = BTreeMap::new();
        for kind in RecordKind::ALL {
            let keyspace = database.keyspace(kind.as_str(), KeyspaceCreateOptions::default)?;
            keyspaces.insert(kind, keyspace);
        }

        Ok(Self {
            database,
            keyspaces,
        })
    }

    fn keyspace(&self, kind: RecordKind) -> Result<&Keyspace> {
        self.keyspaces.get(&kind).ok_or_else(|| anyhow!("No keyspace for '{kind}'"))
    }
}

#[async_trait]
impl RecordStore for FjallRecordStore {
    async fn upsert_batch(&self, kind: RecordKind, records: Vec<Record>) -> Result<()> {
        let keyspace = self.keyspace(kind)?;
        let mut batch = self.database.batch();
        for record in records {
            if record.kind() != kind {
                return Err(anyhow!("'{}' record in '{kind}' batch", record.kind()));
            }
            let value = bincode::serialize(&record)?;
            batch.insert(keyspace, record.key().as_bytes(), value);
        }
        batch.commit()?;

        // Records must be durable before the checkpoint moves past them
        self.database.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    async fn delete_batch(&self, kind: RecordKind, keys: Vec<String>) -> Result<()> {
        let keyspace = self.keyspace(kind)?;
        let mut batch = self.database.batch();
        for key in &keys {
            batch.remove(keyspace, key.as_bytes());
        }
        batch.commit()?;
        self.database.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Record>> {
        Ok(match self.keyspace(kind)?.get(key.as_bytes())? {
            Some(bytes) => Some(bincode::deserialize(&bytes)?),
            None => None,
        })
    }

    async fn count(&self, kind: RecordKind) -> Result<usize> {
        Ok(self.keyspace(kind)?.approximate_len())
    }
}
