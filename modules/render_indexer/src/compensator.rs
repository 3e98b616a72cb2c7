//! Reverting committed records of an unrendered action

use std::collections::BTreeMap;

use dataprovider_common::{ActionId, Record, RecordKind};
use tracing::{error, warn};

use crate::{dedup::dedup, error::IndexerError, store::RecordStore};

/// Store mutations that undo one action's committed records
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompensationPlan {
    /// Logical keys of fact records to remove
    pub deletes: BTreeMap<RecordKind, Vec<String>>,
    /// Snapshot records to write back with the ledger's current state
    pub restores: BTreeMap<RecordKind, Vec<Record>>,
}

impl CompensationPlan {
    /// Build from the records the action's extractor yields at unrender time
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut by_kind: BTreeMap<RecordKind, Vec<Record>> = BTreeMap::new();
        for record in records {
            by_kind.entry(record.kind()).or_default().push(record);
        }

        let mut plan = Self::default();
        for (kind, records) in by_kind {
            if kind.is_snapshot() {
                plan.restores.insert(kind, dedup(kind, records));
            } else {
                let mut keys: Vec<String> = records.iter().map(Record::key).collect();
                keys.dedup();
                plan.deletes.insert(kind, keys);
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.restores.is_empty()
    }

    /// Apply every mutation, logging failures per kind. Returns the number of
    /// kinds that failed.
    pub async fn apply(self, store: &dyn RecordStore, action_id: ActionId) -> usize {
        let mut failures = 0;

        for (kind, keys) in self.deletes {
            let count = keys.len();
            match store.delete_batch(kind, keys).await {
                Ok(()) => warn!(%action_id, %kind, count, "Deleted records of unrendered action"),
                Err(source) => {
                    failures += 1;
                    let e = IndexerError::Compensation {
                        action_id,
                        kind,
                        source,
                    };
                    error!("{e}");
                }
            }
        }

        for (kind, records) in self.restores {
            let count = records.len();
            match store.upsert_batch(kind, records).await {
                Ok(()) => warn!(%action_id, %kind, count, "Restored snapshots of unrendered action"),
                Err(source) => {
                    failures += 1;
                    let e = IndexerError::Compensation {
                        action_id,
                        kind,
                        source,
                    };
                    error!("{e}");
                }
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use dataprovider_common::{
        records::{AgentRecord, HackAndSlashRecord},
        Address,
    };

    fn agent(block_index: u64) -> Record {
        Record::Agent(AgentRecord {
            address: Address::new([7; 20]),
            block_index,
        })
    }

    fn has(id: ActionId) -> Record {
        Record::HackAndSlash(HackAndSlashRecord {
            id,
            agent: Address::new([7; 20]),
            avatar: Address::new([8; 20]),
            stage_id: 3,
            cleared: true,
            mimisbrunnr: false,
            block_index: 10,
        })
    }

    #[test]
    fn facts_are_deleted_and_snapshots_restored() {
        let id = ActionId::new([1; 16]);
        let plan = CompensationPlan::from_records(vec![agent(10), has(id), agent(11)]);

        assert_eq!(plan.deletes[&RecordKind::HackAndSlash], vec![id.to_string()]);
        assert_eq!(plan.restores[&RecordKind::Agent], vec![agent(11)]);
        assert!(!plan.deletes.contains_key(&RecordKind::Agent));
    }

    #[test]
    fn empty_records_give_empty_plan() {
        assert!(CompensationPlan::from_records(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn apply_mutates_store() {
        let id = ActionId::new([2; 16]);
        let store = InMemoryRecordStore::new();
        store.upsert_batch(RecordKind::HackAndSlash, vec![has(id)]).await.unwrap();
        store.upsert_batch(RecordKind::Agent, vec![agent(10)]).await.unwrap();

        let plan = CompensationPlan::from_records(vec![agent(12), has(id)]);
        assert_eq!(plan.apply(&store, id).await, 0);

        assert_eq!(store.count(RecordKind::HackAndSlash).await.unwrap(), 0);
        let restored = store.get(RecordKind::Agent, &agent(12).key()).await.unwrap();
        assert_eq!(restored, Some(agent(12)));
    }
}
