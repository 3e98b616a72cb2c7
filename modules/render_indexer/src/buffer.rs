//! In-memory accumulator of records awaiting the next flush

use std::collections::BTreeMap;

use dataprovider_common::{ActionId, Record, RecordKind};

/// A buffered record and the action that produced it, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedRecord {
    pub origin: Option<ActionId>,
    pub record: Record,
}

/// Contents taken out of the buffer by one drain, per kind in arrival order
pub type DrainedBatch = BTreeMap<RecordKind, Vec<Record>>;

/// Pending records grouped by kind, each sequence in render order
#[derive(Debug, Default)]
pub struct Buffer {
    pending: BTreeMap<RecordKind, Vec<BufferedRecord>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, origin: Option<ActionId>, record: Record) {
        self.pending.entry(record.kind()).or_default().push(BufferedRecord { origin, record });
    }

    /// Take everything buffered, leaving the buffer empty
    pub fn drain(&mut self) -> DrainedBatch {
        std::mem::take(&mut self.pending)
            .into_iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(kind, records)| (kind, records.into_iter().map(|b| b.record).collect()))
            .collect()
    }

    /// Remove every record produced by `action_id`, returning how many were removed
    pub fn retract(&mut self, action_id: &ActionId) -> usize {
        let mut removed = 0;
        for records in self.pending.values_mut() {
            let before = records.len();
            records.retain(|b| b.origin.as_ref() != Some(action_id));
            removed += before - records.len();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataprovider_common::{records::AgentRecord, Address};

    fn agent(byte: u8, block_index: u64) -> Record {
        Record::Agent(AgentRecord {
            address: Address::new([byte; 20]),
            block_index,
        })
    }

    #[test]
    fn drain_preserves_arrival_order_and_empties() {
        let mut buffer = Buffer::new();
        buffer.observe(None, agent(1, 1));
        buffer.observe(None, agent(2, 2));
        buffer.observe(None, agent(1, 3));

        let drained = buffer.drain();
        let agents = &drained[&RecordKind::Agent];
        assert_eq!(agents.iter().map(Record::block_index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn retract_removes_only_the_action_records() {
        let mut buffer = Buffer::new();
        let x = ActionId::new([1; 16]);
        let y = ActionId::new([2; 16]);
        buffer.observe(Some(x), agent(1, 1));
        buffer.observe(Some(y), agent(2, 1));
        buffer.observe(None, agent(3, 1));

        assert_eq!(buffer.retract(&x), 1);
        assert_eq!(buffer.retract(&x), 0);
        assert_eq!(buffer.len(), 2);
    }
}
