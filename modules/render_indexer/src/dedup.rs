//! Collapses a kind's buffered records to one per logical key

use std::collections::{hash_map::Entry, HashMap};

use dataprovider_common::{DedupPolicy, Record, RecordKind};

/// Keep the first or last record per key, as declared by the kind.
/// Output follows the order in which each key was first seen.
pub fn dedup(kind: RecordKind, records: Vec<Record>) -> Vec<Record> {
    let policy = kind.dedup_policy();
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<Record> = Vec::with_capacity(records.len());

    for record in records {
        match slots.entry(record.key()) {
            Entry::Vacant(entry) => {
                entry.insert(out.len());
                out.push(record);
            }
            Entry::Occupied(entry) => {
                if policy == DedupPolicy::KeepLast {
                    out[*entry.get()] = record;
                }
            }
        }
    }

    out
}
