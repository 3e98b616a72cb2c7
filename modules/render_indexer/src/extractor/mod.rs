//! Per-action record extraction
//!
//! Extractors are pure functions of an [`ActionEvaluation`], registered by the
//! exact action type id (version suffix included). Each runs inside its own
//! failure boundary so a bad action only loses its own records.

use std::{
    any::Any,
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use anyhow::{anyhow, Context as _, Result};
use dataprovider_common::{
    ledger::ActionEvaluation,
    records::{AgentRecord, AvatarRecord, EquipmentRecord},
    state::{AvatarState, Equipment, StateSnapshot},
    Address, Record,
};
use serde::de::DeserializeOwned;

use crate::error::IndexerError;

pub mod arena;
pub mod battle;
pub mod crafting;
pub mod shop;
pub mod stake;

/// Derives records from one evaluated action
pub trait Extractor: Send + Sync {
    fn extract(&self, ev: &ActionEvaluation) -> Result<Vec<Record>>;
}

impl<F> Extractor for F
where
    F: Fn(&ActionEvaluation) -> Result<Vec<Record>> + Send + Sync,
{
    fn extract(&self, ev: &ActionEvaluation) -> Result<Vec<Record>> {
        self(ev)
    }
}

/// Outcome of routing one evaluation
#[derive(Debug)]
pub enum Dispatch {
    /// No extractor registered for the type id
    Unknown,
    Extracted(Vec<Record>),
    Failed(IndexerError),
}

#[derive(Default, Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every supported action type and version
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        for type_id in ["hack_and_slash", "hack_and_slash13", "hack_and_slash14"] {
            registry.register(type_id, battle::hack_and_slash);
        }
        for type_id in [
            "hack_and_slash_sweep",
            "hack_and_slash_sweep1",
            "hack_and_slash_sweep2",
            "hack_and_slash_sweep3",
            "hack_and_slash_sweep4",
        ] {
            registry.register(type_id, battle::hack_and_slash_sweep);
        }
        registry.register("ranking_battle", battle::ranking_battle);
        registry.register("hack_and_slash_random_buff", battle::hack_and_slash_random_buff);

        registry.register("combination_consumable", crafting::combination_consumable);
        for type_id in [
            "combination_equipment",
            "combination_equipment10",
            "combination_equipment11",
        ] {
            registry.register(type_id, crafting::combination_equipment);
        }
        for type_id in ["item_enhancement", "item_enhancement9", "item_enhancement10"] {
            registry.register(type_id, crafting::item_enhancement);
        }

        for type_id in ["buy", "buy10", "buy11"] {
            registry.register(type_id, shop::buy);
        }

        registry.register("claim_stake_reward", stake::claim_stake_reward);
        registry.register("join_arena", arena::join_arena);
        registry.register("battle_arena", arena::battle_arena);

        registry
    }

    pub fn register(&mut self, type_id: &str, extractor: impl Extractor + 'static) {
        self.extractors.insert(type_id.to_string(), Arc::new(extractor));
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.extractors.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn dispatch(&self, ev: &ActionEvaluation) -> Dispatch {
        let Some(extractor) = self.extractors.get(ev.type_id()) else {
            return Dispatch::Unknown;
        };

        let failed = |reason: String| {
            Dispatch::Failed(IndexerError::Extraction {
                type_id: ev.type_id().to_string(),
                action_id: ev.action_id(),
                reason,
            })
        };

        match panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(ev))) {
            Ok(Ok(records)) => Dispatch::Extracted(records),
            Ok(Err(e)) => failed(format!("{e:#}")),
            Err(payload) => failed(format!("panicked: {}", panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Decode the action's arguments
pub(crate) fn params<T: DeserializeOwned>(ev: &ActionEvaluation) -> Result<T> {
    serde_json::from_value(ev.action.plain_value.clone())
        .with_context(|| format!("Malformed '{}' arguments", ev.type_id()))
}

pub(crate) fn avatar_state<'a>(
    states: &'a StateSnapshot,
    address: &Address,
) -> Result<&'a AvatarState> {
    states.avatar(address).ok_or_else(|| anyhow!("Avatar {address} not found"))
}

/// Agent row for the signer and a snapshot of the acting avatar's output state
pub(crate) fn agent_and_avatar(ev: &ActionEvaluation, avatar: &Address) -> Result<Vec<Record>> {
    let state = avatar_state(&ev.output_states, avatar)?;
    Ok(vec![
        Record::Agent(AgentRecord {
            address: ev.signer,
            block_index: ev.block_index,
        }),
        avatar_record(avatar, state, ev.block_index),
    ])
}

pub(crate) fn avatar_record(address: &Address, state: &AvatarState, block_index: u64) -> Record {
    Record::Avatar(AvatarRecord {
        address: *address,
        agent: state.agent,
        name: state.name.clone(),
        avatar_level: state.level,
        title_id: state.title_id,
        armor_id: state.armor_id,
        cp: state.combat_power,
        block_index,
    })
}

pub(crate) fn equipment_record(
    agent: &Address,
    avatar: &Address,
    equipment: &Equipment,
    block_index: u64,
) -> Record {
    Record::Equipment(EquipmentRecord {
        item_id: equipment.item_id,
        agent: *agent,
        avatar: *avatar,
        equipment_id: equipment.equipment_id,
        cp: equipment.combat_power,
        level: equipment.level,
        item_sub_type: equipment.sub_type,
        block_index,
    })
}

/// Balance lost by `address` over the action
pub(crate) fn burnt(ev: &ActionEvaluation, address: &Address, ticker: &str) -> i128 {
    ev.previous_states.balance(address, ticker) - ev.output_states.balance(address, ticker)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_is_reported_not_failed() {
        let registry = ExtractorRegistry::with_defaults();
        let ev = evaluation(
            "transfer_asset5",
            json!({}),
            StateSnapshot::default(),
            StateSnapshot::default(),
        );
        assert!(matches!(registry.dispatch(&ev), Dispatch::Unknown));
    }

    #[test]
    fn extractor_error_becomes_failure() {
        let registry = ExtractorRegistry::with_defaults();
        // Avatar missing from the output state
        let ev = evaluation(
            "ranking_battle",
            json!({ "avatarAddress": AVATAR.to_string() }),
            StateSnapshot::default(),
            StateSnapshot::default(),
        );
        match registry.dispatch(&ev) {
            Dispatch::Failed(IndexerError::Extraction { type_id, .. }) => {
                assert_eq!(type_id, "ranking_battle")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn panicking_extractor_is_contained() {
        let mut registry = ExtractorRegistry::new();
        registry.register("explodes", |_: &ActionEvaluation| -> Result<Vec<Record>> {
            panic!("boom")
        });
        let ev = evaluation(
            "explodes",
            json!({}),
            StateSnapshot::default(),
            StateSnapshot::default(),
        );
        match registry.dispatch(&ev) {
            Dispatch::Failed(e) => assert!(e.to_string().contains("boom")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn every_version_is_registered() {
        let registry = ExtractorRegistry::with_defaults();
        for type_id in [
            "hack_and_slash14",
            "hack_and_slash_sweep4",
            "combination_equipment11",
            "item_enhancement10",
            "buy11",
            "battle_arena",
        ] {
            assert!(registry.contains(type_id), "{type_id} missing");
        }
        assert!(!registry.contains("hack_and_slash15"));
        assert!(ExtractorRegistry::new().is_empty());
        assert!(!registry.is_empty());
    }
}
