//! Records extracted from ledger notifications
//!
//! Every record carries a logical key and the block index it was observed at.
//! Two records of the same kind with the same key describe the same logical
//! fact; which one survives a batch is decided by the kind's [`DedupPolicy`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    hash::{ActionId, Address, BlockHash, ItemId, OrderId, TxId},
    state::ItemSubType,
};

/// Which occurrence of a logical key survives deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Append-only facts: a re-observed key is a replay of the same fact
    KeepFirst,

    /// Mutable snapshots: the latest observation is authoritative
    KeepLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    Block,
    Transaction,
    Agent,
    Avatar,
    Equipment,
    HackAndSlash,
    HackAndSlashSweep,
    HasWithRandomBuff,
    HasRandomBuff,
    CombinationConsumable,
    CombinationEquipment,
    ReplaceCombinationEquipmentMaterial,
    ItemEnhancement,
    ItemEnhancementFail,
    ShopHistory,
    ClaimStakeReward,
    JoinArena,
    BattleArena,
}

impl RecordKind {
    pub const ALL: [RecordKind; 18] = [
        RecordKind::Block,
        RecordKind::Transaction,
        RecordKind::Agent,
        RecordKind::Avatar,
        RecordKind::Equipment,
        RecordKind::HackAndSlash,
        RecordKind::HackAndSlashSweep,
        RecordKind::HasWithRandomBuff,
        RecordKind::HasRandomBuff,
        RecordKind::CombinationConsumable,
        RecordKind::CombinationEquipment,
        RecordKind::ReplaceCombinationEquipmentMaterial,
        RecordKind::ItemEnhancement,
        RecordKind::ItemEnhancementFail,
        RecordKind::ShopHistory,
        RecordKind::ClaimStakeReward,
        RecordKind::JoinArena,
        RecordKind::BattleArena,
    ];

    /// Stable name, also used as the storage keyspace
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Block => "blocks",
            RecordKind::Transaction => "transactions",
            RecordKind::Agent => "agents",
            RecordKind::Avatar => "avatars",
            RecordKind::Equipment => "equipments",
            RecordKind::HackAndSlash => "hack-and-slashes",
            RecordKind::HackAndSlashSweep => "hack-and-slash-sweeps",
            RecordKind::HasWithRandomBuff => "has-with-random-buffs",
            RecordKind::HasRandomBuff => "has-random-buffs",
            RecordKind::CombinationConsumable => "combination-consumables",
            RecordKind::CombinationEquipment => "combination-equipments",
            RecordKind::ReplaceCombinationEquipmentMaterial => {
                "replace-combination-equipment-materials"
            }
            RecordKind::ItemEnhancement => "item-enhancements",
            RecordKind::ItemEnhancementFail => "item-enhancement-fails",
            RecordKind::ShopHistory => "shop-histories",
            RecordKind::ClaimStakeReward => "claim-stake-rewards",
            RecordKind::JoinArena => "join-arenas",
            RecordKind::BattleArena => "battle-arenas",
        }
    }

    pub fn dedup_policy(self) -> DedupPolicy {
        match self {
            RecordKind::Block
            | RecordKind::Transaction
            | RecordKind::Agent
            | RecordKind::Avatar
            | RecordKind::Equipment => DedupPolicy::KeepLast,
            _ => DedupPolicy::KeepFirst,
        }
    }

    /// Snapshot kinds are re-stored, rather than deleted, when an action is retracted
    pub fn is_snapshot(self) -> bool {
        self.dedup_policy() == DedupPolicy::KeepLast
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub index: u64,
    pub hash: BlockHash,
    pub miner: Address,
    pub difficulty: i64,
    pub nonce: String,
    pub previous_hash: Option<BlockHash>,
    pub protocol_version: i32,
    pub public_key: Option<String>,
    pub state_root_hash: Option<BlockHash>,
    pub total_difficulty: u128,
    pub tx_count: u32,
    pub tx_hash: Option<BlockHash>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub block_index: u64,
    pub block_hash: BlockHash,
    pub tx_id: TxId,
    pub signer: Address,
    pub action_type: Option<String>,
    pub nonce: i64,
    pub public_key: String,
    pub updated_addresses_count: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub address: Address,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarRecord {
    pub address: Address,
    pub agent: Address,
    pub name: String,
    pub avatar_level: u32,
    pub title_id: Option<u32>,
    pub armor_id: u32,
    pub cp: i64,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub item_id: ItemId,
    pub agent: Address,
    pub avatar: Address,
    pub equipment_id: u32,
    pub cp: i64,
    pub level: u32,
    pub item_sub_type: ItemSubType,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HackAndSlashRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub stage_id: u32,
    pub cleared: bool,
    pub mimisbrunnr: bool,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HackAndSlashSweepRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub world_id: u32,
    pub stage_id: u32,
    pub ap_stone_count: u32,
    pub action_point: u32,
    pub costumes_count: u32,
    pub equipments_count: u32,
    pub cleared: bool,
    pub mimisbrunnr: bool,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasWithRandomBuffRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub stage_id: u32,
    pub buff_id: u32,
    pub cleared: bool,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasRandomBuffRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub has_stage_id: u32,
    pub gacha_count: u32,
    /// CRYSTAL minor units
    pub burnt_crystal: i128,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationConsumableRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub recipe_id: u32,
    pub slot_index: u32,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationEquipmentRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub recipe_id: u32,
    pub slot_index: u32,
    /// Zero when crafted without a sub-recipe
    pub sub_recipe_id: u32,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceCombinationEquipmentMaterialRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub replaced_material_id: u32,
    pub replaced_material_count: u32,
    /// CRYSTAL minor units
    pub burnt_crystal: i128,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEnhancementRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub item_id: ItemId,
    pub material_id: ItemId,
    pub slot_index: u32,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEnhancementFailRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub equipment_item_id: ItemId,
    pub material_item_id: ItemId,
    pub equipment_level: u32,
    /// CRYSTAL minor units
    pub gained_crystal: i128,
    /// NCG minor units
    pub burnt_ncg: i128,
    pub block_index: u64,
}

/// Item-type specific part of a shop purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopItem {
    Equipment {
        item_id: ItemId,
        equipment_id: u32,
        item_sub_type: ItemSubType,
        grade: u32,
        level: u32,
    },
    Costume {
        item_id: ItemId,
        costume_id: u32,
        item_sub_type: ItemSubType,
        grade: u32,
    },
    Material {
        material_id: u32,
        grade: u32,
    },
    Consumable {
        item_id: ItemId,
        consumable_id: u32,
        grade: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopHistoryRecord {
    pub order_id: OrderId,
    pub action_id: ActionId,
    pub buyer_agent: Address,
    pub buyer_avatar: Address,
    pub seller_agent: Address,
    pub seller_avatar: Address,
    pub item_count: u32,
    /// NCG minor units
    pub price: i128,
    pub item: ShopItem,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimStakeRewardRecord {
    pub id: ActionId,
    pub agent: Address,
    pub claim_reward_avatar: Address,
    pub hourglass_count: u64,
    pub ap_potion_count: u64,
    pub claim_stake_start_block_index: u64,
    pub claim_stake_end_block_index: u64,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinArenaRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub avatar_level: u32,
    pub round: u32,
    pub championship_id: u32,
    /// CRYSTAL minor units
    pub burnt_crystal: i128,
    pub block_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleArenaRecord {
    pub id: ActionId,
    pub agent: Address,
    pub avatar: Address,
    pub avatar_level: u32,
    pub enemy_avatar: Address,
    pub round: u32,
    pub championship_id: u32,
    pub ticket_count: u32,
    /// NCG minor units
    pub burnt_ncg: i128,
    pub victory: bool,
    pub medal_count: u32,
    pub block_index: u64,
}

/// One extracted, store-bound fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    Block(BlockRecord),
    Transaction(TransactionRecord),
    Agent(AgentRecord),
    Avatar(AvatarRecord),
    Equipment(EquipmentRecord),
    HackAndSlash(HackAndSlashRecord),
    HackAndSlashSweep(HackAndSlashSweepRecord),
    HasWithRandomBuff(HasWithRandomBuffRecord),
    HasRandomBuff(HasRandomBuffRecord),
    CombinationConsumable(CombinationConsumableRecord),
    CombinationEquipment(CombinationEquipmentRecord),
    ReplaceCombinationEquipmentMaterial(ReplaceCombinationEquipmentMaterialRecord),
    ItemEnhancement(ItemEnhancementRecord),
    ItemEnhancementFail(ItemEnhancementFailRecord),
    ShopHistory(ShopHistoryRecord),
    ClaimStakeReward(ClaimStakeRewardRecord),
    JoinArena(JoinArenaRecord),
    BattleArena(BattleArenaRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Block(_) => RecordKind::Block,
            Record::Transaction(_) => RecordKind::Transaction,
            Record::Agent(_) => RecordKind::Agent,
            Record::Avatar(_) => RecordKind::Avatar,
            Record::Equipment(_) => RecordKind::Equipment,
            Record::HackAndSlash(_) => RecordKind::HackAndSlash,
            Record::HackAndSlashSweep(_) => RecordKind::HackAndSlashSweep,
            Record::HasWithRandomBuff(_) => RecordKind::HasWithRandomBuff,
            Record::HasRandomBuff(_) => RecordKind::HasRandomBuff,
            Record::CombinationConsumable(_) => RecordKind::CombinationConsumable,
            Record::CombinationEquipment(_) => RecordKind::CombinationEquipment,
            Record::ReplaceCombinationEquipmentMaterial(_) => {
                RecordKind::ReplaceCombinationEquipmentMaterial
            }
            Record::ItemEnhancement(_) => RecordKind::ItemEnhancement,
            Record::ItemEnhancementFail(_) => RecordKind::ItemEnhancementFail,
            Record::ShopHistory(_) => RecordKind::ShopHistory,
            Record::ClaimStakeReward(_) => RecordKind::ClaimStakeReward,
            Record::JoinArena(_) => RecordKind::JoinArena,
            Record::BattleArena(_) => RecordKind::BattleArena,
        }
    }

    /// Logical key, unique per kind
    pub fn key(&self) -> String {
        match self {
            // Zero padded so lexical order follows block order
            Record::Block(r) => format!("{:020}", r.index),
            Record::Transaction(r) => r.tx_id.to_string(),
            Record::Agent(r) => r.address.to_string(),
            Record::Avatar(r) => r.address.to_string(),
            Record::Equipment(r) => r.item_id.to_string(),
            Record::HackAndSlash(r) => r.id.to_string(),
            Record::HackAndSlashSweep(r) => r.id.to_string(),
            Record::HasWithRandomBuff(r) => r.id.to_string(),
            Record::HasRandomBuff(r) => r.id.to_string(),
            Record::CombinationConsumable(r) => r.id.to_string(),
            Record::CombinationEquipment(r) => r.id.to_string(),
            Record::ReplaceCombinationEquipmentMaterial(r) => {
                format!("{}:{}", r.id, r.replaced_material_id)
            }
            Record::ItemEnhancement(r) => r.id.to_string(),
            Record::ItemEnhancementFail(r) => r.id.to_string(),
            Record::ShopHistory(r) => r.order_id.to_string(),
            Record::ClaimStakeReward(r) => r.id.to_string(),
            Record::JoinArena(r) => r.id.to_string(),
            Record::BattleArena(r) => r.id.to_string(),
        }
    }

    pub fn block_index(&self) -> u64 {
        match self {
            Record::Block(r) => r.index,
            Record::Transaction(r) => r.block_index,
            Record::Agent(r) => r.block_index,
            Record::Avatar(r) => r.block_index,
            Record::Equipment(r) => r.block_index,
            Record::HackAndSlash(r) => r.block_index,
            Record::HackAndSlashSweep(r) => r.block_index,
            Record::HasWithRandomBuff(r) => r.block_index,
            Record::HasRandomBuff(r) => r.block_index,
            Record::CombinationConsumable(r) => r.block_index,
            Record::CombinationEquipment(r) => r.block_index,
            Record::ReplaceCombinationEquipmentMaterial(r) => r.block_index,
            Record::ItemEnhancement(r) => r.block_index,
            Record::ItemEnhancementFail(r) => r.block_index,
            Record::ShopHistory(r) => r.block_index,
            Record::ClaimStakeReward(r) => r.block_index,
            Record::JoinArena(r) => r.block_index,
            Record::BattleArena(r) => r.block_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hack_and_slash(id: u8) -> Record {
        Record::HackAndSlash(HackAndSlashRecord {
            id: ActionId::new([id; 16]),
            agent: Address::default(),
            avatar: Address::default(),
            stage_id: 1,
            cleared: true,
            mimisbrunnr: false,
            block_index: 9,
        })
    }

    #[test]
    fn kind_names_are_unique() {
        let names: std::collections::HashSet<_> =
            RecordKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), RecordKind::ALL.len());
    }

    #[test]
    fn snapshot_kinds_keep_last() {
        assert_eq!(RecordKind::Avatar.dedup_policy(), DedupPolicy::KeepLast);
        assert_eq!(RecordKind::Equipment.dedup_policy(), DedupPolicy::KeepLast);
        assert_eq!(RecordKind::HackAndSlash.dedup_policy(), DedupPolicy::KeepFirst);
        assert_eq!(RecordKind::ShopHistory.dedup_policy(), DedupPolicy::KeepFirst);
        assert!(RecordKind::Agent.is_snapshot());
        assert!(!RecordKind::BattleArena.is_snapshot());
    }

    #[test]
    fn replaced_material_key_includes_material() {
        let record = |material| {
            Record::ReplaceCombinationEquipmentMaterial(ReplaceCombinationEquipmentMaterialRecord {
                id: ActionId::new([1; 16]),
                agent: Address::default(),
                avatar: Address::default(),
                replaced_material_id: material,
                replaced_material_count: 2,
                burnt_crystal: 0,
                block_index: 1,
            })
        };
        assert_ne!(record(303000).key(), record(303100).key());
    }

    #[test]
    fn record_survives_bincode() {
        let record = hack_and_slash(3);
        let bytes = bincode::serialize(&record).unwrap();
        let back: Record = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.kind(), RecordKind::HackAndSlash);
        assert_eq!(back.block_index(), 9);
    }
}
