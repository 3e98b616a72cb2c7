//! Ledger state as seen by extractors
//!
//! A `StateSnapshot` carries only the parts of the world state the indexer
//! reads: avatars and their inventories, fungible balances, stake and arena
//! states, open shop orders and the game data sheets consulted when deriving
//! records.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::hash::{Address, ItemId, OrderId};

/// Crystal ticker, 18 decimal places
pub const CRYSTAL: &str = "CRYSTAL";

/// Gold ticker, 2 decimal places
pub const NCG: &str = "NCG";

pub const NCG_DECIMAL_PLACES: u32 = 2;

/// Item sub-types the extractors distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemSubType {
    Weapon,
    Armor,
    Belt,
    Necklace,
    Ring,
    FullCostume,
    HairCostume,
    EarCostume,
    EyeCostume,
    TailCostume,
    Title,
    Food,
    EquipmentMaterial,
    MonsterPart,
    NormalMaterial,
    Hourglass,
    ApStone,
    #[serde(other)]
    Other,
}

impl ItemSubType {
    pub fn is_equipment(self) -> bool {
        matches!(
            self,
            ItemSubType::Weapon
                | ItemSubType::Armor
                | ItemSubType::Belt
                | ItemSubType::Necklace
                | ItemSubType::Ring
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub item_id: ItemId,
    pub equipment_id: u32,
    pub sub_type: ItemSubType,
    #[serde(default)]
    pub grade: u32,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub combat_power: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Costume {
    pub item_id: ItemId,
    pub costume_id: u32,
    pub sub_type: ItemSubType,
    #[serde(default)]
    pub grade: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub equipments: Vec<Equipment>,

    #[serde(default)]
    pub costumes: Vec<Costume>,

    /// Fungible item id to held count
    #[serde(default)]
    pub fungibles: BTreeMap<u32, u32>,
}

impl Inventory {
    pub fn equipment(&self, item_id: &ItemId) -> Option<&Equipment> {
        self.equipments.iter().find(|e| &e.item_id == item_id)
    }

    pub fn fungible_count(&self, id: u32) -> u32 {
        self.fungibles.get(&id).copied().unwrap_or(0)
    }
}

/// Result held by a combination slot once crafting or enhancement finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotItem {
    Equipment(Equipment),
    Consumable { item_id: ItemId, consumable_id: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationSlot {
    #[serde(default)]
    pub result: Option<SlotItem>,
}

impl CombinationSlot {
    pub fn equipment(&self) -> Option<&Equipment> {
        match &self.result {
            Some(SlotItem::Equipment(equipment)) => Some(equipment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarState {
    pub agent: Address,
    pub name: String,
    pub level: u32,

    #[serde(default)]
    pub armor_id: u32,

    #[serde(default)]
    pub title_id: Option<u32>,

    #[serde(default)]
    pub combat_power: i64,

    #[serde(default)]
    pub cleared_stages: BTreeSet<u32>,

    #[serde(default)]
    pub inventory: Inventory,

    /// Slot index to slot
    #[serde(default)]
    pub combination_slots: BTreeMap<u32, CombinationSlot>,
}

impl AvatarState {
    pub fn has_cleared(&self, stage_id: u32) -> bool {
        self.cleared_stages.contains(&stage_id)
    }

    pub fn last_cleared_stage(&self) -> Option<u32> {
        self.cleared_stages.last().copied()
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeState {
    /// Deposit in NCG minor units
    #[serde_as(as = "DisplayFromStr")]
    pub staked: i128,

    pub started_block_index: u64,

    #[serde(default)]
    pub received_block_index: u64,
}

impl StakeState {
    pub const REWARD_INTERVAL: u64 = 50_400;

    /// Whole reward periods elapsed since the last claim (or the deposit)
    pub fn accumulated_rewards(&self, block_index: u64) -> u64 {
        let since = if self.received_block_index > 0 {
            self.received_block_index
        } else {
            self.started_block_index
        };
        block_index.saturating_sub(since) / Self::REWARD_INTERVAL
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaScore {
    pub score: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaInformation {
    pub win: u32,
    pub lose: u32,
    pub ticket: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArenaType {
    OffSeason,
    Season,
    Championship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaRound {
    pub championship_id: u32,
    pub round: u32,
    pub arena_type: ArenaType,

    #[serde(default)]
    pub medal_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRecipe {
    pub result_equipment_id: u32,
    pub material_id: u32,
    pub material_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSubRecipe {
    #[serde(default)]
    pub materials: Vec<Material>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeReward {
    pub item_id: u32,

    /// Whole NCG staked per unit of this reward
    #[serde_as(as = "DisplayFromStr")]
    pub rate: i128,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRewardLevel {
    pub level: u32,

    /// Minimum whole NCG staked for this level
    #[serde_as(as = "DisplayFromStr")]
    pub required_gold: i128,

    pub rewards: Vec<StakeReward>,

    /// Items granted per reward period regardless of the staked amount
    #[serde(default)]
    pub fixed_rewards: Vec<Material>,
}

/// Game data sheets referenced by extractors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSheets {
    #[serde(default)]
    pub equipment_recipes: BTreeMap<u32, EquipmentRecipe>,

    #[serde(default)]
    pub equipment_sub_recipes: BTreeMap<u32, EquipmentSubRecipe>,

    #[serde(default)]
    pub stake_rewards: Vec<StakeRewardLevel>,

    #[serde(default)]
    pub arena_rounds: Vec<ArenaRound>,
}

impl GameSheets {
    /// Highest reward level whose requirement the stake meets
    pub fn stake_level(&self, staked_whole_gold: i128) -> Option<&StakeRewardLevel> {
        self.stake_rewards
            .iter()
            .filter(|level| level.required_gold <= staked_whole_gold)
            .max_by_key(|level| level.required_gold)
    }

    pub fn arena_round(&self, championship_id: u32, round: u32) -> Option<&ArenaRound> {
        self.arena_rounds
            .iter()
            .find(|r| r.championship_id == championship_id && r.round == round)
    }
}

/// Item offered by a shop order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradableItem {
    Equipment(Equipment),
    Costume(Costume),
    Material { id: u32, grade: u32 },
    Consumable { item_id: ItemId, consumable_id: u32, grade: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Units sold by the order; always 1 for non-fungible items
    #[serde(default = "default_item_count")]
    pub item_count: u32,
    pub item: TradableItem,
}

fn default_item_count() -> u32 {
    1
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub avatars: BTreeMap<Address, AvatarState>,

    /// Address to currency ticker to amount in minor units
    #[serde_as(as = "BTreeMap<_, BTreeMap<_, DisplayFromStr>>")]
    #[serde(default)]
    pub balances: BTreeMap<Address, BTreeMap<String, i128>>,

    /// Keyed by agent address
    #[serde(default)]
    pub stakes: BTreeMap<Address, StakeState>,

    /// Keyed by [`StateSnapshot::arena_key`]
    #[serde(default)]
    pub arena_scores: BTreeMap<String, ArenaScore>,

    /// Keyed by [`StateSnapshot::arena_key`]
    #[serde(default)]
    pub arena_infos: BTreeMap<String, ArenaInformation>,

    #[serde(default)]
    pub orders: BTreeMap<OrderId, Order>,

    #[serde(default)]
    pub sheets: GameSheets,
}

impl StateSnapshot {
    pub fn arena_key(avatar: &Address, championship_id: u32, round: u32) -> String {
        format!("{avatar}:{championship_id}:{round}")
    }

    pub fn avatar(&self, address: &Address) -> Option<&AvatarState> {
        self.avatars.get(address)
    }

    pub fn balance(&self, address: &Address, ticker: &str) -> i128 {
        self.balances.get(address).and_then(|b| b.get(ticker)).copied().unwrap_or(0)
    }

    pub fn arena_score(&self, avatar: &Address, championship_id: u32, round: u32) -> ArenaScore {
        self.arena_scores
            .get(&Self::arena_key(avatar, championship_id, round))
            .copied()
            .unwrap_or_default()
    }

    pub fn arena_info(
        &self,
        avatar: &Address,
        championship_id: u32,
        round: u32,
    ) -> ArenaInformation {
        self.arena_infos
            .get(&Self::arena_key(avatar, championship_id, round))
            .copied()
            .unwrap_or_default()
    }
}
