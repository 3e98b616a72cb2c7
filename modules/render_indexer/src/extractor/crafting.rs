//! Crafting and enhancement through combination slots

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use dataprovider_common::{
    ledger::ActionEvaluation,
    records::{
        CombinationConsumableRecord, CombinationEquipmentRecord, ItemEnhancementFailRecord,
        ItemEnhancementRecord, ReplaceCombinationEquipmentMaterialRecord,
    },
    state::{AvatarState, Equipment, CRYSTAL, NCG},
    Address, ItemId, Record,
};
use serde::Deserialize;

use super::{agent_and_avatar, avatar_state, burnt, equipment_record, params};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CombinationConsumableParams {
    avatar_address: Address,
    recipe_id: u32,
    slot_index: u32,
}

pub fn combination_consumable(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: CombinationConsumableParams = params(ev)?;

    let mut records = agent_and_avatar(ev, &p.avatar_address)?;
    records.push(Record::CombinationConsumable(CombinationConsumableRecord {
        id: ev.action_id(),
        agent: ev.signer,
        avatar: p.avatar_address,
        recipe_id: p.recipe_id,
        slot_index: p.slot_index,
        block_index: ev.block_index,
    }));
    Ok(records)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CombinationEquipmentParams {
    avatar_address: Address,
    recipe_id: u32,
    slot_index: u32,
    #[serde(default)]
    sub_recipe_id: Option<u32>,
    // Introduced with combination_equipment10
    #[serde(default)]
    pay_by_crystal: bool,
}

pub fn combination_equipment(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: CombinationEquipmentParams = params(ev)?;

    let mut records = agent_and_avatar(ev, &p.avatar_address)?;
    records.push(Record::CombinationEquipment(CombinationEquipmentRecord {
        id: ev.action_id(),
        agent: ev.signer,
        avatar: p.avatar_address,
        recipe_id: p.recipe_id,
        slot_index: p.slot_index,
        sub_recipe_id: p.sub_recipe_id.unwrap_or(0),
        block_index: ev.block_index,
    }));

    if p.pay_by_crystal {
        let previous = avatar_state(&ev.previous_states, &p.avatar_address)?;
        let required = required_materials(ev, p.recipe_id, p.sub_recipe_id)?;
        let burnt_crystal = burnt(ev, &ev.signer, CRYSTAL);

        for (material_id, count) in required {
            let held = previous.inventory.fungible_count(material_id);
            if held >= count {
                continue;
            }
            records.push(Record::ReplaceCombinationEquipmentMaterial(
                ReplaceCombinationEquipmentMaterialRecord {
                    id: ev.action_id(),
                    agent: ev.signer,
                    avatar: p.avatar_address,
                    replaced_material_id: material_id,
                    replaced_material_count: count - held,
                    burnt_crystal,
                    block_index: ev.block_index,
                },
            ));
        }
    }

    let output = avatar_state(&ev.output_states, &p.avatar_address)?;
    if let Some(equipment) = slot_equipment(output, p.slot_index) {
        records.push(equipment_record(
            &ev.signer,
            &p.avatar_address,
            equipment,
            ev.block_index,
        ));
    }

    Ok(records)
}

/// Material id to count needed by a recipe and its optional sub-recipe
fn required_materials(
    ev: &ActionEvaluation,
    recipe_id: u32,
    sub_recipe_id: Option<u32>,
) -> Result<BTreeMap<u32, u32>> {
    let sheets = &ev.previous_states.sheets;
    let recipe = sheets
        .equipment_recipes
        .get(&recipe_id)
        .ok_or_else(|| anyhow!("Equipment recipe {recipe_id} not found"))?;

    let mut required = BTreeMap::new();
    *required.entry(recipe.material_id).or_insert(0) += recipe.material_count;

    if let Some(sub_recipe_id) = sub_recipe_id {
        let sub_recipe = sheets
            .equipment_sub_recipes
            .get(&sub_recipe_id)
            .ok_or_else(|| anyhow!("Equipment sub-recipe {sub_recipe_id} not found"))?;
        for material in &sub_recipe.materials {
            *required.entry(material.id).or_insert(0) += material.count;
        }
    }

    Ok(required)
}

fn slot_equipment(avatar: &AvatarState, slot_index: u32) -> Option<&Equipment> {
    avatar.combination_slots.get(&slot_index).and_then(|slot| slot.equipment())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemEnhancementParams {
    avatar_address: Address,
    item_id: ItemId,
    material_id: ItemId,
    slot_index: u32,
}

/// A fail record is written whenever the equipment level is unchanged by the
/// action. This is an approximation: a no-op enhancement is recorded as a
/// failure too, and consumers rely on that behaviour. Equipment missing from
/// either state counts as level 0.
pub fn item_enhancement(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: ItemEnhancementParams = params(ev)?;
    let output = avatar_state(&ev.output_states, &p.avatar_address)?;

    let level_before = ev
        .previous_states
        .avatar(&p.avatar_address)
        .and_then(|a| a.inventory.equipment(&p.item_id))
        .map_or(0, |e| e.level);
    let after = slot_equipment(output, p.slot_index)
        .filter(|e| e.item_id == p.item_id)
        .or_else(|| output.inventory.equipment(&p.item_id));
    let level_after = after.map_or(0, |e| e.level);

    let mut records = agent_and_avatar(ev, &p.avatar_address)?;

    if level_before == level_after {
        records.push(Record::ItemEnhancementFail(ItemEnhancementFailRecord {
            id: ev.action_id(),
            agent: ev.signer,
            avatar: p.avatar_address,
            equipment_item_id: p.item_id,
            material_item_id: p.material_id,
            equipment_level: level_after,
            gained_crystal: -burnt(ev, &ev.signer, CRYSTAL),
            burnt_ncg: burnt(ev, &ev.signer, NCG),
            block_index: ev.block_index,
        }));
    }

    records.push(Record::ItemEnhancement(ItemEnhancementRecord {
        id: ev.action_id(),
        agent: ev.signer,
        avatar: p.avatar_address,
        item_id: p.item_id,
        material_id: p.material_id,
        slot_index: p.slot_index,
        block_index: ev.block_index,
    }));
    if let Some(equipment) = after {
        records.push(equipment_record(&ev.signer, &p.avatar_address, equipment, ev.block_index));
    }

    Ok(records)
}
