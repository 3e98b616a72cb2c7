//! Stage battles: hack and slash, sweeps, ranking battles and buff gacha

use anyhow::Result;
use dataprovider_common::{
    ledger::ActionEvaluation,
    records::{
        HackAndSlashRecord, HackAndSlashSweepRecord, HasRandomBuffRecord, HasWithRandomBuffRecord,
    },
    state::CRYSTAL,
    Address, ItemId, Record,
};
use serde::Deserialize;

use super::{agent_and_avatar, avatar_state, burnt, params};

/// Stage ids above this belong to the Mimisbrunnr world
const MIMISBRUNNR_STAGE_OFFSET: u32 = 10_000_000;

const NORMAL_GACHA_COUNT: u32 = 5;
const ADVANCED_GACHA_COUNT: u32 = 10;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HackAndSlashParams {
    avatar_address: Address,
    stage_id: u32,
    #[serde(default)]
    stage_buff_id: Option<u32>,
}

pub fn hack_and_slash(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: HackAndSlashParams = params(ev)?;
    let avatar = avatar_state(&ev.output_states, &p.avatar_address)?;
    let cleared = avatar.has_cleared(p.stage_id);

    let mut records = agent_and_avatar(ev, &p.avatar_address)?;
    records.push(Record::HackAndSlash(HackAndSlashRecord {
        id: ev.action_id(),
        agent: ev.signer,
        avatar: p.avatar_address,
        stage_id: p.stage_id,
        cleared,
        mimisbrunnr: p.stage_id > MIMISBRUNNR_STAGE_OFFSET,
        block_index: ev.block_index,
    }));

    if let Some(buff_id) = p.stage_buff_id {
        records.push(Record::HasWithRandomBuff(HasWithRandomBuffRecord {
            id: ev.action_id(),
            agent: ev.signer,
            avatar: p.avatar_address,
            stage_id: p.stage_id,
            buff_id,
            cleared,
            block_index: ev.block_index,
        }));
    }

    Ok(records)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SweepParams {
    avatar_address: Address,
    world_id: u32,
    stage_id: u32,
    #[serde(default)]
    ap_stone_count: u32,
    // Absent before sweep v3
    #[serde(default)]
    action_point: u32,
    #[serde(default)]
    costumes: Vec<ItemId>,
    #[serde(default)]
    equipments: Vec<ItemId>,
}

pub fn hack_and_slash_sweep(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: SweepParams = params(ev)?;
    let avatar = avatar_state(&ev.output_states, &p.avatar_address)?;

    let mut records = agent_and_avatar(ev, &p.avatar_address)?;
    records.push(Record::HackAndSlashSweep(HackAndSlashSweepRecord {
        id: ev.action_id(),
        agent: ev.signer,
        avatar: p.avatar_address,
        world_id: p.world_id,
        stage_id: p.stage_id,
        ap_stone_count: p.ap_stone_count,
        action_point: p.action_point,
        costumes_count: p.costumes.len() as u32,
        equipments_count: p.equipments.len() as u32,
        cleared: avatar.has_cleared(p.stage_id),
        mimisbrunnr: p.stage_id > MIMISBRUNNR_STAGE_OFFSET,
        block_index: ev.block_index,
    }));
    Ok(records)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvatarOnlyParams {
    avatar_address: Address,
}

/// Ranking battles only refresh the agent and avatar
pub fn ranking_battle(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: AvatarOnlyParams = params(ev)?;
    agent_and_avatar(ev, &p.avatar_address)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RandomBuffParams {
    avatar_address: Address,
    #[serde(default)]
    advanced_gacha: bool,
}

pub fn hack_and_slash_random_buff(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: RandomBuffParams = params(ev)?;
    let previous = avatar_state(&ev.previous_states, &p.avatar_address)?;

    let mut records = agent_and_avatar(ev, &p.avatar_address)?;
    records.push(Record::HasRandomBuff(HasRandomBuffRecord {
        id: ev.action_id(),
        agent: ev.signer,
        avatar: p.avatar_address,
        has_stage_id: previous.last_cleared_stage().unwrap_or(0),
        gacha_count: if p.advanced_gacha {
            ADVANCED_GACHA_COUNT
        } else {
            NORMAL_GACHA_COUNT
        },
        burnt_crystal: burnt(ev, &ev.signer, CRYSTAL),
        block_index: ev.block_index,
    }));
    Ok(records)
}
