use anyhow::Result;
use dataprovider_common::{
    ledger::ActionEvaluation,
    records::{BattleArenaRecord, JoinArenaRecord},
    state::{ArenaType, CRYSTAL, NCG},
    Address, Record,
};
use serde::Deserialize;

use super::{agent_and_avatar, avatar_state, burnt, params};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinArenaParams {
    avatar_address: Address,
    championship_id: u32,
    round: u32,
}

pub fn join_arena(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: JoinArenaParams = params(ev)?;
    let avatar = avatar_state(&ev.output_states, &p.avatar_address)?;

    let mut records = agent_and_avatar(ev, &p.avatar_address)?;
    records.push(Record::JoinArena(JoinArenaRecord {
        id: ev.action_id(),
        agent: ev.signer,
        avatar: p.avatar_address,
        avatar_level: avatar.level,
        round: p.round,
        championship_id: p.championship_id,
        burnt_crystal: burnt(ev, &ev.signer, CRYSTAL),
        block_index: ev.block_index,
    }));
    Ok(records)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BattleArenaParams {
    my_avatar_address: Address,
    enemy_avatar_address: Address,
    championship_id: u32,
    round: u32,
    #[serde(default)]
    ticket: u32,
}

pub fn battle_arena(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: BattleArenaParams = params(ev)?;
    let avatar = avatar_state(&ev.output_states, &p.my_avatar_address)?;

    let (me, championship, round) = (&p.my_avatar_address, p.championship_id, p.round);
    let score_before = ev.previous_states.arena_score(me, championship, round);
    let score_after = ev.output_states.arena_score(me, championship, round);
    let wins = ev
        .output_states
        .arena_info(me, championship, round)
        .win
        .saturating_sub(ev.previous_states.arena_info(me, championship, round).win);

    // Medals are only handed out in season rounds that define one
    let medal_count = match ev.output_states.sheets.arena_round(championship, round) {
        Some(r) if r.arena_type != ArenaType::OffSeason && r.medal_id.is_some() => wins,
        _ => 0,
    };

    let mut records = agent_and_avatar(ev, me)?;
    records.push(Record::BattleArena(BattleArenaRecord {
        id: ev.action_id(),
        agent: ev.signer,
        avatar: *me,
        avatar_level: avatar.level,
        enemy_avatar: p.enemy_avatar_address,
        round,
        championship_id: championship,
        ticket_count: p.ticket,
        burnt_ncg: burnt(ev, &ev.signer, NCG),
        victory: score_after.score > score_before.score,
        medal_count,
        block_index: ev.block_index,
    }));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::fixtures::*;
    use dataprovider_common::state::{
        ArenaInformation, ArenaRound, ArenaScore, StateSnapshot,
    };
    use serde_json::json;

    const ENEMY: Address = Address::new([0xee; 20]);

    fn arena_states(arena_type: ArenaType) -> (StateSnapshot, StateSnapshot) {
        let key = StateSnapshot::arena_key(&AVATAR, 3, 7);
        let mut previous = snapshot_with(avatar());
        previous.arena_scores.insert(key.clone(), ArenaScore { score: 1000 });
        previous.arena_infos.insert(
            key.clone(),
            ArenaInformation {
                win: 4,
                lose: 1,
                ticket: 8,
            },
        );
        previous.balances.entry(AGENT).or_default().insert(NCG.into(), 500);

        let mut output = previous.clone();
        output.arena_scores.insert(key.clone(), ArenaScore { score: 1020 });
        output.arena_infos.insert(
            key,
            ArenaInformation {
                win: 6,
                lose: 1,
                ticket: 6,
            },
        );
        output.balances.entry(AGENT).or_default().insert(NCG.into(), 460);
        output.sheets.arena_rounds.push(ArenaRound {
            championship_id: 3,
            round: 7,
            arena_type,
            medal_id: Some(700_000),
        });
        (previous, output)
    }

    fn battle_args() -> serde_json::Value {
        json!({
            "myAvatarAddress": AVATAR.to_string(),
            "enemyAvatarAddress": ENEMY.to_string(),
            "championshipId": 3,
            "round": 7,
            "ticket": 2
        })
    }

    #[test]
    fn season_battle_awards_medals_per_win() {
        let (previous, output) = arena_states(ArenaType::Season);
        let ev = evaluation("battle_arena", battle_args(), previous, output);

        match battle_arena(&ev).unwrap().last() {
            Some(Record::BattleArena(r)) => {
                assert!(r.victory);
                assert_eq!(r.medal_count, 2);
                assert_eq!(r.ticket_count, 2);
                assert_eq!(r.burnt_ncg, 40);
                assert_eq!(r.enemy_avatar, ENEMY);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn off_season_battle_awards_no_medals() {
        let (previous, output) = arena_states(ArenaType::OffSeason);
        let ev = evaluation("battle_arena", battle_args(), previous, output);

        match battle_arena(&ev).unwrap().last() {
            Some(Record::BattleArena(r)) => assert_eq!(r.medal_count, 0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn join_arena_records_round_and_crystal() {
        let mut previous = snapshot_with(avatar());
        previous.balances.entry(AGENT).or_default().insert(CRYSTAL.into(), 90);
        let mut output = previous.clone();
        output.balances.entry(AGENT).or_default().insert(CRYSTAL.into(), 0);

        let ev = evaluation(
            "join_arena",
            json!({ "avatarAddress": AVATAR.to_string(), "championshipId": 3, "round": 2 }),
            previous,
            output,
        );
        match join_arena(&ev).unwrap().last() {
            Some(Record::JoinArena(r)) => {
                assert_eq!((r.championship_id, r.round), (3, 2));
                assert_eq!(r.burnt_crystal, 90);
                assert_eq!(r.avatar_level, 120);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
