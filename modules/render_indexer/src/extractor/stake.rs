use anyhow::{Context as _, Result};
use dataprovider_common::{
    ledger::ActionEvaluation,
    records::ClaimStakeRewardRecord,
    state::NCG_DECIMAL_PLACES,
    Address, Record,
};
use serde::Deserialize;

use super::{agent_and_avatar, params};

const HOURGLASS_ITEM_ID: u32 = 400_000;
const AP_POTION_ITEM_ID: u32 = 500_000;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimStakeRewardParams {
    avatar_address: Address,
}

pub fn claim_stake_reward(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: ClaimStakeRewardParams = params(ev)?;
    let mut records = agent_and_avatar(ev, &p.avatar_address)?;

    // Nothing to claim without a prior stake
    let Some(previous_stake) = ev.previous_states.stakes.get(&ev.signer) else {
        return Ok(records);
    };
    let staked = ev.output_states.stakes.get(&ev.signer).unwrap_or(previous_stake).staked;
    let staked_whole_gold = staked / 10i128.pow(NCG_DECIMAL_PLACES);
    let accumulated = previous_stake.accumulated_rewards(ev.block_index);

    let mut hourglass_count: u64 = 0;
    let mut ap_potion_count: u64 = 0;

    if let Some(level) = ev.previous_states.sheets.stake_level(staked_whole_gold) {
        for reward in &level.rewards {
            if reward.rate <= 0 {
                continue;
            }
            let quantity = staked_whole_gold / reward.rate;
            if quantity < 1 {
                continue;
            }
            let granted = u64::try_from(quantity)
                .context("Stake reward quantity out of range")?
                .saturating_mul(accumulated);
            match reward.item_id {
                HOURGLASS_ITEM_ID => hourglass_count += granted,
                AP_POTION_ITEM_ID => ap_potion_count += granted,
                _ => {}
            }
        }

        for reward in &level.fixed_rewards {
            let granted = u64::from(reward.count).saturating_mul(accumulated);
            match reward.id {
                HOURGLASS_ITEM_ID => hourglass_count += granted,
                AP_POTION_ITEM_ID => ap_potion_count += granted,
                _ => {}
            }
        }
    }

    records.push(Record::ClaimStakeReward(ClaimStakeRewardRecord {
        id: ev.action_id(),
        agent: ev.signer,
        claim_reward_avatar: p.avatar_address,
        hourglass_count,
        ap_potion_count,
        claim_stake_start_block_index: previous_stake.started_block_index,
        claim_stake_end_block_index: previous_stake.received_block_index,
        block_index: ev.block_index,
    }));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::fixtures::*;
    use dataprovider_common::state::{Material, StakeReward, StakeRewardLevel, StakeState};
    use serde_json::json;

    #[test]
    fn rewards_scale_with_stake_and_periods() {
        let mut previous = snapshot_with(avatar());
        previous.stakes.insert(
            AGENT,
            StakeState {
                staked: 500 * 100,
                started_block_index: 0,
                received_block_index: 0,
            },
        );
        previous.sheets.stake_rewards.push(StakeRewardLevel {
            level: 1,
            required_gold: 50,
            rewards: vec![
                StakeReward {
                    item_id: HOURGLASS_ITEM_ID,
                    rate: 50,
                },
                StakeReward {
                    item_id: AP_POTION_ITEM_ID,
                    rate: 1_000,
                },
            ],
            fixed_rewards: vec![Material {
                id: AP_POTION_ITEM_ID,
                count: 1,
            }],
        });
        let output = previous.clone();

        let mut ev = evaluation(
            "claim_stake_reward",
            json!({ "avatarAddress": AVATAR.to_string() }),
            previous,
            output,
        );
        ev.block_index = StakeState::REWARD_INTERVAL * 2 + 10;

        let records = claim_stake_reward(&ev).unwrap();
        match records.last() {
            Some(Record::ClaimStakeReward(r)) => {
                // 500 / 50 hourglasses for each of the two periods
                assert_eq!(r.hourglass_count, 20);
                // Staked amount below the potion rate, so only the fixed reward
                assert_eq!(r.ap_potion_count, 2);
                assert_eq!(r.claim_stake_start_block_index, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn no_stake_means_no_claim_record() {
        let states = snapshot_with(avatar());
        let ev = evaluation(
            "claim_stake_reward",
            json!({ "avatarAddress": AVATAR.to_string() }),
            states.clone(),
            states,
        );
        assert_eq!(claim_stake_reward(&ev).unwrap().len(), 2);
    }
}
