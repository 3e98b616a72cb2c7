//! Notifications emitted by the ledger session

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{
    hash::{ActionId, Address, BlockHash, TxId},
    state::StateSnapshot,
};

/// Header of an appended block together with its transactions
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    pub hash: BlockHash,
    pub miner: Address,
    pub difficulty: i64,

    /// Hex encoded proof-of-work nonce
    pub nonce: String,

    #[serde(default)]
    pub previous_hash: Option<BlockHash>,

    pub protocol_version: i32,

    #[serde(default)]
    pub public_key: Option<String>,

    #[serde(default)]
    pub state_root_hash: Option<BlockHash>,

    #[serde_as(as = "DisplayFromStr")]
    pub total_difficulty: u128,

    #[serde(default)]
    pub tx_hash: Option<BlockHash>,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub signer: Address,
    pub nonce: i64,
    pub public_key: String,
    pub updated_addresses_count: u32,
    pub timestamp: DateTime<Utc>,

    /// Type ids of the actions carried, in order
    #[serde(default)]
    pub action_types: Vec<String>,
}

/// One action instance as carried by a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,

    /// Kind tag including its version suffix, e.g. `hack_and_slash13`
    pub type_id: String,

    /// Action arguments in their plain-value form
    #[serde(default)]
    pub plain_value: serde_json::Value,
}

/// Evaluation of one action, delivered on render and on unrender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvaluation {
    pub action: Action,
    pub signer: Address,
    pub block_index: u64,
    pub previous_states: Arc<StateSnapshot>,
    pub output_states: Arc<StateSnapshot>,

    /// Set when the action failed on the ledger
    #[serde(default)]
    pub exception: Option<String>,
}

impl ActionEvaluation {
    pub fn action_id(&self) -> ActionId {
        self.action.id
    }

    pub fn type_id(&self) -> &str {
        &self.action.type_id
    }
}
