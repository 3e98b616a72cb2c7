//! Definition of DataProvider messages

use serde::{Deserialize, Serialize};

use crate::ledger::{ActionEvaluation, BlockHeader};

/// Notifications delivered by the ledger session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerMessage {
    /// A block was appended to the ledger's current view
    BlockAppended(BlockHeader),

    /// An action inside an appended block was applied
    ActionRendered(ActionEvaluation),

    /// A previously applied action was withdrawn by a reorganisation
    ActionUnrendered(ActionEvaluation),
}

// === Global message enum ===
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    None(()), // Just so we have a simple default

    // Ledger session notifications
    Ledger(LedgerMessage),
}

impl Default for Message {
    fn default() -> Self {
        Self::None(())
    }
}

impl From<LedgerMessage> for Message {
    fn from(msg: LedgerMessage) -> Self {
        Message::Ledger(msg)
    }
}
