// DataProvider common library - main library exports

pub mod hash;
pub mod ledger;
pub mod messages;
pub mod records;
pub mod state;

// Flattened re-exports
pub use self::hash::{ActionId, Address, BlockHash, Hash, ItemId, OrderId, TxId};
pub use self::records::{DedupPolicy, Record, RecordKind};
