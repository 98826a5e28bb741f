pub mod dates;
pub mod kind;
pub mod money;
pub mod task;
pub mod transaction;

pub use dates::{compact_date, normalize_date, parse_iso_date};
pub use kind::{Capability, ConversionKind, ConversionRequest, CAPABILITIES};
pub use money::{amount_to_f64, encode_amount, normalize_amount, AmountError};
pub use task::{Task, TaskDetails, TaskId, TaskStatus, TaskUpdate};
pub use transaction::{AccountInfo, StatementTotals, TransactionRecord};
