pub mod generate;
pub mod ofx;

pub use generate::{generate, generate_now, StatementDocument};
pub use ofx::{parse, parse_transactions, OfxParser, ParseWarning, ParsedStatement, StatementError};
