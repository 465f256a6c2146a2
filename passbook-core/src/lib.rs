//! passbook-core: exact amounts, the normalized ledger model, and warnings

pub mod model;
pub mod money;
pub mod warning;

pub use model::{AccountSummary, Ledger, StatementPeriod, SummaryField, Totals, Transaction};
pub use money::{LexError, MAX_WHOLE_UNITS, MONEY_SCALE, Money, lex_amount, lex_optional_amount};
pub use warning::{TotalKind, Warning};
