//! passbook-ledger: reconciliation and per-document ledger assembly

pub mod assemble;
pub mod reconcile;

pub use assemble::{AssembleError, Assembler, Assembly, DialectSelection, assemble};
pub use reconcile::{BalanceSource, DerivedBalance, Reconciliation, TOLERANCE_MINOR_UNITS, reconcile};
