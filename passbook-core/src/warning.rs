//! Recoverable problems found while building a ledger.
//!
//! Warnings are returned alongside the ledger so callers can render, assert on,
//! or escalate them. Nothing here is logged on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::SummaryField;
use crate::money::Money;

/// Which stated total a mismatch refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalKind {
    Debits,
    Credits,
}

impl fmt::Display for TotalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalKind::Debits => f.write_str("debits"),
            TotalKind::Credits => f.write_str("credits"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A summary field needed downstream was not found in the text.
    MissingField { field: SummaryField },
    TotalMismatch {
        total: TotalKind,
        computed: Money,
        stated: Money,
        /// `computed - stated`
        delta: Money,
    },
    UnparsableAmount { raw: String, context: String },
    UnparsableDate { raw: String, context: String },
    /// The grammar found no rows; the dialect is probably wrong.
    NoTransactionsMatched,
}

impl Warning {
    /// High-severity warnings mean the ledger should not be trusted.
    pub fn is_severe(&self) -> bool {
        matches!(self, Warning::NoTransactionsMatched)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingField { field } => write!(f, "{} not found in the statement", field.as_str()),
            Warning::TotalMismatch {
                total,
                computed,
                stated,
                delta,
            } => write!(
                f,
                "computed total {total} ({computed}) doesn't match statement ({stated}), delta {delta}"
            ),
            Warning::UnparsableAmount { raw, context } => write!(f, "invalid amount {raw:?} in {context:?}"),
            Warning::UnparsableDate { raw, context } => write!(f, "invalid date {raw:?} in {context:?}"),
            Warning::NoTransactionsMatched => f.write_str("no transaction rows matched the selected dialect"),
        }
    }
}
