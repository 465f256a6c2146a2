//! Reconciliation: computed totals against the statement's own figures.
//!
//! Every rule runs independently; one failing never hides another.

use passbook_core::{Ledger, Money, SummaryField, TotalKind, Totals, Warning};
use serde::{Deserialize, Serialize};

/// Allowed difference between a computed and a stated total, in minor units.
/// Statements round to the cent, so one cent is the whole tolerance.
pub const TOLERANCE_MINOR_UNITS: i64 = 1;

/// Where a reported balance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSource {
    /// Read from the statement's summary labels.
    Stated,
    /// Balance before the first transaction, from its running balance.
    FirstTransaction,
    /// Running balance after the last transaction.
    LastTransaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedBalance {
    pub value: Money,
    pub source: BalanceSource,
}

/// Derived figures for display. Substituted balances live here only; the
/// ledger's summary keeps exactly what the statement said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub totals: Totals,
    /// `credits - debits`
    pub net_change: Money,
    pub opening_balance: Option<DerivedBalance>,
    pub closing_balance: Option<DerivedBalance>,
    /// `closing - opening`, only when both balances are stated.
    pub stated_movement: Option<Money>,
}

fn check_total(kind: TotalKind, computed: Money, stated: Option<Money>) -> Option<Warning> {
    let stated = stated?;
    let delta = computed - stated;
    (delta.abs() > Money::from_minor(TOLERANCE_MINOR_UNITS)).then_some(Warning::TotalMismatch {
        total: kind,
        computed,
        stated,
        delta,
    })
}

fn balance(
    stated: Option<Money>,
    field: SummaryField,
    fallback: impl FnOnce() -> Option<DerivedBalance>,
    warnings: &mut Vec<Warning>,
) -> Option<DerivedBalance> {
    match stated {
        Some(value) => Some(DerivedBalance {
            value,
            source: BalanceSource::Stated,
        }),
        None => {
            warnings.push(Warning::MissingField { field });
            fallback()
        }
    }
}

/// Reconcile a ledger against its own summary.
pub fn reconcile(ledger: &Ledger) -> (Reconciliation, Vec<Warning>) {
    let summary = ledger.summary();
    let transactions = ledger.transactions();
    let totals = ledger.totals();
    let mut warnings = Vec::new();

    warnings.extend(check_total(TotalKind::Debits, totals.debits, summary.stated_total_debits));
    warnings.extend(check_total(TotalKind::Credits, totals.credits, summary.stated_total_credits));

    let opening_balance = balance(
        summary.opening_balance,
        SummaryField::OpeningBalance,
        || {
            transactions
                .first()
                .and_then(|t| t.balance_before())
                .map(|value| DerivedBalance {
                    value,
                    source: BalanceSource::FirstTransaction,
                })
        },
        &mut warnings,
    );
    let closing_balance = balance(
        summary.closing_balance,
        SummaryField::ClosingBalance,
        || {
            transactions
                .last()
                .and_then(|t| t.balance_after)
                .map(|value| DerivedBalance {
                    value,
                    source: BalanceSource::LastTransaction,
                })
        },
        &mut warnings,
    );

    if transactions.is_empty() {
        warnings.push(Warning::NoTransactionsMatched);
    }

    let stated_movement = summary
        .opening_balance
        .zip(summary.closing_balance)
        .map(|(open, close)| close - open);

    let report = Reconciliation {
        totals,
        net_change: totals.net_change(),
        opening_balance,
        closing_balance,
        stated_movement,
    };
    (report, warnings)
}
