//! Normalized ledger types shared by every statement dialect.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// One statement row, normalized.
///
/// `debit` and `credit` are magnitudes; which one is populated carries the
/// direction. Columns a dialect does not have are zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub fees: Money,
    pub debit: Money,
    pub credit: Money,
    /// Running balance printed next to the row, when the dialect has one.
    pub balance_after: Option<Money>,
}

impl Transaction {
    /// Create a row with all amount columns zero.
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
            fees: Money::ZERO,
            debit: Money::ZERO,
            credit: Money::ZERO,
            balance_after: None,
        }
    }

    pub fn with_fees(mut self, fees: Money) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_debit(mut self, debit: Money) -> Self {
        self.debit = debit;
        self
    }

    pub fn with_credit(mut self, credit: Money) -> Self {
        self.credit = credit;
        self
    }

    pub fn with_balance_after(mut self, balance: Money) -> Self {
        self.balance_after = Some(balance);
        self
    }

    /// The balance before this row was applied, derived from `balance_after`.
    pub fn balance_before(&self) -> Option<Money> {
        self.balance_after
            .map(|after| after - self.credit + self.debit + self.fees)
    }
}

/// Summary labels a statement may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryField {
    StatementPeriod,
    OpeningBalance,
    ClosingBalance,
    TotalDebits,
    TotalCredits,
}

impl SummaryField {
    pub const ALL: [SummaryField; 5] = [
        SummaryField::StatementPeriod,
        SummaryField::OpeningBalance,
        SummaryField::ClosingBalance,
        SummaryField::TotalDebits,
        SummaryField::TotalCredits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryField::StatementPeriod => "statement_period",
            SummaryField::OpeningBalance => "opening_balance",
            SummaryField::ClosingBalance => "closing_balance",
            SummaryField::TotalDebits => "total_debits",
            SummaryField::TotalCredits => "total_credits",
        }
    }
}

/// The statement period as printed, plus its dates when they could be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub text: String,
    pub dates: Option<(NaiveDate, NaiveDate)>,
}

impl StatementPeriod {
    pub fn start(&self) -> Option<NaiveDate> {
        self.dates.map(|(start, _)| start)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.dates.map(|(_, end)| end)
    }
}

/// Scalar fields read from the statement's own summary block.
///
/// A field is `Some` only when its label was found and its value read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub statement_period: Option<StatementPeriod>,
    pub opening_balance: Option<Money>,
    pub closing_balance: Option<Money>,
    pub stated_total_debits: Option<Money>,
    pub stated_total_credits: Option<Money>,
}

impl AccountSummary {
    pub fn has(&self, field: SummaryField) -> bool {
        match field {
            SummaryField::StatementPeriod => self.statement_period.is_some(),
            SummaryField::OpeningBalance => self.opening_balance.is_some(),
            SummaryField::ClosingBalance => self.closing_balance.is_some(),
            SummaryField::TotalDebits => self.stated_total_debits.is_some(),
            SummaryField::TotalCredits => self.stated_total_credits.is_some(),
        }
    }

    /// Set a money field. Period is not a money field and is ignored here.
    pub fn set_amount(&mut self, field: SummaryField, value: Money) {
        match field {
            SummaryField::StatementPeriod => {}
            SummaryField::OpeningBalance => self.opening_balance = Some(value),
            SummaryField::ClosingBalance => self.closing_balance = Some(value),
            SummaryField::TotalDebits => self.stated_total_debits = Some(value),
            SummaryField::TotalCredits => self.stated_total_credits = Some(value),
        }
    }
}

/// Totals folded from a transaction sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub debits: Money,
    pub credits: Money,
    pub fees: Money,
    pub rows: usize,
}

impl Totals {
    pub fn of(transactions: &[Transaction]) -> Self {
        transactions.iter().fold(Totals::default(), |acc, t| Totals {
            debits: acc.debits + t.debit,
            credits: acc.credits + t.credit,
            fees: acc.fees + t.fees,
            rows: acc.rows + 1,
        })
    }

    /// `credits - debits`.
    pub fn net_change(&self) -> Money {
        self.credits - self.debits
    }
}

/// The parsed result for one statement document. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    summary: AccountSummary,
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(summary: AccountSummary, transactions: Vec<Transaction>) -> Self {
        Self {
            summary,
            transactions,
        }
    }

    pub fn summary(&self) -> &AccountSummary {
        &self.summary
    }

    /// Transactions in statement order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn totals(&self) -> Totals {
        Totals::of(&self.transactions)
    }

    pub fn computed_debits(&self) -> Money {
        self.totals().debits
    }

    pub fn computed_credits(&self) -> Money {
        self.totals().credits
    }

    pub fn net_change(&self) -> Money {
        self.totals().net_change()
    }

    pub fn into_parts(self) -> (AccountSummary, Vec<Transaction>) {
        (self.summary, self.transactions)
    }
}
