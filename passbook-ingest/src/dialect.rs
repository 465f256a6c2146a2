//! Dialect registry: one entry per known statement layout.
//!
//! A dialect is pure configuration ([`DialectSpec`]). It is compiled once on
//! registration into a [`Dialect`] that holds the row grammar and the summary
//! extractor. Adding a bank means adding a spec, either to [`builtin_specs`] or
//! to the `[[dialects]]` table of the CLI config.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::grammar::TransactionRowGrammar;
use crate::summary::SummaryExtractor;

/// Amount token shape used by the built-in text patterns. At least one digit
/// is required so a free-standing `-` stays part of the description; malformed
/// digit runs such as `1.2.3` still match and are rejected by the lexer.
const AMT: &str = r"[-(]?[\d,.]*\d[\d,.]*[-)]?";

#[derive(Debug, Error)]
pub enum DialectError {
    #[error("dialect {id}: invalid pattern: {source}")]
    Pattern {
        id: String,
        #[source]
        source: regex::Error,
    },
    #[error("dialect {id}: line pattern lacks the named group `{group}`")]
    MissingGroup { id: String, group: &'static str },
    #[error("dialect {id}: {columns} amount column(s) do not fit the {mapping} mapping")]
    ColumnCount {
        id: String,
        columns: usize,
        mapping: &'static str,
    },
    #[error("dialect {id}: at least one date format is required")]
    NoDateFormat { id: String },
}

/// How a single signed amount column maps to debit/credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignPolicy {
    /// The column only ever holds debits; the sign is ignored.
    AlwaysDebit,
    /// Negative values are debits, positive values credits.
    NegativeIsDebit,
    /// Positive values are debits, negative values credits.
    PositiveIsDebit,
}

/// Column-to-field mapping for the trailing amount columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ColumnMapping {
    Single { sign: SignPolicy },
    DebitCredit,
    FeesDebitCredit,
    /// 1 column: debit; 2: debit, credit; 3: fees, debit, credit.
    ByCount,
}

impl ColumnMapping {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnMapping::Single { .. } => "single",
            ColumnMapping::DebitCredit => "debit-credit",
            ColumnMapping::FeesDebitCredit => "fees-debit-credit",
            ColumnMapping::ByCount => "by-count",
        }
    }

    /// Whether `n` declared amount columns fit this mapping.
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            ColumnMapping::Single { .. } => n == 1,
            ColumnMapping::DebitCredit => n == 2,
            ColumnMapping::FeesDebitCredit => n == 3,
            ColumnMapping::ByCount => (1..=3).contains(&n),
        }
    }
}

/// Where the rows of a dialect come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceLayout {
    /// Regex over each line of the extracted text. Named groups: `date`,
    /// `desc`, `a1`..`a3`, optional `balance`.
    Text { line_pattern: String },
    /// Cells of pre-split table rows, addressed by index.
    Table {
        date: usize,
        description: usize,
        amounts: Vec<usize>,
        #[serde(default)]
        balance: Option<usize>,
        #[serde(default)]
        min_cells: usize,
    },
}

/// Ordered label alternatives per summary field. First match wins, so list
/// specific wording before generic wording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryLabels {
    pub statement_period: Vec<String>,
    pub opening_balance: Vec<String>,
    pub closing_balance: Vec<String>,
    pub total_debits: Vec<String>,
    pub total_credits: Vec<String>,
}

impl Default for SummaryLabels {
    fn default() -> Self {
        Self {
            statement_period: labels(&["Statement period"]),
            opening_balance: labels(&["Opening balance"]),
            closing_balance: labels(&["Closing balance"]),
            total_debits: labels(&["Total Funds used/debits", "Total Funds used", "Total Debits"]),
            total_credits: labels(&[
                "Total Funds Received/credits",
                "Total Funds Received",
                "Total Credits",
            ]),
        }
    }
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_date_formats() -> Vec<String> {
    vec!["%d/%m/%Y".to_string()]
}

/// Configuration for one statement dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub source: SourceLayout,
    pub columns: ColumnMapping,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub labels: SummaryLabels,
}

/// A compiled dialect, ready to run.
#[derive(Debug, Clone)]
pub struct Dialect {
    spec: DialectSpec,
    grammar: TransactionRowGrammar,
    summary: SummaryExtractor,
}

impl Dialect {
    pub fn compile(spec: DialectSpec) -> Result<Self, DialectError> {
        let grammar = TransactionRowGrammar::compile(&spec)?;
        let summary = SummaryExtractor::compile(&spec.id, &spec.labels)?;
        Ok(Self {
            spec,
            grammar,
            summary,
        })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &DialectSpec {
        &self.spec
    }

    pub fn grammar(&self) -> &TransactionRowGrammar {
        &self.grammar
    }

    pub fn summary(&self) -> &SummaryExtractor {
        &self.summary
    }
}

/// Registered dialects in registration order. Order is observable: it breaks
/// ties during automatic selection.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    entries: Vec<Dialect>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in dialect.
    pub fn builtin() -> Result<Self, DialectError> {
        let mut registry = Self::new();
        for spec in builtin_specs() {
            registry.register(spec)?;
        }
        Ok(registry)
    }

    /// Compile and add a dialect. An existing id is replaced in place.
    pub fn register(&mut self, spec: DialectSpec) -> Result<(), DialectError> {
        let dialect = Dialect::compile(spec)?;
        match self.entries.iter_mut().find(|d| d.id() == dialect.id()) {
            Some(slot) => {
                debug!(dialect = dialect.id(), "replacing registered dialect");
                *slot = dialect;
            }
            None => {
                debug!(dialect = dialect.id(), "registered dialect");
                self.entries.push(dialect);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Dialect> {
        self.entries.iter().find(|d| d.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dialect> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The built-in dialects. Order breaks auto-detect ties: `variable-columns`
/// also matches every two-amount row of `signed-amount-balance`, so it comes
/// first and a signed-amount statement has to be named explicitly.
pub fn builtin_specs() -> Vec<DialectSpec> {
    vec![
        DialectSpec {
            id: "fees-debits-credits".to_string(),
            description: "Text rows: date, description, fees, debits, credits".to_string(),
            source: SourceLayout::Text {
                line_pattern: format!(
                    r"^\s*(?P<date>\d{{2}}/\d{{2}}/\d{{4}})\s+(?P<desc>.+?)\s+(?P<a1>{AMT})\s+(?P<a2>{AMT})\s+(?P<a3>{AMT})\s*$"
                ),
            },
            columns: ColumnMapping::FeesDebitCredit,
            date_formats: default_date_formats(),
            labels: SummaryLabels::default(),
        },
        DialectSpec {
            id: "variable-columns".to_string(),
            description: "Text rows: date, description, then one to three amounts".to_string(),
            source: SourceLayout::Text {
                line_pattern: format!(
                    r"^\s*(?P<date>\d{{2}}/\d{{2}}/\d{{4}})\s+(?P<desc>.+?)\s+(?P<a1>{AMT})(?:\s+(?P<a2>{AMT}))?(?:\s+(?P<a3>{AMT}))?\s*$"
                ),
            },
            columns: ColumnMapping::ByCount,
            date_formats: default_date_formats(),
            labels: SummaryLabels::default(),
        },
        DialectSpec {
            id: "signed-amount-balance".to_string(),
            description: "Text rows: date, description, signed amount (positive is a debit), balance"
                .to_string(),
            source: SourceLayout::Text {
                line_pattern: format!(
                    r"^\s*(?P<date>\d{{2}}/\d{{2}}/\d{{4}})\s*(?P<desc>[^\d\s-].*?)\s+(?P<a1>{AMT})\s+(?P<balance>{AMT})\s*$"
                ),
            },
            columns: ColumnMapping::Single {
                sign: SignPolicy::PositiveIsDebit,
            },
            date_formats: default_date_formats(),
            labels: SummaryLabels::default(),
        },
        DialectSpec {
            id: "debits-credits-table".to_string(),
            description: "Table rows: Date, Description, Debits, Credits, Balance".to_string(),
            source: SourceLayout::Table {
                date: 0,
                description: 1,
                amounts: vec![2, 3],
                balance: Some(4),
                min_cells: 5,
            },
            columns: ColumnMapping::DebitCredit,
            date_formats: default_date_formats(),
            labels: SummaryLabels::default(),
        },
        DialectSpec {
            id: "monthly-export".to_string(),
            description: "Table rows: date in cell 1, description in cell 4, signed amount in cell 7"
                .to_string(),
            source: SourceLayout::Table {
                date: 1,
                description: 4,
                amounts: vec![7],
                balance: None,
                min_cells: 8,
            },
            columns: ColumnMapping::Single {
                sign: SignPolicy::NegativeIsDebit,
            },
            date_formats: vec!["%d/%m/%Y".to_string(), "%Y-%m-%d".to_string()],
            labels: SummaryLabels::default(),
        },
        DialectSpec {
            id: "export-single-amount".to_string(),
            description: "Table rows: date in cell 1, description in cell 2, signed amount in cell 4"
                .to_string(),
            source: SourceLayout::Table {
                date: 1,
                description: 2,
                amounts: vec![4],
                balance: None,
                min_cells: 5,
            },
            columns: ColumnMapping::Single {
                sign: SignPolicy::NegativeIsDebit,
            },
            date_formats: default_date_formats(),
            labels: SummaryLabels::default(),
        },
    ]
}
