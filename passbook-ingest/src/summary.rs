//! Summary field extraction.
//!
//! Each field has an ordered list of label alternatives. The first alternative
//! that occurs anywhere in the text decides the field, even if its value then
//! fails to lex.

use passbook_core::{AccountSummary, StatementPeriod, SummaryField, Warning, lex_amount};
use regex::Regex;

use crate::dialect::{DialectError, SummaryLabels};
use crate::period::parse_period_dates;

#[derive(Debug, Clone)]
struct FieldPatterns {
    field: SummaryField,
    alternatives: Vec<Regex>,
}

/// Compiled label patterns for one dialect.
#[derive(Debug, Clone)]
pub struct SummaryExtractor {
    fields: Vec<FieldPatterns>,
}

/// Turn a plain label into a case-insensitive pattern tolerant of extra
/// whitespace and an optional colon.
fn label_pattern(label: &str, field: SummaryField) -> String {
    let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
    let label = words.join(r"\s+");
    match field {
        SummaryField::StatementPeriod => format!(r"(?i){label}:?[ \t]*(?P<value>.*)"),
        _ => format!(r"(?i){label}:?\s*(?:[R$€£]\s*)?(?P<value>[-()\d,.]*)"),
    }
}

impl SummaryExtractor {
    pub fn compile(dialect_id: &str, labels: &SummaryLabels) -> Result<Self, DialectError> {
        let table: [(SummaryField, &Vec<String>); 5] = [
            (SummaryField::StatementPeriod, &labels.statement_period),
            (SummaryField::OpeningBalance, &labels.opening_balance),
            (SummaryField::ClosingBalance, &labels.closing_balance),
            (SummaryField::TotalDebits, &labels.total_debits),
            (SummaryField::TotalCredits, &labels.total_credits),
        ];

        let mut fields = Vec::with_capacity(table.len());
        for (field, alternatives) in table {
            let alternatives = alternatives
                .iter()
                .filter(|label| !label.trim().is_empty())
                .map(|label| {
                    Regex::new(&label_pattern(label, field)).map_err(|source| DialectError::Pattern {
                        id: dialect_id.to_string(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            fields.push(FieldPatterns {
                field,
                alternatives,
            });
        }
        Ok(Self { fields })
    }

    /// Scan the full document text. Fields without a matching label are left
    /// absent; a matched label with an unreadable value yields a warning.
    pub fn extract(&self, text: &str) -> (AccountSummary, Vec<Warning>) {
        let mut summary = AccountSummary::default();
        let mut warnings = Vec::new();

        for patterns in &self.fields {
            let Some(value) = patterns
                .alternatives
                .iter()
                .find_map(|re| re.captures(text))
                .and_then(|caps| caps.name("value").map(|m| m.as_str()))
            else {
                continue;
            };

            if patterns.field == SummaryField::StatementPeriod {
                let text = value.trim();
                if !text.is_empty() {
                    summary.statement_period = Some(StatementPeriod {
                        text: text.to_string(),
                        dates: parse_period_dates(text),
                    });
                }
                continue;
            }

            match lex_amount(value) {
                Ok(amount) => summary.set_amount(patterns.field, amount),
                Err(e) => warnings.push(Warning::UnparsableAmount {
                    raw: e.raw().to_string(),
                    context: patterns.field.as_str().to_string(),
                }),
            }
        }

        (summary, warnings)
    }
}
