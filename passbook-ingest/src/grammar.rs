//! Transaction row grammar shared by every dialect.
//!
//! Each line (text dialects) or row (table dialects) is matched on its own; no
//! state is carried from one row to the next. A row that matches but cannot be
//! read becomes a warning and is dropped.

use chrono::NaiveDate;
use passbook_core::{Money, Transaction, Warning, lex_amount, lex_optional_amount};
use regex::{Captures, Regex};
use tracing::trace;

use crate::dialect::{ColumnMapping, DialectError, DialectSpec, SignPolicy, SourceLayout};
use crate::types::{Segment, text_pages};

const AMOUNT_GROUPS: [&str; 3] = ["a1", "a2", "a3"];

/// Which input a grammar reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Table,
}

/// Outcome of applying the grammar to one line or row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Parsed(Transaction),
    Rejected(Warning),
}

/// Rows recovered from one segment, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentRows {
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<Warning>,
    /// Lines or rows that matched the pattern, readable or not.
    pub matched: usize,
}

impl SegmentRows {
    fn push(&mut self, outcome: RowOutcome) {
        self.matched += 1;
        match outcome {
            RowOutcome::Parsed(txn) => self.transactions.push(txn),
            RowOutcome::Rejected(warning) => {
                trace!(%warning, "dropping row");
                self.warnings.push(warning);
            }
        }
    }
}

#[derive(Debug, Clone)]
struct TableColumns {
    date: usize,
    description: usize,
    amounts: Vec<usize>,
    balance: Option<usize>,
    min_cells: usize,
}

#[derive(Debug, Clone)]
enum Layout {
    /// Line regex and the number of contiguous amount groups it defines.
    Text(Regex, usize),
    Table(TableColumns),
}

/// A compiled row grammar for one dialect.
#[derive(Debug, Clone)]
pub struct TransactionRowGrammar {
    layout: Layout,
    columns: ColumnMapping,
    date_formats: Vec<String>,
}

impl TransactionRowGrammar {
    pub fn compile(spec: &DialectSpec) -> Result<Self, DialectError> {
        if spec.date_formats.is_empty() {
            return Err(DialectError::NoDateFormat {
                id: spec.id.clone(),
            });
        }

        let (layout, amount_columns) = match &spec.source {
            SourceLayout::Text { line_pattern } => {
                let re = Regex::new(line_pattern).map_err(|source| DialectError::Pattern {
                    id: spec.id.clone(),
                    source,
                })?;
                let names: Vec<&str> = re.capture_names().flatten().collect();
                for group in ["date", "desc", "a1"] {
                    if !names.contains(&group) {
                        return Err(DialectError::MissingGroup {
                            id: spec.id.clone(),
                            group,
                        });
                    }
                }
                // Amount groups must be contiguous from a1.
                let count = AMOUNT_GROUPS.iter().take_while(|g| names.contains(g)).count();
                (Layout::Text(re, count), count)
            }
            SourceLayout::Table {
                date,
                description,
                amounts,
                balance,
                min_cells,
            } => {
                let widest = [*date, *description]
                    .into_iter()
                    .chain(amounts.iter().copied())
                    .chain(*balance)
                    .max()
                    .unwrap_or(0);
                let columns = TableColumns {
                    date: *date,
                    description: *description,
                    amounts: amounts.clone(),
                    balance: *balance,
                    min_cells: (*min_cells).max(widest + 1),
                };
                (Layout::Table(columns), amounts.len())
            }
        };

        if !spec.columns.accepts(amount_columns) {
            return Err(DialectError::ColumnCount {
                id: spec.id.clone(),
                columns: amount_columns,
                mapping: spec.columns.name(),
            });
        }

        Ok(Self {
            layout,
            columns: spec.columns,
            date_formats: spec.date_formats.clone(),
        })
    }

    pub fn input_kind(&self) -> InputKind {
        match self.layout {
            Layout::Text(..) => InputKind::Text,
            Layout::Table(_) => InputKind::Table,
        }
    }

    /// Count matching lines or rows without reading their values. Used to
    /// rank dialects during automatic selection.
    pub fn count_matches(&self, raw_text: &str, segments: &[Segment]) -> usize {
        match &self.layout {
            Layout::Text(re, _) => raw_text.lines().filter(|line| re.is_match(line)).count(),
            Layout::Table(cols) => segments
                .iter()
                .flat_map(|s| s.rows())
                .filter(|row| table_row_matches(cols, row))
                .count(),
        }
    }

    /// Apply the grammar to every segment of the input. Text dialects read the
    /// pages of `raw_text`; table dialects read `segments`.
    pub fn parse(&self, raw_text: &str, segments: &[Segment]) -> Vec<SegmentRows> {
        match self.input_kind() {
            InputKind::Text => text_pages(raw_text)
                .into_iter()
                .map(|page| self.parse_text(page))
                .collect(),
            InputKind::Table => segments.iter().map(|s| self.parse_segment(s)).collect(),
        }
    }

    /// Apply a text grammar to each line of one page.
    pub fn parse_text(&self, page: &str) -> SegmentRows {
        let mut out = SegmentRows::default();
        for line in page.lines() {
            if let Some(outcome) = self.parse_line(line) {
                out.push(outcome);
            }
        }
        out
    }

    /// Apply a table grammar to each row of one segment.
    pub fn parse_segment(&self, segment: &Segment) -> SegmentRows {
        let mut out = SegmentRows::default();
        for row in segment.rows() {
            if let Some(outcome) = self.parse_cells(row) {
                out.push(outcome);
            }
        }
        out
    }

    /// `None` when the line is not a transaction line for this grammar.
    pub fn parse_line(&self, line: &str) -> Option<RowOutcome> {
        let Layout::Text(re, amount_groups) = &self.layout else {
            return None;
        };
        let caps = re.captures(line)?;
        let context = line.trim();

        let date = group(&caps, "date");
        let desc = group(&caps, "desc");
        let amounts: Vec<&str> = AMOUNT_GROUPS[..*amount_groups]
            .iter()
            .map(|g| group(&caps, g))
            .collect();
        let balance = caps.name("balance").map(|m| m.as_str());

        Some(self.build(date, desc, &amounts, balance, context))
    }

    /// `None` when the row is not a transaction row for this grammar.
    pub fn parse_cells(&self, row: &[String]) -> Option<RowOutcome> {
        let Layout::Table(cols) = &self.layout else {
            return None;
        };
        if !table_row_matches(cols, row) {
            return None;
        }
        let context = row.join(" | ");

        let amounts: Vec<&str> = cols.amounts.iter().map(|&i| row[i].as_str()).collect();
        let balance = cols.balance.map(|i| row[i].as_str());

        Some(self.build(
            &row[cols.date],
            &row[cols.description],
            &amounts,
            balance,
            &context,
        ))
    }

    fn build(
        &self,
        date: &str,
        desc: &str,
        amounts: &[&str],
        balance: Option<&str>,
        context: &str,
    ) -> RowOutcome {
        let Some(date) = self.parse_date(date) else {
            return RowOutcome::Rejected(Warning::UnparsableDate {
                raw: date.trim().to_string(),
                context: context.to_string(),
            });
        };

        let mut values = Vec::with_capacity(amounts.len());
        for token in amounts {
            match lex_optional_amount(token) {
                Ok(v) => values.push((v, !token.trim().is_empty())),
                Err(e) => return rejected_amount(e.raw(), context),
            }
        }

        let balance_after = match balance.map(str::trim).filter(|b| !b.is_empty()) {
            Some(token) => match lex_amount(token) {
                Ok(v) => Some(v),
                Err(e) => return rejected_amount(e.raw(), context),
            },
            None => None,
        };

        let (fees, debit, credit) = map_columns(self.columns, &values);
        let mut txn = Transaction::new(date, desc.trim())
            .with_fees(fees)
            .with_debit(debit)
            .with_credit(credit);
        txn.balance_after = balance_after;
        RowOutcome::Parsed(txn)
    }

    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        self.date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    }
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map(|m| m.as_str()).unwrap_or("")
}

fn rejected_amount(raw: &str, context: &str) -> RowOutcome {
    RowOutcome::Rejected(Warning::UnparsableAmount {
        raw: raw.to_string(),
        context: context.to_string(),
    })
}

fn table_row_matches(cols: &TableColumns, row: &[String]) -> bool {
    row.len() >= cols.min_cells && looks_like_date(row[cols.date].trim())
}

/// Three runs of digits joined by `/`, `.` or `-`, e.g. `05/01/2024` or
/// `2024-01-05`. Header and footer rows fail this and are skipped silently.
fn looks_like_date(cell: &str) -> bool {
    let parts: Vec<&str> = cell.split(['/', '.', '-']).collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| (1..=4).contains(&p.len()) && p.chars().all(|c| c.is_ascii_digit()))
}

/// Map lexed amount columns (value, was-present) to (fees, debit, credit)
/// magnitudes.
fn map_columns(mapping: ColumnMapping, values: &[(Money, bool)]) -> (Money, Money, Money) {
    let at = |i: usize| values.get(i).map(|(v, _)| *v).unwrap_or(Money::ZERO);

    match mapping {
        ColumnMapping::Single { sign } => {
            let v = at(0);
            let debit_side = match sign {
                SignPolicy::AlwaysDebit => true,
                SignPolicy::NegativeIsDebit => v.is_negative(),
                SignPolicy::PositiveIsDebit => !v.is_negative(),
            };
            if debit_side {
                (Money::ZERO, v.abs(), Money::ZERO)
            } else {
                (Money::ZERO, Money::ZERO, v.abs())
            }
        }
        ColumnMapping::DebitCredit => (Money::ZERO, at(0).abs(), at(1).abs()),
        ColumnMapping::FeesDebitCredit => (at(0).abs(), at(1).abs(), at(2).abs()),
        ColumnMapping::ByCount => {
            let present: Vec<Money> = values.iter().filter(|(_, p)| *p).map(|(v, _)| *v).collect();
            match present.as_slice() {
                [debit] => (Money::ZERO, debit.abs(), Money::ZERO),
                [debit, credit] => (Money::ZERO, debit.abs(), credit.abs()),
                [fees, debit, credit, ..] => (fees.abs(), debit.abs(), credit.abs()),
                [] => (Money::ZERO, Money::ZERO, Money::ZERO),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::builtin_specs;

    fn grammar(id: &str) -> TransactionRowGrammar {
        let spec = builtin_specs().into_iter().find(|s| s.id == id).unwrap();
        TransactionRowGrammar::compile(&spec).unwrap()
    }

    fn parsed(outcome: Option<RowOutcome>) -> Transaction {
        match outcome {
            Some(RowOutcome::Parsed(t)) => t,
            other => panic!("expected parsed row, got {other:?}"),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fees_debits_credits_line() {
        let g = grammar("fees-debits-credits");
        let t = parsed(g.parse_line("03/02/2024  Monthly account fee   5.00   0.00   0.00"));
        assert_eq!(t.date, date(2024, 2, 3));
        assert_eq!(t.description, "Monthly account fee");
        assert_eq!(t.fees, Money::from_minor(500));
        assert_eq!(t.debit, Money::ZERO);
        assert_eq!(t.credit, Money::ZERO);

        assert!(g.parse_line("03/02/2024 Only two 5.00 6.00").is_none());
        assert!(g.parse_line("Date Description Fees Debits Credits").is_none());
    }

    #[test]
    fn test_variable_columns_by_count() {
        let g = grammar("variable-columns");

        let one = parsed(g.parse_line("01/03/2024 POS Purchase Spar 150.25"));
        assert_eq!(one.debit, Money::from_minor(15_025));
        assert_eq!(one.credit, Money::ZERO);

        let two = parsed(g.parse_line("02/03/2024 Salary ACME 0.00 25,000.00"));
        assert_eq!(two.debit, Money::ZERO);
        assert_eq!(two.credit, Money::from_minor(2_500_000));

        let three = parsed(g.parse_line("04/03/2024 Cash withdrawal 10.50 500.00 0.00"));
        assert_eq!(three.fees, Money::from_minor(1_050));
        assert_eq!(three.debit, Money::from_minor(50_000));
        assert_eq!(three.description, "Cash withdrawal");
    }

    #[test]
    fn test_both_columns_kept_verbatim() {
        let g = grammar("variable-columns");
        let t = parsed(g.parse_line("05/03/2024 Reversal 20.00 20.00"));
        assert_eq!(t.debit, Money::from_minor(2_000));
        assert_eq!(t.credit, Money::from_minor(2_000));
    }

    #[test]
    fn test_signed_amount_balance() {
        let g = grammar("signed-amount-balance");

        let debit = parsed(g.parse_line("10/01/2024 Electricity prepaid 350.00 4,650.00"));
        assert_eq!(debit.debit, Money::from_minor(35_000));
        assert_eq!(debit.credit, Money::ZERO);
        assert_eq!(debit.balance_after, Some(Money::from_minor(465_000)));

        let credit = parsed(g.parse_line("11/01/2024 Refund -50.00 4,700.00"));
        assert_eq!(credit.debit, Money::ZERO);
        assert_eq!(credit.credit, Money::from_minor(5_000));
    }

    #[test]
    fn test_bad_amount_drops_row() {
        let g = grammar("variable-columns");
        match g.parse_line("01/03/2024 Broken 1.2.3") {
            Some(RowOutcome::Rejected(Warning::UnparsableAmount { raw, context })) => {
                assert_eq!(raw, "1.2.3");
                assert_eq!(context, "01/03/2024 Broken 1.2.3");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_free_standing_hyphen_stays_in_description() {
        let g = grammar("variable-columns");
        let t = parsed(g.parse_line("01/03/2024 Card purchase Spar - 150.25"));
        assert_eq!(t.description, "Card purchase Spar -");
        assert_eq!(t.debit, Money::from_minor(15_025));

        let t = parsed(g.parse_line("02/03/2024 Transfer - savings 0.00 75.00"));
        assert_eq!(t.description, "Transfer - savings");
        assert_eq!(t.credit, Money::from_minor(7_500));

        let t = parsed(g.parse_line("03/03/2024 Reversal (12.00) 0.00"));
        assert_eq!(t.description, "Reversal");
        assert_eq!(t.debit, Money::from_minor(1_200));
    }

    #[test]
    fn test_bad_date_drops_row() {
        let g = grammar("variable-columns");
        match g.parse_line("31/02/2024 Impossible day 10.00") {
            Some(RowOutcome::Rejected(Warning::UnparsableDate { raw, .. })) => {
                assert_eq!(raw, "31/02/2024")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_text_counts_and_orders() {
        let g = grammar("variable-columns");
        let page = "\
Statement period: 01 Mar 2024 - 31 Mar 2024
Date Description Amount
01/03/2024 First 1.00
01/03/2024 Second 2.00
bad line
31/03/2024 Third 1.2.3
02/03/2024 Fourth 4.00
";
        let rows = g.parse_text(page);
        assert_eq!(rows.matched, 4);
        assert_eq!(rows.warnings.len(), 1);
        let descs: Vec<&str> = rows.transactions.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["First", "Second", "Fourth"]);
        assert_eq!(g.count_matches(page, &[]), 4);
    }

    fn cells(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_debits_credits_table() {
        let g = grammar("debits-credits-table");
        assert_eq!(g.input_kind(), InputKind::Table);

        let segment = Segment::new(vec![
            cells(&["Date", "Description", "Debits (R)", "Credits (R)", "Balance (R)"]),
            cells(&["05/01/2024", "Debit order insurance", "1,250.00", "", "8,750.00"]),
            cells(&["06/01/2024", "Transfer in", "", "500.00", "9,250.00"]),
            cells(&["07/01/2024", "Short row"]),
        ]);
        let rows = g.parse_segment(&segment);
        assert_eq!(rows.matched, 2);
        assert!(rows.warnings.is_empty());
        assert_eq!(rows.transactions[0].debit, Money::from_minor(125_000));
        assert_eq!(rows.transactions[0].credit, Money::ZERO);
        assert_eq!(rows.transactions[0].balance_after, Some(Money::from_minor(875_000)));
        assert_eq!(rows.transactions[1].credit, Money::from_minor(50_000));
        assert_eq!(g.count_matches("", &[segment]), 2);
    }

    #[test]
    fn test_single_amount_table_sign() {
        let g = grammar("export-single-amount");
        let row = cells(&["1", "15/01/2024", "Coffee", "card", "-42.50"]);
        let t = parsed(g.parse_cells(&row));
        assert_eq!(t.debit, Money::from_minor(4_250));
        assert_eq!(t.credit, Money::ZERO);

        let refund = cells(&["2", "16/01/2024", "Refund", "card", "42.50"]);
        let t = parsed(g.parse_cells(&refund));
        assert_eq!(t.credit, Money::from_minor(4_250));
    }

    #[test]
    fn test_monthly_export_iso_dates() {
        let g = grammar("monthly-export");
        let row = cells(&["x", "2024-01-20", "", "", "Groceries", "", "ZAR", "-310.99"]);
        let t = parsed(g.parse_cells(&row));
        assert_eq!(t.date, date(2024, 1, 20));
        assert_eq!(t.description, "Groceries");
        assert_eq!(t.debit, Money::from_minor(31_099));
    }

    #[test]
    fn test_wrong_layout_is_no_match() {
        let text = grammar("variable-columns");
        assert!(text.parse_cells(&cells(&["01/01/2024", "x", "1.00", "", ""])).is_none());
        let table = grammar("debits-credits-table");
        assert!(table.parse_line("01/01/2024 x 1.00").is_none());
    }
}
