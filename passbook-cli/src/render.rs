//! Human-readable and CSV renderings of an assembled statement.

use chrono::NaiveDate;
use csv::WriterBuilder;
use passbook_core::{Ledger, Money};
use passbook_ledger::{Assembly, BalanceSource, DerivedBalance};
use serde::Serialize;
use std::fmt::{self, Write};
use std::io;

fn amount(currency: &str, value: Money) -> String {
    if value.is_negative() {
        format!("-{currency}{}", value.abs().to_grouped_string())
    } else {
        format!("{currency}{}", value.to_grouped_string())
    }
}

fn stated(currency: &str, value: Option<Money>) -> String {
    value.map_or_else(|| "not found".to_string(), |v| amount(currency, v))
}

fn derived(currency: &str, balance: Option<DerivedBalance>) -> String {
    match balance {
        None => "not found".to_string(),
        Some(b) => {
            let note = match b.source {
                BalanceSource::Stated => "",
                BalanceSource::FirstTransaction => " (from first transaction)",
                BalanceSource::LastTransaction => " (from last transaction)",
            };
            format!("{}{note}", amount(currency, b.value))
        }
    }
}

/// Text report for one assembly. `file_period` is shown when the statement
/// itself carries no period label.
pub fn render_text(
    assembly: &Assembly,
    currency: &str,
    file_period: Option<(NaiveDate, NaiveDate)>,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let summary = assembly.ledger.summary();
    let recon = &assembly.reconciliation;

    writeln!(out, "Dialect: {}", assembly.dialect)?;
    writeln!(out, "Account Summary:")?;
    let period = match (&summary.statement_period, file_period) {
        (Some(p), _) => p.text.clone(),
        (None, Some((start, end))) => format!(
            "{} - {} (from file name)",
            start.format("%d %b %Y"),
            end.format("%d %b %Y")
        ),
        (None, None) => "not found".to_string(),
    };
    writeln!(out, "  Statement Period: {period}")?;
    writeln!(out, "  Opening Balance: {}", derived(currency, recon.opening_balance))?;
    writeln!(out, "  Closing Balance: {}", derived(currency, recon.closing_balance))?;
    writeln!(out, "  Total Debits: {}", stated(currency, summary.stated_total_debits))?;
    writeln!(out, "  Total Credits: {}", stated(currency, summary.stated_total_credits))?;

    writeln!(out, "Transactions:")?;
    for t in assembly.ledger.transactions() {
        write!(
            out,
            "  {}  {}  fees {}  debit {}  credit {}",
            t.date.format("%d/%m/%Y"),
            t.description,
            amount(currency, t.fees),
            amount(currency, t.debit),
            amount(currency, t.credit),
        )?;
        match t.balance_after {
            Some(b) => writeln!(out, "  balance {}", amount(currency, b))?,
            None => writeln!(out)?,
        }
    }

    writeln!(out, "Computed:")?;
    writeln!(out, "  Rows: {}", recon.totals.rows)?;
    writeln!(out, "  Fees: {}", amount(currency, recon.totals.fees))?;
    writeln!(out, "  Debits: {}", amount(currency, recon.totals.debits))?;
    writeln!(out, "  Credits: {}", amount(currency, recon.totals.credits))?;
    writeln!(out, "  Net Change: {}", amount(currency, recon.net_change))?;
    if let Some(movement) = recon.stated_movement {
        writeln!(out, "  Stated Movement: {}", amount(currency, movement))?;
    }

    if !assembly.warnings.is_empty() {
        writeln!(out, "Warnings:")?;
        for w in &assembly.warnings {
            writeln!(out, "  - {w}")?;
        }
    }
    Ok(out)
}

#[derive(Serialize)]
struct CsvOutRow<'a> {
    date: String,
    description: &'a str,
    fees: String,
    debit: String,
    credit: String,
    balance_after: Option<String>,
}

/// Write the ledger's transactions as CSV. The header row comes from the
/// first record, so an empty ledger writes nothing.
pub fn export_csv<W: io::Write>(mut writer: W, ledger: &Ledger) -> Result<(), csv::Error> {
    let mut wrt = WriterBuilder::new().from_writer(&mut writer);
    for t in ledger.transactions() {
        wrt.serialize(CsvOutRow {
            date: t.date.format("%Y-%m-%d").to_string(),
            description: &t.description,
            fees: t.fees.to_string(),
            debit: t.debit.to_string(),
            credit: t.credit.to_string(),
            balance_after: t.balance_after.map(|b| b.to_string()),
        })?;
    }
    wrt.flush()?;
    Ok(())
}
