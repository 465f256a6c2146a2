//! Ledger assembly for one statement document.
//!
//! Malformed statement content never fails assembly; it shows up as warnings
//! on a still-returned ledger. Only an invalid invocation is an error.

use passbook_core::{Ledger, Warning};
use passbook_ingest::{Dialect, DialectRegistry, Segment, merge_segments};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::reconcile::{Reconciliation, reconcile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),
    #[error("no registered dialect matched any row")]
    NoCandidateDialect,
}

/// Which grammar to run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectSelection {
    /// Try every registered dialect; the most matching rows wins, earlier
    /// registration breaks ties.
    #[default]
    Auto,
    Named(String),
}

impl FromStr for DialectSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            DialectSelection::Auto
        } else {
            DialectSelection::Named(s.to_string())
        })
    }
}

impl fmt::Display for DialectSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectSelection::Auto => f.write_str("auto"),
            DialectSelection::Named(id) => f.write_str(id),
        }
    }
}

/// Everything produced for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assembly {
    pub dialect: String,
    pub ledger: Ledger,
    /// Summary warnings, then row warnings in source order, then
    /// reconciliation warnings.
    pub warnings: Vec<Warning>,
    pub reconciliation: Reconciliation,
}

/// Runs dialects from a registry. Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'r> {
    registry: &'r DialectRegistry,
}

impl<'r> Assembler<'r> {
    pub fn new(registry: &'r DialectRegistry) -> Self {
        Self { registry }
    }

    /// Pick the dialect to run for this input.
    pub fn select(
        &self,
        raw_text: &str,
        segments: &[Segment],
        selection: &DialectSelection,
    ) -> Result<&'r Dialect, AssembleError> {
        match selection {
            DialectSelection::Named(id) => self
                .registry
                .get(id)
                .ok_or_else(|| AssembleError::UnknownDialect(id.clone())),
            DialectSelection::Auto => {
                let mut best: Option<(&Dialect, usize)> = None;
                for dialect in self.registry.iter() {
                    let matches = dialect.grammar().count_matches(raw_text, segments);
                    debug!(dialect = dialect.id(), matches, "auto-detect candidate");
                    if matches > best.map_or(0, |(_, n)| n) {
                        best = Some((dialect, matches));
                    }
                }
                best.map(|(d, _)| d).ok_or(AssembleError::NoCandidateDialect)
            }
        }
    }

    /// Build the ledger for one document.
    ///
    /// `raw_text` is whole-document text with pages separated by form feeds;
    /// `segments` are extracted tables. Text dialects read the former, table
    /// dialects the latter. Summary labels are searched in both.
    pub fn assemble(
        &self,
        raw_text: &str,
        segments: &[Segment],
        selection: &DialectSelection,
    ) -> Result<Assembly, AssembleError> {
        let dialect = self.select(raw_text, segments, selection)?;

        let document = document_text(raw_text, segments);
        let (summary, mut warnings) = dialect.summary().extract(&document);

        let parsed = dialect.grammar().parse(raw_text, segments);
        let matched: usize = parsed.iter().map(|s| s.matched).sum();
        let mut per_segment = Vec::with_capacity(parsed.len());
        for rows in parsed {
            warnings.extend(rows.warnings);
            per_segment.push(rows.transactions);
        }
        let merged = merge_segments(per_segment);

        let ledger = Ledger::new(summary, merged.transactions);
        let (reconciliation, reconcile_warnings) = reconcile(&ledger);
        warnings.extend(reconcile_warnings);

        debug!(
            dialect = dialect.id(),
            matched,
            kept = ledger.transactions().len(),
            boundary_repeats = merged.dropped,
            warnings = warnings.len(),
            "assembled ledger"
        );

        Ok(Assembly {
            dialect: dialect.id().to_string(),
            ledger,
            warnings,
            reconciliation,
        })
    }
}

/// Convenience wrapper around [`Assembler::assemble`].
pub fn assemble(
    registry: &DialectRegistry,
    raw_text: &str,
    segments: &[Segment],
    selection: &DialectSelection,
) -> Result<Assembly, AssembleError> {
    Assembler::new(registry).assemble(raw_text, segments, selection)
}

fn document_text<'a>(raw_text: &'a str, segments: &[Segment]) -> Cow<'a, str> {
    if segments.is_empty() {
        return Cow::Borrowed(raw_text);
    }
    let mut parts: Vec<String> = Vec::with_capacity(segments.len() + 1);
    if !raw_text.trim().is_empty() {
        parts.push(raw_text.to_string());
    }
    parts.extend(segments.iter().map(Segment::to_text));
    Cow::Owned(parts.join("\n"))
}
