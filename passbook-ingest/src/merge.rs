//! Joining rows recovered from several pages or tables.
//!
//! Table extraction often repeats the row at a page break: it shows up as the
//! last row of one segment and again as the first row of the next. That exact
//! repeat is dropped. Nothing else is deduplicated.

use passbook_core::Transaction;
use tracing::debug;

/// Merged rows plus how many boundary repeats were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merged {
    pub transactions: Vec<Transaction>,
    pub dropped: usize,
}

/// Concatenate segments in the order given, dropping a segment's first row
/// when it equals the row merged just before it. Empty segments are skipped,
/// so the comparison crosses them.
pub fn merge_segments<I>(segments: I) -> Merged
where
    I: IntoIterator<Item = Vec<Transaction>>,
{
    let mut merged = Merged::default();

    for (index, segment) in segments.into_iter().enumerate() {
        let mut rows = segment.into_iter();
        if let Some(first) = rows.next() {
            if merged.transactions.last() == Some(&first) {
                debug!(segment = index, description = %first.description, "dropping repeated boundary row");
                merged.dropped += 1;
            } else {
                merged.transactions.push(first);
            }
        }
        merged.transactions.extend(rows);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use passbook_core::Money;

    fn txn(day: u32, desc: &str, debit: i64) -> Transaction {
        Transaction::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), desc)
            .with_debit(Money::from_minor(debit))
    }

    #[test]
    fn test_boundary_duplicate_dropped() {
        let a = vec![txn(1, "Rent", 100), txn(2, "Coffee", 3)];
        let b = vec![txn(2, "Coffee", 3), txn(3, "Fuel", 50)];
        let merged = merge_segments([a.clone(), b.clone()]);
        assert_eq!(merged.transactions.len(), a.len() + b.len() - 1);
        assert_eq!(merged.dropped, 1);
        let descs: Vec<&str> = merged.transactions.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["Rent", "Coffee", "Fuel"]);
    }

    #[test]
    fn test_no_boundary_duplicate_keeps_all() {
        let a = vec![txn(1, "Rent", 100), txn(2, "Coffee", 3)];
        let b = vec![txn(3, "Fuel", 50), txn(4, "Coffee", 3)];
        let merged = merge_segments([a.clone(), b.clone()]);
        assert_eq!(merged.transactions.len(), a.len() + b.len());
        assert_eq!(merged.dropped, 0);
    }

    #[test]
    fn test_similar_rows_are_kept() {
        let a = vec![txn(2, "Coffee", 3)];
        let b = vec![txn(2, "Coffee", 4)];
        let c = vec![txn(2, "Coffee ", 4)];
        assert_eq!(merge_segments([a, b, c]).transactions.len(), 3);
    }

    #[test]
    fn test_repeats_inside_a_segment_are_kept() {
        let a = vec![txn(2, "Coffee", 3), txn(2, "Coffee", 3)];
        assert_eq!(merge_segments([a]).transactions.len(), 2);
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let a = vec![txn(1, "Rent", 100)];
        let b = vec![txn(1, "Rent", 100), txn(2, "Coffee", 3)];
        let merged = merge_segments([a, Vec::new(), b]);
        assert_eq!(merged.transactions.len(), 2);
        assert_eq!(merged.dropped, 1);
    }

    #[test]
    fn test_balance_difference_is_not_a_duplicate() {
        let a = vec![txn(1, "Rent", 100).with_balance_after(Money::from_minor(900))];
        let b = vec![txn(1, "Rent", 100).with_balance_after(Money::from_minor(800))];
        assert_eq!(merge_segments([a, b]).transactions.len(), 2);
    }
}
