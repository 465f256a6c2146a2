//! passbook-ingest: dialect registry, row grammars, summary labels and segment merging.

pub mod dialect;
pub mod grammar;
pub mod merge;
pub mod period;
pub mod summary;
pub mod table;
pub mod types;

pub use dialect::{
    ColumnMapping, Dialect, DialectError, DialectRegistry, DialectSpec, SignPolicy, SourceLayout,
    SummaryLabels, builtin_specs,
};
pub use grammar::{InputKind, RowOutcome, SegmentRows, TransactionRowGrammar};
pub use merge::{Merged, merge_segments};
pub use period::{parse_period_dates, period_from_file_name};
pub use summary::SummaryExtractor;
pub use table::segment_from_csv;
pub use types::{PAGE_BREAK, Segment, text_pages};
