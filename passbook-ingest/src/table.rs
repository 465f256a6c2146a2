//! Table segments from CSV produced by a table extractor.
//!
//! Extractors write one CSV per table with no reliable header and ragged
//! rows, so every record is read as-is and blank records are dropped.

use std::io::Read;

use crate::types::Segment;

/// Read one extracted table into a [`Segment`].
pub fn segment_from_csv<R: Read>(reader: R) -> Result<Segment, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    Ok(Segment::new(rows))
}
