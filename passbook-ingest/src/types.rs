use serde::{Deserialize, Serialize};

/// Page break marker emitted by text extractors between pages.
pub const PAGE_BREAK: char = '\u{c}';

/// One page or table of extracted rows, already split into cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    rows: Vec<Vec<String>>,
}

impl Segment {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows joined back into text, one row per line, cells separated by a
    /// space. Lets summary labels be found in table-only input.
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Split whole-document text into pages on form feeds. Text without page
/// breaks is a single page.
pub fn text_pages(text: &str) -> Vec<&str> {
    text.split(PAGE_BREAK).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_pages() {
        assert_eq!(text_pages("a\nb"), vec!["a\nb"]);
        assert_eq!(text_pages("p1\u{c}p2\u{c}"), vec!["p1", "p2", ""]);
    }

    #[test]
    fn test_segment_to_text() {
        let s = Segment::new(vec![
            vec!["Opening balance".into(), " 1,000.00 ".into(), "".into()],
            vec!["Closing balance".into(), "1,200.00".into()],
        ]);
        assert_eq!(s.to_text(), "Opening balance 1,000.00\nClosing balance 1,200.00");
        assert_eq!(s.len(), 2);
    }
}
