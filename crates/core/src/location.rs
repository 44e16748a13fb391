//! Mapping of remote error offsets onto displayable lines.

use serde::{Deserialize, Serialize};

use crate::document::TextDocument;
use crate::types::{Diagnostic, ParserError};

/// Full character span of the line a diagnostic is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// 1-based line number.
    pub line: usize,
    pub from: usize,
    pub to: usize,
}

/// Resolve a raw (1-based) character offset to the line it should be shown on.
///
/// The position `raw_offset - 1` is clamped into the document. When it lands
/// on an empty line, the nearest preceding non-empty line is used instead;
/// if every line above is empty the first line is returned.
pub fn map_offset_to_line(doc: &TextDocument, raw_offset: i64) -> LineRange {
    let len = i64::try_from(doc.len()).unwrap_or(i64::MAX);
    let pos = raw_offset.saturating_sub(1).clamp(0, len);
    let pos = usize::try_from(pos).unwrap_or(doc.len());

    let mut line = doc.line_at(pos);
    while line.is_empty() && line.number > 1 {
        match doc.line(line.number - 1) {
            Some(previous) => line = previous,
            None => break,
        }
    }

    LineRange {
        line: line.number,
        from: line.from,
        to: line.to,
    }
}

/// Build the single error diagnostic shown for a remote parser error.
pub fn parser_error_diagnostic(doc: &TextDocument, error: &ParserError) -> Diagnostic {
    let range = map_offset_to_line(doc, error.index);
    Diagnostic::remote_error(range.from..range.to, error.message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_walks_back_to_previous_content() {
        let doc = TextDocument::new("a\n\n\nb");
        // offset 4 points at position 3, the blank third line
        let range = map_offset_to_line(&doc, 4);
        assert_eq!(range, LineRange { line: 1, from: 0, to: 1 });
    }

    #[test]
    fn test_offset_on_content_line_is_kept() {
        let doc = TextDocument::new("first\nsecond\nthird");
        let range = map_offset_to_line(&doc, 9);
        assert_eq!(range, LineRange { line: 2, from: 6, to: 12 });
    }

    #[test]
    fn test_offsets_are_clamped() {
        let doc = TextDocument::new("x\nyz");
        assert_eq!(map_offset_to_line(&doc, 0).line, 1);
        assert_eq!(map_offset_to_line(&doc, -7).line, 1);
        assert_eq!(map_offset_to_line(&doc, 1_000).line, 2);
    }

    #[test]
    fn test_trailing_blank_lines_anchor_to_last_content() {
        let doc = TextDocument::new("entry = a >\n\n");
        let range = map_offset_to_line(&doc, 14);
        assert_eq!(range.line, 1);
        assert_eq!(range.to, 11);
    }

    #[test]
    fn test_all_blank_lines_stop_at_first_line() {
        let doc = TextDocument::new("\n\n");
        assert_eq!(map_offset_to_line(&doc, 3), LineRange { line: 1, from: 0, to: 0 });
    }

    #[test]
    fn test_parser_error_becomes_line_diagnostic() {
        let doc = TextDocument::new("x");
        let error = ParserError {
            message: "unexpected token".into(),
            line: 1,
            column: 1,
            index: 1,
        };
        let diagnostic = parser_error_diagnostic(&doc, &error);
        assert_eq!(diagnostic.span(), 0..1);
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.message, "unexpected token");
    }
}
