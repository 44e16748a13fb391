//! Line styling for the boilerplate header.

use std::ops::Range;

use crate::document::TextDocument;

/// A line-level decoration anchored at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDecoration {
    pub line: usize,
    pub at: usize,
}

/// Decorations for every target line intersecting one of the visible ranges.
///
/// Output is ordered by position and free of duplicates even when visible
/// ranges overlap.
pub fn decorate_lines(
    doc: &TextDocument,
    visible: &[Range<usize>],
    targets: &[usize],
) -> Vec<LineDecoration> {
    let mut decorations: Vec<LineDecoration> = Vec::new();
    for range in visible {
        let first = doc.line_at(range.start).number;
        let last = doc.line_at(range.end).number;
        for number in first..=last {
            if !targets.contains(&number) {
                continue;
            }
            if let Some(line) = doc.line(number) {
                decorations.push(LineDecoration {
                    line: number,
                    at: line.from,
                });
            }
        }
    }
    decorations.sort_by_key(|d| d.at);
    decorations.dedup();
    decorations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lines_are_decorated_when_visible() {
        let doc = TextDocument::new("h1\nh2\nbody\nmore");
        let decorations = decorate_lines(&doc, &[0..doc.len()], &[1, 2]);
        assert_eq!(
            decorations,
            vec![
                LineDecoration { line: 1, at: 0 },
                LineDecoration { line: 2, at: 3 },
            ]
        );
    }

    #[test]
    fn test_scrolled_out_lines_are_skipped() {
        let doc = TextDocument::new("h1\nh2\nbody\nmore");
        let body = doc.line(3).unwrap();
        assert!(decorate_lines(&doc, &[body.from..doc.len()], &[1, 2]).is_empty());
    }

    #[test]
    fn test_overlapping_ranges_do_not_duplicate() {
        let doc = TextDocument::new("h1\nh2\nbody");
        let decorations = decorate_lines(&doc, &[0..4, 2..8], &[2]);
        assert_eq!(decorations, vec![LineDecoration { line: 2, at: 3 }]);
    }
}
