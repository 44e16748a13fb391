//! Non-editable boilerplate header.
//!
//! The policy is stateless: ranges are recomputed from the live document on
//! every edit, so the header always follows the current line layout.

use std::ops::Range;

use crate::document::{TextChange, TextDocument};

/// Where an edit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    /// Typed or pasted by the user; subject to the protected region.
    User,
    /// Programmatic replacement by the host application.
    Host,
}

/// Marks the first `lines` lines of a document as read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedRegionPolicy {
    lines: usize,
}

impl Default for ProtectedRegionPolicy {
    fn default() -> Self {
        Self { lines: 2 }
    }
}

impl ProtectedRegionPolicy {
    pub fn new(lines: usize) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Character ranges the user may not modify.
    ///
    /// Covers the document start through the end of the last protected line.
    /// Documents shorter than the header are protected in full.
    pub fn protected_ranges(&self, doc: &TextDocument) -> Vec<Range<usize>> {
        if self.lines == 0 {
            return Vec::new();
        }
        let last = self.lines.min(doc.line_count());
        match doc.line(last) {
            Some(line) => vec![0..line.to],
            None => Vec::new(),
        }
    }

    /// Whether `change` may be applied to `doc`.
    ///
    /// A user change is refused when it alters the text of any protected
    /// line. Inserting a line break at the end of the header only adds
    /// lines after it and is allowed. Host changes are always allowed.
    pub fn permits(&self, doc: &TextDocument, change: &TextChange, origin: EditOrigin) -> bool {
        if origin == EditOrigin::Host {
            return true;
        }
        let protected = self.lines.min(doc.line_count());
        let Some(last) = doc.line(protected) else {
            return true;
        };
        if change.from > last.to {
            return true;
        }
        let mut after = doc.clone();
        if after.apply(change).is_err() {
            return false;
        }
        (1..=protected).all(|n| doc.line_text(n) == after.line_text(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "import { main } from \"helper-methods\";\nimport { Instrument } from \"universe\";\n\nexport const name = \"s1\";";

    #[test]
    fn test_range_spans_first_two_lines() {
        let doc = TextDocument::new(DOC);
        let line2 = doc.line(2).unwrap();
        assert_eq!(
            ProtectedRegionPolicy::default().protected_ranges(&doc),
            vec![0..line2.to]
        );
    }

    #[test]
    fn test_range_follows_line_layout() {
        let mut doc = TextDocument::new("a\nb\nc");
        let policy = ProtectedRegionPolicy::default();
        assert_eq!(policy.protected_ranges(&doc), vec![0..3]);

        doc.replace(0, 1, "longer").unwrap();
        assert_eq!(policy.protected_ranges(&doc), vec![0..8]);
    }

    #[test]
    fn test_short_document_is_fully_protected() {
        let doc = TextDocument::new("only");
        assert_eq!(
            ProtectedRegionPolicy::default().protected_ranges(&doc),
            vec![0..4]
        );
        assert!(ProtectedRegionPolicy::new(0).protected_ranges(&doc).is_empty());
    }

    #[test]
    fn test_edit_inside_header_is_rejected() {
        let doc = TextDocument::new(DOC);
        let policy = ProtectedRegionPolicy::default();
        assert!(!policy.permits(&doc, &TextChange::delete(2, 6), EditOrigin::User));
        assert!(!policy.permits(&doc, &TextChange::insert(0, "x"), EditOrigin::User));

        // appending to line 2 or pulling the line break out of it touches the header
        let end = doc.line(2).unwrap().to;
        assert!(!policy.permits(&doc, &TextChange::insert(end, "x"), EditOrigin::User));
        assert!(!policy.permits(&doc, &TextChange::delete(end - 1, end + 1), EditOrigin::User));
    }

    #[test]
    fn test_line_break_at_header_end_is_accepted() {
        let doc = TextDocument::new("const a = 1;\nconst b = 2;");
        let policy = ProtectedRegionPolicy::default();
        let end = doc.line(2).unwrap().to;
        assert!(policy.permits(&doc, &TextChange::insert(end, "\n"), EditOrigin::User));
        assert!(policy.permits(&doc, &TextChange::insert(end, "\nconst c = 3;"), EditOrigin::User));
        assert!(!policy.permits(&doc, &TextChange::insert(end, "x\n"), EditOrigin::User));

        // a one-line document can still grow a body
        let short = TextDocument::new("only");
        assert!(policy.permits(&short, &TextChange::insert(4, "\nbody"), EditOrigin::User));
        assert!(!policy.permits(&short, &TextChange::insert(4, "ly"), EditOrigin::User));
    }

    #[test]
    fn test_joining_header_with_body_is_rejected() {
        let doc = TextDocument::new("a\nb\nc");
        let policy = ProtectedRegionPolicy::default();
        assert!(!policy.permits(&doc, &TextChange::delete(3, 4), EditOrigin::User));
        assert!(policy.permits(&doc, &TextChange::delete(4, 5), EditOrigin::User));
    }

    #[test]
    fn test_edit_from_line_three_is_accepted() {
        let doc = TextDocument::new(DOC);
        let policy = ProtectedRegionPolicy::default();
        let line3 = doc.line(3).unwrap();
        assert!(policy.permits(&doc, &TextChange::insert(line3.from, "// x"), EditOrigin::User));
        let line4 = doc.line(4).unwrap();
        assert!(policy.permits(&doc, &TextChange::delete(line4.from, line4.to), EditOrigin::User));
    }

    #[test]
    fn test_host_replacement_bypasses_policy() {
        let doc = TextDocument::new(DOC);
        let change = TextChange::replace_all(&doc, "fresh");
        let policy = ProtectedRegionPolicy::default();
        assert!(!policy.permits(&doc, &change, EditOrigin::User));
        assert!(policy.permits(&doc, &change, EditOrigin::Host));
    }
}
