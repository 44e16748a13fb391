//! Line-indexed text buffer.
//!
//! Positions are character offsets (Unicode scalar values) from the start of
//! the document. Lines are numbered from 1 and separated by `\n`; a line's
//! span never includes its terminating newline.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{Error, Result};

/// A single line of a [`TextDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Offset of the first character of the line.
    pub from: usize,
    /// Offset just past the last character of the line (before the newline).
    pub to: usize,
}

impl Line {
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    pub fn span(&self) -> Range<usize> {
        self.from..self.to
    }
}

/// A replacement of `from..to` with `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

impl TextChange {
    pub fn new(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: insert.into(),
        }
    }

    /// Insert text at a single position.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    /// Delete `from..to`.
    pub fn delete(from: usize, to: usize) -> Self {
        Self::new(from, to, String::new())
    }

    /// Replace the whole of `doc` with `text`.
    pub fn replace_all(doc: &TextDocument, text: impl Into<String>) -> Self {
        Self::new(0, doc.len(), text)
    }
}

/// Mutable text buffer with a line index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    text: String,
    /// Character offset of the first character of every line.
    line_starts: Vec<usize>,
    len: usize,
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let (line_starts, len) = index_lines(&text);
        Self {
            text,
            line_starts,
            len,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line by 1-based number.
    pub fn line(&self, number: usize) -> Option<Line> {
        let from = *self.line_starts.get(number.checked_sub(1)?)?;
        let to = match self.line_starts.get(number) {
            Some(next) => next - 1,
            None => self.len,
        };
        Some(Line { number, from, to })
    }

    /// Line containing `pos`; positions past the end resolve to the last line.
    pub fn line_at(&self, pos: usize) -> Line {
        let pos = pos.min(self.len);
        let number = self.line_starts.partition_point(|start| *start <= pos).max(1);
        self.line(number).unwrap_or(Line {
            number: 1,
            from: 0,
            to: self.len,
        })
    }

    /// Text of a line by 1-based number.
    pub fn line_text(&self, number: usize) -> Option<&str> {
        let line = self.line(number)?;
        let start = self.byte_offset(line.from);
        let end = self.byte_offset(line.to);
        self.text.get(start..end)
    }

    /// Apply a change in place.
    pub fn apply(&mut self, change: &TextChange) -> Result<()> {
        self.replace(change.from, change.to, &change.insert)
    }

    /// Replace `from..to` with `insert`.
    pub fn replace(&mut self, from: usize, to: usize, insert: &str) -> Result<()> {
        if from > to || to > self.len {
            return Err(Error::InvalidRange {
                from,
                to,
                len: self.len,
            });
        }
        let start = self.byte_offset(from);
        let end = self.byte_offset(to);
        self.text.replace_range(start..end, insert);
        let (line_starts, len) = index_lines(&self.text);
        self.line_starts = line_starts;
        self.len = len;
        Ok(())
    }

    fn byte_offset(&self, pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(pos)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len())
    }
}

impl From<&str> for TextDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

fn index_lines(text: &str) -> (Vec<usize>, usize) {
    let mut starts = vec![0];
    let mut len = 0;
    for ch in text.chars() {
        len += 1;
        if ch == '\n' {
            starts.push(len);
        }
    }
    (starts, len)
}
