//! Hover rendering.

use serde::Serialize;

use crate::engine::{DisplayPart, QuickInfo};

/// A rendered JSDoc section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverSection {
    pub tag: String,
    pub text: String,
}

/// What a hover tooltip shows: the signature, then `@description` and
/// `@example` when the declaration has them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverContent {
    pub start: usize,
    pub length: usize,
    pub signature: Vec<DisplayPart>,
    pub sections: Vec<HoverSection>,
}

impl HoverContent {
    pub fn signature_text(&self) -> String {
        self.signature.iter().map(|p| p.text.as_str()).collect()
    }

    pub fn section(&self, tag: &str) -> Option<&HoverSection> {
        self.sections.iter().find(|s| s.tag == tag)
    }

    /// Plain-text rendering for terminals.
    pub fn to_plain_text(&self) -> String {
        let mut out = self.signature_text();
        for section in &self.sections {
            out.push_str(&format!("\n\n@{}\n{}", section.tag, section.text));
        }
        out
    }
}

const RENDERED_TAGS: [&str; 2] = ["description", "example"];

pub fn render_hover(info: &QuickInfo) -> HoverContent {
    let sections = RENDERED_TAGS
        .iter()
        .filter_map(|name| {
            let tag = info.tags.iter().find(|t| t.name == *name)?;
            if tag.text.is_empty() {
                return None;
            }
            let text: String = tag.text.iter().map(|p| p.text.as_str()).collect();
            Some(HoverSection {
                tag: name.to_string(),
                text: text.replace("- ", "• "),
            })
        })
        .collect();

    HoverContent {
        start: info.start,
        length: info.length,
        signature: info.display_parts.clone(),
        sections,
    }
}
