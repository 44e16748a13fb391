//! Character-level scanning helpers for the fallback analysis backend.
//!
//! Offsets named `pos` are character offsets; offsets named `byte` are UTF-8
//! byte offsets into the same text.

use std::ops::Range;

use crate::engine::RawDiagnostic;

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Character offset of a byte offset.
pub(crate) fn char_offset(text: &str, byte: usize) -> usize {
    text.get(..byte).map(|s| s.chars().count()).unwrap_or(0)
}

/// Byte offset of a character offset; past-the-end maps to `text.len()`.
pub(crate) fn byte_offset(text: &str, pos: usize) -> usize {
    text.char_indices()
        .nth(pos)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Identifier touching `pos`, with its start position.
pub(crate) fn word_at(text: &str, pos: usize) -> Option<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    let mut start = pos.min(chars.len());
    while start > 0 && chars.get(start - 1).is_some_and(|c| is_ident_char(*c)) {
        start -= 1;
    }
    let mut end = pos.min(chars.len());
    while chars.get(end).is_some_and(|c| is_ident_char(*c)) {
        end += 1;
    }
    if start == end {
        return None;
    }
    Some((start, chars.get(start..end)?.iter().collect()))
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Position of `a` immediately followed by `b`, searching from `from`.
fn find_pair(chars: &[char], from: usize, a: char, b: char) -> Option<usize> {
    (from..chars.len()).find(|&i| chars.get(i) == Some(&a) && chars.get(i + 1) == Some(&b))
}

/// End of the string literal opening at `start`: `Ok(closing quote)` or
/// `Err(position where it was cut off)`.
fn string_end(chars: &[char], start: usize) -> Result<usize, usize> {
    let quote = chars.get(start).copied().unwrap_or('"');
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err(chars.len()),
            Some('\\') => i += 2,
            Some('\n') if quote != '`' => return Err(i),
            Some(c) if *c == quote => return Ok(i),
            Some(_) => i += 1,
        }
    }
}

/// Replace comment characters with spaces, keeping newlines and character
/// positions intact.
pub(crate) fn mask_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while let Some(&c) = chars.get(i) {
        let next = chars.get(i + 1).copied();
        let end = match c {
            '/' if next == Some('/') => {
                let end = (i..chars.len())
                    .find(|&k| chars.get(k) == Some(&'\n'))
                    .unwrap_or(chars.len());
                blank(&mut out, chars.get(i..end).unwrap_or_default());
                end
            }
            '/' if next == Some('*') => {
                let end = find_pair(&chars, i + 2, '*', '/')
                    .map(|e| e + 2)
                    .unwrap_or(chars.len());
                blank(&mut out, chars.get(i..end).unwrap_or_default());
                end
            }
            '"' | '\'' | '`' => {
                let end = match string_end(&chars, i) {
                    Ok(close) => close + 1,
                    Err(cut) => cut,
                }
                .min(chars.len());
                out.extend(chars.get(i..end).unwrap_or_default());
                end
            }
            _ => {
                out.push(c);
                i + 1
            }
        };
        i = end;
    }
    out
}

fn blank(out: &mut String, chars: &[char]) {
    out.extend(chars.iter().map(|c| if *c == '\n' { '\n' } else { ' ' }));
}

/// Byte range of the body of the first `{ ... }` block at or after `from`.
///
/// An unclosed block extends to the end of the text.
pub(crate) fn block_after(text: &str, from: usize) -> Option<Range<usize>> {
    let tail = text.get(from..)?;
    let open = from + tail.find('{')?;
    let mut depth = 0usize;
    for (byte, c) in text.get(open..)?.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + 1..open + byte);
                }
            }
            _ => {}
        }
    }
    Some(open + 1..text.len())
}

/// Member names of an enum body such as `A, B = 2, C`.
pub(crate) fn enum_members(body: &str) -> Vec<String> {
    body.split(',')
        .filter_map(|segment| {
            let name = segment.split('=').next()?.trim();
            (!name.is_empty() && name.chars().all(is_ident_char)).then(|| name.to_string())
        })
        .collect()
}

/// Bracket balance and string termination, comments ignored.
pub(crate) fn check_brackets(text: &str) -> Vec<RawDiagnostic> {
    let chars: Vec<char> = mask_comments(text).chars().collect();
    let mut stack: Vec<char> = Vec::new();
    let mut diagnostics = Vec::new();
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        match c {
            '"' | '\'' | '`' => {
                i = match string_end(&chars, i) {
                    Ok(close) => close + 1,
                    Err(cut) => {
                        diagnostics.push(RawDiagnostic::error(i, cut - i, 1002, "Unterminated string literal."));
                        cut
                    }
                };
                continue;
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => match stack.pop() {
                Some(open) if closer(open) == c => {}
                Some(open) => diagnostics.push(RawDiagnostic::error(
                    i,
                    1,
                    1005,
                    format!("'{}' expected.", closer(open)),
                )),
                None => diagnostics.push(RawDiagnostic::error(
                    i,
                    1,
                    1128,
                    "Declaration or statement expected.",
                )),
            },
            _ => {}
        }
        i += 1;
    }

    for open in stack.iter().rev() {
        diagnostics.push(RawDiagnostic::error(
            chars.len(),
            0,
            1005,
            format!("'{}' expected.", closer(*open)),
        ));
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_source_has_no_diagnostics() {
        let source = "export const entry = main.priceMinute() > main.priceMinute().trend.sma(200);\nconst u = [\"a\", 'b', `c`];";
        assert!(check_brackets(source).is_empty());
    }

    #[test]
    fn test_unclosed_paren_reported_at_end() {
        let diagnostics = check_brackets("f(1, 2");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].start, 6);
        assert_eq!(diagnostics[0].message, "')' expected.");
    }

    #[test]
    fn test_stray_and_mismatched_closers() {
        let stray = check_brackets("a)");
        assert_eq!(stray[0].code, 1128);
        assert_eq!(stray[0].start, 1);

        let mismatched = check_brackets("[1, 2)");
        assert_eq!(mismatched[0].message, "']' expected.");
        assert_eq!(mismatched.len(), 1);
    }

    #[test]
    fn test_brackets_in_strings_and_comments_are_ignored() {
        assert!(check_brackets("// (\n/* [ */ const s = \"{\";").is_empty());
    }

    #[test]
    fn test_unterminated_literals() {
        assert_eq!(check_brackets("const s = \"abc\nx")[0].code, 1002);
        assert_eq!(check_brackets("const t = `abc")[0].code, 1002);
        assert!(check_brackets("/* open (").is_empty());
    }

    #[test]
    fn test_mask_comments_keeps_positions() {
        let text = "a // b(\n/* é */c \"// not\"";
        let masked = mask_comments(text);
        assert_eq!(masked.chars().count(), text.chars().count());
        assert_eq!(masked, "a      \n       c \"// not\"");
    }

    #[test]
    fn test_block_after_matches_nested_braces() {
        let text = "module { enum A { X, Y } };";
        let body = block_after(text, 0).unwrap();
        assert_eq!(&text[body], " enum A { X, Y } ");
        assert_eq!(enum_members(" X, Y = 2, "), vec!["X", "Y"]);
    }

    #[test]
    fn test_word_at() {
        assert_eq!(word_at("Instrument.BTC", 3), Some((0, "Instrument".to_string())));
        assert_eq!(word_at("Instrument.BTC", 14), Some((11, "BTC".to_string())));
        assert_eq!(word_at("a + b", 2), None);
    }
}
