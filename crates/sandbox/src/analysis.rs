//! Headless fallback analysis backend.
//!
//! Used by `strategy-check` and the test suites when no real type checker is
//! plugged in behind [`AnalysisBackend`]. It is deliberately shallow and
//! covers only bracket and literal balance, resolution of
//! `import { .. } from "m"` against `declare module "m"` blocks in the
//! virtual filesystem, member access on imported enums, and completions and
//! hover over the imported declarations. Anything else is left to the
//! remote validator.

use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};

use strategy_editor_core::{Error, Result};

use crate::engine::{
    AnalysisBackend, CompilerOptions, CompletionEntry, DisplayPart, DocTag, LanguageService,
    QuickInfo, RawDiagnostic, VirtualFileSystem,
};
use crate::scan::{
    block_after, byte_offset, char_offset, check_brackets, enum_members, mask_comments, word_at,
};

const CANNOT_FIND_MODULE: u32 = 2307;
const NO_EXPORTED_MEMBER: u32 = 2305;
const PROPERTY_DOES_NOT_EXIST: u32 = 2339;

/// Fallback backend producing [`StructuralService`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralAnalysisBackend;

impl StructuralAnalysisBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisBackend for StructuralAnalysisBackend {
    fn create_service(&self, options: &CompilerOptions) -> Result<Box<dyn LanguageService>> {
        tracing::debug!(target_level = ?options.target, "Creating structural language service");
        Ok(Box::new(StructuralService::new()?))
    }
}

// =============================================================================
// Module Index
// =============================================================================

/// A top-level declaration of a module, or a member of one of its types.
#[derive(Debug, Clone)]
struct Declaration {
    kind: String,
    name: String,
    /// Text after the name up to the end of the signature, e.g. `(period: number): Timeseries`.
    signature: String,
    doc: Option<String>,
    members: Vec<String>,
}

#[derive(Debug, Default)]
struct ModuleIndex {
    declarations: Vec<Declaration>,
    members: Vec<Declaration>,
}

impl ModuleIndex {
    fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }
}

/// A named import bound to its resolved declaration.
#[derive(Debug)]
struct Binding {
    local: String,
    declaration: Declaration,
}

/// What the import statements of one document resolve to.
#[derive(Debug, Default)]
struct Resolution {
    bindings: Vec<Binding>,
    modules: Vec<ModuleIndex>,
    diagnostics: Vec<RawDiagnostic>,
}

impl Resolution {
    fn binding(&self, local: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.local == local)
    }

    fn member(&self, name: &str) -> Option<&Declaration> {
        self.modules
            .iter()
            .flat_map(|m| m.members.iter())
            .find(|d| d.name == name)
    }
}

// =============================================================================
// Structural Service
// =============================================================================

pub struct StructuralService {
    import_re: Regex,
    declaration_re: Regex,
    member_re: Regex,
    access_re: Regex,
    dotted_prefix_re: Regex,
    disposed: AtomicBool,
}

impl StructuralService {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::sandbox(format!("invalid analysis pattern: {}", e)))
        };
        Ok(Self {
            import_re: compile(
                r#"\bimport\s+(?:\{([^}]*)\}\s*from\s*|\*\s+as\s+[A-Za-z_$][\w$]*\s+from\s*|[A-Za-z_$][\w$]*\s+from\s*)?["']([^"']+)["']"#,
            )?,
            declaration_re: compile(
                r"\b(const|let|var|enum|type|interface|class|function|namespace)\s+([A-Za-z_$][\w$]*)",
            )?,
            member_re: compile(r"(?m)^[ \t]*([A-Za-z_$][\w$]*)[ \t]*(\([^)]*\))?[ \t]*:[ \t]*([^;\n]+);")?,
            access_re: compile(r"([A-Za-z_$][\w$]*)\.([A-Za-z_$][\w$]*)")?,
            dotted_prefix_re: compile(r"([A-Za-z_$][\w$]*)?(\.)?([\w$]*)$")?,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn index_module(&self, raw: &str, masked: &str) -> ModuleIndex {
        let declarations = self
            .declaration_re
            .captures_iter(masked)
            .filter_map(|cap| {
                let keyword = cap.get(1)?;
                let name = cap.get(2)?;
                let kind = keyword.as_str().to_string();
                let members = if kind == "enum" {
                    block_after(masked, name.end())
                        .and_then(|body| masked.get(body))
                        .map(enum_members)
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                Some(Declaration {
                    doc: doc_comment_before(raw, masked, keyword.start()),
                    kind,
                    name: name.as_str().to_string(),
                    signature: String::new(),
                    members,
                })
            })
            .collect();

        let members = self
            .member_re
            .captures_iter(masked)
            .filter_map(|cap| {
                let name = cap.get(1)?;
                let params = cap.get(2).map(|p| p.as_str()).unwrap_or_default();
                let ty = cap.get(3)?.as_str().trim();
                Some(Declaration {
                    kind: if params.is_empty() { "property" } else { "method" }.to_string(),
                    name: name.as_str().to_string(),
                    signature: format!("{}: {}", params, ty),
                    doc: doc_comment_before(raw, masked, name.start()),
                    members: Vec::new(),
                })
            })
            .collect();

        ModuleIndex {
            declarations,
            members,
        }
    }

    /// Find `declare module "name"` in any readable file.
    fn find_module(&self, fs: &VirtualFileSystem, name: &str) -> Option<ModuleIndex> {
        let header = Regex::new(&format!(
            r#"declare\s+module\s+["']{}["']"#,
            regex::escape(name)
        ))
        .ok()?;
        let double = format!("\"{}\"", name);
        let single = format!("'{}'", name);

        for (_, content) in fs.all_sources() {
            if !content.contains(&double) && !content.contains(&single) {
                continue;
            }
            let masked = mask_comments(content);
            let Some(found) = header.find(&masked) else {
                continue;
            };
            let body = block_after(&masked, found.end())?;
            let raw_body = content.get(
                byte_offset(content, char_offset(&masked, body.start))
                    ..byte_offset(content, char_offset(&masked, body.end)),
            )?;
            return Some(self.index_module(raw_body, masked.get(body)?));
        }
        None
    }

    fn resolve(&self, fs: &VirtualFileSystem, masked: &str) -> Resolution {
        let mut resolution = Resolution::default();

        for cap in self.import_re.captures_iter(masked) {
            let Some(specifier) = cap.get(2) else {
                continue;
            };
            let module_name = specifier.as_str();
            let Some(index) = self.find_module(fs, module_name) else {
                let start = char_offset(masked, specifier.start());
                resolution.diagnostics.push(RawDiagnostic::error(
                    start,
                    char_offset(masked, specifier.end()) - start,
                    CANNOT_FIND_MODULE,
                    format!("Cannot find module '{}'.", module_name),
                ));
                continue;
            };

            if let Some(names) = cap.get(1) {
                let mut cursor = names.start();
                for segment in names.as_str().split(',') {
                    let segment_start = cursor;
                    cursor += segment.len() + 1;

                    let trimmed = segment.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let (exported, local) = match trimmed.split_once(" as ") {
                        Some((exported, local)) => (exported.trim(), local.trim()),
                        None => (trimmed, trimmed),
                    };

                    match index.declaration(exported) {
                        Some(declaration) => resolution.bindings.push(Binding {
                            local: local.to_string(),
                            declaration: declaration.clone(),
                        }),
                        None => {
                            let lead = segment.len() - segment.trim_start().len();
                            let start = char_offset(masked, segment_start + lead);
                            resolution.diagnostics.push(RawDiagnostic::error(
                                start,
                                exported.chars().count(),
                                NO_EXPORTED_MEMBER,
                                format!(
                                    "Module '\"{}\"' has no exported member '{}'.",
                                    module_name, exported
                                ),
                            ));
                        }
                    }
                }
            }
            resolution.modules.push(index);
        }
        resolution
    }
}

impl LanguageService for StructuralService {
    fn syntactic_diagnostics(&self, fs: &VirtualFileSystem, path: &str) -> Vec<RawDiagnostic> {
        fs.read(path).map(check_brackets).unwrap_or_default()
    }

    fn semantic_diagnostics(&self, fs: &VirtualFileSystem, path: &str) -> Vec<RawDiagnostic> {
        let Some(text) = fs.read(path) else {
            return Vec::new();
        };
        let masked = mask_comments(text);
        let mut resolution = self.resolve(fs, &masked);

        // member access on an imported enum, e.g. an instrument dropped from the universe
        for cap in self.access_re.captures_iter(&masked) {
            let (Some(object), Some(property)) = (cap.get(1), cap.get(2)) else {
                continue;
            };
            let Some(binding) = resolution.binding(object.as_str()) else {
                continue;
            };
            if binding.declaration.kind != "enum"
                || binding.declaration.members.iter().any(|m| m == property.as_str())
            {
                continue;
            }
            let start = char_offset(&masked, property.start());
            resolution.diagnostics.push(RawDiagnostic::error(
                start,
                property.as_str().chars().count(),
                PROPERTY_DOES_NOT_EXIST,
                format!(
                    "Property '{}' does not exist on type 'typeof {}'.",
                    property.as_str(),
                    object.as_str()
                ),
            ));
        }
        resolution.diagnostics
    }

    fn completions(&self, fs: &VirtualFileSystem, path: &str, offset: usize) -> Vec<CompletionEntry> {
        let Some(text) = fs.read(path) else {
            return Vec::new();
        };
        let masked = mask_comments(text);
        let resolution = self.resolve(fs, &masked);
        let Some(prefix) = masked.get(..byte_offset(&masked, offset)) else {
            return Vec::new();
        };
        let Some(cap) = self.dotted_prefix_re.captures(prefix) else {
            return Vec::new();
        };
        let partial = cap.get(3).map(|m| m.as_str()).unwrap_or_default();

        let entries: Vec<CompletionEntry> = if cap.get(2).is_some() {
            let object = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            match resolution.binding(object) {
                Some(binding) if binding.declaration.kind == "enum" => binding
                    .declaration
                    .members
                    .iter()
                    .map(|m| entry(m, "enum member"))
                    .collect(),
                _ => resolution
                    .modules
                    .iter()
                    .flat_map(|m| m.members.iter())
                    .map(|d| entry(&d.name, &d.kind))
                    .collect(),
            }
        } else {
            let partial_word = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            return filter_entries(
                resolution
                    .bindings
                    .iter()
                    .map(|b| entry(&b.local, &b.declaration.kind))
                    .collect(),
                partial_word,
            );
        };
        filter_entries(entries, partial)
    }

    fn quick_info(&self, fs: &VirtualFileSystem, path: &str, offset: usize) -> Option<QuickInfo> {
        let text = fs.read(path)?;
        let masked = mask_comments(text);
        let (start, word) = word_at(&masked, offset)?;
        let resolution = self.resolve(fs, &masked);
        let length = word.chars().count();
        let dotted = start > 0 && masked.chars().nth(start - 1) == Some('.');

        if dotted {
            let member = resolution.member(&word)?;
            let name_kind = if member.kind == "method" { "methodName" } else { "propertyName" };
            return Some(QuickInfo {
                start,
                length,
                display_parts: vec![
                    DisplayPart::new(format!("({})", member.kind), "text"),
                    DisplayPart::new(" ", "space"),
                    DisplayPart::new(member.name.clone(), name_kind),
                    DisplayPart::new(member.signature.clone(), "text"),
                ],
                tags: parse_doc_tags(member.doc.as_deref()),
            });
        }

        let binding = resolution.binding(&word)?;
        let name_kind = match binding.declaration.kind.as_str() {
            "enum" => "enumName",
            "const" | "let" | "var" => "localName",
            _ => "aliasName",
        };
        Some(QuickInfo {
            start,
            length,
            display_parts: vec![
                DisplayPart::new(binding.declaration.kind.clone(), "keyword"),
                DisplayPart::new(" ", "space"),
                DisplayPart::new(binding.local.clone(), name_kind),
            ],
            tags: parse_doc_tags(binding.declaration.doc.as_deref()),
        })
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

fn entry(name: &str, kind: &str) -> CompletionEntry {
    CompletionEntry {
        name: name.to_string(),
        kind: kind.to_string(),
    }
}

fn filter_entries(mut entries: Vec<CompletionEntry>, partial: &str) -> Vec<CompletionEntry> {
    entries.retain(|e| e.name.starts_with(partial));
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries.dedup_by(|a, b| a.name == b.name);
    entries
}

/// The `/** .. */` block directly preceding the declaration at masked byte `at`.
fn doc_comment_before(raw: &str, masked: &str, at: usize) -> Option<String> {
    let raw_at = byte_offset(raw, char_offset(masked, at));
    let mut before = raw.get(..raw_at)?.trim_end();
    for modifier in ["export", "declare"] {
        before = before.strip_suffix(modifier).unwrap_or(before).trim_end();
    }
    if !before.ends_with("*/") {
        return None;
    }
    let open = before.rfind("/**")?;
    Some(before.get(open..)?.to_string())
}

/// JSDoc tags of a comment; untagged leading text is dropped.
fn parse_doc_tags(comment: Option<&str>) -> Vec<DocTag> {
    let Some(comment) = comment else {
        return Vec::new();
    };
    let body = comment
        .trim_start_matches("/**")
        .trim_end_matches("*/");

    let mut tags: Vec<(String, Vec<String>)> = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        let line = line.strip_prefix('*').unwrap_or(line).trim();
        if let Some(tagged) = line.strip_prefix('@') {
            let (name, rest) = tagged.split_once(char::is_whitespace).unwrap_or((tagged, ""));
            let mut lines = Vec::new();
            if !rest.trim().is_empty() {
                lines.push(rest.trim().to_string());
            }
            tags.push((name.to_string(), lines));
        } else if let Some((_, lines)) = tags.last_mut() {
            lines.push(line.to_string());
        }
    }

    tags.into_iter()
        .map(|(name, lines)| {
            let text = lines.join("\n").trim().to_string();
            DocTag {
                name,
                text: if text.is_empty() {
                    Vec::new()
                } else {
                    vec![DisplayPart::new(text, "text")]
                },
            }
        })
        .collect()
}
