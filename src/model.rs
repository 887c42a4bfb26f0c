//! Chapter and parse-result value types.
//!
//! Every parse produces fresh values; nothing here is shared or mutated
//! after the assembler hands it out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ParseError};

/// Title used when the package or input carries none.
pub const DEFAULT_TITLE: &str = "Untitled";
/// Author used when the package or input carries none.
pub const DEFAULT_AUTHOR: &str = "Unknown Author";

/// Which strategy produced a chapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterSource {
    /// Title taken from the navigation document
    Navigation,
    /// Reading-order entry with no navigation label
    ReadingOrder,
    /// Split at a heading or boundary line
    Heading,
    /// Supplied by a person editing the split
    Manual,
}

/// A chapter before the assembler has given it an index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterDraft {
    /// Manifest id or synthetic id
    pub id: String,
    /// OPF-relative resource reference, empty for text chapters
    pub href: String,
    /// Display title
    pub title: String,
    /// Nesting depth, 0 = top level
    pub level: u32,
    /// Plain text
    pub text: String,
    /// Producing strategy
    pub source: ChapterSource,
}

impl ChapterDraft {
    /// Draft with empty href, level 0 and no text.
    pub fn new(id: impl Into<String>, title: impl Into<String>, source: ChapterSource) -> Self {
        Self {
            id: id.into(),
            href: String::new(),
            title: title.into(),
            level: 0,
            text: String::new(),
            source,
        }
    }

    /// Set the resource reference.
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = href.into();
        self
    }

    /// Set the nesting depth.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Set the chapter text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// One chapter of a parse result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    id: String,
    href: String,
    title: String,
    level: u32,
    text: String,
    index: usize,
    source: ChapterSource,
}

impl Chapter {
    pub(crate) fn from_draft(draft: ChapterDraft, index: usize) -> Self {
        let title = if draft.title.trim().is_empty() {
            format!("Chapter {}", index + 1)
        } else {
            draft.title
        };
        Self {
            id: draft.id,
            href: draft.href,
            title,
            level: draft.level,
            text: draft.text,
            index,
            source: draft.source,
        }
    }

    /// Manifest id or synthetic id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// OPF-relative resource reference; empty for text and manual chapters
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Non-empty display title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Nesting depth, 0 = top level
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Plain text, empty when extraction failed
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 0-based position in the result
    pub fn index(&self) -> usize {
        self.index
    }

    /// Strategy that produced this chapter
    pub fn source(&self) -> ChapterSource {
        self.source
    }
}

/// Non-fatal per-chapter problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDiagnostic {
    /// Index of the affected chapter
    pub index: usize,
    /// Error classification
    pub kind: ErrorKind,
    /// Detail message
    pub message: String,
}

/// Outcome of one parse.
///
/// `success == false` always comes with an `error` and no chapters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    title: String,
    author: String,
    chapters: Vec<Chapter>,
    content: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<ChapterDiagnostic>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pattern_match_counts: BTreeMap<String, usize>,
}

impl ParseResult {
    pub(crate) fn from_parts(
        title: String,
        author: String,
        chapters: Vec<Chapter>,
        diagnostics: Vec<ChapterDiagnostic>,
        pattern_match_counts: BTreeMap<String, usize>,
    ) -> Self {
        let content = Self::render_content(&chapters);
        Self {
            title: or_default(title, DEFAULT_TITLE),
            author: or_default(author, DEFAULT_AUTHOR),
            chapters,
            content,
            success: true,
            error: None,
            error_kind: None,
            diagnostics,
            pattern_match_counts,
        }
    }

    /// A failed parse carrying the fatal error.
    pub fn failure(error: ParseError) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            chapters: Vec::new(),
            content: String::new(),
            success: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            diagnostics: Vec::new(),
            pattern_match_counts: BTreeMap::new(),
        }
    }

    /// A successful parse with no chapters (empty input).
    pub fn empty(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self::from_parts(
            title.into(),
            author.into(),
            Vec::new(),
            Vec::new(),
            BTreeMap::new(),
        )
    }

    /// Render chapters as `# {title}\n\n{text}` joined by a blank line.
    pub fn render_content(chapters: &[Chapter]) -> String {
        chapters
            .iter()
            .map(|c| format!("# {}\n\n{}", c.title, c.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Book or document title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author, creators joined with `", "`
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Chapters in reading order
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Consume the result, keeping only the chapters
    pub fn into_chapters(self) -> Vec<Chapter> {
        self.chapters
    }

    /// Concatenated chapter content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the parse completed
    pub fn success(&self) -> bool {
        self.success
    }

    /// Human-readable fatal error, present iff `!success()`
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Machine-readable fatal error kind, present iff `!success()`
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Per-chapter non-fatal problems
    pub fn diagnostics(&self) -> &[ChapterDiagnostic] {
        &self.diagnostics
    }

    /// Boundary title to pattern index; heuristic text path only
    pub fn pattern_match_counts(&self) -> &BTreeMap<String, usize> {
        &self.pattern_match_counts
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn or_default(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_string()
    }
}

impl From<ParseError> for ParseResult {
    fn from(error: ParseError) -> Self {
        ParseResult::failure(error)
    }
}
