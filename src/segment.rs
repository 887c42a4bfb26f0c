//! Heuristic chapter segmentation for unstructured text.
//!
//! Boundary detection and title normalization are two independent ordered
//! rule lists. The first boundary pattern that matches a line wins; the
//! first title rule whose predicate accepts the line formats the title.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::model::{ChapterDraft, ChapterSource};

/// Longest line (in characters) still considered a heading.
pub const DEFAULT_MAX_HEADING_LEN: usize = 120;

/// Title for content before the first boundary.
pub const INTRODUCTION_TITLE: &str = "Introduction";

const ROMAN: &str = r"M{0,4}(?:CM|CD|D?C{0,3})(?:XC|XL|L?X{0,3})(?:IX|IV|V?I{0,3})";
/// Spelled-out numbers from one to ninety-nine; compounds take a hyphen or a space.
const SPELLED: &str = "(?:twenty|thirty|forty|fifty|sixty|seventy|eighty|ninety)\
(?:[-\\s]+(?:one|two|three|four|five|six|seven|eight|nine))?\
|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen\
|one|two|three|four|five|six|seven|eight|nine";

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => panic!("built-in pattern {:?} failed to compile: {}", pattern, err),
    }
}

static CHAPTER_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"(?i)^chapter\s+(?P<num>\d+|{SPELLED}|{ROMAN})\b(?P<rest>.*)$"
    ))
});

static SPELLED_RE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"(?i)^(?:{SPELLED})$")));

static NUMBERED_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r#"^(?P<num>\d{{1,3}}|{ROMAN})\.\s+(?P<rest>[\p{{Lu}}"'“‘].*)$"#
    ))
});

static BARE_NUMERAL_RE: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"^(?P<num>\d{{1,3}}|{ROMAN})\.?$")));

static PART_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"(?i)^(?:part|book)\s+(?P<num>\d+|{SPELLED}|{ROMAN})\b(?P<rest>.*)$"
    ))
});

static NAMED_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)^(?:prologue|epilogue|preface|foreword|afterword|interlude)\b(?:\s*[:.\-–—].*)?$")
});

static DEFAULT_CONFIG: Lazy<SegmenterConfig> = Lazy::new(|| SegmenterConfig {
    patterns: vec![
        BoundaryPattern::new("chapter", CHAPTER_RE.clone()),
        BoundaryPattern::new("numbered-title", NUMBERED_TITLE_RE.clone()),
        BoundaryPattern::new("bare-numeral", BARE_NUMERAL_RE.clone()),
        BoundaryPattern::new("part", PART_RE.clone()),
        BoundaryPattern::new("named-section", NAMED_SECTION_RE.clone()),
    ],
    max_heading_len: DEFAULT_MAX_HEADING_LEN,
});

/// A named chapter-boundary regex.
///
/// A line matches when the regex matches it and, if the regex has a `num`
/// capture group, that group is non-empty.
#[derive(Clone, Debug)]
pub struct BoundaryPattern {
    name: String,
    regex: Regex,
}

impl BoundaryPattern {
    /// Wrap a compiled regex.
    pub fn new(name: impl Into<String>, regex: Regex) -> Self {
        Self {
            name: name.into(),
            regex,
        }
    }

    /// Pattern name (e.g. `"chapter"`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a trimmed line is a boundary for this pattern.
    pub fn matches(&self, line: &str) -> bool {
        self.regex.captures(line).is_some_and(|caps| has_numeral(&caps))
    }
}

fn has_numeral(caps: &Captures<'_>) -> bool {
    caps.name("num").is_none_or(|m| !m.as_str().is_empty())
}

/// Ordered boundary patterns plus the heading length limit.
#[derive(Clone, Debug)]
pub struct SegmenterConfig {
    patterns: Vec<BoundaryPattern>,
    max_heading_len: usize,
}

impl SegmenterConfig {
    /// Shared default configuration, built once and read-only.
    pub fn shared() -> &'static SegmenterConfig {
        &DEFAULT_CONFIG
    }

    /// Append a custom boundary pattern after the built-in ones.
    pub fn with_pattern(
        mut self,
        name: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        self.patterns.push(BoundaryPattern::new(name, Regex::new(pattern)?));
        Ok(self)
    }

    /// Override the heading length limit.
    pub fn with_max_heading_len(mut self, max_heading_len: usize) -> Self {
        self.max_heading_len = max_heading_len;
        self
    }

    /// Patterns in match order
    pub fn patterns(&self) -> &[BoundaryPattern] {
        &self.patterns
    }

    /// Heading length limit in characters
    pub fn max_heading_len(&self) -> usize {
        self.max_heading_len
    }

    /// Index of the first pattern matching `line`, if the line can be a heading.
    pub fn boundary_index(&self, line: &str) -> Option<usize> {
        let line = line.trim();
        if line.is_empty() || line.chars().count() > self.max_heading_len {
            return None;
        }
        self.patterns.iter().position(|p| p.matches(line))
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self::shared().clone()
    }
}

type TitlePredicate = fn(&str) -> Option<Captures<'_>>;
type TitleFormatter = fn(&Captures<'_>) -> String;

fn chapter_rule(line: &str) -> Option<Captures<'_>> {
    CHAPTER_RE.captures(line).filter(has_numeral)
}

fn numbered_title_rule(line: &str) -> Option<Captures<'_>> {
    NUMBERED_TITLE_RE.captures(line).filter(has_numeral)
}

fn bare_numeral_rule(line: &str) -> Option<Captures<'_>> {
    BARE_NUMERAL_RE.captures(line).filter(has_numeral)
}

fn format_chapter(caps: &Captures<'_>) -> String {
    let num = normalize_numeral(&caps["num"]);
    let rest = caps
        .name("rest")
        .map(|m| m.as_str().trim_start_matches(|c: char| c.is_whitespace() || ":.-–—".contains(c)))
        .unwrap_or("")
        .trim();
    if rest.is_empty() {
        format!("Chapter {}", num)
    } else {
        format!("Chapter {}: {}", num, rest)
    }
}

fn format_bare(caps: &Captures<'_>) -> String {
    format!("Chapter {}", normalize_numeral(&caps["num"]))
}

/// Ordered `(predicate, formatter)` title rules; unmatched lines stay verbatim.
const TITLE_RULES: &[(TitlePredicate, TitleFormatter)] = &[
    (chapter_rule, format_chapter),
    (numbered_title_rule, format_chapter),
    (bare_numeral_rule, format_bare),
];

/// Normalize a boundary line into a chapter title.
///
/// ```
/// use chapterkit::segment::normalize_title;
///
/// assert_eq!(normalize_title("III. The Long Road"), "Chapter III: The Long Road");
/// assert_eq!(normalize_title("chapter xii - Storm"), "Chapter XII: Storm");
/// assert_eq!(normalize_title("4"), "Chapter 4");
/// assert_eq!(normalize_title("Epilogue"), "Epilogue");
/// ```
pub fn normalize_title(line: &str) -> String {
    let line = line.trim();
    TITLE_RULES
        .iter()
        .find_map(|(predicate, format)| predicate(line).map(|caps| format(&caps)))
        .unwrap_or_else(|| line.to_string())
}

/// Roman numerals upper-cased, spelled numbers capitalized, digits as-is.
fn normalize_numeral(num: &str) -> String {
    if num.chars().all(|c| c.is_ascii_digit()) {
        return num.to_string();
    }
    if SPELLED_RE.is_match(num) {
        return num
            .split(|c: char| c == '-' || c.is_whitespace())
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join("-");
    }
    num.to_ascii_uppercase()
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower,
    }
}

/// Output of [`segment_text`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Segmentation {
    /// Chapters in text order, `source = heading`
    pub drafts: Vec<ChapterDraft>,
    /// Normalized title to index of the pattern that matched its line
    pub pattern_match_counts: BTreeMap<String, usize>,
}

struct OpenChapter {
    title: String,
    lines: Vec<String>,
}

impl OpenChapter {
    fn text(&self) -> String {
        self.lines.join("\n").trim().to_string()
    }
}

/// Split plain text into chapters at boundary lines.
///
/// Boundary lines become titles and are not part of any chapter's text.
/// Content before the first boundary becomes an `"Introduction"` when it is
/// not blank; text without any boundary becomes a single `"Chapter 1"`.
/// Empty or whitespace-only input yields no chapters.
pub fn segment_text(text: &str, config: &SegmenterConfig) -> Segmentation {
    let mut result = Segmentation::default();
    if text.trim().is_empty() {
        return result;
    }

    let mut preamble: Vec<String> = Vec::new();
    let mut chapters: Vec<OpenChapter> = Vec::new();

    for line in text.lines() {
        if let Some(pattern) = config.boundary_index(line) {
            let title = normalize_title(line);
            result.pattern_match_counts.insert(title.clone(), pattern);
            chapters.push(OpenChapter {
                title,
                lines: Vec::new(),
            });
            continue;
        }
        match chapters.last_mut() {
            Some(open) => open.lines.push(line.to_string()),
            None => preamble.push(line.to_string()),
        }
    }

    let preamble_text = preamble.join("\n").trim().to_string();
    if chapters.is_empty() {
        log::debug!("No chapter boundary found; emitting a single chapter");
        result.drafts.push(
            ChapterDraft::new("chapter-1", "Chapter 1", ChapterSource::Heading)
                .with_text(preamble_text),
        );
        return result;
    }

    if !preamble_text.is_empty() {
        result.drafts.push(
            ChapterDraft::new("introduction", INTRODUCTION_TITLE, ChapterSource::Heading)
                .with_text(preamble_text),
        );
    }
    for (n, chapter) in chapters.iter().enumerate() {
        result.drafts.push(
            ChapterDraft::new(
                format!("heading-{}", n + 1),
                chapter.title.clone(),
                ChapterSource::Heading,
            )
            .with_text(chapter.text()),
        );
    }
    log::debug!(
        "Segmented text into {} chapters ({} boundaries)",
        result.drafts.len(),
        chapters.len()
    );
    result
}
