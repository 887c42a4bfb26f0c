//! Folds per-chapter outcomes into a [`ParseResult`].

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::model::{Chapter, ChapterDiagnostic, ChapterDraft, ParseResult};

/// Result of extracting one planned chapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChapterOutcome {
    /// Text was extracted (possibly empty)
    Extracted(ChapterDraft),
    /// The backing resource failed; the chapter is kept with empty text
    Failed {
        /// Planned chapter
        draft: ChapterDraft,
        /// Non-fatal cause
        error: ParseError,
    },
}

impl ChapterOutcome {
    /// Build an outcome from a planned draft and an extraction result.
    pub fn from_result(draft: ChapterDraft, text: Result<String, ParseError>) -> Self {
        match text {
            Ok(text) => ChapterOutcome::Extracted(draft.with_text(text)),
            Err(error) => ChapterOutcome::Failed { draft, error },
        }
    }
}

/// Accumulates chapters in order and assigns contiguous indices.
#[derive(Debug)]
pub struct ResultAssembler {
    title: String,
    author: String,
    chapters: Vec<Chapter>,
    diagnostics: Vec<ChapterDiagnostic>,
    pattern_match_counts: BTreeMap<String, usize>,
}

impl ResultAssembler {
    /// Start a result; blank title or author fall back to the defaults.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            chapters: Vec::new(),
            diagnostics: Vec::new(),
            pattern_match_counts: BTreeMap::new(),
        }
    }

    /// Attach boundary-pattern statistics (heuristic text path).
    pub fn with_pattern_match_counts(mut self, counts: BTreeMap<String, usize>) -> Self {
        self.pattern_match_counts = counts;
        self
    }

    /// Number of chapters pushed so far.
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// Whether no chapter has been pushed.
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Append one outcome.
    pub fn push(&mut self, outcome: ChapterOutcome) {
        let index = self.chapters.len();
        let draft = match outcome {
            ChapterOutcome::Extracted(draft) => draft,
            ChapterOutcome::Failed { mut draft, error } => {
                log::warn!(
                    "Chapter {} ('{}') degraded to empty text: {}",
                    index,
                    draft.href,
                    error
                );
                draft.text.clear();
                self.diagnostics.push(ChapterDiagnostic {
                    index,
                    kind: error.kind(),
                    message: error.message().to_string(),
                });
                draft
            }
        };
        self.chapters.push(Chapter::from_draft(draft, index));
    }

    /// Build the final result.
    pub fn finish(self) -> ParseResult {
        ParseResult::from_parts(
            self.title,
            self.author,
            self.chapters,
            self.diagnostics,
            self.pattern_match_counts,
        )
    }
}

impl Extend<ChapterOutcome> for ResultAssembler {
    fn extend<I: IntoIterator<Item = ChapterOutcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.push(outcome);
        }
    }
}

/// Fold outcomes into a successful result.
pub fn assemble(
    title: impl Into<String>,
    author: impl Into<String>,
    outcomes: impl IntoIterator<Item = ChapterOutcome>,
) -> ParseResult {
    let mut assembler = ResultAssembler::new(title, author);
    assembler.extend(outcomes);
    assembler.finish()
}
