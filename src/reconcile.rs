//! Manual split reconciliation and integrity drift.
//!
//! When a person re-splits a document by hand, the new chapters should still
//! add up to the source text. Drift beyond [`DRIFT_THRESHOLD_PERCENT`] is
//! reported but never blocks the split.

use serde::{Deserialize, Serialize};

use crate::assemble::{ChapterOutcome, ResultAssembler};
use crate::model::{ChapterDraft, ChapterSource, ParseResult};

/// Drift above this percentage is flagged.
pub const DRIFT_THRESHOLD_PERCENT: f64 = 5.0;

/// One chapter of a hand-edited split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualChapter {
    /// Chapter title; blank titles become `"Chapter N"`
    #[serde(default)]
    pub title: String,
    /// Chapter text
    pub text: String,
}

impl ManualChapter {
    /// Convenience constructor.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Length comparison between a source and its split.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    /// Characters in the source text
    pub source_len: usize,
    /// Characters across all chapter texts
    pub chapters_len: usize,
    /// `|chapters - source| / source * 100`, 0 for an empty source
    pub drift_percent: f64,
}

impl DriftReport {
    /// Compare two lengths.
    pub fn new(source_len: usize, chapters_len: usize) -> Self {
        Self {
            source_len,
            chapters_len,
            drift_percent: drift_percent(source_len, chapters_len),
        }
    }

    /// Whether the drift strictly exceeds [`DRIFT_THRESHOLD_PERCENT`].
    pub fn integrity_drift(&self) -> bool {
        self.drift_percent > DRIFT_THRESHOLD_PERCENT
    }
}

/// Relative length difference in percent.
///
/// ```
/// use chapterkit::reconcile::drift_percent;
///
/// assert_eq!(drift_percent(10_000, 9_400), 6.0);
/// assert_eq!(drift_percent(0, 42), 0.0);
/// ```
pub fn drift_percent(source_len: usize, chapters_len: usize) -> f64 {
    if source_len == 0 {
        return 0.0;
    }
    let diff = source_len.abs_diff(chapters_len) as f64;
    diff / source_len as f64 * 100.0
}

/// A manual split and its drift check.
#[derive(Clone, Debug, PartialEq)]
pub struct ManualSplit {
    /// The new chapter set
    pub result: ParseResult,
    /// Source vs chapters length comparison
    pub drift: DriftReport,
}

/// Build a result from hand-edited chapters and check it against the source.
///
/// Lengths are counted in Unicode scalar values. Every chapter gets
/// `source = manual` and an id `manual-N` (1-based).
pub fn reconcile_manual_split(
    source_text: &str,
    title: impl Into<String>,
    author: impl Into<String>,
    chapters: Vec<ManualChapter>,
) -> ManualSplit {
    let source_len = source_text.chars().count();
    let chapters_len = chapters.iter().map(|c| c.text.chars().count()).sum();
    let drift = DriftReport::new(source_len, chapters_len);
    if drift.integrity_drift() {
        log::warn!(
            "Manual split drifts {:.1}% from source ({} vs {} chars)",
            drift.drift_percent,
            chapters_len,
            source_len
        );
    }

    let mut assembler = ResultAssembler::new(title, author);
    for (i, chapter) in chapters.into_iter().enumerate() {
        let title = match chapter.title.trim() {
            "" => format!("Chapter {}", i + 1),
            t => t.to_string(),
        };
        assembler.push(ChapterOutcome::Extracted(
            ChapterDraft::new(format!("manual-{}", i + 1), title, ChapterSource::Manual)
                .with_text(chapter.text),
        ));
    }

    ManualSplit {
        result: assembler.finish(),
        drift,
    }
}
