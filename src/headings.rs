//! Splits extracted markup at its top-level headings.
//!
//! Used for standalone HTML input and as the last-resort strategy for
//! packages whose reading order yields nothing.

use crate::extract::{render_blocks, Block};
use crate::model::{ChapterDraft, ChapterSource};
use crate::segment::{normalize_title, INTRODUCTION_TITLE};

/// Deepest heading level that can start a section.
const MAX_SPLIT_LEVEL: u8 = 3;

/// How a section got its title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionTitle {
    /// Content before the first split heading
    Introduction,
    /// Normalized heading text
    Heading(String),
    /// Document without any split heading
    Untitled,
}

/// A run of blocks between split headings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingSection {
    /// Section title
    pub title: SectionTitle,
    /// Rendered text of the section body
    pub text: String,
}

/// The heading level documents are split at: the smallest level among
/// h1..h3 present in `blocks`.
pub fn split_level(blocks: &[Block]) -> Option<u8> {
    blocks
        .iter()
        .filter_map(|b| match b {
            Block::Heading { level, .. } if *level <= MAX_SPLIT_LEVEL => Some(*level),
            _ => None,
        })
        .min()
}

/// Split blocks into sections at the split level.
///
/// Deeper headings stay in the section text as `###` markers. Blank
/// introductions are dropped; a document with no text yields no sections.
pub fn split_at_headings(blocks: &[Block]) -> Vec<HeadingSection> {
    let Some(level) = split_level(blocks) else {
        let text = render_blocks(blocks);
        if text.is_empty() {
            return Vec::new();
        }
        return vec![HeadingSection {
            title: SectionTitle::Untitled,
            text,
        }];
    };

    let mut sections = Vec::new();
    let mut title = SectionTitle::Introduction;
    let mut body: Vec<Block> = Vec::new();

    for block in blocks {
        match block {
            Block::Heading { level: l, text } if *l == level => {
                push_section(&mut sections, title, &body);
                title = SectionTitle::Heading(normalize_title(text));
                body.clear();
            }
            other => body.push(other.clone()),
        }
    }
    push_section(&mut sections, title, &body);
    sections
}

fn push_section(sections: &mut Vec<HeadingSection>, title: SectionTitle, body: &[Block]) {
    let text = render_blocks(body);
    if title == SectionTitle::Introduction && text.is_empty() {
        return;
    }
    sections.push(HeadingSection { title, text });
}

/// Turn sections into chapter drafts.
///
/// `planned` is the number of chapters that precede these sections; it
/// numbers untitled sections (`"Chapter N"`). Without an `id_base` ids are
/// `introduction`, `heading-N` and `chapter-N`; with one they are the base
/// followed by `-N` for every section after the first.
pub fn section_drafts(
    sections: Vec<HeadingSection>,
    href: &str,
    id_base: Option<&str>,
    planned: usize,
) -> Vec<ChapterDraft> {
    let mut heading_ordinal = 0;
    sections
        .into_iter()
        .enumerate()
        .map(|(k, section)| {
            let position = planned + k + 1;
            let (default_id, title) = match section.title {
                SectionTitle::Introduction => ("introduction".to_string(), INTRODUCTION_TITLE.to_string()),
                SectionTitle::Heading(title) => {
                    heading_ordinal += 1;
                    (format!("heading-{}", heading_ordinal), title)
                }
                SectionTitle::Untitled => {
                    (format!("chapter-{}", position), format!("Chapter {}", position))
                }
            };
            let id = match id_base {
                Some(base) if k == 0 => base.to_string(),
                Some(base) => format!("{}-{}", base, k + 1),
                None => default_id,
            };
            ChapterDraft::new(id, title, ChapterSource::Heading)
                .with_href(href)
                .with_text(section.text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_blocks;
    use crate::tokenizer::tokenize_html;

    fn blocks(html: &str) -> Vec<Block> {
        extract_blocks(&tokenize_html(html).unwrap())
    }

    #[test]
    fn test_split_level_prefers_shallowest() {
        assert_eq!(split_level(&blocks("<h3>a</h3><h2>b</h2>")), Some(2));
        assert_eq!(split_level(&blocks("<h4>a</h4><p>x</p>")), None);
        assert_eq!(split_level(&blocks("<p>x</p>")), None);
    }

    #[test]
    fn test_split_with_introduction_and_subheadings() {
        let html = "<p>Front matter.</p>\
                    <h2>1. Arrival</h2><p>We came.</p><h3>Morning</h3><p>Sun.</p>\
                    <h2>Chapter 2</h2><p>We left.</p>";
        let sections = split_at_headings(&blocks(html));
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, SectionTitle::Introduction);
        assert_eq!(sections[0].text, "Front matter.");
        assert_eq!(sections[1].title, SectionTitle::Heading("Chapter 1: Arrival".into()));
        assert_eq!(sections[1].text, "We came.\n\n### Morning\n\nSun.");
        assert_eq!(sections[2].title, SectionTitle::Heading("Chapter 2".into()));
    }

    #[test]
    fn test_no_heading_single_section() {
        let sections = split_at_headings(&blocks("<p>One</p><p>Two</p>"));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, SectionTitle::Untitled);
        assert_eq!(sections[0].text, "One\n\nTwo");
    }

    #[test]
    fn test_empty_document_no_sections() {
        assert!(split_at_headings(&blocks("<html><body/></html>")).is_empty());
    }

    #[test]
    fn test_heading_with_empty_body_kept() {
        let sections = split_at_headings(&blocks("<h1>Title Page</h1>"));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, "");
    }

    #[test]
    fn test_section_drafts_default_ids() {
        let sections = split_at_headings(&blocks("<p>pre</p><h1>A</h1><p>a</p><h1>B</h1>"));
        let drafts = section_drafts(sections, "", None, 0);
        let ids: Vec<&str> = drafts.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["introduction", "heading-1", "heading-2"]);
        assert_eq!(drafts[0].title, "Introduction");
        assert!(drafts.iter().all(|d| d.source == ChapterSource::Heading));
    }

    #[test]
    fn test_section_drafts_with_id_base_and_numbering() {
        let sections = split_at_headings(&blocks("<p>untitled text</p>"));
        let drafts = section_drafts(sections, "text/a.xhtml", Some("item7"), 2);
        assert_eq!(drafts[0].id, "item7");
        assert_eq!(drafts[0].title, "Chapter 3");
        assert_eq!(drafts[0].href, "text/a.xhtml");
    }
}
