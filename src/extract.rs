//! Content extraction: markup tokens to narration-ready plain text.
//!
//! Headings survive as Markdown-style markers (`## Title`) so downstream
//! consumers can still see document structure; everything else becomes
//! paragraphs separated by a blank line.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;
use crate::tokenizer::{
    decode_markup, tokenize_html, tokenize_html_lenient, Token, TokenizeError,
};

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Invalid newline regex"));

/// A block of extracted content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// `<h1>`..`<h6>` with its normalized text
    Heading {
        /// 1-6
        level: u8,
        /// Heading text on a single line
        text: String,
    },
    /// Any other run of text; may contain single newlines from `<br>`
    Paragraph(String),
}

impl Block {
    /// Render as it appears in chapter text.
    pub fn render(&self) -> String {
        match self {
            Block::Heading { level, text } => {
                format!("{} {}", "#".repeat(usize::from(*level)), text)
            }
            Block::Paragraph(text) => text.clone(),
        }
    }
}

/// Group a token stream into blocks, dropping blocks with no visible text.
pub fn extract_blocks(tokens: &[Token]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph = String::new();
    let mut heading: Option<(u8, String)> = None;

    for token in tokens {
        match token {
            Token::Text(text) => match heading.as_mut() {
                Some((_, h)) => h.push_str(text),
                None => paragraph.push_str(text),
            },
            Token::LineBreak => match heading.as_mut() {
                Some((_, h)) => h.push(' '),
                None => paragraph.push('\n'),
            },
            Token::ParagraphBreak => match heading.as_mut() {
                Some((_, h)) => h.push(' '),
                None => flush_paragraph(&mut paragraph, &mut blocks),
            },
            Token::HeadingStart(level) => {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_heading(heading.take(), &mut blocks);
                heading = Some((*level, String::new()));
            }
            Token::HeadingEnd(_) => flush_heading(heading.take(), &mut blocks),
        }
    }
    flush_heading(heading.take(), &mut blocks);
    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

fn flush_paragraph(paragraph: &mut String, blocks: &mut Vec<Block>) {
    let text = normalize_text(paragraph);
    paragraph.clear();
    if !text.is_empty() {
        blocks.push(Block::Paragraph(text));
    }
}

fn flush_heading(heading: Option<(u8, String)>, blocks: &mut Vec<Block>) {
    let Some((level, raw)) = heading else {
        return;
    };
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        blocks.push(Block::Heading { level, text });
    }
}

/// Join rendered blocks with a blank line and normalize the result.
pub fn render_blocks(blocks: &[Block]) -> String {
    let joined = blocks
        .iter()
        .map(Block::render)
        .collect::<Vec<_>>()
        .join("\n\n");
    normalize_text(&joined)
}

/// Collapse horizontal whitespace, trim every line, squeeze runs of three
/// or more newlines into one blank line and trim the whole text.
pub fn normalize_text(text: &str) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    let joined = lines.join("\n");
    EXCESS_NEWLINES
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Convert an XHTML string into chapter text.
pub fn extract_text(html: &str) -> Result<String, TokenizeError> {
    let tokens = tokenize_html(html)?;
    Ok(render_blocks(&extract_blocks(&tokens)))
}

/// Decode and tokenize raw content-document bytes into blocks.
///
/// Encoding and markup failures surface as `ResourceUnreadable`.
pub fn blocks_from_bytes(bytes: &[u8]) -> Result<Vec<Block>, ParseError> {
    let html = decode_markup(bytes)?;
    let tokens = tokenize_html(html)?;
    Ok(extract_blocks(&tokens))
}

/// Decode standalone HTML into blocks.
///
/// Markup that is not well-formed XML is reparsed with the HTML5 parser, so
/// only an encoding failure is an error.
pub fn html_blocks_from_bytes(bytes: &[u8]) -> Result<Vec<Block>, ParseError> {
    let html = decode_markup(bytes)?;
    let tokens = tokenize_html(html).unwrap_or_else(|err| {
        log::debug!("{}; reparsing as HTML5", err);
        tokenize_html_lenient(html)
    });
    Ok(extract_blocks(&tokens))
}

/// Decode raw content-document bytes into chapter text.
pub fn text_from_bytes(bytes: &[u8]) -> Result<String, ParseError> {
    Ok(render_blocks(&blocks_from_bytes(bytes)?))
}
