//! Routes raw input to the matching pipeline.

use crate::assemble::{ChapterOutcome, ResultAssembler};
use crate::book::{parse_epub_bytes_with_options, ParseOptions};
use crate::error::{ErrorKind, ParseError};
use crate::extract::html_blocks_from_bytes;
use crate::headings::{section_drafts, split_at_headings};
use crate::model::ParseResult;
use crate::segment::{segment_text, SegmenterConfig};

/// Media type of EPUB containers.
pub const EPUB_MEDIA_TYPE: &str = "application/epub+zip";

const ZIP_SIGNATURES: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06"];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Something to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input<'a> {
    /// Raw bytes with the media type the caller declared
    Bytes {
        /// Document bytes
        bytes: &'a [u8],
        /// Declared media type, possibly empty or unknown
        media_type: &'a str,
    },
    /// Already-decoded plain text
    Text(&'a str),
}

/// Pipeline an input is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// EPUB container
    Epub,
    /// Standalone XHTML/HTML document
    Markup,
    /// Unstructured text
    PlainText,
}

impl InputKind {
    /// Classify by declared media type, sniffing `bytes` when the type is
    /// unknown: a ZIP signature means a container, anything else is text.
    pub fn detect(media_type: &str, bytes: &[u8]) -> Self {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            EPUB_MEDIA_TYPE => InputKind::Epub,
            "text/plain" => InputKind::PlainText,
            "text/html" | "application/xhtml+xml" => InputKind::Markup,
            _ if ZIP_SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) => InputKind::Epub,
            _ => InputKind::PlainText,
        }
    }
}

/// Parse any supported input.
pub fn parse_input(input: Input<'_>, options: &ParseOptions) -> ParseResult {
    match input {
        Input::Text(text) => parse_text_with_config(text, &options.segmenter),
        Input::Bytes { bytes, media_type } => match InputKind::detect(media_type, bytes) {
            InputKind::Epub => parse_epub_bytes_with_options(bytes, options),
            InputKind::Markup => parse_html(bytes),
            InputKind::PlainText => {
                parse_text_with_config(&decode_text(bytes), &options.segmenter)
            }
        },
    }
}

/// Decode text bytes as UTF-8, dropping a BOM and replacing invalid
/// sequences.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Segment plain text with the shared default patterns.
///
/// ```
/// let result = chapterkit::parse_text("Chapter 1\nIt begins.\n\nChapter 2\nIt ends.");
/// assert_eq!(result.chapters().len(), 2);
/// assert_eq!(result.chapters()[1].text(), "It ends.");
/// ```
pub fn parse_text(text: &str) -> ParseResult {
    parse_text_with_config(text, SegmenterConfig::shared())
}

/// Segment plain text with explicit patterns.
pub fn parse_text_with_config(text: &str, config: &SegmenterConfig) -> ParseResult {
    let segmentation = segment_text(text, config);
    if segmentation.drafts.is_empty() {
        return ParseResult::empty("", "");
    }
    let mut assembler = ResultAssembler::new("", "")
        .with_pattern_match_counts(segmentation.pattern_match_counts);
    assembler.extend(segmentation.drafts.into_iter().map(ChapterOutcome::Extracted));
    assembler.finish()
}

/// Split a standalone markup document at its top-level headings.
///
/// Markup that is not well-formed XML is read with an HTML5 parser. A
/// document that cannot be decoded, or that has content but no readable
/// text, fails the parse with `ResourceUnreadable`. Blank input is an empty
/// success.
pub fn parse_html(bytes: &[u8]) -> ParseResult {
    if decode_text(bytes).trim().is_empty() {
        return ParseResult::empty("", "");
    }
    match html_outcomes(bytes) {
        Ok(outcomes) => {
            let mut assembler = ResultAssembler::new("", "");
            assembler.extend(outcomes);
            assembler.finish()
        }
        Err(err) => ParseResult::failure(err),
    }
}

fn html_outcomes(bytes: &[u8]) -> Result<Vec<ChapterOutcome>, ParseError> {
    let blocks = html_blocks_from_bytes(bytes)?;
    if blocks.is_empty() {
        return Err(ParseError::new(
            ErrorKind::ResourceUnreadable,
            "markup document contains no readable text",
        ));
    }
    Ok(section_drafts(split_at_headings(&blocks), "", None, 0)
        .into_iter()
        .map(ChapterOutcome::Extracted)
        .collect())
}
