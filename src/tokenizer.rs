//! XHTML to token stream converter for content documents
//!
//! Converts XHTML chapters into a simplified token format that's easier
//! to turn into narration text. Uses quick_xml for SAX-style parsing so
//! large documents are processed without building a DOM. Markup that is not
//! well-formed XML can go through [`tokenize_html_lenient`], which uses an
//! HTML5 parser instead.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use scraper::{Html, Node};

use crate::metadata::{local_name, resolve_entity};

/// Token types for simplified XHTML representation
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Token {
    /// Text content, internal whitespace collapsed to single spaces
    Text(String),
    /// Block boundary
    ParagraphBreak,
    /// Line break (`<br>`)
    LineBreak,
    /// Opening `<h1>`..`<h6>`
    HeadingStart(u8),
    /// Closing `</h1>`..`</h6>`
    HeadingEnd(u8),
}

/// Error type for tokenization failures
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum TokenizeError {
    /// XML parsing error
    ParseError(String),
    /// Input bytes are not UTF-8
    Encoding(String),
}

impl core::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenizeError::ParseError(msg) => write!(f, "markup parse error: {}", msg),
            TokenizeError::Encoding(msg) => write!(f, "markup is not valid UTF-8: {}", msg),
        }
    }
}

impl std::error::Error for TokenizeError {}

/// Decode raw content-document bytes, dropping a UTF-8 byte-order mark.
pub fn decode_markup(bytes: &[u8]) -> Result<&str, TokenizeError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    core::str::from_utf8(bytes).map_err(|e| TokenizeError::Encoding(e.to_string()))
}

/// Convert XHTML string into a token stream
///
/// Removes `script`, `style`, `head`, `noscript`, `template` and `nav`
/// elements together with their content. Removed content is skipped as raw
/// text up to the matching end tag, so markup-like characters inside a
/// script do not derail the parser. A removed element that is never closed
/// is an error. Block elements produce [`Token::ParagraphBreak`];
/// consecutive breaks are merged and none are emitted at the start or end of
/// the stream. End tags are not checked against start tags, so tag soup that
/// is otherwise well-formed XML parses.
///
/// # Example
/// ```
/// use chapterkit::tokenizer::{tokenize_html, Token};
///
/// let tokens = tokenize_html("<p>Hello <em>world</em></p>").unwrap();
/// assert_eq!(tokens, vec![Token::Text("Hello world".into())]);
/// ```
pub fn tokenize_html(html: &str) -> Result<Vec<Token>, TokenizeError> {
    // Byte offset of the current reader within `html`
    let mut offset = 0usize;
    let mut reader = markup_reader(html);
    let mut buf = Vec::new();
    let mut out = TokenSink::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e).to_ascii_lowercase();
                if should_skip_element(&name) {
                    let position = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
                    let content_start = offset.saturating_add(position).min(html.len());
                    let resume = skip_element(html, content_start, e.name().as_ref(), &name)
                        .ok_or_else(|| {
                            TokenizeError::ParseError(format!(
                                "<{}> opened before byte {} is never closed",
                                name, content_start
                            ))
                        })?;
                    offset = resume;
                    reader = markup_reader(&html[offset..]);
                    buf.clear();
                    continue;
                }
                match classify(&name) {
                    ElementType::Heading(level) => out.heading_start(level),
                    ElementType::Block => out.paragraph_break(),
                    ElementType::LineBreak => out.push(Token::LineBreak),
                    ElementType::Inline => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                match classify(&name) {
                    ElementType::Heading(level) => out.heading_end(level),
                    ElementType::Block => out.paragraph_break(),
                    ElementType::LineBreak | ElementType::Inline => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e).to_ascii_lowercase();
                match classify(&name) {
                    ElementType::LineBreak => out.push(Token::LineBreak),
                    ElementType::Block => out.paragraph_break(),
                    ElementType::Heading(level) => {
                        out.heading_start(level);
                        out.heading_end(level);
                    }
                    ElementType::Inline => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .decode()
                    .map_err(|e| TokenizeError::ParseError(format!("decode error: {}", e)))?;
                out.text(&text);
            }
            Ok(Event::CData(e)) => out.text(&String::from_utf8_lossy(&e)),
            Ok(Event::GeneralRef(e)) => {
                let name = e
                    .decode()
                    .map_err(|e| TokenizeError::ParseError(format!("decode error: {}", e)))?;
                out.text(&resolve_entity(&name));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TokenizeError::ParseError(format!(
                    "XML error at byte {}: {}",
                    offset as u64 + reader.error_position(),
                    e
                )));
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    Ok(out.finish())
}

fn markup_reader(html: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = false;
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;
    reader.config_mut().allow_dangling_amp = true;
    reader
}

/// Convert arbitrary HTML into a token stream with an HTML5 parser.
///
/// Recovers from tag soup the way a browser does, so it never fails. Applies
/// the same element rules as [`tokenize_html`].
pub fn tokenize_html_lenient(html: &str) -> Vec<Token> {
    enum Step<N> {
        Open(N),
        Close(ElementType),
    }

    let document = Html::parse_document(html);
    let mut out = TokenSink::default();
    let mut stack = vec![Step::Open(document.tree.root())];

    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Open(node) => node,
            Step::Close(ElementType::Heading(level)) => {
                out.heading_end(level);
                continue;
            }
            Step::Close(ElementType::Block) => {
                out.paragraph_break();
                continue;
            }
            Step::Close(_) => continue,
        };
        match node.value() {
            Node::Text(text) => out.text(text),
            Node::Element(element) => {
                let name = element.name().to_ascii_lowercase();
                if should_skip_element(&name) {
                    continue;
                }
                let kind = classify(&name);
                match kind {
                    ElementType::Heading(level) => out.heading_start(level),
                    ElementType::Block => out.paragraph_break(),
                    ElementType::LineBreak => out.push(Token::LineBreak),
                    ElementType::Inline => {}
                }
                stack.push(Step::Close(kind));
                stack.extend(node.children().rev().map(Step::Open));
            }
            Node::Document | Node::Fragment => {
                stack.extend(node.children().rev().map(Step::Open));
            }
            _ => {}
        }
    }

    out.finish()
}

/// Byte offset just past the end tag that closes a removed element whose
/// content starts at `from`, or `None` when no end tag follows.
///
/// `script` and `style` hold raw text, so only their end tag counts. Other
/// removed elements may nest, so same-named start tags are balanced.
fn skip_element(html: &str, from: usize, qname: &[u8], name: &str) -> Option<usize> {
    let bytes = html.as_bytes();
    let nests = !matches!(name, "script" | "style");
    let mut depth = 1usize;
    let mut pos = from;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &bytes[pos + 1..];
        let tag_end = |pos: usize| {
            bytes[pos..]
                .iter()
                .position(|&b| b == b'>')
                .map(|i| pos + i + 1)
        };
        if let Some(after_slash) = rest.strip_prefix(b"/") {
            if starts_with_tag(after_slash, qname) {
                depth -= 1;
                if depth == 0 {
                    return tag_end(pos);
                }
            }
        } else if nests && starts_with_tag(rest, qname) {
            let end = tag_end(pos)?;
            if bytes[end - 2] != b'/' {
                depth += 1;
            }
            pos = end;
            continue;
        }
        pos += 1;
    }
    None
}

/// Whether `bytes` begins with the tag name `qname` (ASCII case-insensitive).
fn starts_with_tag(bytes: &[u8], qname: &[u8]) -> bool {
    bytes.len() > qname.len()
        && bytes[..qname.len()].eq_ignore_ascii_case(qname)
        && matches!(bytes[qname.len()], b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n')
}

/// Accumulates tokens, merging adjacent text and collapsing breaks.
#[derive(Default)]
struct TokenSink {
    tokens: Vec<Token>,
}

impl TokenSink {
    fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn text(&mut self, raw: &str) {
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return;
        }
        match self.tokens.last_mut() {
            Some(Token::Text(last)) => {
                if last.ends_with(' ') && collapsed.starts_with(' ') {
                    last.push_str(&collapsed[1..]);
                } else {
                    last.push_str(&collapsed);
                }
            }
            // Inter-element whitespace after a break carries nothing.
            _ if collapsed == " " => {}
            _ => self.tokens.push(Token::Text(collapsed)),
        }
    }

    fn paragraph_break(&mut self) {
        match self.tokens.last() {
            None | Some(Token::ParagraphBreak) => {}
            _ => self.tokens.push(Token::ParagraphBreak),
        }
    }

    fn heading_start(&mut self, level: u8) {
        self.paragraph_break();
        self.tokens.push(Token::HeadingStart(level));
    }

    fn heading_end(&mut self, level: u8) {
        self.tokens.push(Token::HeadingEnd(level));
    }

    fn finish(mut self) -> Vec<Token> {
        while matches!(self.tokens.last(), Some(Token::ParagraphBreak)) {
            self.tokens.pop();
        }
        self.tokens
    }
}

/// Types of elements the tokenizer distinguishes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ElementType {
    Heading(u8),
    Block,
    LineBreak,
    Inline,
}

fn classify(name: &str) -> ElementType {
    if let Some(level) = heading_level(name) {
        return ElementType::Heading(level);
    }
    match name {
        "br" => ElementType::LineBreak,
        "p" | "div" | "li" | "blockquote" | "section" | "article" | "tr" | "dd" | "dt"
        | "figcaption" | "header" | "footer" | "aside" | "ul" | "ol" | "table" | "hr"
        | "pre" | "body" | "main" | "figure" | "dl" => ElementType::Block,
        _ => ElementType::Inline,
    }
}

fn heading_level(name: &str) -> Option<u8> {
    let digit = name.strip_prefix('h')?;
    match digit.parse::<u8>() {
        Ok(level @ 1..=6) if digit.len() == 1 => Some(level),
        _ => None,
    }
}

/// Check if an element should be skipped entirely (with its children)
fn should_skip_element(name: &str) -> bool {
    matches!(
        name,
        "script" | "style" | "head" | "noscript" | "template" | "nav"
    )
}

/// Collapse whitespace runs (including no-break space) to one space.
fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
