//! chapterkit -- chapter extraction and segmentation for narration
//!
//! Turns an EPUB container, a standalone XHTML/HTML document or a plain-text
//! blob into an ordered list of titled chapters.
//!
//! # Pipelines
//!
//! - EPUB: ZIP container, `container.xml`, OPF package, navigation document,
//!   then one chapter per reading-order entry titled from the navigation.
//!   Packages whose reading order yields nothing are split at headings.
//! - Markup: split at the shallowest of `h1`..`h3`; documents that are not
//!   well-formed XML are read with an HTML5 parser.
//! - Plain text: ordered boundary patterns with title normalization.
//!
//! Every entry point returns a [`ParseResult`]; fatal problems surface as
//! `success == false` with an [`ErrorKind`], while a missing or unreadable
//! chapter resource only empties that chapter and adds a diagnostic.
//!
//! # Features
//!
//! - `async` (default) -- tokio-based file loading and concurrent extraction

#![warn(missing_docs)]
#![deny(clippy::large_enum_variant, clippy::redundant_clone)]
#![warn(
    clippy::needless_collect,
    clippy::map_clone,
    clippy::implicit_clone,
    clippy::inefficient_to_string
)]

pub mod assemble;
pub mod book;
pub mod error;
pub mod extract;
pub mod headings;
pub mod input;
pub mod metadata;
pub mod model;
pub mod navigation;
pub mod reconcile;
pub mod resolve;
pub mod segment;
pub mod spine;
pub mod tokenizer;
pub mod zip;

#[cfg(feature = "async")]
pub mod async_api;

// Re-export key types for convenience
#[cfg(feature = "async")]
pub use async_api::{parse_epub_bytes_async, parse_epub_file_async};
pub use assemble::{assemble, ChapterOutcome, ResultAssembler};
pub use book::{
    parse_epub_bytes, parse_epub_bytes_with_options, parse_epub_file,
    parse_epub_file_with_options, parse_epub_reader, parse_epub_reader_with_options, EpubBook,
    ParseOptions, ValidationMode,
};
pub use error::{ErrorKind, ParseError, ZipError, ZipErrorKind};
pub use input::{parse_html, parse_input, parse_text, parse_text_with_config, Input, InputKind};
pub use metadata::EpubMetadata;
pub use model::{Chapter, ChapterDiagnostic, ChapterDraft, ChapterSource, ParseResult};
pub use navigation::Navigation;
pub use reconcile::{
    drift_percent, reconcile_manual_split, DriftReport, ManualChapter, ManualSplit,
    DRIFT_THRESHOLD_PERCENT,
};
pub use segment::{normalize_title, segment_text, BoundaryPattern, SegmenterConfig};
pub use spine::Spine;
pub use tokenizer::{Token, TokenizeError};
pub use zip::ZipLimits;
