//! Unified error types for chapterkit
//!
//! `ParseError` carries an [`ErrorKind`] plus a human-readable message. ZIP
//! failures keep their own `ZipErrorKind` and convert into `ParseError` so `?`
//! works across module boundaries.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Classification of everything that can go wrong during a parse.
///
/// Fatal kinds abort the whole parse and surface as `success: false`.
/// Non-fatal kinds degrade a single chapter to empty text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Bytes are not a readable ZIP container.
    CorruptArchive,
    /// `META-INF/container.xml` is absent or unreadable.
    MissingDescriptor,
    /// The container descriptor names no usable package path.
    MissingPackagePath,
    /// The package document named by the descriptor is absent.
    MissingPackageFile,
    /// The package document exists but cannot be read or parsed.
    UnreadablePackageFile,
    /// The package was readable but yielded no content documents.
    NoChapters,
    /// The input could not be loaded from disk.
    Io,
    /// A chapter's backing resource is missing from the archive.
    ResourceNotFound,
    /// A chapter's backing resource could not be decoded.
    ResourceUnreadable,
}

impl ErrorKind {
    /// Whether this kind aborts the whole parse.
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorKind::ResourceNotFound | ErrorKind::ResourceUnreadable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::CorruptArchive => "corrupt archive",
            ErrorKind::MissingDescriptor => "missing container descriptor",
            ErrorKind::MissingPackagePath => "missing package path",
            ErrorKind::MissingPackageFile => "missing package file",
            ErrorKind::UnreadablePackageFile => "unreadable package file",
            ErrorKind::NoChapters => "no chapters",
            ErrorKind::Io => "I/O error",
            ErrorKind::ResourceNotFound => "resource not found",
            ErrorKind::ResourceUnreadable => "resource unreadable",
        };
        f.write_str(name)
    }
}

/// Top-level error type for chapterkit operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    kind: ErrorKind,
    message: String,
}

impl ParseError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable detail (without the kind prefix).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this error aborts the whole parse.
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    pub(crate) fn resource_from_zip(path: &str, err: ZipError) -> Self {
        match err {
            ZipErrorKind::FileNotFound => Self::new(
                ErrorKind::ResourceNotFound,
                format!("'{}' is not in the archive", path),
            ),
            other => Self::new(
                ErrorKind::ResourceUnreadable,
                format!("'{}' could not be read: {}", path, other),
            ),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ParseError {}

/// ZIP-specific error variants
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ZipErrorKind {
    /// Input carries no ZIP signature or end-of-central-directory record
    NotAnArchive,
    /// File not found in archive
    FileNotFound,
    /// Damaged ZIP structure
    InvalidFormat,
    /// Unsupported compression method
    UnsupportedCompression,
    /// Decompression failed
    DecompressError,
    /// CRC32 mismatch
    CrcMismatch,
    /// I/O error during ZIP operations
    IoError,
    /// Central directory holds more entries than allowed
    TooManyEntries,
    /// File exceeds maximum allowed size
    FileTooLarge,
    /// Invalid or missing mimetype file
    InvalidMimetype(String),
    /// ZIP64 structures are present but unsupported
    UnsupportedZip64,
}

/// Public ZIP error type alias used across the crate API.
pub type ZipError = ZipErrorKind;

impl fmt::Display for ZipErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZipErrorKind::NotAnArchive => write!(f, "not a ZIP archive"),
            ZipErrorKind::FileNotFound => write!(f, "file not found in archive"),
            ZipErrorKind::InvalidFormat => write!(f, "invalid ZIP format"),
            ZipErrorKind::UnsupportedCompression => write!(f, "unsupported compression method"),
            ZipErrorKind::DecompressError => write!(f, "decompression failed"),
            ZipErrorKind::CrcMismatch => write!(f, "CRC32 checksum mismatch"),
            ZipErrorKind::IoError => write!(f, "I/O error"),
            ZipErrorKind::TooManyEntries => write!(f, "too many central directory entries"),
            ZipErrorKind::FileTooLarge => write!(f, "file too large"),
            ZipErrorKind::InvalidMimetype(msg) => write!(f, "invalid mimetype: {}", msg),
            ZipErrorKind::UnsupportedZip64 => write!(f, "ZIP64 is not supported"),
        }
    }
}

impl std::error::Error for ZipErrorKind {}

impl From<ZipError> for ParseError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipErrorKind::NotAnArchive => ParseError::new(
                ErrorKind::CorruptArchive,
                "not an archive: input has no ZIP signature",
            ),
            other => ParseError::new(
                ErrorKind::CorruptArchive,
                format!("archive corrupt: {}", other),
            ),
        }
    }
}

impl From<crate::tokenizer::TokenizeError> for ParseError {
    fn from(err: crate::tokenizer::TokenizeError) -> Self {
        ParseError::new(ErrorKind::ResourceUnreadable, err.to_string())
    }
}
