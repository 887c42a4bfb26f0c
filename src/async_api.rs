//! Async parsing helpers.
//!
//! This module is available with the `async` feature. Opening the archive
//! and inflating chapter documents happen in one blocking task that owns the
//! archive handle; markup-to-text conversion for each chapter then runs on
//! its own blocking task and is reassembled by planned index, so the chapter
//! order never depends on completion order.

use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tokio::task::{self, JoinSet};

use crate::assemble::{assemble, ChapterOutcome};
use crate::book::{EpubBook, ParseOptions};
use crate::error::{ErrorKind, ParseError};
use crate::extract::text_from_bytes;
use crate::model::{ChapterDraft, ParseResult};

/// Read an EPUB file without blocking and parse it.
pub async fn parse_epub_file_async<P: AsRef<Path>>(path: P, options: &ParseOptions) -> ParseResult {
    let path = path.as_ref();
    match tokio::fs::read(path).await {
        Ok(bytes) => parse_epub_bytes_async(bytes, options).await,
        Err(e) => ParseResult::failure(ParseError::new(
            ErrorKind::Io,
            format!("{}: {}", path.display(), e),
        )),
    }
}

/// Parse an in-memory EPUB, extracting chapter text concurrently.
///
/// Dropping the returned future aborts any extraction still in flight.
pub async fn parse_epub_bytes_async(bytes: Vec<u8>, options: &ParseOptions) -> ParseResult {
    match parse_concurrently(bytes, options).await {
        Ok(result) => result,
        Err(err) => ParseResult::failure(err),
    }
}

/// A planned chapter with its document bytes read from the archive.
struct RawChapter {
    draft: ChapterDraft,
    path: String,
    bytes: Result<Vec<u8>, ParseError>,
}

/// Outcome of the archive phase.
enum ArchiveRead {
    /// Nothing left to extract concurrently
    Finished(Box<ParseResult>),
    Chapters {
        title: String,
        author: String,
        chapters: Vec<RawChapter>,
    },
}

/// Open the package and read every planned document. Blocking.
fn read_archive(bytes: Vec<u8>, options: &ParseOptions) -> Result<ArchiveRead, ParseError> {
    let mut book = EpubBook::from_reader_with_options(Cursor::new(bytes), options)?;
    let plan = book.plan();
    if plan.is_empty() {
        log::warn!("Reading order yielded no chapters; splitting documents at headings");
        let outcomes = book.fallback_outcomes();
        return book
            .assemble_outcomes(outcomes)
            .map(|result| ArchiveRead::Finished(Box::new(result)));
    }

    let chapters = plan
        .iter()
        .map(|planned| RawChapter {
            draft: planned.draft(),
            path: planned.document.path.clone(),
            bytes: book.read_document(&planned.document),
        })
        .collect();
    Ok(ArchiveRead::Chapters {
        title: book.title().to_string(),
        author: book.author(),
        chapters,
    })
}

async fn parse_concurrently(
    bytes: Vec<u8>,
    options: &ParseOptions,
) -> Result<ParseResult, ParseError> {
    let options = options.clone();
    let archive = task::spawn_blocking(move || read_archive(bytes, &options))
        .await
        .map_err(|err| {
            ParseError::new(
                ErrorKind::CorruptArchive,
                format!("archive reading task failed: {}", err),
            )
        })??;
    let (title, author, chapters) = match archive {
        ArchiveRead::Finished(result) => return Ok(*result),
        ArchiveRead::Chapters {
            title,
            author,
            chapters,
        } => (title, author, chapters),
    };

    let mut slots: Vec<Option<ChapterOutcome>> = vec![None; chapters.len()];
    let mut pending: Vec<(ChapterDraft, String)> = Vec::with_capacity(chapters.len());
    let mut set = JoinSet::new();
    for (index, chapter) in chapters.into_iter().enumerate() {
        pending.push((chapter.draft.clone(), chapter.path));
        match chapter.bytes {
            Ok(bytes) => {
                let draft = chapter.draft;
                set.spawn_blocking(move || {
                    let text = panic::catch_unwind(AssertUnwindSafe(|| text_from_bytes(&bytes)))
                        .unwrap_or_else(|_| {
                            Err(ParseError::new(
                                ErrorKind::ResourceUnreadable,
                                "content extraction panicked",
                            ))
                        });
                    (index, ChapterOutcome::from_result(draft, text))
                });
            }
            Err(error) => {
                slots[index] = Some(ChapterOutcome::Failed {
                    draft: chapter.draft,
                    error,
                })
            }
        }
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(err) => log::warn!("Chapter extraction task failed: {}", err),
        }
    }

    let outcomes: Vec<ChapterOutcome> = slots
        .into_iter()
        .zip(pending)
        .map(|(slot, (draft, path))| {
            slot.unwrap_or_else(|| ChapterOutcome::Failed {
                draft,
                error: ParseError::new(
                    ErrorKind::ResourceUnreadable,
                    format!("extraction of '{}' did not complete", path),
                ),
            })
        })
        .collect();
    Ok(assemble(title, author, outcomes))
}
