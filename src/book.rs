//! Container driver: opens an EPUB and runs the chapter pipeline.
//!
//! An [`EpubBook`] owns the archive handle for a single parse. Opening reads
//! the descriptor, package document and navigation; [`EpubBook::parse`] then
//! extracts every planned chapter and folds the outcomes into a
//! [`ParseResult`].

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use crate::assemble::{assemble, ChapterOutcome};
use crate::error::{ErrorKind, ParseError, ZipErrorKind};
use crate::extract::{blocks_from_bytes, text_from_bytes};
use crate::headings::{section_drafts, split_at_headings};
use crate::metadata::{parse_container_xml, parse_opf, EpubMetadata};
use crate::model::{ChapterDraft, ChapterSource, ParseResult};
use crate::navigation::{parse_nav_xhtml, parse_ncx, Navigation};
use crate::resolve::{
    fallback_documents, find_navigation_item, plan_chapters, resolve_relative_path,
    ContentDocument, NavDocument, PlanOptions, PlannedChapter,
};
use crate::segment::SegmenterConfig;
use crate::spine::{parse_spine, Spine};
use crate::zip::{open_container, StreamingZip, ZipLimits};

/// Path of the container descriptor inside every EPUB.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Validation strictness for opening packages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ValidationMode {
    /// Best-effort behavior for partial/quirky EPUBs.
    #[default]
    Lenient,
    /// Fail early for structural inconsistencies.
    Strict,
}

/// Configuration for every parse entry point.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Optional ZIP safety limits used while reading archive entries.
    ///
    /// When `None`, no explicit file-size caps are enforced.
    pub zip_limits: Option<ZipLimits>,
    /// Validation strictness.
    pub validation_mode: ValidationMode,
    /// Keep spine items marked `linear="no"`.
    pub include_non_linear: bool,
    /// Deepest navigation level consulted for titles.
    pub max_nav_depth: usize,
    /// Boundary patterns for plain-text input.
    pub segmenter: SegmenterConfig,
}

impl Default for ParseOptions {
    fn default() -> Self {
        let plan = PlanOptions::default();
        Self {
            zip_limits: None,
            validation_mode: ValidationMode::Lenient,
            include_non_linear: plan.include_non_linear,
            max_nav_depth: plan.max_nav_depth,
            segmenter: SegmenterConfig::default(),
        }
    }
}

impl ParseOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set ZIP safety limits.
    pub fn with_zip_limits(mut self, limits: ZipLimits) -> Self {
        self.zip_limits = Some(limits);
        self
    }

    /// Set validation strictness.
    pub fn with_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = mode;
        self
    }

    /// Shortcut for `with_validation_mode(ValidationMode::Strict)`.
    pub fn strict(self) -> Self {
        self.with_validation_mode(ValidationMode::Strict)
    }

    /// Keep or drop non-linear spine items.
    pub fn with_include_non_linear(mut self, include: bool) -> Self {
        self.include_non_linear = include;
        self
    }

    /// Bound the navigation depth used for titles.
    pub fn with_max_nav_depth(mut self, depth: usize) -> Self {
        self.max_nav_depth = depth;
        self
    }

    /// Replace the plain-text segmenter configuration.
    pub fn with_segmenter(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub(crate) fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            include_non_linear: self.include_non_linear,
            max_nav_depth: self.max_nav_depth,
        }
    }

    fn is_strict(&self) -> bool {
        matches!(self.validation_mode, ValidationMode::Strict)
    }
}

/// An opened EPUB package.
pub struct EpubBook<R: Read + Seek> {
    zip: StreamingZip<R>,
    opf_path: String,
    metadata: EpubMetadata,
    spine: Spine,
    nav: Option<NavDocument>,
    plan_options: PlanOptions,
}

impl EpubBook<File> {
    /// Open an EPUB from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        Self::open_with_options(path, &ParseOptions::default())
    }

    /// Open an EPUB from disk with explicit options.
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ParseError::new(ErrorKind::Io, format!("{}: {}", path.display(), e))
        })?;
        Self::from_reader_with_options(file, options)
    }
}

impl<R: Read + Seek> EpubBook<R> {
    /// Open an EPUB from any `Read + Seek` source.
    pub fn from_reader(reader: R) -> Result<Self, ParseError> {
        Self::from_reader_with_options(reader, &ParseOptions::default())
    }

    /// Open an EPUB from any `Read + Seek` source with explicit options.
    pub fn from_reader_with_options(reader: R, options: &ParseOptions) -> Result<Self, ParseError> {
        let zip = StreamingZip::new_with_limits(reader, options.zip_limits)?;
        Self::from_zip(zip, options)
    }

    /// Read descriptor, package document and navigation from an open archive.
    pub fn from_zip(mut zip: StreamingZip<R>, options: &ParseOptions) -> Result<Self, ParseError> {
        if let Err(err) = zip.validate_mimetype() {
            if options.is_strict() {
                return Err(err.into());
            }
            log::warn!("Ignoring mimetype problem in lenient mode: {}", err);
        }

        let container = zip.read_to_vec(CONTAINER_PATH).map_err(|err| match err {
            ZipErrorKind::FileNotFound => ParseError::new(
                ErrorKind::MissingDescriptor,
                format!("{} not found", CONTAINER_PATH),
            ),
            other => ParseError::new(
                ErrorKind::MissingDescriptor,
                format!("descriptor unreadable: {}", other),
            ),
        })?;
        let opf_path = parse_container_xml(&container)?;

        let opf = zip.read_to_vec(&opf_path).map_err(|err| match err {
            ZipErrorKind::FileNotFound => ParseError::new(
                ErrorKind::MissingPackageFile,
                format!("package document '{}' not found", opf_path),
            ),
            other => ParseError::new(
                ErrorKind::UnreadablePackageFile,
                format!("package document '{}' unreadable: {}", opf_path, other),
            ),
        })?;
        if std::str::from_utf8(&opf).is_err() {
            return Err(ParseError::new(
                ErrorKind::UnreadablePackageFile,
                format!("package document '{}' is not valid UTF-8", opf_path),
            ));
        }

        let metadata = parse_opf(&opf)?;
        let spine = parse_spine(&opf)?;
        validate_open_invariants(&metadata, &spine, options)?;
        let nav = load_navigation(&mut zip, &metadata, &spine, &opf_path);

        Ok(Self {
            zip,
            opf_path,
            metadata,
            spine,
            nav,
            plan_options: options.plan_options(),
        })
    }

    /// Package metadata.
    pub fn metadata(&self) -> &EpubMetadata {
        &self.metadata
    }

    /// Book title, possibly empty.
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Creators joined with `", "`.
    pub fn author(&self) -> String {
        self.metadata.author()
    }

    /// Archive path of the package document.
    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    /// Reading order.
    pub fn spine(&self) -> &Spine {
        &self.spine
    }

    /// Parsed navigation outline, if any.
    pub fn navigation(&self) -> Option<&Navigation> {
        self.nav.as_ref().and_then(|n| n.navigation.as_ref())
    }

    /// Chapter plan in reading order.
    pub fn plan(&self) -> Vec<PlannedChapter> {
        plan_chapters(
            &self.metadata,
            &self.spine,
            &self.opf_path,
            self.nav.as_ref(),
            self.plan_options,
        )
    }

    /// Raw bytes of a content document.
    pub fn read_document(&mut self, document: &ContentDocument) -> Result<Vec<u8>, ParseError> {
        self.zip
            .read_to_vec(&document.path)
            .map_err(|err| ParseError::resource_from_zip(&document.path, err))
    }

    /// Extract the text of one planned chapter.
    pub fn chapter_text(&mut self, planned: &PlannedChapter) -> Result<String, ParseError> {
        let bytes = self.read_document(&planned.document)?;
        text_from_bytes(&bytes)
    }

    /// Heading-split every markup document in manifest order.
    ///
    /// Used when the reading order yields no chapters. Unreadable documents
    /// become a single failed outcome each.
    pub fn fallback_outcomes(&mut self) -> Vec<ChapterOutcome> {
        let nav_id = self.nav.as_ref().map(|n| n.item_id.clone());
        let documents = fallback_documents(&self.metadata, &self.opf_path, nav_id.as_deref());
        let mut outcomes = Vec::new();
        for document in documents {
            let sections = self
                .read_document(&document)
                .and_then(|bytes| blocks_from_bytes(&bytes))
                .map(|blocks| split_at_headings(&blocks));
            match sections {
                Ok(sections) => {
                    let drafts = section_drafts(
                        sections,
                        &document.href,
                        Some(document.id.as_str()),
                        outcomes.len(),
                    );
                    outcomes.extend(drafts.into_iter().map(ChapterOutcome::Extracted));
                }
                Err(error) => outcomes.push(ChapterOutcome::Failed {
                    draft: ChapterDraft::new(document.id, "", ChapterSource::Heading)
                        .with_href(document.href),
                    error,
                }),
            }
        }
        outcomes
    }

    /// Fold outcomes into the final result, failing with `NoChapters` when
    /// there are none.
    pub fn assemble_outcomes(
        &self,
        outcomes: Vec<ChapterOutcome>,
    ) -> Result<ParseResult, ParseError> {
        if outcomes.is_empty() {
            return Err(ParseError::new(
                ErrorKind::NoChapters,
                "package yielded no content documents",
            ));
        }
        Ok(assemble(
            self.metadata.title.clone(),
            self.metadata.author(),
            outcomes,
        ))
    }

    /// Run the full pipeline.
    pub fn parse(mut self) -> Result<ParseResult, ParseError> {
        let plan = self.plan();
        log::debug!(
            "Planned {} chapters from {} spine items",
            plan.len(),
            self.spine.len()
        );
        let outcomes = if plan.is_empty() {
            log::warn!("Reading order yielded no chapters; splitting documents at headings");
            self.fallback_outcomes()
        } else {
            plan.iter()
                .map(|planned| {
                    let text = self.chapter_text(planned);
                    ChapterOutcome::from_result(planned.draft(), text)
                })
                .collect()
        };
        self.assemble_outcomes(outcomes)
    }
}

fn load_navigation<R: Read + Seek>(
    zip: &mut StreamingZip<R>,
    metadata: &EpubMetadata,
    spine: &Spine,
    opf_path: &str,
) -> Option<NavDocument> {
    let nav_item = find_navigation_item(metadata, spine)?;
    let path = resolve_relative_path(opf_path, &nav_item.href);

    let parsed = match zip.read_to_vec(&path) {
        Ok(bytes) if nav_item.is_ncx() => parse_ncx(&bytes),
        Ok(bytes) => parse_nav_xhtml(&bytes),
        Err(err) => Err(ParseError::resource_from_zip(&path, err)),
    };
    let navigation = match parsed {
        Ok(nav) => {
            log::debug!("Navigation '{}' lists {} entries", path, nav.toc_count());
            Some(nav)
        }
        Err(err) => {
            log::warn!("Ignoring navigation document '{}': {}", path, err);
            None
        }
    };

    Some(NavDocument {
        item_id: nav_item.id.clone(),
        path,
        navigation,
    })
}

fn validate_open_invariants(
    metadata: &EpubMetadata,
    spine: &Spine,
    options: &ParseOptions,
) -> Result<(), ParseError> {
    for item in spine.items() {
        if metadata.get_item(&item.idref).is_some() {
            continue;
        }
        if options.is_strict() {
            return Err(ParseError::new(
                ErrorKind::UnreadablePackageFile,
                format!("spine item '{}' has no manifest entry", item.idref),
            ));
        }
        log::warn!("Spine item '{}' has no manifest entry", item.idref);
    }
    Ok(())
}

/// Parse an in-memory EPUB.
pub fn parse_epub_bytes(bytes: &[u8]) -> ParseResult {
    parse_epub_bytes_with_options(bytes, &ParseOptions::default())
}

/// Parse an in-memory EPUB with explicit options.
pub fn parse_epub_bytes_with_options(bytes: &[u8], options: &ParseOptions) -> ParseResult {
    open_container(bytes, options.zip_limits)
        .map_err(ParseError::from)
        .and_then(|zip| EpubBook::from_zip(zip, options))
        .and_then(EpubBook::parse)
        .unwrap_or_else(ParseResult::failure)
}

/// Parse an EPUB from any `Read + Seek` source.
pub fn parse_epub_reader<R: Read + Seek>(reader: R) -> ParseResult {
    parse_epub_reader_with_options(reader, &ParseOptions::default())
}

/// Parse an EPUB from any `Read + Seek` source with explicit options.
pub fn parse_epub_reader_with_options<R: Read + Seek>(
    reader: R,
    options: &ParseOptions,
) -> ParseResult {
    EpubBook::from_reader_with_options(reader, options)
        .and_then(EpubBook::parse)
        .unwrap_or_else(ParseResult::failure)
}

/// Parse an EPUB file from disk.
pub fn parse_epub_file<P: AsRef<Path>>(path: P) -> ParseResult {
    parse_epub_file_with_options(path, &ParseOptions::default())
}

/// Parse an EPUB file from disk with explicit options.
pub fn parse_epub_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> ParseResult {
    EpubBook::open_with_options(path, options)
        .and_then(EpubBook::parse)
        .unwrap_or_else(ParseResult::failure)
}

#[cfg(test)]
pub(crate) mod test_epub {
    //! Minimal in-memory EPUB builder shared by unit tests.

    use crate::zip::test_zip::build_zip;

    pub(crate) const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    pub(crate) fn xhtml(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><html xmlns=\"http://www.w3.org/1999/xhtml\">\
             <head><title>x</title></head><body>{}</body></html>",
            body
        )
    }

    /// OPF with one xhtml manifest item per `(id, href)` and the given spine.
    pub(crate) fn opf(items: &[(&str, &str)], spine: &[&str], extra_manifest: &str) -> String {
        let manifest: String = items
            .iter()
            .map(|(id, href)| {
                format!(
                    r#"<item id="{}" href="{}" media-type="application/xhtml+xml"/>"#,
                    id, href
                )
            })
            .collect();
        let spine: String = spine
            .iter()
            .map(|id| format!(r#"<itemref idref="{}"/>"#, id))
            .collect();
        format!(
            r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test Book</dc:title>
    <dc:creator>Ann Author</dc:creator>
  </metadata>
  <manifest>{}{}</manifest>
  <spine>{}</spine>
</package>"#,
            manifest, extra_manifest, spine
        )
    }

    /// Archive with mimetype, container and the given OEBPS-relative files.
    pub(crate) fn epub(opf: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let paths: Vec<String> = files.iter().map(|(p, _)| format!("OEBPS/{}", p)).collect();
        let mut entries: Vec<(&str, &[u8], bool)> = vec![
            ("mimetype", b"application/epub+zip".as_slice(), false),
            ("META-INF/container.xml", CONTAINER.as_bytes(), true),
            ("OEBPS/content.opf", opf.as_bytes(), true),
        ];
        for (path, (_, body)) in paths.iter().zip(files) {
            entries.push((path.as_str(), body.as_bytes(), true));
        }
        build_zip(&entries)
    }
}
