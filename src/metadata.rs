//! Package metadata parser using quick-xml SAX-style parsing
//!
//! Parses container.xml to find the OPF package file,
//! then extracts metadata and manifest from the OPF.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{ErrorKind, ParseError};

/// Maximum number of manifest items
const MAX_MANIFEST_ITEMS: usize = 4096;

/// Joiner for multiple `dc:creator` entries
const AUTHOR_SEPARATOR: &str = ", ";

/// A single item in the package manifest (id -> href mapping)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestItem {
    /// Resource identifier
    pub id: String,
    /// Path relative to OPF
    pub href: String,
    /// MIME type
    pub media_type: String,
    /// Optional properties (e.g. "cover-image", "nav")
    pub properties: Option<String>,
}

impl ManifestItem {
    /// Whether the space-separated `properties` list contains `prop`.
    pub fn has_property(&self, prop: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|p| p.split_whitespace().any(|p| p == prop))
    }

    /// Whether this item is an NCX navigation document.
    pub fn is_ncx(&self) -> bool {
        self.media_type == "application/x-dtbncx+xml"
            || self.href.to_ascii_lowercase().ends_with(".ncx")
    }
}

/// Package metadata extracted from content.opf
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EpubMetadata {
    /// Book title (first `dc:title`), empty when absent
    pub title: String,
    /// All `dc:creator` values in document order
    pub authors: Vec<String>,
    /// Language code (e.g. "en")
    pub language: Option<String>,
    /// Unique identifier (dc:identifier), ISBN, UUID, etc.
    pub identifier: Option<String>,
    /// Publisher (dc:publisher)
    pub publisher: Option<String>,
    /// Publication date (dc:date)
    pub date: Option<String>,
    /// Book description (dc:description)
    pub description: Option<String>,
    /// All resources declared in the manifest
    pub manifest: Vec<ManifestItem>,
    /// Manifest ID of the cover image, if any
    pub cover_id: Option<String>,
}

impl EpubMetadata {
    /// Create empty metadata structure
    pub fn new() -> Self {
        Self::default()
    }

    /// Creators joined with `", "`, empty when there are none.
    pub fn author(&self) -> String {
        self.authors.join(AUTHOR_SEPARATOR)
    }

    /// Get manifest item by id
    pub fn get_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }
}

/// Element name without namespace prefix.
pub(crate) fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Collect `(local-name, unescaped value)` pairs for an element.
///
/// Malformed attributes are skipped rather than failing the element.
pub(crate) fn attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value).into_owned();
            let value = match quick_xml::escape::unescape(&raw) {
                Ok(v) => v.into_owned(),
                Err(_) => raw,
            };
            (key, value)
        })
        .collect()
}

/// Resolve a general entity reference (`&name;`): HTML5 named entities,
/// then numeric character references. Unknown names are kept literally.
pub(crate) fn resolve_entity(name: &str) -> String {
    if let Some(resolved) = quick_xml::escape::resolve_html5_entity(name) {
        return resolved.to_string();
    }
    let entity = format!("&{};", name);
    match quick_xml::escape::unescape(&entity) {
        Ok(resolved) => resolved.into_owned(),
        Err(_) => entity,
    }
}

/// Parse container.xml to find the OPF package file path
///
/// Returns the first non-empty `full-path` attribute of a `rootfile`
/// element. Malformed XML is `MissingDescriptor`; a well-formed descriptor
/// with no usable path is `MissingPackagePath`.
pub fn parse_container_xml(content: &[u8]) -> Result<String, ParseError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut opf_path: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if opf_path.is_none() && local_name(&e) == "rootfile" {
                    opf_path = attributes(&e)
                        .into_iter()
                        .find(|(k, v)| k == "full-path" && !v.trim().is_empty())
                        .map(|(_, v)| v.trim().to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::new(
                    ErrorKind::MissingDescriptor,
                    format!("descriptor unreadable: {}", e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    opf_path.ok_or_else(|| {
        ParseError::new(
            ErrorKind::MissingPackagePath,
            "container.xml names no rootfile full-path",
        )
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DcField {
    Title,
    Creator,
    Language,
    Identifier,
    Publisher,
    Date,
    Description,
}

impl DcField {
    fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "title" => DcField::Title,
            "creator" => DcField::Creator,
            "language" => DcField::Language,
            "identifier" => DcField::Identifier,
            "publisher" => DcField::Publisher,
            "date" => DcField::Date,
            "description" => DcField::Description,
            _ => return None,
        })
    }
}

/// Parse content.opf to extract metadata and manifest
///
/// Element names are matched on their local name so `dc:title`,
/// `opf:title` and a default-namespaced `title` are treated alike.
pub fn parse_opf(content: &[u8]) -> Result<EpubMetadata, ParseError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut metadata = EpubMetadata::new();

    let mut in_metadata = false;
    let mut in_manifest = false;
    let mut current_field: Option<DcField> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "metadata" => in_metadata = true,
                    "manifest" => in_manifest = true,
                    "item" if in_manifest => push_manifest_item(&mut metadata, &e),
                    "meta" if in_metadata => apply_cover_meta(&mut metadata, &e),
                    _ if in_metadata => {
                        current_field = DcField::from_local_name(&name);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => match local_name(&e).as_str() {
                "item" if in_manifest => push_manifest_item(&mut metadata, &e),
                "meta" if in_metadata => apply_cover_meta(&mut metadata, &e),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if current_field.is_some() {
                    let decoded = e.decode().map_err(|err| opf_error("decode error", err))?;
                    text.push_str(&decoded);
                }
            }
            Ok(Event::CData(e)) => {
                if current_field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_field.is_some() {
                    let name = e.decode().map_err(|err| opf_error("decode error", err))?;
                    text.push_str(&resolve_entity(&name));
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "metadata" => in_metadata = false,
                    "manifest" => in_manifest = false,
                    _ => {}
                }
                if let Some(field) = current_field.take() {
                    store_field(&mut metadata, field, &text);
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(opf_error("XML parse error", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(metadata)
}

fn opf_error(context: &str, err: impl core::fmt::Display) -> ParseError {
    ParseError::new(
        ErrorKind::UnreadablePackageFile,
        format!("package document {}: {}", context, err),
    )
}

fn store_field(metadata: &mut EpubMetadata, field: DcField, raw: &str) {
    let value = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if value.is_empty() {
        return;
    }
    match field {
        // First title wins; later ones are subtitles or collection names.
        DcField::Title => {
            if metadata.title.is_empty() {
                metadata.title = value;
            }
        }
        DcField::Creator => metadata.authors.push(value),
        DcField::Language => {
            metadata.language.get_or_insert(value);
        }
        DcField::Identifier => {
            metadata.identifier.get_or_insert(value);
        }
        DcField::Publisher => {
            metadata.publisher.get_or_insert(value);
        }
        DcField::Date => {
            metadata.date.get_or_insert(value);
        }
        DcField::Description => {
            metadata.description.get_or_insert(value);
        }
    }
}

fn push_manifest_item(metadata: &mut EpubMetadata, e: &BytesStart<'_>) {
    if metadata.manifest.len() >= MAX_MANIFEST_ITEMS {
        return;
    }
    let Some(item) = parse_manifest_item(e) else {
        log::debug!("Skipping manifest item without id, href or media-type");
        return;
    };
    if item.has_property("cover-image") {
        metadata.cover_id = Some(item.id.clone());
    }
    metadata.manifest.push(item);
}

/// EPUB 2 `<meta name="cover" content="...">`
fn apply_cover_meta(metadata: &mut EpubMetadata, e: &BytesStart<'_>) {
    let attrs = attributes(e);
    let is_cover = attrs.iter().any(|(k, v)| k == "name" && v == "cover");
    if !is_cover || metadata.cover_id.is_some() {
        return;
    }
    if let Some((_, content)) = attrs.into_iter().find(|(k, _)| k == "content") {
        metadata.cover_id = Some(content);
    }
}

/// Parse a manifest item from XML element attributes
fn parse_manifest_item(e: &BytesStart<'_>) -> Option<ManifestItem> {
    let mut id = None;
    let mut href = None;
    let mut media_type = None;
    let mut properties = None;

    for (key, value) in attributes(e) {
        match key.as_str() {
            "id" => id = Some(value),
            "href" => href = Some(value),
            "media-type" => media_type = Some(value),
            "properties" => properties = Some(value),
            _ => {}
        }
    }

    Some(ManifestItem {
        id: id?,
        href: href?,
        media_type: media_type?,
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml() {
        let container = br#"<?xml version="1.0"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container" version="1.0">
   <rootfiles>
      <rootfile full-path="EPUB/package.opf" media-type="application/oebps-package+xml"/>
   </rootfiles>
</container>"#;

        let result = parse_container_xml(container).unwrap();
        assert_eq!(result, "EPUB/package.opf");
    }

    #[test]
    fn test_parse_container_xml_skips_empty_full_path() {
        let container = br#"<container><rootfiles>
      <rootfile full-path="" media-type="application/oebps-package+xml"/>
      <rootfile full-path="OPS/book.opf" media-type="application/oebps-package+xml"/>
   </rootfiles></container>"#;
        assert_eq!(parse_container_xml(container).unwrap(), "OPS/book.opf");
    }

    #[test]
    fn test_parse_container_xml_without_rootfile() {
        let container = br#"<container><rootfiles/></container>"#;
        let err = parse_container_xml(container).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingPackagePath);
    }

    #[test]
    fn test_parse_container_xml_malformed() {
        let container = br#"<container><rootfiles><rootfile full-path="a.opf"/></wrong></container>"#;
        let err = parse_container_xml(container).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingDescriptor);
    }

    #[test]
    fn test_parse_opf_basic() {
        let opf = br#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test Book</dc:title>
    <dc:creator>Test Author</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="cover" href="cover.xhtml" media-type="application/xhtml+xml"/>
    <item id="chapter1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
</package>"#;

        let metadata = parse_opf(opf).unwrap();
        assert_eq!(metadata.title, "Test Book");
        assert_eq!(metadata.author(), "Test Author");
        assert_eq!(metadata.language.as_deref(), Some("en"));
        assert_eq!(metadata.manifest.len(), 2);
        assert_eq!(metadata.manifest[0].id, "cover");
        assert_eq!(metadata.manifest[1].href, "chapter1.xhtml");
    }

    #[test]
    fn test_parse_opf_multiple_creators_joined() {
        let opf = br#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Good Omens</dc:title>
    <dc:creator>Terry Pratchett</dc:creator>
    <dc:creator>Neil Gaiman</dc:creator>
  </metadata><manifest/></package>"#;

        let metadata = parse_opf(opf).unwrap();
        assert_eq!(metadata.authors.len(), 2);
        assert_eq!(metadata.author(), "Terry Pratchett, Neil Gaiman");
    }

    #[test]
    fn test_parse_opf_first_title_wins() {
        let opf = br#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Main Title</dc:title>
    <dc:title>A Subtitle</dc:title>
  </metadata><manifest/></package>"#;
        assert_eq!(parse_opf(opf).unwrap().title, "Main Title");
    }

    #[test]
    fn test_parse_opf_resolves_entities_in_title() {
        let opf = br#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Pride &amp; Prejudice</dc:title>
    <dc:creator>Jane &#65;usten</dc:creator>
  </metadata><manifest/></package>"#;
        let metadata = parse_opf(opf).unwrap();
        assert_eq!(metadata.title, "Pride & Prejudice");
        assert_eq!(metadata.author(), "Jane Austen");
    }

    #[test]
    fn test_parse_opf_prefixed_package_namespace() {
        let opf = br#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf">
  <opf:metadata><dc:title xmlns:dc="http://purl.org/dc/elements/1.1/">Prefixed</dc:title></opf:metadata>
  <opf:manifest>
    <opf:item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
  </opf:manifest>
</opf:package>"#;
        let metadata = parse_opf(opf).unwrap();
        assert_eq!(metadata.title, "Prefixed");
        assert_eq!(metadata.manifest.len(), 1);
    }

    #[test]
    fn test_parse_opf_with_cover() {
        let opf = br#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Book with Cover</dc:title>
    <meta name="cover" content="cover-image"/>
  </metadata>
  <manifest>
    <item id="cover-image" href="images/cover.jpg" media-type="image/jpeg" properties="cover-image"/>
  </manifest>
</package>"#;

        let metadata = parse_opf(opf).unwrap();
        assert_eq!(metadata.title, "Book with Cover");
        assert_eq!(metadata.cover_id, Some("cover-image".to_string()));
        assert_eq!(
            metadata
                .cover_id
                .as_deref()
                .and_then(|id| metadata.get_item(id))
                .map(|i| i.href.as_str()),
            Some("images/cover.jpg")
        );
    }

    #[test]
    fn test_get_item() {
        let mut metadata = EpubMetadata::new();
        metadata.manifest.push(ManifestItem {
            id: "item1".to_string(),
            href: "chapter1.xhtml".to_string(),
            media_type: "application/xhtml+xml".to_string(),
            properties: None,
        });

        let item = metadata.get_item("item1");
        assert!(item.is_some());
        assert_eq!(item.unwrap().href, "chapter1.xhtml");

        assert!(metadata.get_item("nonexistent").is_none());
    }

    #[test]
    fn test_manifest_item_properties() {
        let item = ManifestItem {
            id: "nav".into(),
            href: "nav.xhtml".into(),
            media_type: "application/xhtml+xml".into(),
            properties: Some("scripted nav".into()),
        };
        assert!(item.has_property("nav"));
        assert!(!item.has_property("na"));
        assert!(!item.is_ncx());
    }

    #[test]
    fn test_parse_opf_skips_incomplete_items() {
        let opf = br#"<package><manifest>
    <item id="a" href="a.xhtml"/>
    <item id="b" href="b.xhtml" media-type="application/xhtml+xml"/>
  </manifest></package>"#;
        let metadata = parse_opf(opf).unwrap();
        assert_eq!(metadata.manifest.len(), 1);
        assert_eq!(metadata.manifest[0].id, "b");
    }

    #[test]
    fn test_parse_opf_empty_optional_fields() {
        let opf = br#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Minimal</dc:title>
  </metadata><manifest/></package>"#;

        let metadata = parse_opf(opf).unwrap();
        assert!(metadata.authors.is_empty());
        assert_eq!(metadata.author(), "");
        assert!(metadata.publisher.is_none());
        assert!(metadata.date.is_none());
        assert!(metadata.description.is_none());
        assert!(metadata.identifier.is_none());
    }

    #[test]
    fn test_parse_opf_all_dublin_core_fields() {
        let opf = br#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Complete</dc:title>
    <dc:identifier>urn:isbn:9780000000000</dc:identifier>
    <dc:publisher>Acme Publishing</dc:publisher>
    <dc:date>2024-01-15</dc:date>
    <dc:description>A fascinating
        story about testing parsers.</dc:description>
  </metadata><manifest/></package>"#;

        let metadata = parse_opf(opf).unwrap();
        assert_eq!(metadata.identifier.as_deref(), Some("urn:isbn:9780000000000"));
        assert_eq!(metadata.publisher.as_deref(), Some("Acme Publishing"));
        assert_eq!(metadata.date.as_deref(), Some("2024-01-15"));
        assert_eq!(
            metadata.description.as_deref(),
            Some("A fascinating story about testing parsers.")
        );
    }

    #[test]
    fn test_parse_opf_malformed_is_unreadable() {
        let opf = br#"<package><metadata><dc:title>Broken</dc:creator></metadata></package>"#;
        let err = parse_opf(opf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadablePackageFile);
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp"), "&");
        assert_eq!(resolve_entity("#8217"), "\u{2019}");
        assert_eq!(resolve_entity("nbsp"), "\u{a0}");
        assert_eq!(resolve_entity("hellip"), "\u{2026}");
        assert_eq!(resolve_entity("eacute"), "\u{e9}");
        assert_eq!(resolve_entity("copy"), "\u{a9}");
        assert_eq!(resolve_entity("bogus"), "&bogus;");
    }
}
