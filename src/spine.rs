//! Spine parser
//!
//! The spine defines the reading order of content documents. This module
//! parses it from content.opf; resolving idrefs against the manifest is left
//! to [`crate::resolve`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{ErrorKind, ParseError};
use crate::metadata::{attributes, local_name};

/// Maximum number of spine items
const MAX_SPINE_ITEMS: usize = 4096;

/// A single item in the spine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpineItem {
    /// Manifest item this spine entry references
    pub idref: String,
    /// Optional spine-level ID
    pub id: Option<String>,
    /// Whether this item is part of the linear reading order
    pub linear: bool,
    /// Optional properties (e.g. "page-spread-left")
    pub properties: Option<String>,
}

/// Reading order of a package
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Spine {
    items: Vec<SpineItem>,
    /// Optional TOC item id (EPUB 2.0 NCX reference)
    toc_id: Option<String>,
}

impl Spine {
    /// Create a new empty spine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create spine from a list of manifest ids, all linear
    pub fn from_idrefs(idrefs: Vec<String>) -> Self {
        let items = idrefs
            .into_iter()
            .map(|idref| SpineItem {
                idref,
                id: None,
                linear: true,
                properties: None,
            })
            .collect();
        Self {
            items,
            toc_id: None,
        }
    }

    /// Ordered spine entries
    pub fn items(&self) -> &[SpineItem] {
        &self.items
    }

    /// The `toc` attribute of `<spine>`, if any
    pub fn toc_id(&self) -> Option<&str> {
        self.toc_id.as_deref()
    }

    /// Number of spine entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the spine has no entries
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parse spine from OPF content
///
/// Extracts the ordered list of itemrefs from the spine element.
/// Duplicate idrefs are kept; the chapter plan decides what to do with them.
pub fn parse_spine(content: &[u8]) -> Result<Spine, ParseError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut spine = Spine::new();
    let mut in_spine = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match local_name(&e).as_str() {
                "spine" => {
                    in_spine = true;
                    spine.toc_id = attributes(&e)
                        .into_iter()
                        .find(|(k, v)| k == "toc" && !v.is_empty())
                        .map(|(_, v)| v);
                }
                "itemref" if in_spine && spine.items.len() < MAX_SPINE_ITEMS => {
                    if let Some(item) = parse_spine_item(&e) {
                        spine.items.push(item);
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"spine" {
                    in_spine = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::new(
                    ErrorKind::UnreadablePackageFile,
                    format!("package spine XML parse error: {}", e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(spine)
}

/// Parse a spine itemref from XML element attributes
fn parse_spine_item(e: &BytesStart<'_>) -> Option<SpineItem> {
    let mut idref = None;
    let mut id = None;
    let mut linear = true;
    let mut properties = None;

    for (key, value) in attributes(e) {
        match key.as_str() {
            "idref" => idref = Some(value),
            "id" => id = Some(value),
            "linear" => linear = value.trim() != "no",
            "properties" => properties = Some(value),
            _ => {}
        }
    }

    idref.filter(|r| !r.is_empty()).map(|idref| SpineItem {
        idref,
        id,
        linear,
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idrefs(spine: &Spine) -> Vec<&str> {
        spine.items().iter().map(|item| item.idref.as_str()).collect()
    }

    #[test]
    fn test_parse_spine_basic() {
        let opf = br#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <spine>
    <itemref idref="cover"/>
    <itemref idref="chapter1"/>
    <itemref idref="chapter2"/>
  </spine>
</package>"#;

        let spine = parse_spine(opf).unwrap();
        assert_eq!(spine.len(), 3);
        assert_eq!(idrefs(&spine), vec!["cover", "chapter1", "chapter2"]);
    }

    #[test]
    fn test_parse_spine_toc_attribute() {
        let opf = br#"<package><spine toc="ncx"><itemref idref="c1"/></spine></package>"#;
        let spine = parse_spine(opf).unwrap();
        assert_eq!(spine.toc_id(), Some("ncx"));
    }

    #[test]
    fn test_parse_spine_empty_toc_attribute_ignored() {
        let opf = br#"<package><spine toc=""><itemref idref="c1"/></spine></package>"#;
        assert_eq!(parse_spine(opf).unwrap().toc_id(), None);
    }

    #[test]
    fn test_parse_spine_with_attributes() {
        let opf = br#"<package><spine>
    <itemref idref="c1" id="s1" properties="page-spread-left"/>
  </spine></package>"#;

        let spine = parse_spine(opf).unwrap();
        let item = &spine.items()[0];
        assert_eq!(item.idref, "c1");
        assert_eq!(item.id.as_deref(), Some("s1"));
        assert_eq!(item.properties.as_deref(), Some("page-spread-left"));
        assert!(item.linear);
    }

    #[test]
    fn test_parse_spine_linear_no() {
        let opf = br#"<package><spine>
    <itemref idref="c1"/>
    <itemref idref="notes" linear="no"/>
    <itemref idref="c2" linear="yes"/>
  </spine></package>"#;

        let spine = parse_spine(opf).unwrap();
        let linear: Vec<bool> = spine.items().iter().map(|i| i.linear).collect();
        assert_eq!(linear, vec![true, false, true]);
    }

    #[test]
    fn test_parse_spine_prefixed_elements() {
        let opf = br#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf">
  <opf:spine toc="ncx"><opf:itemref idref="a"/><opf:itemref idref="b"/></opf:spine>
</opf:package>"#;
        let spine = parse_spine(opf).unwrap();
        assert_eq!(idrefs(&spine), vec!["a", "b"]);
        assert_eq!(spine.toc_id(), Some("ncx"));
    }

    #[test]
    fn test_parse_spine_duplicate_idrefs() {
        let opf = br#"<package><spine>
    <itemref idref="c1"/><itemref idref="c1"/>
  </spine></package>"#;
        assert_eq!(parse_spine(opf).unwrap().len(), 2);
    }

    #[test]
    fn test_itemref_outside_spine_ignored() {
        let opf = br#"<package><guide><itemref idref="x"/></guide><spine/></package>"#;
        assert!(parse_spine(opf).unwrap().is_empty());
    }

    #[test]
    fn test_itemref_without_idref_skipped() {
        let opf = br#"<package><spine><itemref/><itemref idref="c1"/></spine></package>"#;
        assert_eq!(idrefs(&parse_spine(opf).unwrap()), vec!["c1"]);
    }

    #[test]
    fn test_from_idrefs_constructor() {
        let spine = Spine::from_idrefs(vec!["a".into(), "b".into()]);
        assert_eq!(spine.len(), 2);
        assert!(spine.items().iter().all(|i| i.linear));
        assert!(Spine::from_idrefs(Vec::new()).is_empty());
    }

    #[test]
    fn test_very_large_spine() {
        let mut opf = String::from("<package><spine>");
        for i in 0..500 {
            opf.push_str(&format!("<itemref idref=\"c{}\"/>", i));
        }
        opf.push_str("</spine></package>");
        let spine = parse_spine(opf.as_bytes()).unwrap();
        assert_eq!(spine.len(), 500);
        assert_eq!(spine.items()[499].idref, "c499");
    }
}
