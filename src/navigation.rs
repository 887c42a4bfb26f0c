//! Navigation document parsing (table of contents)
//!
//! Supports both EPUB 3.x XHTML navigation documents (`epub:type="toc"`)
//! and EPUB 2.0 NCX fallback (`toc.ncx`). Only the table of contents is
//! kept; page lists and landmarks carry no chapter titles.
//!
//! # Usage
//!
//! ```rust
//! use chapterkit::navigation::parse_nav_xhtml;
//!
//! let nav = parse_nav_xhtml(br#"<html><body><nav epub:type="toc"><ol>
//!   <li><a href="ch1.xhtml">One</a></li>
//! </ol></nav></body></html>"#).unwrap();
//! assert_eq!(nav.toc[0].label, "One");
//! ```

use std::collections::HashSet;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{ErrorKind, ParseError};
use crate::metadata::{attributes, local_name, resolve_entity};

/// Outline nesting kept while parsing; deeper entries are ignored.
pub const MAX_NAV_NESTING: usize = 64;

/// A single navigation point (table of contents entry)
///
/// Navigation points can be nested to represent hierarchical structures
/// (e.g., parts containing chapters).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavPoint {
    /// Display label for this navigation point
    pub label: String,
    /// Content href (relative to the navigation document, possibly with fragment)
    pub href: String,
    /// Child navigation points
    pub children: Vec<NavPoint>,
}

/// A navigation point with its depth, produced by [`Navigation::flatten`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatNavEntry<'a> {
    /// 0 for top-level entries
    pub depth: usize,
    /// Entry label
    pub label: &'a str,
    /// Entry href as written in the navigation document
    pub href: &'a str,
}

/// Parsed table of contents
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Navigation {
    /// Table of contents entries
    pub toc: Vec<NavPoint>,
}

impl Navigation {
    /// Create an empty navigation structure
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total number of TOC entries (including nested)
    pub fn toc_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&NavPoint> = self.toc.iter().collect();
        while let Some(point) = stack.pop() {
            count += 1;
            stack.extend(point.children.iter());
        }
        count
    }

    /// Flatten the TOC in document order.
    ///
    /// Traversal uses an explicit work stack. Entries deeper than `max_depth`
    /// are dropped with their subtrees, and an href seen before is not
    /// emitted again. Entries with an empty href are skipped but their
    /// children are still visited.
    pub fn flatten(&self, max_depth: usize) -> Vec<FlatNavEntry<'_>> {
        let mut out = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(usize, &NavPoint)> = self.toc.iter().rev().map(|p| (0, p)).collect();

        while let Some((depth, point)) = stack.pop() {
            if depth > max_depth {
                log::debug!(
                    "Navigation entry '{}' exceeds depth bound {}",
                    point.label,
                    max_depth
                );
                continue;
            }
            if !point.href.is_empty() && visited.insert(point.href.as_str()) {
                out.push(FlatNavEntry {
                    depth,
                    label: point.label.as_str(),
                    href: point.href.as_str(),
                });
            }
            stack.extend(point.children.iter().rev().map(|c| (depth + 1, c)));
        }
        out
    }
}

/// Partial nav point being built during parsing
#[derive(Default)]
struct PartialNavPoint {
    href: Option<String>,
    label: String,
    children: Vec<NavPoint>,
}

impl PartialNavPoint {
    fn into_nav_point(self) -> Option<NavPoint> {
        let label = normalize_label(&self.label);
        let href = self.href.unwrap_or_default();
        // Heading-only items (`<li><span>Part I</span><ol>..`) keep their children.
        if href.is_empty() && self.children.is_empty() {
            return None;
        }
        Some(NavPoint {
            label,
            href,
            children: self.children,
        })
    }
}

fn normalize_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn nav_error(context: &str, err: impl core::fmt::Display) -> ParseError {
    ParseError::new(
        ErrorKind::ResourceUnreadable,
        format!("{}: {}", context, err),
    )
}

/// Which `<nav>` the parser is inside
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NavKind {
    Toc,
    /// `<nav>` without a recognised `epub:type`
    Untyped,
    /// page-list, landmarks and other non-TOC navs
    Other,
}

impl NavKind {
    fn from_type_attr(value: Option<&str>) -> Self {
        match value {
            None => NavKind::Untyped,
            Some(v) if v.split_whitespace().any(|t| t == "toc") => NavKind::Toc,
            Some(_) => NavKind::Other,
        }
    }
}

/// Parse an EPUB 3.x XHTML navigation document
///
/// Extracts the TOC from nested `<ol>/<li>/<a>` structures inside the
/// `<nav epub:type="toc">` element. When no nav is typed as a TOC, the first
/// untyped `<nav>` is used instead.
pub fn parse_nav_xhtml(content: &[u8]) -> Result<Navigation, ParseError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    let mut buf = Vec::new();

    let mut current: Option<NavKind> = None;
    let mut item_stack: Vec<PartialNavPoint> = Vec::new();
    let mut results: Vec<NavPoint> = Vec::new();
    let mut label_depth = 0usize;
    // Open `<li>` elements below the nesting bound
    let mut ignored = 0usize;

    let mut toc: Option<Vec<NavPoint>> = None;
    let mut untyped: Option<Vec<NavPoint>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "nav" if current.is_none() => {
                        let type_attr = attributes(&e)
                            .into_iter()
                            .find(|(k, _)| k == "type")
                            .map(|(_, v)| v);
                        current = Some(NavKind::from_type_attr(type_attr.as_deref()));
                        results.clear();
                        item_stack.clear();
                        ignored = 0;
                    }
                    "li" if current.is_some() => {
                        if ignored > 0 || item_stack.len() >= MAX_NAV_NESTING {
                            if ignored == 0 {
                                log::debug!(
                                    "Navigation outline nested deeper than {}; ignoring",
                                    MAX_NAV_NESTING
                                );
                            }
                            ignored += 1;
                        } else {
                            item_stack.push(PartialNavPoint::default());
                        }
                    }
                    "a" | "span" if current.is_some() => {
                        label_depth += 1;
                        if name == "a" && ignored == 0 {
                            if let Some(item) = item_stack.last_mut() {
                                item.href = attributes(&e)
                                    .into_iter()
                                    .find(|(k, _)| k == "href")
                                    .map(|(_, v)| v);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                // Self-closing <a href="..."/> (rare but valid)
                if current.is_some() && ignored == 0 && local_name(&e) == "a" {
                    if let Some(item) = item_stack.last_mut() {
                        item.href = attributes(&e)
                            .into_iter()
                            .find(|(k, _)| k == "href")
                            .map(|(_, v)| v);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if label_depth > 0 && ignored == 0 {
                    let text = e.decode().map_err(|err| nav_error("nav decode error", err))?;
                    if let Some(item) = item_stack.last_mut() {
                        item.label.push_str(&text);
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if label_depth > 0 && ignored == 0 {
                    let name = e.decode().map_err(|err| nav_error("nav decode error", err))?;
                    if let Some(item) = item_stack.last_mut() {
                        item.label.push_str(&resolve_entity(&name));
                    }
                }
            }
            Ok(Event::End(e)) => {
                let Some(kind) = current else {
                    buf.clear();
                    continue;
                };
                match e.local_name().as_ref() {
                    b"a" | b"span" => {
                        label_depth = label_depth.saturating_sub(1);
                        // Separate text segments from sibling inline elements.
                        if ignored == 0 {
                            if let Some(item) = item_stack.last_mut() {
                                item.label.push(' ');
                            }
                        }
                    }
                    b"li" if ignored > 0 => ignored -= 1,
                    b"li" => {
                        if let Some(point) = item_stack.pop().and_then(|p| p.into_nav_point()) {
                            match item_stack.last_mut() {
                                Some(parent) => parent.children.push(point),
                                None => results.push(point),
                            }
                        }
                    }
                    b"nav" => {
                        let completed = core::mem::take(&mut results);
                        match kind {
                            NavKind::Toc if toc.is_none() => toc = Some(completed),
                            NavKind::Untyped if untyped.is_none() => untyped = Some(completed),
                            _ => {}
                        }
                        current = None;
                        item_stack.clear();
                        label_depth = 0;
                        ignored = 0;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(nav_error("nav XML parse error", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(Navigation {
        toc: toc.or(untyped).unwrap_or_default(),
    })
}

/// Parse an EPUB 2.0 NCX navigation document
///
/// Extracts the navigation map (`<navMap>`) from the NCX XML.
pub fn parse_ncx(content: &[u8]) -> Result<Navigation, ParseError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(false);

    let mut nav = Navigation::new();
    let mut buf = Vec::new();

    let mut in_nav_map = false;
    let mut nav_point_stack: Vec<PartialNavPoint> = Vec::new();
    let mut in_text = false;
    // Open navPoints below the nesting bound
    let mut ignored = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf);
        let self_closing = matches!(event, Ok(Event::Empty(_)));
        match event {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match local_name(&e).as_str() {
                "navMap" => in_nav_map = !self_closing,
                "navPoint" if in_nav_map && !self_closing => {
                    if ignored > 0 || nav_point_stack.len() >= MAX_NAV_NESTING {
                        if ignored == 0 {
                            log::debug!(
                                "NCX navMap nested deeper than {}; ignoring",
                                MAX_NAV_NESTING
                            );
                        }
                        ignored += 1;
                    } else {
                        nav_point_stack.push(PartialNavPoint::default());
                    }
                }
                "text" => in_text = !self_closing,
                "content" if ignored == 0 => {
                    if let Some(point) = nav_point_stack.last_mut() {
                        // First <content> wins over nested navPoints' content.
                        if point.href.is_none() {
                            point.href = attributes(&e)
                                .into_iter()
                                .find(|(k, _)| k == "src")
                                .map(|(_, v)| v);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text && ignored == 0 {
                    let text = e.decode().map_err(|err| nav_error("NCX decode error", err))?;
                    if let Some(point) = nav_point_stack.last_mut() {
                        point.label.push_str(&text);
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && ignored == 0 {
                    let name = e.decode().map_err(|err| nav_error("NCX decode error", err))?;
                    if let Some(point) = nav_point_stack.last_mut() {
                        point.label.push_str(&resolve_entity(&name));
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"text" => in_text = false,
                b"navPoint" if ignored > 0 => ignored -= 1,
                b"navPoint" => {
                    if let Some(point) = nav_point_stack.pop().and_then(|p| p.into_nav_point()) {
                        match nav_point_stack.last_mut() {
                            Some(parent) => parent.children.push(point),
                            None => nav.toc.push(point),
                        }
                    }
                }
                b"navMap" => in_nav_map = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(nav_error("NCX parse error", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(nav)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(label: &str, href: &str, children: Vec<NavPoint>) -> NavPoint {
        NavPoint {
            label: label.into(),
            href: href.into(),
            children,
        }
    }

    #[test]
    fn test_navigation_default() {
        let nav = Navigation::new();
        assert!(nav.toc.is_empty());
        assert_eq!(nav.toc_count(), 0);
        assert!(nav.flatten(16).is_empty());
    }

    #[test]
    fn test_navigation_toc_count() {
        let nav = Navigation {
            toc: vec![
                point("Ch 1", "ch1.xhtml", vec![point("Sec 1.1", "ch1.xhtml#s1", vec![])]),
                point("Ch 2", "ch2.xhtml", vec![]),
            ],
        };
        assert!(!nav.toc.is_empty());
        assert_eq!(nav.toc_count(), 3);
    }

    #[test]
    fn test_flatten_preorder_with_depth() {
        let nav = Navigation {
            toc: vec![
                point("Part I", "part1.xhtml", vec![
                    point("Ch 1", "ch1.xhtml", vec![]),
                    point("Ch 2", "ch2.xhtml", vec![]),
                ]),
                point("Ch 3", "ch3.xhtml", vec![]),
            ],
        };
        let flat = nav.flatten(16);
        let labels: Vec<(usize, &str)> = flat.iter().map(|e| (e.depth, e.label)).collect();
        assert_eq!(
            labels,
            vec![(0, "Part I"), (1, "Ch 1"), (1, "Ch 2"), (0, "Ch 3")]
        );
    }

    #[test]
    fn test_flatten_depth_bound_drops_subtree() {
        let nav = Navigation {
            toc: vec![point("A", "a.xhtml", vec![point("B", "b.xhtml", vec![
                point("C", "c.xhtml", vec![]),
            ])])],
        };
        let flat = nav.flatten(1);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].label, "B");
    }

    #[test]
    fn test_flatten_skips_repeated_hrefs() {
        let nav = Navigation {
            toc: vec![
                point("First", "ch1.xhtml", vec![]),
                point("Again", "ch1.xhtml", vec![]),
            ],
        };
        let flat = nav.flatten(16);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].label, "First");
    }

    #[test]
    fn test_flatten_visits_children_of_hrefless_entry() {
        let nav = Navigation {
            toc: vec![point("Part One", "", vec![point("Ch 1", "ch1.xhtml", vec![])])],
        };
        let flat = nav.flatten(16);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].depth, 1);
    }

    #[test]
    fn test_flatten_deep_outline_without_recursion() {
        let mut node = point("leaf", "leaf.xhtml", vec![]);
        for i in 0..5_000 {
            node = point(&format!("n{}", i), &format!("n{}.xhtml", i), vec![node]);
        }
        let nav = Navigation { toc: vec![node] };
        assert_eq!(nav.flatten(16).len(), 17);
    }

    #[test]
    fn test_parse_nav_xhtml_basic_toc() {
        let nav_xhtml = br#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
<nav epub:type="toc">
  <ol>
    <li><a href="chapter1.xhtml">Chapter 1</a></li>
    <li><a href="chapter2.xhtml">Chapter 2</a></li>
    <li><a href="chapter3.xhtml">Chapter 3</a></li>
  </ol>
</nav>
</body>
</html>"#;

        let nav = parse_nav_xhtml(nav_xhtml).unwrap();
        assert_eq!(nav.toc.len(), 3);
        assert_eq!(nav.toc[0].label, "Chapter 1");
        assert_eq!(nav.toc[2].href, "chapter3.xhtml");
    }

    #[test]
    fn test_parse_nav_xhtml_nested_toc() {
        let nav_xhtml = br#"<html><body><nav epub:type="toc"><ol>
  <li><a href="part1.xhtml">Part One</a>
    <ol>
      <li><a href="ch1.xhtml">The Beginning</a></li>
      <li><a href="ch2.xhtml">The Middle</a></li>
    </ol>
  </li>
</ol></nav></body></html>"#;

        let nav = parse_nav_xhtml(nav_xhtml).unwrap();
        assert_eq!(nav.toc.len(), 1);
        assert_eq!(nav.toc[0].children.len(), 2);
        assert_eq!(nav.toc[0].children[1].label, "The Middle");
    }

    #[test]
    fn test_parse_nav_xhtml_ignores_landmarks_and_page_list() {
        let nav_xhtml = br#"<html><body>
<nav epub:type="landmarks"><ol><li><a href="cover.xhtml">Cover</a></li></ol></nav>
<nav epub:type="toc"><ol><li><a href="ch1.xhtml">One</a></li></ol></nav>
<nav epub:type="page-list"><ol><li><a href="ch1.xhtml#p1">1</a></li></ol></nav>
</body></html>"#;

        let nav = parse_nav_xhtml(nav_xhtml).unwrap();
        assert_eq!(nav.toc.len(), 1);
        assert_eq!(nav.toc[0].label, "One");
    }

    #[test]
    fn test_parse_nav_xhtml_untyped_nav_fallback() {
        let nav_xhtml = br#"<html><body><nav><ol>
  <li><a href="a.xhtml">A</a></li>
</ol></nav></body></html>"#;
        let nav = parse_nav_xhtml(nav_xhtml).unwrap();
        assert_eq!(nav.toc.len(), 1);
    }

    #[test]
    fn test_parse_nav_xhtml_span_heading_keeps_children() {
        let nav_xhtml = br#"<html><body><nav epub:type="toc"><ol>
  <li><span>Part I</span><ol><li><a href="ch1.xhtml">One</a></li></ol></li>
</ol></nav></body></html>"#;
        let nav = parse_nav_xhtml(nav_xhtml).unwrap();
        assert_eq!(nav.toc[0].label, "Part I");
        assert_eq!(nav.toc[0].href, "");
        assert_eq!(nav.toc[0].children[0].href, "ch1.xhtml");
    }

    #[test]
    fn test_parse_nav_xhtml_formatted_label() {
        let nav_xhtml = br#"<html><body><nav epub:type="toc"><ol>
  <li><a href="ch1.xhtml">Part <em>One</em> &amp; Two</a></li>
</ol></nav></body></html>"#;
        let nav = parse_nav_xhtml(nav_xhtml).unwrap();
        assert_eq!(nav.toc[0].label, "Part One & Two");
    }

    #[test]
    fn test_parse_nav_xhtml_empty() {
        let nav = parse_nav_xhtml(b"<html><body><p>No nav here</p></body></html>").unwrap();
        assert!(nav.toc.is_empty());
    }

    fn outline_depth(points: &[NavPoint]) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(usize, &NavPoint)> = points.iter().map(|p| (1, p)).collect();
        while let Some((depth, point)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(point.children.iter().map(|c| (depth + 1, c)));
        }
        deepest
    }

    #[test]
    fn test_parse_nav_xhtml_deep_nesting_is_bounded() {
        let levels = 50_000;
        let mut markup = String::from(r#"<html><body><nav epub:type="toc"><ol>"#);
        for i in 0..levels {
            markup.push_str(&format!(r#"<li><a href="n{}.xhtml">x</a><ol>"#, i));
        }
        for _ in 0..levels {
            markup.push_str("</ol></li>");
        }
        markup.push_str(r#"</ol></nav></body></html>"#);

        let nav = parse_nav_xhtml(markup.as_bytes()).unwrap();
        assert_eq!(nav.toc.len(), 1);
        assert_eq!(outline_depth(&nav.toc), MAX_NAV_NESTING);
        assert_eq!(nav.toc_count(), MAX_NAV_NESTING);
        assert_eq!(nav.toc[0].href, "n0.xhtml");
    }

    #[test]
    fn test_parse_nav_xhtml_siblings_after_deep_branch_survive() {
        let mut markup = String::from(r#"<html><body><nav epub:type="toc"><ol>"#);
        for _ in 0..MAX_NAV_NESTING + 10 {
            markup.push_str(r#"<li><a href="deep.xhtml">deep</a><ol>"#);
        }
        for _ in 0..MAX_NAV_NESTING + 10 {
            markup.push_str("</ol></li>");
        }
        markup.push_str(r#"<li><a href="next.xhtml">Next</a></li></ol></nav></body></html>"#);

        let nav = parse_nav_xhtml(markup.as_bytes()).unwrap();
        assert_eq!(nav.toc.len(), 2);
        assert_eq!(nav.toc[1].label, "Next");
        assert_eq!(nav.toc[0].label, "deep");
    }

    #[test]
    fn test_parse_nav_xhtml_malformed() {
        let err = parse_nav_xhtml(b"<html><body><nav epub:type=\"toc\"><ol><li><a href=\"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnreadable);
    }

    #[test]
    fn test_parse_ncx_basic() {
        let ncx = br#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="np1" playOrder="1">
      <navLabel><text>Chapter 1</text></navLabel>
      <content src="chapter1.xhtml"/>
    </navPoint>
    <navPoint id="np2" playOrder="2">
      <navLabel><text>Chapter 2</text></navLabel>
      <content src="chapter2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

        let nav = parse_ncx(ncx).unwrap();
        assert_eq!(nav.toc.len(), 2);
        assert_eq!(nav.toc[0].label, "Chapter 1");
        assert_eq!(nav.toc[1].href, "chapter2.xhtml");
    }

    #[test]
    fn test_parse_ncx_nested() {
        let ncx = br#"<ncx><navMap>
  <navPoint id="p1">
    <navLabel><text>Part 1</text></navLabel>
    <content src="part1.xhtml"/>
    <navPoint id="c1">
      <navLabel><text>Chapter 1</text></navLabel>
      <content src="ch1.xhtml"/>
    </navPoint>
  </navPoint>
</navMap></ncx>"#;

        let nav = parse_ncx(ncx).unwrap();
        assert_eq!(nav.toc.len(), 1);
        assert_eq!(nav.toc[0].href, "part1.xhtml");
        assert_eq!(nav.toc[0].children[0].label, "Chapter 1");
    }

    #[test]
    fn test_parse_ncx_prefixed_and_entities() {
        let ncx = br#"<ncx:ncx xmlns:ncx="http://www.daisy.org/z3986/2005/ncx/"><ncx:navMap>
  <ncx:navPoint id="c1">
    <ncx:navLabel><ncx:text>Tom &amp; Jerry</ncx:text></ncx:navLabel>
    <ncx:content src="c1.xhtml"/>
  </ncx:navPoint>
</ncx:navMap></ncx:ncx>"#;
        let nav = parse_ncx(ncx).unwrap();
        assert_eq!(nav.toc[0].label, "Tom & Jerry");
    }

    #[test]
    fn test_parse_ncx_ignores_page_list() {
        let ncx = br#"<ncx><navMap>
  <navPoint id="c1"><navLabel><text>One</text></navLabel><content src="c1.xhtml"/></navPoint>
</navMap><pageList>
  <pageTarget id="p1"><navLabel><text>1</text></navLabel><content src="c1.xhtml#p1"/></pageTarget>
</pageList></ncx>"#;
        let nav = parse_ncx(ncx).unwrap();
        assert_eq!(nav.toc_count(), 1);
    }

    #[test]
    fn test_parse_ncx_deep_nesting_is_bounded() {
        let levels = 50_000;
        let mut ncx = String::from("<ncx><navMap>");
        for i in 0..levels {
            ncx.push_str(&format!(
                r#"<navPoint><navLabel><text>L{0}</text></navLabel><content src="n{0}.xhtml"/>"#,
                i
            ));
        }
        for _ in 0..levels {
            ncx.push_str("</navPoint>");
        }
        ncx.push_str("</navMap></ncx>");

        let nav = parse_ncx(ncx.as_bytes()).unwrap();
        assert_eq!(outline_depth(&nav.toc), MAX_NAV_NESTING);
        assert_eq!(nav.toc[0].label, "L0");
    }

    #[test]
    fn test_parse_ncx_self_closing_nav_point() {
        let ncx = br#"<ncx><navMap>
  <navPoint id="empty"/>
  <navPoint id="c1"><navLabel><text>One</text></navLabel><content src="c1.xhtml"/></navPoint>
</navMap></ncx>"#;
        let nav = parse_ncx(ncx).unwrap();
        assert_eq!(nav.toc.len(), 1);
        assert_eq!(nav.toc[0].label, "One");
    }

    #[test]
    fn test_parse_ncx_empty() {
        let nav = parse_ncx(b"<ncx><navMap/></ncx>").unwrap();
        assert!(nav.toc.is_empty());
    }
}
