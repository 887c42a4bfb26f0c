//! Chapter planning: reading order plus navigation titles.
//!
//! The plan always follows the spine. The navigation outline only supplies
//! titles and nesting depth; it never reorders chapters.

use std::collections::{HashMap, HashSet};

use percent_encoding::percent_decode_str;

use crate::metadata::{EpubMetadata, ManifestItem};
use crate::model::{ChapterDraft, ChapterSource};
use crate::navigation::{FlatNavEntry, Navigation};
use crate::spine::Spine;

/// Media types treated as content documents.
const MARKUP_MEDIA_TYPES: &[&str] = &[
    "application/xhtml+xml",
    "text/html",
    "application/x-dtbook+xml",
    "text/x-oeb1-document",
];

/// Whether `media_type` names a markup content document.
///
/// Comparison ignores ASCII case and any `;`-parameters.
pub fn is_markup_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or("").trim();
    MARKUP_MEDIA_TYPES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(essence))
}

/// Resolve `href` against the directory of `base_file` into an archive path.
///
/// The href is percent-decoded, its fragment dropped and `.`/`..` segments
/// collapsed. A leading `/` is archive-absolute. URLs with a scheme are
/// returned unchanged.
pub fn resolve_relative_path(base_file: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    if href.contains("://") {
        return href.to_string();
    }
    let href = percent_decode_str(href).decode_utf8_lossy();
    if href.is_empty() {
        return normalize_path(base_file);
    }
    if let Some(absolute) = href.strip_prefix('/') {
        return normalize_path(absolute);
    }

    let base_dir = base_file.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    if base_dir.is_empty() {
        normalize_path(&href)
    } else {
        normalize_path(&format!("{}/{}", base_dir, href))
    }
}

fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// Locate the navigation document: spine `toc` id, then the manifest item
/// with the `nav` property, then any NCX item.
pub fn find_navigation_item<'a>(
    metadata: &'a EpubMetadata,
    spine: &Spine,
) -> Option<&'a ManifestItem> {
    spine
        .toc_id()
        .and_then(|toc_id| metadata.get_item(toc_id))
        .or_else(|| metadata.manifest.iter().find(|item| item.has_property("nav")))
        .or_else(|| metadata.manifest.iter().find(|item| item.is_ncx()))
}

/// The package's navigation document, whether or not it parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavDocument {
    /// Manifest id of the navigation document
    pub item_id: String,
    /// Archive path of the navigation document
    pub path: String,
    /// Parsed outline; `None` when reading or parsing failed
    pub navigation: Option<Navigation>,
}

/// A content document located in the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDocument {
    /// Manifest id
    pub id: String,
    /// Manifest href as written, relative to the package document
    pub href: String,
    /// Resolved archive path
    pub path: String,
}

impl ContentDocument {
    fn from_item(item: &ManifestItem, opf_path: &str) -> Self {
        Self {
            id: item.id.clone(),
            href: item.href.clone(),
            path: resolve_relative_path(opf_path, &item.href),
        }
    }
}

/// One entry of the chapter plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedChapter {
    /// Backing document
    pub document: ContentDocument,
    /// Navigation label or `"Chapter N"`
    pub title: String,
    /// Navigation depth, 0 when unmatched
    pub level: u32,
    /// `Navigation` or `ReadingOrder`
    pub source: ChapterSource,
}

impl PlannedChapter {
    /// Draft for this plan entry, without text.
    pub fn draft(&self) -> ChapterDraft {
        ChapterDraft::new(self.document.id.clone(), self.title.clone(), self.source)
            .with_href(self.document.href.clone())
            .with_level(self.level)
    }
}

/// Knobs for [`plan_chapters`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanOptions {
    /// Keep spine items with `linear="no"`
    pub include_non_linear: bool,
    /// Deepest navigation level used for titles
    pub max_nav_depth: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            include_non_linear: true,
            max_nav_depth: 16,
        }
    }
}

struct NavTarget<'a> {
    path: String,
    entry: FlatNavEntry<'a>,
}

/// Navigation entries indexed for title lookup.
struct TitleIndex<'a> {
    targets: Vec<NavTarget<'a>>,
    exact: HashMap<String, usize>,
}

impl<'a> TitleIndex<'a> {
    fn new(nav: Option<&'a NavDocument>, max_depth: usize) -> Self {
        let mut targets = Vec::new();
        let mut exact = HashMap::new();
        let Some((navigation, nav_path)) =
            nav.and_then(|doc| doc.navigation.as_ref().map(|n| (n, doc.path.as_str())))
        else {
            return Self { targets, exact };
        };

        for entry in navigation.flatten(max_depth) {
            if entry.href.contains("://") {
                continue;
            }
            let path = resolve_relative_path(nav_path, entry.href);
            let shadowed = exact
                .get(&path)
                .is_some_and(|&i| targets[i].entry.depth <= entry.depth);
            if !shadowed {
                exact.insert(path.clone(), targets.len());
            }
            targets.push(NavTarget { path, entry });
        }
        Self { targets, exact }
    }

    /// Shallowest, then earliest, entry for `path`: exact match first,
    /// then case-insensitive path-segment suffix match.
    fn lookup(&self, path: &str) -> Option<&FlatNavEntry<'a>> {
        if let Some(&idx) = self.exact.get(path) {
            return Some(&self.targets[idx].entry);
        }
        self.targets
            .iter()
            .enumerate()
            .filter(|(_, t)| segment_suffix_match(&t.path, path))
            .min_by_key(|(i, t)| (t.entry.depth, *i))
            .map(|(_, t)| &t.entry)
    }
}

fn segment_suffix_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long == short
        || long
            .strip_suffix(short.as_str())
            .is_some_and(|prefix| prefix.ends_with('/'))
}

/// Build the chapter plan from the spine.
///
/// Spine items that are missing from the manifest, not markup, repeated,
/// or the navigation document itself are skipped.
pub fn plan_chapters(
    metadata: &EpubMetadata,
    spine: &Spine,
    opf_path: &str,
    nav: Option<&NavDocument>,
    options: PlanOptions,
) -> Vec<PlannedChapter> {
    let titles = TitleIndex::new(nav, options.max_nav_depth);
    let nav_id = nav.map(|n| n.item_id.as_str());
    let mut seen: HashSet<&str> = HashSet::new();
    let mut plan = Vec::new();

    for spine_item in spine.items() {
        if !spine_item.linear && !options.include_non_linear {
            log::debug!("Skipping non-linear spine item '{}'", spine_item.idref);
            continue;
        }
        if !seen.insert(spine_item.idref.as_str()) {
            log::debug!("Skipping repeated spine item '{}'", spine_item.idref);
            continue;
        }
        if Some(spine_item.idref.as_str()) == nav_id {
            continue;
        }
        let Some(item) = metadata.get_item(&spine_item.idref) else {
            log::warn!(
                "Spine item '{}' has no manifest entry; skipping",
                spine_item.idref
            );
            continue;
        };
        if !is_markup_media_type(&item.media_type) {
            log::debug!(
                "Skipping spine item '{}' with media type '{}'",
                item.id,
                item.media_type
            );
            continue;
        }

        let document = ContentDocument::from_item(item, opf_path);
        let planned = match titles.lookup(&document.path) {
            Some(entry) if !entry.label.is_empty() => PlannedChapter {
                title: entry.label.to_string(),
                level: entry.depth as u32,
                source: ChapterSource::Navigation,
                document,
            },
            _ => PlannedChapter {
                title: format!("Chapter {}", plan.len() + 1),
                level: 0,
                source: ChapterSource::ReadingOrder,
                document,
            },
        };
        plan.push(planned);
    }
    plan
}

/// Markup documents in manifest order, navigation document excluded.
///
/// Used when the reading order yields nothing.
pub fn fallback_documents(
    metadata: &EpubMetadata,
    opf_path: &str,
    nav_item_id: Option<&str>,
) -> Vec<ContentDocument> {
    metadata
        .manifest
        .iter()
        .filter(|item| Some(item.id.as_str()) != nav_item_id)
        .filter(|item| is_markup_media_type(&item.media_type))
        .map(|item| ContentDocument::from_item(item, opf_path))
        .collect()
}
