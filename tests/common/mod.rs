//! Shared fixtures: an in-memory EPUB writer.

#![allow(dead_code)]

const SIG_LOCAL_FILE_HEADER: u32 = 0x0403_4b50;
const SIG_CD_ENTRY: u32 = 0x0201_4b50;
const SIG_EOCD: u32 = 0x0605_4b50;

/// Build a ZIP archive; entries after `mimetype` are deflated.
pub fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = Vec::new();
    let mut central = Vec::new();

    for (name, content) in files {
        let deflate = *name != "mimetype";
        let (method, data): (u16, Vec<u8>) = if deflate {
            (8, miniz_oxide::deflate::compress_to_vec(content, 6))
        } else {
            (0, content.to_vec())
        };
        let crc = crc32fast::hash(content);
        let offset = zip.len() as u32;

        zip.extend_from_slice(&SIG_LOCAL_FILE_HEADER.to_le_bytes());
        zip.extend_from_slice(&20u16.to_le_bytes());
        zip.extend_from_slice(&0u16.to_le_bytes());
        zip.extend_from_slice(&method.to_le_bytes());
        zip.extend_from_slice(&0u32.to_le_bytes());
        zip.extend_from_slice(&crc.to_le_bytes());
        zip.extend_from_slice(&(data.len() as u32).to_le_bytes());
        zip.extend_from_slice(&(content.len() as u32).to_le_bytes());
        zip.extend_from_slice(&(name.len() as u16).to_le_bytes());
        zip.extend_from_slice(&0u16.to_le_bytes());
        zip.extend_from_slice(name.as_bytes());
        zip.extend_from_slice(&data);

        central.extend_from_slice(&SIG_CD_ENTRY.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&method.to_le_bytes());
        central.extend_from_slice(&0u32.to_le_bytes());
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(content.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0u8; 12]); // extra, comment, disk, attrs
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }

    let cd_offset = zip.len() as u32;
    zip.extend_from_slice(&central);
    let count = files.len() as u16;
    zip.extend_from_slice(&SIG_EOCD.to_le_bytes());
    zip.extend_from_slice(&[0u8; 4]);
    zip.extend_from_slice(&count.to_le_bytes());
    zip.extend_from_slice(&count.to_le_bytes());
    zip.extend_from_slice(&(central.len() as u32).to_le_bytes());
    zip.extend_from_slice(&cd_offset.to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip
}

pub const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub fn xhtml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n\
         <head><title>t</title><style>p {{ margin: 0 }}</style></head>\n\
         <body>{}</body></html>",
        body
    )
}

/// Builder for small EPUB 3 packages rooted at `OEBPS/`.
#[derive(Default)]
pub struct EpubFixture {
    title: String,
    creators: Vec<String>,
    manifest: Vec<String>,
    spine: Vec<String>,
    spine_toc: Option<String>,
    files: Vec<(String, Vec<u8>)>,
    skip_container: bool,
}

impl EpubFixture {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn creator(mut self, name: &str) -> Self {
        self.creators.push(name.to_string());
        self
    }

    /// Add a content document to the manifest and the spine.
    pub fn chapter(self, id: &str, href: &str, body: &str) -> Self {
        self.manifest_only(id, href, body).in_spine(id)
    }

    /// Add a content document to the manifest only.
    pub fn manifest_only(mut self, id: &str, href: &str, body: &str) -> Self {
        self.manifest.push(format!(
            r#"<item id="{}" href="{}" media-type="application/xhtml+xml"/>"#,
            id, href
        ));
        self.files.push((href.to_string(), xhtml(body).into_bytes()));
        self
    }

    /// Declare a manifest item without writing its file.
    pub fn dangling(mut self, id: &str, href: &str) -> Self {
        self.manifest.push(format!(
            r#"<item id="{}" href="{}" media-type="application/xhtml+xml"/>"#,
            id, href
        ));
        self
    }

    pub fn in_spine(mut self, id: &str) -> Self {
        self.spine.push(format!(r#"<itemref idref="{}"/>"#, id));
        self
    }

    /// EPUB 3 navigation document from `(label, href)` pairs.
    pub fn nav(mut self, entries: &[(&str, &str)]) -> Self {
        let items: String = entries
            .iter()
            .map(|(label, href)| format!(r#"<li><a href="{}">{}</a></li>"#, href, label))
            .collect();
        self.nav_markup(&format!(r#"<nav epub:type="toc"><h1>Contents</h1><ol>{}</ol></nav>"#, items))
    }

    /// EPUB 3 navigation document with a hand-written body.
    pub fn nav_markup(mut self, body: &str) -> Self {
        self.manifest.push(
            r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#
                .to_string(),
        );
        self.files.push(("nav.xhtml".to_string(), xhtml(body).into_bytes()));
        self
    }

    /// EPUB 2 NCX from `(label, href)` pairs, referenced by the spine.
    pub fn ncx(mut self, entries: &[(&str, &str)]) -> Self {
        let points: String = entries
            .iter()
            .enumerate()
            .map(|(i, (label, href))| {
                format!(
                    r#"<navPoint id="np{0}" playOrder="{0}"><navLabel><text>{1}</text></navLabel><content src="{2}"/></navPoint>"#,
                    i + 1,
                    label,
                    href
                )
            })
            .collect();
        let ncx = format!(
            r#"<?xml version="1.0"?><ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1"><navMap>{}</navMap></ncx>"#,
            points
        );
        self.manifest.push(
            r#"<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#.to_string(),
        );
        self.spine_toc = Some("ncx".to_string());
        self.files.push(("toc.ncx".to_string(), ncx.into_bytes()));
        self
    }

    pub fn without_container(mut self) -> Self {
        self.skip_container = true;
        self
    }

    pub fn opf(&self) -> String {
        let creators: String = self
            .creators
            .iter()
            .map(|c| format!("<dc:creator>{}</dc:creator>", c))
            .collect();
        let toc = self
            .spine_toc
            .as_ref()
            .map(|id| format!(r#" toc="{}""#, id))
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:fixture</dc:identifier>
    <dc:title>{}</dc:title>{}
    <dc:language>en</dc:language>
  </metadata>
  <manifest>{}</manifest>
  <spine{}>{}</spine>
</package>"#,
            self.title,
            creators,
            self.manifest.concat(),
            toc,
            self.spine.concat()
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let opf = self.opf();
        let paths: Vec<String> = self
            .files
            .iter()
            .map(|(href, _)| format!("OEBPS/{}", href))
            .collect();
        let mut entries: Vec<(&str, &[u8])> =
            vec![("mimetype", b"application/epub+zip".as_slice())];
        if !self.skip_container {
            entries.push(("META-INF/container.xml", CONTAINER.as_bytes()));
        }
        entries.push(("OEBPS/content.opf", opf.as_bytes()));
        for (path, (_, body)) in paths.iter().zip(&self.files) {
            entries.push((path.as_str(), body.as_slice()));
        }
        build_zip(&entries)
    }
}
