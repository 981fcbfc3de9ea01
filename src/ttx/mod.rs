//! Conversion between font documents and table dumps.
//!
//! A table dump is an XML document with a `ttFont` root element.
//! The root holds the glyph order followed by one element per table, named after the table tag (see [`Tag::xml_name`]).
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <ttFont sfntVersion="\x00\x01\x00\x00" ttLibVersion="4.0">
//!
//!   <GlyphOrder>
//!     <GlyphID id="0" name=".notdef"/>
//!   </GlyphOrder>
//!
//!   <head>
//!     <tableVersion value="1.0"/>
//!     ...
//!   </head>
//!
//! </ttFont>
//! ```

pub mod reader;
pub mod writer;

use crate::ctx::Context;
use crate::data::{FontDocument, GlyphOrder};
use crate::error::{Error, Result, Warnings};
use crate::sfnt::tables::FontTable;
use crate::sfnt::types::{FontFormat, Tag};
use reader::{attribute, elements};
use roxmltree::{Document, Node};
use std::convert::TryInto;
use writer::XmlWriter;

/// The name of the root element.
const ROOT_ELEMENT: &str = "ttFont";
/// The name of the glyph order element.
const GLYPH_ORDER_ELEMENT: &str = "GlyphOrder";
/// The version written to the `ttLibVersion` attribute.
const TT_LIB_VERSION: &str = "4.0";

/// Returns the table dump of `document`.
///
/// Tables are written in directory order; [`Context::includes`] selects which.
pub fn to_text(document: &FontDocument, ctx: &Context) -> String {
    let glyph_order = document.glyph_order();
    let sfnt_version = format_sfnt_version(document.sfnt_version);

    let mut w = XmlWriter::new();
    w.declaration();
    w.begin(
        ROOT_ELEMENT,
        &[("sfntVersion", &sfnt_version), ("ttLibVersion", &TT_LIB_VERSION)],
    );
    w.newline();

    write_glyph_order(&glyph_order, &mut w);

    for (tag, table) in document.tables() {
        if !ctx.includes(*tag) {
            log::debug!("skipping table {}", tag);
            continue;
        }

        let name = tag.xml_name();
        w.newline();
        w.begin(&name, &[]);
        table.write_xml(*tag, &glyph_order, &mut w);
        w.end(&name);
    }

    w.newline();
    w.end(ROOT_ELEMENT);
    w.finish()
}

fn write_glyph_order(glyph_order: &GlyphOrder, w: &mut XmlWriter) {
    w.begin(GLYPH_ORDER_ELEMENT, &[]);
    w.comment("The 'id' attribute is only for humans; it is ignored when parsed.");

    for (gid, name) in glyph_order.names().iter().enumerate() {
        w.simple("GlyphID", &[("id", &gid), ("name", name)]);
    }

    w.end(GLYPH_ORDER_ELEMENT);
}

/// Returns the `sfntVersion` bytes with printable ASCII written verbatim and other bytes as `\xNN`.
///
/// ```
/// # use ttxml::ttx::format_sfnt_version;
/// assert_eq!(format_sfnt_version(0x0001_0000), r"\x00\x01\x00\x00");
/// assert_eq!(format_sfnt_version(0x4F54_544F), "OTTO");
/// ```
pub fn format_sfnt_version(sfnt_version: u32) -> String {
    let mut text = String::new();

    for &byte in &sfnt_version.to_be_bytes() {
        if (0x20..0x7F).contains(&byte) && byte != b'\\' {
            text.push(byte as char);
        } else {
            text.push_str(&format!("\\x{:02x}", byte));
        }
    }

    text
}

/// Parses an `sfntVersion` attribute written by [`format_sfnt_version`].
pub fn parse_sfnt_version(text: &str) -> Option<u32> {
    let mut bytes = Vec::with_capacity(4);
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(hex) = rest.strip_prefix("\\x") {
            let byte = hex.get(..2).and_then(|x| u8::from_str_radix(x, 16).ok())?;
            bytes.push(byte);
            rest = &hex[2..];
        } else if c.is_ascii() {
            bytes.push(c as u8);
            rest = &rest[1..];
        } else {
            return None;
        }
    }

    let bytes: [u8; 4] = bytes.as_slice().try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// Reads a table dump.
///
/// Fails if the text is not well-formed XML, the root is not `ttFont`, or a typed table can not be read.
/// Tables without a typed codec are left out with a [`Warning::Unreconstructable`](crate::error::Warning::Unreconstructable).
/// A missing or unreadable `sfntVersion` is taken to be TrueType.
pub fn from_text(text: &str, warnings: &mut Warnings) -> Result<FontDocument> {
    let xml = Document::parse(text)?;
    let root = xml.root_element();

    if !root.has_tag_name(ROOT_ELEMENT) {
        return Err(Error::InvalidDocument(format!(
            "root element is <{}>, expected <{}>",
            root.tag_name().name(),
            ROOT_ELEMENT
        )));
    }

    let sfnt_version = root
        .attribute("sfntVersion")
        .and_then(parse_sfnt_version)
        .unwrap_or(0x0001_0000);
    let format = match FontFormat::from_signature(sfnt_version) {
        FontFormat::Otf => FontFormat::Otf,
        _ => FontFormat::Ttf,
    };
    let glyph_order = match elements(root).find(|x| x.has_tag_name(GLYPH_ORDER_ELEMENT)) {
        Some(node) => read_glyph_order(node)?,
        None => GlyphOrder::default(),
    };

    let mut document = FontDocument::new(format, sfnt_version);

    for node in elements(root).filter(|x| !x.has_tag_name(GLYPH_ORDER_ELEMENT)) {
        let name = node.tag_name().name();
        let tag = Tag::from_xml_name(name).ok_or_else(|| {
            Error::InvalidDocument(format!("<{}> does not name a table", name))
        })?;

        if let Some(table) = FontTable::read_xml(tag, node, &glyph_order, warnings)? {
            document.insert(tag, table);
        }
    }

    log::info!("read {} tables from text", document.tables().len());

    Ok(document)
}

fn read_glyph_order(node: Node) -> Result<GlyphOrder> {
    let names = elements(node)
        .filter(|x| x.has_tag_name("GlyphID"))
        .map(|x| attribute(x, "name").map(str::to_string))
        .collect::<Result<Vec<_>>>()?;

    Ok(GlyphOrder::from_names(names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::sample_font;
    use crate::error::Warning;
    use crate::sfnt::tables::{CMAP, HEAD, MAXP, NAME};
    use pretty_assertions::assert_eq;

    fn sample_document() -> FontDocument {
        let mut warnings = Warnings::new();
        FontDocument::decode(&sample_font(), &Context::default(), &mut warnings).unwrap()
    }

    #[test]
    fn test_sfnt_version() {
        for &version in &[0x0001_0000, 0x4F54_544F, 0x7472_7565, 0x5C78_3030] {
            let text = format_sfnt_version(version);
            assert_eq!(parse_sfnt_version(&text), Some(version));
        }
        assert_eq!(parse_sfnt_version("abc"), None);
        assert_eq!(parse_sfnt_version(r"\x0"), None);
    }

    #[test]
    fn test_to_text_layout() {
        let text = to_text(&sample_document(), &Context::default());

        assert!(text.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ttFont sfntVersion=\"\\x00\\x01\\x00\\x00\" ttLibVersion=\"4.0\">\n"
        ));
        assert!(text.contains("    <GlyphID id=\"2\" name=\"glyph00002\"/>\n"));
        assert!(text.contains("    <unitsPerEm value=\"2048\"/>\n"));
        assert!(text.contains("    <created value=\"1561852800\"/>\n"));
        assert!(text.contains(">A &amp; B &lt; C</namerecord>"));
        assert!(text.contains("<!-- Table 'maxp' - unsupported table type -->"));

        let head = text.find("<head>").unwrap();
        let name = text.find("<name>").unwrap();
        let cmap = text.find("<cmap>").unwrap();
        assert!(head < name && name < cmap);
    }

    #[test]
    fn test_only_tables() {
        let ctx = Context {
            only_tables: vec![HEAD],
            ..Context::default()
        };
        let text = to_text(&sample_document(), &ctx);
        let doc = Document::parse(&text).unwrap();
        let tables: Vec<&str> = elements(doc.root_element())
            .map(|x| x.tag_name().name())
            .filter(|&x| x != GLYPH_ORDER_ELEMENT)
            .collect();

        assert_eq!(tables, vec!["head"]);
    }

    #[test]
    fn test_skip_tables() {
        let ctx = Context {
            skip_tables: vec![NAME, MAXP],
            ..Context::default()
        };
        let text = to_text(&sample_document(), &ctx);

        assert!(text.contains("<head>") && text.contains("<cmap>"));
        assert!(!text.contains("<name>") && !text.contains("<maxp>"));
    }

    #[test]
    fn test_round_trip() {
        let document = sample_document();
        let text = to_text(&document, &Context::default());
        let mut warnings = Warnings::new();
        let read = from_text(&text, &mut warnings).unwrap();

        assert_eq!(read.format, FontFormat::Ttf);
        assert_eq!(read.sfnt_version, 0x0001_0000);
        assert_eq!(read.tags(), vec![HEAD, NAME, CMAP]);
        assert_eq!(read.get(HEAD), document.get(HEAD));
        assert_eq!(read.get(NAME), document.get(NAME));

        // subtable offsets are not part of the text
        match (read.get(CMAP), document.get(CMAP)) {
            (Some(FontTable::Cmap(read)), Some(FontTable::Cmap(decoded))) => {
                assert_eq!(read.subtable, decoded.subtable);
                let ids = |cmap: &crate::sfnt::tables::cmap::Cmap| -> Vec<(u16, u16)> {
                    cmap.encoding_records
                        .iter()
                        .map(|x| (x.platform_id, x.encoding_id))
                        .collect()
                };
                assert_eq!(ids(read), ids(decoded));
            }
            other => panic!("unexpected tables {:?}", other),
        }
        assert_eq!(warnings.as_slice(), &[Warning::Unreconstructable(MAXP)]);
    }

    #[test]
    fn test_unprintable_tags_stay_well_formed() {
        use crate::sfnt::tables::head::{self, tests::sample as sample_head};
        use bytes::Bytes;

        let control = Tag([0, 1, 2, 3]);
        let hyphens = Tag(*b"a---");
        let tables = vec![
            (control, Bytes::from_static(&[1, 2])),
            (hyphens, Bytes::from_static(&[3])),
            (HEAD, head::compile(&sample_head())),
        ];
        let font = crate::sfnt::compile(0x0001_0000, &tables);
        let mut warnings = Warnings::new();
        let document = FontDocument::decode(&font, &Context::default(), &mut warnings).unwrap();
        let text = to_text(&document, &Context::default());

        assert!(Document::parse(&text).is_ok());
        assert!(text.contains("<!-- Table '_00010203' - unsupported table type -->"));
        assert!(text.contains("<!-- Table '_612d2d2d' - unsupported table type -->"));

        let mut warnings = Warnings::new();
        let read = from_text(&text, &mut warnings).unwrap();
        assert_eq!(read.tags(), vec![HEAD]);
        assert_eq!(
            warnings.as_slice(),
            &[
                Warning::Unreconstructable(control),
                Warning::Unreconstructable(hyphens)
            ]
        );
    }

    #[test]
    fn test_from_text_glyph_order_names() {
        let text = r#"<ttFont sfntVersion="OTTO">
            <GlyphOrder><GlyphID id="0" name=".notdef"/><GlyphID id="1" name="A"/></GlyphOrder>
            <cmap>
                <tableVersion version="0"/>
                <encodingRecord platformID="3" platEncID="1"/>
                <cmap_format_4 platformID="3" platEncID="1" language="0">
                    <map code="0x41" name="A"/>
                </cmap_format_4>
            </cmap>
        </ttFont>"#;
        let mut warnings = Warnings::new();
        let document = from_text(text, &mut warnings).unwrap();

        assert_eq!(document.format, FontFormat::Otf);
        match document.get(CMAP) {
            Some(FontTable::Cmap(cmap)) => {
                assert_eq!(cmap.map().and_then(|x| x.get(&'A')), Some(&1));
            }
            other => panic!("unexpected table {:?}", other),
        }
    }

    #[test]
    fn test_from_text_errors() {
        let mut warnings = Warnings::new();

        assert!(matches!(from_text("<ttFont>", &mut warnings), Err(Error::Xml(_))));
        assert!(matches!(
            from_text("<font/>", &mut warnings),
            Err(Error::InvalidDocument(_))
        ));
        assert!(matches!(
            from_text("<ttFont><notATableName/></ttFont>", &mut warnings),
            Err(Error::InvalidDocument(_))
        ));
        assert!(matches!(
            from_text("<ttFont><head><unitsPerEm value=\"1\"/></head></ttFont>", &mut warnings),
            Err(Error::MissingValue { .. })
        ));
    }
}
