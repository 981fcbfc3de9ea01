//! Font tables and the dispatch from table tags to their codecs.
//!
//! The `head`, `name`, and `cmap` tables are decoded into typed values.
//! Every other table is kept as [raw](raw) bytes.

pub mod cmap;
pub mod head;
pub mod name;
pub mod raw;

use crate::data::GlyphOrder;
use crate::error::{Result, Warning, Warnings};
use crate::sfnt::types::Tag;
use crate::ttx::writer::XmlWriter;
use bytes::Bytes;
use roxmltree::Node;

/// The tag of the `cmap` table.
pub const CMAP: Tag = Tag(*b"cmap");
/// The tag of the `head` table.
pub const HEAD: Tag = Tag(*b"head");
/// The tag of the `maxp` table.
pub const MAXP: Tag = Tag(*b"maxp");
/// The tag of the `name` table.
pub const NAME: Tag = Tag(*b"name");

/// A table of a font document.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum FontTable {
    /// A decoded `head` table.
    Head(head::Head),
    /// A decoded `name` table.
    Name(name::Name),
    /// A decoded `cmap` table.
    Cmap(cmap::Cmap),
    /// The bytes of a table without a typed codec.
    Raw(Bytes),
}

impl FontTable {
    /// Decodes the table `tag` from its bytes.
    ///
    /// Tables without a typed codec never fail.
    pub fn decode(tag: Tag, data: Bytes, warnings: &mut Warnings) -> Result<FontTable> {
        log::debug!("decoding table {} ({} bytes)", tag, data.len());

        Ok(match tag {
            HEAD => FontTable::Head(head::decode(&data)?),
            NAME => FontTable::Name(name::decode(&data, warnings)?),
            CMAP => FontTable::Cmap(cmap::decode(&data, warnings)?),
            _ => FontTable::Raw(data),
        })
    }

    /// Returns the binary table.
    pub fn compile(&self, warnings: &mut Warnings) -> Bytes {
        match self {
            FontTable::Head(table) => head::compile(table),
            FontTable::Name(table) => name::compile(table),
            FontTable::Cmap(table) => cmap::compile(table, warnings),
            FontTable::Raw(data) => data.clone(),
        }
    }

    /// Writes the content of the table element for `tag`.
    pub fn write_xml(&self, tag: Tag, glyph_order: &GlyphOrder, w: &mut XmlWriter) {
        match self {
            FontTable::Head(table) => head::write_xml(table, w),
            FontTable::Name(table) => name::write_xml(table, w),
            FontTable::Cmap(table) => cmap::write_xml(table, glyph_order, w),
            FontTable::Raw(data) => raw::write_xml(tag, data, w),
        }
    }

    /// Reads the table element for `tag`.
    ///
    /// Returns `None` with a [`Warning::Unreconstructable`] for tables without a typed codec.
    pub fn read_xml(
        tag: Tag,
        node: Node,
        glyph_order: &GlyphOrder,
        warnings: &mut Warnings,
    ) -> Result<Option<FontTable>> {
        log::debug!("reading table {}", tag);

        Ok(Some(match tag {
            HEAD => FontTable::Head(head::read_xml(node)?),
            NAME => FontTable::Name(name::read_xml(node)?),
            CMAP => FontTable::Cmap(cmap::read_xml(node, glyph_order)?),
            _ => {
                warnings.push(Warning::Unreconstructable(tag));
                return Ok(None);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_tag() {
        let mut warnings = Warnings::new();
        let head = head::compile(&head::tests::sample());

        assert_eq!(
            FontTable::decode(HEAD, head.clone(), &mut warnings).unwrap(),
            FontTable::Head(head::tests::sample())
        );
        // an unknown tag keeps the bytes even if they look like a head table
        assert_eq!(
            FontTable::decode(Tag(*b"HEAD"), head.clone(), &mut warnings).unwrap(),
            FontTable::Raw(head)
        );
        assert!(FontTable::decode(HEAD, Bytes::from_static(b"short"), &mut warnings).is_err());
    }

    #[test]
    fn test_raw_tables_are_not_read_back() {
        let doc = roxmltree::Document::parse("<glyf><hexdata>00 01</hexdata></glyf>").unwrap();
        let mut warnings = Warnings::new();
        let table = FontTable::read_xml(
            Tag(*b"glyf"),
            doc.root_element(),
            &GlyphOrder::default(),
            &mut warnings,
        )
        .unwrap();

        assert_eq!(table, None);
        assert_eq!(
            warnings.as_slice(),
            &[Warning::Unreconstructable(Tag(*b"glyf"))]
        );
    }
}
