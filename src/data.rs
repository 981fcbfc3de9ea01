//! The in-memory model of a font.
//!
//! A [`FontDocument`] owns the tables of one font in directory order.
//! It is built either from a binary font by [`FontDocument::decode`] or from a table dump by [`crate::ttx::from_text`].

use crate::ctx::Context;
use crate::error::{Error, Result, Warning, Warnings};
use crate::sfnt::tables::{FontTable, HEAD, MAXP, NAME};
use crate::sfnt::types::{Flavor, FontFormat, Tag};
use crate::sfnt::{self, parse_directory};
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};

/// Maps Unicode scalers to glyph ids.
///
/// A `BTreeMap` is used since a character map is frequently accessed in ascending order of character codes.
pub type CharacterMap = BTreeMap<char, u32>;

/// The largest glyph id a font can address.
pub const MAX_GLYPH_ID: u32 = 0xFFFF;

/// The name of glyph `0`.
const NOTDEF: &str = ".notdef";
/// The prefix of derived glyph names.
const GLYPH_NAME_PREFIX: &str = "glyph";

/// Maps glyph ids to glyph names and back.
///
/// Glyphs without an explicit name are named `glyph` followed by their id in five digits.
///
/// ```
/// # use ttxml::data::GlyphOrder;
/// let order = GlyphOrder::with_count(3);
/// assert_eq!(order.names(), &[".notdef", "glyph00001", "glyph00002"]);
/// assert_eq!(order.id("glyph00002"), Some(2));
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GlyphOrder {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl GlyphOrder {
    /// Creates the glyph order of a font with `count` glyphs.
    ///
    /// The order always contains at least `.notdef`.
    pub fn with_count(count: u16) -> Self {
        let names = (0..u32::from(count.max(1)))
            .map(derived_name)
            .collect();
        GlyphOrder::from_names(names)
    }

    /// Creates a glyph order from names in glyph id order.
    ///
    /// If a name occurs more than once, it resolves to its first glyph.
    pub fn from_names(names: Vec<String>) -> Self {
        let mut ids = HashMap::with_capacity(names.len());
        for (gid, name) in names.iter().enumerate() {
            ids.entry(name.clone()).or_insert(gid as u32);
        }
        GlyphOrder { names, ids }
    }

    /// The glyph names in glyph id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the name of glyph `gid`.
    pub fn name(&self, gid: u32) -> String {
        self.names
            .get(gid as usize)
            .cloned()
            .unwrap_or_else(|| derived_name(gid))
    }

    /// Returns the glyph id for `name`.
    ///
    /// Besides the names of the order, `.notdef` and derived names such as `glyph00042` are resolved.
    /// Returns `None` for ids above [`MAX_GLYPH_ID`].
    pub fn id(&self, name: &str) -> Option<u32> {
        if let Some(&gid) = self.ids.get(name) {
            return Some(gid).filter(|&x| x <= MAX_GLYPH_ID);
        }
        if name == NOTDEF {
            return Some(0);
        }

        let digits = name.strip_prefix(GLYPH_NAME_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|x| x.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|&x| x <= MAX_GLYPH_ID)
    }
}

impl Default for GlyphOrder {
    fn default() -> Self {
        GlyphOrder::with_count(1)
    }
}

fn derived_name(gid: u32) -> String {
    if gid == 0 {
        NOTDEF.to_string()
    } else {
        format!("{}{:05}", GLYPH_NAME_PREFIX, gid)
    }
}

/// Descriptive values derived from the `head` and `name` tables.
///
/// Values of absent tables or records are empty or zero.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct FontMetadata {
    /// The font family name (name id 1).
    pub family_name: String,
    /// The style name (name id 2).
    pub style_name: String,
    /// The version string (name id 5).
    pub version: String,
    /// The number of font units per em.
    pub units_per_em: u16,
    /// The creation time in seconds since 1904-01-01T00:00:00.
    pub created: u64,
    /// The modification time in seconds since 1904-01-01T00:00:00.
    pub modified: u64,
}

/// A summary of a font file.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FontInfo {
    /// The container format.
    pub format: FontFormat,
    /// The tags of the decoded tables in directory order.
    pub tables: Vec<Tag>,
    /// Values derived from the tables.
    pub metadata: FontMetadata,
    /// The number of fonts in the file.
    pub font_count: usize,
}

impl FontInfo {
    /// Returns the info of a file that could not be read beyond its signature.
    pub fn empty(format: FontFormat) -> Self {
        FontInfo {
            format,
            tables: Vec::new(),
            metadata: FontMetadata::default(),
            font_count: 1,
        }
    }
}

/// The tables of one font.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FontDocument {
    /// The container format the document was read from.
    pub format: FontFormat,
    /// The `sfntVersion` the document was read from.
    pub sfnt_version: u32,
    tables: Vec<(Tag, FontTable)>,
    /// Positions in `tables` by tag.
    index: HashMap<Tag, usize>,
}

impl FontDocument {
    /// Creates an empty document.
    pub fn new(format: FontFormat, sfnt_version: u32) -> Self {
        FontDocument {
            format,
            sfnt_version,
            tables: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Decodes a binary font.
    ///
    /// Fails for formats other than plain SFNT containers and for a truncated table directory.
    /// A table that fails to decode is dropped with a [`Warning::DroppedTable`], unless [`Context::ignore_decode_errors`] is `false`.
    pub fn decode(data: &[u8], ctx: &Context, warnings: &mut Warnings) -> Result<FontDocument> {
        let format = sfnt::detect_format(data);
        log::info!("Font format: {}", format);

        match format {
            FontFormat::Unknown => return Err(Error::UnrecognizedFormat),
            format if !format.is_sfnt() => return Err(Error::UnsupportedFormat(format)),
            _ => {}
        }

        let directory = parse_directory(data, warnings)?;
        let mut document = FontDocument::new(format, directory.sfnt_version);

        for entry in directory.entries {
            let tag = entry.record.tag;

            match FontTable::decode(tag, entry.data, warnings) {
                Ok(table) => document.insert(tag, table),
                Err(err) if ctx.ignore_decode_errors => {
                    warnings.push(Warning::DroppedTable {
                        tag,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(document)
    }

    /// Adds a table.
    ///
    /// A table with a tag already present replaces the earlier table at its position.
    pub fn insert(&mut self, tag: Tag, table: FontTable) {
        match self.index.get(&tag) {
            Some(&position) => {
                log::debug!("table {} occurs more than once; keeping the last one", tag);
                self.tables[position].1 = table;
            }
            None => {
                self.index.insert(tag, self.tables.len());
                self.tables.push((tag, table));
            }
        }
    }

    /// Returns the table `tag`.
    pub fn get(&self, tag: Tag) -> Option<&FontTable> {
        self.index.get(&tag).map(|&position| &self.tables[position].1)
    }

    /// The tables in directory order.
    pub fn tables(&self) -> &[(Tag, FontTable)] {
        &self.tables
    }

    /// The table tags in directory order.
    ///
    /// Tables that failed to decode are not part of the document.
    pub fn tags(&self) -> Vec<Tag> {
        self.tables.iter().map(|(tag, _)| *tag).collect()
    }

    /// The number of glyphs declared by the `maxp` table.
    pub fn num_glyphs(&self) -> Option<u16> {
        match self.get(MAXP) {
            Some(FontTable::Raw(data)) => data.get(4..6).map(|x| u16::from_be_bytes([x[0], x[1]])),
            _ => None,
        }
    }

    /// The glyph order derived from the number of glyphs.
    pub fn glyph_order(&self) -> GlyphOrder {
        GlyphOrder::with_count(self.num_glyphs().unwrap_or(1))
    }

    /// Returns the values derived from the `head` and `name` tables.
    pub fn metadata(&self) -> FontMetadata {
        let mut metadata = FontMetadata::default();

        if let Some(FontTable::Head(head)) = self.get(HEAD) {
            metadata.units_per_em = head.units_per_em;
            metadata.created = head.created;
            metadata.modified = head.modified;
        }

        if let Some(FontTable::Name(name)) = self.get(NAME) {
            metadata.family_name = name.string(1).unwrap_or_default();
            metadata.style_name = name.string(2).unwrap_or_default();
            metadata.version = name.string(5).unwrap_or_default();
        }

        metadata
    }

    /// Returns the summary of the document.
    pub fn info(&self) -> FontInfo {
        FontInfo {
            format: self.format,
            tables: self.tags(),
            metadata: self.metadata(),
            font_count: 1,
        }
    }

    /// Compiles the document into an SFNT font with the signature of `flavor`.
    pub fn compile(&self, flavor: Flavor, warnings: &mut Warnings) -> Bytes {
        let tables: Vec<(Tag, Bytes)> = self
            .tables
            .iter()
            .map(|(tag, table)| (*tag, table.compile(warnings)))
            .collect();

        sfnt::compile(flavor.sfnt_version(), &tables)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sfnt::tables::name::{tests as name_tests, Name};
    use crate::sfnt::tables::{cmap, head, CMAP};
    use pretty_assertions::assert_eq;

    /// A font with `head`, `name`, `cmap`, and `maxp` tables.
    pub(crate) fn sample_font() -> Bytes {
        let mut map = CharacterMap::new();
        map.insert('A', 1);
        map.insert('B', 2);

        let mut warnings = Warnings::new();
        let tables = vec![
            (HEAD, head::compile(&head::tests::sample())),
            (NAME, crate::sfnt::tables::name::compile(&name_tests::sample())),
            (CMAP, cmap::compile(&cmap::Cmap::from_map(map), &mut warnings)),
            (MAXP, Bytes::from_static(&[0, 0, 0x50, 0, 0, 3])),
        ];
        sfnt::compile(Flavor::TrueType.sfnt_version(), &tables)
    }

    #[test]
    fn test_glyph_order() {
        let order = GlyphOrder::from_names(vec![".notdef".into(), "A".into(), "A".into()]);
        assert_eq!(order.id("A"), Some(1));
        assert_eq!(order.id(".notdef"), Some(0));
        assert_eq!(order.id("glyph00007"), Some(7));
        assert_eq!(order.id("glyph"), None);
        assert_eq!(order.id("glyph+1"), None);
        assert_eq!(order.id("glyph65535"), Some(MAX_GLYPH_ID));
        assert_eq!(order.id("glyph65536"), None);
        assert_eq!(order.id("glyph4294967295"), None);
        assert_eq!(order.id("B"), None);
        assert_eq!(order.name(1), "A");
        assert_eq!(order.name(12), "glyph00012");
        assert_eq!(GlyphOrder::with_count(0).names(), &[".notdef"]);
    }

    #[test]
    fn test_decode() {
        let mut warnings = Warnings::new();
        let document =
            FontDocument::decode(&sample_font(), &Context::default(), &mut warnings).unwrap();

        assert_eq!(document.format, FontFormat::Ttf);
        assert_eq!(document.tags(), vec![HEAD, NAME, CMAP, MAXP]);
        assert_eq!(document.num_glyphs(), Some(3));
        assert_eq!(document.glyph_order().names().len(), 3);
        assert!(warnings.as_slice().is_empty());
    }

    #[test]
    fn test_decode_rejects_other_formats() {
        let mut warnings = Warnings::new();
        let ctx = Context::default();

        assert!(matches!(
            FontDocument::decode(b"wOFF\0\0\0\0\0\0\0\0", &ctx, &mut warnings),
            Err(Error::UnsupportedFormat(FontFormat::Woff))
        ));
        assert!(matches!(
            FontDocument::decode(b"abcd", &ctx, &mut warnings),
            Err(Error::UnrecognizedFormat)
        ));
        assert!(matches!(
            FontDocument::decode(b"\0\x01\0\0", &ctx, &mut warnings),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_errors_drop_or_fail() {
        let tables = vec![
            (HEAD, Bytes::from_static(&[0; 10])),
            (NAME, crate::sfnt::tables::name::compile(&Name::default())),
        ];
        let font = sfnt::compile(Flavor::TrueType.sfnt_version(), &tables);

        let mut warnings = Warnings::new();
        let document = FontDocument::decode(&font, &Context::default(), &mut warnings).unwrap();
        assert_eq!(document.tags(), vec![NAME]);
        assert!(matches!(
            warnings.as_slice(),
            [Warning::DroppedTable { tag: HEAD, .. }]
        ));

        let ctx = Context {
            ignore_decode_errors: false,
            ..Context::default()
        };
        assert!(matches!(
            FontDocument::decode(&font, &ctx, &mut Warnings::new()),
            Err(Error::Malformed { tag: HEAD, .. })
        ));
    }

    #[test]
    fn test_many_tables_in_directory_order() {
        let mut document = FontDocument::new(FontFormat::Ttf, 0x0001_0000);
        for value in 0..10_000u32 {
            document.insert(Tag(value.to_be_bytes()), FontTable::Raw(Bytes::new()));
        }
        document.insert(Tag(7u32.to_be_bytes()), FontTable::Raw(Bytes::from_static(b"x")));

        assert_eq!(document.tables().len(), 10_000);
        assert_eq!(document.tags()[7], Tag(7u32.to_be_bytes()));
        assert_eq!(
            document.get(Tag(7u32.to_be_bytes())),
            Some(&FontTable::Raw(Bytes::from_static(b"x")))
        );
    }

    #[test]
    fn test_duplicate_tags_keep_first_position() {
        let mut document = FontDocument::new(FontFormat::Ttf, 0x0001_0000);
        document.insert(NAME, FontTable::Raw(Bytes::from_static(b"1")));
        document.insert(HEAD, FontTable::Raw(Bytes::from_static(b"2")));
        document.insert(NAME, FontTable::Raw(Bytes::from_static(b"3")));

        assert_eq!(document.tags(), vec![NAME, HEAD]);
        assert_eq!(
            document.get(NAME),
            Some(&FontTable::Raw(Bytes::from_static(b"3")))
        );
    }

    #[test]
    fn test_metadata() {
        let mut warnings = Warnings::new();
        let document =
            FontDocument::decode(&sample_font(), &Context::default(), &mut warnings).unwrap();
        let metadata = document.metadata();

        assert_eq!(metadata.family_name, "A & B < C");
        assert_eq!(metadata.style_name, "Regular");
        assert_eq!(metadata.version, "");
        assert_eq!(metadata.units_per_em, 2048);
        assert_eq!(metadata.created, 3_644_697_600);
    }

    #[test]
    fn test_compile_round_trip() {
        let mut warnings = Warnings::new();
        let document =
            FontDocument::decode(&sample_font(), &Context::default(), &mut warnings).unwrap();
        let font = document.compile(Flavor::Cff, &mut warnings);

        assert_eq!(&font[..4], b"OTTO");
        let decoded = FontDocument::decode(&font, &Context::default(), &mut warnings).unwrap();
        assert_eq!(decoded.format, FontFormat::Otf);
        assert_eq!(decoded.tables(), document.tables());
        assert!(warnings.as_slice().is_empty());
    }
}
