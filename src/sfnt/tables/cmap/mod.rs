//! # cmap: Character to Glyph Index Mapping Table
//!
//! Implementation of the `cmap` table.
//!
//! *Specification:*
//! [OpenType](https://docs.microsoft.com/en-us/typography/opentype/spec/cmap),
//! [TrueType](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6cmap.html).
//!
//! The `cmap` table provides mappings from character codes to glyph ids.
//! A `cmap` table consists of encoding records and the subtables they point to.
//! A record names the platform and encoding a subtable is intended for.
//! Multiple records may share one subtable.
//!
//! Only the subtable referenced by the first encoding record is decoded, and only formats [4](format4) and [12](format12) are understood.
//! Any other format decodes to an empty mapping.
//! When compiling, all encoding records point to one subtable rebuilt from that mapping.
//!
//! # Example
//!
//! ```
//! # use ttxml::data::CharacterMap;
//! # use ttxml::error::Warnings;
//! # use ttxml::sfnt::tables::cmap::{compile, decode, Cmap};
//! let mut map = CharacterMap::new();
//! map.insert('A', 1);
//! map.insert('B', 2);
//! map.insert('C', 3);
//!
//! let mut warnings = Warnings::new();
//! let table = compile(&Cmap::from_map(map.clone()), &mut warnings);
//! let cmap = decode(&table, &mut warnings).unwrap();
//! assert_eq!(cmap.encoding_records.len(), 2);
//! assert_eq!(cmap.map(), Some(&map));
//! ```

pub mod format12;
pub mod format4;

use super::CMAP;
use crate::data::{CharacterMap, GlyphOrder};
use crate::error::{Error, Result, Warning, Warnings};
use crate::ttx::reader::{attribute, elements, integer_attribute, invalid};
use crate::ttx::writer::XmlWriter;
use crate::util::cursor::Cursor;
use bytes::{BufMut, Bytes, BytesMut};
use lazy_static::lazy_static;
use roxmltree::Node;
use std::convert::TryFrom;
use std::mem::size_of;

/// The size in bytes of the `version` and `numTables` fields.
const CONSTANT_SIZE: usize = 2 * size_of::<u16>();
/// The size in bytes of an encoding record.
const ENCODING_RECORD_SIZE: usize = 2 * size_of::<u16>() + size_of::<u32>();
/// The largest Unicode scaler that is part of the Basic Multilingual Plane (BMP).
const MAX_BMP_SCALER: char = '\u{FFFF}';
/// The prefix of the element holding a subtable.
const SUBTABLE_ELEMENT_PREFIX: &str = "cmap_format_";

lazy_static! {
    /// The default records used to represent BMP only character maps.
    static ref DEFAULT_BMP_RECORDS: Vec<EncodingRecord> = vec![
        EncodingRecord::new(0, 3),
        EncodingRecord::new(3, 1),
    ];
    /// The default records used to represent full Unicode character maps.
    static ref DEFAULT_FULL_RECORDS: Vec<EncodingRecord> = vec![
        EncodingRecord::new(0, 3),
        EncodingRecord::new(0, 4),
        EncodingRecord::new(3, 1),
        EncodingRecord::new(3, 10),
    ];
}

/// A `cmap` table.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Cmap {
    /// The table version, `0` in well-formed fonts.
    pub version: u16,
    /// The encoding records in file order.
    pub encoding_records: Vec<EncodingRecord>,
    /// The subtable of the first encoding record.
    ///
    /// `None` if the table has no encoding records or the subtable could not be read.
    pub subtable: Option<Subtable>,
}

/// An encoding record describes a `cmap` subtable.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct EncodingRecord {
    /// The platform id.
    pub platform_id: u16,
    /// The platform-specific encoding id.
    pub encoding_id: u16,
    /// The offset of the subtable from the start of the table, as read.
    ///
    /// Ignored by [`compile`], which computes the offset.
    pub offset: u32,
}

impl EncodingRecord {
    /// Creates a record for a platform and encoding with an offset of `0`.
    pub fn new(platform_id: u16, encoding_id: u16) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset: 0,
        }
    }
}

/// A decoded `cmap` subtable.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Subtable {
    /// The subtable format as read.
    pub format: u16,
    /// The `language` field.
    pub language: u32,
    /// The mappings; empty for formats other than 4 and 12.
    pub map: CharacterMap,
}

impl Cmap {
    /// Returns a table for `map` with the default encoding records.
    ///
    /// BMP only maps get the records `0/3` and `3/1` and a format 4 subtable.
    /// Other maps additionally get `0/4` and `3/10` and a format 12 subtable.
    pub fn from_map(map: CharacterMap) -> Self {
        let exceeds_bmp = exceeds_bmp(&map);
        let records: &Vec<EncodingRecord> = if exceeds_bmp {
            &DEFAULT_FULL_RECORDS
        } else {
            &DEFAULT_BMP_RECORDS
        };

        Cmap {
            version: 0,
            encoding_records: records.to_vec(),
            subtable: Some(Subtable {
                format: if exceeds_bmp { 12 } else { 4 },
                language: 0,
                map,
            }),
        }
    }

    /// The mappings of the decoded subtable.
    pub fn map(&self) -> Option<&CharacterMap> {
        self.subtable.as_ref().map(|x| &x.map)
    }
}

fn exceeds_bmp(map: &CharacterMap) -> bool {
    map.keys().next_back().map_or(false, |&x| x > MAX_BMP_SCALER)
}

/// Decodes a `cmap` table.
///
/// Fails if the header or the encoding records extend past the end of `data`.
/// A first subtable that can not be read or has an unsupported format yields a [`Warning::CmapSubtable`] and an empty mapping.
pub fn decode(data: &[u8], warnings: &mut Warnings) -> Result<Cmap> {
    if data.len() < CONSTANT_SIZE {
        return Err(Error::Malformed {
            tag: CMAP,
            reason: format!("{} bytes, at least {} required", data.len(), CONSTANT_SIZE),
        });
    }

    let mut s = Cursor::new(data, "cmap encoding records");
    let version = s.read_u16()?;
    let num_tables = s.read_u16()?;

    let encoding_records = (0..num_tables)
        .map(|_| {
            Ok(EncodingRecord {
                platform_id: s.read_u16()?,
                encoding_id: s.read_u16()?,
                offset: s.read_u32()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let subtable = match encoding_records.first() {
        Some(record) => decode_subtable(data, record.offset as usize, warnings),
        None => None,
    };

    log::debug!(
        "cmap version {} with {} encoding records and {} mappings",
        version,
        encoding_records.len(),
        subtable.as_ref().map_or(0, |x| x.map.len())
    );

    Ok(Cmap {
        version,
        encoding_records,
        subtable,
    })
}

fn decode_subtable(data: &[u8], offset: usize, warnings: &mut Warnings) -> Option<Subtable> {
    let format = match Cursor::at(data, offset, "cmap subtable").and_then(|mut s| s.read_u16()) {
        Ok(format) => format,
        Err(err) => {
            warnings.push(Warning::CmapSubtable {
                reason: err.to_string(),
            });
            return None;
        }
    };

    let subtable = &data[offset..];
    let decoded = match format {
        4 => format4::decode(subtable, warnings)
            .map(|(language, map)| (u32::from(language), map)),
        12 => format12::decode(subtable, warnings),
        _ => {
            warnings.push(Warning::CmapSubtable {
                reason: format!("format {} is not supported", format),
            });
            Ok((0, CharacterMap::new()))
        }
    };

    match decoded {
        Ok((language, map)) => Some(Subtable {
            format,
            language,
            map,
        }),
        Err(err) => {
            warnings.push(Warning::CmapSubtable {
                reason: err.to_string(),
            });
            Some(Subtable {
                format,
                language: 0,
                map: CharacterMap::new(),
            })
        }
    }
}

/// Returns the binary `cmap` table.
///
/// Every encoding record points to the one compiled subtable.
/// The subtable keeps its format if it is 4 for a BMP only map or 12.
/// Otherwise it is compiled as format 4, or as format 12 for maps beyond the BMP, and a [`Warning::Lossy`] is recorded.
/// A format 4 subtable that can not hold the map is compiled as format 12 with a [`Warning::Lossy`].
pub fn compile(cmap: &Cmap, warnings: &mut Warnings) -> Bytes {
    let records = &cmap.encoding_records;
    let empty = Subtable {
        format: 4,
        ..Subtable::default()
    };
    let subtable = cmap.subtable.as_ref().unwrap_or(&empty);

    let subtable_data = if records.is_empty() {
        if !subtable.map.is_empty() {
            warnings.push(Warning::Lossy {
                tag: CMAP,
                reason: "mappings without encoding records were dropped".to_string(),
            });
        }
        Bytes::new()
    } else {
        compile_subtable(subtable, warnings)
    };

    let subtable_offset = CONSTANT_SIZE + records.len() * ENCODING_RECORD_SIZE;
    let length = subtable_offset + subtable_data.len();
    let mut buf = BytesMut::with_capacity(length);

    buf.put_u16(cmap.version);
    buf.put_u16(records.len() as u16);

    for record in records {
        buf.put_u16(record.platform_id);
        buf.put_u16(record.encoding_id);
        buf.put_u32(subtable_offset as u32);
    }

    buf.put(subtable_data);

    assert_eq!(length, buf.len());

    buf.freeze()
}

fn compile_subtable(subtable: &Subtable, warnings: &mut Warnings) -> Bytes {
    let exceeds_bmp = exceeds_bmp(&subtable.map);
    let format = match subtable.format {
        4 if !exceeds_bmp => 4,
        12 => 12,
        other => {
            let format = if exceeds_bmp { 12 } else { 4 };
            warnings.push(Warning::Lossy {
                tag: CMAP,
                reason: format!("subtable format {} was rebuilt as format {}", other, format),
            });
            format
        }
    };

    log::debug!(
        "compiling cmap format {} subtable with {} mappings",
        format,
        subtable.map.len()
    );

    if format == 4 {
        let compiled = u16::try_from(subtable.language)
            .ok()
            .and_then(|language| format4::compile(&subtable.map, language));

        match compiled {
            Some(data) => return data,
            None => warnings.push(Warning::Lossy {
                tag: CMAP,
                reason: "mappings do not fit a format 4 subtable and were rebuilt as format 12"
                    .to_string(),
            }),
        }
    }

    format12::compile(&subtable.map, subtable.language)
}

/// Writes the version, the encoding records, and the decoded subtable.
pub fn write_xml(cmap: &Cmap, glyph_order: &GlyphOrder, w: &mut XmlWriter) {
    w.simple("tableVersion", &[("version", &cmap.version)]);

    for record in &cmap.encoding_records {
        w.simple(
            "encodingRecord",
            &[
                ("platformID", &record.platform_id),
                ("platEncID", &record.encoding_id),
            ],
        );
    }

    let (record, subtable) = match (cmap.encoding_records.first(), &cmap.subtable) {
        (Some(record), Some(subtable)) => (record, subtable),
        _ => return,
    };

    let name = format!("{}{}", SUBTABLE_ELEMENT_PREFIX, subtable.format);
    w.begin(
        &name,
        &[
            ("platformID", &record.platform_id),
            ("platEncID", &record.encoding_id),
            ("language", &subtable.language),
        ],
    );

    for (&code, &gid) in &subtable.map {
        let code = format!("0x{:x}", code as u32);
        let glyph_name = glyph_order.name(gid);
        w.simple("map", &[("code", &code), ("name", &glyph_name)]);
    }

    w.end(&name);
}

/// Reads a `cmap` table element.
///
/// Glyph names are resolved with `glyph_order`.
/// Without `encodingRecord` elements, the default records for the map are used.
pub fn read_xml(node: Node, glyph_order: &GlyphOrder) -> Result<Cmap> {
    let mut version = 0;
    let mut encoding_records = Vec::new();
    let mut subtable = None;

    for element in elements(node) {
        let name = element.tag_name().name();

        if name == "tableVersion" {
            version = integer_attribute(element, "version")?;
        } else if name == "encodingRecord" {
            encoding_records.push(EncodingRecord::new(
                integer_attribute(element, "platformID")?,
                integer_attribute(element, "platEncID")?,
            ));
        } else if let Some(format) = name.strip_prefix(SUBTABLE_ELEMENT_PREFIX) {
            if subtable.is_some() {
                log::debug!("ignoring additional <{}>", name);
                continue;
            }
            let format = format.parse().map_err(|_| invalid(element, name))?;
            subtable = Some(read_subtable(element, format, glyph_order)?);
        } else {
            log::debug!("ignoring <{}> in cmap table", name);
        }
    }

    if encoding_records.is_empty() {
        if let Some(subtable) = subtable {
            let mut cmap = Cmap::from_map(subtable.map);
            cmap.version = version;
            return Ok(cmap);
        }
    }

    Ok(Cmap {
        version,
        encoding_records,
        subtable,
    })
}

fn read_subtable(node: Node, format: u16, glyph_order: &GlyphOrder) -> Result<Subtable> {
    let language = match node.attribute("language") {
        Some(_) => integer_attribute(node, "language")?,
        None => 0,
    };
    let mut map = CharacterMap::new();

    for element in elements(node).filter(|x| x.has_tag_name("map")) {
        let code: u32 = integer_attribute(element, "code")?;
        let c = std::char::from_u32(code).ok_or_else(|| invalid(element, &code.to_string()))?;
        let name = attribute(element, "name")?;
        let gid = glyph_order.id(name).ok_or_else(|| invalid(element, name))?;
        map.insert(c, gid);
    }

    Ok(Subtable {
        format,
        language,
        map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_map() -> CharacterMap {
        let mut map = CharacterMap::new();
        map.insert('A', 1);
        map.insert('B', 2);
        map.insert('&', 3);
        map
    }

    fn to_text(cmap: &Cmap) -> String {
        let mut w = XmlWriter::new();
        w.begin("cmap", &[]);
        write_xml(cmap, &GlyphOrder::with_count(4), &mut w);
        w.end("cmap");
        w.finish()
    }

    fn from_text(text: &str) -> Result<Cmap> {
        let doc = roxmltree::Document::parse(text).unwrap();
        read_xml(doc.root_element(), &GlyphOrder::with_count(4))
    }

    #[test]
    fn test_records_share_subtable() {
        let mut warnings = Warnings::new();
        let table = compile(&Cmap::from_map(sample_map()), &mut warnings);

        // both records point past the two records
        assert_eq!(&table[4..12], &[0, 0, 0, 3, 0, 0, 0, 20]);
        assert_eq!(&table[12..20], &[0, 3, 0, 1, 0, 0, 0, 20]);
        assert_eq!(&table[20..22], &[0, 4]);
        assert!(warnings.as_slice().is_empty());
    }

    #[test]
    fn test_full_unicode_uses_format12() {
        let mut map = sample_map();
        map.insert('\u{1F600}', 3);
        let mut warnings = Warnings::new();
        let cmap = decode(&compile(&Cmap::from_map(map.clone()), &mut warnings), &mut warnings).unwrap();

        assert_eq!(cmap.encoding_records.len(), 4);
        assert_eq!(cmap.subtable.as_ref().map(|x| x.format), Some(12));
        assert_eq!(cmap.map(), Some(&map));
    }

    #[test]
    fn test_decode_unsupported_format() {
        #[rustfmt::skip]
        let data = [
            0, 0, 0, 1, // version, numTables
            0, 1, 0, 0, 0, 0, 0, 12, // encoding record 1/0
            0, 6, 0, 10, 0, 0, 0, 0, 0, 0, // format 6 subtable
        ];
        let mut warnings = Warnings::new();
        let cmap = decode(&data, &mut warnings).unwrap();

        assert_eq!(cmap.encoding_records[0].platform_id, 1);
        assert_eq!(cmap.subtable.as_ref().map(|x| x.format), Some(6));
        assert_eq!(cmap.map(), Some(&CharacterMap::new()));
        assert!(matches!(
            warnings.as_slice(),
            [Warning::CmapSubtable { .. }]
        ));

        let mut warnings = Warnings::new();
        let table = compile(&cmap, &mut warnings);
        assert_eq!(&table[12..14], &[0, 4]);
        assert!(matches!(warnings.as_slice(), [Warning::Lossy { tag: CMAP, .. }]));
    }

    #[test]
    fn test_decode_subtable_out_of_bounds() {
        let data = [0, 0, 0, 1, 0, 3, 0, 1, 0, 0, 1, 0];
        let mut warnings = Warnings::new();
        let cmap = decode(&data, &mut warnings).unwrap();

        assert_eq!(cmap.encoding_records.len(), 1);
        assert_eq!(cmap.subtable, None);
        assert_eq!(warnings.as_slice().len(), 1);
    }

    #[test]
    fn test_decode_truncated_records() {
        let mut warnings = Warnings::new();
        assert!(decode(&[0, 0, 0, 2, 0, 3, 0, 1, 0, 0, 0, 20], &mut warnings).is_err());
        assert!(decode(&[0, 0, 0], &mut warnings).is_err());
    }

    #[test]
    fn test_write_xml() {
        let text = to_text(&Cmap::from_map(sample_map()));

        assert_eq!(
            text,
            "<cmap>\n  <tableVersion version=\"0\"/>\n  <encodingRecord platformID=\"0\" platEncID=\"3\"/>\n  <encodingRecord platformID=\"3\" platEncID=\"1\"/>\n  <cmap_format_4 platformID=\"0\" platEncID=\"3\" language=\"0\">\n    <map code=\"0x26\" name=\"glyph00003\"/>\n    <map code=\"0x41\" name=\"glyph00001\"/>\n    <map code=\"0x42\" name=\"glyph00002\"/>\n  </cmap_format_4>\n</cmap>\n"
        );
    }

    #[test]
    fn test_xml_round_trip() {
        let mut cmap = Cmap::from_map(sample_map());
        cmap.encoding_records = vec![EncodingRecord::new(3, 1)];
        cmap.subtable.as_mut().unwrap().language = 2;

        assert_eq!(from_text(&to_text(&cmap)).unwrap(), cmap);
    }

    #[test]
    fn test_read_xml_default_records() {
        let cmap = from_text(
            r#"<cmap><cmap_format_12 language="0"><map code="0x1F600" name="glyph00002"/></cmap_format_12></cmap>"#,
        )
        .unwrap();

        assert_eq!(cmap.encoding_records, DEFAULT_FULL_RECORDS.to_vec());
        assert_eq!(cmap.subtable.as_ref().map(|x| x.format), Some(12));
    }

    #[test]
    fn test_read_xml_unknown_glyph() {
        assert!(matches!(
            from_text(r#"<cmap><cmap_format_4><map code="0x41" name="A"/></cmap_format_4></cmap>"#),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_oversized_format4_falls_back_to_format12() {
        let map: CharacterMap = (0x20..0xD800)
            .filter_map(std::char::from_u32)
            .take(40_000)
            .zip((1..=40_000).rev())
            .collect();
        let mut warnings = Warnings::new();
        let table = compile(&Cmap::from_map(map.clone()), &mut warnings);

        assert_eq!(&table[20..22], &[0, 12]);
        assert!(matches!(warnings.as_slice(), [Warning::Lossy { tag: CMAP, .. }]));

        let cmap = decode(&table, &mut warnings).unwrap();
        assert_eq!(cmap.map(), Some(&map));
    }

    #[test]
    fn test_read_xml_rejects_large_glyph_ids() {
        assert!(matches!(
            from_text(
                r#"<cmap><cmap_format_4><map code="0x41" name="glyph4294967295"/><map code="0x42" name="glyph00001"/></cmap_format_4></cmap>"#
            ),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            from_text(r#"<cmap><cmap_format_4><map code="0x41" name="glyph70000"/></cmap_format_4></cmap>"#),
            Err(Error::InvalidValue { .. })
        ));
    }
}
