//! # name: Naming Table
//!
//! Implementation of the `name` table.
//!
//! *Specification:*
//! [OpenType](https://docs.microsoft.com/en-us/typography/opentype/spec/name),
//! [TrueType](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6name.html).
//!
//! The `name` table stores strings such as the family name, the style name, and the version string.
//! Each string is described by a name record which selects a platform, an encoding, a language, and the kind of name (the name id).
//! The string bytes live in a storage area at the end of the table.
//!
//! Records are kept in file order; neither [`decode`] nor [`compile`] sorts them.
//!
//! In a table dump, strings of the Unicode (`0`) and Windows (`3`) platforms are decoded as UTF-16BE.
//! Strings of all other platforms are read byte by byte, each byte becoming the character of the same value.
//! A string that does not decode, or that contains characters XML can not carry, is written as a hex dump with `encoding="hex"`.

use super::raw::{hex_dump, parse_hex};
use super::NAME;
use crate::error::{Error, Result, Warning, Warnings};
use crate::ttx::reader::{elements, integer_attribute, invalid, text};
use crate::ttx::writer::{Attribute, XmlWriter};
use crate::util::cursor::Cursor;
use bytes::{BufMut, Bytes, BytesMut};
use roxmltree::Node;
use std::collections::HashMap;
use std::mem::size_of;

/// The size in bytes of the `format`, `count`, and `storageOffset` fields.
const CONSTANT_SIZE: usize = 3 * size_of::<u16>();
/// The size in bytes of a name record.
const NAME_RECORD_SIZE: usize = 6 * size_of::<u16>();
/// The size in bytes of the `langTagCount` field.
const LANG_TAG_COUNT_FIELD_SIZE: usize = size_of::<u16>();
/// The size in bytes of a language tag record.
const LANG_TAG_RECORD_SIZE: usize = 2 * size_of::<u16>();

/// The platform id of the Unicode platform.
pub const PLATFORM_UNICODE: u16 = 0;
/// The platform id of the Macintosh platform.
pub const PLATFORM_MACINTOSH: u16 = 1;
/// The platform id of the Windows platform.
pub const PLATFORM_WINDOWS: u16 = 3;
/// The Windows language id of US English.
const LANGUAGE_WINDOWS_ENGLISH: u16 = 0x409;

/// A `name` table.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Name {
    /// The table format, `0` or `1`.
    pub format: u16,
    /// The name records in file order.
    pub records: Vec<NameRecord>,
    /// The UTF-16BE language tags of a format 1 table.
    pub lang_tags: Vec<Vec<u8>>,
}

/// A name record together with its string.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct NameRecord {
    /// The platform id.
    pub platform_id: u16,
    /// The platform-specific encoding id.
    pub encoding_id: u16,
    /// The language id.
    pub language_id: u16,
    /// The name id.
    pub name_id: u16,
    /// The string bytes in the record's encoding.
    pub string: Vec<u8>,
}

impl NameRecord {
    /// Returns the string as text, or `None` if it does not decode in the record's encoding.
    pub fn to_text(&self) -> Option<String> {
        decode_string(self.platform_id, &self.string)
    }
}

impl Name {
    /// Returns the preferred string for `name_id`.
    ///
    /// Windows English records are preferred, followed by any Windows record, any Unicode record, and any Macintosh record.
    pub fn string(&self, name_id: u16) -> Option<String> {
        let rank = |record: &NameRecord| match (record.platform_id, record.language_id) {
            (PLATFORM_WINDOWS, LANGUAGE_WINDOWS_ENGLISH) => 0,
            (PLATFORM_WINDOWS, _) => 1,
            (PLATFORM_UNICODE, _) => 2,
            (PLATFORM_MACINTOSH, _) => 3,
            _ => 4,
        };

        self.records
            .iter()
            .filter(|x| x.name_id == name_id)
            .filter_map(|x| x.to_text().map(|text| (rank(x), text)))
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, text)| text)
    }
}

/// Whether strings of the platform are UTF-16BE.
fn is_utf16(platform_id: u16) -> bool {
    platform_id == PLATFORM_UNICODE || platform_id == PLATFORM_WINDOWS
}

/// Whether `c` survives being written as XML text and read back.
///
/// Carriage returns are excluded because XML parsers normalize line endings.
fn is_xml_safe(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Decodes string bytes of the given platform.
fn decode_string(platform_id: u16, bytes: &[u8]) -> Option<String> {
    let text: String = if is_utf16(platform_id) {
        if bytes.len() % 2 != 0 {
            return None;
        }

        let units = bytes
            .chunks_exact(2)
            .map(|x| u16::from_be_bytes([x[0], x[1]]));
        std::char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .ok()?
    } else {
        bytes.iter().map(|&x| x as char).collect()
    };

    if text.chars().all(is_xml_safe) {
        Some(text)
    } else {
        None
    }
}

/// Encodes text for the given platform; returns `None` if a character is not representable.
fn encode_string(platform_id: u16, text: &str) -> Option<Vec<u8>> {
    if is_utf16(platform_id) {
        Some(text.encode_utf16().flat_map(u16::to_be_bytes).collect())
    } else {
        text.chars()
            .map(|c| if (c as u32) <= 0xFF { Some(c as u8) } else { None })
            .collect()
    }
}

/// Reads the string at `offset` with `length` within the storage area; `None` if the range lies outside `data`.
fn read_string(data: &[u8], storage_offset: usize, offset: u16, length: u16) -> Option<Vec<u8>> {
    let start = storage_offset + offset as usize;
    data.get(start..start + length as usize).map(<[u8]>::to_vec)
}

/// Decodes a `name` table.
///
/// Fails if the header, the name records, or the language tag records extend past the end of `data`.
/// A string that lies outside `data` is replaced by an empty string and reported as [`Warning::NameString`].
/// Language tags are counted after the name records for that warning's index.
pub fn decode(data: &[u8], warnings: &mut Warnings) -> Result<Name> {
    if data.len() < CONSTANT_SIZE {
        return Err(Error::Malformed {
            tag: NAME,
            reason: format!("{} bytes, at least {} required", data.len(), CONSTANT_SIZE),
        });
    }

    let mut s = Cursor::new(data, "name records");
    let format = s.read_u16()?;
    let count = s.read_u16()?;
    let storage_offset = s.read_u16()? as usize;

    let mut records = Vec::with_capacity(count as usize);

    for index in 0..count as usize {
        let platform_id = s.read_u16()?;
        let encoding_id = s.read_u16()?;
        let language_id = s.read_u16()?;
        let name_id = s.read_u16()?;
        let length = s.read_u16()?;
        let offset = s.read_u16()?;

        let string = read_string(data, storage_offset, offset, length).unwrap_or_else(|| {
            warnings.push(Warning::NameString { index });
            Vec::new()
        });

        records.push(NameRecord {
            platform_id,
            encoding_id,
            language_id,
            name_id,
            string,
        });
    }

    let mut lang_tags = Vec::new();

    if format == 1 {
        let lang_tag_count = s.read_u16()?;

        for index in 0..lang_tag_count as usize {
            let length = s.read_u16()?;
            let offset = s.read_u16()?;
            let tag = read_string(data, storage_offset, offset, length).unwrap_or_else(|| {
                warnings.push(Warning::NameString {
                    index: count as usize + index,
                });
                Vec::new()
            });
            lang_tags.push(tag);
        }
    }

    log::debug!(
        "name format {} with {} records and {} language tags",
        format,
        records.len(),
        lang_tags.len()
    );

    Ok(Name {
        format,
        records,
        lang_tags,
    })
}

/// Returns the binary `name` table.
///
/// A table with language tags is written as format 1.
/// Identical strings share storage.
pub fn compile(name: &Name) -> Bytes {
    let format = if name.lang_tags.is_empty() { name.format } else { 1 };
    let lang_tag_size = if format == 1 {
        LANG_TAG_COUNT_FIELD_SIZE + name.lang_tags.len() * LANG_TAG_RECORD_SIZE
    } else {
        0
    };
    let storage_offset = CONSTANT_SIZE + name.records.len() * NAME_RECORD_SIZE + lang_tag_size;

    let mut storage = Storage::default();
    let mut buf = BytesMut::with_capacity(storage_offset);

    buf.put_u16(format);
    buf.put_u16(name.records.len() as u16);
    buf.put_u16(storage_offset as u16);

    for record in &name.records {
        buf.put_u16(record.platform_id);
        buf.put_u16(record.encoding_id);
        buf.put_u16(record.language_id);
        buf.put_u16(record.name_id);
        buf.put_u16(record.string.len() as u16);
        buf.put_u16(storage.insert(&record.string));
    }

    if format == 1 {
        buf.put_u16(name.lang_tags.len() as u16);

        for tag in &name.lang_tags {
            buf.put_u16(tag.len() as u16);
            buf.put_u16(storage.insert(tag));
        }
    }

    assert_eq!(storage_offset, buf.len());

    buf.put(storage.data);
    buf.freeze()
}

/// The string storage area of a table being compiled.
#[derive(Default)]
struct Storage<'a> {
    data: BytesMut,
    offsets: HashMap<&'a [u8], u16>,
}

impl<'a> Storage<'a> {
    /// Returns the offset of `string`, appending it unless an identical string was stored before.
    fn insert(&mut self, string: &'a [u8]) -> u16 {
        if string.is_empty() {
            return 0;
        }

        let data = &mut self.data;
        *self.offsets.entry(string).or_insert_with(|| {
            let offset = data.len() as u16;
            data.put_slice(string);
            offset
        })
    }
}

/// Writes one element per name record and language tag.
pub fn write_xml(name: &Name, w: &mut XmlWriter) {
    for record in &name.records {
        let language_id = format!("0x{:x}", record.language_id);
        let mut attributes: Vec<Attribute> = Vec::with_capacity(5);
        attributes.push(("nameID", &record.name_id));
        attributes.push(("platformID", &record.platform_id));
        attributes.push(("platEncID", &record.encoding_id));
        attributes.push(("langID", &language_id));

        match record.to_text() {
            Some(text) => w.text_element("namerecord", &attributes, &text),
            None => {
                attributes.push(("encoding", &"hex"));
                w.text_element("namerecord", &attributes, &hex_dump(&record.string));
            }
        }
    }

    for tag in &name.lang_tags {
        match decode_string(PLATFORM_UNICODE, tag) {
            Some(text) => w.text_element("langTag", &[], &text),
            None => w.text_element("langTag", &[("encoding", &"hex")], &hex_dump(tag)),
        }
    }
}

/// Returns the bytes of a `namerecord` or `langTag` element.
fn read_string_element(node: Node, platform_id: u16) -> Result<Vec<u8>> {
    let content = text(node);

    let bytes = match node.attribute("encoding") {
        Some("hex") => parse_hex(&content),
        Some(other) => return Err(invalid(node, other)),
        None => encode_string(platform_id, &content),
    };

    bytes.ok_or_else(|| invalid(node, &content))
}

/// Reads a `name` table element.
///
/// The table is format 1 if it contains `langTag` elements and format 0 otherwise.
pub fn read_xml(node: Node) -> Result<Name> {
    let mut name = Name::default();

    for element in elements(node) {
        match element.tag_name().name() {
            "namerecord" => {
                let platform_id = integer_attribute(element, "platformID")?;
                name.records.push(NameRecord {
                    platform_id,
                    encoding_id: integer_attribute(element, "platEncID")?,
                    language_id: integer_attribute(element, "langID")?,
                    name_id: integer_attribute(element, "nameID")?,
                    string: read_string_element(element, platform_id)?,
                });
            }
            "langTag" => {
                name.lang_tags
                    .push(read_string_element(element, PLATFORM_UNICODE)?);
            }
            other => {
                log::debug!("ignoring <{}> in name table", other);
            }
        }
    }

    if !name.lang_tags.is_empty() {
        name.format = 1;
    }

    Ok(name)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn utf16(text: &str) -> Vec<u8> {
        encode_string(PLATFORM_WINDOWS, text).unwrap()
    }

    pub(crate) fn sample() -> Name {
        Name {
            format: 0,
            records: vec![
                NameRecord {
                    platform_id: 3,
                    encoding_id: 1,
                    language_id: 0x409,
                    name_id: 1,
                    string: utf16("A & B < C"),
                },
                NameRecord {
                    platform_id: 1,
                    encoding_id: 0,
                    language_id: 0,
                    name_id: 2,
                    string: b"Bold".to_vec(),
                },
                NameRecord {
                    platform_id: 3,
                    encoding_id: 1,
                    language_id: 0x409,
                    name_id: 2,
                    string: utf16("Regular"),
                },
                NameRecord {
                    platform_id: 3,
                    encoding_id: 1,
                    language_id: 0x407,
                    name_id: 1,
                    string: utf16("A & B < C"),
                },
            ],
            lang_tags: Vec::new(),
        }
    }

    #[test]
    fn test_round_trip_keeps_order() {
        let data = compile(&sample());
        let mut warnings = Warnings::new();
        assert_eq!(decode(&data, &mut warnings).unwrap(), sample());
        assert!(warnings.as_slice().is_empty());
    }

    #[test]
    fn test_compile_shares_storage() {
        let data = compile(&sample());
        let storage_offset = CONSTANT_SIZE + 4 * NAME_RECORD_SIZE;
        let storage_len = utf16("A & B < C").len() + 4 + utf16("Regular").len();
        assert_eq!(data.len(), storage_offset + storage_len);
        // first and last record share their offset
        assert_eq!(&data[6 + 10..6 + 12], &data[6 + 36 + 10..6 + 36 + 12]);
    }

    #[test]
    fn test_decode_out_of_bounds_string() {
        let mut data = compile(&sample()).to_vec();
        // length of the second record
        data[6 + 12 + 8..6 + 12 + 10].copy_from_slice(&[0x10, 0x00]);
        let mut warnings = Warnings::new();
        let name = decode(&data, &mut warnings).unwrap();

        assert_eq!(name.records.len(), 4);
        assert!(name.records[1].string.is_empty());
        assert_eq!(name.records[2].string, utf16("Regular"));
        assert_eq!(warnings.as_slice(), &[Warning::NameString { index: 1 }]);
    }

    #[test]
    fn test_decode_truncated_records() {
        let data = compile(&sample());
        let mut warnings = Warnings::new();
        assert!(decode(&data[..6 + 12 * 3], &mut warnings).is_err());
        assert!(decode(&data[..5], &mut warnings).is_err());
    }

    #[test]
    fn test_format1_lang_tags() {
        let mut name = sample();
        name.format = 1;
        name.lang_tags = vec![utf16("en-US"), utf16("de")];
        let data = compile(&name);
        let mut warnings = Warnings::new();
        assert_eq!(decode(&data, &mut warnings).unwrap(), name);
    }

    #[test]
    fn test_write_xml_escapes() {
        let mut w = XmlWriter::new();
        write_xml(&sample(), &mut w);
        let text = w.finish();

        assert!(text.contains(
            "<namerecord nameID=\"1\" platformID=\"3\" platEncID=\"1\" langID=\"0x409\">A &amp; B &lt; C</namerecord>"
        ));
        assert!(text.contains(
            "<namerecord nameID=\"2\" platformID=\"1\" platEncID=\"0\" langID=\"0x0\">Bold</namerecord>"
        ));
    }

    #[test]
    fn test_undecodable_strings_use_hex() {
        let mut name = sample();
        name.records[0].string = vec![0xD8, 0x00, 0x00];
        name.records[1].string = b"a\r\nb".to_vec();

        let mut w = XmlWriter::new();
        w.begin("name", &[]);
        write_xml(&name, &mut w);
        w.end("name");
        let text = w.finish();

        assert!(text.contains("encoding=\"hex\">d8 00 00</namerecord>"));
        assert!(text.contains("encoding=\"hex\">61 0d 0a 62</namerecord>"));

        let doc = roxmltree::Document::parse(&text).unwrap();
        assert_eq!(read_xml(doc.root_element()).unwrap(), name);
    }

    #[test]
    fn test_xml_round_trip() {
        let mut name = sample();
        name.format = 1;
        name.lang_tags = vec![utf16("en-US")];
        name.records[2].string = utf16("  padded \u{1F600} ");

        let mut w = XmlWriter::new();
        w.begin("name", &[]);
        write_xml(&name, &mut w);
        w.end("name");
        let text = w.finish();

        let doc = roxmltree::Document::parse(&text).unwrap();
        assert_eq!(read_xml(doc.root_element()).unwrap(), name);
    }

    #[test]
    fn test_preferred_string() {
        let name = sample();
        assert_eq!(name.string(1), Some("A & B < C".to_string()));
        assert_eq!(name.string(2), Some("Regular".to_string()));
        assert_eq!(name.string(5), None);
    }

    #[test]
    fn test_read_xml_rejects_unencodable_mac_string() {
        let doc = roxmltree::Document::parse(
            r#"<name><namerecord nameID="1" platformID="1" platEncID="0" langID="0x0">€</namerecord></name>"#,
        )
        .unwrap();
        assert!(matches!(
            read_xml(doc.root_element()),
            Err(Error::InvalidValue { .. })
        ));
    }
}
