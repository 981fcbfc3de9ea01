//! # head: Font Header Table
//!
//! Implementation of the `head` table.
//!
//! *Specification:*
//! [OpenType](https://docs.microsoft.com/en-us/typography/opentype/spec/head),
//! [TrueType](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6head.html).
//!
//! The `head` table has a fixed layout of 54 bytes.
//! [`decode`] and [`compile`] are exact inverses of each other.
//!
//! In a table dump, every field is an empty element with a `value` attribute.
//! The 16.16 fixed-point `tableVersion` and `fontRevision` are written as decimals with one and three fractional digits.
//! A value those digits do not reproduce is written with all the digits it needs.
//! `created` and `modified` are stored as seconds since 1904-01-01T00:00:00 and written as seconds since the Unix epoch.

use super::HEAD;
use crate::error::{Error, Result};
use crate::ttx::reader::{float_value, integer_value};
use crate::ttx::writer::XmlWriter;
use crate::util::cursor::Cursor;
use bytes::{BufMut, Bytes, BytesMut};
use roxmltree::Node;

/// The size in bytes of the `head` table.
pub const HEAD_SIZE: usize = 54;

/// The number of seconds from 1904-01-01T00:00:00 to 1970-01-01T00:00:00.
pub const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// The fields of a `head` table in binary order.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct Head {
    /// `majorVersion` and `minorVersion` as a 16.16 fixed-point number.
    pub version: u32,
    /// The font revision as a 16.16 fixed-point number.
    pub font_revision: u32,
    /// The whole-font checksum adjustment, kept as is.
    pub checksum_adjustment: u32,
    /// `0x5F0F3CF5` in well-formed fonts.
    pub magic_number: u32,
    /// The `flags` bit field.
    pub flags: u16,
    /// The number of font units per em.
    pub units_per_em: u16,
    /// Seconds since 1904-01-01T00:00:00.
    pub created: u64,
    /// Seconds since 1904-01-01T00:00:00.
    pub modified: u64,
    /// The minimum x of all glyph bounding boxes.
    pub x_min: i16,
    /// The minimum y of all glyph bounding boxes.
    pub y_min: i16,
    /// The maximum x of all glyph bounding boxes.
    pub x_max: i16,
    /// The maximum y of all glyph bounding boxes.
    pub y_max: i16,
    /// The `macStyle` bit field.
    pub mac_style: u16,
    /// The smallest readable size in pixels.
    pub lowest_rec_ppem: u16,
    /// The deprecated direction hint.
    pub font_direction_hint: i16,
    /// `0` for short `loca` offsets, `1` for long offsets.
    pub index_to_loc_format: i16,
    /// `0` for the current glyph data format.
    pub glyph_data_format: i16,
}

/// Decodes a `head` table.
///
/// Fails if `data` is shorter than [`HEAD_SIZE`]; trailing bytes are ignored.
pub fn decode(data: &[u8]) -> Result<Head> {
    if data.len() < HEAD_SIZE {
        return Err(Error::Malformed {
            tag: HEAD,
            reason: format!("{} bytes, {} required", data.len(), HEAD_SIZE),
        });
    }

    let mut s = Cursor::new(data, "head table");

    Ok(Head {
        version: s.read_u32()?,
        font_revision: s.read_u32()?,
        checksum_adjustment: s.read_u32()?,
        magic_number: s.read_u32()?,
        flags: s.read_u16()?,
        units_per_em: s.read_u16()?,
        created: read_timestamp(&mut s)?,
        modified: read_timestamp(&mut s)?,
        x_min: s.read_i16()?,
        y_min: s.read_i16()?,
        x_max: s.read_i16()?,
        y_max: s.read_i16()?,
        mac_style: s.read_u16()?,
        lowest_rec_ppem: s.read_u16()?,
        font_direction_hint: s.read_i16()?,
        index_to_loc_format: s.read_i16()?,
        glyph_data_format: s.read_i16()?,
    })
}

fn read_timestamp(s: &mut Cursor) -> Result<u64> {
    let high = u64::from(s.read_u32()?);
    let low = u64::from(s.read_u32()?);
    Ok((high << 32) | low)
}

/// Returns the binary `head` table.
pub fn compile(head: &Head) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEAD_SIZE);

    buf.put_u32(head.version);
    buf.put_u32(head.font_revision);
    buf.put_u32(head.checksum_adjustment);
    buf.put_u32(head.magic_number);
    buf.put_u16(head.flags);
    buf.put_u16(head.units_per_em);
    buf.put_u64(head.created);
    buf.put_u64(head.modified);
    buf.put_i16(head.x_min);
    buf.put_i16(head.y_min);
    buf.put_i16(head.x_max);
    buf.put_i16(head.y_max);
    buf.put_u16(head.mac_style);
    buf.put_u16(head.lowest_rec_ppem);
    buf.put_i16(head.font_direction_hint);
    buf.put_i16(head.index_to_loc_format);
    buf.put_i16(head.glyph_data_format);

    assert_eq!(HEAD_SIZE, buf.len());

    buf.freeze()
}

fn fixed_to_f64(value: u32) -> f64 {
    f64::from(value as i32) / 65536.0
}

/// Returns `None` if `value` is outside the 16.16 range.
fn f64_to_fixed(value: f64) -> Option<u32> {
    let scaled = (value * 65536.0).round();

    if scaled >= f64::from(i32::MIN) && scaled <= f64::from(i32::MAX) {
        Some(scaled as i32 as u32)
    } else {
        None
    }
}

/// Formats a 16.16 fixed-point number with `digits` fractional digits, or with as many as an exact value needs.
fn format_fixed(value: u32, digits: usize) -> String {
    let number = fixed_to_f64(value);
    let text = format!("{:.1$}", number, digits);

    match text.parse().ok().and_then(f64_to_fixed) {
        Some(x) if x == value => text,
        _ => format!("{}", number),
    }
}

fn fixed_value(node: Node, name: &str) -> Result<u32> {
    let number = float_value(node, name)?;
    f64_to_fixed(number).ok_or_else(|| Error::InvalidValue {
        element: name.to_string(),
        value: number.to_string(),
    })
}

/// Converts a Mac timestamp to seconds since the Unix epoch.
///
/// The conversion wraps so that every stored value survives a round trip through [`from_unix_time`].
pub fn to_unix_time(mac_time: u64) -> i64 {
    (mac_time as i64).wrapping_sub(MAC_EPOCH_OFFSET)
}

/// Converts seconds since the Unix epoch to a Mac timestamp.
pub fn from_unix_time(unix_time: i64) -> u64 {
    unix_time.wrapping_add(MAC_EPOCH_OFFSET) as u64
}

/// Writes the fields of a `head` table.
pub fn write_xml(head: &Head, w: &mut XmlWriter) {
    let version = format_fixed(head.version, 1);
    let font_revision = format_fixed(head.font_revision, 3);
    let checksum_adjustment = format!("0x{:08x}", head.checksum_adjustment);
    let magic_number = format!("0x{:08x}", head.magic_number);

    w.simple("tableVersion", &[("value", &version)]);
    w.simple("fontRevision", &[("value", &font_revision)]);
    w.simple("checkSumAdjustment", &[("value", &checksum_adjustment)]);
    w.simple("magicNumber", &[("value", &magic_number)]);
    w.simple("flags", &[("value", &head.flags)]);
    w.simple("unitsPerEm", &[("value", &head.units_per_em)]);
    w.simple("created", &[("value", &to_unix_time(head.created))]);
    w.simple("modified", &[("value", &to_unix_time(head.modified))]);
    w.simple("xMin", &[("value", &head.x_min)]);
    w.simple("yMin", &[("value", &head.y_min)]);
    w.simple("xMax", &[("value", &head.x_max)]);
    w.simple("yMax", &[("value", &head.y_max)]);
    w.simple("macStyle", &[("value", &head.mac_style)]);
    w.simple("lowestRecPPEM", &[("value", &head.lowest_rec_ppem)]);
    w.simple("fontDirectionHint", &[("value", &head.font_direction_hint)]);
    w.simple("indexToLocFormat", &[("value", &head.index_to_loc_format)]);
    w.simple("glyphDataFormat", &[("value", &head.glyph_data_format)]);
}

/// Reads the fields of a `head` table element.
///
/// All fields are required.
pub fn read_xml(node: Node) -> Result<Head> {
    Ok(Head {
        version: fixed_value(node, "tableVersion")?,
        font_revision: fixed_value(node, "fontRevision")?,
        checksum_adjustment: integer_value(node, "checkSumAdjustment")?,
        magic_number: integer_value(node, "magicNumber")?,
        flags: integer_value(node, "flags")?,
        units_per_em: integer_value(node, "unitsPerEm")?,
        created: from_unix_time(integer_value(node, "created")?),
        modified: from_unix_time(integer_value(node, "modified")?),
        x_min: integer_value(node, "xMin")?,
        y_min: integer_value(node, "yMin")?,
        x_max: integer_value(node, "xMax")?,
        y_max: integer_value(node, "yMax")?,
        mac_style: integer_value(node, "macStyle")?,
        lowest_rec_ppem: integer_value(node, "lowestRecPPEM")?,
        font_direction_hint: integer_value(node, "fontDirectionHint")?,
        index_to_loc_format: integer_value(node, "indexToLocFormat")?,
        glyph_data_format: integer_value(node, "glyphDataFormat")?,
    })
}
