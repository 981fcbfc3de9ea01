//! The fallback for tables without a typed codec.
//!
//! A raw table keeps its bytes verbatim.
//! Its dump is a comment marking the table as unsupported followed by a `hexdata` element holding the bytes as space-separated lowercase pairs.
//! The hex dump is not read back: a raw table in text can not be reconstructed.

use crate::sfnt::types::Tag;
use crate::ttx::writer::XmlWriter;
use itertools::Itertools;

/// The number of bytes written per line of a hex dump.
const BYTES_PER_LINE: usize = 16;

/// Returns `data` as space-separated lowercase hex pairs.
///
/// ```
/// # use ttxml::sfnt::tables::raw::hex_dump;
/// assert_eq!(hex_dump(&[0x00, 0xAB, 0x10]), "00 ab 10");
/// ```
pub fn hex_dump(data: &[u8]) -> String {
    data.iter().map(|x| format!("{:02x}", x)).join(" ")
}

/// Parses whitespace-separated hex pairs as written by [`hex_dump`].
///
/// Returns `None` if any item is not a two-digit hexadecimal byte.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    text.split_whitespace()
        .map(|x| {
            if x.len() == 2 {
                u8::from_str_radix(x, 16).ok()
            } else {
                None
            }
        })
        .collect()
}

/// Writes the dump of a raw table.
pub fn write_xml(tag: Tag, data: &[u8], w: &mut XmlWriter) {
    w.comment(&format!("Table '{}' - unsupported table type", tag.xml_name()));
    w.begin("hexdata", &[]);

    for line in data.chunks(BYTES_PER_LINE) {
        w.text(&hex_dump(line));
    }

    w.end("hexdata");
}
