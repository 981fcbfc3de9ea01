//! Implementation of the SFNT container format.
//!
//! [`detect_format`] identifies a container by its signature, [`parse_directory`] reads the table directory of a plain SFNT container, and [`compile`] writes a container from a list of tables.

pub mod tables;
pub mod types;

use crate::error::{Error, Result, Warning, Warnings};
use crate::util::cursor::Cursor;
use bytes::{BufMut, Bytes, BytesMut};
use std::convert::TryInto;
use std::mem::size_of;
use types::{FontFormat, Tag};

/// The size in bytes of the `sfntVersion` field.
const SFNT_VERSION_FIELD_SIZE: usize = size_of::<u32>();
/// The size in bytes of the `numTables` field.
const NUM_TABLES_FIELD_SIZE: usize = size_of::<u16>();
/// The size in bytes of the `searchRange` field.
const SEARCH_RANGE_FIELD_SIZE: usize = size_of::<u16>();
/// The size in bytes of the `entrySelector` field.
const ENTRY_SELECTOR_FIELD_SIZE: usize = size_of::<u16>();
/// The size in bytes of the `rangeShift` field.
const RANGE_SHIFT_FIELD_SIZE: usize = size_of::<u16>();
/// The size in bytes of a `tableTag` field.
const TABLE_TAG_FIELD_SIZE: usize = size_of::<u32>();
/// The size in bytes of a `checksum` field.
const CHECKSUM_FIELD_SIZE: usize = size_of::<u32>();
/// The size in bytes of an `offset` field.
const OFFSET_FIELD_SIZE: usize = size_of::<u32>();
/// The size in bytes of a `length` field.
const LENGTH_FIELD_SIZE: usize = size_of::<u32>();
/// The size in bytes of the table directory preamble.
pub const PREAMBLE_SIZE: usize = SFNT_VERSION_FIELD_SIZE
    + NUM_TABLES_FIELD_SIZE
    + SEARCH_RANGE_FIELD_SIZE
    + ENTRY_SELECTOR_FIELD_SIZE
    + RANGE_SHIFT_FIELD_SIZE;
/// The size in bytes of a `TableRecord`.
pub const TABLE_RECORD_SIZE: usize =
    TABLE_TAG_FIELD_SIZE + CHECKSUM_FIELD_SIZE + OFFSET_FIELD_SIZE + LENGTH_FIELD_SIZE;

/// Returns the container format of a font file.
///
/// The format is identified by the first four bytes.
/// Buffers shorter than four bytes and unknown signatures yield [`FontFormat::Unknown`].
///
/// ```
/// # use ttxml::sfnt::detect_format;
/// # use ttxml::sfnt::types::FontFormat;
/// assert_eq!(detect_format(b"OTTO\x00\x01"), FontFormat::Otf);
/// assert_eq!(detect_format(b"OT"), FontFormat::Unknown);
/// ```
pub fn detect_format(data: &[u8]) -> FontFormat {
    match data.get(..SFNT_VERSION_FIELD_SIZE) {
        Some(signature) => {
            // slice is convertible to `[u8; 4]` because of the range above
            let signature: [u8; 4] = signature.try_into().unwrap_or_default();
            FontFormat::from_signature(u32::from_be_bytes(signature))
        }
        None => FontFormat::Unknown,
    }
}

/// A record of the table directory.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TableRecord {
    /// The table tag.
    pub tag: Tag,
    /// The declared checksum; it is kept as metadata and never verified.
    pub checksum: u32,
    /// The offset of the table from the start of the font.
    pub offset: u32,
    /// The length of the table in bytes, excluding padding.
    pub length: u32,
}

/// A table read from the table directory.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TableEntry {
    /// The directory record of the table.
    pub record: TableRecord,
    /// A copy of the table bytes.
    pub data: Bytes,
}

/// The parsed table directory of an SFNT container.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Directory {
    /// The `sfntVersion` of the container.
    pub sfnt_version: u32,
    /// The tables in directory order.
    pub entries: Vec<TableEntry>,
}

/// Reads the table directory of an SFNT container.
///
/// The preamble and all table records must lie within `data`; otherwise the directory can not be read.
/// A record whose table range lies outside `data` is dropped with a [`Warning::DroppedEntry`] while the remaining tables are still read.
/// `searchRange`, `entrySelector`, and `rangeShift` are not validated.
pub fn parse_directory(data: &[u8], warnings: &mut Warnings) -> Result<Directory> {
    let mut cursor = Cursor::new(data, "table directory");

    if data.len() < PREAMBLE_SIZE {
        return Err(Error::Truncated {
            what: "table directory",
            offset: 0,
            needed: PREAMBLE_SIZE,
            available: data.len(),
        });
    }

    let sfnt_version = cursor.read_u32()?;
    let num_tables = cursor.read_u16()?;
    cursor.skip(SEARCH_RANGE_FIELD_SIZE + ENTRY_SELECTOR_FIELD_SIZE + RANGE_SHIFT_FIELD_SIZE)?;

    log::info!(
        "read table directory: sfntVersion 0x{:08X}, {} tables",
        sfnt_version,
        num_tables
    );

    let mut entries = Vec::with_capacity(num_tables as usize);

    for _ in 0..num_tables {
        let record = TableRecord {
            tag: cursor.read_tag()?,
            checksum: cursor.read_u32()?,
            offset: cursor.read_u32()?,
            length: cursor.read_u32()?,
        };

        let start = record.offset as usize;
        let end = u64::from(record.offset) + u64::from(record.length);

        if end > data.len() as u64 {
            warnings.push(Warning::DroppedEntry {
                tag: record.tag,
                offset: record.offset,
                length: record.length,
            });
            continue;
        }

        log::debug!(
            "table {} at offset {} with length {}",
            record.tag,
            record.offset,
            record.length
        );

        let table = &data[start..start + record.length as usize];
        entries.push(TableEntry {
            record,
            data: Bytes::copy_from_slice(table),
        });
    }

    Ok(Directory {
        sfnt_version,
        entries,
    })
}

/// Returns the `searchRange`, `entrySelector`, and `rangeShift` for a binary search over `count` items of `item_size` bytes.
///
/// All three values are `0` if `count` is `0`.
pub(crate) fn binary_search_params(count: u16, item_size: u16) -> (u16, u16, u16) {
    if count == 0 {
        return (0, 0, 0);
    }

    let entry_selector = 15 - count.leading_zeros() as u16;
    let search_range = item_size.wrapping_shl(u32::from(entry_selector));
    let range_shift = count.wrapping_mul(item_size).wrapping_sub(search_range);

    (search_range, entry_selector, range_shift)
}

/// Compiles an SFNT font.
///
/// `sfnt_version` is written to the first four bytes of the font.
/// The tables are written in the given order, each padded to a four-byte boundary.
/// Checksums are not computed; every record's `checksum` field is written as `0`.
///
/// # Example
///
/// ```
/// # use ttxml::sfnt::types::{Flavor, Tag};
/// # use ttxml::sfnt::compile;
/// use bytes::Bytes;
///
/// let tables = vec![(Tag(*b"abcd"), Bytes::from_static(b"xyz"))];
/// let font = compile(Flavor::TrueType.sfnt_version(), &tables);
/// assert_eq!(font.len(), 12 + 16 + 4);
/// ```
pub fn compile(sfnt_version: u32, tables: &[(Tag, Bytes)]) -> Bytes {
    log::info!(
        "SFNT version: 0x{:X}{}",
        sfnt_version,
        Tag::from_u32(sfnt_version).map_or(String::new(), |x| format!(" ({})", x))
    );
    log::info!("Write Table Directory Preamble");

    let length = PREAMBLE_SIZE
        + (tables.len() * TABLE_RECORD_SIZE)
        + tables.iter().map(|(_, x)| padded_len(x.len())).sum::<usize>();
    let mut buf = BytesMut::with_capacity(length);

    buf.put_u32(sfnt_version);

    let num_tables: u16 = tables.len() as u16;
    buf.put_u16(num_tables);

    let (search_range, entry_selector, range_shift) =
        binary_search_params(num_tables, TABLE_RECORD_SIZE as u16);
    buf.put_u16(search_range);
    buf.put_u16(entry_selector);
    buf.put_u16(range_shift);

    log::info!("Write Table Records");

    let mut offset: u32 = (PREAMBLE_SIZE + (tables.len() * TABLE_RECORD_SIZE)) as u32;

    for (tag, table) in tables {
        buf.put_u32((*tag).into());
        buf.put_u32(0);
        buf.put_u32(offset);
        buf.put_u32(table.len() as u32);

        offset += padded_len(table.len()) as u32;
    }

    log::info!("Write Tables");

    for (tag, table) in tables {
        log::debug!("writing table {} ...", tag);

        buf.put_slice(table);
        buf.put_bytes(0, padded_len(table.len()) - table.len());
    }

    debug_assert_eq!(length, buf.len());

    buf.freeze()
}

/// Returns `len` rounded up to a multiple of four.
fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}
