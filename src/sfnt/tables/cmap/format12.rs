//! # Format 12: Segmented coverage
//!
//! Implementation of the `cmap` format 12 subtable.
//!
//! *Specification:*
//! [OpenType](https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-12-segmented-coverage),
//! [TrueType](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6cmap.html).
//!
//! A format 12 subtable maps the full Unicode codespace with groups.
//! Each group maps a range of continuous character codes to a range of continuous glyph ids.
//!
//! ```
//! # use ttxml::data::CharacterMap;
//! # use ttxml::sfnt::tables::cmap::format12::{compile, form_groups};
//! let mut map = CharacterMap::new();
//! map.insert('A', 1);
//! map.insert('B', 2);
//! map.insert('\u{1F600}', 3);
//! assert_eq!(form_groups(&map).len(), 2);
//! let subtable = compile(&map, 0);
//! ```

use crate::data::CharacterMap;
use crate::data::MAX_GLYPH_ID;
use crate::error::{Result, Warning, Warnings};
use crate::util::cursor::Cursor;
use bytes::{BufMut, Bytes, BytesMut};
use spans::Spans;
use std::mem::size_of;

/// The size in bytes of the subtable header.
const CONSTANT_SIZE: usize = 2 * size_of::<u16>() + 3 * size_of::<u32>();
/// The size in bytes of a sequential map group.
const GROUP_SIZE: usize = 3 * size_of::<u32>();
/// The largest Unicode scalar value.
const MAX_CODE: u32 = 0x10_FFFF;

/// Decodes a format 12 subtable starting at the beginning of `data`.
///
/// Returns the `language` field and the character map.
/// The groups must lie within `data`.
/// Codes past U+10FFFF, surrogate code points, and mappings to glyph `0` are skipped.
/// A group that does not start after the end of the previous group, or that maps to glyph ids above `0xFFFF`, is skipped with a [`Warning::CmapSubtable`].
pub fn decode(data: &[u8], warnings: &mut Warnings) -> Result<(u32, CharacterMap)> {
    let mut s = Cursor::new(data, "cmap format 12 subtable");
    let _format = s.read_u16()?;
    let _reserved = s.read_u16()?;
    let _length = s.read_u32()?;
    let language = s.read_u32()?;
    let num_groups = s.read_u32()?;

    let mut map = CharacterMap::new();
    let mut previous_end: Option<u32> = None;

    for index in 0..num_groups {
        let group = SequentialMapGroup {
            start_char_code: s.read_u32()?,
            end_char_code: s.read_u32()?,
            start_glyph_id: s.read_u32()?,
        };

        let end = group.end_char_code.min(MAX_CODE);
        if group.start_char_code > end {
            log::debug!("skipping group {:?}", group);
            continue;
        }

        if previous_end.map_or(false, |x| group.start_char_code <= x) {
            warnings.push(Warning::CmapSubtable {
                reason: format!("group {} overlaps or precedes the previous group", index),
            });
            continue;
        }
        previous_end = Some(end);

        let last_glyph_id = u64::from(group.start_glyph_id) + u64::from(end - group.start_char_code);
        if last_glyph_id > u64::from(MAX_GLYPH_ID) {
            warnings.push(Warning::CmapSubtable {
                reason: format!("group {} maps to glyph ids above {}", index, MAX_GLYPH_ID),
            });
            continue;
        }

        for code in group.start_char_code..=end {
            let gid = group.start_glyph_id + (code - group.start_char_code);
            if gid == 0 {
                continue;
            }
            if let Some(c) = std::char::from_u32(code) {
                map.insert(c, gid);
            }
        }
    }

    Ok((language, map))
}

/// Returns a `cmap` format 12 subtable representing the given character map.
pub fn compile(map: &CharacterMap, language: u32) -> Bytes {
    let groups = form_groups(map);
    compile_groups(&groups, language)
}

/// Returns a `cmap` format 12 subtable representing the given groups.
///
/// The groups need to be in order of increasing `start_char_code`.
pub fn compile_groups(groups: &[SequentialMapGroup], language: u32) -> Bytes {
    let length = CONSTANT_SIZE + (groups.len() * GROUP_SIZE);
    let mut buf = BytesMut::with_capacity(length);

    buf.put_u16(12);
    // reserved
    buf.put_u16(0);
    buf.put_u32(length as u32);
    buf.put_u32(language);
    buf.put_u32(groups.len() as u32);

    for group in groups {
        buf.put_u32(group.start_char_code);
        buf.put_u32(group.end_char_code);
        buf.put_u32(group.start_glyph_id);
    }

    assert_eq!(length, buf.len());

    buf.freeze()
}

/// Returns the groups representing the given character map in order of increasing `start_char_code`.
///
/// Each run of mappings with continuous character codes and continuous glyph ids forms one group.
pub fn form_groups(map: &CharacterMap) -> Vec<SequentialMapGroup> {
    let mut groups: Vec<SequentialMapGroup> = Vec::new();
    let mut spans = map.iter().spans_by_key(
        |(&code, &gid)| (code as u32, gid),
        |(code_a, gid_a), (code_b, gid_b)| {
            code_a + 1 == code_b && gid_a.checked_add(1) == Some(gid_b)
        },
    );

    while let Some(mut span) = spans.next() {
        let (start_char, start_glyph_id) = match span.next() {
            Some((&code, &gid)) => (code, gid),
            None => continue,
        };
        let end_char = span.last().map_or(start_char, |(&x, _)| x);
        groups.push(SequentialMapGroup {
            start_char_code: start_char as u32,
            end_char_code: end_char as u32,
            start_glyph_id,
        });
    }

    log::trace!("{} groups for {} mappings", groups.len(), map.len());

    groups
}

/// A continuous range of character codes where all character codes map to glyph ids with the same offset.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SequentialMapGroup {
    /// The character code of the start of the range.
    pub start_char_code: u32,
    /// The character code of the end of the range.
    pub end_char_code: u32,
    /// The glyph id corresponding to `start_char_code`.
    pub start_glyph_id: u32,
}
