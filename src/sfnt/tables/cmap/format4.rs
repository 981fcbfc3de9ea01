//! # Format 4: Segment mapping to delta values
//!
//! Implementation of the `cmap` format 4 subtable.
//!
//! *Specification:*
//! [OpenType](https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-4-segment-mapping-to-delta-values),
//! [TrueType](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6cmap.html).
//!
//! A format 4 subtable maps the Basic Multilingual Plane using segments.
//! A segment covers a range of continuous character codes and maps them to glyph ids in one of two ways:
//!
//! - A *shift* segment adds `idDelta` to each character code.
//!   It requires the glyph ids to be continuous as well.
//! - A *mix* segment stores the glyph id of each character code in `glyphIdArray` and points to it with `idRangeOffset`.
//!
//! [`encoding_segments`] forms one shift segment per run of continuous glyph ids and merges neighboring single-mapping segments into mix segments:
//!
//! ```text
//! glyph ids:  1,2,3 | 5 | 7 | 9,10 | 12 | 14,15
//! segments:   1,2,3 | 5,7   | 9,10 | 12 | 14,15
//! strategies: O       X       O      O    O
//! ```
//!
//! ```
//! # use ttxml::data::CharacterMap;
//! # use ttxml::error::Warnings;
//! # use ttxml::sfnt::tables::cmap::format4::{compile, decode};
//! let mut map = CharacterMap::new();
//! map.insert('A', 1);
//! map.insert('B', 2);
//! map.insert('C', 7);
//! let subtable = compile(&map, 0).unwrap();
//! let (language, decoded) = decode(&subtable, &mut Warnings::new()).unwrap();
//! assert_eq!(language, 0);
//! assert_eq!(decoded, map);
//! ```

use crate::data::{CharacterMap, MAX_GLYPH_ID};
use crate::error::{Result, Warning, Warnings};
use std::convert::TryFrom;
use crate::sfnt::binary_search_params;
use crate::util::cursor::Cursor;
use bytes::{BufMut, Bytes, BytesMut};
use itertools::Itertools;
use spans::Spans;
use std::mem::size_of;

/// The Unicode scaler used as a sentinel value for the character search.
///
/// Quoting the [OpenType specification][spec]:
///
/// > For the search to terminate, the final start code and endCode values must be 0xFFFF.
///
/// [spec]: https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-4-segment-mapping-to-delta-values
pub const SENTINEL_SCALER: char = '\u{FFFF}';

/// The size in bytes of the subtable header and `reservedPad`.
const CONSTANT_SIZE: usize = 8 * size_of::<u16>();
/// The size in bytes of a `glyphIdArray` field.
const GLYPH_ID_ARRAY_FIELD_SIZE: usize = size_of::<u16>();
/// The size in bytes of a single segment, excluding the additional size which may be required for `glyphIdArray`.
const SEGMENT_CORE_SIZE: usize = 4 * size_of::<u16>();

/// Decodes a format 4 subtable starting at the beginning of `data`.
///
/// Returns the `language` field and the character map.
/// Mappings of the sentinel character, mappings to glyph `0`, surrogate code points, and `glyphIdArray` reads outside of `data` are skipped.
/// The segment arrays themselves must lie within `data`.
/// A segment that does not start after the end of the previous segment is skipped with a [`Warning::CmapSubtable`].
pub fn decode(data: &[u8], warnings: &mut Warnings) -> Result<(u16, CharacterMap)> {
    let mut s = Cursor::new(data, "cmap format 4 subtable");
    let _format = s.read_u16()?;
    let _length = s.read_u16()?;
    let language = s.read_u16()?;
    let seg_count = (s.read_u16()? / 2) as usize;
    s.skip(3 * size_of::<u16>())?;

    let end_codes = read_array(&mut s, seg_count)?;
    s.skip(size_of::<u16>())?;
    let start_codes = read_array(&mut s, seg_count)?;
    let id_deltas = read_array(&mut s, seg_count)?;
    let id_range_offsets_pos = s.position();
    let id_range_offsets = read_array(&mut s, seg_count)?;

    let mut map = CharacterMap::new();
    let mut previous_end: Option<u16> = None;

    for index in 0..seg_count {
        let (start, end) = (start_codes[index], end_codes[index]);
        let delta = id_deltas[index];
        let range_offset = id_range_offsets[index] as usize;

        if start > end {
            log::debug!("skipping inverted segment {:04X}..{:04X}", start, end);
            continue;
        }

        if previous_end.map_or(false, |x| start <= x) {
            warnings.push(Warning::CmapSubtable {
                reason: format!("segment {} overlaps or precedes the previous segment", index),
            });
            continue;
        }
        previous_end = Some(end);

        for code in start..=end {
            let gid = if range_offset == 0 {
                code.wrapping_add(delta)
            } else {
                // `idRangeOffset` is relative to its own position
                let pos = id_range_offsets_pos
                    + index * size_of::<u16>()
                    + range_offset
                    + (code - start) as usize * GLYPH_ID_ARRAY_FIELD_SIZE;
                match data.get(pos..pos + GLYPH_ID_ARRAY_FIELD_SIZE) {
                    Some(&[high, low]) => match u16::from_be_bytes([high, low]) {
                        0 => 0,
                        gid => gid.wrapping_add(delta),
                    },
                    _ => continue,
                }
            };

            if gid == 0 {
                continue;
            }

            if let Some(c) = std::char::from_u32(u32::from(code)) {
                if c != SENTINEL_SCALER {
                    map.insert(c, u32::from(gid));
                }
            }
        }
    }

    Ok((language, map))
}

fn read_array(s: &mut Cursor, count: usize) -> Result<Vec<u16>> {
    (0..count).map(|_| s.read_u16()).collect()
}

/// Returns a `cmap` format 4 subtable representing the given character map.
///
/// Mappings at or above [`SENTINEL_SCALER`] are not representable and are ignored.
/// Returns `None` if a glyph id exceeds `0xFFFF` or the subtable would be longer than `0xFFFF` bytes.
pub fn compile(map: &CharacterMap, language: u16) -> Option<Bytes> {
    let mut segments = encoding_segments(map);
    segments.push(Segment::sentinel());

    compile_segments(map, &segments, language)
}

/// Returns a `cmap` format 4 subtable representing the given segments.
///
/// The last segment must be the [sentinel](Segment::sentinel).
/// Returns `None` under the same conditions as [`compile`].
pub fn compile_segments(map: &CharacterMap, segments: &[Segment], language: u16) -> Option<Bytes> {
    if map.range(..SENTINEL_SCALER).any(|(_, &gid)| gid > MAX_GLYPH_ID) {
        return None;
    }

    let length = CONSTANT_SIZE + segments.iter().map(Segment::size).sum::<usize>();
    let length_field = u16::try_from(length).ok()?;
    let glyph_id = |code: char| u16::try_from(map.get(&code).copied().unwrap_or(0)).ok();
    let mut buf = BytesMut::with_capacity(length);

    let seg_count = segments.len() as u16;
    let (search_range, entry_selector, range_shift) = binary_search_params(seg_count, 2);

    buf.put_u16(4);
    buf.put_u16(length_field);
    buf.put_u16(language);
    buf.put_u16(seg_count * 2);
    buf.put_u16(search_range);
    buf.put_u16(entry_selector);
    buf.put_u16(range_shift);

    for segment in segments {
        buf.put_u16(segment.end as u16);
    }

    // reservedPad
    buf.put_u16(0);

    for segment in segments {
        buf.put_u16(segment.start as u16);
    }

    for segment in segments {
        match segment.strategy {
            SegmentEncodingStrategy::Shift => {
                // the sentinel has no mapping and maps to `.notdef`
                let start_gid = i32::from(glyph_id(segment.start)?);
                buf.put_i16(start_gid.wrapping_sub(segment.start as i32) as i16);
            }
            SegmentEncodingStrategy::Mix => buf.put_i16(0),
        }
    }

    // distance from the current `idRangeOffset` field to the next free `glyphIdArray` field
    let mut glyph_id_array_offset = segments.len() * size_of::<u16>();

    for segment in segments {
        match segment.strategy {
            SegmentEncodingStrategy::Shift => buf.put_u16(0),
            SegmentEncodingStrategy::Mix => {
                buf.put_u16(u16::try_from(glyph_id_array_offset).ok()?);
                glyph_id_array_offset += segment.len() * GLYPH_ID_ARRAY_FIELD_SIZE;
            }
        }
        glyph_id_array_offset -= size_of::<u16>();
    }

    for segment in segments
        .iter()
        .filter(|x| x.strategy == SegmentEncodingStrategy::Mix)
    {
        for code in segment.start..=segment.end {
            buf.put_u16(glyph_id(code)?);
        }
    }

    assert_eq!(length, buf.len());

    Some(buf.freeze())
}

/// Returns a segmentation of the given character map suitable for [`compile_segments`].
///
/// Mappings at or above [`SENTINEL_SCALER`] are ignored.
/// The sentinel segment is not included.
pub fn encoding_segments(map: &CharacterMap) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut spans = map
        .range(..SENTINEL_SCALER)
        .spans_by_key(|(&code, _)| code as u32, |a, b| a + 1 == b);

    while let Some(span) = spans.next() {
        segments.extend(encoding_segments_continuous(span));
    }

    log::trace!(
        "{} segments ({})",
        segments.len(),
        segments.iter().map(|x| format!("{:?}", x.strategy)).join("")
    );

    segments
}

/// Returns a segmentation of mappings with continuous character codes.
fn encoding_segments_continuous<'a, I>(mappings: I) -> Vec<Segment>
where
    I: IntoIterator<Item = (&'a char, &'a u32)>,
{
    let mut segments: Vec<Segment> = Vec::new();
    let mut runs = mappings
        .into_iter()
        .spans_by_key(|(_, &gid)| gid, |a, b| a.checked_add(1) == Some(b));

    while let Some(mut run) = runs.next() {
        let start = match run.next() {
            Some((&code, _)) => code,
            None => continue,
        };
        let end = run.last().map_or(start, |(&code, _)| code);
        let run = Segment {
            start,
            end,
            strategy: SegmentEncodingStrategy::Shift,
        };

        match segments.last_mut() {
            // a run of single mappings is cheaper as one mix segment
            Some(last)
                if run.len() == 1
                    && (last.strategy == SegmentEncodingStrategy::Mix || last.len() == 1) =>
            {
                last.end = run.end;
                last.strategy = SegmentEncodingStrategy::Mix;
            }
            _ => segments.push(run),
        }
    }

    segments
}

/// A segment is a range of continuous character codes with an encoding strategy.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Segment {
    /// The start of the continuous character code range.
    pub start: char,
    /// The end of the continuous character code range.
    pub end: char,
    /// The strategy used to encode the segment.
    pub strategy: SegmentEncodingStrategy,
}

impl Segment {
    /// Returns the segment which ends a list of segments.
    ///
    /// It starts and ends at [`SENTINEL_SCALER`] and maps to glyph `0`.
    pub fn sentinel() -> Segment {
        Segment {
            start: SENTINEL_SCALER,
            end: SENTINEL_SCALER,
            strategy: SegmentEncodingStrategy::Shift,
        }
    }

    /// The number of mappings managed by the segment.
    pub fn len(&self) -> usize {
        ((self.end as u32) - (self.start as u32)) as usize + 1
    }

    /// The size in bytes required to represent the segment, including its `glyphIdArray` fields.
    pub fn size(&self) -> usize {
        match self.strategy {
            SegmentEncodingStrategy::Shift => SEGMENT_CORE_SIZE,
            SegmentEncodingStrategy::Mix => {
                SEGMENT_CORE_SIZE + self.len() * GLYPH_ID_ARRAY_FIELD_SIZE
            }
        }
    }
}

/// The strategy used to encode a segment.
#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub enum SegmentEncodingStrategy {
    /// All mappings share one offset from character code to glyph id, stored in `idDelta`.
    Shift,
    /// Each glyph id is stored in `glyphIdArray`.
    Mix,
}

impl std::fmt::Debug for SegmentEncodingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shift => f.write_str("O"),
            Self::Mix => f.write_str("X"),
        }
    }
}
