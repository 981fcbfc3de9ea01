//! Types used throughout an SFNT file.

use crate::util::byte::ByteExt;
use std::fmt;
use std::str::FromStr;

/// Interpretation of four bytes as a four-letter tag.
///
/// The bytes are opaque: a tag read from a font need not be printable ASCII.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Creates a tag by interpreting a `u32` as 4 bytes with a big-endian layout.
    ///
    /// Returns `None` if any of the bytes are not in the range from `0x20` to `0x7E` (both inclusive). This value restriction matches the [OpenType specification for tags](https://docs.microsoft.com/en-us/typography/opentype/spec/otff#data-types).
    #[inline]
    pub fn from_u32(value: u32) -> Option<Tag> {
        let bytes = value.to_be_bytes();

        if bytes.iter().any(|&x| x < 0x20 || x > 0x7E) {
            None
        } else {
            Some(Tag(bytes))
        }
    }

    /// Returns the element name used for this tag in a table dump.
    ///
    /// - `OS/2` is written as `OS_2`.
    /// - Identifier-like tags are written without their trailing spaces (`cvt ` becomes `cvt`).
    /// - Any other tag is written as an underscore followed by its bytes in hexadecimal.
    ///
    /// [`Tag::from_xml_name`] reverses the mapping.
    ///
    /// ```
    /// # use ttxml::sfnt::types::Tag;
    /// assert_eq!(Tag(*b"OS/2").xml_name(), "OS_2");
    /// assert_eq!(Tag(*b"cvt ").xml_name(), "cvt");
    /// assert_eq!(Tag([0, 1, 2, 3]).xml_name(), "_00010203");
    /// ```
    pub fn xml_name(&self) -> String {
        let Tag(bytes) = *self;

        if bytes == *b"OS/2" {
            return "OS_2".to_string();
        }

        let trimmed_len = bytes.iter().rposition(|&x| x != b' ').map_or(0, |x| x + 1);
        let (name, padding) = bytes.split_at(trimmed_len);
        let is_identifier = name.first().map_or(false, |&x| x.is_ascii_alphabetic() || x == b'_')
            && name.iter().all(|&x| x.is_ascii_alphanumeric() || x == b'_')
            && padding.iter().all(|&x| x == b' ');

        if is_identifier {
            name.iter().map(|&x| x as char).collect()
        } else {
            format!("_{:08x}", u32::from_be_bytes(bytes))
        }
    }

    /// Returns the tag for an element name written by [`Tag::xml_name`], or `None` if the name does not denote a tag.
    pub fn from_xml_name(name: &str) -> Option<Tag> {
        if name == "OS_2" {
            return Some(Tag(*b"OS/2"));
        }

        if name.len() == 9 && name.starts_with('_') {
            if let Ok(value) = u32::from_str_radix(&name[1..], 16) {
                return Some(Tag(value.to_be_bytes()));
            }
        }

        name.parse().ok()
    }
}

impl From<Tag> for u32 {
    fn from(tag: Tag) -> u32 {
        u32::from_be_bytes(tag.into())
    }
}

impl From<Tag> for [u8; 4] {
    fn from(tag: Tag) -> [u8; 4] {
        let Tag(bytes) = tag;
        bytes
    }
}

/// An error returned when a string can not be interpreted as a tag.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("{0:?} is not a valid tag; tags consist of one to four printable ASCII characters")]
pub struct InvalidTag(pub String);

impl FromStr for Tag {
    type Err = InvalidTag;

    /// Parses a tag name, padding names shorter than four characters with spaces.
    ///
    /// ```
    /// # use ttxml::sfnt::types::Tag;
    /// assert_eq!("cvt".parse(), Ok(Tag(*b"cvt ")));
    /// assert!("glyf2".parse::<Tag>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let is_valid = !bytes.is_empty()
            && bytes.len() <= 4
            && bytes.iter().all(|&x| (0x20..=0x7E).contains(&x));

        if !is_valid {
            return Err(InvalidTag(s.to_string()));
        }

        let mut tag = [b' '; 4];
        tag[..bytes.len()].copy_from_slice(bytes);
        Ok(Tag(tag))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Tag(bytes) = self;
        write!(
            f,
            "'{}{}{}{}'",
            bytes[0] as char, bytes[1] as char, bytes[2] as char, bytes[3] as char
        )
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Tag(bytes) = self;
        write!(
            f,
            "{}{}{}{}",
            bytes[0].picture(),
            bytes[1].picture(),
            bytes[2].picture(),
            bytes[3].picture(),
        )
    }
}

/// The container format of a font file, as identified by its leading signature.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum FontFormat {
    /// The signature is not known.
    Unknown,
    /// TrueType flavoured SFNT (`00 01 00 00` or `00 00 01 00`).
    Ttf,
    /// CFF flavoured SFNT (`OTTO`).
    Otf,
    /// WOFF 1.0 (`wOFF`).
    Woff,
    /// WOFF 2.0 (`wOF2`).
    Woff2,
    /// TrueType collection (`ttcf`).
    Ttc,
}

impl FontFormat {
    /// Returns the format identified by a 32-bit big-endian signature.
    pub fn from_signature(signature: u32) -> FontFormat {
        match &signature.to_be_bytes() {
            [0x00, 0x01, 0x00, 0x00] | [0x00, 0x00, 0x01, 0x00] => FontFormat::Ttf,
            b"OTTO" => FontFormat::Otf,
            b"ttcf" => FontFormat::Ttc,
            b"wOFF" => FontFormat::Woff,
            b"wOF2" => FontFormat::Woff2,
            _ => FontFormat::Unknown,
        }
    }

    /// Whether the format is a plain SFNT container whose table directory can be read directly.
    pub fn is_sfnt(&self) -> bool {
        matches!(self, FontFormat::Ttf | FontFormat::Otf)
    }
}

impl Default for FontFormat {
    fn default() -> Self {
        FontFormat::Unknown
    }
}

impl fmt::Display for FontFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Ttf => "TTF",
            Self::Otf => "OTF",
            Self::Woff => "WOFF",
            Self::Woff2 => "WOFF2",
            Self::Ttc => "TTC",
        };
        f.write_str(name)
    }
}

/// The outline flavour written as the `sfntVersion` of an encoded font.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Flavor {
    /// TrueType outlines, signature `00 01 00 00`.
    TrueType,
    /// CFF outlines, signature `OTTO`.
    Cff,
}

impl Flavor {
    /// Returns the flavor for the given name, or `None` if the name is invalid.
    ///
    /// Names are matched case-insensitively: `ttf` and `truetype` select [`Flavor::TrueType`], `otf` and `cff` select [`Flavor::Cff`].
    pub fn from_name(name: &str) -> Option<Flavor> {
        match name.to_ascii_lowercase().as_str() {
            "ttf" | "truetype" => Some(Flavor::TrueType),
            "otf" | "cff" => Some(Flavor::Cff),
            _ => None,
        }
    }

    /// The `sfntVersion` written for this flavor.
    pub fn sfnt_version(&self) -> u32 {
        match self {
            Self::TrueType => 0x0001_0000,
            Self::Cff => u32::from(Tag(*b"OTTO")),
        }
    }
}

impl Default for Flavor {
    fn default() -> Self {
        Flavor::TrueType
    }
}
