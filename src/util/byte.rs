/// Extends `u8` by `picture`.
pub trait ByteExt {
    /// Returns a character representing the byte.
    ///
    /// Printable ASCII is returned as is.
    /// Non-printing characters (`0x00` to `0x1F`), the space character (`0x20`), and the delete character (`0x7F`) are represented by “Control Pictures” as defined by Unicode: <https://www.unicode.org/charts/PDF/U2400.pdf>.
    /// Bytes above `0x7F` are returned as the Latin-1 character of the same value.
    fn picture(&self) -> char;
}

impl ByteExt for u8 {
    fn picture(&self) -> char {
        let offset = match *self {
            0x00..=0x20 => u32::from(*self),
            0x7F => 0x21,
            other => return other as char,
        };

        std::char::from_u32(0x2400 + offset).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}
