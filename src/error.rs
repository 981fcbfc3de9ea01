//! Errors and warnings reported while transcoding.
//!
//! An [`Error`] ends the operation that raised it.
//! A [`Warning`] records a condition that was handled by skipping the smallest affected scope (a directory entry, a table, a single name string) so that the rest of the font is still processed.

use crate::sfnt::types::{FontFormat, Tag};

/// The result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error that ends a decode or encode operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The leading signature does not belong to any known container format.
    #[error("unrecognized font format")]
    UnrecognizedFormat,
    /// The container format is known but can not be read without an external codec.
    #[error("{0} containers are not supported")]
    UnsupportedFormat(FontFormat),
    /// A structure extends past the end of the buffer.
    #[error("truncated {what}: {needed} bytes needed at offset {offset} but only {available} available")]
    Truncated {
        /// The structure being read.
        what: &'static str,
        /// The offset at which the structure starts.
        offset: usize,
        /// The number of bytes the structure requires.
        needed: usize,
        /// The number of bytes available at `offset`.
        available: usize,
    },
    /// A table's content does not satisfy its codec's preconditions.
    #[error("malformed {tag} table: {reason}")]
    Malformed {
        /// The table.
        tag: Tag,
        /// A description of the problem.
        reason: String,
    },
    /// The text is not well-formed XML.
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    /// The XML is well-formed but is not a table dump.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// A required element or attribute is absent.
    #[error("missing attribute `{attribute}` on <{element}>")]
    MissingValue {
        /// The element name.
        element: String,
        /// The attribute name.
        attribute: &'static str,
    },
    /// An attribute or text value can not be interpreted.
    #[error("invalid value {value:?} in <{element}>")]
    InvalidValue {
        /// The element name.
        element: String,
        /// The offending value.
        value: String,
    },
}

/// A non-fatal condition encountered while transcoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    /// A table directory entry points outside the buffer and was dropped.
    #[error("table {tag} at offset {offset} with length {length} lies outside the font and was dropped")]
    DroppedEntry {
        /// The table tag.
        tag: Tag,
        /// The declared offset.
        offset: u32,
        /// The declared length.
        length: u32,
    },
    /// A table could not be decoded or reconstructed and is absent from the result.
    #[error("table {tag} was dropped: {reason}")]
    DroppedTable {
        /// The table tag.
        tag: Tag,
        /// Why the table was dropped.
        reason: String,
    },
    /// A name record's string lies outside the table; the record is kept with an empty string.
    #[error("string of name record {index} lies outside the table and was left empty")]
    NameString {
        /// The index of the record in the table.
        index: usize,
    },
    /// The first `cmap` subtable could not be decoded; its mapping is empty.
    #[error("cmap subtable: {reason}")]
    CmapSubtable {
        /// Why the mapping is empty.
        reason: String,
    },
    /// A table dumped in raw form can not be rebuilt from its text.
    #[error("table {0} can not be reconstructed from its hex dump and was omitted")]
    Unreconstructable(Tag),
    /// Some data of a table could not be represented exactly when encoding.
    #[error("table {tag} was encoded lossily: {reason}")]
    Lossy {
        /// The table tag.
        tag: Tag,
        /// What was lost.
        reason: String,
    },
}

/// Collects warnings and logs each of them as it is recorded.
#[derive(Debug, Default)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Warnings(Vec::new())
    }

    /// Records a warning.
    pub fn push(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.0.push(warning);
    }

    /// The warnings recorded so far.
    pub fn as_slice(&self) -> &[Warning] {
        &self.0
    }

    /// Returns the recorded warnings.
    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}
