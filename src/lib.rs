//! # ttxml
//!
//! *ttxml* converts SFNT fonts (TrueType and OpenType) to an XML table dump and back.
//!
//! The [`Processor`] offers the common operations: detecting the container format, summarizing a font, listing its tables, and converting in both directions.
//! The lower-level modules expose the [SFNT container](crate::sfnt), the [table codecs](crate::sfnt::tables), and the [XML form](crate::ttx) individually.
//!
//! ## Supported tables
//!
//! - The [`head` table](crate::sfnt::tables::head).
//! - The [`name` table](crate::sfnt::tables::name), formats 0 and 1.
//! - The [`cmap` table](crate::sfnt::tables::cmap) with [format 4](crate::sfnt::tables::cmap::format4) and [format 12](crate::sfnt::tables::cmap::format12) subtables.
//!
//! All other tables are written as [hex dumps](crate::sfnt::tables::raw).
//! They can not be read back from text and are left out of re-encoded fonts.
//!
//! ## Example
//!
//! ```
//! use ttxml::{Context, Processor};
//!
//! let processor = Processor::new();
//! let text = r#"<ttFont sfntVersion="\x00\x01\x00\x00">
//!   <name>
//!     <namerecord nameID="1" platformID="3" platEncID="1" langID="0x409">Sample</namerecord>
//!   </name>
//! </ttFont>"#;
//!
//! let conversion = processor.encode_from_text(text, &Context::default());
//! let font = conversion.output.unwrap();
//! assert_eq!(processor.font_info(&font).metadata.family_name, "Sample");
//! ```

#![deny(missing_docs, missing_debug_implementations)]

pub mod ctx;
pub mod data;
pub mod error;
pub mod processor;
pub mod sfnt;
pub mod ttx;
mod util;

pub use ctx::Context;
pub use data::FontInfo;
pub use error::{Error, Result, Warning};
pub use processor::{Conversion, Processor};
pub use sfnt::types::{Flavor, FontFormat, Tag};
