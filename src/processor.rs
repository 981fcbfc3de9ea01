//! The conversion service.
//!
//! A [`Processor`] holds no state between calls; one instance may be shared by any number of threads.
//!
//! ```
//! # use ttxml::ctx::Context;
//! # use ttxml::processor::Processor;
//! # use ttxml::sfnt::types::FontFormat;
//! let processor = Processor::new();
//! assert_eq!(processor.detect_format(b"OTTO"), FontFormat::Otf);
//!
//! let conversion = processor.decode_to_text(b"wOFF", &Context::default());
//! assert!(!conversion.success());
//! ```

use crate::ctx::Context;
use crate::data::{FontDocument, FontInfo};
use crate::error::{Error, Result, Warning, Warnings};
use crate::sfnt::{self, parse_directory};
use crate::sfnt::types::{FontFormat, Tag};
use crate::ttx;
use bytes::Bytes;

/// The outcome of a conversion together with the warnings raised on the way.
#[derive(Debug)]
pub struct Conversion<T> {
    /// The converted value, or the error that ended the conversion.
    pub output: Result<T, Error>,
    /// The conditions that were handled without ending the conversion.
    pub warnings: Vec<Warning>,
}

impl<T> Conversion<T> {
    fn new(output: Result<T>, warnings: Warnings) -> Self {
        if let Err(err) = &output {
            log::error!("conversion failed: {}", err);
        }

        Conversion {
            output,
            warnings: warnings.into_vec(),
        }
    }

    /// Whether the conversion produced an output.
    pub fn success(&self) -> bool {
        self.output.is_ok()
    }
}

/// Converts fonts to table dumps and back.
#[derive(Debug, Default, Clone, Copy)]
pub struct Processor;

impl Processor {
    /// Creates a processor.
    pub fn new() -> Self {
        Processor
    }

    /// Returns the container format of `data`.
    pub fn detect_format(&self, data: &[u8]) -> FontFormat {
        sfnt::detect_format(data)
    }

    /// Returns a summary of `data`.
    ///
    /// The summary lists the tables that decoded, so a table whose codec fails is missing here but present in [`Processor::list_tables`].
    /// If the font can not be read, the summary only carries the detected format.
    pub fn font_info(&self, data: &[u8]) -> FontInfo {
        let mut warnings = Warnings::new();

        match FontDocument::decode(data, &Context::default(), &mut warnings) {
            Ok(document) => document.info(),
            Err(err) => {
                log::info!("no font info: {}", err);
                FontInfo::empty(self.detect_format(data))
            }
        }
    }

    /// Returns the table tags of `data` in directory order.
    ///
    /// Every directory entry within `data` is listed, whether or not its table decodes.
    /// Tables whose directory entry lies outside `data` are not listed.
    /// Returns an empty list if `data` is not a readable SFNT container.
    pub fn list_tables(&self, data: &[u8]) -> Vec<Tag> {
        if !self.detect_format(data).is_sfnt() {
            return Vec::new();
        }

        let mut warnings = Warnings::new();
        match parse_directory(data, &mut warnings) {
            Ok(directory) => directory.entries.iter().map(|x| x.record.tag).collect(),
            Err(err) => {
                log::info!("no tables: {}", err);
                Vec::new()
            }
        }
    }

    /// Decodes `data` and returns its table dump.
    pub fn decode_to_text(&self, data: &[u8], ctx: &Context) -> Conversion<String> {
        let mut warnings = Warnings::new();
        let output = FontDocument::decode(data, ctx, &mut warnings)
            .map(|document| ttx::to_text(&document, ctx));

        Conversion::new(output, warnings)
    }

    /// Reads a table dump and returns the encoded font with the signature of [`Context::flavor`].
    pub fn encode_from_text(&self, text: &str, ctx: &Context) -> Conversion<Bytes> {
        let mut warnings = Warnings::new();
        let output = ttx::from_text(text, &mut warnings)
            .map(|document| document.compile(ctx.flavor, &mut warnings));

        Conversion::new(output, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::sample_font;
    use crate::sfnt::tables::head::{self, tests::sample as sample_head, HEAD_SIZE};
    use crate::sfnt::tables::{FontTable, CMAP, HEAD, MAXP, NAME};
    use crate::sfnt::types::Flavor;
    use pretty_assertions::assert_eq;

    fn minimal_font() -> Bytes {
        let tables = vec![(HEAD, head::compile(&sample_head()))];
        sfnt::compile(Flavor::TrueType.sfnt_version(), &tables)
    }

    #[test]
    fn test_detect_format() {
        let processor = Processor::new();

        for data in &[&b""[..], &b"\0"[..], &b"\0\x01"[..], &b"OTT"[..]] {
            assert_eq!(processor.detect_format(data), FontFormat::Unknown);
        }
        assert_eq!(processor.detect_format(&minimal_font()), FontFormat::Ttf);
        assert_eq!(processor.detect_format(b"OTTO"), FontFormat::Otf);
        assert_eq!(processor.detect_format(b"wOFF"), FontFormat::Woff);
        assert_eq!(processor.detect_format(b"wOF2"), FontFormat::Woff2);
        assert_eq!(processor.detect_format(b"ttcf"), FontFormat::Ttc);
    }

    #[test]
    fn test_list_tables() {
        let processor = Processor::new();

        assert_eq!(processor.list_tables(&[]), Vec::<Tag>::new());
        assert_eq!(processor.list_tables(b"\0\x01\0\0\0"), Vec::<Tag>::new());
        assert_eq!(
            processor.list_tables(&sample_font()),
            vec![HEAD, NAME, CMAP, MAXP]
        );
    }

    #[test]
    fn test_font_info() {
        let processor = Processor::new();
        let info = processor.font_info(&sample_font());

        assert_eq!(info.format, FontFormat::Ttf);
        assert_eq!(info.tables, vec![HEAD, NAME, CMAP, MAXP]);
        assert_eq!(info.metadata.family_name, "A & B < C");
        assert_eq!(info.metadata.units_per_em, 2048);
        assert_eq!(info.font_count, 1);

        let info = processor.font_info(b"wOF2 and then some");
        assert_eq!(info, FontInfo::empty(FontFormat::Woff2));
        assert_eq!(processor.font_info(&[]).format, FontFormat::Unknown);
    }

    #[test]
    fn test_malformed_table_listed_but_not_in_info() {
        let processor = Processor::new();
        let tables = vec![
            (HEAD, Bytes::from_static(&[0; 10])),
            (NAME, Bytes::from_static(&[0; 6])),
        ];
        let font = sfnt::compile(Flavor::TrueType.sfnt_version(), &tables);

        assert_eq!(processor.list_tables(&font), vec![HEAD, NAME]);
        assert_eq!(processor.font_info(&font).tables, vec![NAME]);
    }

    #[test]
    fn test_decode_to_text_head_fields() {
        let processor = Processor::new();
        let conversion = processor.decode_to_text(&minimal_font(), &Context::default());

        assert!(conversion.success());
        let text = conversion.output.unwrap();
        assert!(text.contains("unitsPerEm value=\"2048\""));
        assert!(text.contains("created value=\"1561852800\""));
    }

    #[test]
    fn test_decode_to_text_failures() {
        let processor = Processor::new();
        let ctx = Context::default();

        assert!(!processor.decode_to_text(&[0, 1, 0, 0], &ctx).success());
        assert!(matches!(
            processor.decode_to_text(b"ttcf", &ctx).output,
            Err(Error::UnsupportedFormat(FontFormat::Ttc))
        ));
        assert!(matches!(
            processor.decode_to_text(b"junk", &ctx).output,
            Err(Error::UnrecognizedFormat)
        ));
    }

    #[test]
    fn test_round_trip_minimal_font() {
        let processor = Processor::new();
        let ctx = Context::default();
        let text = processor.decode_to_text(&minimal_font(), &ctx).output.unwrap();
        let conversion = processor.encode_from_text(&text, &ctx);

        assert!(conversion.success());
        assert!(conversion.warnings.is_empty());
        let font = conversion.output.unwrap();

        assert_eq!(&font[..4], &[0, 1, 0, 0]);
        assert_eq!(&font[4..6], &[0, 1]);
        assert_eq!(processor.list_tables(&font), vec![HEAD]);

        let table = &font[12 + 16..12 + 16 + HEAD_SIZE];
        assert_eq!(head::decode(table).unwrap(), sample_head());
    }

    #[test]
    fn test_encode_flavor_and_warnings() {
        let processor = Processor::new();
        let text = processor
            .decode_to_text(&sample_font(), &Context::default())
            .output
            .unwrap();
        let ctx = Context {
            flavor: Flavor::Cff,
            ..Context::default()
        };
        let conversion = processor.encode_from_text(&text, &ctx);

        assert_eq!(conversion.warnings, vec![Warning::Unreconstructable(MAXP)]);
        let font = conversion.output.unwrap();
        assert_eq!(processor.detect_format(&font), FontFormat::Otf);

        let mut warnings = Warnings::new();
        let document = FontDocument::decode(&font, &ctx, &mut warnings).unwrap();
        assert_eq!(document.tags(), vec![HEAD, NAME, CMAP]);
        assert!(matches!(document.get(NAME), Some(FontTable::Name(_))));
    }

    #[test]
    fn test_encode_from_text_failure() {
        let conversion = Processor::new().encode_from_text("not xml", &Context::default());
        assert!(!conversion.success());
    }
}
