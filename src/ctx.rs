//! The context with which a conversion is performed.

use crate::sfnt::types::{Flavor, Tag};

/// A context defines customization options.
///
/// ```
/// # use ttxml::ctx::Context;
/// let ctx = Context {
///     only_tables: vec!["head".parse().unwrap()],
///     ..Context::default()
/// };
/// assert!(ctx.includes("head".parse().unwrap()));
/// assert!(!ctx.includes("name".parse().unwrap()));
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Context {
    /// The tables written to a table dump.
    ///
    /// If non-empty, all other tables are left out and [`skip_tables`](Context::skip_tables) is ignored.
    pub only_tables: Vec<Tag>,
    /// The tables left out of a table dump.
    pub skip_tables: Vec<Tag>,
    /// The flavor of fonts encoded from a table dump.
    pub flavor: Flavor,
    /// Whether a table that fails to decode is left out with a warning.
    ///
    /// If `false`, such a table fails the whole decode.
    pub ignore_decode_errors: bool,
}

impl Context {
    /// Whether the table `tag` is written to a table dump.
    pub fn includes(&self, tag: Tag) -> bool {
        if !self.only_tables.is_empty() {
            self.only_tables.contains(&tag)
        } else {
            !self.skip_tables.contains(&tag)
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context {
            only_tables: Vec::new(),
            skip_tables: Vec::new(),
            flavor: Flavor::default(),
            ignore_decode_errors: true,
        }
    }
}
