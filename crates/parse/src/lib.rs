//! Parsing of the Browscap user-agent capability catalog.
//!
//! The catalog is distributed as one large semicolon-delimited INI document.
//! Turning it into lookup-ready records happens in three steps, each in its
//! own module:
//!
//! - [`division`]: splits the raw payload into delimiter-bounded divisions.
//! - [`entry`]: parses a division's text into pattern sections and their
//!   raw properties.
//! - [`inherit`]: resolves every section's `Parent` chain so each record
//!   carries the full set of properties it inherits.
//!
//! Patterns in the catalog use `*` and `?` globs. Records are keyed by the
//! SQL `LIKE` form of the same pattern (`%` and `_`), see [`pattern`].

pub mod division;
pub mod entry;
pub mod error;
pub mod inherit;
pub mod pattern;

use std::collections::BTreeMap;

pub use crate::division::{Cursor, DELIMITER, Divisions, next_division};
pub use crate::entry::{Entries, parse_entries};
pub use crate::inherit::resolve;
pub use crate::pattern::{from_like, like_matches, to_like};

/// An open-ended bag of properties keyed by lowercased property name.
///
/// The upstream schema is versioned by the data provider, so properties are
/// kept as raw strings rather than a fixed struct. Booleans are normalized to
/// `"1"` and `"0"` during parsing; nothing else is coerced.
pub type Properties = BTreeMap<String, String>;

/// Section name of the synthetic root ancestor shared by every division.
pub const DEFAULT_PROPERTIES: &str = "DefaultProperties";

/// Reserved property: the user-agent string that was classified.
pub const USER_AGENT: &str = "useragent";
/// Reserved property: the matching pattern, in `*`/`?` form.
pub const BROWSER_NAME_PATTERN: &str = "browser_name_pattern";
/// Reserved property: name of the section properties are inherited from.
pub const PARENT: &str = "parent";
