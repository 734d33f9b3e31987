//! Parent inheritance.
//!
//! Every section may name another section in its `Parent` property. A
//! section's resolved properties are its own properties, with the gaps filled
//! in from its parent, then its grandparent, and so on. Closer sections always
//! win.

use std::collections::{BTreeMap, HashSet};

use tracing::instrument;

use crate::entry::Entries;
use crate::pattern::to_like;
use crate::{DEFAULT_PROPERTIES, PARENT, Properties};

/// Resolves the inheritance chain of every section in `entries`.
///
/// The result is keyed by storage pattern ([`to_like`]) and never contains
/// [`DEFAULT_PROPERTIES`]. A walk stops when a section has no parent, names a
/// section that doesn't exist, names the section visited just before it, or
/// names any section already visited on the same walk, so malformed cycles
/// terminate.
///
/// Patterns that collide once translated keep the properties of the section
/// that sorts last.
#[instrument(skip_all, fields(sections = entries.len()))]
pub fn resolve(entries: &Entries) -> BTreeMap<String, Properties> {
    entries
        .iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_PROPERTIES)
        .map(|(name, _)| (to_like(name), resolve_one(entries, name)))
        .collect()
}

/// Resolves one section by name; an unknown name resolves to no properties.
pub fn resolve_one(entries: &Entries, name: &str) -> Properties {
    let Some(own) = entries.get(name) else {
        return Properties::new();
    };
    let mut resolved = own.clone();
    let mut visited = HashSet::from([name]);
    let mut previous: Option<&str> = None;
    let mut current = own;

    while let Some(parent) = current.get(PARENT).map(String::as_str) {
        if previous == Some(parent) || !visited.insert(parent) {
            break;
        }
        let Some(ancestor) = entries.get(parent) else {
            tracing::trace!(section = name, parent, "Parent section not found; treating as empty");
            break;
        };
        for (key, value) in ancestor {
            resolved.entry(key.clone()).or_insert_with(|| value.clone());
        }
        previous = Some(parent);
        current = ancestor;
    }
    resolved
}
