//! Turning a raw payload into storable records.
//!
//! The payload layout is positional: a comment header, the version division,
//! the `[DefaultProperties]` division, then any number of pattern divisions.
//! Every pattern division is parsed together with the default properties so
//! its sections can inherit from them.

use browscap_parse::{Divisions, Properties, parse_entries, resolve};
use browscap_store::Record;
use exn::{OptionExt, ResultExt};
use std::collections::BTreeMap;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

const VERSION_MARKER: &str = "Browscap Version";
const VERSION_SECTION: &str = "GJK_Browscap_Version";
const DEFAULT_PROPERTIES_MARKER: &str = "[DefaultProperties]";

/// What the version division says about the data set itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Release {
    /// Data set version as written in the payload.
    pub version: Option<String>,
    /// Release date, verbatim.
    pub released: Option<String>,
}
impl Release {
    /// Reads `[GJK_Browscap_Version]`, ignoring anything it can't parse: the
    /// division has already been accepted by its marker alone.
    fn from_division(division: &str) -> Self {
        let Ok(entries) = parse_entries(division) else {
            return Self::default();
        };
        let Some(section) = entries.get(VERSION_SECTION) else {
            return Self::default();
        };
        let field = |key: &str| section.get(key).filter(|v| !v.is_empty()).cloned();
        Self {
            version: field("version"),
            released: field("released"),
        }
    }
}

/// A fully processed payload, ready to replace the stored records.
#[derive(Debug)]
pub struct Processed {
    pub release: Release,
    pub records: Vec<Record>,
}

/// Validates the preamble and resolves every pattern division.
///
/// Nothing is written anywhere: a payload either processes completely or not
/// at all.
#[instrument(skip_all, fields(payload_size = payload.len(), divisions, records))]
pub fn process(payload: &str) -> Result<Processed> {
    let mut divisions = Divisions::new(payload);

    let header = divisions.next().ok_or_raise(|| ErrorKind::Truncated)?;
    if header.len() >= payload.len() {
        exn::bail!(ErrorKind::Truncated);
    }
    let version = divisions.next().ok_or_raise(|| ErrorKind::Truncated)?;
    if !version.contains(VERSION_MARKER) {
        exn::bail!(ErrorKind::MissingVersionMarker);
    }
    let release = Release::from_division(version);
    let defaults = divisions.next().ok_or_raise(|| ErrorKind::Truncated)?;
    if !defaults.contains(DEFAULT_PROPERTIES_MARKER) {
        exn::bail!(ErrorKind::MissingDefaultProperties);
    }

    let mut resolved: BTreeMap<String, Properties> = BTreeMap::new();
    let mut count = 3;
    let mut text = String::new();
    for division in divisions {
        text.clear();
        text.push_str(defaults);
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(division);
        let entries = parse_entries(&text).or_raise(|| ErrorKind::Parse(count))?;
        resolved.extend(resolve(&entries));
        count += 1;
    }
    if resolved.is_empty() {
        // A catalog without a single pattern would wipe every classification.
        exn::bail!(ErrorKind::Truncated);
    }

    let records: Vec<Record> = resolved
        .into_iter()
        .map(|(pattern, properties)| Record::new(pattern, properties))
        .collect();
    tracing::Span::current()
        .record("divisions", count)
        .record("records", records.len());
    Ok(Processed { release, records })
}
