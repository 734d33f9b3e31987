//! INI parsing of a single division.
//!
//! Scanning is literal: values are never interpolated or typed, with the one
//! exception that `true`/`false` values are rewritten to `1`/`0` before the
//! text is scanned.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use exn::OptionExt;
use regex::Regex;
use tracing::instrument;

use crate::Properties;
use crate::error::{ErrorKind, Result};

/// Parsed sections, keyed by the section name as written in the source.
pub type Entries = BTreeMap<String, Properties>;

static TRUE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)=[ \t]*"?true"?[ \t\r]*$"#).unwrap());
static FALSE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)=[ \t]*"?false"?[ \t\r]*$"#).unwrap());

/// Rewrites every `=true` line ending to `=1` and every `=false` line ending
/// to `=0`, tolerating optional quotes and surrounding blanks.
///
/// ```
/// use browscap_parse::entry::normalize_booleans;
///
/// assert_eq!(normalize_booleans("a=true\nb = \"false\"\nc=True\n"), "a=1\nb =0\nc=True\n");
/// ```
pub fn normalize_booleans(text: &str) -> Cow<'_, str> {
    match TRUE_REGEX.replace_all(text, "=1") {
        Cow::Borrowed(text) => FALSE_REGEX.replace_all(text, "=0"),
        Cow::Owned(text) => Cow::Owned(FALSE_REGEX.replace_all(&text, "=0").into_owned()),
    }
}

/// Parses INI text into sections of lowercased property names.
///
/// - `[Name]` starts a section; a repeated section name continues the
///   earlier section.
/// - `key = value` adds a property to the current section, the last
///   duplicate key wins. One pair of enclosing double quotes is removed.
/// - Blank lines and lines starting with `;` or `#` are ignored.
///
/// Anything else, or a property before the first section, fails with
/// [`ErrorKind::MalformedDivision`].
#[instrument(skip(text), fields(text_size = text.len(), sections))]
pub fn parse_entries(text: &str) -> Result<Entries> {
    let text = normalize_booleans(text);
    let mut entries = Entries::new();
    let mut section: Option<(&str, Properties)> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let number = index + 1;
        if let Some(header) = line.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or_raise(|| malformed(number, "unterminated section header"))?;
            if let Some((name, properties)) = section.take() {
                entries.entry(name.to_string()).or_default().extend(properties);
            }
            section = Some((name, Properties::new()));
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_raise(|| malformed(number, "expected key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            exn::bail!(malformed(number, "empty property name"));
        }
        let (_, properties) = section.as_mut().ok_or_raise(|| malformed(number, "property outside of a section"))?;
        properties.insert(key.to_lowercase(), unquote(value.trim()).to_string());
    }
    if let Some((name, properties)) = section {
        entries.entry(name.to_string()).or_default().extend(properties);
    }

    tracing::Span::current().record("sections", entries.len());
    Ok(entries)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn malformed(line: usize, reason: &'static str) -> ErrorKind {
    ErrorKind::MalformedDivision { line, reason }
}
