//! Splitting of a raw catalog payload into divisions.
//!
//! A division starts at a delimiter line (41 semicolons at the start of a
//! line) and runs until the next one, or the end of the payload. The text
//! before the first delimiter is the comment header and forms a division of
//! its own.
//!
//! Scanning state is an explicit [`Cursor`], so the same payload can be
//! scanned any number of times and separate payloads never share state.

use memchr::memmem;

/// The line prefix separating two divisions.
pub const DELIMITER: &str = ";;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;";

/// Byte offset into a payload from which the next division is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(usize);
impl Cursor {
    /// A cursor at the beginning of any payload.
    pub const START: Self = Self(0);

    pub fn offset(&self) -> usize {
        self.0
    }
}

/// Returns the division starting at `cursor` and the cursor of the division
/// after it, or `None` once the payload is exhausted.
///
/// The search for the closing delimiter begins one byte past the cursor, so a
/// division that begins with its own delimiter line is not ended by it.
///
/// ```
/// use browscap_parse::{Cursor, DELIMITER, next_division};
///
/// let payload = format!(";;; header\n{DELIMITER} first\n[A]\n");
/// let (header, cursor) = next_division(&payload, Cursor::START).unwrap();
/// assert_eq!(header, ";;; header\n");
/// let (first, cursor) = next_division(&payload, cursor).unwrap();
/// assert!(first.starts_with(DELIMITER));
/// assert!(next_division(&payload, cursor).is_none());
/// ```
pub fn next_division(payload: &str, cursor: Cursor) -> Option<(&str, Cursor)> {
    let start = cursor.offset();
    if start >= payload.len() {
        return None;
    }
    let end = find_delimiter(payload.as_bytes(), start + 1).unwrap_or(payload.len());
    // The delimiter is ASCII, so `end` always lies on a character boundary.
    Some((&payload[start..end], Cursor(end)))
}

/// Finds the first delimiter at the start of a line at or after `from`.
fn find_delimiter(haystack: &[u8], from: usize) -> Option<usize> {
    let finder = memmem::Finder::new(DELIMITER.as_bytes());
    let mut position = from;
    while position < haystack.len() {
        let found = position + finder.find(&haystack[position..])?;
        if found == 0 || haystack[found - 1] == b'\n' {
            return Some(found);
        }
        position = found + 1;
    }
    None
}

/// Forward-only iterator over the divisions of one payload.
///
/// Restarting means calling [`reset`](Self::reset) (or building a new
/// iterator), the cursor is never shared.
#[derive(Clone, Debug)]
pub struct Divisions<'a> {
    payload: &'a str,
    cursor: Cursor,
}
impl<'a> Divisions<'a> {
    pub fn new(payload: &'a str) -> Self {
        Self { payload, cursor: Cursor::START }
    }

    /// Position of the next division to be yielded.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Number of payload bytes not yet yielded.
    pub fn remaining(&self) -> usize {
        self.payload.len().saturating_sub(self.cursor.offset())
    }

    pub fn reset(&mut self) {
        self.cursor = Cursor::START;
    }
}
impl<'a> Iterator for Divisions<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let (division, cursor) = next_division(self.payload, self.cursor)?;
        self.cursor = cursor;
        Some(division)
    }
}
