//! Translation between catalog globs and SQL `LIKE` patterns.
//!
//! The catalog writes patterns with `*` (any run) and `?` (any single
//! character). Stores match with `LIKE` semantics, where the same wildcards
//! are `%` and `_`.

/// Translates a catalog pattern into its storage form.
///
/// Trailing whitespace is removed, since some storage engines discard it and
/// would otherwise report two distinct patterns as duplicates.
///
/// ```
/// assert_eq!(browscap_parse::to_like("Mozilla*Trident/5.0? "), "Mozilla%Trident/5.0_");
/// ```
pub fn to_like(pattern: &str) -> String {
    translate(pattern.trim_end(), ('*', '%'), ('?', '_'))
}

/// Translates a storage pattern back into the catalog's `*`/`?` form.
///
/// ```
/// assert_eq!(browscap_parse::from_like("Mozilla%Trident/5.0_"), "Mozilla*Trident/5.0?");
/// ```
pub fn from_like(pattern: &str) -> String {
    translate(pattern, ('%', '*'), ('_', '?'))
}

fn translate(pattern: &str, any: (char, char), single: (char, char)) -> String {
    pattern
        .chars()
        .map(|c| match c {
            c if c == any.0 => any.1,
            c if c == single.0 => single.1,
            c => c,
        })
        .collect()
}

/// Returns `true` if `text` matches the storage `pattern`.
///
/// Mirrors SQLite's default `LIKE`: `%` matches any run of characters
/// (including none), `_` matches exactly one, and ASCII letters compare
/// case-insensitively. There is no escape character.
pub fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    // Position of the last `%` seen, and the text position it is currently
    // assumed to have consumed up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            },
            Some(c) if *c == '_' || c.eq_ignore_ascii_case(&text[t]) => {
                p += 1;
                t += 1;
            },
            _ => match backtrack {
                Some((star, consumed)) => {
                    p = star + 1;
                    t = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                },
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
