/// Turns untrusted input into inert plain text: surrounding whitespace is
/// trimmed, control characters are dropped and markup-significant characters
/// are escaped as HTML entities.
///
/// ```
/// use browscap_service::plain_text;
///
/// assert_eq!(plain_text("  <b>Opera</b>\n"), "&lt;b&gt;Opera&lt;/b&gt;");
/// assert_eq!(plain_text("6000013\r\n"), "6000013");
/// ```
pub fn plain_text(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.trim().chars().filter(|c| !c.is_control()) {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#039;"),
            c => output.push(c),
        }
    }
    output
}
