//! Conversion between raw Unicode text and the `.properties` character set.

/// Escape a property key.
///
/// Every space is escaped (keys never contain literal spaces). With
/// `escape_unicode` set, code points below `0x0020` or above `0x007e`
/// become lowercase `\uXXXX` escapes.
pub fn escape_key(key: &str, escape_unicode: bool) -> String {
    escape(key, true, escape_unicode)
}

/// Escape a property value.
///
/// Interior spaces stay literal; only a leading space is escaped, so
/// the value cannot be mistaken for separator padding when read back.
pub fn escape_value(value: &str, escape_unicode: bool) -> String {
    escape(value, false, escape_unicode)
}

fn escape(text: &str, escape_space: bool, escape_unicode: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, c) in text.chars().enumerate() {
        match c {
            ' ' => {
                if escape_space || index == 0 {
                    out.push_str("\\ ");
                } else {
                    out.push(' ');
                }
            }
            '\\' => out.push_str("\\\\"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Structurally significant, must never appear unescaped
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            _ => {
                let code = c as u32;
                if escape_unicode && (code < 0x0020 || code > 0x007e) {
                    push_unicode_escape(&mut out, c);
                } else {
                    out.push(c);
                }
            }
        }
    }
    out
}

/// Emit `\uXXXX` escapes for one char as UTF-16 code units. Code points
/// above `0xFFFF` become two escapes forming a surrogate pair, matching
/// what Java's own writer produces.
fn push_unicode_escape(out: &mut String, c: char) {
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        out.push_str(&format!("\\u{unit:04x}"));
    }
}

/// Expand every `\c` two-character sequence.
///
/// `\r`, `\t`, `\n` and `\f` turn into their control characters; a
/// backslash followed by any other character yields just that character.
/// A trailing lone backslash is dropped. `\uXXXX` sequences are *not*
/// decoded here -- that requires consuming hex digits from the line
/// stream and lives in [`Scanner`](crate::Scanner).
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        if let Some(escaped) = chars.next() {
            out.push(unescape_control(escaped));
        }
    }
    out
}

/// Control-character expansion for a single escaped char.
pub(crate) fn unescape_control(c: char) -> char {
    match c {
        'r' => '\r',
        't' => '\t',
        'n' => '\n',
        'f' => '\x0c',
        _ => c,
    }
}
