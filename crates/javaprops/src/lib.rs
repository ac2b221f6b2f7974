//! Format-preserving reader and editor for Java `.properties` files.
//!
//! A [`Document`] holds the raw physical lines of a properties file.
//! Lookups and edits go through the line scanner, so comments, blank
//! lines, separator styles and the byte-for-byte layout of untouched
//! lines all survive a [`Document::parse`] / [`Document::stringify`]
//! round-trip. Duplicate keys are legal in the file; lookups resolve
//! them last-value-wins.

use std::collections::HashMap;

use indexmap::IndexMap;

pub use javaprops_scan::{
    Entry, LineSpan, ScanError, ScanErrorKind, Scanner, escape_key, escape_value, unescape,
};

/// A properties file held as its raw physical lines.
///
/// Joining `lines` with `\n` and appending one trailing terminator
/// reproduces a normalized file. Operations only ever rewrite the line
/// span owned by a matching entry; everything else is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Plain text unparsed lines, without line terminators.
    pub lines: Vec<String>,
}

/// A parsed, unescaped key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValuePair {
    /// Property key.
    pub key: String,
    /// Property value.
    pub value: String,
}

/// Options for [`Document::set_with`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Separator for newly formatted lines. When unset, the last
    /// separator style seen in the document is reused, falling back
    /// to `=`.
    pub separator: Option<String>,
}

impl SetOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed separator instead of inheriting the file's style.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties file contents.
    ///
    /// Accepts any mix of `\n`, `\r\n` and `\r` line terminators. A
    /// final terminator does not produce a trailing empty line, and a
    /// leading byte-order mark is stripped.
    pub fn parse(text: &str) -> Self {
        let mut lines = split_lines(text);
        if let Some(last) = lines.last()
            && last.is_empty()
        {
            lines.pop();
        }
        if let Some(first) = lines.first_mut()
            && let Some(stripped) = first.strip_prefix('\u{feff}')
        {
            *first = stripped.to_string();
        }
        Self { lines }
    }

    /// Serialize the document.
    ///
    /// Blank lines before the first content are dropped and the output
    /// ends with a line terminator unless the document is empty. Output
    /// always uses `\n`, whatever was parsed.
    pub fn stringify(&self) -> String {
        let mut start = 0;
        while start + 1 < self.lines.len() && self.lines[start].is_empty() {
            start += 1;
        }
        let lines = &self.lines[start..];

        let mut out = lines.join("\n");
        if let Some(last) = lines.last()
            && !last.is_empty()
        {
            out.push('\n');
        }
        out
    }

    /// Iterate over all key/value pairs in document order, duplicates
    /// included. Malformed lines are skipped; malformed `\uXXXX`
    /// escapes yield an error item.
    ///
    /// Each call starts a fresh iteration.
    pub fn list(&self) -> Pairs<'_> {
        Pairs {
            scanner: Scanner::new(&self.lines),
        }
    }

    /// Find the unescaped value for a key.
    ///
    /// Duplicate keys resolve to the last occurrence. The whole
    /// document is scanned, so a malformed escape anywhere surfaces as
    /// an error even when the key occurs earlier.
    pub fn get(&self, key: &str) -> Result<Option<String>, ScanError> {
        let mut value = None;
        for entry in Scanner::new(&self.lines) {
            let entry = entry?;
            if entry.key == key {
                value = Some(entry.value);
            }
        }
        Ok(value)
    }

    /// Set or remove the value for a key.
    ///
    /// The first matching entry's line span is replaced with one
    /// freshly formatted line; every other occurrence is deleted. With
    /// a `value` of `None` all occurrences are deleted. When the key is
    /// absent and a value is given, one line is appended. The separator
    /// of new lines follows the file's dominant style (see
    /// [`SetOptions`]).
    pub fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), ScanError> {
        self.set_with(key, value, &SetOptions::default())
    }

    /// Like [`Document::set`], with control over the separator.
    pub fn set_with(
        &mut self,
        key: &str,
        value: Option<&str>,
        options: &SetOptions,
    ) -> Result<(), ScanError> {
        // Collect everything up front: a scan error must leave the
        // document unmodified, and spans stay valid while we decide
        let entries: Vec<Entry> = Scanner::new(&self.lines).collect::<Result<_, _>>()?;

        let mut separator = options.separator.clone().unwrap_or_else(|| "=".to_string());
        let mut edits: Vec<(LineSpan, Option<String>)> = Vec::new();

        for entry in &entries {
            if options.separator.is_none() && !entry.separator.is_empty() {
                separator = entry.separator.clone();
            }
            if entry.key == key {
                let replacement = if edits.is_empty() {
                    value.map(|v| format_line(key, v, &separator))
                } else {
                    None
                };
                edits.push((entry.span, replacement));
            }
        }

        if edits.is_empty() {
            if let Some(v) = value {
                self.lines.push(format_line(key, v, &separator));
            }
            return Ok(());
        }

        // Apply bottom-up so earlier spans keep their indices
        for (span, replacement) in edits.into_iter().rev() {
            match replacement {
                Some(line) => {
                    self.lines.splice(span.range(), [line]);
                }
                None => {
                    self.lines.drain(span.range());
                }
            }
        }
        Ok(())
    }

    /// Remove all occurrences of a key.
    ///
    /// Equivalent to [`Document::set`] with a `value` of `None`.
    pub fn remove(&mut self, key: &str) -> Result<(), ScanError> {
        self.set(key, None)
    }

    /// Materialize all pairs into an insertion-ordered map.
    ///
    /// Duplicate keys keep their first position but take their last
    /// value.
    pub fn to_object(&self) -> Result<IndexMap<String, String>, ScanError> {
        let mut map = IndexMap::new();
        for pair in self.list() {
            let pair = pair?;
            map.insert(pair.key, pair.value);
        }
        Ok(map)
    }

    /// Materialize all pairs into a `HashMap`, last value winning.
    pub fn to_map(&self) -> Result<HashMap<String, String>, ScanError> {
        let mut map = HashMap::new();
        for pair in self.list() {
            let pair = pair?;
            map.insert(pair.key, pair.value);
        }
        Ok(map)
    }
}

/// Iterator over the unescaped key/value pairs of a document.
///
/// Returned by [`Document::list`].
#[derive(Debug, Clone)]
pub struct Pairs<'doc> {
    scanner: Scanner<'doc>,
}

impl Iterator for Pairs<'_> {
    type Item = Result<KeyValuePair, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.scanner.next()?;
        Some(entry.map(|e| KeyValuePair {
            key: e.key,
            value: e.value,
        }))
    }
}

/// Format one key/value pair as a single line.
fn format_line(key: &str, value: &str, separator: &str) -> String {
    format!(
        "{}{}{}",
        escape_key(key, true),
        separator,
        escape_value(value, true)
    )
}

/// Split on `\n`, `\r\n` or `\r`, in any mix.
fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    lines.push(current);
    lines
}
