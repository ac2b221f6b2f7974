//! Character-level scanner extracting key/value entries from raw lines.

use tracing::trace;

use crate::error::{ScanError, ScanErrorKind};
use crate::escape::unescape_control;
use crate::span::LineSpan;

/// One logical key/value pair together with the physical lines it owns.
///
/// `key` and `value` are fully unescaped; `separator` is the literal
/// text between them (possibly empty for a value-less key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The physical line range this entry occupies.
    pub span: LineSpan,
    /// Literal separator text: spaces plus at most one `=` or `:`.
    pub separator: String,
    /// Unescaped key.
    pub key: String,
    /// Unescaped value.
    pub value: String,
}

/// A lazy scanner yielding [`Entry`] values from a document's lines.
///
/// Comment lines (first non-space character `#` or `!`), blank lines
/// and anything else that does not form a key/separator/value triple
/// are skipped, never yielded. Yielded entries never overlap. Construct
/// a new scanner to restart iteration from the top.
#[derive(Debug, Clone)]
pub struct Scanner<'src> {
    lines: &'src [String],
    /// Index of the next line to consume.
    line: usize,
}

impl<'src> Scanner<'src> {
    /// Create a new scanner over a document's lines.
    pub fn new(lines: &'src [String]) -> Self {
        Self { lines, line: 0 }
    }

    fn scan_next(&mut self) -> Result<Option<Entry>, ScanError> {
        let mut st = ScanState::new();
        while self.line < self.lines.len() {
            let line_no = self.line;
            for c in self.lines[line_no].chars() {
                // Entries only complete at end of line, so the result
                // carries no entry here
                st.step(Feed::Char(c), line_no)?;
            }
            self.line += 1;
            if let Some(entry) = st.step(Feed::Eol, line_no)? {
                trace!(
                    "Entry {:?} at lines {}..{}",
                    entry.key,
                    entry.span.start,
                    entry.span.end()
                );
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Entry, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan_next() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                // Stop after a fatal escape error
                self.line = self.lines.len();
                Some(Err(e))
            }
        }
    }
}

/// One step of input: a character, or the end of a physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    Char(char),
    Eol,
}

/// State machine states: `Start -> (Comment | Key) -> Separator ->
/// Value -> Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Comment,
    Key,
    Separator,
    Value,
}

/// Sub-state for decoding `\uXXXX` escapes, including UTF-16 surrogate
/// pairs split across two consecutive escapes.
#[derive(Debug, Clone)]
enum Unicode {
    /// Collecting hex digits; `high` holds a pending high surrogate.
    Hex { digits: String, high: Option<u16> },
    /// A high surrogate was decoded; `\` must follow.
    ExpectBackslash { high: u16 },
    /// A high surrogate was decoded; `u` must follow the `\`.
    ExpectU { high: u16 },
}

/// Mutable scan state threaded through the character loop.
#[derive(Debug)]
struct ScanState {
    state: State,
    /// Line index where the current entry started.
    start: usize,
    key: String,
    separator: String,
    value: String,
    /// Skip literal spaces (entry start and continuation-line starts).
    skip_space: bool,
    /// The previous character was an unescaped backslash.
    escaped_next: bool,
    unicode: Option<Unicode>,
}

impl ScanState {
    fn new() -> Self {
        Self {
            state: State::Start,
            start: 0,
            key: String::new(),
            separator: String::new(),
            value: String::new(),
            skip_space: true,
            escaped_next: false,
            unicode: None,
        }
    }

    /// Consume one character or end-of-line marker. Returns a completed
    /// entry when an unescaped end-of-line terminates one.
    fn step(&mut self, feed: Feed, line: usize) -> Result<Option<Entry>, ScanError> {
        if self.skip_space && feed == Feed::Char(' ') {
            return Ok(None);
        }
        self.skip_space = false;

        // A pending \uXXXX escape consumes input before anything else
        if self.unicode.is_some() {
            return self.step_unicode(feed, line);
        }

        if self.state == State::Start {
            match feed {
                Feed::Eol => {
                    // Blank line; the next line starts a fresh entry
                    *self = Self::new();
                    return Ok(None);
                }
                Feed::Char('#') | Feed::Char('!') => {
                    self.state = State::Comment;
                    self.start = line;
                }
                Feed::Char(_) => {
                    self.state = State::Key;
                    self.start = line;
                }
            }
        }

        if self.state == State::Comment {
            if feed == Feed::Eol {
                *self = Self::new();
            }
            return Ok(None);
        }

        if self.state == State::Key {
            match feed {
                Feed::Eol => {
                    if self.escaped_next {
                        // Key continues on the next physical line
                        self.escaped_next = false;
                        self.skip_space = true;
                        return Ok(None);
                    }
                    // Value-less key
                    return Ok(Some(self.finish(line)));
                }
                Feed::Char(c @ (' ' | '=' | ':')) => {
                    if self.escaped_next {
                        self.escaped_next = false;
                        self.key.push(c);
                        return Ok(None);
                    }
                    // The separator starts with this same character
                    self.state = State::Separator;
                }
                Feed::Char('\\') => {
                    if self.escaped_next {
                        self.escaped_next = false;
                        self.key.push('\\');
                    } else {
                        self.escaped_next = true;
                    }
                    return Ok(None);
                }
                Feed::Char(c) => {
                    if self.escaped_next {
                        self.escaped_next = false;
                        if c == 'u' {
                            self.unicode = Some(Unicode::Hex {
                                digits: String::new(),
                                high: None,
                            });
                        } else {
                            self.key.push(unescape_control(c));
                        }
                    } else {
                        self.key.push(c);
                    }
                    return Ok(None);
                }
            }
        }

        if self.state == State::Separator {
            match feed {
                Feed::Eol => {
                    // Value-less key with trailing separator
                    return Ok(Some(self.finish(line)));
                }
                Feed::Char(' ') => {
                    self.separator.push(' ');
                    return Ok(None);
                }
                Feed::Char(c @ ('=' | ':')) => {
                    if self.separator.contains(['=', ':']) {
                        // Only one non-space separator char is allowed;
                        // this one already belongs to the value
                        self.state = State::Value;
                    } else {
                        self.separator.push(c);
                        return Ok(None);
                    }
                }
                Feed::Char(_) => {
                    self.state = State::Value;
                }
            }
        }

        if self.state == State::Value {
            match feed {
                Feed::Eol => {
                    if self.escaped_next {
                        // Value continues on the next physical line
                        self.escaped_next = false;
                        self.skip_space = true;
                        return Ok(None);
                    }
                    return Ok(Some(self.finish(line)));
                }
                Feed::Char('\\') => {
                    if self.escaped_next {
                        self.escaped_next = false;
                        self.value.push('\\');
                    } else {
                        self.escaped_next = true;
                    }
                }
                Feed::Char(c) => {
                    if self.escaped_next {
                        self.escaped_next = false;
                        if c == 'u' {
                            self.unicode = Some(Unicode::Hex {
                                digits: String::new(),
                                high: None,
                            });
                        } else {
                            self.value.push(unescape_control(c));
                        }
                    } else {
                        self.value.push(c);
                    }
                }
            }
        }

        Ok(None)
    }

    fn step_unicode(&mut self, feed: Feed, line: usize) -> Result<Option<Entry>, ScanError> {
        let c = match feed {
            Feed::Eol => {
                return Err(ScanError::new(
                    ScanErrorKind::UnterminatedUnicodeEscape,
                    line,
                ));
            }
            Feed::Char(c) => c,
        };

        let Some(unicode) = self.unicode.take() else {
            // step() only routes here while a sequence is pending
            return Ok(None);
        };
        match unicode {
            Unicode::Hex { mut digits, high } => {
                digits.push(c);
                if digits.chars().count() < 4 {
                    self.unicode = Some(Unicode::Hex { digits, high });
                    return Ok(None);
                }
                if !digits.chars().all(|d| d.is_ascii_hexdigit()) {
                    return Err(ScanError::new(ScanErrorKind::InvalidUnicodeEscape, line));
                }
                // 4 hex digits always fit a u16
                let unit = u16::from_str_radix(&digits, 16).unwrap_or_default();
                match high {
                    Some(high) => match char::decode_utf16([high, unit]).next() {
                        Some(Ok(decoded)) => self.push_decoded(decoded),
                        _ => {
                            return Err(ScanError::new(ScanErrorKind::InvalidUnicodeEscape, line));
                        }
                    },
                    None if (0xd800..=0xdbff).contains(&unit) => {
                        // High surrogate: the pair's second escape must
                        // follow immediately
                        self.unicode = Some(Unicode::ExpectBackslash { high: unit });
                    }
                    None => match char::from_u32(u32::from(unit)) {
                        Some(decoded) => self.push_decoded(decoded),
                        // Lone low surrogate
                        None => {
                            return Err(ScanError::new(ScanErrorKind::InvalidUnicodeEscape, line));
                        }
                    },
                }
            }
            Unicode::ExpectBackslash { high } => {
                if c != '\\' {
                    return Err(ScanError::new(ScanErrorKind::InvalidUnicodeEscape, line));
                }
                self.unicode = Some(Unicode::ExpectU { high });
            }
            Unicode::ExpectU { high } => {
                if c != 'u' {
                    return Err(ScanError::new(ScanErrorKind::InvalidUnicodeEscape, line));
                }
                self.unicode = Some(Unicode::Hex {
                    digits: String::new(),
                    high: Some(high),
                });
            }
        }
        Ok(None)
    }

    fn push_decoded(&mut self, c: char) {
        match self.state {
            State::Key => self.key.push(c),
            _ => self.value.push(c),
        }
    }

    fn finish(&mut self, line: usize) -> Entry {
        let entry = Entry {
            span: LineSpan::new(self.start, line - self.start + 1),
            separator: std::mem::take(&mut self.separator),
            key: std::mem::take(&mut self.key),
            value: std::mem::take(&mut self.value),
        };
        *self = Self::new();
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &[&str]) -> Vec<Entry> {
        let lines: Vec<String> = src.iter().map(|s| s.to_string()).collect();
        Scanner::new(&lines)
            .collect::<Result<Vec<_>, _>>()
            .expect("scan should succeed")
    }

    fn scan_err(src: &[&str]) -> ScanError {
        let lines: Vec<String> = src.iter().map(|s| s.to_string()).collect();
        Scanner::new(&lines)
            .collect::<Result<Vec<_>, _>>()
            .expect_err("scan should fail")
    }

    fn pairs(src: &[&str]) -> Vec<(String, String)> {
        scan(src).into_iter().map(|e| (e.key, e.value)).collect()
    }

    #[test]
    fn test_simple_pair() {
        let entries = scan(&["foo=bar"]);
        assert_eq!(
            entries,
            vec![Entry {
                span: LineSpan::new(0, 1),
                separator: "=".to_string(),
                key: "foo".to_string(),
                value: "bar".to_string(),
            }]
        );
    }

    #[test]
    fn test_separator_styles() {
        for (line, separator, value) in [
            ("foo=bar", "=", "bar"),
            ("foo  bar", "  ", "bar"),
            ("foo : bar", " : ", "bar"),
            ("foo := bar", " :", "= bar"),
            ("foo::bar", ":", ":bar"),
            ("foo bar", " ", "bar"),
        ] {
            let entries = scan(&[line]);
            assert_eq!(entries.len(), 1, "line {line:?}");
            assert_eq!(entries[0].key, "foo", "line {line:?}");
            assert_eq!(entries[0].separator, separator, "line {line:?}");
            assert_eq!(entries[0].value, value, "line {line:?}");
        }
    }

    #[test]
    fn test_value_less_keys() {
        let entries = scan(&["  foo0", "foo20 = "]);
        assert_eq!(entries[0].key, "foo0");
        assert_eq!(entries[0].separator, "");
        assert_eq!(entries[0].value, "");
        assert_eq!(entries[1].key, "foo20");
        assert_eq!(entries[1].separator, " = ");
        assert_eq!(entries[1].value, "");
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        assert_eq!(
            pairs(&["# foo = bar", "  ! also a comment", "", "a=b"]),
            vec![("a".to_string(), "b".to_string())]
        );
    }

    #[test]
    fn test_indented_entry_after_blank_line() {
        assert_eq!(
            pairs(&["a=b", "", "  c=d"]),
            vec![
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "d".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_line_value() {
        let entries = scan(&["foo = b\\", "  a\\", "r"]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "foo");
        assert_eq!(entries[0].value, "bar");
        assert_eq!(entries[0].span, LineSpan::new(0, 3));
    }

    #[test]
    fn test_multi_line_key() {
        let entries = scan(&["foo\\", "23 bar23"]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "foo23");
        assert_eq!(entries[0].value, "bar23");
        assert_eq!(entries[0].span, LineSpan::new(0, 2));
    }

    #[test]
    fn test_escaped_chars_in_key() {
        let entries = scan(&["foo8\\::bar8", "foo11\\  bar11", "\\#foo13 = bar13"]);
        assert_eq!(entries[0].key, "foo8:");
        assert_eq!(entries[0].separator, ":");
        assert_eq!(entries[1].key, "foo11 ");
        assert_eq!(entries[2].key, "#foo13");
    }

    #[test]
    fn test_spans_partition_lines() {
        let entries = scan(&["a=1", "# comment", "b = 2\\", "  more", "c:3"]);
        let spans: Vec<LineSpan> = entries.iter().map(|e| e.span).collect();
        assert_eq!(
            spans,
            vec![
                LineSpan::new(0, 1),
                LineSpan::new(2, 2),
                LineSpan::new(4, 1),
            ]
        );
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(pairs(&["k=\\u0041"]), vec![("k".into(), "A".into())]);
        assert_eq!(
            pairs(&["\\u3053=\\u306f"]),
            vec![("こ".into(), "は".into())]
        );
    }

    #[test]
    fn test_surrogate_pair_decodes() {
        assert_eq!(
            pairs(&["k=\\ud83d\\ude00"]),
            vec![("k".into(), "\u{1f600}".into())]
        );
    }

    #[test]
    fn test_unterminated_unicode_escape() {
        let err = scan_err(&["foo=bar\\u23a"]);
        assert_eq!(err.kind, ScanErrorKind::UnterminatedUnicodeEscape);
        assert_eq!(err.line, 0);
        insta::assert_snapshot!(err.to_string(), @r"unterminated \u escape at line 0");
    }

    #[test]
    fn test_invalid_unicode_digits() {
        for src in [
            &["foo\\u23a=bar"][..],
            &["foo=bar\\u23ax5"][..],
            &["x=y", "foo=bar\\uqqqq"][..],
        ] {
            let err = scan_err(src);
            assert_eq!(err.kind, ScanErrorKind::InvalidUnicodeEscape, "{src:?}");
        }
        assert_eq!(scan_err(&["x=y", "foo=bar\\uqqqq"]).line, 1);
    }

    #[test]
    fn test_unpaired_surrogates_are_errors() {
        // Lone low surrogate
        assert_eq!(
            scan_err(&["k=\\udc00x"]).kind,
            ScanErrorKind::InvalidUnicodeEscape
        );
        // High surrogate not followed by another escape
        assert_eq!(
            scan_err(&["k=\\ud800zz"]).kind,
            ScanErrorKind::InvalidUnicodeEscape
        );
        // High surrogate at end of line
        assert_eq!(
            scan_err(&["k=\\ud800"]).kind,
            ScanErrorKind::UnterminatedUnicodeEscape
        );
    }

    #[test]
    fn test_trailing_continuation_dropped() {
        assert_eq!(pairs(&["foo=bar\\"]), vec![]);
    }

    #[test]
    fn test_restartable() {
        let lines: Vec<String> = ["a=1", "b=2"].iter().map(|s| s.to_string()).collect();
        let first: Vec<_> = Scanner::new(&lines).collect();
        let second: Vec<_> = Scanner::new(&lines).collect();
        assert_eq!(first, second);
    }
}
