//! Scan errors.

/// The kind of a scan error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// End of line reached before the 4 hex digits of a `\uXXXX`
    /// escape were collected.
    UnterminatedUnicodeEscape,
    /// A `\uXXXX` escape with non-hex digits, or a surrogate escape
    /// without a valid partner.
    InvalidUnicodeEscape,
}

/// A fatal error raised while scanning entries.
///
/// Malformed `\uXXXX` escapes are the only fatal condition; every other
/// malformed line is skipped permissively and never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanError {
    /// The kind of error.
    pub kind: ScanErrorKind,
    /// 0-based index of the line holding the offending escape.
    pub line: usize,
}

impl ScanError {
    /// Create a new scan error.
    pub fn new(kind: ScanErrorKind, line: usize) -> Self {
        Self { kind, line }
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ScanErrorKind::UnterminatedUnicodeEscape => {
                write!(f, "unterminated \\u escape at line {}", self.line)
            }
            ScanErrorKind::InvalidUnicodeEscape => {
                write!(f, "invalid \\u escape at line {}", self.line)
            }
        }
    }
}

impl std::error::Error for ScanError {}
