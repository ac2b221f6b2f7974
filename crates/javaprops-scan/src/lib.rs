//! Line scanner and escaper for the Java `.properties` format.

mod span;
pub use span::LineSpan;

mod escape;
pub use escape::{escape_key, escape_value, unescape};

mod error;
pub use error::{ScanError, ScanErrorKind};

mod scanner;
pub use scanner::{Entry, Scanner};
