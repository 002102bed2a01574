//! BML (Block Markup Language) parser.
//!
//! BML is an indentation-structured markup notation that reads like a
//! cleaned-up block-style YAML: scalars, lists, maps, multi-line strings
//! with three folding policies, quoted strings with escape sequences,
//! numeric literals with radix prefixes and digit grouping, and an
//! extensible conversion-specifier mechanism that routes blocks to named
//! sub-parsers.
//!
//! # Parsing Pipeline
//!
//! The parser reads its input one line at a time:
//!
//! 1. **Line reader**: delivers lines with a one-deep push-back buffer and
//!    line-number reporting.
//!
//! 2. **Block reader**: delimits blocks by indentation, filtering the
//!    comments and blank lines that precede a block's first real content.
//!
//! 3. **Value dispatcher**: classifies each block's opening line and
//!    recursively composes scalars, lists, and maps into a [`Value`] tree.
//!
//! # Example
//!
//! ```
//! use libbml::{parse, Value};
//!
//! let value = parse("greeting: Hello\ncount: 3\n").unwrap();
//! let map = value.as_map().unwrap();
//! assert_eq!(map.get(&Value::from("count")), Some(&Value::Int(3)));
//! ```

mod error;
mod line;
mod number;
mod parser;
mod reader;
mod strings;
mod value;

pub use error::{ParseError, Result};
pub use parser::{BlockParserFn, Parser};
pub use reader::{IoInput, ReadLine, StringInput};
pub use value::{Map, Value};

/// Parse a BML document from a string.
///
/// The first parse error halts parsing. Empty input (or input with only
/// comments and blank lines) is an error, and so is non-comment data after
/// the top-level value.
pub fn parse(input: &str) -> Result<Value> {
    Parser::new(StringInput::new(input)).parse()
}
