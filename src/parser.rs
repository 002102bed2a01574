//! The block parser.
//!
//! A layered state machine reads the input one line at a time, tracks
//! indentation to delimit blocks, dispatches on the shape of each line, and
//! composes results recursively:
//!
//! 1. **Block reader**: delivers the next line of the current block,
//!    filtering leading blanks and comments, and signals end-of-block on
//!    unindent or end of input.
//!
//! 2. **Value dispatcher**: classifies the opening line of a block as a
//!    conversion specifier, list item, quoted string, keyword, number, or
//!    literal-string-or-map.
//!
//! 3. **Collection parsers**: lists and maps recurse into nested blocks,
//!    saving and restoring the block indent.

use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::error::{BlockStatus, ParseError, Result};
use crate::line::Line;
use crate::reader::{LineSource, ReadLine};
use crate::value::{Map, Value};

/// Comment marker character.
pub(crate) const COMMENT: char = '#';

/// Default cap on block nesting depth.
const MAX_BLOCK_LEVEL: usize = 100;

/// A block parser registered for a conversion specifier.
pub type BlockParserFn<R> = Rc<dyn Fn(&mut Parser<R>) -> Result<Value>>;

/// Parser state for one document.
///
/// A parser is created, consumes its input once via [`Parser::parse`], and
/// is then done; it is not reentrant.
pub struct Parser<R: ReadLine> {
    pub(crate) source: LineSource<R>,
    /// Most recently read line, trailing whitespace stripped.
    pub(crate) current_line: Line,
    /// Count of leading space characters in `current_line`.
    pub(crate) current_indent: usize,
    /// 1-based line number of `current_line`, 0 if none read yet.
    pub(crate) line_number: usize,
    /// Minimum column at which lines of the current block must start.
    pub(crate) block_indent: usize,
    block_level: usize,
    max_block_level: usize,
    skip_comments: bool,
    pub(crate) eof: bool,
    custom_parsers: HashMap<String, BlockParserFn<R>>,
}

impl<R: ReadLine> Parser<R> {
    /// Create a parser over `input` with the built-in conversion specifiers
    /// (`raw`, `literal`, `folded`, `isodate`, `timestamp`, `json`).
    pub fn new(input: R) -> Self {
        let mut custom_parsers: HashMap<String, BlockParserFn<R>> = HashMap::new();
        custom_parsers.insert("raw".into(), Rc::new(|p: &mut Parser<R>| p.parse_raw()));
        custom_parsers.insert("literal".into(), Rc::new(|p: &mut Parser<R>| p.parse_literal()));
        custom_parsers.insert("folded".into(), Rc::new(|p: &mut Parser<R>| p.parse_folded()));
        custom_parsers.insert("isodate".into(), Rc::new(|p: &mut Parser<R>| p.parse_isodate()));
        custom_parsers.insert(
            "timestamp".into(),
            Rc::new(|p: &mut Parser<R>| p.parse_timestamp()),
        );
        custom_parsers.insert("json".into(), Rc::new(|p: &mut Parser<R>| p.parse_json()));
        Parser {
            source: LineSource::new(input),
            current_line: Line::default(),
            current_indent: 0,
            line_number: 0,
            block_indent: 0,
            block_level: 1,
            max_block_level: MAX_BLOCK_LEVEL,
            skip_comments: true,
            eof: false,
            custom_parsers,
        }
    }

    /// Override the nesting cap (default 100).
    pub fn max_block_level(mut self, limit: usize) -> Self {
        self.max_block_level = limit;
        self
    }

    /// Register or overwrite the block parser for `convspec`.
    pub fn set_custom_parser<F>(&mut self, convspec: &str, parser_func: F)
    where
        F: Fn(&mut Parser<R>) -> Result<Value> + 'static,
    {
        self.custom_parsers
            .insert(convspec.trim().to_string(), Rc::new(parser_func));
    }

    /// Parse the whole document. Leading comments and blank lines are
    /// skipped; trailing non-comment data is an error.
    pub fn parse(mut self) -> Result<Value> {
        // read first line to prepare for parsing and to detect end of input
        let status = self.read_block_line()?;
        if status.is_end() && self.eof {
            return Err(ParseError::new(self.line_number, 0, "Unexpected end of file"));
        }
        let result = self.parse_value(None)?;
        // make sure the input has no more data
        loop {
            if self.eof {
                return Ok(result);
            }
            if !self.current_line.is_empty() && !self.is_comment_line() {
                return Err(
                    self.parser_error(self.current_indent, "Extra data after parsed value")
                );
            }
            self.read_block_line()?;
        }
    }

    // ------------------------------------------------------------------
    // Surface available to custom block parsers
    // ------------------------------------------------------------------

    /// The current line, trailing whitespace stripped.
    pub fn current_line(&self) -> String {
        self.current_line.substr_from(0)
    }

    /// Count of leading space characters in the current line.
    pub fn current_indent(&self) -> usize {
        self.current_indent
    }

    /// Indent of the current block.
    pub fn block_indent(&self) -> usize {
        self.block_indent
    }

    /// 1-based line number of the current line, 0 if unknown.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Build a parse error at `position` on the current line.
    pub fn error(&self, position: usize, description: impl Into<String>) -> ParseError {
        ParseError::new(self.line_number, position, description)
    }

    /// Collect the lines of the current block, each with the first
    /// `block_indent` characters removed.
    pub fn read_block(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            lines.push(self.current_line.substr_from(self.block_indent));
            if self.read_block_line()?.is_end() {
                return Ok(lines);
            }
        }
    }

    // ------------------------------------------------------------------
    // Block reader
    // ------------------------------------------------------------------

    pub(crate) fn parser_error(&self, pos: usize, description: impl Into<String>) -> ParseError {
        ParseError::new(self.line_number, pos, description)
    }

    /// Read the next raw line into `current_line`; false at end of input.
    pub(crate) fn read_line(&mut self) -> Result<bool> {
        match self.source.read_line()? {
            None => Ok(false),
            Some(raw) => {
                self.current_line = Line::new(&raw);
                self.current_indent = self.current_line.indent();
                self.line_number = self.source.line_number();
                Ok(true)
            }
        }
    }

    fn is_comment_line(&self) -> bool {
        self.current_line.char_at(self.current_indent) == Some(COMMENT)
    }

    /// Read the next line belonging to the current block.
    ///
    /// Leading blanks and comments of a fresh block are skipped; interior
    /// blank lines are returned as-is; comments indented less than the
    /// block are skipped; any other unindented line is pushed back and
    /// end-of-block is reported.
    pub(crate) fn read_block_line(&mut self) -> Result<BlockStatus> {
        if self.eof {
            return Ok(BlockStatus::End);
        }
        loop {
            if !self.read_line()? {
                self.eof = true;
                self.current_line.clear();
                return Ok(BlockStatus::End);
            }
            if self.skip_comments {
                // skip empty lines too
                if self.current_line.is_empty() {
                    continue;
                }
                if self.is_comment_line() {
                    continue;
                }
                self.skip_comments = false;
            }
            if self.current_line.is_empty() {
                // return empty line as is
                return Ok(BlockStatus::Line);
            }
            if self.current_indent >= self.block_indent {
                return Ok(BlockStatus::Line);
            }
            // unindent detected
            if self.is_comment_line() {
                // comments may dedent freely
                continue;
            }
            trace!(
                "unindent at line {}: {} < {}",
                self.line_number,
                self.current_indent,
                self.block_indent
            );
            let line = self.current_line.substr_from(0);
            self.source.unread_line(line);
            self.current_line.clear();
            return Ok(BlockStatus::End);
        }
    }

    // ------------------------------------------------------------------
    // Nested-block entry
    // ------------------------------------------------------------------

    /// Run `parser_func` with `block_indent` set to `block_pos`.
    pub(crate) fn parse_nested_block<F>(&mut self, block_pos: usize, parser_func: F) -> Result<Value>
    where
        F: FnOnce(&mut Self) -> Result<Value>,
    {
        if self.block_level >= self.max_block_level {
            return Err(self.parser_error(self.current_indent, "Too many nested blocks"));
        }
        self.block_level += 1;
        let saved_block_indent = self.block_indent;
        self.block_indent = block_pos;
        trace!("enter block at indent {block_pos}, level {}", self.block_level);
        let result = parser_func(self);
        self.block_indent = saved_block_indent;
        self.block_level -= 1;
        trace!("leave block, back to indent {saved_block_indent}");
        result
    }

    /// Read the next line and run `parser_func` in a block one column
    /// deeper than the current one. Used when a structural token ends its
    /// line and the nested block begins below.
    pub(crate) fn parse_nested_block_from_next_line<F>(&mut self, parser_func: F) -> Result<Value>
    where
        F: FnOnce(&mut Self) -> Result<Value>,
    {
        // the block starts on its own line: its leading blanks and
        // comments are invisible
        self.skip_comments = true;
        self.block_indent += 1;
        let status = self.read_block_line();
        self.block_indent -= 1;
        if status?.is_end() {
            return Err(self.parser_error(self.current_indent, "Empty block"));
        }
        self.parse_nested_block(self.block_indent + 1, parser_func)
    }

    // ------------------------------------------------------------------
    // Value dispatcher
    // ------------------------------------------------------------------

    /// Position of the first non-space character of the current block.
    /// The block may start inside `current_line` for nested values of a
    /// list item or a map entry.
    pub(crate) fn get_start_position(&self) -> usize {
        if self.block_indent < self.current_indent {
            self.current_indent
        } else {
            self.current_line.skip_spaces(self.block_indent)
        }
    }

    /// True if the current line ends at `pos` (after spaces) or holds a
    /// comment there.
    pub(crate) fn comment_or_end_of_line(&self, pos: usize) -> bool {
        let pos = self.current_line.skip_spaces(pos);
        match self.current_line.char_at(pos) {
            None => true,
            Some(c) => c == COMMENT,
        }
    }

    /// Extract a conversion specifier whose opening colon is at
    /// `opening_colon_pos`. Returns the registered handler and the position
    /// right after the closing colon, or `None` if the text there is not a
    /// registered specifier.
    fn parse_convspec(&self, opening_colon_pos: usize) -> Option<(BlockParserFn<R>, usize)> {
        let start_pos = opening_colon_pos + 1;
        let end_pos = self.current_line.find(':', start_pos)?;
        if end_pos == start_pos {
            // empty conversion specifier
            return None;
        }
        if !self.current_line.is_space_or_eol(end_pos + 1) {
            // not a conversion specifier
            return None;
        }
        let convspec = self.current_line.substr(start_pos, end_pos);
        let func = self.custom_parsers.get(convspec.trim())?;
        Some((func.clone(), end_pos + 1))
    }

    /// True if the colon at `colon_pos` is a key-value separator: followed
    /// by end of line, whitespace, or a registered conversion specifier.
    fn is_kv_separator(&self, colon_pos: usize) -> bool {
        match self.current_line.char_at(colon_pos + 1) {
            None => true,
            Some(c) if c.is_whitespace() => true,
            Some(':') => self.parse_convspec(colon_pos + 1).is_some(),
            Some(_) => false,
        }
    }

    /// Where the value starts after a key-value separator at `colon_pos`:
    /// right after the colon when a conversion specifier introduces the
    /// value, past the following space otherwise.
    fn value_pos_after_separator(&self, colon_pos: usize) -> usize {
        if self.current_line.char_at(colon_pos + 1) == Some(':') {
            colon_pos + 1
        } else {
            colon_pos + 2
        }
    }

    /// True if `pos` terminates a scalar: end of line, whitespace, a
    /// comment, or a key-value separator.
    fn is_end_of_value(&self, pos: usize) -> bool {
        match self.current_line.char_at(pos) {
            None => true,
            Some(c) if c.is_whitespace() => true,
            Some(COMMENT) => true,
            Some(':') => self.is_kv_separator(pos),
            Some(_) => false,
        }
    }

    /// Parse a value starting at the current block's opening line.
    ///
    /// When `nested_value_pos` is provided the value is expected to be a
    /// map key: it must end with a key-value separator, and the position
    /// after the colon is written back.
    pub(crate) fn parse_value(&mut self, mut nested_value_pos: Option<&mut usize>) -> Result<Value> {
        let start_pos = self.get_start_position();
        let chr = self.current_line.char_at(start_pos);
        trace!("parse value at line {}, position {start_pos}", self.line_number);

        // a leading colon may denote a conversion specifier
        if chr == Some(':') {
            if nested_value_pos.is_some() {
                // keys cannot start with a colon: they would look the
                // same as conversion specifiers
                return Err(self.parser_error(
                    start_pos,
                    "Map key expected and it cannot start with colon",
                ));
            }
            return match self.parse_convspec(start_pos) {
                None => self.parse_literal(),
                Some((func, value_pos)) => {
                    if self.current_line.end_of_line(value_pos) {
                        self.parse_nested_block_from_next_line(|p| func(p))
                    } else {
                        self.parse_nested_block(value_pos, |p| func(p))
                    }
                }
            };
        }

        // other values can be map keys

        if chr == Some('-') {
            let next_pos = start_pos + 1;
            if matches!(self.current_line.char_at(next_pos), Some('0'..='9')) {
                let (number, end_pos) = self.parse_number(next_pos, -1)?;
                return self.check_value_end(number, end_pos, nested_value_pos);
            }
            if self.current_line.is_space_or_eol(next_pos) {
                if nested_value_pos.is_some() {
                    return Err(
                        self.parser_error(start_pos, "Map key expected and it cannot be a list")
                    );
                }
                return self.parse_list();
            }
            return self.parse_literal_string_or_map(nested_value_pos);
        }

        if chr == Some('"') {
            let start_line = self.line_number;
            let (string, end_pos) = self.parse_quoted(start_pos)?;
            let value = Value::String(string);
            if self.line_number == start_line {
                // single-line string can be a map key
                return self.check_value_end(value, end_pos, nested_value_pos);
            }
            // multi-line string cannot be a key
            if nested_value_pos.is_some() {
                return Err(self.parser_error(end_pos, "Map key expected"));
            }
            if self.comment_or_end_of_line(end_pos) {
                self.read_block_line()?;
                return Ok(value);
            }
            return Err(self.parser_error(end_pos, "Bad character after quoted string"));
        }

        // reserved keywords, recognized only at an end-of-value boundary
        for (keyword, value) in [
            ("null", Value::Null),
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
        ] {
            let end_pos = start_pos + keyword.len();
            if self.current_line.matches_at(start_pos, keyword) && self.is_end_of_value(end_pos) {
                return self.check_value_end(value, end_pos, nested_value_pos.take());
            }
        }

        // number
        let mut num_pos = start_pos;
        if chr == Some('+')
            && matches!(self.current_line.char_at(start_pos + 1), Some('0'..='9'))
        {
            num_pos += 1;
        }
        if matches!(self.current_line.char_at(num_pos), Some('0'..='9')) {
            let (number, end_pos) = self.parse_number(num_pos, 1)?;
            return self.check_value_end(number, end_pos, nested_value_pos);
        }

        // parsed none of the above
        self.parse_literal_string_or_map(nested_value_pos)
    }

    /// After a scalar was parsed up to `end_pos`: a key-value separator
    /// there turns the scalar into a map key (or satisfies the caller's
    /// expectation); end of line or a comment ends the value and advances
    /// to the next block line; anything else is an error.
    fn check_value_end(
        &mut self,
        value: Value,
        end_pos: usize,
        nested_value_pos: Option<&mut usize>,
    ) -> Result<Value> {
        let end_pos = self.current_line.skip_spaces(end_pos);
        if self.current_line.end_of_line(end_pos) {
            if nested_value_pos.is_some() {
                return Err(self.parser_error(end_pos, "Map key expected"));
            }
            self.read_block_line()?;
            return Ok(value);
        }
        match self.current_line.char_at(end_pos) {
            Some(':') => {
                if !self.is_kv_separator(end_pos) {
                    return Err(self.parser_error(end_pos + 1, "Bad character encountered"));
                }
                if let Some(pos) = nested_value_pos {
                    // the key the caller was waiting for
                    *pos = end_pos + 1;
                    return Ok(value);
                }
                let value_pos = self.value_pos_after_separator(end_pos);
                self.parse_map(value, value_pos)
            }
            Some(COMMENT) => {
                self.read_block_line()?;
                Ok(value)
            }
            _ => Err(self.parser_error(end_pos, "Bad character encountered")),
        }
    }

    /// Search the first line of the block for a key-value separator; found
    /// means the block is a map, otherwise it is a literal string. In
    /// expected-key mode the text before the separator becomes the key.
    fn parse_literal_string_or_map(
        &mut self,
        nested_value_pos: Option<&mut usize>,
    ) -> Result<Value> {
        let start_pos = self.get_start_position();
        let separator = self
            .current_line
            .find(':', start_pos)
            .filter(|&pos| self.is_kv_separator(pos));
        match (separator, nested_value_pos) {
            (Some(colon_pos), Some(pos)) => {
                let key = self.current_line.substr(start_pos, colon_pos);
                *pos = colon_pos + 1;
                Ok(Value::String(key.trim().to_string()))
            }
            (Some(colon_pos), None) => {
                let key = self.current_line.substr(start_pos, colon_pos);
                let value_pos = self.value_pos_after_separator(colon_pos);
                self.parse_map(Value::String(key.trim().to_string()), value_pos)
            }
            (None, Some(_)) => Err(self.parser_error(start_pos, "Map key expected")),
            (None, None) => self.parse_literal(),
        }
    }

    // ------------------------------------------------------------------
    // Collection parsers
    // ------------------------------------------------------------------

    /// Parse a list. All items must share the indent of the first one.
    fn parse_list(&mut self) -> Result<Value> {
        let mut result = Vec::new();
        let item_indent = self.get_start_position();
        loop {
            if self.current_line.char_at(item_indent) != Some('-') {
                return Err(self.parser_error(item_indent, "Bad list item"));
            }
            let next_pos = item_indent + 1;
            if !self.current_line.is_space_or_eol(next_pos) {
                return Err(self.parser_error(item_indent, "Bad list item"));
            }
            let item = if self.comment_or_end_of_line(next_pos) {
                self.parse_nested_block_from_next_line(|p| p.parse_value(None))?
            } else {
                // nested block starts on the same line
                self.parse_nested_block(next_pos + 1, |p| p.parse_value(None))?
            };
            result.push(item);
            if self.read_block_line()?.is_end() {
                break;
            }
            if self.current_indent != item_indent {
                return Err(
                    self.parser_error(self.current_indent, "Bad indentation of list item")
                );
            }
        }
        Ok(Value::List(result))
    }

    /// Parse a map. The first key is already parsed; `value_pos` points
    /// past its key-value separator. All keys must share the indent of the
    /// first one.
    fn parse_map(&mut self, first_key: Value, mut value_pos: usize) -> Result<Value> {
        let mut result = Map::new();
        let key_indent = self.get_start_position();
        let mut key = first_key;
        loop {
            let value = if self.comment_or_end_of_line(value_pos) {
                self.parse_nested_block_from_next_line(|p| p.parse_value(None))?
            } else {
                self.parse_nested_block(value_pos, |p| p.parse_value(None))?
            };
            // overwrite on duplicate, last wins
            result.insert(key, value);
            if self.read_block_line()?.is_end() {
                break;
            }
            if self.current_indent != key_indent {
                return Err(self.parser_error(self.current_indent, "Bad indentation of map key"));
            }
            key = self.parse_value(Some(&mut value_pos))?;
        }
        Ok(Value::Map(result))
    }

    // ------------------------------------------------------------------
    // Stub conversion specifiers
    // ------------------------------------------------------------------

    fn parse_isodate(&mut self) -> Result<Value> {
        Err(self.parser_error(self.current_indent, "isodate values are not implemented"))
    }

    fn parse_timestamp(&mut self) -> Result<Value> {
        Err(self.parser_error(self.current_indent, "timestamp values are not implemented"))
    }

    fn parse_json(&mut self) -> Result<Value> {
        Err(self.parser_error(self.current_indent, "JSON blocks are not implemented"))
    }
}
