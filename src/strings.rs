//! String scalar sub-parsers.
//!
//! Three block-string policies plus quoted strings:
//!
//! - `literal`: dedent, keep line breaks.
//! - `folded`: dedent, drop empty lines, join with single spaces.
//! - `raw`: keep everything verbatim, including indentation and comments.
//! - quoted: `"`-delimited with backslash escapes; a string that does not
//!   close on its opening line continues as a block folded with spaces.

use log::trace;

use crate::error::{ParseError, Result};
use crate::line::{dedent, Line};
use crate::parser::Parser;
use crate::reader::ReadLine;
use crate::value::Value;

impl<R: ReadLine> Parser<R> {
    /// Parse the current block verbatim. With two or more lines the result
    /// gains a trailing line break; a single line does not.
    pub(crate) fn parse_raw(&mut self) -> Result<Value> {
        let mut lines = self.read_block()?;
        if lines.len() > 1 {
            // one empty line for the ending line break
            lines.push(String::new());
        }
        Ok(Value::String(lines.join("\n")))
    }

    /// Parse the current block as a literal string: dedent, drop trailing
    /// empty lines, keep interior line breaks.
    pub(crate) fn parse_literal(&mut self) -> Result<Value> {
        trace!("literal string at line {}", self.line_number);
        let mut lines = self.read_block()?;
        dedent(&mut lines);
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        if lines.len() > 1 {
            // one empty line for the ending line break
            lines.push(String::new());
        }
        Ok(Value::String(lines.join("\n")))
    }

    /// Parse the current block as a folded string: dedent, drop empty
    /// lines, join the rest with single spaces.
    pub(crate) fn parse_folded(&mut self) -> Result<Value> {
        trace!("folded string at line {}", self.line_number);
        let mut lines = self.read_block()?;
        dedent(&mut lines);
        lines.retain(|line| !line.is_empty());
        Ok(Value::String(lines.join(" ")))
    }

    /// Parse a quoted string whose opening quote sits at
    /// `opening_quote_pos` in the current line. Returns the string and the
    /// position right after the closing quote.
    pub(crate) fn parse_quoted(&mut self, opening_quote_pos: usize) -> Result<(String, usize)> {
        let quote = match self.current_line.char_at(opening_quote_pos) {
            Some(c) => c,
            None => return Err(self.parser_error(opening_quote_pos, "String contains no closing quote")),
        };

        // single-line string: the closing quote is on the same line
        if let Some(quote_pos) =
            find_closing_quote(&self.current_line, quote, opening_quote_pos + 1)
        {
            let (string, _) = unescape_line(
                &self.current_line,
                self.line_number,
                quote,
                opening_quote_pos + 1,
            )?;
            return Ok((string, quote_pos + 1));
        }

        // multi-line string: read a block indented one past the quote
        let saved_block_indent = self.block_indent;
        self.block_indent = opening_quote_pos + 1;

        let mut lines: Vec<String> = Vec::new();
        let mut line_numbers: Vec<usize> = Vec::new();
        let mut end_pos = None;
        loop {
            let content = self.current_line.substr_from(self.block_indent);
            line_numbers.push(self.line_number);
            if let Some(quote_pos) =
                find_closing_quote(&self.current_line, quote, opening_quote_pos + 1)
            {
                // final line, truncated at the closing quote
                let cut = quote_pos.saturating_sub(self.block_indent);
                lines.push(content.chars().take(cut).collect());
                end_pos = Some(quote_pos + 1);
                break;
            }
            lines.push(content);
            if self.read_block_line()?.is_end() {
                break;
            }
        }

        self.block_indent = saved_block_indent;

        let end_pos = match end_pos {
            Some(pos) => pos,
            None => {
                // the line after the block may close the string if it
                // starts with the quote at exactly the opening column
                let closes = self.source.peek_unread().is_some_and(|raw| {
                    let next = Line::new(raw);
                    next.indent() == opening_quote_pos
                        && next.char_at(opening_quote_pos) == Some(quote)
                });
                if !closes {
                    return Err(
                        self.parser_error(self.current_indent, "String contains no closing quote")
                    );
                }
                self.read_line()?;
                opening_quote_pos + 1
            }
        };

        // fold lines: dedent, drop empties, unescape, join with spaces
        dedent(&mut lines);
        let mut parts = Vec::new();
        for (text, line_number) in lines.iter().zip(line_numbers) {
            if text.is_empty() {
                continue;
            }
            let (unescaped, _) = unescape_line(&Line::new(text), line_number, quote, 0)?;
            parts.push(unescaped);
        }
        Ok((parts.join(" "), end_pos))
    }
}

/// Find the position of the unescaped closing `quote` at or after
/// `start_pos`. Quotes preceded by a backslash are skipped.
fn find_closing_quote(line: &Line, quote: char, start_pos: usize) -> Option<usize> {
    let mut from = start_pos;
    loop {
        let pos = line.find(quote, from)?;
        if pos > 0 && line.char_at(pos - 1) == Some('\\') {
            from = pos + 1;
        } else {
            return Some(pos);
        }
    }
}

/// Decode backslash escapes in `line` starting at `start_pos`, stopping at
/// the unescaped `quote` or end of line. Returns the decoded string and the
/// position where decoding stopped.
pub(crate) fn unescape_line(
    line: &Line,
    line_number: usize,
    quote: char,
    start_pos: usize,
) -> Result<(String, usize)> {
    let len = line.len();
    if start_pos >= len {
        return Ok((String::new(), start_pos));
    }
    let mut result = String::with_capacity(len - start_pos);
    let mut pos = start_pos;
    while pos < len {
        let chr = match line.char_at(pos) {
            Some(c) => c,
            None => break,
        };
        if chr == quote {
            // closing quote detected
            break;
        }
        if chr != '\\' {
            result.push(chr);
            pos += 1;
            continue;
        }
        // start of escape sequence
        pos += 1;
        let Some(chr) = line.char_at(pos) else {
            // backslash at end of line stays in the result
            result.push('\\');
            return Ok((result, pos));
        };
        match chr {
            '\'' | '"' | '?' | '\\' => result.push(chr),
            'a' => result.push('\u{07}'),
            'b' => result.push('\u{08}'),
            'f' => result.push('\u{0C}'),
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            'v' => result.push('\u{0B}'),
            'o' => {
                // 1 to 3 octal digits
                let mut value: u32 = 0;
                for i in 0..3 {
                    pos += 1;
                    if line.end_of_line(pos) {
                        if i == 0 {
                            return Err(ParseError::new(line_number, pos, "Incomplete octal value"));
                        }
                        pos -= 1;
                        break;
                    }
                    match line.char_at(pos).and_then(|c| c.to_digit(8)) {
                        Some(digit) => value = (value << 3) + digit,
                        None => {
                            return Err(ParseError::new(line_number, pos, "Bad octal value"));
                        }
                    }
                }
                // 3 octal digits never exceed U+01FF
                if let Some(decoded) = char::from_u32(value) {
                    result.push(decoded);
                }
            }
            'x' | 'u' | 'U' => {
                // fixed-width hexadecimal code unit or code point
                let hexlen = match chr {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut value: u32 = 0;
                for _ in 0..hexlen {
                    pos += 1;
                    if line.end_of_line(pos) {
                        return Err(ParseError::new(
                            line_number,
                            pos,
                            "Incomplete hexadecimal value",
                        ));
                    }
                    match line.char_at(pos).and_then(|c| c.to_digit(16)) {
                        Some(digit) => value = (value << 4) + digit,
                        None => {
                            return Err(ParseError::new(line_number, pos, "Bad hexadecimal value"));
                        }
                    }
                }
                match char::from_u32(value) {
                    Some(decoded) => result.push(decoded),
                    // surrogates and values past U+10FFFF are not characters
                    None => {
                        return Err(ParseError::new(line_number, pos, "Bad hexadecimal value"));
                    }
                }
            }
            _ => {
                // not a valid escape sequence, keep both characters
                result.push('\\');
                result.push(chr);
            }
        }
        pos += 1;
    }
    Ok((result, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unescape(text: &str) -> String {
        let (result, _) = unescape_line(&Line::new(text), 1, '"', 0).unwrap();
        result
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"a\tb"), "a\tb");
        assert_eq!(unescape(r"\a\b\f\r\v"), "\u{07}\u{08}\u{0C}\r\u{0B}");
        assert_eq!(unescape(r#"\"\'\?\\"#), "\"'?\\");
    }

    #[test]
    fn test_unknown_escape_kept_verbatim() {
        assert_eq!(unescape(r"\q"), "\\q");
    }

    #[test]
    fn test_octal_escapes() {
        assert_eq!(unescape(r"\o101"), "A");
        assert_eq!(unescape(r"\o7"), "\u{07}");
        assert_eq!(unescape(r"\o101b"), "Ab");
    }

    #[test]
    fn test_octal_errors() {
        assert!(unescape_line(&Line::new(r"\o"), 1, '"', 0).is_err());
        assert!(unescape_line(&Line::new(r"\o9"), 1, '"', 0).is_err());
        // a non-octal character inside the three-digit window is an error
        assert!(unescape_line(&Line::new(r"\o41x"), 1, '"', 0).is_err());
    }

    #[test]
    fn test_hex_escapes() {
        assert_eq!(unescape(r"\x41"), "A");
        assert_eq!(unescape(r"\u0416"), "Ж");
        assert_eq!(unescape(r"\U0001F600"), "😀");
    }

    #[test]
    fn test_hex_errors() {
        let err = unescape_line(&Line::new(r"\x4"), 1, '"', 0).unwrap_err();
        assert_eq!(err.description, "Incomplete hexadecimal value");
        let err = unescape_line(&Line::new(r"\x4z"), 1, '"', 0).unwrap_err();
        assert_eq!(err.description, "Bad hexadecimal value");
        let err = unescape_line(&Line::new(r"\uD800"), 1, '"', 0).unwrap_err();
        assert_eq!(err.description, "Bad hexadecimal value");
    }

    #[test]
    fn test_stops_at_closing_quote() {
        let (result, pos) = unescape_line(&Line::new(r#"ab"cd"#), 1, '"', 0).unwrap();
        assert_eq!(result, "ab");
        assert_eq!(pos, 2);
    }

    #[test]
    fn test_backslash_at_end_of_line() {
        assert_eq!(unescape(r"ab\"), "ab\\");
    }

    #[test]
    fn test_find_closing_quote_skips_escaped() {
        let line = Line::new(r#""a\"b" rest"#);
        assert_eq!(find_closing_quote(&line, '"', 1), Some(5));
    }
}
