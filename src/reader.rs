//! Line input for the parser.
//!
//! The parser consumes any source that yields lines one at a time. Two
//! adapters are provided: [`StringInput`] over an in-memory string and
//! [`IoInput`] over a buffered reader. [`LineSource`] wraps either with the
//! one-deep push-back slot and the line counter the block reader relies on.

use std::io;
use std::io::BufRead;

/// A source of lines, without terminators.
///
/// `Ok(None)` signals end of input. Any other I/O failure is reported as an
/// error and aborts the parse.
pub trait ReadLine {
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Line input over a string slice. A trailing newline terminates the last
/// line rather than opening an empty one.
pub struct StringInput<'a> {
    lines: std::str::Lines<'a>,
}

impl<'a> StringInput<'a> {
    pub fn new(input: &'a str) -> Self {
        StringInput {
            lines: input.lines(),
        }
    }
}

impl ReadLine for StringInput<'_> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.next().map(String::from))
    }
}

/// Line input over any buffered reader.
pub struct IoInput<R: BufRead> {
    inner: R,
}

impl<R: BufRead> IoInput<R> {
    pub fn new(inner: R) -> Self {
        IoInput { inner }
    }
}

impl<R: BufRead> ReadLine for IoInput<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        let n = self.inner.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(Some(buf))
    }
}

/// A [`ReadLine`] with a one-deep push-back slot and 1-based line numbers.
///
/// Push-back exists for a single pattern: the block reader detects an
/// unindented line, returns END-OF-BLOCK, and restores the line so the
/// enclosing block can read it. One slot is all that pattern needs.
pub(crate) struct LineSource<R: ReadLine> {
    input: R,
    pushed_back: Option<String>,
    line_number: usize,
    eof: bool,
}

impl<R: ReadLine> LineSource<R> {
    pub(crate) fn new(input: R) -> Self {
        LineSource {
            input,
            pushed_back: None,
            line_number: 0,
            eof: false,
        }
    }

    /// Read the next line, or `None` at end of input.
    pub(crate) fn read_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.pushed_back.take() {
            self.line_number += 1;
            return Ok(Some(line));
        }
        if self.eof {
            return Ok(None);
        }
        match self.input.read_line()? {
            Some(line) => {
                self.line_number += 1;
                Ok(Some(line))
            }
            None => {
                self.eof = true;
                Ok(None)
            }
        }
    }

    /// Push `line` back; the next `read_line` returns it with its original
    /// line number. The slot must be empty.
    pub(crate) fn unread_line(&mut self, line: String) {
        debug_assert!(self.pushed_back.is_none());
        self.pushed_back = Some(line);
        self.line_number -= 1;
    }

    /// Peek at the pushed-back line without consuming it.
    pub(crate) fn peek_unread(&self) -> Option<&str> {
        self.pushed_back.as_deref()
    }

    /// 1-based number of the most recently read line (0 before any read).
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }
}
