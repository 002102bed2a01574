//! Numeric scalar sub-parser.
//!
//! Integers take an optional radix prefix (`0b`, `0o`, `0x`) and `'` or `_`
//! separators between digits. Floats are decimal only. Magnitudes that fit
//! `i64` become signed integers; larger positive magnitudes become unsigned
//! integers.

use crate::error::Result;
use crate::line::Line;
use crate::parser::{Parser, COMMENT};
use crate::reader::ReadLine;
use crate::value::Value;

impl<R: ReadLine> Parser<R> {
    /// Parse a number starting at `start_pos` in the current line, with
    /// `sign` applied to the result. Returns the value and the position
    /// where conversion stopped.
    pub(crate) fn parse_number(&self, start_pos: usize, sign: i32) -> Result<(Value, usize)> {
        let line = &self.current_line;
        let mut pos = start_pos;
        let mut radix = 10u32;
        let mut is_float = false;

        if line.char_at(pos) == Some('0') {
            // check radix specifier
            match line.char_at(pos + 1) {
                Some('b' | 'B') => {
                    radix = 2;
                    pos += 2;
                }
                Some('o' | 'O') => {
                    radix = 8;
                    pos += 2;
                }
                Some('x' | 'X') => {
                    radix = 16;
                    pos += 2;
                }
                _ => {}
            }
            if radix != 10 && line.end_of_line(pos) {
                return Err(self.parser_error(start_pos, "Bad number"));
            }
        }

        let magnitude = self.parse_unsigned(&mut pos, radix)?;

        'scan: {
            if line.end_of_line(pos) {
                break 'scan;
            }
            let mut chr = line.char_at(pos).unwrap_or_default();

            // check for fraction
            if chr == '.' {
                if radix != 10 {
                    return Err(self.parser_error(
                        start_pos,
                        "Only decimal representation is supported for floating point numbers",
                    ));
                }
                is_float = true;
                pos = skip_digits(line, pos + 1);
                if line.end_of_line(pos) {
                    break 'scan;
                }
                chr = line.char_at(pos).unwrap_or_default();
            }
            // check for exponent
            if chr == 'e' || chr == 'E' {
                if radix != 10 {
                    return Err(self.parser_error(
                        start_pos,
                        "Only decimal representation is supported for floating point numbers",
                    ));
                }
                is_float = true;
                pos += 1;
                if line.end_of_line(pos) {
                    break 'scan;
                }
                if matches!(line.char_at(pos), Some('-' | '+')) {
                    pos += 1;
                }
                pos = skip_digits(line, pos);
            } else if chr != COMMENT && chr != ':' && !chr.is_whitespace() {
                return Err(self.parser_error(start_pos, "Bad number"));
            }
        }

        if is_float {
            let mut text = line.substr(start_pos, pos);
            text.retain(|c| c != '\'' && c != '_');
            let number: f64 = text
                .parse()
                .map_err(|_| self.parser_error(start_pos, "Bad number"))?;
            if number.is_infinite() {
                return Err(self.parser_error(start_pos, "Floating point overflow"));
            }
            let number = if sign < 0 && number != 0.0 { -number } else { number };
            return Ok((Value::Float(number), pos));
        }

        let value = if magnitude > i64::MAX as u64 {
            if sign < 0 {
                return Err(self.parser_error(start_pos, "Integer overflow"));
            }
            Value::UInt(magnitude)
        } else if sign < 0 && magnitude > 0 {
            Value::Int(-(magnitude as i64))
        } else {
            Value::Int(magnitude as i64)
        };
        Ok((value, pos))
    }

    /// Parse an unsigned magnitude in `radix` starting at `*pos`, allowing
    /// single `'` or `_` separators between digits. `*pos` is advanced to
    /// where conversion stopped.
    fn parse_unsigned(&self, pos: &mut usize, radix: u32) -> Result<u64> {
        let line = &self.current_line;
        let mut result: u64 = 0;
        let mut digit_seen = false;
        let mut separator_seen = false;
        let mut p = *pos;
        loop {
            let chr = line.char_at(p);

            // check separator
            if matches!(chr, Some('\'' | '_')) {
                if separator_seen {
                    return Err(self.parser_error(p, "Duplicate separator in the number"));
                }
                if !digit_seen {
                    return Err(
                        self.parser_error(p, "Separator is not allowed in the beginning of number")
                    );
                }
                separator_seen = true;
                p += 1;
                if line.end_of_line(p) {
                    return Err(self.parser_error(p, "Bad number"));
                }
                continue;
            }
            separator_seen = false;

            let Some(digit) = chr.and_then(|c| c.to_digit(radix)) else {
                if !digit_seen {
                    return Err(self.parser_error(p, "Bad number"));
                }
                // not a digit, end of conversion
                *pos = p;
                return Ok(result);
            };

            result = result
                .checked_mul(radix as u64)
                .and_then(|r| r.checked_add(digit as u64))
                .ok_or_else(|| self.parser_error(*pos, "Numeric overflow"))?;

            digit_seen = true;
            p += 1;
        }
    }
}

fn skip_digits(line: &Line, mut pos: usize) -> usize {
    while matches!(line.char_at(pos), Some('0'..='9')) {
        pos += 1;
    }
    pos
}
