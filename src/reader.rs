//! Position-tracking character reader.
//!
//! A forward cursor over a character source with a single character of
//! implicit lookahead exposed as `current`, line/column tracking, and a
//! capture facility that records the substring between `start_capture()` and
//! `end_capture()` without repeated slicing. `peek(offset)` is deliberately
//! not part of the public surface; operations that need a little
//! lookahead (`read_infinity`, multi-line string closers) use a small
//! internal ring buffer instead, the way the spec's own note -- "lookahead is
//! emulated by buffering in the reader implementation" -- describes.

use std::collections::VecDeque;
use std::io::Read;

use crate::error::{DjsError, DjsResult, Position};
use crate::logger::Log;

/// A one-character-at-a-time source of Unicode scalar values.
///
/// In-memory (`&str`/`String`) and `std::io::Read`-backed implementations
/// are provided; a caller can plug in anything else by implementing this
/// trait, matching the spec's "in-memory string, byte stream, or file".
pub trait CharSource {
    fn advance(&mut self) -> std::io::Result<Option<char>>;
}

impl CharSource for Box<dyn CharSource> {
    fn advance(&mut self) -> std::io::Result<Option<char>> {
        (**self).advance()
    }
}

/// A reader whose source is boxed and type-erased. The tokenizer and
/// everything downstream of it (token stream, parser) is written against
/// this concrete alias rather than threading a source type parameter
/// through the whole pipeline.
pub type DynReader = Reader<Box<dyn CharSource>>;

/// Borrows a `&str` for the lifetime of the reader. Zero-copy.
pub struct StrSource<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> CharSource for StrSource<'a> {
    fn advance(&mut self) -> std::io::Result<Option<char>> {
        match self.text[self.pos..].chars().next() {
            Some(c) => {
                self.pos += c.len_utf8();
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }
}

/// Owns a `String`, for callers that don't want to manage a borrow.
pub struct OwnedSource {
    text: String,
    pos: usize,
}

impl OwnedSource {
    pub fn new(text: String) -> Self {
        Self { text, pos: 0 }
    }
}

impl CharSource for OwnedSource {
    fn advance(&mut self) -> std::io::Result<Option<char>> {
        match self.text[self.pos..].chars().next() {
            Some(c) => {
                self.pos += c.len_utf8();
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }
}

/// A bounded-memory source over any `std::io::Read` (a file handle, a
/// socket, ...). Bytes are pulled in small chunks and decoded incrementally;
/// only the still-undecoded tail of the last chunk is retained between
/// calls, so memory use does not grow with the amount already consumed.
pub struct StreamSource<R: Read> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
}

const STREAM_CHUNK: usize = 8 * 1024;

impl<R: Read> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    fn fill(&mut self) -> std::io::Result<bool> {
        if self.pos > 0 {
            self.buf.drain(0..self.pos);
            self.pos = 0;
        }
        let start = self.buf.len();
        self.buf.resize(start + STREAM_CHUNK, 0);
        let n = self.reader.read(&mut self.buf[start..])?;
        self.buf.truncate(start + n);
        if n == 0 {
            self.eof = true;
        }
        Ok(n > 0)
    }
}

impl<R: Read> CharSource for StreamSource<R> {
    fn advance(&mut self) -> std::io::Result<Option<char>> {
        loop {
            let remaining = &self.buf[self.pos..];
            if !remaining.is_empty() {
                match std::str::from_utf8(remaining) {
                    Ok(s) => {
                        let c = s.chars().next().unwrap();
                        self.pos += c.len_utf8();
                        return Ok(Some(c));
                    }
                    Err(e) if e.valid_up_to() > 0 => {
                        let s = std::str::from_utf8(&remaining[..e.valid_up_to()]).unwrap();
                        let c = s.chars().next().unwrap();
                        self.pos += c.len_utf8();
                        return Ok(Some(c));
                    }
                    Err(_) => {
                        // Possibly a multi-byte sequence split across chunks.
                        if self.eof {
                            return Err(std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                "invalid utf-8 in stream",
                            ));
                        }
                    }
                }
            } else if self.eof {
                return Ok(None);
            }
            if !self.fill()? && self.eof && self.buf[self.pos..].is_empty() {
                return Ok(None);
            }
        }
    }
}

/// The position-tracking reader itself.
pub struct Reader<S: CharSource> {
    source: S,
    lookahead: VecDeque<char>,
    exhausted: bool,
    pub current: Option<char>,
    pub index: usize,
    pub line: usize,
    pub column: usize,
    pub lines_skipped: u32,
    capture: Option<String>,
    log: Log<&'static str>,
}

impl Reader<Box<dyn CharSource>> {
    /// Build a reader over an in-memory string. The text is copied once
    /// into an owned buffer so the reader (and everything built on top of
    /// it: tokenizer, token stream, parser) stays free of a borrow
    /// lifetime.
    pub fn from_str(text: &str) -> std::io::Result<Self> {
        Reader::new(Box::new(OwnedSource::new(text.to_string())) as Box<dyn CharSource>)
    }

    pub fn from_string(text: String) -> std::io::Result<Self> {
        Reader::new(Box::new(OwnedSource::new(text)) as Box<dyn CharSource>)
    }

    pub fn from_reader<R: Read + 'static>(reader: R) -> std::io::Result<Self> {
        Reader::new(Box::new(StreamSource::new(reader)) as Box<dyn CharSource>)
    }
}

impl<S: CharSource> Reader<S> {
    pub fn new(mut source: S) -> std::io::Result<Self> {
        let current = source.advance()?;
        Ok(Self {
            source,
            lookahead: VecDeque::new(),
            exhausted: false,
            current,
            index: 0,
            line: 1,
            column: 0,
            lines_skipped: 0,
            capture: None,
            log: Log::None,
        })
    }

    pub fn set_log(&mut self, log: Log<&'static str>) {
        self.log = log;
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is_end_of_text(&self) -> bool {
        self.current.is_none()
    }

    /// Fill the internal lookahead buffer so that index `n` (0 = the
    /// character right after `current`) is available.
    fn fill_to(&mut self, n: usize) -> std::io::Result<()> {
        while self.lookahead.len() <= n && !self.exhausted {
            match self.source.advance()? {
                Some(c) => self.lookahead.push_back(c),
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    /// Internal-only lookahead: character at offset `n` past `current`
    /// (`n = 0` is the character immediately following `current`).
    fn peek_at(&mut self, n: usize) -> std::io::Result<Option<char>> {
        self.fill_to(n)?;
        Ok(self.lookahead.get(n).copied())
    }

    /// Consume `current` and advance. Returns the consumed character.
    pub fn read(&mut self) -> std::io::Result<Option<char>> {
        let consumed = self.current;
        if let Some(c) = consumed {
            if let Some(buf) = self.capture.as_mut() {
                buf.push(c);
            }
            self.index += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.current = match self.lookahead.pop_front() {
            Some(c) => Some(c),
            None => self.source.advance()?,
        };
        Ok(consumed)
    }

    pub fn is_digit(&self) -> bool {
        matches!(self.current, Some(c) if c.is_ascii_digit())
    }

    pub fn read_digit(&mut self) -> std::io::Result<Option<char>> {
        if self.is_digit() {
            self.read()
        } else {
            Ok(None)
        }
    }

    /// Consume a run of ASCII digits, returning how many were consumed.
    pub fn read_all_digits(&mut self) -> std::io::Result<usize> {
        let mut n = 0;
        while self.is_digit() {
            self.read()?;
            n += 1;
        }
        Ok(n)
    }

    pub fn read_if(&mut self, c: char) -> std::io::Result<bool> {
        if self.current == Some(c) {
            self.read()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn expect(&mut self, c: char) -> DjsResult<()> {
        if self.read_if(c)? {
            Ok(())
        } else {
            Err(self.expected(format!("'{}'", c)))
        }
    }

    /// Consume spaces, tabs, carriage returns and, if `count_lines`, `\n`.
    /// Resets and then accumulates `lines_skipped`.
    pub fn skip_whitespace(&mut self, count_lines: bool) -> std::io::Result<()> {
        self.lines_skipped = 0;
        loop {
            match self.current {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.read()?;
                }
                Some('\n') if count_lines => {
                    self.read()?;
                    self.lines_skipped += 1;
                }
                _ => break,
            }
        }
        Ok(())
    }

    pub fn skip_line_whitespace(&mut self) -> std::io::Result<()> {
        while matches!(self.current, Some(' ') | Some('\t') | Some('\r')) {
            self.read()?;
        }
        Ok(())
    }

    pub fn start_capture(&mut self) {
        self.capture = Some(String::new());
    }

    pub fn end_capture(&mut self) -> String {
        self.capture.take().unwrap_or_default()
    }

    pub fn invalidate_capture(&mut self) {
        self.capture = None;
    }

    /// Consume a `quote`-delimited string, already positioned at the
    /// opening quote, interpreting JSON-style escapes.
    pub fn read_quoted(&mut self, quote: char) -> DjsResult<String> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.current {
                None => return Err(self.unterminated("string")),
                Some(c) if c == quote => {
                    self.read()?;
                    break;
                }
                Some('\\') => {
                    self.read()?;
                    self.read_escape(&mut out)?;
                }
                Some(c) => {
                    out.push(c);
                    self.read()?;
                }
            }
        }
        Ok(out)
    }

    fn read_escape(&mut self, out: &mut String) -> DjsResult<()> {
        match self.current {
            Some('"') => {
                out.push('"');
                self.read()?;
            }
            Some('\\') => {
                out.push('\\');
                self.read()?;
            }
            Some('/') => {
                out.push('/');
                self.read()?;
            }
            Some('\'') => {
                out.push('\'');
                self.read()?;
            }
            Some('b') => {
                out.push('\u{8}');
                self.read()?;
            }
            Some('f') => {
                out.push('\u{c}');
                self.read()?;
            }
            Some('n') => {
                out.push('\n');
                self.read()?;
            }
            Some('r') => {
                out.push('\r');
                self.read()?;
            }
            Some('t') => {
                out.push('\t');
                self.read()?;
            }
            Some('u') => {
                self.read()?;
                let mut code: u32 = 0;
                for _ in 0..4 {
                    let d = match self.current {
                        Some(c) if c.is_ascii_hexdigit() => c,
                        _ => return Err(self.expected("hex digit")),
                    };
                    code = code * 16 + d.to_digit(16).unwrap();
                    self.read()?;
                }
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            Some(other) => {
                return Err(self.unexpected(format!("escape '\\{}'", other)));
            }
            None => return Err(self.unterminated("string")),
        }
        Ok(())
    }

    /// Consume a triple-single-quoted multiline string body; the opening
    /// `'''` has already been consumed by the caller. Strips the minimum
    /// leading-whitespace prefix shared by all non-empty interior lines and
    /// trims a single trailing newline before the closer.
    pub fn read_multi(&mut self, _strict: bool) -> DjsResult<String> {
        let mut raw = String::new();
        loop {
            if self.current.is_none() {
                return Err(self.unterminated("multi-line string"));
            }
            if self.current == Some('\'')
                && self.peek_at(0)? == Some('\'')
                && self.peek_at(1)? == Some('\'')
            {
                self.read()?;
                self.read()?;
                self.read()?;
                break;
            }
            let c = self.current.unwrap();
            raw.push(c);
            self.read()?;
        }
        Ok(dedent_multiline(&raw))
    }

    pub fn read_line_comment(&mut self) -> std::io::Result<String> {
        let mut out = String::new();
        while let Some(c) = self.current {
            if c == '\n' {
                break;
            }
            out.push(c);
            self.read()?;
        }
        Ok(out.trim().to_string())
    }

    pub fn read_hash_comment(&mut self) -> std::io::Result<String> {
        self.read_line_comment()
    }

    pub fn read_block_comment(&mut self) -> DjsResult<String> {
        let mut out = String::new();
        loop {
            match self.current {
                None => return Err(self.unterminated("block comment")),
                Some('*') => {
                    self.read()?;
                    if self.current == Some('/') {
                        self.read()?;
                        break;
                    }
                    out.push('*');
                }
                Some(c) => {
                    out.push(c);
                    self.read()?;
                }
            }
        }
        Ok(strip_block_stars(&out))
    }

    /// JSON-grammar number: optional leading `-`, an integer part with no
    /// leading zero unless the integer itself is zero, an optional
    /// fraction, and an optional exponent. Returns the parsed `f64` and the
    /// exact slice consumed.
    pub fn read_number(&mut self) -> DjsResult<(f64, String)> {
        self.start_capture();
        if self.current == Some('-') {
            self.read()?;
        }
        match self.current {
            Some('0') => {
                self.read()?;
            }
            Some(c) if c.is_ascii_digit() => {
                self.read_all_digits()?;
            }
            _ => {
                let text = self.end_capture();
                return Err(self.expected_at_capture("digit", &text));
            }
        }
        if self.current == Some('.') {
            self.read()?;
            if self.read_all_digits()? == 0 {
                let text = self.end_capture();
                return Err(self.expected_at_capture("digit after '.'", &text));
            }
        }
        if matches!(self.current, Some('e') | Some('E')) {
            self.read()?;
            if matches!(self.current, Some('+') | Some('-')) {
                self.read()?;
            }
            if self.read_all_digits()? == 0 {
                let text = self.end_capture();
                return Err(self.expected_at_capture("digit in exponent", &text));
            }
        }
        let text = self.end_capture();
        let position = self.position();
        let value: f64 = text
            .parse()
            .map_err(|_| -> DjsError {
                crate::error::SyntaxError::new(position, format!("Invalid number '{}'", text)).into()
            })?;
        Ok((value, text))
    }

    fn expected_at_capture(&mut self, what: &str, _consumed: &str) -> DjsError {
        self.expected(what)
    }

    /// Consume the literal `infinity` if the upcoming characters spell it
    /// exactly, using internal lookahead; consumes nothing otherwise.
    pub fn read_infinity(&mut self) -> std::io::Result<bool> {
        const LIT: &str = "infinity";
        for (i, expect) in LIT.chars().enumerate() {
            let seen = if i == 0 {
                self.current
            } else {
                self.peek_at(i - 1)?
            };
            if seen != Some(expect) {
                return Ok(false);
            }
        }
        for _ in 0..LIT.chars().count() {
            self.read()?;
        }
        Ok(true)
    }

    pub fn unexpected(&self, what: impl std::fmt::Display) -> DjsError {
        crate::error::SyntaxError::unexpected(self.position(), what).into()
    }

    pub fn expected(&self, what: impl std::fmt::Display) -> DjsError {
        crate::error::SyntaxError::expected(self.position(), what).into()
    }

    fn unterminated(&self, what: &str) -> DjsError {
        crate::error::SyntaxError::new(self.position(), format!("Unterminated {}", what)).into()
    }

    pub fn log(&self) -> &Log<&'static str> {
        &self.log
    }
}

fn strip_block_stars(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= 1 {
        return text.trim().to_string();
    }
    let all_star = lines[1..]
        .iter()
        .all(|l| l.trim_start().starts_with('*') || l.trim().is_empty());
    if !all_star {
        return text.trim().to_string();
    }
    let mut out = vec![lines[0].trim().to_string()];
    for l in &lines[1..] {
        let t = l.trim_start();
        let stripped = match t.strip_prefix('*') {
            Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
            None => t,
        };
        out.push(stripped.trim_end().to_string());
    }
    out.join("\n").trim().to_string()
}

/// Strip the minimum common leading-whitespace prefix from the non-empty
/// interior lines of a multi-line string body. The line break right after
/// the opening delimiter and the whitespace-only line that aligns with the
/// closing delimiter are both part of the surrounding layout, not content,
/// and are dropped before dedenting.
fn dedent_multiline(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let mut lines: Vec<&str> = raw.split('\n').collect();
    if lines.first().map(|l| l.is_empty()).unwrap_or(false) {
        lines.remove(0);
    }
    if lines.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            if l.len() >= min_indent {
                &l[min_indent..]
            } else {
                l.trim_start()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_line_and_column() {
        let mut r = Reader::from_str("ab\ncd").unwrap();
        assert_eq!(r.position(), Position::new(1, 0));
        r.read().unwrap();
        assert_eq!(r.position(), Position::new(1, 1));
        r.read().unwrap();
        r.read().unwrap();
        assert_eq!(r.position(), Position::new(2, 0));
    }

    #[test]
    fn capture_records_exact_slice() {
        let mut r = Reader::from_str("hello world").unwrap();
        r.start_capture();
        for _ in 0..5 {
            r.read().unwrap();
        }
        assert_eq!(r.end_capture(), "hello");
    }

    #[test]
    fn read_quoted_interprets_escapes() {
        let mut r = Reader::from_str(r#""a\nb\"c""#).unwrap();
        let s = r.read_quoted('"').unwrap();
        assert_eq!(s, "a\nb\"c");
    }

    #[test]
    fn read_multi_strips_minimum_indent() {
        let mut r = Reader::from_str("\n  0\n   1\n    2\n  '''").unwrap();
        let s = r.read_multi(true).unwrap();
        assert_eq!(s, "0\n 1\n  2");
    }

    #[test]
    fn read_number_rejects_leading_zero_followed_by_digit() {
        let mut r = Reader::from_str("0").unwrap();
        let (v, text) = r.read_number().unwrap();
        assert_eq!(v, 0.0);
        assert_eq!(text, "0");
    }

    #[test]
    fn read_infinity_matches_literal_without_consuming_on_mismatch() {
        let mut r = Reader::from_str("infinite").unwrap();
        assert!(!r.read_infinity().unwrap());
        assert_eq!(r.current, Some('i'));
    }

    #[test]
    fn stream_source_matches_str_source() {
        let data = "hello, \"world\"\n".as_bytes().to_vec();
        let mut r = Reader::from_reader(std::io::Cursor::new(data)).unwrap();
        let mut collected = String::new();
        while let Some(c) = r.read().unwrap() {
            collected.push(c);
        }
        assert_eq!(collected, "hello, \"world\"\n");
    }
}
