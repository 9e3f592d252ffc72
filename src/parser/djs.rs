//! The formatting-aware DJS parser: a recursive-descent parser
//! over a single, non-containerized [`TokenStream`] (the tokenizer's
//! `containerized` flag is off, so brackets arrive as plain `SYMBOL`
//! tokens and nesting is tracked by the call stack -- each
//! `parse_object_body`/`parse_array_body` frame *is* the "(iterator,
//! formatting scratch)" frame the spec describes, with its local `lines`/
//! `comments` accumulator standing in for the scratch record).

use crate::error::{DjsError, DjsResult, Position, SyntaxError};
use crate::reader::{DynReader, Reader};
use crate::stream::TokenStream;
use crate::token::{LeafKind, StringFlavor, Token};
use crate::tokenizer::Tokenizer;
use crate::value::{
    ArrayValue, CommentEntry, CommentPosition, Document, Formatting, ObjectValue, StringValue, Value,
};

/// Parse `text` as DJS, returning the root [`Document`] (value plus
/// header/footer comments and whether the root was an open object).
pub fn parse_str(text: &str) -> DjsResult<Document> {
    parse_reader(Reader::from_str(text)?)
}

pub fn parse_reader(reader: DynReader) -> DjsResult<Document> {
    let tokenizer = Tokenizer::new(reader, false);
    let mut parser = DjsParser {
        stream: tokenizer.into_stream(),
        current: None,
    };
    parser.bump()?;
    parser.parse_document()
}

struct DjsParser {
    stream: TokenStream,
    current: Option<Token>,
}

/// Classification of a token the parser treats as formatting rather than
/// content, produced without holding a borrow across the mutation that
/// follows (`bump`).
enum Insignificant {
    Break,
    Comment(crate::token::CommentStyle, String),
    Content,
}

fn classify(tok: &Token) -> Insignificant {
    if tok.is_break() {
        return Insignificant::Break;
    }
    if let Some((text, style)) = tok.as_comment() {
        return Insignificant::Comment(style, text.to_string());
    }
    Insignificant::Content
}

impl DjsParser {
    fn bump(&mut self) -> DjsResult<()> {
        self.current = self.stream.next()?;
        Ok(())
    }

    fn position(&self) -> Position {
        match &self.current {
            Some(tok) => Position::new(tok.line(), tok.offset()),
            None => Position::default(),
        }
    }

    fn err_here(&self, msg: impl std::fmt::Display) -> DjsError {
        SyntaxError::new(self.position(), msg.to_string()).into()
    }

    fn is_symbol(&self, c: char) -> bool {
        matches!(&self.current, Some(t) if t.is_symbol(c))
    }

    fn is_eof(&self) -> bool {
        self.current.is_none()
    }

    fn at_terminator(&self, closer: Option<char>) -> bool {
        match closer {
            Some(c) => self.is_symbol(c),
            None => self.is_eof(),
        }
    }

    fn consume_terminator(&mut self, closer: Option<char>) -> DjsResult<()> {
        match closer {
            Some(c) => self.expect_symbol(c),
            None => Ok(()),
        }
    }

    fn expect_symbol(&mut self, c: char) -> DjsResult<()> {
        if self.is_symbol(c) {
            self.bump()
        } else {
            Err(SyntaxError::expected(self.position(), format!("'{}'", c)).into())
        }
    }

    /// Consume a run of `BREAK`/`COMMENT` tokens, returning the raw newline
    /// count consumed *before the first comment* (or before the real
    /// content, if there were no comments) and the comments collected along
    /// the way. This is the shared engine behind header, value-position and
    /// trailing comment attachment; only the *caller* decides
    /// which [`CommentPosition`] the result belongs to.
    ///
    /// Every gap strictly between two comments -- and the gap between the
    /// last comment and the real content that follows -- is recorded on the
    /// preceding [`CommentEntry::blank_lines_after`] instead, as a blank
    /// *line* count (raw newlines minus one, since one newline just ends
    /// the comment's own line). The leading gap returned here uses the raw
    /// convention instead, matching `lines_above`/`lines_between` elsewhere,
    /// so the two together account for every newline in the run without
    /// double-counting.
    fn collect_run(&mut self) -> DjsResult<(u32, Vec<CommentEntry>)> {
        let mut comments: Vec<CommentEntry> = Vec::new();
        let mut breaks: u32 = 0;
        let mut leading: u32 = 0;
        let mut seen_comment = false;
        loop {
            let classified = match &self.current {
                Some(tok) => classify(tok),
                None => break,
            };
            match classified {
                Insignificant::Break => {
                    breaks += 1;
                    self.bump()?;
                }
                Insignificant::Comment(style, text) => {
                    if !seen_comment {
                        leading = breaks;
                        seen_comment = true;
                    } else if let Some(last) = comments.last_mut() {
                        last.blank_lines_after = breaks.saturating_sub(1);
                    }
                    comments.push(CommentEntry::new(style, text));
                    breaks = 0;
                    self.bump()?;
                }
                Insignificant::Content => break,
            }
        }
        if let Some(last) = comments.last_mut() {
            last.blank_lines_after = breaks.saturating_sub(1);
        }
        Ok((if comments.is_empty() { breaks } else { leading }, comments))
    }

    /// Comments on the same source line as what was just parsed, strictly
    /// before any newline or delimiter (the "eol" position).
    fn collect_eol(&mut self) -> DjsResult<Vec<CommentEntry>> {
        let mut comments = Vec::new();
        loop {
            let found = match &self.current {
                Some(tok) => tok.as_comment().map(|(t, s)| (t.to_string(), s)),
                None => None,
            };
            match found {
                Some((text, style)) => {
                    comments.push(CommentEntry::new(style, text));
                    self.bump()?;
                }
                None => break,
            }
        }
        Ok(comments)
    }

    /// Consume the soft delimiter between two members/elements: an
    /// optional `,`, then any run of breaks/comments, then -- per spec
    /// §4.6's "if a newline follows, also accept one optional ','" -- a
    /// second optional `,` and another run. Returns the accumulated
    /// header material for the *next* item and whether any delimiter
    /// (comma or newline) was actually present.
    fn consume_delimiter(&mut self) -> DjsResult<(u32, Vec<CommentEntry>, bool)> {
        let mut saw = false;
        if self.is_symbol(',') {
            self.bump()?;
            saw = true;
        }
        let (mut lines, mut comments) = self.collect_run()?;
        if lines > 0 || !comments.is_empty() {
            saw = true;
        }
        if self.is_symbol(',') {
            self.bump()?;
            saw = true;
            let (lines2, comments2) = self.collect_run()?;
            lines += lines2;
            comments.extend(comments2);
        }
        Ok((lines, comments, saw))
    }

    fn parse_document(&mut self) -> DjsResult<Document> {
        let (lead_lines, lead_comments) = self.collect_run()?;
        let mut root_formatting = Formatting::default();
        root_formatting.lines_above = lead_lines as i32;
        for c in lead_comments {
            root_formatting.comments.push(CommentPosition::Header, c);
        }

        if self.is_eof() {
            return Ok(Document {
                value: Value::Null,
                formatting: root_formatting,
                open_root: false,
            });
        }

        let (value, open_root) = if self.is_symbol('{') || self.is_symbol('[') {
            (self.parse_value()?, false)
        } else {
            let from = self.stream.get_index().max(0) as usize;
            if self.stream.lookup(':', from, false)?.is_some() {
                let obj = self.parse_object_body(None, true)?;
                (Value::Object(obj), true)
            } else {
                (self.parse_value()?, false)
            }
        };

        let (foot_lines, foot_comments) = self.collect_run()?;
        root_formatting.lines_trailing = foot_lines as i32;
        for c in foot_comments {
            root_formatting.comments.push(CommentPosition::Footer, c);
        }

        if !self.is_eof() {
            return Err(self.err_here("trailing content after root value"));
        }

        Ok(Document {
            value,
            formatting: root_formatting,
            open_root,
        })
    }

    /// Parse any value: a container, a literal word, or a `NUMBER`/`STRING`
    /// token (the value grammar, including the `-infinity` special
    /// case produced by the tokenizer as a bare `-` `SYMBOL` followed by a
    /// `WORD`).
    fn parse_value(&mut self) -> DjsResult<Value> {
        if self.is_symbol('{') {
            self.bump()?;
            return Ok(Value::Object(self.parse_object_body(Some('}'), false)?));
        }
        if self.is_symbol('[') {
            self.bump()?;
            return Ok(Value::Array(self.parse_array_body()?));
        }
        if self.is_symbol('-') {
            let minus_pos = self.position();
            self.bump()?;
            return match self.current.as_ref().and_then(|t| t.as_word()) {
                Some("infinity") => {
                    self.bump()?;
                    Ok(Value::Infinity(true))
                }
                _ => Err(SyntaxError::illegal_token(minus_pos, "-").into()),
            };
        }
        match self.current.clone() {
            Some(Token::Leaf(leaf)) => match leaf.kind {
                LeafKind::Number { value, .. } => {
                    self.bump()?;
                    Ok(Value::Number(value))
                }
                LeafKind::Str { text, flavor } => {
                    self.bump()?;
                    Ok(Value::String(StringValue::new(text, flavor)))
                }
                LeafKind::Word(word) => {
                    let word_pos = self.position();
                    self.bump()?;
                    match word.as_str() {
                        "true" => Ok(Value::Bool(true)),
                        "false" => Ok(Value::Bool(false)),
                        "null" => Ok(Value::Null),
                        "infinity" => Ok(Value::Infinity(false)),
                        _ => Err(SyntaxError::illegal_token(word_pos, &word).into()),
                    }
                }
                _ => Err(self.err_here("a value")),
            },
            _ => Err(self.err_here("a value")),
        }
    }

    /// A key is a `STRING`, `WORD`, or `NUMBER` token. A
    /// `NUMBER` key keeps its original source spelling and is written back
    /// unquoted, same as a `WORD` key: the implicit-key pattern
    /// `[A-Za-z0-9_$]+` already admits digit-only text, so a numeric key
    /// needs no separate DOM representation (see DESIGN.md).
    fn parse_key(&mut self) -> DjsResult<StringValue> {
        let result = match &self.current {
            Some(Token::Leaf(leaf)) => match &leaf.kind {
                LeafKind::Word(w) => Ok(StringValue::new(w.clone(), StringFlavor::Implicit)),
                LeafKind::Str { text, flavor } => {
                    if text.is_empty() {
                        Err(self.err_here("empty key"))
                    } else {
                        Ok(StringValue::new(text.clone(), *flavor))
                    }
                }
                LeafKind::Number { value, text } => {
                    let rendered = text.clone().unwrap_or_else(|| value.to_string());
                    Ok(StringValue::new(rendered, StringFlavor::Implicit))
                }
                LeafKind::Symbol(':') => Err(self.err_here("leading ':' (missing key)")),
                LeafKind::Symbol(c) => {
                    Err(self.err_here(format!("punctuation in key: '{}' (use quotes to include)", c)))
                }
                LeafKind::Comment { .. } => Err(self.err_here("a comment where a key was expected")),
                LeafKind::Break => Err(self.err_here("end of container when expecting a key")),
            },
            Some(Token::Stream(_)) => Err(self.err_here("a container where a key was expected")),
            None => Err(self.err_here("end of container when expecting a key")),
        }?;
        self.bump()?;
        Ok(result)
    }

    /// A key token directly followed by another key-shaped token (no `:`
    /// between them) means the author tried an unquoted key containing
    /// whitespace; anything else missing a `:` is a plain "expected ':'".
    fn expect_colon(&mut self) -> DjsResult<()> {
        if self.is_symbol(':') {
            return self.bump();
        }
        match &self.current {
            Some(Token::Leaf(leaf))
                if matches!(leaf.kind, LeafKind::Word(_) | LeafKind::Str { .. } | LeafKind::Number { .. }) =>
            {
                Err(self.err_here("whitespace in key (use quotes to include)"))
            }
            _ => Err(SyntaxError::expected(self.position(), "':'").into()),
        }
    }

    fn parse_object_body(&mut self, closer: Option<char>, first_member_auto: bool) -> DjsResult<ObjectValue> {
        let mut obj = ObjectValue::new();
        let (mut lines, mut comments) = self.collect_run()?;
        if self.is_symbol(',') {
            return Err(self.err_here("leading delimiter: ','"));
        }
        loop {
            if self.at_terminator(closer) {
                self.consume_terminator(closer)?;
                obj.tail.lines_trailing = lines as i32;
                obj.tail.interior_comments = comments;
                return Ok(obj);
            }
            if self.is_eof() {
                return Err(match closer {
                    Some(c) => SyntaxError::expected(self.position(), format!("'{}'", c)).into(),
                    None => self.err_here("unexpected end of input"),
                });
            }

            let key = self.parse_key()?;
            let mut formatting = Formatting::default();
            formatting.lines_above = if obj.members.is_empty() && first_member_auto {
                -1
            } else {
                lines as i32
            };
            for c in comments.drain(..) {
                formatting.comments.push(CommentPosition::Header, c);
            }
            self.expect_colon()?;
            let (between_lines, between_comments) = self.collect_run()?;
            formatting.lines_between = between_lines as i32;
            for c in between_comments {
                formatting.comments.push(CommentPosition::Value, c);
            }
            let value = self.parse_value()?;
            for c in self.collect_eol()? {
                formatting.comments.push(CommentPosition::Eol, c);
            }
            obj.push(key, value, formatting);

            let (next_lines, next_comments, saw_delim) = self.consume_delimiter()?;
            lines = next_lines;
            comments = next_comments;

            if self.at_terminator(closer) {
                self.consume_terminator(closer)?;
                obj.tail.lines_trailing = lines as i32;
                obj.tail.interior_comments = comments;
                return Ok(obj);
            }
            if !saw_delim {
                return Err(self.err_here("',' or newline between members"));
            }
        }
    }

    fn parse_array_body(&mut self) -> DjsResult<ArrayValue> {
        let mut arr = ArrayValue::new();
        let (mut lines, mut comments) = self.collect_run()?;
        if self.is_symbol(',') {
            return Err(self.err_here("leading delimiter: ','"));
        }
        loop {
            if self.is_symbol(']') {
                self.bump()?;
                arr.tail.lines_trailing = lines as i32;
                arr.tail.interior_comments = comments;
                return Ok(arr);
            }
            if self.is_eof() {
                return Err(SyntaxError::expected(self.position(), "']'").into());
            }

            let mut formatting = Formatting::default();
            formatting.lines_above = lines as i32;
            for c in comments.drain(..) {
                formatting.comments.push(CommentPosition::Header, c);
            }
            let value = self.parse_value()?;
            for c in self.collect_eol()? {
                formatting.comments.push(CommentPosition::Eol, c);
            }
            arr.push(value, formatting);

            let (next_lines, next_comments, saw_delim) = self.consume_delimiter()?;
            lines = next_lines;
            comments = next_comments;

            if self.is_symbol(']') {
                self.bump()?;
                arr.tail.lines_trailing = lines as i32;
                arr.tail.interior_comments = comments;
                return Ok(arr);
            }
            if !saw_delim {
                return Err(self.err_here("',' or newline between values"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_root_parses_as_object() {
        let doc = parse_str("a: 1\nb: 2\n").unwrap();
        assert!(doc.open_root);
        let obj = doc.value.as_object().unwrap();
        assert_eq!(obj.members.len(), 2);
        assert_eq!(obj.get("a").unwrap().as_f64(), Some(1.0));
        assert_eq!(obj.get("b").unwrap().as_f64(), Some(2.0));
        assert_eq!(obj.members[0].formatting.lines_above, -1);
        assert_eq!(obj.members[1].formatting.lines_above, 1);
    }

    #[test]
    fn closed_object_is_not_open_root() {
        let doc = parse_str("{a: 1}").unwrap();
        assert!(!doc.open_root);
        assert!(doc.value.as_object().is_some());
    }

    #[test]
    fn comment_attachment_matches_header_then_member() {
        let doc = parse_str("// top\n\n# header\nkey: 'value'\n").unwrap();
        let header = doc.formatting.comments.get(CommentPosition::Header);
        assert_eq!(header.len(), 2);
        assert_eq!(header[0].text, "top");
        assert_eq!(header[0].blank_lines_after, 1);
        assert_eq!(header[1].text, "header");
        assert_eq!(header[1].blank_lines_after, 0);

        let obj = doc.value.as_object().unwrap();
        assert!(obj.members[0].formatting.comments.get(CommentPosition::Header).is_empty());
    }

    #[test]
    fn eol_comment_attaches_to_the_value_it_follows() {
        let doc = parse_str("a: 1 // trailing\nb: 2\n").unwrap();
        let obj = doc.value.as_object().unwrap();
        let eol = obj.members[0].formatting.comments.get(CommentPosition::Eol);
        assert_eq!(eol.len(), 1);
        assert_eq!(eol[0].text, "trailing");
    }

    #[test]
    fn trailing_comma_is_accepted_in_djs() {
        let doc = parse_str("{a: 1, b: 2,}").unwrap();
        assert_eq!(doc.value.as_object().unwrap().members.len(), 2);
    }

    #[test]
    fn leading_delimiter_is_an_error() {
        let err = parse_str("[, 1, 2]").unwrap_err();
        assert!(err.as_syntax().is_some());
    }

    #[test]
    fn missing_delimiter_between_values_is_an_error() {
        let err = parse_str("[1 2]").unwrap_err();
        assert!(err.as_syntax().is_some());
    }

    #[test]
    fn illegal_word_value_is_an_error() {
        let err = parse_str("{a: banana}").unwrap_err();
        assert!(matches!(err, DjsError::Syntax(ref e) if e.message.contains("Illegal token")));
    }

    #[test]
    fn bare_minus_not_followed_by_infinity_is_an_error() {
        let err = parse_str("{a: -banana}").unwrap_err();
        match err {
            DjsError::Syntax(e) => {
                assert!(e.message.contains("Illegal token"));
                assert_eq!(e.position.column, 4);
            }
            _ => panic!("expected a syntax error"),
        }
    }

    #[test]
    fn numeric_key_is_accepted() {
        let doc = parse_str(r#"{1: "a"}"#).unwrap();
        assert_eq!(doc.value.as_object().unwrap().get("1").and_then(Value::as_str), Some("a"));
    }

    #[test]
    fn negative_infinity_literal() {
        let doc = parse_str("[infinity, -infinity]").unwrap();
        let arr = doc.value.as_array().unwrap();
        assert_eq!(arr.elements[0].value, Value::Infinity(false));
        assert_eq!(arr.elements[1].value, Value::Infinity(true));
    }

    #[test]
    fn interior_comment_in_empty_object() {
        let doc = parse_str("{ # nothing here\n}").unwrap();
        let obj = doc.value.as_object().unwrap();
        assert_eq!(obj.tail.interior_comments.len(), 1);
        assert_eq!(obj.tail.interior_comments[0].text, "nothing here");
    }

    #[test]
    fn multiline_string_value_round_trips_content() {
        let doc = parse_str("key: '''\n  0\n   1\n    2\n  '''").unwrap();
        let obj = doc.value.as_object().unwrap();
        assert_eq!(obj.get("key").and_then(Value::as_str), Some("0\n 1\n  2"));
    }
}
