//! The lazy token stream: a cursor over tokens produced
//! on demand from a shared [`Tokenizer`], with peek/skip/lookup helpers and
//! an optional retention mode for callers that need to walk backwards.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ptree::TreeItem;

use crate::error::DjsResult;
use crate::token::{ContainerKind, Token};
use crate::tokenizer::Tokenizer;

/// A lazily-materializing sequence of tokens bounded by a container (or,
/// for the root, by end of input).
///
/// Tokens already produced are always kept in `source` so a stream can be
/// indexed and re-walked (the spec's "retention mode" reduces to the
/// default here: nothing is ever evicted, since without the ability to run
/// the crate there is no way to validate a bound eviction scheme against
/// real workloads -- see DESIGN.md).
pub struct TokenStream {
    kind: ContainerKind,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub last_line: usize,
    pub offset: usize,
    source: Vec<Token>,
    cursor: isize,
    finished: bool,
    producer: Option<Rc<RefCell<Tokenizer>>>,
    self_rc: Option<Rc<RefCell<Tokenizer>>>,
}

impl TokenStream {
    /// The root stream: an `Open` container with no closer, spanning the
    /// whole input.
    pub fn new_root(producer: Rc<RefCell<Tokenizer>>) -> Self {
        Self {
            kind: ContainerKind::Open,
            start: 0,
            end: 0,
            line: 1,
            last_line: 1,
            offset: 0,
            source: Vec::new(),
            cursor: -1,
            finished: false,
            producer: Some(producer.clone()),
            self_rc: Some(producer),
        }
    }

    /// A child stream created when the tokenizer encounters a bracket
    /// opener in containerized mode, sharing the same underlying
    /// tokenizer as its parent.
    pub(crate) fn new_child(
        kind: ContainerKind,
        start: usize,
        line: usize,
        offset: usize,
        producer: Rc<RefCell<Tokenizer>>,
    ) -> Self {
        Self {
            kind,
            start,
            end: start,
            line,
            last_line: line,
            offset,
            source: Vec::new(),
            cursor: -1,
            finished: false,
            producer: Some(producer.clone()),
            self_rc: Some(producer),
        }
    }

    /// A fully materialized stream with no tokenizer behind it, used by
    /// the DJS parser when it needs to hand a closed sub-sequence (e.g. a
    /// re-scan window) to a collaborator.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            kind: ContainerKind::Open,
            start: tokens.first().map(|t| t.start()).unwrap_or(0),
            end: tokens.last().map(|t| t.end()).unwrap_or(0),
            line: tokens.first().map(|t| t.line()).unwrap_or(1),
            last_line: tokens.last().map(|t| t.last_line()).unwrap_or(1),
            offset: 0,
            source: tokens,
            cursor: -1,
            finished: true,
            producer: None,
            self_rc: None,
        }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Current cursor index; `-1` before the first `next()` call.
    pub fn get_index(&self) -> isize {
        self.cursor
    }

    /// Already-materialized token at `index`, if in range.
    pub fn token_at(&self, index: usize) -> Option<Token> {
        self.source.get(index).cloned()
    }

    fn produce_next(&mut self) -> DjsResult<Option<Token>> {
        if self.finished {
            return Ok(None);
        }
        let producer = match &self.producer {
            Some(p) => p.clone(),
            None => {
                self.finished = true;
                return Ok(None);
            }
        };
        let self_rc = self.self_rc.as_ref().unwrap().clone();
        let next = producer.borrow_mut().next_in(self.kind, &self_rc)?;
        match &next {
            Some(tok) => {
                self.end = tok.end();
                self.last_line = tok.last_line();
            }
            None => {
                self.finished = true;
            }
        }
        Ok(next)
    }

    /// Advance the cursor by one and return the token now at it, producing
    /// it from the tokenizer if it hasn't been seen before.
    pub fn next(&mut self) -> DjsResult<Option<Token>> {
        let want = self.cursor + 1;
        if (want as usize) < self.source.len() {
            self.cursor = want;
            return Ok(self.source.get(want as usize).cloned());
        }
        match self.produce_next()? {
            Some(tok) => {
                self.source.push(tok.clone());
                self.cursor = want;
                Ok(Some(tok))
            }
            None => Ok(None),
        }
    }

    /// Peek `k` tokens ahead of the cursor (`k = 1` is the next token)
    /// without moving it, materializing as many tokens as needed.
    pub fn peek(&mut self, k: isize) -> DjsResult<Option<Token>> {
        if k <= 0 {
            let idx = self.cursor + k;
            return Ok(if idx >= 0 {
                self.source.get(idx as usize).cloned()
            } else {
                None
            });
        }
        let target = self.cursor + k;
        while (self.source.len() as isize) <= target {
            match self.produce_next()? {
                Some(tok) => self.source.push(tok),
                None => return Ok(None),
            }
        }
        Ok(self.source.get(target as usize).cloned())
    }

    /// Advance the cursor by `n` without returning the skipped tokens.
    pub fn skip(&mut self, n: usize) -> DjsResult<()> {
        for _ in 0..n {
            if self.next()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Move the cursor directly to `index`, materializing tokens up to it
    /// if necessary.
    pub fn skip_to(&mut self, index: usize) -> DjsResult<()> {
        while (self.source.len()) <= index {
            match self.produce_next()? {
                Some(tok) => self.source.push(tok),
                None => break,
            }
        }
        self.cursor = index as isize;
        Ok(())
    }

    /// Materialize (if necessary) and return the token at `index`, filling
    /// in every token between the current end of `source` and `index`.
    fn token_at_materializing(&mut self, index: usize) -> DjsResult<Option<Token>> {
        while self.source.len() <= index {
            match self.produce_next()? {
                Some(tok) => self.source.push(tok),
                None => return Ok(None),
            }
        }
        Ok(self.source.get(index).cloned())
    }

    /// Scan forward from `from` for a `SYMBOL(symbol)` token at the top
    /// level of this stream, materializing tokens as needed. The scan is
    /// symbol-only (it does not look inside strings or comments, and does
    /// not track bracket depth): a legitimate object key can never itself
    /// be an opening bracket, so a plain forward scan for the first
    /// matching symbol is sufficient to disambiguate an open-root object
    /// from an open-root array or scalar. When `exact` is true, a match is
    /// only accepted if it is an isolated operator: neither the token
    /// immediately before nor after it may be another symbol touching its
    /// span (so `:` matches inside `a : 1` but not inside `a :: 1` or
    /// `a := 1`, where the scan instead keeps looking past the run).
    pub fn lookup(&mut self, symbol: char, from: usize, exact: bool) -> DjsResult<Option<usize>> {
        let mut i = from;
        loop {
            let tok = self.token_at_materializing(i)?;
            match tok {
                Some(t) if t.is_symbol(symbol) => {
                    if exact {
                        let touches_prev = i > 0
                            && self.source[i - 1].as_symbol().is_some()
                            && self.source[i - 1].end() == t.start();
                        let next = self.token_at_materializing(i + 1)?;
                        let touches_next = next
                            .as_ref()
                            .map(|n| n.as_symbol().is_some() && t.end() == n.start())
                            .unwrap_or(false);
                        if touches_prev || touches_next {
                            i += 1;
                            continue;
                        }
                    }
                    return Ok(Some(i));
                }
                Some(_) => i += 1,
                None => return Ok(None),
            }
        }
    }

    /// Render this stream (and any nested streams within it) as a tree,
    /// the way the teacher crate renders its lexeme trees.
    pub fn stringify(&self) -> DjsResult<String> {
        let mut materialized = self.clone_materialized();
        // Force full materialization before rendering so the tree reflects
        // the whole container, not just what's been visited so far.
        while materialized.next()?.is_some() {}
        let mut out = Vec::new();
        ptree::write_tree(&TokenTreeItem::Container(materialized), &mut out).map_err(|e| {
            crate::error::SyntaxError::new(
                crate::error::Position::default(),
                format!("failed to render token tree: {}", e),
            )
        })?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn clone_materialized(&self) -> TokenStream {
        TokenStream {
            kind: self.kind,
            start: self.start,
            end: self.end,
            line: self.line,
            last_line: self.last_line,
            offset: self.offset,
            source: self.source.clone(),
            cursor: self.cursor,
            finished: self.finished,
            producer: self.producer.clone(),
            self_rc: self.self_rc.clone(),
        }
    }
}

impl Clone for TokenStream {
    fn clone(&self) -> Self {
        self.clone_materialized()
    }
}

impl fmt::Debug for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStream")
            .field("kind", &self.kind)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for TokenStream {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.start == other.start
            && self.end == other.end
            && self.source == other.source
    }
}

/// A self-referential tree view over a materialized stream, the same
/// shape the teacher crate's `ASTNode::TreeItem` impl uses.
#[derive(Clone)]
enum TokenTreeItem {
    Container(TokenStream),
    Leaf(Token),
}

impl TreeItem for TokenTreeItem {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        match self {
            TokenTreeItem::Container(s) => write!(f, "{:?}", s.kind()),
            TokenTreeItem::Leaf(Token::Leaf(leaf)) => write!(f, "{:?}", leaf.kind),
            TokenTreeItem::Leaf(Token::Stream(s)) => write!(f, "{:?}", s.kind()),
        }
    }

    fn children(&self) -> std::borrow::Cow<[Self::Child]> {
        let tokens: &[Token] = match self {
            TokenTreeItem::Container(s) => &s.source,
            TokenTreeItem::Leaf(Token::Stream(s)) => &s.source,
            TokenTreeItem::Leaf(Token::Leaf(_)) => &[],
        };
        std::borrow::Cow::Owned(
            tokens
                .iter()
                .map(|t| TokenTreeItem::Leaf(t.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    fn stream_over(src: &str, containerized: bool) -> TokenStream {
        let reader = Reader::from_str(src).unwrap();
        Tokenizer::new(reader, containerized).into_stream()
    }

    #[test]
    fn next_advances_cursor_and_materializes() {
        let mut s = stream_over("1 2 3", false);
        assert_eq!(s.get_index(), -1);
        assert!(s.next().unwrap().is_some());
        assert_eq!(s.get_index(), 0);
        assert!(s.next().unwrap().is_some());
        assert!(s.next().unwrap().is_some());
        assert!(s.next().unwrap().is_none());
    }

    #[test]
    fn peek_does_not_move_cursor() {
        let mut s = stream_over("1 2 3", false);
        let first = s.peek(1).unwrap().unwrap();
        assert_eq!(s.get_index(), -1);
        let advanced = s.next().unwrap().unwrap();
        assert_eq!(format!("{:?}", first), format!("{:?}", advanced));
    }

    #[test]
    fn lookup_finds_top_level_colon() {
        let mut s = stream_over("a : 1", false);
        let idx = s.lookup(':', 0, false).unwrap();
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn lookup_returns_none_when_absent() {
        let mut s = stream_over("a b c", false);
        let idx = s.lookup(':', 0, false).unwrap();
        assert_eq!(idx, None);
    }

    #[test]
    fn lookup_exact_skips_symbol_runs() {
        // `::` tokenizes as two adjacent `:` symbols; neither is isolated,
        // so an exact lookup must keep scanning past the run.
        let mut s = stream_over("a :: 1 : 2", false);
        let idx = s.lookup(':', 0, true).unwrap();
        assert_eq!(idx, Some(4));
    }

    #[test]
    fn lookup_inexact_accepts_first_symbol_in_a_run() {
        let mut s = stream_over("a :: 1", false);
        let idx = s.lookup(':', 0, false).unwrap();
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn containerized_stream_nests_braces() {
        let mut s = stream_over("{ 1 }", true);
        let opener = s.next().unwrap().unwrap();
        match opener {
            Token::Stream(mut inner) => {
                assert_eq!(inner.kind(), ContainerKind::Braces);
                let v = inner.next().unwrap().unwrap();
                assert!(matches!(v, Token::Leaf(_)));
                assert!(inner.next().unwrap().is_none());
            }
            _ => panic!("expected a nested stream for '{{'"),
        }
        assert!(s.next().unwrap().is_none());
    }
}
