//! The parsed document model: an owned, lifetime-free DOM that
//! both parsers produce and both writers consume. Plain JSON values never
//! populate [`Formatting`]; DJS values do, so the document can be written
//! back out close to how it was authored.

use std::collections::BTreeMap;

use crate::token::{CommentStyle, StringFlavor};

/// Where a comment attaches relative to the value it was found next to
/// (the comment-attachment algorithm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommentPosition {
    /// Above the value, on its own line(s).
    Header,
    /// Between a member's key and its value.
    Value,
    /// Trailing on the same line as the value (or its closing delimiter).
    Eol,
    /// Below the value, after everything that follows it at the same
    /// nesting level.
    Footer,
    /// Inside an empty container, with nothing else to attach to.
    Interior,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentEntry {
    pub style: CommentStyle,
    pub text: String,
    /// Blank source lines between this comment and the next token.
    pub blank_lines_after: u32,
}

impl CommentEntry {
    pub fn new(style: CommentStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
            blank_lines_after: 0,
        }
    }
}

/// All comments attached to a single value, keyed by where they sit
/// relative to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentHolder {
    entries: BTreeMap<CommentPosition, Vec<CommentEntry>>,
}

impl CommentHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, position: CommentPosition, entry: CommentEntry) {
        self.entries.entry(position).or_default().push(entry);
    }

    pub fn get(&self, position: CommentPosition) -> &[CommentEntry] {
        self.entries
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

/// Layout metadata recorded by the DJS parser so the writer can reproduce
/// the original spacing. `-1` in a line-count field means
/// "not recorded, use the writer's default".
#[derive(Debug, Clone, PartialEq)]
pub struct Formatting {
    pub lines_above: i32,
    pub lines_between: i32,
    pub lines_trailing: i32,
    pub comments: CommentHolder,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            lines_above: -1,
            lines_between: -1,
            lines_trailing: -1,
            comments: CommentHolder::new(),
        }
    }
}

/// A string value together with how it was (or should be) quoted.
#[derive(Debug, Clone, PartialEq)]
pub struct StringValue {
    pub text: String,
    pub flavor: StringFlavor,
}

impl StringValue {
    pub fn new(text: impl Into<String>, flavor: StringFlavor) -> Self {
        Self {
            text: text.into(),
            flavor,
        }
    }
}

impl From<String> for StringValue {
    fn from(text: String) -> Self {
        Self::new(text, StringFlavor::Double)
    }
}

impl From<&str> for StringValue {
    fn from(text: &str) -> Self {
        Self::new(text.to_string(), StringFlavor::Double)
    }
}

/// One member of an [`ObjectValue`]: the key's own spelling (so `name` and
/// `"name"` can be told apart on write), its value, and the formatting
/// attached to this member.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub key: StringValue,
    pub value: Value,
    pub formatting: Formatting,
}

/// Formatting that belongs to a container itself rather than to any one
/// child: the blank lines between the last child and the closing
/// delimiter, and any comment left alone inside an empty container (spec
/// §3, §4.6's "interior" comment position).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContainerTail {
    pub lines_trailing: i32,
    pub interior_comments: Vec<CommentEntry>,
}

/// An ordered JSON/DJS object. Order is preserved; lookups are linear,
/// which is fine at the sizes this crate expects to see (config files, not
/// bulk data).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectValue {
    pub members: Vec<Member>,
    pub tail: ContainerTail,
}

impl ObjectValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: StringValue, value: Value, formatting: Formatting) {
        self.members.push(Member {
            key,
            value,
            formatting,
        });
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|m| m.key.text == key)
            .map(|m| &m.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub value: Value,
    pub formatting: Formatting,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayValue {
    pub elements: Vec<Element>,
    pub tail: ContainerTail,
}

impl ArrayValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value, formatting: Formatting) {
        self.elements.push(Element { value, formatting });
    }
}

/// A parsed JSON or DJS document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    /// `infinity` / `-infinity`, a DJS-only literal; never
    /// produced by the strict JSON parser.
    Infinity(bool),
    String(StringValue),
    Array(ArrayValue),
    Object(ObjectValue),
}

impl Value {
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&s.text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A whole parsed document: the root value together with the formatting
/// (header/footer comments, in particular) that has nowhere else to live
/// once the outer `{` `}` are gone (the open-root object).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub value: Value,
    pub formatting: Formatting,
    /// True when the source had no outer braces around a top-level object
    ///; meaningless unless `value` is `Value::Object`.
    pub open_root: bool,
}

impl Document {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            formatting: Formatting::default(),
            open_root: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_get_finds_member_by_key() {
        let mut obj = ObjectValue::new();
        obj.push(
            StringValue::from("name"),
            Value::String(StringValue::from("Ada")),
            Formatting::default(),
        );
        assert_eq!(obj.get("name").and_then(Value::as_str), Some("Ada"));
        assert!(obj.get("missing").is_none());
    }

    #[test]
    fn comment_holder_groups_by_position() {
        let mut holder = CommentHolder::new();
        holder.push(CommentPosition::Header, CommentEntry::new(CommentStyle::Line, "a"));
        holder.push(CommentPosition::Header, CommentEntry::new(CommentStyle::Line, "b"));
        assert_eq!(holder.get(CommentPosition::Header).len(), 2);
        assert!(holder.get(CommentPosition::Footer).is_empty());
    }
}
