//! DOM → text writer: strict canonical JSON, and DJS honoring
//! whatever [`Formatting`] the parser attached.

use std::fmt::Write as _;

use crate::token::StringFlavor;
use crate::value::{ArrayValue, CommentEntry, CommentPosition, Document, Formatting, ObjectValue, StringValue, Value};

/// Output policy for both writers; fields marked "DJS only" are ignored by
/// [`write_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    pub indent: String,
    pub allow_condense: bool,
    pub max_spacing: i32,
    pub min_spacing: i32,
    pub default_spacing: i32,
    /// DJS only: omit the outer `{` `}` of a non-empty root object.
    pub omit_root_braces: bool,
    /// DJS only: also allow unquoted output for string *values* shaped
    /// like an identifier, not just keys.
    pub omit_quotes: bool,
    pub smart_spacing: bool,
    pub newline: String,
    pub eol: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            allow_condense: true,
            max_spacing: 2,
            min_spacing: 0,
            default_spacing: 1,
            omit_root_braces: false,
            omit_quotes: false,
            smart_spacing: true,
            newline: "\n".to_string(),
            eol: " ".to_string(),
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn with_allow_condense(mut self, v: bool) -> Self {
        self.allow_condense = v;
        self
    }

    pub fn with_max_spacing(mut self, v: i32) -> Self {
        self.max_spacing = v;
        self
    }

    pub fn with_min_spacing(mut self, v: i32) -> Self {
        self.min_spacing = v;
        self
    }

    pub fn with_default_spacing(mut self, v: i32) -> Self {
        self.default_spacing = v;
        self
    }

    pub fn with_omit_root_braces(mut self, v: bool) -> Self {
        self.omit_root_braces = v;
        self
    }

    pub fn with_omit_quotes(mut self, v: bool) -> Self {
        self.omit_quotes = v;
        self
    }

    pub fn with_smart_spacing(mut self, v: bool) -> Self {
        self.smart_spacing = v;
        self
    }

    /// A preset that never consults recorded formatting: every sibling
    /// separated by a single space, matching "unformatted" JSON output.
    pub fn compact() -> Self {
        Self {
            allow_condense: true,
            default_spacing: 0,
            max_spacing: 0,
            min_spacing: 0,
            smart_spacing: true,
            ..Self::default()
        }
    }

    fn effective_lines(&self, raw: i32) -> u32 {
        let raw = if raw < 0 { self.default_spacing } else { raw };
        let raw = if self.smart_spacing {
            raw.clamp(self.min_spacing, self.max_spacing)
        } else {
            raw
        };
        raw.max(0) as u32
    }
}

fn is_implicit_key(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn write_number(n: f64, out: &mut String) {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        let _ = write!(out, "{}", n as i64);
    } else {
        let _ = write!(out, "{}", n);
    }
}

fn write_quoted(text: &str, quote: char, out: &mut String) {
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

// ---------------------------------------------------------------- JSON ----

/// Write `value` as strict, canonically pretty-printed JSON. Formatting
/// metadata (blank lines, comments) is never consulted: this is always the
/// writer's own default layout.
pub fn write_json(value: &Value, options: &WriterOptions) -> String {
    let mut out = String::new();
    write_json_value(value, options, 0, &mut out);
    out
}

fn write_json_value(value: &Value, options: &WriterOptions, level: usize, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(*n, out),
        // RFC 8259 has no literal for this; there is no lossless JSON
        // spelling, so it degrades to `null` rather than emitting invalid
        // JSON (see DESIGN.md).
        Value::Infinity(_) => out.push_str("null"),
        Value::String(s) => write_quoted(&s.text, '"', out),
        Value::Array(a) => write_json_array(a, options, level, out),
        Value::Object(o) => write_json_object(o, options, level, out),
    }
}

fn write_json_object(o: &ObjectValue, options: &WriterOptions, level: usize, out: &mut String) {
    if o.members.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push('{');
    out.push_str(&options.newline);
    let inner = options.indent.repeat(level + 1);
    for (i, m) in o.members.iter().enumerate() {
        out.push_str(&inner);
        write_quoted(&m.key.text, '"', out);
        out.push_str(": ");
        write_json_value(&m.value, options, level + 1, out);
        if i + 1 < o.members.len() {
            out.push(',');
        }
        out.push_str(&options.newline);
    }
    out.push_str(&options.indent.repeat(level));
    out.push('}');
}

fn write_json_array(a: &ArrayValue, options: &WriterOptions, level: usize, out: &mut String) {
    if a.elements.is_empty() {
        out.push_str("[]");
        return;
    }
    out.push('[');
    out.push_str(&options.newline);
    let inner = options.indent.repeat(level + 1);
    for (i, e) in a.elements.iter().enumerate() {
        out.push_str(&inner);
        write_json_value(&e.value, options, level + 1, out);
        if i + 1 < a.elements.len() {
            out.push(',');
        }
        out.push_str(&options.newline);
    }
    out.push_str(&options.indent.repeat(level));
    out.push(']');
}

// ----------------------------------------------------------------- DJS ----

/// Write a parsed [`Document`] back out as DJS, honoring its recorded
/// formatting.
pub fn write_djs(doc: &Document, options: &WriterOptions) -> String {
    let mut out = String::new();
    write_blank_lines(options.effective_lines(doc.formatting.lines_above), options, &mut out);
    write_comment_run(doc.formatting.comments.get(CommentPosition::Header), options, 0, &mut out);

    match (&doc.value, doc.open_root) {
        (Value::Object(obj), true) => {
            write_members(&obj.members, options, -1, &mut out);
            write_open_root_tail(&obj.tail, options, &mut out);
        }
        (value, _) => write_djs_value(value, options, 0, &mut out),
    }

    let footer = doc.formatting.comments.get(CommentPosition::Footer);
    if !footer.is_empty() {
        write_blank_lines(1, options, &mut out);
        write_comment_run(footer, options, 0, &mut out);
    }
    if !doc.open_root {
        write_blank_lines(options.effective_lines(doc.formatting.lines_trailing), options, &mut out);
    }
    out
}

/// The tail of an open-root object: since there is no closing brace, the
/// mandatory "at least one line" padding that closed containers get (see
/// `write_container_tail`) doesn't apply here -- an open root with no
/// trailing newline in the source should round-trip with none.
fn write_open_root_tail(tail: &crate::value::ContainerTail, options: &WriterOptions, out: &mut String) {
    if !tail.interior_comments.is_empty() {
        write_blank_lines(1, options, out);
        write_comment_run(&tail.interior_comments, options, -1, out);
        return;
    }
    write_blank_lines(options.effective_lines(tail.lines_trailing), options, out);
}

fn write_blank_lines(n: u32, options: &WriterOptions, out: &mut String) {
    for _ in 0..n {
        out.push_str(&options.newline);
    }
}

fn indent_at(level: i32, options: &WriterOptions) -> String {
    if level < 0 {
        String::new()
    } else {
        options.indent.repeat(level as usize)
    }
}

fn write_comment_run(comments: &[CommentEntry], options: &WriterOptions, level: i32, out: &mut String) {
    for c in comments {
        write_comment_line(c, out);
        let gap = if options.smart_spacing {
            (c.blank_lines_after as i32).min(options.max_spacing).max(0) as u32
        } else {
            c.blank_lines_after
        };
        write_blank_lines(gap, options, out);
        out.push_str(&options.newline);
        out.push_str(&indent_at(level, options));
    }
}

fn write_comment_line(c: &CommentEntry, out: &mut String) {
    match c.style {
        crate::token::CommentStyle::Line => {
            out.push_str("// ");
            out.push_str(&c.text);
        }
        crate::token::CommentStyle::Hash => {
            out.push_str("# ");
            out.push_str(&c.text);
        }
        crate::token::CommentStyle::Block => {
            out.push_str("/* ");
            out.push_str(&c.text);
            out.push_str(" */");
        }
    }
}

fn write_djs_value(value: &Value, options: &WriterOptions, level: i32, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(*n, out),
        Value::Infinity(neg) => out.push_str(if *neg { "-infinity" } else { "infinity" }),
        Value::String(s) => write_djs_string(s, options, out),
        Value::Array(a) => write_djs_array(a, options, level, out),
        Value::Object(o) => write_djs_object(o, options, level, out),
    }
}

fn choose_string_flavor(text: &str, stored: StringFlavor) -> StringFlavor {
    let legal = match stored {
        StringFlavor::Single => !text.contains('\'') && !text.contains('\n'),
        StringFlavor::Double => !text.contains('\n'),
        StringFlavor::Multi => true,
        StringFlavor::Backtick => !text.contains('`'),
        StringFlavor::Implicit | StringFlavor::None => false,
    };
    if legal {
        stored
    } else if text.contains('\n') {
        StringFlavor::Multi
    } else if text.contains('\'') {
        StringFlavor::Double
    } else {
        StringFlavor::Single
    }
}

fn write_djs_string(s: &StringValue, options: &WriterOptions, out: &mut String) {
    if options.omit_quotes && is_implicit_key(&s.text) {
        out.push_str(&s.text);
        return;
    }
    match choose_string_flavor(&s.text, s.flavor) {
        StringFlavor::Single => write_quoted(&s.text, '\'', out),
        StringFlavor::Multi => write_multi(&s.text, out),
        _ => write_quoted(&s.text, '"', out),
    }
}

fn write_multi(text: &str, out: &mut String) {
    out.push_str("'''\n");
    for line in text.split('\n') {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("'''");
}

fn choose_key_flavor(text: &str) -> StringFlavor {
    if is_implicit_key(text) {
        StringFlavor::Implicit
    } else if text.contains('\'') {
        StringFlavor::Double
    } else {
        StringFlavor::Single
    }
}

fn write_key(key: &StringValue, out: &mut String) {
    match choose_key_flavor(&key.text) {
        StringFlavor::Implicit => out.push_str(&key.text),
        StringFlavor::Double => write_quoted(&key.text, '"', out),
        _ => write_quoted(&key.text, '\'', out),
    }
}

fn write_eol_comments(formatting: &Formatting, options: &WriterOptions, out: &mut String) {
    for c in formatting.comments.get(CommentPosition::Eol) {
        out.push_str(&options.eol);
        write_comment_line(c, out);
    }
}

/// Members of an object, or an open-root's top-level members (`level ==
/// -1`, no enclosing indent).
fn write_members(members: &[crate::value::Member], options: &WriterOptions, level: i32, out: &mut String) {
    for (i, m) in members.iter().enumerate() {
        if i > 0 {
            write_item_separator(&m.formatting, options, level, out);
        }
        let header = m.formatting.comments.get(CommentPosition::Header);
        if !header.is_empty() {
            write_comment_run(header, options, level, out);
        }
        write_key(&m.key, out);
        out.push(':');
        write_value_gap(&m.formatting, options, level, out);
        write_djs_value(&m.value, options, level, out);
        write_eol_comments(&m.formatting, options, out);
    }
}

fn write_elements(elements: &[crate::value::Element], options: &WriterOptions, level: i32, out: &mut String) {
    for (i, e) in elements.iter().enumerate() {
        if i > 0 {
            write_item_separator(&e.formatting, options, level, out);
        }
        let header = e.formatting.comments.get(CommentPosition::Header);
        if !header.is_empty() {
            write_comment_run(header, options, level, out);
        }
        write_djs_value(&e.value, options, level, out);
        write_eol_comments(&e.formatting, options, out);
    }
}

/// Between two siblings: a `,` plus a space when condensing onto one line
/// is legal (the delimiter rule), otherwise the recorded blank
/// lines, reproduced as newlines, with the next line's indent.
fn write_item_separator(next: &Formatting, options: &WriterOptions, level: i32, out: &mut String) {
    let condensed = next.lines_above == 0
        && options.allow_condense
        && next.comments.get(CommentPosition::Header).is_empty();
    if condensed {
        out.push(',');
        out.push(' ');
        return;
    }
    let effective = options.effective_lines(next.lines_above).max(1);
    write_blank_lines(effective, options, out);
    out.push_str(&indent_at(level, options));
}

/// The gap between an opening bracket and its first child: condensed onto
/// the opener's own line (no newline) under the same rule
/// `write_item_separator` uses between later siblings -- `lines_above ==
/// 0` and `allow_condense` -- otherwise the recorded blank lines plus
/// indent, the same as any other sibling gap. Keeping this rule in sync
/// with `write_item_separator` is what lets `{a: 1}` and `[1, 2, 3]`
/// round-trip onto one line instead of always exploding to one child per
/// line (spec §8 property 3).
fn write_opener_gap(first: &Formatting, options: &WriterOptions, level: i32, out: &mut String) {
    let condensed = first.lines_above == 0
        && options.allow_condense
        && first.comments.get(CommentPosition::Header).is_empty();
    if condensed {
        return;
    }
    let effective = options.effective_lines(first.lines_above).max(1);
    write_blank_lines(effective, options, out);
    out.push_str(&indent_at(level, options));
}

fn write_value_gap(formatting: &Formatting, options: &WriterOptions, level: i32, out: &mut String) {
    let value_comments = formatting.comments.get(CommentPosition::Value);
    if value_comments.is_empty() {
        out.push(' ');
        return;
    }
    write_blank_lines(options.effective_lines(formatting.lines_between), options, out);
    out.push_str(&indent_at(level + 1, options));
    write_comment_run(value_comments, options, level + 1, out);
}

fn write_container_tail(tail: &crate::value::ContainerTail, options: &WriterOptions, level: i32, out: &mut String) {
    if !tail.interior_comments.is_empty() {
        write_blank_lines(1, options, out);
        out.push_str(&indent_at(level, options));
        write_comment_run(&tail.interior_comments, options, level, out);
        return;
    }
    // Symmetric with `write_opener_gap`: a container recorded with no
    // blank lines before its closer condenses the closer onto the last
    // child's line too, instead of always forcing one -- otherwise
    // `{a: 1}` would round-trip with `lines_trailing` 0 -> 1.
    if tail.lines_trailing == 0 && options.allow_condense {
        return;
    }
    let effective = options.effective_lines(tail.lines_trailing).max(1);
    write_blank_lines(effective, options, out);
    out.push_str(&indent_at(level, options));
}

fn write_djs_object(o: &ObjectValue, options: &WriterOptions, level: i32, out: &mut String) {
    if o.members.is_empty() {
        out.push('{');
        if !o.tail.interior_comments.is_empty() {
            write_comment_run(&o.tail.interior_comments, options, level, out);
        }
        out.push('}');
        return;
    }
    out.push('{');
    write_opener_gap(&o.members[0].formatting, options, level + 1, out);
    write_members(&o.members, options, level + 1, out);
    write_container_tail(&o.tail, options, level, out);
    out.push('}');
}

fn write_djs_array(a: &ArrayValue, options: &WriterOptions, level: i32, out: &mut String) {
    if a.elements.is_empty() {
        out.push('[');
        if !a.tail.interior_comments.is_empty() {
            write_comment_run(&a.tail.interior_comments, options, level, out);
        }
        out.push(']');
        return;
    }
    out.push('[');
    write_opener_gap(&a.elements[0].formatting, options, level + 1, out);
    write_elements(&a.elements, options, level + 1, out);
    write_container_tail(&a.tail, options, level, out);
    out.push(']');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::djs;
    use crate::parser::json;

    #[test]
    fn json_writer_pretty_prints_with_default_options() {
        let v = json::parse_str(r#"{"a": 1, "b": null}"#).unwrap();
        let out = write_json(&v, &WriterOptions::default());
        assert_eq!(out, "{\n  \"a\": 1,\n  \"b\": null\n}");
    }

    #[test]
    fn json_writer_handles_empty_containers() {
        let v = json::parse_str(r#"{"a": [], "b": {}}"#).unwrap();
        let out = write_json(&v, &WriterOptions::default());
        assert_eq!(out, "{\n  \"a\": [],\n  \"b\": {}\n}");
    }

    #[test]
    fn djs_writer_round_trips_open_root_spacing() {
        let doc = djs::parse_str("a: 1\nb: 2\n").unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        assert_eq!(out, "a: 1\nb: 2\n");
    }

    #[test]
    fn djs_writer_prefers_implicit_keys() {
        let doc = djs::parse_str(r#"{"a": 1}"#).unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        assert_eq!(out, "{a: 1}");
    }

    #[test]
    fn djs_writer_condenses_same_line_siblings() {
        let doc = djs::parse_str("[1, 2, 3]").unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        assert_eq!(out, "[1, 2, 3]");
    }

    #[test]
    fn djs_writer_keeps_multiline_container_padding_when_recorded() {
        let src = "{\n  a: 1\n  b: 2\n}";
        let doc = djs::parse_str(src).unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        assert_eq!(out, src);
    }

    #[test]
    fn djs_writer_matches_mixed_opener_and_sibling_condensing() {
        // `a` sits on the opener's own line (lines_above == 0); `b` was
        // pushed to its own line (lines_above == 1). Both gaps should
        // round-trip independently instead of forcing the whole object
        // onto one shape.
        let src = "{a: 1\n b: 2\n}";
        let doc = djs::parse_str(src).unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        assert_eq!(out, "{a: 1\n  b: 2\n}");
    }

    #[test]
    fn djs_writer_round_trips_object_lines_above_through_reparse() {
        let doc = djs::parse_str(r#"{"a": 1}"#).unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        let reparsed = djs::parse_str(&out).unwrap();
        let original_member = &doc.value.as_object().unwrap().members[0];
        let reparsed_member = &reparsed.value.as_object().unwrap().members[0];
        assert_eq!(original_member.formatting.lines_above, reparsed_member.formatting.lines_above);
        let original_tail = doc.value.as_object().unwrap().tail.lines_trailing;
        let reparsed_tail = reparsed.value.as_object().unwrap().tail.lines_trailing;
        assert_eq!(original_tail, reparsed_tail);
    }

    #[test]
    fn djs_writer_emits_eol_comments() {
        let doc = djs::parse_str("{a: 1 // note\n}").unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        assert!(out.contains("// note"));
    }

    #[test]
    fn djs_writer_open_root_without_trailing_newline_stays_bare() {
        let doc = djs::parse_str("a: 1\nb: 2").unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        assert_eq!(out, "a: 1\nb: 2");
    }

    #[test]
    fn djs_writer_preserves_comment_trailing_the_last_open_root_member() {
        let doc = djs::parse_str("a: 1\n// trailing\n").unwrap();
        let out = write_djs(&doc, &WriterOptions::default());
        assert_eq!(out, "a: 1\n// trailing\n");
    }
}
