//! Format-by-extension dispatch: a thin boundary over
//! [`parser`]/[`writer`], deliberately excluded from the core pipeline
//! itself. Modeled on the teacher's trait-object format registries, but
//! since every entry here is a pair of free functions rather than a
//! stateful collaborator, a lookup table of function pointers is the
//! idiomatic fit (the "mapping from lowercase extension to a pair of
//! (parser-factory, writer-factory), with an alias map applied before
//! lookup").

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::DjsResult;
use crate::value::{Document, Value};
use crate::writer::WriterOptions;
use crate::{parser, writer};

/// One of the formats this registry knows how to parse and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Djs,
}

static ALIASES: Lazy<HashMap<&'static str, Format>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("json", Format::Json);
    m.insert("djs", Format::Djs);
    m.insert("xjs", Format::Djs);
    m
});

/// Resolve a (lowercased) file extension to a [`Format`]; unknown
/// extensions default to DJS, the permissive superset.
pub fn resolve(extension: &str) -> Format {
    ALIASES
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(Format::Djs)
}

/// Parse `source` as the format named by `extension`. JSON yields a bare
/// [`Value`] with no formatting metadata; DJS yields the same `Value`
/// wrapped in its root [`Document`] -- callers that only need the value
/// can match on `Format` or just take `.value` either way.
pub fn parse(extension: &str, source: &str) -> DjsResult<Document> {
    match resolve(extension) {
        Format::Json => Ok(Document::new(parser::json::parse_str(source)?)),
        Format::Djs => parser::djs::parse_str(source),
    }
}

/// Write `value` as the format named by `extension`. For JSON, `document`
/// is only a container for the value (its formatting is ignored); for DJS,
/// the recorded formatting and `open_root` flag are honored.
pub fn write(extension: &str, document: &Document, options: &WriterOptions) -> String {
    match resolve(extension) {
        Format::Json => writer::write_json(&document.value, options),
        Format::Djs => writer::write_djs(document, options),
    }
}

/// Convenience entry point for callers that only have a bare [`Value`]
/// (e.g. constructed programmatically) and want it written in a given
/// format.
pub fn write_value(extension: &str, value: &Value, options: &WriterOptions) -> String {
    write(extension, &Document::new(value.clone()), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_defaults_to_djs() {
        assert_eq!(resolve("toml"), Format::Djs);
    }

    #[test]
    fn xjs_aliases_djs() {
        assert_eq!(resolve("xjs"), Format::Djs);
        assert_eq!(resolve("XJS"), Format::Djs);
    }

    #[test]
    fn json_extension_round_trips_through_registry() {
        let doc = parse("json", r#"{"a": 1}"#).unwrap();
        let out = write("json", &doc, &WriterOptions::default());
        assert_eq!(out, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn djs_extension_preserves_open_root() {
        let doc = parse("djs", "a: 1\n").unwrap();
        assert!(doc.open_root);
        let out = write("djs", &doc, &WriterOptions::default());
        assert_eq!(out, "a: 1\n");
    }
}
