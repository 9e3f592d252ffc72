//! A format-preserving reader, tokenizer, parser and writer for JSON and
//! DJS, a JSON superset that adds comments, unquoted keys, trailing
//! commas, single- and multi-line strings, and an optional unwrapped root
//! object.
//!
//! # Overview
//!
//! Parsing JSON is easy; parsing a human-authored config format and writing
//! it back out with the original comments, blank lines and string quoting
//! intact is not. This crate is built around that second problem. The
//! pipeline has four stages:
//!
//! - [`Reader`] walks the source one Unicode scalar at a time, tracking
//!   line/column and offering a small capture facility for lexing.
//! - [`Tokenizer`] turns the reader into a stream of typed tokens (WORD,
//!   NUMBER, STRING, COMMENT, SYMBOL, BREAK), optionally containerizing
//!   matched bracket groups into nested [`TokenStream`]s.
//! - [`parser::json`] and [`parser::djs`] turn tokens into a [`Value`]
//!   tree. The JSON parser is strict RFC 8259; the DJS parser additionally
//!   records enough formatting metadata (blank lines, comment placement,
//!   string flavor) to round-trip a document almost byte-for-byte.
//! - [`writer`] turns a `Value` back into text, either as strict JSON or as
//!   DJS honoring the recorded formatting.
//!
//! # Example
//!
//! ```
//! use djs::{parser, Value};
//!
//! let src = "{\n  // a comment\n  name: 'Ada',\n}\n";
//! let doc = parser::djs::parse_str(src).unwrap();
//! match &doc.value {
//!     Value::Object(obj) => assert!(obj.get("name").is_some()),
//!     _ => panic!("expected an object"),
//! }
//! ```

mod error;
mod logger;
pub mod parser;
mod reader;
pub mod registry;
mod stream;
mod token;
mod tokenizer;
pub mod value;
pub mod writer;

pub use error::{DjsError, DjsResult, Position, SyntaxError};
pub use logger::Log;
pub use reader::{CharSource, DynReader, OwnedSource, Reader, StrSource, StreamSource};
pub use stream::TokenStream;
pub use token::{CommentStyle, ContainerKind, LeafKind, LeafToken, StringFlavor, Token};
pub use tokenizer::Tokenizer;
pub use value::{
    ArrayValue, CommentEntry, CommentHolder, CommentPosition, ContainerTail, Document, Element, Formatting,
    Member, ObjectValue, StringValue, Value,
};
pub use writer::WriterOptions;
