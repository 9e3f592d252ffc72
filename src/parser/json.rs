//! Strict JSON parsing: a recursive-descent parser that reads
//! directly off a [`Reader`], not off a tokenized stream. No comments, no
//! unquoted keys, no trailing commas -- any deviation from RFC 8259 is
//! fatal.

use crate::error::DjsResult;
use crate::reader::{DynReader, Reader};
use crate::value::{ArrayValue, Formatting, ObjectValue, StringValue, Value};

/// Parse `text` as strict JSON, returning the root value. Formatting
/// metadata (`lines_above`/`lines_between`/`lines_trailing`) is still
/// recorded on every member and element, even though the
/// [`super::json`] writer never consults it -- a caller that reuses the DOM
/// with the DJS writer still gets sensible spacing.
pub fn parse_str(text: &str) -> DjsResult<Value> {
    parse_reader(Reader::from_str(text)?)
}

pub fn parse_reader(mut reader: DynReader) -> DjsResult<Value> {
    reader.skip_whitespace(true)?;
    let value = parse_value(&mut reader)?;
    reader.skip_whitespace(true)?;
    if !reader.is_end_of_text() {
        return Err(reader.unexpected("trailing content after root value"));
    }
    Ok(value)
}

fn parse_value(reader: &mut DynReader) -> DjsResult<Value> {
    match reader.current {
        Some('{') => parse_object(reader),
        Some('[') => parse_array(reader),
        Some('"') => Ok(Value::String(StringValue::new(
            reader.read_quoted('"')?,
            crate::token::StringFlavor::Double,
        ))),
        Some('t') => {
            expect_word(reader, "true")?;
            Ok(Value::Bool(true))
        }
        Some('f') => {
            expect_word(reader, "false")?;
            Ok(Value::Bool(false))
        }
        Some('n') => {
            expect_word(reader, "null")?;
            Ok(Value::Null)
        }
        Some(c) if c == '-' || c.is_ascii_digit() => {
            let (v, _) = reader.read_number()?;
            Ok(Value::Number(v))
        }
        Some(c) => Err(reader.unexpected(format!("'{}'", c))),
        None => Err(reader.expected("a value")),
    }
}

fn expect_word(reader: &mut DynReader, word: &str) -> DjsResult<()> {
    for expected in word.chars() {
        if reader.current != Some(expected) {
            return Err(reader.expected(format!("'{}'", word)));
        }
        reader.read()?;
    }
    Ok(())
}

fn parse_object(reader: &mut DynReader) -> DjsResult<Value> {
    reader.expect('{')?;
    let mut obj = ObjectValue::new();
    reader.skip_whitespace(true)?;
    if reader.read_if('}')? {
        return Ok(Value::Object(obj));
    }
    loop {
        let mut formatting = Formatting::default();
        formatting.lines_above = reader.lines_skipped as i32;
        if reader.current != Some('"') {
            return Err(reader.expected("a double-quoted key"));
        }
        let key = reader.read_quoted('"')?;
        reader.skip_whitespace(true)?;
        reader.expect(':')?;
        reader.skip_whitespace(true)?;
        formatting.lines_between = reader.lines_skipped as i32;
        let value = parse_value(reader)?;
        reader.skip_whitespace(true)?;
        let trailing_gap = reader.lines_skipped as i32;
        obj.push(StringValue::new(key, crate::token::StringFlavor::Double), value, formatting);
        if reader.read_if(',')? {
            reader.skip_whitespace(true)?;
            if reader.current == Some('}') {
                return Err(reader.unexpected("',' before '}' (trailing comma)"));
            }
            continue;
        }
        if reader.read_if('}')? {
            obj.tail.lines_trailing = trailing_gap;
            return Ok(Value::Object(obj));
        }
        return Err(reader.expected("',' or '}'"));
    }
}

fn parse_array(reader: &mut DynReader) -> DjsResult<Value> {
    reader.expect('[')?;
    let mut arr = ArrayValue::new();
    reader.skip_whitespace(true)?;
    if reader.read_if(']')? {
        return Ok(Value::Array(arr));
    }
    loop {
        let mut formatting = Formatting::default();
        formatting.lines_above = reader.lines_skipped as i32;
        let value = parse_value(reader)?;
        reader.skip_whitespace(true)?;
        let trailing_gap = reader.lines_skipped as i32;
        arr.push(value, formatting);
        if reader.read_if(',')? {
            reader.skip_whitespace(true)?;
            if reader.current == Some(']') {
                return Err(reader.unexpected("',' before ']' (trailing comma)"));
            }
            continue;
        }
        if reader.read_if(']')? {
            arr.tail.lines_trailing = trailing_gap;
            return Ok(Value::Array(arr));
        }
        return Err(reader.expected("',' or ']'"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_structure() {
        let v = parse_str(r#"{"a": [1, 2, 3], "b": null}"#).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.get("a").unwrap().as_array().unwrap().elements.len(), 3);
        assert!(obj.get("b").unwrap().is_null());
    }

    #[test]
    fn trailing_comma_in_array_is_fatal() {
        let err = parse_str("[1,2,3,]").unwrap_err();
        assert!(err.as_syntax().is_some());
    }

    #[test]
    fn trailing_comma_in_object_is_fatal() {
        let err = parse_str(r#"{"a": 1,}"#).unwrap_err();
        assert!(err.as_syntax().is_some());
    }

    #[test]
    fn unquoted_key_is_fatal() {
        let err = parse_str("{a: 1}").unwrap_err();
        assert!(err.as_syntax().is_some());
    }

    #[test]
    fn rejects_trailing_content_after_root() {
        let err = parse_str("1 2").unwrap_err();
        assert!(err.as_syntax().is_some());
    }

    #[test]
    fn accepts_negative_and_fractional_numbers() {
        let v = parse_str("[-1.5, 2e3]").unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(arr.elements[0].value.as_f64(), Some(-1.5));
        assert_eq!(arr.elements[1].value.as_f64(), Some(2000.0));
    }
}
