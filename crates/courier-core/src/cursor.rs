//! Streaming token cursor over a borrowed JSON document.
//!
//! The cursor walks one document token by token without building a tree.
//! Whole objects and arrays can be lifted out as raw text spans
//! ([`JsonCursor::next_raw`]) and handed to a serde-derived decoder, which is
//! how record types are decoded. [`JsonCursor::peek_cursor`] returns an
//! independent look-ahead copy: the source text is borrowed, so the copy
//! shares no position state with its source cursor.

use std::borrow::Cow;
use std::fmt;

use crate::error::DecodeError;

/// Structural kind of the next token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Name,
    String,
    Number,
    Boolean,
    Null,
    EndDocument,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeginObject => "BEGIN_OBJECT",
            Self::EndObject => "END_OBJECT",
            Self::BeginArray => "BEGIN_ARRAY",
            Self::EndArray => "END_ARRAY",
            Self::Name => "NAME",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::Null => "NULL",
            Self::EndDocument => "END_DOCUMENT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Document { done: bool },
    /// `{` read, nothing else yet.
    EmptyObject,
    /// `,` read inside an object; a name must follow.
    ObjectNeedsName,
    /// Name and `:` read; a value must follow.
    ObjectNeedsValue,
    /// A member value was read.
    ObjectAfterValue,
    EmptyArray,
    ArrayNeedsValue,
    ArrayAfterValue,
}

#[derive(Debug, Clone)]
pub struct JsonCursor<'a> {
    src: &'a str,
    pos: usize,
    scopes: Vec<Scope>,
}

impl<'a> JsonCursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            scopes: vec![Scope::Document { done: false }],
        }
    }

    /// Byte offset of the cursor within the source text.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// An independent cursor positioned where this one is.
    pub fn peek_cursor(&self) -> JsonCursor<'a> {
        self.clone()
    }

    /// Kind of the next token. Separators (`,`) are consumed as a side effect,
    /// so repeated calls are stable.
    pub fn peek(&mut self) -> Result<Token, DecodeError> {
        self.skip_whitespace();
        let scope = self.top();
        match scope {
            Scope::Document { done: true } => match self.byte() {
                None => Ok(Token::EndDocument),
                Some(_) => Err(DecodeError::syntax(self.pos, "trailing data after document")),
            },
            Scope::Document { done: false }
            | Scope::ObjectNeedsValue
            | Scope::ArrayNeedsValue => self.value_token(),
            Scope::EmptyObject | Scope::ObjectNeedsName => match self.byte() {
                Some(b'}') if scope == Scope::EmptyObject => Ok(Token::EndObject),
                Some(b'"') => Ok(Token::Name),
                Some(_) => Err(DecodeError::syntax(self.pos, "expected a member name")),
                None => Err(self.eof()),
            },
            Scope::ObjectAfterValue => match self.byte() {
                Some(b'}') => Ok(Token::EndObject),
                Some(b',') => {
                    self.pos += 1;
                    self.set_top(Scope::ObjectNeedsName);
                    self.peek()
                }
                Some(_) => Err(DecodeError::syntax(self.pos, "expected ',' or '}'")),
                None => Err(self.eof()),
            },
            Scope::EmptyArray => match self.byte() {
                Some(b']') => Ok(Token::EndArray),
                _ => self.value_token(),
            },
            Scope::ArrayAfterValue => match self.byte() {
                Some(b']') => Ok(Token::EndArray),
                Some(b',') => {
                    self.pos += 1;
                    self.set_top(Scope::ArrayNeedsValue);
                    self.peek()
                }
                Some(_) => Err(DecodeError::syntax(self.pos, "expected ',' or ']'")),
                None => Err(self.eof()),
            },
        }
    }

    /// Whether the current object or array has another member.
    pub fn has_next(&mut self) -> Result<bool, DecodeError> {
        let token = self.peek()?;
        Ok(!matches!(
            token,
            Token::EndObject | Token::EndArray | Token::EndDocument
        ))
    }

    pub fn begin_object(&mut self) -> Result<(), DecodeError> {
        self.expect(Token::BeginObject, "BEGIN_OBJECT")?;
        self.pos += 1;
        self.scopes.push(Scope::EmptyObject);
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<(), DecodeError> {
        self.expect(Token::EndObject, "END_OBJECT")?;
        self.pos += 1;
        self.scopes.pop();
        self.value_consumed();
        Ok(())
    }

    pub fn begin_array(&mut self) -> Result<(), DecodeError> {
        self.expect(Token::BeginArray, "BEGIN_ARRAY")?;
        self.pos += 1;
        self.scopes.push(Scope::EmptyArray);
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<(), DecodeError> {
        self.expect(Token::EndArray, "END_ARRAY")?;
        self.pos += 1;
        self.scopes.pop();
        self.value_consumed();
        Ok(())
    }

    /// Consumes the next member name.
    pub fn next_name(&mut self) -> Result<Cow<'a, str>, DecodeError> {
        self.expect(Token::Name, "NAME")?;
        let name = self.read_string()?;
        self.finish_name()?;
        Ok(name)
    }

    /// Consumes the next member name if it is one of `candidates` and returns
    /// its index. An unmatched name is left in place for [`Self::skip_name`].
    pub fn select_name(&mut self, candidates: &[&str]) -> Result<Option<usize>, DecodeError> {
        self.expect(Token::Name, "NAME")?;
        let start = self.pos;
        let name = self.read_string()?;
        match candidates.iter().position(|candidate| *candidate == name) {
            Some(index) => {
                self.finish_name()?;
                Ok(Some(index))
            }
            None => {
                self.pos = start;
                Ok(None)
            }
        }
    }

    pub fn skip_name(&mut self) -> Result<(), DecodeError> {
        self.next_name().map(drop)
    }

    /// Consumes the next value of any shape and returns its source text.
    pub fn next_raw(&mut self) -> Result<&'a str, DecodeError> {
        let token = self.peek()?;
        let start = self.pos;
        match token {
            Token::BeginObject | Token::BeginArray => self.skip_composite()?,
            Token::String => {
                self.read_string()?;
                self.value_consumed();
            }
            Token::Number => {
                self.read_number()?;
                self.value_consumed();
            }
            Token::Boolean => {
                self.next_bool()?;
            }
            Token::Null => self.next_null()?,
            found => {
                return Err(DecodeError::UnexpectedToken {
                    expected: "a value",
                    found,
                    offset: self.pos,
                });
            }
        }
        Ok(&self.src[start..self.pos])
    }

    pub fn skip_value(&mut self) -> Result<(), DecodeError> {
        self.next_raw().map(drop)
    }

    /// Reads a string value. A number token is returned as its literal text.
    pub fn next_string(&mut self) -> Result<Cow<'a, str>, DecodeError> {
        let value = match self.peek()? {
            Token::String => self.read_string()?,
            Token::Number => Cow::Borrowed(self.read_number()?.0),
            found => {
                return Err(DecodeError::UnexpectedToken {
                    expected: "a string",
                    found,
                    offset: self.pos,
                });
            }
        };
        self.value_consumed();
        Ok(value)
    }

    /// Reads a number. A string holding a number is accepted as well.
    pub fn next_double(&mut self) -> Result<f64, DecodeError> {
        let value = match self.peek()? {
            Token::Number => self.read_number()?.1,
            Token::String => {
                let offset = self.pos;
                let text = self.read_string()?;
                text.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| {
                        DecodeError::syntax(offset, format!("expected a double but was \"{text}\""))
                    })?
            }
            found => {
                return Err(DecodeError::UnexpectedToken {
                    expected: "a number",
                    found,
                    offset: self.pos,
                });
            }
        };
        self.value_consumed();
        Ok(value)
    }

    pub fn next_bool(&mut self) -> Result<bool, DecodeError> {
        self.expect(Token::Boolean, "a boolean")?;
        let value = if self.literal("true") {
            true
        } else if self.literal("false") {
            false
        } else {
            return Err(DecodeError::syntax(self.pos, "malformed boolean literal"));
        };
        self.value_consumed();
        Ok(value)
    }

    pub fn next_null(&mut self) -> Result<(), DecodeError> {
        self.expect(Token::Null, "NULL")?;
        if !self.literal("null") {
            return Err(DecodeError::syntax(self.pos, "malformed null literal"));
        }
        self.value_consumed();
        Ok(())
    }

    /// Succeeds only if nothing but whitespace follows the top-level value.
    pub fn end_document(&mut self) -> Result<(), DecodeError> {
        self.expect(Token::EndDocument, "END_DOCUMENT")
    }

    fn expect(&mut self, wanted: Token, expected: &'static str) -> Result<(), DecodeError> {
        let found = self.peek()?;
        if found == wanted {
            Ok(())
        } else {
            Err(DecodeError::UnexpectedToken {
                expected,
                found,
                offset: self.pos,
            })
        }
    }

    fn top(&self) -> Scope {
        self.scopes
            .last()
            .copied()
            .unwrap_or(Scope::Document { done: true })
    }

    fn set_top(&mut self, scope: Scope) {
        if let Some(top) = self.scopes.last_mut() {
            *top = scope;
        }
    }

    fn value_consumed(&mut self) {
        let next = match self.top() {
            Scope::Document { .. } => Scope::Document { done: true },
            Scope::EmptyArray | Scope::ArrayNeedsValue | Scope::ArrayAfterValue => {
                Scope::ArrayAfterValue
            }
            _ => Scope::ObjectAfterValue,
        };
        self.set_top(next);
    }

    fn finish_name(&mut self) -> Result<(), DecodeError> {
        self.skip_whitespace();
        if self.byte() != Some(b':') {
            return Err(DecodeError::syntax(self.pos, "expected ':' after member name"));
        }
        self.pos += 1;
        self.set_top(Scope::ObjectNeedsValue);
        Ok(())
    }

    fn value_token(&self) -> Result<Token, DecodeError> {
        match self.byte() {
            Some(b'{') => Ok(Token::BeginObject),
            Some(b'[') => Ok(Token::BeginArray),
            Some(b'"') => Ok(Token::String),
            Some(b't' | b'f') => Ok(Token::Boolean),
            Some(b'n') => Ok(Token::Null),
            Some(b'-' | b'0'..=b'9') => Ok(Token::Number),
            Some(_) => Err(DecodeError::syntax(self.pos, "expected a value")),
            None => Err(self.eof()),
        }
    }

    /// Walks a whole object or array through the token grammar so that a
    /// skipped value is still validated.
    fn skip_composite(&mut self) -> Result<(), DecodeError> {
        let mut depth = 0usize;
        loop {
            match self.peek()? {
                Token::BeginObject => {
                    self.begin_object()?;
                    depth += 1;
                }
                Token::BeginArray => {
                    self.begin_array()?;
                    depth += 1;
                }
                Token::EndObject => {
                    self.end_object()?;
                    depth -= 1;
                }
                Token::EndArray => {
                    self.end_array()?;
                    depth -= 1;
                }
                Token::Name => self.skip_name()?,
                Token::String | Token::Number | Token::Boolean | Token::Null => {
                    self.skip_value()?
                }
                Token::EndDocument => return Err(self.eof()),
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Reads a quoted string starting at the current position. Text without
    /// escapes is borrowed from the source.
    fn read_string(&mut self) -> Result<Cow<'a, str>, DecodeError> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut index = start + 1;
        let mut escaped = false;
        loop {
            match bytes.get(index) {
                None => return Err(DecodeError::syntax(start, "unterminated string")),
                Some(b'"') => break,
                Some(b'\\') => {
                    escaped = true;
                    index += 2;
                }
                Some(byte) if *byte < 0x20 => {
                    return Err(DecodeError::syntax(index, "control character in string"));
                }
                Some(_) => index += 1,
            }
        }
        let literal = &self.src[start..=index];
        self.pos = index + 1;
        if escaped {
            serde_json::from_str::<String>(literal)
                .map(Cow::Owned)
                .map_err(|error| DecodeError::syntax(start, error.to_string()))
        } else {
            Ok(Cow::Borrowed(&literal[1..literal.len() - 1]))
        }
    }

    fn read_number(&mut self) -> Result<(&'a str, f64), DecodeError> {
        let start = self.pos;
        let end = self.src[start..]
            .find(|c: char| !matches!(c, '0'..='9' | '-' | '+' | '.' | 'e' | 'E'))
            .map_or(self.src.len(), |len| start + len);
        let text = &self.src[start..end];
        let value = serde_json::from_str::<f64>(text)
            .map_err(|_| DecodeError::syntax(start, format!("malformed number '{text}'")))?;
        self.pos = end;
        Ok((text, value))
    }

    fn literal(&mut self, word: &str) -> bool {
        let rest = &self.src[self.pos..];
        if !rest.starts_with(word) {
            return false;
        }
        let terminated = rest[word.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric());
        if terminated {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        let trimmed = rest.trim_start_matches([' ', '\t', '\n', '\r']);
        self.pos += rest.len() - trimmed.len();
    }

    fn byte(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn eof(&self) -> DecodeError {
        DecodeError::syntax(self.pos, "unexpected end of input")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_nested_structure() {
        let mut cursor = JsonCursor::new(r#" { "a" : [1, true, null], "b": {"c": "d"} } "#);
        cursor.begin_object().unwrap();
        assert_eq!(cursor.next_name().unwrap(), "a");
        cursor.begin_array().unwrap();
        assert_eq!(cursor.next_double().unwrap(), 1.0);
        assert!(cursor.next_bool().unwrap());
        cursor.next_null().unwrap();
        assert!(!cursor.has_next().unwrap());
        cursor.end_array().unwrap();
        assert_eq!(cursor.next_name().unwrap(), "b");
        assert_eq!(cursor.next_raw().unwrap(), r#"{"c": "d"}"#);
        cursor.end_object().unwrap();
        cursor.end_document().unwrap();
    }

    #[test]
    fn select_name_leaves_unmatched_name_in_place() {
        let mut cursor = JsonCursor::new(r#"{"other":1,"status":"ok"}"#);
        cursor.begin_object().unwrap();
        assert_eq!(cursor.select_name(&["status"]).unwrap(), None);
        assert_eq!(cursor.peek().unwrap(), Token::Name);
        cursor.skip_name().unwrap();
        cursor.skip_value().unwrap();
        assert_eq!(cursor.select_name(&["message", "status"]).unwrap(), Some(1));
        assert_eq!(cursor.next_string().unwrap(), "ok");
    }

    #[test]
    fn peek_cursor_does_not_move_its_source() {
        let mut cursor = JsonCursor::new(r#"{"k":[1,2,3]}"#);
        let mut look_ahead = cursor.peek_cursor();
        look_ahead.begin_object().unwrap();
        look_ahead.skip_name().unwrap();
        look_ahead.skip_value().unwrap();
        look_ahead.end_object().unwrap();
        assert_eq!(cursor.offset(), 0);
        assert_eq!(cursor.peek().unwrap(), Token::BeginObject);
    }

    #[test]
    fn escaped_strings_are_decoded() {
        let mut cursor = JsonCursor::new(r#"["a\"bA"]"#);
        cursor.begin_array().unwrap();
        assert_eq!(cursor.next_string().unwrap(), "a\"bA");
    }

    #[test]
    fn numbers_and_strings_coerce_across_readers() {
        let mut cursor = JsonCursor::new(r#"[12.5, "3"]"#);
        cursor.begin_array().unwrap();
        assert_eq!(cursor.next_string().unwrap(), "12.5");
        assert_eq!(cursor.next_double().unwrap(), 3.0);
    }

    #[test]
    fn non_json_numbers_are_rejected() {
        for text in ["01", "1.", "-00.e5", "1e400", "+1", "-", ".5", "1e"] {
            let mut cursor = JsonCursor::new(text);
            let error = cursor.next_double().unwrap_err();
            assert!(
                matches!(error, DecodeError::Syntax { .. }),
                "{text} gave {error}"
            );
        }
    }

    #[test]
    fn skipped_numbers_are_validated() {
        let mut cursor = JsonCursor::new(r#"{"a":1,"extra":-00.e5}"#);
        cursor.begin_object().unwrap();
        cursor.skip_name().unwrap();
        cursor.skip_value().unwrap();
        cursor.skip_name().unwrap();
        assert!(cursor.skip_value().is_err());
    }

    #[test]
    fn valid_numbers_parse() {
        let mut cursor = JsonCursor::new("[0, -0.5, 1E3, 2.5e-1, 10]");
        cursor.begin_array().unwrap();
        for expected in [0.0, -0.5, 1000.0, 0.25, 10.0] {
            assert_eq!(cursor.next_double().unwrap(), expected);
        }
        cursor.end_array().unwrap();
    }

    #[test]
    fn numeric_strings_must_be_finite() {
        let mut cursor = JsonCursor::new(r#"["1e400", "NaN"]"#);
        cursor.begin_array().unwrap();
        assert!(cursor.next_double().is_err());
    }

    #[test]
    fn trailing_comma_is_rejected() {
        let mut cursor = JsonCursor::new(r#"{"a":1,}"#);
        cursor.begin_object().unwrap();
        cursor.skip_name().unwrap();
        cursor.skip_value().unwrap();
        assert!(matches!(cursor.peek(), Err(DecodeError::Syntax { .. })));
    }

    #[test]
    fn skipping_malformed_nested_value_fails() {
        let mut cursor = JsonCursor::new(r#"{"a":{"b":}}"#);
        cursor.begin_object().unwrap();
        cursor.skip_name().unwrap();
        assert!(cursor.skip_value().is_err());
    }

    #[test]
    fn truncated_input_reports_end_of_input() {
        let mut cursor = JsonCursor::new(r#"{"a":"#);
        cursor.begin_object().unwrap();
        cursor.skip_name().unwrap();
        let error = cursor.skip_value().unwrap_err();
        assert!(error.to_string().contains("unexpected end of input"));
    }

    #[test]
    fn trailing_data_after_document_is_detected() {
        let mut cursor = JsonCursor::new("{} x");
        cursor.begin_object().unwrap();
        cursor.end_object().unwrap();
        assert!(cursor.end_document().is_err());
    }

    #[test]
    fn wrong_structural_token_names_both_sides() {
        let mut cursor = JsonCursor::new("[1]");
        let error = cursor.begin_object().unwrap_err();
        assert_eq!(
            error.to_string(),
            "expected BEGIN_OBJECT but was BEGIN_ARRAY at offset 0"
        );
    }
}
