//! Error payload descriptors.
//!
//! A call site declares how the `errors` member of a failure envelope should
//! be read: as a primitive, as one record, or as an array of records. Typed
//! call sites build an [`ErrorDescriptor`] directly. Call sites configured at
//! runtime (from a file or the command line) describe the payload with
//! [`ErrorAnnotation`]s, which [`resolve_annotations`] turns into a
//! descriptor producing a [`serde_json::Value`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cursor::{JsonCursor, Token};
use crate::error::{ConfigError, DecodeError};
use crate::numeric::Narrow;
use crate::payload::decode_value;

pub(crate) const ERRORS: &str = "errors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorShape {
    Primitive,
    Object,
    Array,
}

impl ErrorShape {
    fn accepts(self, token: Token) -> bool {
        match self {
            Self::Primitive => matches!(token, Token::String | Token::Number | Token::Boolean),
            Self::Object => token == Token::BeginObject,
            Self::Array => token == Token::BeginArray,
        }
    }
}

impl fmt::Display for ErrorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primitive => "a primitive",
            Self::Object => "an object",
            Self::Array => "an array",
        };
        f.write_str(name)
    }
}

type DecodeFn<E> = dyn Fn(&mut JsonCursor<'_>) -> Result<Option<E>, DecodeError> + Send + Sync;

/// How to interpret the `errors` payload of a failure envelope.
pub struct ErrorDescriptor<E> {
    shape: ErrorShape,
    decode: Arc<DecodeFn<E>>,
}

impl<E> ErrorDescriptor<E> {
    pub fn shape(&self) -> ErrorShape {
        self.shape
    }

    /// Decodes the value at the cursor. `null` yields `None`; any other token
    /// must match the declared shape.
    pub(crate) fn decode(&self, cursor: &mut JsonCursor<'_>) -> Result<Option<E>, DecodeError> {
        let token = cursor.peek()?;
        if token != Token::Null && !self.shape.accepts(token) {
            return Err(DecodeError::Shape {
                field: ERRORS,
                expected: self.shape,
                found: token,
            });
        }
        (self.decode)(cursor)
    }

    fn with_decoder(
        shape: ErrorShape,
        decode: impl Fn(&mut JsonCursor<'_>) -> Result<Option<E>, DecodeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            shape,
            decode: Arc::new(decode),
        }
    }
}

impl<E: DeserializeOwned + 'static> ErrorDescriptor<E> {
    /// `errors` is a string, number or boolean.
    pub fn primitive() -> Self {
        Self::with_decoder(ErrorShape::Primitive, |cursor| decode_value(cursor, ERRORS))
    }

    /// `errors` is one JSON object.
    pub fn object() -> Self {
        Self::with_decoder(ErrorShape::Object, |cursor| decode_value(cursor, ERRORS))
    }
}

impl<E: DeserializeOwned + 'static> ErrorDescriptor<Vec<E>> {
    /// `errors` is a JSON array of `E`.
    pub fn array() -> Self {
        Self::with_decoder(ErrorShape::Array, |cursor| decode_value(cursor, ERRORS))
    }
}

impl<E> Clone for ErrorDescriptor<E> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape,
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<E> fmt::Debug for ErrorDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDescriptor")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    String,
    Boolean,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    fn read(self, cursor: &mut JsonCursor<'_>) -> Result<Value, DecodeError> {
        let value = match self {
            Self::String => Value::String(cursor.next_string()?.into_owned()),
            Self::Boolean => Value::Bool(cursor.next_bool()?),
            Self::Short => Value::from(i16::narrow(cursor.next_double()?)),
            Self::Int => Value::from(i32::narrow(cursor.next_double()?)),
            Self::Long => Value::from(i64::narrow(cursor.next_double()?)),
            Self::Float => Value::from(f32::narrow(cursor.next_double()?)),
            Self::Double => Value::from(cursor.next_double()?),
        };
        Ok(value)
    }
}

impl FromStr for PrimitiveKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "boolean" | "bool" => Ok(Self::Boolean),
            "short" => Ok(Self::Short),
            "int" => Ok(Self::Int),
            "long" => Ok(Self::Long),
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            other => Err(ConfigError::UnknownAnnotation(format!("primitive:{other}"))),
        }
    }
}

/// A runtime error-shape declaration attached to a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorAnnotation {
    Primitive(PrimitiveKind),
    Object,
    Array,
}

impl ErrorAnnotation {
    pub fn descriptor(self) -> ErrorDescriptor<Value> {
        match self {
            Self::Primitive(kind) => {
                ErrorDescriptor::with_decoder(ErrorShape::Primitive, move |cursor| {
                    kind.read(cursor).map(Some)
                })
            }
            Self::Object => ErrorDescriptor::object(),
            Self::Array => ErrorDescriptor::with_decoder(ErrorShape::Array, |cursor| {
                decode_value(cursor, ERRORS)
            }),
        }
    }
}

/// Parses `primitive:<kind>`, `object` or `array`.
impl FromStr for ErrorAnnotation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("primitive", kind)) => kind.parse().map(Self::Primitive),
            None if s == "object" => Ok(Self::Object),
            None if s == "array" => Ok(Self::Array),
            _ => Err(ConfigError::UnknownAnnotation(s.to_owned())),
        }
    }
}

/// Resolves the annotations attached to one call site into at most one
/// descriptor. Attaching more than one is rejected here, before any decode.
pub fn resolve_annotations(
    annotations: &[ErrorAnnotation],
) -> Result<Option<ErrorDescriptor<Value>>, ConfigError> {
    match annotations {
        [] => Ok(None),
        [annotation] => Ok(Some(annotation.descriptor())),
        _ => Err(ConfigError::MultipleErrorDescriptors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(descriptor: &ErrorDescriptor<Value>, json: &str) -> Result<Option<Value>, DecodeError> {
        descriptor.decode(&mut JsonCursor::new(json))
    }

    #[test]
    fn annotations_parse_from_text() {
        assert_eq!(
            "primitive:int".parse::<ErrorAnnotation>().unwrap(),
            ErrorAnnotation::Primitive(PrimitiveKind::Int)
        );
        assert_eq!("array".parse::<ErrorAnnotation>().unwrap(), ErrorAnnotation::Array);
        assert!("primitive:char".parse::<ErrorAnnotation>().is_err());
        assert!("list".parse::<ErrorAnnotation>().is_err());
    }

    #[test]
    fn more_than_one_annotation_is_rejected() {
        let annotations = [ErrorAnnotation::Object, ErrorAnnotation::Array];
        assert_eq!(
            resolve_annotations(&annotations).unwrap_err(),
            ConfigError::MultipleErrorDescriptors
        );
        assert!(resolve_annotations(&[]).unwrap().is_none());
    }

    #[test]
    fn primitive_kinds_narrow_numbers() {
        let int = ErrorAnnotation::Primitive(PrimitiveKind::Int).descriptor();
        assert_eq!(decode(&int, "12.7").unwrap(), Some(json!(12)));
        let text = ErrorAnnotation::Primitive(PrimitiveKind::String).descriptor();
        assert_eq!(decode(&text, r#""errorMsg1""#).unwrap(), Some(json!("errorMsg1")));
    }

    #[test]
    fn shape_mismatch_is_a_decode_error() {
        let object = ErrorAnnotation::Object.descriptor();
        let error = decode(&object, "[1]").unwrap_err();
        assert_eq!(error.to_string(), "'errors' expected an object but was BEGIN_ARRAY");
        assert_eq!(decode(&object, "null").unwrap(), None);
    }

    #[test]
    fn typed_array_descriptor_decodes_elements() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Msg {
            msg: String,
        }

        let descriptor = ErrorDescriptor::<Vec<Msg>>::array();
        let decoded = descriptor
            .decode(&mut JsonCursor::new(r#"[{"msg":"e1"},{"msg":"e2"}]"#))
            .unwrap();
        assert_eq!(
            decoded,
            Some(vec![Msg { msg: "e1".into() }, Msg { msg: "e2".into() }])
        );
    }
}
