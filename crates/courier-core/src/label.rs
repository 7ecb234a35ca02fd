//! Discriminator label values.
//!
//! Integer, boolean, string and double labels are four instantiations of the
//! same mechanism: each kind knows which token it expects and how to read it.

use std::fmt;

use serde_json::Value;

use crate::cursor::{JsonCursor, Token};
use crate::error::DecodeError;
use crate::numeric::Narrow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Integer,
    Boolean,
    String,
    Double,
}

impl LabelKind {
    /// Token a label of this kind must appear as.
    pub fn token(self) -> Token {
        match self {
            Self::Integer | Self::Double => Token::Number,
            Self::Boolean => Token::Boolean,
            Self::String => Token::String,
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Double => "double",
        };
        f.write_str(name)
    }
}

/// A scalar type usable as a discriminator value.
pub trait Label: Clone + PartialEq + fmt::Display + Send + Sync + 'static {
    const KIND: LabelKind;

    /// Reads the label from a cursor already positioned on a token of
    /// [`Self::KIND`].
    fn read(cursor: &mut JsonCursor<'_>) -> Result<Self, DecodeError>;

    fn to_value(&self) -> Value;
}

impl Label for i64 {
    const KIND: LabelKind = LabelKind::Integer;

    fn read(cursor: &mut JsonCursor<'_>) -> Result<Self, DecodeError> {
        cursor.next_double().map(i64::narrow)
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl Label for bool {
    const KIND: LabelKind = LabelKind::Boolean;

    fn read(cursor: &mut JsonCursor<'_>) -> Result<Self, DecodeError> {
        cursor.next_bool()
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Label for String {
    const KIND: LabelKind = LabelKind::String;

    fn read(cursor: &mut JsonCursor<'_>) -> Result<Self, DecodeError> {
        cursor.next_string().map(|label| label.into_owned())
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Label for f64 {
    const KIND: LabelKind = LabelKind::Double;

    fn read(cursor: &mut JsonCursor<'_>) -> Result<Self, DecodeError> {
        cursor.next_double()
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

/// Looks up `key` in the object at the cursor and reads its value as `L`.
/// Meant to run on a look-ahead cursor; the key may appear at any position.
pub(crate) fn peek_label<L: Label>(
    mut cursor: JsonCursor<'_>,
    key: &str,
) -> Result<L, DecodeError> {
    cursor.begin_object()?;
    while cursor.has_next()? {
        if cursor.select_name(&[key])?.is_none() {
            cursor.skip_name()?;
            cursor.skip_value()?;
            continue;
        }
        return match cursor.peek()? {
            Token::Null => Err(DecodeError::NullLabel { key: key.to_owned() }),
            found if found != L::KIND.token() => Err(DecodeError::LabelType {
                key: key.to_owned(),
                expected: L::KIND,
                found,
            }),
            _ => L::read(&mut cursor),
        };
    }
    Err(DecodeError::MissingLabel { key: key.to_owned() })
}
