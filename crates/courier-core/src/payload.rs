//! Decoding a single payload value by its structural token.
//!
//! Objects, arrays, strings and booleans are handed to the target type's
//! serde decoder as raw text. Numbers are read as `f64` and narrowed through
//! [`NarrowingDeserializer`] so that `99` and `99.0` both land in an `i32`.

use serde::de::DeserializeOwned;

use crate::cursor::{JsonCursor, Token};
use crate::error::DecodeError;
use crate::numeric::NarrowingDeserializer;

/// Decodes the value at the cursor as `T`; JSON `null` yields `None`.
pub(crate) fn decode_value<T: DeserializeOwned>(
    cursor: &mut JsonCursor<'_>,
    field: &'static str,
) -> Result<Option<T>, DecodeError> {
    match cursor.peek()? {
        Token::Null => {
            cursor.next_null()?;
            Ok(None)
        }
        Token::Number => {
            let value = cursor.next_double()?;
            <T as serde::Deserialize>::deserialize(NarrowingDeserializer::new(value))
                .map(Some)
                .map_err(|source| DecodeError::payload(field, source))
        }
        Token::BeginObject | Token::BeginArray | Token::String | Token::Boolean => {
            let raw = cursor.next_raw()?;
            serde_json::from_str(raw)
                .map(Some)
                .map_err(|source| DecodeError::payload(field, source))
        }
        found => Err(DecodeError::UnexpectedToken {
            expected: "a value",
            found,
            offset: cursor.offset(),
        }),
    }
}
