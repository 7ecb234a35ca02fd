//! How a call site wants the success payload.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::cursor::JsonCursor;
use crate::error::DecodeError;
use crate::payload::decode_value;

pub(crate) const DATA: &str = "data";

/// Strategy for turning the `data` member (or its absence) into a result.
pub trait DecodeMode {
    type Output;

    /// Consumes the `data` value at the cursor.
    fn decode(&self, cursor: &mut JsonCursor<'_>) -> Result<Self::Output, DecodeError>;

    /// Result when the envelope has no `data` member.
    fn absent(&self) -> Result<Self::Output, DecodeError>;
}

/// `data` must be present and non-null.
pub struct Required<T>(PhantomData<fn() -> T>);

/// `data` may be missing or `null`; the result is an `Option`.
pub struct Optional<T>(PhantomData<fn() -> T>);

/// `data` is consumed and discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ignored;

impl<T> Required<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Optional<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: DeserializeOwned> DecodeMode for Required<T> {
    type Output = T;

    fn decode(&self, cursor: &mut JsonCursor<'_>) -> Result<T, DecodeError> {
        decode_value(cursor, DATA)?.ok_or(DecodeError::NullPayload { field: DATA })
    }

    fn absent(&self) -> Result<T, DecodeError> {
        Err(DecodeError::NullPayload { field: DATA })
    }
}

impl<T: DeserializeOwned> DecodeMode for Optional<T> {
    type Output = Option<T>;

    fn decode(&self, cursor: &mut JsonCursor<'_>) -> Result<Option<T>, DecodeError> {
        decode_value(cursor, DATA)
    }

    fn absent(&self) -> Result<Option<T>, DecodeError> {
        Ok(None)
    }
}

impl DecodeMode for Ignored {
    type Output = ();

    fn decode(&self, cursor: &mut JsonCursor<'_>) -> Result<(), DecodeError> {
        cursor.skip_value()
    }

    fn absent(&self) -> Result<(), DecodeError> {
        Ok(())
    }
}

macro_rules! marker_impls {
    ($($mode:ident),*) => {
        $(
            impl<T> Default for $mode<T> {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl<T> Clone for $mode<T> {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl<T> Copy for $mode<T> {}

            impl<T> fmt::Debug for $mode<T> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}<{}>", stringify!($mode), std::any::type_name::<T>())
                }
            }
        )*
    };
}

marker_impls!(Required, Optional);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_null_and_absence() {
        let mode = Required::<i32>::new();
        assert!(matches!(
            mode.decode(&mut JsonCursor::new("null")),
            Err(DecodeError::NullPayload { field: "data" })
        ));
        assert!(mode.absent().is_err());
        assert_eq!(mode.decode(&mut JsonCursor::new("5")).unwrap(), 5);
    }

    #[test]
    fn optional_tolerates_null_and_absence() {
        let mode = Optional::<String>::new();
        assert_eq!(mode.decode(&mut JsonCursor::new("null")).unwrap(), None);
        assert_eq!(mode.absent().unwrap(), None);
    }

    #[test]
    fn ignored_skips_any_value() {
        let mut cursor = JsonCursor::new(r#"{"deep":[{"x":1}]}"#);
        Ignored.decode(&mut cursor).unwrap();
        cursor.end_document().unwrap();
    }
}
