//! Numeric narrowing.
//!
//! Number tokens are read as `f64` and then narrowed to the width the target
//! type asks for. One rule applies to every integer width: truncate toward
//! zero, saturate at the bounds, NaN becomes zero. `f32` rounds to nearest.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, forward_to_deserialize_any};

/// Explicit conversion from a JSON number read as `f64`.
pub trait Narrow: Copy {
    fn narrow(value: f64) -> Self;
}

macro_rules! impl_narrow {
    ($($ty:ty),*) => {
        $(
            impl Narrow for $ty {
                fn narrow(value: f64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_narrow!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Presents one `f64` to a serde visitor, narrowed to whatever width the
/// visitor's type requests.
#[derive(Debug, Clone, Copy)]
pub struct NarrowingDeserializer {
    value: f64,
}

impl NarrowingDeserializer {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

macro_rules! narrow_to {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                visitor.$visit(<$ty>::narrow(self.value))
            }
        )*
    };
}

impl<'de> Deserializer<'de> for NarrowingDeserializer {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_f64(self.value)
    }

    narrow_to! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i128 u128 f64 char str string bytes byte_buf unit unit_struct seq
        tuple tuple_struct map struct enum identifier ignored_any
    }
}

/// `deserialize_with` helper for record fields that may arrive either as a
/// JSON number or as a string holding one, e.g. `"data":"1"` into an `i32`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Narrow,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(value) => value,
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("expected a number but was \"{text}\"")))?,
    };
    Ok(T::narrow(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_truncate_toward_zero() {
        assert_eq!(i32::narrow(99.9), 99);
        assert_eq!(i32::narrow(-2.7), -2);
        assert_eq!(i16::narrow(2.5), 2);
        assert_eq!(i64::narrow(1e3), 1000);
    }

    #[test]
    fn integer_widths_saturate() {
        assert_eq!(i16::narrow(1e9), i16::MAX);
        assert_eq!(u8::narrow(-4.0), 0);
        assert_eq!(i32::narrow(f64::NAN), 0);
    }

    #[test]
    fn deserializer_narrows_to_requested_width() {
        let short = i16::deserialize(NarrowingDeserializer::new(12.9)).unwrap();
        assert_eq!(short, 12);
        let float = f32::deserialize(NarrowingDeserializer::new(0.5)).unwrap();
        assert_eq!(float, 0.5);
        let double = f64::deserialize(NarrowingDeserializer::new(0.1)).unwrap();
        assert_eq!(double, 0.1);
        let maybe = Option::<i64>::deserialize(NarrowingDeserializer::new(7.0)).unwrap();
        assert_eq!(maybe, Some(7));
    }

    #[test]
    fn deserializer_rejects_non_numeric_targets() {
        assert!(String::deserialize(NarrowingDeserializer::new(1.0)).is_err());
        assert!(bool::deserialize(NarrowingDeserializer::new(1.0)).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(deserialize_with = "lenient")]
        count: i32,
    }

    #[test]
    fn lenient_accepts_numbers_and_numeric_strings() {
        let from_text: Record = serde_json::from_str(r#"{"count":"42"}"#).unwrap();
        assert_eq!(from_text.count, 42);
        let from_number: Record = serde_json::from_str(r#"{"count":7.8}"#).unwrap();
        assert_eq!(from_number.count, 7);
        assert!(serde_json::from_str::<Record>(r#"{"count":"many"}"#).is_err());
    }
}
