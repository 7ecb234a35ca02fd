//! Label-keyed polymorphic decoding.
//!
//! A closed set of record types is modelled as an enum whose variants each
//! wrap one record. A [`PolymorphicRegistry`] maps discriminator labels to
//! those records: decoding peeks the label with a look-ahead cursor, then
//! hands the whole object (discriminator included) to the matching record's
//! decoder. Encoding finds the variant carried by the value and writes the
//! record's fields plus its label.
//!
//! ```
//! use courier_core::{PolymorphicRegistry, subtypes};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Circle { kind: String, radius: f64 }
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Square { kind: String, side: f64 }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Shape { Circle(Circle), Square(Square) }
//!
//! subtypes!(Shape { Circle(Circle), Square(Square) });
//!
//! let registry = PolymorphicRegistry::<Shape, String>::builder("kind")
//!     .with_subtype::<Circle>("circle")
//!     .with_subtype::<Square>("square")
//!     .build()
//!     .unwrap();
//!
//! let shape = registry.decode(r#"{"side":2.0,"kind":"square"}"#).unwrap();
//! assert_eq!(shape, Some(Shape::Square(Square { kind: "square".into(), side: 2.0 })));
//! ```

use std::any::{TypeId, type_name};
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cursor::{JsonCursor, Token};
use crate::error::{ConfigError, DecodeError, EncodeError};
use crate::label::{Label, peek_label};

/// A record type that is one member of the closed variant set `T`.
///
/// Usually implemented through [`subtypes!`](crate::subtypes).
pub trait Subtype<T>: Serialize + DeserializeOwned + Into<T> + 'static {
    /// The record inside `base`, if `base` is this variant.
    fn from_base(base: &T) -> Option<&Self>;
}

/// Implements `From<Record> for Base` and [`Subtype<Base>`] for each
/// `Variant(Record)` of an enum.
#[macro_export]
macro_rules! subtypes {
    ($base:ident { $($variant:ident($subtype:ty)),+ $(,)? }) => {
        $(
            impl ::core::convert::From<$subtype> for $base {
                fn from(value: $subtype) -> Self {
                    $base::$variant(value)
                }
            }

            impl $crate::Subtype<$base> for $subtype {
                #[allow(unreachable_patterns)]
                fn from_base(base: &$base) -> ::core::option::Option<&Self> {
                    match base {
                        $base::$variant(value) => ::core::option::Option::Some(value),
                        _ => ::core::option::Option::None,
                    }
                }
            }
        )+
    };
}

/// What to do when a decoded label has no registered subtype.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackPolicy<T> {
    /// Fail with [`DecodeError::UnmatchedLabel`].
    NoFallback,
    /// Return this value.
    DefaultValue(T),
    /// Return `None`.
    NullFallback,
}

struct Entry<T, L> {
    label: L,
    subtype: TypeId,
    name: &'static str,
    decode: fn(&str) -> serde_json::Result<T>,
    encode: fn(&T) -> Option<serde_json::Result<Value>>,
}

fn decode_subtype<T, S: Subtype<T>>(raw: &str) -> serde_json::Result<T> {
    serde_json::from_str::<S>(raw).map(Into::into)
}

fn encode_subtype<T, S: Subtype<T>>(value: &T) -> Option<serde_json::Result<Value>> {
    S::from_base(value).map(serde_json::to_value)
}

pub struct RegistryBuilder<T, L> {
    key: String,
    entries: Vec<Entry<T, L>>,
    fallback: Option<FallbackPolicy<T>>,
    fallback_set_twice: bool,
    serialize_nulls: bool,
}

impl<T: 'static, L: Label> RegistryBuilder<T, L> {
    fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: Vec::new(),
            fallback: None,
            fallback_set_twice: false,
            serialize_nulls: false,
        }
    }

    /// Registers `S` under `label`.
    pub fn with_subtype<S: Subtype<T>>(mut self, label: impl Into<L>) -> Self {
        self.entries.push(Entry {
            label: label.into(),
            subtype: TypeId::of::<S>(),
            name: short_type_name::<S>(),
            decode: decode_subtype::<T, S>,
            encode: encode_subtype::<T, S>,
        });
        self
    }

    /// Unmatched labels decode to `value`, or to `None` when `value` is `None`.
    pub fn with_default(self, value: Option<T>) -> Self {
        let policy = match value {
            Some(value) => FallbackPolicy::DefaultValue(value),
            None => FallbackPolicy::NullFallback,
        };
        self.with_fallback(policy)
    }

    pub fn with_fallback(mut self, policy: FallbackPolicy<T>) -> Self {
        if self.fallback.is_some() {
            self.fallback_set_twice = true;
        }
        self.fallback = Some(policy);
        self
    }

    /// Keep `null` object members, at any depth, when encoding. Off by default.
    pub fn serialize_nulls(mut self, enabled: bool) -> Self {
        self.serialize_nulls = enabled;
        self
    }

    pub fn build(self) -> Result<PolymorphicRegistry<T, L>, ConfigError> {
        if self.key.is_empty() {
            return Err(ConfigError::EmptyDiscriminatorKey);
        }
        if self.fallback_set_twice {
            return Err(ConfigError::FallbackAlreadySet);
        }
        for (index, entry) in self.entries.iter().enumerate() {
            let earlier = &self.entries[..index];
            if earlier.iter().any(|other| other.label == entry.label) {
                return Err(ConfigError::DuplicateLabel {
                    label: entry.label.to_string(),
                });
            }
            if earlier.iter().any(|other| other.subtype == entry.subtype) {
                return Err(ConfigError::DuplicateSubtype {
                    subtype: entry.name,
                });
            }
        }

        tracing::debug!(
            key = %self.key,
            kind = %L::KIND,
            subtypes = self.entries.len(),
            "built polymorphic registry"
        );
        Ok(PolymorphicRegistry {
            key: self.key,
            entries: self.entries,
            fallback: self.fallback.unwrap_or(FallbackPolicy::NoFallback),
            serialize_nulls: self.serialize_nulls,
        })
    }
}

/// Immutable label/subtype mapping for one base type. Safe to share across
/// threads once built.
pub struct PolymorphicRegistry<T, L> {
    key: String,
    entries: Vec<Entry<T, L>>,
    fallback: FallbackPolicy<T>,
    serialize_nulls: bool,
}

impl<T: 'static, L: Label> PolymorphicRegistry<T, L> {
    pub fn builder(key: impl Into<String>) -> RegistryBuilder<T, L> {
        RegistryBuilder::new(key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn fallback(&self) -> &FallbackPolicy<T> {
        &self.fallback
    }

    pub fn labels(&self) -> impl Iterator<Item = &L> {
        self.entries.iter().map(|entry| &entry.label)
    }

    /// Decodes one document holding a single object (or `null`).
    pub fn decode(&self, input: &str) -> Result<Option<T>, DecodeError>
    where
        T: Clone,
    {
        let mut cursor = JsonCursor::new(input);
        let value = self.decode_from(&mut cursor)?;
        cursor.end_document()?;
        Ok(value)
    }

    /// Decodes the object at the cursor. When the label is unmatched and no
    /// fallback is configured the cursor is left where it was.
    pub fn decode_from(&self, cursor: &mut JsonCursor<'_>) -> Result<Option<T>, DecodeError>
    where
        T: Clone,
    {
        if cursor.peek()? == Token::Null {
            cursor.next_null()?;
            return Ok(None);
        }

        let label: L = peek_label(cursor.peek_cursor(), &self.key)?;
        if let Some(entry) = self.entries.iter().find(|entry| entry.label == label) {
            let raw = cursor.next_raw()?;
            return (entry.decode)(raw)
                .map(Some)
                .map_err(|source| DecodeError::payload(entry.name, source));
        }

        match &self.fallback {
            FallbackPolicy::NoFallback => Err(DecodeError::UnmatchedLabel {
                key: self.key.clone(),
                found: label.to_string(),
                expected: self.labels().map(ToString::to_string).collect(),
            }),
            FallbackPolicy::DefaultValue(value) => {
                tracing::debug!(key = %self.key, %label, "unmatched label, using default value");
                cursor.skip_value()?;
                Ok(Some(value.clone()))
            }
            FallbackPolicy::NullFallback => {
                tracing::debug!(key = %self.key, %label, "unmatched label, using null");
                cursor.skip_value()?;
                Ok(None)
            }
        }
    }

    /// Encodes `value` as the JSON object of its variant's record. The
    /// discriminator is added when the record does not carry it itself.
    pub fn encode(&self, value: &T) -> Result<Value, EncodeError> {
        for entry in &self.entries {
            let Some(encoded) = (entry.encode)(value) else {
                continue;
            };
            let mut encoded = encoded?;
            let Value::Object(members) = &mut encoded else {
                return Err(EncodeError::NotAnObject {
                    subtype: entry.name,
                });
            };

            let expected = entry.label.to_value();
            match members.get(&self.key) {
                None => {
                    members.insert(self.key.clone(), expected);
                }
                Some(found) if *found != expected => {
                    return Err(EncodeError::LabelMismatch {
                        subtype: entry.name,
                        key: self.key.clone(),
                        expected,
                        found: found.clone(),
                    });
                }
                Some(_) => {}
            }
            if !self.serialize_nulls {
                drop_null_members(&mut encoded);
            }
            return Ok(encoded);
        }

        Err(EncodeError::UnregisteredSubtype {
            base: type_name::<T>(),
            expected: self.entries.iter().map(|entry| entry.name).collect(),
        })
    }

    pub fn encode_to_string(&self, value: &T) -> Result<String, EncodeError> {
        let encoded = self.encode(value)?;
        Ok(serde_json::to_string(&encoded)?)
    }
}

impl<T, L: fmt::Debug> fmt::Debug for PolymorphicRegistry<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subtypes: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (&entry.label, entry.name))
            .collect();
        f.debug_struct("PolymorphicRegistry")
            .field("key", &self.key)
            .field("subtypes", &subtypes)
            .finish_non_exhaustive()
    }
}

/// Removes `null` object members at every depth. Array elements are kept.
fn drop_null_members(value: &mut Value) {
    match value {
        Value::Object(members) => {
            members.retain(|_, member| !member.is_null());
            members.values_mut().for_each(drop_null_members);
        }
        Value::Array(items) => items.iter_mut().for_each(drop_null_members),
        _ => {}
    }
}

fn short_type_name<S>() -> &'static str {
    let full = type_name::<S>();
    full.rsplit("::").next().unwrap_or(full)
}
