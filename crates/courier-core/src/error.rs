//! Error taxonomy.
//!
//! Three families: [`DecodeError`] for malformed or incomplete input,
//! [`ConfigError`] for setup mistakes caught before anything is decoded, and
//! [`EncodeError`] for values the polymorphic registry cannot serialize.
//! A well-formed envelope that reports a failure status is not an error of
//! this crate; it surfaces as [`ServerFailure`] inside [`ResponseError`].

use std::error::Error as StdError;
use std::fmt;

use crate::annotation::ErrorShape;
use crate::cursor::Token;
use crate::label::LabelKind;

/// Input could not be decoded into the requested shape.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("expected {expected} but was {found} at offset {offset}")]
    UnexpectedToken {
        expected: &'static str,
        found: Token,
        offset: usize,
    },

    #[error("Non-null value '{field}' was null or missing")]
    MissingField { field: &'static str },

    #[error("'{field}' is not optional but found null value")]
    NullPayload { field: &'static str },

    #[error("failed to decode '{field}'")]
    Payload {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{field}' expected {expected} but was {found}")]
    Shape {
        field: &'static str,
        expected: ErrorShape,
        found: Token,
    },

    #[error("Missing label for {key}")]
    MissingLabel { key: String },

    #[error("label key '{key}' value is null")]
    NullLabel { key: String },

    #[error("Expected label's type is '{expected}' but found '{found}'")]
    LabelType {
        key: String,
        expected: LabelKind,
        found: Token,
    },

    #[error(
        "Expected one of [{}] for key '{key}' but found '{found}'. Register a subtype for this label.",
        .expected.join(", ")
    )]
    UnmatchedLabel {
        key: String,
        found: String,
        expected: Vec<String>,
    },

    #[error("input is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("failed to read input")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn payload(field: &'static str, source: serde_json::Error) -> Self {
        Self::Payload { field, source }
    }
}

/// A call site or registry was configured inconsistently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Can only set a single error descriptor: 'primitive', 'object' or 'array'")]
    MultipleErrorDescriptors,

    #[error("discriminator key must not be empty")]
    EmptyDiscriminatorKey,

    #[error("Labels must be unique: '{label}' is registered more than once")]
    DuplicateLabel { label: String },

    #[error("subtype {subtype} is registered more than once")]
    DuplicateSubtype { subtype: &'static str },

    #[error("a fallback is already configured")]
    FallbackAlreadySet,

    #[error("unknown error annotation '{0}'")]
    UnknownAnnotation(String),
}

/// A value could not be encoded through the polymorphic registry.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Expected one of [{}] but found a value of {base}. Register this subtype.", .expected.join(", "))]
    UnregisteredSubtype {
        base: &'static str,
        expected: Vec<&'static str>,
    },

    #[error("subtype {subtype} did not serialize to a JSON object")]
    NotAnObject { subtype: &'static str },

    #[error("subtype {subtype} carries '{key}' = {found} but is registered as {expected}")]
    LabelMismatch {
        subtype: &'static str,
        key: String,
        expected: serde_json::Value,
        found: serde_json::Value,
    },

    #[error("failed to serialize subtype")]
    Serialize(#[from] serde_json::Error),
}

/// A well-formed envelope whose status is not the success code.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerFailure<E> {
    status: String,
    message: String,
    error_data: Option<E>,
}

impl<E> ServerFailure<E> {
    pub fn new(status: impl Into<String>, message: impl Into<String>, error_data: Option<E>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
            error_data,
        }
    }

    /// The status code exactly as the server sent it.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The decoded `errors` payload, absent when the server sent none, sent
    /// `null`, or the call site declared no error descriptor.
    pub fn error_data(&self) -> Option<&E> {
        self.error_data.as_ref()
    }

    pub fn into_error_data(self) -> Option<E> {
        self.error_data
    }
}

impl<E> fmt::Display for ServerFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server failure {}: {}", self.status, self.message)
    }
}

impl<E: fmt::Debug> StdError for ServerFailure<E> {}

/// Outcome of decoding an envelope that did not yield the success payload.
#[derive(Debug)]
pub enum ResponseError<E> {
    Decode(DecodeError),
    Server(ServerFailure<E>),
}

impl<E> ResponseError<E> {
    pub fn as_server_failure(&self) -> Option<&ServerFailure<E>> {
        match self {
            Self::Server(failure) => Some(failure),
            Self::Decode(_) => None,
        }
    }

    pub fn as_decode_error(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode(error) => Some(error),
            Self::Server(_) => None,
        }
    }
}

impl<E> From<DecodeError> for ResponseError<E> {
    fn from(error: DecodeError) -> Self {
        Self::Decode(error)
    }
}

impl<E> fmt::Display for ResponseError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(error) => error.fmt(f),
            Self::Server(failure) => failure.fmt(f),
        }
    }
}

impl<E: fmt::Debug + 'static> StdError for ResponseError<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Decode(error) => Some(error),
            Self::Server(failure) => Some(failure),
        }
    }
}
