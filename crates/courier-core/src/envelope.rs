//! Response envelope decoding.
//!
//! Wire shape:
//!
//! ```text
//! { "status": "<code>", "message": "<text>", "data": <any> }    success
//! { "status": "<code>", "message": "<text>", "errors": <any> }  failure
//! ```
//!
//! Keys may come in any order, so the branch cannot be chosen from the first
//! key. A look-ahead cursor first captures `status` and `message` while
//! skipping everything else; the primary cursor then walks the object once
//! and decodes only the payload member the branch needs.

use std::io::Read;

use crate::annotation::{ERRORS, ErrorDescriptor};
use crate::config::DecoderConfig;
use crate::cursor::{JsonCursor, Token};
use crate::error::{ConfigError, DecodeError, ResponseError, ServerFailure};
use crate::mode::{DATA, DecodeMode};

const STATUS: &str = "status";
const MESSAGE: &str = "message";
const NAMES: [&str; 4] = [STATUS, DATA, ERRORS, MESSAGE];

struct Head {
    status: String,
    message: String,
}

/// Decodes one envelope.
///
/// Returns the success payload shaped by `mode`, a [`ServerFailure`] carrying
/// the `errors` payload shaped by `errors` when the status is not the success
/// code, or a [`DecodeError`].
pub fn decode_envelope<M, E>(
    input: &str,
    mode: &M,
    errors: Option<&ErrorDescriptor<E>>,
    config: &DecoderConfig,
) -> Result<M::Output, ResponseError<E>>
where
    M: DecodeMode,
{
    let mut cursor = JsonCursor::new(config.strip_bom(input));
    let head = scan_head(cursor.peek_cursor())?;

    if config.is_success(&head.status) {
        tracing::trace!(status = %head.status, "envelope reports success");
        let output = decode_data(&mut cursor, mode)?;
        if config.require_end_of_document {
            cursor.end_document()?;
        }
        Ok(output)
    } else {
        tracing::debug!(
            status = %head.status,
            message = %head.message,
            "envelope reports failure"
        );
        let error_data = match errors {
            Some(descriptor) => decode_errors(&mut cursor, descriptor)?,
            None => None,
        };
        Err(ResponseError::Server(ServerFailure::new(
            head.status,
            head.message,
            error_data,
        )))
    }
}

/// Captures `status` and `message` without materializing any other member.
fn scan_head(mut peek: JsonCursor<'_>) -> Result<Head, DecodeError> {
    let mut status = None;
    let mut message = None;
    peek.begin_object()?;
    while peek.has_next()? {
        match peek.select_name(&NAMES)? {
            Some(0) => status = read_text(&mut peek)?,
            Some(3) => message = read_text(&mut peek)?,
            Some(_) => peek.skip_value()?,
            None => {
                peek.skip_name()?;
                peek.skip_value()?;
            }
        }
    }
    peek.end_object()?;

    Ok(Head {
        status: status.ok_or(DecodeError::MissingField { field: STATUS })?,
        message: message.ok_or(DecodeError::MissingField { field: MESSAGE })?,
    })
}

/// A `null` head field counts as missing.
fn read_text(cursor: &mut JsonCursor<'_>) -> Result<Option<String>, DecodeError> {
    if cursor.peek()? == Token::Null {
        cursor.next_null()?;
        return Ok(None);
    }
    cursor.next_string().map(|text| Some(text.into_owned()))
}

/// Only the last `data` member is decoded; earlier ones are skipped.
fn decode_data<M: DecodeMode>(
    cursor: &mut JsonCursor<'_>,
    mode: &M,
) -> Result<M::Output, DecodeError> {
    let mut last = None;
    cursor.begin_object()?;
    while cursor.has_next()? {
        match cursor.select_name(&NAMES)? {
            Some(1) => {
                last = Some(cursor.peek_cursor());
                cursor.skip_value()?;
            }
            Some(_) => cursor.skip_value()?,
            None => {
                cursor.skip_name()?;
                cursor.skip_value()?;
            }
        }
    }
    cursor.end_object()?;

    match last {
        Some(mut at) => mode.decode(&mut at),
        None => mode.absent(),
    }
}

/// Stops at the first `errors` member; the rest of the object is not read.
fn decode_errors<E>(
    cursor: &mut JsonCursor<'_>,
    descriptor: &ErrorDescriptor<E>,
) -> Result<Option<E>, DecodeError> {
    cursor.begin_object()?;
    while cursor.has_next()? {
        match cursor.select_name(&NAMES)? {
            Some(2) => return descriptor.decode(cursor),
            Some(_) => cursor.skip_value()?,
            None => {
                cursor.skip_name()?;
                cursor.skip_value()?;
            }
        }
    }
    Ok(None)
}

/// Decode configuration for one call site: the success payload mode, at most
/// one error descriptor, and the decoder settings.
#[derive(Debug, Clone)]
pub struct CallSite<M, E = ()> {
    mode: M,
    errors: Option<ErrorDescriptor<E>>,
    config: DecoderConfig,
}

impl<M: DecodeMode> CallSite<M> {
    pub fn new(mode: M) -> Self {
        Self {
            mode,
            errors: None,
            config: DecoderConfig::default(),
        }
    }
}

impl<M: DecodeMode, E> CallSite<M, E> {
    /// Attaches the error descriptor. A call site carries at most one.
    pub fn with_errors<F>(self, descriptor: ErrorDescriptor<F>) -> Result<CallSite<M, F>, ConfigError> {
        if self.errors.is_some() {
            return Err(ConfigError::MultipleErrorDescriptors);
        }
        Ok(CallSite {
            mode: self.mode,
            errors: Some(descriptor),
            config: self.config,
        })
    }

    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn decode(&self, input: &str) -> Result<M::Output, ResponseError<E>> {
        decode_envelope(input, &self.mode, self.errors.as_ref(), &self.config)
    }

    pub fn decode_slice(&self, input: &[u8]) -> Result<M::Output, ResponseError<E>> {
        let text = std::str::from_utf8(input).map_err(DecodeError::from)?;
        self.decode(text)
    }

    /// Reads the whole body before decoding; the cursor needs random access
    /// for its look-ahead pass.
    pub fn decode_reader(&self, mut reader: impl Read) -> Result<M::Output, ResponseError<E>> {
        let mut body = String::new();
        reader
            .read_to_string(&mut body)
            .map_err(DecodeError::from)?;
        self.decode(&body)
    }
}
