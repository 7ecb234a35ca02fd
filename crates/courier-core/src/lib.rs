//! Typed decoding of `{status, message, data|errors}` response envelopes and
//! label-keyed polymorphic JSON objects.
//!
//! Both components run over [`JsonCursor`], a streaming token cursor that can
//! hand out independent look-ahead copies of itself. Record types are decoded
//! by their serde derives; this crate decides which record to decode and when.

mod annotation;
mod config;
mod cursor;
mod envelope;
mod error;
mod label;
mod mode;
pub mod numeric;
mod payload;
mod polymorphic;

pub use annotation::{ErrorAnnotation, ErrorDescriptor, ErrorShape, PrimitiveKind, resolve_annotations};
pub use config::{DEFAULT_SUCCESS_CODE, DecoderConfig};
pub use cursor::{JsonCursor, Token};
pub use envelope::{CallSite, decode_envelope};
pub use error::{ConfigError, DecodeError, EncodeError, ResponseError, ServerFailure};
pub use label::{Label, LabelKind};
pub use mode::{DecodeMode, Ignored, Optional, Required};
pub use polymorphic::{FallbackPolicy, PolymorphicRegistry, RegistryBuilder, Subtype};
