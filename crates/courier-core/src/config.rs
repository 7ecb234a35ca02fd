//! Decoder configuration.

use serde::{Deserialize, Serialize};

/// Status code that marks a successful envelope unless configured otherwise.
pub const DEFAULT_SUCCESS_CODE: &str = "0x000";

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// The one status value treated as success; every other value is a failure.
    pub success_code: String,
    /// Skip a leading UTF-8 byte order mark.
    pub skip_bom: bool,
    /// Reject content after the envelope object on the success path.
    pub require_end_of_document: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            success_code: DEFAULT_SUCCESS_CODE.to_owned(),
            skip_bom: true,
            require_end_of_document: false,
        }
    }
}

impl DecoderConfig {
    pub fn with_success_code(mut self, code: impl Into<String>) -> Self {
        self.success_code = code.into();
        self
    }

    pub fn with_require_end_of_document(mut self, require: bool) -> Self {
        self.require_end_of_document = require;
        self
    }

    pub fn is_success(&self, status: &str) -> bool {
        status == self.success_code
    }

    pub(crate) fn strip_bom<'a>(&self, input: &'a str) -> &'a str {
        if self.skip_bom {
            input.strip_prefix(UTF8_BOM).unwrap_or(input)
        } else {
            input
        }
    }
}
