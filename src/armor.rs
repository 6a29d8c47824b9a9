//! Text armoring for binary envelopes
//!
//! Envelopes cross the system boundary as standard (RFC 4648, padded)
//! base64 so they can be stored in text files, copied and pasted, or
//! embedded in JSON. The armored form:
//! - Has no prefix, magic marker or version tag
//! - Contains no whitespace (including newlines)
//!
//! Unwrapping tolerates leading and trailing ASCII whitespace, which text
//! editors and shells tend to add, but nothing inside the payload.

use crate::error::{BackupsealError, ErrorCategory, ErrorKind, Result};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Wrap bytes in armor, returning the armored string
pub fn wrap(body: &[u8]) -> String {
    STANDARD.encode(body)
}

/// Unwrap an armored string, returning the original bytes
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    let encoded = armored.trim_ascii();
    STANDARD.decode(encoded).map_err(|e| {
        BackupsealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArmoringDecode,
            format!("base64 decoding failed: {}", e),
            e,
        )
    })
}
