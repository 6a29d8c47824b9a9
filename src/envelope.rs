//! Password-protected text envelopes
//!
//! The four operations exported backups are built on:
//!
//! - [`encrypt`] turns a plaintext string into a base64 envelope
//! - [`decrypt`] reverses it, failing on malformed input or a bad tag
//! - [`is_encrypted_format`] sniffs whether text could be an envelope
//! - [`test_decryption`] checks a password without surfacing plaintext
//!
//! A failed decryption never says whether the password was wrong or the
//! data was altered; AES-GCM tag verification cannot tell the two apart.

use crate::armor;
use crate::error::{BackupsealError, ErrorCategory, ErrorKind, Result};
use crate::secretcrypt::{self, MIN_ENVELOPE_LEN};

/// Encrypt `plaintext` under `password`, returning a base64 envelope.
///
/// Every call draws a fresh salt and nonce, so encrypting the same text
/// twice yields two different envelopes.
pub fn encrypt(plaintext: &str, password: &str) -> Result<String> {
    let sealed = secretcrypt::encrypt(password.as_bytes(), plaintext.as_bytes())?;
    let envelope = armor::wrap(&sealed);
    tracing::debug!(
        plaintext_len = plaintext.len(),
        envelope_len = envelope.len(),
        "encrypted text"
    );
    Ok(envelope)
}

/// Decrypt a base64 envelope produced by [`encrypt`].
pub fn decrypt(envelope: &str, password: &str) -> Result<String> {
    let sealed = armor::unwrap(envelope)?;
    let plaintext = secretcrypt::decrypt(password.as_bytes(), &sealed)?;
    into_text(plaintext)
}

/// Heuristic check that `data` is base64 decoding to at least
/// salt + nonce + tag bytes. Any other long-enough base64 also passes.
pub fn is_encrypted_format(data: &str) -> bool {
    armor::unwrap(data).is_ok_and(|bytes| bytes.len() >= MIN_ENVELOPE_LEN)
}

/// Returns true if `password` opens `envelope`, false on any failure.
pub fn test_decryption(envelope: &str, password: &str) -> bool {
    match decrypt(envelope, password) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(kind = ?e.kind, "test decryption failed");
            false
        }
    }
}

pub(crate) fn into_text(plaintext: Vec<u8>) -> Result<String> {
    String::from_utf8(plaintext).map_err(|e| {
        BackupsealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::BinaryFormat,
            "decrypted data is not valid UTF-8 text",
            e.utf8_error(),
        )
    })
}
