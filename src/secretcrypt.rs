//! Encryption/decryption using PBKDF2-HMAC-SHA256 + AES-256-GCM
//!
//! This module implements password-based encryption using:
//! - PBKDF2 with HMAC-SHA256 (100,000 iterations) for key derivation
//! - AES-256 in Galois/Counter Mode for authenticated encryption
//!
//! The binary format is:
//! - salt: 16 bytes
//! - nonce: 12 bytes
//! - sealed box: variable length (ciphertext followed by the 16-byte GCM tag)
//!
//! There is no version byte or algorithm identifier; the parameters above
//! are implied by the format itself.

use crate::error::{BackupsealError, ErrorCategory, ErrorKind, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Shortest byte string that can possibly be a valid envelope
pub const MIN_ENVELOPE_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// A derived AES-256 key, wiped from memory on drop.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Derive a 32-byte key from a password and salt using PBKDF2-HMAC-SHA256
pub fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> DerivedKey {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, PBKDF2_ITERATIONS, &mut key[..]);
    key
}

/// Encrypt plaintext with a password using random salt and nonce
///
/// Returns the binary format: salt(16) + nonce(12) + sealedbox(variable)
pub fn encrypt(password: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let salt = random_bytes::<SALT_LEN>("salt")?;
    let nonce = random_bytes::<NONCE_LEN>("nonce")?;

    encrypt_deterministic(password, plaintext, &salt, &nonce)
}

/// Encrypt plaintext with a password using provided salt and nonce
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates random salt/nonce.
pub fn encrypt_deterministic(
    password: &[u8],
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let key = derive_key(password, salt);
    seal(&key, salt, nonce, plaintext)
}

/// Decrypt an envelope with a password
pub fn decrypt(password: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let envelope = Envelope::parse(ciphertext)?;
    let key = derive_key(password, envelope.salt);
    open(&key, &envelope)
}

/// Borrowed view of a binary envelope split into its components.
#[derive(Debug)]
pub(crate) struct Envelope<'a> {
    pub(crate) salt: &'a [u8; SALT_LEN],
    pub(crate) nonce: &'a [u8; NONCE_LEN],
    pub(crate) sealed_box: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub(crate) fn parse(ciphertext: &'a [u8]) -> Result<Self> {
        let Some((salt, rest)) = ciphertext.split_first_chunk::<SALT_LEN>() else {
            return Err(truncated("input likely truncated while reading salt"));
        };
        let Some((nonce, sealed_box)) = rest.split_first_chunk::<NONCE_LEN>() else {
            return Err(truncated("input likely truncated while reading nonce"));
        };
        if sealed_box.len() < TAG_LEN {
            return Err(truncated(
                "input likely truncated while reading authentication tag",
            ));
        }

        Ok(Self {
            salt,
            nonce,
            sealed_box,
        })
    }
}

/// Seal plaintext under an already derived key and lay out the envelope.
pub(crate) fn seal(
    key: &DerivedKey,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let sealed_box = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| {
            BackupsealError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::CipherFailure,
                "AES-256-GCM encryption failed",
            )
        })?;

    let mut output = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed_box.len());
    output.extend_from_slice(salt);
    output.extend_from_slice(nonce);
    output.extend_from_slice(&sealed_box);

    tracing::trace!(
        plaintext_len = plaintext.len(),
        envelope_len = output.len(),
        "sealed envelope"
    );
    Ok(output)
}

/// Open a parsed envelope with an already derived key, verifying the tag.
pub(crate) fn open(key: &DerivedKey, envelope: &Envelope<'_>) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    cipher
        .decrypt(Nonce::from_slice(envelope.nonce), envelope.sealed_box)
        .map_err(|_| {
            tracing::debug!(
                sealed_len = envelope.sealed_box.len(),
                "envelope failed authentication"
            );
            BackupsealError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                "corrupt input, tampered-with data, or wrong password",
            )
        })
}

/// Fill a fixed-size buffer from the operating system's secure random source.
pub(crate) fn random_bytes<const N: usize>(what: &str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    OsRng.try_fill_bytes(&mut buf).map_err(|e| {
        BackupsealError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::EntropyUnavailable,
            format!("failed to generate random {}: {}", what, e),
            e,
        )
    })?;
    Ok(buf)
}

fn truncated(msg: &str) -> BackupsealError {
    BackupsealError::with_kind(ErrorCategory::User, ErrorKind::TruncatedInput, msg)
}
