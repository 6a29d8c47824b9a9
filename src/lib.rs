//! Backupseal - Password-based encryption for exported backup data
//!
//! Backups are sealed with AES-256-GCM under a key derived from a password
//! with PBKDF2-HMAC-SHA256, and travel as a single base64 envelope:
//!
//! ```text
//! base64( salt[16] || nonce[12] || ciphertext || tag[16] )
//! ```
//!
//! The text-level operations live in [`envelope`] and are re-exported at
//! the crate root:
//!
//! ```rust,no_run
//! let envelope = backupseal::encrypt("{\"grows\":[]}", "hunter2")?;
//! assert!(backupseal::is_encrypted_format(&envelope));
//! assert!(backupseal::test_decryption(&envelope, "hunter2"));
//! assert_eq!(backupseal::decrypt(&envelope, "hunter2")?, "{\"grows\":[]}");
//! # Ok::<(), backupseal::BackupsealError>(())
//! ```

#![forbid(unsafe_code)]

pub mod armor;
pub mod backup;
pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod keycache;
pub mod passphrase;
pub mod secretcrypt;

pub use envelope::{decrypt, encrypt, is_encrypted_format, test_decryption};
pub use error::{BackupsealError, ErrorCategory, ErrorKind, Result};
pub use keycache::KeyCache;
