//! Opt-in cache of password-derived keys
//!
//! Every call in [`crate::envelope`] re-runs the full PBKDF2 derivation.
//! Flows that decrypt the same envelope more than once (check the password,
//! then import) or that open many records sealed under one salt can route
//! through a [`KeyCache`] instead and pay for the derivation once per
//! (password, salt) pair.
//!
//! Encryption through the cache still draws a fresh salt and nonce for
//! every call, and derives its key without caching it: a fresh salt is
//! only seen again if that same envelope is later decrypted.
//!
//! Entries are keyed by the SHA-256 digest of the password, compared in
//! constant time. The password itself is never stored.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::armor;
use crate::envelope::into_text;
use crate::error::Result;
use crate::secretcrypt::{
    self, DerivedKey, Envelope, KEY_LEN, NONCE_LEN, SALT_LEN, derive_key, random_bytes,
};

/// Number of keys held by [`KeyCache::default`].
pub const DEFAULT_CAPACITY: usize = 16;

type PasswordDigest = Zeroizing<[u8; 32]>;

struct Entry {
    password_digest: PasswordDigest,
    salt: [u8; SALT_LEN],
    key: DerivedKey,
}

impl Entry {
    fn matches(&self, password_digest: &[u8; 32], salt: &[u8; SALT_LEN]) -> bool {
        let same_password = self.password_digest[..].ct_eq(&password_digest[..]);
        let same_salt = self.salt[..].ct_eq(&salt[..]);
        (same_password & same_salt).into()
    }
}

fn digest_password(password: &[u8]) -> PasswordDigest {
    Zeroizing::new(Sha256::digest(password).into())
}

/// Bounded, thread-safe cache of derived keys keyed by (password, salt).
///
/// The oldest entry is evicted once `capacity` keys are held. Password
/// digests and keys are zeroized when evicted, cleared, or when the cache
/// is dropped.
pub struct KeyCache {
    capacity: usize,
    entries: Mutex<VecDeque<Entry>>,
}

impl KeyCache {
    /// Creates a cache holding at most `capacity` keys. A capacity of zero
    /// disables caching while keeping the same API.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the key for (password, salt), deriving and remembering it on a miss.
    pub fn derive(&self, password: &[u8], salt: &[u8; SALT_LEN]) -> DerivedKey {
        let password_digest = digest_password(password);
        if let Some(key) = self.lookup(&password_digest, salt) {
            tracing::trace!("derived key cache hit");
            return key;
        }

        // PBKDF2 runs outside the lock.
        let key = derive_key(password, salt);
        self.insert(password_digest, salt, &key);
        key
    }

    /// Like [`crate::envelope::encrypt`]. The fresh salt's key is not cached.
    pub fn encrypt(&self, plaintext: &str, password: &str) -> Result<String> {
        let salt = random_bytes::<SALT_LEN>("salt")?;
        let nonce = random_bytes::<NONCE_LEN>("nonce")?;
        let key = derive_key(password.as_bytes(), &salt);
        let sealed = secretcrypt::seal(&key, &salt, &nonce, plaintext.as_bytes())?;
        Ok(armor::wrap(&sealed))
    }

    /// Like [`crate::envelope::decrypt`], with key derivation through the cache.
    pub fn decrypt(&self, envelope: &str, password: &str) -> Result<String> {
        let sealed = armor::unwrap(envelope)?;
        let parsed = Envelope::parse(&sealed)?;
        let key = self.derive(password.as_bytes(), parsed.salt);
        into_text(secretcrypt::open(&key, &parsed)?)
    }

    /// Like [`crate::envelope::test_decryption`], with key derivation through the cache.
    pub fn test_decryption(&self, envelope: &str, password: &str) -> bool {
        self.decrypt(envelope, password).is_ok()
    }

    /// Number of keys currently cached.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drops (and zeroizes) every cached key.
    pub fn clear(&self) {
        self.entries().clear();
    }

    fn lookup(&self, password_digest: &[u8; 32], salt: &[u8; SALT_LEN]) -> Option<DerivedKey> {
        self.entries()
            .iter()
            .find(|entry| entry.matches(password_digest, salt))
            .map(|entry| Zeroizing::new(*entry.key))
    }

    fn insert(&self, password_digest: PasswordDigest, salt: &[u8; SALT_LEN], key: &[u8; KEY_LEN]) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries();
        // Another thread may have derived the same key meanwhile.
        if entries.iter().any(|entry| entry.matches(&password_digest, salt)) {
            return;
        }
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(Entry {
            password_digest,
            salt: *salt,
            key: Zeroizing::new(*key),
        });
    }

    // Nothing under the lock can leave the deque inconsistent; poisoning is ignored.
    fn entries(&self) -> MutexGuard<'_, VecDeque<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
