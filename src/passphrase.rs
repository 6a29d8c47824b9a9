//! Where backup passwords come from
//!
//! File operations take a `&mut dyn PassphraseReader` and ask it for the
//! password only once they know they need one. The CLI wires stdin or the
//! terminal in behind a [`CachingPassphraseReader`].

use crate::error::{BackupsealError, ErrorCategory, ErrorKind, Result};
use std::io::{self, IsTerminal, Read};
use zeroize::Zeroizing;

const TERMINAL_PROMPT: &str = "Password (backupseal): ";

/// A source of backup passwords.
pub trait PassphraseReader {
    /// Produces the password. The returned buffer is wiped on drop.
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>>;
}

/// Hands out the same password on every call. Used by tests and embedders
/// that already hold the password.
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<String>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        Ok(self.passphrase.clone())
    }
}

/// Drains an [`io::Read`] (stdin, a pipe) and uses everything as the password.
///
/// Nothing is trimmed: `printf 'pw\n'` yields the password `"pw\n"`.
pub struct ReaderPassphraseReader {
    source: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(source: Box<dyn Read>) -> Self {
        Self { source }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        let mut raw = Zeroizing::new(Vec::new());
        if let Err(e) = self.source.read_to_end(&mut raw) {
            return Err(BackupsealError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "could not read password input",
                e,
            ));
        }

        // Utf8Error would echo password bytes in its message.
        match std::str::from_utf8(&raw) {
            Ok(text) => Ok(Zeroizing::new(text.to_owned())),
            Err(_) => Err(BackupsealError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "password input is not UTF-8 text",
            )),
        }
    }
}

/// Prompts on the controlling terminal without echoing what is typed.
#[derive(Default)]
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(BackupsealError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "no terminal to prompt for a password on; use --passphrase-stdin",
            ));
        }

        rpassword::prompt_password(TERMINAL_PROMPT)
            .map(Zeroizing::new)
            .map_err(|e| {
                BackupsealError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::PassphraseUnavailable,
                    "password prompt failed",
                    e,
                )
            })
    }
}

/// Remembers the first password its upstream produces.
///
/// A failed upstream read is returned as is and retried on the next call.
pub struct CachingPassphraseReader {
    upstream: Box<dyn PassphraseReader>,
    remembered: Option<Zeroizing<String>>,
}

impl CachingPassphraseReader {
    pub fn new(upstream: Box<dyn PassphraseReader>) -> Self {
        Self {
            upstream,
            remembered: None,
        }
    }
}

impl PassphraseReader for CachingPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        if let Some(passphrase) = &self.remembered {
            return Ok(passphrase.clone());
        }
        let passphrase = self.upstream.read_passphrase()?;
        self.remembered = Some(passphrase.clone());
        Ok(passphrase)
    }
}
