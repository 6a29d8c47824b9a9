//! Backup file operations
//!
//! High-level operations for encrypting, decrypting, updating, checking and
//! opening exported backup files. Encrypted backups hold a single envelope
//! (see [`crate::envelope`]); plain backups hold JSON in the layout checked
//! by [`crate::backup`].

use crate::backup::{self, BackupSummary};
use crate::envelope;
use crate::error::{BackupsealError, ErrorCategory, ErrorKind, Result};
use crate::passphrase::PassphraseReader;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// File extension of encrypted backups
pub const ENCRYPTED_EXTENSION: &str = ".growpanion";

/// File extension of plain JSON backups
pub const PLAIN_EXTENSION: &str = ".json";

/// What a backup file appears to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Encrypted,
    Plain,
    Unknown,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Encrypted => "encrypted",
            FileKind::Plain => "plain",
            FileKind::Unknown => "unknown",
        }
    }
}

/// A backup after any decryption and JSON parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedBackup {
    pub data: serde_json::Value,
    pub was_encrypted: bool,
}

/// Encrypt a file with a passphrase
///
/// Reads plaintext from `input_path`, encrypts it using a passphrase from
/// `passphrase_reader`, and writes the envelope to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let plaintext = read_text(input_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let encrypted =
        envelope::encrypt(&plaintext, &passphrase).map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, encrypted.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::info!(
        input = %input_path.display(),
        output = %output_path.display(),
        "encrypted backup"
    );
    Ok(())
}

/// Decrypt a file with a passphrase
///
/// Reads an envelope from `input_path`, decrypts it using a passphrase from
/// `passphrase_reader`, and writes the plaintext to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let encrypted = read_text(input_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext =
        envelope::decrypt(&encrypted, &passphrase).map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, plaintext.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::info!(
        input = %input_path.display(),
        output = %output_path.display(),
        "decrypted backup"
    );
    Ok(())
}

/// Update an encrypted file with new plaintext using the same passphrase
///
/// This function:
/// 1. Decrypts the existing file at `crypt_path` to validate the passphrase
/// 2. Reads new plaintext from `plain_path`
/// 3. Encrypts the new plaintext with the validated passphrase (fresh salt and nonce)
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// Either the old file or the new file exists afterwards, never a partial one,
/// and the passphrase cannot be changed by accident.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let existing = read_text(crypt_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;

    // Validate passphrase by decrypting existing file (discard plaintext)
    envelope::decrypt(&existing, &passphrase).map_err(|e| e.with_context("failed to decrypt"))?;

    let crypt_dir = match crypt_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::Builder::new()
        .prefix(".backupseal-update")
        .tempfile_in(crypt_dir)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to create tempfile", e))?;

    let new_plaintext = read_text(plain_path)?;
    let new_encrypted = envelope::encrypt(&new_plaintext, &passphrase)
        .map_err(|e| e.with_context("failed to encrypt"))?;

    temp_file
        .write_all(new_encrypted.as_bytes())
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                io_error(
                    ErrorCategory::Internal,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }
    temp_file.persist(crypt_path).map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            format!("failed to rename to target file {}", crypt_path.display()),
            e.error,
        )
    })?;

    tracing::info!(path = %crypt_path.display(), "updated encrypted backup");
    Ok(())
}

/// Check whether the passphrase opens the encrypted file at `input_path`.
///
/// Failing to read the file or the passphrase is an error; any decryption
/// failure (malformed data, wrong passphrase, tampering) is `Ok(false)`.
pub fn check_file(input_path: &Path, passphrase_reader: &mut dyn PassphraseReader) -> Result<bool> {
    let encrypted = read_text(input_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    Ok(envelope::test_decryption(&encrypted, &passphrase))
}

/// Seal a plain JSON backup for export
///
/// Reads the backup at `input_path`, checks its layout, sets
/// `metadata.encrypted` and writes the envelope to `output_path` with
/// mode 0o600 on Unix.
pub fn export_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let content = read_text(input_path)?;
    let backup = parse_json(&content)?;
    backup::validate_export_schema(&backup)
        .map_err(|e| e.with_context(format!("cannot export {}", input_path.display())))?;

    let passphrase = passphrase_reader.read_passphrase()?;
    let sealed = backup::seal_backup(&backup, &passphrase)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, sealed.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::info!(
        input = %input_path.display(),
        output = %output_path.display(),
        "exported encrypted backup"
    );
    Ok(())
}

/// Classify backup content using its file name and a sniff of the content.
pub fn detect_kind(file_name: &str, content: &str) -> FileKind {
    if file_name.ends_with(ENCRYPTED_EXTENSION) {
        return FileKind::Encrypted;
    }
    if envelope::is_encrypted_format(content) {
        // Also covers encrypted content saved under a .json name.
        return FileKind::Encrypted;
    }
    if file_name.ends_with(PLAIN_EXTENSION)
        || serde_json::from_str::<serde_json::Value>(content).is_ok()
    {
        return FileKind::Plain;
    }
    FileKind::Unknown
}

/// [`detect_kind`] for a file on disk.
///
/// Content is decoded lossily, so a file with a known extension is
/// classified by name whatever its bytes.
pub fn detect_file(input_path: &Path) -> Result<FileKind> {
    let bytes = read_bytes(input_path)?;
    let content = String::from_utf8_lossy(&bytes);
    let file_name = input_path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    Ok(detect_kind(&file_name, &content))
}

/// Open backup content that may or may not be encrypted.
///
/// Encrypted content needs a passphrase source; it is only consulted when
/// the content sniffs as encrypted. The (decrypted) text must be JSON in
/// the backup layout.
pub fn open_backup(
    content: &str,
    passphrase_reader: Option<&mut dyn PassphraseReader>,
) -> Result<OpenedBackup> {
    let was_encrypted = envelope::is_encrypted_format(content);

    let decrypted;
    let json_text = if was_encrypted {
        let Some(reader) = passphrase_reader else {
            return Err(BackupsealError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseRequired,
                "backup is encrypted and needs a passphrase",
            ));
        };
        let passphrase = reader.read_passphrase()?;
        decrypted = envelope::decrypt(content, &passphrase).map_err(|e| {
            BackupsealError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                "failed to decrypt backup",
                e,
            )
        })?;
        decrypted.as_str()
    } else {
        content
    };

    let data = parse_json(json_text)?;
    backup::validate_export_schema(&data)?;

    Ok(OpenedBackup {
        data,
        was_encrypted,
    })
}

/// Open the backup at `input_path` and write its JSON, pretty-printed, to `output_path`.
pub fn open_backup_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<OpenedBackup> {
    let content = read_text(input_path)?;
    let opened = open_backup(&content, Some(passphrase_reader))
        .map_err(|e| e.with_context(format!("failed to open {}", input_path.display())))?;

    let mut pretty = serde_json::to_string_pretty(&opened.data).map_err(|e| {
        BackupsealError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InvalidJson,
            "failed to serialize backup",
            e,
        )
    })?;
    pretty.push('\n');
    write_file_secure(output_path, pretty.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::info!(
        input = %input_path.display(),
        was_encrypted = opened.was_encrypted,
        "opened backup"
    );
    Ok(opened)
}

/// Summarize the backup at `input_path`, decrypting it first if needed.
pub fn summarize_file(
    input_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<BackupSummary> {
    let content = read_text(input_path)?;
    let opened = open_backup(&content, Some(passphrase_reader))
        .map_err(|e| e.with_context(format!("failed to open {}", input_path.display())))?;
    backup::summarize(&opened.data)
}

fn parse_json(text: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| {
        BackupsealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidJson,
            format!("backup is not valid JSON: {}", e),
            e,
        )
    })
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| io_error(ErrorCategory::User, format!("failed to open {}", path.display()), e))?;

        file.write_all(contents).map_err(|e| {
            io_error(
                ErrorCategory::Internal,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            io_error(
                ErrorCategory::User,
                format!("failed to write {}", path.display()),
                e,
            )
        })
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        let category = if e.kind() == io::ErrorKind::NotFound {
            ErrorCategory::User
        } else {
            ErrorCategory::Internal
        };
        io_error(category, format!("failed to read from {}", path.display()), e)
    })
}

fn read_text(path: &Path) -> Result<String> {
    String::from_utf8(read_bytes(path)?).map_err(|e| {
        BackupsealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidUtf8Input,
            format!("{} is not valid UTF-8 text", path.display()),
            e.utf8_error(),
        )
    })
}

fn io_error(category: ErrorCategory, msg: impl Into<String>, err: io::Error) -> BackupsealError {
    BackupsealError::with_kind_and_source(category, ErrorKind::Io, msg, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passphrase::ConstantPassphraseReader;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    const BACKUP_JSON: &str = r#"{"metadata":{"version":"1.0","appVersion":"0.1.0","exportedAt":"2024-01-15T10:30:00.000Z","encrypted":false},"data":{"grows":[{"id":"g1","name":"Tent"}],"plants":[],"fertilizerMixes":[],"settings":null}}"#;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("backup.json");
        let crypt_path = temp_dir.path().join("backup.growpanion");
        let decrypted_path = temp_dir.path().join("decrypted.json");

        fs::write(&plain_path, BACKUP_JSON).unwrap();

        let mut reader = ConstantPassphraseReader::new("test password");
        encrypt_file(&plain_path, &crypt_path, &mut reader).unwrap();
        assert!(envelope::is_encrypted_format(
            &fs::read_to_string(&crypt_path).unwrap()
        ));

        decrypt_file(&crypt_path, &decrypted_path, &mut reader).unwrap();
        assert_eq!(fs::read_to_string(&decrypted_path).unwrap(), BACKUP_JSON);
    }

    #[test]
    fn test_decrypt_tolerates_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        let crypt_path = temp_dir.path().join("backup.growpanion");
        let decrypted_path = temp_dir.path().join("decrypted.json");

        let encrypted = envelope::encrypt("hello", "pw").unwrap();
        fs::write(&crypt_path, format!("{}\n", encrypted)).unwrap();

        let mut reader = ConstantPassphraseReader::new("pw");
        decrypt_file(&crypt_path, &decrypted_path, &mut reader).unwrap();
        assert_eq!(fs::read_to_string(&decrypted_path).unwrap(), "hello");
    }

    #[test]
    fn test_update_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain1_path = temp_dir.path().join("plain1.json");
        let plain2_path = temp_dir.path().join("plain2.json");
        let crypt_path = temp_dir.path().join("backup.growpanion");

        fs::write(&plain1_path, "Initial content").unwrap();
        let mut reader = ConstantPassphraseReader::new("test password");
        encrypt_file(&plain1_path, &crypt_path, &mut reader).unwrap();
        let before = fs::read_to_string(&crypt_path).unwrap();

        fs::write(&plain2_path, "Updated content").unwrap();
        update_file(&plain2_path, &crypt_path, &mut reader).unwrap();

        let after = fs::read_to_string(&crypt_path).unwrap();
        assert_ne!(before, after);
        assert_eq!(
            envelope::decrypt(&after, "test password").unwrap(),
            "Updated content"
        );
    }

    #[test]
    fn test_update_with_wrong_passphrase_fails() {
        let temp_dir = TempDir::new().unwrap();
        let plain1_path = temp_dir.path().join("plain1.json");
        let plain2_path = temp_dir.path().join("plain2.json");
        let crypt_path = temp_dir.path().join("backup.growpanion");

        fs::write(&plain1_path, "Initial").unwrap();
        let mut reader = ConstantPassphraseReader::new("correct password");
        encrypt_file(&plain1_path, &crypt_path, &mut reader).unwrap();
        let before = fs::read_to_string(&crypt_path).unwrap();

        fs::write(&plain2_path, "Updated").unwrap();
        let mut reader = ConstantPassphraseReader::new("wrong password");
        let err = update_file(&plain2_path, &crypt_path, &mut reader)
            .expect_err("expected authentication failure");

        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert_eq!(fs::read_to_string(&crypt_path).unwrap(), before);
    }

    #[test]
    #[cfg(unix)]
    fn test_file_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.json");
        let crypt_path = temp_dir.path().join("backup.growpanion");

        fs::write(&plain_path, "test").unwrap();

        let mut reader = ConstantPassphraseReader::new("test");
        encrypt_file(&plain_path, &crypt_path, &mut reader).unwrap();
        let mode = fs::metadata(&crypt_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        update_file(&plain_path, &crypt_path, &mut reader).unwrap();
        let mode = fs::metadata(&crypt_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_decrypt_wrong_passphrase() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.json");
        let crypt_path = temp_dir.path().join("backup.growpanion");
        let decrypted_path = temp_dir.path().join("decrypted.json");

        fs::write(&plain_path, "secret").unwrap();
        let mut reader = ConstantPassphraseReader::new("correct");
        encrypt_file(&plain_path, &crypt_path, &mut reader).unwrap();

        let mut reader = ConstantPassphraseReader::new("wrong");
        let err = decrypt_file(&crypt_path, &decrypted_path, &mut reader).unwrap_err();

        assert!(err.is_authentication_failure());
        assert!(!decrypted_path.exists());
    }

    #[test]
    fn test_encrypt_rejects_non_utf8_input() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("binary.bin");
        let crypt_path = temp_dir.path().join("binary.growpanion");

        fs::write(&plain_path, [0xffu8, 0xfe, 0x00]).unwrap();
        let mut reader = ConstantPassphraseReader::new("test");
        let err = encrypt_file(&plain_path, &crypt_path, &mut reader).unwrap_err();

        assert_eq!(err.kind, Some(ErrorKind::InvalidUtf8Input));
        assert!(!crypt_path.exists());
    }

    #[test]
    fn test_missing_input_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut reader = ConstantPassphraseReader::new("test");
        let err = decrypt_file(
            &temp_dir.path().join("missing.growpanion"),
            &temp_dir.path().join("out.json"),
            &mut reader,
        )
        .unwrap_err();

        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert_eq!(err.category, ErrorCategory::User);
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("empty.json");
        let crypt_path = temp_dir.path().join("empty.growpanion");
        let decrypted_path = temp_dir.path().join("decrypted.json");

        fs::write(&plain_path, b"").unwrap();

        let mut reader = ConstantPassphraseReader::new("test");
        encrypt_file(&plain_path, &crypt_path, &mut reader).unwrap();
        decrypt_file(&crypt_path, &decrypted_path, &mut reader).unwrap();

        assert_eq!(fs::read(&decrypted_path).unwrap(), b"");
    }

    #[test]
    fn test_check_file() {
        let temp_dir = TempDir::new().unwrap();
        let crypt_path = temp_dir.path().join("backup.growpanion");
        fs::write(&crypt_path, envelope::encrypt("data", "correct").unwrap()).unwrap();

        let mut right = ConstantPassphraseReader::new("correct");
        let mut wrong = ConstantPassphraseReader::new("wrong");
        assert!(check_file(&crypt_path, &mut right).unwrap());
        assert!(!check_file(&crypt_path, &mut wrong).unwrap());

        let plain_path = temp_dir.path().join("backup.json");
        fs::write(&plain_path, BACKUP_JSON).unwrap();
        assert!(!check_file(&plain_path, &mut right).unwrap());

        assert!(check_file(&temp_dir.path().join("missing"), &mut right).is_err());
    }

    #[test]
    fn test_detect_kind() {
        let encrypted = envelope::encrypt("{}", "pw").unwrap();

        assert_eq!(detect_kind("backup.growpanion", "anything"), FileKind::Encrypted);
        assert_eq!(detect_kind("backup.json", BACKUP_JSON), FileKind::Plain);
        assert_eq!(detect_kind("backup.json", &encrypted), FileKind::Encrypted);
        assert_eq!(detect_kind("backup.json", "not json"), FileKind::Plain);
        assert_eq!(detect_kind("backup.txt", &encrypted), FileKind::Encrypted);
        assert_eq!(detect_kind("backup.txt", BACKUP_JSON), FileKind::Plain);
        assert_eq!(detect_kind("backup.txt", "hello world"), FileKind::Unknown);
    }

    #[test]
    fn test_detect_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("export");
        fs::write(&path, envelope::encrypt("{}", "pw").unwrap()).unwrap();

        assert_eq!(detect_file(&path).unwrap(), FileKind::Encrypted);
        assert_eq!(FileKind::Encrypted.as_str(), "encrypted");

        let binary = temp_dir.path().join("image.png");
        fs::write(&binary, [0x89u8, 0x50, 0x4e, 0x47, 0xff]).unwrap();
        assert_eq!(detect_file(&binary).unwrap(), FileKind::Unknown);
    }

    #[test]
    fn test_detect_file_binary_with_known_extension() {
        let temp_dir = TempDir::new().unwrap();
        let bytes = [0xffu8, 0x00, 0x41];

        let encrypted = temp_dir.path().join("x.growpanion");
        fs::write(&encrypted, bytes).unwrap();
        assert_eq!(detect_file(&encrypted).unwrap(), FileKind::Encrypted);

        let plain = temp_dir.path().join("x.json");
        fs::write(&plain, bytes).unwrap();
        assert_eq!(detect_file(&plain).unwrap(), FileKind::Plain);
    }

    #[test]
    fn test_open_backup_plain_needs_no_passphrase() {
        let opened = open_backup(BACKUP_JSON, None).unwrap();

        assert!(!opened.was_encrypted);
        assert_eq!(opened.data["metadata"]["version"], "1.0");
    }

    #[test]
    fn test_open_backup_encrypted() {
        let encrypted = envelope::encrypt(BACKUP_JSON, "pw").unwrap();
        let mut reader = ConstantPassphraseReader::new("pw");

        let opened = open_backup(&encrypted, Some(&mut reader)).unwrap();

        assert!(opened.was_encrypted);
        assert_eq!(opened.data, serde_json::from_str::<serde_json::Value>(BACKUP_JSON).unwrap());
    }

    #[test]
    fn test_open_backup_encrypted_without_passphrase() {
        let encrypted = envelope::encrypt(BACKUP_JSON, "pw").unwrap();

        let err = open_backup(&encrypted, None).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::PassphraseRequired));
    }

    #[test]
    fn test_open_backup_wrong_passphrase() {
        let encrypted = envelope::encrypt(BACKUP_JSON, "pw").unwrap();
        let mut reader = ConstantPassphraseReader::new("nope");

        let err = open_backup(&encrypted, Some(&mut reader)).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_open_backup_invalid_json() {
        let err = open_backup("hello world", None).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidJson));

        let encrypted = envelope::encrypt("not json", "pw").unwrap();
        let mut reader = ConstantPassphraseReader::new("pw");
        let err = open_backup(&encrypted, Some(&mut reader)).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidJson));
    }

    #[test]
    fn test_open_backup_rejects_json_that_is_not_a_backup() {
        for content in ["42", "[]", r#"{"foo":"bar"}"#, r#"{"metadata":{},"data":{}}"#] {
            let err = open_backup(content, None).unwrap_err();
            assert_eq!(err.kind, Some(ErrorKind::InvalidSchema), "{}", content);
        }

        let encrypted = envelope::encrypt(r#"{"not":"a backup"}"#, "pw").unwrap();
        let mut reader = ConstantPassphraseReader::new("pw");
        let err = open_backup(&encrypted, Some(&mut reader)).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidSchema));
    }

    #[test]
    fn test_open_backup_missing_exported_at() {
        let content = r#"{"metadata":{"version":"1.0"},"data":{"grows":[],"plants":[],"fertilizerMixes":[]}}"#;

        let err = open_backup(content, None).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidSchema));
        assert!(err.message().contains("Missing metadata.exportedAt"));
    }

    #[test]
    fn test_export_file_marks_encrypted() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("backup.json");
        let crypt_path = temp_dir.path().join("backup.growpanion");
        fs::write(&plain_path, BACKUP_JSON).unwrap();

        let mut reader = ConstantPassphraseReader::new("pw");
        export_file(&plain_path, &crypt_path, &mut reader).unwrap();

        let opened = open_backup(&fs::read_to_string(&crypt_path).unwrap(), Some(&mut reader)).unwrap();
        assert!(opened.was_encrypted);
        assert_eq!(opened.data["metadata"]["encrypted"], true);
        assert_eq!(opened.data["data"]["grows"][0]["name"], "Tent");
    }

    #[test]
    fn test_export_file_rejects_invalid_backup() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("notes.json");
        let crypt_path = temp_dir.path().join("notes.growpanion");
        fs::write(&plain_path, r#"{"notes":[]}"#).unwrap();

        let mut reader = ConstantPassphraseReader::new("pw");
        let err = export_file(&plain_path, &crypt_path, &mut reader).unwrap_err();

        assert_eq!(err.kind, Some(ErrorKind::InvalidSchema));
        assert!(!crypt_path.exists());
    }

    #[test]
    fn test_summarize_file() {
        let temp_dir = TempDir::new().unwrap();
        let crypt_path = temp_dir.path().join("backup.growpanion");
        fs::write(&crypt_path, envelope::encrypt(BACKUP_JSON, "pw").unwrap()).unwrap();

        let mut reader = ConstantPassphraseReader::new("pw");
        let summary = summarize_file(&crypt_path, &mut reader).unwrap();

        assert_eq!(summary.grows, 1);
        assert_eq!(summary.plants, 0);
        assert!(!summary.has_settings);
        assert_eq!(summary.exported_at, "2024-01-15T10:30:00.000Z");
        assert_eq!(summary.version, "1.0");
    }

    #[test]
    fn test_open_backup_file() {
        let temp_dir = TempDir::new().unwrap();
        let crypt_path = temp_dir.path().join("backup.growpanion");
        let out_path = temp_dir.path().join("backup.json");
        fs::write(&crypt_path, envelope::encrypt(BACKUP_JSON, "pw").unwrap()).unwrap();

        let mut reader = ConstantPassphraseReader::new("pw");
        let opened = open_backup_file(&crypt_path, &out_path, &mut reader).unwrap();

        assert!(opened.was_encrypted);
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(written, opened.data);
    }
}
