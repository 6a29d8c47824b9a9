//! Exported backup layout
//!
//! A backup is a JSON object:
//!
//! ```text
//! {
//!   "metadata": { "version", "appVersion", "exportedAt", "encrypted", "description"? },
//!   "data": { "grows": [..], "plants": [..], "fertilizerMixes": [..], "settings": {..} | null }
//! }
//! ```
//!
//! Only the fields needed to import a backup are checked. Anything else is
//! carried through untouched.

use std::fmt;

use serde_json::Value;

use crate::envelope;
use crate::error::{BackupsealError, ErrorCategory, ErrorKind, Result};

/// Schema version written by current exports.
pub const EXPORT_SCHEMA_VERSION: &str = "1.0";

/// Counts and dates shown before importing a backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub grows: usize,
    pub plants: usize,
    pub fertilizer_mixes: usize,
    pub has_settings: bool,
    pub exported_at: String,
    pub version: String,
}

impl fmt::Display for BackupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "exported at: {}", self.exported_at)?;
        writeln!(f, "grows: {}", self.grows)?;
        writeln!(f, "plants: {}", self.plants)?;
        writeln!(f, "fertilizer mixes: {}", self.fertilizer_mixes)?;
        write!(
            f,
            "settings: {}",
            if self.has_settings { "yes" } else { "no" }
        )
    }
}

// Arrays count as containers here but never have named fields, so they
// fail the field checks instead of the container check.
fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Every way `value` departs from the backup layout, in a fixed order.
/// Empty when the layout is valid.
pub fn schema_errors(value: &Value) -> Vec<String> {
    if !is_container(value) {
        return vec!["Data must be an object".to_string()];
    }

    let mut errors = Vec::new();

    match value.get("metadata") {
        Some(metadata) if is_container(metadata) => {
            if !metadata.get("version").is_some_and(Value::is_string) {
                errors.push("Missing metadata.version".to_string());
            }
            if !metadata.get("exportedAt").is_some_and(Value::is_string) {
                errors.push("Missing metadata.exportedAt".to_string());
            }
        }
        _ => errors.push("Missing or invalid metadata".to_string()),
    }

    match value.get("data") {
        Some(data) if is_container(data) => {
            for section in ["grows", "plants", "fertilizerMixes"] {
                if !data.get(section).is_some_and(Value::is_array) {
                    errors.push(format!("Missing or invalid data.{}", section));
                }
            }
        }
        _ => errors.push("Missing or invalid data section".to_string()),
    }

    errors
}

/// Fails with [`ErrorKind::InvalidSchema`] naming every problem found.
pub fn validate_export_schema(value: &Value) -> Result<()> {
    let errors = schema_errors(value);
    if errors.is_empty() {
        return Ok(());
    }
    Err(BackupsealError::with_kind(
        ErrorCategory::User,
        ErrorKind::InvalidSchema,
        format!("invalid backup schema: {}", errors.join(", ")),
    ))
}

/// Summarizes a backup after validating its layout.
pub fn summarize(value: &Value) -> Result<BackupSummary> {
    validate_export_schema(value)?;

    let count = |section: &str| {
        value["data"][section]
            .as_array()
            .map_or(0, |items| items.len())
    };
    let text = |field: &str| {
        value["metadata"][field]
            .as_str()
            .unwrap_or_default()
            .to_string()
    };

    Ok(BackupSummary {
        grows: count("grows"),
        plants: count("plants"),
        fertilizer_mixes: count("fertilizerMixes"),
        has_settings: !value["data"]["settings"].is_null(),
        exported_at: text("exportedAt"),
        version: text("version"),
    })
}

/// Marks a valid backup as encrypted and seals its compact JSON with
/// `password`. The input value is left unchanged.
pub fn seal_backup(backup: &Value, password: &str) -> Result<String> {
    validate_export_schema(backup)?;

    let mut marked = backup.clone();
    if let Some(metadata) = marked.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.insert("encrypted".to_string(), Value::Bool(true));
    }
    envelope::encrypt(&marked.to_string(), password)
}
