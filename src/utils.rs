//! Common utilities shared across modules.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::Local;

/// Characters that are not allowed in folder or file names on common stores.
const ILLEGAL_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest name accepted by the destination stores.
const MAX_NAME_LEN: usize = 255;

/// Sanitize a string for use as a single file or folder name.
///
/// Illegal characters become `_`, leading/trailing dots and spaces are
/// trimmed, the result is capped at 255 characters, and an empty result
/// becomes `"unnamed"`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if ILLEGAL_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    let capped: String = trimmed.chars().take(MAX_NAME_LEN).collect();

    if capped.is_empty() {
        "unnamed".to_string()
    } else {
        capped
    }
}

/// Collapse whitespace and strip control characters from free text.
pub fn sanitize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Local timestamp used in backup file names: `YYYYmmdd_HHMMSS`.
pub fn backup_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Absolute form of `path` with its longest existing prefix canonicalized.
///
/// Works for paths that do not exist yet, so configured output locations
/// can be compared with a canonical watch root before anything is created.
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut existing = absolute.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        if let Ok(mut resolved) = existing.canonicalize() {
            resolved.extend(missing.iter().rev());
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}
