//! Resource name rules shared by indexes, data sources and indexers

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Result, SyncError};

const MAX_NAME_LEN: usize = 128;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("static pattern compiles")
    })
}

/// Lowercase letters, digits and dashes; no leading or trailing dash
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SyncError::config(format!("{} name is empty", kind)));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(SyncError::config(format!(
            "{} name '{}' is longer than {} characters",
            kind, name, MAX_NAME_LEN
        )));
    }
    if !name_pattern().is_match(name) {
        return Err(SyncError::config(format!(
            "{} name '{}' may only contain lowercase letters, digits and dashes, and cannot start or end with a dash",
            kind, name
        )));
    }
    Ok(())
}
