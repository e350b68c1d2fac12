//! Secret loading with Docker-style `*_FILE` indirection.
//!
//! A secret named `X` can be supplied either directly as the environment
//! variable `X`, or as a file path in `X_FILE` pointing at a mounted secret.
//! The file variant takes precedence.

use crate::{Error, Result};
use std::env;
use std::fs;

/// Resolve a secret from `<key>_FILE` or `<key>`, falling back to `default`.
pub fn get_secret(key: &str, default: &str) -> Result<String> {
    let file_key = format!("{key}_FILE");
    if let Ok(path) = env::var(&file_key) {
        if !path.is_empty() {
            let data = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("read secret file {path}: {e}")))?;
            return Ok(data.trim().to_string());
        }
    }

    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Ok(default.to_string()),
    }
}

/// Resolve a secret, swallowing file errors and returning `default` instead.
pub fn get_optional_secret(key: &str, default: &str) -> String {
    get_secret(key, default).unwrap_or_else(|_| default.to_string())
}
