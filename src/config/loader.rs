// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{InstructionSet, RawInstructionSet};
use crate::errors::{MultirunError, Result};

/// Load an instructions file from a given path and return the raw
/// `RawInstructionSet`.
///
/// This only performs JSON deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawInstructionSet> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| MultirunError::ReadInstructions {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: RawInstructionSet =
        serde_json::from_str(&contents).map_err(|source| MultirunError::ParseInstructions {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(raw)
}

/// Load an instructions file from path and validate it.
///
/// This is the entry point for the rest of the application:
///
/// - Reads JSON.
/// - Applies defaults (handled by `serde` default functions).
/// - Checks `jobs >= 0`, non-empty paths and `KEY=VALUE` env entries.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<InstructionSet> {
    let raw = load_from_path(&path)?;
    let set = InstructionSet::try_from(raw)?;

    debug!(
        path = %path.as_ref().display(),
        commands = set.commands.len(),
        jobs = set.policy.jobs,
        "loaded instructions"
    );

    Ok(set)
}
