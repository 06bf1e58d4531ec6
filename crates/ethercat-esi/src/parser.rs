// crates/ethercat-esi/src/parser.rs

use crate::error::EsiError;
use crate::model::RawSetupFile;
use crate::resolver::{resolve_setup_file, unresolve_setup_file};
use crate::types::Setup;

/// Parses a persisted setup file from its JSON text and resolves its first
/// setup into `Setup`.
///
/// # Errors
/// Returns an `EsiError` if the JSON is malformed or a numeric field cannot
/// be parsed. Objects without a usable index or with sub-items that do not
/// fit their type are dropped, not reported.
pub fn load_setup_from_str(json: &str) -> Result<Setup, EsiError> {
    let raw: RawSetupFile = serde_json::from_str(json)?;
    resolve_setup_file(raw)
}

/// Serializes a `Setup` into pretty-printed JSON in the persisted shape.
pub fn save_setup_to_string(setup: &Setup) -> Result<String, EsiError> {
    Ok(serde_json::to_string_pretty(&unresolve_setup_file(setup))?)
}
