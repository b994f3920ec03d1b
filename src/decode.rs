//! JSON decoding of CLI output.

use serde_json::Value;

use crate::error::OcError;

/// Parse CLI output into an untyped JSON value.
///
/// The shape is whatever the CLI printed; callers interpret it.
pub fn parse_json(text: &str) -> crate::Result<Value> {
    serde_json::from_str(text).map_err(OcError::Parse)
}
