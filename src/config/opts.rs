//! Decoding of the JVM option payloads the scheduler renders into the
//! positional arguments. A payload is wrapped in double quotes and has
//! every `=` escaped as `&equals;` before base64 encoding; the
//! per-component payload additionally decodes to a JSON object whose keys
//! and values are themselves base64.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptsDecodeError {
    #[error("invalid base64 payload")]
    InvalidBase64(#[source] base64::DecodeError),

    #[error("decoded payload is not utf-8")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    #[error("component options payload is not a json object of strings")]
    InvalidJson(#[source] serde_json::Error),
}

/// Strips the surrounding quotes, restores `=`, and base64-decodes.
pub fn decode_escaped(payload: &str) -> Result<String, OptsDecodeError> {
    let unescaped = payload.trim_matches('"').replace("&equals;", "=");
    decode_base64_utf8(&unescaped)
}

/// Decodes the per-component option map. An empty payload is an empty map.
pub fn decode_component_opts(payload: &str) -> Result<HashMap<String, String>, OptsDecodeError> {
    let json = decode_escaped(payload)?;
    if json.is_empty() {
        return Ok(HashMap::new());
    }

    let encoded: HashMap<String, String> =
        serde_json::from_str(&json).map_err(OptsDecodeError::InvalidJson)?;
    encoded
        .into_iter()
        .map(|(component, options)| {
            Ok((
                decode_base64_utf8(&component)?,
                decode_base64_utf8(&options)?,
            ))
        })
        .collect()
}

fn decode_base64_utf8(payload: &str) -> Result<String, OptsDecodeError> {
    let bytes = STANDARD
        .decode(payload)
        .map_err(OptsDecodeError::InvalidBase64)?;
    String::from_utf8(bytes).map_err(OptsDecodeError::InvalidUtf8)
}
