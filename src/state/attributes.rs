// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON attribute payloads.

use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Parses a JSON attributes payload.
///
/// Only JSON objects are accepted; their keys are later merged into the
/// cover's attribute map.
///
/// # Errors
///
/// - `DecodeError::Json` if the payload is not valid JSON
/// - `DecodeError::AttributesNotObject` if it is valid JSON but not an object
///
/// # Examples
///
/// ```
/// use mqtt_cover::state::parse_attributes;
///
/// let attributes = parse_attributes(r#"{"val": "100"}"#).unwrap();
/// assert_eq!(attributes["val"], "100");
///
/// assert!(parse_attributes(r#"[{"val": "100"}]"#).is_err());
/// assert!(parse_attributes("This is not JSON").is_err());
/// ```
pub fn parse_attributes(payload: &str) -> Result<Map<String, Value>, DecodeError> {
    let value: Value = serde_json::from_str(payload).map_err(|source| DecodeError::Json {
        payload: payload.to_string(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeError::AttributesNotObject(payload.to_string())),
    }
}
