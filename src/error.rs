// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the cover library.
//!
//! Errors are split by the moment they can happen: configuration problems are
//! caught before any message is processed, decode problems are logged and
//! swallowed by the entity, and protocol problems are returned to whoever
//! issued the command.

use thiserror::Error;

use crate::template::TemplateError;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The cover configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// An inbound payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An encode template failed while building a command.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The cover has no topic configured for the requested command.
    #[error("cover does not support {0}")]
    CapabilityNotSupported(&'static str),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },
}

/// Errors detected while validating a cover configuration.
///
/// None of these can occur once a cover has been constructed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Both bounds of a range are equal, so no percentage can be computed.
    #[error("{axis} range is empty: both bounds are {bound}")]
    EmptyRange {
        /// Which axis the range belongs to (`position` or `tilt`).
        axis: &'static str,
        /// The shared bound value.
        bound: f64,
    },

    /// A topic is empty or uses wildcards where they are not allowed.
    #[error("invalid {field} {topic:?}: {reason}")]
    InvalidTopic {
        /// The configuration field holding the topic.
        field: &'static str,
        /// The offending topic.
        topic: String,
        /// Why the topic was rejected.
        reason: &'static str,
    },

    /// Quality of service outside 0-2.
    #[error("invalid qos {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    /// Unknown device class name.
    #[error("invalid device class: {0}")]
    InvalidDeviceClass(String),

    /// The JSON configuration could not be parsed.
    #[error("invalid JSON configuration: {0}")]
    Json(String),
}

/// Errors related to protocol communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT connection or communication failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors raised while decoding an inbound payload.
///
/// A decode error never changes the cover state: the field it targeted keeps
/// its previous value.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A position or tilt payload was not a finite number.
    #[error("payload is not numeric: {0:?}")]
    NotNumeric(String),

    /// A state or availability payload matched none of the configured literals.
    #[error("unexpected payload on {channel} topic: {payload:?}")]
    UnexpectedPayload {
        /// Channel the payload arrived on.
        channel: &'static str,
        /// The payload as received (after templating).
        payload: String,
    },

    /// The value template failed to render.
    #[error("value template failed: {0}")]
    Template(#[from] TemplateError),

    /// An attributes payload was not valid JSON.
    #[error("erroneous JSON: {payload}")]
    Json {
        /// The raw payload.
        payload: String,
        /// The parser error.
        #[source]
        source: serde_json::Error,
    },

    /// An attributes payload was valid JSON but not an object.
    #[error("JSON result was not a dictionary: {0}")]
    AttributesNotObject(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
