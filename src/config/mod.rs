// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover configuration.
//!
//! A [`CoverConfig`] is built either programmatically with the `with_*`
//! methods or deserialized from the hub's JSON configuration. Deserialized
//! configurations are validated immediately; programmatic ones are validated
//! when the cover is constructed.
//!
//! # Examples
//!
//! ```
//! use mqtt_cover::config::CoverConfig;
//!
//! let config = CoverConfig::from_json(
//!     r#"{
//!         "name": "Garage",
//!         "command_topic": "garage/set",
//!         "position_topic": "garage/position",
//!         "position_open": 180,
//!         "position_closed": 80,
//!         "qos": 1
//!     }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.name, "Garage");
//! assert_eq!(config.position_open, 180);
//! assert!(!config.is_optimistic());
//! ```

mod features;
pub(crate) mod topic;

pub use features::SupportedFeatures;

use crate::error::ConfigError;
use crate::range::RangeMapper;
use crate::template::{PositionTemplate, ValueTemplate};
use crate::types::{DeviceClass, QualityOfService};

/// Default entity name.
pub const DEFAULT_NAME: &str = "MQTT Cover";
/// Default open command payload.
pub const DEFAULT_PAYLOAD_OPEN: &str = "OPEN";
/// Default close command payload.
pub const DEFAULT_PAYLOAD_CLOSE: &str = "CLOSE";
/// Default stop command payload.
pub const DEFAULT_PAYLOAD_STOP: &str = "STOP";
/// Default availability payload.
pub const DEFAULT_PAYLOAD_AVAILABLE: &str = "online";
/// Default unavailability payload.
pub const DEFAULT_PAYLOAD_NOT_AVAILABLE: &str = "offline";
/// Default raw value of a fully open cover.
pub const DEFAULT_POSITION_OPEN: i64 = 100;
/// Default raw value of a fully closed cover.
pub const DEFAULT_POSITION_CLOSED: i64 = 0;

/// Configuration of one MQTT cover.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(try_from = "CoverConfigPayload")]
pub struct CoverConfig {
    /// Entity display name.
    pub name: String,
    /// Optional unique identifier.
    pub unique_id: Option<String>,
    /// Topic reporting open/closed state.
    pub state_topic: Option<String>,
    /// Topic accepting open/close/stop payloads.
    pub command_topic: Option<String>,
    /// Topic reporting the raw position.
    pub position_topic: Option<String>,
    /// Topic accepting a raw target position.
    pub set_position_topic: Option<String>,
    /// Topic reporting availability.
    pub availability_topic: Option<String>,
    /// Topic carrying JSON attribute objects.
    pub json_attributes_topic: Option<String>,
    /// Payload published to open.
    pub payload_open: String,
    /// Payload published to close.
    pub payload_close: String,
    /// Payload published to stop.
    pub payload_stop: String,
    /// State literal meaning open (defaults to `payload_open`).
    pub state_open: Option<String>,
    /// State literal meaning closed (defaults to `payload_close`).
    pub state_closed: Option<String>,
    /// Availability payload meaning online.
    pub payload_available: String,
    /// Availability payload meaning offline.
    pub payload_not_available: String,
    /// Raw position of a fully open cover.
    pub position_open: i64,
    /// Raw position of a fully closed cover.
    pub position_closed: i64,
    /// Assume commands succeed instead of waiting for feedback.
    pub optimistic: bool,
    /// Quality of service for subscriptions and publishes.
    pub qos: QualityOfService,
    /// Retain flag for publishes.
    pub retain: bool,
    /// Kind of physical cover.
    pub device_class: Option<DeviceClass>,
    /// Decodes state and position payloads.
    pub value_template: Option<ValueTemplate>,
    /// Encodes set-position payloads.
    pub set_position_template: Option<PositionTemplate>,
    /// Tilt capability, present when a tilt topic is configured.
    pub tilt: Option<TiltConfig>,
}

/// Tilt capability of a cover with slats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiltConfig {
    /// Topic accepting raw tilt values.
    pub command_topic: Option<String>,
    /// Topic reporting the raw tilt value.
    pub status_topic: Option<String>,
    /// Raw value published by open-tilt.
    pub opened_value: i64,
    /// Raw value published by close-tilt.
    pub closed_value: i64,
    /// Lower raw bound of the tilt range.
    pub min: i64,
    /// Upper raw bound of the tilt range.
    pub max: i64,
    /// Mirror the tilt percentage.
    pub invert: bool,
    /// Assume tilt commands succeed; defaults to "no status topic".
    pub optimistic: Option<bool>,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            command_topic: None,
            status_topic: None,
            opened_value: 100,
            closed_value: 0,
            min: 0,
            max: 100,
            invert: false,
            optimistic: None,
        }
    }
}

impl TiltConfig {
    /// Returns whether tilt commands update the tilt optimistically.
    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        self.optimistic.unwrap_or(self.status_topic.is_none())
    }

    /// Builds the tilt range mapper.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRange` if `min == max`.
    pub fn mapper(&self) -> Result<RangeMapper, ConfigError> {
        RangeMapper::tilt(self.min, self.max, self.invert)
    }
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NAME)
    }
}

impl CoverConfig {
    /// Creates a configuration with default payloads and no topics.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique_id: None,
            state_topic: None,
            command_topic: None,
            position_topic: None,
            set_position_topic: None,
            availability_topic: None,
            json_attributes_topic: None,
            payload_open: DEFAULT_PAYLOAD_OPEN.to_string(),
            payload_close: DEFAULT_PAYLOAD_CLOSE.to_string(),
            payload_stop: DEFAULT_PAYLOAD_STOP.to_string(),
            state_open: None,
            state_closed: None,
            payload_available: DEFAULT_PAYLOAD_AVAILABLE.to_string(),
            payload_not_available: DEFAULT_PAYLOAD_NOT_AVAILABLE.to_string(),
            position_open: DEFAULT_POSITION_OPEN,
            position_closed: DEFAULT_POSITION_CLOSED,
            optimistic: false,
            qos: QualityOfService::default(),
            retain: false,
            device_class: None,
            value_template: None,
            set_position_template: None,
            tilt: None,
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the JSON is malformed or any field is
    /// rejected by validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
    }

    // ========== Topics ==========

    /// Sets the state topic.
    #[must_use]
    pub fn with_state_topic(mut self, topic: impl Into<String>) -> Self {
        self.state_topic = Some(topic.into());
        self
    }

    /// Sets the command topic.
    #[must_use]
    pub fn with_command_topic(mut self, topic: impl Into<String>) -> Self {
        self.command_topic = Some(topic.into());
        self
    }

    /// Sets the position feedback topic.
    #[must_use]
    pub fn with_position_topic(mut self, topic: impl Into<String>) -> Self {
        self.position_topic = Some(topic.into());
        self
    }

    /// Sets the set-position topic.
    #[must_use]
    pub fn with_set_position_topic(mut self, topic: impl Into<String>) -> Self {
        self.set_position_topic = Some(topic.into());
        self
    }

    /// Sets the availability topic.
    #[must_use]
    pub fn with_availability_topic(mut self, topic: impl Into<String>) -> Self {
        self.availability_topic = Some(topic.into());
        self
    }

    /// Sets the JSON attributes topic.
    #[must_use]
    pub fn with_json_attributes_topic(mut self, topic: impl Into<String>) -> Self {
        self.json_attributes_topic = Some(topic.into());
        self
    }

    /// Sets the tilt command topic, enabling the tilt capability.
    #[must_use]
    pub fn with_tilt_command_topic(mut self, topic: impl Into<String>) -> Self {
        self.tilt.get_or_insert_with(TiltConfig::default).command_topic = Some(topic.into());
        self
    }

    /// Sets the tilt status topic, enabling the tilt capability.
    #[must_use]
    pub fn with_tilt_status_topic(mut self, topic: impl Into<String>) -> Self {
        self.tilt.get_or_insert_with(TiltConfig::default).status_topic = Some(topic.into());
        self
    }

    // ========== Payloads and ranges ==========

    /// Sets the open/close/stop command payloads.
    #[must_use]
    pub fn with_payloads(
        mut self,
        open: impl Into<String>,
        close: impl Into<String>,
        stop: impl Into<String>,
    ) -> Self {
        self.payload_open = open.into();
        self.payload_close = close.into();
        self.payload_stop = stop.into();
        self
    }

    /// Sets the literals reported on the state topic.
    #[must_use]
    pub fn with_state_literals(mut self, open: impl Into<String>, closed: impl Into<String>) -> Self {
        self.state_open = Some(open.into());
        self.state_closed = Some(closed.into());
        self
    }

    /// Sets the availability payloads.
    #[must_use]
    pub fn with_availability_payloads(
        mut self,
        available: impl Into<String>,
        not_available: impl Into<String>,
    ) -> Self {
        self.payload_available = available.into();
        self.payload_not_available = not_available.into();
        self
    }

    /// Sets the raw position bounds.
    #[must_use]
    pub fn with_position_range(mut self, open: i64, closed: i64) -> Self {
        self.position_open = open;
        self.position_closed = closed;
        self
    }

    /// Sets the raw values published by open-tilt and close-tilt.
    #[must_use]
    pub fn with_tilt_values(mut self, opened: i64, closed: i64) -> Self {
        let tilt = self.tilt.get_or_insert_with(TiltConfig::default);
        tilt.opened_value = opened;
        tilt.closed_value = closed;
        self
    }

    /// Sets the raw tilt range and its inversion flag.
    #[must_use]
    pub fn with_tilt_range(mut self, min: i64, max: i64, invert: bool) -> Self {
        let tilt = self.tilt.get_or_insert_with(TiltConfig::default);
        tilt.min = min;
        tilt.max = max;
        tilt.invert = invert;
        self
    }

    /// Forces optimistic tilt on or off.
    #[must_use]
    pub fn with_tilt_optimistic(mut self, optimistic: bool) -> Self {
        self.tilt.get_or_insert_with(TiltConfig::default).optimistic = Some(optimistic);
        self
    }

    // ========== Behaviour ==========

    /// Forces optimistic mode.
    #[must_use]
    pub fn with_optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = optimistic;
        self
    }

    /// Sets the quality of service.
    #[must_use]
    pub fn with_qos(mut self, qos: QualityOfService) -> Self {
        self.qos = qos;
        self
    }

    /// Sets the retain flag.
    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Sets the device class.
    #[must_use]
    pub fn with_device_class(mut self, class: DeviceClass) -> Self {
        self.device_class = Some(class);
        self
    }

    /// Sets the unique identifier.
    #[must_use]
    pub fn with_unique_id(mut self, id: impl Into<String>) -> Self {
        self.unique_id = Some(id.into());
        self
    }

    /// Sets the template decoding state and position payloads.
    #[must_use]
    pub fn with_value_template(mut self, template: ValueTemplate) -> Self {
        self.value_template = Some(template);
        self
    }

    /// Sets the template encoding set-position payloads.
    #[must_use]
    pub fn with_set_position_template(mut self, template: PositionTemplate) -> Self {
        self.set_position_template = Some(template);
        self
    }

    // ========== Derived values ==========

    /// Returns whether commands update state without waiting for feedback.
    ///
    /// A cover with neither a state topic nor a position topic is always
    /// optimistic.
    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        self.optimistic || (self.state_topic.is_none() && self.position_topic.is_none())
    }

    /// Returns the state literal meaning open.
    #[must_use]
    pub fn state_open_literal(&self) -> &str {
        self.state_open.as_deref().unwrap_or(&self.payload_open)
    }

    /// Returns the state literal meaning closed.
    #[must_use]
    pub fn state_closed_literal(&self) -> &str {
        self.state_closed.as_deref().unwrap_or(&self.payload_close)
    }

    /// Returns the features enabled by the configured topics.
    #[must_use]
    pub fn features(&self) -> SupportedFeatures {
        SupportedFeatures::from_config(self)
    }

    /// Builds the position range mapper.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRange` if both position bounds are equal.
    pub fn position_mapper(&self) -> Result<RangeMapper, ConfigError> {
        RangeMapper::position(self.position_open, self.position_closed)
    }

    /// Returns every topic the cover subscribes to, without duplicates, in
    /// subscription order.
    #[must_use]
    pub fn inbound_topics(&self) -> Vec<&str> {
        let tilt_status = self.tilt.as_ref().and_then(|t| t.status_topic.as_deref());
        let mut topics: Vec<&str> = Vec::new();
        for topic in [
            self.state_topic.as_deref(),
            self.position_topic.as_deref(),
            tilt_status,
            self.availability_topic.as_deref(),
            self.json_attributes_topic.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
        topics
    }

    /// Validates topics and ranges.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let publish = [
            ("command_topic", self.command_topic.as_deref()),
            ("set_position_topic", self.set_position_topic.as_deref()),
            (
                "tilt_command_topic",
                self.tilt.as_ref().and_then(|t| t.command_topic.as_deref()),
            ),
        ];
        for (field, topic) in publish {
            if let Some(topic) = topic {
                topic::validate_publish_topic(field, topic)?;
            }
        }

        let subscribe = [
            ("state_topic", self.state_topic.as_deref()),
            ("position_topic", self.position_topic.as_deref()),
            ("availability_topic", self.availability_topic.as_deref()),
            ("json_attributes_topic", self.json_attributes_topic.as_deref()),
            (
                "tilt_status_topic",
                self.tilt.as_ref().and_then(|t| t.status_topic.as_deref()),
            ),
        ];
        for (field, topic) in subscribe {
            if let Some(topic) = topic {
                topic::validate_subscribe_topic(field, topic)?;
            }
        }

        self.position_mapper()?;
        if let Some(tilt) = &self.tilt {
            tilt.mapper()?;
        }
        Ok(())
    }
}

/// Flat JSON shape of a cover configuration.
#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct CoverConfigPayload {
    name: String,
    unique_id: Option<String>,
    state_topic: Option<String>,
    command_topic: Option<String>,
    #[serde(alias = "get_position_topic")]
    position_topic: Option<String>,
    set_position_topic: Option<String>,
    availability_topic: Option<String>,
    json_attributes_topic: Option<String>,
    payload_open: String,
    payload_close: String,
    payload_stop: String,
    state_open: Option<String>,
    state_closed: Option<String>,
    payload_available: String,
    payload_not_available: String,
    position_open: i64,
    position_closed: i64,
    optimistic: bool,
    qos: QualityOfService,
    retain: bool,
    device_class: Option<String>,
    tilt_command_topic: Option<String>,
    tilt_status_topic: Option<String>,
    #[serde(alias = "tilt_open_position")]
    tilt_opened_value: i64,
    #[serde(alias = "tilt_closed_position")]
    tilt_closed_value: i64,
    tilt_min: i64,
    tilt_max: i64,
    tilt_optimistic: Option<bool>,
    tilt_invert_state: bool,
}

impl Default for CoverConfigPayload {
    fn default() -> Self {
        let tilt = TiltConfig::default();
        Self {
            name: DEFAULT_NAME.to_string(),
            unique_id: None,
            state_topic: None,
            command_topic: None,
            position_topic: None,
            set_position_topic: None,
            availability_topic: None,
            json_attributes_topic: None,
            payload_open: DEFAULT_PAYLOAD_OPEN.to_string(),
            payload_close: DEFAULT_PAYLOAD_CLOSE.to_string(),
            payload_stop: DEFAULT_PAYLOAD_STOP.to_string(),
            state_open: None,
            state_closed: None,
            payload_available: DEFAULT_PAYLOAD_AVAILABLE.to_string(),
            payload_not_available: DEFAULT_PAYLOAD_NOT_AVAILABLE.to_string(),
            position_open: DEFAULT_POSITION_OPEN,
            position_closed: DEFAULT_POSITION_CLOSED,
            optimistic: false,
            qos: QualityOfService::default(),
            retain: false,
            device_class: None,
            tilt_command_topic: None,
            tilt_status_topic: None,
            tilt_opened_value: tilt.opened_value,
            tilt_closed_value: tilt.closed_value,
            tilt_min: tilt.min,
            tilt_max: tilt.max,
            tilt_optimistic: None,
            tilt_invert_state: tilt.invert,
        }
    }
}

impl TryFrom<CoverConfigPayload> for CoverConfig {
    type Error = ConfigError;

    fn try_from(payload: CoverConfigPayload) -> Result<Self, Self::Error> {
        let device_class = payload
            .device_class
            .as_deref()
            .map(str::parse::<DeviceClass>)
            .transpose()?;

        let tilt = (payload.tilt_command_topic.is_some() || payload.tilt_status_topic.is_some())
            .then(|| TiltConfig {
                command_topic: payload.tilt_command_topic,
                status_topic: payload.tilt_status_topic,
                opened_value: payload.tilt_opened_value,
                closed_value: payload.tilt_closed_value,
                min: payload.tilt_min,
                max: payload.tilt_max,
                invert: payload.tilt_invert_state,
                optimistic: payload.tilt_optimistic,
            });

        let config = Self {
            name: payload.name,
            unique_id: payload.unique_id,
            state_topic: payload.state_topic,
            command_topic: payload.command_topic,
            position_topic: payload.position_topic,
            set_position_topic: payload.set_position_topic,
            availability_topic: payload.availability_topic,
            json_attributes_topic: payload.json_attributes_topic,
            payload_open: payload.payload_open,
            payload_close: payload.payload_close,
            payload_stop: payload.payload_stop,
            state_open: payload.state_open,
            state_closed: payload.state_closed,
            payload_available: payload.payload_available,
            payload_not_available: payload.payload_not_available,
            position_open: payload.position_open,
            position_closed: payload.position_closed,
            optimistic: payload.optimistic,
            qos: payload.qos,
            retain: payload.retain,
            device_class,
            value_template: None,
            set_position_template: None,
            tilt,
        };
        config.validate()?;
        Ok(config)
    }
}
