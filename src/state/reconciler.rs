// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound payload decoding.
//!
//! The reconciler owns the [`CoverState`] of one cover. Each inbound message
//! is classified into one or more [`Channel`]s by topic, decoded into a
//! [`StateChange`] and applied. Decoding never mutates: a payload that fails
//! to decode leaves the state exactly as it was.

use std::fmt;

use crate::config::{CoverConfig, TiltConfig};
use crate::config::topic::topic_matches;
use crate::error::{ConfigError, DecodeError};
use crate::range::RangeMapper;
use crate::template::ValueTemplate;
use crate::types::CoverStatus;

use super::{CoverState, StateChange, parse_attributes};

/// Kind of feedback a topic carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Open/closed literals.
    State,
    /// Raw position values.
    Position,
    /// Raw tilt values.
    TiltStatus,
    /// Availability literals.
    Availability,
    /// JSON attribute objects.
    Attributes,
}

impl Channel {
    /// Returns the channel name used in logs and errors.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Position => "position",
            Self::TiltStatus => "tilt status",
            Self::Availability => "availability",
            Self::Attributes => "json attributes",
        }
    }

    /// Returns every channel whose configured topic filter matches `topic`.
    ///
    /// One topic may feed several channels when the configuration shares it.
    #[must_use]
    pub fn classify(config: &CoverConfig, topic: &str) -> Vec<Self> {
        let tilt_status = config.tilt.as_ref().and_then(|t| t.status_topic.as_deref());
        [
            (Self::State, config.state_topic.as_deref()),
            (Self::Position, config.position_topic.as_deref()),
            (Self::TiltStatus, tilt_status),
            (Self::Availability, config.availability_topic.as_deref()),
            (Self::Attributes, config.json_attributes_topic.as_deref()),
        ]
        .into_iter()
        .filter_map(|(channel, filter)| {
            filter
                .filter(|filter| topic_matches(filter, topic))
                .map(|_| channel)
        })
        .collect()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoding rules extracted from a [`CoverConfig`].
#[derive(Debug, Clone)]
struct DecodeRules {
    state_open: String,
    state_closed: String,
    payload_available: String,
    payload_not_available: String,
    value_template: Option<ValueTemplate>,
    position: RangeMapper,
    tilt: RangeMapper,
}

impl DecodeRules {
    fn from_config(config: &CoverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            state_open: config.state_open_literal().to_string(),
            state_closed: config.state_closed_literal().to_string(),
            payload_available: config.payload_available.clone(),
            payload_not_available: config.payload_not_available.clone(),
            value_template: config.value_template.clone(),
            position: config.position_mapper()?,
            tilt: match &config.tilt {
                Some(tilt) => tilt.mapper()?,
                None => TiltConfig::default().mapper()?,
            },
        })
    }

    fn render(&self, payload: &str) -> Result<String, DecodeError> {
        match &self.value_template {
            Some(template) => Ok(template.render(payload)?),
            None => Ok(payload.to_string()),
        }
    }
}

/// Decodes inbound feedback and maintains the cover state.
///
/// # Examples
///
/// ```
/// use mqtt_cover::config::CoverConfig;
/// use mqtt_cover::state::{Channel, PositionStateReconciler};
/// use mqtt_cover::types::{CoverStatus, Percent};
///
/// let config = CoverConfig::new("test")
///     .with_position_topic("get-position-topic")
///     .with_position_range(180, 80);
/// let mut reconciler = PositionStateReconciler::new(&config).unwrap();
///
/// assert!(reconciler.handle(Channel::Position, "120").unwrap());
/// assert_eq!(reconciler.state().position(), Some(Percent::new(40).unwrap()));
/// assert_eq!(reconciler.state().status(), CoverStatus::Open);
///
/// // Bad payloads are rejected without touching the state
/// assert!(reconciler.handle(Channel::Position, "non-numeric").is_err());
/// assert_eq!(reconciler.state().position(), Some(Percent::new(40).unwrap()));
/// ```
#[derive(Debug, Clone)]
pub struct PositionStateReconciler {
    rules: DecodeRules,
    state: CoverState,
}

impl PositionStateReconciler {
    /// Creates a reconciler with an initial state.
    ///
    /// The cover starts unavailable when an availability topic is configured
    /// and available otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRange` if a range in the configuration is
    /// empty.
    pub fn new(config: &CoverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: DecodeRules::from_config(config)?,
            state: CoverState::with_availability(config.availability_topic.is_none()),
        })
    }

    /// Replaces the decoding rules, keeping the current state.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRange` if a range in the configuration is
    /// empty. The previous rules stay in effect in that case.
    pub fn reconfigure(&mut self, config: &CoverConfig) -> Result<(), ConfigError> {
        self.rules = DecodeRules::from_config(config)?;
        Ok(())
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &CoverState {
        &self.state
    }

    /// Decodes a payload received on `channel` into a state change.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeError` describing why the payload was rejected.
    pub fn decode(&self, channel: Channel, payload: &str) -> Result<StateChange, DecodeError> {
        match channel {
            Channel::State => {
                let value = self.rules.render(payload)?;
                if value == self.rules.state_open {
                    Ok(StateChange::status(CoverStatus::Open))
                } else if value == self.rules.state_closed {
                    Ok(StateChange::status(CoverStatus::Closed))
                } else {
                    Err(DecodeError::UnexpectedPayload {
                        channel: channel.as_str(),
                        payload: value,
                    })
                }
            }
            Channel::Position => {
                let raw = parse_number(&self.rules.render(payload)?)?;
                let position = self.rules.position.to_percent(raw);
                Ok(StateChange::position_feedback(position))
            }
            Channel::TiltStatus => {
                let raw = parse_number(payload)?;
                Ok(StateChange::tilt(self.rules.tilt.to_percent(raw)))
            }
            Channel::Availability => {
                if payload == self.rules.payload_available {
                    Ok(StateChange::Availability(true))
                } else if payload == self.rules.payload_not_available {
                    Ok(StateChange::Availability(false))
                } else {
                    Err(DecodeError::UnexpectedPayload {
                        channel: channel.as_str(),
                        payload: payload.to_string(),
                    })
                }
            }
            Channel::Attributes => parse_attributes(payload).map(StateChange::Attributes),
        }
    }

    /// Applies a change and returns whether the state actually changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        self.state.apply(change)
    }

    /// Decodes and applies a payload in one step.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeError` if the payload was rejected; the state is
    /// unchanged in that case.
    pub fn handle(&mut self, channel: Channel, payload: &str) -> Result<bool, DecodeError> {
        let change = self.decode(channel, payload)?;
        Ok(self.apply(&change))
    }
}

/// Parses a finite base-10 integer or float.
fn parse_number(value: &str) -> Result<f64, DecodeError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|raw| raw.is_finite())
        .ok_or_else(|| DecodeError::NotNumeric(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateError;
    use crate::types::Percent;

    fn pct(value: u8) -> Percent {
        Percent::new(value).unwrap()
    }

    fn reconciler(config: &CoverConfig) -> PositionStateReconciler {
        PositionStateReconciler::new(config).unwrap()
    }

    #[test]
    fn state_literals() {
        let config = CoverConfig::new("test").with_state_topic("state-topic");
        let mut r = reconciler(&config);
        assert_eq!(r.state().status(), CoverStatus::Unknown);

        assert!(r.handle(Channel::State, "OPEN").unwrap());
        assert_eq!(r.state().status(), CoverStatus::Open);

        assert!(r.handle(Channel::State, "CLOSE").unwrap());
        assert_eq!(r.state().status(), CoverStatus::Closed);
    }

    #[test]
    fn state_literals_are_case_sensitive() {
        let config = CoverConfig::new("test")
            .with_state_topic("state-topic")
            .with_state_literals("open", "closed");
        let mut r = reconciler(&config);

        assert!(matches!(
            r.handle(Channel::State, "OPEN"),
            Err(DecodeError::UnexpectedPayload {
                channel: "state",
                ..
            })
        ));
        assert_eq!(r.state().status(), CoverStatus::Unknown);
        assert!(r.handle(Channel::State, "closed").unwrap());
    }

    #[test]
    fn value_template_applies_to_state() {
        let config = CoverConfig::new("test")
            .with_state_topic("state-topic")
            .with_value_template(ValueTemplate::new(|payload| {
                let value: serde_json::Value =
                    serde_json::from_str(payload).map_err(|e| TemplateError::new(e.to_string()))?;
                value["state"]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| TemplateError::new("state missing"))
            }));
        let mut r = reconciler(&config);

        r.handle(Channel::State, r#"{"state": "OPEN"}"#).unwrap();
        assert_eq!(r.state().status(), CoverStatus::Open);

        assert!(matches!(
            r.handle(Channel::State, "garbage"),
            Err(DecodeError::Template(_))
        ));
        assert_eq!(r.state().status(), CoverStatus::Open);
    }

    #[test]
    fn position_updates_status() {
        let config = CoverConfig::new("test").with_position_topic("get-position-topic");
        let mut r = reconciler(&config);

        r.handle(Channel::Position, "0").unwrap();
        assert_eq!(r.state().position(), Some(Percent::CLOSED));
        assert_eq!(r.state().status(), CoverStatus::Closed);

        r.handle(Channel::Position, "50").unwrap();
        assert_eq!(r.state().status(), CoverStatus::Open);

        r.handle(Channel::Position, "100").unwrap();
        assert_eq!(r.state().position(), Some(Percent::OPEN));
        assert_eq!(r.state().status(), CoverStatus::Open);
    }

    #[test]
    fn position_accepts_floats_and_clamps() {
        let config = CoverConfig::new("test").with_position_topic("p");
        let mut r = reconciler(&config);

        r.handle(Channel::Position, "43.6").unwrap();
        assert_eq!(r.state().position(), Some(pct(44)));

        r.handle(Channel::Position, "150").unwrap();
        assert_eq!(r.state().position(), Some(Percent::OPEN));

        r.handle(Channel::Position, "-20").unwrap();
        assert_eq!(r.state().position(), Some(Percent::CLOSED));
    }

    #[test]
    fn non_numeric_position_keeps_state() {
        let config = CoverConfig::new("test").with_position_topic("p");
        let mut r = reconciler(&config);
        r.handle(Channel::Position, "50").unwrap();

        for payload in ["non-numeric", "", "inf", "NaN", "0x10"] {
            assert!(
                matches!(
                    r.handle(Channel::Position, payload),
                    Err(DecodeError::NotNumeric(_))
                ),
                "payload {payload:?}"
            );
            assert_eq!(r.state().position(), Some(pct(50)));
            assert_eq!(r.state().status(), CoverStatus::Open);
        }
    }

    #[test]
    fn duplicate_position_is_noop() {
        let config = CoverConfig::new("test").with_position_topic("p");
        let mut r = reconciler(&config);
        assert!(r.handle(Channel::Position, "42").unwrap());
        assert!(!r.handle(Channel::Position, "42").unwrap());
    }

    #[test]
    fn inverted_position_axis() {
        let config = CoverConfig::new("test")
            .with_position_topic("p")
            .with_position_range(0, 100);
        let mut r = reconciler(&config);

        r.handle(Channel::Position, "100").unwrap();
        assert_eq!(r.state().position(), Some(Percent::CLOSED));
        assert_eq!(r.state().status(), CoverStatus::Closed);

        r.handle(Channel::Position, "0").unwrap();
        assert_eq!(r.state().position(), Some(Percent::OPEN));
        assert_eq!(r.state().status(), CoverStatus::Open);
    }

    #[test]
    fn templated_position() {
        let config = CoverConfig::new("test")
            .with_position_topic("p")
            .with_value_template(ValueTemplate::new(|payload| {
                let raw: f64 = payload
                    .parse()
                    .map_err(|_| TemplateError::new("not a number"))?;
                #[allow(clippy::cast_possible_truncation)]
                let scaled = (raw * 0.01) as i64;
                Ok(scaled.to_string())
            }));
        let mut r = reconciler(&config);

        r.handle(Channel::Position, "10000").unwrap();
        assert_eq!(r.state().position(), Some(Percent::OPEN));

        r.handle(Channel::Position, "5000").unwrap();
        assert_eq!(r.state().position(), Some(pct(50)));
    }

    #[test]
    fn tilt_uses_its_own_range() {
        let config = CoverConfig::new("test")
            .with_tilt_status_topic("tilt-status")
            .with_tilt_range(0, 50, false);
        let mut r = reconciler(&config);

        r.handle(Channel::TiltStatus, "25").unwrap();
        assert_eq!(r.state().tilt(), Some(pct(50)));

        r.handle(Channel::TiltStatus, "50").unwrap();
        assert_eq!(r.state().tilt(), Some(Percent::OPEN));
        assert_eq!(r.state().status(), CoverStatus::Unknown);

        assert!(r.handle(Channel::TiltStatus, "non-numeric").is_err());
        assert_eq!(r.state().tilt(), Some(Percent::OPEN));
    }

    #[test]
    fn tilt_inverted() {
        let config = CoverConfig::new("test")
            .with_tilt_status_topic("tilt-status")
            .with_tilt_range(0, 100, true);
        let mut r = reconciler(&config);

        r.handle(Channel::TiltStatus, "44").unwrap();
        assert_eq!(r.state().tilt(), Some(pct(56)));
    }

    #[test]
    fn availability_defaults() {
        let config = CoverConfig::new("test").with_availability_topic("availability-topic");
        let mut r = reconciler(&config);
        assert!(!r.state().is_available());

        r.handle(Channel::Availability, "online").unwrap();
        assert!(r.state().is_available());

        r.handle(Channel::Availability, "offline").unwrap();
        assert!(!r.state().is_available());

        assert!(r.handle(Channel::Availability, "maybe").is_err());
        assert!(!r.state().is_available());
    }

    #[test]
    fn availability_custom_payloads() {
        let config = CoverConfig::new("test")
            .with_availability_topic("availability-topic")
            .with_availability_payloads("good", "nogood");
        let mut r = reconciler(&config);

        r.handle(Channel::Availability, "good").unwrap();
        assert!(r.state().is_available());
        assert!(r.handle(Channel::Availability, "online").is_err());

        r.handle(Channel::Availability, "nogood").unwrap();
        assert!(!r.state().is_available());
    }

    #[test]
    fn available_without_availability_topic() {
        let r = reconciler(&CoverConfig::new("test").with_state_topic("s"));
        assert!(r.state().is_available());
    }

    #[test]
    fn attributes() {
        let config = CoverConfig::new("test").with_json_attributes_topic("attr-topic");
        let mut r = reconciler(&config);

        assert!(r.handle(Channel::Attributes, r#"{ "val": "100" }"#).unwrap());
        assert_eq!(r.state().attributes()["val"], "100");

        assert!(r.handle(Channel::Attributes, r#"[{ "val": "100" }]"#).is_err());
        assert!(r.handle(Channel::Attributes, "This is not JSON").is_err());
        assert_eq!(r.state().attributes().len(), 1);
    }

    #[test]
    fn reconfigure_keeps_state() {
        let config = CoverConfig::new("test").with_position_topic("p");
        let mut r = reconciler(&config);
        r.handle(Channel::Position, "40").unwrap();

        let config = config.with_position_range(180, 80);
        r.reconfigure(&config).unwrap();
        assert_eq!(r.state().position(), Some(pct(40)));

        r.handle(Channel::Position, "120").unwrap();
        assert_eq!(r.state().position(), Some(pct(40)));
        r.handle(Channel::Position, "180").unwrap();
        assert_eq!(r.state().position(), Some(Percent::OPEN));
    }

    #[test]
    fn classify_shared_and_wildcard_topics() {
        let config = CoverConfig::new("test")
            .with_state_topic("cover/state")
            .with_position_topic("cover/state")
            .with_availability_topic("cover/+/availability")
            .with_json_attributes_topic("attrs/#");

        assert_eq!(
            Channel::classify(&config, "cover/state"),
            vec![Channel::State, Channel::Position]
        );
        assert_eq!(
            Channel::classify(&config, "cover/garage/availability"),
            vec![Channel::Availability]
        );
        assert_eq!(
            Channel::classify(&config, "attrs/a/b"),
            vec![Channel::Attributes]
        );
        assert!(Channel::classify(&config, "elsewhere").is_empty());
    }
}
