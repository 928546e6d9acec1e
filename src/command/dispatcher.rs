// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command encoding.

use crate::config::{CoverConfig, TiltConfig};
use crate::error::{ConfigError, Error, Result};
use crate::range::RangeMapper;
use crate::state::StateChange;
use crate::template::PositionTemplate;
use crate::types::{CoverStatus, Percent, QualityOfService};

use super::{CoverCommand, Dispatch, OutboundMessage};

/// Tilt encoding rules.
#[derive(Debug, Clone)]
struct TiltRules {
    command_topic: Option<String>,
    opened_value: i64,
    closed_value: i64,
    mapper: RangeMapper,
    optimistic: bool,
}

impl TiltRules {
    fn from_config(tilt: &TiltConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            command_topic: tilt.command_topic.clone(),
            opened_value: tilt.opened_value,
            closed_value: tilt.closed_value,
            mapper: tilt.mapper()?,
            optimistic: tilt.is_optimistic(),
        })
    }
}

/// Turns cover commands into outbound messages.
///
/// The dispatcher is stateless: it never reads the current cover state, and
/// the optimistic change it returns must only be applied once the message has
/// actually been published.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    command_topic: Option<String>,
    set_position_topic: Option<String>,
    payload_open: String,
    payload_close: String,
    payload_stop: String,
    position_open: i64,
    position_closed: i64,
    has_position_feedback: bool,
    optimistic: bool,
    qos: QualityOfService,
    retain: bool,
    position: RangeMapper,
    set_position_template: Option<PositionTemplate>,
    tilt: Option<TiltRules>,
}

impl CommandDispatcher {
    /// Creates a dispatcher for a configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRange` if a range in the configuration is
    /// empty.
    pub fn new(config: &CoverConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            command_topic: config.command_topic.clone(),
            set_position_topic: config.set_position_topic.clone(),
            payload_open: config.payload_open.clone(),
            payload_close: config.payload_close.clone(),
            payload_stop: config.payload_stop.clone(),
            position_open: config.position_open,
            position_closed: config.position_closed,
            has_position_feedback: config.position_topic.is_some(),
            optimistic: config.is_optimistic(),
            qos: config.qos,
            retain: config.retain,
            position: config.position_mapper()?,
            set_position_template: config.set_position_template.clone(),
            tilt: config.tilt.as_ref().map(TiltRules::from_config).transpose()?,
        })
    }

    /// Returns whether open/close/set-position update state optimistically.
    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        self.optimistic
    }

    /// Returns whether tilt commands update state optimistically.
    #[must_use]
    pub fn is_tilt_optimistic(&self) -> bool {
        self.tilt.as_ref().is_some_and(|t| t.optimistic)
    }

    /// Encodes a command.
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityNotSupported` if the topic the command needs is
    ///   not configured
    /// - `Error::Template` if the set-position template fails to render
    pub fn dispatch(&self, command: CoverCommand) -> Result<Dispatch> {
        match command {
            CoverCommand::Open => self.open_close(command, &self.payload_open, true),
            CoverCommand::Close => self.open_close(command, &self.payload_close, false),
            CoverCommand::Stop => {
                let topic = require(self.command_topic.as_deref(), command)?;
                Ok(Dispatch {
                    message: self.message(topic, self.payload_stop.clone()),
                    optimistic: None,
                })
            }
            CoverCommand::SetPosition(target) => self.set_position(command, target),
            CoverCommand::OpenTilt => {
                let tilt = self.tilt_rules(command)?;
                self.tilt_value(command, tilt, tilt.opened_value)
            }
            CoverCommand::CloseTilt => {
                let tilt = self.tilt_rules(command)?;
                self.tilt_value(command, tilt, tilt.closed_value)
            }
            CoverCommand::SetTilt(target) => {
                let tilt = self.tilt_rules(command)?;
                let topic = require(tilt.command_topic.as_deref(), command)?;
                let payload = tilt.mapper.from_percent(target).to_string();
                Ok(Dispatch {
                    message: self.message(topic, payload),
                    optimistic: tilt.optimistic.then(|| StateChange::tilt(target)),
                })
            }
        }
    }

    fn open_close(&self, command: CoverCommand, payload: &str, open: bool) -> Result<Dispatch> {
        let topic = require(self.command_topic.as_deref(), command)?;
        let optimistic = self.optimistic.then(|| {
            let (status, raw) = if open {
                (CoverStatus::Open, self.position_open)
            } else {
                (CoverStatus::Closed, self.position_closed)
            };
            let mut changes = vec![StateChange::status(status)];
            if self.has_position_feedback {
                #[allow(clippy::cast_precision_loss)]
                let position = self.position.to_percent(raw as f64);
                changes.push(StateChange::position(position));
            }
            StateChange::batch(changes)
        });
        Ok(Dispatch {
            message: self.message(topic, payload.to_string()),
            optimistic,
        })
    }

    fn set_position(&self, command: CoverCommand, target: Percent) -> Result<Dispatch> {
        let topic = require(self.set_position_topic.as_deref(), command)?;
        let payload = match &self.set_position_template {
            Some(template) => template.render(target)?,
            None => self.position.from_percent(target).to_string(),
        };
        Ok(Dispatch {
            message: self.message(topic, payload),
            optimistic: self
                .optimistic
                .then(|| StateChange::position_feedback(target)),
        })
    }

    fn tilt_value(&self, command: CoverCommand, tilt: &TiltRules, raw: i64) -> Result<Dispatch> {
        let topic = require(tilt.command_topic.as_deref(), command)?;
        #[allow(clippy::cast_precision_loss)]
        let percent = tilt.mapper.to_percent(raw as f64);
        Ok(Dispatch {
            message: self.message(topic, raw.to_string()),
            optimistic: tilt.optimistic.then(|| StateChange::tilt(percent)),
        })
    }

    fn tilt_rules(&self, command: CoverCommand) -> Result<&TiltRules> {
        self.tilt
            .as_ref()
            .ok_or(Error::CapabilityNotSupported(command.name()))
    }

    fn message(&self, topic: &str, payload: String) -> OutboundMessage {
        OutboundMessage {
            topic: topic.to_string(),
            payload,
            qos: self.qos,
            retain: self.retain,
        }
    }
}

fn require(topic: Option<&str>, command: CoverCommand) -> Result<&str> {
    topic.ok_or(Error::CapabilityNotSupported(command.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateError;

    fn pct(value: u8) -> Percent {
        Percent::new(value).unwrap()
    }

    fn dispatcher(config: &CoverConfig) -> CommandDispatcher {
        CommandDispatcher::new(config).unwrap()
    }

    #[test]
    fn open_close_stop_payloads() {
        let config = CoverConfig::new("test")
            .with_state_topic("state-topic")
            .with_command_topic("command-topic")
            .with_qos(QualityOfService::AtMostOnce);
        let d = dispatcher(&config);

        let open = d.dispatch(CoverCommand::Open).unwrap();
        assert_eq!(open.message.topic, "command-topic");
        assert_eq!(open.message.payload, "OPEN");
        assert!(!open.message.retain);
        assert!(open.optimistic.is_none());

        assert_eq!(d.dispatch(CoverCommand::Close).unwrap().message.payload, "CLOSE");
        assert_eq!(d.dispatch(CoverCommand::Stop).unwrap().message.payload, "STOP");
    }

    #[test]
    fn optimistic_open_close() {
        let config = CoverConfig::new("test")
            .with_command_topic("command-topic")
            .with_qos(QualityOfService::AtMostOnce);
        let d = dispatcher(&config);
        assert!(d.is_optimistic());

        let open = d.dispatch(CoverCommand::Open).unwrap();
        assert_eq!(
            open.optimistic,
            Some(StateChange::batch(vec![StateChange::status(CoverStatus::Open)]))
        );

        let close = d.dispatch(CoverCommand::Close).unwrap();
        assert_eq!(
            close.optimistic,
            Some(StateChange::batch(vec![StateChange::status(
                CoverStatus::Closed
            )]))
        );

        assert!(d.dispatch(CoverCommand::Stop).unwrap().optimistic.is_none());
    }

    #[test]
    fn optimistic_open_sets_position_with_position_topic() {
        let config = CoverConfig::new("test")
            .with_command_topic("command-topic")
            .with_position_topic("get-position-topic")
            .with_optimistic(true);
        let d = dispatcher(&config);

        let open = d.dispatch(CoverCommand::Open).unwrap();
        assert_eq!(
            open.optimistic,
            Some(StateChange::batch(vec![
                StateChange::status(CoverStatus::Open),
                StateChange::position(Percent::OPEN),
            ]))
        );

        let close = d.dispatch(CoverCommand::Close).unwrap();
        assert_eq!(
            close.optimistic,
            Some(StateChange::batch(vec![
                StateChange::status(CoverStatus::Closed),
                StateChange::position(Percent::CLOSED),
            ]))
        );
    }

    #[test]
    fn qos_and_retain_are_forwarded() {
        let config = CoverConfig::new("test")
            .with_command_topic("command-topic")
            .with_qos(QualityOfService::ExactlyOnce)
            .with_retain(true);
        let message = dispatcher(&config)
            .dispatch(CoverCommand::Open)
            .unwrap()
            .message;
        assert_eq!(message.qos, QualityOfService::ExactlyOnce);
        assert!(message.retain);
    }

    #[test]
    fn set_position_untemplated() {
        let config = CoverConfig::new("test")
            .with_position_topic("get-position-topic")
            .with_set_position_topic("set-position-topic");
        let d = dispatcher(&config);

        let dispatch = d.dispatch(CoverCommand::SetPosition(pct(62))).unwrap();
        assert_eq!(dispatch.message.topic, "set-position-topic");
        assert_eq!(dispatch.message.payload, "62");
        assert!(dispatch.optimistic.is_none());
    }

    #[test]
    fn set_position_altered_range() {
        let config = CoverConfig::new("test")
            .with_position_topic("get-position-topic")
            .with_set_position_topic("set-position-topic")
            .with_position_range(180, 80);
        let d = dispatcher(&config);

        let dispatch = d.dispatch(CoverCommand::SetPosition(pct(40))).unwrap();
        assert_eq!(dispatch.message.payload, "120");
    }

    #[test]
    fn set_position_template_bypasses_mapping() {
        let config = CoverConfig::new("test")
            .with_position_topic("get-position-topic")
            .with_set_position_topic("set-position-topic")
            .with_position_range(180, 80)
            .with_set_position_template(PositionTemplate::new(|_| Ok("38".to_string())));
        let d = dispatcher(&config);

        let dispatch = d.dispatch(CoverCommand::SetPosition(Percent::OPEN)).unwrap();
        assert_eq!(dispatch.message.payload, "38");
    }

    #[test]
    fn set_position_template_failure() {
        let config = CoverConfig::new("test")
            .with_set_position_topic("set-position-topic")
            .with_set_position_template(PositionTemplate::new(|_| {
                Err(TemplateError::new("undefined"))
            }));
        let d = dispatcher(&config);

        assert!(matches!(
            d.dispatch(CoverCommand::SetPosition(pct(10))),
            Err(Error::Template(_))
        ));
    }

    #[test]
    fn optimistic_set_position() {
        let config = CoverConfig::new("test").with_set_position_topic("set-position-topic");
        let d = dispatcher(&config);

        let dispatch = d.dispatch(CoverCommand::SetPosition(pct(62))).unwrap();
        assert_eq!(
            dispatch.optimistic,
            Some(StateChange::position_feedback(pct(62)))
        );

        let dispatch = d.dispatch(CoverCommand::SetPosition(Percent::CLOSED)).unwrap();
        assert_eq!(
            dispatch.optimistic,
            Some(StateChange::position_feedback(Percent::CLOSED))
        );
    }

    #[test]
    fn tilt_defaults() {
        let config = CoverConfig::new("test")
            .with_tilt_command_topic("tilt-command-topic")
            .with_tilt_status_topic("tilt-status-topic");
        let d = dispatcher(&config);
        assert!(!d.is_tilt_optimistic());

        let open = d.dispatch(CoverCommand::OpenTilt).unwrap();
        assert_eq!(open.message.topic, "tilt-command-topic");
        assert_eq!(open.message.payload, "100");
        assert!(open.optimistic.is_none());

        let close = d.dispatch(CoverCommand::CloseTilt).unwrap();
        assert_eq!(close.message.payload, "0");
    }

    #[test]
    fn tilt_given_values() {
        let config = CoverConfig::new("test")
            .with_tilt_command_topic("tilt-command-topic")
            .with_tilt_status_topic("tilt-status-topic")
            .with_tilt_values(400, 125);
        let d = dispatcher(&config);

        assert_eq!(d.dispatch(CoverCommand::OpenTilt).unwrap().message.payload, "400");
        assert_eq!(d.dispatch(CoverCommand::CloseTilt).unwrap().message.payload, "125");
    }

    #[test]
    fn tilt_optimistic_without_status_topic() {
        let config = CoverConfig::new("test")
            .with_tilt_command_topic("tilt-command-topic")
            .with_tilt_values(400, 125)
            .with_tilt_range(0, 500, false);
        let d = dispatcher(&config);
        assert!(d.is_tilt_optimistic());

        let open = d.dispatch(CoverCommand::OpenTilt).unwrap();
        assert_eq!(open.optimistic, Some(StateChange::tilt(pct(80))));

        let set = d.dispatch(CoverCommand::SetTilt(pct(50))).unwrap();
        assert_eq!(set.message.payload, "250");
        assert_eq!(set.optimistic, Some(StateChange::tilt(pct(50))));
    }

    #[test]
    fn set_tilt_altered_range() {
        let config = CoverConfig::new("test")
            .with_tilt_command_topic("tilt-command-topic")
            .with_tilt_status_topic("tilt-status-topic")
            .with_tilt_range(0, 50, false);
        let d = dispatcher(&config);

        let dispatch = d.dispatch(CoverCommand::SetTilt(pct(50))).unwrap();
        assert_eq!(dispatch.message.payload, "25");
    }

    #[test]
    fn set_tilt_inverted() {
        let config = CoverConfig::new("test")
            .with_tilt_command_topic("tilt-command-topic")
            .with_tilt_range(0, 100, true);
        let d = dispatcher(&config);

        let dispatch = d.dispatch(CoverCommand::SetTilt(pct(56))).unwrap();
        assert_eq!(dispatch.message.payload, "44");
    }

    #[test]
    fn missing_topics_degrade_per_command() {
        let config = CoverConfig::new("test").with_tilt_command_topic("tilt-command-topic");
        let d = dispatcher(&config);

        assert!(matches!(
            d.dispatch(CoverCommand::Open),
            Err(Error::CapabilityNotSupported("open"))
        ));
        assert!(matches!(
            d.dispatch(CoverCommand::SetPosition(pct(5))),
            Err(Error::CapabilityNotSupported("set_position"))
        ));
        assert!(d.dispatch(CoverCommand::OpenTilt).is_ok());

        let config = CoverConfig::new("test").with_command_topic("command-topic");
        let d = dispatcher(&config);
        assert!(matches!(
            d.dispatch(CoverCommand::SetTilt(pct(5))),
            Err(Error::CapabilityNotSupported("set_tilt"))
        ));
        assert!(d.dispatch(CoverCommand::Stop).is_ok());
    }

    #[test]
    fn tilt_status_only_cannot_command() {
        let config = CoverConfig::new("test").with_tilt_status_topic("tilt-status-topic");
        let d = dispatcher(&config);
        assert!(matches!(
            d.dispatch(CoverCommand::CloseTilt),
            Err(Error::CapabilityNotSupported("close_tilt"))
        ));
    }
}
