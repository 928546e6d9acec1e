// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover command definitions.
//!
//! A [`CoverCommand`] is what the hub asks for. The [`CommandDispatcher`]
//! turns it into a [`Dispatch`]: the [`OutboundMessage`] to publish plus the
//! state change to assume when the cover runs optimistically.
//!
//! # Available Commands
//!
//! | Command | Topic | Payload |
//! |---------|-------|---------|
//! | [`CoverCommand::Open`] | `command_topic` | `payload_open` |
//! | [`CoverCommand::Close`] | `command_topic` | `payload_close` |
//! | [`CoverCommand::Stop`] | `command_topic` | `payload_stop` |
//! | [`CoverCommand::SetPosition`] | `set_position_topic` | mapped raw value or template output |
//! | [`CoverCommand::OpenTilt`] | `tilt_command_topic` | `tilt_opened_value` |
//! | [`CoverCommand::CloseTilt`] | `tilt_command_topic` | `tilt_closed_value` |
//! | [`CoverCommand::SetTilt`] | `tilt_command_topic` | mapped raw value |
//!
//! # Examples
//!
//! ```
//! use mqtt_cover::command::{CommandDispatcher, CoverCommand};
//! use mqtt_cover::config::CoverConfig;
//! use mqtt_cover::state::StateChange;
//! use mqtt_cover::types::CoverStatus;
//!
//! let config = CoverConfig::new("test").with_command_topic("command-topic");
//! let dispatcher = CommandDispatcher::new(&config).unwrap();
//!
//! let dispatch = dispatcher.dispatch(CoverCommand::Open).unwrap();
//! assert_eq!(dispatch.message.topic, "command-topic");
//! assert_eq!(dispatch.message.payload, "OPEN");
//! assert_eq!(
//!     dispatch.optimistic,
//!     Some(StateChange::batch(vec![StateChange::status(CoverStatus::Open)]))
//! );
//! ```

mod dispatcher;

pub use dispatcher::CommandDispatcher;

use std::fmt;

use crate::state::StateChange;
use crate::types::{Percent, QualityOfService};

/// A high-level command for a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverCommand {
    /// Open the cover fully.
    Open,
    /// Close the cover fully.
    Close,
    /// Stop any movement.
    Stop,
    /// Move to a target position.
    SetPosition(Percent),
    /// Open the tilt fully.
    OpenTilt,
    /// Close the tilt fully.
    CloseTilt,
    /// Move the tilt to a target value.
    SetTilt(Percent),
}

impl CoverCommand {
    /// Returns the command name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Stop => "stop",
            Self::SetPosition(_) => "set_position",
            Self::OpenTilt => "open_tilt",
            Self::CloseTilt => "close_tilt",
            Self::SetTilt(_) => "set_tilt",
        }
    }
}

impl fmt::Display for CoverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetPosition(target) | Self::SetTilt(target) => {
                write!(f, "{} {}", self.name(), target)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// A message ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination topic.
    pub topic: String,
    /// Payload text.
    pub payload: String,
    /// Quality of service.
    pub qos: QualityOfService,
    /// Retain flag.
    pub retain: bool,
}

/// Result of dispatching a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// The message to publish.
    pub message: OutboundMessage,
    /// The change to apply once the message is published, when running
    /// optimistically.
    pub optimistic: Option<StateChange>,
}
