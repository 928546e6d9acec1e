// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `mqtt_cover` - MQTT-backed cover entities for home automation hubs.
//!
//! A cover is anything that opens and closes: blinds, shutters, garage
//! doors, awnings. This library turns a declarative configuration into a
//! live entity that publishes commands and reconciles the feedback the
//! device reports back over MQTT.
//!
//! # Supported Features
//!
//! - **Commands**: open, close, stop, set position, open/close/set tilt
//! - **Feedback**: state, position, tilt, availability and JSON attributes
//! - **Range mapping**: device units (e.g. 80-180 motor steps) to and from
//!   hub percentages, including inverted axes
//! - **Optimistic mode**: assumed state when the device reports nothing
//! - **Templates**: injected render closures for value decoding and
//!   set-position encoding
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mqtt_cover::{CoverConfig, MqttBroker, MqttCover};
//!
//! #[tokio::main]
//! async fn main() -> mqtt_cover::Result<()> {
//!     let broker = Arc::new(
//!         MqttBroker::builder()
//!             .host("192.168.1.50")
//!             .credentials("user", "pass")
//!             .build()
//!             .await?,
//!     );
//!
//!     let config = CoverConfig::new("Living room blind")
//!         .with_state_topic("blinds/living/state")
//!         .with_command_topic("blinds/living/set")
//!         .with_availability_topic("blinds/living/availability");
//!
//!     let cover = MqttCover::new("cover.living_room", config, broker)?;
//!     cover.subscribe_topics().await?;
//!
//!     cover.callbacks().on_state_changed(|snapshot| {
//!         println!("{} is now {}", snapshot.entity_id, snapshot.state);
//!     });
//!
//!     cover.open().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration from JSON
//!
//! ```
//! use mqtt_cover::CoverConfig;
//!
//! let config = CoverConfig::from_json(
//!     r#"{
//!         "name": "Garage",
//!         "command_topic": "garage/set",
//!         "position_topic": "garage/position",
//!         "position_open": 180,
//!         "position_closed": 80
//!     }"#,
//! )
//! .unwrap();
//!
//! assert!(!config.features().supports_set_position());
//! assert!(!config.is_optimistic());
//! ```

pub mod command;
pub mod config;
pub mod cover;
pub mod error;
pub mod protocol;
pub mod range;
pub mod state;
pub mod subscription;
pub mod template;
pub mod types;

pub use command::{CommandDispatcher, CoverCommand, Dispatch, OutboundMessage};
pub use config::{CoverConfig, SupportedFeatures, TiltConfig};
pub use cover::{CoverSnapshot, MqttCover};
pub use error::{ConfigError, DecodeError, Error, ProtocolError, Result, ValueError};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBroker, MqttBrokerBuilder};
pub use protocol::{MessageHandler, TopicRouter, Transport};
pub use range::RangeMapper;
pub use state::{CoverState, PositionStateReconciler, StateChange};
pub use subscription::{CallbackRegistry, SubscriptionId};
pub use template::{PositionTemplate, TemplateError, ValueTemplate};
pub use types::{CoverStatus, DeviceClass, Percent, QualityOfService};
