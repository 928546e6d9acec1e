// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for cover state changes.
//!
//! Every change the cover accepts, from feedback or from an optimistic
//! command, is pushed to the callbacks registered here. This is how the
//! surrounding hub learns the new entity state.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that stores callbacks and dispatches changes
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mqtt_cover::config::CoverConfig;
//! use mqtt_cover::cover::MqttCover;
//! use mqtt_cover::protocol::MqttBroker;
//!
//! # async fn example() -> mqtt_cover::Result<()> {
//! let broker = Arc::new(MqttBroker::builder().host("192.168.1.50").build().await?);
//! let config = CoverConfig::new("Garage")
//!     .with_command_topic("garage/set")
//!     .with_position_topic("garage/position");
//! let cover = MqttCover::new("cover.garage", config, broker)?;
//!
//! let sub_id = cover.callbacks().on_state_changed(|snapshot| {
//!     println!("{} is now {}", snapshot.entity_id, snapshot.state);
//! });
//!
//! // Later, unsubscribe
//! cover.callbacks().unsubscribe(sub_id);
//! # Ok(())
//! # }
//! ```

mod callback;

pub use callback::{CallbackRegistry, SubscriptionId};
