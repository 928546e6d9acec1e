// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity state as exposed to the hub.

use serde_json::{Map, Value};

use crate::types::{DeviceClass, Percent};

/// Exposed state of an unreachable cover.
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Point-in-time view of a cover, as written to the hub's state machine.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CoverSnapshot {
    /// Entity identifier.
    pub entity_id: String,
    /// Display name.
    pub name: String,
    /// `open`, `closed`, `unknown` or `unavailable`.
    pub state: &'static str,
    /// Current position, if known.
    pub position: Option<Percent>,
    /// Current tilt, if known.
    pub tilt: Option<Percent>,
    /// Whether the state is assumed rather than reported.
    pub assumed_state: bool,
    /// Hub feature bitmask.
    pub supported_features: u32,
    /// Kind of physical cover.
    pub device_class: Option<DeviceClass>,
    /// Extra attributes reported by the device.
    pub attributes: Map<String, Value>,
}

impl CoverSnapshot {
    /// Returns `true` unless the cover is unavailable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state != STATE_UNAVAILABLE
    }
}
