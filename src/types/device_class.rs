// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover device classes.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Kind of physical cover, exposed to the hub as the `device_class` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Awning.
    Awning,
    /// Blind.
    Blind,
    /// Curtain.
    Curtain,
    /// Damper.
    Damper,
    /// Door.
    Door,
    /// Garage door.
    Garage,
    /// Gate.
    Gate,
    /// Shade.
    Shade,
    /// Shutter.
    Shutter,
    /// Window.
    Window,
}

impl DeviceClass {
    /// Every supported device class.
    pub const ALL: [Self; 10] = [
        Self::Awning,
        Self::Blind,
        Self::Curtain,
        Self::Damper,
        Self::Door,
        Self::Garage,
        Self::Gate,
        Self::Shade,
        Self::Shutter,
        Self::Window,
    ];

    /// Returns the hub name of the class.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Awning => "awning",
            Self::Blind => "blind",
            Self::Curtain => "curtain",
            Self::Damper => "damper",
            Self::Door => "door",
            Self::Garage => "garage",
            Self::Gate => "gate",
            Self::Shade => "shade",
            Self::Shutter => "shutter",
            Self::Window => "window",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidDeviceClass(s.to_string()))
    }
}
