// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT quality of service levels.

use crate::error::ConfigError;

/// Delivery guarantee used for both subscriptions and publishes.
///
/// Serialized as the numeric level (0, 1 or 2).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum QualityOfService {
    /// Level 0, fire and forget.
    #[default]
    AtMostOnce,
    /// Level 1.
    AtLeastOnce,
    /// Level 2.
    ExactlyOnce,
}

impl QualityOfService {
    /// Returns the numeric level.
    #[must_use]
    pub const fn level(&self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QualityOfService {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other)),
        }
    }
}

impl From<QualityOfService> for u8 {
    fn from(value: QualityOfService) -> Self {
        value.level()
    }
}

#[cfg(feature = "mqtt")]
impl From<QualityOfService> for rumqttc::QoS {
    fn from(value: QualityOfService) -> Self {
        match value {
            QualityOfService::AtMostOnce => Self::AtMostOnce,
            QualityOfService::AtLeastOnce => Self::AtLeastOnce,
            QualityOfService::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}
