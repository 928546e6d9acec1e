// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover features derived from the configured topics.
//!
//! Capabilities degrade per command, not per entity: a cover without a
//! command topic can still accept tilt commands, and a cover without a tilt
//! command topic can still open and close.

use super::CoverConfig;

/// Commands a cover accepts, derived from which topics are configured.
///
/// # Examples
///
/// ```
/// use mqtt_cover::config::{CoverConfig, SupportedFeatures};
///
/// let config = CoverConfig::new("test").with_command_topic("command-topic");
/// let features = SupportedFeatures::from_config(&config);
/// assert!(features.supports_open());
/// assert!(!features.supports_set_position());
/// assert_eq!(features.bits(), 11);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
// Each flag is an independent capability that maps to one hub feature bit.
#[allow(clippy::struct_excessive_bools)]
pub struct SupportedFeatures {
    /// Open, close and stop through the command topic.
    pub open_close: bool,

    /// Set position through the set-position topic.
    pub set_position: bool,

    /// Open, close and set tilt through the tilt command topic.
    pub tilt: bool,
}

impl SupportedFeatures {
    /// Hub bit for open.
    pub const OPEN: u32 = 1;
    /// Hub bit for close.
    pub const CLOSE: u32 = 2;
    /// Hub bit for set position.
    pub const SET_POSITION: u32 = 4;
    /// Hub bit for stop.
    pub const STOP: u32 = 8;
    /// Hub bit for open tilt.
    pub const OPEN_TILT: u32 = 16;
    /// Hub bit for close tilt.
    pub const CLOSE_TILT: u32 = 32;
    /// Hub bit for stop tilt.
    pub const STOP_TILT: u32 = 64;
    /// Hub bit for set tilt position.
    pub const SET_TILT_POSITION: u32 = 128;

    /// Derives the features of a configuration.
    #[must_use]
    pub fn from_config(config: &CoverConfig) -> Self {
        Self {
            open_close: config.command_topic.is_some(),
            set_position: config.set_position_topic.is_some(),
            tilt: config
                .tilt
                .as_ref()
                .is_some_and(|tilt| tilt.command_topic.is_some()),
        }
    }

    /// Returns `true` if the cover can be opened.
    #[must_use]
    pub fn supports_open(&self) -> bool {
        self.open_close
    }

    /// Returns `true` if the cover can be closed.
    #[must_use]
    pub fn supports_close(&self) -> bool {
        self.open_close
    }

    /// Returns `true` if the cover can be stopped.
    #[must_use]
    pub fn supports_stop(&self) -> bool {
        self.open_close
    }

    /// Returns `true` if the cover accepts a target position.
    #[must_use]
    pub fn supports_set_position(&self) -> bool {
        self.set_position
    }

    /// Returns `true` if the cover accepts tilt commands.
    #[must_use]
    pub fn supports_tilt(&self) -> bool {
        self.tilt
    }

    /// Returns the hub feature bitmask.
    #[must_use]
    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.open_close {
            bits |= Self::OPEN | Self::CLOSE | Self::STOP;
        }
        if self.set_position {
            bits |= Self::SET_POSITION;
        }
        if self.tilt {
            bits |= Self::OPEN_TILT
                | Self::CLOSE_TILT
                | Self::STOP_TILT
                | Self::SET_TILT_POSITION;
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_without_command_topic() {
        let config = CoverConfig::new("test")
            .with_tilt_command_topic("tilt-command")
            .with_tilt_status_topic("tilt-status");
        assert_eq!(SupportedFeatures::from_config(&config).bits(), 240);
    }

    #[test]
    fn command_topic_and_tilt() {
        let config = CoverConfig::new("test")
            .with_command_topic("test")
            .with_tilt_command_topic("tilt-command")
            .with_tilt_status_topic("tilt-status");
        assert_eq!(SupportedFeatures::from_config(&config).bits(), 251);
    }

    #[test]
    fn tilt_group_includes_stop_tilt() {
        let config = CoverConfig::new("test").with_tilt_command_topic("tilt-command");
        let bits = SupportedFeatures::from_config(&config).bits();
        assert_eq!(bits & SupportedFeatures::STOP_TILT, SupportedFeatures::STOP_TILT);
        assert_eq!(bits & SupportedFeatures::STOP, 0);
    }

    #[test]
    fn set_position_bit() {
        let config = CoverConfig::new("test")
            .with_command_topic("command-topic")
            .with_set_position_topic("set-position-topic");
        let features = SupportedFeatures::from_config(&config);
        assert!(features.supports_set_position());
        assert_eq!(features.bits() & SupportedFeatures::SET_POSITION, 4);
    }

    #[test]
    fn tilt_status_only_is_not_commandable() {
        let config = CoverConfig::new("test").with_tilt_status_topic("tilt-status");
        assert!(!SupportedFeatures::from_config(&config).supports_tilt());
    }
}
