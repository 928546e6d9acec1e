// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Open/closed status of a cover.

use std::fmt;

/// Lifecycle status of a cover as last reported or assumed.
///
/// Movement (opening/closing) is not tracked: a cover is either known to be
/// open, known to be closed, or unknown.
///
/// # Examples
///
/// ```
/// use mqtt_cover::types::CoverStatus;
///
/// assert_eq!(CoverStatus::default(), CoverStatus::Unknown);
/// assert_eq!(CoverStatus::Open.as_str(), "open");
/// assert_eq!(CoverStatus::Closed.is_closed(), Some(true));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CoverStatus {
    /// No state has been received or assumed yet.
    #[default]
    Unknown,
    /// The cover is open (any position above fully closed).
    Open,
    /// The cover is fully closed.
    Closed,
}

impl CoverStatus {
    /// Returns the hub state string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Returns whether the cover is closed, or `None` if unknown.
    #[must_use]
    pub const fn is_closed(&self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Open => Some(false),
            Self::Closed => Some(true),
        }
    }
}

impl fmt::Display for CoverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
