// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Percentage type for cover position and tilt.
//!
//! This module provides a type-safe representation of normalized positions,
//! ensuring values are always within the valid range of 0-100%.

use std::fmt;

use crate::error::ValueError;

/// Normalized position as a percentage (0-100).
///
/// 0 is fully closed and 100 is fully open, regardless of the direction the
/// device reports in its own units.
///
/// # Examples
///
/// ```
/// use mqtt_cover::types::Percent;
///
/// let half = Percent::new(50).unwrap();
/// assert_eq!(half.value(), 50);
///
/// assert_eq!(Percent::CLOSED.value(), 0);
/// assert_eq!(Percent::OPEN.value(), 100);
///
/// assert!(Percent::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percent(u8);

impl Percent {
    /// Fully closed (0%).
    pub const CLOSED: Self = Self(0);

    /// Fully open (100%).
    pub const OPEN: Self = Self(100);

    /// Creates a new percentage.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: u16::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a percentage, clamping values above 100.
    ///
    /// ```
    /// use mqtt_cover::types::Percent;
    ///
    /// assert_eq!(Percent::clamped(150).value(), 100);
    /// ```
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Rounds a fractional percentage to the nearest integer and clamps it
    /// into 0-100. `NaN` maps to 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_f64_clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::CLOSED;
        }
        // Safe: clamped to 0..=100 before the cast
        Self(value.round().clamp(0.0, 100.0) as u8)
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the mirrored percentage (`100 - value`).
    #[must_use]
    pub const fn inverted(&self) -> Self {
        Self(100 - self.0)
    }

    /// Returns the value as a float between 0.0 and 1.0.
    #[must_use]
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Returns `true` for the fully closed extreme.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Percent {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}
