// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! State changes are the building blocks for updating a
//! [`CoverState`](super::CoverState), whether they come from decoded
//! feedback or from an optimistic command.
//!
//! # Change Types
//!
//! - [`StateChange::Status`] - Open/closed status
//! - [`StateChange::Position`] - Normalized position
//! - [`StateChange::Tilt`] - Normalized tilt
//! - [`StateChange::Availability`] - Online/offline
//! - [`StateChange::Attributes`] - Extra attributes merged into the state
//! - [`StateChange::Batch`] - Multiple changes grouped together
//!
//! # Examples
//!
//! ```
//! use mqtt_cover::state::{CoverState, StateChange};
//! use mqtt_cover::types::CoverStatus;
//!
//! let mut state = CoverState::new();
//!
//! // Apply returns true if state actually changed
//! assert!(state.apply(&StateChange::status(CoverStatus::Open)));
//!
//! // Applying the same change again returns false
//! assert!(!state.apply(&StateChange::status(CoverStatus::Open)));
//! ```

use serde_json::{Map, Value};

use crate::types::{CoverStatus, Percent};

/// Represents a change in cover state.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum StateChange {
    /// Open/closed status changed.
    Status(CoverStatus),

    /// Position changed.
    Position(Percent),

    /// Tilt changed.
    Tilt(Percent),

    /// Availability changed.
    Availability(bool),

    /// Attributes to merge into the current attribute map.
    Attributes(Map<String, Value>),

    /// Multiple changes at once.
    Batch(Vec<StateChange>),
}

impl StateChange {
    /// Creates a status change.
    #[must_use]
    pub fn status(status: CoverStatus) -> Self {
        Self::Status(status)
    }

    /// Creates a position change.
    #[must_use]
    pub fn position(position: Percent) -> Self {
        Self::Position(position)
    }

    /// Creates a tilt change.
    #[must_use]
    pub fn tilt(tilt: Percent) -> Self {
        Self::Tilt(tilt)
    }

    /// Creates a position change together with the status it implies.
    ///
    /// A fully closed position means `Closed`; any other position means
    /// `Open`.
    #[must_use]
    pub fn position_feedback(position: Percent) -> Self {
        let status = if position.is_closed() {
            CoverStatus::Closed
        } else {
            CoverStatus::Open
        };
        Self::Batch(vec![Self::Position(position), Self::Status(status)])
    }

    /// Creates a batch of changes.
    #[must_use]
    pub fn batch(changes: Vec<StateChange>) -> Self {
        Self::Batch(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_feedback_derives_status() {
        let change = StateChange::position_feedback(Percent::CLOSED);
        assert_eq!(
            change,
            StateChange::Batch(vec![
                StateChange::Position(Percent::CLOSED),
                StateChange::Status(CoverStatus::Closed),
            ])
        );

        let change = StateChange::position_feedback(Percent::new(1).unwrap());
        assert!(matches!(
            change,
            StateChange::Batch(ref changes) if changes[1] == StateChange::Status(CoverStatus::Open)
        ));
    }

    #[test]
    fn fully_open_is_plain_open() {
        let change = StateChange::position_feedback(Percent::OPEN);
        assert!(matches!(
            change,
            StateChange::Batch(ref changes) if changes[1] == StateChange::Status(CoverStatus::Open)
        ));
    }
}
