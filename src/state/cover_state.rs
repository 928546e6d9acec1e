// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover state tracking.

use serde_json::{Map, Value};

use crate::types::{CoverStatus, Percent};

use super::StateChange;

/// Tracked state of one cover.
///
/// Position and tilt are optional because they stay unknown until the device
/// reports them (or an optimistic command assumes them). They are kept when
/// the cover goes offline and comes back.
///
/// # Examples
///
/// ```
/// use mqtt_cover::state::CoverState;
/// use mqtt_cover::types::CoverStatus;
///
/// let state = CoverState::new();
/// assert_eq!(state.status(), CoverStatus::Unknown);
/// assert!(state.position().is_none());
/// assert!(state.is_available());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CoverState {
    status: CoverStatus,
    position: Option<Percent>,
    tilt: Option<Percent>,
    available: bool,
    attributes: Map<String, Value>,
}

impl Default for CoverState {
    fn default() -> Self {
        Self {
            status: CoverStatus::Unknown,
            position: None,
            tilt: None,
            available: true,
            attributes: Map::new(),
        }
    }
}

impl CoverState {
    /// Creates a new state with nothing known and the cover available.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new state with the given initial availability.
    #[must_use]
    pub fn with_availability(available: bool) -> Self {
        Self {
            available,
            ..Self::default()
        }
    }

    // ========== Accessors ==========

    /// Returns the open/closed status.
    #[must_use]
    pub fn status(&self) -> CoverStatus {
        self.status
    }

    /// Returns the position, if known.
    #[must_use]
    pub fn position(&self) -> Option<Percent> {
        self.position
    }

    /// Returns the tilt, if known.
    #[must_use]
    pub fn tilt(&self) -> Option<Percent> {
        self.tilt
    }

    /// Returns whether the cover is reachable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Returns the extra attributes reported by the device.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns `Some(true)` if closed, `Some(false)` if open, `None` if
    /// unknown.
    #[must_use]
    pub fn is_closed(&self) -> Option<bool> {
        self.status.is_closed()
    }

    // ========== State Changes ==========

    /// Applies a state change and returns whether the state actually changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match change {
            StateChange::Status(status) => replace(&mut self.status, *status),
            StateChange::Position(position) => replace(&mut self.position, Some(*position)),
            StateChange::Tilt(tilt) => replace(&mut self.tilt, Some(*tilt)),
            StateChange::Availability(available) => replace(&mut self.available, *available),
            StateChange::Attributes(attributes) => {
                let mut changed = false;
                for (key, value) in attributes {
                    if self.attributes.get(key) != Some(value) {
                        self.attributes.insert(key.clone(), value.clone());
                        changed = true;
                    }
                }
                changed
            }
            StateChange::Batch(changes) => {
                let mut any_changed = false;
                for c in changes {
                    if self.apply(c) {
                        any_changed = true;
                    }
                }
                any_changed
            }
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(value: u8) -> Percent {
        Percent::new(value).unwrap()
    }

    #[test]
    fn new_state_is_unknown() {
        let state = CoverState::new();
        assert_eq!(state.status(), CoverStatus::Unknown);
        assert!(state.position().is_none());
        assert!(state.tilt().is_none());
        assert!(state.attributes().is_empty());
        assert!(state.is_closed().is_none());
    }

    #[test]
    fn apply_position_is_idempotent() {
        let mut state = CoverState::new();
        let change = StateChange::position_feedback(pct(50));

        assert!(state.apply(&change));
        assert!(!state.apply(&change));
        assert_eq!(state.position(), Some(pct(50)));
        assert_eq!(state.status(), CoverStatus::Open);
    }

    #[test]
    fn availability_keeps_position_and_tilt() {
        let mut state = CoverState::with_availability(true);
        state.apply(&StateChange::batch(vec![
            StateChange::position(pct(30)),
            StateChange::tilt(pct(70)),
        ]));

        assert!(state.apply(&StateChange::Availability(false)));
        assert!(state.apply(&StateChange::Availability(true)));

        assert_eq!(state.position(), Some(pct(30)));
        assert_eq!(state.tilt(), Some(pct(70)));
    }

    #[test]
    fn attributes_merge() {
        let mut state = CoverState::new();
        let first: Map<String, Value> =
            serde_json::from_str(r#"{"val": "100", "battery": 80}"#).unwrap();
        let second: Map<String, Value> = serde_json::from_str(r#"{"val": "75"}"#).unwrap();

        assert!(state.apply(&StateChange::Attributes(first.clone())));
        assert!(!state.apply(&StateChange::Attributes(first)));
        assert!(state.apply(&StateChange::Attributes(second)));

        assert_eq!(state.attributes()["val"], "75");
        assert_eq!(state.attributes()["battery"], 80);
    }

    #[test]
    fn empty_batch_changes_nothing() {
        let mut state = CoverState::new();
        assert!(!state.apply(&StateChange::batch(Vec::new())));
        assert_eq!(state, CoverState::new());
    }
}
