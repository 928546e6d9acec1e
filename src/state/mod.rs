// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover state management types.
//!
//! The [`CoverState`] struct holds what is currently known about one cover,
//! [`StateChange`] represents an individual change that can be applied to it,
//! and [`PositionStateReconciler`] turns inbound payloads into changes.
//!
//! # Examples
//!
//! ```
//! use mqtt_cover::state::{CoverState, StateChange};
//! use mqtt_cover::types::{CoverStatus, Percent};
//!
//! let mut state = CoverState::new();
//!
//! let change = StateChange::position_feedback(Percent::new(40).unwrap());
//! assert!(state.apply(&change));
//!
//! assert_eq!(state.status(), CoverStatus::Open);
//! assert_eq!(state.position(), Some(Percent::new(40).unwrap()));
//! ```

mod attributes;
mod cover_state;
mod reconciler;
mod state_change;

pub use attributes::parse_attributes;
pub use cover_state::CoverState;
pub use reconciler::{Channel, PositionStateReconciler};
pub use state_change::StateChange;
