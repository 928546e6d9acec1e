// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for cover state subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::cover::CoverSnapshot;
use crate::state::StateChange;
use crate::types::{CoverStatus, Percent};

/// Unique identifier for a subscription.
///
/// IDs are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Type alias for entity state callbacks.
type StateChangedCallback = Arc<dyn Fn(&CoverSnapshot) + Send + Sync>;

/// Type alias for status callbacks.
type StatusCallback = Arc<dyn Fn(CoverStatus) + Send + Sync>;

/// Type alias for position and tilt callbacks.
type PercentCallback = Arc<dyn Fn(Percent) + Send + Sync>;

/// Type alias for availability callbacks.
type AvailabilityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Type alias for attribute callbacks.
type AttributesCallback = Arc<dyn Fn(&Map<String, Value>) + Send + Sync>;

/// Registry for cover subscription callbacks.
///
/// Callbacks are called synchronously, in an arbitrary order, on the task
/// that accepted the change. They must not block.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Full entity state callbacks.
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
    /// Open/closed status callbacks.
    status_callbacks: RwLock<HashMap<SubscriptionId, StatusCallback>>,
    /// Position callbacks.
    position_callbacks: RwLock<HashMap<SubscriptionId, PercentCallback>>,
    /// Tilt callbacks.
    tilt_callbacks: RwLock<HashMap<SubscriptionId, PercentCallback>>,
    /// Availability callbacks.
    availability_callbacks: RwLock<HashMap<SubscriptionId, AvailabilityCallback>>,
    /// Attribute callbacks.
    attributes_callbacks: RwLock<HashMap<SubscriptionId, AttributesCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_changed_callbacks: RwLock::new(HashMap::new()),
            status_callbacks: RwLock::new(HashMap::new()),
            position_callbacks: RwLock::new(HashMap::new()),
            tilt_callbacks: RwLock::new(HashMap::new()),
            availability_callbacks: RwLock::new(HashMap::new()),
            attributes_callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Generates a new unique subscription ID.
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback receiving the full entity state after every
    /// accepted change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CoverSnapshot) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for open/closed status changes.
    pub fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(CoverStatus) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.status_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for position changes.
    pub fn on_position_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Percent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.position_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for tilt changes.
    pub fn on_tilt_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Percent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.tilt_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for availability changes.
    ///
    /// The callback receives `true` when the cover comes online.
    pub fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.availability_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for attribute updates.
    ///
    /// The callback receives the attributes carried by the update, not the
    /// merged map.
    pub fn on_attributes_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Map<String, Value>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.attributes_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state_changed_callbacks.write().remove(&id).is_some()
            || self.status_callbacks.write().remove(&id).is_some()
            || self.position_callbacks.write().remove(&id).is_some()
            || self.tilt_callbacks.write().remove(&id).is_some()
            || self.availability_callbacks.write().remove(&id).is_some()
            || self.attributes_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.state_changed_callbacks.write().clear();
        self.status_callbacks.write().clear();
        self.position_callbacks.write().clear();
        self.tilt_callbacks.write().clear();
        self.availability_callbacks.write().clear();
        self.attributes_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches an accepted change.
    ///
    /// Specific callbacks are called for every value the change carries,
    /// then every state callback is called once with `snapshot`.
    pub fn dispatch(&self, change: &StateChange, snapshot: &CoverSnapshot) {
        self.dispatch_values(change);

        let callbacks = self.state_changed_callbacks.read();
        for callback in callbacks.values() {
            callback(snapshot);
        }
    }

    fn dispatch_values(&self, change: &StateChange) {
        match change {
            StateChange::Status(status) => {
                let callbacks = self.status_callbacks.read();
                for callback in callbacks.values() {
                    callback(*status);
                }
            }
            StateChange::Position(position) => {
                let callbacks = self.position_callbacks.read();
                for callback in callbacks.values() {
                    callback(*position);
                }
            }
            StateChange::Tilt(tilt) => {
                let callbacks = self.tilt_callbacks.read();
                for callback in callbacks.values() {
                    callback(*tilt);
                }
            }
            StateChange::Availability(available) => {
                let callbacks = self.availability_callbacks.read();
                for callback in callbacks.values() {
                    callback(*available);
                }
            }
            StateChange::Attributes(attributes) => {
                let callbacks = self.attributes_callbacks.read();
                for callback in callbacks.values() {
                    callback(attributes);
                }
            }
            StateChange::Batch(changes) => {
                for nested_change in changes {
                    self.dispatch_values(nested_change);
                }
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state_changed_callbacks.read().len()
            + self.status_callbacks.read().len()
            + self.position_callbacks.read().len()
            + self.tilt_callbacks.read().len()
            + self.availability_callbacks.read().len()
            + self.attributes_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
