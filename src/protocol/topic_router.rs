// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT topic routing for cover handlers.
//!
//! The [`TopicRouter`] delivers incoming MQTT messages to every handler whose
//! topic filter matches. It uses weak references so covers can be dropped
//! without explicit cleanup.
//!
//! # Architecture
//!
//! ```text
//! MQTT Message: home/garage/position → 120
//!                     ↓
//!             TopicRouter.route()
//!                     ↓
//!    Match "home/garage/position" against every filter
//!                     ↓
//!        Weak<dyn MessageHandler>.upgrade()
//!                     ↓
//!        handler.on_message(topic, payload)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::config::topic::topic_matches;

use super::MessageHandler;

/// Routes MQTT messages to subscribed handlers.
///
/// Several handlers may share one filter, and one handler may hold several
/// filters. A message matching more than one filter of the same handler is
/// delivered once per filter; the handler decides what each topic means.
#[derive(Default)]
pub struct TopicRouter {
    /// Map from topic filter to weak references to its handlers.
    subscribers: RwLock<HashMap<String, Vec<Weak<dyn MessageHandler>>>>,
}

impl TopicRouter {
    /// Creates a new empty topic router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a topic filter.
    ///
    /// Returns `true` if this is the first live handler for the filter, in
    /// which case the caller should subscribe on the broker.
    pub fn register(&self, filter: impl Into<String>, handler: Weak<dyn MessageHandler>) -> bool {
        let filter = filter.into();
        tracing::debug!(topic = %filter, "Registering handler for routing");
        let mut subscribers = self.subscribers.write();
        let handlers = subscribers.entry(filter).or_default();
        handlers.retain(|weak| weak.strong_count() > 0);
        if handlers.iter().any(|existing| Weak::ptr_eq(existing, &handler)) {
            return false;
        }
        handlers.push(handler);
        handlers.len() == 1
    }

    /// Removes a handler from a topic filter.
    ///
    /// Returns `true` if no live handler remains for the filter, in which case
    /// the caller should unsubscribe on the broker.
    pub fn unregister(&self, filter: &str, handler: &Weak<dyn MessageHandler>) -> bool {
        tracing::debug!(topic = %filter, "Unregistering handler from routing");
        let mut subscribers = self.subscribers.write();
        let Some(handlers) = subscribers.get_mut(filter) else {
            return false;
        };
        handlers.retain(|weak| weak.strong_count() > 0 && !Weak::ptr_eq(weak, handler));
        if handlers.is_empty() {
            subscribers.remove(filter);
            true
        } else {
            false
        }
    }

    /// Routes an MQTT message to every matching handler.
    ///
    /// Returns the number of handlers the message was delivered to.
    pub fn route(&self, topic: &str, payload: &str) -> usize {
        // Collect first so handlers run without the lock held
        let handlers: Vec<Arc<dyn MessageHandler>> = {
            let subscribers = self.subscribers.read();
            subscribers
                .iter()
                .filter(|(filter, _)| topic_matches(filter, topic))
                .flat_map(|(_, handlers)| handlers.iter().filter_map(Weak::upgrade))
                .collect()
        };

        if handlers.is_empty() {
            tracing::trace!(topic = %topic, "No registered handler for topic");
            return 0;
        }

        for handler in &handlers {
            handler.on_message(topic, payload);
        }
        handlers.len()
    }

    /// Removes handlers that have been dropped, and filters left without
    /// handlers.
    ///
    /// Returns the filters that were removed, so the caller can unsubscribe
    /// them on the broker.
    pub fn cleanup(&self) -> Vec<String> {
        let mut removed = Vec::new();
        self.subscribers.write().retain(|filter, handlers| {
            handlers.retain(|weak| weak.strong_count() > 0);
            if handlers.is_empty() {
                tracing::debug!(topic = %filter, "Cleaning up dropped handlers");
                removed.push(filter.clone());
            }
            !handlers.is_empty()
        });
        removed
    }

    /// Returns the number of registered filters.
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the registered filters in no particular order.
    #[must_use]
    pub fn filters(&self) -> Vec<String> {
        self.subscribers.read().keys().cloned().collect()
    }

    /// Returns the number of live handlers across all filters.
    #[must_use]
    pub fn active_handler_count(&self) -> usize {
        self.subscribers
            .read()
            .values()
            .flatten()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for TopicRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRouter")
            .field("filter_count", &self.filter_count())
            .finish()
    }
}
