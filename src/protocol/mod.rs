// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message transport between covers and the MQTT broker.
//!
//! Covers only need three primitives from the outside world: publish a
//! message, subscribe to a topic filter, and unsubscribe from it. The
//! [`Transport`] trait captures exactly that, so a cover can run against a
//! real broker ([`MqttBroker`], behind the `mqtt` feature) or against an
//! in-memory transport in tests.
//!
//! Inbound messages are delivered to [`MessageHandler`]s through a
//! [`TopicRouter`], which holds weak references: dropping a cover stops
//! delivery without any explicit cleanup.

#[cfg(feature = "mqtt")]
mod mqtt_broker;
mod topic_router;

#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder};
pub use topic_router::TopicRouter;

use std::sync::Weak;

use crate::command::OutboundMessage;
use crate::error::ProtocolError;
use crate::types::QualityOfService;

/// Receives inbound messages routed to a subscribed topic filter.
pub trait MessageHandler: Send + Sync {
    /// Called once per inbound message whose topic matches a filter the
    /// handler subscribed to.
    fn on_message(&self, topic: &str, payload: &str);
}

/// Publish/subscribe primitives used by covers.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Publishes a message.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message could not be handed to the
    /// broker.
    async fn publish(&self, message: &OutboundMessage) -> Result<(), ProtocolError>;

    /// Subscribes `handler` to a topic filter.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the subscription could not be sent.
    async fn subscribe(
        &self,
        topic: &str,
        qos: QualityOfService,
        handler: Weak<dyn MessageHandler>,
    ) -> Result<(), ProtocolError>;

    /// Removes `handler` from a topic filter.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the unsubscription could not be sent.
    async fn unsubscribe(
        &self,
        topic: &str,
        handler: &Weak<dyn MessageHandler>,
    ) -> Result<(), ProtocolError>;
}
