// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT cover entity.
//!
//! An [`MqttCover`] owns one cover's configuration, state and subscriptions.
//! Commands go out through the [`Transport`]; feedback comes back through
//! [`MqttCover::handle_message`] (called by the transport's router) and is
//! pushed to the [`CallbackRegistry`] as a [`CoverSnapshot`].
//!
//! # Locking
//!
//! - The reconciler sits behind its own `parking_lot::Mutex`, never held
//!   across an `.await` and never shared with another cover.
//! - The list of active subscriptions sits behind a `tokio::sync::Mutex`,
//!   held for the whole unsubscribe/subscribe swap of a rename or
//!   reconfiguration.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mqtt_cover::config::CoverConfig;
//! use mqtt_cover::cover::MqttCover;
//! use mqtt_cover::protocol::MqttBroker;
//! use mqtt_cover::types::Percent;
//!
//! # async fn example() -> mqtt_cover::Result<()> {
//! let broker = Arc::new(MqttBroker::builder().host("192.168.1.50").build().await?);
//!
//! let config = CoverConfig::new("Garage")
//!     .with_command_topic("garage/set")
//!     .with_position_topic("garage/position")
//!     .with_set_position_topic("garage/position/set")
//!     .with_position_range(180, 80);
//! let cover = MqttCover::new("cover.garage", config, broker)?;
//! cover.subscribe_topics().await?;
//!
//! cover.set_position(Percent::new(40)?).await?; // publishes "120"
//! println!("{:?}", cover.snapshot());
//! # Ok(())
//! # }
//! ```

mod snapshot;

pub use snapshot::{CoverSnapshot, STATE_UNAVAILABLE};

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::command::{CommandDispatcher, CoverCommand};
use crate::config::{CoverConfig, SupportedFeatures};
use crate::error::{Error, Result};
use crate::protocol::{MessageHandler, Transport};
use crate::state::{Channel, CoverState, PositionStateReconciler, StateChange};
use crate::subscription::CallbackRegistry;
use crate::types::{CoverStatus, Percent};

/// Configuration-derived parts that are swapped together on reconfiguration.
#[derive(Debug)]
struct Settings {
    entity_id: String,
    config: Arc<CoverConfig>,
    dispatcher: CommandDispatcher,
}

/// An MQTT-backed cover entity.
///
/// Created with [`MqttCover::new`], which returns an `Arc` because the
/// transport only keeps a weak reference to the cover for message delivery.
pub struct MqttCover<T: Transport> {
    settings: RwLock<Settings>,
    reconciler: Mutex<PositionStateReconciler>,
    callbacks: CallbackRegistry,
    transport: Arc<T>,
    active_topics: tokio::sync::Mutex<Vec<String>>,
    this: Weak<Self>,
}

impl<T> MqttCover<T>
where
    T: Transport + Send + Sync + 'static,
{
    /// Creates a cover.
    ///
    /// No topic is subscribed until [`subscribe_topics`](Self::subscribe_topics)
    /// is called.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(
        entity_id: impl Into<String>,
        config: CoverConfig,
        transport: Arc<T>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let dispatcher = CommandDispatcher::new(&config)?;
        let reconciler = PositionStateReconciler::new(&config)?;
        let entity_id = entity_id.into();

        tracing::debug!(
            entity_id = %entity_id,
            optimistic = dispatcher.is_optimistic(),
            features = config.features().bits(),
            "Creating MQTT cover"
        );

        Ok(Arc::new_cyclic(|this| Self {
            settings: RwLock::new(Settings {
                entity_id,
                config: Arc::new(config),
                dispatcher,
            }),
            reconciler: Mutex::new(reconciler),
            callbacks: CallbackRegistry::new(),
            transport,
            active_topics: tokio::sync::Mutex::new(Vec::new()),
            this: this.clone(),
        }))
    }

    // ========== Accessors ==========

    /// Returns the entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> String {
        self.settings.read().entity_id.clone()
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> Arc<CoverConfig> {
        Arc::clone(&self.settings.read().config)
    }

    /// Returns the callback registry.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Returns the features the hub may offer for this cover.
    #[must_use]
    pub fn features(&self) -> SupportedFeatures {
        self.settings.read().config.features()
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> CoverState {
        self.reconciler.lock().state().clone()
    }

    /// Returns the topics currently subscribed.
    pub async fn active_topics(&self) -> Vec<String> {
        self.active_topics.lock().await.clone()
    }

    /// Returns the entity state as exposed to the hub.
    #[must_use]
    pub fn snapshot(&self) -> CoverSnapshot {
        let (entity_id, config, assumed_state) = {
            let settings = self.settings.read();
            (
                settings.entity_id.clone(),
                Arc::clone(&settings.config),
                settings.dispatcher.is_optimistic(),
            )
        };
        let state = self.state();

        let exposed = if state.is_available() {
            state.status().as_str()
        } else {
            STATE_UNAVAILABLE
        };

        CoverSnapshot {
            entity_id,
            name: config.name.clone(),
            state: exposed,
            position: state.position(),
            tilt: state.tilt(),
            assumed_state,
            supported_features: config.features().bits(),
            device_class: config.device_class,
            attributes: state.attributes().clone(),
        }
    }

    // ========== Subscriptions ==========

    /// Subscribes to every configured inbound topic.
    ///
    /// Topics already subscribed are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if a subscription fails. Topics subscribed
    /// before the failure stay subscribed.
    pub async fn subscribe_topics(&self) -> Result<()> {
        let mut active = self.active_topics.lock().await;
        let config = self.config();
        self.subscribe_all(&mut active, &config).await
    }

    /// Renames the entity, re-subscribing every topic.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if a topic cannot be unsubscribed or
    /// subscribed again.
    pub async fn rename(&self, entity_id: impl Into<String>) -> Result<()> {
        let entity_id = entity_id.into();
        let mut active = self.active_topics.lock().await;

        let previous = std::mem::replace(&mut self.settings.write().entity_id, entity_id.clone());
        tracing::debug!(from = %previous, to = %entity_id, "Renaming MQTT cover");

        self.unsubscribe_all(&mut active).await?;
        let config = self.config();
        self.subscribe_all(&mut active, &config).await
    }

    /// Replaces the configuration, keeping the current state.
    ///
    /// Every old topic is unsubscribed before the new topics are subscribed.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the new configuration is invalid; nothing changes
    /// - `Error::Protocol` if the subscription swap fails
    pub async fn update_config(&self, config: CoverConfig) -> Result<()> {
        config.validate()?;
        let dispatcher = CommandDispatcher::new(&config)?;
        let mut active = self.active_topics.lock().await;

        self.reconciler.lock().reconfigure(&config)?;
        let config = Arc::new(config);
        {
            let mut settings = self.settings.write();
            settings.config = Arc::clone(&config);
            settings.dispatcher = dispatcher;
            tracing::debug!(entity_id = %settings.entity_id, "Updated MQTT cover configuration");
        }

        self.unsubscribe_all(&mut active).await?;
        self.subscribe_all(&mut active, &config).await
    }

    /// Unsubscribes every topic.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if a topic cannot be unsubscribed; topics not
    /// yet processed stay subscribed.
    pub async fn remove(&self) -> Result<()> {
        let mut active = self.active_topics.lock().await;
        tracing::debug!(entity_id = %self.entity_id(), "Removing MQTT cover");
        self.unsubscribe_all(&mut active).await
    }

    async fn subscribe_all(&self, active: &mut Vec<String>, config: &CoverConfig) -> Result<()> {
        for topic in config.inbound_topics() {
            if active.iter().any(|subscribed| subscribed == topic) {
                continue;
            }
            self.transport
                .subscribe(topic, config.qos, self.handler())
                .await?;
            tracing::debug!(
                entity_id = %self.entity_id(),
                topic = %topic,
                "Subscribed cover topic"
            );
            active.push(topic.to_string());
        }
        Ok(())
    }

    async fn unsubscribe_all(&self, active: &mut Vec<String>) -> Result<()> {
        let handler = self.handler();
        while let Some(topic) = active.first() {
            self.transport.unsubscribe(topic, &handler).await?;
            tracing::debug!(
                entity_id = %self.entity_id(),
                topic = %topic,
                "Unsubscribed cover topic"
            );
            active.remove(0);
        }
        Ok(())
    }

    fn handler(&self) -> Weak<dyn MessageHandler> {
        self.this.clone()
    }

    // ========== Inbound ==========

    /// Handles one inbound message.
    ///
    /// The topic is matched against every configured inbound filter. Payloads
    /// that fail to decode are logged and dropped; the state keeps its
    /// previous value.
    pub fn handle_message(&self, topic: &str, payload: &str) {
        let config = self.config();
        let channels = Channel::classify(&config, topic);
        if channels.is_empty() {
            tracing::trace!(topic = %topic, "Ignoring message on unknown topic");
            return;
        }

        for channel in channels {
            let outcome = {
                let mut reconciler = self.reconciler.lock();
                reconciler
                    .decode(channel, payload)
                    .map(|change| reconciler.apply(&change).then_some(change))
            };

            match outcome {
                Ok(Some(change)) => {
                    tracing::debug!(
                        entity_id = %self.entity_id(),
                        channel = %channel,
                        payload = %payload,
                        "Accepted cover feedback"
                    );
                    self.notify(&change);
                }
                Ok(None) => {
                    tracing::trace!(channel = %channel, payload = %payload, "Feedback unchanged");
                }
                Err(e) => {
                    tracing::warn!(
                        entity_id = %self.entity_id(),
                        topic = %topic,
                        channel = %channel,
                        payload = %payload,
                        error = %e,
                        "Ignoring undecodable payload"
                    );
                }
            }
        }
    }

    fn notify(&self, change: &StateChange) {
        let snapshot = self.snapshot();
        self.callbacks.dispatch(change, &snapshot);
    }

    // ========== Commands ==========

    /// Executes a command.
    ///
    /// In optimistic mode the assumed state is applied only after the
    /// message has been published.
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityNotSupported` if the command's topic is not
    ///   configured
    /// - `Error::Template` if the set-position template fails
    /// - `Error::Protocol` if publishing fails
    pub async fn execute(&self, command: CoverCommand) -> Result<()> {
        let dispatch = self.settings.read().dispatcher.dispatch(command)?;

        tracing::debug!(
            entity_id = %self.entity_id(),
            command = %command,
            topic = %dispatch.message.topic,
            payload = %dispatch.message.payload,
            "Sending cover command"
        );
        self.transport
            .publish(&dispatch.message)
            .await
            .map_err(Error::Protocol)?;

        if let Some(change) = dispatch.optimistic {
            let changed = self.reconciler.lock().apply(&change);
            if changed {
                self.notify(&change);
            }
        }
        Ok(())
    }

    /// Opens the cover.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn open(&self) -> Result<()> {
        self.execute(CoverCommand::Open).await
    }

    /// Closes the cover.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn close(&self) -> Result<()> {
        self.execute(CoverCommand::Close).await
    }

    /// Stops the cover.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn stop(&self) -> Result<()> {
        self.execute(CoverCommand::Stop).await
    }

    /// Moves the cover to a position.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_position(&self, position: Percent) -> Result<()> {
        self.execute(CoverCommand::SetPosition(position)).await
    }

    /// Opens the tilt.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn open_tilt(&self) -> Result<()> {
        self.execute(CoverCommand::OpenTilt).await
    }

    /// Closes the tilt.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn close_tilt(&self) -> Result<()> {
        self.execute(CoverCommand::CloseTilt).await
    }

    /// Moves the tilt to a position.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_tilt(&self, tilt: Percent) -> Result<()> {
        self.execute(CoverCommand::SetTilt(tilt)).await
    }

    /// Returns `Some(true)` if closed, `Some(false)` if open, `None` if
    /// unknown.
    #[must_use]
    pub fn is_closed(&self) -> Option<bool> {
        self.reconciler.lock().state().is_closed()
    }

    /// Returns the open/closed status.
    #[must_use]
    pub fn status(&self) -> CoverStatus {
        self.reconciler.lock().state().status()
    }
}

impl<T> MessageHandler for MqttCover<T>
where
    T: Transport + Send + Sync + 'static,
{
    fn on_message(&self, topic: &str, payload: &str) {
        self.handle_message(topic, payload);
    }
}

impl<T: Transport> std::fmt::Debug for MqttCover<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = self.settings.read();
        f.debug_struct("MqttCover")
            .field("entity_id", &settings.entity_id)
            .field("name", &settings.config.name)
            .field("state", self.reconciler.lock().state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::OutboundMessage;
    use crate::error::ProtocolError;
    use crate::types::QualityOfService;

    #[derive(Default)]
    struct NullTransport {
        published: Mutex<Vec<OutboundMessage>>,
    }

    impl Transport for NullTransport {
        async fn publish(&self, message: &OutboundMessage) -> std::result::Result<(), ProtocolError> {
            self.published.lock().push(message.clone());
            Ok(())
        }

        async fn subscribe(
            &self,
            _topic: &str,
            _qos: QualityOfService,
            _handler: Weak<dyn MessageHandler>,
        ) -> std::result::Result<(), ProtocolError> {
            Ok(())
        }

        async fn unsubscribe(
            &self,
            _topic: &str,
            _handler: &Weak<dyn MessageHandler>,
        ) -> std::result::Result<(), ProtocolError> {
            Ok(())
        }
    }

    fn cover(config: CoverConfig) -> Arc<MqttCover<NullTransport>> {
        MqttCover::new("cover.test", config, Arc::new(NullTransport::default())).unwrap()
    }

    #[test]
    fn new_cover_is_unknown() {
        let cover = cover(CoverConfig::new("test").with_state_topic("state-topic"));
        let snapshot = cover.snapshot();

        assert_eq!(snapshot.state, "unknown");
        assert_eq!(snapshot.position, None);
        assert!(!snapshot.assumed_state);
        assert_eq!(cover.is_closed(), None);
    }

    #[test]
    fn handle_message_updates_snapshot() {
        let cover = cover(
            CoverConfig::new("test")
                .with_state_topic("state-topic")
                .with_position_topic("position-topic"),
        );

        cover.handle_message("position-topic", "0");
        assert_eq!(cover.snapshot().state, "closed");
        assert_eq!(cover.snapshot().position, Some(Percent::CLOSED));

        cover.handle_message("state-topic", "OPEN");
        assert_eq!(cover.status(), CoverStatus::Open);
    }

    #[test]
    fn unrelated_topic_is_ignored() {
        let cover = cover(CoverConfig::new("test").with_state_topic("state-topic"));
        cover.handle_message("other-topic", "OPEN");
        assert_eq!(cover.status(), CoverStatus::Unknown);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CoverConfig::new("test")
            .with_position_topic("position-topic")
            .with_position_range(50, 50);
        let result = MqttCover::new("cover.test", config, Arc::new(NullTransport::default()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn optimistic_open_applies_after_publish() {
        let cover = cover(CoverConfig::new("test").with_command_topic("command-topic"));
        cover.open().await.unwrap();

        assert_eq!(cover.transport().published.lock()[0].payload, "OPEN");
        let snapshot = cover.snapshot();
        assert_eq!(snapshot.state, "open");
        assert!(snapshot.assumed_state);
    }

    #[tokio::test]
    async fn unsupported_command_publishes_nothing() {
        let cover = cover(CoverConfig::new("test").with_command_topic("command-topic"));
        let result = cover.set_tilt(Percent::OPEN).await;

        assert!(matches!(result, Err(Error::CapabilityNotSupported("set_tilt"))));
        assert!(cover.transport().published.lock().is_empty());
    }
}
