// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection shared by covers.
//!
//! One broker connection serves any number of covers. Each cover subscribes
//! its own topic filters through the [`Transport`] implementation, and
//! inbound publishes are fanned out by the broker's [`TopicRouter`].
//!
//! # Examples
//!
//! ```no_run
//! use mqtt_cover::protocol::MqttBroker;
//!
//! # async fn example() -> mqtt_cover::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! if broker.is_connected() {
//!     println!("Connected to MQTT broker");
//! }
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use tokio::sync::oneshot;

use crate::command::OutboundMessage;
use crate::error::ProtocolError;
use crate::types::QualityOfService;

use super::{MessageHandler, TopicRouter, Transport};

/// Global counter for generating unique client IDs.
static BROKER_CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Pause between reconnection attempts after the connection drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
struct MqttBrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// An MQTT broker connection that can be shared across covers.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`).
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    /// The MQTT async client.
    client: AsyncClient,
    /// Routes inbound publishes to cover handlers.
    router: TopicRouter,
    /// Configuration used for this connection.
    config: MqttBrokerConfig,
    /// Connection status.
    connected: AtomicBool,
    /// Set by `disconnect()`; the event loop stops instead of reconnecting.
    closing: AtomicBool,
    /// Filters subscribed on the broker, restored after a reconnect.
    subscriptions: Mutex<HashMap<String, QualityOfService>>,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.inner.config.credentials.is_some()
    }

    /// Returns the router fanning out inbound messages.
    #[must_use]
    pub fn router(&self) -> &TopicRouter {
        &self.inner.router
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be sent.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.closing.store(true, Ordering::Release);
        self.inner.client.disconnect().await?;
        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }
}

impl Transport for MqttBroker {
    async fn publish(&self, message: &OutboundMessage) -> Result<(), ProtocolError> {
        tracing::debug!(
            topic = %message.topic,
            payload = %message.payload,
            qos = message.qos.level(),
            retain = message.retain,
            "Publishing MQTT message"
        );
        self.inner
            .client
            .publish(
                message.topic.as_str(),
                message.qos.into(),
                message.retain,
                message.payload.as_bytes().to_vec(),
            )
            .await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        qos: QualityOfService,
        handler: Weak<dyn MessageHandler>,
    ) -> Result<(), ProtocolError> {
        self.inner.router.register(topic, handler.clone());

        // Subscribe even for shared filters so retained messages are replayed
        if let Err(e) = self.inner.client.subscribe(topic, qos.into()).await {
            self.inner.router.unregister(topic, &handler);
            return Err(e.into());
        }

        self.inner
            .subscriptions
            .lock()
            .insert(topic.to_string(), qos);
        tracing::debug!(topic = %topic, qos = qos.level(), "Subscribed to topic");
        Ok(())
    }

    async fn unsubscribe(
        &self,
        topic: &str,
        handler: &Weak<dyn MessageHandler>,
    ) -> Result<(), ProtocolError> {
        if self.inner.router.unregister(topic, handler) {
            self.inner.subscriptions.lock().remove(topic);
            self.inner.client.unsubscribe(topic).await?;
            tracing::debug!(topic = %topic, "Unsubscribed from topic");
        }

        // Covers dropped without `remove()` leave filters behind
        for stale in self.inner.router.cleanup() {
            self.inner.subscriptions.lock().remove(&stale);
            self.inner.client.unsubscribe(stale.as_str()).await?;
            tracing::debug!(topic = %stale, "Unsubscribed stale topic");
        }
        Ok(())
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use mqtt_cover::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> mqtt_cover::Result<()> {
/// let broker = MqttBroker::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .credentials("user", "password")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Builds and connects to the MQTT broker.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let counter = BROKER_CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("mqtt_cover_{}_{}", std::process::id(), counter);

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let broker = MqttBroker {
            inner: Arc::new(MqttBrokerInner {
                client,
                router: TopicRouter::new(),
                config: self.config.clone(),
                connected: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                subscriptions: Mutex::new(HashMap::new()),
            }),
        };

        let (connack_tx, connack_rx) = oneshot::channel();

        // The event loop only holds a weak reference so dropping every broker
        // handle ends it
        let weak_inner = Arc::downgrade(&broker.inner);
        tokio::spawn(async move {
            handle_broker_events(event_loop, weak_inner, Some(connack_tx)).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                broker.inner.connected.store(true, Ordering::Release);
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    "Connected to MQTT broker"
                );
            }
            Ok(Err(_)) => {
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                return Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        Ok(broker)
    }
}

/// What the event loop does after a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollFailure {
    /// Stop polling and end the task.
    Stop,
    /// Wait, then poll again; rumqttc reconnects on the next poll.
    Retry,
}

/// Decides how to react to a connection error.
///
/// The first connection attempt fails fast so `build()` can report it, and
/// an explicit `disconnect()` is never undone.
fn on_poll_failure(awaiting_connack: bool, closing: bool) -> PollFailure {
    if awaiting_connack || closing {
        PollFailure::Stop
    } else {
        PollFailure::Retry
    }
}

/// Re-subscribes every known filter after a reconnect.
///
/// Sessions are clean, so the broker forgot them.
async fn restore_subscriptions(inner: Arc<MqttBrokerInner>) {
    let filters: Vec<(String, QualityOfService)> = inner
        .subscriptions
        .lock()
        .iter()
        .map(|(filter, qos)| (filter.clone(), *qos))
        .collect();

    for (filter, qos) in filters {
        match inner.client.subscribe(filter.as_str(), qos.into()).await {
            Ok(()) => tracing::debug!(topic = %filter, "Restored subscription"),
            Err(e) => {
                tracing::warn!(topic = %filter, error = %e, "Failed to restore subscription");
            }
        }
    }
}

/// Handles MQTT events for the broker connection.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    inner: Weak<MqttBrokerInner>,
    connack_tx: Option<oneshot::Sender<()>>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = connack_tx;

    loop {
        let event = event_loop.poll().await;
        let Some(inner) = inner.upgrade() else {
            tracing::debug!("MQTT broker dropped, stopping event loop");
            break;
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                } else {
                    tracing::info!(host = %inner.config.host, "Reconnected to MQTT broker");
                    // Spawned so the event loop keeps draining requests
                    tokio::spawn(restore_subscriptions(Arc::clone(&inner)));
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => {
                        tracing::debug!(
                            topic = %publish.topic,
                            payload = %payload,
                            "MQTT message received"
                        );
                        inner.router.route(&publish.topic, &payload);
                    }
                    Err(e) => {
                        tracing::warn!(
                            topic = %publish.topic,
                            error = %e,
                            "Dropping non UTF-8 MQTT payload"
                        );
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                inner.connected.store(false, Ordering::Release);
                if inner.closing.load(Ordering::Acquire) {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                inner.connected.store(false, Ordering::Release);
                let closing = inner.closing.load(Ordering::Acquire);
                match on_poll_failure(connack_tx.is_some(), closing) {
                    PollFailure::Stop => {
                        tracing::error!(error = %e, "MQTT broker event loop error");
                        break;
                    }
                    PollFailure::Retry => {
                        tracing::warn!(
                            error = %e,
                            retry_in_secs = RECONNECT_DELAY.as_secs(),
                            "MQTT connection lost, reconnecting"
                        );
                        drop(inner);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_values() {
        let builder = MqttBrokerBuilder::default();
        assert_eq!(builder.config.port, 1883);
        assert!(builder.config.host.is_empty());
        assert!(builder.config.credentials.is_none());
        assert_eq!(builder.config.keep_alive, Duration::from_secs(30));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(10));
    }

    #[test]
    fn builder_chain() {
        let builder = MqttBrokerBuilder::default()
            .host("192.168.1.50")
            .port(8883)
            .credentials("admin", "secret")
            .keep_alive(Duration::from_secs(45))
            .connection_timeout(Duration::from_secs(15));

        assert_eq!(builder.config.host, "192.168.1.50");
        assert_eq!(builder.config.port, 8883);
        let (user, pass) = builder.config.credentials.unwrap();
        assert_eq!(user, "admin");
        assert_eq!(pass, "secret");
        assert_eq!(builder.config.keep_alive, Duration::from_secs(45));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(15));
    }

    #[test]
    fn connection_loss_is_retried() {
        assert_eq!(on_poll_failure(false, false), PollFailure::Retry);
    }

    #[test]
    fn first_connection_failure_stops() {
        assert_eq!(on_poll_failure(true, false), PollFailure::Stop);
    }

    #[test]
    fn explicit_disconnect_stops() {
        assert_eq!(on_poll_failure(false, true), PollFailure::Stop);
    }

    #[tokio::test]
    async fn builder_missing_host_fails() {
        let result = MqttBrokerBuilder::default().build().await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn connection_timeout_is_reported() {
        // Nothing listens on port 1 so the ConnAck never arrives
        let result = MqttBrokerBuilder::default()
            .host("127.0.0.1")
            .port(1)
            .connection_timeout(Duration::from_millis(200))
            .build()
            .await;
        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
    }
}
