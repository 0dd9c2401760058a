//! MQTT client adapter.
//!
//! Implements [`MqttPort`] — subscribe with a per-filter callback, publish
//! without waiting for acknowledgement.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: wraps the ESP-IDF MQTT client
//!   (`esp_idf_svc::mqtt::client::EspMqttClient`).  Inbound messages arrive
//!   on the client's own task and are routed through the shared
//!   [`SubscriptionTable`].
//! - **all other targets**: an in-memory broker stand-in that records
//!   publishes and lets tests inject inbound messages with
//!   [`MqttAdapter::deliver`].
//!
//! ## Subscription model
//!
//! The underlying clients deliver every message to one callback.  The
//! adapter keeps its own filter → handler table and fans each message out
//! to every handler whose filter matches, using MQTT wildcard rules.

use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::app::ports::{MessageHandler, MqttError, MqttPort, QoS};

#[cfg(target_os = "espidf")]
mod esp_impl;

// ───────────────────────────────────────────────────────────────
// Topic filter matching
// ───────────────────────────────────────────────────────────────

/// Check a topic filter against the MQTT wildcard rules.
///
/// `#` must be the last level and occupy it alone; `+` must occupy a whole
/// level.
pub fn is_valid_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }
    let mut levels = filter.split('/').peekable();
    while let Some(level) = levels.next() {
        if level.contains('#') && (level != "#" || levels.peek().is_some()) {
            return false;
        }
        if level.contains('+') && level != "+" {
            return false;
        }
    }
    true
}

/// Does `topic` match `filter`?
///
/// Topics starting with `$` are never matched by a leading wildcard.
pub fn topic_matches_filter(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(fl), Some(tl)) if fl == tl => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Subscription table
// ───────────────────────────────────────────────────────────────

struct Subscription {
    filter: String,
    handler: MessageHandler,
}

/// Filter → handler table shared between the adapter and the client's
/// delivery callback.
#[derive(Clone, Default)]
pub struct SubscriptionTable {
    subs: Arc<Mutex<Vec<Subscription>>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, filter: &str, handler: MessageHandler) -> Result<(), MqttError> {
        if !is_valid_filter(filter) {
            return Err(MqttError::InvalidFilter);
        }
        self.lock().push(Subscription {
            filter: filter.to_string(),
            handler,
        });
        Ok(())
    }

    /// Run every handler whose filter matches `topic`.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> usize {
        let mut subs = self.lock();
        let mut delivered = 0;
        for sub in subs.iter_mut() {
            if topic_matches_filter(&sub.filter, topic) {
                (sub.handler)(topic, payload);
                delivered += 1;
            }
        }
        delivered
    }

    /// Snapshot of the registered filters, in registration order.
    pub fn filters(&self) -> Vec<String> {
        self.lock().iter().map(|s| s.filter.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        // A handler that panicked leaves the table itself intact.
        self.subs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// MqttAdapter
// ───────────────────────────────────────────────────────────────

/// A message accepted by [`MqttAdapter::publish`] (simulation backend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

pub struct MqttAdapter {
    table: SubscriptionTable,

    // ── ESP-IDF fields ──────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    client: esp_impl::EspClient,

    // ── Simulation fields ───────────────────────────────────────
    #[cfg(not(target_os = "espidf"))]
    connected: bool,
    #[cfg(not(target_os = "espidf"))]
    published: Vec<PublishedMessage>,
}

impl MqttAdapter {
    /// Create the client and start connecting to `broker_url`.
    #[cfg(target_os = "espidf")]
    pub fn new(broker_url: &str, client_id: &str) -> Result<Self, MqttError> {
        let table = SubscriptionTable::new();
        let client = esp_impl::EspClient::connect(broker_url, client_id, table.clone())?;
        info!("MQTT: client started for {} as '{}'", broker_url, client_id);
        Ok(Self { table, client })
    }

    /// Create a disconnected simulation client.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(broker_url: &str, client_id: &str) -> Result<Self, MqttError> {
        info!("MQTT(sim): client for {} as '{}'", broker_url, client_id);
        Ok(Self {
            table: SubscriptionTable::new(),
            connected: false,
            published: Vec::new(),
        })
    }

    pub fn subscriptions(&self) -> &SubscriptionTable {
        &self.table
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Re-issue broker subscriptions after a (re)connect.  Call from the
    /// main loop.
    #[cfg(target_os = "espidf")]
    pub fn poll(&mut self) {
        self.client.resubscribe_if_needed(&self.table);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn poll(&mut self) {}

    #[cfg(not(target_os = "espidf"))]
    pub fn connect(&mut self) {
        self.connected = true;
        info!("MQTT(sim): connected");
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn disconnect(&mut self) {
        self.connected = false;
        info!("MQTT(sim): disconnected");
    }

    /// Inject an inbound message as if the broker had delivered it.
    ///
    /// Returns the number of handlers that received it.
    #[cfg(not(target_os = "espidf"))]
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) -> usize {
        self.table.dispatch(topic, payload)
    }

    /// Every message accepted by `publish`, oldest first.
    #[cfg(not(target_os = "espidf"))]
    pub fn published(&self) -> &[PublishedMessage] {
        &self.published
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn take_published(&mut self) -> Vec<PublishedMessage> {
        core::mem::take(&mut self.published)
    }
}

impl MqttPort for MqttAdapter {
    fn subscribe(&mut self, filter: &str, handler: MessageHandler) -> Result<(), MqttError> {
        self.table.add(filter, handler)?;

        #[cfg(target_os = "espidf")]
        if self.client.is_connected() {
            self.client.subscribe(filter)?;
        }

        info!("MQTT: subscribed '{}'", filter);
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        #[cfg(target_os = "espidf")]
        {
            self.client.enqueue(topic, payload, qos, retain)
        }

        #[cfg(not(target_os = "espidf"))]
        {
            if !self.connected {
                warn!("MQTT(sim): publish to '{}' while disconnected", topic);
                return Err(MqttError::NotConnected);
            }
            self.published.push(PublishedMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
                qos,
                retain,
            });
            Ok(())
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
