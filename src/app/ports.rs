//! Port traits — the hexagonal boundary between the direct-method core and
//! the outside world.
//!
//! ```text
//!   MqttPort ──▶ dm::adapter ──▶ InvocationSink
//!                    │
//!   ConfigPort ──────┘
//! ```
//!
//! Driven adapters (MQTT client, NVS, event consumers) implement these
//! traits.  The [`dm`](crate::dm) layer consumes them via generics, so it
//! never touches a concrete MQTT stack directly.

use core::fmt;

use super::events::DirectMethodInvocation;
use crate::config::DmConfig;

// ───────────────────────────────────────────────────────────────
// MQTT port (driven adapter: domain ↔ broker)
// ───────────────────────────────────────────────────────────────

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    /// Level 0 — fire and forget.
    AtMostOnce,
    /// Level 1 — acknowledged, may duplicate.
    AtLeastOnce,
    /// Level 2 — four-way handshake.
    ExactlyOnce,
}

/// Per-message callback registered with [`MqttPort::subscribe`].
///
/// Invoked with the full topic and the raw message body.  Runs on the MQTT
/// client's delivery context, so it must be `Send` and must not block.
pub type MessageHandler = Box<dyn FnMut(&str, &[u8]) + Send + 'static>;

/// Minimal MQTT client surface used by the direct-method adapter.
pub trait MqttPort {
    /// Register `handler` for every inbound message matching `filter`.
    fn subscribe(&mut self, filter: &str, handler: MessageHandler) -> Result<(), MqttError>;

    /// Enqueue `payload` on `topic`.  Does not wait for acknowledgement.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool)
    -> Result<(), MqttError>;
}

// ───────────────────────────────────────────────────────────────
// Invocation sink port (driven adapter: domain → consumers)
// ───────────────────────────────────────────────────────────────

/// Receives every well-formed direct-method invocation.
///
/// Delivery is synchronous: the invocation borrows from the MQTT callback
/// and is gone once `emit` returns.  Sinks that need to keep it must copy
/// it (see [`OwnedInvocation`](super::events::OwnedInvocation)).
pub trait InvocationSink {
    fn emit(&mut self, invocation: &DirectMethodInvocation<'_>);
}

impl<F> InvocationSink for F
where
    F: FnMut(&DirectMethodInvocation<'_>),
{
    fn emit(&mut self, invocation: &DirectMethodInvocation<'_>) {
        self(invocation);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`DmConfig`].
///
/// Implementations MUST call [`DmConfig::validate`] before persisting and
/// reject invalid values rather than clamping them.
pub trait ConfigPort {
    /// Load configuration.  Returns [`DmConfig::default()`] if none is stored.
    fn load(&self) -> Result<DmConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DmConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`MqttPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttError {
    /// The client has no broker session.
    NotConnected,
    /// The topic filter violates MQTT wildcard rules.
    InvalidFilter,
    /// The client refused the subscription.
    SubscribeFailed,
    /// The client refused to enqueue the message.
    PublishFailed,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::InvalidFilter => write!(f, "invalid topic filter"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for MqttError {}

impl core::error::Error for ConfigError {}
