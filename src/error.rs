//! Unified error types for the direct-method adapter.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! caller-facing error handling uniform.  All variants are `Copy` so they
//! can be passed through the MQTT callback path without allocation.
//!
//! None of these are fatal: the public entry points degrade every error
//! to "log and drop" (inbound) or `false` (outbound).

use core::fmt;

use crate::app::ports::{ConfigError, MqttError};
use crate::dm::router::RouterError;
use crate::dm::topic::TopicError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An inbound request topic was malformed.
    Topic(TopicError),
    /// The MQTT transport rejected a subscribe or publish.
    Mqtt(MqttError),
    /// A response body could not be rendered to JSON.
    Render(RenderError),
    /// The formatted response topic did not fit its buffer.
    ResponseTopicOverflow,
    /// Method table registration failed.
    Router(RouterError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topic(e) => write!(f, "topic: {e}"),
            Self::Mqtt(e) => write!(f, "mqtt: {e}"),
            Self::Render(e) => write!(f, "render: {e}"),
            Self::ResponseTopicOverflow => write!(f, "response topic too long"),
            Self::Router(e) => write!(f, "router: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<TopicError> for Error {
    fn from(e: TopicError) -> Self {
        Self::Topic(e)
    }
}

impl From<MqttError> for Error {
    fn from(e: MqttError) -> Self {
        Self::Mqtt(e)
    }
}

impl From<RenderError> for Error {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

impl From<RouterError> for Error {
    fn from(e: RouterError) -> Self {
        Self::Router(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Render errors
// ---------------------------------------------------------------------------

/// JSON rendering of a response body failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// `serde_json` refused the value (e.g. a map with non-string keys).
    Serialize,
    /// The rendered body was empty.
    Empty,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize => write!(f, "JSON serialization failed"),
            Self::Empty => write!(f, "rendered body is empty"),
        }
    }
}

impl core::error::Error for RenderError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
