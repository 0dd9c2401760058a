//! Method router — maps direct-method names to handlers and answers them.
//!
//! Every invocation passes a two-gate pipeline before a handler runs:
//!
//! 1. **Rate limiting** — token-bucket rejects bursts with `429` (via `burster`).
//! 2. **Lookup** — unknown method names get `404`, so the cloud caller does
//!    not sit out its timeout.
//!
//! The router does not own a transport; the caller passes the MQTT port to
//! [`MethodRouter::dispatch`] so it can run on the main loop, outside the
//! MQTT delivery callback.

use core::fmt;
use core::time::Duration;

use burster::Limiter;
use heapless::String;
use log::{info, warn};
use serde_json::{Value, json};

use crate::app::events::{DirectMethodInvocation, MAX_METHOD_NAME_LEN};
use crate::app::ports::MqttPort;

use super::adapter::respond_json;

/// Handler for a single method.  Runs on the caller of `dispatch`.
pub type MethodHandler = Box<dyn FnMut(&DirectMethodInvocation<'_>) -> MethodResponse + Send>;

/// Status code and JSON body of a method response.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodResponse {
    pub status: i32,
    pub body: Value,
}

impl MethodResponse {
    pub fn new(status: i32, body: Value) -> Self {
        Self { status, body }
    }

    /// `200` with `body`.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// `status` with `{"error": message}`.
    pub fn error(status: i32, message: &str) -> Self {
        Self::new(status, json!({ "error": message }))
    }
}

/// Errors from [`MethodRouter::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterError {
    EmptyName,
    NameTooLong,
    Duplicate,
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "method name is empty"),
            Self::NameTooLong => write!(f, "method name exceeds {} bytes", MAX_METHOD_NAME_LEN),
            Self::Duplicate => write!(f, "method already registered"),
        }
    }
}

impl core::error::Error for RouterError {}

struct Route {
    name: String<MAX_METHOD_NAME_LEN>,
    handler: MethodHandler,
}

pub struct MethodRouter {
    routes: Vec<Route>,
    rate_limiter: burster::TokenBucket<fn() -> Duration>,
}

impl Default for MethodRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRouter {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            rate_limiter: burster::TokenBucket::new_with_time_provider(
                10,
                10, // 10 invocations per second, 10 burst capacity
                platform_now as fn() -> Duration,
            ),
        }
    }

    /// Register `handler` under the exact method name `name`.
    pub fn register<F>(&mut self, name: &str, handler: F) -> Result<(), RouterError>
    where
        F: FnMut(&DirectMethodInvocation<'_>) -> MethodResponse + Send + 'static,
    {
        if name.is_empty() {
            return Err(RouterError::EmptyName);
        }
        if self.contains(name) {
            return Err(RouterError::Duplicate);
        }
        let mut key = String::new();
        key.push_str(name).map_err(|()| RouterError::NameTooLong)?;
        self.routes.push(Route {
            name: key,
            handler: Box::new(handler),
        });
        info!("DM router: registered '{}'", name);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.iter().any(|r| r.name == name)
    }

    /// Route one invocation and publish its response.
    ///
    /// Returns the outcome of the response publish.
    pub fn dispatch(
        &mut self,
        invocation: &DirectMethodInvocation<'_>,
        mqtt: &mut (impl MqttPort + ?Sized),
    ) -> bool {
        let response = self.route(invocation);
        respond_json(mqtt, invocation.id, response.status, &response.body)
    }

    /// Run the pipeline without publishing.
    pub fn route(&mut self, invocation: &DirectMethodInvocation<'_>) -> MethodResponse {
        if self.rate_limiter.try_consume(1).is_err() {
            warn!("DM router: rate limited '{}' (rid {:x})", invocation.method, invocation.id as u64);
            return MethodResponse::error(429, "rate limited");
        }

        match self.routes.iter_mut().find(|r| r.name == invocation.method) {
            Some(route) => (route.handler)(invocation),
            None => {
                warn!("DM router: no handler for '{}'", invocation.method);
                MethodResponse::new(
                    404,
                    json!({ "error": "method not found", "method": invocation.method }),
                )
            }
        }
    }
}

#[cfg(target_os = "espidf")]
fn platform_now() -> Duration {
    // SAFETY: esp_timer_get_time is a read-only query of the monotonic timer.
    let us = unsafe { esp_idf_sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(target_os = "espidf"))]
fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
