//! Application core — the invocation model and the port traits.
//!
//! Everything that crosses the boundary between the direct-method logic in
//! [`dm`](crate::dm) and the outside world (MQTT client, persistent config,
//! invocation consumers) is defined here, keeping the core testable without
//! a broker or flash.

pub mod events;
pub mod ports;
