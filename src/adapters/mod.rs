//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements       | Connects to                    |
//! |----------------|------------------|--------------------------------|
//! | `channel_sink` | InvocationSink   | embassy-sync channel → main loop |
//! | `log_sink`     | InvocationSink   | Serial log output              |
//! | `mqtt`         | MqttPort         | ESP-IDF MQTT client / sim      |
//! | `nvs`          | ConfigPort       | NVS / in-memory store          |

pub mod channel_sink;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
