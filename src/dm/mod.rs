//! IoT-hub direct methods over MQTT.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Direct-Method Stack                       │
//! │                                                              │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────────────────────┐  │
//! │  │ MqttPort │──▶│  topic   │──▶│ adapter → InvocationSink │  │
//! │  │ (trait)  │   │ (parse)  │   └──────────────────────────┘  │
//! │  └──────────┘   └──────────┘                │                │
//! │       ▲                                     ▼                │
//! │       │         ┌──────────┐   ┌──────────────────────────┐  │
//! │       └─────────│ respond  │◀──│  router (method table)   │  │
//! │                 └──────────┘   └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod adapter;
pub mod router;
pub mod topic;

pub use adapter::{handle_message, init, respond, respond_json, try_respond};
pub use router::{MethodResponse, MethodRouter};
