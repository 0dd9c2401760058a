//! System configuration parameters
//!
//! Everything the direct-method adapter and the firmware binary need from
//! persistent settings.  Values are stored via [`ConfigPort`].
//!
//! ## Build-time provisioning
//!
//! The defaults are seeded from environment variables read when the firmware
//! is compiled, so a freshly flashed device can join its network:
//!
//! | Variable                  | Field               | Fallback                |
//! |---------------------------|---------------------|-------------------------|
//! | `IOTHUB_DM_ENABLE`        | `enable_dm`         | `true`                  |
//! | `IOTHUB_DM_BROKER_URL`    | `mqtt.broker_url`   | `mqtt://localhost:1883` |
//! | `IOTHUB_DM_CLIENT_ID`     | `mqtt.client_id`    | `iothub-dm`             |
//! | `IOTHUB_DM_WIFI_SSID`     | `wifi.ssid`         | empty                   |
//! | `IOTHUB_DM_WIFI_PASSWORD` | `wifi.password`     | empty (open network)    |
//!
//! A value that does not fit its field falls back.
//!
//! [`ConfigPort`]: crate::app::ports::ConfigPort

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// URL schemes accepted for `mqtt.broker_url`.
const BROKER_SCHEMES: [&str; 4] = ["mqtt://", "mqtts://", "ws://", "wss://"];

const SEED_ENABLE: Option<&str> = option_env!("IOTHUB_DM_ENABLE");
const SEED_BROKER_URL: Option<&str> = option_env!("IOTHUB_DM_BROKER_URL");
const SEED_CLIENT_ID: Option<&str> = option_env!("IOTHUB_DM_CLIENT_ID");
const SEED_WIFI_SSID: Option<&str> = option_env!("IOTHUB_DM_WIFI_SSID");
const SEED_WIFI_PASSWORD: Option<&str> = option_env!("IOTHUB_DM_WIFI_PASSWORD");

const DEFAULT_BROKER_URL: &str = "mqtt://localhost:1883";
const DEFAULT_CLIENT_ID: &str = "iothub-dm";

/// Core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmConfig {
    /// Direct-method handling on/off.  When off, `dm::init` subscribes to
    /// nothing and the feature is inert.
    pub enable_dm: bool,
    pub mqtt: MqttSettings,
    pub wifi: WifiSettings,
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttSettings {
    /// e.g. `mqtts://my-hub.azure-devices.net:8883`
    pub broker_url: String<128>,
    pub client_id: String<64>,
}

/// WiFi station credentials.  An empty password means an open network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiSettings {
    pub ssid: String<32>,
    pub password: String<64>,
}

impl Default for DmConfig {
    fn default() -> Self {
        Self {
            enable_dm: seeded_flag(SEED_ENABLE, true),
            mqtt: MqttSettings::default(),
            wifi: WifiSettings::default(),
        }
    }
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_url: seeded(SEED_BROKER_URL, DEFAULT_BROKER_URL),
            client_id: seeded(SEED_CLIENT_ID, DEFAULT_CLIENT_ID),
        }
    }
}

impl Default for WifiSettings {
    fn default() -> Self {
        Self {
            ssid: seeded(SEED_WIFI_SSID, ""),
            password: seeded(SEED_WIFI_PASSWORD, ""),
        }
    }
}

/// `seed` if it is set, non-empty and fits, otherwise `fallback`.
fn seeded<const N: usize>(seed: Option<&str>, fallback: &str) -> String<N> {
    let mut value = String::new();
    if let Some(seed) = seed.filter(|s| !s.is_empty()) {
        if value.push_str(seed).is_ok() {
            return value;
        }
        value.clear();
    }
    let _ = value.push_str(fallback);
    value
}

fn seeded_flag(seed: Option<&str>, fallback: bool) -> bool {
    match seed.map(str::trim) {
        Some("1" | "true" | "on" | "yes") => true,
        Some("0" | "false" | "off" | "no") => false,
        _ => fallback,
    }
}

impl DmConfig {
    /// Range-check every field.  Called by `ConfigPort::save` before
    /// anything is persisted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.mqtt.broker_url.as_str();
        if url.is_empty() {
            return Err(ConfigError::ValidationFailed("mqtt.broker_url must not be empty"));
        }
        if !BROKER_SCHEMES.iter().any(|s| url.starts_with(s)) {
            return Err(ConfigError::ValidationFailed(
                "mqtt.broker_url must use mqtt://, mqtts://, ws:// or wss://",
            ));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::ValidationFailed("mqtt.client_id must not be empty"));
        }
        let pw = self.wifi.password.len();
        if pw != 0 && pw < 8 {
            return Err(ConfigError::ValidationFailed(
                "wifi.password must be empty or at least 8 bytes",
            ));
        }
        Ok(())
    }
}
