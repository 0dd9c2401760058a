//! IoT-hub direct-method firmware — main entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  MqttAdapter        ChannelSink        NvsAdapter              │
//! │  (MqttPort)         (InvocationSink)   (ConfigPort)            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   dm::adapter (parse · respond)   dm::router (methods) │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use log::{info, warn};
use serde_json::{Value, json};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_hal::prelude::Peripherals;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use iothub_dm::adapters::channel_sink::{ChannelSink, INVOCATION_CHANNEL, drain_invocations};
use iothub_dm::adapters::mqtt::MqttAdapter;
use iothub_dm::adapters::nvs::NvsAdapter;
use iothub_dm::app::ports::ConfigPort;
use iothub_dm::config::{DmConfig, WifiSettings};
use iothub_dm::dm::{self, MethodResponse, MethodRouter};

/// Main-loop period while idle.
const LOOP_PERIOD: Duration = Duration::from_millis(20);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;
    info!("iothub-dm v{}", env!("CARGO_PKG_VERSION"));
    let boot = Instant::now();

    // ── 2. Load config from NVS (first boot stores build-time defaults) ──
    let config = match NvsAdapter::new().and_then(|nvs| nvs.load_or_provision()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            DmConfig::default()
        }
    };

    // ── 3. Network ────────────────────────────────────────────
    let _wifi = connect_wifi(&config.wifi)?;
    let mut mqtt = MqttAdapter::new(&config.mqtt.broker_url, &config.mqtt.client_id)
        .map_err(|e| anyhow!("MQTT client: {}", e))?;

    // ── 4. Direct methods ─────────────────────────────────────
    let mut router = build_router(boot)?;
    dm::init(&config, &mut mqtt, ChannelSink::default());

    // ── 5. Main loop ──────────────────────────────────────────
    loop {
        mqtt.poll();
        drain_invocations(&INVOCATION_CHANNEL, |inv| {
            router.dispatch(&inv.as_invocation(), &mut mqtt);
        });
        std::thread::sleep(LOOP_PERIOD);
    }
}

fn build_router(boot: Instant) -> Result<MethodRouter> {
    let mut router = MethodRouter::new();
    router.register("ping", |_| MethodResponse::ok(json!({ "pong": true })))?;
    router.register("uptime", move |_| {
        MethodResponse::ok(json!({ "uptime_s": boot.elapsed().as_secs() }))
    })?;
    router.register("echo", |inv| match serde_json::from_slice::<Value>(inv.payload) {
        Ok(body) => MethodResponse::ok(body),
        Err(_) => MethodResponse::error(400, "payload is not JSON"),
    })?;
    Ok(router)
}

fn connect_wifi(settings: &WifiSettings) -> Result<BlockingWifi<EspWifi<'static>>> {
    if settings.ssid.is_empty() {
        bail!("no WiFi credentials provisioned (build with IOTHUB_DM_WIFI_SSID set)");
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), None)?,
        sysloop,
    )?;

    let auth_method = if settings.password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: settings
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("SSID does not fit"))?,
        password: settings
            .password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("password does not fit"))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: connected to '{}'", settings.ssid);
    Ok(wifi)
}
