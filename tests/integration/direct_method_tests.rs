//! Integration tests for the subscribe → parse → emit → respond chain.
//!
//! A [`MockMqtt`] stands in for the broker; invocations are captured by a
//! recording sink so each test can assert on exactly what was emitted.

use iothub_dm::app::ports::QoS;
use iothub_dm::config::DmConfig;
use iothub_dm::dm::{self, topic::REQUEST_FILTER};
use iothub_dm::{Error, app::ports::MqttError};
use serde_json::json;

use crate::mock_mqtt::{MockMqtt, recording_sink};

fn wired() -> (
    MockMqtt,
    std::sync::Arc<std::sync::Mutex<Vec<iothub_dm::app::events::OwnedInvocation>>>,
) {
    let mut mqtt = MockMqtt::new();
    let (sink, seen) = recording_sink();
    assert!(dm::init(&DmConfig::default(), &mut mqtt, sink));
    (mqtt, seen)
}

// ── Init ──────────────────────────────────────────────────────

#[test]
fn init_subscribes_request_filter_once() {
    let (mqtt, _) = wired();
    assert_eq!(mqtt.filters(), vec![REQUEST_FILTER]);
}

#[test]
fn init_disabled_subscribes_nothing() {
    let mut mqtt = MockMqtt::new();
    let (sink, _) = recording_sink();
    let config = DmConfig {
        enable_dm: false,
        ..DmConfig::default()
    };

    assert!(dm::init(&config, &mut mqtt, sink));
    assert!(mqtt.subscriptions.is_empty());
}

#[test]
fn init_reports_success_even_if_subscribe_refused() {
    let mut mqtt = MockMqtt::new();
    mqtt.fail_subscribe = true;
    let (sink, _) = recording_sink();

    assert!(dm::init(&DmConfig::default(), &mut mqtt, sink));
    assert!(mqtt.subscriptions.is_empty());
}

// ── Inbound ───────────────────────────────────────────────────

#[test]
fn well_formed_request_emits_one_invocation() {
    let (mut mqtt, seen) = wired();

    let n = mqtt.deliver("$iothub/methods/POST/reboot/?$rid=2a", br#"{"delay":5}"#);
    assert_eq!(n, 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "reboot");
    assert_eq!(seen[0].id, 0x2a);
    assert_eq!(seen[0].payload, br#"{"delay":5}"#);
}

#[test]
fn empty_payload_is_still_emitted() {
    let (mut mqtt, seen) = wired();
    mqtt.deliver("$iothub/methods/POST/ping/?$rid=1", b"");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].payload.is_empty());
}

#[test]
fn malformed_topics_emit_nothing() {
    let (mut mqtt, seen) = wired();

    // Empty method segment.
    mqtt.deliver("$iothub/methods/POST//?$rid=1", b"{}");
    // No $rid= marker.
    mqtt.deliver("$iothub/methods/POST/reboot/?rid=1", b"{}");
    mqtt.deliver("$iothub/methods/POST/reboot", b"{}");

    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn foreign_topics_never_reach_the_parser() {
    let (mut mqtt, seen) = wired();
    assert_eq!(mqtt.deliver("$iothub/twin/res/200/?$rid=1", b"{}"), 0);
    assert_eq!(mqtt.deliver("devices/x/messages", b"{}"), 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn missing_prefix_is_dropped_by_handle_message() {
    let (mut sink, seen) = recording_sink();
    dm::handle_message("$iothub/methods/GET/reboot/?$rid=1", b"{}", &mut sink);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn long_hex_run_reads_first_nineteen_digits() {
    let (mut mqtt, seen) = wired();
    // 25 hex characters; only the first 19 are significant.
    let topic = format!("$iothub/methods/POST/m/?$rid={}{}", "0".repeat(18), "1abcdef");
    mqtt.deliver(&topic, b"");

    assert_eq!(seen.lock().unwrap()[0].id, 1);
}

// ── Outbound ──────────────────────────────────────────────────

#[test]
fn respond_publishes_qos0_not_retained() {
    let mut mqtt = MockMqtt::new();
    assert!(dm::respond(&mut mqtt, 0x2a, 200, b"{}"));

    let msg = mqtt.last_published().unwrap();
    assert_eq!(msg.topic, "$iothub/methods/res/200/?$rid=2a");
    assert_eq!(msg.body(), "{}");
    assert_eq!(msg.qos, QoS::AtMostOnce);
    assert!(!msg.retain);
}

#[test]
fn respond_false_when_publish_fails() {
    let mut mqtt = MockMqtt::new();
    mqtt.fail_publish = true;

    assert!(!dm::respond(&mut mqtt, 1, 500, b"{}"));
    assert_eq!(
        dm::try_respond(&mut mqtt, 1, 500, b"{}"),
        Err(Error::Mqtt(MqttError::PublishFailed))
    );
}

#[test]
fn respond_json_renders_body() {
    let mut mqtt = MockMqtt::new();
    assert!(dm::respond_json(&mut mqtt, 7, 200, &json!({ "ok": true })));

    let msg = mqtt.last_published().unwrap();
    assert_eq!(msg.topic, "$iothub/methods/res/200/?$rid=7");
    assert_eq!(msg.body(), r#"{"ok":true}"#);
}

#[test]
fn request_id_round_trips_into_response_topic() {
    let (mut mqtt, seen) = wired();
    mqtt.deliver("$iothub/methods/POST/getTemp/?$rid=DEADbeef", b"");

    let id = seen.lock().unwrap()[0].id;
    assert!(dm::respond(&mut mqtt, id, 200, b"{}"));
    assert_eq!(
        mqtt.last_published().unwrap().topic,
        "$iothub/methods/res/200/?$rid=deadbeef"
    );
}
