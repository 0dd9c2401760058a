//! End-to-end tests for the simulated MQTT client → channel → router path,
//! the same wiring the firmware main loop uses.

use iothub_dm::adapters::channel_sink::{ChannelSink, InvocationChannel, drain_invocations};
use iothub_dm::adapters::mqtt::MqttAdapter;
use iothub_dm::app::ports::QoS;
use iothub_dm::config::DmConfig;
use iothub_dm::dm::{self, MethodResponse, MethodRouter};
use serde_json::{Value, json};

fn router() -> MethodRouter {
    let mut router = MethodRouter::new();
    router
        .register("ping", |_| MethodResponse::ok(json!({ "pong": true })))
        .unwrap();
    router
        .register("echo", |inv| match serde_json::from_slice::<Value>(inv.payload) {
            Ok(body) => MethodResponse::ok(body),
            Err(_) => MethodResponse::error(400, "payload is not JSON"),
        })
        .unwrap();
    router
}

fn adapter(channel: &'static InvocationChannel) -> MqttAdapter {
    let mut mqtt = MqttAdapter::new("mqtt://localhost:1883", "test").unwrap();
    mqtt.connect();
    assert!(dm::init(&DmConfig::default(), &mut mqtt, ChannelSink::new(channel)));
    mqtt
}

fn pump(channel: &InvocationChannel, router: &mut MethodRouter, mqtt: &mut MqttAdapter) -> usize {
    drain_invocations(channel, |inv| {
        router.dispatch(&inv.as_invocation(), &mut *mqtt);
    })
}

// ── Dispatch ──────────────────────────────────────────────────

#[test]
fn ping_round_trip() {
    static CH: InvocationChannel = InvocationChannel::new();
    let mut mqtt = adapter(&CH);
    let mut router = router();

    assert_eq!(mqtt.deliver("$iothub/methods/POST/ping/?$rid=10", b""), 1);
    assert_eq!(pump(&CH, &mut router, &mut mqtt), 1);

    let out = mqtt.take_published();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].topic, "$iothub/methods/res/200/?$rid=10");
    assert_eq!(out[0].payload, br#"{"pong":true}"#);
    assert_eq!(out[0].qos, QoS::AtMostOnce);
    assert!(!out[0].retain);
}

#[test]
fn handler_status_is_published() {
    static CH: InvocationChannel = InvocationChannel::new();
    let mut mqtt = adapter(&CH);
    let mut router = router();

    mqtt.deliver("$iothub/methods/POST/echo/?$rid=3", b"not json");
    pump(&CH, &mut router, &mut mqtt);

    let out = mqtt.take_published();
    assert_eq!(out[0].topic, "$iothub/methods/res/400/?$rid=3");
    assert_eq!(out[0].payload, br#"{"error":"payload is not JSON"}"#);
}

#[test]
fn unknown_method_gets_404() {
    static CH: InvocationChannel = InvocationChannel::new();
    let mut mqtt = adapter(&CH);
    let mut router = router();

    mqtt.deliver("$iothub/methods/POST/selfDestruct/?$rid=ab", b"{}");
    pump(&CH, &mut router, &mut mqtt);

    let out = mqtt.take_published();
    assert_eq!(out[0].topic, "$iothub/methods/res/404/?$rid=ab");
    let body: Value = serde_json::from_slice(&out[0].payload).unwrap();
    assert_eq!(body["method"], "selfDestruct");
}

#[test]
fn invocations_are_answered_in_arrival_order() {
    static CH: InvocationChannel = InvocationChannel::new();
    let mut mqtt = adapter(&CH);
    let mut router = router();

    for rid in 1..=3 {
        mqtt.deliver(&format!("$iothub/methods/POST/ping/?$rid={rid}"), b"");
    }
    assert_eq!(pump(&CH, &mut router, &mut mqtt), 3);

    let topics: Vec<_> = mqtt.take_published().into_iter().map(|m| m.topic).collect();
    assert_eq!(
        topics,
        vec![
            "$iothub/methods/res/200/?$rid=1",
            "$iothub/methods/res/200/?$rid=2",
            "$iothub/methods/res/200/?$rid=3",
        ]
    );
}

// ── Back-pressure ─────────────────────────────────────────────

#[test]
fn full_channel_drops_extra_invocations() {
    static CH: InvocationChannel = InvocationChannel::new();
    let mut mqtt = adapter(&CH);
    let mut router = router();

    for rid in 0..12 {
        mqtt.deliver(&format!("$iothub/methods/POST/ping/?$rid={rid:x}"), b"");
    }
    assert_eq!(
        pump(&CH, &mut router, &mut mqtt),
        iothub_dm::adapters::channel_sink::INVOCATION_DEPTH
    );
}

#[test]
fn burst_beyond_limit_is_rate_limited() {
    static CH: InvocationChannel = InvocationChannel::new();
    let mut mqtt = adapter(&CH);
    let mut router = router();

    // Two batches of 8 stay under the channel depth but exceed the bucket.
    for batch in 0..2 {
        for i in 0..8 {
            mqtt.deliver(&format!("$iothub/methods/POST/ping/?$rid={:x}", batch * 8 + i), b"");
        }
        pump(&CH, &mut router, &mut mqtt);
    }

    let statuses: Vec<_> = mqtt
        .take_published()
        .into_iter()
        .map(|m| m.topic.split('/').nth(3).unwrap().to_string())
        .collect();
    assert_eq!(statuses.len(), 16);
    assert!(statuses[..10].iter().all(|s| s == "200"));
    assert!(statuses[10..].iter().any(|s| s == "429"));
}

// ── Transport state ───────────────────────────────────────────

#[test]
fn response_fails_while_disconnected() {
    static CH: InvocationChannel = InvocationChannel::new();
    let mut mqtt = adapter(&CH);
    let mut router = router();

    mqtt.deliver("$iothub/methods/POST/ping/?$rid=5", b"");
    mqtt.disconnect();

    let mut sent = Vec::new();
    drain_invocations(&CH, |inv| sent.push(router.dispatch(&inv.as_invocation(), &mut mqtt)));
    assert_eq!(sent, vec![false]);
    assert!(mqtt.published().is_empty());
}
