//! Direct-method adapter — subscription, inbound parsing and responses.
//!
//! ```text
//!  broker ──▶ $iothub/methods/POST/# ──▶ handle_message ──▶ InvocationSink
//!  caller ──▶ respond / respond_json ──▶ $iothub/methods/res/<status>/?$rid=<id>
//! ```
//!
//! Nothing here is fatal.  Malformed topics are logged and dropped (the MQTT
//! delivery callback has no return channel); response failures come back as
//! `false`, and the caller owns any retry policy.

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::app::events::DirectMethodInvocation;
use crate::app::ports::{InvocationSink, MqttPort, QoS};
use crate::config::DmConfig;
use crate::error::{Error, RenderError, Result};

use super::topic::{REQUEST_FILTER, parse_request_topic, response_topic};

/// Subscribe the request filter, routing every parsed invocation to `sink`.
///
/// With `enable_dm` off this is a no-op.  Always returns `true`: a refused
/// subscription is only logged.
pub fn init<M, S>(config: &DmConfig, mqtt: &mut M, mut sink: S) -> bool
where
    M: MqttPort + ?Sized,
    S: InvocationSink + Send + 'static,
{
    if !config.enable_dm {
        info!("DM: disabled by config");
        return true;
    }

    let handler = Box::new(move |topic: &str, payload: &[u8]| {
        handle_message(topic, payload, &mut sink);
    });
    match mqtt.subscribe(REQUEST_FILTER, handler) {
        Ok(()) => info!("DM: subscribed to {}", REQUEST_FILTER),
        Err(e) => warn!("DM: subscribe to {} failed: {}", REQUEST_FILTER, e),
    }
    true
}

/// Parse one inbound message and emit it.
///
/// Emits exactly one invocation for a well-formed request topic, otherwise
/// logs the raw topic at error level and emits nothing.
pub fn handle_message(topic: &str, payload: &[u8], sink: &mut (impl InvocationSink + ?Sized)) {
    let req = match parse_request_topic(topic) {
        Ok(req) => req,
        Err(e) => {
            error!("DM: invalid request '{}' ({})", topic, e);
            return;
        }
    };

    let invocation = DirectMethodInvocation {
        method: req.method,
        id: req.id,
        payload,
    };
    debug!(
        "DM '{}' ({}): '{}' '{}'",
        invocation.method,
        invocation.id,
        String::from_utf8_lossy(payload),
        topic
    );
    sink.emit(&invocation);
}

/// Publish `body` as the response to request `id`.
///
/// QoS 0, not retained.  Returns `true` only if the topic was formatted and
/// the transport accepted the message.
pub fn respond(mqtt: &mut (impl MqttPort + ?Sized), id: i64, status: i32, body: &[u8]) -> bool {
    match try_respond(mqtt, id, status, body) {
        Ok(()) => true,
        Err(e) => {
            warn!("DM: response {} for rid {:x} not sent: {}", status, id as u64, e);
            false
        }
    }
}

/// [`respond`] with the failure reason.
pub fn try_respond(
    mqtt: &mut (impl MqttPort + ?Sized),
    id: i64,
    status: i32,
    body: &[u8],
) -> Result<()> {
    let topic = response_topic(status, id).ok_or(Error::ResponseTopicOverflow)?;
    mqtt.publish(&topic, body, QoS::AtMostOnce, false)?;
    Ok(())
}

/// Render `body` as JSON and [`respond`] with it.
///
/// A value that fails to serialize is never published.
pub fn respond_json<T>(mqtt: &mut (impl MqttPort + ?Sized), id: i64, status: i32, body: &T) -> bool
where
    T: Serialize + ?Sized,
{
    match render_json(body) {
        Ok(rendered) => respond(mqtt, id, status, &rendered),
        Err(e) => {
            warn!("DM: response {} for rid {:x} not rendered: {}", status, id as u64, e);
            false
        }
    }
}

fn render_json<T: Serialize + ?Sized>(body: &T) -> core::result::Result<Vec<u8>, RenderError> {
    let rendered = serde_json::to_vec(body).map_err(|_| RenderError::Serialize)?;
    if rendered.is_empty() {
        return Err(RenderError::Empty);
    }
    Ok(rendered)
}
