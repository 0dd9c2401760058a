//! Mock MQTT client for integration tests.
//!
//! Records every subscribe and publish so tests can assert on the full
//! traffic history, and can be told to refuse either call.

use iothub_dm::adapters::mqtt::topic_matches_filter;
use iothub_dm::app::events::{DirectMethodInvocation, OwnedInvocation};
use iothub_dm::app::ports::{MessageHandler, MqttError, MqttPort, QoS};

// ── Publish record ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

impl Published {
    pub fn body(&self) -> &str {
        core::str::from_utf8(&self.payload).unwrap()
    }
}

// ── MockMqtt ──────────────────────────────────────────────────

pub struct MockMqtt {
    pub subscriptions: Vec<(String, MessageHandler)>,
    pub published: Vec<Published>,
    pub fail_subscribe: bool,
    pub fail_publish: bool,
}

#[allow(dead_code)]
impl MockMqtt {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            published: Vec::new(),
            fail_subscribe: false,
            fail_publish: false,
        }
    }

    pub fn filters(&self) -> Vec<&str> {
        self.subscriptions.iter().map(|(f, _)| f.as_str()).collect()
    }

    /// Hand `payload` to every handler whose filter matches `topic`.
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) -> usize {
        let mut n = 0;
        for (filter, handler) in self.subscriptions.iter_mut() {
            if topic_matches_filter(filter, topic) {
                handler(topic, payload);
                n += 1;
            }
        }
        n
    }

    pub fn last_published(&self) -> Option<&Published> {
        self.published.last()
    }
}

impl Default for MockMqtt {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttPort for MockMqtt {
    fn subscribe(&mut self, filter: &str, handler: MessageHandler) -> Result<(), MqttError> {
        if self.fail_subscribe {
            return Err(MqttError::SubscribeFailed);
        }
        self.subscriptions.push((filter.to_string(), handler));
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        if self.fail_publish {
            return Err(MqttError::PublishFailed);
        }
        self.published.push(Published {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }
}

// ── Recording sink ────────────────────────────────────────────

/// Returns a sink closure plus the shared list it appends to.
pub fn recording_sink() -> (
    impl FnMut(&DirectMethodInvocation<'_>) + Send + 'static,
    std::sync::Arc<std::sync::Mutex<Vec<OwnedInvocation>>>,
) {
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let out = seen.clone();
    let sink = move |inv: &DirectMethodInvocation<'_>| {
        out.lock().unwrap().push(inv.to_owned_invocation().unwrap());
    };
    (sink, seen)
}
