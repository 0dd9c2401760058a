//! ESP-IDF platform helpers for `MqttAdapter`.
//!
//! This module is compiled only for `target_os = "espidf"` and wraps the
//! ESP-IDF MQTT client.  The client runs its own FreeRTOS task; the event
//! callback below executes there and must not block.
//!
//! All public items are `pub(super)` to keep them private to the adapters
//! module.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS as EspQoS,
};

use super::SubscriptionTable;
use crate::app::ports::{MqttError, QoS};

fn to_esp_qos(qos: QoS) -> EspQoS {
    match qos {
        QoS::AtMostOnce => EspQoS::AtMostOnce,
        QoS::AtLeastOnce => EspQoS::AtLeastOnce,
        QoS::ExactlyOnce => EspQoS::ExactlyOnce,
    }
}

pub(super) struct EspClient {
    client: EspMqttClient<'static>,
    connected: Arc<AtomicBool>,
    /// Set by the event task on every `Connected`; cleared once the main
    /// loop has re-issued the broker subscriptions.
    resubscribe: Arc<AtomicBool>,
}

impl EspClient {
    pub(super) fn connect(
        broker_url: &str,
        client_id: &str,
        table: SubscriptionTable,
    ) -> Result<Self, MqttError> {
        let connected = Arc::new(AtomicBool::new(false));
        let resubscribe = Arc::new(AtomicBool::new(false));

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };

        let cb_connected = connected.clone();
        let cb_resubscribe = resubscribe.clone();
        let client = EspMqttClient::new_cb(broker_url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    info!("MQTT(espidf): connected");
                    cb_connected.store(true, Ordering::Release);
                    cb_resubscribe.store(true, Ordering::Release);
                }
                EventPayload::Disconnected => {
                    warn!("MQTT(espidf): disconnected");
                    cb_connected.store(false, Ordering::Release);
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    details: Details::Complete,
                    ..
                } => {
                    table.dispatch(topic, data);
                }
                EventPayload::Received { topic, .. } => {
                    // Chunked deliveries are larger than any direct-method body.
                    warn!("MQTT(espidf): dropping chunked message on {:?}", topic);
                }
                EventPayload::Error(e) => {
                    warn!("MQTT(espidf): client error {:?}", e);
                }
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT(espidf): client init failed: {}", e);
            MqttError::NotConnected
        })?;

        Ok(Self {
            client,
            connected,
            resubscribe,
        })
    }

    pub(super) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(super) fn subscribe(&mut self, filter: &str) -> Result<(), MqttError> {
        self.client
            .subscribe(filter, EspQoS::AtMostOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT(espidf): subscribe '{}' failed: {}", filter, e);
                MqttError::SubscribeFailed
            })
    }

    pub(super) fn resubscribe_if_needed(&mut self, table: &SubscriptionTable) {
        if !self.is_connected() || !self.resubscribe.swap(false, Ordering::AcqRel) {
            return;
        }
        for filter in table.filters() {
            if self.subscribe(&filter).is_err() {
                // Try again on the next poll.
                self.resubscribe.store(true, Ordering::Release);
            }
        }
    }

    /// Non-blocking: hands the message to the client's outbox.
    pub(super) fn enqueue(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }
        self.client
            .enqueue(topic, to_esp_qos(qos), retain, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT(espidf): enqueue to '{}' failed: {}", topic, e);
                MqttError::PublishFailed
            })
    }
}
