//! Channel-backed invocation sink.
//!
//! Uses an `embassy-sync` bounded channel to hand invocations from the MQTT
//! delivery task to the main loop, where the [`MethodRouter`] answers them.
//! The MQTT side never blocks: when the channel is full the invocation is
//! dropped and the cloud caller sees a timeout.
//!
//! ```text
//! ┌──────────────┐ OwnedInvocation ┌──────────────┐
//! │  MQTT task   │────────────────▶│  Main loop   │──▶ MethodRouter
//! │ (ChannelSink)│                 │ (drain)      │
//! └──────────────┘                 └──────────────┘
//! ```
//!
//! [`MethodRouter`]: crate::dm::router::MethodRouter

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::events::{DirectMethodInvocation, OwnedInvocation};
use crate::app::ports::InvocationSink;

/// Channel depth for pending invocations.
pub const INVOCATION_DEPTH: usize = 8;

/// Bounded invocation queue.
pub type InvocationChannel = Channel<CriticalSectionRawMutex, OwnedInvocation, INVOCATION_DEPTH>;

/// Process-wide channel used by the firmware binary.
pub static INVOCATION_CHANNEL: InvocationChannel = Channel::new();

/// Sink that copies each invocation onto a channel.
#[derive(Clone, Copy)]
pub struct ChannelSink {
    channel: &'static InvocationChannel,
}

impl Default for ChannelSink {
    fn default() -> Self {
        Self::new(&INVOCATION_CHANNEL)
    }
}

impl ChannelSink {
    pub fn new(channel: &'static InvocationChannel) -> Self {
        Self { channel }
    }
}

impl InvocationSink for ChannelSink {
    fn emit(&mut self, invocation: &DirectMethodInvocation<'_>) {
        let Some(owned) = invocation.to_owned_invocation() else {
            warn!("DM channel: method name too long, dropping rid {:x}", invocation.id as u64);
            return;
        };
        if self.channel.try_send(owned).is_err() {
            warn!(
                "DM channel: full, dropping '{}' (rid {:x})",
                invocation.method, invocation.id as u64
            );
        }
    }
}

/// Pop every pending invocation in FIFO order.
///
/// Returns the number handled.
pub fn drain_invocations(
    channel: &InvocationChannel,
    mut handler: impl FnMut(OwnedInvocation),
) -> usize {
    let mut n = 0;
    while let Ok(inv) = channel.try_receive() {
        handler(inv);
        n += 1;
    }
    n
}
