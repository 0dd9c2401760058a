//! Log-based invocation sink adapter.
//!
//! Implements [`InvocationSink`] by writing each direct-method invocation to
//! the logger (UART / USB-CDC in production).  Handy as the only sink while
//! bringing up a new device, before any method has a handler.

use log::info;

use crate::app::events::DirectMethodInvocation;
use crate::app::ports::InvocationSink;

/// Adapter that logs every [`DirectMethodInvocation`] to the serial console.
#[derive(Debug, Default)]
pub struct LogInvocationSink {
    count: u32,
}

impl LogInvocationSink {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Invocations seen so far.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl InvocationSink for LogInvocationSink {
    fn emit(&mut self, invocation: &DirectMethodInvocation<'_>) {
        self.count = self.count.wrapping_add(1);
        info!(
            "DM | method={} | rid={:x} | payload={} bytes",
            invocation.method,
            invocation.id as u64,
            invocation.payload.len(),
        );
    }
}
