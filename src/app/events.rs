//! Direct-method invocation events.
//!
//! [`dm::adapter`](crate::dm::adapter) emits a [`DirectMethodInvocation`]
//! through the [`InvocationSink`](super::ports::InvocationSink) port for
//! every well-formed request.  Adapters on the other side decide what to do
//! with it: log it, queue it for the main loop, answer it inline.

use heapless::String;

/// Longest method name an [`OwnedInvocation`] can carry.
pub const MAX_METHOD_NAME_LEN: usize = 64;

/// A parsed direct-method request, borrowed from the MQTT delivery callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectMethodInvocation<'a> {
    /// Method name; never empty.
    pub method: &'a str,
    /// Request correlation id, echoed back in the response topic.
    pub id: i64,
    /// Raw message body.
    pub payload: &'a [u8],
}

impl DirectMethodInvocation<'_> {
    /// Copy into an owned value.
    ///
    /// Returns `None` if the method name exceeds [`MAX_METHOD_NAME_LEN`].
    pub fn to_owned_invocation(&self) -> Option<OwnedInvocation> {
        let mut method = String::new();
        method.push_str(self.method).ok()?;
        Some(OwnedInvocation {
            method,
            id: self.id,
            payload: self.payload.to_vec(),
        })
    }
}

/// Owned copy of a [`DirectMethodInvocation`], for hand-off across tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedInvocation {
    pub method: String<MAX_METHOD_NAME_LEN>,
    pub id: i64,
    pub payload: Vec<u8>,
}

impl OwnedInvocation {
    /// Borrow back as a [`DirectMethodInvocation`].
    pub fn as_invocation(&self) -> DirectMethodInvocation<'_> {
        DirectMethodInvocation {
            method: self.method.as_str(),
            id: self.id,
            payload: &self.payload,
        }
    }
}
