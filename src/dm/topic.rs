//! Direct-method topic grammar.
//!
//! ```text
//! request:   $iothub/methods/POST/<method>/?$rid=<hex-id>
//! response:  $iothub/methods/res/<decimal-status>/?$rid=<hex-id>
//! ```
//!
//! The request parser is deliberately loose: the method segment and the
//! `$rid=` marker are located independently, and nothing between them is
//! validated.  A `$rid=` inside the method segment therefore ends up in the
//! method name, and ids longer than [`MAX_RID_HEX_DIGITS`] are truncated.
//! Brokers that speak this convention rely on exactly this behaviour.

use core::fmt::{self, Write};
use core::num::IntErrorKind;

use heapless::String;

/// Prefix of every inbound request topic.
pub const REQUEST_PREFIX: &str = "$iothub/methods/POST/";

/// Subscription filter covering every request topic.
pub const REQUEST_FILTER: &str = "$iothub/methods/POST/#";

/// Prefix of every outbound response topic.
pub const RESPONSE_PREFIX: &str = "$iothub/methods/res/";

/// Marker preceding the hex request id.
pub const RID_MARKER: &str = "$rid=";

/// At most this many hex digits are read after [`RID_MARKER`].
pub const MAX_RID_HEX_DIGITS: usize = 19;

/// Capacity of a formatted response topic.
///
/// prefix (20) + `i32` status (11) + `/?$rid=` (7) + `u64` hex (16) = 54.
pub const RESPONSE_TOPIC_CAP: usize = 64;

/// Why a request topic was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicError {
    /// Topic does not start with [`REQUEST_PREFIX`].
    MissingPrefix,
    /// Nothing between the prefix and the next `/`.
    EmptyMethod,
    /// No [`RID_MARKER`] anywhere in the topic.
    MissingRequestId,
}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrefix => write!(f, "missing {} prefix", REQUEST_PREFIX),
            Self::EmptyMethod => write!(f, "empty method name"),
            Self::MissingRequestId => write!(f, "missing {} marker", RID_MARKER),
        }
    }
}

impl core::error::Error for TopicError {}

/// The two fields extracted from a request topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTopic<'a> {
    pub method: &'a str,
    pub id: i64,
}

/// Split a request topic into method name and request id.
pub fn parse_request_topic(topic: &str) -> Result<RequestTopic<'_>, TopicError> {
    let rest = topic
        .strip_prefix(REQUEST_PREFIX)
        .ok_or(TopicError::MissingPrefix)?;

    let method = rest.split('/').next().unwrap_or_default();
    if method.is_empty() {
        return Err(TopicError::EmptyMethod);
    }

    let rid_at = topic.find(RID_MARKER).ok_or(TopicError::MissingRequestId)?;
    let id = parse_request_id(&topic[rid_at + RID_MARKER.len()..]);

    Ok(RequestTopic { method, id })
}

/// Decode the hex run at the start of `s`.
///
/// Reads at most [`MAX_RID_HEX_DIGITS`] digits and stops at the first
/// non-hex byte.  An empty run is 0; a run that overflows `i64` saturates
/// to `i64::MAX`.
pub fn parse_request_id(s: &str) -> i64 {
    let len = s
        .bytes()
        .take(MAX_RID_HEX_DIGITS)
        .take_while(u8::is_ascii_hexdigit)
        .count();
    // Hex digits are ASCII, so `len` is a char boundary.
    let digits = &s[..len];
    if digits.is_empty() {
        return 0;
    }
    match i64::from_str_radix(digits, 16) {
        Ok(id) => id,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => i64::MAX,
        Err(_) => 0,
    }
}

/// Format `$iothub/methods/res/<status>/?$rid=<hex-id>`.
///
/// The id is printed as its 64-bit two's-complement pattern in lowercase
/// hex without padding.  Returns `None` if the topic does not fit.
pub fn response_topic(status: i32, id: i64) -> Option<String<RESPONSE_TOPIC_CAP>> {
    let mut topic = String::new();
    write!(topic, "{}{}/?{}{:x}", RESPONSE_PREFIX, status, RID_MARKER, id as u64).ok()?;
    Some(topic)
}
