//! Fuzz target: `parse_request_topic`
//!
//! Drives arbitrary UTF-8 topics through the request parser and the
//! response formatter and asserts that neither panics and that accepted
//! topics obey the parser's postconditions.
//!
//! cargo fuzz run fuzz_request_topic

#![no_main]

use iothub_dm::dm::topic::{parse_request_id, parse_request_topic, response_topic};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(topic) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(req) = parse_request_topic(topic) {
        assert!(!req.method.is_empty(), "accepted topic with empty method");
        assert!(!req.method.contains('/'), "method spans a topic level");
        assert!(req.id >= 0, "hex id decoded negative");

        // Every parsed id must format into a response topic.
        assert!(response_topic(200, req.id).is_some());
    }

    // Raw id decoding on its own must also be total.
    let _ = parse_request_id(topic);
});
