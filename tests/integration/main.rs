//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! broker or radio required.

mod direct_method_tests;
mod mock_mqtt;
mod router_flow_tests;
