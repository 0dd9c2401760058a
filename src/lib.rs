//! IoT-hub direct-method firmware library.
//!
//! Exposes the direct-method adapter and its ports for integration testing
//! and embedding.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("ESP-IDF targets need `--features espidf`");

pub mod adapters;
pub mod app;
pub mod config;
pub mod dm;
pub mod error;

pub use error::{Error, Result};
