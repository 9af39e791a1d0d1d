//! # Cachet Config
//!
//! Configuration management for Cachet.
//! Supports layered configuration from files, environment variables,
//! and runtime refresh.

mod app_config;
mod loader;
mod serializer;

pub use app_config::*;
pub use loader::*;
pub use serializer::*;
