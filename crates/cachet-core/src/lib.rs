//! # Cachet Core
//!
//! Core types, error definitions and key handling for Cachet.
//! This crate provides the foundational abstractions shared by the
//! configuration, service and host crates.

pub mod error;
pub mod key;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use key::*;
pub use result::*;
pub use telemetry::*;
