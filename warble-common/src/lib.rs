//! Warble Common - shared types and utilities for the Warble bot extensions.
//!
//! This crate provides:
//! - The unified error type used across the Warble crates
//! - Logging setup
//! - Configuration types and loading

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AuthConfig, Config, ObservabilityConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
