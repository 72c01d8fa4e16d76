//! Core types shared by the DbProxy crates.
//!
//! This crate provides the error vocabulary used across the proxy:
//!
//! - `Error` with structured protocol and configuration variants
//! - `Result` alias used by every fallible DbProxy API

pub mod error;

pub use error::{ConfigError, ConfigErrorKind, Error, ProtocolError, Result};
