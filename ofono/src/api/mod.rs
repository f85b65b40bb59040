//! Public API module.
//!
//! This module contains the value, event and error types shared by every
//! proxy, plus the transport configuration.

pub mod config;
pub mod models;
