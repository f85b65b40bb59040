//! Core property proxy machinery.
//!
//! This module contains the transport abstraction, the per-object property
//! cache and the proxy state machines built on top of them. Nothing in here
//! knows about specific oFono interfaces.

pub mod binding;
pub mod cache;
pub mod pending;
pub mod proxy;
pub mod transport;
