//! D-Bus adapter for the proxy layer.
//!
//! This module converts between zbus/zvariant types and the crate's own
//! value model, and provides the [`DbusTransport`] used against a running
//! oFono daemon.

mod convert;
mod transport;

pub use transport::DbusTransport;
