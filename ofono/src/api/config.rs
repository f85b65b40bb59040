//! Transport configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::constants::{SERVICE, timeouts};

/// Which message bus to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BusKind {
    /// The system bus, where oFono normally runs.
    #[default]
    System,
    /// The session bus, useful with a test daemon such as phonesim setups.
    Session,
}

/// Settings for a [`DbusTransport`](crate::DbusTransport).
///
/// # Examples
///
/// ```
/// use ofono::{BusKind, ProxyConfig};
/// use std::time::Duration;
///
/// let config = ProxyConfig::new()
///     .with_bus(BusKind::Session)
///     .with_call_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.service, "org.ofono");
/// assert_eq!(config.call_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Bus name the calls are addressed to and signals are matched against.
    pub service: String,
    /// How long a method call may take before it fails with
    /// `org.freedesktop.DBus.Error.Timeout`.
    pub call_timeout: Duration,
    pub bus: BusKind,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_bus(mut self, bus: BusKind) -> Self {
        self.bus = bus;
        self
    }
}

impl Default for ProxyConfig {
    /// Defaults: the `org.ofono` service on the system bus with a
    /// 25 second call timeout.
    fn default() -> Self {
        Self {
            service: SERVICE.to_string(),
            call_timeout: timeouts::call_timeout(),
            bus: BusKind::System,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.service, "org.ofono");
        assert_eq!(config.call_timeout, Duration::from_secs(25));
        assert_eq!(config.bus, BusKind::System);
    }

    #[test]
    fn builder_overrides() {
        let config = ProxyConfig::new()
            .with_service("org.ofono.test")
            .with_bus(BusKind::Session);
        assert_eq!(config.service, "org.ofono.test");
        assert_eq!(config.bus, BusKind::Session);
        assert_eq!(config.call_timeout, timeouts::call_timeout());
    }
}
