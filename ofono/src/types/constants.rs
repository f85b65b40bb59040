//! Constants for the oFono D-Bus API.
//!
//! Interface, method and signal names used by this crate, plus the error
//! names it records for failures it detects locally.

/// Well-known bus name of the oFono daemon.
pub const SERVICE: &str = "org.ofono";

/// Path used when no remote object is bound.
pub const NO_OBJECT_PATH: &str = "/";

/// Pending-set key used to coalesce bulk fetches.
pub const ALL_PROPERTIES_KEY: &str = "*all*";

/// Returns true for the empty path and the `"/"` sentinel.
pub fn is_sentinel_path(path: &str) -> bool {
    path.is_empty() || path == NO_OBJECT_PATH
}

/// oFono interface names.
pub mod interface {
    pub const MANAGER: &str = "org.ofono.Manager";
    pub const MODEM: &str = "org.ofono.Modem";
    pub const SIM_MANAGER: &str = "org.ofono.SimManager";
    pub const CALL_SETTINGS: &str = "org.ofono.CallSettings";
    pub const MESSAGE_MANAGER: &str = "org.ofono.MessageManager";
}

/// Method names shared by every property-bearing interface.
pub mod method {
    pub const GET_PROPERTIES: &str = "GetProperties";
    pub const SET_PROPERTY: &str = "SetProperty";
    pub const GET_MODEMS: &str = "GetModems";
}

/// Signal names the proxy layer understands.
pub mod signal {
    pub const PROPERTY_CHANGED: &str = "PropertyChanged";
    pub const MODEM_ADDED: &str = "ModemAdded";
    pub const MODEM_REMOVED: &str = "ModemRemoved";
}

/// Error names recorded for failures detected without a remote reply.
pub mod errors {
    /// Generic failure, used when the bus did not supply a name.
    pub const FAILED: &str = "org.freedesktop.DBus.Error.Failed";
    /// The call did not complete within the configured timeout.
    pub const TIMEOUT: &str = "org.freedesktop.DBus.Error.Timeout";
    /// The reply did not have the shape the method promises.
    pub const INVALID_REPLY: &str = "org.freedesktop.DBus.Error.InvalidArgs";
    /// The requested property was missing from the reply.
    pub const NOT_AVAILABLE: &str = "NotAvailable";
    /// The proxy is bound to the sentinel path.
    pub const INVALID_BINDING: &str = "InvalidBinding";
}

/// Timeout constants for remote calls.
pub mod timeouts {
    use std::time::Duration;

    /// Default method call timeout (25 seconds, the libdbus default).
    const CALL_TIMEOUT_SECS: u64 = 25;

    /// Returns the default call timeout.
    pub fn call_timeout() -> Duration {
        Duration::from_secs(CALL_TIMEOUT_SECS)
    }
}
