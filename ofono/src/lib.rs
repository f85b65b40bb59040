//! Cache-backed, rebindable property proxies for oFono over D-Bus.
//!
//! oFono exposes every modem feature as a D-Bus object with a
//! `GetProperties` / `SetProperty` / `PropertyChanged` triple. This crate
//! mirrors those properties locally:
//!
//! - A [`PropertyProxy`] fetches all properties once, caches them and keeps
//!   the cache current from `PropertyChanged` notifications
//! - A [`RebindableInterface`] moves a proxy between objects as modems
//!   appear and disappear, tracking whether the binding is valid
//! - Typed interfaces ([`Modem`], [`SimManager`], [`CallSettings`],
//!   [`MessageManager`]) decode the cached values into Rust types
//!
//! # Example
//!
//! ```no_run
//! use ofono::{DbusTransport, Modem, ModemManager, Selection};
//!
//! # async fn example() -> ofono::Result<()> {
//! let transport = DbusTransport::system().await?.into_shared();
//!
//! let mut manager = ModemManager::new(transport.clone());
//! manager.start().await?;
//!
//! // Follow the first modem oFono reports
//! let mut modem = Modem::new(transport, Selection::Automatic);
//! modem.start(&manager.modems()).await;
//!
//! if modem.wait_ready().await {
//!     println!("{}: powered={:?}", modem.path(), modem.powered());
//!     modem.set_powered(true)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Asynchronous operations
//!
//! Proxy operations such as [`PropertyProxy::request_property`] issue their
//! call and return at once. Results come back as events when the owning
//! task drives the proxy with `process_next` (or `next_event` on the typed
//! interfaces). Every operation produces exactly one completion event; the
//! only exception is an accepted set, whose outcome is the
//! `PropertyChanged` notification that follows it.
//!
//! # Error Handling
//!
//! Setup functions return [`Result<T>`](Result), an alias over
//! [`OfonoError`]. Failures of remote calls made by a running proxy are
//! reported in completion events and recorded as the proxy's
//! [`ErrorState`].
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod dbus;

// Public API modules
pub mod api;
pub mod core;
pub mod interfaces;
pub mod monitoring;
pub mod types;

// Re-exported public API
pub use api::config::{BusKind, ProxyConfig};
pub use api::models::{
    ErrorState, FromPropertyValue, OfonoError, PropertyValue, ProxyEvent, TransportError,
};
pub use crate::core::binding::{BindingState, RebindableInterface, Selection, Validity};
pub use crate::core::proxy::{PrimingMode, PropertyProxy, ProxyBinding, Step};
pub use crate::core::transport::{Argument, CallFuture, Reply, SignalMessage, SignalStream, Transport};
pub use dbus::DbusTransport;
pub use interfaces::{
    CallSettings, CallSettingsProperty, CallSettingsValue, InterfaceEvent, MessageManager,
    MessageProperty, MessageValue, Modem, ModemProperty, ModemValue, PropertySet, SimManager,
    SimProperty, SimValue, TypedInterface,
};
pub use monitoring::directory::{DirectoryEvent, ModemManager};
pub use types::constants;

/// A specialized `Result` type for oFono operations.
pub type Result<T> = std::result::Result<T, OfonoError>;
