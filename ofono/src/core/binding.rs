//! A property proxy whose object path can change at runtime.
//!
//! oFono objects come and go: modems are hot-plugged, and an application
//! that follows "the first modem" has to move its proxies when that modem
//! disappears. [`RebindableInterface`] wraps a [`PropertyProxy`] with the
//! state machine that handles this:
//!
//! ```text
//!  Unbound ──start/rebind──▶ Priming ──Ready──▶ Ready
//!                              │                  │
//!                              └──gone/sentinel───┴──▶ Invalid ──rebind/reappear──▶ Priming
//! ```
//!
//! While invalid, the last known values stay readable; they are only
//! cleared by the next successful rebind.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::models::{ErrorState, PropertyValue, ProxyEvent};
use crate::core::proxy::{PrimingMode, PropertyProxy, ProxyBinding, Step};
use crate::core::transport::{Argument, Transport};
use crate::types::constants::{NO_OBJECT_PATH, is_sentinel_path};

/// Lifecycle state of a [`RebindableInterface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingState {
    Unbound,
    Priming,
    Ready,
    Invalid,
}

/// Whether the bound path denotes a live object.
///
/// A binding first becomes valid once its object is listed and primed.
/// After that, validity follows the live-object list only: moving from one
/// listed object to another keeps it valid while the new object primes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Unknown,
    Valid,
    Invalid,
}

/// How the object path is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Follow the first live object, moving when it disappears.
    Automatic,
    /// Stay on the given path.
    Manual(String),
}

impl Selection {
    /// Picks the path to bind given the current live objects.
    ///
    /// Returns the `"/"` sentinel when automatic selection finds nothing.
    pub fn pick(&self, live: &[String]) -> String {
        match self {
            Self::Automatic => live
                .first()
                .cloned()
                .unwrap_or_else(|| NO_OBJECT_PATH.to_string()),
            Self::Manual(path) if path.is_empty() => NO_OBJECT_PATH.to_string(),
            Self::Manual(path) => path.clone(),
        }
    }
}

/// State holder that keeps a [`PropertyProxy`] bound to the right object.
///
/// The wrapper never polls the directory; the owner forwards the live
/// object list with [`update_directory`](Self::update_directory) whenever
/// it changes.
#[derive(Debug)]
pub struct RebindableInterface {
    proxy: PropertyProxy,
    selection: Selection,
    state: BindingState,
    live: Vec<String>,
    prime_requested: bool,
    primed: bool,
    valid: bool,
}

impl RebindableInterface {
    /// Creates an unbound wrapper. Call [`start`](Self::start) to bind it.
    pub fn new(transport: Arc<dyn Transport>, binding: ProxyBinding, selection: Selection) -> Self {
        Self {
            proxy: PropertyProxy::new(transport, binding),
            selection,
            state: BindingState::Unbound,
            live: Vec::new(),
            prime_requested: false,
            primed: false,
            valid: false,
        }
    }

    /// Binds to the path chosen by the selection setting.
    pub async fn start(&mut self, live: &[String]) {
        self.live = live.to_vec();
        let path = self.selection.pick(&self.live);
        self.bind_path(&path).await;
        self.sync_validity();
    }

    /// Moves the proxy to `path`.
    ///
    /// Rebinding to the path that is already bound is a no-op unless the
    /// wrapper is invalid. Emits [`ProxyEvent::PathChanged`] when the path
    /// actually changes.
    pub async fn rebind(&mut self, path: &str) {
        let path = if path.is_empty() { NO_OBJECT_PATH } else { path };
        if path == self.proxy.path()
            && matches!(self.state, BindingState::Priming | BindingState::Ready)
        {
            debug!("{} already bound to {path}", self.proxy.interface());
            return;
        }

        let changed = path != self.proxy.path();
        self.bind_path(path).await;
        if changed {
            self.proxy.emit(ProxyEvent::PathChanged(path.to_string()));
        }
        self.sync_validity();
    }

    /// Reacts to a new list of live objects.
    ///
    /// Invalidates the binding when its object is gone, re-selects a path
    /// for automatic selection, and primes again when an invalid object
    /// reappears.
    pub async fn update_directory(&mut self, live: &[String]) {
        self.live = live.to_vec();
        if self.state == BindingState::Unbound {
            return;
        }

        let path = self.proxy.path().to_string();
        if !is_sentinel_path(&path) && self.is_live(&path) {
            if self.state == BindingState::Invalid {
                debug!("{path} is back, priming again");
                self.bind_path(&path).await;
            }
            self.sync_validity();
            return;
        }

        if self.state != BindingState::Invalid {
            debug!("{path} is no longer available");
            self.state = BindingState::Invalid;
        }
        self.sync_validity();

        if self.selection == Selection::Automatic {
            let next = self.selection.pick(&self.live);
            if next != path {
                self.bind_path(&next).await;
                self.proxy.emit(ProxyEvent::PathChanged(next));
                self.sync_validity();
            }
        }
    }

    /// Starts priming if the binding is lazy and nothing was fetched yet.
    pub fn ensure_primed(&mut self) {
        if self.proxy.binding().priming == PrimingMode::OnFirstRequest
            && self.state == BindingState::Ready
            && !self.prime_requested
        {
            self.prime_requested = true;
            self.proxy.prime_all();
        }
    }

    /// Issues a fresh bulk fetch.
    pub fn prime_all(&mut self) {
        self.prime_requested = true;
        self.proxy.prime_all();
    }

    /// Cached value of `name`, without any I/O.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.proxy.get(name)
    }

    /// Read access: primes a lazy binding, then returns the cached value.
    pub fn read(&mut self, name: &str) -> Option<PropertyValue> {
        self.ensure_primed();
        self.proxy.get(name).cloned()
    }

    pub fn properties(&self) -> BTreeMap<String, PropertyValue> {
        self.proxy.properties()
    }

    pub fn request_property(&mut self, name: &str) {
        self.ensure_primed();
        self.proxy.request_property(name);
    }

    pub fn set_property(&mut self, name: &str, value: PropertyValue) {
        self.proxy.set_property(name, value);
    }

    pub fn set_property_with_password(&mut self, name: &str, value: PropertyValue, password: &str) {
        self.proxy.set_property_with_password(name, value, password);
    }

    pub fn call_method(&mut self, method: &str, args: Vec<Argument>) {
        self.proxy.call_method(method, args);
    }

    /// Drives the underlying proxy by one step and updates the state.
    pub async fn process_next(&mut self) -> Step {
        let step = self.proxy.process_next().await;
        if let Step::Event(event) = &step {
            match event {
                ProxyEvent::Ready(_) => {
                    self.primed = true;
                    if self.state == BindingState::Priming {
                        self.state = BindingState::Ready;
                        self.sync_validity();
                    }
                }
                ProxyEvent::PrimingFailed => {
                    self.primed = false;
                    self.prime_requested = false;
                }
                _ => {}
            }
        }
        step
    }

    /// Primes if needed and drives the proxy until priming finished.
    ///
    /// Returns whether the cache holds a complete snapshot.
    pub async fn wait_ready(&mut self) -> bool {
        self.ensure_primed();
        while self.proxy.is_priming() {
            if self.process_next().await == Step::Idle {
                break;
            }
        }
        self.primed
    }

    pub fn observe(&mut self) -> UnboundedReceiver<ProxyEvent> {
        self.proxy.observe()
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn validity(&self) -> Validity {
        let path = self.proxy.path();
        if self.state == BindingState::Unbound {
            Validity::Unknown
        } else if is_sentinel_path(path) || !self.is_live(path) {
            Validity::Invalid
        } else if self.state == BindingState::Ready || self.valid {
            Validity::Valid
        } else {
            Validity::Unknown
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn path(&self) -> &str {
        self.proxy.path()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn live_objects(&self) -> &[String] {
        &self.live
    }

    pub fn error(&self) -> Option<&ErrorState> {
        self.proxy.error()
    }

    pub fn proxy(&self) -> &PropertyProxy {
        &self.proxy
    }

    pub fn proxy_mut(&mut self) -> &mut PropertyProxy {
        &mut self.proxy
    }

    fn is_live(&self, path: &str) -> bool {
        self.live.iter().any(|p| p == path)
    }

    async fn bind_path(&mut self, path: &str) {
        self.proxy.rebind(path).await;
        self.prime_requested = false;
        if is_sentinel_path(path) {
            self.state = BindingState::Invalid;
            return;
        }

        self.primed = false;
        if !self.is_live(path) {
            self.state = BindingState::Invalid;
            return;
        }

        match self.proxy.binding().priming {
            PrimingMode::OnConstruction => {
                self.state = BindingState::Priming;
                self.prime_requested = true;
                self.proxy.prime_all();
            }
            PrimingMode::OnFirstRequest => self.state = BindingState::Ready,
        }
    }

    fn sync_validity(&mut self) {
        let valid = self.validity() == Validity::Valid;
        if valid != self.valid {
            self.valid = valid;
            debug!(
                "{} on {} is now {}",
                self.proxy.interface(),
                self.proxy.path(),
                if valid { "valid" } else { "invalid" }
            );
            self.proxy.emit(ProxyEvent::ValidityChanged(valid));
        }
    }
}
