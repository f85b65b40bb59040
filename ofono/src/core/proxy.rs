//! Cache-backed proxy for the properties of one remote object.
//!
//! The proxy owns the property cache, the pending-fetch set and the signal
//! subscription for a single (path, interface) binding. Operations issue
//! their call and return immediately; the reply is applied later, when the
//! owning task drives [`PropertyProxy::process_next`].
//!
//! # Ordering
//!
//! Call completions and signal deliveries are applied one at a time, in the
//! order `process_next` observes them. A `PropertyChanged` notification is
//! always applied, even while a fetch for the same property is in flight.
//! Each notification is stamped with a sequence number; a fetch that was
//! issued before the latest notification for a property does not overwrite
//! that property when its reply arrives later.
//!
//! Replies and signals reach the proxy on separate channels, so their
//! relative arrival order is not observable. When both are ready, the signal
//! is applied first.
//!
//! # Rebinding
//!
//! Every rebind bumps a generation counter. Replies tagged with an older
//! generation are dropped without touching the cache.

use futures::StreamExt;
use futures::future;
use futures::stream::{FuturesUnordered, SelectAll, select_all};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::api::models::{ErrorState, PropertyValue, ProxyEvent, TransportError};
use crate::core::cache::PropertyCache;
use crate::core::pending::PendingSet;
use crate::core::transport::{Argument, CallFuture, Reply, SignalMessage, SignalStream, Transport};
use crate::types::constants::{ALL_PROPERTIES_KEY, errors, is_sentinel_path, method, signal};

/// When a binding fetches its properties for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimingMode {
    /// Fetch everything as soon as the path is bound.
    OnConstruction,
    /// Fetch everything on the first read or request.
    OnFirstRequest,
}

/// The object a proxy is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyBinding {
    pub path: String,
    pub interface: String,
    pub priming: PrimingMode,
    /// Domain signals forwarded as [`ProxyEvent::Signal`], in addition to
    /// `PropertyChanged`.
    pub signals: Vec<String>,
}

impl ProxyBinding {
    /// Creates a binding for `interface`, not yet attached to any object.
    pub fn new(interface: impl Into<String>, priming: PrimingMode) -> Self {
        Self {
            path: String::new(),
            interface: interface.into(),
            priming,
            signals: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_signals(mut self, signals: &[&str]) -> Self {
        self.signals = signals.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Outcome of one [`PropertyProxy::process_next`] step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// An item was applied and produced this event.
    Event(ProxyEvent),
    /// An item was consumed without producing an event: an accepted set,
    /// a stale reply, or a signal that could not be used.
    Quiet,
    /// No call is in flight and no subscription is active.
    Idle,
}

/// What a tracked call was issued for.
#[derive(Debug)]
enum Issued {
    PrimeAll { seq: u64 },
    Fetch { name: String, seq: u64 },
    Set { name: String },
    Method { method: String },
}

#[derive(Debug)]
struct Completion {
    generation: u64,
    issued: Issued,
    result: Result<Reply, TransportError>,
}

enum Next {
    Signal(SignalMessage),
    SignalsClosed,
    Completion(Completion),
}

/// Remote property proxy for one (path, interface) binding.
///
/// Not thread-safe: the proxy is owned by a single task which
/// calls the operations and drives [`process_next`](Self::process_next).
/// Observers registered with [`observe`](Self::observe) receive every
/// emitted [`ProxyEvent`].
pub struct PropertyProxy {
    transport: Arc<dyn Transport>,
    binding: ProxyBinding,
    cache: PropertyCache,
    pending: PendingSet,
    error: Option<ErrorState>,
    generation: u64,
    notify_seq: u64,
    last_notified: HashMap<String, u64>,
    in_flight: FuturesUnordered<Pin<Box<dyn Future<Output = Completion> + Send>>>,
    signals: Option<SelectAll<SignalStream>>,
    observers: Vec<UnboundedSender<ProxyEvent>>,
}

impl std::fmt::Debug for PropertyProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyProxy")
            .field("binding", &self.binding)
            .field("generation", &self.generation)
            .field("cached", &self.cache.len())
            .field("in_flight", &self.in_flight.len())
            .field("subscribed", &self.signals.is_some())
            .finish()
    }
}

impl PropertyProxy {
    /// Creates a proxy for `binding`. Nothing is subscribed or fetched until
    /// [`rebind`](Self::rebind) is called.
    pub fn new(transport: Arc<dyn Transport>, binding: ProxyBinding) -> Self {
        Self {
            transport,
            binding,
            cache: PropertyCache::new(),
            pending: PendingSet::new(),
            error: None,
            generation: 0,
            notify_seq: 0,
            last_notified: HashMap::new(),
            in_flight: FuturesUnordered::new(),
            signals: None,
            observers: Vec::new(),
        }
    }

    /// Registers a new observer and returns its event receiver.
    pub fn observe(&mut self) -> UnboundedReceiver<ProxyEvent> {
        let (tx, rx) = unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn binding(&self) -> &ProxyBinding {
        &self.binding
    }

    pub fn path(&self) -> &str {
        &self.binding.path
    }

    pub fn interface(&self) -> &str {
        &self.binding.interface
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.cache.get(name)
    }

    /// Snapshot of every cached property.
    pub fn properties(&self) -> BTreeMap<String, PropertyValue> {
        self.cache.get_all()
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.is_pending(name)
    }

    pub fn is_priming(&self) -> bool {
        self.pending.is_pending(ALL_PROPERTIES_KEY)
    }

    /// Whether any call, including stale ones, has not completed yet.
    pub fn has_calls_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn is_subscribed(&self) -> bool {
        self.signals.is_some()
    }

    /// The last recorded failure, if any.
    ///
    /// Cleared when the next call is issued, kept when a call succeeds.
    pub fn error(&self) -> Option<&ErrorState> {
        self.error.as_ref()
    }

    /// Records a failure observed outside the proxy's own calls.
    pub fn set_error(&mut self, error: ErrorState) {
        warn!("{} {}: {}", self.binding.interface, self.binding.path, error);
        self.error = Some(error);
    }

    /// Fetches every property and replaces the cache with the result.
    ///
    /// Emits [`ProxyEvent::Ready`] or [`ProxyEvent::PrimingFailed`]. A call
    /// already in flight is shared: concurrent callers see its outcome.
    pub fn prime_all(&mut self) {
        if is_sentinel_path(&self.binding.path) {
            self.reject_unbound("prime properties");
            self.emit(ProxyEvent::PrimingFailed);
            return;
        }
        if !self.pending.try_begin(ALL_PROPERTIES_KEY) {
            debug!("GetProperties already pending on {}", self.binding.path);
            return;
        }
        self.begin_attempt();
        let call = self.call(method::GET_PROPERTIES, Vec::new());
        self.track(Issued::PrimeAll { seq: self.notify_seq }, call);
    }

    /// Fetches a single property.
    ///
    /// Emits [`ProxyEvent::RequestComplete`] once. If a fetch for `name` is
    /// already in flight this is a no-op; the in-flight fetch completes for
    /// the original caller only.
    pub fn request_property(&mut self, name: &str) {
        if is_sentinel_path(&self.binding.path) {
            self.reject_unbound(&format!("request {name}"));
            let value = self.cache.get(name).cloned();
            self.emit(ProxyEvent::RequestComplete {
                success: false,
                name: name.to_string(),
                value,
            });
            return;
        }
        if !self.pending.try_begin(name) {
            debug!("{name} already pending on {}", self.binding.path);
            return;
        }
        self.begin_attempt();
        // oFono has no single-property getter
        let call = self.call(method::GET_PROPERTIES, Vec::new());
        self.track(
            Issued::Fetch {
                name: name.to_string(),
                seq: self.notify_seq,
            },
            call,
        );
    }

    /// Asks the remote object to change a property.
    ///
    /// The cache is not touched. A successful set emits nothing; the new
    /// value arrives through the `PropertyChanged` notification the service
    /// sends once it has applied the change. A rejected set emits
    /// [`ProxyEvent::SetPropertyFailed`].
    pub fn set_property(&mut self, name: &str, value: PropertyValue) {
        self.issue_set(
            name,
            vec![
                Argument::Value(PropertyValue::from(name)),
                Argument::Variant(value),
            ],
        );
    }

    /// Like [`set_property`](Self::set_property), for interfaces whose
    /// `SetProperty` takes a password as third argument.
    pub fn set_property_with_password(&mut self, name: &str, value: PropertyValue, password: &str) {
        self.issue_set(
            name,
            vec![
                Argument::Value(PropertyValue::from(name)),
                Argument::Variant(value),
                Argument::Value(PropertyValue::from(password)),
            ],
        );
    }

    /// Calls a domain method on the bound object.
    ///
    /// Emits [`ProxyEvent::MethodComplete`] with the reply values.
    pub fn call_method(&mut self, method: &str, args: Vec<Argument>) {
        if is_sentinel_path(&self.binding.path) {
            self.reject_unbound(method);
            self.emit(ProxyEvent::MethodComplete {
                method: method.to_string(),
                success: false,
                reply: Vec::new(),
            });
            return;
        }
        self.begin_attempt();
        let call = self.call(method, args);
        self.track(
            Issued::Method {
                method: method.to_string(),
            },
            call,
        );
    }

    /// Applies a change notification.
    ///
    /// Always overwrites the cached value and emits
    /// [`ProxyEvent::PropertyChanged`], whatever is in flight for `name`.
    pub fn on_change_notification(&mut self, name: &str, value: PropertyValue) {
        self.notify_seq += 1;
        self.last_notified.insert(name.to_string(), self.notify_seq);
        self.cache.put(name, value.clone());
        self.emit(ProxyEvent::PropertyChanged {
            name: name.to_string(),
            value,
        });
    }

    /// Points the proxy at `path`.
    ///
    /// The old subscription is dropped before the new one is made, pending
    /// fetches are forgotten and the generation is bumped so their replies
    /// are discarded. For a real path the cache is cleared; for the sentinel
    /// path it is kept so last-known values stay readable. No fetch is
    /// issued here.
    pub async fn rebind(&mut self, path: &str) {
        self.generation += 1;
        self.pending.clear();
        self.signals = None;
        self.binding.path = path.to_string();
        debug!(
            "{} rebound to {path} (generation {})",
            self.binding.interface, self.generation
        );

        if is_sentinel_path(path) {
            return;
        }

        self.cache.clear();
        self.last_notified.clear();
        if let Err(e) = self.subscribe().await {
            self.record(&e);
        }
    }

    /// Waits for the next reply or signal and applies it.
    ///
    /// Signals that are already queued are applied before replies. Returns
    /// [`Step::Idle`] immediately when there is nothing to wait for.
    pub async fn process_next(&mut self) -> Step {
        if self.in_flight.is_empty() && self.signals.is_none() {
            return Step::Idle;
        }

        let next = future::poll_fn(|cx| {
            if let Some(signals) = self.signals.as_mut() {
                match signals.poll_next_unpin(cx) {
                    Poll::Ready(Some(msg)) => return Poll::Ready(Next::Signal(msg)),
                    Poll::Ready(None) => return Poll::Ready(Next::SignalsClosed),
                    Poll::Pending => {}
                }
            }
            match self.in_flight.poll_next_unpin(cx) {
                Poll::Ready(Some(completion)) => Poll::Ready(Next::Completion(completion)),
                _ => Poll::Pending,
            }
        })
        .await;

        let event = match next {
            Next::Signal(msg) => self.apply_signal(msg),
            Next::SignalsClosed => {
                warn!("Signal subscription for {} ended", self.binding.path);
                self.signals = None;
                None
            }
            Next::Completion(completion) => self.apply_completion(completion),
        };

        match event {
            Some(event) => Step::Event(event),
            None => Step::Quiet,
        }
    }

    /// Drives the proxy until no call is in flight.
    ///
    /// Signals arriving meanwhile are applied as usual. Returns the events
    /// produced on the way.
    pub async fn settle(&mut self) -> Vec<ProxyEvent> {
        let mut events = Vec::new();
        while self.has_calls_in_flight() {
            if let Step::Event(event) = self.process_next().await {
                events.push(event);
            }
        }
        events
    }

    pub(crate) fn emit(&mut self, event: ProxyEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    async fn subscribe(&mut self) -> Result<(), TransportError> {
        let path = self.binding.path.clone();
        let interface = self.binding.interface.clone();

        let mut streams = Vec::with_capacity(self.binding.signals.len() + 1);
        streams.push(
            self.transport
                .subscribe(&path, &interface, signal::PROPERTY_CHANGED)
                .await?,
        );
        for name in &self.binding.signals {
            streams.push(self.transport.subscribe(&path, &interface, name).await?);
        }

        debug!("Subscribed to {} signal(s) on {path}", streams.len());
        self.signals = Some(select_all(streams));
        Ok(())
    }

    fn call(&self, method: &str, args: Vec<Argument>) -> CallFuture {
        self.transport
            .call(&self.binding.path, &self.binding.interface, method, args)
    }

    fn track(&mut self, issued: Issued, call: CallFuture) {
        let generation = self.generation;
        self.in_flight.push(Box::pin(async move {
            Completion {
                generation,
                issued,
                result: call.await,
            }
        }));
    }

    fn issue_set(&mut self, name: &str, args: Vec<Argument>) {
        if is_sentinel_path(&self.binding.path) {
            self.reject_unbound(&format!("set {name}"));
            self.emit(ProxyEvent::SetPropertyFailed {
                name: name.to_string(),
            });
            return;
        }
        self.begin_attempt();
        let call = self.call(method::SET_PROPERTY, args);
        self.track(
            Issued::Set {
                name: name.to_string(),
            },
            call,
        );
    }

    /// A new call supersedes the last failure; success never clears it.
    fn begin_attempt(&mut self) {
        self.error = None;
    }

    fn record(&mut self, err: &TransportError) {
        self.set_error(ErrorState::from(err));
    }

    fn reject_unbound(&mut self, what: &str) {
        self.set_error(ErrorState::new(
            errors::INVALID_BINDING,
            format!("cannot {what}: {} is not bound to an object", self.binding.interface),
        ));
    }

    fn notified_since(&self, name: &str, seq: u64) -> bool {
        self.last_notified.get(name).is_some_and(|&n| n > seq)
    }

    fn apply_signal(&mut self, msg: SignalMessage) -> Option<ProxyEvent> {
        if msg.path != self.binding.path {
            debug!("Ignoring {} from {}", msg.member, msg.path);
            return None;
        }

        if msg.member == signal::PROPERTY_CHANGED {
            let mut args = msg.args.into_iter();
            match (args.next(), args.next()) {
                (Some(PropertyValue::Str(name)), Some(value)) => {
                    self.on_change_notification(&name, value.clone());
                    Some(ProxyEvent::PropertyChanged { name, value })
                }
                _ => {
                    warn!("Malformed PropertyChanged on {}", msg.path);
                    None
                }
            }
        } else {
            let event = ProxyEvent::Signal {
                name: msg.member,
                args: msg.args,
            };
            self.emit(event.clone());
            Some(event)
        }
    }

    fn apply_completion(&mut self, completion: Completion) -> Option<ProxyEvent> {
        if completion.generation != self.generation {
            debug!(
                "Discarding stale reply ({:?}) from generation {}, now {}",
                completion.issued, completion.generation, self.generation
            );
            return None;
        }

        let event = match completion.issued {
            Issued::PrimeAll { seq } => {
                self.pending.end(ALL_PROPERTIES_KEY);
                match completion.result.and_then(properties_from_reply) {
                    Ok(mut fresh) => {
                        for (name, &n) in &self.last_notified {
                            if n > seq
                                && let Some(value) = self.cache.get(name)
                            {
                                fresh.insert(name.clone(), value.clone());
                            }
                        }
                        self.cache.replace(fresh);
                        debug!(
                            "Primed {} properties on {}",
                            self.cache.len(),
                            self.binding.path
                        );
                        ProxyEvent::Ready(self.cache.get_all())
                    }
                    Err(e) => {
                        self.record(&e);
                        ProxyEvent::PrimingFailed
                    }
                }
            }
            Issued::Fetch { name, seq } => {
                self.pending.end(&name);
                match completion.result.and_then(properties_from_reply) {
                    Ok(mut props) => match props.remove(&name) {
                        Some(value) => {
                            if self.notified_since(&name, seq) {
                                debug!("{name} changed while being fetched, keeping notified value");
                            } else {
                                self.cache.put(name.clone(), value);
                            }
                            ProxyEvent::RequestComplete {
                                success: true,
                                value: self.cache.get(&name).cloned(),
                                name,
                            }
                        }
                        None => {
                            self.set_error(ErrorState::new(
                                errors::NOT_AVAILABLE,
                                "Property not available",
                            ));
                            ProxyEvent::RequestComplete {
                                success: false,
                                value: self.cache.get(&name).cloned(),
                                name,
                            }
                        }
                    },
                    Err(e) => {
                        self.record(&e);
                        ProxyEvent::RequestComplete {
                            success: false,
                            value: self.cache.get(&name).cloned(),
                            name,
                        }
                    }
                }
            }
            Issued::Set { name } => match completion.result {
                Ok(_) => {
                    debug!("SetProperty {name} accepted by {}", self.binding.path);
                    return None;
                }
                Err(e) => {
                    self.record(&e);
                    ProxyEvent::SetPropertyFailed { name }
                }
            },
            Issued::Method { method } => match completion.result {
                Ok(reply) => ProxyEvent::MethodComplete {
                    method,
                    success: true,
                    reply,
                },
                Err(e) => {
                    self.record(&e);
                    ProxyEvent::MethodComplete {
                        method,
                        success: false,
                        reply: Vec::new(),
                    }
                }
            },
        };

        self.emit(event.clone());
        Some(event)
    }
}

/// Extracts the `a{sv}` dictionary a `GetProperties` reply carries.
pub(crate) fn properties_from_reply(
    reply: Reply,
) -> Result<BTreeMap<String, PropertyValue>, TransportError> {
    match reply.into_iter().next() {
        Some(PropertyValue::Map(map)) => Ok(map),
        Some(other) => Err(TransportError::new(
            errors::INVALID_REPLY,
            format!("expected a property map, got {}", other.kind()),
        )),
        None => Err(TransportError::new(
            errors::INVALID_REPLY,
            "empty GetProperties reply",
        )),
    }
}
