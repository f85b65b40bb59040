//! The boundary between the proxy layer and the message bus.
//!
//! A [`Transport`] issues method calls and hands out signal subscriptions.
//! The proxies never talk to the bus directly; they are given a shared
//! `Arc<dyn Transport>` created once per process.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::api::models::{PropertyValue, TransportError};

/// Values returned by a method call, in wire order.
pub type Reply = Vec<PropertyValue>;

/// An issued call whose reply has not arrived yet.
pub type CallFuture = BoxFuture<'static, std::result::Result<Reply, TransportError>>;

/// A live signal subscription. Dropping the stream unsubscribes.
pub type SignalStream = BoxStream<'static, SignalMessage>;

/// A single method call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Sent with the value's natural D-Bus type.
    ///
    /// `UInt` is sent as `u` when it fits in 32 bits, `Int` as `i`.
    Value(PropertyValue),
    /// Sent wrapped in a variant (`v`), as `SetProperty` expects.
    Variant(PropertyValue),
    /// Sent as a D-Bus byte (`y`).
    Byte(u8),
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::Value(PropertyValue::from(value))
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::Value(PropertyValue::from(value))
    }
}

/// A signal delivered on a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMessage {
    pub path: String,
    pub interface: String,
    pub member: String,
    pub args: Vec<PropertyValue>,
}

/// Call and subscribe primitives of the message bus.
///
/// `call` is not async: the call is issued when `call` returns and only its
/// reply is awaited through the returned future. This keeps issue order
/// observable to the caller, which the proxies rely on for de-duplication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues `method` on `interface` at `path`.
    fn call(&self, path: &str, interface: &str, method: &str, args: Vec<Argument>) -> CallFuture;

    /// Subscribes to `signal` emitted by `interface` at `path`.
    async fn subscribe(
        &self,
        path: &str,
        interface: &str,
        signal: &str,
    ) -> std::result::Result<SignalStream, TransportError>;
}
