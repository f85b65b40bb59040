//! Scripted in-memory transport for driving proxies deterministically.
//!
//! Every call is recorded and stays unresolved until the test answers it by
//! index, so the order in which replies and signals reach a proxy is fully
//! under the test's control.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::{mpsc, oneshot};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ofono::{
    Argument, CallFuture, PropertyProxy, PropertyValue, ProxyEvent, Reply, SignalMessage,
    SignalStream, Step, Transport, TransportError,
};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub interface: String,
    pub method: String,
    pub args: Vec<Argument>,
}

struct Subscription {
    path: String,
    interface: String,
    signal: String,
    tx: mpsc::UnboundedSender<SignalMessage>,
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCall>,
    replies: Vec<Option<oneshot::Sender<Result<Reply, TransportError>>>>,
    subscriptions: Vec<Subscription>,
}

#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<State>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.method == method).count()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().pop().expect("no call was made")
    }

    /// Answers call number `index`.
    pub fn reply(&self, index: usize, result: Result<Reply, TransportError>) {
        let tx = self.state.lock().unwrap().replies[index]
            .take()
            .expect("call already answered");
        // the proxy may have dropped the future after a rebind
        let _ = tx.send(result);
    }

    /// Answers a `GetProperties` call with the given properties.
    pub fn reply_properties(&self, index: usize, props: &[(&str, PropertyValue)]) {
        self.reply(index, Ok(properties(props)));
    }

    pub fn reply_empty(&self, index: usize) {
        self.reply(index, Ok(Vec::new()));
    }

    pub fn fail(&self, index: usize, name: &str, message: &str) {
        self.reply(index, Err(TransportError::new(name, message)));
    }

    /// Delivers a signal to every live matching subscription. Returns how
    /// many received it.
    pub fn emit(&self, path: &str, interface: &str, member: &str, args: Vec<PropertyValue>) -> usize {
        let state = self.state.lock().unwrap();
        state
            .subscriptions
            .iter()
            .filter(|s| s.path == path && s.interface == interface && s.signal == member)
            .filter(|s| {
                s.tx
                    .unbounded_send(SignalMessage {
                        path: path.to_string(),
                        interface: interface.to_string(),
                        member: member.to_string(),
                        args: args.clone(),
                    })
                    .is_ok()
            })
            .count()
    }

    pub fn property_changed(
        &self,
        path: &str,
        interface: &str,
        name: &str,
        value: PropertyValue,
    ) -> usize {
        self.emit(
            path,
            interface,
            "PropertyChanged",
            vec![PropertyValue::Str(name.to_string()), value],
        )
    }

    /// Number of subscriptions on `path` whose stream is still alive.
    pub fn subscribers(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|s| s.path == path && !s.tx.is_closed())
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn call(&self, path: &str, interface: &str, method: &str, args: Vec<Argument>) -> CallFuture {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            path: path.to_string(),
            interface: interface.to_string(),
            method: method.to_string(),
            args,
        });
        state.replies.push(Some(tx));

        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(TransportError::new("Test.Error.Dropped", "never answered")))
        })
    }

    async fn subscribe(
        &self,
        path: &str,
        interface: &str,
        signal: &str,
    ) -> Result<SignalStream, TransportError> {
        let (tx, rx) = mpsc::unbounded();
        self.state.lock().unwrap().subscriptions.push(Subscription {
            path: path.to_string(),
            interface: interface.to_string(),
            signal: signal.to_string(),
            tx,
        });
        Ok(rx.boxed())
    }
}

/// A `GetProperties` reply.
pub fn properties(props: &[(&str, PropertyValue)]) -> Reply {
    let map: BTreeMap<String, PropertyValue> = props
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    vec![PropertyValue::Map(map)]
}

pub fn live(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// One `process_next` step, failing the test instead of hanging.
pub async fn step(proxy: &mut PropertyProxy) -> Step {
    tokio::time::timeout(Duration::from_secs(2), proxy.process_next())
        .await
        .expect("proxy made no progress")
}

/// Collects whatever events are queued on an observer channel.
pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProxyEvent>) -> Vec<ProxyEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
