//! [`Transport`] implementation over a zbus connection.

use async_trait::async_trait;
use futures::{FutureExt, StreamExt, select};
use futures_timer::Delay;
use log::{debug, warn};
use std::pin::pin;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};
use zbus::{Connection, MatchRule, MessageStream, message::Type as MessageType};

use crate::Result;
use crate::api::config::{BusKind, ProxyConfig};
use crate::api::models::TransportError;
use crate::core::transport::{Argument, CallFuture, Reply, SignalMessage, SignalStream, Transport};
use crate::dbus::convert::{decode_body, encode_args};
use crate::types::constants::errors;

/// Signals buffered per subscription before the oldest are dropped.
const SIGNAL_QUEUE_DEPTH: usize = 64;

/// Aborts the spawned call when its future is dropped unfinished, so calls
/// of a dropped proxy stop waiting for their timeout.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Turns a spawned call into the future handed to the proxy.
fn join_call(task: JoinHandle<std::result::Result<Reply, TransportError>>) -> CallFuture {
    let guard = AbortOnDrop(task.abort_handle());
    Box::pin(async move {
        let _guard = guard;
        match task.await {
            Ok(result) => result,
            Err(e) => Err(TransportError::new(errors::FAILED, e.to_string())),
        }
    })
}

/// D-Bus transport addressing the oFono service.
///
/// Cheap to clone: clones share the underlying connection.
#[derive(Debug, Clone)]
pub struct DbusTransport {
    conn: Connection,
    config: ProxyConfig,
}

impl DbusTransport {
    /// Connects to the system bus with the default configuration.
    pub async fn system() -> Result<Self> {
        Self::with_config(ProxyConfig::default()).await
    }

    /// Connects to the bus named in `config`.
    pub async fn with_config(config: ProxyConfig) -> Result<Self> {
        let conn = match config.bus {
            BusKind::System => Connection::system().await?,
            BusKind::Session => Connection::session().await?,
        };
        debug!("Connected to the {:?} bus for {}", config.bus, config.service);
        Ok(Self::from_connection(conn, config))
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection, config: ProxyConfig) -> Self {
        Self { conn, config }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Boxes the transport for sharing between proxies.
    pub fn into_shared(self) -> Arc<dyn Transport> {
        Arc::new(self)
    }
}

#[async_trait]
impl Transport for DbusTransport {
    fn call(&self, path: &str, interface: &str, method: &str, args: Vec<Argument>) -> CallFuture {
        let conn = self.conn.clone();
        let service = self.config.service.clone();
        let timeout = self.config.call_timeout;
        let path = path.to_string();
        let interface = interface.to_string();
        let method = method.to_string();
        let body = encode_args(&args);

        // Spawned so the message goes out now, not when the reply is awaited.
        let task = tokio::spawn(async move {
            let body = body.map_err(|e| TransportError::new(errors::INVALID_REPLY, e.to_string()))?;

            let send = async {
                match &body {
                    Some(fields) => {
                        conn.call_method(
                            Some(service.as_str()),
                            path.as_str(),
                            Some(interface.as_str()),
                            method.as_str(),
                            fields,
                        )
                        .await
                    }
                    None => {
                        conn.call_method(
                            Some(service.as_str()),
                            path.as_str(),
                            Some(interface.as_str()),
                            method.as_str(),
                            &(),
                        )
                        .await
                    }
                }
            };

            let mut reply = pin!(send.fuse());
            let mut timeout_delay = pin!(Delay::new(timeout).fuse());

            let msg = select! {
                result = reply => result?,
                _ = timeout_delay => {
                    warn!("{interface}.{method} on {path} timed out after {timeout:?}");
                    return Err(TransportError::new(
                        errors::TIMEOUT,
                        format!("{method} did not reply within {timeout:?}"),
                    ));
                }
            };

            decode_body(&msg).map_err(|e| TransportError::new(errors::INVALID_REPLY, e.to_string()))
        });

        join_call(task)
    }

    async fn subscribe(
        &self,
        path: &str,
        interface: &str,
        signal: &str,
    ) -> std::result::Result<SignalStream, TransportError> {
        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .sender(self.config.service.as_str())?
            .path(path)?
            .interface(interface)?
            .member(signal)?
            .build();

        let stream = MessageStream::for_match_rule(rule, &self.conn, Some(SIGNAL_QUEUE_DEPTH)).await?;
        debug!("Subscribed to {interface}.{signal} on {path}");

        let stream = stream.filter_map(|msg| async move {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("Dropping undecodable signal: {e}");
                    return None;
                }
            };

            let header = msg.header();
            let path = header.path()?.as_str().to_string();
            let interface = header.interface()?.as_str().to_string();
            let member = header.member()?.as_str().to_string();

            match decode_body(&msg) {
                Ok(args) => Some(SignalMessage {
                    path,
                    interface,
                    member,
                    args,
                }),
                Err(e) => {
                    warn!("Dropping {member} from {path}: {e}");
                    None
                }
            }
        });

        Ok(stream.boxed())
    }
}
