//! The list of modems oFono currently exposes.
//!
//! [`ModemManager`] keeps the live modem paths in sync with
//! `org.ofono.Manager`. Its output drives
//! [`RebindableInterface::update_directory`](crate::RebindableInterface::update_directory).

use futures::StreamExt;
use futures::stream::{SelectAll, select_all};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Result;
use crate::api::models::{OfonoError, PropertyValue};
use crate::core::transport::{Reply, SignalMessage, SignalStream, Transport};
use crate::types::constants::{NO_OBJECT_PATH, interface, method, signal};

/// A change in the set of live objects.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryEvent {
    ObjectAppeared(String),
    ObjectDisappeared(String),
}

/// Tracks modems added to and removed from oFono.
///
/// # Example
///
/// ```no_run
/// use ofono::{DbusTransport, ModemManager};
///
/// # async fn example() -> ofono::Result<()> {
/// let transport = DbusTransport::system().await?.into_shared();
/// let mut manager = ModemManager::new(transport);
/// manager.start().await?;
///
/// for path in manager.modems() {
///     println!("{path}");
/// }
///
/// while let Some(event) = manager.next_event().await {
///     println!("{event:?}, now {} modem(s)", manager.modems().len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ModemManager {
    transport: Arc<dyn Transport>,
    modems: Vec<(String, BTreeMap<String, PropertyValue>)>,
    signals: Option<SelectAll<SignalStream>>,
}

impl std::fmt::Debug for ModemManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModemManager")
            .field("modems", &self.modems())
            .field("subscribed", &self.signals.is_some())
            .finish()
    }
}

impl ModemManager {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            modems: Vec::new(),
            signals: None,
        }
    }

    /// Subscribes to modem additions and removals, then loads the current
    /// list.
    ///
    /// Subscribing first means a modem that appears while `GetModems` is in
    /// flight is not missed.
    pub async fn start(&mut self) -> Result<()> {
        let added = self
            .transport
            .subscribe(NO_OBJECT_PATH, interface::MANAGER, signal::MODEM_ADDED)
            .await?;
        let removed = self
            .transport
            .subscribe(NO_OBJECT_PATH, interface::MANAGER, signal::MODEM_REMOVED)
            .await?;
        self.signals = Some(select_all([added, removed]));
        debug!("Subscribed to modem additions and removals");

        self.refresh().await
    }

    /// Replaces the modem list with a fresh `GetModems` result.
    pub async fn refresh(&mut self) -> Result<()> {
        let reply = self
            .transport
            .call(
                NO_OBJECT_PATH,
                interface::MANAGER,
                method::GET_MODEMS,
                Vec::new(),
            )
            .await?;
        self.modems = modems_from_reply(reply)?;
        debug!("Found {} modem(s)", self.modems.len());
        Ok(())
    }

    /// Paths of the live modems, in the order oFono reported them.
    pub fn modems(&self) -> Vec<String> {
        self.modems.iter().map(|(path, _)| path.clone()).collect()
    }

    /// Properties the modem announced when it was listed or added.
    pub fn announced_properties(&self, path: &str) -> Option<&BTreeMap<String, PropertyValue>> {
        self.modems
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, props)| props)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.modems.iter().any(|(p, _)| p == path)
    }

    /// Waits for the next addition or removal and applies it.
    ///
    /// Returns `None` once the subscription has ended or if
    /// [`start`](Self::start) was never called.
    pub async fn next_event(&mut self) -> Option<DirectoryEvent> {
        loop {
            let msg = self.signals.as_mut()?.next().await;
            let Some(msg) = msg else {
                warn!("Modem directory subscription ended");
                self.signals = None;
                return None;
            };
            if let Some(event) = self.apply(msg) {
                return Some(event);
            }
        }
    }

    fn apply(&mut self, msg: SignalMessage) -> Option<DirectoryEvent> {
        let mut args = msg.args.into_iter();
        let path = match args.next() {
            Some(PropertyValue::Str(path)) => path,
            _ => {
                warn!("Ignoring malformed {} signal", msg.member);
                return None;
            }
        };

        if msg.member == signal::MODEM_ADDED {
            let props = match args.next() {
                Some(PropertyValue::Map(props)) => props,
                _ => BTreeMap::new(),
            };
            match self.modems.iter_mut().find(|(p, _)| *p == path) {
                Some(entry) => {
                    entry.1 = props;
                    None
                }
                None => {
                    debug!("Modem added: {path}");
                    self.modems.push((path.clone(), props));
                    Some(DirectoryEvent::ObjectAppeared(path))
                }
            }
        } else if msg.member == signal::MODEM_REMOVED {
            let before = self.modems.len();
            self.modems.retain(|(p, _)| *p != path);
            if self.modems.len() == before {
                return None;
            }
            debug!("Modem removed: {path}");
            Some(DirectoryEvent::ObjectDisappeared(path))
        } else {
            None
        }
    }
}

/// Parses the `a(oa{sv})` reply of `GetModems`.
fn modems_from_reply(reply: Reply) -> Result<Vec<(String, BTreeMap<String, PropertyValue>)>> {
    let invalid = |reason: &str| {
        OfonoError::UnexpectedReply {
            method: method::GET_MODEMS.to_string(),
            reason: reason.to_string(),
        }
    };

    let entries = match reply.into_iter().next() {
        Some(PropertyValue::List(entries)) => entries,
        Some(_) => return Err(invalid("expected an array of modems")),
        None => return Err(invalid("empty reply")),
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            PropertyValue::Struct(fields) => {
                let mut fields = fields.into_iter();
                match (fields.next(), fields.next()) {
                    (Some(PropertyValue::Str(path)), Some(PropertyValue::Map(props))) => {
                        Ok((path, props))
                    }
                    _ => Err(invalid("expected (object path, properties)")),
                }
            }
            _ => Err(invalid("expected a struct per modem")),
        })
        .collect()
}
