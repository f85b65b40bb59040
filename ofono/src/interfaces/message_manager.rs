//! `org.ofono.MessageManager`: SMS settings, sending and the message list.

use log::{debug, warn};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::Result;
use crate::api::models::PropertyValue;
use crate::core::binding::Selection;
use crate::core::transport::Transport;
use crate::interfaces::{InterfaceEvent, TypedInterface};
use crate::types::constants::interface;

property_table! {
    /// Properties of `org.ofono.MessageManager`.
    MessageProperty => MessageValue, interface::MESSAGE_MANAGER, OnFirstRequest,
        signals [
            signals::MESSAGE_ADDED,
            signals::MESSAGE_REMOVED,
            signals::INCOMING_MESSAGE,
            signals::IMMEDIATE_MESSAGE,
            signals::STATUS_REPORT,
        ];
    ServiceCenterAddress("ServiceCenterAddress", String, rw) => service_center_address;
    /// `"cs-only"`, `"ps-only"`, `"cs-preferred"` or `"ps-preferred"`.
    Bearer("Bearer", String, rw) => bearer;
    Alphabet("Alphabet", String, rw) => alphabet;
    UseDeliveryReports("UseDeliveryReports", bool, rw) => use_delivery_reports;
}

/// Method names of `org.ofono.MessageManager`.
pub mod methods {
    pub const SEND_MESSAGE: &str = "SendMessage";
    pub const GET_MESSAGES: &str = "GetMessages";
}

/// Signal names of `org.ofono.MessageManager`.
pub mod signals {
    pub const MESSAGE_ADDED: &str = "MessageAdded";
    pub const MESSAGE_REMOVED: &str = "MessageRemoved";
    pub const INCOMING_MESSAGE: &str = "IncomingMessage";
    pub const IMMEDIATE_MESSAGE: &str = "ImmediateMessage";
    pub const STATUS_REPORT: &str = "StatusReport";
}

/// Message manager of one modem.
///
/// Besides the typed properties it keeps the list of pending outgoing
/// message paths, loaded with `GetMessages` whenever the interface becomes
/// valid or moves to another modem, and kept current from `MessageAdded`
/// and `MessageRemoved`.
#[derive(Debug)]
pub struct MessageManager {
    iface: TypedInterface<MessageProperty>,
    messages: Vec<String>,
    /// A `GetMessages` for the current path is in flight.
    listing: bool,
}

impl MessageManager {
    pub fn new(transport: Arc<dyn Transport>, selection: Selection) -> Self {
        Self {
            iface: TypedInterface::new(transport, selection),
            messages: Vec::new(),
            listing: false,
        }
    }

    pub fn for_path(transport: Arc<dyn Transport>, path: &str) -> Self {
        Self::new(transport, Selection::Manual(path.to_string()))
    }

    /// Message object paths currently known.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Reloads the message list.
    pub fn refresh_messages(&mut self) {
        self.listing = true;
        self.iface.call_method(methods::GET_MESSAGES, Vec::new());
    }

    /// Sends `text` to `to`. The reply carries the new message's path.
    pub fn send_message(&mut self, to: &str, text: &str) {
        self.iface
            .call_method(methods::SEND_MESSAGE, vec![to.into(), text.into()]);
    }

    pub fn set_service_center_address(&mut self, address: &str) -> Result<()> {
        self.iface
            .set(MessageValue::ServiceCenterAddress(address.to_string()))
    }

    pub fn set_bearer(&mut self, bearer: &str) -> Result<()> {
        self.iface.set(MessageValue::Bearer(bearer.to_string()))
    }

    pub fn set_alphabet(&mut self, alphabet: &str) -> Result<()> {
        self.iface.set(MessageValue::Alphabet(alphabet.to_string()))
    }

    pub fn set_use_delivery_reports(&mut self, enabled: bool) -> Result<()> {
        self.iface.set(MessageValue::UseDeliveryReports(enabled))
    }

    /// Returns the next event after applying it to the message list.
    pub async fn next_event(&mut self) -> Option<InterfaceEvent<MessageProperty>> {
        let event = self.iface.next_event().await?;
        match &event {
            InterfaceEvent::ValidityChanged(true) => {
                if !self.listing {
                    self.refresh_messages();
                }
            }
            InterfaceEvent::ValidityChanged(false) => {
                self.messages.clear();
                self.listing = false;
            }
            // replies for the old path are discarded, so list again
            InterfaceEvent::PathChanged(_) => {
                self.messages.clear();
                self.listing = false;
                if self.iface.is_valid() {
                    self.refresh_messages();
                }
            }
            InterfaceEvent::MethodComplete {
                method,
                success,
                reply,
            } if method == methods::GET_MESSAGES => {
                self.listing = false;
                if *success {
                    self.messages = message_paths(reply);
                    debug!("{} message(s) pending", self.messages.len());
                }
            }
            InterfaceEvent::Signal { name, args } if name == signals::MESSAGE_ADDED => {
                if let Some(PropertyValue::Str(path)) = args.first()
                    && !self.messages.contains(path)
                {
                    self.messages.push(path.clone());
                }
            }
            InterfaceEvent::Signal { name, args } if name == signals::MESSAGE_REMOVED => {
                if let Some(PropertyValue::Str(path)) = args.first() {
                    self.messages.retain(|p| p != path);
                }
            }
            _ => {}
        }
        Some(event)
    }
}

impl Deref for MessageManager {
    type Target = TypedInterface<MessageProperty>;

    fn deref(&self) -> &Self::Target {
        &self.iface
    }
}

impl DerefMut for MessageManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.iface
    }
}

/// Paths out of a `GetMessages` reply (`a(oa{sv})`).
fn message_paths(reply: &[PropertyValue]) -> Vec<String> {
    let Some(PropertyValue::List(entries)) = reply.first() else {
        warn!("Unexpected GetMessages reply");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            PropertyValue::Struct(fields) => fields.first()?.as_str().map(String::from),
            _ => None,
        })
        .collect()
}
