//! Typed wrappers for the oFono interfaces.
//!
//! Every interface is described by a closed property enum implementing
//! [`PropertySet`]. The enum and its table (wire key, value type and
//! writability) are generated by `property_table!`; [`TypedInterface`]
//! then turns the string-keyed proxy into typed getters, setters and
//! events. Keys the table does not know about are reported as
//! [`InterfaceEvent::Unknown`] rather than dropped.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::Result;
use crate::api::models::{ErrorState, OfonoError, PropertyValue, ProxyEvent};
use crate::core::binding::{BindingState, RebindableInterface, Selection};
use crate::core::proxy::{PrimingMode, ProxyBinding, Step};
use crate::core::transport::{Argument, Transport};

macro_rules! property_table {
    (@writable rw) => { true };
    (@writable ro) => { false };
    (
        $(#[$meta:meta])*
        $prop:ident => $value:ident, $iface:expr, $priming:ident $(, signals [$($sig:expr),* $(,)?])? ;
        $( $(#[$vmeta:meta])* $variant:ident($key:literal, $ty:ty, $access:ident) => $getter:ident; )+
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $prop {
            $( $(#[$vmeta])* $variant, )+
        }

        #[doc = concat!("A typed value of one [`", stringify!($prop), "`].")]
        #[derive(Debug, Clone, PartialEq)]
        pub enum $value {
            $( $variant($ty), )+
        }

        impl $crate::interfaces::PropertySet for $prop {
            type Value = $value;

            const INTERFACE: &'static str = $iface;
            const PRIMING: $crate::core::proxy::PrimingMode =
                $crate::core::proxy::PrimingMode::$priming;
            const ALL: &'static [Self] = &[$( $prop::$variant, )+];
            const SIGNALS: &'static [&'static str] = &[$($($sig),*)?];

            fn key(self) -> &'static str {
                match self {
                    $( $prop::$variant => $key, )+
                }
            }

            fn writable(self) -> bool {
                match self {
                    $( $prop::$variant => property_table!(@writable $access), )+
                }
            }

            fn decode(self, value: &$crate::PropertyValue) -> Option<$value> {
                match self {
                    $( $prop::$variant => {
                        <$ty as $crate::api::models::FromPropertyValue>::from_property_value(value)
                            .map($value::$variant)
                    } )+
                }
            }

            fn property_of(value: &$value) -> Self {
                match value {
                    $( $value::$variant(_) => $prop::$variant, )+
                }
            }

            fn encode(value: &$value) -> $crate::PropertyValue {
                match value {
                    $( $value::$variant(v) => $crate::PropertyValue::from(v.clone()), )+
                }
            }
        }

        impl $crate::interfaces::TypedInterface<$prop> {
            $(
                #[doc = concat!("Cached `", $key, "`, if known.")]
                pub fn $getter(&self) -> Option<$ty> {
                    match self.get($prop::$variant)? {
                        $value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            )+
        }
    };
}

pub mod call_settings;
pub mod message_manager;
pub mod modem;
pub mod sim_manager;

/// A closed set of properties of one oFono interface.
pub trait PropertySet: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// One typed value per property.
    type Value: Clone + Debug + PartialEq + Send + 'static;

    const INTERFACE: &'static str;
    const PRIMING: PrimingMode;
    const ALL: &'static [Self];
    /// Domain signals forwarded alongside `PropertyChanged`.
    const SIGNALS: &'static [&'static str] = &[];

    /// The property name on the wire.
    fn key(self) -> &'static str;
    fn writable(self) -> bool;
    /// Decodes `value` for this property; `None` on a shape mismatch.
    fn decode(self, value: &PropertyValue) -> Option<Self::Value>;
    fn property_of(value: &Self::Value) -> Self;
    fn encode(value: &Self::Value) -> PropertyValue;

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.key() == key)
    }

    /// Parses user input for this property.
    ///
    /// The input is tried as a boolean, an integer, a comma separated list
    /// and finally a plain string, and the first shape the property accepts
    /// wins.
    fn parse(self, input: &str) -> Option<Self::Value> {
        let candidates = [
            PropertyValue::Bool(false),
            PropertyValue::UInt(0),
            PropertyValue::Int(0),
            PropertyValue::StrList(Vec::new()),
            PropertyValue::Str(String::new()),
        ];
        candidates
            .iter()
            .filter_map(|shape| shape.parse_like(input))
            .find_map(|value| self.decode(&value))
    }

    fn binding() -> ProxyBinding {
        ProxyBinding::new(Self::INTERFACE, Self::PRIMING).with_signals(Self::SIGNALS)
    }
}

/// A [`ProxyEvent`] with its property names resolved against `P`.
#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceEvent<P: PropertySet> {
    Ready,
    PrimingFailed,
    Changed(P::Value),
    RequestComplete {
        property: P,
        success: bool,
        value: Option<P::Value>,
    },
    SetFailed(P),
    MethodComplete {
        method: String,
        success: bool,
        reply: Vec<PropertyValue>,
    },
    Signal {
        name: String,
        args: Vec<PropertyValue>,
    },
    ValidityChanged(bool),
    PathChanged(String),
    /// A property missing from the table, or a value of unexpected shape.
    Unknown {
        name: String,
        value: Option<PropertyValue>,
    },
}

impl<P: PropertySet> InterfaceEvent<P> {
    pub fn translate(event: ProxyEvent) -> Self {
        match event {
            ProxyEvent::Ready(_) => Self::Ready,
            ProxyEvent::PrimingFailed => Self::PrimingFailed,
            ProxyEvent::PropertyChanged { name, value } => {
                match P::from_key(&name).and_then(|p| p.decode(&value)) {
                    Some(typed) => Self::Changed(typed),
                    None => Self::Unknown {
                        name,
                        value: Some(value),
                    },
                }
            }
            ProxyEvent::RequestComplete {
                success,
                name,
                value,
            } => match P::from_key(&name) {
                Some(property) => Self::RequestComplete {
                    property,
                    success,
                    value: value.and_then(|v| property.decode(&v)),
                },
                None => Self::Unknown { name, value },
            },
            ProxyEvent::SetPropertyFailed { name } => match P::from_key(&name) {
                Some(property) => Self::SetFailed(property),
                None => Self::Unknown { name, value: None },
            },
            ProxyEvent::MethodComplete {
                method,
                success,
                reply,
            } => Self::MethodComplete {
                method,
                success,
                reply,
            },
            ProxyEvent::Signal { name, args } => Self::Signal { name, args },
            ProxyEvent::ValidityChanged(valid) => Self::ValidityChanged(valid),
            ProxyEvent::PathChanged(path) => Self::PathChanged(path),
        }
    }
}

/// Typed front end of a [`RebindableInterface`] for the properties in `P`.
#[derive(Debug)]
pub struct TypedInterface<P: PropertySet> {
    inner: RebindableInterface,
    events: UnboundedReceiver<ProxyEvent>,
    _properties: PhantomData<P>,
}

impl<P: PropertySet> TypedInterface<P> {
    /// Creates an unbound interface; call [`start`](Self::start) to bind it.
    pub fn new(transport: Arc<dyn Transport>, selection: Selection) -> Self {
        let mut inner = RebindableInterface::new(transport, P::binding(), selection);
        let events = inner.observe();
        Self {
            inner,
            events,
            _properties: PhantomData,
        }
    }

    /// Creates an interface that stays on `path`.
    pub fn for_path(transport: Arc<dyn Transport>, path: &str) -> Self {
        Self::new(transport, Selection::Manual(path.to_string()))
    }

    pub async fn start(&mut self, live: &[String]) {
        self.inner.start(live).await;
    }

    pub async fn rebind(&mut self, path: &str) {
        self.inner.rebind(path).await;
    }

    pub async fn update_directory(&mut self, live: &[String]) {
        self.inner.update_directory(live).await;
    }

    /// Cached value of `property`.
    ///
    /// `None` when the property is unknown or the cached value does not
    /// decode as the property's type.
    pub fn get(&self, property: P) -> Option<P::Value> {
        self.inner
            .get(property.key())
            .and_then(|value| property.decode(value))
    }

    /// Like [`get`](Self::get), but primes a lazy interface first.
    pub fn read(&mut self, property: P) -> Option<P::Value> {
        self.inner
            .read(property.key())
            .and_then(|value| property.decode(&value))
    }

    /// All cached properties that decode, in table order.
    pub fn values(&self) -> Vec<P::Value> {
        P::ALL.iter().filter_map(|&p| self.get(p)).collect()
    }

    /// Fetches `property` again; completion arrives as
    /// [`InterfaceEvent::RequestComplete`].
    pub fn request(&mut self, property: P) {
        self.inner.request_property(property.key());
    }

    /// Asks the remote object to change a property.
    ///
    /// Fails without a call if the property is read-only. Acceptance shows
    /// up as [`InterfaceEvent::Changed`], rejection as
    /// [`InterfaceEvent::SetFailed`].
    pub fn set(&mut self, value: P::Value) -> Result<()> {
        let property = P::property_of(&value);
        if !property.writable() {
            return Err(OfonoError::ReadOnly(property.key().to_string()));
        }
        self.inner.set_property(property.key(), P::encode(&value));
        Ok(())
    }

    /// Parses `input` and sets `property` to it.
    pub fn set_parsed(&mut self, property: P, input: &str) -> Result<()> {
        let value = property.parse(input).ok_or_else(|| OfonoError::InvalidValue {
            property: property.key().to_string(),
            value: input.to_string(),
        })?;
        self.set(value)
    }

    pub fn call_method(&mut self, method: &str, args: Vec<Argument>) {
        self.inner.call_method(method, args);
    }

    /// Primes if needed and waits until the cache is complete.
    pub async fn wait_ready(&mut self) -> bool {
        self.inner.wait_ready().await
    }

    /// Returns the next event, driving the proxy as needed.
    ///
    /// Returns `None` when nothing is in flight and no subscription is
    /// active, so no further event can arrive.
    pub async fn next_event(&mut self) -> Option<InterfaceEvent<P>> {
        loop {
            if let Ok(event) = self.events.try_recv() {
                return Some(InterfaceEvent::translate(event));
            }
            if self.inner.process_next().await == Step::Idle {
                return self.events.try_recv().ok().map(InterfaceEvent::translate);
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    pub fn state(&self) -> BindingState {
        self.inner.state()
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub fn error(&self) -> Option<&ErrorState> {
        self.inner.error()
    }

    pub fn inner(&self) -> &RebindableInterface {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut RebindableInterface {
        &mut self.inner
    }
}

pub use call_settings::{CallSettings, CallSettingsProperty, CallSettingsValue};
pub use message_manager::{MessageManager, MessageProperty, MessageValue};
pub use modem::{Modem, ModemProperty, ModemValue};
pub use sim_manager::{SimManager, SimProperty, SimValue};
