use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A property value as carried between oFono and the proxy cache.
///
/// oFono exposes every property as a D-Bus variant. The transport adapter
/// converts those variants into this closed set of shapes; anything it
/// cannot represent is rejected at the adapter instead of reaching the cache.
///
/// Object paths are carried as [`PropertyValue::Str`]. Byte, 16-bit and
/// 32-bit unsigned values all widen into [`PropertyValue::UInt`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Str(String),
    UInt(u64),
    Int(i64),
    StrList(Vec<String>),
    Bytes(Vec<u8>),
    /// A dictionary keyed by string (`a{sv}`, `a{ss}`, `a{sy}`, ...).
    Map(BTreeMap<String, PropertyValue>),
    /// A D-Bus structure, fields in wire order.
    Struct(Vec<PropertyValue>),
    /// Any array that is neither strings nor bytes, e.g. `a(oa{sv})`.
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, PropertyValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, used in log and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::UInt(_) => "unsigned",
            Self::Int(_) => "signed",
            Self::StrList(_) => "string list",
            Self::Bytes(_) => "bytes",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
            Self::List(_) => "list",
        }
    }

    /// Parses `input` into a value of the same shape as `self`.
    ///
    /// Used by callers that only have a string (the CLI) and a known
    /// current value to infer the wire type from. Lists are comma separated.
    pub fn parse_like(&self, input: &str) -> Option<PropertyValue> {
        match self {
            Self::Bool(_) => match input {
                "true" | "on" | "1" | "yes" => Some(Self::Bool(true)),
                "false" | "off" | "0" | "no" => Some(Self::Bool(false)),
                _ => None,
            },
            Self::Str(_) => Some(Self::Str(input.to_string())),
            Self::UInt(_) => input.parse().ok().map(Self::UInt),
            Self::Int(_) => input.parse().ok().map(Self::Int),
            Self::StrList(_) => Some(Self::StrList(
                input
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            _ => None,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::StrList(list) => write!(f, "[{}]", list.join(", ")),
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Struct(fields) => {
                write!(f, "(")?;
                for (i, v) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
            Self::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<u8> for PropertyValue {
    fn from(value: u8) -> Self {
        Self::UInt(value.into())
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        Self::UInt(value.into())
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::UInt(value.into())
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        Self::StrList(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl<V: Into<PropertyValue>> From<BTreeMap<String, V>> for PropertyValue {
    fn from(value: BTreeMap<String, V>) -> Self {
        Self::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Typed extraction out of a [`PropertyValue`].
///
/// Returns `None` when the value does not have the expected shape. Domain
/// interfaces use this as the decoder column of their property tables.
pub trait FromPropertyValue: Sized {
    fn from_property_value(value: &PropertyValue) -> Option<Self>;
}

impl FromPropertyValue for PropertyValue {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromPropertyValue for bool {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromPropertyValue for String {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        value.as_str().map(String::from)
    }
}

impl FromPropertyValue for u8 {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        value.as_u64().and_then(|v| u8::try_from(v).ok())
    }
}

impl FromPropertyValue for u16 {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        value.as_u64().and_then(|v| u16::try_from(v).ok())
    }
}

impl FromPropertyValue for u32 {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        value.as_u64().and_then(|v| u32::try_from(v).ok())
    }
}

impl FromPropertyValue for Vec<String> {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::StrList(list) => Some(list.clone()),
            // an empty `as` may come back as a generic empty list
            PropertyValue::List(items) => items
                .iter()
                .map(|v| v.as_str().map(String::from))
                .collect(),
            _ => None,
        }
    }
}

impl FromPropertyValue for Vec<u8> {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }
}

impl<V: FromPropertyValue> FromPropertyValue for BTreeMap<String, V> {
    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        value
            .as_map()?
            .iter()
            .map(|(k, v)| V::from_property_value(v).map(|v| (k.clone(), v)))
            .collect()
    }
}

/// An event emitted by a property proxy to its observers.
///
/// Every asynchronous operation on a proxy eventually produces exactly one
/// completion event, success or failure. Change notifications and binding
/// changes are reported through the same channel, in the order they were
/// applied to the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyEvent {
    /// Priming completed; carries the full cache snapshot.
    Ready(BTreeMap<String, PropertyValue>),
    /// Priming failed; the cache was left untouched.
    PrimingFailed,
    /// A single-property request finished.
    ///
    /// On failure `value` is the previously cached value, or `None` if the
    /// property was unknown.
    RequestComplete {
        success: bool,
        name: String,
        value: Option<PropertyValue>,
    },
    /// The remote object reported a new value.
    PropertyChanged { name: String, value: PropertyValue },
    /// A `SetProperty` call was rejected.
    SetPropertyFailed { name: String },
    /// A pass-through domain method finished.
    MethodComplete {
        method: String,
        success: bool,
        reply: Vec<PropertyValue>,
    },
    /// A domain signal the binding subscribed to, forwarded untouched.
    Signal {
        name: String,
        args: Vec<PropertyValue>,
    },
    ValidityChanged(bool),
    PathChanged(String),
}

/// Last failure recorded by a proxy, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorState {
    /// D-Bus error name, e.g. `org.ofono.Error.Failed`.
    pub name: String,
    pub message: String,
}

impl ErrorState {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<&TransportError> for ErrorState {
    fn from(err: &TransportError) -> Self {
        Self::new(err.name.clone(), err.message.clone())
    }
}

impl Display for ErrorState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// A failed remote call, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct TransportError {
    pub name: String,
    pub message: String,
}

impl TransportError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<zbus::Error> for TransportError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, message, _) => {
                Self::new(name.as_str(), message.unwrap_or_default())
            }
            zbus::Error::FDO(fdo) => {
                let name = zbus::DBusError::name(fdo.as_ref()).to_string();
                let message = zbus::DBusError::description(fdo.as_ref())
                    .unwrap_or_default()
                    .to_string();
                Self::new(name, message)
            }
            other => Self::new(crate::types::constants::errors::FAILED, other.to_string()),
        }
    }
}

/// Errors returned by the fallible setup paths of this crate.
///
/// Operations on a running proxy never return errors; they report failures
/// through [`ProxyEvent`]s and the proxy's recorded [`ErrorState`].
///
/// # Examples
///
/// ```no_run
/// use ofono::{DbusTransport, OfonoError};
///
/// # async fn example() -> ofono::Result<()> {
/// match DbusTransport::system().await {
///     Ok(_) => println!("connected"),
///     Err(OfonoError::Dbus(e)) => eprintln!("no system bus: {e}"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Error)]
pub enum OfonoError {
    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    /// A value could not be encoded or decoded.
    #[error("variant error: {0}")]
    Variant(#[from] zvariant::Error),

    /// A remote method call returned an error.
    #[error("remote call failed: {0}")]
    Transport(#[from] TransportError),

    /// The bus delivered a value this crate has no representation for.
    #[error("unsupported value with signature {0}")]
    UnsupportedValue(String),

    /// A reply did not have the expected shape.
    #[error("unexpected reply to {method}: {reason}")]
    UnexpectedReply { method: String, reason: String },

    /// The property name is not part of the interface.
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// The property exists but cannot be written.
    #[error("property {0} is read-only")]
    ReadOnly(String),

    /// A user-supplied value could not be parsed for the property.
    #[error("invalid value for {property}: {value}")]
    InvalidValue { property: String, value: String },
}
