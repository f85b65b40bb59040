//! Conversion between D-Bus values and [`PropertyValue`].

use std::collections::{BTreeMap, HashMap};
use zbus::message::Message;
use zvariant::{Array, Structure, StructureBuilder, Value};

use crate::Result;
use crate::api::models::{OfonoError, PropertyValue};
use crate::core::transport::{Argument, Reply};

/// Converts a received D-Bus value.
///
/// Nested variants are unwrapped. Doubles, signatures and file descriptors
/// are rejected, oFono does not use them on the interfaces covered here.
pub(crate) fn from_value(value: &Value<'_>) -> Result<PropertyValue> {
    let converted = match value {
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::U8(v) => PropertyValue::UInt(u64::from(*v)),
        Value::U16(v) => PropertyValue::UInt(u64::from(*v)),
        Value::U32(v) => PropertyValue::UInt(u64::from(*v)),
        Value::U64(v) => PropertyValue::UInt(*v),
        Value::I16(v) => PropertyValue::Int(i64::from(*v)),
        Value::I32(v) => PropertyValue::Int(i64::from(*v)),
        Value::I64(v) => PropertyValue::Int(*v),
        Value::Str(s) => PropertyValue::Str(s.as_str().to_string()),
        Value::ObjectPath(p) => PropertyValue::Str(p.as_str().to_string()),
        Value::Value(inner) => from_value(inner)?,
        Value::Array(array) => from_array(array)?,
        Value::Dict(dict) => {
            let mut map = BTreeMap::new();
            for (key, value) in dict.iter() {
                let key = match key {
                    Value::Str(s) => s.as_str().to_string(),
                    Value::ObjectPath(p) => p.as_str().to_string(),
                    other => return Err(unsupported(other)),
                };
                map.insert(key, from_value(value)?);
            }
            PropertyValue::Map(map)
        }
        Value::Structure(s) => PropertyValue::Struct(
            s.fields()
                .iter()
                .map(from_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        other => return Err(unsupported(other)),
    };
    Ok(converted)
}

fn from_array(array: &Array<'_>) -> Result<PropertyValue> {
    match array.element_signature().to_string().as_str() {
        "y" => array
            .iter()
            .map(|v| match v {
                Value::U8(b) => Ok(*b),
                other => Err(unsupported(other)),
            })
            .collect::<Result<Vec<_>>>()
            .map(PropertyValue::Bytes),
        "s" | "o" => array
            .iter()
            .map(|v| match v {
                Value::Str(s) => Ok(s.as_str().to_string()),
                Value::ObjectPath(p) => Ok(p.as_str().to_string()),
                other => Err(unsupported(other)),
            })
            .collect::<Result<Vec<_>>>()
            .map(PropertyValue::StrList),
        _ => array
            .iter()
            .map(from_value)
            .collect::<Result<Vec<_>>>()
            .map(PropertyValue::List),
    }
}

fn unsupported(value: &Value<'_>) -> OfonoError {
    OfonoError::UnsupportedValue(value.value_signature().to_string())
}

/// Converts a value for sending.
///
/// `UInt` is sent as `u` and `Int` as `i` when they fit, maps as `a{sv}`
/// and generic lists as `av`. zvariant wraps `Value` elements of a
/// collection in a variant itself.
pub(crate) fn to_value(value: &PropertyValue) -> Result<Value<'static>> {
    let converted = match value {
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Str(s) => Value::from(s.clone()),
        PropertyValue::UInt(v) => match u32::try_from(*v) {
            Ok(v) => Value::U32(v),
            Err(_) => Value::U64(*v),
        },
        PropertyValue::Int(v) => match i32::try_from(*v) {
            Ok(v) => Value::I32(v),
            Err(_) => Value::I64(*v),
        },
        PropertyValue::StrList(list) => Value::from(list.clone()),
        PropertyValue::Bytes(bytes) => Value::from(bytes.clone()),
        PropertyValue::Map(map) => {
            let mut dict: HashMap<String, Value<'static>> = HashMap::with_capacity(map.len());
            for (k, v) in map {
                dict.insert(k.clone(), to_value(v)?);
            }
            Value::from(dict)
        }
        PropertyValue::Struct(fields) => {
            let mut builder = StructureBuilder::new();
            for field in fields {
                builder = builder.append_field(to_value(field)?);
            }
            Value::Structure(builder.build()?)
        }
        PropertyValue::List(items) => Value::from(
            items
                .iter()
                .map(to_value)
                .collect::<Result<Vec<_>>>()?,
        ),
    };
    Ok(converted)
}

/// Builds the message body for a call, `None` for a call without arguments.
pub(crate) fn encode_args(args: &[Argument]) -> Result<Option<Structure<'static>>> {
    if args.is_empty() {
        return Ok(None);
    }

    let mut builder = StructureBuilder::new();
    for arg in args {
        let value = match arg {
            Argument::Value(v) => to_value(v)?,
            Argument::Variant(v) => Value::Value(Box::new(to_value(v)?)),
            Argument::Byte(b) => Value::U8(*b),
        };
        builder = builder.append_field(value);
    }
    Ok(Some(builder.build()?))
}

/// Decodes every argument of a reply or signal body, in wire order.
pub(crate) fn decode_body(msg: &Message) -> Result<Reply> {
    let body = msg.body();
    if body.signature().to_string().is_empty() {
        return Ok(Vec::new());
    }

    let fields: Structure<'_> = body.deserialize()?;
    fields.fields().iter().map(from_value).collect()
}
