//! `org.ofono.Modem`: power, radio state and identity of a modem.

use crate::Result;
use crate::interfaces::TypedInterface;
use crate::types::constants::interface;

property_table! {
    /// Properties of `org.ofono.Modem`.
    ModemProperty => ModemValue, interface::MODEM, OnConstruction;
    Powered("Powered", bool, rw) => powered;
    Online("Online", bool, rw) => online;
    Lockdown("Lockdown", bool, rw) => lockdown;
    /// Set while an emergency call is in progress.
    Emergency("Emergency", bool, ro) => emergency;
    Name("Name", String, ro) => name;
    Manufacturer("Manufacturer", String, ro) => manufacturer;
    Model("Model", String, ro) => model;
    Revision("Revision", String, ro) => revision;
    /// IMEI for GSM modems.
    Serial("Serial", String, ro) => serial;
    /// `"hardware"`, `"hfp"`, `"sap"` or `"test"`.
    Type("Type", String, ro) => modem_type;
    Features("Features", Vec<String>, ro) => features;
    /// Interfaces the modem currently exposes.
    Interfaces("Interfaces", Vec<String>, ro) => interfaces;
}

/// A modem, usually bound with [`Selection::Automatic`](crate::Selection::Automatic)
/// so it follows the first modem oFono reports.
pub type Modem = TypedInterface<ModemProperty>;

impl TypedInterface<ModemProperty> {
    pub fn set_powered(&mut self, powered: bool) -> Result<()> {
        self.set(ModemValue::Powered(powered))
    }

    pub fn set_online(&mut self, online: bool) -> Result<()> {
        self.set(ModemValue::Online(online))
    }

    pub fn set_lockdown(&mut self, lockdown: bool) -> Result<()> {
        self.set(ModemValue::Lockdown(lockdown))
    }

    /// Whether the modem currently exposes `iface`.
    pub fn has_interface(&self, iface: &str) -> bool {
        self.interfaces()
            .is_some_and(|list| list.iter().any(|i| i == iface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::PropertyValue;
    use crate::interfaces::PropertySet;

    #[test]
    fn keys_round_trip() {
        for &property in ModemProperty::ALL {
            assert_eq!(ModemProperty::from_key(property.key()), Some(property));
        }
        assert_eq!(ModemProperty::from_key("SoftwareVersionNumber"), None);
    }

    #[test]
    fn writability() {
        assert!(ModemProperty::Powered.writable());
        assert!(ModemProperty::Lockdown.writable());
        assert!(!ModemProperty::Emergency.writable());
        assert!(!ModemProperty::Serial.writable());
    }

    #[test]
    fn decode_checks_shape() {
        assert_eq!(
            ModemProperty::Online.decode(&PropertyValue::Bool(true)),
            Some(ModemValue::Online(true))
        );
        assert_eq!(
            ModemProperty::Online.decode(&PropertyValue::Str("true".into())),
            None
        );
        assert_eq!(
            ModemProperty::Features.decode(&PropertyValue::StrList(vec!["sim".into()])),
            Some(ModemValue::Features(vec!["sim".into()]))
        );
    }

    #[test]
    fn parse_user_input() {
        assert_eq!(
            ModemProperty::Powered.parse("on"),
            Some(ModemValue::Powered(true))
        );
        assert_eq!(ModemProperty::Powered.parse("sideways"), None);
        assert_eq!(
            ModemProperty::Name.parse("1"),
            Some(ModemValue::Name("1".into()))
        );
    }

    #[test]
    fn primes_on_construction() {
        assert_eq!(ModemProperty::INTERFACE, "org.ofono.Modem");
        assert_eq!(ModemProperty::PRIMING, crate::PrimingMode::OnConstruction);
        assert!(ModemProperty::SIGNALS.is_empty());
    }
}
