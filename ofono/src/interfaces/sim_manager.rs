//! `org.ofono.SimManager`: SIM card state and PIN handling.
//!
//! The PIN methods report their outcome as
//! [`InterfaceEvent::MethodComplete`](crate::InterfaceEvent::MethodComplete);
//! a failed attempt is also recorded in the interface's error state, and
//! the remaining attempts show up as a `Retries` change.

use std::collections::BTreeMap;

use crate::Result;
use crate::core::transport::Argument;
use crate::interfaces::TypedInterface;
use crate::types::constants::interface;

property_table! {
    /// Properties of `org.ofono.SimManager`.
    SimProperty => SimValue, interface::SIM_MANAGER, OnConstruction;
    Present("Present", bool, ro) => present;
    FixedDialing("FixedDialing", bool, ro) => fixed_dialing;
    BarredDialing("BarredDialing", bool, ro) => barred_dialing;
    /// The IMSI.
    SubscriberIdentity("SubscriberIdentity", String, ro) => subscriber_identity;
    MobileCountryCode("MobileCountryCode", String, ro) => mobile_country_code;
    MobileNetworkCode("MobileNetworkCode", String, ro) => mobile_network_code;
    /// `"none"` or the PIN type the SIM is waiting for, e.g. `"pin"`.
    PinRequired("PinRequired", String, ro) => pin_required;
    /// The ICCID.
    CardIdentifier("CardIdentifier", String, ro) => card_identifier;
    SubscriberNumbers("SubscriberNumbers", Vec<String>, rw) => subscriber_numbers;
    LockedPins("LockedPins", Vec<String>, ro) => locked_pins;
    PreferredLanguages("PreferredLanguages", Vec<String>, ro) => preferred_languages;
    ServiceNumbers("ServiceNumbers", BTreeMap<String, String>, ro) => service_numbers;
    /// Attempts left per PIN type.
    Retries("Retries", BTreeMap<String, u8>, ro) => retries;
}

pub type SimManager = TypedInterface<SimProperty>;

/// Method names of `org.ofono.SimManager`.
pub mod methods {
    pub const CHANGE_PIN: &str = "ChangePin";
    pub const ENTER_PIN: &str = "EnterPin";
    pub const RESET_PIN: &str = "ResetPin";
    pub const LOCK_PIN: &str = "LockPin";
    pub const UNLOCK_PIN: &str = "UnlockPin";
    pub const GET_ICON: &str = "GetIcon";
}

impl TypedInterface<SimProperty> {
    pub fn set_subscriber_numbers(&mut self, numbers: Vec<String>) -> Result<()> {
        self.set(SimValue::SubscriberNumbers(numbers))
    }

    pub fn change_pin(&mut self, pin_type: &str, old_pin: &str, new_pin: &str) {
        self.call_method(
            methods::CHANGE_PIN,
            vec![pin_type.into(), old_pin.into(), new_pin.into()],
        );
    }

    pub fn enter_pin(&mut self, pin_type: &str, pin: &str) {
        self.call_method(methods::ENTER_PIN, vec![pin_type.into(), pin.into()]);
    }

    /// Unblocks a PIN with its PUK and sets a new PIN.
    pub fn reset_pin(&mut self, puk_type: &str, puk: &str, new_pin: &str) {
        self.call_method(
            methods::RESET_PIN,
            vec![puk_type.into(), puk.into(), new_pin.into()],
        );
    }

    pub fn lock_pin(&mut self, pin_type: &str, pin: &str) {
        self.call_method(methods::LOCK_PIN, vec![pin_type.into(), pin.into()]);
    }

    pub fn unlock_pin(&mut self, pin_type: &str, pin: &str) {
        self.call_method(methods::UNLOCK_PIN, vec![pin_type.into(), pin.into()]);
    }

    /// Fetches icon `id` from the SIM. The reply carries the image bytes.
    pub fn get_icon(&mut self, id: u8) {
        self.call_method(methods::GET_ICON, vec![Argument::Byte(id)]);
    }
}
