//! `org.ofono.CallSettings`: supplementary service settings.

use crate::Result;
use crate::interfaces::TypedInterface;
use crate::types::constants::interface;

property_table! {
    /// Properties of `org.ofono.CallSettings`.
    ///
    /// The presentation values are strings such as `"enabled"`,
    /// `"disabled"` or `"unknown"`, as reported by the network.
    CallSettingsProperty => CallSettingsValue, interface::CALL_SETTINGS, OnFirstRequest;
    CallingLinePresentation("CallingLinePresentation", String, ro) => calling_line_presentation;
    CalledLinePresentation("CalledLinePresentation", String, ro) => called_line_presentation;
    CallingNamePresentation("CallingNamePresentation", String, ro) => calling_name_presentation;
    ConnectedLinePresentation("ConnectedLinePresentation", String, ro) => connected_line_presentation;
    ConnectedLineRestriction("ConnectedLineRestriction", String, ro) => connected_line_restriction;
    CallingLineRestriction("CallingLineRestriction", String, ro) => calling_line_restriction;
    /// `"default"`, `"enabled"` or `"disabled"`.
    HideCallerId("HideCallerId", String, rw) => hide_caller_id;
    VoiceCallWaiting("VoiceCallWaiting", String, rw) => voice_call_waiting;
}

pub type CallSettings = TypedInterface<CallSettingsProperty>;

impl TypedInterface<CallSettingsProperty> {
    pub fn set_hide_caller_id(&mut self, setting: &str) -> Result<()> {
        self.set(CallSettingsValue::HideCallerId(setting.to_string()))
    }

    pub fn set_voice_call_waiting(&mut self, setting: &str) -> Result<()> {
        self.set(CallSettingsValue::VoiceCallWaiting(setting.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrimingMode;
    use crate::interfaces::PropertySet;

    #[test]
    fn lazy_priming() {
        assert_eq!(CallSettingsProperty::PRIMING, PrimingMode::OnFirstRequest);
        assert_eq!(CallSettingsProperty::binding().priming, PrimingMode::OnFirstRequest);
    }

    #[test]
    fn presentation_settings_are_read_only() {
        assert!(!CallSettingsProperty::CallingLinePresentation.writable());
        assert!(!CallSettingsProperty::CallingLineRestriction.writable());
        assert!(CallSettingsProperty::HideCallerId.writable());
        assert!(CallSettingsProperty::VoiceCallWaiting.writable());
    }

    #[test]
    fn property_of_value() {
        let value = CallSettingsValue::HideCallerId("enabled".into());
        assert_eq!(
            CallSettingsProperty::property_of(&value),
            CallSettingsProperty::HideCallerId
        );
    }
}
