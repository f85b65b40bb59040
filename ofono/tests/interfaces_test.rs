//! Tests for the typed oFono interfaces.

mod common;

use common::{FakeTransport, live};
use ofono::interfaces::sim_manager::methods as sim_methods;
use ofono::{
    Argument, CallSettings, CallSettingsProperty, CallSettingsValue, InterfaceEvent,
    MessageManager, MessageProperty, Modem, ModemProperty, ModemValue, OfonoError, PropertySet,
    PropertyValue, Selection, SimManager, SimProperty, Transport, TypedInterface,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const PATH: &str = "/phonesim";

async fn next<P: PropertySet>(iface: &mut TypedInterface<P>) -> InterfaceEvent<P> {
    tokio::time::timeout(Duration::from_secs(2), iface.next_event())
        .await
        .expect("no event arrived")
        .expect("interface went idle")
}

async fn next_message(manager: &mut MessageManager) -> InterfaceEvent<MessageProperty> {
    tokio::time::timeout(Duration::from_secs(2), manager.next_event())
        .await
        .expect("no event arrived")
        .expect("interface went idle")
}

fn shared(fake: &Arc<FakeTransport>) -> Arc<dyn Transport> {
    fake.clone()
}

async fn ready_modem(fake: &Arc<FakeTransport>) -> Modem {
    let mut modem = Modem::new(shared(fake), Selection::Automatic);
    modem.start(&live(&[PATH])).await;
    fake.reply_properties(
        0,
        &[
            ("Powered", true.into()),
            ("Online", false.into()),
            ("Name", "Phone Simulator".into()),
            (
                "Interfaces",
                PropertyValue::StrList(vec!["org.ofono.SimManager".into()]),
            ),
        ],
    );
    assert_eq!(next(&mut modem).await, InterfaceEvent::Ready);
    assert_eq!(next(&mut modem).await, InterfaceEvent::ValidityChanged(true));
    modem
}

#[tokio::test]
async fn test_modem_typed_getters() {
    let fake = FakeTransport::new();
    let modem = ready_modem(&fake).await;

    assert_eq!(modem.powered(), Some(true));
    assert_eq!(modem.online(), Some(false));
    assert_eq!(modem.name().as_deref(), Some("Phone Simulator"));
    assert_eq!(modem.serial(), None);
    assert!(modem.has_interface("org.ofono.SimManager"));
    assert!(!modem.has_interface("org.ofono.VoiceCallManager"));
    assert_eq!(modem.values().len(), 4);
    assert_eq!(
        modem.get(ModemProperty::Powered),
        Some(ModemValue::Powered(true))
    );
}

#[tokio::test]
async fn test_modem_change_events_are_typed() {
    let fake = FakeTransport::new();
    let mut modem = ready_modem(&fake).await;

    fake.property_changed(PATH, "org.ofono.Modem", "Online", true.into());
    assert_eq!(
        next(&mut modem).await,
        InterfaceEvent::Changed(ModemValue::Online(true))
    );
    assert_eq!(modem.online(), Some(true));

    fake.property_changed(PATH, "org.ofono.Modem", "SoftwareVersionNumber", "01".into());
    assert_eq!(
        next(&mut modem).await,
        InterfaceEvent::Unknown {
            name: "SoftwareVersionNumber".into(),
            value: Some("01".into()),
        }
    );

    // a known key with the wrong shape cannot be typed either
    fake.property_changed(PATH, "org.ofono.Modem", "Powered", "yes".into());
    assert!(matches!(
        next(&mut modem).await,
        InterfaceEvent::Unknown { name, .. } if name == "Powered"
    ));
}

#[tokio::test]
async fn test_read_only_property_is_not_sent() {
    let fake = FakeTransport::new();
    let mut modem = ready_modem(&fake).await;

    let err = modem.set(ModemValue::Serial("12345".into())).unwrap_err();
    assert!(matches!(err, OfonoError::ReadOnly(name) if name == "Serial"));
    assert_eq!(fake.call_count(), 1);
}

#[tokio::test]
async fn test_setters_send_variant() {
    let fake = FakeTransport::new();
    let mut modem = ready_modem(&fake).await;

    modem.set_powered(false).unwrap();
    let call = fake.last_call();
    assert_eq!(call.method, "SetProperty");
    assert_eq!(
        call.args,
        vec![
            Argument::Value("Powered".into()),
            Argument::Variant(PropertyValue::Bool(false)),
        ]
    );

    modem.set_parsed(ModemProperty::Online, "yes").unwrap();
    assert_eq!(
        fake.last_call().args[1],
        Argument::Variant(PropertyValue::Bool(true))
    );

    let err = modem.set_parsed(ModemProperty::Online, "later").unwrap_err();
    assert!(matches!(err, OfonoError::InvalidValue { .. }));
}

#[tokio::test]
async fn test_rejected_set_is_typed() {
    let fake = FakeTransport::new();
    let mut modem = ready_modem(&fake).await;

    modem.set_online(true).unwrap();
    fake.fail(1, "org.ofono.Error.NotAvailable", "Operation not available");
    assert_eq!(
        next(&mut modem).await,
        InterfaceEvent::SetFailed(ModemProperty::Online)
    );
}

#[tokio::test]
async fn test_sim_pin_methods() {
    let fake = FakeTransport::new();
    let mut sim = SimManager::for_path(shared(&fake), PATH);
    sim.start(&live(&[PATH])).await;

    let mut retries = BTreeMap::new();
    retries.insert("pin".to_string(), PropertyValue::UInt(3));
    fake.reply_properties(
        0,
        &[
            ("PinRequired", "pin".into()),
            ("Retries", PropertyValue::Map(retries)),
        ],
    );
    assert_eq!(next(&mut sim).await, InterfaceEvent::Ready);
    assert_eq!(next(&mut sim).await, InterfaceEvent::ValidityChanged(true));
    assert_eq!(sim.pin_required().as_deref(), Some("pin"));
    assert_eq!(sim.retries().and_then(|r| r.get("pin").copied()), Some(3));

    sim.enter_pin("pin", "0000");
    let call = fake.last_call();
    assert_eq!(call.interface, "org.ofono.SimManager");
    assert_eq!(call.method, sim_methods::ENTER_PIN);
    assert_eq!(call.args, vec![Argument::from("pin"), Argument::from("0000")]);

    fake.fail(1, "org.ofono.Error.Failed", "Operation failed");
    assert_eq!(
        next(&mut sim).await,
        InterfaceEvent::MethodComplete {
            method: "EnterPin".into(),
            success: false,
            reply: Vec::new(),
        }
    );
    assert_eq!(
        sim.error().map(|e| e.name.as_str()),
        Some("org.ofono.Error.Failed")
    );

    sim.get_icon(1);
    assert_eq!(fake.last_call().args, vec![Argument::Byte(1)]);
}

#[tokio::test]
async fn test_sim_subscriber_numbers_writable() {
    let fake = FakeTransport::new();
    let mut sim = SimManager::for_path(shared(&fake), PATH);
    sim.start(&live(&[PATH])).await;

    sim.set_subscriber_numbers(vec!["+15551234".into()]).unwrap();
    assert_eq!(
        fake.last_call().args[1],
        Argument::Variant(PropertyValue::StrList(vec!["+15551234".into()]))
    );
    assert!(sim.set(ofono::SimValue::Present(false)).is_err());
    assert!(!SimProperty::Present.writable());
}

#[tokio::test]
async fn test_call_settings_prime_lazily() {
    let fake = FakeTransport::new();
    let mut settings = CallSettings::for_path(shared(&fake), PATH);
    settings.start(&live(&[PATH])).await;
    assert_eq!(next(&mut settings).await, InterfaceEvent::ValidityChanged(true));
    assert_eq!(fake.call_count(), 0);

    assert_eq!(settings.read(CallSettingsProperty::HideCallerId), None);
    assert_eq!(fake.calls_to("GetProperties"), 1);

    fake.reply_properties(
        0,
        &[
            ("HideCallerId", "default".into()),
            ("CallingLinePresentation", "enabled".into()),
        ],
    );
    assert_eq!(next(&mut settings).await, InterfaceEvent::Ready);
    assert_eq!(settings.hide_caller_id().as_deref(), Some("default"));
    assert_eq!(
        settings.read(CallSettingsProperty::CallingLinePresentation),
        Some(CallSettingsValue::CallingLinePresentation("enabled".into()))
    );
    assert_eq!(fake.call_count(), 1);
}

#[tokio::test]
async fn test_request_completion_is_typed() {
    let fake = FakeTransport::new();
    let mut settings = CallSettings::for_path(shared(&fake), PATH);
    settings.start(&live(&[PATH])).await;
    next(&mut settings).await;

    settings.request(CallSettingsProperty::VoiceCallWaiting);
    // the lazy prime goes out first, then the fetch
    assert_eq!(fake.calls_to("GetProperties"), 2);
    fake.reply_properties(1, &[("VoiceCallWaiting", "enabled".into())]);
    assert_eq!(
        next(&mut settings).await,
        InterfaceEvent::RequestComplete {
            property: CallSettingsProperty::VoiceCallWaiting,
            success: true,
            value: Some(CallSettingsValue::VoiceCallWaiting("enabled".into())),
        }
    );
}

#[tokio::test]
async fn test_message_list_tracking() {
    let fake = FakeTransport::new();
    let mut manager = MessageManager::for_path(shared(&fake), PATH);
    manager.start(&live(&[PATH])).await;
    assert_eq!(fake.subscribers(PATH), 6);

    // becoming valid loads the message list
    assert_eq!(
        next_message(&mut manager).await,
        InterfaceEvent::ValidityChanged(true)
    );
    assert_eq!(fake.last_call().method, "GetMessages");

    let entry = |path: &str| {
        PropertyValue::Struct(vec![
            PropertyValue::Str(path.into()),
            PropertyValue::Map(BTreeMap::new()),
        ])
    };
    fake.reply(
        0,
        Ok(vec![PropertyValue::List(vec![entry("/phonesim/message_01")])]),
    );
    assert!(matches!(
        next_message(&mut manager).await,
        InterfaceEvent::MethodComplete { success: true, .. }
    ));
    assert_eq!(manager.messages(), ["/phonesim/message_01"]);

    fake.emit(
        PATH,
        "org.ofono.MessageManager",
        "MessageAdded",
        vec![
            PropertyValue::Str("/phonesim/message_02".into()),
            PropertyValue::Map(BTreeMap::new()),
        ],
    );
    next_message(&mut manager).await;
    fake.emit(
        PATH,
        "org.ofono.MessageManager",
        "MessageRemoved",
        vec![PropertyValue::Str("/phonesim/message_01".into())],
    );
    next_message(&mut manager).await;
    assert_eq!(manager.messages(), ["/phonesim/message_02"]);

    manager.send_message("+15551234", "hello");
    let call = fake.last_call();
    assert_eq!(call.method, "SendMessage");
    assert_eq!(call.args, vec![Argument::from("+15551234"), Argument::from("hello")]);
}

#[tokio::test]
async fn test_message_settings() {
    let fake = FakeTransport::new();
    let mut manager = MessageManager::for_path(shared(&fake), PATH);
    manager.start(&live(&[PATH])).await;

    manager.set_use_delivery_reports(true).unwrap();
    assert_eq!(
        fake.last_call().args,
        vec![
            Argument::Value("UseDeliveryReports".into()),
            Argument::Variant(PropertyValue::Bool(true)),
        ]
    );
    assert!(MessageProperty::Bearer.writable());
}

#[tokio::test]
async fn test_message_list_follows_rebind() {
    let fake = FakeTransport::new();
    let mut manager = MessageManager::new(shared(&fake), Selection::Automatic);
    manager.start(&live(&["/modem0", "/modem1"])).await;
    assert_eq!(
        next_message(&mut manager).await,
        InterfaceEvent::ValidityChanged(true)
    );

    let entry = |path: &str| {
        PropertyValue::Struct(vec![
            PropertyValue::Str(path.into()),
            PropertyValue::Map(BTreeMap::new()),
        ])
    };
    fake.reply(0, Ok(vec![PropertyValue::List(vec![entry("/modem0/message_01")])]));
    next_message(&mut manager).await;
    assert_eq!(manager.messages(), ["/modem0/message_01"]);

    manager.rebind("/modem1").await;
    assert_eq!(
        next_message(&mut manager).await,
        InterfaceEvent::PathChanged("/modem1".into())
    );
    assert!(manager.messages().is_empty());
    let call = fake.last_call();
    assert_eq!(call.method, "GetMessages");
    assert_eq!(call.path, "/modem1");
    assert_eq!(fake.calls_to("GetMessages"), 2);

    fake.reply(1, Ok(vec![PropertyValue::List(vec![entry("/modem1/message_07")])]));
    assert!(matches!(
        next_message(&mut manager).await,
        InterfaceEvent::MethodComplete { success: true, .. }
    ));
    assert_eq!(manager.messages(), ["/modem1/message_07"]);
}
