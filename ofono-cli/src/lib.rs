use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use ofono::{
    BusKind, CallSettingsProperty, DbusTransport, DirectoryEvent, InterfaceEvent, MessageProperty,
    ModemManager, ModemProperty, PropertySet, ProxyConfig, Selection, SimProperty, Transport,
    TypedInterface,
};

#[derive(Parser, Debug)]
#[command(name = "ofono-cli")]
#[command(version, about = "Inspect and drive oFono modems")]
struct Args {
    /// Use the session bus instead of the system bus
    #[arg(long, global = true)]
    session: bool,

    /// Seconds to wait for oFono to answer
    #[arg(long, global = true, value_name = "SECS", default_value_t = 25)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the modems oFono knows about
    Modems,
    /// Print every property of an interface
    Props {
        interface: Interface,
        /// Object path of the modem; defaults to the first one
        #[arg(long)]
        modem: Option<String>,
    },
    /// Change a writable property
    Set {
        interface: Interface,
        property: String,
        value: String,
        #[arg(long)]
        modem: Option<String>,
    },
    /// Print changes until interrupted
    Watch {
        interface: Interface,
        #[arg(long)]
        modem: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Interface {
    Modem,
    Sim,
    CallSettings,
    Messages,
}

/// Expands to a call of the generic function `$f` instantiated for the
/// property table that belongs to `$iface`.
macro_rules! for_interface {
    ($iface:expr, $f:ident($($arg:expr),* $(,)?)) => {
        match $iface {
            Interface::Modem => $f::<ModemProperty>($($arg),*).await,
            Interface::Sim => $f::<SimProperty>($($arg),*).await,
            Interface::CallSettings => $f::<CallSettingsProperty>($($arg),*).await,
            Interface::Messages => $f::<MessageProperty>($($arg),*).await,
        }
    };
}

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(execute(args))
}

async fn execute(args: Args) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(args.timeout);
    let bus = if args.session {
        BusKind::Session
    } else {
        BusKind::System
    };
    let config = ProxyConfig::new().with_bus(bus).with_call_timeout(timeout);
    debug!("connecting with {config:?}");

    let transport = DbusTransport::with_config(config)
        .await
        .context("failed to connect to D-Bus")?
        .into_shared();

    let mut manager = ModemManager::new(transport.clone());
    manager
        .start()
        .await
        .context("failed to list modems; is oFono running?")?;

    match args.command {
        Command::Modems => {
            list_modems(&manager);
            Ok(())
        }
        Command::Props { interface, modem } => {
            let selection = selection(modem);
            for_interface!(interface, show(transport, &manager, selection, timeout))
        }
        Command::Set {
            interface,
            property,
            value,
            modem,
        } => {
            let selection = selection(modem);
            for_interface!(
                interface,
                set(transport, &manager, selection, &property, &value, timeout)
            )
        }
        Command::Watch { interface, modem } => {
            let selection = selection(modem);
            for_interface!(interface, watch(transport, &mut manager, selection))
        }
    }
}

fn selection(modem: Option<String>) -> Selection {
    modem.map(Selection::Manual).unwrap_or(Selection::Automatic)
}

fn list_modems(manager: &ModemManager) {
    let modems = manager.modems();
    if modems.is_empty() {
        println!("No modems found");
        return;
    }

    for path in modems {
        let announced = manager.announced_properties(&path);
        let field = |key: &str| {
            announced
                .and_then(|props| props.get(key))
                .map(|value| value.to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        println!("{path:20} {:10} {}", field("Type"), field("Name"));
    }
}

/// Binds `P` to the selected modem and waits for a full snapshot.
async fn bound<P: PropertySet>(
    transport: Arc<dyn Transport>,
    manager: &ModemManager,
    selection: Selection,
    timeout: Duration,
) -> anyhow::Result<TypedInterface<P>> {
    let mut iface = TypedInterface::<P>::new(transport, selection);
    iface.start(&manager.modems()).await;
    if !iface.is_valid() && !manager.contains(iface.path()) {
        bail!("no modem at {}", iface.path());
    }

    let ready = tokio::time::timeout(timeout, iface.wait_ready())
        .await
        .unwrap_or(false);
    if !ready {
        let reason = iface
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no reply".to_string());
        bail!("{} on {} is not available: {reason}", P::INTERFACE, iface.path());
    }
    Ok(iface)
}

async fn show<P: PropertySet>(
    transport: Arc<dyn Transport>,
    manager: &ModemManager,
    selection: Selection,
    timeout: Duration,
) -> anyhow::Result<()> {
    let iface = bound::<P>(transport, manager, selection, timeout).await?;

    println!("{} {}", iface.path(), P::INTERFACE);
    for (name, value) in iface.inner().properties() {
        let access = match P::from_key(&name) {
            Some(property) if property.writable() => "rw",
            Some(_) => "ro",
            None => "  ",
        };
        println!("  {access} {name:28} {value}");
    }
    Ok(())
}

async fn set<P: PropertySet>(
    transport: Arc<dyn Transport>,
    manager: &ModemManager,
    selection: Selection,
    key: &str,
    input: &str,
    timeout: Duration,
) -> anyhow::Result<()> {
    let property = P::from_key(key)
        .ok_or_else(|| anyhow!("{} has no property {key}", P::INTERFACE))?;
    let wanted = property
        .parse(input)
        .ok_or_else(|| anyhow!("{input:?} is not a valid value for {key}"))?;

    let mut iface = bound::<P>(transport, manager, selection, timeout).await?;
    if iface.get(property).as_ref() == Some(&wanted) {
        println!("{key} already has that value");
        return Ok(());
    }
    iface.set(wanted.clone())?;
    info!("set {key} on {}", iface.path());

    let outcome = tokio::time::timeout(timeout, async {
        while let Some(event) = iface.next_event().await {
            match event {
                InterfaceEvent::Changed(value) if P::property_of(&value) == property => {
                    return Ok(value);
                }
                InterfaceEvent::SetFailed(failed) if failed == property => {
                    let reason = iface
                        .error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "rejected".to_string());
                    return Err(anyhow!("setting {key} failed: {reason}"));
                }
                other => debug!("ignoring {other:?}"),
            }
        }
        Err(anyhow!("{} stopped answering", P::INTERFACE))
    })
    .await;

    match outcome {
        Ok(Ok(value)) => {
            println!("{value:?}");
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(_) => bail!("no change notification for {key} within {}s", timeout.as_secs()),
    }
}

async fn watch<P: PropertySet>(
    transport: Arc<dyn Transport>,
    manager: &mut ModemManager,
    selection: Selection,
) -> anyhow::Result<()> {
    let mut iface = TypedInterface::<P>::new(transport, selection);
    iface.start(&manager.modems()).await;
    println!("watching {} on {}", P::INTERFACE, iface.path());

    loop {
        tokio::select! {
            Some(event) = manager.next_event() => {
                match &event {
                    DirectoryEvent::ObjectAppeared(path) => println!("+ {path}"),
                    DirectoryEvent::ObjectDisappeared(path) => println!("- {path}"),
                }
                iface.update_directory(&manager.modems()).await;
            }
            Some(event) = iface.next_event() => print_event(&event),
            else => break,
        }
    }
    Ok(())
}

fn print_event<P: PropertySet>(event: &InterfaceEvent<P>) {
    match event {
        InterfaceEvent::Ready => println!("ready"),
        InterfaceEvent::PrimingFailed => println!("failed to read properties"),
        InterfaceEvent::Changed(value) => println!("{value:?}"),
        InterfaceEvent::RequestComplete {
            property,
            success,
            value,
        } => println!("{} fetched ({success}): {value:?}", property.key()),
        InterfaceEvent::SetFailed(property) => println!("{} was not changed", property.key()),
        InterfaceEvent::MethodComplete {
            method, success, ..
        } => println!("{method} finished ({success})"),
        InterfaceEvent::Signal { name, args } => {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            println!("{name}({})", args.join(", "));
        }
        InterfaceEvent::ValidityChanged(valid) => println!("valid: {valid}"),
        InterfaceEvent::PathChanged(path) => println!("now bound to {path}"),
        InterfaceEvent::Unknown { name, value } => match value {
            Some(value) => println!("{name} = {value}"),
            None => println!("{name}"),
        },
    }
}
