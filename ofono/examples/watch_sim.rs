/// Follows the first modem and prints SIM changes as they happen.
///
/// The SIM manager is rebound whenever the modem selection moves, so
/// unplugging one modem and plugging in another keeps the output going.
use ofono::{
    DbusTransport, DirectoryEvent, InterfaceEvent, Modem, ModemManager, Selection, SimManager,
};

#[tokio::main]
async fn main() -> ofono::Result<()> {
    env_logger::init();

    let transport = DbusTransport::system().await?.into_shared();

    let mut manager = ModemManager::new(transport.clone());
    manager.start().await?;

    let mut modem = Modem::new(transport.clone(), Selection::Automatic);
    modem.start(&manager.modems()).await;

    let mut sim = SimManager::for_path(transport, modem.path());
    sim.start(&manager.modems()).await;

    loop {
        tokio::select! {
            Some(event) = manager.next_event() => {
                match &event {
                    DirectoryEvent::ObjectAppeared(path) => println!("+ {path}"),
                    DirectoryEvent::ObjectDisappeared(path) => println!("- {path}"),
                }
                let live = manager.modems();
                modem.update_directory(&live).await;
                sim.update_directory(&live).await;
            }
            Some(event) = modem.next_event() => {
                if let InterfaceEvent::PathChanged(path) = event {
                    println!("modem is now {path}");
                    sim.rebind(&path).await;
                }
            }
            Some(event) = sim.next_event() => match event {
                InterfaceEvent::Ready => println!(
                    "SIM ready: present={:?} imsi={:?}",
                    sim.present(),
                    sim.subscriber_identity()
                ),
                InterfaceEvent::Changed(value) => println!("SIM {value:?}"),
                InterfaceEvent::ValidityChanged(valid) => println!("SIM valid: {valid}"),
                _ => {}
            },
            else => break,
        }
    }

    Ok(())
}
