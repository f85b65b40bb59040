use ofono::{DbusTransport, Modem, ModemManager, Selection};

#[tokio::main]
async fn main() -> ofono::Result<()> {
    let transport = DbusTransport::system().await?.into_shared();

    let mut manager = ModemManager::new(transport.clone());
    manager.start().await?;

    let modems = manager.modems();
    if modems.is_empty() {
        println!("No modems found");
        return Ok(());
    }

    for path in &modems {
        let mut modem = Modem::new(transport.clone(), Selection::Manual(path.clone()));
        modem.start(&modems).await;

        if !modem.wait_ready().await {
            println!("{path}: {}", modem.error().map(|e| e.to_string()).unwrap_or_default());
            continue;
        }

        println!("{path}");
        println!("  {:14} {}", "Name", modem.name().unwrap_or_default());
        println!("  {:14} {}", "Manufacturer", modem.manufacturer().unwrap_or_default());
        println!("  {:14} {}", "Model", modem.model().unwrap_or_default());
        println!("  {:14} {:?}", "Powered", modem.powered());
        println!("  {:14} {:?}", "Online", modem.online());
        println!("  {:14} {}", "Interfaces", modem.interfaces().unwrap_or_default().join(", "));
    }

    Ok(())
}
