use ethercat_esi::{DirectoryPublisher, JsonFileStore, Publisher, SetupStore, sii};
use log::{error, info};
use std::path::PathBuf;

/// Compiles every device of a persisted setup into `<out dir>/<device>.xml`
/// and `<out dir>/<device>.bin`, each against the group it is stored under.
///
/// Usage: `compile_setup <setup.json> [out dir]`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(setup_path) = args.next() else {
        eprintln!("usage: compile_setup <setup.json> [out dir]");
        std::process::exit(2);
    };
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".into()));

    let store = JsonFileStore::new(setup_path);
    let mut setup = store.load()?;
    let publisher = DirectoryPublisher::new(&out_dir);

    let targets: Vec<(String, String)> = setup
        .devices
        .iter()
        .map(|d| (d.name.clone(), d.group_type.clone()))
        .collect();
    for (name, group) in &targets {
        let document = match setup.compile_device(name, group) {
            Ok(document) => document,
            Err(e) => {
                error!("Skipping '{}': {}", name, e);
                continue;
            }
        };
        publisher.publish(name, &document)?;

        if let Some(device) = setup.device(name) {
            let image = sii::encode_eeprom(setup.vendor.id, device, group)?;
            let target = out_dir.join(format!("{}.bin", name));
            std::fs::write(&target, &image)?;
            info!("Wrote {} byte SII image to {}", image.len(), target.display());

            let decoded = sii::decode_eeprom(&image)?;
            info!(
                "SII check for '{}': product 0x{:X}, {} categories",
                name,
                decoded.product_code,
                decoded.categories.len()
            );
        }
    }

    // Persist the recomputed sync manager sizes.
    store.save(&setup)?;
    Ok(())
}
