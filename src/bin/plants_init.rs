use std::path::PathBuf;

use solar_daily_report::adapters::monitoring::GrowattHttpClient;
use solar_daily_report::adapters::plant_store::{
    JsonPlantStore, PLANTS_FILE_NAME, plants_from_listing,
};
use solar_daily_report::domain::ports::{MonitoringApi, PlantConfigStore};

fn main() {
    if let Err(error) = run() {
        eprintln!("plants_init failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut path: Option<PathBuf> = None;
    let mut list_only = false;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--path" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--path requires a value".to_string());
                };
                path = Some(PathBuf::from(value));
                index += 2;
            }
            "--list" => {
                list_only = true;
                index += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument: {other}"));
            }
        }
    }

    let config = solar_daily_report::app::load_config().map_err(|error| error.to_string())?;
    let client = GrowattHttpClient::new(&config.monitoring).map_err(|error| error.to_string())?;
    let listing = client.list_plants().map_err(|error| error.to_string())?;
    let plants = plants_from_listing(&listing);

    if list_only {
        for plant in &plants {
            println!("{}\t{}", plant.plant_id, plant.plant_name);
        }
        println!("{} plants", plants.len());
        return Ok(());
    }

    let store =
        JsonPlantStore::new(path.unwrap_or_else(|| config.data_dir.join(PLANTS_FILE_NAME)));
    store.save(&plants).map_err(|error| error.to_string())?;

    println!("wrote {} plants to {}", plants.len(), store.path().display());
    println!("set \"active\": true for every plant that should receive the daily report");
    Ok(())
}

fn print_help() {
    println!("plants_init");
    println!();
    println!("Usage:");
    println!("  cargo run --bin plants_init -- [--list] [--path <file>]");
    println!();
    println!("Options:");
    println!("  --list          print plants from the monitoring API without writing");
    println!("  --path <file>   target plants file (default: $DATA_DIR/plants.json)");
}
