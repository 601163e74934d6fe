use std::path::PathBuf;

use crate::error::Result;
use crate::registry::NetworkRegistry;
use crate::settings::{load_settings, save_settings, shellexpand_path, DB_FILE};
use crate::storage::SqliteStorage;

pub fn run(data_dir: Option<String>, empty: bool) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let storage = SqliteStorage::open(&resolved.join(DB_FILE))?;
    let registry = NetworkRegistry::open(storage)?;
    if !empty && registry.seed_defaults()? {
        println!(
            "Added default networks: {}",
            registry.get_all_networks().join(", ")
        );
    }

    println!("Initialized billbook at {}", resolved.display());
    Ok(())
}
