use comfy_table::{Cell, Table};

use crate::cli::open_services;
use crate::error::{BillError, Result};
use crate::quarters::SeedPattern;

pub fn add(name: &str, vendors: &[String], pattern: SeedPattern) -> Result<()> {
    let services = open_services()?;
    if !services.networks.add_network(name, vendors, pattern)? {
        return Err(BillError::Other(format!(
            "Network '{name}' already exists or the name is blank"
        )));
    }
    println!("Added network: {}", name.trim());
    Ok(())
}

pub fn rename(old: &str, new: &str) -> Result<()> {
    let services = open_services()?;
    if !services.networks.rename_network(old, new)? {
        return Err(BillError::Other(format!(
            "Cannot rename '{old}' to '{new}': unknown network or name taken"
        )));
    }
    println!("Renamed network: {old} -> {}", new.trim());
    Ok(())
}

pub fn delete(name: &str) -> Result<()> {
    let services = open_services()?;
    if !services.networks.delete_network(name)? {
        return Err(BillError::Other(format!("Unknown network: {name}")));
    }
    println!("Deleted network: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let services = open_services()?;
    let names = services.networks.get_all_networks();
    if names.is_empty() {
        println!("No networks. Add one with `billbook networks add`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Network", "Vendors", "Quarters"]);
    for name in &names {
        let Some(network) = services.networks.get_network(name) else {
            continue;
        };
        let quarters = network
            .quarters
            .quarters()
            .iter()
            .map(|q| q.month_range())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(name),
            Cell::new(network.vendors.len()),
            Cell::new(quarters),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn add_vendor(network: &str, vendor: &str) -> Result<()> {
    let services = open_services()?;
    if !services.networks.network_exists(network) {
        return Err(BillError::Other(format!("Unknown network: {network}")));
    }
    if !services.networks.add_vendor(network, vendor)? {
        return Err(BillError::Other(format!(
            "Vendor '{vendor}' already exists in {network} or the name is blank"
        )));
    }
    println!("Added vendor {} to {network}", vendor.trim());
    Ok(())
}

pub fn rename_vendor(network: &str, old: &str, new: &str) -> Result<()> {
    let services = open_services()?;
    if !services.networks.rename_vendor(network, old, new)? {
        return Err(BillError::Other(format!(
            "Cannot rename vendor '{old}' in {network} to '{new}'"
        )));
    }
    println!("Renamed vendor in {network}: {old} -> {}", new.trim());
    Ok(())
}

pub fn delete_vendor(network: &str, vendor: &str) -> Result<()> {
    let services = open_services()?;
    if !services.networks.delete_vendor(network, vendor)? {
        return Err(BillError::Other(format!(
            "Vendor '{vendor}' is not registered for {network}"
        )));
    }
    println!("Removed vendor {vendor} from {network}");
    Ok(())
}

pub fn list_vendors(network: &str) -> Result<()> {
    let services = open_services()?;
    if !services.networks.network_exists(network) {
        return Err(BillError::Other(format!("Unknown network: {network}")));
    }
    let vendors = services.networks.get_vendors(network);
    if vendors.is_empty() {
        println!("{network} has no vendors.");
        return Ok(());
    }
    for vendor in vendors {
        println!("{vendor}");
    }
    Ok(())
}
