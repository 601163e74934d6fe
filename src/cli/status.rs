use crate::cli::open_services;
use crate::error::Result;
use crate::models::BillStatus;
use crate::settings::{get_db_path, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = get_db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `billbook init` to set up.");
        return Ok(());
    }

    let services = open_services()?;
    let networks = services.networks.get_all_networks();
    let pending = services
        .bills
        .get_all()
        .iter()
        .filter(|r| r.status == BillStatus::Pending)
        .count();

    println!();
    println!("Bills:      {}", services.bills.len());
    println!("Pending:    {pending}");
    println!("Networks:   {}", networks.len());
    println!("Vendors:    {}", services.networks.all_vendors().len());

    let years = services.bills.available_years();
    if !years.is_empty() {
        let years: Vec<String> = years.iter().map(i32::to_string).collect();
        println!("Years:      {}", years.join(", "));
    }
    let billed = services.bills.available_networks();
    if !billed.is_empty() {
        println!("Billed:     {}", billed.join(", "));
    }
    let items = services.bills.available_commit_items();
    if !items.is_empty() {
        println!("Commit items: {}", items.join(", "));
    }
    Ok(())
}
