pub mod bills;
pub mod init;
pub mod networks;
pub mod quarters;
pub mod status;

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;
use rust_decimal::Decimal;

use crate::bills::BillStore;
use crate::error::{BillError, Result};
use crate::models::BillStatus;
use crate::notify::RegistryObserver;
use crate::quarters::SeedPattern;
use crate::query::SortOrder;
use crate::registry::NetworkRegistry;
use crate::settings::get_db_path;
use crate::storage::SqliteStorage;

/// The bill store and network registry for one process run.
pub struct Services {
    pub bills: BillStore,
    pub networks: NetworkRegistry,
}

struct ChangeLog;

impl RegistryObserver for ChangeLog {
    fn on_networks_changed(&self) -> anyhow::Result<()> {
        info!("Network list changed");
        Ok(())
    }

    fn on_vendors_changed(&self, network: &str) -> anyhow::Result<()> {
        info!("Vendors changed for {network}");
        Ok(())
    }
}

pub(crate) fn open_services() -> Result<Services> {
    let db_path = get_db_path();
    if !db_path.exists() {
        return Err(BillError::Other(
            "Database not found. Run `billbook init` to set up.".to_string(),
        ));
    }
    let storage = SqliteStorage::open(&db_path)?;
    let networks = NetworkRegistry::open(storage.clone())?;
    networks.subscribe(Arc::new(ChangeLog));
    let bills = BillStore::open(storage)?;
    Ok(Services { bills, networks })
}

#[derive(Parser)]
#[command(name = "billbook", about = "Track recurring network service bills by vendor and quarter.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory, create the database and seed default networks.
    Init {
        /// Path for billbook data (default: ~/Documents/billbook)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Do not install the default network list
        #[arg(long)]
        empty: bool,
    },
    /// Show the current database and record counts.
    Status,
    /// Manage bill records.
    Bills {
        #[command(subcommand)]
        command: BillsCommands,
    },
    /// Manage networks.
    Networks {
        #[command(subcommand)]
        command: NetworksCommands,
    },
    /// Manage the vendors of a network.
    Vendors {
        #[command(subcommand)]
        command: VendorsCommands,
    },
    /// Inspect and configure a network's quarter calendar.
    Quarters {
        #[command(subcommand)]
        command: QuartersCommands,
    },
}

/// Bill fields shared by `bills add` and `bills update`.
#[derive(Args, Default)]
pub struct BillFields {
    #[arg(long)]
    pub network: Option<String>,
    #[arg(long)]
    pub vendor: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// Invoice number
    #[arg(long)]
    pub invoice: Option<String>,
    /// Bill amount before GST; the taxed amount is derived
    #[arg(long)]
    pub amount: Option<Decimal>,
    #[arg(long)]
    pub ses1: Option<String>,
    #[arg(long)]
    pub ses2: Option<String>,
    /// Quarter number from the network's calendar; fills period and dates
    #[arg(long)]
    pub quarter: Option<u32>,
    /// Billing period label, e.g. 'Q1 (Oct-Mar)'
    #[arg(long)]
    pub period: Option<String>,
    /// Start date: YYYY-MM-DD
    #[arg(long = "from")]
    pub from_date: Option<NaiveDate>,
    /// End date: YYYY-MM-DD
    #[arg(long = "to")]
    pub to_date: Option<NaiveDate>,
    /// pending or completed
    #[arg(long)]
    pub status: Option<BillStatus>,
    #[arg(long)]
    pub remarks: Option<String>,
    #[arg(long = "gl-code")]
    pub gl_code: Option<String>,
    #[arg(long = "commit-item")]
    pub commit_item: Option<String>,
    #[arg(long = "cost-center")]
    pub cost_center: Option<String>,
    /// Reference to an externally stored invoice document
    #[arg(long)]
    pub attachment: Option<String>,
}

#[derive(Subcommand)]
pub enum BillsCommands {
    /// Add a bill record.
    Add {
        #[command(flatten)]
        fields: BillFields,
    },
    /// List bill records with optional filters and sorting.
    List {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        quarter: Option<u32>,
        #[arg(long)]
        network: Option<String>,
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long = "cost-center")]
        cost_center: Option<String>,
        #[arg(long = "gl-code")]
        gl_code: Option<String>,
        #[arg(long = "commit-item")]
        commit_item: Option<String>,
        /// Case-insensitive text or amount search
        #[arg(long)]
        search: Option<String>,
        /// serial, location-asc, location-desc, amount-asc, amount-desc,
        /// completed-first, pending-first, newest, oldest
        #[arg(long, default_value = "serial")]
        sort: SortOrder,
    },
    /// Show one bill record.
    Show {
        /// Serial number (shown in `billbook bills list`)
        serial: u32,
    },
    /// Update fields of a bill record.
    Update {
        /// Serial number (shown in `billbook bills list`)
        serial: u32,
        #[command(flatten)]
        fields: BillFields,
    },
    /// Delete a bill record. Later serial numbers shift down by one.
    Delete {
        /// Serial number (shown in `billbook bills list`)
        serial: u32,
    },
    /// Totals by network and quarter.
    Summary,
}

#[derive(Subcommand)]
pub enum NetworksCommands {
    /// Register a network.
    Add {
        name: String,
        /// Vendor name (repeatable)
        #[arg(long = "vendor")]
        vendors: Vec<String>,
        /// Quarter layout: calendar, fiscal-halves, fiscal-quarters
        #[arg(long, default_value = "calendar")]
        pattern: SeedPattern,
    },
    /// Rename a network.
    Rename { old: String, new: String },
    /// Delete a network with its vendors and quarter calendar.
    Delete { name: String },
    /// List networks.
    List,
}

#[derive(Subcommand)]
pub enum VendorsCommands {
    /// Add a vendor to a network.
    Add { network: String, vendor: String },
    /// Rename a vendor within a network.
    Rename {
        network: String,
        old: String,
        new: String,
    },
    /// Remove a vendor from a network.
    Delete { network: String, vendor: String },
    /// List a network's vendors.
    List { network: String },
}

#[derive(Subcommand)]
pub enum QuartersCommands {
    /// Show a network's quarter calendar.
    Show { network: String },
    /// Replace a network's quarter calendar.
    Set {
        network: String,
        /// Named layout: calendar, fiscal-halves, fiscal-quarters
        #[arg(long, conflicts_with_all = ["count", "start", "periods"])]
        pattern: Option<SeedPattern>,
        /// One period as '<label>:<start>-<end>', e.g. 'Monsoon:Jun-Sep'
        /// (repeatable, numbered in the order given)
        #[arg(long = "period", conflicts_with_all = ["count", "start"])]
        periods: Vec<String>,
        /// Number of equal periods (must divide 12)
        #[arg(long)]
        count: Option<u32>,
        /// First month of the first period, 1-12 (default: 1)
        #[arg(long)]
        start: Option<u32>,
    },
    /// Resolve a quarter to concrete dates.
    Dates {
        network: String,
        quarter: u32,
        /// Reference date: YYYY-MM-DD (default: today)
        #[arg(long)]
        on: Option<NaiveDate>,
    },
}
