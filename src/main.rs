mod bills;
mod cli;
mod db;
mod error;
mod fmt;
mod models;
mod notify;
mod quarters;
mod query;
mod registry;
mod settings;
mod storage;

use clap::Parser;

use cli::{BillsCommands, Cli, Commands, NetworksCommands, QuartersCommands, VendorsCommands};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, empty } => cli::init::run(data_dir, empty),
        Commands::Status => cli::status::run(),
        Commands::Bills { command } => match command {
            BillsCommands::Add { fields } => cli::bills::add(fields),
            BillsCommands::List {
                year,
                quarter,
                network,
                vendor,
                cost_center,
                gl_code,
                commit_item,
                search,
                sort,
            } => cli::bills::list(
                year,
                quarter,
                network,
                vendor,
                cost_center,
                gl_code,
                commit_item,
                search,
                sort,
            ),
            BillsCommands::Show { serial } => cli::bills::show(serial),
            BillsCommands::Update { serial, fields } => cli::bills::update(serial, fields),
            BillsCommands::Delete { serial } => cli::bills::delete(serial),
            BillsCommands::Summary => cli::bills::summary(),
        },
        Commands::Networks { command } => match command {
            NetworksCommands::Add {
                name,
                vendors,
                pattern,
            } => cli::networks::add(&name, &vendors, pattern),
            NetworksCommands::Rename { old, new } => cli::networks::rename(&old, &new),
            NetworksCommands::Delete { name } => cli::networks::delete(&name),
            NetworksCommands::List => cli::networks::list(),
        },
        Commands::Vendors { command } => match command {
            VendorsCommands::Add { network, vendor } => cli::networks::add_vendor(&network, &vendor),
            VendorsCommands::Rename { network, old, new } => {
                cli::networks::rename_vendor(&network, &old, &new)
            }
            VendorsCommands::Delete { network, vendor } => {
                cli::networks::delete_vendor(&network, &vendor)
            }
            VendorsCommands::List { network } => cli::networks::list_vendors(&network),
        },
        Commands::Quarters { command } => match command {
            QuartersCommands::Show { network } => cli::quarters::show(&network),
            QuartersCommands::Set {
                network,
                pattern,
                periods,
                count,
                start,
            } => cli::quarters::set(&network, pattern, &periods, count, start),
            QuartersCommands::Dates {
                network,
                quarter,
                on,
            } => cli::quarters::dates(&network, quarter, on),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
