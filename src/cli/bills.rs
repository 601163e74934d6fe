use chrono::{Datelike, Local, NaiveDate};
use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cli::{open_services, BillFields};
use crate::error::{BillError, Result};
use crate::fmt::{date, money};
use crate::models::{BillRecord, BillStatus, COMMIT_ITEMS, COST_CENTERS, GL_CODES};
use crate::quarters::quarter_number_from_label;
use crate::query::{BillFilter, SortOrder};
use crate::registry::NetworkRegistry;

fn check_vocabulary(kind: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(BillError::Other(format!(
            "Unknown {kind} '{value}' (expected one of: {})",
            allowed.join(", ")
        )))
    }
}

/// Copy the supplied fields onto `record`, consulting the registry for the
/// network/vendor pairing and the quarter calendar.
fn apply_fields(
    record: &mut BillRecord,
    fields: BillFields,
    registry: &NetworkRegistry,
    today: NaiveDate,
) -> Result<()> {
    // Bills keep the names they were filed under after a network or vendor
    // is renamed or removed, so the pairing is only checked when it changes.
    let pairing_changed = fields.network.is_some() || fields.vendor.is_some();
    if let Some(network) = fields.network {
        record.network = network;
    }
    if let Some(vendor) = fields.vendor {
        record.vendor = vendor;
    }
    if pairing_changed {
        if !registry.network_exists(&record.network) {
            return Err(BillError::Other(format!("Unknown network: {}", record.network)));
        }
        if !registry.vendor_exists_in_network(&record.network, &record.vendor) {
            return Err(BillError::Other(format!(
                "Vendor '{}' is not registered for {}",
                record.vendor, record.network
            )));
        }
    }

    if let Some(location) = fields.location {
        record.location = location;
    }
    if let Some(invoice) = fields.invoice {
        record.invoice_number = invoice;
    }
    if let Some(amount) = fields.amount {
        if amount.is_sign_negative() {
            return Err(BillError::Other("Amount cannot be negative".to_string()));
        }
        record.set_amount_without_tax(amount);
    }
    if let Some(ses) = fields.ses1 {
        record.ses_1 = ses;
    }
    if let Some(ses) = fields.ses2 {
        record.ses_2 = ses;
    }

    if let Some(number) = fields.quarter {
        let period = registry
            .get_quarter_period(&record.network, number)
            .ok_or_else(|| {
                BillError::Other(format!("{} has no quarter {number}", record.network))
            })?;
        let (from, to) = period.resolve_date_range(today)?;
        record.billing_period_label = period.label().to_string();
        record.quarter_number = Some(number);
        record.from_date = Some(from);
        record.to_date = Some(to);
    } else if let Some(label) = fields.period {
        record.quarter_number = quarter_number_from_label(&label);
        record.billing_period_label = label;
    }
    if let Some(from) = fields.from_date {
        record.from_date = Some(from);
    }
    if let Some(to) = fields.to_date {
        record.to_date = Some(to);
    }
    if let (Some(from), Some(to)) = (record.from_date, record.to_date) {
        if from > to {
            return Err(BillError::Other(format!("--from {from} is after --to {to}")));
        }
    }
    if let Some(from) = record.from_date {
        record.year = Some(from.year());
    }
    record.quarter_label = match (record.year, record.quarter_number) {
        (Some(year), Some(quarter)) => format!("Q{quarter}-{year}"),
        _ => String::new(),
    };

    if let Some(status) = fields.status {
        record.status = status;
    }
    if let Some(remarks) = fields.remarks {
        record.remarks = remarks;
    }
    if let Some(gl_code) = fields.gl_code {
        check_vocabulary("GL code", &gl_code, GL_CODES)?;
        record.gl_code = gl_code;
    }
    if let Some(item) = fields.commit_item {
        check_vocabulary("commit item", &item, COMMIT_ITEMS)?;
        record.commit_item = item;
    }
    if let Some(center) = fields.cost_center {
        check_vocabulary("cost center", &center, COST_CENTERS)?;
        record.cost_center = center;
    }
    if let Some(attachment) = fields.attachment {
        record.attachment_ref = Some(attachment).filter(|a| !a.trim().is_empty());
    }
    Ok(())
}

pub fn add(fields: BillFields) -> Result<()> {
    let services = open_services()?;
    let network = fields.network.clone().or_else(|| {
        fields
            .vendor
            .as_deref()
            .and_then(|v| services.networks.network_for_vendor(v))
    });
    let (Some(network), Some(vendor), Some(amount)) =
        (network, fields.vendor.clone(), fields.amount)
    else {
        return Err(BillError::Other(
            "--vendor and --amount are required, and --network unless the vendor identifies it".to_string(),
        ));
    };

    let mut record = BillRecord::new(&network, &vendor, amount);
    apply_fields(&mut record, fields, &services.networks, Local::now().date_naive())?;
    let serial = services.bills.add_record(record)?;
    println!("Added bill #{serial}");
    Ok(())
}

pub fn update(serial: u32, fields: BillFields) -> Result<()> {
    let services = open_services()?;
    let mut record = services
        .bills
        .get_by_serial(serial)
        .ok_or_else(|| BillError::Other(format!("No bill with serial {serial}")))?;
    apply_fields(&mut record, fields, &services.networks, Local::now().date_naive())?;
    if !services.bills.update_record(serial, record)? {
        return Err(BillError::Other(format!("No bill with serial {serial}")));
    }
    println!("Updated bill #{serial}");
    Ok(())
}

pub fn delete(serial: u32) -> Result<()> {
    let services = open_services()?;
    let invoice = services.bills.get_by_serial(serial).map(|r| r.invoice_number);
    if !services.bills.delete_record(serial)? {
        return Err(BillError::Other(format!("No bill with serial {serial}")));
    }
    println!(
        "Deleted bill #{serial} ({}). Remaining bills renumbered 1-{}.",
        invoice.unwrap_or_default(),
        services.bills.len()
    );
    Ok(())
}

fn status_cell(status: BillStatus) -> Cell {
    match status {
        BillStatus::Completed => Cell::new(status.as_str().green()),
        BillStatus::Pending => Cell::new(status.as_str().yellow()),
    }
}

fn period_text(record: &BillRecord) -> String {
    match (record.from_date, record.to_date) {
        (Some(_), Some(_)) => format!(
            "{}\n{} to {}",
            record.billing_period_label,
            date(record.from_date),
            date(record.to_date)
        ),
        _ => record.billing_period_label.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn list(
    year: Option<i32>,
    quarter: Option<u32>,
    network: Option<String>,
    vendor: Option<String>,
    cost_center: Option<String>,
    gl_code: Option<String>,
    commit_item: Option<String>,
    search: Option<String>,
    sort: SortOrder,
) -> Result<()> {
    let services = open_services()?;
    let filter = BillFilter {
        year,
        quarter_number: quarter,
        network,
        vendor,
        cost_center,
        gl_code,
        commit_item,
        search,
    };
    let rows = services.bills.query(&filter, sort);
    if rows.is_empty() {
        println!("No bills found for the selected filters.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "#", "Network", "Vendor", "Location", "Invoice", "With Tax", "Without Tax", "SES 1",
        "SES 2", "Period", "Status", "GL Code", "Commit Item", "Cost Center", "Remarks",
    ]);
    for r in &rows {
        table.add_row(vec![
            Cell::new(r.serial_no),
            Cell::new(&r.network),
            Cell::new(&r.vendor),
            Cell::new(&r.location),
            Cell::new(&r.invoice_number),
            Cell::new(money(r.amount_with_tax)),
            Cell::new(money(r.amount_without_tax)),
            Cell::new(&r.ses_1),
            Cell::new(&r.ses_2),
            Cell::new(period_text(r)),
            status_cell(r.status),
            Cell::new(&r.gl_code),
            Cell::new(&r.commit_item),
            Cell::new(&r.cost_center),
            Cell::new(&r.remarks),
        ]);
    }
    let total: Decimal = rows.iter().map(|r| r.amount_with_tax).sum();
    println!("Bills (sorted by {sort})\n{table}");
    println!("{} bills, {} with tax", rows.len(), money(total));
    Ok(())
}

pub fn show(serial: u32) -> Result<()> {
    let services = open_services()?;
    let r = services
        .bills
        .get_by_serial(serial)
        .ok_or_else(|| BillError::Other(format!("No bill with serial {serial}")))?;

    let mut table = Table::new();
    let rows: Vec<(&str, String)> = vec![
        ("Serial", r.serial_no.to_string()),
        ("Network", r.network.clone()),
        ("Vendor", r.vendor.clone()),
        ("Location", r.location.clone()),
        ("Invoice", r.invoice_number.clone()),
        ("Amount (with tax)", money(r.amount_with_tax)),
        ("Amount (without tax)", money(r.amount_without_tax)),
        ("SES 1", r.ses_1.clone()),
        ("SES 2", r.ses_2.clone()),
        ("Billing period", r.billing_period_label.clone()),
        ("From", date(r.from_date)),
        ("To", date(r.to_date)),
        ("Year", r.year.map(|y| y.to_string()).unwrap_or_default()),
        ("Quarter", r.quarter_label.clone()),
        ("Status", r.status.to_string()),
        ("GL code", r.gl_code.clone()),
        ("Commit item", r.commit_item.clone()),
        ("Cost center", r.cost_center.clone()),
        ("Remarks", r.remarks.clone()),
        ("Attachment", r.attachment_ref.clone().unwrap_or_default()),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    println!("{table}");
    Ok(())
}

pub fn summary() -> Result<()> {
    let services = open_services()?;
    let summary = services.bills.summary();

    println!("Total bills:   {}", summary.total_bills);
    println!("Total amount:  {}", money(summary.total_amount));

    let mut by_network = Table::new();
    by_network.set_header(vec!["Network", "Bills"]);
    for (network, count) in &summary.by_network {
        by_network.add_row(vec![Cell::new(network), Cell::new(count)]);
    }
    println!("\nBy network\n{by_network}");

    let mut by_quarter = Table::new();
    by_quarter.set_header(vec!["Quarter", "Bills"]);
    for (quarter, count) in &summary.by_quarter {
        by_quarter.add_row(vec![Cell::new(quarter), Cell::new(count)]);
    }
    println!("\nBy quarter\n{by_quarter}");
    Ok(())
}
