use chrono::Local;
use comfy_table::{Cell, Table};

use crate::cli::open_services;
use crate::error::{BillError, Result};
use crate::fmt::date;
use crate::quarters::{QuarterConfig, QuarterDefinition, SeedPattern};

pub fn show(network: &str) -> Result<()> {
    let services = open_services()?;
    let config = services
        .networks
        .get_quarter_configuration(network)
        .ok_or_else(|| BillError::Other(format!("Unknown network: {network}")))?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Label", "Months", "Crosses year"]);
    for q in config.quarters() {
        table.add_row(vec![
            Cell::new(q.number()),
            Cell::new(q.label()),
            Cell::new(q.month_range()),
            Cell::new(if q.crosses_year() { "yes" } else { "" }),
        ]);
    }
    println!("{network}\n{table}");
    Ok(())
}

/// Build a calendar from `--period` specs, numbered 1..K in order.
fn custom_config(periods: &[String]) -> Result<QuarterConfig> {
    let quarters = periods
        .iter()
        .enumerate()
        .map(|(i, spec)| QuarterDefinition::parse(i as u32 + 1, spec))
        .collect::<Result<Vec<_>>>()?;
    QuarterConfig::new(quarters)
}

pub fn set(
    network: &str,
    pattern: Option<SeedPattern>,
    periods: &[String],
    count: Option<u32>,
    start: Option<u32>,
) -> Result<()> {
    let config = match (pattern, count) {
        (Some(pattern), _) => pattern.config(),
        (None, _) if !periods.is_empty() => custom_config(periods)?,
        (None, Some(count)) => QuarterConfig::evenly_divided(count, start.unwrap_or(1))?,
        (None, None) => {
            return Err(BillError::Other(
                "Pass --pattern, one or more --period, or --count with an optional --start"
                    .to_string(),
            ))
        }
    };

    let services = open_services()?;
    let labels = config.labels();
    if !services.networks.set_quarter_configuration(network, config)? {
        return Err(BillError::Other(format!("Unknown network: {network}")));
    }
    println!("{network} quarters: {}", labels.join(", "));
    Ok(())
}

pub fn dates(network: &str, quarter: u32, on: Option<chrono::NaiveDate>) -> Result<()> {
    let services = open_services()?;
    if !services.networks.network_exists(network) {
        return Err(BillError::Other(format!("Unknown network: {network}")));
    }
    let period = services
        .networks
        .get_quarter_period(network, quarter)
        .ok_or_else(|| BillError::Other(format!("{network} has no quarter {quarter}")))?;
    let reference = on.unwrap_or_else(|| Local::now().date_naive());
    let (from, to) = period.resolve_date_range(reference)?;
    println!(
        "{}: {} to {}",
        period.label(),
        date(Some(from)),
        date(Some(to))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_custom_config_allows_uneven_periods() {
        let config = custom_config(&specs(&[
            "Winter:Jan-Feb",
            "Spring:Mar-May",
            "Summer:Jun-Jul",
            "Monsoon:Aug-Sep",
            "Autumn:Oct-Dec",
        ]))
        .unwrap();
        assert_eq!(config.len(), 5);
        assert_eq!(config.get(4).unwrap().label(), "Monsoon");
        assert_eq!(config.get(5).unwrap().month_range(), "Oct-Dec");
    }

    #[test]
    fn test_custom_config_rejects_bad_spec() {
        assert!(custom_config(&specs(&["Winter:Jan-Feb", "Spring"])).is_err());
        assert!(custom_config(&[]).is_err());
    }
}
