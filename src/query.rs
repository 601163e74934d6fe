use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::models::{BillRecord, BillStatus};

/// Filters over bill records. `None` (or a blank string) means "no
/// constraint"; everything present must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillFilter {
    pub year: Option<i32>,
    pub quarter_number: Option<u32>,
    pub network: Option<String>,
    pub vendor: Option<String>,
    pub cost_center: Option<String>,
    pub gl_code: Option<String>,
    pub commit_item: Option<String>,
    pub search: Option<String>,
}

fn constraint(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn field_matches(wanted: &Option<String>, actual: &str) -> bool {
    constraint(wanted).map_or(true, |w| w == actual)
}

impl BillFilter {
    pub fn matches(&self, record: &BillRecord) -> bool {
        self.year.map_or(true, |y| record.year == Some(y))
            && self
                .quarter_number
                .map_or(true, |q| record.quarter_number == Some(q))
            && field_matches(&self.network, &record.network)
            && field_matches(&self.vendor, &record.vendor)
            && field_matches(&self.cost_center, &record.cost_center)
            && field_matches(&self.gl_code, &record.gl_code)
            && field_matches(&self.commit_item, &record.commit_item)
            && constraint(&self.search).map_or(true, |s| search_matches(record, s))
    }
}

/// Case-insensitive containment over the text fields, plus the two-decimal
/// rendering of both amounts.
fn search_matches(record: &BillRecord, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let texts = [
        record.location.as_str(),
        record.invoice_number.as_str(),
        record.status.as_str(),
        record.remarks.as_str(),
        record.network.as_str(),
        record.vendor.as_str(),
    ];
    texts.iter().any(|t| t.to_lowercase().contains(&needle))
        || format!("{:.2}", record.amount_with_tax).contains(&needle)
        || format!("{:.2}", record.amount_without_tax).contains(&needle)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Serial,
    LocationAsc,
    LocationDesc,
    AmountAsc,
    AmountDesc,
    CompletedFirst,
    PendingFirst,
    NewestFirst,
    OldestFirst,
}

const SORT_NAMES: &[(SortOrder, &str)] = &[
    (SortOrder::Serial, "serial"),
    (SortOrder::LocationAsc, "location-asc"),
    (SortOrder::LocationDesc, "location-desc"),
    (SortOrder::AmountAsc, "amount-asc"),
    (SortOrder::AmountDesc, "amount-desc"),
    (SortOrder::CompletedFirst, "completed-first"),
    (SortOrder::PendingFirst, "pending-first"),
    (SortOrder::NewestFirst, "newest"),
    (SortOrder::OldestFirst, "oldest"),
];

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = SORT_NAMES
            .iter()
            .find(|(order, _)| order == self)
            .map_or("serial", |(_, name)| *name);
        f.write_str(name)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SORT_NAMES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(order, _)| *order)
            .ok_or_else(|| {
                let names: Vec<&str> = SORT_NAMES.iter().map(|(_, n)| *n).collect();
                format!("unknown sort '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

fn status_rank(status: BillStatus, first: BillStatus) -> u8 {
    if status == first {
        0
    } else {
        1
    }
}

/// Compare optional dates with missing values last regardless of direction.
fn cmp_dates_missing_last<T: Ord>(a: &Option<T>, b: &Option<T>, newest_first: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if newest_first => b.cmp(a),
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl SortOrder {
    pub fn compare(self, a: &BillRecord, b: &BillRecord) -> Ordering {
        match self {
            SortOrder::Serial => a.serial_no.cmp(&b.serial_no),
            SortOrder::LocationAsc => a.location.to_lowercase().cmp(&b.location.to_lowercase()),
            SortOrder::LocationDesc => b.location.to_lowercase().cmp(&a.location.to_lowercase()),
            SortOrder::AmountAsc => a.amount_with_tax.cmp(&b.amount_with_tax),
            SortOrder::AmountDesc => b.amount_with_tax.cmp(&a.amount_with_tax),
            SortOrder::CompletedFirst => status_rank(a.status, BillStatus::Completed)
                .cmp(&status_rank(b.status, BillStatus::Completed))
                .then_with(|| a.status.as_str().cmp(b.status.as_str())),
            SortOrder::PendingFirst => status_rank(a.status, BillStatus::Pending)
                .cmp(&status_rank(b.status, BillStatus::Pending))
                .then_with(|| a.status.as_str().cmp(b.status.as_str())),
            SortOrder::NewestFirst => cmp_dates_missing_last(&a.from_date, &b.from_date, true),
            SortOrder::OldestFirst => cmp_dates_missing_last(&a.from_date, &b.from_date, false),
        }
    }
}

/// Filter then stable-sort a snapshot of records.
pub fn apply(records: &[BillRecord], filter: &BillFilter, sort: SortOrder) -> Vec<BillRecord> {
    let mut rows: Vec<BillRecord> = records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();
    rows.sort_by(|a, b| sort.compare(a, b));
    rows
}
