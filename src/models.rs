use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// GST applied on top of the pre-tax bill amount: 18%.
pub fn tax_rate() -> Decimal {
    Decimal::new(18, 2)
}

pub const GL_CODES: &[&str] = &[
    "5261300020",
    "5281525560",
    "5290700080",
    "5290700020",
    "5290700160",
];

pub const COMMIT_ITEMS: &[&str] = &["C_COMMEXP", "C_R&MEQPC"];

pub const COST_CENTERS: &[&str] = &["M75010-SRO", "M78010-TNSO"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillStatus {
    #[default]
    Pending,
    Completed,
}

impl BillStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BillStatus::Pending => "Pending",
            BillStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(BillStatus::Pending),
            "completed" => Ok(BillStatus::Completed),
            other => Err(format!("unknown status '{other}' (expected pending or completed)")),
        }
    }
}

/// One billing line item.
///
/// `serial_no` is a display position, not an identity: the store keeps the
/// serial numbers dense (`1..=N`) and renumbers every surviving record after
/// a delete. Anything held outside the store must not treat a serial number
/// as a durable key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    pub serial_no: u32,
    pub network: String,
    pub vendor: String,
    pub location: String,
    pub invoice_number: String,
    pub amount_with_tax: Decimal,
    pub amount_without_tax: Decimal,
    /// Kept as text: SES numbers can be wider than 64 bits.
    pub ses_1: String,
    pub ses_2: String,
    pub billing_period_label: String,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub status: BillStatus,
    pub remarks: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub quarter_number: Option<u32>,
    #[serde(default)]
    pub quarter_label: String,
    pub gl_code: String,
    pub commit_item: String,
    pub cost_center: String,
    #[serde(default)]
    pub attachment_ref: Option<String>,
}

impl BillRecord {
    /// Start a draft for `network`/`vendor` with both amounts derived from
    /// the pre-tax figure.
    pub fn new(network: &str, vendor: &str, amount_without_tax: Decimal) -> Self {
        let mut record = BillRecord {
            network: network.to_string(),
            vendor: vendor.to_string(),
            ..Default::default()
        };
        record.set_amount_without_tax(amount_without_tax);
        record
    }

    pub fn set_amount_without_tax(&mut self, amount: Decimal) {
        self.amount_without_tax = amount;
        self.amount_with_tax = with_tax(amount);
    }
}

/// `amount * 1.18`, rounded half away from zero to paise.
pub fn with_tax(amount: Decimal) -> Decimal {
    (amount * (Decimal::ONE + tax_rate()))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_applies_tax() {
        let record = BillRecord::new("P2P", "TATA COMMUNICATIONS LTD", Decimal::new(100000, 0));
        assert_eq!(record.amount_with_tax, Decimal::new(11800000, 2));
        assert_eq!(record.serial_no, 0);
        assert_eq!(record.status, BillStatus::Pending);
    }

    #[test]
    fn test_tax_rounds_to_two_places() {
        // 10.25 * 1.18 = 12.095
        assert_eq!(with_tax(Decimal::new(1025, 2)), Decimal::new(1210, 2));
        // 0.01 * 1.18 = 0.0118
        assert_eq!(with_tax(Decimal::new(1, 2)), Decimal::new(1, 2));
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("Completed".parse::<BillStatus>(), Ok(BillStatus::Completed));
        assert_eq!(" pending ".parse::<BillStatus>(), Ok(BillStatus::Pending));
        assert!("paid".parse::<BillStatus>().is_err());
        assert_eq!(BillStatus::Completed.to_string(), "Completed");
    }

    #[test]
    fn test_legacy_json_without_derived_fields() {
        let json = r#"{
            "serial_no": 4, "network": "BSNL", "vendor": "BSNL Vendor",
            "location": "Chennai DO", "invoice_number": "INV-1",
            "amount_with_tax": "118.00", "amount_without_tax": "100.00",
            "ses_1": "123456789012345678901234567890", "ses_2": "",
            "billing_period_label": "Quarter 2 (Apr-Sep)",
            "from_date": "2024-04-01", "to_date": "2024-09-30",
            "status": "Completed", "remarks": "",
            "gl_code": "5261300020", "commit_item": "C_COMMEXP", "cost_center": "M75010-SRO"
        }"#;
        let record: BillRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.year, None);
        assert_eq!(record.quarter_number, None);
        assert_eq!(record.ses_1.len(), 30);
        assert!(record.attachment_ref.is_none());
    }
}
