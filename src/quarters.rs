use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BillError, Result};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const MAX_QUARTERS: usize = 12;

lazy_static! {
    static ref QUARTER_LABEL_REGEX: Regex = Regex::new(r"(?i)\b(?:q|quarter\s*)(\d{1,2})\b")
        .expect("QUARTER_LABEL_REGEX should be valid");
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get((month as usize).wrapping_sub(1))
        .copied()
        .unwrap_or("?")
}

/// Month number from `"10"`, `"Oct"` or `"october"`.
pub fn month_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Ok(month) = text.parse::<u32>() {
        return (1..=12).contains(&month).then_some(month);
    }
    let prefix = text.get(..3)?.to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| name.to_lowercase() == prefix)
        .map(|i| i as u32 + 1)
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// One recurring billing period inside a network's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterDefinition {
    number: u32,
    label: String,
    start_month: u32,
    end_month: u32,
}

impl QuarterDefinition {
    pub fn new(number: u32, label: &str, start_month: u32, end_month: u32) -> Result<Self> {
        let label = label.trim();
        if label.is_empty() {
            return Err(BillError::InvalidQuarter(format!(
                "quarter {number} has an empty label"
            )));
        }
        for month in [start_month, end_month] {
            if !(1..=12).contains(&month) {
                return Err(BillError::InvalidQuarter(format!(
                    "quarter {number}: month {month} is outside 1-12"
                )));
            }
        }
        Ok(Self {
            number,
            label: label.to_string(),
            start_month,
            end_month,
        })
    }

    /// Parse `"<label>:<start>-<end>"`, e.g. `"Monsoon:Jun-Sep"` or
    /// `"Q1:10-3"`, as quarter `number`.
    pub fn parse(number: u32, text: &str) -> Result<Self> {
        let invalid = || {
            BillError::InvalidQuarter(format!(
                "'{text}' is not '<label>:<start>-<end>'"
            ))
        };
        let (label, months) = text.rsplit_once(':').ok_or_else(invalid)?;
        let (start, end) = months.split_once('-').ok_or_else(invalid)?;
        let start = month_number(start).ok_or_else(invalid)?;
        let end = month_number(end).ok_or_else(invalid)?;
        Self::new(number, label.trim(), start, end)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn end_month(&self) -> u32 {
        self.end_month
    }

    /// True for periods such as Oct-Mar that span a calendar-year boundary.
    pub fn crosses_year(&self) -> bool {
        self.start_month > self.end_month
    }

    /// Short month span, e.g. `Oct-Mar`.
    pub fn month_range(&self) -> String {
        format!("{}-{}", month_name(self.start_month), month_name(self.end_month))
    }

    /// Concrete `(from, to)` dates of the occurrence of this quarter picked
    /// for `reference`.
    ///
    /// Same-year quarters resolve inside the reference year. For a
    /// cross-year quarter, a reference month at or after the start month
    /// picks the occurrence starting this year; any earlier month picks the
    /// one that started last year. This is a policy for "the instance
    /// containing or nearest to now", not a calendar law.
    pub fn resolve_date_range(&self, reference: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let year = reference.year();
        let (start_year, end_year) = if !self.crosses_year() {
            (year, year)
        } else if reference.month() >= self.start_month {
            (year, year + 1)
        } else {
            (year - 1, year)
        };
        let from = NaiveDate::from_ymd_opt(start_year, self.start_month, 1);
        let to = NaiveDate::from_ymd_opt(
            end_year,
            self.end_month,
            last_day_of_month(end_year, self.end_month),
        );
        match (from, to) {
            (Some(from), Some(to)) => Ok((from, to)),
            _ => Err(BillError::InvalidQuarter(format!(
                "quarter {} cannot be resolved for {reference}",
                self.number
            ))),
        }
    }
}

/// Ordered, validated quarter calendar for one network.
///
/// Holds between 1 and 12 definitions numbered exactly `1..=K` in order.
/// Deserialization goes through the same checks, so a stored calendar with
/// bad months is rejected on load rather than at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<QuarterDefinition>", into = "Vec<QuarterDefinition>")]
pub struct QuarterConfig {
    quarters: Vec<QuarterDefinition>,
}

impl QuarterConfig {
    pub fn new(quarters: Vec<QuarterDefinition>) -> Result<Self> {
        if quarters.is_empty() || quarters.len() > MAX_QUARTERS {
            return Err(BillError::InvalidQuarter(format!(
                "expected 1-{MAX_QUARTERS} quarters, got {}",
                quarters.len()
            )));
        }
        for (i, q) in quarters.iter().enumerate() {
            let expected = i as u32 + 1;
            if q.number != expected {
                return Err(BillError::InvalidQuarter(format!(
                    "quarter at position {expected} is numbered {}",
                    q.number
                )));
            }
            // Re-run the field checks for definitions that came from serde.
            QuarterDefinition::new(q.number, &q.label, q.start_month, q.end_month)?;
        }
        Ok(Self { quarters })
    }

    /// `count` periods of `12 / count` months each, the first one starting
    /// at `start_month`.
    pub fn evenly_divided(count: u32, start_month: u32) -> Result<Self> {
        if count == 0 || count as usize > MAX_QUARTERS || 12 % count != 0 {
            return Err(BillError::InvalidQuarter(format!(
                "{count} quarters do not divide the year evenly"
            )));
        }
        if !(1..=12).contains(&start_month) {
            return Err(BillError::InvalidQuarter(format!(
                "start month {start_month} is outside 1-12"
            )));
        }
        Ok(Self::divide(count, start_month))
    }

    fn divide(count: u32, start_month: u32) -> Self {
        let span = 12 / count;
        let quarters = (0..count)
            .map(|i| {
                let start = (start_month - 1 + i * span) % 12 + 1;
                let end = (start - 1 + span - 1) % 12 + 1;
                let label = format!("Q{} ({}-{})", i + 1, month_name(start), month_name(end));
                QuarterDefinition {
                    number: i + 1,
                    label,
                    start_month: start,
                    end_month: end,
                }
            })
            .collect();
        Self { quarters }
    }

    pub fn len(&self) -> usize {
        self.quarters.len()
    }

    pub fn quarters(&self) -> &[QuarterDefinition] {
        &self.quarters
    }

    pub fn get(&self, number: u32) -> Option<&QuarterDefinition> {
        self.quarters.iter().find(|q| q.number == number)
    }

    pub fn labels(&self) -> Vec<String> {
        self.quarters.iter().map(|q| q.label.clone()).collect()
    }
}

impl TryFrom<Vec<QuarterDefinition>> for QuarterConfig {
    type Error = BillError;

    fn try_from(quarters: Vec<QuarterDefinition>) -> Result<Self> {
        Self::new(quarters)
    }
}

impl From<QuarterConfig> for Vec<QuarterDefinition> {
    fn from(config: QuarterConfig) -> Self {
        config.quarters
    }
}

/// Named starting layouts for a new network's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedPattern {
    /// Jan-Mar, Apr-Jun, Jul-Sep, Oct-Dec.
    #[default]
    Calendar,
    /// Oct-Mar, Apr-Sep.
    FiscalHalves,
    /// Apr-Jun, Jul-Sep, Oct-Dec, Jan-Mar.
    FiscalQuarters,
}

impl SeedPattern {
    pub fn config(self) -> QuarterConfig {
        match self {
            SeedPattern::Calendar => QuarterConfig::divide(4, 1),
            SeedPattern::FiscalHalves => QuarterConfig::divide(2, 10),
            SeedPattern::FiscalQuarters => QuarterConfig::divide(4, 4),
        }
    }
}

impl FromStr for SeedPattern {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calendar" => Ok(SeedPattern::Calendar),
            "fiscal-halves" => Ok(SeedPattern::FiscalHalves),
            "fiscal-quarters" => Ok(SeedPattern::FiscalQuarters),
            other => Err(format!(
                "unknown quarter pattern '{other}' (expected calendar, fiscal-halves, fiscal-quarters)"
            )),
        }
    }
}

/// Calendar to install when a network is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuarterSeed {
    Pattern(SeedPattern),
    Custom(QuarterConfig),
}

impl QuarterSeed {
    pub fn into_config(self) -> QuarterConfig {
        match self {
            QuarterSeed::Pattern(pattern) => pattern.config(),
            QuarterSeed::Custom(config) => config,
        }
    }
}

impl Default for QuarterSeed {
    fn default() -> Self {
        QuarterSeed::Pattern(SeedPattern::default())
    }
}

impl From<SeedPattern> for QuarterSeed {
    fn from(pattern: SeedPattern) -> Self {
        QuarterSeed::Pattern(pattern)
    }
}

impl From<QuarterConfig> for QuarterSeed {
    fn from(config: QuarterConfig) -> Self {
        QuarterSeed::Custom(config)
    }
}

/// Pull a quarter number out of a billing period label.
///
/// Recognizes `Q1 (Oct-Mar)`, `Q2-2025` and the older `Quarter 3 (Apr-Jun)`
/// spelling. Returns `None` when no number in 1-12 is present.
pub fn quarter_number_from_label(label: &str) -> Option<u32> {
    let caps = QUARTER_LABEL_REGEX.captures(label)?;
    let number: u32 = caps.get(1)?.as_str().parse().ok()?;
    (1..=MAX_QUARTERS as u32).contains(&number).then_some(number)
}
