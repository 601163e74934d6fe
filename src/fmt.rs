use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Format an amount in rupees with Indian digit grouping: ₹12,34,567.89
pub fn money(val: Decimal) -> String {
    let negative = val.is_sign_negative() && !val.is_zero();
    let paise = format!("{:.2}", val.abs());
    let (int_part, dec_part) = paise.split_once('.').unwrap_or((paise.as_str(), "00"));

    // Last three digits form one group, everything above goes in pairs.
    let split = int_part.len().saturating_sub(3);
    let (upper, lower) = int_part.split_at(split);
    let mut grouped = String::new();
    for (i, c) in upper.chars().enumerate() {
        if i > 0 && (upper.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if !upper.is_empty() {
        grouped.push(',');
    }
    grouped.push_str(lower);

    let sign = if negative { "-" } else { "" };
    format!("{sign}\u{20b9}{grouped}.{dec_part}")
}

/// `dd-mm-yyyy`, or an em dash when the date is missing.
pub fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%d-%m-%Y").to_string())
        .unwrap_or_else(|| "\u{2014}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Decimal::new(123456, 2)), "\u{20b9}1,234.56");
        assert_eq!(money(Decimal::new(-500, 0)), "-\u{20b9}500.00");
        assert_eq!(money(Decimal::ZERO), "\u{20b9}0.00");
        assert_eq!(money(Decimal::new(100000099, 2)), "\u{20b9}10,00,000.99");
        assert_eq!(money(Decimal::new(123456789, 2)), "\u{20b9}12,34,567.89");
        assert_eq!(money(Decimal::new(99999, 0)), "\u{20b9}99,999.00");
        assert_eq!(money(Decimal::new(-1234567, 0)), "-\u{20b9}12,34,567.00");
        assert_eq!(money(Decimal::new(421, 1)), "\u{20b9}42.10");
    }

    #[test]
    fn test_date_formatting() {
        assert_eq!(date(NaiveDate::from_ymd_opt(2025, 3, 31)), "31-03-2025");
        assert_eq!(date(None), "\u{2014}");
    }
}
