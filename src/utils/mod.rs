use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

pub fn parse_decimal(value: &str) -> Option<f64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }
    let normalized = match (raw.rfind(','), raw.rfind('.')) {
        (None, _) => raw.to_string(),
        // "1.234,56"
        (Some(comma), Some(dot)) if comma > dot => raw.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => raw.replace(',', ""),
        (Some(comma), None) => {
            let tail = &raw[comma + 1..];
            let grouped = tail.len() == 3 && tail.bytes().all(|b| b.is_ascii_digit());
            if grouped || raw.matches(',').count() > 1 {
                raw.replace(',', "")
            } else {
                raw.replace(',', ".")
            }
        }
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A value counts when it is a number (or numeric string) that is finite and non-zero.
pub fn truthy_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_decimal(s)?,
        _ => return None,
    };
    if number.is_finite() && number != 0.0 {
        Some(number)
    } else {
        None
    }
}

/// Lenient read of a string-ish field; numbers are stringified, blanks are dropped.
pub fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(|v| text_field(Some(v))),
        _ => None,
    }
}

pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            if !raw.is_finite() || raw <= 0.0 {
                return None;
            }
            // Values past 1e11 are epoch milliseconds, smaller ones epoch seconds.
            let millis = if raw > 1e11 { raw } else { raw * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        Value::Object(map) => parse_timestamp(map.get("$date")),
        _ => None,
    }
}

fn parse_timestamp_str(value: &str) -> Option<DateTime<Utc>> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let datetime_formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];
    for fmt in datetime_formats.iter() {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let date_formats = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%Y.%m.%d"];
    for fmt in date_formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Label in the `"{Mon} {YYYY}"` form, e.g. `"Mar 2026"`.
pub fn month_label(date: &impl Datelike) -> String {
    match NaiveDate::from_ymd_opt(date.year(), date.month(), 1) {
        Some(first) => first.format("%b %Y").to_string(),
        None => String::new(),
    }
}

/// First day of the month `offset` months before the month of `now`.
pub fn month_start_before(now: DateTime<Utc>, offset: u32) -> Option<NaiveDate> {
    now.date_naive()
        .with_day(1)
        .and_then(|d| d.checked_sub_months(Months::new(offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthy_number_rejects_zero_and_garbage() {
        assert_eq!(truthy_number(Some(&json!(0))), None);
        assert_eq!(truthy_number(Some(&json!("0"))), None);
        assert_eq!(truthy_number(Some(&json!("abc"))), None);
        assert_eq!(truthy_number(Some(&json!(true))), None);
        assert_eq!(truthy_number(Some(&json!(null))), None);
        assert_eq!(truthy_number(None), None);
    }

    #[test]
    fn truthy_number_parses_strings() {
        assert_eq!(truthy_number(Some(&json!("12.5"))), Some(12.5));
        assert_eq!(truthy_number(Some(&json!(" 7 "))), Some(7.0));
        assert_eq!(truthy_number(Some(&json!("3,5"))), Some(3.5));
        assert_eq!(truthy_number(Some(&json!("1,200.50"))), Some(1200.5));
        assert_eq!(truthy_number(Some(&json!(42))), Some(42.0));
    }

    #[test]
    fn comma_is_grouping_or_decimal() {
        assert_eq!(parse_decimal("1,200"), Some(1200.0));
        assert_eq!(parse_decimal("1,234,567"), Some(1234567.0));
        assert_eq!(parse_decimal("1.234,56"), Some(1234.56));
        assert_eq!(parse_decimal("3,5"), Some(3.5));
        assert_eq!(parse_decimal("12,75"), Some(12.75));
        assert_eq!(parse_decimal("1,2,3x"), None);
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp(Some(&json!("2026-03-14T09:30:00Z"))), Some(expected));
        assert_eq!(parse_timestamp(Some(&json!("2026-03-14T09:30:00.000"))), Some(expected));
        assert_eq!(parse_timestamp(Some(&json!("2026-03-14 09:30:00"))), Some(expected));
        assert_eq!(
            parse_timestamp(Some(&json!(expected.timestamp_millis()))),
            Some(expected)
        );
        assert_eq!(parse_timestamp(Some(&json!(expected.timestamp()))), Some(expected));
        assert_eq!(
            parse_timestamp(Some(&json!({"$date": "2026-03-14T09:30:00Z"}))),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(Some(&json!("14.03.2026"))),
            Some(Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp(Some(&json!("yesterday"))), None);
    }

    #[test]
    fn month_helpers() {
        let now = Utc.with_ymd_and_hms(2026, 2, 27, 12, 0, 0).unwrap();
        assert_eq!(month_label(&now), "Feb 2026");
        assert_eq!(
            month_start_before(now, 2),
            NaiveDate::from_ymd_opt(2025, 12, 1)
        );
    }
}
