//! Derived lesson figures: the expense tier, hour totals and the chronological sort key.

use chrono::NaiveDateTime;

use crate::error::{AppError, Result};

/// Lessons shorter than this are charged the flat rate.
pub const FLAT_RATE_THRESHOLD_HOURS: f64 = 1.5;
pub const FLAT_RATE_EXPENSE: f64 = 7.2;
pub const HOURLY_EXPENSE_RATE: f64 = 4.8;

/// Format `lesson_date lesson_start` is parsed with, e.g. `01.01.2024 10:00`.
pub const LESSON_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

pub fn parse_hours(raw: &str) -> Result<f64> {
    let hours: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::validation(format!("hours '{}' is not a number", raw)))?;

    if !hours.is_finite() || hours < 0.0 {
        return Err(AppError::validation(format!(
            "hours '{}' must be a non-negative number",
            raw
        )));
    }

    Ok(hours)
}

pub fn lesson_expense(hours: f64) -> f64 {
    if hours < FLAT_RATE_THRESHOLD_HOURS {
        FLAT_RATE_EXPENSE
    } else {
        round2(hours * HOURLY_EXPENSE_RATE)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Seconds since the UNIX epoch for a lesson's date and start time, read as UTC.
pub fn sort_key(lesson_date: &str, lesson_start: &str) -> Result<f64> {
    let full = format!("{} {}", lesson_date.trim(), lesson_start.trim());
    let parsed = NaiveDateTime::parse_from_str(&full, LESSON_DATETIME_FORMAT).map_err(|e| {
        AppError::validation(format!(
            "lesson date/time '{}' does not match dd.mm.yyyy hh:mm ({})",
            full, e
        ))
    })?;

    Ok(parsed.and_utc().timestamp() as f64)
}

/// Sums stored `hours` values. Values that no longer parse are skipped.
pub fn total_hours<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .filter_map(|raw| match raw.trim().parse::<f64>() {
            Ok(hours) if hours.is_finite() => Some(hours),
            _ => {
                log::warn!("Skipping unparsable hours value '{}' in total", raw);
                None
            }
        })
        // an empty f64 sum is -0.0, which would display as "-0.0"
        .fold(0.0, |total, hours| total + hours)
}

/// Renders a decimal the way the lesson pages always have: `1.0`, `7.2`, `9.6`.
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_rate_below_threshold() {
        assert_eq!(lesson_expense(0.0), 7.2);
        assert_eq!(lesson_expense(1.0), 7.2);
        assert_eq!(lesson_expense(1.49), 7.2);
    }

    #[test]
    fn test_hourly_rate_from_threshold() {
        assert_eq!(lesson_expense(1.5), 7.2);
        assert_eq!(lesson_expense(2.0), 9.6);
        assert_eq!(lesson_expense(2.5), 12.0);
        assert_eq!(lesson_expense(1.75), 8.4);
    }

    #[test]
    fn test_expense_is_rounded_to_cents() {
        let expense = lesson_expense(1.33 + 1.0);
        assert_eq!(expense, 11.18);
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_hours("1.0").unwrap(), 1.0);
        assert_eq!(parse_hours(" 2 ").unwrap(), 2.0);
        assert!(matches!(parse_hours("two"), Err(AppError::Validation(_))));
        assert!(matches!(parse_hours("-1"), Err(AppError::Validation(_))));
        assert!(matches!(parse_hours("NaN"), Err(AppError::Validation(_))));
        assert!(matches!(parse_hours(""), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_sort_key() {
        assert_eq!(sort_key("01.01.2024", "10:00").unwrap(), 1_704_103_200.0);
        assert_eq!(sort_key("01.01.1970", "00:01").unwrap(), 60.0);
    }

    #[test]
    fn test_sort_key_orders_chronologically() {
        let earlier = sort_key("31.12.2023", "23:59").unwrap();
        let later = sort_key("01.01.2024", "00:00").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_sort_key_rejects_malformed_input() {
        assert!(matches!(
            sort_key("2024-01-01", "10:00"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            sort_key("01.01.2024", "10am"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            sort_key("32.01.2024", "10:00"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_total_hours_skips_garbage() {
        assert_eq!(total_hours(["1.0", "2.5", "0.5"]), 4.0);
        assert_eq!(total_hours(["1.0", "n/a"]), 1.0);
        assert_eq!(total_hours(Vec::<&str>::new()), 0.0);
    }

    #[test]
    fn test_empty_total_is_positive_zero() {
        let total = total_hours(Vec::<&str>::new());
        assert!(total.is_sign_positive());
        assert_eq!(format_decimal(total), "0.0");
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(1.0), "1.0");
        assert_eq!(format_decimal(7.2), "7.2");
        assert_eq!(format_decimal(9.6), "9.6");
        assert_eq!(format_decimal(0.0), "0.0");
        assert_eq!(format_decimal(12.25), "12.25");
    }
}
