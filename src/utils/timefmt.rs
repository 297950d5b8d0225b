use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

/// Storage key for records and planner weeks.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_key(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
}

/// `Friday, 16 October 2026`
pub fn display_date(date: NaiveDate) -> String {
    date.format("%A, %-d %B %Y").to_string()
}

/// `08:05 AM`
pub fn display_time(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
