use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(ascii_case_insensitive)]
pub enum AttendanceStatus {
    Present,
    Late,
    Excused,
    Unexcused,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("invalid time of day: {0:?}")]
    InvalidTime(String),

    #[error("present cutoff {present} is after late cutoff {late}")]
    InvertedCutoffs { present: NaiveTime, late: NaiveTime },
}

const CLOCK_FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"];

/// Parse a clock reading as sent by devices: `08:05`, `08:05:30`, `8:05 am`, `8:05:30 PM`.
pub fn parse_clock(raw: &str) -> Result<NaiveTime, StatusError> {
    let trimmed = raw.trim();
    let normalized = trimmed.to_ascii_uppercase();

    CLOCK_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&normalized, fmt).ok())
        .ok_or_else(|| StatusError::InvalidTime(trimmed.to_string()))
}

/// Check-in thresholds. Both bounds are inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    present_until: NaiveTime,
    late_until: NaiveTime,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            present_until: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            late_until: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl StatusPolicy {
    pub fn new(present_until: NaiveTime, late_until: NaiveTime) -> Result<Self, StatusError> {
        if present_until > late_until {
            return Err(StatusError::InvertedCutoffs {
                present: present_until,
                late: late_until,
            });
        }

        Ok(Self {
            present_until,
            late_until,
        })
    }

    pub fn present_until(&self) -> NaiveTime {
        self.present_until
    }

    pub fn late_until(&self) -> NaiveTime {
        self.late_until
    }

    pub fn classify(&self, time: NaiveTime) -> AttendanceStatus {
        if time <= self.present_until {
            AttendanceStatus::Present
        } else if time <= self.late_until {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Unexcused
        }
    }

    pub fn classify_str(&self, raw: &str) -> Result<AttendanceStatus, StatusError> {
        parse_clock(raw).map(|t| self.classify(t))
    }

    /// A status already stored for the record takes precedence over the derived one.
    pub fn resolve(&self, stored: Option<&str>, time: NaiveTime) -> AttendanceStatus {
        stored
            .and_then(|s| s.trim().parse::<AttendanceStatus>().ok())
            .unwrap_or_else(|| self.classify(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn eight_sharp_is_present() {
        let policy = StatusPolicy::default();
        assert_eq!(policy.classify_str("08:00"), Ok(AttendanceStatus::Present));
        assert_eq!(policy.classify_str("07:15:59"), Ok(AttendanceStatus::Present));
    }

    #[test]
    fn after_cutoff_is_late_then_unexcused() {
        let policy = StatusPolicy::default();
        assert_eq!(policy.classify_str("08:00:01"), Ok(AttendanceStatus::Late));
        assert_eq!(policy.classify_str("08:31"), Ok(AttendanceStatus::Late));
        assert_eq!(policy.classify_str("09:00"), Ok(AttendanceStatus::Late));
        assert_eq!(policy.classify_str("09:01"), Ok(AttendanceStatus::Unexcused));
        assert_eq!(policy.classify(t(23, 59, 59)), AttendanceStatus::Unexcused);
    }

    #[test]
    fn twelve_hour_clock_is_accepted() {
        assert_eq!(parse_clock("8:05 am"), Ok(t(8, 5, 0)));
        assert_eq!(parse_clock(" 12:30 PM "), Ok(t(12, 30, 0)));
        assert_eq!(parse_clock("12:10:05 AM"), Ok(t(0, 10, 5)));
    }

    #[test]
    fn garbage_time_is_rejected() {
        assert!(matches!(parse_clock("25:00"), Err(StatusError::InvalidTime(_))));
        assert!(matches!(parse_clock("late"), Err(StatusError::InvalidTime(_))));
        assert!(matches!(parse_clock(""), Err(StatusError::InvalidTime(_))));
    }

    #[test]
    fn custom_policy_rejects_inverted_cutoffs() {
        let err = StatusPolicy::new(t(9, 0, 0), t(8, 0, 0)).unwrap_err();
        assert!(matches!(err, StatusError::InvertedCutoffs { .. }));

        let policy = StatusPolicy::new(t(8, 30, 0), t(8, 30, 0)).unwrap();
        assert_eq!(policy.classify(t(8, 30, 0)), AttendanceStatus::Present);
        assert_eq!(policy.classify(t(8, 31, 0)), AttendanceStatus::Unexcused);
    }

    #[test]
    fn stored_status_wins_over_derived() {
        let policy = StatusPolicy::default();
        assert_eq!(policy.resolve(Some("Excused"), t(11, 0, 0)), AttendanceStatus::Excused);
        assert_eq!(policy.resolve(Some("late"), t(7, 0, 0)), AttendanceStatus::Late);
        assert_eq!(policy.resolve(Some("unknown"), t(7, 0, 0)), AttendanceStatus::Present);
        assert_eq!(policy.resolve(None, t(8, 45, 0)), AttendanceStatus::Late);
    }

    #[test]
    fn status_string_forms() {
        assert_eq!(AttendanceStatus::Unexcused.to_string(), "Unexcused");
        assert_eq!("present".parse::<AttendanceStatus>(), Ok(AttendanceStatus::Present));
    }
}
