use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const MAX_DESCRIPTION_LEN: usize = 500;

/// 24-hour clock, no seconds.
const PLANNER_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityEntry {
    #[schema(example = "09:30")]
    pub time: String,
    #[schema(example = "Site visit, Mirpur warehouse")]
    pub description: String,
}

/// One planner week. Every weekday is always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct WeekPlan {
    #[serde(default)]
    pub monday: Vec<ActivityEntry>,
    #[serde(default)]
    pub tuesday: Vec<ActivityEntry>,
    #[serde(default)]
    pub wednesday: Vec<ActivityEntry>,
    #[serde(default)]
    pub thursday: Vec<ActivityEntry>,
    #[serde(default)]
    pub friday: Vec<ActivityEntry>,
    #[serde(default)]
    pub saturday: Vec<ActivityEntry>,
    #[serde(default)]
    pub sunday: Vec<ActivityEntry>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivityError {
    #[error("{day}: invalid time {time:?}, expected HH:MM")]
    InvalidTime { day: &'static str, time: String },

    #[error("{day}: description must not be empty")]
    EmptyDescription { day: &'static str },

    #[error("{day}: description longer than {max} characters", max = MAX_DESCRIPTION_LEN)]
    DescriptionTooLong { day: &'static str },
}

impl WeekPlan {
    fn days_mut(&mut self) -> [(&'static str, &mut Vec<ActivityEntry>); 7] {
        [
            ("Monday", &mut self.monday),
            ("Tuesday", &mut self.tuesday),
            ("Wednesday", &mut self.wednesday),
            ("Thursday", &mut self.thursday),
            ("Friday", &mut self.friday),
            ("Saturday", &mut self.saturday),
            ("Sunday", &mut self.sunday),
        ]
    }

    /// Validates every entry (times must be `HH:MM`), trims times and descriptions,
    /// then orders each day by time.
    pub fn normalize(mut self) -> Result<Self, ActivityError> {
        for (day, entries) in self.days_mut() {
            let mut keyed = Vec::with_capacity(entries.len());

            for entry in entries.drain(..) {
                let time = NaiveTime::parse_from_str(entry.time.trim(), PLANNER_TIME_FORMAT)
                    .map_err(|_| ActivityError::InvalidTime {
                        day,
                        time: entry.time.clone(),
                    })?;

                let description = entry.description.trim().to_string();
                if description.is_empty() {
                    return Err(ActivityError::EmptyDescription { day });
                }
                if description.chars().count() > MAX_DESCRIPTION_LEN {
                    return Err(ActivityError::DescriptionTooLong { day });
                }

                keyed.push((
                    time,
                    ActivityEntry {
                        time: time.format(PLANNER_TIME_FORMAT).to_string(),
                        description,
                    },
                ));
            }

            // stable: entries at the same time keep submission order
            keyed.sort_by_key(|(time, _)| *time);
            entries.extend(keyed.into_iter().map(|(_, e)| e));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(time: &str, description: &str) -> ActivityEntry {
        ActivityEntry {
            time: time.into(),
            description: description.into(),
        }
    }

    #[test]
    fn missing_days_default_to_empty() {
        let plan: WeekPlan = serde_json::from_value(json!({
            "Tuesday": [{ "time": "10:00", "description": "Standup" }]
        }))
        .unwrap();

        assert!(plan.monday.is_empty());
        assert_eq!(plan.tuesday.len(), 1);

        let out = serde_json::to_value(&plan).unwrap();
        assert_eq!(out["Sunday"], json!([]));
    }

    #[test]
    fn unknown_weekday_is_rejected() {
        let res = serde_json::from_value::<WeekPlan>(json!({ "Funday": [] }));
        assert!(res.is_err());
    }

    #[test]
    fn normalize_sorts_and_trims() {
        let plan = WeekPlan {
            friday: vec![
                entry("14:00", "  Client call "),
                entry(" 09:05 ", "Inventory"),
                entry("09:05", "Email"),
            ],
            ..WeekPlan::default()
        }
        .normalize()
        .unwrap();

        assert_eq!(
            plan.friday,
            vec![
                entry("09:05", "Inventory"),
                entry("09:05", "Email"),
                entry("14:00", "Client call"),
            ]
        );
    }

    #[test]
    fn only_24_hour_minutes_are_accepted() {
        for time in ["09:05:59", "9:05 pm", "9:05 AM", "24:00", "09:60", "0905"] {
            let plan = WeekPlan {
                monday: vec![entry(time, "Site visit")],
                ..WeekPlan::default()
            };
            assert_eq!(
                plan.normalize(),
                Err(ActivityError::InvalidTime {
                    day: "Monday",
                    time: time.into()
                }),
                "{time} should be rejected"
            );
        }
    }

    #[test]
    fn normalize_rejects_bad_entries() {
        let bad_time = WeekPlan {
            monday: vec![entry("noon", "Lunch")],
            ..WeekPlan::default()
        };
        assert_eq!(
            bad_time.normalize(),
            Err(ActivityError::InvalidTime {
                day: "Monday",
                time: "noon".into()
            })
        );

        let blank = WeekPlan {
            sunday: vec![entry("10:00", "   ")],
            ..WeekPlan::default()
        };
        assert_eq!(
            blank.normalize(),
            Err(ActivityError::EmptyDescription { day: "Sunday" })
        );

        let long = WeekPlan {
            wednesday: vec![entry("10:00", &"x".repeat(MAX_DESCRIPTION_LEN + 1))],
            ..WeekPlan::default()
        };
        assert_eq!(
            long.normalize(),
            Err(ActivityError::DescriptionTooLong { day: "Wednesday" })
        );
    }
}
