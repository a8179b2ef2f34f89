//! Recurrence schedules and their due conditions.
//!
//! A [`Schedule`] is always fully populated: defaults for unset fields are
//! assigned once by [`Schedule::normalize`] when a template is created (or its
//! interval changes). Reading a stored schedule never fills anything in.
//!
//! Due checks work on *local* naive date-times; converting from UTC to the
//! engine timezone is the caller's job.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// How often a recurring template repeats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl IntervalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for IntervalKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidSchedule(format!(
                "unknown interval kind: {other}"
            ))),
        }
    }
}

/// Optional schedule fields as supplied by a user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleFields {
    pub time_of_day: Option<NaiveTime>,
    pub weekday: Option<Weekday>,
    pub day_of_month: Option<u32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

/// A normalized, interval-specific schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    Daily { time_of_day: NaiveTime },
    Weekly { weekday: Weekday },
    Monthly { day_of_month: u32 },
    Yearly { month: u32, day: u32 },
}

pub const DEFAULT_TIME_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(8, 0, 0) {
    Some(time) => time,
    None => NaiveTime::MIN,
};
pub const DEFAULT_WEEKDAY: Weekday = Weekday::Mon;
pub const DEFAULT_DAY_OF_MONTH: u32 = 1;
pub const DEFAULT_MONTH: u32 = 1;
pub const DEFAULT_DAY: u32 = 1;

impl Schedule {
    /// Build a schedule for `kind`, filling unset fields with defaults:
    /// Daily 08:00, Weekly Monday, Monthly day 1, Yearly 1 January.
    ///
    /// Fields that do not belong to `kind` are ignored.
    pub fn normalize(kind: IntervalKind, fields: &ScheduleFields) -> ResultEngine<Self> {
        let schedule = match kind {
            IntervalKind::Daily => Self::Daily {
                time_of_day: fields.time_of_day.unwrap_or(DEFAULT_TIME_OF_DAY),
            },
            IntervalKind::Weekly => Self::Weekly {
                weekday: fields.weekday.unwrap_or(DEFAULT_WEEKDAY),
            },
            IntervalKind::Monthly => Self::Monthly {
                day_of_month: fields.day_of_month.unwrap_or(DEFAULT_DAY_OF_MONTH),
            },
            IntervalKind::Yearly => Self::Yearly {
                month: fields.month.unwrap_or(DEFAULT_MONTH),
                day: fields.day.unwrap_or(DEFAULT_DAY),
            },
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Rebuild a stored schedule. Every field the interval needs must be present.
    pub fn from_stored(kind: &str, fields: &ScheduleFields) -> ResultEngine<Self> {
        let kind = IntervalKind::try_from(kind)?;
        let missing = |name: &str| {
            EngineError::InvalidSchedule(format!("{} schedule without {name}", kind.as_str()))
        };
        let schedule = match kind {
            IntervalKind::Daily => Self::Daily {
                time_of_day: fields.time_of_day.ok_or_else(|| missing("time of day"))?,
            },
            IntervalKind::Weekly => Self::Weekly {
                weekday: fields.weekday.ok_or_else(|| missing("weekday"))?,
            },
            IntervalKind::Monthly => Self::Monthly {
                day_of_month: fields.day_of_month.ok_or_else(|| missing("day of month"))?,
            },
            IntervalKind::Yearly => Self::Yearly {
                month: fields.month.ok_or_else(|| missing("month"))?,
                day: fields.day.ok_or_else(|| missing("day"))?,
            },
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn interval_kind(&self) -> IntervalKind {
        match self {
            Self::Daily { .. } => IntervalKind::Daily,
            Self::Weekly { .. } => IntervalKind::Weekly,
            Self::Monthly { .. } => IntervalKind::Monthly,
            Self::Yearly { .. } => IntervalKind::Yearly,
        }
    }

    /// The schedule as storage fields; only the ones the interval uses are set.
    pub fn fields(&self) -> ScheduleFields {
        match *self {
            Self::Daily { time_of_day } => ScheduleFields {
                time_of_day: Some(time_of_day),
                ..Default::default()
            },
            Self::Weekly { weekday } => ScheduleFields {
                weekday: Some(weekday),
                ..Default::default()
            },
            Self::Monthly { day_of_month } => ScheduleFields {
                day_of_month: Some(day_of_month),
                ..Default::default()
            },
            Self::Yearly { month, day } => ScheduleFields {
                month: Some(month),
                day: Some(day),
                ..Default::default()
            },
        }
    }

    fn validate(&self) -> ResultEngine<()> {
        match *self {
            Self::Daily { .. } | Self::Weekly { .. } => Ok(()),
            Self::Monthly { day_of_month } => {
                if !(1..=31).contains(&day_of_month) {
                    return Err(EngineError::InvalidSchedule(format!(
                        "day of month must be in 1..=31, got {day_of_month}"
                    )));
                }
                Ok(())
            }
            Self::Yearly { month, day } => {
                if !(1..=12).contains(&month) {
                    return Err(EngineError::InvalidSchedule(format!(
                        "month must be in 1..=12, got {month}"
                    )));
                }
                // Leap year so that 29 February is accepted.
                let max_day = days_in_month(2024, month);
                if day == 0 || day > max_day {
                    return Err(EngineError::InvalidSchedule(format!(
                        "day must be in 1..={max_day} for month {month}, got {day}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Whether an occurrence is due at `now`, given the last push.
    ///
    /// Both arguments are local date-times. At most one occurrence is due per
    /// day, ISO week, month or year depending on the interval.
    pub fn is_due(&self, now: NaiveDateTime, last: Option<NaiveDateTime>) -> bool {
        let today = now.date();
        match *self {
            Self::Daily { time_of_day } => {
                let occurrence = today.and_time(time_of_day);
                if now < occurrence {
                    return false;
                }
                last.is_none_or(|last| last.date() < today)
            }
            Self::Weekly { weekday } => {
                today.weekday() == weekday
                    && last.is_none_or(|last| last.date().iso_week() != today.iso_week())
            }
            Self::Monthly { day_of_month } => {
                let due_day = day_of_month.min(days_in_month(today.year(), today.month()));
                today.day() == due_day
                    && last.is_none_or(|last| {
                        (last.year(), last.month()) != (today.year(), today.month())
                    })
            }
            Self::Yearly { month, day } => {
                let due_day = day.min(days_in_month(today.year(), month));
                today.month() == month
                    && today.day() == due_day
                    && last.is_none_or(|last| last.year() != today.year())
            }
        }
    }
}

/// Number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}

pub(crate) fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub(crate) fn parse_weekday(value: &str) -> ResultEngine<Weekday> {
    value
        .parse::<Weekday>()
        .map_err(|_| EngineError::InvalidSchedule(format!("unknown weekday: {value}")))
}

pub(crate) fn parse_time_of_day(value: &str) -> ResultEngine<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| EngineError::InvalidSchedule(format!("invalid time of day: {value}")))
}

pub(crate) fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .unwrap()
    }

    #[test]
    fn normalize_fills_defaults() {
        let fields = ScheduleFields::default();
        assert_eq!(
            Schedule::normalize(IntervalKind::Daily, &fields).unwrap(),
            Schedule::Daily {
                time_of_day: NaiveTime::from_hms_opt(8, 0, 0).unwrap()
            }
        );
        assert_eq!(
            Schedule::normalize(IntervalKind::Weekly, &fields).unwrap(),
            Schedule::Weekly {
                weekday: Weekday::Mon
            }
        );
        assert_eq!(
            Schedule::normalize(IntervalKind::Monthly, &fields).unwrap(),
            Schedule::Monthly { day_of_month: 1 }
        );
        assert_eq!(
            Schedule::normalize(IntervalKind::Yearly, &fields).unwrap(),
            Schedule::Yearly { month: 1, day: 1 }
        );
    }

    #[test]
    fn normalize_rejects_out_of_range_fields() {
        let fields = ScheduleFields {
            day_of_month: Some(32),
            ..Default::default()
        };
        assert!(matches!(
            Schedule::normalize(IntervalKind::Monthly, &fields),
            Err(EngineError::InvalidSchedule(_))
        ));

        let fields = ScheduleFields {
            month: Some(2),
            day: Some(30),
            ..Default::default()
        };
        assert!(Schedule::normalize(IntervalKind::Yearly, &fields).is_err());

        let fields = ScheduleFields {
            month: Some(2),
            day: Some(29),
            ..Default::default()
        };
        assert!(Schedule::normalize(IntervalKind::Yearly, &fields).is_ok());
    }

    #[test]
    fn stored_schedule_is_not_defaulted() {
        let err = Schedule::from_stored("monthly", &ScheduleFields::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSchedule(_)));

        let err = Schedule::from_stored("fortnightly", &ScheduleFields::default()).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidSchedule("unknown interval kind: fortnightly".to_string())
        );
    }

    #[test]
    fn daily_fires_once_per_day() {
        let schedule = Schedule::Daily {
            time_of_day: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        };
        assert!(!schedule.is_due(at(2025, 3, 4, 7, 59), None));
        assert!(schedule.is_due(at(2025, 3, 4, 9, 0), None));
        assert!(!schedule.is_due(at(2025, 3, 4, 10, 0), Some(at(2025, 3, 4, 9, 0))));
        assert!(schedule.is_due(at(2025, 3, 5, 8, 0), Some(at(2025, 3, 4, 9, 0))));

        // A later time of day does not reopen a day that already has a push.
        let evening = Schedule::Daily {
            time_of_day: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        };
        assert!(!evening.is_due(at(2025, 3, 4, 20, 30), Some(at(2025, 3, 4, 9, 0))));
    }

    #[test]
    fn weekly_fires_on_weekday_once_per_week() {
        let schedule = Schedule::Weekly {
            weekday: Weekday::Wed,
        };
        // 2025-03-05 is a Wednesday.
        assert!(schedule.is_due(at(2025, 3, 5, 0, 1), None));
        assert!(!schedule.is_due(at(2025, 3, 6, 12, 0), None));
        assert!(!schedule.is_due(at(2025, 3, 5, 18, 0), Some(at(2025, 3, 5, 0, 1))));
        assert!(schedule.is_due(at(2025, 3, 12, 0, 1), Some(at(2025, 3, 5, 0, 1))));
    }

    #[test]
    fn monthly_clamps_to_last_day_of_short_month() {
        let schedule = Schedule::Monthly { day_of_month: 31 };
        assert!(schedule.is_due(at(2025, 4, 30, 12, 0), None));
        assert!(!schedule.is_due(at(2025, 4, 29, 12, 0), None));
        assert!(schedule.is_due(at(2025, 2, 28, 12, 0), None));
        assert!(schedule.is_due(at(2024, 2, 29, 12, 0), None));
        assert!(!schedule.is_due(at(2024, 2, 28, 12, 0), None));
        assert!(!schedule.is_due(at(2025, 4, 30, 13, 0), Some(at(2025, 4, 30, 12, 0))));
    }

    #[test]
    fn yearly_fires_once_per_year() {
        let schedule = Schedule::Yearly { month: 2, day: 29 };
        assert!(schedule.is_due(at(2025, 2, 28, 9, 0), None));
        assert!(!schedule.is_due(at(2024, 2, 28, 9, 0), None));
        assert!(schedule.is_due(at(2024, 2, 29, 9, 0), None));
        assert!(!schedule.is_due(at(2025, 2, 28, 9, 0), Some(at(2025, 2, 28, 8, 0))));
        assert!(schedule.is_due(at(2026, 2, 28, 9, 0), Some(at(2025, 2, 28, 8, 0))));
    }

    #[test]
    fn weekday_and_time_round_trip_through_storage_strings() {
        assert_eq!(parse_weekday(weekday_name(Weekday::Fri)).unwrap(), Weekday::Fri);
        let time = parse_time_of_day("07:30").unwrap();
        assert_eq!(format_time_of_day(time), "07:30");
        assert!(parse_time_of_day("25:00").is_err());
    }
}
