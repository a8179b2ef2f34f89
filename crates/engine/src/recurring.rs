//! Recurring templates.
//!
//! A template describes a repeating transaction. The engine materializes it
//! into the ledger whenever its [`Schedule`] is due, until `pushed_count`
//! reaches `occurrence_count`. Exhausted templates are kept and flagged, never
//! deleted automatically.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CategorySnapshot, EngineError, PersonSnapshot, ResultEngine, Schedule, Transaction,
    schedule::{
        IntervalKind, ScheduleFields, format_time_of_day, parse_time_of_day, parse_weekday,
        weekday_name,
    },
    transactions::person_snapshot,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: Uuid,
    pub user_id: String,
    pub schedule: Schedule,
    pub occurrence_count: u32,
    pub pushed_count: u32,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub category: CategorySnapshot,
    pub person: Option<PersonSnapshot>,
    pub last_materialized_at: Option<DateTime<Utc>>,
    pub exhausted: bool,
    pub created_at: DateTime<Utc>,
}

impl RecurringTemplate {
    pub fn interval_kind(&self) -> IntervalKind {
        self.schedule.interval_kind()
    }

    /// No further occurrence may be materialized.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted || self.pushed_count >= self.occurrence_count
    }

    /// Build the ledger entry for one occurrence at `now`.
    pub(crate) fn materialize(&self, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: self.user_id.clone(),
            amount_minor: self.amount_minor,
            note: self.note.clone(),
            category: self.category.clone(),
            person: self.person.clone(),
            created_at: now,
            edited_at: None,
            recurring: true,
            template_id: Some(self.id),
        }
    }
}

/// Input for a new template. Unset schedule fields get their defaults.
#[derive(Clone, Debug)]
pub struct RecurringNew {
    pub interval: IntervalKind,
    pub schedule: ScheduleFields,
    pub occurrence_count: u32,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub category_id: Uuid,
    pub person_id: Option<Uuid>,
}

/// Partial update of a template. `None` leaves the field unchanged.
///
/// When `interval` is set the schedule is rebuilt from `schedule` (with
/// defaults); when only `schedule` is set its fields override the current
/// ones for the same interval.
#[derive(Clone, Debug, Default)]
pub struct RecurringUpdate {
    pub interval: Option<IntervalKind>,
    pub schedule: Option<ScheduleFields>,
    pub occurrence_count: Option<u32>,
    pub amount_minor: Option<i64>,
    pub note: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub interval_kind: String,
    pub time_of_day: Option<String>,
    pub weekday: Option<String>,
    pub day_of_month: Option<i32>,
    pub month: Option<i32>,
    pub day: Option<i32>,
    pub occurrence_count: i32,
    pub pushed_count: i32,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub category_id: Uuid,
    pub category_name: String,
    pub person_id: Option<Uuid>,
    pub person_name: Option<String>,
    pub last_materialized_at: Option<DateTimeUtc>,
    pub exhausted: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn schedule_columns(
    schedule: &Schedule,
) -> (
    String,
    Option<String>,
    Option<String>,
    Option<i32>,
    Option<i32>,
    Option<i32>,
) {
    let fields = schedule.fields();
    (
        schedule.interval_kind().as_str().to_string(),
        fields.time_of_day.map(format_time_of_day),
        fields.weekday.map(|w| weekday_name(w).to_string()),
        fields.day_of_month.map(to_column),
        fields.month.map(to_column),
        fields.day.map(to_column),
    )
}

fn to_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_column(value: i32, label: &str) -> ResultEngine<u32> {
    u32::try_from(value)
        .map_err(|_| EngineError::InvalidSchedule(format!("{label} must not be negative")))
}

impl From<&RecurringTemplate> for ActiveModel {
    fn from(template: &RecurringTemplate) -> Self {
        let (interval_kind, time_of_day, weekday, day_of_month, month, day) =
            schedule_columns(&template.schedule);
        Self {
            id: ActiveValue::Set(template.id),
            user_id: ActiveValue::Set(template.user_id.clone()),
            interval_kind: ActiveValue::Set(interval_kind),
            time_of_day: ActiveValue::Set(time_of_day),
            weekday: ActiveValue::Set(weekday),
            day_of_month: ActiveValue::Set(day_of_month),
            month: ActiveValue::Set(month),
            day: ActiveValue::Set(day),
            occurrence_count: ActiveValue::Set(to_column(template.occurrence_count)),
            pushed_count: ActiveValue::Set(to_column(template.pushed_count)),
            amount_minor: ActiveValue::Set(template.amount_minor),
            note: ActiveValue::Set(template.note.clone()),
            category_id: ActiveValue::Set(template.category.id),
            category_name: ActiveValue::Set(template.category.name.clone()),
            person_id: ActiveValue::Set(template.person.as_ref().map(|p| p.id)),
            person_name: ActiveValue::Set(template.person.as_ref().map(|p| p.name.clone())),
            last_materialized_at: ActiveValue::Set(template.last_materialized_at),
            exhausted: ActiveValue::Set(template.exhausted),
            created_at: ActiveValue::Set(template.created_at),
        }
    }
}

impl TryFrom<Model> for RecurringTemplate {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let fields = ScheduleFields {
            time_of_day: model
                .time_of_day
                .as_deref()
                .map(parse_time_of_day)
                .transpose()?,
            weekday: model.weekday.as_deref().map(parse_weekday).transpose()?,
            day_of_month: model
                .day_of_month
                .map(|v| from_column(v, "day of month"))
                .transpose()?,
            month: model.month.map(|v| from_column(v, "month")).transpose()?,
            day: model.day.map(|v| from_column(v, "day")).transpose()?,
        };
        let schedule = Schedule::from_stored(&model.interval_kind, &fields)?;

        let occurrence_count = from_column(model.occurrence_count, "occurrence count")?;
        let pushed_count = from_column(model.pushed_count, "pushed count")?;
        if occurrence_count == 0 {
            return Err(EngineError::InvalidSchedule(
                "occurrence count must be >= 1".to_string(),
            ));
        }
        if pushed_count > occurrence_count {
            return Err(EngineError::InvalidSchedule(
                "pushed count exceeds occurrence count".to_string(),
            ));
        }

        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            schedule,
            occurrence_count,
            pushed_count,
            amount_minor: model.amount_minor,
            note: model.note,
            category: CategorySnapshot {
                id: model.category_id,
                name: model.category_name,
            },
            person: person_snapshot(model.person_id, model.person_name),
            last_materialized_at: model.last_materialized_at,
            exhausted: model.exhausted,
            created_at: model.created_at,
        })
    }
}
