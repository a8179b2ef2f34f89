use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Notification, NotificationKind, RecurringNew, RecurringTemplate,
    RecurringUpdate, ResultEngine, Schedule, ScheduleFields, notifications, recurring,
    recurring::schedule_columns, transactions, transactions::validate_amount,
    util::normalize_optional_text,
};

use super::{Engine, categories::category_snapshot, people::person_snapshot, with_tx};

/// How many times a template is re-read after a conflicting write before it
/// is left for the next run.
const MAX_CONFLICT_RETRIES: usize = 3;

/// One occurrence pushed into the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Materialized {
    pub template_id: Uuid,
    pub transaction_id: Uuid,
    pub notification_id: Uuid,
}

/// A template that could not be evaluated or written during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTemplate {
    pub template_id: Uuid,
    pub reason: String,
}

/// Outcome of a due check for one user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationReport {
    pub user_id: String,
    pub materialized: Vec<Materialized>,
    /// Templates whose last occurrence was pushed during this run.
    pub exhausted: Vec<Uuid>,
    pub skipped: Vec<SkippedTemplate>,
}

enum Outcome {
    NotDue,
    Pushed {
        materialized: Materialized,
        exhausted: bool,
    },
}

fn validate_occurrence_count(occurrence_count: u32, pushed_count: u32) -> ResultEngine<()> {
    if occurrence_count == 0 {
        return Err(EngineError::InvalidAmount(
            "occurrence_count must be >= 1".to_string(),
        ));
    }
    if occurrence_count < pushed_count {
        return Err(EngineError::InvalidAmount(format!(
            "occurrence_count must be >= {pushed_count} (already materialized)"
        )));
    }
    Ok(())
}

fn to_count_column(value: u32) -> ResultEngine<i32> {
    i32::try_from(value)
        .map_err(|_| EngineError::InvalidAmount(format!("count too large: {value}")))
}

impl Engine {
    /// Create a recurring template. Unset schedule fields are filled with
    /// their defaults here, once, and stored.
    pub async fn new_recurring(
        &self,
        user_id: &str,
        input: RecurringNew,
        now: DateTime<Utc>,
    ) -> ResultEngine<RecurringTemplate> {
        validate_amount(input.amount_minor)?;
        validate_occurrence_count(input.occurrence_count, 0)?;
        to_count_column(input.occurrence_count)?;
        let schedule = Schedule::normalize(input.interval, &input.schedule)?;

        with_tx!(self, |db_tx| {
            let category = category_snapshot(&db_tx, user_id, input.category_id).await?;
            let person = person_snapshot(&db_tx, user_id, input.person_id).await?;
            let template = RecurringTemplate {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                schedule,
                occurrence_count: input.occurrence_count,
                pushed_count: 0,
                amount_minor: input.amount_minor,
                note: normalize_optional_text(input.note.as_deref()),
                category,
                person,
                last_materialized_at: None,
                exhausted: false,
                created_at: now,
            };
            recurring::ActiveModel::from(&template).insert(&db_tx).await?;
            Ok(template)
        })
    }

    pub async fn recurring(&self, id: Uuid, user_id: &str) -> ResultEngine<RecurringTemplate> {
        let model = recurring::Entity::find_by_id(id)
            .filter(recurring::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("recurring template not exists".to_string()))?;
        RecurringTemplate::try_from(model)
    }

    /// Templates of a user, oldest first. Rows that cannot be read back are
    /// logged and left out, as in [`Engine::run_due_check`].
    pub async fn list_recurring(
        &self,
        user_id: &str,
        include_exhausted: bool,
    ) -> ResultEngine<Vec<RecurringTemplate>> {
        let mut query = recurring::Entity::find()
            .filter(recurring::Column::UserId.eq(user_id))
            .order_by_asc(recurring::Column::CreatedAt);
        if !include_exhausted {
            query = query.filter(recurring::Column::Exhausted.eq(false));
        }
        let templates = query
            .all(&self.database)
            .await?
            .into_iter()
            .filter_map(|model| {
                let id = model.id;
                RecurringTemplate::try_from(model)
                    .inspect_err(|err| {
                        tracing::warn!(user = user_id, template = %id, "unreadable recurring template: {err}");
                    })
                    .ok()
            })
            .collect();
        Ok(templates)
    }

    /// Apply a user edit to a template.
    ///
    /// The write is conditional on `pushed_count` so that an edit never
    /// overwrites the progress of a concurrent materialization.
    pub async fn update_recurring(
        &self,
        id: Uuid,
        user_id: &str,
        update: RecurringUpdate,
    ) -> ResultEngine<RecurringTemplate> {
        if let Some(amount_minor) = update.amount_minor {
            validate_amount(amount_minor)?;
        }
        with_tx!(self, |db_tx| {
            let model = recurring::Entity::find_by_id(id)
                .filter(recurring::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("recurring template not exists".to_string())
                })?;
            let expected_pushed = model.pushed_count;
            let mut template = RecurringTemplate::try_from(model)?;

            match (update.interval, update.schedule) {
                (Some(kind), fields) => {
                    template.schedule = Schedule::normalize(kind, &fields.unwrap_or_default())?;
                }
                (None, Some(fields)) => {
                    let current = template.schedule.fields();
                    let merged = ScheduleFields {
                        time_of_day: fields.time_of_day.or(current.time_of_day),
                        weekday: fields.weekday.or(current.weekday),
                        day_of_month: fields.day_of_month.or(current.day_of_month),
                        month: fields.month.or(current.month),
                        day: fields.day.or(current.day),
                    };
                    template.schedule =
                        Schedule::normalize(template.interval_kind(), &merged)?;
                }
                (None, None) => {}
            }
            if let Some(occurrence_count) = update.occurrence_count {
                validate_occurrence_count(occurrence_count, template.pushed_count)?;
                template.occurrence_count = occurrence_count;
            }
            if let Some(amount_minor) = update.amount_minor {
                template.amount_minor = amount_minor;
            }
            if let Some(note) = update.note {
                template.note = normalize_optional_text(note.as_deref());
            }
            template.exhausted = template.pushed_count >= template.occurrence_count;

            let (interval_kind, time_of_day, weekday, day_of_month, month, day) =
                schedule_columns(&template.schedule);
            let active = recurring::ActiveModel {
                interval_kind: ActiveValue::Set(interval_kind),
                time_of_day: ActiveValue::Set(time_of_day),
                weekday: ActiveValue::Set(weekday),
                day_of_month: ActiveValue::Set(day_of_month),
                month: ActiveValue::Set(month),
                day: ActiveValue::Set(day),
                occurrence_count: ActiveValue::Set(to_count_column(template.occurrence_count)?),
                amount_minor: ActiveValue::Set(template.amount_minor),
                note: ActiveValue::Set(template.note.clone()),
                exhausted: ActiveValue::Set(template.exhausted),
                ..Default::default()
            };
            let result = recurring::Entity::update_many()
                .set(active)
                .filter(recurring::Column::Id.eq(id))
                .filter(recurring::Column::PushedCount.eq(expected_pushed))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::ConcurrencyConflict(format!(
                    "recurring template {id} was materialized while being edited"
                )));
            }
            Ok(template)
        })
    }

    pub async fn delete_recurring(&self, id: Uuid, user_id: &str) -> ResultEngine<()> {
        let result = recurring::Entity::delete_many()
            .filter(recurring::Column::Id.eq(id))
            .filter(recurring::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(
                "recurring template not exists".to_string(),
            ));
        }
        Ok(())
    }

    /// Materialize every due occurrence of the user's active templates.
    ///
    /// A template that cannot be evaluated (malformed schedule) or written
    /// (storage error, repeated conflicts) is reported in
    /// [`MaterializationReport::skipped`] and does not stop the batch. Only a
    /// failure to list the templates is returned as an error.
    pub async fn run_due_check(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<MaterializationReport> {
        let templates = recurring::Entity::find()
            .filter(recurring::Column::UserId.eq(user_id))
            .filter(recurring::Column::Exhausted.eq(false))
            .order_by_asc(recurring::Column::CreatedAt)
            .all(&self.database)
            .await?;

        let mut report = MaterializationReport {
            user_id: user_id.to_string(),
            ..Default::default()
        };
        for template in templates {
            match self.materialize_with_retry(template.id, now).await {
                Ok(Outcome::NotDue) => {}
                Ok(Outcome::Pushed {
                    materialized,
                    exhausted,
                }) => {
                    if exhausted {
                        report.exhausted.push(materialized.template_id);
                    }
                    report.materialized.push(materialized);
                }
                Err(err) => {
                    tracing::warn!(
                        user = user_id,
                        template = %template.id,
                        "skipping recurring template: {err}"
                    );
                    report.skipped.push(SkippedTemplate {
                        template_id: template.id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            user = user_id,
            materialized = report.materialized.len(),
            exhausted = report.exhausted.len(),
            skipped = report.skipped.len(),
            "due check completed"
        );
        Ok(report)
    }

    /// Run [`Engine::run_due_check`] for every user.
    ///
    /// Storage failures while listing users or templates abort the whole run.
    pub async fn run_due_check_all(
        &self,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<MaterializationReport>> {
        let users = self.list_users().await?;
        let mut reports = Vec::with_capacity(users.len());
        for user in users {
            reports.push(self.run_due_check(&user, now).await?);
        }
        tracing::info!(
            users = reports.len(),
            materialized = reports.iter().map(|r| r.materialized.len()).sum::<usize>(),
            skipped = reports.iter().map(|r| r.skipped.len()).sum::<usize>(),
            "recurring run completed"
        );
        Ok(reports)
    }

    async fn materialize_with_retry(
        &self,
        template_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<Outcome> {
        for attempt in 1..=MAX_CONFLICT_RETRIES {
            let model = recurring::Entity::find_by_id(template_id)
                .one(&self.database)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("recurring template not exists".to_string())
                })?;
            match self.try_materialize(model, now).await {
                Err(EngineError::ConcurrencyConflict(reason)) => {
                    tracing::debug!(template = %template_id, attempt, "{reason}; re-evaluating");
                }
                other => return other,
            }
        }
        Err(EngineError::ConcurrencyConflict(format!(
            "template {template_id} kept changing, left for the next run"
        )))
    }

    /// Evaluate one template and, when due, write the transaction, the
    /// notification and the template progress in one DB transaction.
    ///
    /// `pushed_count` is the version of the template: the progress update only
    /// applies if it still holds the value that was read.
    async fn try_materialize(
        &self,
        model: recurring::Model,
        now: DateTime<Utc>,
    ) -> ResultEngine<Outcome> {
        let expected_pushed = model.pushed_count;
        let template = RecurringTemplate::try_from(model)?;
        if template.is_exhausted() {
            return Ok(Outcome::NotDue);
        }
        let last = template.last_materialized_at.map(|at| self.local(at));
        if !template.schedule.is_due(self.local(now), last) {
            return Ok(Outcome::NotDue);
        }

        let tx = template.materialize(now);
        let notification = Notification::new(NotificationKind::Recurring, &tx, now);
        let pushed_count = template.pushed_count + 1;
        let exhausted = pushed_count >= template.occurrence_count;

        with_tx!(self, |db_tx| {
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            notifications::ActiveModel::from(&notification)
                .insert(&db_tx)
                .await?;

            let result = recurring::Entity::update_many()
                .col_expr(
                    recurring::Column::PushedCount,
                    Expr::value(to_count_column(pushed_count)?),
                )
                .col_expr(recurring::Column::LastMaterializedAt, Expr::value(now))
                .col_expr(recurring::Column::Exhausted, Expr::value(exhausted))
                .filter(recurring::Column::Id.eq(template.id))
                .filter(recurring::Column::PushedCount.eq(expected_pushed))
                .filter(recurring::Column::Exhausted.eq(false))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::ConcurrencyConflict(format!(
                    "template {} changed since it was read",
                    template.id
                )));
            }

            Ok(Outcome::Pushed {
                materialized: Materialized {
                    template_id: template.id,
                    transaction_id: tx.id,
                    notification_id: notification.id,
                },
                exhausted,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement};

    use super::*;
    use crate::{IntervalKind, TransactionListFilter};

    #[tokio::test]
    async fn stale_template_is_a_conflict_and_writes_nothing() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        db.execute(Statement::from_sql_and_values(
            db.get_database_backend(),
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec!["alice".into(), "password".into()],
        ))
        .await
        .unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        let bills = engine.new_category("alice", "Bills").await.unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let created = engine
            .new_recurring(
                "alice",
                RecurringNew {
                    interval: IntervalKind::Daily,
                    schedule: ScheduleFields::default(),
                    occurrence_count: 5,
                    amount_minor: 100,
                    note: None,
                    category_id: bills.id,
                    person_id: None,
                },
                start,
            )
            .await
            .unwrap();

        let stale = recurring::Entity::find_by_id(created.id)
            .one(&engine.database)
            .await
            .unwrap()
            .unwrap();

        // Another run pushes the occurrence after `stale` was read.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let report = engine.run_due_check("alice", now).await.unwrap();
        assert_eq!(report.materialized.len(), 1);

        // Evaluated alone, the stale row still looks due for the next day.
        let tomorrow = Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap();
        let err = engine.try_materialize(stale, tomorrow).await.err().unwrap();
        assert!(matches!(err, EngineError::ConcurrencyConflict(_)));

        let ledger = engine
            .list_transactions("alice", &TransactionListFilter::default())
            .await
            .unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(engine.list_notifications("alice", false).await.unwrap().len(), 1);
        let stored = engine.recurring(created.id, "alice").await.unwrap();
        assert_eq!(stored.pushed_count, 1);
        assert_eq!(stored.last_materialized_at, Some(now));
    }
}
