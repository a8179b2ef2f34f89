//! Recurring templates API endpoints

use api_types::recurring::{
    IntervalKind as ApiInterval, MaterializedView, RecurringList, RecurringNew, RecurringUpdate,
    RecurringView, RunReport, Schedule, SkippedView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::users;
use uuid::Uuid;

use crate::{ServerError, refresh_budgets, server::ServerState};

fn map_interval(kind: engine::IntervalKind) -> ApiInterval {
    match kind {
        engine::IntervalKind::Daily => ApiInterval::Daily,
        engine::IntervalKind::Weekly => ApiInterval::Weekly,
        engine::IntervalKind::Monthly => ApiInterval::Monthly,
        engine::IntervalKind::Yearly => ApiInterval::Yearly,
    }
}

fn parse_interval(kind: ApiInterval) -> engine::IntervalKind {
    match kind {
        ApiInterval::Daily => engine::IntervalKind::Daily,
        ApiInterval::Weekly => engine::IntervalKind::Weekly,
        ApiInterval::Monthly => engine::IntervalKind::Monthly,
        ApiInterval::Yearly => engine::IntervalKind::Yearly,
    }
}

fn parse_schedule(schedule: Schedule) -> engine::ScheduleFields {
    engine::ScheduleFields {
        time_of_day: schedule.time_of_day,
        weekday: schedule.weekday,
        day_of_month: schedule.day_of_month,
        month: schedule.month,
        day: schedule.day,
    }
}

fn map_template(template: engine::RecurringTemplate) -> RecurringView {
    let fields = template.schedule.fields();
    RecurringView {
        id: template.id,
        interval: map_interval(template.interval_kind()),
        schedule: Schedule {
            time_of_day: fields.time_of_day,
            weekday: fields.weekday,
            day_of_month: fields.day_of_month,
            month: fields.month,
            day: fields.day,
        },
        occurrence_count: template.occurrence_count,
        pushed_count: template.pushed_count,
        amount_minor: template.amount_minor,
        note: template.note,
        category_id: template.category.id,
        category_name: template.category.name,
        person_id: template.person.as_ref().map(|p| p.id),
        person_name: template.person.map(|p| p.name),
        last_materialized_at: template.last_materialized_at,
        exhausted: template.exhausted,
        created_at: template.created_at,
    }
}

pub(crate) fn map_report(report: engine::MaterializationReport) -> RunReport {
    RunReport {
        user: report.user_id,
        materialized: report
            .materialized
            .into_iter()
            .map(|m| MaterializedView {
                template_id: m.template_id,
                transaction_id: m.transaction_id,
                notification_id: m.notification_id,
            })
            .collect(),
        exhausted: report.exhausted,
        skipped: report
            .skipped
            .into_iter()
            .map(|s| SkippedView {
                template_id: s.template_id,
                reason: s.reason,
            })
            .collect(),
    }
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<RecurringList>,
) -> Result<Json<Vec<RecurringView>>, ServerError> {
    let templates = state
        .engine
        .list_recurring(&user.username, query.include_exhausted.unwrap_or(false))
        .await?
        .into_iter()
        .map(map_template)
        .collect();
    Ok(Json(templates))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<RecurringNew>,
) -> Result<(StatusCode, Json<RecurringView>), ServerError> {
    let template = state
        .engine
        .new_recurring(
            &user.username,
            engine::RecurringNew {
                interval: parse_interval(payload.interval),
                schedule: parse_schedule(payload.schedule),
                occurrence_count: payload.occurrence_count,
                amount_minor: payload.amount_minor,
                note: payload.note,
                category_id: payload.category_id,
                person_id: payload.person_id,
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_template(template))))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecurringView>, ServerError> {
    let template = state.engine.recurring(id, &user.username).await?;
    Ok(Json(map_template(template)))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecurringUpdate>,
) -> Result<Json<RecurringView>, ServerError> {
    let template = state
        .engine
        .update_recurring(
            id,
            &user.username,
            engine::RecurringUpdate {
                interval: payload.interval.map(parse_interval),
                schedule: payload.schedule.map(parse_schedule),
                occurrence_count: payload.occurrence_count,
                amount_minor: payload.amount_minor,
                note: payload.note.map(Some),
            },
        )
        .await?;
    Ok(Json(map_template(template)))
}

pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_recurring(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run the due check for the authenticated user only.
pub async fn run(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<RunReport>, ServerError> {
    let report = state
        .engine
        .run_due_check(&user.username, Utc::now())
        .await?;
    if !report.materialized.is_empty() {
        refresh_budgets(&state, &user.username).await;
    }
    Ok(Json(map_report(report)))
}
