//! Scheduler trigger.

use api_types::cron::CronReport;
use axum::{Json, extract::State};
use axum_extra::TypedHeader;
use chrono::Utc;

use crate::{
    ServerError, refresh_budgets,
    recurring::map_report,
    server::{CronToken, ServerState},
};

/// Run the due check for every user.
///
/// Authenticated by the `x-cron-token` header instead of a user login.
pub async fn run(
    State(state): State<ServerState>,
    token: Option<TypedHeader<CronToken>>,
) -> Result<Json<CronReport>, ServerError> {
    let authorized = match (&state.cron_token, &token) {
        (Some(expected), Some(TypedHeader(CronToken(given)))) => expected.as_ref() == given,
        _ => false,
    };
    if !authorized {
        tracing::warn!("rejected cron trigger");
        return Err(ServerError::Forbidden("invalid cron token".to_string()));
    }

    let reports = state.engine.run_due_check_all(Utc::now()).await?;
    for report in reports.iter().filter(|r| !r.materialized.is_empty()) {
        refresh_budgets(&state, &report.user_id).await;
    }

    Ok(Json(CronReport {
        reports: reports.into_iter().map(map_report).collect(),
    }))
}
