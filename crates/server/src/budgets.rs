//! Budgets API endpoints

use api_types::budget::{
    AllocationUpdate, AllocationUpdated, AllocationView, BudgetNew, BudgetTotal, BudgetView, Scope,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::users;
use uuid::Uuid;

use crate::{ServerError, refresh_budgets, server::ServerState};

fn map_scope(scope: engine::BudgetScope) -> Scope {
    match scope {
        engine::BudgetScope::Month { month, year } => Scope::Month { month, year },
        engine::BudgetScope::Year { year } => Scope::Year { year },
    }
}

fn parse_scope(scope: Scope) -> engine::BudgetScope {
    match scope {
        Scope::Month { month, year } => engine::BudgetScope::Month { month, year },
        Scope::Year { year } => engine::BudgetScope::Year { year },
    }
}

fn map_budget(budget: engine::Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        scope: map_scope(budget.scope),
        total_budget: budget.total_budget,
        total_spent: budget.total_spent,
        allocated: budget.allocated(),
        remaining: budget.remaining(),
        allocations: budget
            .allocations
            .into_iter()
            .map(|a| AllocationView {
                category_id: a.category_id,
                allocated_limit: a.allocated_limit,
                included: a.included,
                computed_spent: a.computed_spent,
            })
            .collect(),
    }
}

/// List budgets, reconciled against the current ledger.
pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<BudgetView>>, ServerError> {
    refresh_budgets(&state, &user.username).await;
    let budgets = state
        .engine
        .list_budgets(&user.username)
        .await?
        .into_iter()
        .map(map_budget)
        .collect();
    Ok(Json(budgets))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let limits: Vec<(Uuid, i64)> = payload
        .allocations
        .iter()
        .map(|a| (a.category_id, a.limit))
        .collect();
    let budget = state
        .engine
        .new_budget(
            &user.username,
            parse_scope(payload.scope),
            payload.total_budget,
            &limits,
        )
        .await?;
    refresh_budgets(&state, &user.username).await;
    let budget = state.engine.budget(budget.id, &user.username).await?;
    Ok((StatusCode::CREATED, Json(map_budget(budget))))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetView>, ServerError> {
    refresh_budgets(&state, &user.username).await;
    let budget = state.engine.budget(id, &user.username).await?;
    Ok(Json(map_budget(budget)))
}

pub async fn set_total(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BudgetTotal>,
) -> Result<Json<BudgetView>, ServerError> {
    let budget = state
        .engine
        .set_total_budget(id, &user.username, payload.total_budget)
        .await?;
    Ok(Json(map_budget(budget)))
}

pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_budget(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set the limit and/or the included flag of a category.
///
/// The flag is applied first, so excluding and setting a limit in the same
/// request leaves the limit at 0.
pub async fn set_allocation(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((id, category_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AllocationUpdate>,
) -> Result<Json<AllocationUpdated>, ServerError> {
    if payload.limit.is_none() && payload.included.is_none() {
        return Err(ServerError::Generic("nothing to update".to_string()));
    }
    let change = engine::AllocationChange {
        included: payload.included,
        limit: payload.limit,
    };
    let (_, applied) = state
        .engine
        .update_allocation(id, &user.username, category_id, change)
        .await?;
    refresh_budgets(&state, &user.username).await;
    let budget = state.engine.budget(id, &user.username).await?;
    Ok(Json(AllocationUpdated {
        applied_limit: applied,
        budget: map_budget(budget),
    }))
}
