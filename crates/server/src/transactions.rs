//! Transactions and trash API endpoints

use api_types::{
    notification::NotificationView,
    transaction::{TransactionList, TransactionNew, TransactionUpdate, TransactionView, TrashedView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::users;
use uuid::Uuid;

use crate::{ServerError, notifications::map_notification, refresh_budgets, server::ServerState};

pub(crate) fn map_transaction(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        amount_minor: tx.amount_minor,
        note: tx.note,
        category_id: tx.category.id,
        category_name: tx.category.name,
        person_id: tx.person.as_ref().map(|p| p.id),
        person_name: tx.person.map(|p| p.name),
        created_at: tx.created_at,
        edited_at: tx.edited_at,
        recurring: tx.recurring,
        template_id: tx.template_id,
    }
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let filter = engine::TransactionListFilter {
        from: query.from.map(|dt| dt.with_timezone(&Utc)),
        to: query.to.map(|dt| dt.with_timezone(&Utc)),
        category_id: query.category_id,
    };
    let txs = state
        .engine
        .list_transactions(&user.username, &filter)
        .await?
        .into_iter()
        .map(map_transaction)
        .collect();
    Ok(Json(txs))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let tx = state
        .engine
        .new_transaction(
            &user.username,
            engine::TransactionNew {
                amount_minor: payload.amount_minor,
                note: payload.note,
                category_id: payload.category_id,
                person_id: payload.person_id,
                created_at: payload.created_at.map(|dt| dt.with_timezone(&Utc)),
            },
            Utc::now(),
        )
        .await?;
    refresh_budgets(&state, &user.username).await;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(id, &user.username).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .update_transaction(
            id,
            &user.username,
            engine::TransactionUpdate {
                amount_minor: payload.amount_minor,
                note: payload.note.map(Some),
                created_at: payload.created_at.map(|dt| dt.with_timezone(&Utc)),
            },
            Utc::now(),
        )
        .await?;
    refresh_budgets(&state, &user.username).await;
    Ok(Json(map_transaction(tx)))
}

/// Move a transaction to the trash.
pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(id, &user.username, Utc::now())
        .await?;
    refresh_budgets(&state, &user.username).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remind(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<NotificationView>), ServerError> {
    let notification = state
        .engine
        .new_reminder(&user.username, id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(map_notification(notification))))
}

pub async fn list_trash(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<TrashedView>>, ServerError> {
    let trashed = state
        .engine
        .list_trash(&user.username)
        .await?
        .into_iter()
        .map(|trashed| TrashedView {
            transaction: map_transaction(trashed.transaction),
            deleted_at: trashed.deleted_at,
        })
        .collect();
    Ok(Json(trashed))
}

pub async fn restore(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.restore_transaction(id, &user.username).await?;
    refresh_budgets(&state, &user.username).await;
    Ok(Json(map_transaction(tx)))
}
