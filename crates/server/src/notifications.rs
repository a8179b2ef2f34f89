//! Notifications API endpoints

use api_types::notification::{NotificationKind as ApiKind, NotificationList, NotificationView};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use engine::users;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub(crate) fn map_notification(notification: engine::Notification) -> NotificationView {
    NotificationView {
        id: notification.id,
        kind: match notification.kind {
            engine::NotificationKind::Recurring => ApiKind::Recurring,
            engine::NotificationKind::Reminder => ApiKind::Reminder,
        },
        transaction_id: notification.transaction_id,
        amount_minor: notification.amount_minor,
        note: notification.note,
        category_name: notification.category_name,
        transaction_created_at: notification.transaction_created_at,
        read: notification.read,
        created_at: notification.created_at,
    }
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<NotificationList>,
) -> Result<Json<Vec<NotificationView>>, ServerError> {
    let notifications = state
        .engine
        .list_notifications(&user.username, query.unread_only.unwrap_or(false))
        .await?
        .into_iter()
        .map(map_notification)
        .collect();
    Ok(Json(notifications))
}

pub async fn mark_read(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationView>, ServerError> {
    let notification = state
        .engine
        .mark_notification_read(id, &user.username)
        .await?;
    Ok(Json(map_notification(notification)))
}
