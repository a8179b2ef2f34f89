use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Notification, NotificationKind, ResultEngine, notifications,
};

use super::Engine;

impl Engine {
    /// Notifications of a user, newest first.
    pub async fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> ResultEngine<Vec<Notification>> {
        let mut query = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .order_by_desc(notifications::Column::CreatedAt);
        if unread_only {
            query = query.filter(notifications::Column::Read.eq(false));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }

    pub async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Notification> {
        let model = notifications::Entity::find_by_id(id)
            .filter(notifications::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("notification not exists".to_string()))?;
        let mut active: notifications::ActiveModel = model.into();
        active.read = ActiveValue::Set(true);
        let model = active.update(&self.database).await?;
        Notification::try_from(model)
    }

    /// Create a reminder about an existing transaction.
    pub async fn new_reminder(
        &self,
        user_id: &str,
        transaction_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<Notification> {
        let tx = self.transaction(transaction_id, user_id).await?;
        let notification = Notification::new(NotificationKind::Reminder, &tx, now);
        notifications::ActiveModel::from(&notification)
            .insert(&self.database)
            .await?;
        Ok(notification)
    }
}
