//! User notifications.
//!
//! A notification carries a copy of the transaction that triggered it, so it
//! stays readable after the transaction is edited or trashed.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Transaction};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Recurring,
    Reminder,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recurring => "recurring",
            Self::Reminder => "reminder",
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "recurring" => Ok(Self::Recurring),
            "reminder" => Ok(Self::Reminder),
            other => Err(EngineError::InvalidName(format!(
                "invalid notification kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub kind: NotificationKind,
    pub transaction_id: Uuid,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub category_name: String,
    pub transaction_created_at: DateTime<Utc>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, tx: &Transaction, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: tx.user_id.clone(),
            kind,
            transaction_id: tx.id,
            amount_minor: tx.amount_minor,
            note: tx.note.clone(),
            category_name: tx.category.name.clone(),
            transaction_created_at: tx.created_at,
            read: false,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub kind: String,
    pub transaction_id: Uuid,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub category_name: String,
    pub transaction_created_at: DateTimeUtc,
    pub read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Notification> for ActiveModel {
    fn from(notification: &Notification) -> Self {
        Self {
            id: ActiveValue::Set(notification.id),
            user_id: ActiveValue::Set(notification.user_id.clone()),
            kind: ActiveValue::Set(notification.kind.as_str().to_string()),
            transaction_id: ActiveValue::Set(notification.transaction_id),
            amount_minor: ActiveValue::Set(notification.amount_minor),
            note: ActiveValue::Set(notification.note.clone()),
            category_name: ActiveValue::Set(notification.category_name.clone()),
            transaction_created_at: ActiveValue::Set(notification.transaction_created_at),
            read: ActiveValue::Set(notification.read),
            created_at: ActiveValue::Set(notification.created_at),
        }
    }
}

impl TryFrom<Model> for Notification {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: NotificationKind::try_from(model.kind.as_str())?,
            transaction_id: model.transaction_id,
            amount_minor: model.amount_minor,
            note: model.note,
            category_name: model.category_name,
            transaction_created_at: model.transaction_created_at,
            read: model.read,
            created_at: model.created_at,
        })
    }
}
