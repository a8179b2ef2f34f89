//! Deleted transactions.
//!
//! Deleting a ledger entry moves the whole row here; restoring moves it back
//! under the same id.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CategorySnapshot, Transaction, transactions};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashedTransaction {
    pub transaction: Transaction,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trash")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub category_id: Uuid,
    pub category_name: String,
    pub person_id: Option<Uuid>,
    pub person_name: Option<String>,
    pub created_at: DateTimeUtc,
    pub edited_at: Option<DateTimeUtc>,
    pub recurring: bool,
    pub template_id: Option<Uuid>,
    pub deleted_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_transaction(model: transactions::Model, deleted_at: DateTime<Utc>) -> Self {
        Self {
            id: ActiveValue::Set(model.id),
            user_id: ActiveValue::Set(model.user_id),
            amount_minor: ActiveValue::Set(model.amount_minor),
            note: ActiveValue::Set(model.note),
            category_id: ActiveValue::Set(model.category_id),
            category_name: ActiveValue::Set(model.category_name),
            person_id: ActiveValue::Set(model.person_id),
            person_name: ActiveValue::Set(model.person_name),
            created_at: ActiveValue::Set(model.created_at),
            edited_at: ActiveValue::Set(model.edited_at),
            recurring: ActiveValue::Set(model.recurring),
            template_id: ActiveValue::Set(model.template_id),
            deleted_at: ActiveValue::Set(deleted_at),
        }
    }
}

impl From<Model> for TrashedTransaction {
    fn from(model: Model) -> Self {
        Self {
            deleted_at: model.deleted_at,
            transaction: Transaction {
                id: model.id,
                user_id: model.user_id,
                amount_minor: model.amount_minor,
                note: model.note,
                category: CategorySnapshot {
                    id: model.category_id,
                    name: model.category_name,
                },
                person: transactions::person_snapshot(model.person_id, model.person_name),
                created_at: model.created_at,
                edited_at: model.edited_at,
                recurring: model.recurring,
                template_id: model.template_id,
            },
        }
    }
}
