//! Ledger entries.
//!
//! A `Transaction` embeds copies of its category and person (snapshots) so
//! that editing or renaming those later never rewrites history.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Copy of a category taken when a record is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub id: Uuid,
    pub name: String,
}

/// Copy of a person taken when a record is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSnapshot {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub category: CategorySnapshot,
    pub person: Option<PersonSnapshot>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    /// `true` when materialized from a recurring template.
    pub recurring: bool,
    pub template_id: Option<Uuid>,
}

impl Transaction {
    pub fn new(
        user_id: String,
        amount_minor: i64,
        note: Option<String>,
        category: CategorySnapshot,
        person: Option<PersonSnapshot>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        validate_amount(amount_minor)?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            amount_minor,
            note,
            category,
            person,
            created_at,
            edited_at: None,
            recurring: false,
            template_id: None,
        })
    }
}

pub(crate) fn validate_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount_minor must be > 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn person_snapshot(
    person_id: Option<Uuid>,
    person_name: Option<String>,
) -> Option<PersonSnapshot> {
    person_id
        .zip(person_name)
        .map(|(id, name)| PersonSnapshot { id, name })
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
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
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            note: ActiveValue::Set(tx.note.clone()),
            category_id: ActiveValue::Set(tx.category.id),
            category_name: ActiveValue::Set(tx.category.name.clone()),
            person_id: ActiveValue::Set(tx.person.as_ref().map(|p| p.id)),
            person_name: ActiveValue::Set(tx.person.as_ref().map(|p| p.name.clone())),
            created_at: ActiveValue::Set(tx.created_at),
            edited_at: ActiveValue::Set(tx.edited_at),
            recurring: ActiveValue::Set(tx.recurring),
            template_id: ActiveValue::Set(tx.template_id),
        }
    }
}

impl From<Model> for Transaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            amount_minor: model.amount_minor,
            note: model.note,
            category: CategorySnapshot {
                id: model.category_id,
                name: model.category_name,
            },
            person: person_snapshot(model.person_id, model.person_name),
            created_at: model.created_at,
            edited_at: model.edited_at,
            recurring: model.recurring,
            template_id: model.template_id,
        }
    }
}
