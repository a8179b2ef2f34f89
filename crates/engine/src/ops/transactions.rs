use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, TrashedTransaction, transactions,
    transactions::validate_amount, trash, util::normalize_optional_text,
};

use super::{
    Engine, categories::category_snapshot, people::person_snapshot, with_tx,
};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

/// A transaction entered by the user.
#[derive(Clone, Debug)]
pub struct TransactionNew {
    pub amount_minor: i64,
    pub note: Option<String>,
    pub category_id: Uuid,
    pub person_id: Option<Uuid>,
    /// Defaults to the time of the call.
    pub created_at: Option<DateTime<Utc>>,
}

/// Editable fields of a transaction. Snapshots are never edited.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdate {
    pub amount_minor: Option<i64>,
    pub note: Option<Option<String>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Engine {
    pub async fn new_transaction(
        &self,
        user_id: &str,
        input: TransactionNew,
        now: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        validate_amount(input.amount_minor)?;
        with_tx!(self, |db_tx| {
            let category = category_snapshot(&db_tx, user_id, input.category_id).await?;
            let person = person_snapshot(&db_tx, user_id, input.person_id).await?;
            let tx = Transaction::new(
                user_id.to_string(),
                input.amount_minor,
                normalize_optional_text(input.note.as_deref()),
                category,
                person,
                input.created_at.unwrap_or(now),
            )?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok(tx)
        })
    }

    pub async fn transaction(&self, id: Uuid, user_id: &str) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(id)
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Ok(Transaction::from(model))
    }

    /// List the ledger of a user, newest first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;
        let mut query =
            transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::CreatedAt.lt(to));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(transactions::Column::CategoryId.eq(category_id));
        }
        let models = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Transaction::from).collect())
    }

    pub async fn update_transaction(
        &self,
        id: Uuid,
        user_id: &str,
        update: TransactionUpdate,
        now: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        if let Some(amount_minor) = update.amount_minor {
            validate_amount(amount_minor)?;
        }
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(id)
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;

            let mut active: transactions::ActiveModel = model.into();
            if let Some(amount_minor) = update.amount_minor {
                active.amount_minor = ActiveValue::Set(amount_minor);
            }
            if let Some(note) = update.note {
                active.note = ActiveValue::Set(normalize_optional_text(note.as_deref()));
            }
            if let Some(created_at) = update.created_at {
                active.created_at = ActiveValue::Set(created_at);
            }
            active.edited_at = ActiveValue::Set(Some(now));
            let model = active.update(&db_tx).await?;
            Ok(Transaction::from(model))
        })
    }

    /// Move a transaction to the trash.
    pub async fn delete_transaction(
        &self,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(id)
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;

            trash::ActiveModel::from_transaction(model, now)
                .insert(&db_tx)
                .await?;
            transactions::Entity::delete_by_id(id).exec(&db_tx).await?;
            Ok(())
        })
    }

    /// Trashed transactions of a user, most recently deleted first.
    pub async fn list_trash(&self, user_id: &str) -> ResultEngine<Vec<TrashedTransaction>> {
        let models = trash::Entity::find()
            .filter(trash::Column::UserId.eq(user_id))
            .order_by_desc(trash::Column::DeletedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(TrashedTransaction::from).collect())
    }

    /// Move a trashed transaction back into the ledger under its original id.
    pub async fn restore_transaction(&self, id: Uuid, user_id: &str) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = trash::Entity::find_by_id(id)
                .filter(trash::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("trashed transaction not exists".to_string()))?;

            let tx = TrashedTransaction::from(model).transaction;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            trash::Entity::delete_by_id(id).exec(&db_tx).await?;
            Ok(tx)
        })
    }
}
