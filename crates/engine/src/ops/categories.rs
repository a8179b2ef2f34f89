use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, CategorySnapshot, EngineError, ResultEngine, categories,
    util::{normalize_name_key, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a category for `user_id`. Names are unique per user, ignoring case.
    pub async fn new_category(&self, user_id: &str, name: &str) -> ResultEngine<Category> {
        let display = normalize_required_name(name, "category")?;
        let key = normalize_name_key(&display);
        with_tx!(self, |db_tx| {
            ensure_category_name_free(&db_tx, user_id, &key, None).await?;

            let model = categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(user_id.to_string()),
                name: ActiveValue::Set(display),
                name_norm: ActiveValue::Set(key),
                archived: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            Ok(Category::from(model))
        })
    }

    pub async fn list_categories(
        &self,
        user_id: &str,
        include_archived: bool,
    ) -> ResultEngine<Vec<Category>> {
        let mut query = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_asc(categories::Column::NameNorm);
        if !include_archived {
            query = query.filter(categories::Column::Archived.eq(false));
        }
        let models = query.all(&self.database).await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    /// Rename and/or archive a category.
    ///
    /// Existing transactions and templates keep the snapshot taken when they
    /// were created.
    pub async fn update_category(
        &self,
        user_id: &str,
        category_id: Uuid,
        name: Option<&str>,
        archived: Option<bool>,
    ) -> ResultEngine<Category> {
        let name = name
            .map(|name| normalize_required_name(name, "category"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = require_category(&db_tx, user_id, category_id).await?;
            let mut active: categories::ActiveModel = model.into();
            if let Some(display) = name {
                let key = normalize_name_key(&display);
                ensure_category_name_free(&db_tx, user_id, &key, Some(category_id)).await?;
                active.name = ActiveValue::Set(display);
                active.name_norm = ActiveValue::Set(key);
            }
            if let Some(archived) = archived {
                active.archived = ActiveValue::Set(archived);
            }
            let model = active.update(&db_tx).await?;
            Ok(Category::from(model))
        })
    }
}

pub(super) async fn require_category<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    category_id: Uuid,
) -> ResultEngine<categories::Model> {
    categories::Entity::find_by_id(category_id)
        .filter(categories::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
}

/// Copy the current state of a category for embedding in a record.
pub(super) async fn category_snapshot<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    category_id: Uuid,
) -> ResultEngine<CategorySnapshot> {
    let model = require_category(db, user_id, category_id).await?;
    Ok(CategorySnapshot {
        id: model.id,
        name: model.name,
    })
}

async fn ensure_category_name_free<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    key: &str,
    except: Option<Uuid>,
) -> ResultEngine<()> {
    let existing = categories::Entity::find()
        .filter(categories::Column::UserId.eq(user_id))
        .filter(categories::Column::NameNorm.eq(key))
        .one(db)
        .await?;
    match existing {
        Some(model) if Some(model.id) != except => Err(EngineError::ExistingKey(model.name)),
        _ => Ok(()),
    }
}
