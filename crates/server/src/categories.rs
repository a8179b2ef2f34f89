//! Categories API endpoints.

use api_types::category::{CategoryList, CategoryNew, CategoryUpdate, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::users;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        archived: category.archived,
    }
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<CategoryList>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state
        .engine
        .list_categories(&user.username, query.include_archived.unwrap_or(false))
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(Json(categories))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .new_category(&user.username, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(map_category(category))))
}

/// Rename and/or archive. Existing snapshots keep the old name.
pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    if payload.name.is_none() && payload.archived.is_none() {
        return Err(ServerError::Generic("nothing to update".to_string()));
    }
    let category = state
        .engine
        .update_category(&user.username, id, payload.name.as_deref(), payload.archived)
        .await?;
    Ok(Json(map_category(category)))
}
