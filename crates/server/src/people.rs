//! People API endpoints.

use api_types::people::{PersonNew, PersonView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::users;

use crate::{ServerError, server::ServerState};

fn map_person(person: engine::Person) -> PersonView {
    PersonView {
        id: person.id,
        name: person.name,
    }
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<PersonView>>, ServerError> {
    let people = state
        .engine
        .list_people(&user.username)
        .await?
        .into_iter()
        .map(map_person)
        .collect();
    Ok(Json(people))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PersonNew>,
) -> Result<(StatusCode, Json<PersonView>), ServerError> {
    let person = state.engine.new_person(&user.username, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(map_person(person))))
}
