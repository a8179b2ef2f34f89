use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Person, PersonSnapshot, ResultEngine, people, util::normalize_required_name,
};

use super::Engine;

impl Engine {
    pub async fn new_person(&self, user_id: &str, name: &str) -> ResultEngine<Person> {
        let name = normalize_required_name(name, "person")?;
        let model = people::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(user_id.to_string()),
            name: ActiveValue::Set(name),
        }
        .insert(&self.database)
        .await?;
        Ok(Person::from(model))
    }

    pub async fn list_people(&self, user_id: &str) -> ResultEngine<Vec<Person>> {
        let models = people::Entity::find()
            .filter(people::Column::UserId.eq(user_id))
            .order_by_asc(people::Column::Name)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Person::from).collect())
    }
}

pub(super) async fn person_snapshot<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    person_id: Option<Uuid>,
) -> ResultEngine<Option<PersonSnapshot>> {
    let Some(person_id) = person_id else {
        return Ok(None);
    };
    let model = people::Entity::find_by_id(person_id)
        .filter(people::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("person not exists".to_string()))?;
    Ok(Some(PersonSnapshot {
        id: model.id,
        name: model.name,
    }))
}
