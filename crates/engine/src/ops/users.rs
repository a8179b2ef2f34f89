use sea_orm::{ActiveValue, QueryOrder, prelude::*};

use crate::{EngineError, ResultEngine, users};

use super::Engine;

impl Engine {
    /// Register a user. Credentials are stored as given and checked by the
    /// server's Basic auth.
    pub async fn new_user(&self, username: &str, password: &str) -> ResultEngine<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EngineError::InvalidName(
                "username must not be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(EngineError::InvalidName(
                "password must not be empty".to_string(),
            ));
        }

        if users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(username.to_string()));
        }

        let user = users::ActiveModel {
            username: ActiveValue::Set(username.to_string()),
            password: ActiveValue::Set(password.to_string()),
        };
        users::Entity::insert(user).exec(&self.database).await?;
        tracing::info!("created user {username}");
        Ok(())
    }

    /// Usernames of every registered user, in order.
    pub async fn list_users(&self) -> ResultEngine<Vec<String>> {
        let models = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(|user| user.username).collect())
    }
}

#[cfg(test)]
mod tests {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    use super::*;

    async fn engine() -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Engine::builder().database(db).build().await.unwrap()
    }

    #[tokio::test]
    async fn users_are_listed_in_order() {
        let engine = engine().await;
        engine.new_user("bob", "pw").await.unwrap();
        engine.new_user("  alice ", "pw").await.unwrap();

        assert_eq!(engine.list_users().await.unwrap(), vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn duplicate_and_blank_users_are_rejected() {
        let engine = engine().await;
        engine.new_user("alice", "pw").await.unwrap();

        assert_eq!(
            engine.new_user("alice", "other").await,
            Err(EngineError::ExistingKey("alice".to_string()))
        );
        assert!(matches!(
            engine.new_user(" ", "pw").await,
            Err(EngineError::InvalidName(_))
        ));
        assert!(matches!(
            engine.new_user("carol", "").await,
            Err(EngineError::InvalidName(_))
        ));
    }
}
