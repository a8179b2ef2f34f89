//! Schema runner for the bilancio database.
//!
//! `migration [up|down|fresh|refresh|status]`, against `DATABASE_URL`.
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;

use migration::Migrator;

enum Action {
    Up,
    Down,
    Fresh,
    Refresh,
    Status,
}

impl Action {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.unwrap_or("up") {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "fresh" => Some(Self::Fresh),
            "refresh" => Some(Self::Refresh),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    async fn apply(self, db: &DatabaseConnection) -> Result<(), DbErr> {
        match self {
            Self::Up => Migrator::up(db, None).await,
            Self::Down => Migrator::down(db, None).await,
            Self::Fresh => Migrator::fresh(db).await,
            Self::Refresh => Migrator::refresh(db).await,
            Self::Status => Migrator::status(db).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let arg = std::env::args().nth(1);
    let Some(action) = Action::parse(arg.as_deref()) else {
        eprintln!("usage: migration [up|down|fresh|refresh|status]");
        std::process::exit(2);
    };

    let url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./bilancio.db?mode=rwc".to_string());
    let db = Database::connect(&url).await?;
    action.apply(&db).await?;
    Ok(())
}
