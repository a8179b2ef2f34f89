use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use sea_orm::DatabaseConnection;

mod budgets;
mod categories;
mod notifications;
mod people;
mod recurring;
mod transactions;
mod users;

pub use recurring::{MaterializationReport, Materialized, SkippedTemplate};
pub use transactions::{TransactionListFilter, TransactionNew, TransactionUpdate};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The rollback happens when the uncommitted transaction is dropped.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    timezone: Tz,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Timezone used for due dates and budget scopes.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.timezone).naive_local()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    timezone: Option<Tz>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Timezone for calendar reasoning. Defaults to UTC.
    pub fn timezone(mut self, timezone: Tz) -> EngineBuilder {
        self.timezone = Some(timezone);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> crate::ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            timezone: self.timezone.unwrap_or(Tz::UTC),
        })
    }
}
