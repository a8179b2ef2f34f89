//! Core of the bilancio backend.
//!
//! The [`Engine`] owns the database connection and exposes every operation on
//! the user collections. Two pieces of business logic live here:
//!
//! - the recurring engine ([`Engine::run_due_check`]), which turns due
//!   [`RecurringTemplate`]s into ledger entries;
//! - the budget reconciler ([`reconcile()`] and [`Engine::reconcile_budgets`]),
//!   which recomputes budget spend from the ledger.

pub use budgets::{AllocationChange, Budget, BudgetScope, BudgetUpdate, CategoryAllocation};
pub use categories::Category;
pub use error::EngineError;
pub use notifications::{Notification, NotificationKind};
pub use ops::{
    Engine, EngineBuilder, Materialized, MaterializationReport, SkippedTemplate,
    TransactionListFilter, TransactionNew, TransactionUpdate,
};
pub use people::Person;
pub use reconcile::reconcile;
pub use recurring::{RecurringNew, RecurringTemplate, RecurringUpdate};
pub use schedule::{IntervalKind, Schedule, ScheduleFields, days_in_month};
pub use transactions::{CategorySnapshot, PersonSnapshot, Transaction};
pub use trash::TrashedTransaction;

pub mod budget_allocations;
pub mod budgets;
pub mod categories;
mod error;
pub mod notifications;
mod ops;
pub mod people;
mod reconcile;
pub mod recurring;
mod schedule;
pub mod transactions;
pub mod trash;
pub mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
