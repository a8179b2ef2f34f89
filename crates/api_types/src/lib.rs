//! Request and response bodies of the bilancio REST API.
//!
//! Amounts are integer minor units. Timestamps are RFC3339; responses are in
//! UTC, requests may carry any offset.

use chrono::{DateTime, FixedOffset, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod recurring {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum IntervalKind {
        Daily,
        Weekly,
        Monthly,
        Yearly,
    }

    /// Schedule payload. Only the fields of the interval are meaningful:
    /// `time_of_day` for daily, `weekday` for weekly, `day_of_month` for
    /// monthly, `month` and `day` for yearly.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Schedule {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub time_of_day: Option<NaiveTime>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub weekday: Option<Weekday>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub day_of_month: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub month: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub day: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringNew {
        pub interval: IntervalKind,
        /// Unset fields get their defaults (08:00, Monday, day 1, 1 January).
        #[serde(default)]
        pub schedule: Schedule,
        pub occurrence_count: u32,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub category_id: Uuid,
        pub person_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RecurringUpdate {
        /// Changing the interval rebuilds the schedule from `schedule` and
        /// the defaults.
        pub interval: Option<IntervalKind>,
        pub schedule: Option<Schedule>,
        pub occurrence_count: Option<u32>,
        pub amount_minor: Option<i64>,
        /// An empty note clears it.
        pub note: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RecurringList {
        pub include_exhausted: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringView {
        pub id: Uuid,
        pub interval: IntervalKind,
        pub schedule: Schedule,
        pub occurrence_count: u32,
        pub pushed_count: u32,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub category_id: Uuid,
        pub category_name: String,
        pub person_id: Option<Uuid>,
        pub person_name: Option<String>,
        pub last_materialized_at: Option<DateTime<Utc>>,
        pub exhausted: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MaterializedView {
        pub template_id: Uuid,
        pub transaction_id: Uuid,
        pub notification_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SkippedView {
        pub template_id: Uuid,
        pub reason: String,
    }

    /// Outcome of a due check for one user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RunReport {
        pub user: String,
        pub materialized: Vec<MaterializedView>,
        pub exhausted: Vec<Uuid>,
        pub skipped: Vec<SkippedView>,
    }
}

pub mod cron {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CronReport {
        pub reports: Vec<recurring::RunReport>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub amount_minor: i64,
        pub note: Option<String>,
        pub category_id: Uuid,
        pub person_id: Option<Uuid>,
        /// Optional: if absent, server uses now().
        pub created_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount_minor: Option<i64>,
        /// An empty note clears it.
        pub note: Option<String>,
        pub created_at: Option<DateTime<FixedOffset>>,
    }

    /// Query of `GET /transactions`. `from` is inclusive, `to` exclusive.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub category_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub category_id: Uuid,
        pub category_name: String,
        pub person_id: Option<Uuid>,
        pub person_name: Option<String>,
        pub created_at: DateTime<Utc>,
        pub edited_at: Option<DateTime<Utc>>,
        /// Materialized from a recurring template.
        pub recurring: bool,
        pub template_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TrashedView {
        #[serde(flatten)]
        pub transaction: TransactionView,
        pub deleted_at: DateTime<Utc>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case", tag = "kind")]
    pub enum Scope {
        Month { month: u32, year: i32 },
        Year { year: i32 },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationNew {
        pub category_id: Uuid,
        pub limit: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub scope: Scope,
        pub total_budget: i64,
        #[serde(default)]
        pub allocations: Vec<AllocationNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetTotal {
        pub total_budget: i64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AllocationUpdate {
        /// Clamped so that the included limits never exceed the total.
        pub limit: Option<i64>,
        pub included: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationView {
        pub category_id: Uuid,
        pub allocated_limit: i64,
        pub included: bool,
        pub computed_spent: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub scope: Scope,
        pub total_budget: i64,
        pub total_spent: i64,
        pub allocated: i64,
        pub remaining: i64,
        pub allocations: Vec<AllocationView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationUpdated {
        /// The limit actually stored, when a limit was requested.
        pub applied_limit: Option<i64>,
        pub budget: BudgetView,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        pub archived: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryList {
        pub include_archived: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub archived: bool,
    }
}

pub mod people {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PersonNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PersonView {
        pub id: Uuid,
        pub name: String,
    }
}

pub mod notification {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum NotificationKind {
        Recurring,
        Reminder,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct NotificationList {
        pub unread_only: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NotificationView {
        pub id: Uuid,
        pub kind: NotificationKind,
        pub transaction_id: Uuid,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub category_name: String,
        pub transaction_created_at: DateTime<Utc>,
        pub read: bool,
        pub created_at: DateTime<Utc>,
    }
}
