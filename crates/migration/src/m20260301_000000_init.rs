//! Initial schema.
//!
//! - `users`: authentication
//! - `categories`, `people`: user-owned labels referenced by snapshot
//! - `transactions`: the ledger
//! - `trash`: soft-deleted ledger entries
//! - `recurring_templates`: schedules that materialize into the ledger
//! - `budgets`, `budget_allocations`: spending limits per scope and category
//! - `notifications`: inbox entries pointing at transactions

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    Archived,
}

#[derive(Iden)]
enum People {
    Table,
    Id,
    UserId,
    Name,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    AmountMinor,
    Note,
    CategoryId,
    CategoryName,
    PersonId,
    PersonName,
    CreatedAt,
    EditedAt,
    Recurring,
    TemplateId,
}

#[derive(Iden)]
enum Trash {
    Table,
    DeletedAt,
}

#[derive(Iden)]
enum RecurringTemplates {
    Table,
    Id,
    UserId,
    IntervalKind,
    TimeOfDay,
    Weekday,
    DayOfMonth,
    Month,
    Day,
    OccurrenceCount,
    PushedCount,
    AmountMinor,
    Note,
    CategoryId,
    CategoryName,
    PersonId,
    PersonName,
    LastMaterializedAt,
    Exhausted,
    CreatedAt,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    UserId,
    Month,
    Year,
    TotalBudget,
    TotalSpent,
}

#[derive(Iden)]
enum BudgetAllocations {
    Table,
    BudgetId,
    CategoryId,
    AllocatedLimit,
    Included,
    ComputedSpent,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Kind,
    TransactionId,
    AmountMinor,
    Note,
    CategoryName,
    TransactionCreatedAt,
    Read,
    CreatedAt,
}

/// Ledger columns shared by `transactions` and `trash`.
fn ledger_columns(table: &mut TableCreateStatement) -> &mut TableCreateStatement {
    table
        .col(
            ColumnDef::new(Transactions::Id)
                .uuid()
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Transactions::UserId).string().not_null())
        .col(
            ColumnDef::new(Transactions::AmountMinor)
                .big_integer()
                .not_null(),
        )
        .col(ColumnDef::new(Transactions::Note).string())
        .col(ColumnDef::new(Transactions::CategoryId).uuid().not_null())
        .col(ColumnDef::new(Transactions::CategoryName).string().not_null())
        .col(ColumnDef::new(Transactions::PersonId).uuid())
        .col(ColumnDef::new(Transactions::PersonName).string())
        .col(
            ColumnDef::new(Transactions::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(ColumnDef::new(Transactions::EditedAt).timestamp_with_time_zone())
        .col(
            ColumnDef::new(Transactions::Recurring)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(ColumnDef::new(Transactions::TemplateId).uuid())
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Categories and people
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::UserId).string().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(Categories::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-user_id")
                            .from(Categories::Table, Categories::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-user_id-name_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::UserId)
                    .col(Categories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(People::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(People::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(People::UserId).string().not_null())
                    .col(ColumnDef::new(People::Name).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-people-user_id")
                            .from(People::Table, People::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Ledger and trash
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                ledger_columns(Table::create().table(Transactions::Table).if_not_exists())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-user_id")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                ledger_columns(Table::create().table(Trash::Table).if_not_exists())
                    .col(
                        ColumnDef::new(Trash::DeletedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Recurring templates
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RecurringTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringTemplates::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::IntervalKind)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringTemplates::TimeOfDay).string())
                    .col(ColumnDef::new(RecurringTemplates::Weekday).string())
                    .col(ColumnDef::new(RecurringTemplates::DayOfMonth).integer())
                    .col(ColumnDef::new(RecurringTemplates::Month).integer())
                    .col(ColumnDef::new(RecurringTemplates::Day).integer())
                    .col(
                        ColumnDef::new(RecurringTemplates::OccurrenceCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::PushedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringTemplates::Note).string())
                    .col(
                        ColumnDef::new(RecurringTemplates::CategoryId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::CategoryName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringTemplates::PersonId).uuid())
                    .col(ColumnDef::new(RecurringTemplates::PersonName).string())
                    .col(
                        ColumnDef::new(RecurringTemplates::LastMaterializedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::Exhausted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_templates-user_id")
                            .from(RecurringTemplates::Table, RecurringTemplates::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_templates-user_id-exhausted")
                    .table(RecurringTemplates::Table)
                    .col(RecurringTemplates::UserId)
                    .col(RecurringTemplates::Exhausted)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::UserId).string().not_null())
                    .col(ColumnDef::new(Budgets::Month).integer())
                    .col(ColumnDef::new(Budgets::Year).integer().not_null())
                    .col(
                        ColumnDef::new(Budgets::TotalBudget)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Budgets::TotalSpent)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-user_id")
                            .from(Budgets::Table, Budgets::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-user_id-year-month")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::Year)
                    .col(Budgets::Month)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BudgetAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetAllocations::BudgetId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAllocations::CategoryId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAllocations::AllocatedLimit)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAllocations::Included)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(BudgetAllocations::ComputedSpent)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(BudgetAllocations::BudgetId)
                            .col(BudgetAllocations::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_allocations-budget_id")
                            .from(BudgetAllocations::Table, BudgetAllocations::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_allocations-category_id")
                            .from(BudgetAllocations::Table, BudgetAllocations::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Notifications
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).string().not_null())
                    .col(ColumnDef::new(Notifications::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Notifications::TransactionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::Note).string())
                    .col(
                        ColumnDef::new(Notifications::CategoryName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::TransactionCreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Read)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-notifications-user_id")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-notifications-user_id-created_at")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reverse order of creation
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trash::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(People::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
