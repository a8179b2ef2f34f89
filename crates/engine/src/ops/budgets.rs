use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    AllocationChange, Budget, BudgetScope, BudgetUpdate, EngineError, ResultEngine, Transaction,
    budget_allocations, budgets, budgets::scope_columns, reconcile::reconcile, transactions,
};

use super::{Engine, categories::require_category, with_tx};

fn validate_total(total_budget: i64) -> ResultEngine<()> {
    if total_budget < 0 {
        return Err(EngineError::InvalidAmount(
            "total_budget must be >= 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Create a budget for `scope`. A user has at most one budget per scope.
    ///
    /// Limits are applied in the given order and clamped the same way as
    /// [`Engine::set_category_limit`].
    pub async fn new_budget(
        &self,
        user_id: &str,
        scope: BudgetScope,
        total_budget: i64,
        limits: &[(Uuid, i64)],
    ) -> ResultEngine<Budget> {
        scope.validate()?;
        validate_total(total_budget)?;
        with_tx!(self, |db_tx| {
            let (month, year) = scope_columns(&scope);
            let mut existing = budgets::Entity::find()
                .filter(budgets::Column::UserId.eq(user_id))
                .filter(budgets::Column::Year.eq(year));
            existing = match month {
                Some(month) => existing.filter(budgets::Column::Month.eq(month)),
                None => existing.filter(budgets::Column::Month.is_null()),
            };
            if existing.one(&db_tx).await?.is_some() {
                return Err(EngineError::ExistingKey(
                    "a budget for this scope already exists".to_string(),
                ));
            }

            let mut budget = Budget {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                scope,
                total_budget,
                total_spent: 0,
                allocations: Vec::new(),
            };
            for (category_id, limit) in limits {
                require_category(&db_tx, user_id, *category_id).await?;
                budget.set_category_limit(*category_id, *limit);
            }

            budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            write_allocations(&db_tx, &budget).await?;
            Ok(budget)
        })
    }

    pub async fn budget(&self, id: Uuid, user_id: &str) -> ResultEngine<Budget> {
        load_budget(&self.database, id, user_id).await
    }

    /// Budgets of a user, newest scope first.
    pub async fn list_budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        load_user_budgets(&self.database, user_id).await
    }

    pub async fn delete_budget(&self, id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            load_budget(&db_tx, id, user_id).await?;
            budget_allocations::Entity::delete_many()
                .filter(budget_allocations::Column::BudgetId.eq(id))
                .exec(&db_tx)
                .await?;
            budgets::Entity::delete_by_id(id).exec(&db_tx).await?;
            Ok(())
        })
    }

    /// Change the total of a budget.
    ///
    /// The new total must still cover the limits already allocated.
    pub async fn set_total_budget(
        &self,
        id: Uuid,
        user_id: &str,
        total_budget: i64,
    ) -> ResultEngine<Budget> {
        validate_total(total_budget)?;
        with_tx!(self, |db_tx| {
            let mut budget = load_budget(&db_tx, id, user_id).await?;
            let allocated = budget.allocated();
            if total_budget < allocated {
                return Err(EngineError::InvalidAmount(format!(
                    "total_budget {total_budget} is below the allocated {allocated}"
                )));
            }
            budget.total_budget = total_budget;
            budgets::Entity::update_many()
                .col_expr(budgets::Column::TotalBudget, Expr::value(total_budget))
                .filter(budgets::Column::Id.eq(id))
                .exec(&db_tx)
                .await?;
            Ok(budget)
        })
    }

    /// Set the limit of a category and return the limit actually applied
    /// after clamping. Excluded categories always keep a limit of 0.
    pub async fn set_category_limit(
        &self,
        id: Uuid,
        user_id: &str,
        category_id: Uuid,
        limit: i64,
    ) -> ResultEngine<i64> {
        let change = AllocationChange {
            included: None,
            limit: Some(limit),
        };
        let (_, applied) = self
            .update_allocation(id, user_id, category_id, change)
            .await?;
        Ok(applied.unwrap_or(0))
    }

    /// Include or exclude a category from a budget.
    pub async fn set_category_included(
        &self,
        id: Uuid,
        user_id: &str,
        category_id: Uuid,
        included: bool,
    ) -> ResultEngine<Budget> {
        let change = AllocationChange {
            included: Some(included),
            limit: None,
        };
        let (budget, _) = self
            .update_allocation(id, user_id, category_id, change)
            .await?;
        Ok(budget)
    }

    /// Apply an allocation change in a single DB transaction.
    ///
    /// `included` is applied before `limit`, so excluding a category and
    /// setting its limit together leaves the limit at 0. Returns the budget
    /// and, when a limit was requested, the limit actually applied.
    pub async fn update_allocation(
        &self,
        id: Uuid,
        user_id: &str,
        category_id: Uuid,
        change: AllocationChange,
    ) -> ResultEngine<(Budget, Option<i64>)> {
        with_tx!(self, |db_tx| {
            require_category(&db_tx, user_id, category_id).await?;
            let mut budget = load_budget(&db_tx, id, user_id).await?;
            if let Some(included) = change.included {
                budget.set_category_included(category_id, included);
            }
            let applied = change
                .limit
                .map(|limit| budget.set_category_limit(category_id, limit));
            write_allocations(&db_tx, &budget).await?;
            Ok((budget, applied))
        })
    }

    /// Recompute the spend of the user's active budgets from the ledger and
    /// store the budgets that changed.
    ///
    /// Reads and writes share one DB transaction. Only derived fields are
    /// written, so limits edited concurrently by the user are preserved.
    pub async fn reconcile_budgets(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<BudgetUpdate>> {
        let local_now = now.with_timezone(&self.timezone);
        with_tx!(self, |db_tx| {
            let ledger: Vec<Transaction> = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Transaction::from)
                .collect();
            let user_budgets = load_user_budgets(&db_tx, user_id).await?;
            let updates = reconcile(&ledger, &user_budgets, &local_now);
            store_updates(&db_tx, &updates).await?;
            if !updates.is_empty() {
                tracing::debug!(user = user_id, updated = updates.len(), "budgets reconciled");
            }
            Ok(updates)
        })
    }
}

async fn load_user_budgets<C: ConnectionTrait>(db: &C, user_id: &str) -> ResultEngine<Vec<Budget>> {
    budgets::Entity::find()
        .filter(budgets::Column::UserId.eq(user_id))
        .order_by_desc(budgets::Column::Year)
        .order_by_desc(budgets::Column::Month)
        .find_with_related(budget_allocations::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|(model, allocations)| Budget::from_models(model, allocations))
        .collect()
}

/// Write the derived values of `updates`.
///
/// Each allocation row is only touched while its `included` flag still
/// matches the one the update was computed from.
async fn store_updates<C: ConnectionTrait>(db: &C, updates: &[BudgetUpdate]) -> ResultEngine<()> {
    for update in updates {
        budgets::Entity::update_many()
            .col_expr(budgets::Column::TotalSpent, Expr::value(update.total_spent))
            .filter(budgets::Column::Id.eq(update.budget_id))
            .exec(db)
            .await?;
        for allocation in &update.allocations {
            let mut query = budget_allocations::Entity::update_many()
                .col_expr(
                    budget_allocations::Column::ComputedSpent,
                    Expr::value(allocation.computed_spent),
                )
                .filter(budget_allocations::Column::BudgetId.eq(update.budget_id))
                .filter(budget_allocations::Column::CategoryId.eq(allocation.category_id))
                .filter(budget_allocations::Column::Included.eq(allocation.included));
            if !allocation.included {
                query = query.col_expr(
                    budget_allocations::Column::AllocatedLimit,
                    Expr::value(0_i64),
                );
            }
            query.exec(db).await?;
        }
    }
    Ok(())
}

async fn load_budget<C: ConnectionTrait>(db: &C, id: Uuid, user_id: &str) -> ResultEngine<Budget> {
    let model = budgets::Entity::find_by_id(id)
        .filter(budgets::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
    let allocations = budget_allocations::Entity::find()
        .filter(budget_allocations::Column::BudgetId.eq(id))
        .all(db)
        .await?;
    Budget::from_models(model, allocations)
}

/// Replace the stored allocation rows of `budget`.
async fn write_allocations<C: ConnectionTrait>(db: &C, budget: &Budget) -> ResultEngine<()> {
    budget_allocations::Entity::delete_many()
        .filter(budget_allocations::Column::BudgetId.eq(budget.id))
        .exec(db)
        .await?;
    if budget.allocations.is_empty() {
        return Ok(());
    }
    budget_allocations::Entity::insert_many(
        budget
            .allocations
            .iter()
            .map(|allocation| budget_allocations::ActiveModel::from_allocation(budget.id, allocation)),
    )
    .exec(db)
    .await?;
    Ok(())
}
