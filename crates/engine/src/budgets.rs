//! Budgets and their per-category allocations.
//!
//! `total_spent` and every allocation's `computed_spent` are derived from the
//! ledger by [`reconcile`](crate::reconcile::reconcile) and never set by users.

use chrono::{Datelike, NaiveDate};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, budget_allocations};

/// The time window a budget applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BudgetScope {
    Month { month: u32, year: i32 },
    Year { year: i32 },
}

impl BudgetScope {
    pub fn validate(&self) -> ResultEngine<()> {
        if let Self::Month { month, .. } = self
            && !(1..=12).contains(month)
        {
            return Err(EngineError::InvalidScope(format!(
                "month must be in 1..=12, got {month}"
            )));
        }
        Ok(())
    }

    /// Whether `date` falls inside the scope.
    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Self::Month { month, year } => date.month() == month && date.year() == year,
            Self::Year { year } => date.year() == year,
        }
    }

    /// Whether this is the current monthly or yearly scope for `today`.
    ///
    /// Selection is by exact scope match: a yearly budget is never active for
    /// another year and a monthly one only in its own month.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.contains(today)
    }

    fn columns(&self) -> (Option<i32>, i32) {
        match *self {
            Self::Month { month, year } => (Some(i32::try_from(month).unwrap_or(0)), year),
            Self::Year { year } => (None, year),
        }
    }

    fn from_columns(month: Option<i32>, year: i32) -> ResultEngine<Self> {
        let scope = match month {
            Some(month) => Self::Month {
                month: u32::try_from(month)
                    .map_err(|_| EngineError::InvalidScope(format!("invalid month {month}")))?,
                year,
            },
            None => Self::Year { year },
        };
        scope.validate()?;
        Ok(scope)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    pub category_id: Uuid,
    pub allocated_limit: i64,
    pub included: bool,
    pub computed_spent: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: String,
    pub scope: BudgetScope,
    pub total_budget: i64,
    pub total_spent: i64,
    pub allocations: Vec<CategoryAllocation>,
}

impl Budget {
    /// Sum of the limits of included categories.
    pub fn allocated(&self) -> i64 {
        self.allocations
            .iter()
            .filter(|a| a.included)
            .map(|a| a.allocated_limit)
            .sum()
    }

    /// Unallocated part of `total_budget`. Never negative for a consistent budget.
    pub fn remaining(&self) -> i64 {
        self.total_budget - self.allocated()
    }

    /// Clamp a requested limit for `category_id`.
    ///
    /// The limit is clamped to `[0, total_budget]` and then lowered so that
    /// the included limits never add up to more than `total_budget`.
    pub fn clamp_limit(&self, category_id: Uuid, requested: i64) -> i64 {
        let others: i64 = self
            .allocations
            .iter()
            .filter(|a| a.included && a.category_id != category_id)
            .map(|a| a.allocated_limit)
            .sum();
        let available = (self.total_budget - others).max(0);
        requested.clamp(0, self.total_budget.max(0)).min(available)
    }

    /// Set the limit of a category (adding an included allocation when absent)
    /// and return the limit actually applied.
    pub fn set_category_limit(&mut self, category_id: Uuid, requested: i64) -> i64 {
        let limit = self.clamp_limit(category_id, requested);
        match self
            .allocations
            .iter_mut()
            .find(|a| a.category_id == category_id)
        {
            Some(allocation) if !allocation.included => {
                allocation.allocated_limit = 0;
                0
            }
            Some(allocation) => {
                allocation.allocated_limit = limit;
                limit
            }
            None => {
                self.allocations.push(CategoryAllocation {
                    category_id,
                    allocated_limit: limit,
                    included: true,
                    computed_spent: 0,
                });
                limit
            }
        }
    }

    /// Include or exclude a category. Excluding zeroes its limit and spend.
    pub fn set_category_included(&mut self, category_id: Uuid, included: bool) {
        match self
            .allocations
            .iter_mut()
            .find(|a| a.category_id == category_id)
        {
            Some(allocation) => {
                allocation.included = included;
                if !included {
                    allocation.allocated_limit = 0;
                    allocation.computed_spent = 0;
                }
            }
            None => self.allocations.push(CategoryAllocation {
                category_id,
                allocated_limit: 0,
                included,
                computed_spent: 0,
            }),
        }
    }

    pub(crate) fn from_models(
        model: Model,
        allocations: Vec<budget_allocations::Model>,
    ) -> ResultEngine<Self> {
        let scope = BudgetScope::from_columns(model.month, model.year)?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            scope,
            total_budget: model.total_budget,
            total_spent: model.total_spent,
            allocations: allocations
                .into_iter()
                .map(|a| CategoryAllocation {
                    category_id: a.category_id,
                    allocated_limit: a.allocated_limit,
                    included: a.included,
                    computed_spent: a.computed_spent,
                })
                .collect(),
        })
    }
}

/// A user edit of one category allocation. `None` leaves the field as is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationChange {
    pub included: Option<bool>,
    pub limit: Option<i64>,
}

/// New derived values for a budget whose spend changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetUpdate {
    pub budget_id: Uuid,
    pub total_spent: i64,
    pub allocations: Vec<CategoryAllocation>,
}

impl BudgetUpdate {
    /// Apply the derived values to `budget`.
    pub fn apply(&self, budget: &mut Budget) {
        budget.total_spent = self.total_spent;
        budget.allocations = self.allocations.clone();
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub month: Option<i32>,
    pub year: i32,
    pub total_budget: i64,
    pub total_spent: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_allocations::Entity")]
    Allocations,
}

impl Related<super::budget_allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        let (month, year) = budget.scope.columns();
        Self {
            id: ActiveValue::Set(budget.id),
            user_id: ActiveValue::Set(budget.user_id.clone()),
            month: ActiveValue::Set(month),
            year: ActiveValue::Set(year),
            total_budget: ActiveValue::Set(budget.total_budget),
            total_spent: ActiveValue::Set(budget.total_spent),
        }
    }
}

pub(crate) fn scope_columns(scope: &BudgetScope) -> (Option<i32>, i32) {
    scope.columns()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(total: i64, allocations: Vec<(Uuid, i64, bool)>) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            scope: BudgetScope::Month {
                month: 3,
                year: 2025,
            },
            total_budget: total,
            total_spent: 0,
            allocations: allocations
                .into_iter()
                .map(|(category_id, allocated_limit, included)| CategoryAllocation {
                    category_id,
                    allocated_limit,
                    included,
                    computed_spent: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn limit_is_clamped_so_remaining_reaches_zero() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut budget = budget(1000, vec![(a, 400, true), (b, 0, true)]);

        let applied = budget.set_category_limit(b, 900);
        assert_eq!(applied, 600);
        assert_eq!(budget.allocated(), 1000);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn limit_is_clamped_to_zero_and_total() {
        let a = Uuid::new_v4();
        let mut budget = budget(500, vec![]);
        assert_eq!(budget.set_category_limit(a, -20), 0);
        assert_eq!(budget.set_category_limit(a, 10_000), 500);
    }

    #[test]
    fn excluded_categories_do_not_count_towards_allocation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut budget = budget(1000, vec![(a, 700, false), (b, 0, true)]);
        assert_eq!(budget.set_category_limit(b, 1000), 1000);
        assert_eq!(budget.set_category_limit(a, 300), 0);
    }

    #[test]
    fn excluding_zeroes_limit_and_spend() {
        let a = Uuid::new_v4();
        let mut budget = budget(1000, vec![(a, 400, true)]);
        budget.allocations[0].computed_spent = 250;
        budget.set_category_included(a, false);
        assert_eq!(budget.allocations[0].allocated_limit, 0);
        assert_eq!(budget.allocations[0].computed_spent, 0);
    }

    #[test]
    fn scope_matches_exact_period() {
        let march = BudgetScope::Month {
            month: 3,
            year: 2025,
        };
        let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert!(march.is_active(date));
        assert!(!march.is_active(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(BudgetScope::Year { year: 2025 }.is_active(date));
        assert!(
            BudgetScope::Month {
                month: 13,
                year: 2025
            }
            .validate()
            .is_err()
        );
    }
}
