//! Budget reconciliation.
//!
//! Spend is always recomputed from the full ledger; stored values are only a
//! cache of the last pass. A ledger entry that lands while a pass is running
//! is picked up by the next one.

use std::collections::HashMap;

use chrono::TimeZone;
use uuid::Uuid;

use crate::{Budget, BudgetUpdate, CategoryAllocation, Transaction};

/// Recompute the derived fields of the active budgets.
///
/// The active budgets are the monthly one whose scope is the month of `now`
/// and the yearly one whose scope is the year of `now`, compared in the
/// timezone of `now`. Ledger dates are converted to the same timezone.
///
/// Returns only the budgets whose `total_spent` or allocations changed.
pub fn reconcile<Tz: TimeZone>(
    ledger: &[Transaction],
    budgets: &[Budget],
    now: &chrono::DateTime<Tz>,
) -> Vec<BudgetUpdate> {
    let tz = now.timezone();
    let today = now.date_naive();

    budgets
        .iter()
        .filter(|budget| budget.scope.is_active(today))
        .filter_map(|budget| {
            let mut spent_by_category: HashMap<Uuid, i64> = HashMap::new();
            for tx in ledger {
                let local_date = tx.created_at.with_timezone(&tz).date_naive();
                if budget.scope.contains(local_date) {
                    *spent_by_category.entry(tx.category.id).or_insert(0) += tx.amount_minor;
                }
            }

            let allocations: Vec<CategoryAllocation> = budget
                .allocations
                .iter()
                .map(|allocation| {
                    if allocation.included {
                        CategoryAllocation {
                            computed_spent: spent_by_category
                                .get(&allocation.category_id)
                                .copied()
                                .unwrap_or(0),
                            ..allocation.clone()
                        }
                    } else {
                        CategoryAllocation {
                            allocated_limit: 0,
                            computed_spent: 0,
                            ..allocation.clone()
                        }
                    }
                })
                .collect();
            let total_spent = allocations
                .iter()
                .filter(|a| a.included)
                .map(|a| a.computed_spent)
                .sum();

            (total_spent != budget.total_spent || allocations != budget.allocations).then(|| {
                BudgetUpdate {
                    budget_id: budget.id,
                    total_spent,
                    allocations,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::{BudgetScope, CategorySnapshot};

    fn ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn tx(category: Uuid, amount_minor: i64, created_at: &str) -> Transaction {
        Transaction::new(
            "alice".to_string(),
            amount_minor,
            None,
            CategorySnapshot {
                id: category,
                name: "Food".to_string(),
            },
            None,
            ts(created_at),
        )
        .unwrap()
    }

    fn march_budget(allocations: Vec<CategoryAllocation>) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            scope: BudgetScope::Month {
                month: 3,
                year: 2025,
            },
            total_budget: 1000,
            total_spent: 0,
            allocations,
        }
    }

    fn allocation(category_id: Uuid, limit: i64, included: bool) -> CategoryAllocation {
        CategoryAllocation {
            category_id,
            allocated_limit: limit,
            included,
            computed_spent: 0,
        }
    }

    #[test]
    fn sums_spend_per_category_in_scope() {
        let a = Uuid::new_v4();
        let budget = march_budget(vec![allocation(a, 400, true)]);
        let ledger = vec![
            tx(a, 150, "2025-03-02T10:00:00Z"),
            tx(a, 100, "2025-03-20T10:00:00Z"),
            tx(a, 999, "2025-02-27T10:00:00Z"),
            tx(Uuid::new_v4(), 50, "2025-03-03T10:00:00Z"),
        ];

        let updates = reconcile(&ledger, &[budget.clone()], &ts("2025-03-25T12:00:00Z"));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].budget_id, budget.id);
        assert_eq!(updates[0].total_spent, 250);
        assert_eq!(updates[0].allocations[0].computed_spent, 250);
    }

    #[test]
    fn is_idempotent() {
        let a = Uuid::new_v4();
        let mut budget = march_budget(vec![allocation(a, 400, true)]);
        let ledger = vec![tx(a, 150, "2025-03-02T10:00:00Z")];
        let now = ts("2025-03-25T12:00:00Z");

        let first = reconcile(&ledger, &[budget.clone()], &now);
        first[0].apply(&mut budget);
        let second = reconcile(&ledger, &[budget.clone()], &now);
        assert!(second.is_empty());
        assert_eq!(budget.total_spent, 150);
    }

    #[test]
    fn excluded_category_is_zeroed() {
        let a = Uuid::new_v4();
        let mut excluded = allocation(a, 300, false);
        excluded.computed_spent = 120;
        let budget = march_budget(vec![excluded]);
        let ledger = vec![tx(a, 150, "2025-03-02T10:00:00Z")];

        let updates = reconcile(&ledger, &[budget], &ts("2025-03-25T12:00:00Z"));
        assert_eq!(updates[0].total_spent, 0);
        assert_eq!(updates[0].allocations[0].allocated_limit, 0);
        assert_eq!(updates[0].allocations[0].computed_spent, 0);
    }

    #[test]
    fn only_active_scopes_are_recomputed() {
        let a = Uuid::new_v4();
        let mut yearly = march_budget(vec![allocation(a, 0, true)]);
        yearly.scope = BudgetScope::Year { year: 2025 };
        let mut last_year = yearly.clone();
        last_year.id = Uuid::new_v4();
        last_year.scope = BudgetScope::Year { year: 2024 };
        let ledger = vec![
            tx(a, 10, "2025-01-02T10:00:00Z"),
            tx(a, 20, "2025-03-02T10:00:00Z"),
            tx(a, 40, "2024-12-31T10:00:00Z"),
        ];

        let updates = reconcile(&ledger, &[yearly.clone(), last_year], &ts("2025-03-25T12:00:00Z"));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].budget_id, yearly.id);
        assert_eq!(updates[0].total_spent, 30);
    }

    #[test]
    fn ledger_dates_use_the_timezone_of_now() {
        let a = Uuid::new_v4();
        let budget = march_budget(vec![allocation(a, 0, true)]);
        // 23:30 UTC on 28 Feb is already 1 March in Rome.
        let ledger = vec![tx(a, 70, "2025-02-28T23:30:00Z")];
        let now = ts("2025-03-10T12:00:00Z").with_timezone(&chrono_tz::Europe::Rome);

        let updates = reconcile(&ledger, &[budget], &now);
        assert_eq!(updates[0].total_spent, 70);
    }
}
