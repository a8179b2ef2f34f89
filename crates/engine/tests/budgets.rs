use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{AllocationChange, BudgetScope, Engine, EngineError, TransactionNew};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

const MARCH: BudgetScope = BudgetScope::Month {
    month: 3,
    year: 2025,
};

async fn spend(engine: &Engine, category_id: Uuid, amount_minor: i64, when: DateTime<Utc>) {
    engine
        .new_transaction(
            "alice",
            TransactionNew {
                amount_minor,
                note: None,
                category_id,
                person_id: None,
                created_at: Some(when),
            },
            when,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn reconcile_sums_spend_of_current_month() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();
    let budget = engine
        .new_budget("alice", MARCH, 1000, &[(food.id, 400)])
        .await
        .unwrap();

    spend(&engine, food.id, 150, at(2025, 3, 2)).await;
    spend(&engine, food.id, 100, at(2025, 3, 15)).await;
    // Outside the scope.
    spend(&engine, food.id, 999, at(2025, 2, 28)).await;

    let updates = engine
        .reconcile_budgets("alice", at(2025, 3, 20))
        .await
        .unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].total_spent, 250);

    let stored = engine.budget(budget.id, "alice").await.unwrap();
    assert_eq!(stored.total_spent, 250);
    assert_eq!(stored.allocations[0].computed_spent, 250);
    assert_eq!(stored.allocations[0].allocated_limit, 400);

    // Nothing changed since the last pass.
    let again = engine
        .reconcile_budgets("alice", at(2025, 3, 21))
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn reconcile_ignores_inactive_budgets() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();
    let february = engine
        .new_budget(
            "alice",
            BudgetScope::Month {
                month: 2,
                year: 2025,
            },
            1000,
            &[(food.id, 400)],
        )
        .await
        .unwrap();
    spend(&engine, food.id, 150, at(2025, 2, 2)).await;

    let updates = engine
        .reconcile_budgets("alice", at(2025, 3, 20))
        .await
        .unwrap();
    assert!(updates.is_empty());
    assert_eq!(
        engine.budget(february.id, "alice").await.unwrap().total_spent,
        0
    );
}

#[tokio::test]
async fn excluded_category_does_not_count() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();
    let fun = engine.new_category("alice", "Fun").await.unwrap();
    let budget = engine
        .new_budget("alice", MARCH, 1000, &[(food.id, 400), (fun.id, 200)])
        .await
        .unwrap();
    spend(&engine, food.id, 150, at(2025, 3, 2)).await;
    spend(&engine, fun.id, 80, at(2025, 3, 3)).await;

    engine
        .reconcile_budgets("alice", at(2025, 3, 20))
        .await
        .unwrap();
    assert_eq!(
        engine.budget(budget.id, "alice").await.unwrap().total_spent,
        230
    );

    let excluded = engine
        .set_category_included(budget.id, "alice", fun.id, false)
        .await
        .unwrap();
    assert_eq!(excluded.allocated(), 400);

    engine
        .reconcile_budgets("alice", at(2025, 3, 20))
        .await
        .unwrap();
    let stored = engine.budget(budget.id, "alice").await.unwrap();
    assert_eq!(stored.total_spent, 150);
    let fun_allocation = stored
        .allocations
        .iter()
        .find(|a| a.category_id == fun.id)
        .unwrap();
    assert!(!fun_allocation.included);
    assert_eq!(fun_allocation.allocated_limit, 0);
    assert_eq!(fun_allocation.computed_spent, 0);
}

#[tokio::test]
async fn allocation_change_is_applied_as_a_whole() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();
    let fun = engine.new_category("alice", "Fun").await.unwrap();
    let budget = engine
        .new_budget("alice", MARCH, 1000, &[(food.id, 400), (fun.id, 200)])
        .await
        .unwrap();

    let (updated, applied) = engine
        .update_allocation(
            budget.id,
            "alice",
            fun.id,
            AllocationChange {
                included: Some(false),
                limit: Some(300),
            },
        )
        .await
        .unwrap();
    assert_eq!(applied, Some(0));
    assert_eq!(updated.allocated(), 400);

    // A failing change leaves the stored allocations untouched.
    let err = engine
        .update_allocation(
            budget.id,
            "alice",
            Uuid::new_v4(),
            AllocationChange {
                included: Some(true),
                limit: Some(100),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let stored = engine.budget(budget.id, "alice").await.unwrap();
    assert_eq!(stored.allocations.len(), 2);
    assert_eq!(stored.allocated(), 400);
    let fun_allocation = stored
        .allocations
        .iter()
        .find(|a| a.category_id == fun.id)
        .unwrap();
    assert!(!fun_allocation.included);
    assert_eq!(fun_allocation.allocated_limit, 0);
}

#[tokio::test]
async fn category_limit_is_clamped_to_remaining() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();
    let rent = engine.new_category("alice", "Rent").await.unwrap();
    let budget = engine
        .new_budget("alice", MARCH, 1000, &[(food.id, 400)])
        .await
        .unwrap();

    let applied = engine
        .set_category_limit(budget.id, "alice", rent.id, 900)
        .await
        .unwrap();
    assert_eq!(applied, 600);

    let stored = engine.budget(budget.id, "alice").await.unwrap();
    assert_eq!(stored.allocated(), 1000);
    assert_eq!(stored.remaining(), 0);

    let err = engine
        .set_total_budget(budget.id, "alice", 900)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let raised = engine
        .set_total_budget(budget.id, "alice", 1500)
        .await
        .unwrap();
    assert_eq!(raised.remaining(), 500);
}

#[tokio::test]
async fn one_budget_per_scope() {
    let (engine, _db) = engine_with_db().await;
    engine.new_budget("alice", MARCH, 1000, &[]).await.unwrap();

    let err = engine.new_budget("alice", MARCH, 500, &[]).await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // A yearly budget for the same year is a different scope.
    engine
        .new_budget("alice", BudgetScope::Year { year: 2025 }, 12000, &[])
        .await
        .unwrap();
    assert_eq!(engine.list_budgets("alice").await.unwrap().len(), 2);

    let err = engine
        .new_budget(
            "alice",
            BudgetScope::Month {
                month: 13,
                year: 2025,
            },
            100,
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidScope(_)));
}

#[tokio::test]
async fn yearly_and_monthly_budgets_reconcile_together() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();
    let monthly = engine
        .new_budget("alice", MARCH, 1000, &[(food.id, 500)])
        .await
        .unwrap();
    let yearly = engine
        .new_budget(
            "alice",
            BudgetScope::Year { year: 2025 },
            10000,
            &[(food.id, 5000)],
        )
        .await
        .unwrap();
    spend(&engine, food.id, 300, at(2025, 1, 10)).await;
    spend(&engine, food.id, 200, at(2025, 3, 10)).await;

    engine
        .reconcile_budgets("alice", at(2025, 3, 20))
        .await
        .unwrap();

    assert_eq!(
        engine.budget(monthly.id, "alice").await.unwrap().total_spent,
        200
    );
    assert_eq!(
        engine.budget(yearly.id, "alice").await.unwrap().total_spent,
        500
    );
}

#[tokio::test]
async fn delete_budget_removes_allocations() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();
    let budget = engine
        .new_budget("alice", MARCH, 1000, &[(food.id, 400)])
        .await
        .unwrap();

    engine.delete_budget(budget.id, "alice").await.unwrap();
    assert!(matches!(
        engine.budget(budget.id, "alice").await,
        Err(EngineError::KeyNotFound(_))
    ));
    // The scope is free again.
    engine.new_budget("alice", MARCH, 1000, &[]).await.unwrap();
}
