use chrono::{TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, EngineError, NotificationKind, TransactionListFilter, TransactionNew, TransactionUpdate};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for user in ["alice", "bob"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![user.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn expense(category_id: Uuid, amount_minor: i64) -> TransactionNew {
    TransactionNew {
        amount_minor,
        note: None,
        category_id,
        person_id: None,
        created_at: None,
    }
}

#[tokio::test]
async fn new_transaction_snapshots_category_and_person() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let food = engine.new_category("alice", "Food").await.unwrap();
    let person = engine.new_person("alice", "  Marco ").await.unwrap();

    let tx = engine
        .new_transaction(
            "alice",
            TransactionNew {
                person_id: Some(person.id),
                note: Some("  pizza  ".to_string()),
                ..expense(food.id, 1250)
            },
            now,
        )
        .await
        .unwrap();

    assert_eq!(tx.category.name, "Food");
    assert_eq!(tx.person.as_ref().map(|p| p.name.as_str()), Some("Marco"));
    assert_eq!(tx.note.as_deref(), Some("pizza"));
    assert_eq!(tx.created_at, now);
    assert!(!tx.recurring);

    let stored = engine.transaction(tx.id, "alice").await.unwrap();
    assert_eq!(stored, tx);
}

#[tokio::test]
async fn renaming_category_keeps_existing_snapshots() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let food = engine.new_category("alice", "Food").await.unwrap();
    let tx = engine
        .new_transaction("alice", expense(food.id, 500), now)
        .await
        .unwrap();

    engine
        .update_category("alice", food.id, Some("Groceries"), None)
        .await
        .unwrap();

    let stored = engine.transaction(tx.id, "alice").await.unwrap();
    assert_eq!(stored.category.name, "Food");

    let next = engine
        .new_transaction("alice", expense(food.id, 700), now)
        .await
        .unwrap();
    assert_eq!(next.category.name, "Groceries");
}

#[tokio::test]
async fn category_names_are_unique_ignoring_case() {
    let (engine, _db) = engine_with_db().await;
    engine.new_category("alice", "Food").await.unwrap();

    let err = engine.new_category("alice", "  FOOD ").await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("Food".to_string()));

    // Other users have their own namespace.
    engine.new_category("bob", "food").await.unwrap();

    let err = engine.new_category("alice", "   ").await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn invalid_amount_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();

    let err = engine
        .new_transaction("alice", expense(food.id, 0), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn foreign_category_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let bobs = engine.new_category("bob", "Food").await.unwrap();

    let err = engine
        .new_transaction("alice", expense(bobs.id, 100), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn update_sets_edited_at() {
    let (engine, _db) = engine_with_db().await;
    let created = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let edited = Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap();
    let food = engine.new_category("alice", "Food").await.unwrap();
    let tx = engine
        .new_transaction("alice", expense(food.id, 500), created)
        .await
        .unwrap();

    let updated = engine
        .update_transaction(
            tx.id,
            "alice",
            TransactionUpdate {
                amount_minor: Some(650),
                note: Some(Some("lunch".to_string())),
                created_at: None,
            },
            edited,
        )
        .await
        .unwrap();

    assert_eq!(updated.amount_minor, 650);
    assert_eq!(updated.note.as_deref(), Some("lunch"));
    assert_eq!(updated.created_at, created);
    assert_eq!(updated.edited_at, Some(edited));
}

#[tokio::test]
async fn list_filters_by_range_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.new_category("alice", "Food").await.unwrap();
    let rent = engine.new_category("alice", "Rent").await.unwrap();
    for (day, category, amount) in [(1, food.id, 100), (5, rent.id, 800), (9, food.id, 300)] {
        let at = Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap();
        engine
            .new_transaction(
                "alice",
                TransactionNew {
                    created_at: Some(at),
                    ..expense(category, amount)
                },
                at,
            )
            .await
            .unwrap();
    }

    let all = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    let amounts: Vec<i64> = all.iter().map(|tx| tx.amount_minor).collect();
    assert_eq!(amounts, vec![300, 800, 100]);

    let filter = TransactionListFilter {
        from: Some(Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap()),
        to: Some(Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()),
        category_id: Some(food.id),
    };
    let food_only = engine.list_transactions("alice", &filter).await.unwrap();
    assert_eq!(food_only.len(), 1);
    assert_eq!(food_only[0].amount_minor, 300);

    let bad = TransactionListFilter {
        from: filter.to,
        to: filter.from,
        category_id: None,
    };
    assert!(engine.list_transactions("alice", &bad).await.is_err());
}

#[tokio::test]
async fn delete_moves_to_trash_and_restore_brings_it_back() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let food = engine.new_category("alice", "Food").await.unwrap();
    let tx = engine
        .new_transaction("alice", expense(food.id, 500), now)
        .await
        .unwrap();

    engine.delete_transaction(tx.id, "alice", now).await.unwrap();
    assert!(matches!(
        engine.transaction(tx.id, "alice").await,
        Err(EngineError::KeyNotFound(_))
    ));

    let trash = engine.list_trash("alice").await.unwrap();
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].transaction, tx);
    assert_eq!(trash[0].deleted_at, now);

    let restored = engine.restore_transaction(tx.id, "alice").await.unwrap();
    assert_eq!(restored, tx);
    assert!(engine.list_trash("alice").await.unwrap().is_empty());
    assert_eq!(engine.transaction(tx.id, "alice").await.unwrap(), tx);
}

#[tokio::test]
async fn reminder_creates_unread_notification() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let food = engine.new_category("alice", "Food").await.unwrap();
    let tx = engine
        .new_transaction("alice", expense(food.id, 500), now)
        .await
        .unwrap();

    let reminder = engine.new_reminder("alice", tx.id, now).await.unwrap();
    assert_eq!(reminder.kind, NotificationKind::Reminder);
    assert_eq!(reminder.transaction_id, tx.id);
    assert_eq!(reminder.category_name, "Food");

    let unread = engine.list_notifications("alice", true).await.unwrap();
    assert_eq!(unread.len(), 1);

    let read = engine
        .mark_notification_read(reminder.id, "alice")
        .await
        .unwrap();
    assert!(read.read);
    assert!(engine.list_notifications("alice", true).await.unwrap().is_empty());
    assert_eq!(engine.list_notifications("alice", false).await.unwrap().len(), 1);

    assert!(matches!(
        engine.new_reminder("bob", tx.id, now).await,
        Err(EngineError::KeyNotFound(_))
    ));
}
