use std::{sync::Arc, time::Duration};

use chrono::Utc;
use chrono_tz::Tz;
use clap::Parser;
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "bilancio")]
#[command(about = "Personal finance backend: ledger, budgets and recurring transactions")]
struct Cli {
    /// Settings file, without extension.
    #[arg(long, env = "BILANCIO_CONFIG", default_value = "settings")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "bilancio={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let timezone = match settings.engine.timezone.as_deref() {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|err| format!("invalid timezone {name}: {err}"))?,
        None => Tz::UTC,
    };

    let db = parse_database(&settings.server.database).await?;
    let engine = engine::Engine::builder()
        .database(db.clone())
        .timezone(timezone)
        .build()
        .await?;
    tracing::info!("engine ready, timezone {timezone}");

    if let Some(scheduler) = settings.scheduler {
        // The server takes its own engine; both share the connection pool.
        let engine = Arc::new(
            engine::Engine::builder()
                .database(db.clone())
                .timezone(timezone)
                .build()
                .await?,
        );
        let period = Duration::from_secs(scheduler.interval_secs.max(1));
        tasks.spawn(async move {
            tracing::info!("recurring scheduler every {}s", period.as_secs());
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                run_scheduled(&engine).await;
            }
        });
    }

    let server = settings.server;
    tasks.spawn(async move {
        let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
        let addr = format!("{}:{}", bind, server.port);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::error!("failed to bind server listener on {addr}: {err}");
                return;
            }
        };
        if server.cron_token.is_none() {
            tracing::warn!("no cron_token configured, POST /cron is disabled");
        }
        if let Err(err) = server::run_with_listener(engine, db, listener, server.cron_token).await {
            tracing::error!("server failed: {err}");
        }
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

/// One scheduler tick: materialize due templates, then refresh the budgets
/// of every user whose ledger changed, as `POST /cron` does.
async fn run_scheduled(engine: &engine::Engine) {
    let now = Utc::now();
    let reports = match engine.run_due_check_all(now).await {
        Ok(reports) => reports,
        Err(err) => {
            tracing::error!("scheduler run failed: {err}");
            return;
        }
    };
    for report in reports.iter().filter(|r| !r.materialized.is_empty()) {
        if let Err(err) = engine.reconcile_budgets(&report.user_id, now).await {
            tracing::warn!(user = %report.user_id, "budget reconciliation failed: {err}");
        }
    }
    let skipped: usize = reports.iter().map(|r| r.skipped.len()).sum();
    tracing::debug!(users = reports.len(), skipped, "scheduler run completed");
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveTime};
    use engine::{BudgetScope, IntervalKind, RecurringNew, ScheduleFields};

    use super::*;

    #[tokio::test]
    async fn scheduled_run_refreshes_budgets_of_changed_users() {
        let db = parse_database(&Database::Memory).await.unwrap();
        let engine = engine::Engine::builder().database(db).build().await.unwrap();
        engine.new_user("alice", "password").await.unwrap();
        let bills = engine.new_category("alice", "Bills").await.unwrap();
        let year = Utc::now().year();
        let budget = engine
            .new_budget("alice", BudgetScope::Year { year }, 10_000, &[(bills.id, 5_000)])
            .await
            .unwrap();
        engine
            .new_recurring(
                "alice",
                RecurringNew {
                    interval: IntervalKind::Daily,
                    schedule: ScheduleFields {
                        time_of_day: Some(NaiveTime::MIN),
                        ..Default::default()
                    },
                    occurrence_count: 1,
                    amount_minor: 1_250,
                    note: None,
                    category_id: bills.id,
                    person_id: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        run_scheduled(&engine).await;

        let stored = engine.budget(budget.id, "alice").await.unwrap();
        assert_eq!(stored.total_spent, 1_250);
        assert_eq!(stored.allocations[0].computed_spent, 1_250);
    }
}
