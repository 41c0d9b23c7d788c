#![cfg(test)]
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// DB-backed tests run only when a database is reachable and not opted out.
pub fn skip_db_tests() -> bool {
    std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err()
}

fn test_config() -> configs::DatabaseConfig {
    let mut cfg = configs::DatabaseConfig::default();
    cfg.normalize_from_env();
    cfg.max_connections = cfg.max_connections.max(10);
    cfg.min_connections = cfg.min_connections.min(1);
    cfg
}

pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    // Run migrations exactly once, with a throwaway connection
    MIGRATED
        .get_or_init(|| async {
            let db = models::db::connect_with_config(&test_config())
                .await
                .expect("connect db for migration");
            migration::Migrator::up(&db, None).await.expect("migrate up");
            drop(db);
        })
        .await;

    // Return a fresh connection for the current test's runtime
    let db = models::db::connect_with_config(&test_config()).await?;
    Ok(db)
}
