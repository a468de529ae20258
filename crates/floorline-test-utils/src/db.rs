//! Database testing utilities.

use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tokio::sync::Mutex;

static DB_LOCK: tokio::sync::OnceCell<Arc<Mutex<()>>> = tokio::sync::OnceCell::const_new();

/// Fresh in-memory SQLite database, no migrations. Callers that need schema
/// should prefer [`setup_test_db_with_migrations`].
pub async fn setup_test_db() -> DatabaseConnection {
    let lock = DB_LOCK
        .get_or_init(|| async { Arc::new(Mutex::new(())) })
        .await;
    let _guard = lock.lock().await;

    Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database")
}

/// Fresh in-memory SQLite database with the given module's migrations applied.
pub async fn setup_test_db_with_migrations<M>() -> DatabaseConnection
where
    M: sea_orm_migration::MigratorTrait,
{
    let lock = DB_LOCK
        .get_or_init(|| async { Arc::new(Mutex::new(())) })
        .await;
    let _guard = lock.lock().await;

    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    M::up(&db, None).await.expect("Failed to run migrations");

    db
}
