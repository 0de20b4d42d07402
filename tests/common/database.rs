//! Test database setup
#![allow(dead_code)]

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// A fresh in-memory SQLite database with every table created.
///
/// The pool is pinned to a single connection because each SQLite
/// connection to `:memory:` opens its own, empty database.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    moviesite::db::create_tables(&db).await?;
    Ok(db)
}
