//! Database connection and schema bootstrap.

use crate::orm;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};

/// Opens a connection pool for the given sea-orm URL.
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(url).await?;
    log::info!("Connected to {:?} database", db.get_database_backend());
    Ok(db)
}

/// Creates every table from the entity definitions, skipping tables that exist.
///
/// Parents are created before children so foreign keys resolve on backends
/// that check them at creation time.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, orm::role::Entity).await?;
    create_table(db, orm::authority::Entity).await?;
    create_table(db, orm::admin::Entity).await?;
    create_table(db, orm::adminlog::Entity).await?;
    create_table(db, orm::operationlog::Entity).await?;
    create_table(db, orm::user::Entity).await?;
    create_table(db, orm::userlog::Entity).await?;
    create_table(db, orm::tag::Entity).await?;
    create_table(db, orm::movie::Entity).await?;
    create_table(db, orm::preview::Entity).await?;
    create_table(db, orm::comment::Entity).await?;
    create_table(db, orm::collection::Entity).await?;
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    log::debug!("Ensured table {}", entity.table_name());
    Ok(())
}
