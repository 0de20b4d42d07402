//! Creates a super administrator so a fresh install can log in.
//!
//! Usage: `create-admin <name> <password>`

use anyhow::{bail, Context};
use env_logger::Env;
use moviesite::orm::{add_time_now, admin, role};
use moviesite::web::admin::access::insert_admin;
use moviesite::web::admin::SaveResult;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection};

const SUPER_ROLE_NAME: &str = "Super administrator";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let (name, password) = match (args.next(), args.next()) {
        (Some(name), Some(password)) if !name.trim().is_empty() && !password.is_empty() => {
            (name.trim().to_owned(), password)
        }
        _ => bail!("usage: create-admin <name> <password>"),
    };

    let config = moviesite::app_config::get_config();
    let db = moviesite::db::connect(&config.database.url)
        .await
        .context("connecting to the database")?;
    moviesite::db::create_tables(&db)
        .await
        .context("creating tables")?;

    let role_id = ensure_super_role(&db).await?;
    let hash = moviesite::session::hash_password(&password)
        .map_err(|e| anyhow::anyhow!("hashing password: {}", e))?;

    match insert_admin(&db, &name, hash, Some(role_id), admin::SUPER_ADMIN)
        .await
        .context("inserting administrator")?
    {
        SaveResult::Saved(created) => {
            log::info!("Created super administrator {} ({})", created.name, created.id);
            Ok(())
        }
        SaveResult::Duplicate => bail!("administrator {:?} already exists", name),
    }
}

async fn ensure_super_role(db: &DatabaseConnection) -> anyhow::Result<i32> {
    if let Some(existing) = role::Entity::find()
        .filter(role::Column::Name.eq(SUPER_ROLE_NAME))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }

    let created = role::ActiveModel {
        name: Set(SUPER_ROLE_NAME.to_owned()),
        authorities: Set(String::new()),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .context("creating the super administrator role")?;
    log::info!("Created role {:?}", created.name);
    Ok(created.id)
}
