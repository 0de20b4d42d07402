//! Back office: every route here takes an [`AdminCtx`] and therefore
//! redirects to the login page when nobody is logged in.

pub mod access;
pub mod logs;
pub mod members;
pub mod movie;
pub mod preview;
pub mod tag;

use crate::audit;
use crate::flash::FlashMessage;
use crate::ip::client_ip_or_unknown;
use crate::middleware::AdminCtx;
use crate::orm::{comment, movie as movie_orm, preview as preview_orm, tag as tag_orm, user};
use actix_web::{get, web, Error, HttpRequest, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use serde::Deserialize;

use super::db_error;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_dashboard);
    tag::configure(conf);
    movie::configure(conf);
    preview::configure(conf);
    members::configure(conf);
    logs::configure(conf);
    access::configure(conf);
}

/// Outcome of an insert or update guarded by a uniqueness rule.
#[derive(Debug)]
pub enum SaveResult<T> {
    Saved(T),
    /// Another row already uses the unique value.
    Duplicate,
}

impl<T> SaveResult<T> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, SaveResult::Duplicate)
    }
}

/// Body of forms that only carry the CSRF token, like delete buttons.
#[derive(Deserialize)]
pub struct CsrfForm {
    #[serde(default)]
    pub csrf_token: String,
}

/// Records an operationlog row for the current administrator.
pub(crate) async fn log_operation(
    db: &DatabaseConnection,
    admin: &AdminCtx,
    req: &HttpRequest,
    reason: String,
) -> Result<(), Error> {
    audit::record_operation(db, admin.id(), &client_ip_or_unknown(req), &reason)
        .await
        .map_err(db_error("log_operation"))?;
    log::info!("admin {} ({}): {}", admin.name(), admin.id(), reason);
    Ok(())
}

#[derive(Template)]
#[template(path = "admin/index.html")]
struct DashboardTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    movie_count: u64,
    tag_count: u64,
    preview_count: u64,
    user_count: u64,
    comment_count: u64,
}

#[get("/admin")]
async fn view_dashboard(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    let db = db.get_ref();

    let movie_count = count(db, movie_orm::Entity).await?;
    let tag_count = count(db, tag_orm::Entity).await?;
    let preview_count = count(db, preview_orm::Entity).await?;
    let user_count = count(db, user::Entity).await?;
    let comment_count = count(db, comment::Entity).await?;

    Ok(DashboardTemplate {
        flashes: admin.flashes(),
        admin,
        movie_count,
        tag_count,
        preview_count,
        user_count,
        comment_count,
    }
    .to_response())
}

async fn count<E>(db: &DatabaseConnection, entity: E) -> Result<u64, Error>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
{
    let rows = E::find()
        .count(db)
        .await
        .map_err(db_error("view_dashboard"))?;
    log::trace!("{} has {} rows", entity.table_name(), rows);
    Ok(rows as u64)
}
