pub mod admin;
pub mod auth;
pub mod error;
pub mod form;
pub mod home;
pub mod multipart;

use actix_web::http::header;
use actix_web::{error as web_error, Error, HttpResponse};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Select};

/// Configures the web app by adding services from each web file.
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Order is important. Route resolution stops at the first match, and the
    // login page must not be swallowed by the guarded back office routes.
    auth::configure(conf);
    admin::configure(conf);
    home::configure(conf);
}

/// One page of rows plus what the paginator needs.
#[derive(Debug)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_count: usize,
}

/// Fetches page `page` (1-based) of `select`.
///
/// Returns `None` when the page is out of range. Page 1 of an empty table is
/// in range, so empty lists still render.
pub async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page: usize,
    per_page: usize,
) -> Result<Option<PageOf<E::Model>>, DbErr>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
{
    let paginator = select.paginate(db, per_page.max(1));
    let page_count = paginator.num_pages().await?;
    if !page_in_range(page, page_count) {
        return Ok(None);
    }
    let items = paginator.fetch_page(page - 1).await?;
    Ok(Some(PageOf {
        items,
        page,
        page_count: page_count.max(1),
    }))
}

pub fn page_in_range(page: usize, page_count: usize) -> bool {
    page >= 1 && (page <= page_count || page == 1)
}

/// `302 Found` to `location`.
pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location.as_ref()))
        .finish()
}

/// Logs a database failure under `context` and hides it behind a 500.
pub fn db_error(context: &'static str) -> impl Fn(DbErr) -> Error {
    move |e| {
        log::error!("{}: {}", context, e);
        web_error::ErrorInternalServerError("Database error")
    }
}

pub fn page_not_found() -> Error {
    web_error::ErrorNotFound("Page not found")
}

/// Public URL of a stored upload.
pub fn upload_url(stored_name: &str) -> String {
    let prefix = crate::app_config::storage().public_url;
    format!("{}/{}", prefix.trim_end_matches('/'), stored_name)
}

/// Formats a timestamp the way every list page shows it.
pub fn format_time(t: &chrono::NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}
