//! Audit log pages: administrator operations, administrator logins and
//! member logins. All newest first.

use super::members::{lookup, user_names};
use crate::flash::FlashMessage;
use crate::middleware::AdminCtx;
use crate::orm::{admin, adminlog, operationlog, userlog};
use crate::template::Paginator;
use crate::web::{db_error, fetch_page, format_time};
use actix_web::{get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_oplog_list_first)
        .service(view_oplog_list)
        .service(view_adminloginlog_list_first)
        .service(view_adminloginlog_list)
        .service(view_userloginlog_list_first)
        .service(view_userloginlog_list);
}

async fn admin_names(
    db: &DatabaseConnection,
    ids: impl Iterator<Item = Option<i32>>,
) -> Result<HashMap<i32, String>, DbErr> {
    let mut ids: Vec<i32> = ids.flatten().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(admin::Entity::find()
        .filter(admin::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect())
}

/// One line of any of the three logs. `reason` is empty for logins.
struct LogRow {
    id: i32,
    who: String,
    ip: String,
    reason: String,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/log_list.html")]
struct LogListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    heading: &'static str,
    who_label: &'static str,
    show_reason: bool,
    rows: Vec<LogRow>,
    paginator: Paginator,
}

impl LogListTemplate {
    fn new(admin: AdminCtx, heading: &'static str, rows: Vec<LogRow>, paginator: Paginator) -> Self {
        Self {
            flashes: admin.flashes(),
            admin,
            heading,
            who_label: "Administrator",
            show_reason: false,
            rows,
            paginator,
        }
    }
}

fn per_page() -> usize {
    crate::app_config::limits().admin_page_size as usize
}

#[get("/admin/oplog/list")]
async fn view_oplog_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_oplog_list(admin, &db, 1).await
}

#[get("/admin/oplog/list/{page}")]
async fn view_oplog_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_oplog_list(admin, &db, path.into_inner()).await
}

async fn render_oplog_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        operationlog::Entity::find().order_by_desc(operationlog::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_oplog_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let names = admin_names(db, page.items.iter().map(|l| l.admin_id))
        .await
        .map_err(db_error("view_oplog_list"))?;
    let rows = page
        .items
        .into_iter()
        .map(|l| LogRow {
            id: l.id,
            who: lookup(&names, l.admin_id),
            ip: l.ip,
            reason: l.reason,
            add_time: format_time(&l.add_time),
        })
        .collect();

    let mut template = LogListTemplate::new(
        admin,
        "Operation log",
        rows,
        Paginator::new("/admin/oplog/list/", page.page, page.page_count),
    );
    template.show_reason = true;
    Ok(template.to_response())
}

#[get("/admin/adminloginlog/list")]
async fn view_adminloginlog_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_adminloginlog_list(admin, &db, 1).await
}

#[get("/admin/adminloginlog/list/{page}")]
async fn view_adminloginlog_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_adminloginlog_list(admin, &db, path.into_inner()).await
}

async fn render_adminloginlog_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        adminlog::Entity::find().order_by_desc(adminlog::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_adminloginlog_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let names = admin_names(db, page.items.iter().map(|l| l.admin_id))
        .await
        .map_err(db_error("view_adminloginlog_list"))?;
    let rows = page
        .items
        .into_iter()
        .map(|l| LogRow {
            id: l.id,
            who: lookup(&names, l.admin_id),
            ip: l.ip,
            reason: String::new(),
            add_time: format_time(&l.add_time),
        })
        .collect();

    Ok(LogListTemplate::new(
        admin,
        "Administrator logins",
        rows,
        Paginator::new("/admin/adminloginlog/list/", page.page, page.page_count),
    )
    .to_response())
}

#[get("/admin/userloginlog/list")]
async fn view_userloginlog_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_userloginlog_list(admin, &db, 1).await
}

#[get("/admin/userloginlog/list/{page}")]
async fn view_userloginlog_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_userloginlog_list(admin, &db, path.into_inner()).await
}

async fn render_userloginlog_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        userlog::Entity::find().order_by_desc(userlog::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_userloginlog_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let names = user_names(db, page.items.iter().map(|l| l.user_id))
        .await
        .map_err(db_error("view_userloginlog_list"))?;
    let rows = page
        .items
        .into_iter()
        .map(|l| LogRow {
            id: l.id,
            who: lookup(&names, l.user_id),
            ip: l.ip,
            reason: String::new(),
            add_time: format_time(&l.add_time),
        })
        .collect();

    let mut template = LogListTemplate::new(
        admin,
        "Member logins",
        rows,
        Paginator::new("/admin/userloginlog/list/", page.page, page.page_count),
    );
    template.who_label = "Member";
    Ok(template.to_response())
}
