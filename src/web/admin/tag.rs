//! Tag management: add, paginated list, rename and delete.

use super::{log_operation, CsrfForm, SaveResult};
use crate::flash::{self, FlashMessage};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::AdminCtx;
use crate::orm::{add_time_now, movie, tag};
use crate::template::Paginator;
use crate::web::form::FormErrors;
use crate::web::{db_error, fetch_page, format_time, redirect};
use actix_web::{error, get, post, web, Error, HttpRequest, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::sea_query::Expr;
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr, PaginatorTrait,
    TransactionTrait,
};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_tag_add)
        .service(create_tag)
        .service(view_tag_list_first)
        .service(view_tag_list)
        .service(view_tag_update)
        .service(update_tag)
        .service(remove_tag);
}

#[derive(Deserialize, Validate)]
pub struct TagForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Please enter a tag name."))]
    name: String,
}

impl TagForm {
    fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_owned();
        self
    }
}

/// Inserts a tag unless the name is already taken.
pub async fn insert_tag(
    db: &DatabaseConnection,
    name: &str,
) -> Result<SaveResult<tag::Model>, DbErr> {
    let taken = tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .count(db)
        .await?;
    if taken > 0 {
        return Ok(SaveResult::Duplicate);
    }

    let model = tag::ActiveModel {
        name: Set(name.to_owned()),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(SaveResult::Saved(model))
}

/// Renames `tag`. Keeping the current name is allowed; taking the name of a
/// different tag is not.
pub async fn rename_tag(
    db: &DatabaseConnection,
    tag: tag::Model,
    name: &str,
) -> Result<SaveResult<tag::Model>, DbErr> {
    if tag.name != name {
        let taken = tag::Entity::find()
            .filter(tag::Column::Name.eq(name))
            .filter(tag::Column::Id.ne(tag.id))
            .count(db)
            .await?;
        if taken > 0 {
            return Ok(SaveResult::Duplicate);
        }
    }

    let mut active: tag::ActiveModel = tag.into();
    active.name = Set(name.to_owned());
    Ok(SaveResult::Saved(active.update(db).await?))
}

/// Deletes a tag without looking at the movies that use it. Those movies
/// lose their tag (`tag_id` becomes NULL) but are kept.
///
/// Returns the deleted tag and the number of orphaned movies, or `None` if
/// no tag has that id.
pub async fn delete_tag(
    db: &DatabaseConnection,
    tag_id: i32,
) -> Result<Option<(tag::Model, u64)>, DbErr> {
    let tag = match tag::Entity::find_by_id(tag_id).one(db).await? {
        Some(tag) => tag,
        None => return Ok(None),
    };

    let txn = db.begin().await?;
    let orphaned = movie::Entity::update_many()
        .col_expr(movie::Column::TagId, Expr::value(Option::<i32>::None))
        .filter(movie::Column::TagId.eq(tag_id))
        .exec(&txn)
        .await?
        .rows_affected;
    tag::Entity::delete_by_id(tag_id).exec(&txn).await?;
    txn.commit().await?;

    Ok(Some((tag, orphaned)))
}

async fn find_tag(db: &DatabaseConnection, tag_id: i32) -> Result<tag::Model, Error> {
    tag::Entity::find_by_id(tag_id)
        .one(db)
        .await
        .map_err(db_error("find_tag"))?
        .ok_or_else(|| error::ErrorNotFound("Tag not found"))
}

#[derive(Template)]
#[template(path = "admin/tag_add.html")]
struct TagAddTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    name: String,
    errors: FormErrors,
}

/// GET /admin/tag/add
#[get("/admin/tag/add")]
async fn view_tag_add(admin: AdminCtx) -> impl Responder {
    TagAddTemplate {
        flashes: admin.flashes(),
        admin,
        name: String::new(),
        errors: FormErrors::new(),
    }
    .to_response()
}

/// POST /admin/tag/add
#[post("/admin/tag/add")]
async fn create_tag(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    form: web::Form<TagForm>,
) -> Result<impl Responder, Error> {
    validate_csrf_token(admin.session(), &form.csrf_token)?;
    let form = form.into_inner().trimmed();

    let errors = FormErrors::validate(&form);
    if !errors.is_empty() {
        return Ok(TagAddTemplate {
            flashes: admin.flashes(),
            admin,
            name: form.name,
            errors,
        }
        .to_response());
    }

    match insert_tag(&db, &form.name)
        .await
        .map_err(db_error("create_tag"))?
    {
        SaveResult::Duplicate => {
            flash::error(
                admin.session(),
                format!("Tag \"{}\" already exists!", form.name),
            )?;
        }
        SaveResult::Saved(tag) => {
            log_operation(&db, &admin, &req, format!("Added tag \"{}\"", tag.name)).await?;
            flash::ok(admin.session(), format!("Added tag \"{}\".", tag.name))?;
        }
    }

    Ok(redirect("/admin/tag/add"))
}

struct TagRow {
    id: i32,
    name: String,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/tag_list.html")]
struct TagListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    tags: Vec<TagRow>,
    paginator: Paginator,
}

/// GET /admin/tag/list - First page
#[get("/admin/tag/list")]
async fn view_tag_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_tag_list(admin, &db, 1).await
}

/// GET /admin/tag/list/{page} - Newest first
#[get("/admin/tag/list/{page}")]
async fn view_tag_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_tag_list(admin, &db, path.into_inner()).await
}

async fn render_tag_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let per_page = crate::app_config::limits().admin_page_size as usize;
    let page = fetch_page(
        db,
        tag::Entity::find().order_by_desc(tag::Column::AddTime),
        page,
        per_page,
    )
    .await
    .map_err(db_error("view_tag_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let tags = page
        .items
        .into_iter()
        .map(|t| TagRow {
            id: t.id,
            name: t.name,
            add_time: format_time(&t.add_time),
        })
        .collect();

    Ok(TagListTemplate {
        flashes: admin.flashes(),
        admin,
        tags,
        paginator: Paginator::new("/admin/tag/list/", page.page, page.page_count),
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "admin/tag_update.html")]
struct TagUpdateTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    tag: tag::Model,
    name: String,
    errors: FormErrors,
}

/// GET /admin/tag/update/{id}
#[get("/admin/tag/update/{id}")]
async fn view_tag_update(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let tag = find_tag(&db, path.into_inner()).await?;

    Ok(TagUpdateTemplate {
        flashes: admin.flashes(),
        admin,
        name: tag.name.clone(),
        tag,
        errors: FormErrors::new(),
    }
    .to_response())
}

/// POST /admin/tag/update/{id}
#[post("/admin/tag/update/{id}")]
async fn update_tag(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<TagForm>,
) -> Result<impl Responder, Error> {
    validate_csrf_token(admin.session(), &form.csrf_token)?;
    let tag_id = path.into_inner();
    let tag = find_tag(&db, tag_id).await?;
    let form = form.into_inner().trimmed();

    let errors = FormErrors::validate(&form);
    if !errors.is_empty() {
        return Ok(TagUpdateTemplate {
            flashes: admin.flashes(),
            admin,
            tag,
            name: form.name,
            errors,
        }
        .to_response());
    }

    let old_name = tag.name.clone();
    match rename_tag(&db, tag, &form.name)
        .await
        .map_err(db_error("update_tag"))?
    {
        SaveResult::Duplicate => {
            flash::error(
                admin.session(),
                format!("Tag \"{}\" already exists!", form.name),
            )?;
        }
        SaveResult::Saved(tag) => {
            let message = format!("Renamed tag \"{}\" to \"{}\".", old_name, tag.name);
            log_operation(&db, &admin, &req, message.clone()).await?;
            flash::ok(admin.session(), message)?;
        }
    }

    Ok(redirect(format!("/admin/tag/update/{}", tag_id)))
}

/// POST /admin/tag/delete/{id}
#[post("/admin/tag/delete/{id}")]
async fn remove_tag(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<impl Responder, Error> {
    validate_csrf_token(admin.session(), &form.csrf_token)?;

    let (tag, orphaned) = delete_tag(&db, path.into_inner())
        .await
        .map_err(db_error("remove_tag"))?
        .ok_or_else(|| error::ErrorNotFound("Tag not found"))?;

    if orphaned > 0 {
        log::warn!(
            "Tag {} ('{}') deleted while {} movies still used it",
            tag.id,
            tag.name,
            orphaned
        );
    }
    log_operation(&db, &admin, &req, format!("Deleted tag \"{}\"", tag.name)).await?;
    flash::ok(admin.session(), format!("Deleted tag \"{}\".", tag.name))?;

    Ok(redirect("/admin/tag/list/1"))
}
