//! Preview (teaser) records: a title and a cover image.

use super::{log_operation, CsrfForm, SaveResult};
use crate::flash::{self, FlashMessage};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::AdminCtx;
use crate::orm::{add_time_now, preview};
use crate::storage::LocalStorage;
use crate::template::Paginator;
use crate::web::form::FormErrors;
use crate::web::multipart::{read_multipart, MultipartForm};
use crate::web::{db_error, fetch_page, format_time, redirect, upload_url};
use actix_multipart::Multipart;
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr, PaginatorTrait};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_preview_add)
        .service(create_preview)
        .service(view_preview_list_first)
        .service(view_preview_list)
        .service(remove_preview);
}

/// Text fields of the preview form; the cover arrives as a file part.
#[derive(Clone, Debug, Default, Validate)]
pub struct PreviewForm {
    #[validate(length(min = 1, max = 255, message = "Please enter a title."))]
    pub title: String,
}

impl PreviewForm {
    pub fn from_multipart(form: &MultipartForm) -> Self {
        Self {
            title: form.text("title"),
        }
    }
}

pub async fn insert_preview(
    db: &DatabaseConnection,
    title: &str,
    cover: String,
) -> Result<SaveResult<preview::Model>, DbErr> {
    let taken = preview::Entity::find()
        .filter(preview::Column::Title.eq(title))
        .count(db)
        .await?;
    if taken > 0 {
        return Ok(SaveResult::Duplicate);
    }

    let model = preview::ActiveModel {
        title: Set(title.to_owned()),
        cover: Set(cover),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(SaveResult::Saved(model))
}

#[derive(Template)]
#[template(path = "admin/preview_add.html")]
struct PreviewAddTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    title: String,
    errors: FormErrors,
}

#[get("/admin/preview/add")]
async fn view_preview_add(admin: AdminCtx) -> impl Responder {
    PreviewAddTemplate {
        flashes: admin.flashes(),
        admin,
        title: String::new(),
        errors: FormErrors::new(),
    }
    .to_response()
}

#[post("/admin/preview/add")]
async fn create_preview(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<LocalStorage>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let max_bytes = crate::app_config::storage().max_upload_bytes();
    let mut upload = read_multipart(payload, max_bytes).await?;
    validate_csrf_token(admin.session(), &upload.text("csrf_token"))?;

    let form = PreviewForm::from_multipart(&upload);
    let mut errors = FormErrors::validate(&form);
    let title = form.title;
    let cover = upload.take_file("cover");
    if cover.is_none() {
        errors.add("cover", "Please upload a cover image.");
    }

    let cover = match cover {
        Some(cover) if errors.is_empty() => cover,
        _ => {
            return Ok(PreviewAddTemplate {
                flashes: admin.flashes(),
                admin,
                title,
                errors,
            }
            .to_response())
        }
    };

    let taken = preview::Entity::find()
        .filter(preview::Column::Title.eq(title.as_str()))
        .count(db.get_ref())
        .await
        .map_err(db_error("create_preview"))?;
    if taken > 0 {
        flash::error(admin.session(), format!("Preview \"{}\" already exists!", title))?;
        return Ok(redirect("/admin/preview/add"));
    }

    let cover = storage.save(cover).await.map_err(|e| {
        log::error!("create_preview: {}", e);
        error::ErrorInternalServerError("Could not store the uploaded file")
    })?;

    match insert_preview(&db, &title, cover)
        .await
        .map_err(db_error("create_preview"))?
    {
        SaveResult::Duplicate => {
            flash::error(admin.session(), format!("Preview \"{}\" already exists!", title))?;
        }
        SaveResult::Saved(preview) => {
            log_operation(&db, &admin, &req, format!("Added preview \"{}\"", preview.title))
                .await?;
            flash::ok(admin.session(), format!("Added preview \"{}\".", preview.title))?;
        }
    }

    Ok(redirect("/admin/preview/add"))
}

struct PreviewRow {
    id: i32,
    title: String,
    cover: String,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/preview_list.html")]
struct PreviewListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    previews: Vec<PreviewRow>,
    paginator: Paginator,
}

#[get("/admin/preview/list")]
async fn view_preview_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_preview_list(admin, &db, 1).await
}

#[get("/admin/preview/list/{page}")]
async fn view_preview_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_preview_list(admin, &db, path.into_inner()).await
}

async fn render_preview_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let per_page = crate::app_config::limits().admin_page_size as usize;
    let page = fetch_page(
        db,
        preview::Entity::find().order_by_desc(preview::Column::AddTime),
        page,
        per_page,
    )
    .await
    .map_err(db_error("view_preview_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let previews = page
        .items
        .into_iter()
        .map(|p| PreviewRow {
            id: p.id,
            cover: upload_url(&p.cover),
            title: p.title,
            add_time: format_time(&p.add_time),
        })
        .collect();

    Ok(PreviewListTemplate {
        flashes: admin.flashes(),
        admin,
        previews,
        paginator: Paginator::new("/admin/preview/list/", page.page, page.page_count),
    }
    .to_response())
}

#[post("/admin/preview/delete/{id}")]
async fn remove_preview(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<impl Responder, Error> {
    validate_csrf_token(admin.session(), &form.csrf_token)?;
    let id = path.into_inner();

    let preview = preview::Entity::find_by_id(id)
        .one(db.get_ref())
        .await
        .map_err(db_error("remove_preview"))?
        .ok_or_else(|| error::ErrorNotFound("Preview not found"))?;
    preview::Entity::delete_by_id(id)
        .exec(db.get_ref())
        .await
        .map_err(db_error("remove_preview"))?;

    log_operation(&db, &admin, &req, format!("Deleted preview \"{}\"", preview.title)).await?;
    flash::ok(admin.session(), format!("Deleted preview \"{}\".", preview.title))?;

    Ok(redirect("/admin/preview/list/1"))
}
