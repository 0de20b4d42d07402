//! Administrators, roles and authorities.
//!
//! Roles bundle authorities (a name and the route it grants) and are
//! assigned to administrators. Nothing enforces them on requests yet; any
//! logged in administrator reaches every back office page.

use super::{log_operation, SaveResult};
use crate::flash::{self, FlashMessage};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::AdminCtx;
use crate::orm::{add_time_now, admin, authority, role};
use crate::session::hash_password;
use crate::template::Paginator;
use crate::web::form::FormErrors;
use crate::web::{db_error, fetch_page, format_time, redirect};
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr, PaginatorTrait,
};
use serde::Deserialize;
use std::collections::HashMap;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_auth_add)
        .service(create_auth)
        .service(view_auth_list_first)
        .service(view_auth_list)
        .service(view_role_add)
        .service(create_role)
        .service(view_role_list_first)
        .service(view_role_list)
        .service(view_admin_add)
        .service(create_admin)
        .service(view_admin_list_first)
        .service(view_admin_list);
}

fn per_page() -> usize {
    crate::app_config::limits().admin_page_size as usize
}

// Authorities

#[derive(Deserialize, Validate)]
pub struct AuthForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Please enter an authority name."))]
    name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Please enter the address it grants."))]
    url: String,
}

pub async fn insert_authority(
    db: &DatabaseConnection,
    name: &str,
    url: &str,
) -> Result<SaveResult<authority::Model>, DbErr> {
    let taken = authority::Entity::find()
        .filter(
            Condition::any()
                .add(authority::Column::Name.eq(name))
                .add(authority::Column::Url.eq(url)),
        )
        .count(db)
        .await?;
    if taken > 0 {
        return Ok(SaveResult::Duplicate);
    }

    let model = authority::ActiveModel {
        name: Set(name.to_owned()),
        url: Set(url.to_owned()),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(SaveResult::Saved(model))
}

#[derive(Template)]
#[template(path = "admin/auth_add.html")]
struct AuthAddTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    name: String,
    url: String,
    errors: FormErrors,
}

#[get("/admin/auth/add")]
async fn view_auth_add(admin: AdminCtx) -> impl Responder {
    AuthAddTemplate {
        flashes: admin.flashes(),
        admin,
        name: String::new(),
        url: String::new(),
        errors: FormErrors::new(),
    }
    .to_response()
}

#[post("/admin/auth/add")]
async fn create_auth(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    form: web::Form<AuthForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(admin.session(), &form.csrf_token)?;
    let mut form = form.into_inner();
    form.name = form.name.trim().to_owned();
    form.url = form.url.trim().to_owned();

    let errors = FormErrors::validate(&form);
    if !errors.is_empty() {
        return Ok(AuthAddTemplate {
            flashes: admin.flashes(),
            admin,
            name: form.name,
            url: form.url,
            errors,
        }
        .to_response());
    }

    match insert_authority(&db, &form.name, &form.url)
        .await
        .map_err(db_error("create_auth"))?
    {
        SaveResult::Duplicate => {
            flash::error(
                admin.session(),
                format!("Authority \"{}\" or its address already exists!", form.name),
            )?;
        }
        SaveResult::Saved(auth) => {
            log_operation(&db, &admin, &req, format!("Added authority \"{}\"", auth.name)).await?;
            flash::ok(admin.session(), format!("Added authority \"{}\".", auth.name))?;
        }
    }

    Ok(redirect("/admin/auth/add"))
}

struct AuthRow {
    id: i32,
    name: String,
    url: String,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/auth_list.html")]
struct AuthListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    authorities: Vec<AuthRow>,
    paginator: Paginator,
}

#[get("/admin/auth/list")]
async fn view_auth_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_auth_list(admin, &db, 1).await
}

#[get("/admin/auth/list/{page}")]
async fn view_auth_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_auth_list(admin, &db, path.into_inner()).await
}

async fn render_auth_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        authority::Entity::find().order_by_desc(authority::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_auth_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let authorities = page
        .items
        .into_iter()
        .map(|a| AuthRow {
            id: a.id,
            name: a.name,
            url: a.url,
            add_time: format_time(&a.add_time),
        })
        .collect();

    Ok(AuthListTemplate {
        flashes: admin.flashes(),
        admin,
        authorities,
        paginator: Paginator::new("/admin/auth/list/", page.page, page.page_count),
    }
    .to_response())
}

// Roles

/// The role form posts one `authority` pair per ticked checkbox, which a
/// plain struct cannot collect, so it is read as raw pairs.
#[derive(Debug, Default)]
pub struct RoleForm {
    pub csrf_token: String,
    pub name: String,
    pub authorities: Vec<i32>,
}

impl RoleForm {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "csrf_token" => form.csrf_token = value,
                "name" => form.name = value.trim().to_owned(),
                "authority" => {
                    if let Ok(id) = value.trim().parse::<i32>() {
                        if !form.authorities.contains(&id) {
                            form.authorities.push(id);
                        }
                    }
                }
                _ => {}
            }
        }
        form
    }

    pub fn check(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        if self.name.is_empty() {
            errors.add("name", "Please enter a role name.");
        } else if self.name.chars().count() > 100 {
            errors.add("name", "The role name is too long.");
        }
        if role::join_authority_ids(&self.authorities).len() > 600 {
            errors.add("authorities", "Too many authorities for one role.");
        }
        errors
    }
}

/// Inserts a role granting those of `authority_ids` that exist.
pub async fn insert_role(
    db: &DatabaseConnection,
    name: &str,
    authority_ids: &[i32],
) -> Result<SaveResult<role::Model>, DbErr> {
    let taken = role::Entity::find()
        .filter(role::Column::Name.eq(name))
        .count(db)
        .await?;
    if taken > 0 {
        return Ok(SaveResult::Duplicate);
    }

    let known: Vec<i32> = if authority_ids.is_empty() {
        Vec::new()
    } else {
        authority::Entity::find()
            .filter(authority::Column::Id.is_in(authority_ids.to_vec()))
            .all(db)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect()
    };
    let granted: Vec<i32> = authority_ids
        .iter()
        .copied()
        .filter(|id| known.contains(id))
        .collect();

    let model = role::ActiveModel {
        name: Set(name.to_owned()),
        authorities: Set(role::join_authority_ids(&granted)),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(SaveResult::Saved(model))
}

struct AuthorityChoice {
    id: i32,
    name: String,
    url: String,
    checked: bool,
}

async fn authority_choices(
    db: &DatabaseConnection,
    checked: &[i32],
) -> Result<Vec<AuthorityChoice>, Error> {
    Ok(authority::Entity::find()
        .order_by_asc(authority::Column::Id)
        .all(db)
        .await
        .map_err(db_error("authority_choices"))?
        .into_iter()
        .map(|a| AuthorityChoice {
            checked: checked.contains(&a.id),
            id: a.id,
            name: a.name,
            url: a.url,
        })
        .collect())
}

#[derive(Template)]
#[template(path = "admin/role_add.html")]
struct RoleAddTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    name: String,
    authorities: Vec<AuthorityChoice>,
    errors: FormErrors,
}

#[get("/admin/role/add")]
async fn view_role_add(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    Ok(RoleAddTemplate {
        flashes: admin.flashes(),
        admin,
        name: String::new(),
        authorities: authority_choices(&db, &[]).await?,
        errors: FormErrors::new(),
    }
    .to_response())
}

#[post("/admin/role/add")]
async fn create_role(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, Error> {
    let form = RoleForm::from_pairs(form.into_inner());
    validate_csrf_token(admin.session(), &form.csrf_token)?;

    let errors = form.check();
    if !errors.is_empty() {
        return Ok(RoleAddTemplate {
            flashes: admin.flashes(),
            admin,
            authorities: authority_choices(&db, &form.authorities).await?,
            name: form.name,
            errors,
        }
        .to_response());
    }

    match insert_role(&db, &form.name, &form.authorities)
        .await
        .map_err(db_error("create_role"))?
    {
        SaveResult::Duplicate => {
            flash::error(admin.session(), format!("Role \"{}\" already exists!", form.name))?;
        }
        SaveResult::Saved(role) => {
            log_operation(&db, &admin, &req, format!("Added role \"{}\"", role.name)).await?;
            flash::ok(admin.session(), format!("Added role \"{}\".", role.name))?;
        }
    }

    Ok(redirect("/admin/role/add"))
}

struct RoleRow {
    id: i32,
    name: String,
    authorities: String,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/role_list.html")]
struct RoleListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    roles: Vec<RoleRow>,
    paginator: Paginator,
}

#[get("/admin/role/list")]
async fn view_role_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_role_list(admin, &db, 1).await
}

#[get("/admin/role/list/{page}")]
async fn view_role_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_role_list(admin, &db, path.into_inner()).await
}

async fn render_role_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        role::Entity::find().order_by_desc(role::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_role_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let names: HashMap<i32, String> = authority::Entity::find()
        .all(db)
        .await
        .map_err(db_error("view_role_list"))?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();

    let roles = page
        .items
        .into_iter()
        .map(|r| RoleRow {
            authorities: r
                .authority_ids()
                .iter()
                .filter_map(|id| names.get(id).map(String::as_str))
                .collect::<Vec<_>>()
                .join(", "),
            id: r.id,
            name: r.name,
            add_time: format_time(&r.add_time),
        })
        .collect();

    Ok(RoleListTemplate {
        flashes: admin.flashes(),
        admin,
        roles,
        paginator: Paginator::new("/admin/role/list/", page.page, page.page_count),
    }
    .to_response())
}

// Administrators

#[derive(Deserialize, Validate)]
pub struct AdminForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Please enter an account name."))]
    name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 1000, message = "Please enter a password."))]
    password: String,
    #[serde(default)]
    #[validate(must_match(other = "password", message = "The passwords do not match."))]
    password_confirm: String,
    #[serde(default)]
    role_id: String,
}

/// Inserts an administrator with an already hashed password.
pub async fn insert_admin(
    db: &DatabaseConnection,
    name: &str,
    password_hash: String,
    role_id: Option<i32>,
    is_super: i16,
) -> Result<SaveResult<admin::Model>, DbErr> {
    let taken = admin::Entity::find()
        .filter(admin::Column::Name.eq(name))
        .count(db)
        .await?;
    if taken > 0 {
        return Ok(SaveResult::Duplicate);
    }

    let model = admin::ActiveModel {
        name: Set(name.to_owned()),
        password: Set(password_hash),
        is_super: Set(is_super),
        role_id: Set(role_id),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(SaveResult::Saved(model))
}

struct RoleOption {
    id: i32,
    name: String,
    selected: bool,
}

async fn role_options(db: &DatabaseConnection, selected: &str) -> Result<Vec<RoleOption>, Error> {
    Ok(role::Entity::find()
        .order_by_asc(role::Column::Name)
        .all(db)
        .await
        .map_err(db_error("role_options"))?
        .into_iter()
        .map(|r| RoleOption {
            selected: r.id.to_string() == selected,
            id: r.id,
            name: r.name,
        })
        .collect())
}

#[derive(Template)]
#[template(path = "admin/admin_add.html")]
struct AdminAddTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    name: String,
    roles: Vec<RoleOption>,
    errors: FormErrors,
}

#[get("/admin/admin/add")]
async fn view_admin_add(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    Ok(AdminAddTemplate {
        flashes: admin.flashes(),
        admin,
        name: String::new(),
        roles: role_options(&db, "").await?,
        errors: FormErrors::new(),
    }
    .to_response())
}

#[post("/admin/admin/add")]
async fn create_admin(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    form: web::Form<AdminForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(admin.session(), &form.csrf_token)?;
    let mut form = form.into_inner();
    form.name = form.name.trim().to_owned();

    let mut errors = FormErrors::validate(&form);
    let role_id = match form.role_id.trim().parse::<i32>() {
        Ok(id) => role::Entity::find_by_id(id)
            .one(db.get_ref())
            .await
            .map_err(db_error("create_admin"))?
            .map(|r| r.id),
        Err(_) => None,
    };
    if role_id.is_none() {
        errors.add("role_id", "Please choose a role.");
    }

    if !errors.is_empty() {
        return Ok(AdminAddTemplate {
            flashes: admin.flashes(),
            admin,
            roles: role_options(&db, form.role_id.trim()).await?,
            name: form.name,
            errors,
        }
        .to_response());
    }

    let password_hash = hash_password(&form.password).map_err(|e| {
        log::error!("create_admin: failed to hash password: {}", e);
        error::ErrorInternalServerError("Failed to hash password")
    })?;

    match insert_admin(&db, &form.name, password_hash, role_id, admin::REGULAR_ADMIN)
        .await
        .map_err(db_error("create_admin"))?
    {
        SaveResult::Duplicate => {
            flash::error(
                admin.session(),
                format!("Administrator \"{}\" already exists!", form.name),
            )?;
        }
        SaveResult::Saved(created) => {
            log_operation(
                &db,
                &admin,
                &req,
                format!("Added administrator \"{}\"", created.name),
            )
            .await?;
            flash::ok(
                admin.session(),
                format!("Added administrator \"{}\".", created.name),
            )?;
        }
    }

    Ok(redirect("/admin/admin/add"))
}

struct AdminRow {
    id: i32,
    name: String,
    role: String,
    is_super: bool,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/admin_list.html")]
struct AdminListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    admins: Vec<AdminRow>,
    paginator: Paginator,
}

#[get("/admin/admin/list")]
async fn view_admin_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_admin_list(admin, &db, 1).await
}

#[get("/admin/admin/list/{page}")]
async fn view_admin_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_admin_list(admin, &db, path.into_inner()).await
}

async fn render_admin_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        admin::Entity::find().order_by_desc(admin::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_admin_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let roles: HashMap<i32, String> = role::Entity::find()
        .all(db)
        .await
        .map_err(db_error("view_admin_list"))?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let admins = page
        .items
        .into_iter()
        .map(|a| AdminRow {
            role: a
                .role_id
                .and_then(|id| roles.get(&id).cloned())
                .unwrap_or_default(),
            is_super: a.is_super_admin(),
            id: a.id,
            name: a.name,
            add_time: format_time(&a.add_time),
        })
        .collect();

    Ok(AdminListTemplate {
        flashes: admin.flashes(),
        admin,
        admins,
        paginator: Paginator::new("/admin/admin/list/", page.page, page.page_count),
    }
    .to_response())
}
