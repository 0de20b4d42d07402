//! Administrator login, logout and password change.

use crate::audit;
use crate::flash::{self, FlashMessage};
use crate::ip::client_ip_or_unknown;
use crate::middleware::admin_ctx::{safe_next, LOGIN_PATH};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::AdminCtx;
use crate::orm::admin;
use crate::session::{self, hash_password, verify_password};
use crate::web::admin::log_operation;
use crate::web::form::FormErrors;
use crate::web::{db_error, redirect};
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_login)
        .service(post_login)
        .service(view_logout)
        .service(view_password)
        .service(post_password);
}

#[derive(Template)]
#[template(path = "admin/login.html")]
struct LoginTemplate {
    site_name: String,
    flashes: Vec<FlashMessage>,
    account: String,
    next: String,
    errors: FormErrors,
}

impl LoginTemplate {
    fn new(session: &Session, account: String, next: String, errors: FormErrors) -> Self {
        Self {
            site_name: crate::app_config::site().name,
            flashes: flash::take(session),
            account,
            next,
            errors,
        }
    }
}

#[derive(Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter your account."))]
    account: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter your password."))]
    password: String,
    #[serde(default)]
    next: String,
}

#[derive(Debug)]
pub enum LoginResultStatus {
    Success,
    /// No administrator has that name. The password was not looked at.
    BadName,
    BadPassword,
}

pub struct LoginResult {
    pub result: LoginResultStatus,
    pub admin: Option<admin::Model>,
}

impl LoginResult {
    fn success(admin: admin::Model) -> Self {
        Self {
            result: LoginResultStatus::Success,
            admin: Some(admin),
        }
    }

    fn fail(result: LoginResultStatus) -> Self {
        Self {
            result,
            admin: None,
        }
    }
}

pub async fn login(db: &DatabaseConnection, name: &str, pass: &str) -> Result<LoginResult, DbErr> {
    let admin = admin::Entity::find()
        .filter(admin::Column::Name.eq(name))
        .one(db)
        .await?;

    let admin = match admin {
        Some(admin) => admin,
        None => return Ok(LoginResult::fail(LoginResultStatus::BadName)),
    };

    if !verify_password(pass, &admin.password) {
        return Ok(LoginResult::fail(LoginResultStatus::BadPassword));
    }

    Ok(LoginResult::success(admin))
}

/// GET /admin/login
#[get("/admin/login")]
pub async fn view_login(session: Session, query: web::Query<LoginQuery>) -> impl Responder {
    let next = query.into_inner().next.unwrap_or_default();
    LoginTemplate::new(&session, String::new(), next, FormErrors::new()).to_response()
}

/// POST /admin/login
#[post("/admin/login")]
pub async fn post_login(
    req: HttpRequest,
    session: Session,
    db: web::Data<DatabaseConnection>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, Error> {
    let mut form = form.into_inner();
    form.account = form.account.trim().to_owned();

    let errors = FormErrors::validate(&form);
    if !errors.is_empty() {
        return Ok(LoginTemplate::new(&session, form.account, form.next, errors).to_response());
    }

    let result = login(&db, &form.account, &form.password)
        .await
        .map_err(db_error("post_login"))?;

    let admin = match (result.result, result.admin) {
        (LoginResultStatus::Success, Some(admin)) => admin,
        (LoginResultStatus::BadName, _) => {
            log::warn!("login failure: unknown account {:?}", form.account);
            let mut errors = FormErrors::new();
            errors.add("account", "Account not found.");
            return Ok(
                LoginTemplate::new(&session, form.account, form.next, errors).to_response(),
            );
        }
        (status, _) => {
            log::warn!("login failure: {:?} for {:?}", status, form.account);
            flash::error(&session, "Incorrect password, please try again.")?;
            return Ok(redirect(LOGIN_PATH));
        }
    };

    session::login_admin(&session, admin.id, &admin.name)?;
    audit::record_admin_login(&db, admin.id, &client_ip_or_unknown(&req))
        .await
        .map_err(db_error("post_login"))?;
    log::info!("admin {} ({}) logged in", admin.name, admin.id);

    let next = if form.next.is_empty() {
        None
    } else {
        Some(form.next.as_str())
    };
    Ok(redirect(safe_next(next)))
}

/// GET /admin/logout
#[get("/admin/logout")]
pub async fn view_logout(session: Session) -> impl Responder {
    session::logout_admin(&session);
    redirect(LOGIN_PATH)
}

#[derive(Template)]
#[template(path = "admin/password.html")]
struct PasswordTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    errors: FormErrors,
}

#[derive(Deserialize, Validate)]
pub struct PasswordForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter your current password."))]
    old_password: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 1000, message = "Please enter a new password."))]
    new_password: String,
    #[serde(default)]
    #[validate(must_match(other = "new_password", message = "The passwords do not match."))]
    new_password_confirm: String,
}

/// GET /admin/password
#[get("/admin/password")]
pub async fn view_password(admin: AdminCtx) -> impl Responder {
    PasswordTemplate {
        flashes: admin.flashes(),
        admin,
        errors: FormErrors::new(),
    }
    .to_response()
}

/// POST /admin/password
#[post("/admin/password")]
pub async fn post_password(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    form: web::Form<PasswordForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(admin.session(), &form.csrf_token)?;

    let mut errors = FormErrors::validate(&*form);
    let account = admin::Entity::find_by_id(admin.id())
        .one(db.get_ref())
        .await
        .map_err(db_error("post_password"))?
        .ok_or_else(|| error::ErrorNotFound("Administrator not found"))?;

    if errors.is_empty() && !verify_password(&form.old_password, &account.password) {
        errors.add("old_password", "Current password is incorrect.");
    }

    if !errors.is_empty() {
        return Ok(PasswordTemplate {
            flashes: admin.flashes(),
            admin,
            errors,
        }
        .to_response());
    }

    let password_hash = hash_password(&form.new_password).map_err(|e| {
        log::error!("post_password: failed to hash password: {}", e);
        error::ErrorInternalServerError("Failed to hash password")
    })?;
    let mut active: admin::ActiveModel = account.into();
    active.password = Set(password_hash);
    active
        .update(db.get_ref())
        .await
        .map_err(db_error("post_password"))?;

    log_operation(&db, &admin, &req, "Changed own password".to_owned()).await?;
    session::logout_admin(admin.session());
    flash::ok(admin.session(), "Password changed, please log in again.")?;

    Ok(redirect(LOGIN_PATH))
}
