//! Read-only views of site members and what they left behind: comments and
//! collected movies.

use crate::flash::FlashMessage;
use crate::middleware::AdminCtx;
use crate::orm::{collection, comment, movie, user};
use crate::template::Paginator;
use crate::web::{db_error, fetch_page, format_time, upload_url};
use actix_web::{error, get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, PaginatorTrait};
use std::collections::{HashMap, HashSet};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_user_list_first)
        .service(view_user_list)
        .service(view_user)
        .service(view_comment_list_first)
        .service(view_comment_list)
        .service(view_collection_list_first)
        .service(view_collection_list);
}

/// Shown in place of a movie or user that has since been deleted.
pub(super) const DELETED: &str = "(deleted)";

fn unique_ids(ids: impl Iterator<Item = Option<i32>>) -> Vec<i32> {
    ids.flatten().collect::<HashSet<_>>().into_iter().collect()
}

pub(super) async fn user_names(
    db: &DatabaseConnection,
    ids: impl Iterator<Item = Option<i32>>,
) -> Result<HashMap<i32, String>, DbErr> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}

async fn movie_titles(
    db: &DatabaseConnection,
    ids: impl Iterator<Item = Option<i32>>,
) -> Result<HashMap<i32, String>, DbErr> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(movie::Entity::find()
        .filter(movie::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, m.title))
        .collect())
}

pub(super) fn lookup(names: &HashMap<i32, String>, id: Option<i32>) -> String {
    id.and_then(|id| names.get(&id).cloned())
        .unwrap_or_else(|| DELETED.to_owned())
}

fn per_page() -> usize {
    crate::app_config::limits().admin_page_size as usize
}

struct UserRow {
    id: i32,
    name: String,
    email: String,
    phone: String,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/user_list.html")]
struct UserListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    users: Vec<UserRow>,
    paginator: Paginator,
}

#[get("/admin/user/list")]
async fn view_user_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_user_list(admin, &db, 1).await
}

#[get("/admin/user/list/{page}")]
async fn view_user_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_user_list(admin, &db, path.into_inner()).await
}

async fn render_user_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        user::Entity::find().order_by_desc(user::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_user_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let users = page
        .items
        .into_iter()
        .map(|u| UserRow {
            id: u.id,
            name: u.name,
            email: u.email.unwrap_or_default(),
            phone: u.phone.unwrap_or_default(),
            add_time: format_time(&u.add_time),
        })
        .collect();

    Ok(UserListTemplate {
        flashes: admin.flashes(),
        admin,
        users,
        paginator: Paginator::new("/admin/user/list/", page.page, page.page_count),
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "admin/user_view.html")]
struct UserViewTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    user: user::Model,
    email: String,
    phone: String,
    info: String,
    avatar: String,
    add_time: String,
    comment_count: usize,
    collection_count: usize,
}

#[get("/admin/user/view/{id}")]
async fn view_user(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let db = db.get_ref();
    let user = user::Entity::find_by_id(path.into_inner())
        .one(db)
        .await
        .map_err(db_error("view_user"))?
        .ok_or_else(|| error::ErrorNotFound("User not found"))?;

    let comment_count = comment::Entity::find()
        .filter(comment::Column::UserId.eq(user.id))
        .count(db)
        .await
        .map_err(db_error("view_user"))?;
    let collection_count = collection::Entity::find()
        .filter(collection::Column::UserId.eq(user.id))
        .count(db)
        .await
        .map_err(db_error("view_user"))?;

    Ok(UserViewTemplate {
        flashes: admin.flashes(),
        admin,
        email: user.email.clone().unwrap_or_default(),
        phone: user.phone.clone().unwrap_or_default(),
        info: user.info.clone().unwrap_or_default(),
        avatar: user.avatar.as_deref().map(upload_url).unwrap_or_default(),
        add_time: format_time(&user.add_time),
        user,
        comment_count,
        collection_count,
    }
    .to_response())
}

struct CommentRow {
    id: i32,
    content: String,
    movie: String,
    user: String,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/comment_list.html")]
struct CommentListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    comments: Vec<CommentRow>,
    paginator: Paginator,
}

#[get("/admin/comment/list")]
async fn view_comment_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_comment_list(admin, &db, 1).await
}

#[get("/admin/comment/list/{page}")]
async fn view_comment_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_comment_list(admin, &db, path.into_inner()).await
}

async fn render_comment_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        comment::Entity::find().order_by_desc(comment::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_comment_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let titles = movie_titles(db, page.items.iter().map(|c| c.movie_id))
        .await
        .map_err(db_error("view_comment_list"))?;
    let names = user_names(db, page.items.iter().map(|c| c.user_id))
        .await
        .map_err(db_error("view_comment_list"))?;

    let comments = page
        .items
        .into_iter()
        .map(|c| CommentRow {
            id: c.id,
            movie: lookup(&titles, c.movie_id),
            user: lookup(&names, c.user_id),
            content: c.content,
            add_time: format_time(&c.add_time),
        })
        .collect();

    Ok(CommentListTemplate {
        flashes: admin.flashes(),
        admin,
        comments,
        paginator: Paginator::new("/admin/comment/list/", page.page, page.page_count),
    }
    .to_response())
}

struct CollectionRow {
    id: i32,
    movie: String,
    user: String,
    add_time: String,
}

#[derive(Template)]
#[template(path = "admin/collection_list.html")]
struct CollectionListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    collections: Vec<CollectionRow>,
    paginator: Paginator,
}

#[get("/admin/collection/list")]
async fn view_collection_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_collection_list(admin, &db, 1).await
}

#[get("/admin/collection/list/{page}")]
async fn view_collection_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_collection_list(admin, &db, path.into_inner()).await
}

async fn render_collection_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let page = fetch_page(
        db,
        collection::Entity::find().order_by_desc(collection::Column::AddTime),
        page,
        per_page(),
    )
    .await
    .map_err(db_error("view_collection_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let titles = movie_titles(db, page.items.iter().map(|c| c.movie_id))
        .await
        .map_err(db_error("view_collection_list"))?;
    let names = user_names(db, page.items.iter().map(|c| c.user_id))
        .await
        .map_err(db_error("view_collection_list"))?;

    let collections = page
        .items
        .into_iter()
        .map(|c| CollectionRow {
            id: c.id,
            movie: lookup(&titles, c.movie_id),
            user: lookup(&names, c.user_id),
            add_time: format_time(&c.add_time),
        })
        .collect();

    Ok(CollectionListTemplate {
        flashes: admin.flashes(),
        admin,
        collections,
        paginator: Paginator::new("/admin/collection/list/", page.page, page.page_count),
    }
    .to_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_marks_missing_rows() {
        let mut names = HashMap::new();
        names.insert(1, "ana".to_owned());
        assert_eq!(lookup(&names, Some(1)), "ana");
        assert_eq!(lookup(&names, Some(2)), DELETED);
        assert_eq!(lookup(&names, None), DELETED);
    }

    #[test]
    fn test_unique_ids_drops_nulls_and_repeats() {
        let mut ids = unique_ids(vec![Some(3), None, Some(3), Some(1)].into_iter());
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
    }
}
