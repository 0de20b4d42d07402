//! The public site: movie grid, tag filter and the player page.

use crate::orm::{movie, preview, tag};
use crate::template::Paginator;
use crate::web::{db_error, fetch_page, page_not_found, upload_url};
use actix_web::{error, get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use serde::Deserialize;

/// How many previews the index carousel shows.
const LATEST_PREVIEWS: u64 = 5;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index)
        .service(view_index_page)
        .service(view_play);
}

#[derive(Deserialize)]
pub struct IndexQuery {
    tag: Option<i32>,
}

struct MovieCard {
    id: i32,
    title: String,
    cover: String,
    rating: i16,
    views: i64,
}

struct TagLink {
    id: i32,
    name: String,
    active: bool,
}

struct PreviewCard {
    title: String,
    cover: String,
}

#[derive(Template)]
#[template(path = "home/index.html")]
struct IndexTemplate {
    site_name: String,
    movies: Vec<MovieCard>,
    tags: Vec<TagLink>,
    previews: Vec<PreviewCard>,
    all_tags_active: bool,
    paginator: Paginator,
}

#[get("/")]
async fn view_index(
    db: web::Data<DatabaseConnection>,
    query: web::Query<IndexQuery>,
) -> Result<impl Responder, Error> {
    render_index(&db, 1, query.tag).await
}

#[get("/page/{page}")]
async fn view_index_page(
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
    query: web::Query<IndexQuery>,
) -> Result<impl Responder, Error> {
    render_index(&db, path.into_inner(), query.tag).await
}

async fn render_index(
    db: &DatabaseConnection,
    page: usize,
    tag_filter: Option<i32>,
) -> Result<impl Responder, Error> {
    let per_page = crate::app_config::limits().home_page_size as usize;

    let mut select = movie::Entity::find().order_by_desc(movie::Column::AddTime);
    if let Some(tag_id) = tag_filter {
        select = select.filter(movie::Column::TagId.eq(tag_id));
    }
    let page = fetch_page(db, select, page, per_page)
        .await
        .map_err(db_error("view_index"))?
        .ok_or_else(page_not_found)?;

    let tags = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
        .map_err(db_error("view_index"))?
        .into_iter()
        .map(|t| TagLink {
            active: Some(t.id) == tag_filter,
            id: t.id,
            name: t.name,
        })
        .collect();

    let previews = preview::Entity::find()
        .order_by_desc(preview::Column::AddTime)
        .limit(LATEST_PREVIEWS)
        .all(db)
        .await
        .map_err(db_error("view_index"))?
        .into_iter()
        .map(|p| PreviewCard {
            cover: upload_url(&p.cover),
            title: p.title,
        })
        .collect();

    let movies = page
        .items
        .into_iter()
        .map(|m| MovieCard {
            id: m.id,
            cover: upload_url(&m.cover),
            title: m.title,
            rating: m.rating,
            views: m.views,
        })
        .collect();

    let mut paginator = Paginator::new("/page/", page.page, page.page_count);
    if let Some(tag_id) = tag_filter {
        paginator = paginator.with_query(format!("?tag={}", tag_id));
    }

    Ok(IndexTemplate {
        site_name: crate::app_config::site().name,
        movies,
        tags,
        previews,
        all_tags_active: tag_filter.is_none(),
        paginator,
    }
    .to_response())
}

/// Counts one view of a movie.
pub async fn increment_views(db: &DatabaseConnection, movie_id: i32) -> Result<u64, DbErr> {
    Ok(movie::Entity::update_many()
        .col_expr(
            movie::Column::Views,
            Expr::col(movie::Column::Views).add(1),
        )
        .filter(movie::Column::Id.eq(movie_id))
        .exec(db)
        .await?
        .rows_affected)
}

#[derive(Template)]
#[template(path = "home/play.html")]
struct PlayTemplate {
    site_name: String,
    movie: movie::Model,
    tag_name: String,
    video_url: String,
    cover_url: String,
    release_time: String,
}

#[get("/play/{id}")]
async fn view_play(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let db = db.get_ref();
    let movie_id = path.into_inner();

    if increment_views(db, movie_id)
        .await
        .map_err(db_error("view_play"))?
        == 0
    {
        return Err(error::ErrorNotFound("Movie not found"));
    }

    let movie = movie::Entity::find_by_id(movie_id)
        .one(db)
        .await
        .map_err(db_error("view_play"))?
        .ok_or_else(|| error::ErrorNotFound("Movie not found"))?;

    let tag_name = match movie.tag_id {
        Some(tag_id) => tag::Entity::find_by_id(tag_id)
            .one(db)
            .await
            .map_err(db_error("view_play"))?
            .map(|t| t.name)
            .unwrap_or_default(),
        None => String::new(),
    };

    Ok(PlayTemplate {
        site_name: crate::app_config::site().name,
        tag_name,
        video_url: upload_url(&movie.url),
        cover_url: upload_url(&movie.cover),
        release_time: movie.release_time.format("%Y-%m-%d").to_string(),
        movie,
    }
    .to_response())
}
