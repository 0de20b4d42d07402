//! Movie records and their uploaded video and cover files.

use super::{log_operation, CsrfForm, SaveResult};
use crate::flash::{self, FlashMessage};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::AdminCtx;
use crate::orm::{add_time_now, movie, tag};
use crate::storage::{LocalStorage, StorageError};
use crate::template::Paginator;
use crate::web::form::FormErrors;
use crate::web::multipart::{read_multipart, MultipartForm};
use crate::web::{db_error, fetch_page, format_time, redirect, upload_url};
use actix_multipart::Multipart;
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use chrono::NaiveDate;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr, PaginatorTrait};
use std::collections::HashMap;
use validator::{Validate, ValidationError};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_movie_add)
        .service(create_movie)
        .service(view_movie_list_first)
        .service(view_movie_list)
        .service(view_movie_update)
        .service(update_movie_submit)
        .service(remove_movie);
}

/// Date format of the release date input.
pub const RELEASE_TIME_FORMAT: &str = "%Y-%m-%d";

/// Text fields of the movie form, exactly as submitted.
#[derive(Clone, Debug, Default, Validate)]
pub struct MovieForm {
    #[validate(length(min = 1, max = 255, message = "Please enter a title."))]
    pub title: String,
    #[validate(length(min = 1, message = "Please enter a description."))]
    pub info: String,
    #[validate(length(min = 1, max = 255, message = "Please enter an area."))]
    pub area: String,
    #[validate(length(min = 1, max = 100, message = "Please enter a running time."))]
    pub length: String,
    #[validate(custom(
        function = "validate_release_time",
        message = "Please enter a release date as YYYY-MM-DD."
    ))]
    pub release_time: String,
    #[validate(custom(function = "validate_rating", message = "Please choose a rating from 1 to 5."))]
    pub rating: String,
    #[validate(custom(function = "validate_tag_id", message = "Please choose a tag."))]
    pub tag_id: String,
}

/// A movie form that passed validation, with its values converted.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieInput {
    pub title: String,
    pub info: String,
    pub area: String,
    pub length: String,
    pub release_time: NaiveDate,
    pub rating: i16,
    pub tag_id: i32,
}

pub fn parse_release_time(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), RELEASE_TIME_FORMAT).ok()
}

pub fn parse_rating(value: &str) -> Option<i16> {
    value
        .trim()
        .parse::<i16>()
        .ok()
        .filter(|r| (1..=5).contains(r))
}

fn parse_tag_id(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

fn validate_release_time(value: &str) -> Result<(), ValidationError> {
    parse_release_time(value)
        .map(|_| ())
        .ok_or_else(|| ValidationError::new("release_time"))
}

fn validate_rating(value: &str) -> Result<(), ValidationError> {
    parse_rating(value)
        .map(|_| ())
        .ok_or_else(|| ValidationError::new("rating"))
}

fn validate_tag_id(value: &str) -> Result<(), ValidationError> {
    parse_tag_id(value)
        .map(|_| ())
        .ok_or_else(|| ValidationError::new("tag_id"))
}

impl MovieForm {
    pub fn from_multipart(form: &MultipartForm) -> Self {
        Self {
            title: form.text("title"),
            info: form.text("info"),
            area: form.text("area"),
            length: form.text("length"),
            release_time: form.text("release_time"),
            rating: form.text("rating"),
            tag_id: form.text("tag_id"),
        }
    }

    fn from_model(movie: &movie::Model) -> Self {
        Self {
            title: movie.title.clone(),
            info: movie.info.clone(),
            area: movie.area.clone(),
            length: movie.length.clone(),
            release_time: movie.release_time.format(RELEASE_TIME_FORMAT).to_string(),
            rating: movie.rating.to_string(),
            tag_id: movie.tag_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }

    /// Field checks that need no database. Whether the tag exists is
    /// checked by the caller.
    pub fn check(&self) -> Result<MovieInput, FormErrors> {
        let errors = FormErrors::validate(self);
        match (
            parse_release_time(&self.release_time),
            parse_rating(&self.rating),
            parse_tag_id(&self.tag_id),
        ) {
            (Some(release_time), Some(rating), Some(tag_id)) if errors.is_empty() => {
                Ok(MovieInput {
                    title: self.title.clone(),
                    info: self.info.clone(),
                    area: self.area.clone(),
                    length: self.length.clone(),
                    release_time,
                    rating,
                    tag_id,
                })
            }
            _ => Err(errors),
        }
    }
}

pub async fn tag_exists(db: &DatabaseConnection, tag_id: i32) -> Result<bool, DbErr> {
    Ok(tag::Entity::find_by_id(tag_id).one(db).await?.is_some())
}

/// Whether another movie than `except` already uses `title`.
pub async fn title_taken(
    db: &DatabaseConnection,
    title: &str,
    except: Option<i32>,
) -> Result<bool, DbErr> {
    let mut query = movie::Entity::find().filter(movie::Column::Title.eq(title));
    if let Some(id) = except {
        query = query.filter(movie::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// Inserts a movie pointing at already stored files. New movies start with
/// no views and no reviews.
pub async fn insert_movie(
    db: &DatabaseConnection,
    input: MovieInput,
    url: String,
    cover: String,
) -> Result<SaveResult<movie::Model>, DbErr> {
    if title_taken(db, &input.title, None).await? {
        return Ok(SaveResult::Duplicate);
    }

    let model = movie::ActiveModel {
        title: Set(input.title),
        url: Set(url),
        info: Set(input.info),
        cover: Set(cover),
        rating: Set(input.rating),
        views: Set(0),
        review_num: Set(0),
        tag_id: Set(Some(input.tag_id)),
        area: Set(input.area),
        release_time: Set(input.release_time),
        length: Set(input.length),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(SaveResult::Saved(model))
}

/// Applies `input` to `movie`. A file is only replaced when a new stored
/// name is given; otherwise the current one is kept.
pub async fn update_movie(
    db: &DatabaseConnection,
    movie: movie::Model,
    input: MovieInput,
    url: Option<String>,
    cover: Option<String>,
) -> Result<SaveResult<movie::Model>, DbErr> {
    if title_taken(db, &input.title, Some(movie.id)).await? {
        return Ok(SaveResult::Duplicate);
    }

    let mut active: movie::ActiveModel = movie.into();
    active.title = Set(input.title);
    active.info = Set(input.info);
    active.area = Set(input.area);
    active.length = Set(input.length);
    active.release_time = Set(input.release_time);
    active.rating = Set(input.rating);
    active.tag_id = Set(Some(input.tag_id));
    if let Some(url) = url {
        active.url = Set(url);
    }
    if let Some(cover) = cover {
        active.cover = Set(cover);
    }

    Ok(SaveResult::Saved(active.update(db).await?))
}

/// Removes the row. The stored files stay on disk.
pub async fn delete_movie(
    db: &DatabaseConnection,
    movie_id: i32,
) -> Result<Option<movie::Model>, DbErr> {
    let movie = match movie::Entity::find_by_id(movie_id).one(db).await? {
        Some(movie) => movie,
        None => return Ok(None),
    };
    movie::Entity::delete_by_id(movie_id).exec(db).await?;
    Ok(Some(movie))
}

fn storage_error(e: StorageError) -> Error {
    log::error!("movie upload: {}", e);
    error::ErrorInternalServerError("Could not store the uploaded file")
}

async fn find_movie(db: &DatabaseConnection, movie_id: i32) -> Result<movie::Model, Error> {
    movie::Entity::find_by_id(movie_id)
        .one(db)
        .await
        .map_err(db_error("find_movie"))?
        .ok_or_else(|| error::ErrorNotFound("Movie not found"))
}

struct TagOption {
    id: i32,
    name: String,
    selected: bool,
}

async fn tag_options(db: &DatabaseConnection, selected: &str) -> Result<Vec<TagOption>, Error> {
    let tags = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
        .map_err(db_error("tag_options"))?;
    Ok(tags
        .into_iter()
        .map(|t| TagOption {
            selected: t.id.to_string() == selected,
            id: t.id,
            name: t.name,
        })
        .collect())
}

#[derive(Template)]
#[template(path = "admin/movie_form.html")]
struct MovieFormTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    heading: &'static str,
    action: String,
    form: MovieForm,
    errors: FormErrors,
    tags: Vec<TagOption>,
    /// Public URLs of the current files, empty when adding.
    current_url: String,
    current_cover: String,
    files_required: bool,
}

impl MovieFormTemplate {
    async fn for_add(
        admin: AdminCtx,
        db: &DatabaseConnection,
        form: MovieForm,
        errors: FormErrors,
    ) -> Result<Self, Error> {
        Ok(Self {
            flashes: admin.flashes(),
            admin,
            heading: "Add movie",
            action: "/admin/movie/add".to_owned(),
            tags: tag_options(db, &form.tag_id).await?,
            form,
            errors,
            current_url: String::new(),
            current_cover: String::new(),
            files_required: true,
        })
    }

    async fn for_update(
        admin: AdminCtx,
        db: &DatabaseConnection,
        movie: &movie::Model,
        form: MovieForm,
        errors: FormErrors,
    ) -> Result<Self, Error> {
        Ok(Self {
            flashes: admin.flashes(),
            admin,
            heading: "Edit movie",
            action: format!("/admin/movie/update/{}", movie.id),
            tags: tag_options(db, &form.tag_id).await?,
            form,
            errors,
            current_url: upload_url(&movie.url),
            current_cover: upload_url(&movie.cover),
            files_required: false,
        })
    }
}

/// Reads the multipart body, checks the CSRF token and validates every
/// field, including that the tag exists and that required files are present.
async fn read_movie_form(
    admin: &AdminCtx,
    db: &DatabaseConnection,
    payload: Multipart,
    files_required: bool,
) -> Result<(MovieForm, MultipartForm, Result<MovieInput, FormErrors>), Error> {
    let max_bytes = crate::app_config::storage().max_upload_bytes();
    let upload = read_multipart(payload, max_bytes).await?;
    validate_csrf_token(admin.session(), &upload.text("csrf_token"))?;

    let form = MovieForm::from_multipart(&upload);
    let mut checked = form.check();

    if let Ok(input) = &checked {
        if !tag_exists(db, input.tag_id)
            .await
            .map_err(db_error("read_movie_form"))?
        {
            let mut errors = FormErrors::new();
            errors.add("tag_id", "Please choose an existing tag.");
            checked = Err(errors);
        }
    }

    if files_required {
        let mut errors = checked.as_ref().err().cloned().unwrap_or_default();
        if !upload.files.contains_key("url") {
            errors.add("url", "Please upload the movie file.");
        }
        if !upload.files.contains_key("cover") {
            errors.add("cover", "Please upload a cover image.");
        }
        if !errors.is_empty() {
            checked = Err(errors);
        }
    }

    Ok((form, upload, checked))
}

/// GET /admin/movie/add
#[get("/admin/movie/add")]
async fn view_movie_add(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    Ok(
        MovieFormTemplate::for_add(admin, &db, MovieForm::default(), FormErrors::new())
            .await?
            .to_response(),
    )
}

/// POST /admin/movie/add
#[post("/admin/movie/add")]
async fn create_movie(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<LocalStorage>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let (form, mut upload, checked) = read_movie_form(&admin, &db, payload, true).await?;
    let input = match checked {
        Ok(input) => input,
        Err(errors) => {
            return Ok(MovieFormTemplate::for_add(admin, &db, form, errors)
                .await?
                .to_response())
        }
    };

    // Refuse before anything is written to disk.
    if title_taken(&db, &input.title, None)
        .await
        .map_err(db_error("create_movie"))?
    {
        flash::error(
            admin.session(),
            format!("Movie \"{}\" already exists!", input.title),
        )?;
        return Ok(redirect("/admin/movie/add"));
    }

    let (video, cover) = match (upload.take_file("url"), upload.take_file("cover")) {
        (Some(video), Some(cover)) => (video, cover),
        _ => return Err(error::ErrorBadRequest("Missing upload")),
    };
    let url = storage.save(video).await.map_err(storage_error)?;
    let cover = storage.save(cover).await.map_err(storage_error)?;

    match insert_movie(&db, input, url, cover)
        .await
        .map_err(db_error("create_movie"))?
    {
        SaveResult::Duplicate => {
            flash::error(
                admin.session(),
                format!("Movie \"{}\" already exists!", form.title),
            )?;
        }
        SaveResult::Saved(movie) => {
            log_operation(&db, &admin, &req, format!("Added movie \"{}\"", movie.title)).await?;
            flash::ok(admin.session(), format!("Added movie \"{}\".", movie.title))?;
        }
    }

    Ok(redirect("/admin/movie/add"))
}

struct MovieRow {
    id: i32,
    title: String,
    tag_name: String,
    area: String,
    rating: i16,
    views: i64,
    review_num: i64,
    release_time: String,
    length: String,
    add_time: String,
    url: String,
    cover: String,
}

#[derive(Template)]
#[template(path = "admin/movie_list.html")]
struct MovieListTemplate {
    admin: AdminCtx,
    flashes: Vec<FlashMessage>,
    movies: Vec<MovieRow>,
    paginator: Paginator,
}

/// Tag names by id for the given movies, in one query.
async fn tag_names(
    db: &DatabaseConnection,
    movies: &[movie::Model],
) -> Result<HashMap<i32, String>, DbErr> {
    let ids: Vec<i32> = movies.iter().filter_map(|m| m.tag_id).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(tag::Entity::find()
        .filter(tag::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect())
}

/// GET /admin/movie/list
#[get("/admin/movie/list")]
async fn view_movie_list_first(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    render_movie_list(admin, &db, 1).await
}

/// GET /admin/movie/list/{page}
#[get("/admin/movie/list/{page}")]
async fn view_movie_list(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<usize>,
) -> Result<impl Responder, Error> {
    render_movie_list(admin, &db, path.into_inner()).await
}

async fn render_movie_list(
    admin: AdminCtx,
    db: &DatabaseConnection,
    page: usize,
) -> Result<impl Responder, Error> {
    let per_page = crate::app_config::limits().admin_page_size as usize;
    let page = fetch_page(
        db,
        movie::Entity::find().order_by_desc(movie::Column::AddTime),
        page,
        per_page,
    )
    .await
    .map_err(db_error("view_movie_list"))?
    .ok_or_else(crate::web::page_not_found)?;

    let names = tag_names(db, &page.items)
        .await
        .map_err(db_error("view_movie_list"))?;

    let movies = page
        .items
        .into_iter()
        .map(|m| MovieRow {
            tag_name: m
                .tag_id
                .and_then(|id| names.get(&id).cloned())
                .unwrap_or_else(|| "(no tag)".to_owned()),
            id: m.id,
            title: m.title,
            area: m.area,
            rating: m.rating,
            views: m.views,
            review_num: m.review_num,
            release_time: m.release_time.format(RELEASE_TIME_FORMAT).to_string(),
            length: m.length,
            add_time: format_time(&m.add_time),
            url: upload_url(&m.url),
            cover: upload_url(&m.cover),
        })
        .collect();

    Ok(MovieListTemplate {
        flashes: admin.flashes(),
        admin,
        movies,
        paginator: Paginator::new("/admin/movie/list/", page.page, page.page_count),
    }
    .to_response())
}

/// GET /admin/movie/update/{id}
#[get("/admin/movie/update/{id}")]
async fn view_movie_update(
    admin: AdminCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let movie = find_movie(&db, path.into_inner()).await?;
    let form = MovieForm::from_model(&movie);

    Ok(
        MovieFormTemplate::for_update(admin, &db, &movie, form, FormErrors::new())
            .await?
            .to_response(),
    )
}

/// POST /admin/movie/update/{id}
#[post("/admin/movie/update/{id}")]
async fn update_movie_submit(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<LocalStorage>,
    path: web::Path<i32>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let movie = find_movie(&db, path.into_inner()).await?;
    let back = format!("/admin/movie/update/{}", movie.id);

    let (form, mut upload, checked) = read_movie_form(&admin, &db, payload, false).await?;
    let input = match checked {
        Ok(input) => input,
        Err(errors) => {
            return Ok(
                MovieFormTemplate::for_update(admin, &db, &movie, form, errors)
                    .await?
                    .to_response(),
            )
        }
    };

    if title_taken(&db, &input.title, Some(movie.id))
        .await
        .map_err(db_error("update_movie"))?
    {
        flash::error(
            admin.session(),
            format!("Movie \"{}\" already exists!", input.title),
        )?;
        return Ok(redirect(back));
    }

    let url = match upload.take_file("url") {
        Some(file) => Some(storage.save(file).await.map_err(storage_error)?),
        None => None,
    };
    let cover = match upload.take_file("cover") {
        Some(file) => Some(storage.save(file).await.map_err(storage_error)?),
        None => None,
    };

    match update_movie(&db, movie, input, url, cover)
        .await
        .map_err(db_error("update_movie"))?
    {
        SaveResult::Duplicate => {
            flash::error(
                admin.session(),
                format!("Movie \"{}\" already exists!", form.title),
            )?;
        }
        SaveResult::Saved(movie) => {
            log_operation(&db, &admin, &req, format!("Edited movie \"{}\"", movie.title)).await?;
            flash::ok(admin.session(), format!("Saved movie \"{}\".", movie.title))?;
        }
    }

    Ok(redirect(back))
}

/// POST /admin/movie/delete/{id}
#[post("/admin/movie/delete/{id}")]
async fn remove_movie(
    admin: AdminCtx,
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<impl Responder, Error> {
    validate_csrf_token(admin.session(), &form.csrf_token)?;

    let movie = delete_movie(&db, path.into_inner())
        .await
        .map_err(db_error("remove_movie"))?
        .ok_or_else(|| error::ErrorNotFound("Movie not found"))?;

    log_operation(&db, &admin, &req, format!("Deleted movie \"{}\"", movie.title)).await?;
    flash::ok(admin.session(), format!("Deleted movie \"{}\".", movie.title))?;

    Ok(redirect("/admin/movie/list/1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> MovieForm {
        MovieForm {
            title: "Night Train".to_owned(),
            info: "A long ride.".to_owned(),
            area: "France".to_owned(),
            length: "1h52m".to_owned(),
            release_time: "2019-06-01".to_owned(),
            rating: "4".to_owned(),
            tag_id: "3".to_owned(),
        }
    }

    #[test]
    fn test_valid_form_converts() {
        let input = valid_form().check().unwrap();
        assert_eq!(input.rating, 4);
        assert_eq!(input.tag_id, 3);
        assert_eq!(input.release_time, NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let errors = MovieForm::default().check().unwrap_err();
        for field in ["title", "info", "area", "length", "release_time", "rating", "tag_id"] {
            assert!(errors.has(field), "missing error for {}", field);
        }
        assert_eq!(errors.get("title"), "Please enter a title.");
    }

    #[test]
    fn test_rating_bounds() {
        assert_eq!(parse_rating("1"), Some(1));
        assert_eq!(parse_rating(" 5 "), Some(5));
        assert_eq!(parse_rating("0"), None);
        assert_eq!(parse_rating("6"), None);
        assert_eq!(parse_rating("four"), None);
    }

    #[test]
    fn test_release_time_format() {
        assert!(parse_release_time("2020-02-29").is_some());
        assert!(parse_release_time("2021-02-29").is_none());
        assert!(parse_release_time("01/02/2020").is_none());

        let mut form = valid_form();
        form.release_time = "yesterday".to_owned();
        let errors = form.check().unwrap_err();
        assert_eq!(
            errors.get("release_time"),
            "Please enter a release date as YYYY-MM-DD."
        );
        assert!(!errors.has("title"));
    }
}
