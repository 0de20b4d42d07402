use actix_files::Files;
use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, ErrorHandlers, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use moviesite::storage::LocalStorage;
use rand::{distributions::Alphanumeric, Rng};

/// cookie::Key refuses anything shorter.
const MIN_SECRET_KEY_LEN: usize = 64;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    moviesite::app_config::init();
    let config = moviesite::app_config::get_config();

    let db = moviesite::db::connect(&config.database.url)
        .await
        .map_err(to_io_error)?;
    moviesite::db::create_tables(&db)
        .await
        .map_err(to_io_error)?;

    let secret_key = session_key(&config.security.secret_key);
    let storage = LocalStorage::new(&config.storage.upload_dir);
    let public_url = config.storage.public_url.trim_end_matches('/').to_owned();
    let upload_dir = config.storage.upload_dir.clone();
    std::fs::create_dir_all(&upload_dir)?;

    log::info!("Listening on {}", config.site.bind);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(storage.clone()))
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::BAD_REQUEST, moviesite::web::error::render_400)
                    .handler(StatusCode::NOT_FOUND, moviesite::web::error::render_404)
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        moviesite::web::error::render_500,
                    ),
            )
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(false) // Allow HTTP for development
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %r %s %T"))
            .service(Files::new(&public_url, &upload_dir))
            .configure(moviesite::web::configure)
    })
    .bind(&config.site.bind)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

fn session_key(configured: &str) -> Key {
    if configured.len() >= MIN_SECRET_KEY_LEN {
        return Key::from(configured.as_bytes());
    }

    let random_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect();
    log::warn!("security.secret_key is missing or shorter than {} bytes.\r\nThis means the key used for signing session cookies will invalidate every time the application is restarted.\r\n\r\nNeed a key? How about:\r\n{}", MIN_SECRET_KEY_LEN, random_string);
    Key::from(random_string.as_bytes())
}

fn to_io_error(e: sea_orm::DbErr) -> std::io::Error {
    log::error!("database startup failed: {}", e);
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}
