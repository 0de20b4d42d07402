use crate::flash::{self, FlashMessage};
use crate::middleware::csrf::get_or_create_csrf_token;
use crate::session::{ADMIN_ID_KEY, ADMIN_NAME_KEY};
use actix_session::Session;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{error, Error, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, Ready};

/// Login page administrators are sent to when the session is missing.
pub const LOGIN_PATH: &str = "/admin/login";
/// Where a successful login lands when no usable return address was given.
pub const DASHBOARD_PATH: &str = "/admin";

/// The authenticated administrator for one request.
///
/// Taking `AdminCtx` as a handler argument is what guards a back office
/// route: extraction fails with a redirect to the login page when the
/// session has no administrator.
#[derive(Clone)]
pub struct AdminCtx {
    id: i32,
    name: String,
    csrf_token: String,
    session: Session,
}

impl AdminCtx {
    pub fn from_session(session: Session) -> Option<Self> {
        let name = session.get::<String>(ADMIN_NAME_KEY).ok().flatten()?;
        let id = session.get::<i32>(ADMIN_ID_KEY).ok().flatten()?;
        let csrf_token = get_or_create_csrf_token(&session).unwrap_or_default();

        Some(Self {
            id,
            name,
            csrf_token,
            session,
        })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Messages flashed by the previous request. Reading them clears them.
    pub fn flashes(&self) -> Vec<FlashMessage> {
        flash::take(&self.session)
    }
}

impl std::fmt::Debug for AdminCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCtx")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Builds `/admin/login?next=<target>` with the target percent-encoded.
pub fn login_redirect_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", LOGIN_PATH, encoded)
}

/// Returns `next` when it is a path on this site, otherwise the dashboard.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
        _ => DASHBOARD_PATH,
    }
}

impl FromRequest for AdminCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = match Session::extract(req).into_inner() {
            Ok(session) => session,
            Err(err) => {
                log::error!("Unable to extract Session data for AdminCtx: {}", err);
                return ready(Err(err));
            }
        };

        match AdminCtx::from_session(session) {
            Some(ctx) => ready(Ok(ctx)),
            None => {
                let next = req
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or(DASHBOARD_PATH);
                log::debug!("AdminCtx: no administrator in session for {}", next);
                let response = HttpResponse::Found()
                    .append_header((header::LOCATION, login_redirect_url(next)))
                    .finish();
                ready(Err(
                    error::InternalError::from_response("login required", response).into(),
                ))
            }
        }
    }
}
