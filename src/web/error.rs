//! HTML bodies for error responses, installed through `ErrorHandlers`.

use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpResponse, Result};
use askama_actix::Template;

#[derive(Template)]
#[template(path = "home/404.html")]
struct NotFoundTemplate {
    site_name: String,
}

#[derive(Template)]
#[template(path = "home/error.html")]
struct ErrorTemplate {
    site_name: String,
    status: u16,
    reason: String,
}

pub fn render_400<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_error(res, StatusCode::BAD_REQUEST)
}

pub fn render_404<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    let body = NotFoundTemplate {
        site_name: crate::app_config::site().name,
    }
    .render()
    .unwrap_or_else(|e| {
        log::error!("render_404: {}", e);
        "404 Not Found".to_owned()
    });
    replace_body(res, StatusCode::NOT_FOUND, body)
}

pub fn render_500<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_error(res, StatusCode::INTERNAL_SERVER_ERROR)
}

fn render_error<B>(res: ServiceResponse<B>, status: StatusCode) -> Result<ErrorHandlerResponse<B>> {
    let body = ErrorTemplate {
        site_name: crate::app_config::site().name,
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Error").to_owned(),
    }
    .render()
    .unwrap_or_else(|e| {
        log::error!("render_error: {}", e);
        status.to_string()
    });
    replace_body(res, status, body)
}

fn replace_body<B>(
    res: ServiceResponse<B>,
    status: StatusCode,
    body: String,
) -> Result<ErrorHandlerResponse<B>> {
    let (req, _) = res.into_parts();
    let response = HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body);
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}
