//! Uploaded files.

use actix_web::http::header::{self, CacheControl, CacheDirective};
use actix_web::{HttpResponse, web};

use yatube_core::error::DomainError;

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Types served under their own name; anything else is sent as opaque bytes.
const IMAGE_TYPES: [&str; 4] = ["image/gif", "image/jpeg", "image/png", "image/webp"];
const OCTET_STREAM: &str = "application/octet-stream";

/// GET /media/{path}
pub async fn serve(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let path = path.into_inner();
    let data = state
        .media
        .read(&path)
        .await?
        .ok_or_else(|| DomainError::not_found("Media", &path))?;

    let content_type = mime_guess::from_path(&path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .filter(|essence| IMAGE_TYPES.contains(&essence.as_str()))
        .unwrap_or_else(|| OCTET_STREAM.to_string());

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type))
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .insert_header(CacheControl(vec![
            CacheDirective::Public,
            CacheDirective::MaxAge(3600),
        ]))
        .body(data))
}
