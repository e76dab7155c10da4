//! HTTP handlers and route configuration.

mod auth;
mod follow;
mod forms;
mod health;
mod media;
mod posts;
mod views;

#[cfg(test)]
mod tests;

use actix_multipart::form::MultipartFormConfig;
use actix_web::{HttpResponse, http::header, web};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Size limit of urlencoded form bodies.
const FORM_LIMIT: usize = 64 * 1024;

/// Shared state, body limits and routes of the application.
///
/// The post form accepts either encoding, which buffers the raw body first,
/// so the generic payload limit has to allow a full upload as well.
pub fn configure_app(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let upload_limit = state.settings.max_upload_bytes;
        cfg.app_data(web::Data::new(state))
            .app_data(web::FormConfig::default().limit(FORM_LIMIT))
            .app_data(web::PayloadConfig::new(upload_limit))
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(upload_limit)
                    .memory_limit(upload_limit),
            )
            .configure(configure_routes);
    }
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(posts::index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .route("/profile/{username}/follow/", web::get().to(follow::profile_follow))
        .route(
            "/profile/{username}/unfollow/",
            web::get().to(follow::profile_unfollow),
        )
        .route("/follow/", web::get().to(follow::follow_index))
        .route("/create/", web::get().to(posts::post_create_form))
        .route("/create/", web::post().to(posts::post_create))
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .route("/posts/{post_id}/edit/", web::get().to(posts::post_edit_form))
        .route("/posts/{post_id}/edit/", web::post().to(posts::post_edit))
        .route("/posts/{post_id}/comment/", web::post().to(posts::add_comment))
        // Accounts
        .service(
            web::scope("/auth")
                .route("/signup/", web::get().to(auth::signup_form))
                .route("/signup/", web::post().to(auth::signup))
                .route("/login/", web::get().to(auth::login_form))
                .route("/login/", web::post().to(auth::login))
                .route("/logout/", web::get().to(auth::logout)),
        )
        .route("/media/{path:.*}", web::get().to(media::serve))
        .route("/health", web::get().to(health::health_check));
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppResult<HttpResponse> {
    Err(AppError::NotFound("No route matches the request".to_string()))
}

/// 302 to a local path.
fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

/// Path of a user's profile page.
fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}
