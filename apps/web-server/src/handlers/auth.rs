//! Account handlers: signup, login and logout.

use actix_web::http::header;
use actix_web::{HttpResponse, web};

use yatube_core::domain::{NewUser, User};
use yatube_core::error::RepoError;
use yatube_shared::FormErrors;
use yatube_shared::dto::{LoginRequest, NextQuery, SignupRequest, safe_next};
use yatube_shared::forms::REQUIRED;

use super::forms::bind;
use crate::middleware::auth::{OptionalIdentity, removal_cookie, session_cookie};
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::templates;

pub const DUPLICATE_USERNAME: &str = "Пользователь с таким именем уже существует.";
pub const INVALID_LOGIN: &str = "Пожалуйста, введите правильные имя пользователя и пароль. Оба поля могут быть чувствительны к регистру.";

/// Issue a session for `user` and send them to `location`.
fn start_session(state: &AppState, user: &User, location: &str) -> AppResult<HttpResponse> {
    let token = state.tokens.generate_token(user.id, &user.username)?;
    let cookie = session_cookie(
        token,
        state.tokens.expiration_seconds(),
        state.settings.secure_cookies,
    );

    Ok(HttpResponse::Found()
        .cookie(cookie)
        .insert_header((header::LOCATION, location))
        .finish())
}

fn render_signup(
    viewer: &OptionalIdentity,
    form: &SignupRequest,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let values = [
        ("username", form.username.as_str()),
        ("email", form.email.as_str()),
    ];
    let mut context = templates::context(viewer.0.as_ref());
    context.insert("form", &bind(&SignupRequest::FIELDS, &values, errors));
    templates::page("users/signup.html", &context)
}

/// GET /auth/signup/
pub async fn signup_form(identity: OptionalIdentity) -> AppResult<HttpResponse> {
    render_signup(&identity, &SignupRequest::default(), &FormErrors::default())
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    body: web::Form<SignupRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut errors = req.check().err().unwrap_or_default();
    if errors.get("username").is_empty()
        && state.users.find_by_username(&req.username).await?.is_some()
    {
        errors.add("username", DUPLICATE_USERNAME);
    }
    if !errors.is_empty() {
        return render_signup(&identity, &req, &errors);
    }

    let password_hash = state.passwords.hash(&req.password)?;
    let user = match state
        .users
        .create(NewUser::new(&req.username, &req.email, password_hash))
        .await
    {
        Ok(user) => user,
        Err(RepoError::Constraint(_)) => {
            errors.add("username", DUPLICATE_USERNAME);
            return render_signup(&identity, &req, &errors);
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    start_session(&state, &user, "/")
}

fn render_login(
    viewer: &OptionalIdentity,
    form: &LoginRequest,
    errors: &FormErrors,
    non_field_errors: &[&str],
) -> AppResult<HttpResponse> {
    let values = [("username", form.username.as_str())];
    let mut context = templates::context(viewer.0.as_ref());
    context.insert("form", &bind(&LoginRequest::FIELDS, &values, errors));
    context.insert("next", &safe_next(form.next.as_deref()));
    context.insert("non_field_errors", non_field_errors);
    templates::page("users/login.html", &context)
}

/// GET /auth/login/
pub async fn login_form(
    identity: OptionalIdentity,
    query: web::Query<NextQuery>,
) -> AppResult<HttpResponse> {
    let form = LoginRequest {
        next: query.into_inner().next,
        ..LoginRequest::default()
    };
    render_login(&identity, &form, &FormErrors::default(), &[])
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    body: web::Form<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut errors = FormErrors::default();
    if req.username.trim().is_empty() {
        errors.add("username", REQUIRED);
    }
    if req.password.is_empty() {
        errors.add("password", REQUIRED);
    }
    if !errors.is_empty() {
        return render_login(&identity, &req, &errors, &[]);
    }

    let user = match state.users.find_by_username(&req.username).await? {
        Some(user) if state.passwords.verify(&req.password, &user.password_hash)? => user,
        _ => {
            tracing::debug!(username = %req.username, "Login rejected");
            return render_login(&identity, &req, &errors, &[INVALID_LOGIN]);
        }
    };

    tracing::info!(user_id = user.id, "User logged in");
    let location = safe_next(req.next.as_deref()).unwrap_or("/");
    start_session(&state, &user, location)
}

/// GET /auth/logout/
pub async fn logout() -> HttpResponse {
    HttpResponse::Found()
        .cookie(removal_cookie())
        .insert_header((header::LOCATION, "/"))
        .finish()
}
