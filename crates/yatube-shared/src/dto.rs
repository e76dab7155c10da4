//! Account forms and query strings.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::forms::{FieldMeta, FormErrors, REQUIRED, error};

pub const INVALID_USERNAME: &str = "Введите правильное имя пользователя. Оно может содержать только буквы, цифры и знаки @/./+/-/_.";
pub const USERNAME_MAX_CHARS: usize = 150;

fn valid_username(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(error("required", REQUIRED));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if value.chars().count() > USERNAME_MAX_CHARS || !value.chars().all(allowed) {
        return Err(error("username", INVALID_USERNAME));
    }
    Ok(())
}

/// Request to register a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(custom(function = "valid_username"))]
    pub username: String,

    #[serde(default)]
    #[validate(email(message = "Введите правильный адрес электронной почты."))]
    pub email: String,

    #[serde(default)]
    #[validate(length(
        min = 8,
        message = "Пароль слишком короткий. Он должен содержать как минимум 8 символов."
    ))]
    pub password: String,

    #[serde(default)]
    #[validate(must_match(other = "password", message = "Пароли не совпадают."))]
    pub password_confirm: String,
}

impl SignupRequest {
    pub const FIELDS: [FieldMeta; 4] = [
        FieldMeta::input("username", "Имя пользователя"),
        FieldMeta::input("email", "Адрес электронной почты"),
        FieldMeta::input("password", "Пароль"),
        FieldMeta::input("password_confirm", "Подтверждение пароля"),
    ];

    pub fn check(&self) -> Result<(), FormErrors> {
        self.validate().map_err(FormErrors::from)
    }
}

/// Request to login. `next` is the local path to return to afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginRequest {
    pub const FIELDS: [FieldMeta; 2] = [
        FieldMeta::input("username", "Имя пользователя"),
        FieldMeta::input("password", "Пароль"),
    ];
}

/// `?next=` on the login page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// `?page=` on feeds. Kept as a string so that garbage falls back to page 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Accept a redirect target only if it stays on this site.
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would turn into
/// `//host`; any control character rejects the path.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|path| {
        path.starts_with('/')
            && !path.starts_with("//")
            && !path.contains('\\')
            && !path.chars().any(char::is_control)
    })
}
