//! Page templates, compiled into the binary.

use std::sync::LazyLock;

use actix_web::HttpResponse;
use actix_web::http::header::ContentType;
use serde::Serialize;
use tera::{Context, Tera};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;

macro_rules! embedded {
    ($($name:literal),* $(,)?) => {
        [$(($name, include_str!(concat!("../templates/", $name)))),*]
    };
}

static TEMPLATES: LazyLock<Tera> = LazyLock::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(embedded![
        "base.html",
        "includes/macros.html",
        "posts/index.html",
        "posts/follow.html",
        "posts/group_list.html",
        "posts/profile.html",
        "posts/post_detail.html",
        "posts/create_post.html",
        "users/login.html",
        "users/signup.html",
        "core/400.html",
        "core/404.html",
        "core/500.html",
    ])
    .expect("embedded templates must parse");
    tera
});

/// Signed-in user as templates see it.
#[derive(Debug, Serialize)]
struct Viewer<'a> {
    id: i32,
    username: &'a str,
}

/// Fresh context carrying the current viewer.
pub fn context(viewer: Option<&Identity>) -> Context {
    let mut context = Context::new();
    let viewer = viewer.map(|identity| Viewer {
        id: identity.user_id,
        username: &identity.username,
    });
    context.insert("viewer", &viewer);
    context
}

/// Render a template to a string. `template_name` is exposed to the page.
pub fn render(name: &str, context: &Context) -> tera::Result<String> {
    let mut context = context.clone();
    if !context.contains_key("viewer") {
        context.insert("viewer", &Option::<Viewer>::None);
    }
    context.insert("template_name", name);
    TEMPLATES.render(name, &context)
}

/// Render a template into a 200 HTML response.
pub fn page(name: &str, context: &Context) -> AppResult<HttpResponse> {
    let body = render(name, context)?;
    Ok(html(body))
}

pub fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}
