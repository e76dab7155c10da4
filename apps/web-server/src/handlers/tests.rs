use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use tempfile::TempDir;

use yatube_core::domain::{
    Group, NewComment, NewFollow, NewGroup, NewPost, NewUser, PageRequest, Post, PostFilter, User,
};
use yatube_infra::{InMemoryDatabase, JwtConfig, JwtTokenService};

use super::auth::{DUPLICATE_USERNAME, INVALID_LOGIN};
use super::{configure_app, not_found};
use crate::config::SiteSettings;
use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::error::CONFLICTING_DATA;
use crate::state::AppState;

const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff!\xf9\x04\x00\x00\x00\x00\x00,\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0c\n\x00;";
const BOUNDARY: &str = "yatube-test-boundary";

struct Site {
    state: AppState,
    media: TempDir,
}

impl Site {
    fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let tokens = Arc::new(JwtTokenService::new(JwtConfig {
            secret: "test-secret".to_string(),
            lifetime: chrono::TimeDelta::hours(1),
            issuer: "yatube-test".to_string(),
        }));
        let state = AppState::in_memory(
            &InMemoryDatabase::new(),
            tokens,
            media.path().to_path_buf(),
            SiteSettings::default(),
        );
        Self {
            state,
            media,
        }
    }

    async fn user(&self, username: &str) -> User {
        let hash = self.state.passwords.hash("123456789").unwrap();
        self.state
            .users
            .create(NewUser::new(username, "example@yandex.ru", hash))
            .await
            .unwrap()
    }

    async fn group(&self, title: &str, slug: &str) -> Group {
        self.state
            .groups
            .create(NewGroup::new(title, slug, "Тестовое описание"))
            .await
            .unwrap()
    }

    async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        let mut post = NewPost::new(author.id, text);
        if let Some(group) = group {
            post = post.with_group(group.id);
        }
        self.state.posts.create(post).await.unwrap()
    }

    fn session(&self, user: &User) -> Cookie<'static> {
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username)
            .unwrap();
        Cookie::new(SESSION_COOKIE, token)
    }
}

/// Service wired like the server, over the site's state.
macro_rules! app {
    ($site:expr) => {
        test::init_service(
            App::new()
                .configure(configure_app($site.state.clone()))
                .default_service(web::to(not_found)),
        )
        .await
    };
}

async fn body_of(resp: ServiceResponse) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

fn location(resp: &ServiceResponse) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn template_marker(name: &str) -> String {
    format!("data-template=\"{}\"", name)
}

fn post_count(body: &str) -> usize {
    body.matches("<article class=\"post\">").count()
}

fn multipart_body(text: &str, group: &str, image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [("text", text), ("group", group)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: image/gif\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Files stored under the media `posts/` directory.
fn stored_posts_images(site: &Site) -> usize {
    std::fs::read_dir(site.media.path().join("posts"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// A valid PNG of noise, too large to fit under actix's default 256 KiB payload limit.
fn large_png() -> Vec<u8> {
    let pixels = image::RgbImage::from_fn(512, 512, |x, y| {
        let mut h = x.wrapping_mul(0x9E37_79B9) ^ y.wrapping_mul(0x85EB_CA6B);
        h ^= h >> 15;
        h = h.wrapping_mul(0x2C1B_3C6D);
        h ^= h >> 12;
        h = h.wrapping_mul(0x297A_2D39);
        h ^= h >> 15;
        let [r, g, b, _] = h.to_le_bytes();
        image::Rgb([r, g, b])
    });
    let mut png = std::io::Cursor::new(Vec::new());
    pixels.write_to(&mut png, image::ImageFormat::Png).unwrap();
    png.into_inner()
}

fn multipart_content_type() -> (header::HeaderName, String) {
    (
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    )
}

#[actix_rt::test]
async fn test_public_pages_use_expected_templates() {
    let site = Site::new();
    let author = site.user("auth").await;
    let group = site.group("Тестовая группа", "test-slug").await;
    let post = site.post(&author, "Тестовый пост", Some(&group)).await;
    let app = app!(site);

    let pages = [
        ("/".to_string(), "posts/index.html"),
        ("/group/test-slug/".to_string(), "posts/group_list.html"),
        ("/profile/auth/".to_string(), "posts/profile.html"),
        (format!("/posts/{}/", post.id), "posts/post_detail.html"),
        ("/auth/login/".to_string(), "users/login.html"),
        ("/auth/signup/".to_string(), "users/signup.html"),
    ];
    for (uri, template) in pages {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        let body = body_of(resp).await;
        assert!(body.contains(&template_marker(template)), "{}", uri);
    }
}

#[actix_rt::test]
async fn test_private_pages_use_expected_templates() {
    let site = Site::new();
    let author = site.user("auth").await;
    let post = site.post(&author, "Тестовый пост", None).await;
    let app = app!(site);

    let pages = [
        ("/create/".to_string(), "posts/create_post.html"),
        (format!("/posts/{}/edit/", post.id), "posts/create_post.html"),
        ("/follow/".to_string(), "posts/follow.html"),
    ];
    for (uri, template) in pages {
        let req = test::TestRequest::get()
            .uri(&uri)
            .cookie(site.session(&author))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        assert!(body_of(resp).await.contains(&template_marker(template)), "{}", uri);
    }
}

#[actix_rt::test]
async fn test_unknown_pages_render_custom_404() {
    let site = Site::new();
    let app = app!(site);

    for uri in ["/unexisting_page/", "/group/missing/", "/profile/nobody/", "/posts/99/"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert!(body_of(resp).await.contains(&template_marker("core/404.html")), "{}", uri);
    }
}

#[actix_rt::test]
async fn test_guest_is_sent_to_login() {
    let site = Site::new();
    let author = site.user("auth").await;
    let post = site.post(&author, "Тестовый пост", None).await;
    let app = app!(site);

    let edit = format!("/posts/{}/edit/", post.id);
    let cases = [
        ("/create/".to_string(), "/auth/login/?next=/create/".to_string()),
        (edit.clone(), format!("/auth/login/?next={}", edit)),
        ("/follow/".to_string(), "/auth/login/?next=/follow/".to_string()),
    ];
    for (uri, expected) in cases {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), expected);
    }

    let req = test::TestRequest::post()
        .uri("/create/")
        .set_form([("text", "Пост гостя"), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
    assert_eq!(site.state.posts.count(PostFilter::All).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_invalid_session_is_treated_as_guest() {
    let site = Site::new();
    let app = app!(site);

    let req = test::TestRequest::get()
        .uri("/create/")
        .cookie(Cookie::new(SESSION_COOKIE, "garbage"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
}

#[actix_rt::test]
async fn test_feeds_paginate_ten_then_three() {
    let site = Site::new();
    let author = site.user("auth").await;
    let follower = site.user("follower").await;
    let group = site.group("Тестовая группа", "test-slug").await;
    for i in 0..13 {
        site.post(&author, &format!("Пост {}", i), Some(&group)).await;
    }
    site.state
        .follows
        .create(NewFollow::new(follower.id, author.id))
        .await
        .unwrap();
    let app = app!(site);

    for uri in ["/", "/group/test-slug/", "/profile/auth/", "/follow/"] {
        for (page, expected) in [("1", 10), ("2", 3)] {
            let req = test::TestRequest::get()
                .uri(&format!("{}?page={}", uri, page))
                .cookie(site.session(&follower))
                .to_request();
            let body = body_of(test::call_service(&app, req).await).await;
            assert_eq!(post_count(&body), expected, "{} page {}", uri, page);
        }
    }
}

#[actix_rt::test]
async fn test_out_of_range_page_shows_last_page() {
    let site = Site::new();
    let author = site.user("auth").await;
    for i in 0..13 {
        site.post(&author, &format!("Пост {}", i), None).await;
    }
    let app = app!(site);

    let req = test::TestRequest::get().uri("/profile/auth/?page=99").to_request();
    assert_eq!(post_count(&body_of(test::call_service(&app, req).await).await), 3);

    let req = test::TestRequest::get().uri("/profile/auth/?page=abc").to_request();
    assert_eq!(post_count(&body_of(test::call_service(&app, req).await).await), 10);
}

#[actix_rt::test]
async fn test_post_shows_on_its_pages_only() {
    let site = Site::new();
    let author = site.user("auth").await;
    let group = site.group("Тестовая группа", "test-slug").await;
    site.group("Другая группа", "other-slug").await;
    site.post(&author, "Пост с группой", Some(&group)).await;
    let app = app!(site);

    for uri in ["/", "/group/test-slug/", "/profile/auth/"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body = body_of(test::call_service(&app, req).await).await;
        assert!(body.contains("Пост с группой"), "{}", uri);
    }

    let req = test::TestRequest::get().uri("/group/other-slug/").to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert_eq!(post_count(&body), 0);
}

#[actix_rt::test]
async fn test_index_is_cached_until_cleared() {
    let site = Site::new();
    let author = site.user("auth").await;
    let post = site.post(&author, "Пост для кеша", None).await;
    let app = app!(site);

    let req = test::TestRequest::get().uri("/").to_request();
    let first = body_of(test::call_service(&app, req).await).await;
    assert!(first.contains("Пост для кеша"));

    site.state.posts.delete(post.id).await.unwrap();

    let req = test::TestRequest::get().uri("/").to_request();
    let cached = body_of(test::call_service(&app, req).await).await;
    assert_eq!(cached, first);

    site.state.cache.clear().await.unwrap();

    let req = test::TestRequest::get().uri("/").to_request();
    let fresh = body_of(test::call_service(&app, req).await).await;
    assert_ne!(fresh, first);
    assert!(!fresh.contains("Пост для кеша"));
}

#[actix_rt::test]
async fn test_index_garbage_page_shares_first_page_entry() {
    let site = Site::new();
    let author = site.user("auth").await;
    let post = site.post(&author, "Пост для кеша", None).await;
    let app = app!(site);

    let req = test::TestRequest::get().uri("/?page=abc").to_request();
    let first = body_of(test::call_service(&app, req).await).await;
    assert!(first.contains("Пост для кеша"));

    site.state.posts.delete(post.id).await.unwrap();

    for uri in ["/", "/?page=1", "/?page=a2", "/?page=999"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body = body_of(test::call_service(&app, req).await).await;
        assert_eq!(body, first, "{}", uri);
    }
}

#[actix_rt::test]
async fn test_create_post_redirects_to_profile() {
    let site = Site::new();
    let author = site.user("auth").await;
    let group = site.group("Тестовая группа", "test-slug").await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(site.session(&author))
        .set_form([("text", "Новый пост"), ("group", group.id.to_string().as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/auth/");
    assert_eq!(site.state.posts.count(PostFilter::All).await.unwrap(), 1);
    let page = site
        .state
        .posts
        .find_page(PostFilter::Group(group.id), PageRequest::first(10))
        .await
        .unwrap();
    assert_eq!(page.items[0].text, "Новый пост");
    assert_eq!(page.items[0].author_id, author.id);
}

#[actix_rt::test]
async fn test_create_post_with_image_upload() {
    let site = Site::new();
    let author = site.user("auth").await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(site.session(&author))
        .insert_header(multipart_content_type())
        .set_payload(multipart_body("Пост с картинкой", "", Some(("small.gif", SMALL_GIF))))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let page = site
        .state
        .posts
        .find_page(PostFilter::All, PageRequest::first(10))
        .await
        .unwrap();
    let image = page.items[0].image.clone().unwrap();
    assert_eq!(image, "posts/small.gif");

    // The image shows in the feed and is served back
    let req = test::TestRequest::get().uri("/profile/auth/").to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("/media/posts/small.gif"));

    let req = test::TestRequest::get().uri("/media/posts/small.gif").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/gif");
    assert_eq!(test::read_body(resp).await.as_ref(), SMALL_GIF);
}

#[actix_rt::test]
async fn test_large_image_upload_is_accepted() {
    let site = Site::new();
    let author = site.user("auth").await;
    let app = app!(site);
    let png = large_png();
    assert!(png.len() > 256 * 1024);
    let body = multipart_body("Большая картинка", "", Some(("large.png", png.as_slice())));

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(site.session(&author))
        .insert_header(multipart_content_type())
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    let page = site
        .state
        .posts
        .find_page(PostFilter::All, PageRequest::first(10))
        .await
        .unwrap();
    assert_eq!(page.items[0].image.as_deref(), Some("posts/large.png"));

    let req = test::TestRequest::get().uri("/media/posts/large.png").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await.len(), png.len());
}

#[actix_rt::test]
async fn test_upload_is_renamed_after_its_format() {
    let site = Site::new();
    let author = site.user("auth").await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(site.session(&author))
        .insert_header(multipart_content_type())
        .set_payload(multipart_body("Картинка", "", Some(("x.html", SMALL_GIF))))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FOUND);

    let page = site
        .state
        .posts
        .find_page(PostFilter::All, PageRequest::first(10))
        .await
        .unwrap();
    assert_eq!(page.items[0].image.as_deref(), Some("posts/x.gif"));

    let req = test::TestRequest::get().uri("/media/posts/x.html").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/media/posts/x.gif").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/gif");
    assert_eq!(
        resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
}

#[actix_rt::test]
async fn test_non_image_media_is_served_as_bytes() {
    let site = Site::new();
    site.state
        .media
        .save("posts", "page.html", b"<script>alert(1)</script>")
        .await
        .unwrap();
    let app = app!(site);

    let req = test::TestRequest::get().uri("/media/posts/page.html").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    assert_eq!(
        resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
}

#[actix_rt::test]
async fn test_failed_insert_leaves_no_image_behind() {
    let site = Site::new();
    let author = site.user("auth").await;
    let session = site.session(&author);
    site.state.users.delete(author.id).await.unwrap();
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(session)
        .insert_header(multipart_content_type())
        .set_payload(multipart_body("Текст", "", Some(("small.gif", SMALL_GIF))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_of(resp).await;
    assert!(body.contains(CONFLICTING_DATA));
    assert!(!body.contains("does not exist"));
    assert_eq!(site.state.posts.count(PostFilter::All).await.unwrap(), 0);
    assert_eq!(stored_posts_images(&site), 0);
}

#[actix_rt::test]
async fn test_create_post_rejects_broken_image() {
    let site = Site::new();
    let author = site.user("auth").await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(site.session(&author))
        .insert_header(multipart_content_type())
        .set_payload(multipart_body("Текст", "", Some(("fake.gif", b"not an image"))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_of(resp).await;
    assert!(body.contains("Загрузите правильное изображение"));
    assert_eq!(site.state.posts.count(PostFilter::All).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_invalid_post_form_is_shown_again() {
    let site = Site::new();
    let author = site.user("auth").await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(site.session(&author))
        .set_form([("text", ""), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_of(resp).await;
    assert!(body.contains(&template_marker("posts/create_post.html")));
    assert!(body.contains("Обязательное поле."));
    assert_eq!(site.state.posts.count(PostFilter::All).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_author_edits_post() {
    let site = Site::new();
    let author = site.user("auth").await;
    let group = site.group("Тестовая группа", "test-slug").await;
    let post = site.post(&author, "Старый текст", None).await;
    let app = app!(site);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(site.session(&author))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("Старый текст"));

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(site.session(&author))
        .set_form([("text", "Новый текст"), ("group", group.id.to_string().as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    let edited = site.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "Новый текст");
    assert_eq!(edited.group_id, Some(group.id));
    assert_eq!(edited.author_id, author.id);
    assert_eq!(edited.pub_date, post.pub_date);
    assert_eq!(site.state.posts.count(PostFilter::All).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_non_author_cannot_edit() {
    let site = Site::new();
    let author = site.user("auth").await;
    let other = site.user("other").await;
    let post = site.post(&author, "Чужой пост", None).await;
    let app = app!(site);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(site.session(&other))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(site.session(&other))
        .set_form([("text", "Взлом"), ("group", "")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let unchanged = site.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "Чужой пост");
}

#[actix_rt::test]
async fn test_edit_link_only_for_author() {
    let site = Site::new();
    let author = site.user("auth").await;
    let other = site.user("other").await;
    let post = site.post(&author, "Пост", None).await;
    let app = app!(site);
    let edit_link = format!("/posts/{}/edit/", post.id);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .cookie(site.session(&author))
        .to_request();
    assert!(body_of(test::call_service(&app, req).await).await.contains(&edit_link));

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .cookie(site.session(&other))
        .to_request();
    assert!(!body_of(test::call_service(&app, req).await).await.contains(&edit_link));
}

#[actix_rt::test]
async fn test_comment_appears_on_post_page() {
    let site = Site::new();
    let author = site.user("auth").await;
    let reader = site.user("reader").await;
    let post = site.post(&author, "Пост", None).await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .cookie(site.session(&reader))
        .set_form([("text", "Текст комментария")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let req = test::TestRequest::get().uri(&format!("/posts/{}/", post.id)).to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("Текст комментария"));
    assert!(body.contains("reader"));
}

#[actix_rt::test]
async fn test_guest_cannot_comment() {
    let site = Site::new();
    let author = site.user("auth").await;
    let post = site.post(&author, "Пост", None).await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .set_form([("text", "Текст комментария")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("/auth/login/"));
    assert!(site.state.comments.find_by_post(post.id).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_blank_comment_is_dropped() {
    let site = Site::new();
    let author = site.user("auth").await;
    let post = site.post(&author, "Пост", None).await;
    site.state
        .comments
        .create(NewComment::new(post.id, author.id, "Первый"))
        .await
        .unwrap();
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .cookie(site.session(&author))
        .set_form([("text", "   ")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FOUND);
    assert_eq!(site.state.comments.find_by_post(post.id).await.unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_follow_and_unfollow() {
    let site = Site::new();
    let author = site.user("auth").await;
    let follower = site.user("follower").await;
    let app = app!(site);

    let req = test::TestRequest::get()
        .uri("/profile/auth/follow/")
        .cookie(site.session(&follower))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/auth/");
    assert!(site.state.follows.exists(follower.id, author.id).await.unwrap());

    // Following twice keeps a single subscription
    let req = test::TestRequest::get()
        .uri("/profile/auth/follow/")
        .cookie(site.session(&follower))
        .to_request();
    test::call_service(&app, req).await;
    assert_eq!(site.state.follows.count_all().await.unwrap(), 1);

    let req = test::TestRequest::get()
        .uri("/profile/auth/unfollow/")
        .cookie(site.session(&follower))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(!site.state.follows.exists(follower.id, author.id).await.unwrap());
}

#[actix_rt::test]
async fn test_cannot_follow_self() {
    let site = Site::new();
    let author = site.user("auth").await;
    let app = app!(site);

    let req = test::TestRequest::get()
        .uri("/profile/auth/follow/")
        .cookie(site.session(&author))
        .to_request();
    test::call_service(&app, req).await;

    assert_eq!(site.state.follows.count_all().await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_follow_feed_shows_only_followed_authors() {
    let site = Site::new();
    let author = site.user("auth").await;
    let follower = site.user("follower").await;
    let stranger = site.user("stranger").await;
    site.post(&author, "Пост автора", None).await;
    site.state
        .follows
        .create(NewFollow::new(follower.id, author.id))
        .await
        .unwrap();
    let app = app!(site);

    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(site.session(&follower))
        .to_request();
    assert!(body_of(test::call_service(&app, req).await).await.contains("Пост автора"));

    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(site.session(&stranger))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert_eq!(post_count(&body), 0);
}

#[actix_rt::test]
async fn test_profile_follow_button() {
    let site = Site::new();
    let author = site.user("auth").await;
    let follower = site.user("follower").await;
    let app = app!(site);

    let req = test::TestRequest::get()
        .uri("/profile/auth/")
        .cookie(site.session(&follower))
        .to_request();
    assert!(body_of(test::call_service(&app, req).await).await.contains("/profile/auth/follow/"));

    let req = test::TestRequest::get()
        .uri("/profile/auth/")
        .cookie(site.session(&author))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(!body.contains("/profile/auth/follow/"));
}

#[actix_rt::test]
async fn test_signup_creates_user_and_session() {
    let site = Site::new();
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([
            ("username", "Kir"),
            ("email", "kir@yandex.ru"),
            ("password", "123456789"),
            ("password_confirm", "123456789"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(resp.response().cookies().any(|c| c.name() == SESSION_COOKIE));
    assert!(site.state.users.find_by_username("Kir").await.unwrap().is_some());
}

#[actix_rt::test]
async fn test_signup_rejects_taken_username() {
    let site = Site::new();
    site.user("Kir").await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([
            ("username", "Kir"),
            ("email", "kir@yandex.ru"),
            ("password", "123456789"),
            ("password_confirm", "123456789"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains(DUPLICATE_USERNAME));
    assert_eq!(site.state.users.count_all().await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_login_returns_to_next() {
    let site = Site::new();
    site.user("auth").await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([
            ("username", "auth"),
            ("password", "123456789"),
            ("next", "/create/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/create/");
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap();
    let claims = site.state.tokens.validate_token(cookie.value()).unwrap();
    assert_eq!(claims.username, "auth");
}

#[actix_rt::test]
async fn test_login_ignores_next_with_control_characters() {
    let site = Site::new();
    site.user("auth").await;
    let app = app!(site);

    for next in ["/\t/evil.example", "/\n/evil.example"] {
        let req = test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([("username", "auth"), ("password", "123456789"), ("next", next)])
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/", "{:?}", next);
    }
}

#[actix_rt::test]
async fn test_login_with_wrong_password() {
    let site = Site::new();
    site.user("auth").await;
    let app = app!(site);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([("username", "auth"), ("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_of(resp).await;
    assert!(body.contains(&template_marker("users/login.html")));
    assert!(body.contains(INVALID_LOGIN));
}

#[actix_rt::test]
async fn test_logout_drops_session() {
    let site = Site::new();
    let author = site.user("auth").await;
    let app = app!(site);

    let req = test::TestRequest::get()
        .uri("/auth/logout/")
        .cookie(site.session(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap();
    assert_eq!(cookie.value(), "");
}

#[actix_rt::test]
async fn test_missing_media_is_404() {
    let site = Site::new();
    let app = app!(site);

    let req = test::TestRequest::get().uri("/media/posts/none.gif").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_health_check() {
    let site = Site::new();
    let app = app!(site);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
