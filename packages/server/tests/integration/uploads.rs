use reqwest::header;
use reqwest::multipart::{Form, Part};
use sea_orm::EntityTrait;

use corkboard::entity::{post_attachment, post_image};

use crate::common::{Session, TestApp, routes};

async fn upload(app: &TestApp, session: &Session, name: &str, mime: &str, bytes: &[u8]) {
    let form = Form::new().text("title", "Media").text("content", "").part(
        "attachment",
        Part::bytes(bytes.to_vec())
            .file_name(name.to_string())
            .mime_str(mime)
            .unwrap(),
    );
    let res = app.post_multipart(routes::CREATE, form, Some(session)).await;
    assert_eq!(res.notice().as_deref(), Some("Post created."));
}

#[tokio::test]
async fn image_is_served_inline() {
    let app = TestApp::spawn().await;
    let alice = app.poster("alice").await;
    upload(&app, &alice, "cat.png", "image/png", b"not really a png").await;
    let image = post_image::Entity::find().one(&app.db).await.unwrap().unwrap();

    let res = app
        .get(&format!("/uploads/images/{}", image.filename), None)
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.text, "not really a png");
    assert_eq!(res.headers[header::CONTENT_TYPE], "image/png");
    let disposition = res.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("inline;"));
}

#[tokio::test]
async fn image_is_embedded_in_listing() {
    let app = TestApp::spawn().await;
    let alice = app.poster("alice").await;
    upload(&app, &alice, "cat.png", "image/png", b"png").await;
    let image = post_image::Entity::find().one(&app.db).await.unwrap().unwrap();

    let page = app.get(routes::HOME, None).await;

    assert!(page
        .text
        .contains(&format!(r#"<img src="/uploads/images/{}""#, image.filename)));
}

#[tokio::test]
async fn attachment_downloads_under_original_name() {
    let app = TestApp::spawn().await;
    let alice = app.poster("alice").await;
    upload(&app, &alice, "My Notes.txt", "text/plain", b"remember the milk").await;
    let file = post_attachment::Entity::find()
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();

    let res = app
        .get(&format!("/uploads/files/{}", file.filename), None)
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.text, "remember the milk");
    assert_eq!(res.headers[header::CONTENT_TYPE], "text/plain");
    let disposition = res.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains(r#"filename="My Notes.txt""#));
    assert!(disposition.contains("filename*=UTF-8''My%20Notes.txt"));

    let page = app.get(routes::HOME, None).await;
    assert!(page.text.contains("My Notes.txt</a>"));
}

#[tokio::test]
async fn missing_files_are_404() {
    let app = TestApp::spawn().await;

    assert_eq!(
        app.get("/uploads/images/nope.png", None).await.status,
        404
    );
    assert_eq!(app.get("/uploads/files/nope.txt", None).await.status, 404);
}

#[tokio::test]
async fn invalid_names_are_rejected() {
    let app = TestApp::spawn().await;

    let res = app.get("/uploads/images/.env", None).await;
    assert_eq!(res.status, 400);

    let res = app.get("/uploads/files/..%5Csecret", None).await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn files_are_not_served_from_the_wrong_bucket() {
    let app = TestApp::spawn().await;
    let alice = app.poster("alice").await;
    upload(&app, &alice, "cat.png", "image/png", b"png").await;
    let image = post_image::Entity::find().one(&app.db).await.unwrap().unwrap();

    let res = app
        .get(&format!("/uploads/files/{}", image.filename), None)
        .await;

    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn markup_declared_as_image_is_only_offered_as_download() {
    let app = TestApp::spawn().await;
    let alice = app.poster("alice").await;
    upload(
        &app,
        &alice,
        "evil.html",
        "image/png",
        b"<script>alert(document.cookie)</script>",
    )
    .await;

    assert_eq!(post_image::Entity::find().all(&app.db).await.unwrap().len(), 0);
    assert_eq!(app.stored_files("images"), 0);
    let file = post_attachment::Entity::find()
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(file.original_filename, "evil.html");

    let res = app
        .get(&format!("/uploads/images/{}", file.filename), None)
        .await;
    assert_eq!(res.status, 404);

    let res = app
        .get(&format!("/uploads/files/{}", file.filename), None)
        .await;
    assert_eq!(res.status, 200);
    assert_ne!(res.headers[header::CONTENT_TYPE], "text/html");
    let disposition = res.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert_eq!(res.headers[header::CONTENT_SECURITY_POLICY], "sandbox");
}

#[tokio::test]
async fn svg_is_an_attachment_not_an_inline_image() {
    let app = TestApp::spawn().await;
    let alice = app.poster("alice").await;
    upload(
        &app,
        &alice,
        "logo.svg",
        "image/svg+xml",
        br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#,
    )
    .await;

    assert_eq!(app.stored_files("images"), 0);
    assert_eq!(app.stored_files("files"), 1);
    let file = post_attachment::Entity::find()
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();

    let res = app
        .get(&format!("/uploads/files/{}", file.filename), None)
        .await;
    let disposition = res.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert_eq!(res.headers[header::CONTENT_SECURITY_POLICY], "sandbox");
}

#[tokio::test]
async fn image_is_served_with_the_type_recorded_at_upload() {
    let app = TestApp::spawn().await;
    let alice = app.poster("alice").await;
    upload(&app, &alice, "photo.jpg", "image/jpeg", b"jpeg bytes").await;
    let image = post_image::Entity::find().one(&app.db).await.unwrap().unwrap();
    assert_eq!(image.content_type, "image/jpeg");

    let res = app
        .get(&format!("/uploads/images/{}", image.filename), None)
        .await;

    assert_eq!(res.headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(res.headers[header::CONTENT_SECURITY_POLICY], "sandbox");
}
