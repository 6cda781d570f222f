//! End-to-end serving over a real listener.

mod common;

use std::sync::Arc;

use common::{site_config, start, write_site, GREET};
use reqwest::StatusCode;
use template_server::compile::scan_templates;
use template_server::config::routes::load_routes;
use template_server::lifecycle::Site;

#[tokio::test]
async fn greet_route_renders_assignment() {
    let dir = write_site(&[("greet.html", GREET)]);
    let config = site_config(dir.path());
    let server = start(config.clone(), Site::from_filesystem(&config)).await;

    let response = reqwest::get(server.url("/greet")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<h1>Hello World</h1>");

    server.stop();
}

#[tokio::test]
async fn unbound_method_uses_file_routing() {
    let dir = write_site(&[("greet.html", GREET)]);
    let config = site_config(dir.path());
    let server = start(config.clone(), Site::from_filesystem(&config)).await;

    let response = reqwest::Client::new()
        .delete(server.url("/greet"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<h1>Hello World</h1>");

    server.stop();
}

#[tokio::test]
async fn includes_and_form_values() {
    let dir = write_site(&[
        ("index.html", r#"<%@include file="partials/head.html" %>body"#),
        ("partials/head.html", "<title><%= request.method %></title>"),
        ("signup.html", "hi <%= form.name %> from <%= query.ref %>"),
    ]);
    let config = site_config(dir.path());
    let server = start(config.clone(), Site::from_filesystem(&config)).await;

    let body = reqwest::get(server.url("/")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "<title>GET</title>body");

    let body = reqwest::Client::new()
        .post(server.url("/signup?ref=mail"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Ada")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "hi Ada from mail");

    server.stop();
}

#[tokio::test]
async fn multipart_fields_reach_form_namespace() {
    let dir = write_site(&[("signup.html", "hi <%= form.name %> (<%= form.lang %>)")]);
    let config = site_config(dir.path());
    let server = start(config.clone(), Site::from_filesystem(&config)).await;

    let body = concat!(
        "--boundary42\r\n",
        "Content-Disposition: form-data; name=\"name\"\r\n\r\n",
        "Ada\r\n",
        "--boundary42\r\n",
        "Content-Disposition: form-data; name=\"lang\"\r\n\r\n",
        "en\r\n",
        "--boundary42--\r\n",
    );
    let response = reqwest::Client::new()
        .post(server.url("/signup"))
        .header("content-type", "multipart/form-data; boundary=boundary42")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "hi Ada (en)");

    server.stop();
}

#[tokio::test]
async fn missing_document_is_404() {
    let dir = write_site(&[("greet.html", GREET)]);
    let config = site_config(dir.path());
    let server = start(config.clone(), Site::from_filesystem(&config)).await;

    let response = reqwest::get(server.url("/absent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "File not found: absent.html");

    server.stop();
}

#[tokio::test]
async fn filesystem_edits_are_visible_without_restart() {
    let dir = write_site(&[("page.html", "one")]);
    let config = site_config(dir.path());
    let server = start(config.clone(), Site::from_filesystem(&config)).await;

    let body = reqwest::get(server.url("/page")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "one");

    std::fs::write(dir.path().join("root_http/page.html"), "two").unwrap();
    let body = reqwest::get(server.url("/page")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "two");

    server.stop();
}

/// The embedded registry built by the compile scan answers exactly like the
/// filesystem registry it was taken from.
#[tokio::test]
async fn embedded_snapshot_matches_filesystem() {
    let dir = write_site(&[
        ("greet.html", GREET),
        ("index.html", r#"<%@include file="nav.html" %><%= 2+3 %>"#),
        ("nav.html", "<nav><%= query.page %></nav>"),
    ]);
    let config = site_config(dir.path());

    let snapshot = scan_templates(dir.path().join("root_http").as_path(), &["html".to_string()])
        .unwrap();
    let routes = load_routes(&dir.path().join("routes.xml")).unwrap();
    let embedded = Site {
        registry: Arc::new(snapshot),
        routes,
    };

    let live = start(config.clone(), Site::from_filesystem(&config)).await;
    let frozen = start(config.clone(), embedded).await;

    for path in ["/greet", "/?page=7", "/nav", "/missing"] {
        let a = reqwest::get(live.url(path)).await.unwrap();
        let b = reqwest::get(frozen.url(path)).await.unwrap();
        assert_eq!(a.status(), b.status(), "status for {path}");
        assert_eq!(a.text().await.unwrap(), b.text().await.unwrap(), "body for {path}");
    }

    live.stop();
    frozen.stop();
}
