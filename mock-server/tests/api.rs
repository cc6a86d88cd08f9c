use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, App, Key, ANDROID_KEYSTORE_PASSWORD, ANDROID_KEY_PASSWORD, PASSWORD, TOKEN, USERNAME};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "mock-test-boundary";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed(path: &str) -> String {
    format!("/api/v1{path}?auth_token={TOKEN}")
}

/// Multipart body with file parts first and an optional JSON `data` field.
fn multipart_body(data: Option<Value>, files: &[(&str, &str, &str)]) -> String {
    let mut body = String::new();
    for (name, filename, content) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
        ));
    }
    if let Some(data) = data {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{data}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn form_request(method: &str, uri: &str, data: Option<Value>, files: &[(&str, &str, &str)]) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body(data, files))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_401() {
    let resp = app().oneshot(empty_request("GET", "/api/v1/me")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "Invalid authentication"}));
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app()
        .oneshot(empty_request("GET", "/api/v1/me?auth_token=nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn basic_auth_is_accepted() {
    use base64::Engine;
    let credentials = base64::engine::general_purpose::STANDARD.encode(format!("{USERNAME}:{PASSWORD}"));
    let req = Request::builder()
        .uri("/api/v1/me")
        .header(http::header::AUTHORIZATION, format!("Basic {credentials}"))
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["username"], USERNAME);
}

// --- apps ---

#[tokio::test]
async fn create_app_from_file_returns_201() {
    let resp = app()
        .oneshot(form_request(
            "POST",
            &authed("/apps"),
            Some(json!({"title": "Demo", "create_method": "file"})),
            &[("file", "www.zip", "PK fake zip")],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: App = body_json(resp).await;
    assert_eq!(created.title, "Demo");
    assert_eq!(created.source.as_deref(), Some("www.zip"));
    assert_eq!(created.package, "com.phonegap.www");
}

#[tokio::test]
async fn create_app_reports_field_errors() {
    let resp = app()
        .oneshot(form_request(
            "POST",
            &authed("/apps"),
            Some(json!({"title": "", "create_method": "file"})),
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"]["title"], "can't be blank");
    assert_eq!(body["error"]["file"], "is missing");
}

#[tokio::test]
async fn malformed_data_field_returns_400() {
    let req = Request::builder()
        .method("POST")
        .uri(authed("/apps"))
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\nnot json\r\n--{BOUNDARY}--\r\n"
        ))
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_app_not_found() {
    let resp = app().oneshot(empty_request("GET", &authed("/apps/999"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "app not found"}));
}

#[tokio::test]
async fn unknown_platform_returns_404() {
    let resp = app()
        .oneshot(empty_request("GET", &authed("/keys/blackberry")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "Invalid platform: blackberry");
}

// --- keys ---

#[tokio::test]
async fn key_unlock_errors_arrive_with_200() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "POST",
            &authed("/keys/android"),
            Some(json!({"title": "release"})),
            &[("keystore", "release.keystore", "binary")],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let key: Key = body_json(resp).await;
    assert!(key.locked);

    // wrong keystore password
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "PUT",
            &authed(&format!("/keys/android/{}", key.id)),
            Some(json!({"key_pw": ANDROID_KEY_PASSWORD, "keystore_pw": "wrong"})),
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": {"keystore_pw": "invalid"}}));

    // right passwords
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "PUT",
            &authed(&format!("/keys/android/{}", key.id)),
            Some(json!({"key_pw": ANDROID_KEY_PASSWORD, "keystore_pw": ANDROID_KEYSTORE_PASSWORD})),
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let unlocked: Key = body_json(resp).await;
    assert!(!unlocked.locked);

    // already unlocked
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "PUT",
            &authed(&format!("/keys/android/{}", key.id)),
            Some(json!({"key_pw": ANDROID_KEY_PASSWORD, "keystore_pw": ANDROID_KEYSTORE_PASSWORD})),
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "key already unlocked"}));
}

// --- full application lifecycle ---

#[tokio::test]
async fn app_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create from repo
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "POST",
            &authed("/apps"),
            Some(json!({"title": "Repo app", "create_method": "remote_repo", "repo": "https://github.com/example/app"})),
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: App = body_json(resp).await;
    let id = created.id;

    // download before any build: nothing there yet
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &authed(&format!("/apps/{id}/android"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // build without a body builds every platform
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("POST", &authed(&format!("/apps/{id}/build"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["status"]["android"], "complete");
    assert_eq!(body["status"]["ios"], "complete");

    // download answers with a redirect
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &authed(&format!("/apps/{id}/android"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    let body: Value = body_json(resp).await;
    assert!(body["location"].as_str().unwrap().ends_with(&format!("/{id}/android")));

    // collaborator with a bad role
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "POST",
            &authed(&format!("/apps/{id}/collaborators")),
            Some(json!({"email": "qa@example.com", "role": "owner"})),
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &authed(&format!("/apps/{id}"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    // list after delete is empty
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &authed("/apps")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"apps": []}));
}
