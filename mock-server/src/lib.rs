use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const TOKEN: &str = "test-token";
pub const USERNAME: &str = "dev@example.com";
pub const PASSWORD: &str = "secret";
pub const ANDROID_KEY_PASSWORD: &str = "keypass";
pub const ANDROID_KEYSTORE_PASSWORD: &str = "storepass";
pub const IOS_CERT_PASSWORD: &str = "certpass";

const PLATFORMS: [&str; 3] = ["ios", "android", "winphone"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Upload {
    pub filename: String,
    pub size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Collaborator {
    pub id: u64,
    pub email: String,
    pub role: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct App {
    pub id: u64,
    pub title: String,
    pub package: String,
    pub version: String,
    pub description: String,
    pub debug: bool,
    pub private: bool,
    pub phonegap_version: String,
    pub hydrates: bool,
    pub source: Option<String>,
    pub icon: Option<Upload>,
    pub status: BTreeMap<String, String>,
    pub collaborators: Vec<Collaborator>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Key {
    pub id: u64,
    pub platform: String,
    pub title: String,
    pub locked: bool,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    apps: BTreeMap<u64, App>,
    keys: BTreeMap<u64, Key>,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/me", get(profile))
        .route("/apps", get(list_apps).post(create_app))
        .route("/apps/{id}", get(get_app).put(update_app).delete(delete_app))
        .route("/apps/{id}/icon", get(get_icon).post(upload_icon))
        .route("/apps/{id}/build", post(build_all))
        .route("/apps/{id}/build/{platform}", post(build_platform))
        .route("/apps/{id}/collaborators", post(add_collaborator))
        .route(
            "/apps/{id}/collaborators/{cid}",
            put(update_collaborator).delete(delete_collaborator),
        )
        .route("/apps/{id}/{platform}", get(download))
        .route("/keys", get(list_keys))
        .route("/keys/{platform}", get(list_platform_keys).post(add_key))
        .route("/keys/{platform}/{id}", get(get_key).put(update_key).delete(delete_key))
        .route_layer(middleware::from_fn(require_auth))
        .with_state(db);
    Router::new().nest("/api/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Plumbing
// ---------------------------------------------------------------------------

type Reply = Result<Response, Response>;

fn error(status: StatusCode, detail: Value) -> Response {
    (status, Json(json!({ "error": detail }))).into_response()
}

fn bad_request(err: impl Display) -> Response {
    error(StatusCode::BAD_REQUEST, json!(err.to_string()))
}

fn app_not_found() -> Response {
    error(StatusCode::NOT_FOUND, json!("app not found"))
}

fn check_platform(platform: &str) -> Result<(), Response> {
    if PLATFORMS.contains(&platform) {
        Ok(())
    } else {
        Err(error(StatusCode::NOT_FOUND, json!(format!("Invalid platform: {platform}"))))
    }
}

#[derive(Deserialize)]
struct AuthQuery {
    auth_token: Option<String>,
}

async fn require_auth(request: Request, next: Next) -> Response {
    let token_ok = Query::<AuthQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|q| q.0.auth_token)
        .is_some_and(|t| t == TOKEN);
    let basic_ok = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(basic_matches);

    if token_ok || basic_ok {
        next.run(request).await
    } else {
        tracing::info!(uri = %request.uri().path(), "rejected unauthenticated request");
        error(StatusCode::UNAUTHORIZED, json!("Invalid authentication"))
    }
}

fn basic_matches(value: &str) -> bool {
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    STANDARD
        .decode(encoded)
        .ok()
        .and_then(|raw| String::from_utf8(raw).ok())
        .is_some_and(|pair| pair == format!("{USERNAME}:{PASSWORD}"))
}

/// A decoded multipart body: the JSON `data` field plus uploaded files.
#[derive(Debug, Default)]
struct Form {
    data: Map<String, Value>,
    files: BTreeMap<String, Upload>,
}

impl Form {
    fn text(&self, key: &str) -> Option<String> {
        self.data.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }
}

/// Requests without a body are valid and yield an empty form.
async fn read_form(request: Request) -> Result<Form, Response> {
    if !request.headers().contains_key(header::CONTENT_TYPE) {
        return Ok(Form::default());
    }
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(IntoResponse::into_response)?;

    let mut form = Form::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(bad_request)?;
        match filename {
            Some(filename) => {
                form.files.insert(
                    name,
                    Upload {
                        filename,
                        size: bytes.len(),
                    },
                );
            }
            None if name == "data" => {
                form.data = serde_json::from_slice(&bytes).map_err(bad_request)?;
            }
            None => {}
        }
    }
    Ok(form)
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

async fn profile() -> Json<Value> {
    Json(json!({
        "id": 1,
        "username": USERNAME,
        "email": USERNAME,
        "link": "/api/v1/me",
        "apps": { "link": "/api/v1/apps" },
        "keys": { "link": "/api/v1/keys" },
    }))
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

async fn list_apps(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let apps: Vec<&App> = store.apps.values().collect();
    Json(json!({ "apps": apps }))
}

async fn create_app(State(db): State<Db>, request: Request) -> Reply {
    let form = read_form(request).await?;

    let mut problems = Map::new();
    let title = form.text("title").unwrap_or_default();
    if title.is_empty() {
        problems.insert("title".into(), json!("can't be blank"));
    }
    let source = match form.text("create_method").as_deref() {
        Some("file") => match form.files.get("file") {
            Some(upload) => Some(upload.filename.clone()),
            None => {
                problems.insert("file".into(), json!("is missing"));
                None
            }
        },
        Some("remote_repo") => match form.text("repo") {
            Some(repo) => Some(repo),
            None => {
                problems.insert("repo".into(), json!("is missing"));
                None
            }
        },
        _ => None,
    };
    if !problems.is_empty() {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, Value::Object(problems)));
    }

    let mut store = db.write().await;
    let app = App {
        id: store.next_id(),
        title,
        package: form.text("package").unwrap_or_else(|| "com.phonegap.www".into()),
        version: form.text("version").unwrap_or_else(|| "0.0.1".into()),
        description: form.text("description").unwrap_or_default(),
        debug: form.flag("debug").unwrap_or(false),
        private: form.flag("private").unwrap_or(true),
        phonegap_version: form.text("phonegap_version").unwrap_or_else(|| "3.1.0".into()),
        hydrates: form.flag("hydrates").unwrap_or(false),
        source,
        icon: None,
        status: PLATFORMS.iter().map(|p| (p.to_string(), "pending".to_string())).collect(),
        collaborators: Vec::new(),
    };
    store.apps.insert(app.id, app.clone());
    tracing::info!(id = app.id, title = %app.title, "app created");
    Ok((StatusCode::CREATED, Json(app)).into_response())
}

async fn get_app(State(db): State<Db>, Path(id): Path<u64>) -> Reply {
    let store = db.read().await;
    let app = store.apps.get(&id).ok_or_else(app_not_found)?;
    Ok(Json(app).into_response())
}

async fn update_app(State(db): State<Db>, Path(id): Path<u64>, request: Request) -> Reply {
    let form = read_form(request).await?;
    let mut store = db.write().await;
    let app = store.apps.get_mut(&id).ok_or_else(app_not_found)?;

    if let Some(title) = form.text("title") {
        app.title = title;
    }
    if let Some(version) = form.text("version") {
        app.version = version;
    }
    if let Some(description) = form.text("description") {
        app.description = description;
    }
    if let Some(upload) = form.files.get("file") {
        app.source = Some(upload.filename.clone());
    }
    if form.flag("pull") == Some(true) && app.source.is_none() {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, json!("app has no repository to pull")));
    }
    for state in app.status.values_mut() {
        *state = "pending".to_string();
    }
    Ok(Json(app.clone()).into_response())
}

async fn delete_app(State(db): State<Db>, Path(id): Path<u64>) -> Reply {
    let mut store = db.write().await;
    store.apps.remove(&id).ok_or_else(app_not_found)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "success": "app deleted" }))).into_response())
}

async fn get_icon(State(db): State<Db>, Path(id): Path<u64>) -> Reply {
    let store = db.read().await;
    let app = store.apps.get(&id).ok_or_else(app_not_found)?;
    match &app.icon {
        Some(icon) => Ok(Json(json!({ "icon": icon })).into_response()),
        None => Err(error(StatusCode::NOT_FOUND, json!("app has no icon"))),
    }
}

async fn upload_icon(State(db): State<Db>, Path(id): Path<u64>, request: Request) -> Reply {
    let form = read_form(request).await?;
    let mut store = db.write().await;
    let app = store.apps.get_mut(&id).ok_or_else(app_not_found)?;
    let icon = form
        .files
        .get("icon")
        .ok_or_else(|| error(StatusCode::UNPROCESSABLE_ENTITY, json!({ "icon": "is missing" })))?;
    if !icon.filename.ends_with(".png") {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, json!({ "icon": "must be a png" })));
    }
    app.icon = Some(icon.clone());
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "icon": icon }))).into_response())
}

async fn download(State(db): State<Db>, Path((id, platform)): Path<(u64, String)>) -> Reply {
    check_platform(&platform)?;
    let store = db.read().await;
    let app = store.apps.get(&id).ok_or_else(app_not_found)?;
    if app.status.get(&platform).map(String::as_str) != Some("complete") {
        return Err(error(StatusCode::NOT_FOUND, json!(format!("no {platform} build available"))));
    }
    let location = format!("https://downloads.example.com/{id}/{platform}");
    Ok((StatusCode::FOUND, Json(json!({ "location": location }))).into_response())
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

/// Builds finish instantly.
async fn build_all(State(db): State<Db>, Path(id): Path<u64>, request: Request) -> Reply {
    let form = read_form(request).await?;
    let requested: Vec<String> = match form.data.get("platforms") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => PLATFORMS.iter().map(|p| p.to_string()).collect(),
    };
    for platform in &requested {
        check_platform(platform)?;
    }

    let mut store = db.write().await;
    let app = store.apps.get_mut(&id).ok_or_else(app_not_found)?;
    for platform in requested {
        app.status.insert(platform, "complete".to_string());
    }
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id, "status": app.status }))).into_response())
}

async fn build_platform(State(db): State<Db>, Path((id, platform)): Path<(u64, String)>) -> Reply {
    check_platform(&platform)?;
    let mut store = db.write().await;
    let app = store.apps.get_mut(&id).ok_or_else(app_not_found)?;
    app.status.insert(platform, "complete".to_string());
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id, "status": app.status }))).into_response())
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

fn validate_role(role: &str, problems: &mut Map<String, Value>) {
    if role != "tester" && role != "dev" {
        problems.insert("role".into(), json!("is invalid"));
    }
}

async fn add_collaborator(State(db): State<Db>, Path(id): Path<u64>, request: Request) -> Reply {
    let form = read_form(request).await?;
    let email = form.text("email").unwrap_or_default();
    let role = form.text("role").unwrap_or_else(|| "tester".into());

    let mut problems = Map::new();
    if !email.contains('@') {
        problems.insert("email".into(), json!("is invalid"));
    }
    validate_role(&role, &mut problems);
    if !problems.is_empty() {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, Value::Object(problems)));
    }

    let mut store = db.write().await;
    let collaborator_id = store.next_id();
    let app = store.apps.get_mut(&id).ok_or_else(app_not_found)?;
    let collaborator = Collaborator {
        id: collaborator_id,
        email,
        role,
    };
    app.collaborators.push(collaborator.clone());
    Ok((StatusCode::CREATED, Json(collaborator)).into_response())
}

async fn update_collaborator(
    State(db): State<Db>,
    Path((id, cid)): Path<(u64, u64)>,
    request: Request,
) -> Reply {
    let form = read_form(request).await?;
    let role = form.text("role").unwrap_or_else(|| "tester".into());
    let mut problems = Map::new();
    validate_role(&role, &mut problems);
    if !problems.is_empty() {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, Value::Object(problems)));
    }

    let mut store = db.write().await;
    let app = store.apps.get_mut(&id).ok_or_else(app_not_found)?;
    let collaborator = app
        .collaborators
        .iter_mut()
        .find(|c| c.id == cid)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, json!("collaborator not found")))?;
    collaborator.role = role;
    Ok(Json(collaborator.clone()).into_response())
}

async fn delete_collaborator(State(db): State<Db>, Path((id, cid)): Path<(u64, u64)>) -> Reply {
    let mut store = db.write().await;
    let app = store.apps.get_mut(&id).ok_or_else(app_not_found)?;
    let before = app.collaborators.len();
    app.collaborators.retain(|c| c.id != cid);
    if app.collaborators.len() == before {
        return Err(error(StatusCode::NOT_FOUND, json!("collaborator not found")));
    }
    Ok((StatusCode::ACCEPTED, Json(json!({ "success": "collaborator deleted" }))).into_response())
}

// ---------------------------------------------------------------------------
// Signing keys
// ---------------------------------------------------------------------------

fn key_not_found() -> Response {
    error(StatusCode::NOT_FOUND, json!("key not found"))
}

async fn list_keys(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let mut grouped = Map::new();
    for platform in PLATFORMS {
        let all: Vec<&Key> = store.keys.values().filter(|k| k.platform == platform).collect();
        grouped.insert(platform.to_string(), json!({ "all": all }));
    }
    Json(json!({ "keys": grouped }))
}

async fn list_platform_keys(State(db): State<Db>, Path(platform): Path<String>) -> Reply {
    check_platform(&platform)?;
    let store = db.read().await;
    let keys: Vec<&Key> = store.keys.values().filter(|k| k.platform == platform).collect();
    Ok(Json(json!({ "keys": keys })).into_response())
}

async fn add_key(State(db): State<Db>, Path(platform): Path<String>, request: Request) -> Reply {
    check_platform(&platform)?;
    let form = read_form(request).await?;

    let required_files: &[&str] = match platform.as_str() {
        "android" => &["keystore"],
        "ios" => &["cert", "profile"],
        _ => &[],
    };
    let mut problems = Map::new();
    let title = form.text("title").unwrap_or_default();
    if title.is_empty() {
        problems.insert("title".into(), json!("can't be blank"));
    }
    for name in required_files {
        if !form.files.contains_key(*name) {
            problems.insert((*name).to_string(), json!("is missing"));
        }
    }
    if !problems.is_empty() {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, Value::Object(problems)));
    }

    let mut store = db.write().await;
    let key = Key {
        id: store.next_id(),
        platform,
        title,
        locked: true,
    };
    store.keys.insert(key.id, key.clone());
    Ok((StatusCode::CREATED, Json(key)).into_response())
}

async fn get_key(State(db): State<Db>, Path((platform, id)): Path<(String, u64)>) -> Reply {
    check_platform(&platform)?;
    let store = db.read().await;
    let key = store
        .keys
        .get(&id)
        .filter(|k| k.platform == platform)
        .ok_or_else(key_not_found)?;
    Ok(Json(key).into_response())
}

/// Unlock a key. Wrong passwords and already-unlocked keys are reported in
/// the body of a 200 response, as the real service does.
async fn update_key(
    State(db): State<Db>,
    Path((platform, id)): Path<(String, u64)>,
    request: Request,
) -> Reply {
    check_platform(&platform)?;
    let form = read_form(request).await?;
    let mut store = db.write().await;
    let key = store
        .keys
        .get_mut(&id)
        .filter(|k| k.platform == platform)
        .ok_or_else(key_not_found)?;

    if let Some(title) = form.text("title") {
        key.title = title;
    }
    let unlocking = ["key_pw", "keystore_pw", "password"]
        .iter()
        .any(|f| form.data.contains_key(*f));
    if !unlocking {
        return Ok(Json(key.clone()).into_response());
    }
    if !key.locked {
        return Err(error(StatusCode::OK, json!("key already unlocked")));
    }

    let expected: &[(&str, &str)] = match platform.as_str() {
        "android" => &[
            ("key_pw", ANDROID_KEY_PASSWORD),
            ("keystore_pw", ANDROID_KEYSTORE_PASSWORD),
        ],
        _ => &[("password", IOS_CERT_PASSWORD)],
    };
    let mut problems = Map::new();
    for (field, secret) in expected {
        if form.text(field).as_deref() != Some(*secret) {
            problems.insert((*field).to_string(), json!("invalid"));
        }
    }
    if !problems.is_empty() {
        return Err(error(StatusCode::OK, Value::Object(problems)));
    }

    key.locked = false;
    Ok(Json(key.clone()).into_response())
}

async fn delete_key(State(db): State<Db>, Path((platform, id)): Path<(String, u64)>) -> Reply {
    check_platform(&platform)?;
    let mut store = db.write().await;
    match store.keys.get(&id) {
        Some(key) if key.platform == platform => {
            store.keys.remove(&id);
            Ok((StatusCode::ACCEPTED, Json(json!({ "success": "key deleted" }))).into_response())
        }
        _ => Err(key_not_found()),
    }
}
