//! Recording UI and an in-process backend shared by the unit tests.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use shared::{
    domain::{ObjectId, ObjectType, ResourceObject},
    protocol::{CreateObjectRequest, EmailVerificationRequest, SigninRequest, SignupRequest},
};
use tokio::net::TcpListener;

use crate::{
    session::MemorySessionStore,
    transport::{ApiClient, ApiConfig, CredentialTransport},
    ui::{Notice, NoticeLevel, UiSurface, View},
    view_model::{ProfileView, ResourceListView},
    SessionController,
};

pub const VALID_TOKEN: &str = "tok-ann";
pub const VERIFICATION_CODE: &str = "123456";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Navigate(View),
    Notice(Notice),
    Confirm(String),
    Profile(ProfileView),
    Resources(ResourceListView),
    ResetForm,
}

pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
    confirm_answer: bool,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            confirm_answer: true,
        }
    }

    pub fn declining() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            confirm_answer: false,
        }
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().expect("ui events").clone()
    }

    pub fn navigations(&self) -> Vec<View> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Navigate(view) => Some(view),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn error_notices(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|notice| notice.level == NoticeLevel::Error)
            .map(|notice| notice.message)
            .collect()
    }

    pub fn renders(&self) -> Vec<ResourceListView> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Resources(list) => Some(list),
                _ => None,
            })
            .collect()
    }

    pub fn last_render(&self) -> Option<ResourceListView> {
        self.renders().pop()
    }

    fn push(&self, event: UiEvent) {
        self.events.lock().expect("ui events").push(event);
    }
}

impl UiSurface for RecordingUi {
    fn navigate(&self, view: View) {
        self.push(UiEvent::Navigate(view));
    }

    fn notify(&self, notice: Notice) {
        self.push(UiEvent::Notice(notice));
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.push(UiEvent::Confirm(prompt.to_string()));
        self.confirm_answer
    }

    fn render_profile(&self, profile: &ProfileView) {
        self.push(UiEvent::Profile(profile.clone()));
    }

    fn render_resources(&self, list: &ResourceListView) {
        self.push(UiEvent::Resources(list.clone()));
    }

    fn reset_resource_form(&self) {
        self.push(UiEvent::ResetForm);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Default)]
struct BackendInner {
    requests: Vec<RecordedRequest>,
    objects: Vec<ResourceObject>,
    next_id: i64,
    fail_profile: bool,
    fail_logout: bool,
}

#[derive(Clone, Default)]
pub struct Backend {
    inner: Arc<Mutex<BackendInner>>,
}

impl Backend {
    pub fn with_objects(objects: Vec<ResourceObject>) -> Self {
        let backend = Self::default();
        {
            let mut inner = backend.inner.lock().expect("backend");
            inner.next_id = objects.iter().map(|object| object.id.0).max().unwrap_or(0) + 1;
            inner.objects = objects;
        }
        backend
    }

    pub fn fail_profile(&self) {
        self.inner.lock().expect("backend").fail_profile = true;
    }

    pub fn fail_logout(&self) {
        self.inner.lock().expect("backend").fail_logout = true;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().expect("backend").requests.clone()
    }

    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub fn objects(&self) -> Vec<ResourceObject> {
        self.inner.lock().expect("backend").objects.clone()
    }

    fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap) {
        let header_text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        self.inner.lock().expect("backend").requests.push(RecordedRequest {
            method: method.clone(),
            path: uri.path().to_string(),
            authorization: header_text(header::AUTHORIZATION),
            cookie: header_text(header::COOKIE),
        });
    }
}

pub fn object(id: i64, name: &str, object_type: ObjectType, parent: Option<i64>) -> ResourceObject {
    ResourceObject {
        id: ObjectId(id),
        name: name.to_string(),
        object_type,
        parent_id: parent.map(ObjectId),
    }
}

fn presented_token(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(bearer.to_string());
    }
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, _)| *name == "token")
                .map(|(_, value)| value.to_string())
        })
}

fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    match presented_token(headers) {
        Some(token) if token == VALID_TOKEN => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response()),
    }
}

async fn register(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<SignupRequest>,
) -> Response {
    backend.record(&method, &uri, &headers);
    if body.username == "taken" {
        return (StatusCode::CONFLICT, "User already exists").into_response();
    }
    StatusCode::CREATED.into_response()
}

async fn verify_email(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<EmailVerificationRequest>,
) -> Response {
    backend.record(&method, &uri, &headers);
    if body.code != VERIFICATION_CODE {
        return (StatusCode::BAD_REQUEST, "Invalid confirmation code").into_response();
    }
    Json(json!({ "jwtToken": "tok-verified" })).into_response()
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

async fn resend_verification(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<EmailQuery>,
) -> Response {
    backend.record(&method, &uri, &headers);
    if query.email.contains('@') {
        StatusCode::OK.into_response()
    } else {
        (StatusCode::NOT_FOUND, "User not found").into_response()
    }
}

async fn accept(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.record(&method, &uri, &headers);
    StatusCode::OK.into_response()
}

async fn login(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<SigninRequest>,
) -> Response {
    backend.record(&method, &uri, &headers);
    match (body.username.as_str(), body.password.as_str()) {
        ("ann", "secret") => {
            Json(json!({ "jwtToken": VALID_TOKEN, "refreshToken": "refresh-ann" })).into_response()
        }
        ("legacy", "secret") => Json(json!({ "token": VALID_TOKEN })).into_response(),
        ("tokenless", "secret") => Json(json!({})).into_response(),
        _ => (StatusCode::UNAUTHORIZED, "Invalid username or password").into_response(),
    }
}

async fn logout(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.record(&method, &uri, &headers);
    if backend.inner.lock().expect("backend").fail_logout {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Redis unavailable").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn validate(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.record(&method, &uri, &headers);
    match authorize(&headers) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(rejection) => rejection,
    }
}

async fn profile(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.record(&method, &uri, &headers);
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    if backend.inner.lock().expect("backend").fail_profile {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
    }
    Json(json!({
        "username": "ann",
        "email": "ann@example.com",
        "firstName": "Ann",
        "lastName": "Lee",
        "roles": [{ "id": 1, "roleType": "ROLE_USER" }]
    }))
    .into_response()
}

async fn list_objects(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.record(&method, &uri, &headers);
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    Json(backend.objects()).into_response()
}

async fn create_object(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<CreateObjectRequest>,
) -> Response {
    backend.record(&method, &uri, &headers);
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let mut inner = backend.inner.lock().expect("backend");
    inner.next_id = inner.next_id.max(1);
    let created = ResourceObject {
        id: ObjectId(inner.next_id),
        name: body.name,
        object_type: body.object_type,
        parent_id: body.parent_id,
    };
    inner.next_id += 1;
    inner.objects.push(created.clone());
    Json(created).into_response()
}

async fn delete_object(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    backend.record(&method, &uri, &headers);
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let mut inner = backend.inner.lock().expect("backend");
    let before = inner.objects.len();
    inner.objects.retain(|object| object.id.0 != id);
    if inner.objects.len() == before {
        return (StatusCode::NOT_FOUND, format!("Object {id} not found")).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_children(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    backend.record(&method, &uri, &headers);
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let children: Vec<ResourceObject> = backend
        .objects()
        .into_iter()
        .filter(|object| object.parent_id == Some(ObjectId(id)))
        .collect();
    Json(children).into_response()
}

#[derive(Deserialize)]
struct TypeQuery {
    #[serde(rename = "type")]
    object_type: ObjectType,
}

async fn list_by_type(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<TypeQuery>,
) -> Response {
    backend.record(&method, &uri, &headers);
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let matching: Vec<ResourceObject> = backend
        .objects()
        .into_iter()
        .filter(|object| object.object_type == query.object_type)
        .collect();
    Json(matching).into_response()
}

pub async fn spawn_backend(backend: Backend) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/auth/register-user", post(register))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/forgot-password", post(accept))
        .route("/auth/reset-password", post(accept))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/validate", get(validate))
        .route("/auth/profile", get(profile))
        .route("/users/info", get(profile))
        .route("/real-estate-objects", get(list_objects).post(create_object))
        .route("/real-estate-objects/by-type", get(list_by_type))
        .route("/real-estate-objects/:id", delete(delete_object))
        .route("/real-estate-objects/:id/children", get(list_children))
        .with_state(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

/// Base url of a port nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

pub struct Harness {
    pub controller: SessionController,
    pub ui: Arc<RecordingUi>,
    pub store: Arc<MemorySessionStore>,
}

pub fn harness_for(
    server_url: &str,
    store: MemorySessionStore,
    ui: RecordingUi,
    transport: CredentialTransport,
) -> Harness {
    let mut config = ApiConfig::new(server_url);
    config.credential_transport = transport;
    let api = ApiClient::new(&config).expect("api client");
    let store = Arc::new(store);
    let ui = Arc::new(ui);
    let controller = SessionController::new(api, store.clone(), ui.clone());
    Harness {
        controller,
        ui,
        store,
    }
}

pub fn harness(server_url: &str, store: MemorySessionStore) -> Harness {
    harness_for(server_url, store, RecordingUi::new(), CredentialTransport::Bearer)
}
