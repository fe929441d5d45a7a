use axum::{
    extract::{FromRequest, FromRequestParts, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use chatter_shared::constants::WS_MESSAGES_PATH;
use chatter_shared::{ChatMessage, MessageId, ServerId, TabId, UserId};
use chatter_store::{Server, Tab, User};

use crate::directory::with_db;
use crate::error::ApiError;
use crate::gateway::ws_messages;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/user", post(create_user).get(list_users))
        .route("/user/:id", get(get_user))
        .route("/server", post(create_server).get(list_servers))
        .route("/server/:id", get(get_server).post(add_server_member))
        .route("/server/:id/users", get(get_server_users))
        .route("/server/:id/tabs", get(get_server_tabs))
        .route("/tab", post(create_tab).get(list_tabs))
        .route("/tab/:id", get(get_tab))
        .route("/message", post(create_message).get(list_messages))
        .route("/message/:id", get(get_message))
        .route("/message/tab/:tab_id", get(list_tab_messages))
        .route(WS_MESSAGES_PATH, get(ws_messages))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `Path` whose rejection renders as an [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
struct ApiPath<T>(T);

/// `Json` body whose rejection renders as an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct ApiJson<T>(T);

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    connections: usize,
}

/// A server with its members embedded.
#[derive(Serialize)]
struct ServerResponse {
    #[serde(flatten)]
    server: Server,
    users: Vec<User>,
}

#[derive(Serialize)]
struct CreatedResponse<T> {
    id: T,
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct CreateServerRequest {
    name: String,
}

#[derive(Deserialize)]
struct AddMemberRequest {
    user_id: UserId,
}

#[derive(Deserialize)]
struct CreateTabRequest {
    name: String,
    server_id: ServerId,
}

#[derive(Deserialize)]
struct CreateMessageRequest {
    text: String,
    sender_id: UserId,
    tab_id: TabId,
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connections: state.registry.len(),
    })
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedResponse<UserId>>), ApiError> {
    require_non_empty("username", &req.username)?;
    let user = User::new(req.username.trim(), req.password);
    let id = with_db(&state.db, move |db| db.create_user(&user)).await?;
    tracing::info!(user_id = %id, "User created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(with_db(&state.db, |db| db.list_users()).await?))
}

async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(with_db(&state.db, move |db| db.get_user(UserId(id))).await?))
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

async fn create_server(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateServerRequest>,
) -> Result<(StatusCode, Json<CreatedResponse<ServerId>>), ApiError> {
    require_non_empty("name", &req.name)?;
    let server = Server::new(req.name.trim());
    let id = with_db(&state.db, move |db| db.create_server(&server)).await?;
    tracing::info!(server_id = %id, "Server created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn list_servers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServerResponse>>, ApiError> {
    let servers = with_db(&state.db, |db| {
        db.list_servers()?
            .into_iter()
            .map(|server| {
                let users = db.get_server_users(server.id)?;
                Ok(ServerResponse { server, users })
            })
            .collect::<chatter_store::Result<Vec<_>>>()
    })
    .await?;
    Ok(Json(servers))
}

async fn get_server(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ServerResponse>, ApiError> {
    let server = with_db(&state.db, move |db| {
        let server = db.get_server(ServerId(id))?;
        let users = db.get_server_users(server.id)?;
        Ok(ServerResponse { server, users })
    })
    .await?;
    Ok(Json(server))
}

async fn add_server_member(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> Result<StatusCode, ApiError> {
    let server_id = ServerId(id);
    let user_id = req.user_id;
    with_db(&state.db, move |db| db.add_user_to_server(user_id, server_id)).await?;
    tracing::info!(server_id = %server_id, user_id = %user_id, "Member added");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_server_users(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(
        with_db(&state.db, move |db| db.get_server_users(ServerId(id))).await?,
    ))
}

async fn get_server_tabs(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Tab>>, ApiError> {
    Ok(Json(
        with_db(&state.db, move |db| db.list_tabs_for_server(ServerId(id))).await?,
    ))
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

async fn create_tab(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateTabRequest>,
) -> Result<(StatusCode, Json<CreatedResponse<TabId>>), ApiError> {
    require_non_empty("name", &req.name)?;
    let tab = Tab::new(req.name.trim(), req.server_id);
    let id = with_db(&state.db, move |db| db.create_tab(&tab)).await?;
    tracing::info!(tab_id = %id, server_id = %req.server_id, "Tab created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn list_tabs(State(state): State<AppState>) -> Result<Json<Vec<Tab>>, ApiError> {
    Ok(Json(with_db(&state.db, |db| db.list_tabs()).await?))
}

async fn get_tab(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Tab>, ApiError> {
    Ok(Json(with_db(&state.db, move |db| db.get_tab(TabId(id))).await?))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Store a message without pushing it to connected clients.
async fn create_message(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateMessageRequest>,
) -> Result<(StatusCode, Json<CreatedResponse<MessageId>>), ApiError> {
    let CreateMessageRequest {
        text,
        sender_id,
        tab_id,
    } = req;
    let id = with_db(&state.db, move |db| {
        db.insert_message(sender_id, tab_id, &text, Utc::now())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(with_db(&state.db, |db| db.list_messages()).await?))
}

async fn get_message(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ChatMessage>, ApiError> {
    Ok(Json(
        with_db(&state.db, move |db| db.get_message(MessageId(id))).await?,
    ))
}

async fn list_tab_messages(
    State(state): State<AppState>,
    ApiPath(tab_id): ApiPath<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(
        with_db(&state.db, move |db| db.list_messages_for_tab(TabId(tab_id))).await?,
    ))
}
