//! HTTP Server for the dataset preparation API.
//!
//! Each client works in its own session: upload a file, apply operations,
//! inspect the result, download it.
//!
//! # API Endpoints
//!
//! | Method | Path                                   | Description                   |
//! |--------|----------------------------------------|-------------------------------|
//! | GET    | `/health`                              | Health check                  |
//! | POST   | `/api/sessions`                        | Create a session              |
//! | GET    | `/api/sessions/{id}`                   | Session state                 |
//! | DELETE | `/api/sessions/{id}`                   | Drop a session                |
//! | POST   | `/api/sessions/{id}/upload`            | Upload a dataset (`file`)     |
//! | POST   | `/api/sessions/{id}/operations`        | Apply one operation           |
//! | POST   | `/api/sessions/{id}/reset`             | Back to the uploaded data     |
//! | GET    | `/api/sessions/{id}/columns/{name}`    | Filter helpers for a column   |
//! | GET    | `/api/sessions/{id}/download?format=`  | Download csv, excel or json   |
//! | GET    | `/api/logs?session=`                   | SSE stream for real-time logs |

use axum::{
    extract::{multipart::Multipart, rejection::JsonRejection, DefaultBodyLimit, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, ColumnValues, DownloadQuery, LogsQuery, SessionCreated, SessionView};
use crate::config::Config;
use crate::error::{ExportError, OperationError, ServerError, ServerResult, SessionError, SessionResult};
use crate::export::ExportFormat;
use crate::report::{numeric_range, unique_values};
use crate::session::{Session, SessionStore};
use crate::transform::Operation;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            config,
        }
    }

    /// Run `f` on session `id`, mapping an unknown id to 404.
    fn session<T>(&self, id: &str, f: impl FnOnce(&mut Session) -> T) -> ServerResult<T> {
        let uuid = Uuid::parse_str(id).map_err(|_| ServerError::SessionNotFound(id.to_string()))?;
        self.store
            .with_session(&uuid, f)
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
    }

    fn view(&self, session: &Session) -> SessionView {
        SessionView::of(session, self.config.preview_rows)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Session(SessionError::NoDataset) => StatusCode::CONFLICT,
            ServerError::Session(SessionError::Load(_) | SessionError::Operation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::Session(SessionError::Export(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/upload", post(upload))
        .route("/api/sessions/{id}/operations", post(apply_operation))
        .route("/api/sessions/{id}/reset", post(reset))
        .route("/api/sessions/{id}/columns/{name}", get(column_values))
        .route("/api/sessions/{id}/download", get(download))
        .route("/api/logs", get(sse_logs))
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let app = router(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Dataprep server running on http://localhost:{}", port);
    println!("   POST /api/sessions                 - Create session");
    println!("   POST /api/sessions/{{id}}/upload     - Upload dataset");
    println!("   POST /api/sessions/{{id}}/operations - Apply operation");
    println!("   GET  /api/sessions/{{id}}/download   - Download result");
    println!("   GET  /api/logs                     - SSE log stream");
    println!("   GET  /health                       - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "dataprep",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.store.len(),
    }))
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let id = state.store.create();
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: id.to_string(),
        }),
    )
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> ServerResult<Json<SessionView>> {
    let view = state.session(&id, |s| state.view(s))?;
    Ok(Json(view))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> ServerResult<StatusCode> {
    let uuid = Uuid::parse_str(&id).map_err(|_| ServerError::SessionNotFound(id.clone()))?;
    if state.store.remove(&uuid) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::SessionNotFound(id))
    }
}

/// Upload endpoint: multipart field `file`
async fn upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ServerResult<Json<SessionView>> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file = Some((name, bytes.to_vec()));
        }
    }

    let (name, bytes) = file.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    let view = state.session(&id, |s| -> SessionResult<SessionView> {
        s.scope().info(format!("Upload: {} ({} bytes)", name, bytes.len()));
        s.load(&name, &bytes)?;
        Ok(state.view(s))
    })??;
    Ok(Json(view))
}

async fn apply_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Operation>, JsonRejection>,
) -> ServerResult<Json<SessionView>> {
    let Json(op) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let view = state.session(&id, |s| -> SessionResult<SessionView> {
        s.apply(&op)?;
        Ok(state.view(s))
    })??;
    Ok(Json(view))
}

async fn reset(State(state): State<AppState>, Path(id): Path<String>) -> ServerResult<Json<SessionView>> {
    let view = state.session(&id, |s| -> SessionResult<SessionView> {
        s.reset()?;
        Ok(state.view(s))
    })??;
    Ok(Json(view))
}

async fn column_values(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> ServerResult<Json<ColumnValues>> {
    let values = state.session(&id, |s| -> SessionResult<ColumnValues> {
        let doc = s.current().ok_or(SessionError::NoDataset)?;
        let unique = unique_values(doc, &name)?;
        let kind = doc
            .column(&name)
            .map(|c| c.kind())
            .ok_or_else(|| OperationError::ColumnNotFound(name.clone()))?;
        let range = numeric_range(doc, &name).ok().flatten().map(|(lo, hi)| [lo, hi]);
        Ok(ColumnValues {
            column: name.clone(),
            kind,
            unique,
            range,
        })
    })??;
    Ok(Json(values))
}

async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> ServerResult<Response> {
    let format: ExportFormat = query
        .format
        .parse()
        .map_err(|e: ExportError| ServerError::BadRequest(e.to_string()))?;

    let file = state.session(&id, |s| s.export(format))??;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.mime),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.data,
    )
        .into_response())
}

/// SSE endpoint for real-time log streaming. `?session=<id>` limits the
/// stream to that session's entries plus global ones.
async fn sse_logs(Query(query): Query<LogsQuery>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();
    let wanted = query.session;

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(entry) if entry.visible_to(wanted.as_deref()) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
