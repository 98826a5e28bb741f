use std::path::{Path as FsPath, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use ledgerport_core::{Capability, ConversionKind, ConversionRequest, Task, TaskId, CAPABILITIES};
use ledgerport_pipeline::Dispatcher;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub work_dir: PathBuf,
    pub static_dir: PathBuf,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let app = Router::new()
        .route(
            "/upload",
            post(upload)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_bytes)),
        )
        .route("/progress/{task_id}", get(progress))
        .route("/download/{filename}", get(download))
        .route("/formats", get(formats))
        .route("/health", get(health));
    mount_front_end(app, &state.static_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Upload page at `/` and its assets under `/static`, only when the
/// directory is present.
fn mount_front_end<S>(app: Router<S>, dir: &FsPath) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !dir.is_dir() {
        return app;
    }
    app.route_service("/", ServeFile::new(dir.join("index.html")))
        .nest_service("/static", ServeDir::new(dir))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    task_id: TaskId,
    filename: String,
    conversion_kind: ConversionKind,
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut requested_kind: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        match field.name().unwrap_or("") {
            "kind" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(e.to_string()))?;
                if !value.trim().is_empty() {
                    requested_kind = Some(value);
                }
            }
            "file" => {
                let name = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Multipart(e.to_string()))?;
                file = Some((name, data.to_vec()));
            }
            _ => {}
        }
    }

    let (raw_name, data) = file.ok_or(ApiError::NoFile)?;
    let filename = secure_filename(&raw_name);
    if filename.is_empty() {
        return Err(ApiError::NoFile);
    }
    let extension = FsPath::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let kind = match requested_kind {
        Some(raw) => {
            let kind = ConversionKind::from_str(&raw).map_err(ApiError::UnknownKind)?;
            if !kind.accepts(&extension) {
                return Err(ApiError::ExtensionNotAllowed(filename));
            }
            kind
        }
        None => ConversionKind::from_extension(&extension)
            .ok_or_else(|| ApiError::ExtensionNotAllowed(filename.clone()))?,
    };

    let stored_name = format!("{}_{filename}", short_token());
    let input_path = state.work_dir.join(&stored_name);
    tokio::fs::write(&input_path, &data).await?;

    let request = ConversionRequest::beside_input(kind, &input_path);
    let output_name = request.output_filename().unwrap_or_default();
    let task_id = state.dispatcher.submit(request);
    info!("Upload {stored_name} ({} bytes) accepted as task {task_id}", data.len());

    Ok(Json(UploadResponse {
        task_id,
        filename: output_name,
        conversion_kind: kind,
    }))
}

async fn progress(State(state): State<Arc<AppState>>, Path(task_id): Path<String>) -> Json<Task> {
    Json(state.dispatcher.store().get(&TaskId::from(task_id)))
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_plain_file_name(&filename) || !state.dispatcher.store().is_finished_result(&filename) {
        return Err(ApiError::NotFound);
    }
    let path = state.work_dir.join(&filename);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ApiError::NotFound),
        Err(e) => return Err(e.into()),
    };
    let disposition = format!("attachment; filename=\"{filename}\"");
    Ok((
        [
            (header::CONTENT_TYPE, content_type(&filename).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

async fn formats() -> Json<&'static [Capability]> {
    Json(CAPABILITIES)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Local::now().to_rfc3339(),
    }))
}

fn short_token() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Reduce an uploaded name to a safe base name: path components dropped,
/// whitespace turned into `_`, anything outside `[A-Za-z0-9._-]` removed.
fn secure_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && FsPath::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

fn content_type(filename: &str) -> &'static str {
    match FsPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("ofx") | Some("qfx") => "application/x-ofx",
        _ => "application/octet-stream",
    }
}
