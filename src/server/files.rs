use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::agent::task_parser::normalize_app;
use crate::core::slugify;
use crate::dataset::writer::WORKFLOW_FILE;
use crate::server::ServeState;

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(json!({ "detail": detail.into() })))
}

pub(crate) fn router() -> Router<ServeState> {
    Router::new()
        .route("/api/files/*path", get(file_handler))
        .route("/api/workflow/:app/:task", get(workflow_handler))
        .route(
            "/api/download/workflow/:app/:task",
            get(download_workflow_handler),
        )
}

/// Resolve a request path inside `root`. Anything that leaves `root` is a
/// 403 whether or not it exists.
pub(crate) fn resolve_project_file(root: &FsPath, requested: &str) -> Result<PathBuf, ApiError> {
    let denied = || {
        api_error(
            StatusCode::FORBIDDEN,
            "Access denied to path outside project directory",
        )
    };
    let relative = FsPath::new(requested.trim_start_matches('/'));
    if !stays_inside(relative) {
        return Err(denied());
    }

    let full = root.join(relative);
    if !full.exists() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("File not found: {}", requested),
        ));
    }
    if !full.is_file() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Path is not a file"));
    }

    // Symlinks can still point outside
    let canonical_root = root.canonicalize().map_err(|_| denied())?;
    let canonical = full.canonicalize().map_err(|_| denied())?;
    if !canonical.starts_with(&canonical_root) {
        return Err(denied());
    }
    Ok(canonical)
}

/// True when a relative path never climbs above its starting directory
fn stays_inside(relative: &FsPath) -> bool {
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

fn content_type(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("md") => "text/markdown; charset=utf-8",
        Some("json") => "application/json",
        Some("html") => "text/html; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

async fn file_handler(
    State(state): State<ServeState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let file = resolve_project_file(state.project_root(), &path)?;
    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, content_type(&file))], bytes))
}

/// `dataset/<app>/<task>/workflow.md`, with both segments reduced to the
/// characters the writer itself produces
fn workflow_path(state: &ServeState, app: &str, task: &str) -> Option<PathBuf> {
    let app = normalize_app(app);
    let task = slugify(task);
    if app.is_empty() || task.is_empty() {
        return None;
    }
    Some(state.dataset_root().join(app).join(task).join(WORKFLOW_FILE))
}

fn existing_workflow(state: &ServeState, app: &str, task: &str) -> Result<PathBuf, ApiError> {
    workflow_path(state, app, task)
        .filter(|path| path.is_file())
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Workflow not found"))
}

#[derive(Serialize)]
struct WorkflowResponse {
    content: String,
    path: String,
}

async fn workflow_handler(
    State(state): State<ServeState>,
    Path((app, task)): Path<(String, String)>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let path = existing_workflow(&state, &app, &task)?;
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let shown = path
        .strip_prefix(state.project_root())
        .unwrap_or(&path)
        .display()
        .to_string();
    Ok(Json(WorkflowResponse {
        content,
        path: shown,
    }))
}

async fn download_workflow_handler(
    State(state): State<ServeState>,
    Path((app, task)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let path = existing_workflow(&state, &app, &task)?;
    let content = tokio::fs::read(&path)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let filename = format!("{}_{}_guide.md", normalize_app(&app), slugify(&task));
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    ))
}
