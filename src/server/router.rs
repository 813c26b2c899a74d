use std::path::Path;

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use crate::agent::GuideOutcome;
use crate::core::{GuideError, ProgressEvent, ProgressSink};
use crate::server::{files, ws, ServeState};

/// Full API surface
pub fn build_router(state: ServeState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/query", post(query_handler))
        .merge(ws::router())
        .merge(files::router())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "guidegen API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler(State(state): State<ServeState>) -> Json<Value> {
    let config = state.generator().config();
    Json(json!({
        "status": "healthy",
        "provider": state.generator().provider().name(),
        "llm_key_configured": config.llm_key_configured(),
        "run_active": state.run_active(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub status: String,
    pub message: String,
    pub task_name: String,
    pub app_name: String,
    pub output_dir: String,
    pub screenshots: Vec<String>,
    pub workflow_file: Option<String>,
}

impl QueryResponse {
    /// Paths are reported relative to the project root
    pub fn from_outcome(outcome: &GuideOutcome, project_root: &Path) -> Self {
        let relative = |path: &Path| {
            path.strip_prefix(project_root)
                .unwrap_or(path)
                .display()
                .to_string()
        };

        Self {
            status: "success".to_string(),
            message: "Guide generated successfully".to_string(),
            task_name: outcome.parsed.task_slug(),
            app_name: outcome.parsed.app.clone(),
            output_dir: relative(&outcome.dataset_dir),
            screenshots: outcome
                .screenshots
                .iter()
                .map(|s| relative(&outcome.dataset_dir.join(s)))
                .collect(),
            workflow_file: outcome
                .workflow_file
                .is_file()
                .then(|| relative(&outcome.workflow_file)),
        }
    }
}

async fn query_handler(
    State(state): State<ServeState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<Value>)> {
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Question cannot be empty" })),
        ));
    }

    let Some(guard) = state.try_begin_run() else {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "detail": GuideError::RunInProgress.to_string() })),
        ));
    };

    info!(%question, "guide requested");
    let progress = state.progress();
    let generator = state.generator().clone();
    let project_root = state.project_root().to_path_buf();

    // Runs to completion even if the client disconnects
    let task = tokio::spawn(async move {
        let _guard = guard;
        let result = generator.generate(&question, progress.clone()).await;
        match &result {
            Ok(outcome) => {
                let response = QueryResponse::from_outcome(outcome, &project_root);
                progress.emit(ProgressEvent::Complete {
                    message: "Guide generated successfully!".to_string(),
                    task_name: response.task_name.clone(),
                    app_name: response.app_name.clone(),
                    output_dir: response.output_dir.clone(),
                    screenshots: response.screenshots.clone(),
                    workflow_file: response.workflow_file.clone(),
                });
                Ok(response)
            }
            Err(e) => {
                error!(error = %e, "guide generation failed");
                progress.emit(ProgressEvent::error(format!("Error: {}", e)));
                Err(e.to_string())
            }
        }
    });

    match task.await {
        Ok(Ok(response)) => Ok(Json(response)),
        Ok(Err(detail)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": detail })),
        )),
        Err(join) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": join.to_string() })),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::GuideGenerator;
    use crate::core::{Config, ParsedQuery};
    use crate::llm::scripted::ScriptedProvider;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state(project: &Path) -> ServeState {
        let mut config = Config::default();
        config.dataset.root = PathBuf::from("dataset");
        let generator =
            GuideGenerator::with_provider(config, Arc::new(ScriptedProvider::new([])));
        ServeState::new(generator, project)
    }

    fn app(state: ServeState) -> Router {
        build_router(state, &[])
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_query(question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/query")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "question": question }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_provider_and_run_state() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(state(dir.path())), get("/health")).await;
        assert_eq!(status, StatusCode::OK);

        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["provider"], "scripted");
        assert_eq!(value["run_active"], false);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(state(dir.path())), post_query("   ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["detail"], "Question cannot be empty");
    }

    #[tokio::test]
    async fn test_second_run_conflicts() {
        let dir = TempDir::new().unwrap();
        let state = state(dir.path());
        let _running = state.try_begin_run().unwrap();
        assert!(state.run_active());

        let (status, _) = send(app(state), post_query("How to search issues in GitHub?")).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_failed_run_broadcasts_error() {
        let dir = TempDir::new().unwrap();
        let state = state(dir.path());
        let mut events = state.subscribe();

        // The scripted provider has nothing queued, so parsing fails
        let (status, _) = send(app(state.clone()), post_query("How to search issues in GitHub?")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!state.run_active());

        let first = events.recv().await.unwrap();
        assert!(matches!(first, ProgressEvent::Status { ref stage, .. } if stage == "parsing"));
        let second = events.recv().await.unwrap();
        assert!(matches!(second, ProgressEvent::Error { ref message } if message.starts_with("Error: ")));
    }

    #[tokio::test]
    async fn test_files_are_confined_to_project() {
        let outer = TempDir::new().unwrap();
        let project = outer.path().join("project");
        fs::create_dir_all(project.join("dataset")).unwrap();
        fs::write(project.join("dataset").join("note.txt"), "hello").unwrap();
        fs::write(outer.path().join("secret.txt"), "nope").unwrap();

        let router = app(state(&project));

        let (status, body) = send(router.clone(), get("/api/files/dataset/note.txt")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"hello");

        let (status, _) = send(router.clone(), get("/api/files/dataset/missing.png")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(router.clone(), get("/api/files/dataset")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(router.clone(), get("/api/files/../secret.txt")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Outside paths are denied the same way whether or not they exist
        let (status, _) = send(router.clone(), get("/api/files/../missing.txt")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(router, get("/api/files/dataset/../../nothing/here.png")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_workflow_routes_stay_in_dataset() {
        let outer = TempDir::new().unwrap();
        let project = outer.path().join("project");
        fs::create_dir_all(project.join("dataset")).unwrap();
        fs::create_dir_all(project.join("secret")).unwrap();
        fs::write(project.join("secret").join("workflow.md"), "outside dataset").unwrap();
        fs::create_dir_all(outer.path().join("leak")).unwrap();
        fs::write(outer.path().join("leak").join("workflow.md"), "outside project").unwrap();

        let router = app(state(&project));
        for uri in [
            "/api/workflow/%2e%2e/secret",
            "/api/workflow/%2e%2e%2f%2e%2e/leak",
            "/api/download/workflow/%2e%2e/secret",
            "/api/download/workflow/%2e%2e%2f%2e%2e/leak",
        ] {
            let (status, body) = send(router.clone(), get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert!(!String::from_utf8_lossy(&body).contains("outside"), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_workflow_routes() {
        let dir = TempDir::new().unwrap();
        let task_dir = dir.path().join("dataset").join("github").join("search_issues");
        fs::create_dir_all(&task_dir).unwrap();
        fs::write(task_dir.join("workflow.md"), "# Search Issues\n").unwrap();
        let router = app(state(dir.path()));

        let (status, body) = send(router.clone(), get("/api/workflow/GitHub/search%20issues")).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["content"], "# Search Issues\n");
        assert_eq!(value["path"], "dataset/github/search_issues/workflow.md");

        let response = router
            .clone()
            .oneshot(get("/api/download/workflow/github/search_issues"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"github_search_issues_guide.md\""
        );

        let (status, _) = send(router, get("/api/workflow/github/nothing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_query_response_paths_are_relative() {
        let dir = TempDir::new().unwrap();
        let task_dir = dir.path().join("dataset").join("youtube").join("search_for_videos");
        fs::create_dir_all(&task_dir).unwrap();
        fs::write(task_dir.join("workflow.md"), "#").unwrap();

        let outcome = GuideOutcome {
            parsed: ParsedQuery {
                app: "youtube".into(),
                task: "search for videos".into(),
                url: "https://www.youtube.com".into(),
                requires_auth: false,
            },
            dataset_dir: task_dir.clone(),
            screenshots: vec!["screenshots/01_step_01.png".into()],
            workflow_file: task_dir.join("workflow.md"),
            steps_observed: 4,
            turns: 3,
        };

        let response = QueryResponse::from_outcome(&outcome, dir.path());
        assert_eq!(response.output_dir, "dataset/youtube/search_for_videos");
        assert_eq!(
            response.screenshots,
            vec!["dataset/youtube/search_for_videos/screenshots/01_step_01.png"]
        );
        assert_eq!(
            response.workflow_file.as_deref(),
            Some("dataset/youtube/search_for_videos/workflow.md")
        );
    }
}
