use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use super::db::DbHandle;
use super::models::{MessageView, Sender};
use crate::agent::Assistant;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub assistant: Assistant,
}

pub type SharedState = Arc<AppState>;

// ── Request / response payload types ──────────────────────────────────

#[derive(Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub project_id: i64,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        // The context chain can carry file paths; keep it in the log only
        tracing::error!(error = %format!("{:#}", e), "request failed");
        ApiError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
    }
}

fn project_not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(read_root))
        .route("/health", get(health_check))
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            put(update_project).delete(delete_project),
        )
        .route("/api/projects/{id}/messages", get(list_project_messages))
        .route("/api/chat", post(chat))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Trimmed project name, rejecting blank input.
fn validate_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Project name must not be empty".into()));
    }
    Ok(name.to_string())
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn read_root() -> impl IntoResponse {
    Json(serde_json::json!({"message": "Welcome to Jidoka Backend"}))
}

async fn health_check() -> &'static str {
    "ok"
}

async fn list_projects(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let projects = state.db.call(|db| db.list_projects()).await?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<SharedState>,
    Json(req): Json<ProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validate_name(&req.name)?;
    let description = req.description;
    let project = state
        .db
        .call(move |db| db.create_project(&name, description.as_deref()))
        .await?;
    tracing::info!(project_id = project.id, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

async fn update_project(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<ProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validate_name(&req.name)?;
    let description = req.description;
    let project = state
        .db
        .call(move |db| db.update_project(id, &name, description.as_deref()))
        .await?
        .ok_or_else(project_not_found)?;
    Ok(Json(project))
}

async fn delete_project(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.db.call(move |db| db.delete_project(id)).await?;
    if !deleted {
        return Err(project_not_found());
    }
    tracing::info!(project_id = id, "project deleted");
    Ok(Json(
        serde_json::json!({"message": "Project deleted successfully"}),
    ))
}

async fn list_project_messages(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.db.call(move |db| db.list_messages(id)).await?;
    let views: Vec<MessageView> = messages.into_iter().map(MessageView::from).collect();
    Ok(Json(views))
}

/// Store the user's message, let the assistant answer, store the answer.
async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = req.project_id;
    let user_text = req.message.clone();
    state
        .db
        .call(move |db| {
            if db.get_project(project_id)?.is_none() {
                return Ok(None);
            }
            db.insert_message(project_id, Sender::User, &user_text)
                .map(Some)
        })
        .await?
        .ok_or_else(project_not_found)?;

    let reply = state.assistant.route(&req.message).await;

    let ai_text = reply.clone();
    state
        .db
        .call(move |db| db.insert_message(project_id, Sender::Ai, &ai_text))
        .await?;

    Ok(Json(ChatResponse { response: reply }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::executor::ScriptExecutor;
    use crate::agent::generator::ScriptGenerator;
    use crate::agent::router::TriggerKeywords;
    use crate::agent::workspace::Workspace;
    use crate::backend::db::ChatDb;
    use crate::errors::GenerationError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    struct EchoGenerator;

    #[async_trait]
    impl ScriptGenerator for EchoGenerator {
        async fn generate(&self, _instruction: &str) -> Result<String, GenerationError> {
            Ok("echo from-script".to_string())
        }
    }

    fn test_state(workspace_dir: &std::path::Path) -> SharedState {
        let db = ChatDb::new_in_memory().unwrap();
        let assistant = Assistant::new(
            Arc::new(EchoGenerator),
            Workspace::new(workspace_dir),
            ScriptExecutor::new("sh", Duration::from_secs(5)),
            TriggerKeywords::default(),
        );
        Arc::new(AppState {
            db: DbHandle::new(db),
            assistant,
        })
    }

    fn test_app() -> Router {
        api_router().with_state(test_state(&std::env::temp_dir().join("jidoka-api-tests")))
    }

    #[tokio::test]
    async fn test_internal_error_hides_context_chain() {
        let err = anyhow::anyhow!("unable to open database file")
            .context("Failed to open database at /srv/private/jidoka.db");
        let resp = ApiError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = body_json(resp.into_body()).await;
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("/srv/private"));
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app()
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_root_welcome() {
        let response = test_app().oneshot(empty_request("GET", "/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["message"], "Welcome to Jidoka Backend");
    }

    #[tokio::test]
    async fn test_list_projects_has_default() {
        let response = test_app()
            .oneshot(empty_request("GET", "/api/projects"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let projects: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0]["id"], 1);
        assert_eq!(projects[0]["name"], "Default Project");
    }

    #[tokio::test]
    async fn test_create_project() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/api/projects",
                serde_json::json!({"name": "my-project", "description": "things"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let project: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(project["name"], "my-project");
        assert_eq!(project["description"], "things");
        assert!(project["id"].as_i64().unwrap() > 1);
    }

    #[tokio::test]
    async fn test_create_project_without_description() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/api/projects",
                serde_json::json!({"name": "bare"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let project: serde_json::Value = body_json(response.into_body()).await;
        assert!(project["description"].is_null());
    }

    #[tokio::test]
    async fn test_create_project_blank_name_rejected() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/api/projects",
                serde_json::json!({"name": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_update_project() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/projects/1",
                serde_json::json!({"name": "Renamed", "description": "now with text"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let project: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(project["id"], 1);
        assert_eq!(project["name"], "Renamed");
        assert_eq!(project["description"], "now with text");
    }

    #[tokio::test]
    async fn test_update_missing_project_404() {
        let response = test_app()
            .oneshot(json_request(
                "PUT",
                "/api/projects/999",
                serde_json::json!({"name": "ghost"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["error"], "Project not found");
    }

    #[tokio::test]
    async fn test_delete_project() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/api/projects/1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["message"], "Project deleted successfully");

        let response = app
            .oneshot(empty_request("GET", "/api/projects"))
            .await
            .unwrap();
        let projects: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert!(projects.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_project_404() {
        let response = test_app()
            .oneshot(empty_request("DELETE", "/api/projects/42"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_messages_empty_for_new_project() {
        let response = test_app()
            .oneshot(empty_request("GET", "/api/projects/1/messages"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let messages: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_chat_clarification_persists_both_messages() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({"project_id": 1, "message": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: ChatResponse = body_json(response.into_body()).await;
        assert!(body.response.contains("「hello」"));

        let response = app
            .oneshot(empty_request("GET", "/api/projects/1/messages"))
            .await
            .unwrap();
        let messages: Vec<MessageView> = body_json(response.into_body()).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[1].sender, Sender::Ai);
        assert_eq!(messages[1].text, body.response);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_chat_trigger_runs_script() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = api_router().with_state(test_state(tmp.path()));
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({"project_id": 1, "message": "create a python script"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: ChatResponse = body_json(response.into_body()).await;
        assert!(body.response.contains("--- 標準出力 ---\nfrom-script\n"));
        assert!(body.response.contains("--- 終了コード: 0 ---"));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_chat_unknown_project_404() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({"project_id": 77, "message": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_body() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({"message": "no project"}),
            ))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
