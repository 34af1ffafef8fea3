//! HTTP trigger for the pipeline.
//!
//! `POST /run` runs the pipeline once and returns the summary block.

use crate::models::Table;
use crate::pipeline::{run_pipeline, PipelineError, PipelineSettings, RunMode};
use crate::sheets::Workbook;
use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// State shared by the handlers.
#[derive(Clone)]
pub struct AppState {
    pub workbook: Arc<dyn Workbook>,
    pub settings: Arc<PipelineSettings>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Response body of `POST /run`.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub message: String,
    /// `completed`, `no_data` or `error`.
    pub status: &'static str,
    /// Summary block as written to the sheet, or the reason when nothing ran.
    pub result: Table,
}

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/run", post(run))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "Generation tracking service is running"
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn run(State(state): State<AppState>) -> (StatusCode, Json<RunResponse>) {
    match run_pipeline(state.workbook.as_ref(), &state.settings, RunMode::Write).await {
        Ok(outcome) => {
            info!(
                "Run completed: {} records on {}",
                outcome.report.summary.count, outcome.target_date
            );
            (
                StatusCode::OK,
                Json(RunResponse {
                    message: "Generation tracking processing completed".to_string(),
                    status: "completed",
                    result: outcome.report.summary.to_table(),
                }),
            )
        }
        Err(PipelineError::InsufficientData(reason)) => {
            warn!("Run skipped: {}", reason);
            (
                StatusCode::OK,
                Json(RunResponse {
                    result: vec![vec![Value::from(reason.clone())]],
                    message: reason,
                    status: "no_data",
                }),
            )
        }
        Err(e) => {
            error!("Run failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(RunResponse {
                    message: e.to_string(),
                    status: "error",
                    result: Vec::new(),
                }),
            )
        }
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::columns;
    use crate::sheets::local::Sheets;
    use crate::sheets::LocalWorkbook;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    fn record(client: &str, unit: f64, area: &str) -> Vec<Value> {
        let mut row = vec![json!(""); columns::MIN_FIELDS];
        row[columns::CLIENT] = json!(client);
        row[columns::DATE] = json!("2024-01-01");
        row[columns::UNIT_PER_KW] = json!(unit);
        row[columns::AREA] = json!(area);
        row
    }

    fn state(database: Table) -> AppState {
        let mut sheets = Sheets::new();
        sheets.insert(
            "Generation Tracking".to_string(),
            vec![vec![
                json!("2024-01-01"),
                json!(""),
                json!(""),
                json!(""),
                json!(""),
                json!(""),
                json!("south"),
            ]],
        );
        sheets.insert("Database".to_string(), database);

        AppState {
            workbook: Arc::new(LocalWorkbook::from_sheets(sheets)),
            settings: Arc::new(PipelineSettings::default()),
        }
    }

    async fn post_run(app: Router) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/run")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_index() {
        let app = create_router(state(vec![]));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(state(vec![]));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_run_returns_summary() {
        let state = state(vec![
            vec![json!("Client"); columns::MIN_FIELDS],
            record("Alice", 5.0, "North"),
            record("Bob", 7.0, "south"),
        ]);
        let (status, body) = post_run(create_router(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["result"], json!([[2], ["6.00"], ["7.00"]]));
    }

    #[tokio::test]
    async fn test_run_without_data() {
        let state = state(vec![vec![json!("Client"); columns::MIN_FIELDS]]);
        let workbook = Arc::clone(&state.workbook);
        let (status, body) = post_run(create_router(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_data");
        assert_eq!(body["result"], json!([["No data found in Database."]]));
        assert_eq!(
            workbook.read_cell("Generation Tracking", "D1").await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_run_reports_workbook_errors() {
        let state = AppState {
            workbook: Arc::new(LocalWorkbook::from_sheets(Sheets::new())),
            settings: Arc::new(PipelineSettings::default()),
        };
        let (status, body) = post_run(create_router(state)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_run_is_post_only() {
        let app = create_router(state(vec![]));
        let response = app
            .oneshot(Request::builder().uri("/run").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
