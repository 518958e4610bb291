use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::catalog::{CatalogError, ProgramCatalog, ProgramConfig};
use crate::config::Config;
use crate::grading::parser::{analyze_cell, CellAnalysis};
use crate::output::placeholders::{build_placeholders, PlaceholderMap};
use crate::roster::batch::evaluate_batch;
use crate::roster::{StudentReport, StudentRow};

#[derive(Clone)]
struct ApiState {
    config: Config,
    catalog: Arc<ProgramCatalog>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Deserialize)]
struct ParseRequest {
    cell: String,
}

#[derive(Debug, Clone, Deserialize)]
struct EvaluateRequest {
    program: String,
    #[serde(default)]
    students: Vec<StudentRow>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    programs: usize,
}

#[derive(Debug, Serialize)]
struct EvaluatedStudent {
    #[serde(flatten)]
    report: StudentReport,
    placeholders: PlaceholderMap,
}

#[derive(Debug, Serialize)]
struct EvaluateResponse {
    program: String,
    template: Option<String>,
    skipped: usize,
    students: Vec<EvaluatedStudent>,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let catalog = config.load_catalog()?;
    let app = router(config, catalog);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(config: Config, catalog: ProgramCatalog) -> Router {
    let state = ApiState {
        config,
        catalog: Arc::new(catalog),
    };

    Router::new()
        .route("/health", get(health))
        .route("/v1/programs", get(programs))
        .route("/v1/config", get(show_config))
        .route("/v1/parse", post(parse))
        .route("/v1/evaluate", post(evaluate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        programs: state.catalog.len(),
    })
}

async fn programs(State(state): State<ApiState>) -> Json<ApiResponse<Vec<ProgramConfig>>> {
    ok(state.catalog.programs().cloned().collect())
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config.clone())
}

async fn parse(Json(request): Json<ParseRequest>) -> Json<ApiResponse<CellAnalysis>> {
    ok(analyze_cell(&request.cell))
}

async fn evaluate(
    State(state): State<ApiState>,
    Json(request): Json<EvaluateRequest>,
) -> ApiResult<EvaluateResponse> {
    let program = state.catalog.get(&request.program)?.clone();
    let template = program.template.clone();
    let options = state.config.batch_options();
    let students = request.students;
    let outcome =
        tokio::task::spawn_blocking(move || evaluate_batch(&program, &students, options))
            .await
            .map_err(ApiError::internal)?;
    let today = chrono::Local::now().date_naive();

    let students = outcome
        .reports
        .into_iter()
        .map(|report| EvaluatedStudent {
            placeholders: build_placeholders(&report, today),
            report,
        })
        .collect();

    Ok(ok(EvaluateResponse {
        program: outcome.program,
        template,
        skipped: outcome.skipped,
        students,
    }))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}
