//! LeagueDesk API Module
//! REST endpoints for match scheduling and roster management, with OpenAPI documentation

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, MethodRouter},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;
use utoipa::OpenApi;

use crate::engine::config::SchedulingConfig;
use crate::engine::database::Database;
use crate::engine::error::LeagueError;
use crate::engine::roster::reconcile::members_from_json;
use crate::engine::roster::{OwnerKind, OwnerRef, Reconciler};
use crate::engine::scheduling::{
    parse_candidates, parse_date, AssignmentCandidate, AssignmentRequest, ConflictDetector,
    ScheduleOutcome, ScheduleService,
};

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<Database>,
    pub detector: ConflictDetector,
}

impl ApiState {
    pub fn new(db: Database, scheduling: &SchedulingConfig) -> Self {
        Self {
            db: Arc::new(db),
            detector: ConflictDetector::new(scheduling.conflict_policy, scheduling.default_duration_minutes),
        }
    }

    fn schedule(&self) -> ScheduleService<'_> {
        ScheduleService::new(&self.db, self.detector)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        check_schedule,
        apply_schedule,
        list_schedule,
        unassign_match,
        get_members,
        put_members,
    ),
    tags(
        (name = "schedule", description = "Match field/time assignments"),
        (name = "members", description = "Program/session coaches and team rosters"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/openapi.json", get(openapi_document))
        .route("/api/schedule", get(list_schedule).post(apply_schedule))
        .route("/api/schedule/check", post(check_schedule))
        .route("/api/schedule/{match_id}", delete(unassign_match))
        .route("/api/programs/{owner_id}/members", member_routes(OwnerKind::Program))
        .route("/api/sessions/{owner_id}/members", member_routes(OwnerKind::Session))
        .route("/api/teams/{owner_id}/members", member_routes(OwnerKind::Team))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn member_routes(kind: OwnerKind) -> MethodRouter<ApiState> {
    get(move |state: State<ApiState>, path: Path<String>| get_members(kind, state, path)).put(
        move |state: State<ApiState>, path: Path<String>, body: JsonBody| {
            put_members(kind, state, path, body)
        },
    )
}

/// JSON request body whose rejections still answer with `{ "error": ... }`
type JsonBody = Result<Json<Value>, JsonRejection>;

fn json_body(body: JsonBody) -> Result<Value, LeagueError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| LeagueError::invalid(rejection.body_text()))
}

impl IntoResponse for LeagueError {
    fn into_response(self) -> Response {
        let status = match &self {
            LeagueError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LeagueError::NotFound(_) => StatusCode::NOT_FOUND,
            LeagueError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRequest {
    assignments: Vec<AssignmentRequest>,
}

fn read_batch(body: JsonBody) -> Result<Vec<AssignmentCandidate>, LeagueError> {
    let request: ScheduleRequest =
        serde_json::from_value(json_body(body)?).map_err(|e| LeagueError::invalid(e.to_string()))?;
    parse_candidates(&request.assignments)
}

#[utoipa::path(
    post,
    path = "/api/schedule/check",
    request_body = Value,
    responses(
        (status = 200, description = "Conflicts found in the proposed assignments", body = Value),
        (status = 400, description = "Incomplete or malformed assignments", body = Value)
    ),
    tag = "schedule"
)]
async fn check_schedule(
    State(state): State<ApiState>,
    body: JsonBody,
) -> Result<Json<Value>, LeagueError> {
    let batch = read_batch(body)?;
    let conflicts = state.schedule().check(&batch)?;
    Ok(Json(json!({ "conflicts": conflicts })))
}

#[utoipa::path(
    post,
    path = "/api/schedule",
    request_body = Value,
    responses(
        (status = 200, description = "Assignments saved", body = Value),
        (status = 409, description = "Assignments conflict; nothing saved", body = Value),
        (status = 400, description = "Incomplete or malformed assignments", body = Value)
    ),
    tag = "schedule"
)]
async fn apply_schedule(
    State(state): State<ApiState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<ScheduleOutcome>), LeagueError> {
    let batch = read_batch(body)?;
    let outcome = state.schedule().apply(&batch)?;
    let status = match outcome {
        ScheduleOutcome::Applied { .. } => StatusCode::OK,
        ScheduleOutcome::Rejected { .. } => StatusCode::CONFLICT,
    };
    Ok((status, Json(outcome)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    date: Option<String>,
    field_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/schedule",
    params(
        ("date" = Option<String>, Query, description = "Day (YYYY-MM-DD)"),
        ("fieldId" = Option<String>, Query, description = "Field identifier"),
    ),
    responses(
        (status = 200, description = "Stored assignments", body = Value)
    ),
    tag = "schedule"
)]
async fn list_schedule(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, LeagueError> {
    let date = params.date.as_deref().map(parse_date).transpose()?;
    let assignments = state.schedule().list(date, params.field_id.as_deref())?;
    Ok(Json(json!({
        "data": assignments,
        "count": assignments.len(),
    })))
}

#[utoipa::path(
    delete,
    path = "/api/schedule/{match_id}",
    params(
        ("match_id" = String, Path, description = "Match identifier"),
    ),
    responses(
        (status = 200, description = "Assignment removed", body = Value),
        (status = 404, description = "Match has no assignment", body = Value)
    ),
    tag = "schedule"
)]
async fn unassign_match(
    State(state): State<ApiState>,
    Path(match_id): Path<String>,
) -> Result<Json<Value>, LeagueError> {
    state.schedule().unassign(&match_id)?;
    Ok(Json(json!({
        "matchId": match_id,
        "message": "Assignment removed"
    })))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/{owner_id}/members",
    params(
        ("kind" = String, Path, description = "programs, sessions or teams"),
        ("owner_id" = String, Path, description = "Owner identifier"),
    ),
    responses(
        (status = 200, description = "Current members", body = Value)
    ),
    tag = "members"
)]
async fn get_members(
    kind: OwnerKind,
    State(state): State<ApiState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Value>, LeagueError> {
    let owner = OwnerRef::new(kind, owner_id);
    let members = Reconciler::new(state.db.as_ref()).members(&owner)?;
    Ok(Json(json!({
        "ownerKind": owner.kind,
        "ownerId": owner.id,
        "memberIds": members,
    })))
}

#[utoipa::path(
    put,
    path = "/api/{kind}/{owner_id}/members",
    params(
        ("kind" = String, Path, description = "programs, sessions or teams"),
        ("owner_id" = String, Path, description = "Owner identifier"),
    ),
    request_body = Value,
    responses(
        (status = 200, description = "Membership reconciled", body = Value),
        (status = 400, description = "Missing owner or memberIds is not a list", body = Value)
    ),
    tag = "members"
)]
async fn put_members(
    kind: OwnerKind,
    State(state): State<ApiState>,
    Path(owner_id): Path<String>,
    body: JsonBody,
) -> Result<Json<Value>, LeagueError> {
    let body = json_body(body)?;
    let desired = members_from_json(body.get("memberIds").unwrap_or(&Value::Null))?;
    let owner = OwnerRef::new(kind, owner_id);
    let report = Reconciler::new(state.db.as_ref()).reconcile(&owner, &desired)?;
    Ok(Json(json!({
        "ownerKind": report.owner_kind,
        "ownerId": report.owner_id,
        "added": report.added,
        "removed": report.removed,
        "addedCount": report.added.len(),
        "removedCount": report.removed.len(),
        "unchanged": report.unchanged,
    })))
}
