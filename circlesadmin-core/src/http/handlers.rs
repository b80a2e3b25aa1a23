//! HTTP API handlers
//!
//! Each handler extracts its inputs, runs the matching service workflow on
//! the blocking pool and translates the outcome. Failures are logged with the
//! operation name and the ids involved before they are answered.

use super::state::AppState;
use super::types::*;
use crate::error::{AdminError, AdminResult};
use crate::format::{CircleDetailView, CircleView, DescribedCircleView, MemberView};
use crate::service::CirclesAdminService;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

/// Error answered as `{ "message": ... }` with the kind's status code
#[derive(Debug)]
pub struct ApiError(AdminError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = MessageResponse::new(self.0.message());
        (status, Json(body)).into_response()
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        ApiError(err)
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run a service workflow off the async runtime
async fn run_blocking<T, F>(state: &AppState, workflow: F) -> AdminResult<T>
where
    F: FnOnce(&CirclesAdminService) -> AdminResult<T> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || workflow(&service))
        .await
        .map_err(|e| AdminError::Internal(format!("Admin worker failed: {}", e)))?
}

/// Log a failed operation and turn it into a response error
fn failed(operation: &'static str, ids: &str, err: AdminError) -> ApiError {
    error!(operation, ids, error = %err, "circlesadmin: {} failed for {}", operation, ids);
    ApiError(err)
}

/// Malformed JSON and missing fields are caller errors
fn rejected(operation: &'static str, ids: &str, rejection: JsonRejection) -> ApiError {
    failed(operation, ids, AdminError::BadRequest(rejection.body_text()))
}

// ============================================================================
// Circle Handlers
// ============================================================================

/// GET /circles - List every circle
pub async fn list_circles(State(state): State<AppState>) -> ApiResult<Json<Vec<CircleView>>> {
    run_blocking(&state, |service| service.list_all())
        .await
        .map(Json)
        .map_err(|e| failed("list", "all", e))
}

/// GET /circles/:circle_id - Circle with description and members
pub async fn get_circle(
    State(state): State<AppState>,
    Path(circle_id): Path<String>,
) -> ApiResult<Json<CircleDetailView>> {
    let id = circle_id.clone();
    run_blocking(&state, move |service| service.get_circle(&id))
        .await
        .map(Json)
        .map_err(|e| failed("show", &circle_id, e))
}

/// POST /circles - Create a circle
pub async fn create_circle(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateCircleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DescribedCircleView>)> {
    let Json(req) = payload.map_err(|e| rejected("create", "new circle", e))?;
    let owner = match req.owner.filter(|owner| !owner.trim().is_empty()) {
        Some(owner) => owner,
        None => state.requesting_user(&headers),
    };

    let name = req.name.clone();
    let created = run_blocking(&state, move |service| {
        service.create_circle(&req.name, &owner, req.description.as_deref())
    })
    .await
    .map_err(|e| failed("create", &name, e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /circles/:circle_id - Rename and/or re-describe a circle
pub async fn update_circle(
    State(state): State<AppState>,
    Path(circle_id): Path<String>,
    payload: Result<Json<UpdateCircleRequest>, JsonRejection>,
) -> ApiResult<Json<DescribedCircleView>> {
    let Json(req) = payload.map_err(|e| rejected("update", &circle_id, e))?;
    if req.name.is_none() && req.description.is_none() {
        let err =
            AdminError::BadRequest("Provide at least one of: name, description".to_string());
        return Err(failed("update", &circle_id, err));
    }

    let id = circle_id.clone();
    run_blocking(&state, move |service| {
        service.update_circle(&id, req.name.as_deref(), req.description.as_deref())
    })
    .await
    .map(Json)
    .map_err(|e| failed("update", &circle_id, e))
}

/// DELETE /circles/:circle_id - Destroy a circle
pub async fn destroy_circle(
    State(state): State<AppState>,
    Path(circle_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = circle_id.clone();
    run_blocking(&state, move |service| service.destroy_circle(&id))
        .await
        .map_err(|e| failed("destroy", &circle_id, e))?;

    Ok(Json(MessageResponse::new("Circle deleted")))
}

// ============================================================================
// Member Handlers
// ============================================================================

/// GET /circles/:circle_id/members - List members of a circle
pub async fn list_members(
    State(state): State<AppState>,
    Path(circle_id): Path<String>,
) -> ApiResult<Json<Vec<MemberView>>> {
    let id = circle_id.clone();
    run_blocking(&state, move |service| service.get_members(&id))
        .await
        .map(Json)
        .map_err(|e| failed("members", &circle_id, e))
}

/// POST /circles/:circle_id/members - Add a user to a circle
pub async fn add_member(
    State(state): State<AppState>,
    Path(circle_id): Path<String>,
    payload: Result<Json<AddMemberRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MemberView>)> {
    let Json(req) = payload.map_err(|e| rejected("add_member", &circle_id, e))?;

    let id = circle_id.clone();
    let member = run_blocking(&state, move |service| service.add_member(&id, &req.user_id))
        .await
        .map_err(|e| failed("add_member", &circle_id, e))?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// DELETE /circles/:circle_id/members/:member_id - Remove a member
pub async fn remove_member(
    State(state): State<AppState>,
    Path((circle_id, member_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let target = format!("{}/{}", circle_id, member_id);
    run_blocking(&state, move |service| service.remove_member(&circle_id, &member_id))
        .await
        .map_err(|e| failed("remove_member", &target, e))?;

    Ok(Json(MessageResponse::new("Member removed")))
}

/// PUT /circles/:circle_id/members/:member_id/level - Change a member's level
pub async fn set_member_level(
    State(state): State<AppState>,
    Path((circle_id, member_id)): Path<(String, String)>,
    payload: Result<Json<SetLevelRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let target = format!("{}/{}", circle_id, member_id);
    let Json(req) = payload.map_err(|e| rejected("set_level", &target, e))?;

    run_blocking(&state, move |service| {
        service.set_member_level(&circle_id, &member_id, req.level)
    })
    .await
    .map_err(|e| failed("set_level", &target, e))?;

    Ok(Json(MessageResponse::new("Level updated")))
}
