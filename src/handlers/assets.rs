use super::common::{optional_text, success_response, validate_input};
use crate::{
    auth::RequestContext,
    commands::assets::{UpdateAssetCommand, WorkflowStep},
    entities::asset,
    errors::{ApiError, ErrorResponse},
    handlers::AppState,
    services::assets::BatchResult,
    ApiResponse,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAssetRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 32))]
    pub unit: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct WorkflowNotesRequest {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct BatchWorkflowRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 assets per batch"))]
    pub asset_ids: Vec<Uuid>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Fetch an asset
#[utoipa::path(
    get,
    path = "/api/v1/assets/{id}",
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset", body = ApiResponse<asset::Model>),
        (status = 403, description = "Not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn get_asset(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let asset = state.services.assets.get(&ctx, id).await?;
    Ok(success_response(asset))
}

/// Correct descriptive fields of an asset
#[utoipa::path(
    patch,
    path = "/api/v1/assets/{id}",
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = UpdateAssetRequest,
    responses(
        (status = 200, description = "Asset updated", body = ApiResponse<asset::Model>),
        (status = 403, description = "Editing not permitted at this stage", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn update_asset(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssetRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let asset = state
        .services
        .assets
        .update(UpdateAssetCommand {
            ctx,
            asset_id: id,
            name: payload.name,
            description: payload.description,
            unit: payload.unit,
        })
        .await?;
    Ok(success_response(asset))
}

async fn advance(
    state: AppState,
    ctx: RequestContext,
    id: Uuid,
    step: WorkflowStep,
    payload: Option<Json<WorkflowNotesRequest>>,
) -> Result<Response, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    validate_input(&payload)?;
    let asset = state
        .services
        .assets
        .advance(ctx, id, step, optional_text(payload.notes))
        .await?;
    Ok(success_response(asset))
}

/// Maker hands a draft asset to verification
#[utoipa::path(
    post,
    path = "/api/v1/assets/{id}/submit-for-verification",
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = Option<WorkflowNotesRequest>,
    responses(
        (status = 200, description = "Asset pending verification", body = ApiResponse<asset::Model>),
        (status = 400, description = "Asset is not a draft", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn submit_for_verification(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<WorkflowNotesRequest>>,
) -> Result<Response, ApiError> {
    advance(state, ctx, id, WorkflowStep::SubmitForVerification, payload).await
}

/// Verifier confirms an asset
#[utoipa::path(
    post,
    path = "/api/v1/assets/{id}/verify",
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = Option<WorkflowNotesRequest>,
    responses(
        (status = 200, description = "Asset pending authorization", body = ApiResponse<asset::Model>),
        (status = 400, description = "Asset is not pending verification", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn verify_asset(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<WorkflowNotesRequest>>,
) -> Result<Response, ApiError> {
    advance(state, ctx, id, WorkflowStep::Verify, payload).await
}

/// Authorizer approves an asset
#[utoipa::path(
    post,
    path = "/api/v1/assets/{id}/authorize",
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = Option<WorkflowNotesRequest>,
    responses(
        (status = 200, description = "Asset approved", body = ApiResponse<asset::Model>),
        (status = 400, description = "Asset is not pending authorization", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn authorize_asset(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<WorkflowNotesRequest>>,
) -> Result<Response, ApiError> {
    advance(state, ctx, id, WorkflowStep::Authorize, payload).await
}

async fn batch(
    state: AppState,
    ctx: RequestContext,
    step: WorkflowStep,
    payload: BatchWorkflowRequest,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let result = state
        .services
        .assets
        .batch(&ctx, &payload.asset_ids, step, optional_text(payload.notes))
        .await;
    Ok(success_response(result))
}

/// Verify many assets; each succeeds or fails on its own
#[utoipa::path(
    post,
    path = "/api/v1/assets/batch/verify",
    request_body = BatchWorkflowRequest,
    responses(
        (status = 200, description = "Per-asset outcome", body = ApiResponse<BatchResult>),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn batch_verify(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<BatchWorkflowRequest>,
) -> Result<Response, ApiError> {
    batch(state, ctx, WorkflowStep::Verify, payload).await
}

/// Authorize many assets; each succeeds or fails on its own
#[utoipa::path(
    post,
    path = "/api/v1/assets/batch/authorize",
    request_body = BatchWorkflowRequest,
    responses(
        (status = 200, description = "Per-asset outcome", body = ApiResponse<BatchResult>),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn batch_authorize(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<BatchWorkflowRequest>,
) -> Result<Response, ApiError> {
    batch(state, ctx, WorkflowStep::Authorize, payload).await
}

pub fn asset_routes() -> Router<AppState> {
    Router::new()
        .route("/batch/verify", post(batch_verify))
        .route("/batch/authorize", post(batch_authorize))
        .route("/:id", get(get_asset).patch(update_asset).put(update_asset))
        .route("/:id/submit-for-verification", post(submit_for_verification))
        .route("/:id/verify", post(verify_asset))
        .route("/:id/authorize", post(authorize_asset))
}
