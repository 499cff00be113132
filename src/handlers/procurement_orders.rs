use super::common::{created_response, optional_text, success_response, validate_input};
use crate::{
    auth::{gate::ProcurementAction, RequestContext},
    commands::procurement::{
        CancelProcurementOrderCommand, ConfirmReceiptCommand, ItemDiscrepancyResolved,
        NewProcurementItem, ReceiptConfirmation, ReceiptItemInput, ResolveDiscrepancyCommand,
        ResolveItemDiscrepancyCommand, ScheduleDeliveryCommand, UpdateDeliveryStatusCommand,
    },
    entities::{
        procurement_activity_log, procurement_order, DeliveryMethod, DeliveryStatus,
        DiscrepancyType, ResolutionAction,
    },
    errors::{ApiError, ErrorResponse},
    handlers::AppState,
    services::{
        asset_generation::{GenerationPreview, GenerationResult},
        procurement::{NewOrder, OrderDetail, OrderList, OrderListQuery},
        state_machine::{ApprovalAction, CancellationReason},
    },
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// Request DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProcurementOrderRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub vendor_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    #[schema(value_type = Option<String>, example = "0.00")]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub is_retroactive: bool,
    #[validate(length(max = 1000))]
    pub retroactive_reason: Option<String>,
    pub quote_file: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate]
    pub items: Vec<NewProcurementItem>,
}

/// Body shared by submit, review, approve, reject and revise.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApprovalRequest {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ScheduleDeliveryRequest {
    pub delivery_method: Option<DeliveryMethod>,
    #[validate(length(max = 255))]
    pub delivery_location: Option<String>,
    pub scheduled_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub tracking_number: Option<String>,
    #[validate(length(max = 2000))]
    pub delivery_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateDeliveryStatusRequest {
    pub delivery_status: DeliveryStatus,
    pub actual_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub tracking_number: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CancelProcurementOrderRequest {
    pub reason: CancellationReason,
    #[validate(length(max = 255))]
    pub custom_reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConfirmReceiptRequest {
    #[validate(custom = "validate_receipt_items")]
    #[validate]
    pub items: Vec<ReceiptItemInput>,
    pub actual_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub has_discrepancy: bool,
    pub discrepancy_type: Option<DiscrepancyType>,
    #[validate(length(max = 2000))]
    pub discrepancy_details: Option<String>,
    pub receipt_file: Option<String>,
    pub evidence_file: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn validate_receipt_items(items: &Vec<ReceiptItemInput>) -> Result<(), ValidationError> {
    if items.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("At least one item must be received".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResolveDiscrepancyRequest {
    pub resolution_action: ResolutionAction,
    #[validate(length(max = 2000))]
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct AssetSelection {
    pub item_id: Uuid,
    pub quantity: i32,
}

/// An empty `items` list converts everything still available.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct GenerateAssetsRequest {
    #[serde(default)]
    pub items: Vec<AssetSelection>,
}

impl GenerateAssetsRequest {
    fn selections(&self) -> BTreeMap<Uuid, i32> {
        let mut selections = BTreeMap::new();
        for selection in &self.items {
            let entry = selections.entry(selection.item_id).or_insert(0);
            *entry = i32::saturating_add(*entry, selection.quantity);
        }
        selections
    }
}

// Handlers

/// Raise a new procurement order in Draft
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders",
    request_body = CreateProcurementOrderRequest,
    responses(
        (status = 201, description = "Procurement order created", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Role may not create orders", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn create_procurement_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<CreateProcurementOrderRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .procurement
        .create_order(
            ctx,
            NewOrder {
                title: payload.title.trim().to_string(),
                vendor_id: payload.vendor_id,
                project_id: payload.project_id,
                discount: payload.discount.unwrap_or(Decimal::ZERO),
                is_retroactive: payload.is_retroactive,
                retroactive_reason: optional_text(payload.retroactive_reason),
                quote_file: optional_text(payload.quote_file),
                notes: optional_text(payload.notes),
                items: payload.items,
            },
        )
        .await?;

    info!(order_id = %order.id, po_number = %order.po_number, "procurement order created");
    Ok(created_response(order))
}

/// List procurement orders visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/procurement-orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Page of procurement orders", body = ApiResponse<OrderList>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn list_procurement_orders(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<OrderListQuery>,
) -> Result<Response, ApiError> {
    let orders = state.services.procurement.list_orders(&ctx, query).await?;
    Ok(success_response(orders))
}

/// Fetch one procurement order with its items
#[utoipa::path(
    get,
    path = "/api/v1/procurement-orders/{id}",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    responses(
        (status = 200, description = "Procurement order", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Procurement order not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn get_procurement_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let detail = state.services.procurement.get_order(&ctx, id).await?;
    Ok(success_response(detail))
}

/// Actions the caller may take on the order right now
#[utoipa::path(
    get,
    path = "/api/v1/procurement-orders/{id}/allowed-actions",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    responses(
        (status = 200, description = "Allowed actions", body = ApiResponse<Vec<ProcurementAction>>),
        (status = 404, description = "Procurement order not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn get_allowed_actions(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let actions = state.services.procurement.allowed_actions(&ctx, id).await?;
    Ok(success_response(actions))
}

/// Quantities available for asset generation, per item
#[utoipa::path(
    get,
    path = "/api/v1/procurement-orders/{id}/generation-preview",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    responses(
        (status = 200, description = "Generation preview", body = ApiResponse<GenerationPreview>),
        (status = 404, description = "Procurement order not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn get_generation_preview(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let preview = state
        .services
        .procurement
        .generation_preview(&ctx, id)
        .await?;
    Ok(success_response(preview))
}

/// Transition history of the order
#[utoipa::path(
    get,
    path = "/api/v1/procurement-orders/{id}/activity",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    responses(
        (status = 200, description = "Activity entries, oldest first", body = ApiResponse<Vec<procurement_activity_log::Model>>),
        (status = 404, description = "Procurement order not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn get_activity(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let entries = state.services.procurement.activity(&ctx, id).await?;
    Ok(success_response(entries))
}

async fn transition(
    state: AppState,
    ctx: RequestContext,
    id: Uuid,
    action: ApprovalAction,
    payload: Option<ApprovalRequest>,
) -> Result<Response, ApiError> {
    let payload = payload.unwrap_or_default();
    validate_input(&payload)?;
    let order = state
        .services
        .procurement
        .transition(ctx, id, action, optional_text(payload.notes))
        .await?;
    Ok(success_response(order))
}

/// Submit a Draft or revised order for review
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/submit",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = Option<ApprovalRequest>,
    responses(
        (status = 200, description = "Order submitted", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Order cannot be submitted in its current status", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn submit_procurement_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<ApprovalRequest>>,
) -> Result<Response, ApiError> {
    transition(state, ctx, id, ApprovalAction::Submit, payload.map(|Json(p)| p)).await
}

/// Mark a Pending order as reviewed
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/review",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = Option<ApprovalRequest>,
    responses(
        (status = 200, description = "Order reviewed", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Order cannot be reviewed in its current status", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn review_procurement_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<ApprovalRequest>>,
) -> Result<Response, ApiError> {
    transition(state, ctx, id, ApprovalAction::Review, payload.map(|Json(p)| p)).await
}

/// Approve a reviewed order
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/approve",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = Option<ApprovalRequest>,
    responses(
        (status = 200, description = "Order approved", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Order cannot be approved in its current status", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn approve_procurement_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<ApprovalRequest>>,
) -> Result<Response, ApiError> {
    transition(state, ctx, id, ApprovalAction::Approve, payload.map(|Json(p)| p)).await
}

/// Reject an order; notes are required
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/reject",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Order rejected", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Missing notes or illegal status", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn reject_procurement_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<ApprovalRequest>>,
) -> Result<Response, ApiError> {
    transition(state, ctx, id, ApprovalAction::Reject, payload.map(|Json(p)| p)).await
}

/// Return an order to its maker for revision; notes are required
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/revise",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Order returned for revision", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Missing notes or illegal status", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn revise_procurement_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<ApprovalRequest>>,
) -> Result<Response, ApiError> {
    transition(state, ctx, id, ApprovalAction::Revise, payload.map(|Json(p)| p)).await
}

/// Schedule delivery of an approved order
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/schedule-delivery",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = ScheduleDeliveryRequest,
    responses(
        (status = 200, description = "Delivery scheduled", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Missing delivery details or illegal status", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn schedule_delivery(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleDeliveryRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .procurement
        .schedule_delivery(ScheduleDeliveryCommand {
            ctx,
            order_id: id,
            delivery_method: payload.delivery_method,
            delivery_location: optional_text(payload.delivery_location),
            scheduled_delivery_date: payload.scheduled_delivery_date,
            tracking_number: optional_text(payload.tracking_number),
            delivery_notes: optional_text(payload.delivery_notes),
        })
        .await?;
    Ok(success_response(order))
}

/// Move the delivery forward (in transit, delivered, failed)
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/delivery-status",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = UpdateDeliveryStatusRequest,
    responses(
        (status = 200, description = "Delivery status updated", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Invalid delivery transition", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .procurement
        .update_delivery_status(UpdateDeliveryStatusCommand {
            ctx,
            order_id: id,
            delivery_status: payload.delivery_status,
            actual_delivery_date: payload.actual_delivery_date,
            tracking_number: optional_text(payload.tracking_number),
            notes: optional_text(payload.notes),
        })
        .await?;
    Ok(success_response(order))
}

/// Cancel an order that has not been approved
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = CancelProcurementOrderRequest,
    responses(
        (status = 200, description = "Order canceled", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "Order cannot be canceled", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn cancel_procurement_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelProcurementOrderRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .procurement
        .cancel(CancelProcurementOrderCommand {
            ctx,
            order_id: id,
            reason: payload.reason,
            custom_reason: optional_text(payload.custom_reason),
            notes: optional_text(payload.notes),
        })
        .await?;
    Ok(success_response(order))
}

/// Record quantities received, optionally reporting a discrepancy
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/receive",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = ConfirmReceiptRequest,
    responses(
        (status = 200, description = "Receipt recorded", body = ApiResponse<ReceiptConfirmation>),
        (status = 400, description = "Invalid quantities or order not receivable", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn confirm_receipt(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmReceiptRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let confirmation = state
        .services
        .procurement
        .confirm_receipt(ConfirmReceiptCommand {
            ctx,
            order_id: id,
            items: payload.items,
            actual_delivery_date: payload.actual_delivery_date,
            has_discrepancy: payload.has_discrepancy,
            discrepancy_type: payload.discrepancy_type,
            discrepancy_details: optional_text(payload.discrepancy_details),
            receipt_file: optional_text(payload.receipt_file),
            evidence_file: optional_text(payload.evidence_file),
            notes: optional_text(payload.notes),
        })
        .await?;
    Ok(success_response(confirmation))
}

/// Resolve the order's discrepancy and every open item discrepancy
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/resolve-discrepancy",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = ResolveDiscrepancyRequest,
    responses(
        (status = 200, description = "Discrepancy resolved", body = ApiResponse<procurement_order::Model>),
        (status = 400, description = "No open discrepancy or missing notes", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn resolve_discrepancy(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveDiscrepancyRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .procurement
        .resolve_discrepancy(ResolveDiscrepancyCommand {
            ctx,
            order_id: id,
            resolution_action: payload.resolution_action,
            resolution_notes: payload.resolution_notes,
        })
        .await?;
    Ok(success_response(order))
}

/// Resolve the discrepancy on a single item
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/items/{item_id}/resolve-discrepancy",
    params(
        ("id" = Uuid, Path, description = "Procurement order ID"),
        ("item_id" = Uuid, Path, description = "Procurement item ID")
    ),
    request_body = ResolveDiscrepancyRequest,
    responses(
        (status = 200, description = "Item discrepancy resolved", body = ApiResponse<ItemDiscrepancyResolved>),
        (status = 400, description = "Item has no open discrepancy", body = ErrorResponse),
        (status = 404, description = "Item not on this order", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn resolve_item_discrepancy(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ResolveDiscrepancyRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let resolved = state
        .services
        .procurement
        .resolve_item_discrepancy(ResolveItemDiscrepancyCommand {
            ctx,
            order_id: id,
            item_id,
            resolution_action: payload.resolution_action,
            resolution_notes: payload.resolution_notes,
        })
        .await?;
    Ok(success_response(resolved))
}

/// Convert received quantities into assets
#[utoipa::path(
    post,
    path = "/api/v1/procurement-orders/{id}/generate-assets",
    params(("id" = Uuid, Path, description = "Procurement order ID")),
    request_body = Option<GenerateAssetsRequest>,
    responses(
        (status = 200, description = "Generation outcome, including skipped items", body = ApiResponse<GenerationResult>),
        (status = 400, description = "Order not received", body = ErrorResponse),
        (status = 403, description = "Action not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurement-orders"
)]
pub async fn generate_assets(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<GenerateAssetsRequest>>,
) -> Result<Response, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let result = state
        .services
        .procurement
        .generate_assets(ctx, id, payload.selections())
        .await?;
    Ok(success_response(result))
}

pub fn procurement_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(create_procurement_order).get(list_procurement_orders),
        )
        .route("/:id", get(get_procurement_order))
        .route("/:id/allowed-actions", get(get_allowed_actions))
        .route("/:id/generation-preview", get(get_generation_preview))
        .route("/:id/activity", get(get_activity))
        .route("/:id/submit", post(submit_procurement_order))
        .route("/:id/review", post(review_procurement_order))
        .route("/:id/approve", post(approve_procurement_order))
        .route("/:id/reject", post(reject_procurement_order))
        .route("/:id/revise", post(revise_procurement_order))
        .route("/:id/schedule-delivery", post(schedule_delivery))
        .route("/:id/delivery-status", post(update_delivery_status))
        .route("/:id/cancel", post(cancel_procurement_order))
        .route("/:id/receive", post(confirm_receipt))
        .route("/:id/resolve-discrepancy", post(resolve_discrepancy))
        .route(
            "/:id/items/:item_id/resolve-discrepancy",
            post(resolve_item_discrepancy),
        )
        .route("/:id/generate-assets", post(generate_assets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_selections_are_summed() {
        let item = Uuid::new_v4();
        let request = GenerateAssetsRequest {
            items: vec![
                AssetSelection {
                    item_id: item,
                    quantity: 2,
                },
                AssetSelection {
                    item_id: item,
                    quantity: 3,
                },
            ],
        };
        assert_eq!(request.selections().get(&item), Some(&5));
    }

    #[test]
    fn huge_duplicate_selections_saturate() {
        let item = Uuid::new_v4();
        let request = GenerateAssetsRequest {
            items: vec![
                AssetSelection {
                    item_id: item,
                    quantity: i32::MAX,
                },
                AssetSelection {
                    item_id: item,
                    quantity: i32::MAX,
                },
            ],
        };
        assert_eq!(request.selections().get(&item), Some(&i32::MAX));
    }

    #[test]
    fn receipt_lines_reject_negative_quantities() {
        let request: ConfirmReceiptRequest = serde_json::from_value(serde_json::json!({
            "items": [{ "item_id": Uuid::new_v4(), "quantity_received": -1 }]
        }))
        .unwrap();
        let err = validate_input(&request).unwrap_err();
        assert_eq!(
            err.field_errors(),
            vec!["items[0].quantity_received: Received quantity cannot be negative".to_string()]
        );
    }

    #[test]
    fn receipts_need_at_least_one_line() {
        let request: ConfirmReceiptRequest = serde_json::from_value(serde_json::json!({
            "items": []
        }))
        .unwrap();
        let err = validate_input(&request).unwrap_err();
        assert_eq!(
            err.field_errors(),
            vec!["items: At least one item must be received".to_string()]
        );
    }

    #[test]
    fn create_requests_validate_nested_items() {
        let request: CreateProcurementOrderRequest = serde_json::from_value(serde_json::json!({
            "title": "Rebar",
            "items": [{ "item_name": "Rebar 10mm", "quantity": 0, "unit_price": "12.50" }]
        }))
        .unwrap();
        let err = validate_input(&request).unwrap_err();
        assert_eq!(
            err.field_errors(),
            vec!["items[0].quantity: Quantity must be at least 1".to_string()]
        );
    }
}
