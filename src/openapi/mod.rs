use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AssetFlow API",
        version = "1.0.0",
        description = r#"
# AssetFlow Procurement & Asset API

Procurement orders for construction projects, from Draft through approval,
delivery and receipt, and the assets generated from what was received.

## Authentication

Every endpoint requires a bearer JWT whose `role` claim names one of the
system roles. Project-scoped roles only see orders of projects they are
assigned to or manage.

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors share one body shape. Validation failures list every failing field:

```json
{
  "error": "Bad Request",
  "message": "Validation failed",
  "errors": ["discrepancy_type: Discrepancy type is required"],
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "procurement-orders", description = "Procurement order lifecycle"),
        (name = "assets", description = "Generated assets and their verification workflow")
    ),
    paths(
        crate::handlers::procurement_orders::create_procurement_order,
        crate::handlers::procurement_orders::list_procurement_orders,
        crate::handlers::procurement_orders::get_procurement_order,
        crate::handlers::procurement_orders::get_allowed_actions,
        crate::handlers::procurement_orders::get_generation_preview,
        crate::handlers::procurement_orders::get_activity,
        crate::handlers::procurement_orders::submit_procurement_order,
        crate::handlers::procurement_orders::review_procurement_order,
        crate::handlers::procurement_orders::approve_procurement_order,
        crate::handlers::procurement_orders::reject_procurement_order,
        crate::handlers::procurement_orders::revise_procurement_order,
        crate::handlers::procurement_orders::schedule_delivery,
        crate::handlers::procurement_orders::update_delivery_status,
        crate::handlers::procurement_orders::cancel_procurement_order,
        crate::handlers::procurement_orders::confirm_receipt,
        crate::handlers::procurement_orders::resolve_discrepancy,
        crate::handlers::procurement_orders::resolve_item_discrepancy,
        crate::handlers::procurement_orders::generate_assets,

        crate::handlers::assets::get_asset,
        crate::handlers::assets::update_asset,
        crate::handlers::assets::submit_for_verification,
        crate::handlers::assets::verify_asset,
        crate::handlers::assets::authorize_asset,
        crate::handlers::assets::batch_verify,
        crate::handlers::assets::batch_authorize,
    ),
    components(
        schemas(
            crate::handlers::procurement_orders::CreateProcurementOrderRequest,
            crate::handlers::procurement_orders::ApprovalRequest,
            crate::handlers::procurement_orders::ScheduleDeliveryRequest,
            crate::handlers::procurement_orders::UpdateDeliveryStatusRequest,
            crate::handlers::procurement_orders::CancelProcurementOrderRequest,
            crate::handlers::procurement_orders::ConfirmReceiptRequest,
            crate::handlers::procurement_orders::ResolveDiscrepancyRequest,
            crate::handlers::procurement_orders::GenerateAssetsRequest,
            crate::handlers::procurement_orders::AssetSelection,
            crate::handlers::assets::UpdateAssetRequest,
            crate::handlers::assets::WorkflowNotesRequest,
            crate::handlers::assets::BatchWorkflowRequest,
            crate::commands::procurement::NewProcurementItem,
            crate::commands::procurement::ReceiptItemInput,
            crate::services::pricing::OrderTotals,
            crate::auth::gate::ProcurementAction,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_procurement_and_asset_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("AssetFlow API"));
        assert!(json.contains("/api/v1/procurement-orders/{id}/receive"));
        assert!(json.contains("/api/v1/assets/batch/verify"));
        assert!(json.contains("bearer_auth"));
    }
}
