//! Maker-Verifier-Authorizer workflow and asset edits.

mod common;

use std::collections::BTreeMap;

use assert_matches::assert_matches;
use assetflow_api::{
    auth::{RequestContext, Role},
    commands::{
        assets::{UpdateAssetCommand, WorkflowStep},
        procurement::{ConfirmReceiptCommand, ReceiptItemInput},
    },
    entities::AssetWorkflowStatus,
    errors::ServiceError,
};
use common::{ctx, item, TestApp};
use rust_decimal_macros::dec;
use sea_orm::ConnectionTrait;
use uuid::Uuid;

/// Receives `quantity` units of equipment and generates assets as `maker`.
async fn generated_assets(app: &TestApp, maker: &RequestContext, quantity: i32) -> Vec<Uuid> {
    let equipment = app.seed_category("Equipment", false, true).await;
    let order = app
        .approved_order(None, vec![item("Concrete vibrator", quantity, dec!(18500), Some(equipment))])
        .await;
    let item_id = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap()
        .items[0]
        .id;
    app.procurement()
        .confirm_receipt(ConfirmReceiptCommand {
            ctx: ctx(Role::AssetDirector),
            order_id: order.id,
            items: vec![ReceiptItemInput {
                item_id,
                quantity_received: quantity,
                delivery_complete: true,
                quality_notes: None,
            }],
            actual_delivery_date: None,
            has_discrepancy: false,
            discrepancy_type: None,
            discrepancy_details: None,
            receipt_file: None,
            evidence_file: None,
            notes: None,
        })
        .await
        .unwrap();

    app.procurement()
        .generate_assets(maker.clone(), order.id, BTreeMap::new())
        .await
        .unwrap()
        .asset_ids
}

#[tokio::test]
async fn asset_moves_through_maker_verifier_authorizer() {
    let app = TestApp::new().await;
    let maker = ctx(Role::ProcurementOfficer);
    let asset_id = generated_assets(&app, &maker, 1).await[0];

    let draft = app.assets().get(&maker, asset_id).await.unwrap();
    assert_eq!(draft.workflow_status, AssetWorkflowStatus::Draft);
    assert_eq!(draft.made_by, Some(maker.user_id));

    let submitted = app
        .assets()
        .submit_for_verification(maker.clone(), asset_id, None)
        .await
        .unwrap();
    assert_eq!(submitted.workflow_status, AssetWorkflowStatus::PendingVerification);

    let verifier = ctx(Role::AssetDirector);
    let verified = app
        .assets()
        .verify(verifier.clone(), asset_id, Some("Serial numbers checked".into()))
        .await
        .unwrap();
    assert_eq!(verified.workflow_status, AssetWorkflowStatus::PendingAuthorization);
    assert_eq!(verified.verified_by, Some(verifier.user_id));
    assert!(verified.verified_at.is_some());

    let same_person = app
        .assets()
        .authorize(verifier, asset_id, None)
        .await
        .unwrap_err();
    assert_matches!(same_person, ServiceError::Forbidden(_));

    let authorizer = ctx(Role::FinanceDirector);
    let approved = app
        .assets()
        .authorize(authorizer.clone(), asset_id, None)
        .await
        .unwrap();
    assert_eq!(approved.workflow_status, AssetWorkflowStatus::Approved);
    assert_eq!(approved.authorized_by, Some(authorizer.user_id));
}

#[tokio::test]
async fn maker_cannot_verify_their_own_asset() {
    let app = TestApp::new().await;
    let maker = ctx(Role::AssetDirector);
    let asset_id = generated_assets(&app, &maker, 1).await[0];
    app.assets()
        .submit_for_verification(maker.clone(), asset_id, None)
        .await
        .unwrap();

    let err = app.assets().verify(maker, asset_id, None).await.unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn steps_out_of_order_are_invalid() {
    let app = TestApp::new().await;
    let maker = ctx(Role::ProcurementOfficer);
    let asset_id = generated_assets(&app, &maker, 1).await[0];

    let err = app
        .assets()
        .authorize(ctx(Role::FinanceDirector), asset_id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    let wrong_role = app
        .assets()
        .verify(ctx(Role::Warehouseman), asset_id, None)
        .await
        .unwrap_err();
    assert_matches!(wrong_role, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn batch_verify_reports_each_asset() {
    let app = TestApp::new().await;
    let maker = ctx(Role::ProcurementOfficer);
    let assets = generated_assets(&app, &maker, 3).await;
    for id in &assets[..2] {
        app.assets()
            .submit_for_verification(maker.clone(), *id, None)
            .await
            .unwrap();
    }

    let ids = vec![assets[0], assets[1], assets[2], assets[0], Uuid::new_v4()];
    let result = app
        .assets()
        .batch(&ctx(Role::AssetDirector), &ids, WorkflowStep::Verify, None)
        .await;
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 2);
    assert_eq!(result.succeeded, vec![assets[0], assets[1]]);
    assert_eq!(result.failed[0].asset_id, assets[2]);

    let still_draft = app
        .assets()
        .get(&ctx(Role::AssetDirector), assets[2])
        .await
        .unwrap();
    assert_eq!(still_draft.workflow_status, AssetWorkflowStatus::Draft);
}

#[tokio::test]
async fn batch_failures_do_not_expose_database_detail() {
    let app = TestApp::new().await;
    let maker = ctx(Role::ProcurementOfficer);
    let assets = generated_assets(&app, &maker, 1).await;

    app.db()
        .execute_unprepared("DROP TABLE activity_logs")
        .await
        .unwrap();

    let result = app
        .assets()
        .batch(&maker, &assets, WorkflowStep::SubmitForVerification, None)
        .await;
    assert_eq!(result.failure_count, 1);
    assert_eq!(result.failed[0].error, "Database error");

    let unchanged = app.assets().get(&maker, assets[0]).await.unwrap();
    assert_eq!(unchanged.workflow_status, AssetWorkflowStatus::Draft);
}

#[tokio::test]
async fn edits_follow_the_workflow_stage() {
    let app = TestApp::new().await;
    let maker = ctx(Role::ProcurementOfficer);
    let asset_id = generated_assets(&app, &maker, 1).await[0];

    let edit = |ctx: RequestContext, name: &str| UpdateAssetCommand {
        ctx,
        asset_id,
        name: Some(name.to_string()),
        description: None,
        unit: None,
    };

    let renamed = app
        .assets()
        .update(edit(maker.clone(), "Concrete vibrator #1"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Concrete vibrator #1");

    let other = app
        .assets()
        .update(edit(ctx(Role::ProcurementOfficer), "Someone else's"))
        .await
        .unwrap_err();
    assert_matches!(other, ServiceError::Forbidden(_));

    app.assets()
        .submit_for_verification(maker.clone(), asset_id, None)
        .await
        .unwrap();
    app.assets()
        .verify(ctx(Role::AssetDirector), asset_id, None)
        .await
        .unwrap();

    let maker_late = app
        .assets()
        .update(edit(maker.clone(), "Too late"))
        .await
        .unwrap_err();
    assert_matches!(maker_late, ServiceError::Forbidden(_));

    let corrected = app
        .assets()
        .update(edit(ctx(Role::FinanceDirector), "Concrete vibrator (corrected)"))
        .await
        .unwrap();
    assert_eq!(corrected.name, "Concrete vibrator (corrected)");

    app.assets()
        .authorize(ctx(Role::FinanceDirector), asset_id, None)
        .await
        .unwrap();
    let locked = app
        .assets()
        .update(edit(ctx(Role::FinanceDirector), "Locked"))
        .await
        .unwrap_err();
    assert_matches!(locked, ServiceError::Forbidden(_));

    let director = app
        .assets()
        .update(edit(ctx(Role::AssetDirector), "Concrete vibrator VX-2"))
        .await
        .unwrap();
    assert_eq!(director.name, "Concrete vibrator VX-2");
}
