//! Receipt reconciliation and discrepancy resolution against a real database.

mod common;

use assert_matches::assert_matches;
use assetflow_api::{
    auth::Role,
    commands::procurement::{
        ConfirmReceiptCommand, ReceiptItemInput, ResolveDiscrepancyCommand,
        ResolveItemDiscrepancyCommand,
    },
    entities::{
        DeliveryStatus, DiscrepancyType, ItemDiscrepancyStatus, OrderStatus, ResolutionAction,
    },
    errors::ServiceError,
};
use common::{ctx, item, TestApp};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn receive(order_id: Uuid, role: Role, lines: Vec<(Uuid, i32)>) -> ConfirmReceiptCommand {
    ConfirmReceiptCommand {
        ctx: ctx(role),
        order_id,
        items: lines
            .into_iter()
            .map(|(item_id, quantity_received)| ReceiptItemInput {
                item_id,
                quantity_received,
                delivery_complete: false,
                quality_notes: None,
            })
            .collect(),
        actual_delivery_date: None,
        has_discrepancy: false,
        discrepancy_type: None,
        discrepancy_details: None,
        receipt_file: None,
        evidence_file: None,
        notes: None,
    }
}

#[tokio::test]
async fn partial_receipts_accumulate_until_received() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Hollow blocks", 100, dec!(18), None)])
        .await;
    let detail = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap();
    let item_id = detail.items[0].id;

    let first = app
        .procurement()
        .confirm_receipt(receive(order.id, Role::AssetDirector, vec![(item_id, 60)]))
        .await
        .unwrap();
    assert!(!first.fully_received);
    assert_eq!(first.order.status, OrderStatus::Delivered);
    assert_eq!(first.order.delivery_status, DeliveryStatus::Delivered);
    assert!(first.order.actual_delivery_date.is_some());
    assert_eq!(first.items[0].quantity_received, 60);

    let second = app
        .procurement()
        .confirm_receipt(receive(order.id, Role::AssetDirector, vec![(item_id, 40)]))
        .await
        .unwrap();
    assert!(second.fully_received);
    assert_eq!(second.order.status, OrderStatus::Received);
    assert_eq!(second.items[0].quantity_received, 100);
    assert!(second.items[0].delivery_complete);

    let again = app
        .procurement()
        .confirm_receipt(receive(order.id, Role::AssetDirector, vec![(item_id, 1)]))
        .await
        .unwrap_err();
    assert_matches!(again, ServiceError::InvalidOperation(msg) if msg == "Purchase order has already been received");
}

#[tokio::test]
async fn over_receipt_without_report_changes_nothing() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Hollow blocks", 10, dec!(18), None)])
        .await;
    let item_id = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap()
        .items[0]
        .id;

    let err = app
        .procurement()
        .confirm_receipt(receive(order.id, Role::AssetDirector, vec![(item_id, 12)]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationErrors(_));

    let detail = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap();
    assert_eq!(detail.order.status, OrderStatus::Approved);
    assert_eq!(detail.items[0].quantity_received, 0);
}

#[tokio::test]
async fn reported_over_delivery_is_capped_and_opens_discrepancy() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Hollow blocks", 10, dec!(18), None)])
        .await;
    let item_id = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap()
        .items[0]
        .id;

    let mut command = receive(order.id, Role::AssetDirector, vec![(item_id, 12)]);
    command.has_discrepancy = true;
    command.discrepancy_type = Some(DiscrepancyType::OverDelivery);
    command.discrepancy_details = Some("Supplier sent two extra pallets".into());
    let confirmation = app.procurement().confirm_receipt(command).await.unwrap();

    assert_eq!(confirmation.order.status, OrderStatus::Received);
    assert!(confirmation.order.has_discrepancy);
    assert!(confirmation.order.has_open_discrepancy());
    let line = &confirmation.items[0];
    assert_eq!(line.quantity_received, 10);
    assert_eq!(line.excess_quantity, 2);
    assert_eq!(line.discrepancy_status, ItemDiscrepancyStatus::Open);
}

#[tokio::test]
async fn reporting_a_discrepancy_needs_type_and_details() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Hollow blocks", 10, dec!(18), None)])
        .await;
    let item_id = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap()
        .items[0]
        .id;

    let mut command = receive(order.id, Role::AssetDirector, vec![(item_id, 8)]);
    command.has_discrepancy = true;
    let err = app.procurement().confirm_receipt(command).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationErrors(errors) if errors.len() == 2);
}

#[tokio::test]
async fn lines_for_other_orders_are_rejected() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Hollow blocks", 10, dec!(18), None)])
        .await;

    let err = app
        .procurement()
        .confirm_receipt(receive(order.id, Role::AssetDirector, vec![(Uuid::new_v4(), 1)]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationErrors(errors) if errors[0].contains("does not belong"));
}

#[tokio::test]
async fn warehousemen_receive_only_on_assigned_projects() {
    let app = TestApp::new().await;
    let project = app.seed_project(None).await;
    let order = app
        .approved_order(Some(project), vec![item("Hollow blocks", 10, dec!(18), None)])
        .await;
    let item_id = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap()
        .items[0]
        .id;

    let err = app
        .procurement()
        .confirm_receipt(receive(order.id, Role::Warehouseman, vec![(item_id, 10)]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let mut command = receive(order.id, Role::Warehouseman, vec![(item_id, 10)]);
    command.ctx = command.ctx.with_projects([project]);
    let confirmation = app.procurement().confirm_receipt(command).await.unwrap();
    assert!(confirmation.fully_received);
}

#[tokio::test]
async fn resolving_items_one_by_one_closes_the_order() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(
            None,
            vec![
                item("Hollow blocks", 10, dec!(18), None),
                item("Gravel", 5, dec!(1200), None),
            ],
        )
        .await;
    let items = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap()
        .items;

    let mut command = receive(
        order.id,
        Role::AssetDirector,
        vec![(items[0].id, 7), (items[1].id, 3)],
    );
    command.has_discrepancy = true;
    command.discrepancy_type = Some(DiscrepancyType::QuantityShortage);
    command.discrepancy_details = Some("Short on both lines".into());
    let confirmation = app.procurement().confirm_receipt(command).await.unwrap();
    assert!(confirmation
        .items
        .iter()
        .all(|i| i.discrepancy_status == ItemDiscrepancyStatus::Open));

    let missing_notes = app
        .procurement()
        .resolve_item_discrepancy(ResolveItemDiscrepancyCommand {
            ctx: ctx(Role::FinanceDirector),
            order_id: order.id,
            item_id: items[0].id,
            resolution_action: ResolutionAction::VendorCredit,
            resolution_notes: Some("  ".into()),
        })
        .await
        .unwrap_err();
    assert_matches!(missing_notes, ServiceError::ValidationErrors(_));

    let first = app
        .procurement()
        .resolve_item_discrepancy(ResolveItemDiscrepancyCommand {
            ctx: ctx(Role::FinanceDirector),
            order_id: order.id,
            item_id: items[0].id,
            resolution_action: ResolutionAction::VendorCredit,
            resolution_notes: Some("Credit memo CM-221".into()),
        })
        .await
        .unwrap();
    assert_eq!(first.item.discrepancy_status, ItemDiscrepancyStatus::Resolved);
    assert!(!first.order_resolved);
    assert!(first.order.has_open_discrepancy());

    let second = app
        .procurement()
        .resolve_item_discrepancy(ResolveItemDiscrepancyCommand {
            ctx: ctx(Role::FinanceDirector),
            order_id: order.id,
            item_id: items[1].id,
            resolution_action: ResolutionAction::Redelivery,
            resolution_notes: Some("Balance to follow next week".into()),
        })
        .await
        .unwrap();
    assert!(second.order_resolved);
    assert!(!second.order.has_open_discrepancy());
    assert!(second.order.discrepancy_resolved_at.is_some());
}

#[tokio::test]
async fn order_level_resolution_closes_open_items() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Hollow blocks", 10, dec!(18), None)])
        .await;
    let item_id = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap()
        .items[0]
        .id;

    let none_open = app
        .procurement()
        .resolve_discrepancy(ResolveDiscrepancyCommand {
            ctx: ctx(Role::FinanceDirector),
            order_id: order.id,
            resolution_action: ResolutionAction::DocumentOnly,
            resolution_notes: Some("Nothing to resolve".into()),
        })
        .await
        .unwrap_err();
    assert_matches!(none_open, ServiceError::InvalidOperation(_));

    let mut command = receive(order.id, Role::AssetDirector, vec![(item_id, 10)]);
    command.has_discrepancy = true;
    command.discrepancy_type = Some(DiscrepancyType::DamagedItems);
    command.discrepancy_details = Some("Three blocks cracked".into());
    command.items[0].delivery_complete = true;
    app.procurement().confirm_receipt(command).await.unwrap();

    let resolved = app
        .procurement()
        .resolve_discrepancy(ResolveDiscrepancyCommand {
            ctx: ctx(Role::FinanceDirector),
            order_id: order.id,
            resolution_action: ResolutionAction::DocumentOnly,
            resolution_notes: Some("Accepted with photo evidence".into()),
        })
        .await
        .unwrap();
    assert!(!resolved.has_open_discrepancy());
    assert_eq!(
        resolved.discrepancy_resolution_action,
        Some(ResolutionAction::DocumentOnly)
    );
}

#[tokio::test]
async fn oversized_receipts_are_validation_errors() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Hollow blocks", 100, dec!(18), None)])
        .await;
    let item_id = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap()
        .items[0]
        .id;

    app.procurement()
        .confirm_receipt(receive(order.id, Role::AssetDirector, vec![(item_id, 5)]))
        .await
        .unwrap();

    let mut excess = receive(order.id, Role::AssetDirector, vec![(item_id, i32::MAX)]);
    excess.has_discrepancy = true;
    excess.discrepancy_type = Some(DiscrepancyType::OverDelivery);
    excess.discrepancy_details = Some("Counter misread".into());
    let err = app.procurement().confirm_receipt(excess).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationErrors(errors) if errors[0].contains("too large"));

    let doubled = receive(
        order.id,
        Role::AssetDirector,
        vec![(item_id, i32::MAX), (item_id, i32::MAX)],
    );
    let err = app.procurement().confirm_receipt(doubled).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationErrors(_));

    let negative = receive(order.id, Role::AssetDirector, vec![(item_id, -4)]);
    let err = app.procurement().confirm_receipt(negative).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationErrors(_));

    let detail = app
        .procurement()
        .get_order(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap();
    assert_eq!(detail.items[0].quantity_received, 5);
    assert_eq!(detail.items[0].excess_quantity, 0);
}
