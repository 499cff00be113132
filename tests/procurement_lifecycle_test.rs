//! Order lifecycle through the service layer: approval loop, delivery,
//! cancellation and the activity trail.

mod common;

use assert_matches::assert_matches;
use assetflow_api::{
    auth::{gate::ProcurementAction, Role},
    commands::{
        procurement::{
            CancelProcurementOrderCommand, ScheduleDeliveryCommand, UpdateDeliveryStatusCommand,
        },
        Command,
    },
    entities::{DeliveryMethod, DeliveryStatus, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        procurement::OrderListQuery,
        state_machine::{ApprovalAction, CancellationReason},
    },
};
use chrono::{Duration, Utc};
use common::{ctx, item, TestApp};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::test]
async fn draft_orders_are_priced_with_vat_and_ewt() {
    let app = TestApp::new().await;
    let order = app
        .draft_order(
            None,
            vec![
                item("Deformed bar 12mm", 100, dec!(35.00), None),
                item("Tie wire", 5, dec!(100.00), None),
            ],
        )
        .await;

    assert_eq!(order.status, OrderStatus::Draft);
    assert_eq!(order.delivery_status, DeliveryStatus::Pending);
    assert!(order.po_number.starts_with("PO-"));
    assert_eq!(order.subtotal, dec!(4000.00));
    assert_eq!(order.vat_amount, dec!(480.00));
    assert_eq!(order.ewt_amount, dec!(40.00));
    assert_eq!(order.net_total, dec!(4440.00));
}

#[tokio::test]
async fn approval_loop_reaches_approved_and_records_activity() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Cement", 10, dec!(250), None)])
        .await;

    assert_eq!(order.status, OrderStatus::Approved);
    assert!(order.approved_by.is_some());
    assert!(order.approved_at.is_some());

    let trail = app
        .procurement()
        .activity(&ctx(Role::AssetDirector), order.id)
        .await
        .unwrap();
    let actions: Vec<&str> = trail.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["created", "submit", "review", "approve"]);
    assert_eq!(trail[3].old_value.as_deref(), Some("Reviewed"));
    assert_eq!(trail[3].new_value.as_deref(), Some("Approved"));
}

#[tokio::test]
async fn rejecting_requires_notes() {
    let app = TestApp::new().await;
    let order = app
        .draft_order(None, vec![item("Cement", 10, dec!(250), None)])
        .await;
    let svc = app.procurement();
    svc.transition(ctx(Role::ProcurementOfficer), order.id, ApprovalAction::Submit, None)
        .await
        .unwrap();

    let err = svc
        .transition(ctx(Role::FinanceDirector), order.id, ApprovalAction::Reject, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationErrors(_));

    let rejected = svc
        .transition(
            ctx(Role::FinanceDirector),
            order.id,
            ApprovalAction::Reject,
            Some("Over budget for this phase".into()),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, OrderStatus::Rejected);
}

#[tokio::test]
async fn revised_orders_can_be_resubmitted() {
    let app = TestApp::new().await;
    let order = app
        .draft_order(None, vec![item("Cement", 10, dec!(250), None)])
        .await;
    let svc = app.procurement();
    svc.transition(ctx(Role::ProcurementOfficer), order.id, ApprovalAction::Submit, None)
        .await
        .unwrap();
    let revised = svc
        .transition(
            ctx(Role::AssetDirector),
            order.id,
            ApprovalAction::Revise,
            Some("Attach the second quotation".into()),
        )
        .await
        .unwrap();
    assert_eq!(revised.status, OrderStatus::ForRevision);

    let resubmitted = svc
        .transition(ctx(Role::ProcurementOfficer), order.id, ApprovalAction::Submit, None)
        .await
        .unwrap();
    assert_eq!(resubmitted.status, OrderStatus::Pending);
}

#[tokio::test]
async fn skipping_review_states_is_rejected_with_current_status() {
    let app = TestApp::new().await;
    let order = app
        .draft_order(None, vec![item("Cement", 10, dec!(250), None)])
        .await;

    let err = app
        .procurement()
        .transition(ctx(Role::FinanceDirector), order.id, ApprovalAction::Approve, None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InvalidStatus(msg) if msg == "Invalid status transition from Draft to Approved"
    );
}

#[tokio::test]
async fn forbidden_roles_get_forbidden_before_state_checks() {
    let app = TestApp::new().await;
    let order = app
        .draft_order(None, vec![item("Cement", 10, dec!(250), None)])
        .await;

    // A Warehouseman may never approve, whatever the status.
    let err = app
        .procurement()
        .transition(ctx(Role::Warehouseman), order.id, ApprovalAction::Approve, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn delivery_moves_mirror_order_status() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Scaffolding frame", 20, dec!(1800), None)])
        .await;
    let svc = app.procurement();

    let scheduled = svc
        .schedule_delivery(ScheduleDeliveryCommand {
            ctx: ctx(Role::ProcurementOfficer),
            order_id: order.id,
            delivery_method: Some(DeliveryMethod::DirectDelivery),
            delivery_location: Some("Tower A laydown area".into()),
            scheduled_delivery_date: Some(Utc::now().date_naive() + Duration::days(3)),
            tracking_number: None,
            delivery_notes: None,
        })
        .await
        .unwrap();
    assert_eq!(scheduled.status, OrderStatus::ScheduledForDelivery);
    assert_eq!(scheduled.delivery_status, DeliveryStatus::Scheduled);

    let delayed = svc
        .update_delivery_status(UpdateDeliveryStatusCommand {
            ctx: ctx(Role::ProcurementOfficer),
            order_id: order.id,
            delivery_status: DeliveryStatus::Delayed,
            actual_delivery_date: None,
            tracking_number: None,
            notes: Some("Truck broke down".into()),
        })
        .await
        .unwrap();
    assert_eq!(delayed.delivery_status, DeliveryStatus::Delayed);
    assert_eq!(delayed.status, OrderStatus::ScheduledForDelivery);

    let in_transit = svc
        .update_delivery_status(UpdateDeliveryStatusCommand {
            ctx: ctx(Role::ProcurementOfficer),
            order_id: order.id,
            delivery_status: DeliveryStatus::InTransit,
            actual_delivery_date: None,
            tracking_number: Some("TRK-1182".into()),
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(in_transit.status, OrderStatus::InTransit);

    let missing_date = svc
        .update_delivery_status(UpdateDeliveryStatusCommand {
            ctx: ctx(Role::ProcurementOfficer),
            order_id: order.id,
            delivery_status: DeliveryStatus::Delivered,
            actual_delivery_date: None,
            tracking_number: None,
            notes: None,
        })
        .await
        .unwrap_err();
    assert_matches!(missing_date, ServiceError::ValidationErrors(_));
}

#[tokio::test]
async fn scheduling_announces_the_statuses_it_replaced() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Scaffolding frame", 20, dec!(1800), None)])
        .await;

    let (tx, mut rx) = mpsc::channel(8);
    let scheduled = ScheduleDeliveryCommand {
        ctx: ctx(Role::ProcurementOfficer),
        order_id: order.id,
        delivery_method: Some(DeliveryMethod::DirectDelivery),
        delivery_location: Some("Tower A laydown area".into()),
        scheduled_delivery_date: Some(Utc::now().date_naive() + Duration::days(2)),
        tracking_number: None,
        delivery_notes: None,
    }
    .execute(app.state.db.clone(), Arc::new(EventSender::new(tx)))
    .await
    .unwrap();

    assert_eq!(
        rx.recv().await,
        Some(Event::DeliveryStatusChanged {
            order_id: order.id,
            old_status: order.delivery_status.to_string(),
            new_status: scheduled.delivery_status.to_string(),
        })
    );
    assert_eq!(
        rx.recv().await,
        Some(Event::ProcurementOrderStatusChanged {
            order_id: order.id,
            old_status: order.status.to_string(),
            new_status: OrderStatus::ScheduledForDelivery.to_string(),
        })
    );
}

#[tokio::test]
async fn scheduling_physical_goods_needs_complete_details() {
    let app = TestApp::new().await;
    let order = app
        .approved_order(None, vec![item("Scaffolding frame", 20, dec!(1800), None)])
        .await;

    let err = app
        .procurement()
        .schedule_delivery(ScheduleDeliveryCommand {
            ctx: ctx(Role::ProcurementOfficer),
            order_id: order.id,
            delivery_method: Some(DeliveryMethod::Email),
            delivery_location: None,
            scheduled_delivery_date: Some(Utc::now().date_naive() - Duration::days(1)),
            tracking_number: None,
            delivery_notes: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationErrors(errors) if errors.len() == 3);
}

#[tokio::test]
async fn cancellation_only_before_approval() {
    let app = TestApp::new().await;
    let draft = app
        .draft_order(None, vec![item("Cement", 10, dec!(250), None)])
        .await;
    let canceled = app
        .procurement()
        .cancel(CancelProcurementOrderCommand {
            ctx: ctx(Role::ProcurementOfficer),
            order_id: draft.id,
            reason: CancellationReason::Other,
            custom_reason: Some("Supplier closed".into()),
            notes: Some("Re-quote next month".into()),
        })
        .await
        .unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert_eq!(
        canceled.cancellation_reason.as_deref(),
        Some("Reason: Supplier closed - Notes: Re-quote next month")
    );

    let approved = app
        .approved_order(None, vec![item("Cement", 10, dec!(250), None)])
        .await;
    let err = app
        .procurement()
        .cancel(CancelProcurementOrderCommand {
            ctx: ctx(Role::ProcurementOfficer),
            order_id: approved.id,
            reason: CancellationReason::BudgetConstraints,
            custom_reason: None,
            notes: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn project_scoped_roles_only_list_their_projects() {
    let app = TestApp::new().await;
    let pm = ctx(Role::ProjectManager);
    let mine = app.seed_project(Some(pm.user_id)).await;
    let other = app.seed_project(None).await;
    app.draft_order(Some(mine), vec![item("Cement", 10, dec!(250), None)])
        .await;
    app.draft_order(Some(other), vec![item("Sand", 4, dec!(900), None)])
        .await;

    let pm = pm.with_projects([mine]);
    let listed = app
        .procurement()
        .list_orders(&pm, OrderListQuery::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.orders[0].project_id, Some(mine));

    let named_manager = ctx(Role::ProjectManager);
    let managed = app.seed_project(Some(named_manager.user_id)).await;
    app.draft_order(Some(managed), vec![item("Gravel", 6, dec!(1200), None)])
        .await;
    let by_name = app
        .procurement()
        .list_orders(&named_manager, OrderListQuery::default())
        .await
        .unwrap();
    assert_eq!(by_name.total, 1);
    assert_eq!(by_name.orders[0].project_id, Some(managed));

    let unassigned = app
        .procurement()
        .list_orders(&ctx(Role::SiteInventoryClerk), OrderListQuery::default())
        .await
        .unwrap();
    assert_eq!(unassigned.total, 0);

    let everyone = app
        .procurement()
        .list_orders(&ctx(Role::FinanceDirector), OrderListQuery::default())
        .await
        .unwrap();
    assert_eq!(everyone.total, 3);
}

#[tokio::test]
async fn allowed_actions_follow_role_and_state() {
    let app = TestApp::new().await;
    let order = app
        .draft_order(None, vec![item("Cement", 10, dec!(250), None)])
        .await;

    let maker = app
        .procurement()
        .allowed_actions(&ctx(Role::ProcurementOfficer), order.id)
        .await
        .unwrap();
    assert!(maker.contains(&ProcurementAction::Submit));
    assert!(maker.contains(&ProcurementAction::Cancel));
    assert!(!maker.contains(&ProcurementAction::Approve));

    let finance = app
        .procurement()
        .allowed_actions(&ctx(Role::FinanceDirector), order.id)
        .await
        .unwrap();
    assert!(!finance.contains(&ProcurementAction::Submit));
    assert!(!finance.contains(&ProcurementAction::Approve));
}
