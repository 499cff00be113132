#![allow(dead_code)]

use std::sync::Arc;

use assetflow_api::{
    auth::{RequestContext, Role},
    commands::procurement::NewProcurementItem,
    config::AppConfig,
    db,
    entities::{category, procurement_order, project, project_assignment},
    events::{self, EventSender},
    services::{
        assets::AssetService,
        procurement::{NewOrder, ProcurementService},
        state_machine::ApprovalAction,
    },
    AppState,
};
use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Application state over a throwaway SQLite file with the full schema.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir");
        let db_path = db_dir.path().join("assetflow_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "test".to_string(),
        );
        // Every query inside a transaction has to reuse the transaction's connection.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (tx, rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(rx));

        let state = AppState::new(
            Arc::new(pool),
            Arc::new(cfg),
            Arc::new(EventSender::new(tx)),
        );
        let router = assetflow_api::build_router(state.clone());

        Self {
            router,
            state,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    pub fn procurement(&self) -> &ProcurementService {
        &self.state.services.procurement
    }

    pub fn assets(&self) -> &AssetService {
        &self.state.services.assets
    }

    pub fn db(&self) -> &db::DbPool {
        self.state.db.as_ref()
    }

    pub async fn seed_project(&self, project_manager_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        project::ActiveModel {
            id: Set(id),
            name: Set("Tower A Structural Works".to_string()),
            code: Set(format!("PRJ-{}", &id.simple().to_string()[..6])),
            project_manager_id: Set(project_manager_id),
        }
        .insert(self.db())
        .await
        .expect("seed project");
        id
    }

    pub async fn assign(&self, user_id: Uuid, project_id: Uuid, role: Role) {
        project_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            project_id: Set(project_id),
            role: Set(role.to_string()),
        }
        .insert(self.db())
        .await
        .expect("seed assignment");
    }

    pub async fn seed_category(&self, name: &str, is_consumable: bool, generates_assets: bool) -> Uuid {
        let id = Uuid::new_v4();
        category::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            is_consumable: Set(is_consumable),
            generates_assets: Set(generates_assets),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed category");
        id
    }

    pub fn token(&self, user_id: Uuid, role: Role) -> String {
        self.state
            .auth
            .issue_token(user_id, Some("Test User".into()), role, Duration::minutes(30))
            .expect("token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Draft order raised by a Procurement Officer.
    pub async fn draft_order(
        &self,
        project_id: Option<Uuid>,
        items: Vec<NewProcurementItem>,
    ) -> procurement_order::Model {
        self.procurement()
            .create_order(
                ctx(Role::ProcurementOfficer),
                NewOrder {
                    project_id,
                    ..new_order(items)
                },
            )
            .await
            .expect("create order")
    }

    /// Order taken through submit, review and approve.
    pub async fn approved_order(
        &self,
        project_id: Option<Uuid>,
        items: Vec<NewProcurementItem>,
    ) -> procurement_order::Model {
        let order = self.draft_order(project_id, items).await;
        let svc = self.procurement();
        svc.transition(ctx(Role::ProcurementOfficer), order.id, ApprovalAction::Submit, None)
            .await
            .expect("submit");
        svc.transition(ctx(Role::AssetDirector), order.id, ApprovalAction::Review, None)
            .await
            .expect("review");
        svc.transition(ctx(Role::FinanceDirector), order.id, ApprovalAction::Approve, None)
            .await
            .expect("approve")
    }
}

pub fn ctx(role: Role) -> RequestContext {
    RequestContext::new(Uuid::new_v4(), role)
}

/// Unattached, non-retroactive order with the given lines.
pub fn new_order(items: Vec<NewProcurementItem>) -> NewOrder {
    NewOrder {
        title: "Materials for Level 3 slab".to_string(),
        vendor_id: None,
        project_id: None,
        discount: Decimal::ZERO,
        is_retroactive: false,
        retroactive_reason: None,
        quote_file: None,
        notes: None,
        items,
    }
}

pub fn item(name: &str, quantity: i32, unit_price: Decimal, category_id: Option<Uuid>) -> NewProcurementItem {
    NewProcurementItem {
        item_name: name.to_string(),
        description: None,
        specifications: None,
        unit: Some("pc".to_string()),
        quantity,
        unit_price,
        category_id,
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
