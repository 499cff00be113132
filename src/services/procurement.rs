use crate::{
    auth::{
        gate::{self, ProcurementAction},
        RequestContext,
    },
    commands::{
        assets::{generated_by_item, GenerateAssetsCommand},
        procurement::{
            find_items, order_scope, CancelProcurementOrderCommand, ConfirmReceiptCommand,
            CreateProcurementOrderCommand, ItemDiscrepancyResolved, NewProcurementItem,
            ReceiptConfirmation, ResolveDiscrepancyCommand, ResolveItemDiscrepancyCommand,
            ScheduleDeliveryCommand, TransitionProcurementOrderCommand,
            UpdateDeliveryStatusCommand,
        },
        Command,
    },
    config::AppConfig,
    db::DbPool,
    entities::{
        category, procurement_activity_log, procurement_item, procurement_order, project,
        OrderStatus,
    },
    errors::ServiceError,
    events::EventSender,
    services::{
        asset_generation::{
            available_for_generation, GenerationPreview, GenerationPreviewItem, GenerationResult,
        },
        state_machine::{self, ApprovalAction},
    },
};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Order header plus its lines and what the caller may do next.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: procurement_order::Model,
    pub items: Vec<procurement_item::Model>,
    pub allowed_actions: Vec<ProcurementAction>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub project_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderList {
    pub orders: Vec<procurement_order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Fields supplied by the caller when raising an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub title: String,
    pub vendor_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub discount: Decimal,
    pub is_retroactive: bool,
    pub retroactive_reason: Option<String>,
    pub quote_file: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<NewProcurementItem>,
}

const MAX_PER_PAGE: u64 = 100;

/// Entry point for the procurement lifecycle.
#[derive(Clone)]
pub struct ProcurementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl ProcurementService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            config,
        }
    }

    async fn run<C: Command>(&self, command: C) -> Result<C::Result, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Raises a Draft order, pricing it with the configured VAT and EWT rates.
    #[instrument(skip(self, ctx, order), fields(user_id = %ctx.user_id))]
    pub async fn create_order(
        &self,
        ctx: RequestContext,
        order: NewOrder,
    ) -> Result<procurement_order::Model, ServiceError> {
        self.run(CreateProcurementOrderCommand {
            ctx,
            title: order.title,
            vendor_id: order.vendor_id,
            project_id: order.project_id,
            discount: order.discount,
            is_retroactive: order.is_retroactive,
            retroactive_reason: order.retroactive_reason,
            quote_file: order.quote_file,
            notes: order.notes,
            items: order.items,
            vat_rate: self.config.vat_rate(),
            ewt_rate: self.config.ewt_rate(),
        })
        .await
    }

    /// Submit, review, approve, reject or return for revision.
    #[instrument(skip(self, ctx, notes), fields(user_id = %ctx.user_id))]
    pub async fn transition(
        &self,
        ctx: RequestContext,
        order_id: Uuid,
        action: ApprovalAction,
        notes: Option<String>,
    ) -> Result<procurement_order::Model, ServiceError> {
        self.run(TransitionProcurementOrderCommand {
            ctx,
            order_id,
            action,
            notes,
        })
        .await
    }

    #[instrument(skip(self, command), fields(order_id = %command.order_id))]
    pub async fn schedule_delivery(
        &self,
        command: ScheduleDeliveryCommand,
    ) -> Result<procurement_order::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), fields(order_id = %command.order_id))]
    pub async fn update_delivery_status(
        &self,
        command: UpdateDeliveryStatusCommand,
    ) -> Result<procurement_order::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), fields(order_id = %command.order_id))]
    pub async fn cancel(
        &self,
        command: CancelProcurementOrderCommand,
    ) -> Result<procurement_order::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), fields(order_id = %command.order_id))]
    pub async fn confirm_receipt(
        &self,
        command: ConfirmReceiptCommand,
    ) -> Result<ReceiptConfirmation, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), fields(order_id = %command.order_id))]
    pub async fn resolve_discrepancy(
        &self,
        command: ResolveDiscrepancyCommand,
    ) -> Result<procurement_order::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), fields(order_id = %command.order_id, item_id = %command.item_id))]
    pub async fn resolve_item_discrepancy(
        &self,
        command: ResolveItemDiscrepancyCommand,
    ) -> Result<ItemDiscrepancyResolved, ServiceError> {
        self.run(command).await
    }

    /// Converts received quantities into assets. Empty `selections` means
    /// everything still available.
    #[instrument(skip(self, ctx, selections), fields(user_id = %ctx.user_id))]
    pub async fn generate_assets(
        &self,
        ctx: RequestContext,
        order_id: Uuid,
        selections: BTreeMap<Uuid, i32>,
    ) -> Result<GenerationResult, ServiceError> {
        self.run(GenerateAssetsCommand {
            ctx,
            order_id,
            selections,
            default_category_name: self.config.default_category_name.clone(),
        })
        .await
    }

    /// Loads an order the caller may view.
    async fn visible_order<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<(procurement_order::Model, gate::OrderScope), ServiceError> {
        let order = procurement_order::Entity::find_by_id(order_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;
        let scope = order_scope(conn, &order).await?;
        gate::can_perform(ProcurementAction::View, &scope, ctx).into_result("view")?;
        Ok((order, scope))
    }

    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn get_order(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<OrderDetail, ServiceError> {
        let db = self.db_pool.as_ref();
        let (order, scope) = Self::visible_order(db, ctx, order_id).await?;
        let items = find_items(db, order.id).await?;
        Ok(OrderDetail {
            allowed_actions: gate::allowed_actions(&scope, ctx),
            order,
            items,
        })
    }

    /// Lists orders newest first. Project-scoped roles only see orders of
    /// their projects.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn list_orders(
        &self,
        ctx: &RequestContext,
        query: OrderListQuery,
    ) -> Result<OrderList, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, MAX_PER_PAGE);

        let mut select = procurement_order::Entity::find();
        if ctx.role.is_project_scoped() {
            let managed: Vec<Uuid> = project::Entity::find()
                .select_only()
                .column(project::Column::Id)
                .filter(project::Column::ProjectManagerId.eq(ctx.user_id))
                .into_tuple()
                .all(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
            let visible: BTreeSet<Uuid> = ctx
                .assigned_project_ids
                .iter()
                .copied()
                .chain(managed)
                .collect();
            if visible.is_empty() {
                return Ok(OrderList {
                    orders: Vec::new(),
                    total: 0,
                    page,
                    per_page,
                });
            }
            select = select.filter(procurement_order::Column::ProjectId.is_in(visible));
        }
        if let Some(status) = query.status {
            select = select.filter(procurement_order::Column::Status.eq(status));
        }
        if let Some(project_id) = query.project_id {
            select = select.filter(procurement_order::Column::ProjectId.eq(project_id));
        }

        let paginator = select
            .order_by_desc(procurement_order::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let orders = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        info!(total, page, "listed procurement orders");
        Ok(OrderList {
            orders,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn allowed_actions(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<Vec<ProcurementAction>, ServiceError> {
        let (_, scope) = Self::visible_order(self.db_pool.as_ref(), ctx, order_id).await?;
        Ok(gate::allowed_actions(&scope, ctx))
    }

    /// Per-item quantities that a generation run would convert right now.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn generation_preview(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<GenerationPreview, ServiceError> {
        let db = self.db_pool.as_ref();
        let (order, _) = Self::visible_order(db, ctx, order_id).await?;
        let items = find_items(db, order.id).await?;
        let generated = generated_by_item(db, order.id).await?;

        let category_ids: Vec<Uuid> = items.iter().filter_map(|i| i.category_id).collect();
        let categories: HashMap<Uuid, category::Model> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            category::Entity::find()
                .filter(category::Column::Id.is_in(category_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        let items = items
            .into_iter()
            .map(|item| {
                let category = item.category_id.and_then(|id| categories.get(&id));
                if item.category_id.is_some() && category.is_none() {
                    warn!(item_id = %item.id, "item references a missing category");
                }
                let already_generated = generated.get(&item.id).copied().unwrap_or_default();
                // Uncategorized items fall back to a non-consumable category that generates assets.
                let generates_assets = category.map(|c| c.generates_assets).unwrap_or(true);
                GenerationPreviewItem {
                    item_id: item.id,
                    item_name: item.item_name,
                    category_name: category.map(|c| c.name.clone()),
                    is_consumable: category.map(|c| c.is_consumable).unwrap_or(false),
                    generates_assets,
                    quantity_received: item.quantity_received,
                    already_generated,
                    available_for_generation: if generates_assets {
                        available_for_generation(item.quantity_received, already_generated)
                    } else {
                        0
                    },
                }
            })
            .collect();

        Ok(GenerationPreview {
            procurement_order_id: order.id,
            can_generate: state_machine::can_generate_assets(order.status, order.delivery_status),
            items,
        })
    }

    /// Transition history of an order, oldest first.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn activity(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<Vec<procurement_activity_log::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        let (order, _) = Self::visible_order(db, ctx, order_id).await?;
        procurement_activity_log::Entity::find()
            .filter(procurement_activity_log::Column::ProcurementOrderId.eq(order.id))
            .order_by_asc(procurement_activity_log::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
