use crate::{
    auth::{gate::ProcurementAction, RequestContext},
    commands::{
        procurement::{authorize, find_items, find_order_for_update, record_failure},
        Command,
    },
    db::DbPool,
    entities::{asset, category, procurement_asset, procurement_item, AssetWorkflowStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ASSETS_GENERATED,
    services::{
        asset_generation::{
            asset_reference, plan_item, CategoryTraits, GenerationCandidate, GenerationResult,
        },
        audit::{log_activity, log_procurement_activity, ProcurementActivity},
        categories::resolve_or_create_default_category,
        state_machine,
    },
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::generated_for_item;

/// Turns received quantities into asset rows.
///
/// `selections` maps item ids to the quantity to convert; an empty map
/// converts everything still available. The whole run is one transaction.
#[derive(Debug, Clone)]
pub struct GenerateAssetsCommand {
    pub ctx: RequestContext,
    pub order_id: Uuid,
    pub selections: BTreeMap<Uuid, i32>,
    /// Name of the category used for items without one.
    pub default_category_name: String,
}

struct Generated {
    result: GenerationResult,
    created_category: Option<category::Model>,
}

#[async_trait::async_trait]
impl Command for GenerateAssetsCommand {
    type Result = GenerationResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, user_id = %self.ctx.user_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let generated = self
            .apply(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(ProcurementAction::GenerateAssets, e))?;
        let result = generated.result;

        info!(
            generated_count = result.generated_count,
            skipped = result.errors.len(),
            "asset generation finished"
        );
        ASSETS_GENERATED.inc_by(result.generated_count as u64);

        if let Some(category) = generated.created_category {
            event_sender
                .send_or_log(Event::DefaultCategoryCreated {
                    category_id: category.id,
                    name: category.name,
                })
                .await;
        }
        if result.generated_count > 0 {
            event_sender
                .send_or_log(Event::AssetsGenerated {
                    order_id: self.order_id,
                    generated_count: result.generated_count,
                })
                .await;
        }

        Ok(result)
    }
}

impl GenerateAssetsCommand {
    async fn apply(&self, db: &DbPool) -> Result<Generated, ServiceError> {
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order_for_update(&txn, self.order_id).await?;
        authorize(&txn, &self.ctx, ProcurementAction::GenerateAssets, &order).await?;
        if !state_machine::can_generate_assets(order.status, order.delivery_status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Assets can only be generated once the purchase order is received or delivered (current status: {})",
                order.status
            )));
        }

        let items = find_items(&txn, order.id).await?;
        let mut result = GenerationResult::default();
        for item_id in self.selections.keys() {
            if !items.iter().any(|i| i.id == *item_id) {
                result.errors.push(format!(
                    "Item {} does not belong to this purchase order",
                    item_id
                ));
            }
        }

        let targets: Vec<&procurement_item::Model> = if self.selections.is_empty() {
            items.iter().collect()
        } else {
            items
                .iter()
                .filter(|i| self.selections.contains_key(&i.id))
                .collect()
        };

        let today = Utc::now().date_naive();
        let mut created_category = None;
        for item in targets {
            // Re-read under lock so concurrent runs see each other's links.
            let item = procurement_item::Entity::find_by_id(item.id)
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item.id)))?;

            let existing_category = match item.category_id {
                Some(id) => category::Entity::find_by_id(id)
                    .one(&txn)
                    .await
                    .map_err(ServiceError::db_error)?,
                None => None,
            };
            let category = match existing_category {
                Some(category) => category,
                None => {
                    let (fallback, created) = resolve_or_create_default_category(
                        &txn,
                        &self.default_category_name,
                        Some(self.ctx.user_id),
                    )
                    .await?;
                    if created {
                        created_category = Some(fallback.clone());
                    }
                    warn!(
                        item_id = %item.id,
                        category = %fallback.name,
                        "item has no category, using fallback"
                    );
                    let mut active: procurement_item::ActiveModel = item.clone().into();
                    active.category_id = Set(Some(fallback.id));
                    active.update(&txn).await.map_err(ServiceError::db_error)?;
                    fallback
                }
            };

            let candidate = GenerationCandidate {
                item_id: item.id,
                item_name: item.item_name.clone(),
                quantity_received: item.quantity_received,
                already_generated: generated_for_item(&txn, item.id).await?,
                unit_price: item.unit_price,
            };
            let traits = CategoryTraits {
                id: category.id,
                name: category.name.clone(),
                is_consumable: category.is_consumable,
                generates_assets: category.generates_assets,
            };
            let plan = match plan_item(&candidate, &traits, self.selections.get(&item.id).copied())
            {
                Ok(plan) => plan,
                Err(message) => {
                    result.errors.push(message);
                    continue;
                }
            };

            let now = Utc::now();
            for row in &plan.rows {
                let asset_id = Uuid::new_v4();
                asset::ActiveModel {
                    id: Set(asset_id),
                    reference: Set(asset_reference(today, asset_id)),
                    name: Set(item.item_name.clone()),
                    description: Set(item.description.clone()),
                    category_id: Set(Some(category.id)),
                    project_id: Set(order.project_id),
                    vendor_id: Set(order.vendor_id),
                    procurement_order_id: Set(Some(order.id)),
                    procurement_item_id: Set(Some(item.id)),
                    quantity: Set(row.quantity),
                    available_quantity: Set(row.quantity),
                    unit: Set(item.unit.clone()),
                    unit_cost: Set(row.unit_cost),
                    acquisition_cost: Set(row.acquisition_cost),
                    workflow_status: Set(AssetWorkflowStatus::Draft),
                    made_by: Set(Some(self.ctx.user_id)),
                    verified_by: Set(None),
                    verified_at: Set(None),
                    authorized_by: Set(None),
                    authorized_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::db_error)?;

                procurement_asset::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    asset_id: Set(asset_id),
                    procurement_order_id: Set(order.id),
                    procurement_item_id: Set(item.id),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::db_error)?;

                result.asset_ids.push(asset_id);
            }
            result.generated_count += plan.rows.len();
        }

        if result.generated_count > 0 {
            let description = format!(
                "Generated {} asset(s) from purchase order {}",
                result.generated_count, order.po_number
            );
            log_activity(
                &txn,
                Some(self.ctx.user_id),
                "assets_generated",
                description.clone(),
                "procurement_orders",
                Some(order.id),
            )
            .await?;
            log_procurement_activity(
                &txn,
                order.id,
                self.ctx.user_id,
                ProcurementActivity::new("generate_assets")
                    .to_value(result.generated_count)
                    .notes(Some(description)),
            )
            .await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(Generated {
            result,
            created_category,
        })
    }
}
