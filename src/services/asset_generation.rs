//! Planning for turning received procurement items into asset rows.
//!
//! The functions here decide how many units of an item may become assets and
//! what shape the rows take. Loading, locking and inserting is done by
//! [`crate::commands::assets::GenerateAssetsCommand`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Category traits that drive generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTraits {
    pub id: Uuid,
    pub name: String,
    pub is_consumable: bool,
    pub generates_assets: bool,
}

/// One item considered for generation, with its ledger totals.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationCandidate {
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity_received: i32,
    pub already_generated: i32,
    pub unit_price: Decimal,
}

/// Units of an item that can still be converted.
pub fn available_for_generation(quantity_received: i32, already_generated: i32) -> i32 {
    quantity_received.saturating_sub(already_generated).max(0)
}

/// Resolved plan for a single item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPlan {
    pub item_id: Uuid,
    pub quantity: i32,
    pub rows: Vec<AssetRow>,
}

/// Quantity and cost of one asset row to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRow {
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub acquisition_cost: Decimal,
}

/// Splits `quantity` units into rows: one aggregated row for consumables,
/// one row per unit otherwise.
pub fn asset_rows(quantity: i32, is_consumable: bool, unit_price: Decimal) -> Option<Vec<AssetRow>> {
    if quantity <= 0 {
        return Some(Vec::new());
    }
    if is_consumable {
        let acquisition_cost = unit_price.checked_mul(Decimal::from(quantity))?;
        Some(vec![AssetRow {
            quantity,
            unit_cost: unit_price,
            acquisition_cost,
        }])
    } else {
        Some(
            (0..quantity)
                .map(|_| AssetRow {
                    quantity: 1,
                    unit_cost: unit_price,
                    acquisition_cost: unit_price,
                })
                .collect(),
        )
    }
}

/// Plans generation for one item.
///
/// `requested` of `None` takes everything available; a larger request is
/// clamped. Ineligible items come back as `Err` with a message for the
/// caller's error list.
pub fn plan_item(
    candidate: &GenerationCandidate,
    category: &CategoryTraits,
    requested: Option<i32>,
) -> Result<ItemPlan, String> {
    if !category.generates_assets {
        return Err(format!(
            "{}: category '{}' does not generate assets",
            candidate.item_name, category.name
        ));
    }

    let available =
        available_for_generation(candidate.quantity_received, candidate.already_generated);
    if available == 0 {
        return Err(format!(
            "{}: no received quantity left to generate assets from",
            candidate.item_name
        ));
    }

    let quantity = match requested {
        Some(q) if q <= 0 => {
            return Err(format!(
                "{}: requested quantity must be greater than zero",
                candidate.item_name
            ))
        }
        Some(q) => q.min(available),
        None => available,
    };

    let rows = asset_rows(quantity, category.is_consumable, candidate.unit_price)
        .ok_or_else(|| format!("{}: acquisition cost is out of range", candidate.item_name))?;

    Ok(ItemPlan {
        item_id: candidate.item_id,
        quantity,
        rows,
    })
}

/// Human-readable asset reference, e.g. `AST-20240510-3F2A9C1B`.
pub fn asset_reference(date: NaiveDate, id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("AST-{}-{}", date.format("%Y%m%d"), &simple[..8])
}

/// Per-item availability shown before generating.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationPreviewItem {
    pub item_id: Uuid,
    pub item_name: String,
    pub category_name: Option<String>,
    pub is_consumable: bool,
    pub generates_assets: bool,
    pub quantity_received: i32,
    pub already_generated: i32,
    pub available_for_generation: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationPreview {
    pub procurement_order_id: Uuid,
    pub can_generate: bool,
    pub items: Vec<GenerationPreviewItem>,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct GenerationResult {
    pub generated_count: usize,
    pub asset_ids: Vec<Uuid>,
    pub errors: Vec<String>,
}
