//! Reconciles reported receipt quantities against what was ordered.

use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::entities::{DiscrepancyType, OrderStatus};
use crate::errors::ServiceError;

/// Current ledger state of one order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLedger {
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    pub quantity_received: i32,
    pub excess_quantity: i32,
}

/// What the receiver reported for one line in this receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptLine {
    pub quantity_received: i32,
    pub delivery_complete: bool,
    pub quality_notes: Option<String>,
}

/// Order-level discrepancy report attached to a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscrepancyReport {
    pub has_discrepancy: bool,
    pub discrepancy_type: Option<DiscrepancyType>,
    pub discrepancy_details: Option<String>,
}

impl DiscrepancyReport {
    fn validate(&self) -> Vec<String> {
        if !self.has_discrepancy {
            return Vec::new();
        }
        let mut errors = Vec::new();
        if self.discrepancy_type.is_none() {
            errors.push(
                "discrepancy_type: Discrepancy type is required when reporting a discrepancy"
                    .to_string(),
            );
        }
        if self
            .discrepancy_details
            .as_deref()
            .map(|d| d.trim().is_empty())
            .unwrap_or(true)
        {
            errors.push(
                "discrepancy_details: Discrepancy details are required when reporting a discrepancy"
                    .to_string(),
            );
        }
        errors
    }
}

/// New ledger values for one line after the receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledItem {
    pub item_id: Uuid,
    pub quantity_received: i32,
    pub excess_quantity: i32,
    pub delivery_complete: bool,
    pub quality_notes: Option<String>,
    pub opens_discrepancy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptOutcome {
    pub items: Vec<ReconciledItem>,
    pub fully_received: bool,
    pub new_status: OrderStatus,
}

/// Applies `lines` to the ledger.
///
/// Totals are cumulative. A total above the ordered quantity is refused
/// unless a discrepancy is reported, in which case the line is capped and the
/// surplus is kept in `excess_quantity`.
pub fn reconcile(
    ledger: &[ItemLedger],
    lines: &BTreeMap<Uuid, ReceiptLine>,
    report: &DiscrepancyReport,
) -> Result<ReceiptOutcome, ServiceError> {
    let mut errors = report.validate();

    let known: HashSet<Uuid> = ledger.iter().map(|i| i.item_id).collect();
    for item_id in lines.keys().filter(|id| !known.contains(id)) {
        errors.push(format!(
            "items: Item {} does not belong to this purchase order",
            item_id
        ));
    }

    let mut items = Vec::with_capacity(ledger.len());
    for item in ledger {
        let line = lines.get(&item.item_id).cloned().unwrap_or_default();
        if line.quantity_received < 0 {
            errors.push(format!(
                "{}: Received quantity cannot be negative",
                item.item_name
            ));
            continue;
        }

        let Some(total) = item.quantity_received.checked_add(line.quantity_received) else {
            errors.push(format!(
                "{}: Received quantity is too large",
                item.item_name
            ));
            continue;
        };
        let mut excess = item.excess_quantity;
        let capped = if total > item.quantity {
            if !report.has_discrepancy {
                errors.push(format!(
                    "{}: Received quantity ({}) exceeds ordered quantity ({}). Report a discrepancy to record the excess",
                    item.item_name, total, item.quantity
                ));
                continue;
            }
            match excess.checked_add(total - item.quantity) {
                Some(e) => excess = e,
                None => {
                    errors.push(format!(
                        "{}: Excess quantity is too large",
                        item.item_name
                    ));
                    continue;
                }
            }
            item.quantity
        } else {
            total
        };

        let complete = line.delivery_complete || capped >= item.quantity;
        let opens_discrepancy =
            report.has_discrepancy && (excess > item.excess_quantity || capped < item.quantity);

        items.push(ReconciledItem {
            item_id: item.item_id,
            quantity_received: capped,
            excess_quantity: excess,
            delivery_complete: complete,
            quality_notes: line.quality_notes.filter(|n| !n.trim().is_empty()),
            opens_discrepancy,
        });
    }

    if !errors.is_empty() {
        return Err(ServiceError::ValidationErrors(errors));
    }

    let fully_received = items.iter().all(|i| i.delivery_complete);
    let new_status = if fully_received || report.has_discrepancy {
        OrderStatus::Received
    } else {
        OrderStatus::Delivered
    };

    Ok(ReceiptOutcome {
        items,
        fully_received,
        new_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ledger_item(quantity: i32, received: i32) -> ItemLedger {
        ItemLedger {
            item_id: Uuid::new_v4(),
            item_name: "Rebar 12mm".into(),
            quantity,
            quantity_received: received,
            excess_quantity: 0,
        }
    }

    fn line(quantity: i32) -> ReceiptLine {
        ReceiptLine {
            quantity_received: quantity,
            ..Default::default()
        }
    }

    #[test]
    fn full_receipt_marks_order_received() {
        let item = ledger_item(10, 0);
        let lines = BTreeMap::from([(item.item_id, line(10))]);
        let outcome = reconcile(&[item], &lines, &DiscrepancyReport::default()).unwrap();
        assert!(outcome.fully_received);
        assert_eq!(outcome.new_status, OrderStatus::Received);
        assert_eq!(outcome.items[0].quantity_received, 10);
    }

    #[test]
    fn partial_receipt_leaves_order_delivered() {
        let a = ledger_item(10, 0);
        let b = ledger_item(4, 0);
        let lines = BTreeMap::from([(a.item_id, line(10)), (b.item_id, line(1))]);
        let outcome = reconcile(&[a, b], &lines, &DiscrepancyReport::default()).unwrap();
        assert!(!outcome.fully_received);
        assert_eq!(outcome.new_status, OrderStatus::Delivered);
    }

    #[test]
    fn totals_accumulate_across_receipts() {
        let item = ledger_item(10, 6);
        let lines = BTreeMap::from([(item.item_id, line(4))]);
        let outcome = reconcile(&[item], &lines, &DiscrepancyReport::default()).unwrap();
        assert_eq!(outcome.items[0].quantity_received, 10);
        assert!(outcome.fully_received);
    }

    #[test]
    fn excess_without_report_is_refused() {
        let item = ledger_item(10, 8);
        let lines = BTreeMap::from([(item.item_id, line(5))]);
        assert_matches!(
            reconcile(&[item], &lines, &DiscrepancyReport::default()),
            Err(ServiceError::ValidationErrors(errors)) if errors[0].contains("exceeds ordered quantity (10)")
        );
    }

    #[test]
    fn excess_with_report_is_capped_and_recorded() {
        let item = ledger_item(10, 8);
        let lines = BTreeMap::from([(item.item_id, line(5))]);
        let report = DiscrepancyReport {
            has_discrepancy: true,
            discrepancy_type: Some(DiscrepancyType::OverDelivery),
            discrepancy_details: Some("3 extra bundles".into()),
        };
        let outcome = reconcile(&[item], &lines, &report).unwrap();
        let reconciled = &outcome.items[0];
        assert_eq!(reconciled.quantity_received, 10);
        assert_eq!(reconciled.excess_quantity, 3);
        assert!(reconciled.opens_discrepancy);
        assert_eq!(outcome.new_status, OrderStatus::Received);
    }

    #[test]
    fn shortage_report_closes_receipt_and_opens_item() {
        let item = ledger_item(10, 0);
        let lines = BTreeMap::from([(item.item_id, line(7))]);
        let report = DiscrepancyReport {
            has_discrepancy: true,
            discrepancy_type: Some(DiscrepancyType::QuantityShortage),
            discrepancy_details: Some("vendor short-shipped".into()),
        };
        let outcome = reconcile(&[item], &lines, &report).unwrap();
        assert!(!outcome.fully_received);
        assert_eq!(outcome.new_status, OrderStatus::Received);
        assert!(outcome.items[0].opens_discrepancy);
    }

    #[test]
    fn discrepancy_needs_type_and_details() {
        let item = ledger_item(1, 0);
        let lines = BTreeMap::from([(item.item_id, line(1))]);
        let report = DiscrepancyReport {
            has_discrepancy: true,
            ..Default::default()
        };
        assert_matches!(
            reconcile(&[item], &lines, &report),
            Err(ServiceError::ValidationErrors(errors)) if errors.len() == 2
        );
    }

    #[test]
    fn lines_for_foreign_items_are_refused() {
        let item = ledger_item(1, 0);
        let lines = BTreeMap::from([(Uuid::new_v4(), line(1))]);
        assert!(reconcile(&[item], &lines, &DiscrepancyReport::default()).is_err());
    }

    #[test]
    fn negative_quantities_are_refused() {
        let item = ledger_item(5, 2);
        let lines = BTreeMap::from([(item.item_id, line(-1))]);
        assert!(reconcile(&[item], &lines, &DiscrepancyReport::default()).is_err());
    }

    #[test]
    fn oversized_totals_are_refused() {
        let item = ledger_item(10, 5);
        let lines = BTreeMap::from([(item.item_id, line(i32::MAX))]);
        let report = DiscrepancyReport {
            has_discrepancy: true,
            discrepancy_type: Some(DiscrepancyType::OverDelivery),
            discrepancy_details: Some("Supplier over-delivered".into()),
        };
        assert_matches!(
            reconcile(&[item], &lines, &report),
            Err(ServiceError::ValidationErrors(errors)) if errors[0].contains("too large")
        );
    }
}
