//! Order money fields.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub ewt_amount: Decimal,
    pub discount: Decimal,
    pub net_total: Decimal,
}

fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range(field: &str) -> ServiceError {
    ServiceError::ValidationErrors(vec![format!("{}: Amount is too large", field)])
}

/// Line subtotal, rounded to centavos.
pub fn line_subtotal(quantity: i32, unit_price: Decimal) -> Result<Decimal, ServiceError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(money)
        .ok_or_else(|| out_of_range("items.unit_price"))
}

impl OrderTotals {
    /// VAT is added on the subtotal and expanded withholding tax is deducted
    /// from it, then the discount comes off the result.
    pub fn compute(
        line_subtotals: impl IntoIterator<Item = Decimal>,
        discount: Decimal,
        vat_rate: Decimal,
        ewt_rate: Decimal,
    ) -> Result<Self, ServiceError> {
        let subtotal = line_subtotals
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line))
            .ok_or_else(|| out_of_range("subtotal"))?;
        let vat_amount = subtotal
            .checked_mul(vat_rate)
            .map(money)
            .ok_or_else(|| out_of_range("vat_amount"))?;
        let ewt_amount = subtotal
            .checked_mul(ewt_rate)
            .map(money)
            .ok_or_else(|| out_of_range("ewt_amount"))?;
        let discount = money(discount);
        let net_total = subtotal
            .checked_add(vat_amount)
            .and_then(|v| v.checked_sub(ewt_amount))
            .and_then(|v| v.checked_sub(discount))
            .ok_or_else(|| out_of_range("net_total"))?;
        Ok(Self {
            subtotal,
            vat_amount,
            ewt_amount,
            discount,
            net_total,
        })
    }
}
