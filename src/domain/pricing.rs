//! Order arithmetic. Pure and deterministic: every amount is an integer in
//! the smallest currency unit and tax is truncated toward zero.

use super::catalog::CatalogItem;
use super::errors::DomainError;
use super::order::ItemSnapshot;

/// Tax rate of 10%, expressed as a percentage so the arithmetic stays
/// integral.
pub const TAX_RATE_PERCENT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub snapshot: ItemSnapshot,
    pub quantity: i32,
    pub subtotal: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub total_amount: i64,
}

/// `floor(subtotal * 0.10)` for a non-negative subtotal, or `None` when the
/// intermediate product does not fit in an `i64`.
pub fn tax_for(subtotal: i64) -> Option<i64> {
    subtotal
        .checked_mul(TAX_RATE_PERCENT)
        .map(|scaled| scaled / 100)
}

fn too_large() -> DomainError {
    DomainError::validation("order total is too large")
}

/// Price each `(item, quantity)` pair in the order given and snapshot the
/// item as it is right now.
pub fn price_order<'a, I>(lines: I) -> Result<PricedOrder, DomainError>
where
    I: IntoIterator<Item = (&'a CatalogItem, i32)>,
{
    let mut priced = Vec::new();
    let mut subtotal: i64 = 0;

    for (item, quantity) in lines {
        let line_subtotal = i64::from(item.price) * i64::from(quantity);
        subtotal = subtotal
            .checked_add(line_subtotal)
            .ok_or_else(too_large)?;
        priced.push(PricedLine {
            snapshot: item.snapshot(),
            quantity,
            subtotal: line_subtotal,
        });
    }

    let tax_amount = tax_for(subtotal).ok_or_else(too_large)?;
    let total_amount = subtotal.checked_add(tax_amount).ok_or_else(too_large)?;

    Ok(PricedOrder {
        lines: priced,
        subtotal,
        tax_amount,
        total_amount,
    })
}
