//! Order pricing: flat shipping below a threshold, flat sales tax.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::money::Cents;

/// Subtotals strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Cents = Cents::new(5000);
pub const FLAT_SHIPPING: Cents = Cents::new(999);
/// 8%
pub const TAX_RATE_BASIS_POINTS: i64 = 800;
/// Precision of transferred asset amounts (wei for ETH)
pub const ASSET_DECIMALS: u32 = 18;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: Cents,
    pub shipping: Cents,
    pub tax: Cents,
    pub total: Cents,
}

pub fn quote(subtotal: Cents) -> PriceBreakdown {
    let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
        Cents::ZERO
    } else {
        FLAT_SHIPPING
    };
    let tax = subtotal.apply_basis_points(TAX_RATE_BASIS_POINTS);

    PriceBreakdown {
        subtotal,
        shipping,
        tax,
        total: subtotal + shipping + tax,
    }
}

/// Convert a USD total into units of the payment asset, rounding up so the
/// merchant is never short.
pub fn to_asset_amount(total: Cents, usd_per_unit: Decimal) -> MarketResult<Decimal> {
    if usd_per_unit <= Decimal::ZERO {
        return Err(MarketError::Internal(format!(
            "invalid conversion rate {}",
            usd_per_unit
        )));
    }
    total
        .to_decimal()
        .checked_div(usd_per_unit)
        .map(|amount| {
            amount
                .round_dp_with_strategy(ASSET_DECIMALS, RoundingStrategy::AwayFromZero)
                .normalize()
        })
        .ok_or_else(|| MarketError::Internal("asset amount overflow".to_string()))
}
