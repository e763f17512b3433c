//! Area-based pricing of glass panes.
//!
//! Prices are never guessed: a pane whose structure is missing or unpriced is
//! reported as `None` so callers can tell "free" from "unknown".

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::catalog::GlassStructureCatalog;
use crate::structure::structure_key;

const MM2_PER_M2: i64 = 1_000_000;

/// Price of a `width × height` mm pane given a price per square metre.
///
/// `None` when the result does not fit in a `Decimal`.
pub fn area_price(price_per_m2: Decimal, width_mm: Decimal, height_mm: Decimal) -> Option<Decimal> {
    let area_m2 = width_mm
        .checked_mul(height_mm)?
        .checked_div(Decimal::from(MM2_PER_M2))?;
    price_per_m2.checked_mul(area_m2)
}

#[derive(Clone)]
pub struct PriceCalculator {
    catalog: Arc<dyn GlassStructureCatalog>,
}

impl PriceCalculator {
    pub fn new(catalog: Arc<dyn GlassStructureCatalog>) -> Self {
        Self { catalog }
    }

    /// Unit price of one pane, or `None` when it cannot be priced.
    #[instrument(skip(self))]
    pub async fn calculate_unit_price(
        &self,
        item_code: &str,
        item_type: &str,
        width_mm: Decimal,
        height_mm: Decimal,
    ) -> Option<Decimal> {
        if width_mm <= Decimal::ZERO || height_mm <= Decimal::ZERO {
            return None;
        }

        let key = structure_key(item_type, item_code);
        let structure = match self.catalog.find_by_code(&key).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!(%key, "no glass structure for key");
                return None;
            }
            Err(e) => {
                warn!(%key, error = %e, "glass catalog lookup failed");
                return None;
            }
        };

        let price = structure.sellable_price()?;
        let unit_price = area_price(price, width_mm, height_mm);
        if unit_price.is_none() {
            warn!(%key, %width_mm, %height_mm, "pane price out of range");
        }
        unit_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glasserp_core::StructureId;
    use rust_decimal_macros::dec;

    use crate::catalog::InMemoryGlassCatalog;
    use crate::structure::GlassStructure;

    fn calculator() -> PriceCalculator {
        let catalog = InMemoryGlassCatalog::with_structures([
            GlassStructure::new(StructureId::new(), "MB-EI90", "Kính chống cháy EI90", Some(dec!(500000))).unwrap(),
            GlassStructure::new(StructureId::new(), "MB-EI60", "Kính chống cháy EI60", Some(Decimal::ZERO)).unwrap(),
            GlassStructure::new(StructureId::new(), "K-CL8", "Kính cường lực 8mm", None).unwrap(),
        ]);
        PriceCalculator::new(Arc::new(catalog))
    }

    #[tokio::test]
    async fn one_by_two_metre_pane_costs_two_square_metres() {
        let price = calculator()
            .calculate_unit_price("EI90", "MB", dec!(1000), dec!(2000))
            .await;
        assert_eq!(price, Some(dec!(1000000)));
    }

    #[tokio::test]
    async fn fractional_areas_are_exact() {
        let price = calculator()
            .calculate_unit_price("EI90", "MB", dec!(333), dec!(777))
            .await
            .unwrap();
        assert_eq!(price, dec!(129370.5));
    }

    #[tokio::test]
    async fn unknown_structure_is_unpriced_not_an_error() {
        let price = calculator()
            .calculate_unit_price("EI120", "MB", dec!(1000), dec!(1000))
            .await;
        assert_eq!(price, None);
    }

    #[tokio::test]
    async fn zero_and_missing_catalog_prices_are_unpriced() {
        let calc = calculator();
        assert_eq!(calc.calculate_unit_price("EI60", "MB", dec!(1000), dec!(1000)).await, None);
        assert_eq!(calc.calculate_unit_price("CL8", "K", dec!(1000), dec!(1000)).await, None);
    }

    #[tokio::test]
    async fn non_positive_dimensions_are_unpriced() {
        let calc = calculator();
        assert_eq!(calc.calculate_unit_price("EI90", "MB", dec!(0), dec!(1000)).await, None);
        assert_eq!(calc.calculate_unit_price("EI90", "MB", dec!(1000), dec!(-5)).await, None);
    }

    #[tokio::test]
    async fn oversized_panes_are_unpriced_instead_of_overflowing() {
        let huge = Decimal::from_str_exact("99999999999999999999999").unwrap();
        let price = calculator()
            .calculate_unit_price("EI90", "MB", huge, huge)
            .await;
        assert_eq!(price, None);
        assert_eq!(area_price(Decimal::MAX, dec!(2000), dec!(1000)), None);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn area_price_is_symmetric_in_width_and_height(
                price in 1u32..10_000_000,
                w in 1u32..10_000,
                h in 1u32..10_000,
            ) {
                let p = Decimal::from(price);
                let (w, h) = (Decimal::from(w), Decimal::from(h));
                prop_assert_eq!(area_price(p, w, h), area_price(p, h, w));
            }

            #[test]
            fn doubling_width_doubles_the_price(
                price in 1u32..10_000_000,
                w in 1u32..10_000,
                h in 1u32..10_000,
            ) {
                let p = Decimal::from(price);
                let (w, h) = (Decimal::from(w), Decimal::from(h));
                prop_assert_eq!(
                    area_price(p, w * Decimal::TWO, h),
                    area_price(p, w, h).map(|v| v * Decimal::TWO)
                );
            }
        }
    }
}
