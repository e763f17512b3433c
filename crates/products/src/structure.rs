use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glasserp_core::{DomainError, DomainResult, Entity, StructureId};

/// Catalog key of a structure: `{type}-{code}`.
pub fn structure_key(item_type: &str, item_code: &str) -> String {
    format!("{}-{}", item_type.trim(), item_code.trim())
}

/// A glass structure as priced by the ERP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlassStructure {
    id: StructureId,
    product_code: String,
    product_name: String,
    /// Price per square metre. `None` when the ERP has no price yet.
    unit_price: Option<Decimal>,
}

impl GlassStructure {
    pub fn new(
        id: StructureId,
        product_code: impl Into<String>,
        product_name: impl Into<String>,
        unit_price: Option<Decimal>,
    ) -> DomainResult<Self> {
        let product_code = product_code.into();
        if product_code.trim().is_empty() {
            return Err(DomainError::validation("product_code cannot be empty"));
        }
        if unit_price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        Ok(Self {
            id,
            product_code,
            product_name: product_name.into(),
            unit_price,
        })
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn unit_price(&self) -> Option<Decimal> {
        self.unit_price
    }

    /// Price per square metre if the structure can be sold.
    pub fn sellable_price(&self) -> Option<Decimal> {
        self.unit_price.filter(|p| *p > Decimal::ZERO)
    }
}

impl Entity for GlassStructure {
    type Id = StructureId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn structure_key_joins_type_and_code() {
        assert_eq!(structure_key("MB", "EI90"), "MB-EI90");
        assert_eq!(structure_key(" MB ", "EI-120"), "MB-EI-120");
    }

    #[test]
    fn zero_or_missing_price_is_not_sellable() {
        let zero = GlassStructure::new(StructureId::new(), "MB-EI90", "", Some(Decimal::ZERO)).unwrap();
        let none = GlassStructure::new(StructureId::new(), "MB-EI60", "", None).unwrap();
        let priced = GlassStructure::new(StructureId::new(), "MB-EI30", "", Some(dec!(450000))).unwrap();
        assert_eq!(zero.sellable_price(), None);
        assert_eq!(none.sellable_price(), None);
        assert_eq!(priced.sellable_price(), Some(dec!(450000)));
    }

    #[test]
    fn negative_price_and_blank_code_are_rejected() {
        assert!(GlassStructure::new(StructureId::new(), "MB-EI90", "", Some(dec!(-1))).is_err());
        assert!(GlassStructure::new(StructureId::new(), "  ", "", None).is_err());
    }
}
