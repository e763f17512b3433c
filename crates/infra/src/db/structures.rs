use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use glasserp_core::StructureId;
use glasserp_products::{CatalogError, GlassStructure, GlassStructureCatalog};

use super::is_connectivity;

/// ERP glass-structure table, keyed by `product_code` (`{type}-{code}`).
#[derive(Debug, Clone)]
pub struct PostgresGlassCatalog {
    pool: PgPool,
}

impl PostgresGlassCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GlassStructureCatalog for PostgresGlassCatalog {
    #[instrument(skip(self), err)]
    async fn find_by_code(&self, product_code: &str) -> Result<Option<GlassStructure>, CatalogError> {
        let row = sqlx::query(
            r#"
            SELECT id, product_code, product_name, unit_price
            FROM glass_structures
            WHERE product_code = $1
            LIMIT 1
            "#,
        )
        .bind(product_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_connectivity(&e) {
                CatalogError::Unavailable(e.to_string())
            } else {
                CatalogError::Query(e.to_string())
            }
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let read = |e: sqlx::Error| CatalogError::Query(format!("failed to read structure row: {e}"));
        let id: Uuid = row.try_get("id").map_err(read)?;
        let code: String = row.try_get("product_code").map_err(read)?;
        let name: String = row.try_get("product_name").map_err(read)?;
        let unit_price: Option<Decimal> = row.try_get("unit_price").map_err(read)?;

        GlassStructure::new(StructureId::from_uuid(id), code, name, unit_price)
            .map(Some)
            .map_err(|e| CatalogError::Query(e.to_string()))
    }
}
