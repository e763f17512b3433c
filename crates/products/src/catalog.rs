use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::structure::GlassStructure;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("glass catalog unavailable: {0}")]
    Unavailable(String),

    #[error("glass catalog query failed: {0}")]
    Query(String),
}

/// Read access to the ERP glass-structure catalog.
#[async_trait]
pub trait GlassStructureCatalog: Send + Sync {
    /// Find a structure by its key (`{type}-{code}`).
    async fn find_by_code(&self, product_code: &str) -> Result<Option<GlassStructure>, CatalogError>;
}

#[async_trait]
impl<S> GlassStructureCatalog for Arc<S>
where
    S: GlassStructureCatalog + ?Sized,
{
    async fn find_by_code(&self, product_code: &str) -> Result<Option<GlassStructure>, CatalogError> {
        (**self).find_by_code(product_code).await
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryGlassCatalog {
    inner: RwLock<HashMap<String, GlassStructure>>,
}

impl InMemoryGlassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structures(structures: impl IntoIterator<Item = GlassStructure>) -> Self {
        let catalog = Self::new();
        for s in structures {
            catalog.upsert(s);
        }
        catalog
    }

    pub fn upsert(&self, structure: GlassStructure) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(structure.product_code().to_string(), structure);
        }
    }
}

#[async_trait]
impl GlassStructureCatalog for InMemoryGlassCatalog {
    async fn find_by_code(&self, product_code: &str) -> Result<Option<GlassStructure>, CatalogError> {
        let map = self
            .inner
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".into()))?;
        Ok(map.get(product_code).cloned())
    }
}
