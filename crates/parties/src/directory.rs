use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use glasserp_core::CustomerId;

use crate::customer::Customer;
use crate::phone::normalize_phone;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("customer directory unavailable: {0}")]
    Unavailable(String),

    #[error("customer directory query failed: {0}")]
    Query(String),
}

/// Read access to the ERP customer list.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, DirectoryError>;

    /// Customers that have a phone number on file.
    async fn list_with_phone(&self) -> Result<Vec<Customer>, DirectoryError>;

    /// First customer whose stored phone normalizes to `normalized_phone`.
    ///
    /// The default scans [`CustomerDirectory::list_with_phone`]; backends with
    /// an indexed normalized column should override it.
    async fn find_by_normalized_phone(
        &self,
        normalized_phone: &str,
    ) -> Result<Option<Customer>, DirectoryError> {
        let customers = self.list_with_phone().await?;
        Ok(customers.into_iter().find(|c| {
            c.phone()
                .map(|p| normalize_phone(p) == normalized_phone)
                .unwrap_or(false)
        }))
    }
}

#[async_trait]
impl<S> CustomerDirectory for Arc<S>
where
    S: CustomerDirectory + ?Sized,
{
    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, DirectoryError> {
        (**self).get(id).await
    }

    async fn list_with_phone(&self) -> Result<Vec<Customer>, DirectoryError> {
        (**self).list_with_phone().await
    }

    async fn find_by_normalized_phone(
        &self,
        normalized_phone: &str,
    ) -> Result<Option<Customer>, DirectoryError> {
        (**self).find_by_normalized_phone(normalized_phone).await
    }
}

/// In-memory customer directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCustomerDirectory {
    inner: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        let dir = Self::new();
        for c in customers {
            dir.upsert(c);
        }
        dir
    }

    pub fn upsert(&self, customer: Customer) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(customer.id_typed(), customer);
        }
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, DirectoryError> {
        let map = self
            .inner
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".into()))?;
        Ok(map.get(&id).cloned())
    }

    async fn list_with_phone(&self) -> Result<Vec<Customer>, DirectoryError> {
        let map = self
            .inner
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".into()))?;
        let mut customers: Vec<Customer> = map
            .values()
            .filter(|c| c.phone().is_some_and(|p| !p.trim().is_empty()))
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(customers)
    }
}
