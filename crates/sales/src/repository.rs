use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use glasserp_core::{DomainError, ZaloOrderId};

use crate::order::{ZaloOrder, ZaloOrderStatus};

#[derive(Debug, Error)]
pub enum OrderRepositoryError {
    #[error("order not found")]
    NotFound,

    #[error("duplicate order code: {0}")]
    DuplicateCode(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("order storage error: {0}")]
    Storage(String),
}

/// Persistence for Zalo orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &ZaloOrder) -> Result<(), OrderRepositoryError>;

    async fn get(&self, id: ZaloOrderId) -> Result<Option<ZaloOrder>, OrderRepositoryError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<ZaloOrder>, OrderRepositoryError>;

    async fn update_status(
        &self,
        id: ZaloOrderId,
        status: ZaloOrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ZaloOrder, OrderRepositoryError>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: ZaloOrderId) -> Result<bool, OrderRepositoryError>;
}

#[async_trait]
impl<S> OrderRepository for Arc<S>
where
    S: OrderRepository + ?Sized,
{
    async fn insert(&self, order: &ZaloOrder) -> Result<(), OrderRepositoryError> {
        (**self).insert(order).await
    }

    async fn get(&self, id: ZaloOrderId) -> Result<Option<ZaloOrder>, OrderRepositoryError> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<ZaloOrder>, OrderRepositoryError> {
        (**self).list().await
    }

    async fn update_status(
        &self,
        id: ZaloOrderId,
        status: ZaloOrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ZaloOrder, OrderRepositoryError> {
        (**self).update_status(id, status, at).await
    }

    async fn delete(&self, id: ZaloOrderId) -> Result<bool, OrderRepositoryError> {
        (**self).delete(id).await
    }
}

/// In-memory order repository for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<HashMap<ZaloOrderId, ZaloOrder>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> OrderRepositoryError {
        OrderRepositoryError::Storage("lock poisoned".into())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &ZaloOrder) -> Result<(), OrderRepositoryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        if map.values().any(|o| o.order_code() == order.order_code()) {
            return Err(OrderRepositoryError::DuplicateCode(order.order_code().to_string()));
        }
        map.insert(order.id_typed(), order.clone());
        Ok(())
    }

    async fn get(&self, id: ZaloOrderId) -> Result<Option<ZaloOrder>, OrderRepositoryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<ZaloOrder>, OrderRepositoryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut orders: Vec<ZaloOrder> = map.values().cloned().collect();
        orders.sort_by(|a, b| b.order_date().cmp(&a.order_date()).then_with(|| b.order_code().cmp(a.order_code())));
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: ZaloOrderId,
        status: ZaloOrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ZaloOrder, OrderRepositoryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let order = map.get_mut(&id).ok_or(OrderRepositoryError::NotFound)?;
        order.change_status(status, at)?;
        Ok(order.clone())
    }

    async fn delete(&self, id: ZaloOrderId) -> Result<bool, OrderRepositoryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        Ok(map.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::order::{CustomerSnapshot, PlaceZaloOrder, ZaloOrderDetail};

    fn order(code: &str) -> ZaloOrder {
        ZaloOrder::place(
            ZaloOrderId::new(),
            PlaceZaloOrder {
                order_code: code.into(),
                zalo_user_id: "u1".into(),
                customer: CustomerSnapshot {
                    customer_id: None,
                    name: "Khách hàng Zalo".into(),
                    phone: "0912345678".into(),
                    address: "Chưa cung cấp".into(),
                },
                details: vec![ZaloOrderDetail {
                    product_name: "EI90 MB".into(),
                    product_code: "EI90".into(),
                    product_type: "MB".into(),
                    width: dec!(1000),
                    height: dec!(2000),
                    thickness: dec!(25),
                    quantity: 1,
                    unit_price: None,
                }],
                note: None,
                occurred_at: Utc::now(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn inserted_order_can_be_fetched_and_listed() {
        let repo = InMemoryOrderRepository::new();
        let o = order("ZO20250101000000");
        repo.insert(&o).await.unwrap();

        assert_eq!(repo.get(o.id_typed()).await.unwrap(), Some(o.clone()));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_order_code_is_rejected() {
        let repo = InMemoryOrderRepository::new();
        repo.insert(&order("ZO20250101000000")).await.unwrap();
        let err = repo.insert(&order("ZO20250101000000")).await.unwrap_err();
        assert!(matches!(err, OrderRepositoryError::DuplicateCode(_)));
    }

    #[tokio::test]
    async fn status_update_enforces_lifecycle() {
        let repo = InMemoryOrderRepository::new();
        let o = order("ZO20250101000001");
        repo.insert(&o).await.unwrap();

        let updated = repo
            .update_status(o.id_typed(), ZaloOrderStatus::Confirmed, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.status(), ZaloOrderStatus::Confirmed);

        let err = repo
            .update_status(o.id_typed(), ZaloOrderStatus::Pending, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderRepositoryError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn missing_order_reports_not_found_and_delete_false() {
        let repo = InMemoryOrderRepository::new();
        let id = ZaloOrderId::new();
        assert!(matches!(
            repo.update_status(id, ZaloOrderStatus::Confirmed, Utc::now()).await,
            Err(OrderRepositoryError::NotFound)
        ));
        assert!(!repo.delete(id).await.unwrap());
    }
}
