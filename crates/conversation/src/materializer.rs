//! Confirmed conversation → priced items → persisted Zalo order.

use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{info, instrument, warn};

use glasserp_core::ZaloOrderId;
use glasserp_parties::CustomerLookup;
use glasserp_products::PriceCalculator;
use glasserp_sales::{
    CustomerSnapshot, OrderRepository, OrderRepositoryError, PlaceZaloOrder, ZaloOrder,
    ZaloOrderDetail, order_code_at,
};

use crate::parser::ParsedItem;
use crate::state::{ConversationState, OrderItem};

const PLACEHOLDER_NAME: &str = "Khách hàng Zalo";
const PLACEHOLDER_ADDRESS: &str = "Chưa cung cấp";
/// Same-second orders get `-2` .. `-9` before falling back to an id suffix.
const NUMBERED_CODE_ATTEMPTS: u32 = 9;

#[derive(Clone)]
pub struct OrderMaterializer {
    pricing: PriceCalculator,
    customers: CustomerLookup,
    orders: Arc<dyn OrderRepository>,
}

impl OrderMaterializer {
    pub fn new(
        pricing: PriceCalculator,
        customers: CustomerLookup,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            pricing,
            customers,
            orders,
        }
    }

    /// Price every parsed item. Items that cannot be priced keep `None`.
    pub async fn price_items(&self, items: &[ParsedItem]) -> Vec<OrderItem> {
        let mut priced = Vec::with_capacity(items.len());
        for item in items {
            let unit_price = self
                .pricing
                .calculate_unit_price(&item.item_code, &item.item_type, item.width, item.height)
                .await;
            if unit_price.is_none() {
                warn!(code = %item.item_code, kind = %item.item_type, "order item left unpriced");
            }
            priced.push(OrderItem {
                product_code: item.item_code.clone(),
                product_type: item.item_type.clone(),
                width: item.width,
                height: item.height,
                thickness: item.thickness,
                quantity: item.quantity,
                unit_price,
            });
        }
        priced
    }

    async fn customer_snapshot(&self, conversation: &ConversationState) -> CustomerSnapshot {
        let phone = conversation.customer_phone.clone().unwrap_or_default();
        let customer = if phone.is_empty() {
            None
        } else {
            self.customers.get_by_phone(&phone).await
        };

        match customer {
            Some(c) => CustomerSnapshot {
                customer_id: Some(c.id_typed()),
                name: c.name().to_string(),
                phone,
                address: c
                    .address()
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or(PLACEHOLDER_ADDRESS)
                    .to_string(),
            },
            None => CustomerSnapshot {
                customer_id: conversation.customer_id,
                name: PLACEHOLDER_NAME.to_string(),
                phone,
                address: PLACEHOLDER_ADDRESS.to_string(),
            },
        }
    }

    /// Persist a `Pending` order built from the conversation's order items.
    #[instrument(skip(self, conversation), fields(user_id = %conversation.user_id))]
    pub async fn materialize(
        &self,
        conversation: &ConversationState,
    ) -> Result<ZaloOrder, OrderRepositoryError> {
        let customer = self.customer_snapshot(conversation).await;
        let details: Vec<ZaloOrderDetail> = conversation
            .order_items
            .iter()
            .map(|item| ZaloOrderDetail {
                product_name: format!("{} {}", item.product_code, item.product_type),
                product_code: item.product_code.clone(),
                product_type: item.product_type.clone(),
                width: item.width,
                height: item.height,
                thickness: item.thickness,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        let base_code = order_code_at(Local::now().naive_local());
        let mut attempt = 1;
        loop {
            let id = ZaloOrderId::new();
            let order_code = match attempt {
                1 => base_code.clone(),
                n if n <= NUMBERED_CODE_ATTEMPTS => format!("{base_code}-{n}"),
                _ => format!("{base_code}-{}", id_suffix(id)),
            };

            let order = ZaloOrder::place(
                id,
                PlaceZaloOrder {
                    order_code,
                    zalo_user_id: conversation.user_id.clone(),
                    customer: customer.clone(),
                    details: details.clone(),
                    note: None,
                    occurred_at: Utc::now(),
                },
            )?;

            match self.orders.insert(&order).await {
                Ok(()) => {
                    info!(
                        order_code = order.order_code(),
                        total = %order.total_amount(),
                        lines = order.details().len(),
                        "zalo order created"
                    );
                    return Ok(order);
                }
                Err(OrderRepositoryError::DuplicateCode(code)) if attempt <= NUMBERED_CODE_ATTEMPTS => {
                    warn!(%code, "order code already taken, retrying with suffix");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Random tail of a UUIDv7 id, unique even for orders placed in the same millisecond.
fn id_suffix(id: ZaloOrderId) -> String {
    let simple = id.as_uuid().simple().to_string();
    simple[simple.len() - 8..].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glasserp_core::{CustomerId, StructureId};
    use glasserp_parties::{ContactInfo, Customer, InMemoryCustomerDirectory};
    use glasserp_products::{GlassStructure, InMemoryGlassCatalog};
    use glasserp_sales::{InMemoryOrderRepository, ZaloOrderStatus};
    use rust_decimal_macros::dec;

    fn materializer(orders: Arc<InMemoryOrderRepository>) -> OrderMaterializer {
        let catalog = InMemoryGlassCatalog::with_structures([GlassStructure::new(
            StructureId::new(),
            "MB-EI90",
            "Kính chống cháy EI90",
            Some(dec!(500000)),
        )
        .unwrap()]);
        let customers = InMemoryCustomerDirectory::with_customers([Customer::new(
            CustomerId::new(),
            "Anh Minh",
            ContactInfo {
                phone: Some("0912345678".into()),
                address: Some("12 Láng Hạ".into()),
                email: None,
            },
        )
        .unwrap()]);
        OrderMaterializer::new(
            PriceCalculator::new(Arc::new(catalog)),
            CustomerLookup::new(Arc::new(customers)),
            orders,
        )
    }

    fn parsed(code: &str, kind: &str, quantity: u32) -> ParsedItem {
        ParsedItem {
            item_code: code.into(),
            item_type: kind.into(),
            width: dec!(1000),
            height: dec!(2000),
            thickness: dec!(25),
            quantity,
        }
    }

    #[tokio::test]
    async fn known_and_unknown_items_are_priced_independently() {
        let m = materializer(Arc::new(InMemoryOrderRepository::new()));
        let items = m
            .price_items(&[parsed("EI90", "MB", 2), parsed("EI120", "MB", 1)])
            .await;
        assert_eq!(items[0].unit_price, Some(dec!(1000000)));
        assert_eq!(items[0].total_price(), Some(dec!(2000000)));
        assert_eq!(items[1].unit_price, None);
    }

    #[tokio::test]
    async fn materialized_order_snapshots_the_customer() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let m = materializer(orders.clone());

        let mut conv = ConversationState::new("zalo-1", Utc::now());
        conv.customer_phone = Some("0912345678".into());
        conv.order_items = m.price_items(&[parsed("EI90", "MB", 2)]).await;

        let order = m.materialize(&conv).await.unwrap();
        assert_eq!(order.status(), ZaloOrderStatus::Pending);
        assert_eq!(order.customer().name, "Anh Minh");
        assert_eq!(order.customer().address, "12 Láng Hạ");
        assert_eq!(order.total_amount(), dec!(2000000));
        assert!(order.order_code().starts_with("ZO"));
        assert_eq!(orders.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unresolved_customer_gets_placeholders() {
        let m = materializer(Arc::new(InMemoryOrderRepository::new()));
        let mut conv = ConversationState::new("zalo-2", Utc::now());
        conv.customer_phone = Some("0987000000".into());
        conv.order_items = m.price_items(&[parsed("EI90", "MB", 1)]).await;

        let order = m.materialize(&conv).await.unwrap();
        assert_eq!(order.customer().name, PLACEHOLDER_NAME);
        assert_eq!(order.customer().address, PLACEHOLDER_ADDRESS);
        assert_eq!(order.customer().phone, "0987000000");
    }

    #[tokio::test]
    async fn same_second_orders_get_distinct_codes() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let m = materializer(orders.clone());
        let mut conv = ConversationState::new("zalo-3", Utc::now());
        conv.order_items = m.price_items(&[parsed("EI90", "MB", 1)]).await;

        let a = m.materialize(&conv).await.unwrap();
        let b = m.materialize(&conv).await.unwrap();
        assert_ne!(a.order_code(), b.order_code());
    }

    #[tokio::test]
    async fn burst_of_same_second_orders_never_runs_out_of_codes() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let m = materializer(orders.clone());
        let mut conv = ConversationState::new("zalo-5", Utc::now());
        conv.order_items = m.price_items(&[parsed("EI90", "MB", 1)]).await;

        for _ in 0..15 {
            m.materialize(&conv).await.unwrap();
        }
        let mut codes: Vec<String> = orders
            .list()
            .await
            .unwrap()
            .iter()
            .map(|o| o.order_code().to_string())
            .collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 15);
    }

    #[test]
    fn id_suffix_is_eight_uppercase_hex_digits() {
        let suffix = id_suffix(ZaloOrderId::new());
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn conversation_without_items_cannot_be_materialized() {
        let m = materializer(Arc::new(InMemoryOrderRepository::new()));
        let conv = ConversationState::new("zalo-4", Utc::now());
        assert!(matches!(
            m.materialize(&conv).await,
            Err(OrderRepositoryError::Domain(_))
        ));
    }
}
