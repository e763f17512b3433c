//! Zalo orders domain module.
//!
//! Orders captured through the chat channel are kept apart from regular sales
//! orders: they carry a snapshot of the customer as known at confirmation time
//! and lines that may be unpriced. Staff review them before they enter
//! production.

pub mod order;
pub mod repository;

pub use order::{
    CustomerSnapshot, PlaceZaloOrder, ZaloOrder, ZaloOrderDetail, ZaloOrderRecord, ZaloOrderStatus,
    order_code_at,
};
pub use repository::{InMemoryOrderRepository, OrderRepository, OrderRepositoryError};
