use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glasserp_core::{CustomerId, DomainError, DomainResult, Entity, ZaloOrderId};

/// Order code for an order confirmed at `at` (server local time): `ZO{yyyyMMddHHmmss}`.
pub fn order_code_at(at: NaiveDateTime) -> String {
    format!("ZO{}", at.format("%Y%m%d%H%M%S"))
}

/// Zalo order status lifecycle.
///
/// `Pending → Confirmed → Processing → Delivered`; any non-terminal status may
/// be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZaloOrderStatus {
    Pending,
    Confirmed,
    Processing,
    Delivered,
    Cancelled,
}

impl ZaloOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ZaloOrderStatus::Pending => "pending",
            ZaloOrderStatus::Confirmed => "confirmed",
            ZaloOrderStatus::Processing => "processing",
            ZaloOrderStatus::Delivered => "delivered",
            ZaloOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> DomainResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ZaloOrderStatus::Pending),
            "confirmed" => Ok(ZaloOrderStatus::Confirmed),
            "processing" => Ok(ZaloOrderStatus::Processing),
            "delivered" => Ok(ZaloOrderStatus::Delivered),
            "cancelled" => Ok(ZaloOrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown order status: {other}"))),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ZaloOrderStatus::Delivered | ZaloOrderStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: ZaloOrderStatus) -> bool {
        use ZaloOrderStatus::*;
        match (self, next) {
            (from, Cancelled) => !from.is_terminal(),
            (Pending, Confirmed) | (Confirmed, Processing) | (Processing, Delivered) => true,
            _ => false,
        }
    }
}

/// Customer as known when the order was confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub customer_id: Option<CustomerId>,
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// Order line: one glass pane and its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZaloOrderDetail {
    pub product_name: String,
    pub product_code: String,
    pub product_type: String,
    pub width: Decimal,
    pub height: Decimal,
    pub thickness: Decimal,
    pub quantity: u32,
    /// `None` when the pane could not be priced from the catalog.
    pub unit_price: Option<Decimal>,
}

impl ZaloOrderDetail {
    /// `None` when unpriced or when the line total does not fit in a `Decimal`.
    pub fn total_price(&self) -> Option<Decimal> {
        self.unit_price?.checked_mul(Decimal::from(self.quantity))
    }
}

fn checked_total(details: &[ZaloOrderDetail]) -> Option<Decimal> {
    details
        .iter()
        .filter_map(ZaloOrderDetail::total_price)
        .try_fold(Decimal::ZERO, Decimal::checked_add)
}

/// Command: place a new order from a confirmed conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceZaloOrder {
    pub order_code: String,
    pub zalo_user_id: String,
    pub customer: CustomerSnapshot,
    pub details: Vec<ZaloOrderDetail>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: an order captured through Zalo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZaloOrder {
    id: ZaloOrderId,
    order_code: String,
    zalo_user_id: String,
    customer: CustomerSnapshot,
    order_date: DateTime<Utc>,
    status: ZaloOrderStatus,
    note: Option<String>,
    details: Vec<ZaloOrderDetail>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ZaloOrder {
    pub fn place(id: ZaloOrderId, cmd: PlaceZaloOrder) -> DomainResult<Self> {
        if cmd.order_code.trim().is_empty() {
            return Err(DomainError::validation("order_code cannot be empty"));
        }
        if cmd.zalo_user_id.trim().is_empty() {
            return Err(DomainError::validation("zalo_user_id cannot be empty"));
        }
        if cmd.details.is_empty() {
            return Err(DomainError::invariant("cannot place an order without lines"));
        }
        for (i, d) in cmd.details.iter().enumerate() {
            if d.quantity == 0 {
                return Err(DomainError::validation(format!("line {}: quantity must be positive", i + 1)));
            }
            if d.width <= Decimal::ZERO || d.height <= Decimal::ZERO {
                return Err(DomainError::validation(format!("line {}: dimensions must be positive", i + 1)));
            }
        }
        if checked_total(&cmd.details).is_none() {
            return Err(DomainError::validation("order total is out of range"));
        }

        Ok(Self {
            id,
            order_code: cmd.order_code,
            zalo_user_id: cmd.zalo_user_id,
            customer: cmd.customer,
            order_date: cmd.occurred_at,
            status: ZaloOrderStatus::Pending,
            note: cmd.note,
            details: cmd.details,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> ZaloOrderId {
        self.id
    }

    pub fn order_code(&self) -> &str {
        &self.order_code
    }

    pub fn zalo_user_id(&self) -> &str {
        &self.zalo_user_id
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn status(&self) -> ZaloOrderStatus {
        self.status
    }

    pub fn details(&self) -> &[ZaloOrderDetail] {
        &self.details
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sum of all priced lines. Unpriced lines contribute nothing.
    pub fn total_amount(&self) -> Decimal {
        checked_total(&self.details).unwrap_or(Decimal::MAX)
    }

    pub fn has_unpriced_lines(&self) -> bool {
        self.details.iter().any(|d| d.unit_price.is_none())
    }

    pub fn change_status(&mut self, next: ZaloOrderStatus, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status == next {
            return Err(DomainError::conflict(format!("order is already {}", next.as_str())));
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::conflict(format!(
                "cannot move order from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    pub fn to_record(&self) -> ZaloOrderRecord {
        ZaloOrderRecord {
            id: self.id,
            order_code: self.order_code.clone(),
            zalo_user_id: self.zalo_user_id.clone(),
            customer: self.customer.clone(),
            order_date: self.order_date,
            total_amount: self.total_amount(),
            status: self.status,
            note: self.note.clone(),
            details: self.details.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuild an order loaded from storage. Stored totals are ignored and
    /// recomputed from the lines.
    pub fn restore(record: ZaloOrderRecord) -> Self {
        Self {
            id: record.id,
            order_code: record.order_code,
            zalo_user_id: record.zalo_user_id,
            customer: record.customer,
            order_date: record.order_date,
            status: record.status,
            note: record.note,
            details: record.details,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl Entity for ZaloOrder {
    type Id = ZaloOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Flat, serializable view of a [`ZaloOrder`] (storage rows, API payloads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZaloOrderRecord {
    pub id: ZaloOrderId,
    pub order_code: String,
    pub zalo_user_id: String,
    pub customer: CustomerSnapshot,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub status: ZaloOrderStatus,
    pub note: Option<String>,
    pub details: Vec<ZaloOrderDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
