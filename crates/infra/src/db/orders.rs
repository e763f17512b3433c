//! Zalo orders in two tables: `zalo_orders` (header + customer snapshot) and
//! `zalo_order_details` (one row per line, ordered by `line_no`).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use glasserp_core::{CustomerId, ZaloOrderId};
use glasserp_sales::{
    CustomerSnapshot, OrderRepository, OrderRepositoryError, ZaloOrder, ZaloOrderDetail,
    ZaloOrderRecord, ZaloOrderStatus,
};

use super::is_unique_violation;

const ORDER_COLUMNS: &str = r#"
    id, order_code, zalo_user_id, customer_id, customer_name, customer_phone,
    customer_address, order_date, total_amount, status, note, created_at, updated_at
"#;

const DETAIL_COLUMNS: &str = r#"
    zalo_order_id, product_name, product_code, product_type, width, height,
    thickness, quantity, unit_price
"#;

#[derive(Debug, Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage(operation: &str, err: sqlx::Error) -> OrderRepositoryError {
    OrderRepositoryError::Storage(format!("{operation}: {err}"))
}

fn read_err(e: sqlx::Error) -> OrderRepositoryError {
    OrderRepositoryError::Storage(format!("failed to read order row: {e}"))
}

fn header_from_row(row: &PgRow) -> Result<ZaloOrderRecord, OrderRepositoryError> {
    let id: Uuid = row.try_get("id").map_err(read_err)?;
    let customer_id: Option<Uuid> = row.try_get("customer_id").map_err(read_err)?;
    let status: String = row.try_get("status").map_err(read_err)?;

    Ok(ZaloOrderRecord {
        id: ZaloOrderId::from_uuid(id),
        order_code: row.try_get("order_code").map_err(read_err)?,
        zalo_user_id: row.try_get("zalo_user_id").map_err(read_err)?,
        customer: CustomerSnapshot {
            customer_id: customer_id.map(CustomerId::from_uuid),
            name: row.try_get("customer_name").map_err(read_err)?,
            phone: row.try_get("customer_phone").map_err(read_err)?,
            address: row.try_get("customer_address").map_err(read_err)?,
        },
        order_date: row.try_get("order_date").map_err(read_err)?,
        total_amount: row.try_get("total_amount").map_err(read_err)?,
        status: ZaloOrderStatus::parse(&status)?,
        note: row.try_get("note").map_err(read_err)?,
        details: Vec::new(),
        created_at: row.try_get("created_at").map_err(read_err)?,
        updated_at: row.try_get("updated_at").map_err(read_err)?,
    })
}

fn detail_from_row(row: &PgRow) -> Result<(Uuid, ZaloOrderDetail), OrderRepositoryError> {
    let order_id: Uuid = row.try_get("zalo_order_id").map_err(read_err)?;
    let quantity: i32 = row.try_get("quantity").map_err(read_err)?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| OrderRepositoryError::Storage(format!("negative quantity {quantity}")))?;

    Ok((
        order_id,
        ZaloOrderDetail {
            product_name: row.try_get("product_name").map_err(read_err)?,
            product_code: row.try_get("product_code").map_err(read_err)?,
            product_type: row.try_get("product_type").map_err(read_err)?,
            width: row.try_get("width").map_err(read_err)?,
            height: row.try_get("height").map_err(read_err)?,
            thickness: row.try_get("thickness").map_err(read_err)?,
            quantity,
            unit_price: row.try_get::<Option<Decimal>, _>("unit_price").map_err(read_err)?,
        },
    ))
}

impl PostgresOrderRepository {
    /// Attach detail lines to loaded headers and rebuild the orders.
    async fn hydrate(
        &self,
        headers: Vec<ZaloOrderRecord>,
    ) -> Result<Vec<ZaloOrder>, OrderRepositoryError> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = headers.iter().map(|h| *h.id.as_uuid()).collect();

        let rows = sqlx::query(&format!(
            "SELECT {DETAIL_COLUMNS} FROM zalo_order_details \
             WHERE zalo_order_id = ANY($1) ORDER BY zalo_order_id, line_no"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("load details", e))?;

        let mut lines: HashMap<Uuid, Vec<ZaloOrderDetail>> = HashMap::new();
        for row in &rows {
            let (order_id, detail) = detail_from_row(row)?;
            lines.entry(order_id).or_default().push(detail);
        }

        Ok(headers
            .into_iter()
            .map(|mut header| {
                header.details = lines.remove(header.id.as_uuid()).unwrap_or_default();
                ZaloOrder::restore(header)
            })
            .collect())
    }

    async fn insert_details(
        tx: &mut Transaction<'_, Postgres>,
        order: &ZaloOrder,
    ) -> Result<(), OrderRepositoryError> {
        for (line_no, d) in order.details().iter().enumerate() {
            let quantity = i32::try_from(d.quantity)
                .map_err(|_| OrderRepositoryError::Storage(format!("quantity {} too large", d.quantity)))?;
            sqlx::query(
                r#"
                INSERT INTO zalo_order_details (
                    zalo_order_id, line_no, product_name, product_code, product_type,
                    width, height, thickness, quantity, unit_price, total_price
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(order.id_typed().as_uuid())
            .bind(line_no as i32)
            .bind(&d.product_name)
            .bind(&d.product_code)
            .bind(&d.product_type)
            .bind(d.width)
            .bind(d.height)
            .bind(d.thickness)
            .bind(quantity)
            .bind(d.unit_price)
            .bind(d.total_price())
            .execute(&mut **tx)
            .await
            .map_err(|e| storage("insert detail", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[instrument(skip(self, order), fields(order_code = order.order_code()), err)]
    async fn insert(&self, order: &ZaloOrder) -> Result<(), OrderRepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| storage("begin", e))?;
        let record = order.to_record();
        let customer = &record.customer;

        sqlx::query(&format!(
            "INSERT INTO zalo_orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(record.id.as_uuid())
        .bind(&record.order_code)
        .bind(&record.zalo_user_id)
        .bind(customer.customer_id.map(|id| *id.as_uuid()))
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(record.order_date)
        .bind(record.total_amount)
        .bind(record.status.as_str())
        .bind(&record.note)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                OrderRepositoryError::DuplicateCode(record.order_code.clone())
            } else {
                storage("insert order", e)
            }
        })?;

        Self::insert_details(&mut tx, order).await?;
        tx.commit().await.map_err(|e| storage("commit", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id.as_uuid()), err)]
    async fn get(&self, id: ZaloOrderId) -> Result<Option<ZaloOrder>, OrderRepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM zalo_orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage("get", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let header = header_from_row(&row)?;
        Ok(self.hydrate(vec![header]).await?.into_iter().next())
    }

    #[instrument(skip(self), fields(count = tracing::field::Empty), err)]
    async fn list(&self) -> Result<Vec<ZaloOrder>, OrderRepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM zalo_orders ORDER BY order_date DESC, order_code DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("list", e))?;

        let headers = rows
            .iter()
            .map(header_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Span::current().record("count", headers.len());
        self.hydrate(headers).await
    }

    #[instrument(skip(self), fields(order_id = %id.as_uuid(), status = status.as_str()), err)]
    async fn update_status(
        &self,
        id: ZaloOrderId,
        status: ZaloOrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ZaloOrder, OrderRepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| storage("begin", e))?;

        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM zalo_orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| storage("lock order", e))?
        .ok_or(OrderRepositoryError::NotFound)?;

        // Lines do not take part in status changes.
        let mut order = ZaloOrder::restore(header_from_row(&row)?);
        order.change_status(status, at)?;

        sqlx::query("UPDATE zalo_orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(order.status().as_str())
            .bind(order.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("update status", e))?;
        tx.commit().await.map_err(|e| storage("commit", e))?;

        self.get(id).await?.ok_or(OrderRepositoryError::NotFound)
    }

    #[instrument(skip(self), fields(order_id = %id.as_uuid()), err)]
    async fn delete(&self, id: ZaloOrderId) -> Result<bool, OrderRepositoryError> {
        let result = sqlx::query("DELETE FROM zalo_orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| storage("delete", e))?;
        Ok(result.rows_affected() > 0)
    }
}
