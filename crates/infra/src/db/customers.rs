use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use async_trait::async_trait;
use glasserp_core::CustomerId;
use glasserp_parties::{ContactInfo, Customer, CustomerDirectory, DirectoryError};

use super::is_connectivity;

/// ERP customers table.
#[derive(Debug, Clone)]
pub struct PostgresCustomerDirectory {
    pool: PgPool,
}

impl PostgresCustomerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_err(operation: &str, err: sqlx::Error) -> DirectoryError {
    if is_connectivity(&err) {
        DirectoryError::Unavailable(format!("{operation}: {err}"))
    } else {
        DirectoryError::Query(format!("{operation}: {err}"))
    }
}

fn customer_from_row(row: &PgRow) -> Result<Customer, DirectoryError> {
    let read = |e: sqlx::Error| DirectoryError::Query(format!("failed to read customer row: {e}"));
    let id: Uuid = row.try_get("id").map_err(read)?;
    let name: String = row.try_get("customer_name").map_err(read)?;
    let contact = ContactInfo {
        phone: row.try_get("phone").map_err(read)?,
        address: row.try_get("address").map_err(read)?,
        email: row.try_get("email").map_err(read)?,
    };
    Customer::new(CustomerId::from_uuid(id), name, contact)
        .map_err(|e| DirectoryError::Query(e.to_string()))
}

#[async_trait]
impl CustomerDirectory for PostgresCustomerDirectory {
    #[instrument(skip(self), fields(customer_id = %id.as_uuid()), err)]
    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_name, phone, address, email
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("get", e))?;

        row.as_ref().map(customer_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_with_phone(&self) -> Result<Vec<Customer>, DirectoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_name, phone, address, email
            FROM customers
            WHERE phone IS NOT NULL AND btrim(phone) <> ''
            ORDER BY customer_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("list_with_phone", e))?;

        rows.iter().map(customer_from_row).collect()
    }
}
