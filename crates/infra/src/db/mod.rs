//! Postgres-backed ERP data: customers, glass structures and Zalo orders.
//!
//! All repositories share one `PgPool`. [`ensure_schema`] creates the tables
//! when they are missing so a fresh database is usable without a separate
//! migration step.

mod customers;
mod orders;
mod structures;

pub use customers::PostgresCustomerDirectory;
pub use orders::PostgresOrderRepository;
pub use structures::PostgresGlassCatalog;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id UUID PRIMARY KEY,
        customer_name TEXT NOT NULL,
        phone TEXT,
        address TEXT,
        email TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS glass_structures (
        id UUID PRIMARY KEY,
        product_code TEXT NOT NULL UNIQUE,
        product_name TEXT NOT NULL,
        unit_price NUMERIC(18, 2)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS zalo_orders (
        id UUID PRIMARY KEY,
        order_code TEXT NOT NULL UNIQUE,
        zalo_user_id TEXT NOT NULL,
        customer_id UUID,
        customer_name TEXT NOT NULL,
        customer_phone TEXT NOT NULL,
        customer_address TEXT NOT NULL,
        order_date TIMESTAMPTZ NOT NULL,
        total_amount NUMERIC(18, 2) NOT NULL,
        status TEXT NOT NULL,
        note TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS zalo_order_details (
        zalo_order_id UUID NOT NULL REFERENCES zalo_orders(id) ON DELETE CASCADE,
        line_no INTEGER NOT NULL,
        product_name TEXT NOT NULL,
        product_code TEXT NOT NULL,
        product_type TEXT NOT NULL,
        width NUMERIC(12, 2) NOT NULL,
        height NUMERIC(12, 2) NOT NULL,
        thickness NUMERIC(12, 2) NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        unit_price NUMERIC(18, 2),
        total_price NUMERIC(18, 2),
        PRIMARY KEY (zalo_order_id, line_no)
    )
    "#,
];

/// Connect to `database_url` with a small pool.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Create the chatbot's tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("database schema ready");
    Ok(())
}

/// Postgres SQLSTATE for a unique-constraint violation.
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

/// Whether the error means the database could not be reached at all.
pub(crate) fn is_connectivity(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_covers_every_table() {
        let ddl = SCHEMA.join("\n");
        for table in ["customers", "glass_structures", "zalo_orders", "zalo_order_details"] {
            assert!(ddl.contains(&format!("CREATE TABLE IF NOT EXISTS {table} ")));
        }
    }

    #[test]
    fn only_pool_level_failures_count_as_connectivity() {
        assert!(is_connectivity(&sqlx::Error::PoolTimedOut));
        assert!(!is_connectivity(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
