//! Idempotent Postgres DDL applied at startup.

use sqlx::PgPool;
use tracing::info;

use super::r#trait::StoreError;
use super::postgres::map_sqlx_error;

/// Products, clients and per-client stock ledgers.
///
/// `client_stocks` has exactly one row per `(client_id, product_id)`; the
/// composite primary key is what the transfer upsert's `ON CONFLICT` targets.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id              UUID PRIMARY KEY,
    name            TEXT        NOT NULL,
    description     TEXT        NOT NULL DEFAULT '',
    price_in_cents  BIGINT      NOT NULL CHECK (price_in_cents >= 0),
    quantity        BIGINT      NOT NULL CHECK (quantity >= 0),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS clients (
    id          UUID PRIMARY KEY,
    name        TEXT        NOT NULL,
    email       TEXT,
    phone       TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS client_stocks (
    client_id   UUID        NOT NULL REFERENCES clients (id),
    product_id  UUID        NOT NULL REFERENCES products (id),
    quantity    BIGINT      NOT NULL CHECK (quantity >= 0),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (client_id, product_id)
);

CREATE INDEX IF NOT EXISTS client_stocks_product_idx ON client_stocks (product_id);
"#;

/// Create missing tables. Safe to run on every start.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    info!("database schema ensured");
    Ok(())
}
