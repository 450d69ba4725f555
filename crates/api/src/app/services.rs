use std::sync::Arc;

use anyhow::Context;

use stockroom_core::{ClientId, ProductId};
use stockroom_infra::{
    AppConfig, ClientRepository, ClientStockReader, InMemoryStockStore, PgStockStore,
    ProductRepository, StoreError, TransferEngine, TransferError, TransferReceipt,
    store::schema::ensure_schema,
};
use stockroom_inventory::{ClientStock, StockTransfer};
use stockroom_parties::{Client, ClientUpdate, NewClient};
use stockroom_products::{NewProduct, Product, ProductUpdate};

type InMemoryEngine = TransferEngine<InMemoryStockStore, InMemoryStockStore, InMemoryStockStore>;
type PostgresEngine = TransferEngine<PgStockStore, PgStockStore, PgStockStore>;

/// Backend wiring shared by every handler.
///
/// Each variant owns one store (used for the CRUD surface) and a transfer
/// engine built over clones of that same store.
#[derive(Clone)]
pub enum AppServices {
    InMemory {
        store: InMemoryStockStore,
        engine: Arc<InMemoryEngine>,
    },
    Postgres {
        store: PgStockStore,
        engine: Arc<PostgresEngine>,
    },
}

/// Select the backend from configuration: Postgres when `DATABASE_URL` is
/// set, otherwise the in-memory store (dev/test).
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => build_postgres_services(config, url).await,
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is not persisted)");
            Ok(build_in_memory_services(config))
        }
    }
}

pub fn build_in_memory_services(config: &AppConfig) -> AppServices {
    let store = InMemoryStockStore::new();
    let engine = TransferEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        config.transfer_timeout,
    );
    AppServices::InMemory {
        store,
        engine: Arc::new(engine),
    }
}

async fn build_postgres_services(config: &AppConfig, url: &str) -> anyhow::Result<AppServices> {
    let pool = PgStockStore::connect(url, config.database_max_connections)
        .await
        .context("failed to connect to Postgres")?;
    ensure_schema(&pool).await.context("failed to apply schema")?;

    let store = PgStockStore::new(pool, config.transfer_timeout);
    let engine = TransferEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        config.transfer_timeout,
    );
    tracing::info!(max_connections = config.database_max_connections, "using Postgres store");
    Ok(AppServices::Postgres {
        store,
        engine: Arc::new(engine),
    })
}

impl AppServices {
    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory { .. } => "in_memory",
            AppServices::Postgres { .. } => "postgres",
        }
    }

    pub async fn transfer(&self, request: StockTransfer) -> Result<TransferReceipt, TransferError> {
        match self {
            AppServices::InMemory { engine, .. } => engine.transfer(request).await,
            AppServices::Postgres { engine, .. } => engine.transfer(request).await,
        }
    }

    pub async fn create_product(&self, input: NewProduct) -> Result<Product, StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.create_product(input).await,
            AppServices::Postgres { store, .. } => store.create_product(input).await,
        }
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.get_product(id).await,
            AppServices::Postgres { store, .. } => store.get_product(id).await,
        }
    }

    pub async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.update_product(id, update).await,
            AppServices::Postgres { store, .. } => store.update_product(id, update).await,
        }
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.delete_product(id).await,
            AppServices::Postgres { store, .. } => store.delete_product(id).await,
        }
    }

    pub async fn create_client(&self, input: NewClient) -> Result<Client, StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.create_client(input).await,
            AppServices::Postgres { store, .. } => store.create_client(input).await,
        }
    }

    pub async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.get_client(id).await,
            AppServices::Postgres { store, .. } => store.get_client(id).await,
        }
    }

    pub async fn update_client(&self, id: ClientId, update: ClientUpdate) -> Result<Client, StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.update_client(id, update).await,
            AppServices::Postgres { store, .. } => store.update_client(id, update).await,
        }
    }

    pub async fn delete_client(&self, id: ClientId) -> Result<(), StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.delete_client(id).await,
            AppServices::Postgres { store, .. } => store.delete_client(id).await,
        }
    }

    pub async fn get_client_stock(
        &self,
        client_id: ClientId,
        product_id: ProductId,
    ) -> Result<Option<ClientStock>, StoreError> {
        match self {
            AppServices::InMemory { store, .. } => store.get_client_stock(client_id, product_id).await,
            AppServices::Postgres { store, .. } => store.get_client_stock(client_id, product_id).await,
        }
    }
}
