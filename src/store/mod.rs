//! Backends holding the counter record.
//!
//! Every backend relies on the store's own atomic update for correctness
//! under concurrent invocations; nothing here adds locking of its own.

use crate::config::StoreConfig;
use crate::error::CounterError;
use anyhow::Context;
use async_trait::async_trait;
use slog::info;
use std::sync::Arc;

mod dynamodb;
mod memory;
mod postgres;

pub use dynamodb::DynamoStore;
pub use memory::MemoryStore;
pub use postgres::DbPool;
pub use postgres::PgStore;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add 1 to the counter and return the value the store
    /// reports for it afterwards.
    ///
    /// Fails with [`CounterError::RecordNotFound`] if the record or its
    /// counter field is absent.  The record is never created here.
    ///
    /// Counts are `i64`.  A store holding a larger number (DynamoDB numbers
    /// go well past `i64::MAX`) reports `MalformedResponse`, after the
    /// increment has already been applied.
    async fn increment(&self) -> Result<i64, CounterError>;

    /// Fetch the current value of the counter.
    async fn read(&self) -> Result<i64, CounterError>;

    /// Create the record holding `initial` unless it already exists.
    /// Returns whether the record was created.
    async fn seed(&self, initial: i64) -> Result<bool, CounterError>;
}

/// Builds the process-wide store described by `config`.
pub async fn from_config(
    config: &StoreConfig,
    log: &slog::Logger,
) -> anyhow::Result<Arc<dyn CounterStore>> {
    let store: Arc<dyn CounterStore> = match config {
        StoreConfig::Dynamodb(dynamo) => {
            info!(log, "using dynamodb store";
                "table_name" => &dynamo.table_name,
                "consistent_read" => dynamo.consistent_read);
            Arc::new(DynamoStore::from_config(dynamo).await)
        }
        StoreConfig::Postgres(postgres) => {
            info!(log, "using postgres store";
                "max_pool_size" => postgres.max_pool_size);
            let store = PgStore::connect(postgres, log)
                .await
                .context("setting up database pool")?;
            Arc::new(store)
        }
        StoreConfig::Memory(memory) => {
            info!(log, "using in-memory store";
                "initial" => ?memory.initial);
            Arc::new(MemoryStore::from_config(memory))
        }
    };
    Ok(store)
}
