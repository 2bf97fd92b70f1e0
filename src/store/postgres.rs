use super::CounterStore;
use crate::config::PostgresConfig;
use crate::error::CounterError;
use crate::model::CounterRecord;
use crate::model::COUNTER_VERSION;
use crate::schema::counter::dsl;
use anyhow::Context;
use async_bb8_diesel::AsyncRunQueryDsl;
use async_bb8_diesel::AsyncSimpleConnection;
use async_bb8_diesel::ConnectionError;
use async_bb8_diesel::ConnectionManager;
use async_trait::async_trait;
use diesel::prelude::*;
use slog::error;

pub type DbPool = bb8::Pool<ConnectionManager<diesel::PgConnection>>;

/// Counter record kept as the row `version = 1` of the `counter` table.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> PgStore {
        PgStore { pool }
    }

    /// Builds the connection pool described by `config`.  Connection errors
    /// seen by the pool in the background end up in `log`.
    pub async fn connect(
        config: &PostgresConfig,
        log: &slog::Logger,
    ) -> anyhow::Result<PgStore> {
        let pool = bb8::Builder::new()
            .error_sink(Box::new(PoolErrorLog(log.clone())))
            .max_size(config.max_pool_size)
            .build(ConnectionManager::new(&config.url))
            .await
            .context("building counter database pool")?;
        Ok(PgStore::new(pool))
    }

    async fn ensure_table(&self) -> Result<(), CounterError> {
        self.pool
            .batch_execute_async(
                r#"
                CREATE TABLE IF NOT EXISTS counter (
                    version INT4 PRIMARY KEY,
                    total_count INT8 NOT NULL
                );
                "#,
            )
            .await
            .map_err(|error| {
                CounterError::service(
                    "creating counter table",
                    error.to_string(),
                )
            })
    }
}

#[async_trait]
impl CounterStore for PgStore {
    async fn increment(&self) -> Result<i64, CounterError> {
        let updated: Vec<i64> = diesel::update(
            dsl::counter.filter(dsl::version.eq(COUNTER_VERSION)),
        )
        .set(dsl::total_count.eq(dsl::total_count + 1i64))
        .returning(dsl::total_count)
        .get_results_async(&self.pool)
        .await
        .map_err(|error| {
            CounterError::service("updating counter", error.to_string())
        })?;
        updated.into_iter().next().ok_or(CounterError::RecordNotFound)
    }

    async fn read(&self) -> Result<i64, CounterError> {
        let records: Vec<CounterRecord> = dsl::counter
            .filter(dsl::version.eq(COUNTER_VERSION))
            .select(CounterRecord::as_select())
            .load_async(&self.pool)
            .await
            .map_err(|error| {
                CounterError::service("loading counter", error.to_string())
            })?;
        records
            .into_iter()
            .next()
            .map(|record| record.total_count)
            .ok_or(CounterError::RecordNotFound)
    }

    async fn seed(&self, initial: i64) -> Result<bool, CounterError> {
        self.ensure_table().await?;
        let nrows = diesel::insert_into(dsl::counter)
            .values(CounterRecord::new(initial))
            .on_conflict(dsl::version)
            .do_nothing()
            .execute_async(&self.pool)
            .await
            .map_err(|error| {
                CounterError::service("seeding counter", error.to_string())
            })?;
        Ok(nrows > 0)
    }
}

#[derive(Clone, Debug)]
struct PoolErrorLog(slog::Logger);

impl bb8::ErrorSink<ConnectionError> for PoolErrorLog {
    fn sink(&self, error: ConnectionError) {
        error!(&self.0, "counter database connection error";
            "error_message" => #%error);
    }

    fn boxed_clone(&self) -> Box<dyn bb8::ErrorSink<ConnectionError>> {
        Box::new(self.clone())
    }
}
