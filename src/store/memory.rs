use super::CounterStore;
use crate::config::MemoryConfig;
use crate::error::CounterError;
use crate::model::CounterRecord;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Keeps the counter record in process memory.
///
/// Nothing survives a restart, so this is only useful for tests and for
/// trying the service out locally.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<CounterRecord>>,
}

impl MemoryStore {
    /// A store with no counter record in it.
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_count(total_count: i64) -> MemoryStore {
        let record = CounterRecord::new(total_count);
        MemoryStore { record: Mutex::new(Some(record)) }
    }

    pub fn from_config(config: &MemoryConfig) -> MemoryStore {
        match config.initial {
            Some(total_count) => MemoryStore::with_count(total_count),
            None => MemoryStore::new(),
        }
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn increment(&self) -> Result<i64, CounterError> {
        let mut record = self.record.lock().await;
        let record = record.as_mut().ok_or(CounterError::RecordNotFound)?;
        record.total_count =
            record.total_count.checked_add(1).ok_or_else(|| {
                CounterError::service("updating counter", "counter overflow")
            })?;
        Ok(record.total_count)
    }

    async fn read(&self) -> Result<i64, CounterError> {
        let record = *self.record.lock().await;
        record
            .map(|record| record.total_count)
            .ok_or(CounterError::RecordNotFound)
    }

    async fn seed(&self, initial: i64) -> Result<bool, CounterError> {
        let mut record = self.record.lock().await;
        if record.is_some() {
            return Ok(false);
        }
        *record = Some(CounterRecord::new(initial));
        Ok(true)
    }
}
