use crate::error::CounterError;
use crate::store::CounterStore;
use serde::Deserialize;
use slog::debug;
use slog::info;
use std::sync::Arc;

/// Where the handler takes the value it returns from.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ReadMode {
    /// Increment, then read the record back in a separate request.  A
    /// concurrent invocation's increment can land in between, in which case
    /// the returned value includes it.
    #[default]
    ReadBack,
    /// Return the value the store reported from the increment itself.
    Inline,
}

/// Counts one visit per invocation.
///
/// The store is built once per process and shared by every invocation.
#[derive(Clone)]
pub struct Handler {
    store: Arc<dyn CounterStore>,
    read_mode: ReadMode,
    log: slog::Logger,
}

impl Handler {
    pub fn new(
        store: Arc<dyn CounterStore>,
        read_mode: ReadMode,
        log: slog::Logger,
    ) -> Handler {
        Handler { store, read_mode, log }
    }

    /// Increment the counter and return its new value.
    ///
    /// `event` and `context` come from whatever runtime is invoking us and
    /// are ignored.
    pub async fn invoke<E, C>(
        &self,
        _event: E,
        _context: C,
    ) -> Result<i64, CounterError> {
        let incremented = self.store.increment().await?;
        debug!(self.log, "incremented counter"; "total_count" => incremented);
        let total_count = match self.read_mode {
            ReadMode::ReadBack => self.store.read().await?,
            ReadMode::Inline => incremented,
        };
        info!(self.log, "counted visit";
            "total_count" => total_count,
            "read_mode" => ?self.read_mode);
        Ok(total_count)
    }

    /// Read the counter without counting a visit.
    pub async fn current(&self) -> Result<i64, CounterError> {
        self.store.read().await
    }

    /// Create the counter record unless it exists already.
    pub async fn seed(&self, initial: i64) -> Result<bool, CounterError> {
        let created = self.store.seed(initial).await?;
        info!(self.log, "seeded counter";
            "initial" => initial,
            "created" => created);
        Ok(created)
    }
}
