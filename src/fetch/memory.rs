use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::{RawTable, TableSource};
use crate::error::{IngestError, Result};

/// Serves a fixed table (or a fixed error), optionally after a delay.
/// Handy for embedding the pipeline and for exercising it in tests.
#[derive(Debug)]
pub struct MemorySource {
    outcome: Mutex<Result<RawTable>>,
    delay: Option<Duration>,
}

impl MemorySource {
    pub fn new(table: RawTable) -> Self {
        Self {
            outcome: Mutex::new(Ok(table)),
            delay: None,
        }
    }

    pub fn from_rows(rows: &[&[&str]]) -> Self {
        Self::new(RawTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        ))
    }

    pub fn failing(err: IngestError) -> Self {
        Self {
            outcome: Mutex::new(Err(err)),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Swap the served table, as if the sheet had been edited between fetches.
    pub fn replace(&self, table: RawTable) {
        let mut guard = self.outcome.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Ok(table);
    }
}

#[async_trait]
impl TableSource for MemorySource {
    async fn fetch_table(&self, _source_id: &str, _range_id: &str) -> Result<RawTable> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn describe(&self) -> &'static str {
        "memory"
    }
}
