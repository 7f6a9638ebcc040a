// src/pipeline.rs
//
// fetch -> ingest, one refresh at a time, bounded by a timeout.

use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};
use tracing::{info, instrument, warn};

use crate::error::{IngestError, Result, UnavailableKind};
use crate::fetch::TableSource;
use crate::ingest::{ingest, IngestRules, Record};

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Pipeline {
    source: Arc<dyn TableSource>,
    source_id: String,
    range_id: String,
    rules: IngestRules,
    timeout: Duration,
    in_flight: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn TableSource>,
        source_id: impl Into<String>,
        range_id: impl Into<String>,
        rules: IngestRules,
    ) -> Self {
        Self {
            source,
            source_id: source_id.into(),
            range_id: range_id.into(),
            rules,
            timeout: DEFAULT_REFRESH_TIMEOUT,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Re-fetch the whole table and normalize it.
    ///
    /// A call made while another refresh is outstanding fails immediately
    /// with `RefreshInProgress`; it is never queued.
    #[instrument(level = "info", skip(self), fields(source = self.source.describe()))]
    pub async fn refresh(&self) -> Result<Vec<Record>> {
        let _flight = self.in_flight.try_lock().map_err(|_| {
            warn!("refresh rejected; another one is running");
            IngestError::RefreshInProgress
        })?;

        let start = Instant::now();
        let fetch = self.source.fetch_table(&self.source_id, &self.range_id);
        let table = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "source timed out");
                return Err(IngestError::unavailable(
                    UnavailableKind::Timeout,
                    format!("no response within {:?}", self.timeout),
                ));
            }
        };

        let records = ingest(&table, &self.rules)?;
        info!(
            rows = table.len(),
            records = records.len(),
            elapsed = ?start.elapsed(),
            "refresh complete"
        );
        Ok(records)
    }
}
