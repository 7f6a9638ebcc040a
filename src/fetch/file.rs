use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

use super::{parse::parse_csv, RawTable, TableSource};
use crate::error::{IngestError, Result, UnavailableKind};

/// A CSV export saved to disk. Ignores `source_id` and `range_id`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TableSource for FileSource {
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    async fn fetch_table(&self, _source_id: &str, _range_id: &str) -> Result<RawTable> {
        let text = fs::read_to_string(&self.path).await.map_err(|e| {
            IngestError::unavailable(
                UnavailableKind::Transport,
                format!("reading {}: {}", self.path.display(), e),
            )
        })?;
        let table = parse_csv(&text)?;
        info!(rows = table.len(), "csv file loaded");
        Ok(table)
    }

    fn describe(&self) -> &'static str {
        "file"
    }
}
