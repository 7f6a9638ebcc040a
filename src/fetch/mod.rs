// src/fetch/mod.rs
//
// Transports that produce a `RawTable`. The rest of the crate only sees the
// `TableSource` trait; credentials and URLs stay in here.

use async_trait::async_trait;

use crate::error::Result;

pub mod csv_export;
pub mod file;
pub mod memory;
pub mod parse;
pub mod sheets_api;

pub use csv_export::CsvExportSource;
pub use file::FileSource;
pub use memory::MemorySource;
pub use parse::parse_csv;
pub use sheets_api::{EnvTokenProvider, SheetsApiSource, StaticToken, TokenProvider};

/// A 2D grid of trimmed text cells, exactly as the source delivered it.
/// Rows may have different widths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// `fetch_table(source_id, range_id) -> RawTable`, whatever the transport.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn fetch_table(&self, source_id: &str, range_id: &str) -> Result<RawTable>;

    /// Short name for logs.
    fn describe(&self) -> &'static str;
}
