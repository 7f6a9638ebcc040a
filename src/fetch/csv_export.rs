// src/fetch/csv_export.rs

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{parse::parse_csv, RawTable, TableSource};
use crate::error::{IngestError, Result, UnavailableKind};

pub const DEFAULT_EXPORT_BASE: &str = "https://docs.google.com/";

/// Public "anyone with the link" sheet, fetched as CSV without credentials.
/// `source_id` is the spreadsheet id, `range_id` the sheet gid.
#[derive(Debug, Clone)]
pub struct CsvExportSource {
    client: Client,
    base: Url,
}

impl CsvExportSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base: Url::parse(DEFAULT_EXPORT_BASE).expect("static url"),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IngestError::from)?;
        Ok(Self::new(client))
    }

    /// Point at another host; used against local mirrors and in tests.
    pub fn with_base(mut self, base: &str) -> Result<Self> {
        self.base = Url::parse(base).map_err(|e| {
            IngestError::unavailable(
                UnavailableKind::Transport,
                format!("bad base url {base}: {e}"),
            )
        })?;
        Ok(self)
    }

    pub fn export_url(&self, spreadsheet_id: &str, gid: &str) -> Result<Url> {
        let mut url = self
            .base
            .join(&format!("spreadsheets/d/{}/export", spreadsheet_id))
            .map_err(|e| IngestError::unavailable(UnavailableKind::Transport, e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("format", "csv")
            .append_pair("gid", gid);
        Ok(url)
    }
}

fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    if content_type.map_or(false, |ct| ct.contains("text/html")) {
        return true;
    }
    let lower: String = body
        .trim_start()
        .chars()
        .take(64)
        .collect::<String>()
        .to_ascii_lowercase();
    lower.starts_with("<!doctype html") || lower.starts_with("<html")
}

#[async_trait]
impl TableSource for CsvExportSource {
    #[instrument(level = "info", skip(self), fields(source = "csv_export"))]
    async fn fetch_table(&self, source_id: &str, range_id: &str) -> Result<RawTable> {
        let url = self.export_url(source_id, range_id)?;
        debug!(%url, "fetching csv export");

        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            warn!(%status, "sheet is not shared publicly");
            return Err(IngestError::unavailable(
                UnavailableKind::PermissionDenied,
                format!(
                    "GET {} returned {}; share the sheet as \"anyone with the link can view\"",
                    url, status
                ),
            ));
        }
        if !status.is_success() {
            return Err(IngestError::unavailable(
                UnavailableKind::Status(status.as_u16()),
                format!("GET {} returned {}", url, status),
            ));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;
        if looks_like_html(content_type.as_deref(), &body) {
            warn!("export answered with an html page instead of csv");
            return Err(IngestError::unavailable(
                UnavailableKind::PermissionDenied,
                format!("GET {} returned a sign-in page; the sheet is not public", url),
            ));
        }

        let table = parse_csv(&body)?;
        info!(rows = table.len(), bytes = body.len(), "csv export fetched");
        Ok(table)
    }

    fn describe(&self) -> &'static str {
        "csv_export"
    }
}
