// src/fetch/sheets_api.rs
//
// Sheets v4 `values.get`. Obtaining the OAuth2 token (service account, user
// consent, whatever) is the deployment's job; this module only presents it.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{RawTable, TableSource};
use crate::error::{IngestError, Result, UnavailableKind};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/";

/// Supplies a read-only bearer token for the Sheets API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A token handed over by the caller as-is.
#[derive(Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Reads the token from an environment variable on every fetch, so a sidecar
/// can rotate it without restarting the service.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn access_token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(IngestError::unavailable(
                UnavailableKind::PermissionDenied,
                format!("no access token in ${}", self.var),
            )),
        }
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `source_id` is the spreadsheet id, `range_id` an A1 range such as `"DB!A1:Z"`.
pub struct SheetsApiSource<T: TokenProvider> {
    client: Client,
    base: Url,
    tokens: T,
}

impl<T: TokenProvider> SheetsApiSource<T> {
    pub fn new(client: Client, tokens: T) -> Self {
        Self {
            client,
            base: Url::parse(DEFAULT_API_BASE).expect("static url"),
            tokens,
        }
    }

    pub fn with_timeout(timeout: Duration, tokens: T) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IngestError::from)?;
        Ok(Self::new(client, tokens))
    }

    pub fn with_base(mut self, base: &str) -> Result<Self> {
        self.base = Url::parse(base).map_err(|e| {
            IngestError::unavailable(
                UnavailableKind::Transport,
                format!("bad base url {base}: {e}"),
            )
        })?;
        Ok(self)
    }

    pub fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                IngestError::unavailable(UnavailableKind::Transport, "base url cannot hold a path")
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }
}

#[async_trait]
impl<T: TokenProvider> TableSource for SheetsApiSource<T> {
    #[instrument(level = "info", skip(self), fields(source = "sheets_api"))]
    async fn fetch_table(&self, source_id: &str, range_id: &str) -> Result<RawTable> {
        let url = self.values_url(source_id, range_id)?;
        let token = self.tokens.access_token().await?;
        debug!(%url, "fetching values");

        let resp = self.client.get(url.clone()).bearer_auth(token).send().await?;
        let status = resp.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            warn!(%status, "sheets api rejected credentials");
            return Err(IngestError::unavailable(
                UnavailableKind::PermissionDenied,
                format!(
                    "GET {} returned {}; grant the service account read access to the sheet",
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

        let body: ValueRange = resp.json().await?;
        let rows: Vec<Vec<String>> = body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        info!(rows = rows.len(), "values fetched");
        Ok(RawTable::new(rows))
    }

    fn describe(&self) -> &'static str {
        "sheets_api"
    }
}
