// src/config.rs
//
// YAML configuration. Every section has defaults, so an empty file (or no
// file at all) yields a working setup pointed at the CSV export endpoint.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::info;

use crate::aggregate::AggregateRules;
use crate::fetch::{CsvExportSource, EnvTokenProvider, FileSource, SheetsApiSource, TableSource};
use crate::ingest::{ColumnRules, HeaderRules, IngestRules};
use crate::pipeline::Pipeline;

/// Env var naming the config file when no path is passed explicitly.
pub const CONFIG_ENV: &str = "SALESBOARD_CONFIG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    CsvExport,
    SheetsApi,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub spreadsheet_id: String,
    /// Sheet gid for `csv_export`, A1 range for `sheets_api`.
    pub range: String,
    /// Only read by `file`.
    pub path: Option<PathBuf>,
    pub base_url: Option<String>,
    /// Env var holding the bearer token for `sheets_api`.
    pub token_env: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::CsvExport,
            spreadsheet_id: String::new(),
            range: "0".to_string(),
            path: None,
            base_url: None,
            token_env: "SALESBOARD_SHEETS_TOKEN".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn build(&self) -> Result<Arc<dyn TableSource>> {
        let source: Arc<dyn TableSource> = match self.kind {
            SourceKind::CsvExport => {
                let mut src = CsvExportSource::with_timeout(self.timeout())?;
                if let Some(base) = &self.base_url {
                    src = src.with_base(base)?;
                }
                Arc::new(src)
            }
            SourceKind::SheetsApi => {
                let tokens = EnvTokenProvider::new(self.token_env.clone());
                let mut src = SheetsApiSource::with_timeout(self.timeout(), tokens)?;
                if let Some(base) = &self.base_url {
                    src = src.with_base(base)?;
                }
                Arc::new(src)
            }
            SourceKind::File => {
                let Some(path) = &self.path else {
                    bail!("source.kind is `file` but source.path is not set");
                };
                Arc::new(FileSource::new(path))
            }
        };
        Ok(source)
    }

    fn validate(&self) -> Result<()> {
        if matches!(self.kind, SourceKind::CsvExport | SourceKind::SheetsApi)
            && self.spreadsheet_id.trim().is_empty()
        {
            bail!("source.spreadsheet_id is required for {:?}", self.kind);
        }
        if self.timeout_secs == 0 {
            bail!("source.timeout_secs must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub header: HeaderRules,
    pub columns: ColumnRules,
    pub aggregate: AggregateRules,
    pub server: ServerConfig,
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(text).context("parsing config yaml")?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// `explicit`, else `$SALESBOARD_CONFIG`, else built-in defaults; then
    /// `$PORT` on top.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut cfg = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                info!(path = %path.display(), "loading config");
                Self::from_file(&path)?
            }
            None => {
                info!("no config file; using defaults");
                Self::default()
            }
        };
        cfg.apply_port(env::var("PORT").ok().as_deref())?;
        Ok(cfg)
    }

    pub fn apply_port(&mut self, raw: Option<&str>) -> Result<()> {
        if let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) {
            self.server.port = raw
                .parse()
                .with_context(|| format!("PORT={raw} is not a valid port"))?;
        }
        Ok(())
    }

    pub fn ingest_rules(&self) -> IngestRules {
        IngestRules {
            header: self.header.clone(),
            columns: self.columns.clone(),
        }
    }

    pub fn pipeline(&self) -> Result<Pipeline> {
        self.source.validate()?;
        let source = self.source.build()?;
        Ok(Pipeline::new(
            source,
            self.source.spreadsheet_id.clone(),
            self.source.range.clone(),
            self.ingest_rules(),
        )
        .with_timeout(self.source.timeout()))
    }
}
