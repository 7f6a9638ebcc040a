use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// Why the tabular source could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableKind {
    /// 401/403, or the sign-in page Google serves instead of a private sheet.
    PermissionDenied,
    /// Any other non-success HTTP status.
    Status(u16),
    /// Connection, DNS, IO or body-decoding failure.
    Transport,
    /// The fetch did not finish within the configured bound.
    Timeout,
}

impl UnavailableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableKind::PermissionDenied => "permission_denied",
            UnavailableKind::Status(_) => "http_status",
            UnavailableKind::Transport => "transport",
            UnavailableKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for UnavailableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableKind::Status(code) => write!(f, "http status {}", code),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Everything that can stop a refresh. Aggregation has no error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("source unavailable ({kind}): {message}")]
    SourceUnavailable {
        kind: UnavailableKind,
        message: String,
    },

    #[error("malformed source: {0}")]
    MalformedSource(String),

    #[error("a refresh is already in progress")]
    RefreshInProgress,
}

impl IngestError {
    pub fn unavailable(kind: UnavailableKind, message: impl Into<String>) -> Self {
        IngestError::SourceUnavailable {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        IngestError::MalformedSource(message.into())
    }

    /// Stable tag the presentation layer branches on.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            IngestError::SourceUnavailable { kind, .. } => kind.as_str(),
            IngestError::MalformedSource(_) => "malformed_source",
            IngestError::RefreshInProgress => "refresh_in_progress",
        }
    }

    /// Upstream HTTP status, when there was one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            IngestError::SourceUnavailable {
                kind: UnavailableKind::Status(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            IngestError::SourceUnavailable {
                kind: UnavailableKind::PermissionDenied,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            UnavailableKind::Timeout
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                401 | 403 => UnavailableKind::PermissionDenied,
                code => UnavailableKind::Status(code),
            }
        } else {
            UnavailableKind::Transport
        };
        IngestError::unavailable(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_distinct_per_failure_class() {
        let denied = IngestError::unavailable(UnavailableKind::PermissionDenied, "share the sheet");
        let status = IngestError::unavailable(UnavailableKind::Status(500), "boom");
        let malformed = IngestError::malformed("no header");

        assert_eq!(denied.kind_tag(), "permission_denied");
        assert!(denied.is_permission_denied());
        assert_eq!(status.kind_tag(), "http_status");
        assert_eq!(status.upstream_status(), Some(500));
        assert_eq!(malformed.kind_tag(), "malformed_source");
        assert!(!malformed.is_permission_denied());
        assert_eq!(
            IngestError::RefreshInProgress.kind_tag(),
            "refresh_in_progress"
        );
    }

    #[test]
    fn display_keeps_raw_message() {
        let err = IngestError::unavailable(UnavailableKind::Status(404), "GET /export");
        assert_eq!(
            err.to_string(),
            "source unavailable (http status 404): GET /export"
        );
    }
}
