use std::path::PathBuf;

use thiserror::Error;

use crate::link::LinkProblem;

#[derive(Debug, Error)]
pub enum SlackclipError {
    #[error("unexpected link format: {problem} Got: \"{link}\"")]
    InvalidLink { link: String, problem: LinkProblem },

    #[error("no Slack API credentials found; run with --update-credentials first")]
    CredentialsMissing,

    #[error("failed to extract Slack credentials: {0}")]
    Extraction(String),

    #[error("unable to persist credentials to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unable to read credential store {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential store {path} is corrupt: {source}")]
    StoreCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no token found matching the workspace URL: {origin}")]
    WorkspaceNotFound { origin: String },

    #[error("failed to query Slack API {method}: {message}")]
    ApiTransport { method: String, message: String },

    #[error("Slack API {method} returned HTTP status {status}")]
    ApiHttp { method: String, status: u16 },

    #[error("Slack API {method} returned an unusable response: {detail}")]
    ApiResponse { method: String, detail: String },

    #[error("invalid message timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("cannot determine home directory")]
    HomeDirectoryNotFound,

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SlackclipError {
    /// True for failures that mean the credential store could not be read back.
    pub fn is_store_read(&self) -> bool {
        matches!(self, Self::StoreRead { .. } | Self::StoreCorrupt { .. })
    }
}

pub type Result<T> = std::result::Result<T, SlackclipError>;
