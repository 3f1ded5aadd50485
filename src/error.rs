//! Error types for each stage of the pipeline.
//!
//! Only [`ConfigError`] is fatal. Fetch, search and model errors are
//! reported to the user and the session carries on; none of them is retried.

use thiserror::Error;

/// Missing or malformed startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("the OpenAI API key must start with \"sk-\"")]
    MalformedApiKey,
    #[error("unsupported model {0:?}")]
    UnsupportedModel(String),
    #[error("could not read config file {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    ConfigSyntax {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("report directory {path} is not writable: {source}")]
    ReportDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single article could not be fetched. The batch continues.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// The URL that failed.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Http { url, .. } | FetchError::Status { url, .. } => url,
        }
    }
}

/// The news search provider failed; treated as zero results.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search provider answered with status {0}")]
    Status(u16),
    #[error("search provider returned an error: {0}")]
    Provider(String),
}

/// The chat completion call failed. No reply is appended.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model endpoint answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// The report could not be produced.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("there is no analysis to report yet")]
    NothingToReport,
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
    #[error("could not write report {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
