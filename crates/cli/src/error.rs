//! CLI error type.

use std::path::PathBuf;

use shopline_storefront::{ApiError, StorefrontError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] ApiError),

    #[error("could not read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Message printed to the terminal.
    pub fn user_message(&self) -> String {
        match self {
            Self::Storefront(e) => e.user_message(),
            Self::Client(_) => "Could not start the HTTP client.".to_string(),
            Self::ReadFile { .. } | Self::Usage(_) => self.to_string(),
        }
    }
}
