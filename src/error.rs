use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("fetching {resource} page {page} failed with code {status}")]
    RemoteFetch { resource: String, page: u32, status: u16 },

    #[error("http request for {resource} failed: {source}")]
    Http {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("writing {} failed: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} id {id} is not in the loaded lookup table")]
    DataIntegrity { kind: &'static str, id: u64 },

    #[error("recipe meta could not be decoded: {0}")]
    RecipeDecode(String),

    #[error("post {post_id} timed out")]
    Timeout { post_id: u64 },

    #[error("cancelled")]
    Cancelled,
}

impl MigrationError {
    pub fn http(resource: &str, source: reqwest::Error) -> Self {
        MigrationError::Http { resource: resource.to_string(), source }
    }

    pub fn decode(resource: &str, source: serde_json::Error) -> Self {
        MigrationError::Decode { resource: resource.to_string(), source }
    }
}
