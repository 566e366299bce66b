use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::MigrationError;

const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// One page of a paginated collection.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Value>,
    pub total_pages: Option<u32>,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get_page(
        &self,
        resource: &str,
        query: &[(String, String)],
        page: u32,
        per_page: u32,
    ) -> Result<Page, MigrationError>;
}

/// `reqwest`-backed client for a `wp-json/wp/v2` root.
#[derive(Clone)]
pub struct WpClient {
    http: Client,
    base: String,
}

impl WpClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, MigrationError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MigrationError::http("client", e))?;
        Ok(Self { http, base: base.trim_end_matches('/').to_string() })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{}", self.base, resource.trim_start_matches('/'))
    }
}

#[async_trait]
impl PageSource for WpClient {
    async fn get_page(
        &self,
        resource: &str,
        query: &[(String, String)],
        page: u32,
        per_page: u32,
    ) -> Result<Page, MigrationError> {
        let response = self
            .http
            .get(self.endpoint(resource))
            .query(&[("per_page", per_page.to_string()), ("page", page.to_string())])
            .query(query)
            .send()
            .await
            .map_err(|e| MigrationError::http(resource, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MigrationError::RemoteFetch {
                resource: resource.to_string(),
                page,
                status: status.as_u16(),
            });
        }

        let total_pages = parse_total_pages(
            response.headers().get(TOTAL_PAGES_HEADER).and_then(|v| v.to_str().ok()),
        );
        let bytes = response.bytes().await.map_err(|e| MigrationError::http(resource, e))?;
        let records: Vec<Value> =
            serde_json::from_slice(&bytes).map_err(|e| MigrationError::decode(resource, e))?;

        Ok(Page { records, total_pages })
    }
}

fn parse_total_pages(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
}
