use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MigrationError;

use super::client::{Page, PageSource};

/// In-memory page source: serves canned pages per resource and records requests.
#[derive(Default)]
pub struct MockSource {
    pages: HashMap<String, Vec<Vec<Value>>>,
    failures: HashMap<(String, u32), u16>,
    no_header: bool,
    calls: Mutex<Vec<(String, Vec<(String, String)>, u32)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, resource: &str, pages: Vec<Vec<Value>>) -> Self {
        self.pages.insert(resource.to_string(), pages);
        self
    }

    pub fn failing(mut self, resource: &str, page: u32, status: u16) -> Self {
        self.failures.insert((resource.to_string(), page), status);
        self
    }

    pub fn without_total_header(mut self) -> Self {
        self.no_header = true;
        self
    }

    pub fn requested_pages(&self, resource: &str) -> Vec<u32> {
        let mut pages: Vec<u32> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _, _)| r == resource)
            .map(|(_, _, p)| *p)
            .collect();
        pages.sort_unstable();
        pages
    }

    pub fn queries(&self, resource: &str) -> Vec<Vec<(String, String)>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _, _)| r == resource)
            .map(|(_, q, _)| q.clone())
            .collect()
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn get_page(
        &self,
        resource: &str,
        query: &[(String, String)],
        page: u32,
        _per_page: u32,
    ) -> Result<Page, MigrationError> {
        self.calls.lock().unwrap().push((resource.to_string(), query.to_vec(), page));
        if let Some(status) = self.failures.get(&(resource.to_string(), page)) {
            return Err(MigrationError::RemoteFetch { resource: resource.to_string(), page, status: *status });
        }
        let pages = self.pages.get(resource).cloned().unwrap_or_default();
        let records = pages.get(page as usize - 1).cloned().unwrap_or_default();
        let total_pages = if self.no_header { None } else { Some(pages.len().max(1) as u32) };
        Ok(Page { records, total_pages })
    }
}
