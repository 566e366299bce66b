use futures::{stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MigrationError;
use crate::telemetry;

use super::client::PageSource;
use super::types::{SourceComment, SourcePost, TaxonomyTerm};

/// Pages after the first are requested this many at a time, results kept in page order.
const PAGE_FETCH_CONCURRENCY: usize = 4;

/// Fetch every page of `resource`. Page 1 doubles as the total-page discovery
/// request, so a collection of P pages costs exactly P requests.
pub async fn fetch_all_pages(
    source: &dyn PageSource,
    resource: &str,
    query: &[(String, String)],
    per_page: u32,
) -> Result<Vec<Value>, MigrationError> {
    let log = telemetry::migrate();
    log.info(format!("Fetching {}...", resource));
    let first = source.get_page(resource, query, 1, per_page).await?;
    let total = first.total_pages.unwrap_or(1).max(1);
    let mut records = first.records;

    let log = &log;
    let rest: Vec<Vec<Value>> = stream::iter(2..=total)
        .map(|page| async move {
            log.info(format!("Fetching page {} of {} {}...", page, total, resource));
            source.get_page(resource, query, page, per_page).await.map(|p| p.records)
        })
        .buffered(PAGE_FETCH_CONCURRENCY)
        .try_collect()
        .await?;

    for page in rest {
        records.extend(page);
    }
    log.info_kv("fetched", [("resource", resource.to_string()), ("records", records.len().to_string()), ("pages", total.to_string())]);
    Ok(records)
}

pub async fn fetch_all<T: DeserializeOwned>(
    source: &dyn PageSource,
    resource: &str,
    query: &[(String, String)],
    per_page: u32,
) -> Result<Vec<T>, MigrationError> {
    let raw = fetch_all_pages(source, resource, query, per_page).await?;
    raw.into_iter()
        .map(|v| serde_json::from_value(v).map_err(|e| MigrationError::decode(resource, e)))
        .collect()
}

pub async fn fetch_terms(source: &dyn PageSource, resource: &str, per_page: u32) -> Result<Vec<TaxonomyTerm>, MigrationError> {
    fetch_all(source, resource, &[], per_page).await
}

pub async fn fetch_posts(source: &dyn PageSource, per_page: u32) -> Result<Vec<SourcePost>, MigrationError> {
    fetch_all(source, "posts", &[], per_page).await
}

pub async fn fetch_post(source: &dyn PageSource, id: u64) -> Result<Option<SourcePost>, MigrationError> {
    let query = [("include".to_string(), id.to_string())];
    let posts: Vec<SourcePost> = fetch_all(source, "posts", &query, 1).await?;
    Ok(posts.into_iter().find(|p| p.id == id))
}

/// Comments are optional decoration: any failure means "no comments".
pub async fn fetch_comments(source: &dyn PageSource, post_id: u64, per_page: u32) -> Option<Vec<SourceComment>> {
    let query = [("post".to_string(), post_id.to_string())];
    match fetch_all::<SourceComment>(source, "comments", &query, per_page).await {
        Ok(comments) => Some(comments),
        Err(e) => {
            telemetry::migrate().warn_kv("comments unavailable", [("post_id", post_id.to_string()), ("error", e.to_string())]);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wp::mock::MockSource;
    use serde_json::json;

    fn page_of(ids: &[u64]) -> Vec<Value> {
        ids.iter().map(|id| json!({"id": id, "name": format!("t{}", id)})).collect()
    }

    #[tokio::test]
    async fn issues_exactly_total_pages_requests_in_order() {
        let source = MockSource::new()
            .with_pages("tags", vec![page_of(&[1, 2]), page_of(&[3]), page_of(&[4, 5]), page_of(&[6])]);

        let records = fetch_all_pages(&source, "tags", &[], 100).await.unwrap();

        let ids: Vec<u64> = records.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(source.requested_pages("tags"), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn missing_header_means_single_page() {
        let source = MockSource::new().with_pages("tags", vec![page_of(&[1])]).without_total_header();
        let records = fetch_all_pages(&source, "tags", &[], 100).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(source.requested_pages("tags"), vec![1]);
    }

    #[tokio::test]
    async fn failed_page_aborts_with_resource_and_status() {
        let source = MockSource::new()
            .with_pages("categories", vec![page_of(&[1]), page_of(&[2]), page_of(&[3])])
            .failing("categories", 2, 503);

        let err = fetch_all_pages(&source, "categories", &[], 100).await.unwrap_err();
        match err {
            MigrationError::RemoteFetch { resource, page, status } => {
                assert_eq!(resource, "categories");
                assert_eq!(page, 2);
                assert_eq!(status, 503);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn typed_terms_decode() {
        let source = MockSource::new().with_pages("tags", vec![vec![json!({"id": 3, "name": "Easy", "slug": "easy"})]]);
        let terms = fetch_terms(&source, "tags", 100).await.unwrap();
        assert_eq!(terms, vec![TaxonomyTerm { id: 3, name: "Easy".into(), slug: "easy".into() }]);
    }

    #[tokio::test]
    async fn comment_failure_is_not_an_error() {
        let source = MockSource::new().failing("comments", 1, 500);
        assert!(fetch_comments(&source, 7, 100).await.is_none());
    }
}
