use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;
use tracing::Instrument;

use crate::config::MigrationConfig;
use crate::normalize::normalize;
use crate::telemetry::{self};
use crate::telemetry::ops::inspect::Phase as InspectPhase;
use crate::wp::{fetch_post, PageSource, WpClient};

#[derive(Args, Debug)]
pub struct InspectCmd {
    /// WordPress post id
    pub post_id: u64,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub post_id: u64,
    pub slug: String,
    pub title: String,
    pub image: Option<String>,
    pub html: String,
}

/// entry point for inspect
pub async fn run(args: InspectCmd) -> Result<()> {
    let cfg = MigrationConfig::from_env();
    let log = telemetry::inspect();
    let _g = log.root_span_kv([("post_id", args.post_id.to_string())]).entered();

    let client = WpClient::new(&cfg.api_base, cfg.http_timeout)?;
    let report = inspect_post(&client, args.post_id).await?;

    if telemetry::config::json_mode() {
        log.result(&report)?;
    } else {
        println!("📄 Post {} ({}):", report.post_id, report.slug);
        println!("  Title: {}", report.title);
        println!("  Image: {}", report.image.as_deref().unwrap_or("-"));
        println!("  Normalized HTML:");
        println!("{}", report.html);
    }
    Ok(())
}

pub async fn inspect_post(source: &dyn PageSource, post_id: u64) -> Result<InspectReport> {
    let log = telemetry::inspect();
    let post = fetch_post(source, post_id)
        .instrument(log.span(&InspectPhase::FetchPost))
        .await?
        .ok_or_else(|| anyhow!("post {post_id} not found"))?;

    let normalized = {
        let _s = log.span(&InspectPhase::Normalize).entered();
        normalize(&post.content.rendered)
    };
    Ok(InspectReport {
        post_id: post.id,
        slug: post.slug,
        title: post.title.rendered,
        image: normalized.image,
        html: normalized.html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wp::mock::MockSource;
    use serde_json::json;

    #[tokio::test]
    async fn reports_normalized_post() {
        let source = MockSource::new().with_pages("posts", vec![vec![json!({
            "id": 77, "slug": "pasta", "title": {"rendered": "Pasta"},
            "content": {"rendered": "<p><strong>Hello</strong></p><img src=\"a.jpg\">"}
        })]]);
        let report = inspect_post(&source, 77).await.unwrap();
        assert_eq!(report.slug, "pasta");
        assert_eq!(report.image.as_deref(), Some("a.jpg"));
        assert_eq!(report.html, "<p>Hello</p>");
        assert_eq!(source.queries("posts"), vec![vec![("include".to_string(), "77".to_string())]]);
    }

    #[tokio::test]
    async fn missing_post_is_an_error() {
        let source = MockSource::new().with_pages("posts", vec![vec![]]);
        assert!(inspect_post(&source, 5).await.is_err());
    }
}
