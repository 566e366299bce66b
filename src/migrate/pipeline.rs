use std::path::{Path, PathBuf};

use futures::{stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::MigrationConfig;
use crate::convert::Converter;
use crate::document::{Enriched, OutputDocument};
use crate::enrich::{resolve_categories, resolve_recipe, resolve_tags, CategoryTable, RecipeExport, TermTable};
use crate::error::MigrationError;
use crate::normalize::normalize;
use crate::telemetry;
use crate::telemetry::ops::migrate::Phase as MigratePhase;
use crate::wp::types::SourcePost;
use crate::wp::{fetch_comments, PageSource};

use super::write;

/// Lookup tables loaded once per run and shared read-only by all post pipelines.
#[derive(Debug)]
pub struct SharedTables {
    pub tags: TermTable,
    pub categories: TermTable,
    pub category_table: CategoryTable,
    pub recipes: RecipeExport,
}

pub struct PipelineCtx<'a> {
    pub cfg: &'a MigrationConfig,
    pub tables: &'a SharedTables,
    pub source: &'a dyn PageSource,
    pub converter: &'a dyn Converter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Convert,
    Enrich,
    Timeout,
    Cancelled,
    Write,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Convert => "convert",
            Stage::Enrich => "enrich",
            Stage::Timeout => "timeout",
            Stage::Cancelled => "cancelled",
            Stage::Write => "write",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostFailure {
    pub post_id: u64,
    pub slug: String,
    pub stage: Stage,
    pub error: String,
}

impl PostFailure {
    fn new(post: &SourcePost, stage: Stage, err: MigrationError) -> Self {
        PostFailure { post_id: post.id, slug: post.slug.clone(), stage, error: err.to_string() }
    }
}

#[derive(Debug, Default)]
pub struct Outcome {
    pub written: Vec<PathBuf>,
    pub failures: Vec<PostFailure>,
    pub recipes_matched: usize,
}

/// normalize -> (convert | recipe lookup | comments) -> taxonomy -> document.
pub async fn process_post(ctx: &PipelineCtx<'_>, post: &SourcePost) -> Result<OutputDocument, PostFailure> {
    let log = telemetry::migrate();

    let normalized = {
        let _s = log.span(&MigratePhase::Normalize).entered();
        normalize(&post.content.rendered)
    };

    let recipe = resolve_recipe(&post.title.rendered, &ctx.tables.recipes);
    let comments = async {
        if ctx.cfg.include_comments {
            fetch_comments(ctx.source, post.id, ctx.cfg.page_size).await
        } else {
            None
        }
    };
    let (body, comments) = tokio::join!(
        ctx.converter.convert(&normalized.html).instrument(log.span(&MigratePhase::Convert)),
        comments,
    );
    let body = body.map_err(|e| PostFailure::new(post, Stage::Convert, e))?;

    let _s = log.span(&MigratePhase::Enrich).entered();
    let lang = ctx.cfg.document_lang();
    let tags = resolve_tags(&post.tags, &ctx.tables.tags).map_err(|e| PostFailure::new(post, Stage::Enrich, e))?;
    let categories = resolve_categories(&post.categories, &ctx.tables.categories, &ctx.tables.category_table, &ctx.cfg.category_mask, &lang)
        .map_err(|e| PostFailure::new(post, Stage::Enrich, e))?;

    let parts = Enriched { body, content_image: normalized.image, tags, categories, recipe, comments };
    Ok(OutputDocument::assemble(post, &ctx.cfg.document_type, &lang, parts))
}

/// One post under the per-post timeout, abandoned early on cancellation.
async fn guarded(ctx: &PipelineCtx<'_>, post: &SourcePost, cancel: &CancellationToken) -> Result<OutputDocument, PostFailure> {
    let work = tokio::time::timeout(ctx.cfg.post_timeout, process_post(ctx, post));
    tokio::select! {
        _ = cancel.cancelled() => Err(PostFailure::new(post, Stage::Cancelled, MigrationError::Cancelled)),
        res = work => match res {
            Ok(done) => done,
            Err(_) => Err(PostFailure::new(post, Stage::Timeout, MigrationError::Timeout { post_id: post.id })),
        },
    }
}

/// Run every post with at most `cfg.concurrency` in flight; completion order is unspecified.
pub async fn process_all(
    ctx: &PipelineCtx<'_>,
    posts: &[SourcePost],
    cancel: &CancellationToken,
) -> Vec<(usize, Result<OutputDocument, PostFailure>)> {
    let log = telemetry::migrate();
    stream::iter(posts.iter().enumerate())
        .map(|(idx, post)| {
            let span = log.span_kv(&MigratePhase::Post, [("post_id", post.id.to_string()), ("slug", post.slug.clone())]);
            async move { (idx, guarded(ctx, post, cancel).await) }.instrument(span)
        })
        .buffer_unordered(ctx.cfg.concurrency.max(1))
        .collect()
        .await
}

/// Process, then write a file for each post that fully succeeded.
pub async fn execute(
    ctx: &PipelineCtx<'_>,
    posts: &[SourcePost],
    out_dir: &Path,
    cancel: &CancellationToken,
) -> Outcome {
    let log = telemetry::migrate();
    let mut outcome = Outcome::default();

    for (idx, result) in process_all(ctx, posts, cancel).await {
        let post = &posts[idx];
        let doc = match result {
            Ok(doc) => doc,
            Err(failure) => {
                log.post_failed(failure.post_id, &failure.slug, failure.stage.name(), &failure.error);
                outcome.failures.push(failure);
                continue;
            }
        };
        if doc.recipe.is_some() {
            outcome.recipes_matched += 1;
        }

        let written = write::write_document(out_dir, &ctx.cfg.language_tag, &doc)
            .instrument(log.span(&MigratePhase::WriteDoc))
            .await;
        match written {
            Ok(path) => {
                log.info_kv("➕ written", [("post_id", post.id.to_string()), ("path", path.display().to_string())]);
                outcome.written.push(path);
            }
            Err(e) => {
                let failure = PostFailure::new(post, Stage::Write, e);
                log.post_failed(failure.post_id, &failure.slug, failure.stage.name(), &failure.error);
                outcome.failures.push(failure);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::convert::mock::MockConverter;
    use crate::convert::StructuredContent;
    use crate::wp::mock::MockSource;
    use crate::wp::types::TaxonomyTerm;

    fn tables(recipes: Value) -> SharedTables {
        SharedTables {
            tags: TermTable::new("tag", vec![
                TaxonomyTerm { id: 3, name: "Easy".into(), slug: "easy".into() },
                TaxonomyTerm { id: 7, name: "Vegan".into(), slug: "vegan".into() },
            ]),
            categories: TermTable::new("category", vec![TaxonomyTerm { id: 1, name: "Pasta".into(), slug: "pasta".into() }]),
            category_table: CategoryTable::from_json(r#"[{"id": "CAT1", "label": "Pasta"}]"#).unwrap(),
            recipes: RecipeExport::from_json(&recipes.to_string()).unwrap(),
        }
    }

    fn post(id: u64, title: &str, content: &str, tags: &[u64]) -> SourcePost {
        serde_json::from_value(json!({
            "id": id, "slug": format!("post-{id}"), "date": "2020-01-02T03:04:05",
            "title": {"rendered": title}, "content": {"rendered": content},
            "categories": [1], "tags": tags
        }))
        .unwrap()
    }

    fn pasta_export() -> Value {
        let ingredients = r#"a:1:{i:0;a:2:{s:4:"name";s:0:"";s:11:"ingredients";a:1:{i:0;a:3:{s:6:"amount";s:3:"200";s:4:"unit";s:1:"g";s:4:"name";s:5:"pasta";}}}}"#;
        json!({"channel": {"item": [{"title": "Pasta", "postmeta": [{"meta_key": "wprm_ingredients", "meta_value": ingredients}]}]}})
    }

    fn cfg() -> MigrationConfig {
        MigrationConfig { concurrency: 2, post_timeout: Duration::from_secs(5), ..MigrationConfig::default() }
    }

    #[tokio::test]
    async fn pasta_post_end_to_end() {
        let cfg = cfg();
        let tables = tables(pasta_export());
        let source = MockSource::new();
        let converter = MockConverter::new();
        let ctx = PipelineCtx { cfg: &cfg, tables: &tables, source: &source, converter: &converter };

        let p = post(1, "Pasta", r#"<p>Hello</p><img src="a.jpg">"#, &[3, 7]);
        let doc = process_post(&ctx, &p).await.unwrap();
        let v = serde_json::to_value(&doc).unwrap();

        assert_eq!(converter.calls(), vec!["<p>Hello</p>".to_string()]);
        assert_eq!(v["recipe_ingredients"], json!([
            {"ingredient_amount": "200", "ingredient_unit": "g", "ingredient_name": "pasta"}
        ]));
        assert_eq!(v["tags"], json!(["Easy", "Vegan"]));
        assert_eq!(v["categories"][0]["category"]["id"], "CAT1");
        assert_eq!(v["image"]["url"], "a.jpg");
        assert!(!v["body"].to_string().contains("<img"));
    }

    #[tokio::test]
    async fn comments_fetched_when_enabled() {
        let cfg = MigrationConfig { include_comments: true, ..cfg() };
        let tables = tables(json!({"channel": {"item": []}}));
        let source = MockSource::new().with_pages("comments", vec![vec![
            json!({"id": 10, "author_name": "Anna", "date": "2020-01-03T00:00:00", "content": {"rendered": "<p>Lekker!</p>"}})
        ]]);
        let converter = MockConverter::new();
        let ctx = PipelineCtx { cfg: &cfg, tables: &tables, source: &source, converter: &converter };

        let doc = process_post(&ctx, &post(42, "Soep", "<p>x</p>", &[])).await.unwrap();
        let comments = doc.comments.unwrap();
        assert_eq!(comments[0].author, "Anna");
        assert_eq!(comments[0].content, "Lekker!");
        assert_eq!(source.queries("comments"), vec![vec![("post".to_string(), "42".to_string())]]);
    }

    #[tokio::test]
    async fn unknown_tag_fails_only_that_post() {
        let cfg = cfg();
        let tables = tables(pasta_export());
        let source = MockSource::new();
        let converter = MockConverter::new();
        let ctx = PipelineCtx { cfg: &cfg, tables: &tables, source: &source, converter: &converter };

        let err = process_post(&ctx, &post(2, "Soep", "<p>x</p>", &[99])).await.unwrap_err();
        assert_eq!(err.stage, Stage::Enrich);
        assert_eq!(err.post_id, 2);
    }

    #[tokio::test]
    async fn execute_writes_one_file_per_successful_post() {
        let cfg = cfg();
        let tables = tables(pasta_export());
        let source = MockSource::new();
        let converter = MockConverter::failing_on("BROKEN");
        let ctx = PipelineCtx { cfg: &cfg, tables: &tables, source: &source, converter: &converter };
        let dir = tempfile::tempdir().unwrap();

        let posts = vec![
            post(1, "Pasta", "<p>ok</p>", &[3]),
            post(2, "Soep", "<p>BROKEN</p>", &[]),
            post(3, "Taart", "<p>fine</p>", &[7]),
            post(4, "Brood", "<p>bad tag</p>", &[1234]),
        ];
        let outcome = execute(&ctx, &posts, dir.path(), &CancellationToken::new()).await;

        assert_eq!(outcome.written.len(), 2);
        assert_eq!(outcome.recipes_matched, 1);
        let mut failed: Vec<(u64, Stage)> = outcome.failures.iter().map(|f| (f.post_id, f.stage)).collect();
        failed.sort_by_key(|(id, _)| *id);
        assert_eq!(failed, vec![(2, Stage::Convert), (4, Stage::Enrich)]);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
        assert_eq!(files.len(), 2);
        for f in files {
            let v: Value = serde_json::from_str(&std::fs::read_to_string(&f).unwrap()).unwrap();
            assert!(["post-1", "post-3"].contains(&v["uid"].as_str().unwrap()));
            assert_eq!(v["lang"], "nl-nl");
        }
    }

    struct StallingConverter;

    #[async_trait]
    impl Converter for StallingConverter {
        async fn convert(&self, html: &str) -> Result<StructuredContent, MigrationError> {
            if html.contains("slow") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(StructuredContent(json!([])))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_post_times_out_without_blocking_others() {
        let cfg = MigrationConfig { post_timeout: Duration::from_secs(10), ..cfg() };
        let tables = tables(pasta_export());
        let source = MockSource::new();
        let converter = StallingConverter;
        let ctx = PipelineCtx { cfg: &cfg, tables: &tables, source: &source, converter: &converter };

        let posts = vec![post(1, "A", "<p>slow</p>", &[]), post(2, "B", "<p>quick</p>", &[])];
        let results = process_all(&ctx, &posts, &CancellationToken::new()).await;

        assert_eq!(results.len(), 2);
        for (idx, res) in results {
            match idx {
                0 => assert_eq!(res.unwrap_err().stage, Stage::Timeout),
                _ => assert!(res.is_ok()),
            }
        }
    }

    #[tokio::test]
    async fn cancelled_run_reports_every_post() {
        let cfg = cfg();
        let tables = tables(pasta_export());
        let source = MockSource::new();
        let converter = StallingConverter;
        let ctx = PipelineCtx { cfg: &cfg, tables: &tables, source: &source, converter: &converter };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let posts = vec![post(1, "A", "<p>slow</p>", &[]), post(2, "B", "<p>slow</p>", &[])];
        let results = process_all(&ctx, &posts, &cancel).await;
        assert!(results.iter().all(|(_, r)| matches!(r, Err(f) if f.stage == Stage::Cancelled)));
    }
}
