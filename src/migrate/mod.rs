use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

use crate::config::MigrationConfig;
use crate::convert::ProcessConverter;
use crate::enrich::{CategoryTable, RecipeExport, TermTable};
use crate::telemetry::{self};
use crate::telemetry::ops::migrate::Phase as MigratePhase;
use crate::wp::types::SourcePost;
use crate::wp::{fetch_posts, fetch_terms, PageSource, WpClient};

mod pipeline;
mod types;
mod write;

pub use pipeline::{PipelineCtx, SharedTables};

#[derive(Args)]
pub struct MigrateCmd {
    #[arg(long, default_value_t=false)] pub apply: bool,
    /// Process at most N posts (after the category exclusion)
    #[arg(long)] pub limit: Option<usize>,
    #[arg(long)] pub concurrency: Option<usize>,
    /// Per-post time limit
    #[arg(long)] pub timeout_secs: Option<u64>,
    #[arg(long)] pub output_dir: Option<PathBuf>,
    #[arg(long)] pub exclude_category: Option<u64>,
    #[arg(long, default_value_t=false)] pub include_comments: bool,
    #[arg(long, default_value_t=10)] pub plan_limit: usize,
}

impl MigrateCmd {
    /// Flags win over `WPM_*` environment values.
    fn overlay(&self, mut cfg: MigrationConfig) -> MigrationConfig {
        if let Some(n) = self.concurrency { cfg.concurrency = n.max(1); }
        if let Some(secs) = self.timeout_secs { cfg.post_timeout = Duration::from_secs(secs); }
        if let Some(dir) = &self.output_dir { cfg.output_dir = dir.clone(); }
        if let Some(id) = self.exclude_category { cfg.excluded_category = Some(id); }
        if self.include_comments { cfg.include_comments = true; }
        cfg
    }
}

pub async fn run(args: MigrateCmd) -> Result<()> {
    let cfg = args.overlay(MigrationConfig::from_env());
    let log = telemetry::migrate();
    let _g = log.root_span_kv([
        ("apply", args.apply.to_string()),
        ("api_base", cfg.api_base.clone()),
        ("limit", format!("{:?}", args.limit)),
        ("concurrency", cfg.concurrency.to_string()),
        ("excluded_category", format!("{:?}", cfg.excluded_category)),
    ]).entered();
    let t0 = Instant::now();

    let base = Url::parse(&cfg.api_base).with_context(|| format!("invalid API base {:?}", cfg.api_base))?;
    if !matches!(base.scheme(), "http" | "https") {
        bail!("unsupported API scheme: {}", base.scheme());
    }
    let client = WpClient::new(base.as_str(), cfg.http_timeout)?;

    let tables = load_tables(&client, &cfg).await?;
    let all_posts = fetch_posts(&client, cfg.page_size)
        .instrument(log.span(&MigratePhase::FetchPosts))
        .await
        .context("fetching posts")?;
    let selection = select_posts(all_posts, cfg.excluded_category, args.limit);

    if !args.apply {
        return report_plan(&cfg, &tables, &selection, args.plan_limit);
    }

    let converter = ProcessConverter::new(cfg.converter_program.clone(), cfg.converter_args.clone());
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            telemetry::migrate().warn("🛑 Interrupt received, cancelling outstanding posts");
            on_signal.cancel();
        }
    });

    let ctx = PipelineCtx { cfg: &cfg, tables: &tables, source: &client, converter: &converter };
    let result = apply(&ctx, &selection.posts, &cfg.output_dir, &cancel).await?;

    if telemetry::config::json_mode() {
        log.result_timed(&result, t0.elapsed().as_millis())?;
    }
    if result.failed > 0 {
        bail!("{} of {} posts failed to migrate", result.failed, result.posts);
    }
    Ok(())
}

/// Tags and categories come from the source; the category map and recipe export from disk.
pub async fn load_tables(source: &dyn PageSource, cfg: &MigrationConfig) -> Result<SharedTables> {
    let log = telemetry::migrate();
    let (tags, categories) = async {
        tokio::try_join!(
            fetch_terms(source, "tags", cfg.page_size),
            fetch_terms(source, "categories", cfg.page_size),
        )
    }
    .instrument(log.span(&MigratePhase::FetchTaxonomy))
    .await
    .context("fetching taxonomies")?;

    let _s = log.span(&MigratePhase::LoadTables).entered();
    let raw = read_file(&cfg.category_table_path).await?;
    let category_table = CategoryTable::from_json(&raw)
        .with_context(|| format!("parsing category table {}", cfg.category_table_path.display()))?;
    let raw = read_file(&cfg.recipe_export_path).await?;
    let recipes = RecipeExport::from_json(&raw)
        .with_context(|| format!("parsing recipe export {}", cfg.recipe_export_path.display()))?;

    log.info_kv("📚 Lookup tables loaded", [
        ("tags", tags.len().to_string()),
        ("categories", categories.len().to_string()),
        ("category_links", category_table.len().to_string()),
        ("recipes", recipes.len().to_string()),
    ]);
    Ok(SharedTables {
        tags: TermTable::new("tag", tags),
        categories: TermTable::new("category", categories),
        category_table,
        recipes,
    })
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

/// Posts left after the category exclusion and the `--limit` cut, with what each step removed.
pub struct Selection {
    pub posts: Vec<SourcePost>,
    pub excluded: usize,
    pub limited: usize,
}

/// Drop posts in the excluded category, then cap the count.
pub fn select_posts(posts: Vec<SourcePost>, excluded: Option<u64>, limit: Option<usize>) -> Selection {
    let fetched = posts.len();
    let mut kept: Vec<SourcePost> = posts
        .into_iter()
        .filter(|p| excluded.is_none_or(|id| !p.categories.contains(&id)))
        .collect();
    let eligible = kept.len();
    kept.truncate(limit.unwrap_or(usize::MAX));
    Selection { excluded: fetched - eligible, limited: eligible - kept.len(), posts: kept }
}

fn build_plan(cfg: &MigrationConfig, tables: &SharedTables, selection: &Selection, plan_limit: usize) -> types::MigratePlan {
    use types::{MigratePlan, PostSample};
    let has_recipe = |p: &SourcePost| tables.recipes.find(&p.title.rendered).is_some();
    let posts = &selection.posts;
    MigratePlan {
        posts: posts.len(),
        excluded: selection.excluded,
        limited: selection.limited,
        recipes_matched: posts.iter().filter(|p| has_recipe(p)).count(),
        tags: tables.tags.len(),
        categories: tables.categories.len(),
        output_dir: cfg.output_dir.display().to_string(),
        sample_posts: posts.iter().take(plan_limit)
            .map(|p| PostSample { post_id: p.id, slug: p.slug.clone(), recipe: has_recipe(p) })
            .collect(),
    }
}

fn report_plan(cfg: &MigrationConfig, tables: &SharedTables, selection: &Selection, plan_limit: usize) -> Result<()> {
    let log = telemetry::migrate();
    let _s = log.span(&MigratePhase::Plan).entered();
    let plan = build_plan(cfg, tables, selection, plan_limit);

    if telemetry::config::json_mode() {
        log.plan(&plan)?;
    } else {
        log.info(format!(
            "📝 Migrate plan — posts={} excluded={} limited={} recipes={} out={}",
            plan.posts, plan.excluded, plan.limited, plan.recipes_matched, plan.output_dir
        ));
        for p in &plan.sample_posts { log.info(format!("  post_id={} slug={} recipe={}", p.post_id, p.slug, p.recipe)); }
        if plan.posts > plan_limit { log.info(format!("  ... ({} more)", plan.posts - plan_limit)); }
        log.info("   Use --apply to execute.");
    }
    Ok(())
}

/// Apply mode: run the pipeline over `posts` and write one file per successful post.
pub async fn apply(
    ctx: &PipelineCtx<'_>,
    posts: &[SourcePost],
    out_dir: &Path,
    cancel: &CancellationToken,
) -> Result<types::MigrateResult> {
    let log = telemetry::migrate();
    write::ensure_dir(out_dir).await?;

    let outcome = pipeline::execute(ctx, posts, out_dir, cancel).await;
    log.totals(posts.len(), outcome.written.len(), outcome.failures.len(), outcome.recipes_matched);

    Ok(types::MigrateResult {
        posts: posts.len(),
        written: outcome.written.len(),
        failed: outcome.failures.len(),
        recipes_matched: outcome.recipes_matched,
        failures: outcome.failures,
    })
}
