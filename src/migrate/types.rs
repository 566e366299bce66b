use serde::Serialize;

use super::pipeline::PostFailure;

// Plan envelope types
#[derive(Serialize)]
pub struct PostSample { pub post_id: u64, pub slug: String, pub recipe: bool }

#[derive(Serialize)]
pub struct MigratePlan {
    pub posts: usize,
    pub excluded: usize,
    pub limited: usize,
    pub recipes_matched: usize,
    pub tags: usize,
    pub categories: usize,
    pub output_dir: String,
    pub sample_posts: Vec<PostSample>,
}

// Apply/result envelope types
#[derive(Serialize)]
pub struct MigrateResult {
    pub posts: usize,
    pub written: usize,
    pub failed: usize,
    pub recipes_matched: usize,
    pub failures: Vec<PostFailure>,
}
