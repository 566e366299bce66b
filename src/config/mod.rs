use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://domainemalpaskookt.com/wp-json/wp/v2";
const DEFAULT_OUTPUT_DIR: &str = "./import";
const DEFAULT_CONVERTER: &str = "ruby";
const DEFAULT_CONVERTER_SCRIPT: &str = "./htmlParser.rb";
const DEFAULT_RECIPE_EXPORT: &str = "./recipes.json";
const DEFAULT_CATEGORY_TABLE: &str = "./categories.json";
const DEFAULT_LANGUAGE_TAG: &str = "nl-NL";
const DEFAULT_DOCUMENT_TYPE: &str = "blog_post";
const DEFAULT_CATEGORY_MASK: &str = "category";
const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_POST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// WordPress serves at most 100 records per page.
pub const PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug)]
pub struct MigrationConfig {
    pub api_base: String,
    pub page_size: u32,
    pub excluded_category: Option<u64>,
    pub output_dir: PathBuf,
    pub converter_program: String,
    pub converter_args: Vec<String>,
    pub recipe_export_path: PathBuf,
    pub category_table_path: PathBuf,
    pub language_tag: String,
    pub document_type: String,
    pub category_mask: String,
    pub concurrency: usize,
    pub post_timeout: Duration,
    pub http_timeout: Duration,
    pub include_comments: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: PAGE_SIZE,
            excluded_category: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            converter_program: DEFAULT_CONVERTER.to_string(),
            converter_args: vec![DEFAULT_CONVERTER_SCRIPT.to_string()],
            recipe_export_path: PathBuf::from(DEFAULT_RECIPE_EXPORT),
            category_table_path: PathBuf::from(DEFAULT_CATEGORY_TABLE),
            language_tag: DEFAULT_LANGUAGE_TAG.to_string(),
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            category_mask: DEFAULT_CATEGORY_MASK.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            post_timeout: Duration::from_secs(DEFAULT_POST_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            include_comments: false,
        }
    }
}

impl MigrationConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Overlay `WPM_*` values onto the defaults. Unparseable numbers keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(base) = lookup("WPM_API_BASE") {
            cfg.api_base = base;
        }
        if let Some(id) = lookup("WPM_EXCLUDED_CATEGORY") {
            if let Ok(parsed) = id.parse::<u64>() {
                cfg.excluded_category = Some(parsed);
            }
        }
        if let Some(dir) = lookup("WPM_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(dir);
        }
        if let Some(program) = lookup("WPM_CONVERTER") {
            cfg.converter_program = program;
        }
        if let Some(args) = lookup("WPM_CONVERTER_ARGS") {
            cfg.converter_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(path) = lookup("WPM_RECIPE_EXPORT") {
            cfg.recipe_export_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("WPM_CATEGORY_TABLE") {
            cfg.category_table_path = PathBuf::from(path);
        }
        if let Some(tag) = lookup("WPM_LANGUAGE_TAG") {
            cfg.language_tag = tag;
        }
        if let Some(kind) = lookup("WPM_DOCUMENT_TYPE") {
            cfg.document_type = kind;
        }
        if let Some(n) = lookup("WPM_CONCURRENCY") {
            if let Ok(parsed) = n.parse::<usize>() {
                cfg.concurrency = parsed;
            }
        }
        if let Some(secs) = lookup("WPM_POST_TIMEOUT_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                cfg.post_timeout = Duration::from_secs(parsed);
            }
        }
        if let Some(secs) = lookup("WPM_HTTP_TIMEOUT_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                cfg.http_timeout = Duration::from_secs(parsed);
            }
        }
        if let Some(v) = lookup("WPM_INCLUDE_COMMENTS") {
            cfg.include_comments = v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes");
        }
        cfg.concurrency = cfg.concurrency.max(1);
        cfg
    }

    /// Lowercased language tag as stored in the document (`nl-NL` -> `nl-nl`).
    pub fn document_lang(&self) -> String {
        self.language_tag.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_build_time_values() {
        let cfg = MigrationConfig::default();
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.language_tag, "nl-NL");
        assert_eq!(cfg.document_lang(), "nl-nl");
        assert_eq!(cfg.converter_args, vec!["./htmlParser.rb".to_string()]);
        assert!(cfg.excluded_category.is_none());
    }

    #[test]
    fn env_overlays_and_ignores_bad_numbers() {
        let cfg = MigrationConfig::from_lookup(lookup_from(&[
            ("WPM_EXCLUDED_CATEGORY", "42"),
            ("WPM_CONCURRENCY", "not-a-number"),
            ("WPM_POST_TIMEOUT_SECS", "5"),
            ("WPM_CONVERTER_ARGS", "-r json parser.rb"),
            ("WPM_INCLUDE_COMMENTS", "yes"),
        ]));
        assert_eq!(cfg.excluded_category, Some(42));
        assert_eq!(cfg.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(cfg.post_timeout, Duration::from_secs(5));
        assert_eq!(cfg.converter_args, vec!["-r", "json", "parser.rb"]);
        assert!(cfg.include_comments);
    }

    #[test]
    fn concurrency_never_drops_below_one() {
        let cfg = MigrationConfig::from_lookup(lookup_from(&[("WPM_CONCURRENCY", "0")]));
        assert_eq!(cfg.concurrency, 1);
    }
}
