use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// A post as served by `wp/v2/posts`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcePost {
    pub id: u64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
    #[serde(default)]
    pub jetpack_featured_media_url: Option<String>,
    #[serde(default, rename = "_yoast_wpseo_title")]
    pub seo_title: Option<String>,
    #[serde(default, rename = "_yoast_wpseo_metadesc")]
    pub seo_description: Option<String>,
}

impl SourcePost {
    pub fn featured_image(&self) -> Option<&str> {
        non_empty(self.jetpack_featured_media_url.as_deref())
    }

    /// SEO title override, falling back to the rendered title.
    pub fn og_title(&self) -> &str {
        non_empty(self.seo_title.as_deref()).unwrap_or(&self.title.rendered)
    }

    pub fn og_description(&self) -> Option<&str> {
        non_empty(self.seo_description.as_deref())
    }
}

/// Tag or category record; both endpoints share the shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaxonomyTerm {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceComment {
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub content: Rendered,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_decodes_wordpress_shape() {
        let raw = json!({
            "id": 12,
            "slug": "pasta",
            "date": "2020-03-01T10:00:00",
            "title": {"rendered": "Pasta"},
            "excerpt": {"rendered": "<p>Quick</p>"},
            "content": {"rendered": "<p>Hello</p>", "protected": false},
            "categories": [3],
            "tags": [7, 9],
            "jetpack_featured_media_url": "",
            "_yoast_wpseo_metadesc": "Fast pasta"
        });
        let post: SourcePost = serde_json::from_value(raw).unwrap();
        assert_eq!(post.id, 12);
        assert_eq!(post.tags, vec![7, 9]);
        assert_eq!(post.featured_image(), None);
        assert_eq!(post.og_title(), "Pasta");
        assert_eq!(post.og_description(), Some("Fast pasta"));
    }

    #[test]
    fn seo_title_overrides_rendered_title() {
        let raw = json!({"id": 1, "title": {"rendered": "Plain"}, "_yoast_wpseo_title": "Better"});
        let post: SourcePost = serde_json::from_value(raw).unwrap();
        assert_eq!(post.og_title(), "Better");
    }
}
