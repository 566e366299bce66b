use chrono::NaiveDateTime;
use serde::Serialize;

use crate::convert::StructuredContent;
use crate::enrich::{CategoryRef, RecipeBlock};
use crate::normalize::plain_text;
use crate::wp::types::{SourceComment, SourcePost};

const WP_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageField {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialCard {
    pub social_card_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_card_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_card_image: Option<ImageField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentEntry {
    pub author: String,
    pub date: String,
    pub content: String,
}

impl From<&SourceComment> for CommentEntry {
    fn from(c: &SourceComment) -> Self {
        CommentEntry { author: c.author_name.clone(), date: c.date.clone(), content: plain_text(&c.content.rendered) }
    }
}

/// One target-CMS document per source post, written once.
#[derive(Debug, Clone, Serialize)]
pub struct OutputDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: String,
    pub lang: String,
    pub source_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    pub title: StructuredContent,
    pub intro: StructuredContent,
    pub body: StructuredContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    pub tags: Vec<String>,
    pub categories: Vec<CategoryRef>,
    #[serde(flatten)]
    pub recipe: Option<RecipeBlock>,
    pub social_cards: Vec<SocialCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentEntry>>,
}

/// Everything the pipeline stages produced for a post.
#[derive(Debug, Clone)]
pub struct Enriched {
    pub body: StructuredContent,
    pub content_image: Option<String>,
    pub tags: Vec<String>,
    pub categories: Vec<CategoryRef>,
    pub recipe: Option<RecipeBlock>,
    pub comments: Option<Vec<SourceComment>>,
}

impl OutputDocument {
    pub fn assemble(post: &SourcePost, kind: &str, lang: &str, parts: Enriched) -> Self {
        let title = plain_text(&post.title.rendered);
        // Recipe posts keep no inline image; their cover is the featured media.
        let image = parts
            .content_image
            .or_else(|| post.featured_image().map(str::to_string))
            .map(|url| ImageField { url });
        let social_image = post
            .featured_image()
            .map(|url| ImageField { url: url.to_string() })
            .or_else(|| image.clone());

        OutputDocument {
            kind: kind.to_string(),
            uid: post.slug.clone(),
            lang: lang.to_string(),
            source_id: post.id,
            publication_date: publication_date(&post.date),
            title: StructuredContent::heading1(&title),
            intro: StructuredContent::paragraph(&plain_text(&post.excerpt.rendered)),
            body: parts.body,
            image,
            tags: parts.tags,
            categories: parts.categories,
            recipe: parts.recipe,
            social_cards: vec![SocialCard {
                social_card_title: plain_text(post.og_title()),
                social_card_description: post.og_description().map(str::to_string),
                social_card_image: social_image,
            }],
            comments: parts.comments.map(|cs| cs.iter().map(CommentEntry::from).collect()),
        }
    }
}

fn publication_date(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw, WP_DATE_FORMAT)
        .ok()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(value: serde_json::Value) -> SourcePost {
        serde_json::from_value(value).unwrap()
    }

    fn parts(body: StructuredContent) -> Enriched {
        Enriched { body, content_image: None, tags: vec![], categories: vec![], recipe: None, comments: None }
    }

    #[test]
    fn assembles_schema_fields() {
        let p = post(json!({
            "id": 5, "slug": "pasta-pesto", "date": "2021-06-30T18:45:00",
            "title": {"rendered": "Pasta &amp; pesto"},
            "excerpt": {"rendered": "<p>Snel klaar.</p>\n"},
            "jetpack_featured_media_url": "https://cdn.test/cover.jpg",
            "_yoast_wpseo_metadesc": "Groene pasta"
        }));
        let doc = OutputDocument::assemble(&p, "blog_post", "nl-nl", parts(StructuredContent(json!([]))));
        let v = serde_json::to_value(&doc).unwrap();

        assert_eq!(v["type"], "blog_post");
        assert_eq!(v["uid"], "pasta-pesto");
        assert_eq!(v["lang"], "nl-nl");
        assert_eq!(v["publication_date"], "2021-06-30");
        assert_eq!(v["title"][0]["text"], "Pasta & pesto");
        assert_eq!(v["intro"][0]["text"], "Snel klaar.");
        assert_eq!(v["image"]["url"], "https://cdn.test/cover.jpg");
        assert_eq!(v["social_cards"][0]["social_card_title"], "Pasta & pesto");
        assert_eq!(v["social_cards"][0]["social_card_description"], "Groene pasta");
        assert!(v.get("recipe_ingredients").is_none());
        assert!(v.get("comments").is_none());
    }

    #[test]
    fn content_image_beats_featured_media() {
        let p = post(json!({"id": 1, "jetpack_featured_media_url": "cover.jpg"}));
        let mut e = parts(StructuredContent(json!([])));
        e.content_image = Some("inline.jpg".into());
        let doc = OutputDocument::assemble(&p, "blog_post", "nl-nl", e);
        assert_eq!(doc.image, Some(ImageField { url: "inline.jpg".into() }));
        assert_eq!(doc.social_cards[0].social_card_image, Some(ImageField { url: "cover.jpg".into() }));
    }

    #[test]
    fn recipe_fields_are_flattened() {
        let p = post(json!({"id": 1}));
        let mut e = parts(StructuredContent(json!([])));
        e.recipe = Some(RecipeBlock { servings: Some("4".into()), ..RecipeBlock::default() });
        let v = serde_json::to_value(OutputDocument::assemble(&p, "blog_post", "nl-nl", e)).unwrap();
        assert_eq!(v["servings"], "4");
        assert!(v.get("recipe").is_none());
    }

    #[test]
    fn unparseable_date_is_omitted() {
        assert_eq!(publication_date("yesterday"), None);
    }
}
