//! Cleans rendered WordPress post markup before it goes to the converter.

mod dom;
mod rewrite;

use scraper::Html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub html: String,
    pub image: Option<String>,
}

/// Strip presentational noise from rendered post HTML and pick a representative image.
///
/// Posts carrying a recipe widget lose the widget (recipe data comes from the
/// export instead) and skip image extraction, since their image is the cover.
pub fn normalize(raw: &str) -> Normalized {
    let mut doc = Html::parse_document(raw);

    let has_recipe = dom::contains(&doc, dom::RECIPE_CONTAINER);
    let image = if has_recipe { None } else { dom::extract_image(&doc) };
    if has_recipe {
        dom::remove_all(&mut doc, dom::RECIPE_CONTAINER);
    }
    dom::remove_images(&mut doc);
    dom::unwrap_emphasis(&mut doc);

    let html = rewrite::apply(&dom::body_html(&doc));
    Normalized { html, image }
}

/// Plain text of an HTML fragment with whitespace collapsed; decodes entities.
pub fn plain_text(html: &str) -> String {
    let frag = Html::parse_fragment(html);
    let text = frag.root_element().text().collect::<String>();
    collapse_whitespace(&text)
}

fn collapse_whitespace(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                if !buf.is_empty() { buf.push(' '); }
                in_ws = true;
            }
        } else {
            buf.push(ch);
            in_ws = false;
        }
    }
    buf.trim().to_string()
}
