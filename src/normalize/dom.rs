use scraper::node::Text;
use scraper::{Html, Node, Selector};

pub const RECIPE_CONTAINER: &str = ".wprm-recipe-container";
const DROPPED: &str = "img, figure, figcaption";
const EMPHASIS: &str = "strong, b";

pub fn contains(doc: &Html, selector: &str) -> bool {
    let Ok(sel) = Selector::parse(selector) else { return false };
    doc.select(&sel).next().is_some()
}

/// Detach every element matching `selector` from the tree.
pub fn remove_all(doc: &mut Html, selector: &str) {
    let Ok(sel) = Selector::parse(selector) else { return };
    let ids: Vec<_> = doc.select(&sel).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

pub fn remove_images(doc: &mut Html) {
    remove_all(doc, DROPPED);
}

/// Replace bold elements with their text content.
pub fn unwrap_emphasis(doc: &mut Html) {
    let Ok(sel) = Selector::parse(EMPHASIS) else { return };
    let targets: Vec<_> = doc
        .select(&sel)
        .map(|el| (el.id(), el.text().collect::<String>()))
        .collect();
    for (id, text) in targets {
        let Some(mut node) = doc.tree.get_mut(id) else { continue };
        if node.parent().is_none() {
            continue;
        }
        node.insert_before(Node::Text(Text { text: text.as_str().into() }));
        node.detach();
    }
}

/// Representative image: the widest `srcset` candidate of the first responsive
/// image, else the first plain `src`.
pub fn extract_image(doc: &Html) -> Option<String> {
    if let Ok(sel) = Selector::parse("img[srcset]") {
        let best = doc
            .select(&sel)
            .filter_map(|img| img.value().attr("srcset"))
            .find_map(widest_candidate);
        if best.is_some() {
            return best;
        }
    }
    let sel = Selector::parse("img[src]").ok()?;
    doc.select(&sel)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

fn widest_candidate(srcset: &str) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for candidate in srcset.split(',') {
        let mut parts = candidate.split_whitespace();
        let Some(url) = parts.next() else { continue };
        let size = parts
            .next()
            .and_then(|d| d.strip_suffix('w').or_else(|| d.strip_suffix('x')))
            .and_then(|n| n.parse::<f64>().ok())
            .unwrap_or(1.0);
        if best.map_or(true, |(s, _)| size > s) {
            best = Some((size, url));
        }
    }
    best.map(|(_, url)| url.to_string())
}

pub fn body_html(doc: &Html) -> String {
    let Ok(sel) = Selector::parse("body") else { return String::new() };
    doc.select(&sel).next().map(|body| body.html()).unwrap_or_default()
}
