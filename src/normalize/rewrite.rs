use std::sync::LazyLock;

use regex::Regex;

/// One textual cleanup. Later patterns assume earlier ones already ran.
struct Cleanup {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

fn cleanup(name: &'static str, pattern: &str, replacement: &'static str) -> Cleanup {
    Cleanup { name, pattern: Regex::new(pattern).expect("valid cleanup pattern"), replacement }
}

static CLEANUPS: LazyLock<Vec<Cleanup>> = LazyLock::new(|| {
    vec![
        cleanup("body_tags", r"</?body>", ""),
        cleanup("line_breaks", r"\r?\n|\r", ""),
        cleanup("empty_paragraphs", r"<p>(?:\s|&nbsp;|\u{a0})*</p>", ""),
        cleanup("en_dash_escape", r"\\u2013", "<br>-"),
        cleanup("wink", r";-\)", "😉"),
        cleanup("read_more_paragraph", r#"<p><span id="more-\d+"></span></p>"#, ""),
        cleanup("read_more", r#"<span id="more-\d+"></span>"#, ""),
        cleanup("block_comments", r"<!--\s*/?wp:(?:paragraph|more)\s*-->|<!--more-->", ""),
        cleanup("link_rel", r#"rel="(?:noreferrer noopener|noopener noreferrer)""#, r#"rel="noopener""#),
    ]
});

pub fn apply(html: &str) -> String {
    let mut out = html.to_string();
    for step in CLEANUPS.iter() {
        out = step.pattern.replace_all(&out, step.replacement).into_owned();
    }
    out
}

#[cfg(test)]
fn apply_step(name: &str, html: &str) -> String {
    let step = CLEANUPS.iter().find(|c| c.name == name).unwrap();
    step.pattern.replace_all(html, step.replacement).into_owned()
}
