//! HTML-subset to markdown translation for post titles and bodies.

use std::sync::OnceLock;

use regex::Regex;

/// Literal replacements, applied in order.
const TAGS: &[(&str, &str)] = &[
    ("<em>", "**"),
    ("</em>", "**"),
    ("<p>", ""),
    ("</p>", ""),
    ("<strong>", "**"),
    ("</strong>", "**"),
    ("<br>", "\n"),
    ("<br/>", "\n"),
    ("<br />", "\n"),
    ("&nbsp;", " "),
    ("<ol>", ""),
    ("</ol>", ""),
    ("<li>", "- "),
    ("</li>", ""),
    ("<ul>", ""),
    ("</ul>", "\n"),
];

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<a href="([^"]+)"(?: target="_blank")?>([^<]+)</a>"#)
            .expect("valid link regex")
    })
}

fn font_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<font color="[^"]+">([^<]+)</font>"#).expect("valid font regex")
    })
}

/// Translate the supported HTML subset into markdown.
///
/// Unknown tags are left untouched.
pub fn translate(input: &str) -> String {
    let mut output = input.to_string();
    for (tag, replacement) in TAGS {
        output = output.replace(tag, replacement);
    }

    let output = link_regex().replace_all(&output, "[$2]($1)");
    let output = font_regex().replace_all(&output, "$1");
    output.into_owned()
}
