use std::sync::LazyLock;

use regex::Regex;

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid hashtag pattern"));

/// Tags in order of appearance, duplicates preserved, without the `#`.
pub fn extract_tags(text: &str) -> Vec<String> {
    HASHTAG
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Render a post body as HTML.
///
/// Each non-blank line becomes a paragraph; hashtags become links to their
/// tag page. Tags are found in the raw text and every other segment is
/// escaped, so markup in the body can never produce a tag or a tag link.
pub fn render_post_content(text: &str) -> String {
    let mut html = String::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        html.push_str("<p>");
        render_line(line, &mut html);
        html.push_str("</p>");
    }
    html
}

fn render_line(line: &str, out: &mut String) {
    let mut last = 0;
    for caps in HASHTAG.captures_iter(line) {
        let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&html_escape::encode_text(&line[last..whole.start()]));
        let tag = html_escape::encode_double_quoted_attribute(tag.as_str());
        out.push_str(&format!(r#"<a href="/tags/{tag}" class="tag">#{tag}</a>"#));
        last = whole.end();
    }
    out.push_str(&html_escape::encode_text(&line[last..]));
}
