//! Converts article Markdown into HTML that is safe to embed in a page.

use crate::config::RenderConfig;
use pulldown_cmark::{html, Options, Parser};

/// The Markdown extensions enabled for article bodies. Fenced code blocks
/// are part of CommonMark and need no flag; their info string becomes a
/// `language-*` class on the `<code>` element.
pub fn extensions() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Converts `markdown` to HTML using the extension set in `config`, then
/// cleans the result with `config.policy`. This is the only way Markdown
/// becomes HTML in this crate; article pages never embed unsanitized output.
pub fn to_html(config: &RenderConfig, markdown: &str) -> String {
    let mut raw = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut raw, Parser::new_ext(markdown, config.extensions));
    config.policy.clean(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn render(markdown: &str) -> String {
        let config = RenderConfig::new(Url::parse("https://example.org/").unwrap());
        to_html(&config, markdown)
    }

    #[test]
    fn heading_survives_and_script_does_not() {
        let html = render("# Title\n\n<script>alert(1)</script>\n\nBody text");
        assert!(html.contains("<h1>Title</h1>"), "{}", html);
        assert!(html.contains("<p>Body text</p>"), "{}", html);
        assert!(!html.contains("<script"), "{}", html);
        assert!(!html.contains("alert(1)"), "{}", html);
    }

    #[test]
    fn inline_handlers_and_iframes_are_removed() {
        let html = render(
            "<p onclick=\"steal()\">click</p>\n\n<iframe src=\"https://evil.example\"></iframe>\n\ntext with <b onmouseover=\"x()\">bold</b>",
        );
        assert!(!html.contains("onclick=\""), "{}", html);
        assert!(!html.contains("onmouseover"), "{}", html);
        assert!(!html.contains("<iframe"), "{}", html);
        assert!(html.contains("<b>bold</b>"), "{}", html);
    }

    #[test]
    fn handler_text_in_prose_stays_text() {
        let html = render("write `onclick=\"x\"` in prose");
        assert!(html.starts_with("<p>write <code>onclick=\"x\"</code> in prose</p>"), "{}", html);
    }

    #[test]
    fn fenced_code_is_annotated_with_language() {
        let html = render("```rust\nfn main() {}\n```\n");
        assert!(html.contains(r#"<pre><code class="language-rust">fn main() {}"#), "{}", html);
    }

    #[test]
    fn tables_render() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"), "{}", html);
        assert!(html.contains("<th>a</th>"), "{}", html);
        assert!(html.contains("<td>2</td>"), "{}", html);
    }

    #[test]
    fn footnotes_and_definition_lists_keep_their_text() {
        let html = render("Claim[^1].\n\n[^1]: Source.\n\nTerm\n: Definition\n");
        assert!(html.contains("Source."), "{}", html);
        assert!(html.contains("Definition"), "{}", html);
        assert!(!html.contains("<div"), "{}", html);
        assert!(!html.contains("<dl"), "{}", html);
    }

    #[test]
    fn images_keep_source_and_alt_only() {
        let html = render("![cover](media/covers/a.png \"title\")");
        assert!(html.contains(r#"<img src="media/covers/a.png" alt="cover""#), "{}", html);
        assert!(!html.contains("title="), "{}", html);
    }
}
