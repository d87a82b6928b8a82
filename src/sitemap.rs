//! Builds `sitemap.xml` following the sitemaps.org protocol.

use crate::model::Article;
use crate::unit::detail_file_name;
use chrono::NaiveDate;
use quick_xml::escape::escape;
use url::Url;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds the sitemap for a site served from `base_url`, which must end with
/// `/` and carry no query or fragment (see [`crate::config::RenderConfig`]).
/// The site root comes first with `today` as its modification date, followed
/// by one entry per article in the order given.
pub fn build_sitemap(base_url: &Url, articles: &[Article], today: NaiveDate) -> String {
    let mut lines: Vec<String> = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_owned(),
        r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#.to_owned(),
    ];
    push_url(
        &mut lines,
        base_url.as_str(),
        &today.format(DATE_FORMAT).to_string(),
        "weekly",
        "1.0",
    );
    for article in articles {
        push_url(
            &mut lines,
            &format!("{}{}", base_url.as_str(), detail_file_name(article.id)),
            &article.published_at.format(DATE_FORMAT).to_string(),
            "monthly",
            "0.8",
        );
    }
    lines.push("</urlset>".to_owned());
    lines.join("\n")
}

fn push_url(lines: &mut Vec<String>, loc: &str, lastmod: &str, changefreq: &str, priority: &str) {
    lines.push("  <url>".to_owned());
    lines.push(format!("    <loc>{}</loc>", escape(loc)));
    lines.push(format!("    <lastmod>{}</lastmod>", lastmod));
    lines.push(format!("    <changefreq>{}</changefreq>", changefreq));
    lines.push(format!("    <priority>{}</priority>", priority));
    lines.push("  </url>".to_owned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::article;
    use pretty_assertions::assert_eq;

    #[test]
    fn root_then_articles() {
        let base = Url::parse("https://pangu-immortal.github.io/").unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let xml = build_sitemap(&base, &[article(9, 20), article(3, 2)], today);
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://pangu-immortal.github.io/</loc>
    <lastmod>2024-06-01</lastmod>
    <changefreq>weekly</changefreq>
    <priority>1.0</priority>
  </url>
  <url>
    <loc>https://pangu-immortal.github.io/article_9.html</loc>
    <lastmod>2024-01-20</lastmod>
    <changefreq>monthly</changefreq>
    <priority>0.8</priority>
  </url>
  <url>
    <loc>https://pangu-immortal.github.io/article_3.html</loc>
    <lastmod>2024-01-02</lastmod>
    <changefreq>monthly</changefreq>
    <priority>0.8</priority>
  </url>
</urlset>"#
        );
    }

    #[test]
    fn escapes_locations() {
        let base = Url::parse("https://example.org/a&b/").unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let xml = build_sitemap(&base, &[article(4, 3)], today);
        assert!(xml.contains("<loc>https://example.org/a&amp;b/</loc>"), "{}", xml);
        assert!(xml.contains("<loc>https://example.org/a&amp;b/article_4.html</loc>"), "{}", xml);
    }
}
