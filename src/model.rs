//! Defines the content records exported from the blog database: [`Article`],
//! [`Tag`], [`Comment`], and [`BoardMessage`]. Every record except [`Tag`]
//! carries a `hidden` flag; only records with `hidden == false` ("visible"
//! records) may end up in generated output.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A blog article. The body is Markdown source; it is converted to HTML by
/// [`crate::markdown::to_html`] at render time.
#[derive(Clone, Debug, Deserialize)]
pub struct Article {
    pub id: u64,

    #[serde(default)]
    pub title: String,

    /// The Markdown source of the article.
    #[serde(default)]
    pub body: String,

    /// The cover image path relative to the media root, e.g.
    /// `covers/2024/05/cover.png`.
    #[serde(default)]
    pub cover: Option<String>,

    /// The IDs of the [`Tag`]s attached to the article.
    #[serde(default)]
    pub tags: Vec<u64>,

    pub published_at: DateTime<Utc>,

    #[serde(default)]
    pub hidden: bool,
}

impl Article {
    /// Returns true if the article carries the tag with the given ID.
    pub fn has_tag(&self, tag_id: u64) -> bool {
        self.tags.contains(&tag_id)
    }

    /// The first 200 characters of the raw Markdown source, followed by
    /// `...` if anything was cut off. Markup such as `#` or `**` is not
    /// stripped.
    pub fn summary(&self) -> String {
        const SUMMARY_CHARS: usize = 200;
        match self.body.char_indices().nth(SUMMARY_CHARS) {
            Some((i, _)) => format!("{}...", &self.body[..i]),
            None => self.body.clone(),
        }
    }
}

/// Orders articles by publish time, newest first, breaking ties by the
/// larger ID first. Every article sequence in the output uses this order.
pub fn article_order(a: &Article, b: &Article) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// A tag. Tag names are unique.
#[derive(Clone, Debug, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

/// An anonymous comment left under an [`Article`].
#[derive(Clone, Debug, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub article_id: u64,
    pub nickname: String,
    #[serde(default)]
    pub city: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub hidden: bool,

    /// The avatar image path relative to the media root, e.g.
    /// `avatars/icon_07.png`.
    #[serde(default)]
    pub avatar: String,
}

/// A message left on the site-wide message board. Same shape as a
/// [`Comment`] without the article.
#[derive(Clone, Debug, Deserialize)]
pub struct BoardMessage {
    pub id: u64,
    pub nickname: String,
    #[serde(default)]
    pub city: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub avatar: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn article(id: u64, day: u32) -> Article {
        Article {
            id,
            title: format!("Article {}", id),
            body: format!("Body of article {}", id),
            cover: None,
            tags: Vec::new(),
            published_at: Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap(),
            hidden: false,
        }
    }

    #[test]
    fn orders_newest_first_with_id_tiebreak() {
        let mut articles = vec![article(1, 3), article(2, 5), article(3, 3)];
        articles.sort_by(article_order);
        let ids: Vec<u64> = articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn summary_truncates_on_char_boundary() {
        let mut a = article(1, 1);
        a.body = "道".repeat(250);
        let summary = a.summary();
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 203);

        a.body = "short".to_owned();
        assert_eq!(a.summary(), "short");
    }

    #[test]
    fn summary_is_raw_markdown() {
        let mut a = article(1, 1);
        a.body = "# Title\n\n**bold**".to_owned();
        assert_eq!(a.summary(), "# Title\n\n**bold**");
    }
}
