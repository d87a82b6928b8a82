//! Enumerates the files a generation run produces. Each [`OutputUnit`] is one
//! page (or the sitemap) and owns exactly one file name; [`enumerate`] checks
//! that no two units share a name before anything is written.
//!
//! All files live directly in the output root:
//!
//! * `index.html`, `about.html`, `board.html`, `sitemap.xml`
//! * `list.html`, `list_page_{n}.html` for the list of all articles
//! * `list_tag_{tag}.html`, `list_tag_{tag}_page_{n}.html` for each tag
//! * `article_{id}.html` for each article

use crate::model::{Article, Tag};
use crate::repository::Snapshot;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

pub const INDEX_FILE: &str = "index.html";
pub const ABOUT_FILE: &str = "about.html";
pub const BOARD_FILE: &str = "board.html";
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// One page of an article list.
#[derive(Debug)]
pub struct ListPage<'a> {
    /// The tag the list is filtered by, if any.
    pub tag: Option<&'a Tag>,

    /// The 1-based page number.
    pub number: usize,

    /// The number of pages in this list. Never less than 1.
    pub total: usize,

    /// The number of articles across all pages of this list.
    pub total_count: usize,

    /// The articles on this page, in list order.
    pub articles: Vec<&'a Article>,
}

#[derive(Debug)]
pub enum UnitKind<'a> {
    Index,
    List(ListPage<'a>),

    /// An article page. `position` is the article's index in the full list,
    /// used to link the neighbouring articles.
    Detail {
        article: &'a Article,
        position: usize,
    },
    About,
    Board,
    Sitemap,
}

/// A single output file: what to render and where it goes.
#[derive(Debug)]
pub struct OutputUnit<'a> {
    pub kind: UnitKind<'a>,
    pub file_name: String,
}

/// Returns the file name for the article with the given ID.
pub fn detail_file_name(article_id: u64) -> String {
    format!("article_{}.html", article_id)
}

/// Returns the file name for page `page` (1-based) of the list filtered by
/// `tag`, or of the list of all articles if `tag` is `None`.
pub fn list_file_name(tag: Option<&Tag>, page: usize) -> String {
    match (tag, page) {
        (None, 1) => "list.html".to_owned(),
        (None, n) => format!("list_page_{}.html", n),
        (Some(tag), 1) => format!("list_tag_{}.html", tag_segment(&tag.name)),
        (Some(tag), n) => format!("list_tag_{}_page_{}.html", tag_segment(&tag.name), n),
    }
}

/// Returns the form of a tag name used in file names. Lowercase names made
/// only of letters, digits, `-`, and `_` are used verbatim. Anything else
/// (`/`, `..`, spaces, uppercase letters, reserved characters, or a name
/// ending in `_page_{n}` that would shadow another tag's page) is slugified
/// and suffixed with a hash of the original name, so the result is always a
/// single lowercase path segment and distinct names stay distinct even on
/// case-insensitive filesystems.
pub fn tag_segment(name: &str) -> Cow<str> {
    let safe = !name.is_empty()
        && !has_page_suffix(name)
        && name
            .chars()
            .all(|c| (c.is_alphanumeric() && !c.is_uppercase()) || c == '-' || c == '_');
    if safe {
        return Cow::Borrowed(name);
    }
    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    Cow::Owned(format!("{}-{}", slug::slugify(name), &digest[..8]))
}

// `_page_{digits}` at the end of a name, as in `list_tag_x_page_2.html`.
fn has_page_suffix(name: &str) -> bool {
    match name.rfind("_page_") {
        Some(i) => {
            let number = &name[i + "_page_".len()..];
            !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Splits `articles` into pages of `page_size`. An empty list still yields a
/// single empty page so every list has a first page to link to.
pub fn paginate<'a>(articles: &[&'a Article], page_size: usize) -> Vec<Vec<&'a Article>> {
    if articles.is_empty() {
        return vec![Vec::new()];
    }
    articles
        .chunks(page_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

fn list_units<'a>(
    tag: Option<&'a Tag>,
    articles: Vec<&'a Article>,
    page_size: usize,
) -> impl Iterator<Item = OutputUnit<'a>> {
    let total_count = articles.len();
    let pages = paginate(&articles, page_size);
    let total = pages.len();
    pages.into_iter().enumerate().map(move |(i, articles)| OutputUnit {
        file_name: list_file_name(tag, i + 1),
        kind: UnitKind::List(ListPage {
            tag,
            number: i + 1,
            total,
            total_count,
            articles,
        }),
    })
}

/// Lists every output unit for `snapshot`, in a fixed order: index, the
/// unfiltered list, each tag's list (tags in name order), article pages,
/// about, board, sitemap.
pub fn enumerate(snapshot: &Snapshot, page_size: usize) -> Result<Vec<OutputUnit<'_>>, Collision> {
    let mut units = vec![OutputUnit {
        kind: UnitKind::Index,
        file_name: INDEX_FILE.to_owned(),
    }];

    units.extend(list_units(None, snapshot.articles.iter().collect(), page_size));
    for tag in &snapshot.tags {
        units.extend(list_units(
            Some(tag),
            snapshot.articles_tagged(tag),
            page_size,
        ));
    }

    units.extend(
        snapshot
            .articles
            .iter()
            .enumerate()
            .map(|(position, article)| OutputUnit {
                kind: UnitKind::Detail { article, position },
                file_name: detail_file_name(article.id),
            }),
    );

    for (kind, file_name) in vec![
        (UnitKind::About, ABOUT_FILE),
        (UnitKind::Board, BOARD_FILE),
        (UnitKind::Sitemap, SITEMAP_FILE),
    ] {
        units.push(OutputUnit {
            kind,
            file_name: file_name.to_owned(),
        });
    }

    // Compared case-insensitively: the output may land on a filesystem that
    // folds case.
    let mut seen: HashSet<String> = HashSet::with_capacity(units.len());
    for unit in &units {
        if !seen.insert(unit.file_name.to_lowercase()) {
            return Err(Collision {
                file_name: unit.file_name.clone(),
            });
        }
    }
    Ok(units)
}

/// Returned when two output units would be written to the same file.
#[derive(Debug)]
pub struct Collision {
    pub file_name: String,
}

impl fmt::Display for Collision {
    /// Implements [`fmt::Display`] for [`Collision`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Two pages map to the same file '{}'", self.file_name)
    }
}

impl std::error::Error for Collision {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::article;
    use crate::repository::Content;
    use pretty_assertions::assert_eq;

    fn tag(id: u64, name: &str) -> Tag {
        Tag {
            id,
            name: name.to_owned(),
        }
    }

    fn snapshot(articles: Vec<Article>, tags: Vec<Tag>) -> Snapshot {
        Snapshot::capture(&Content {
            tags,
            articles,
            ..Content::default()
        })
        .unwrap()
    }

    fn file_names(units: &[OutputUnit]) -> Vec<String> {
        units.iter().map(|u| u.file_name.clone()).collect()
    }

    #[test]
    fn file_name_table() {
        let rust = tag(1, "rust");
        assert_eq!(list_file_name(None, 1), "list.html");
        assert_eq!(list_file_name(None, 3), "list_page_3.html");
        assert_eq!(list_file_name(Some(&rust), 1), "list_tag_rust.html");
        assert_eq!(list_file_name(Some(&rust), 2), "list_tag_rust_page_2.html");
        assert_eq!(detail_file_name(7), "article_7.html");
    }

    #[test]
    fn safe_tag_names_are_verbatim() {
        assert_eq!(tag_segment("rust"), "rust");
        assert_eq!(tag_segment("web_dev-2"), "web_dev-2");
        assert_eq!(tag_segment("x_page"), "x_page");
        assert_eq!(tag_segment("x_page_two"), "x_page_two");
        assert_eq!(tag_segment("随笔"), "随笔");
    }

    #[test]
    fn unsafe_tag_names_stay_in_one_segment() {
        for name in &["../etc", "a/b", "..", "", "c++", "a b", "x\\y"] {
            let segment = tag_segment(name);
            assert!(!segment.contains('/'), "{:?} -> {}", name, segment);
            assert!(!segment.contains('\\'), "{:?} -> {}", name, segment);
            assert!(!segment.contains(".."), "{:?} -> {}", name, segment);
        }
        assert_ne!(tag_segment("c++"), tag_segment("c#"));
        assert!(tag_segment("a/b").starts_with("a-b-"));
    }

    #[test]
    fn paginates_23_articles_into_three_pages() {
        let articles: Vec<Article> = (1..=23).map(|id| article(id, id as u32)).collect();
        let snapshot = snapshot(articles, Vec::new());
        let units = enumerate(&snapshot, 10).unwrap();

        let lists: Vec<&ListPage> = units
            .iter()
            .filter_map(|u| match &u.kind {
                UnitKind::List(page) if page.tag.is_none() => Some(page),
                _ => None,
            })
            .collect();
        assert_eq!(lists.len(), 3);

        let ids = |page: &ListPage| -> Vec<u64> { page.articles.iter().map(|a| a.id).collect() };
        assert_eq!(ids(lists[0]), (14..=23).rev().collect::<Vec<u64>>());
        assert_eq!(ids(lists[1]), (4..=13).rev().collect::<Vec<u64>>());
        assert_eq!(ids(lists[2]), vec![3, 2, 1]);
        assert!(lists.iter().all(|p| p.total == 3 && p.total_count == 23));

        let names = file_names(&units);
        assert!(names.contains(&"list.html".to_owned()));
        assert!(names.contains(&"list_page_2.html".to_owned()));
        assert!(names.contains(&"list_page_3.html".to_owned()));
        assert!(!names.contains(&"list_page_4.html".to_owned()));
    }

    #[test]
    fn empty_tag_still_gets_a_first_page() {
        let snapshot = snapshot(vec![article(1, 1)], vec![tag(1, "empty")]);
        let units = enumerate(&snapshot, 10).unwrap();
        let pages: Vec<&ListPage> = units
            .iter()
            .filter_map(|u| match &u.kind {
                UnitKind::List(page) if page.tag.is_some() => Some(page),
                _ => None,
            })
            .collect();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].total, 1);
        assert!(pages[0].articles.is_empty());
    }

    #[test]
    fn enumerates_every_unit_once() {
        let mut tagged = article(7, 9);
        tagged.tags = vec![1];
        let snapshot = snapshot(vec![article(1, 1), tagged], vec![tag(1, "rust")]);
        let units = enumerate(&snapshot, 10).unwrap();
        assert_eq!(
            file_names(&units),
            vec![
                "index.html",
                "list.html",
                "list_tag_rust.html",
                "article_7.html",
                "article_1.html",
                "about.html",
                "board.html",
                "sitemap.xml",
            ]
        );
    }

    #[test]
    fn page_suffixed_tags_do_not_shadow_other_pages() {
        let mut articles: Vec<Article> = (1..=11).map(|id| article(id, id as u32)).collect();
        for a in articles.iter_mut() {
            a.tags = vec![1, 2];
        }
        let snapshot = snapshot(articles, vec![tag(1, "x"), tag(2, "x_page_2")]);
        let names = file_names(&enumerate(&snapshot, 10).unwrap());

        assert!(names.contains(&"list_tag_x.html".to_owned()));
        assert!(names.contains(&"list_tag_x_page_2.html".to_owned()));
        let shadow = format!("list_tag_{}.html", tag_segment("x_page_2"));
        assert!(shadow.starts_with("list_tag_x-page-2-"), "{}", shadow);
        assert!(names.contains(&shadow));
    }

    #[test]
    fn names_differing_in_case_get_distinct_files() {
        let mut a = article(1, 1);
        a.tags = vec![1, 2];
        let snapshot = snapshot(vec![a], vec![tag(1, "Rust"), tag(2, "rust")]);
        let names = file_names(&enumerate(&snapshot, 10).unwrap());

        let tag_pages: Vec<&String> = names.iter().filter(|n| n.starts_with("list_tag_")).collect();
        assert_eq!(tag_pages.len(), 2, "{:?}", tag_pages);
        assert_ne!(tag_pages[0].to_lowercase(), tag_pages[1].to_lowercase());
        assert!(tag_pages.iter().all(|n| n.as_str() == n.to_lowercase()), "{:?}", tag_pages);
    }

    #[test]
    fn colliding_names_are_rejected() {
        // A tag literally named after another tag's hashed segment.
        let hashed = tag_segment("a b").into_owned();
        let snapshot = snapshot(Vec::new(), vec![tag(1, "a b"), tag(2, &hashed)]);
        match enumerate(&snapshot, 10) {
            Err(Collision { file_name }) => {
                assert_eq!(file_name, format!("list_tag_{}.html", hashed))
            }
            Ok(units) => panic!("expected a collision, got {:?}", file_names(&units)),
        }
    }
}
