use crate::config::RenderConfig;
use crate::markdown;
use crate::model::{Article, BoardMessage, Comment, Tag};
use crate::repository::Snapshot;
use crate::sitemap::build_sitemap;
use crate::template::{self, PageRenderer};
use crate::unit::{detail_file_name, list_file_name, ListPage, OutputUnit, UnitKind};
use crate::value::{extend, markup, object, optional, text};
use chrono::{DateTime, NaiveDate, Utc};
use gtmpl_value::Value;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const STATIC_URL: &str = "static/";
const MEDIA_URL: &str = "media/";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Responsible for templating and writing single [`OutputUnit`]s to disk.
/// A [`Writer`] only reads from its fields, so one instance is shared by every
/// render worker.
pub struct Writer<'a, R: PageRenderer + ?Sized> {
    /// Renders page templates.
    pub renderer: &'a R,

    /// Decides how Markdown becomes HTML and where the site is served from.
    pub render_config: &'a RenderConfig,

    /// The content being exported.
    pub snapshot: &'a Snapshot,

    /// The site title. This is made available to every template, typically
    /// for the page header.
    pub site_title: &'a str,

    /// The author bio shown on the home page.
    pub bio: &'a str,

    /// The directory in which the output files will be written.
    pub output_directory: &'a Path,

    /// The date of the run, used as the site root's sitemap modification date.
    pub today: NaiveDate,
}

impl<R: PageRenderer + ?Sized> Writer<'_, R> {
    /// Renders a single [`OutputUnit`] and writes it to
    /// `{output_directory}/{file_name}`. Returns the path written.
    pub fn write_unit(&self, unit: &OutputUnit) -> Result<PathBuf> {
        let contents = self.render_unit(unit)?;
        let path = self.output_directory.join(&unit.file_name);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                path: dir.to_owned(),
                err,
            })?;
        }
        std::fs::write(&path, contents).map_err(|err| Error::Io {
            path: path.clone(),
            err,
        })?;
        debug!(file = %unit.file_name, "Wrote page");
        Ok(path)
    }

    /// Renders a single [`OutputUnit`] to a string without touching the disk.
    pub fn render_unit(&self, unit: &OutputUnit) -> Result<String> {
        // Article pages highlight the list entry in the site navigation.
        let (template, current_page, mut context) = match &unit.kind {
            UnitKind::Index => (
                template::INDEX,
                "index",
                object(vec![("bio", text(self.bio))]),
            ),
            UnitKind::List(page) => (template::LIST, "list", self.list_context(page)),
            UnitKind::Detail { article, position } => (
                template::DETAIL,
                "list",
                self.detail_context(article, *position),
            ),
            UnitKind::About => (template::ABOUT, "about", object(Vec::new())),
            UnitKind::Board => (template::BOARD, "board", self.board_context()),
            UnitKind::Sitemap => {
                return Ok(build_sitemap(
                    &self.render_config.base_url,
                    &self.snapshot.articles,
                    self.today,
                ))
            }
        };

        extend(
            &mut context,
            vec![
                ("is_static", Value::Bool(true)),
                ("current_page", Value::String(current_page.to_owned())),
                ("site_title", text(self.site_title)),
                ("static_url", markup(STATIC_URL.to_owned())),
                ("media_url", markup(MEDIA_URL.to_owned())),
            ],
        );
        Ok(self.renderer.render(template, context)?)
    }

    fn list_context(&self, page: &ListPage) -> Value {
        let prev_url = match page.number > 1 {
            true => Some(list_file_name(page.tag, page.number - 1)),
            false => None,
        };
        let next_url = match page.number < page.total {
            true => Some(list_file_name(page.tag, page.number + 1)),
            false => None,
        };

        object(vec![
            (
                "articles",
                Value::Array(page.articles.iter().map(|a| self.summarize(a)).collect()),
            ),
            (
                "tags",
                Value::Array(
                    self.snapshot
                        .tags
                        .iter()
                        .map(|t| {
                            let mut value = tag_value(t);
                            extend(&mut value, vec![("active", Value::Bool(page.tag == Some(t)))]);
                            value
                        })
                        .collect(),
                ),
            ),
            (
                "active_tag",
                match page.tag {
                    Some(tag) => tag_value(tag),
                    None => Value::Nil,
                },
            ),
            (
                "page",
                object(vec![
                    ("number", Value::from(page.number as u64)),
                    ("total", Value::from(page.total as u64)),
                    ("has_prev", Value::Bool(prev_url.is_some())),
                    ("has_next", Value::Bool(next_url.is_some())),
                    ("prev_url", optional(prev_url)),
                    ("next_url", optional(next_url)),
                ]),
            ),
            ("total_count", Value::from(page.total_count as u64)),
        ])
    }

    fn detail_context(&self, article: &Article, position: usize) -> Value {
        let articles = &self.snapshot.articles;
        let neighbour = |i: Option<usize>| -> Value {
            optional(
                i.and_then(|i| articles.get(i))
                    .map(|a| detail_file_name(a.id)),
            )
        };

        let mut article_value = self.summarize(article);
        extend(
            &mut article_value,
            vec![(
                "body_html",
                markup(markdown::to_html(self.render_config, &article.body)),
            )],
        );

        object(vec![
            ("article", article_value),
            (
                "comments",
                Value::Array(
                    self.snapshot
                        .comments(article.id)
                        .iter()
                        .map(comment_value)
                        .collect(),
                ),
            ),
            ("prev_url", neighbour(position.checked_sub(1))),
            ("next_url", neighbour(position.checked_add(1))),
        ])
    }

    fn board_context(&self) -> Value {
        object(vec![(
            "messages",
            Value::Array(
                self.snapshot
                    .board_messages
                    .iter()
                    .map(message_value)
                    .collect(),
            ),
        )])
    }

    /// Converts an [`Article`] into the fields shown wherever an article is
    /// listed: `id`, `title`, `url`, `cover_url`, `published`, `summary`, and
    /// `tags`.
    fn summarize(&self, article: &Article) -> Value {
        object(vec![
            ("id", Value::from(article.id)),
            ("title", text(&article.title)),
            ("url", markup(detail_file_name(article.id))),
            ("cover_url", optional(article.cover.as_deref().map(media_url))),
            ("published", Value::String(format_datetime(&article.published_at))),
            ("summary", text(&article.summary())),
            (
                "tags",
                Value::Array(
                    self.snapshot
                        .tags_of(article)
                        .into_iter()
                        .map(tag_value)
                        .collect(),
                ),
            ),
        ])
    }
}

fn tag_value(tag: &Tag) -> Value {
    object(vec![
        ("name", text(&tag.name)),
        ("url", text(&list_file_name(Some(tag), 1))),
    ])
}

fn comment_value(comment: &Comment) -> Value {
    message(
        &comment.nickname,
        &comment.city,
        &comment.avatar,
        &comment.body,
        &comment.created_at,
    )
}

fn message_value(m: &BoardMessage) -> Value {
    message(&m.nickname, &m.city, &m.avatar, &m.body, &m.created_at)
}

fn message(
    nickname: &str,
    city: &str,
    avatar: &str,
    body: &str,
    created_at: &DateTime<Utc>,
) -> Value {
    object(vec![
        ("nickname", text(nickname)),
        ("city", text(city)),
        (
            "avatar_url",
            optional(match avatar.is_empty() {
                true => None,
                false => Some(media_url(avatar)),
            }),
        ),
        ("body", text(body)),
        ("created", Value::String(format_datetime(created_at))),
    ])
}

fn media_url(relative: &str) -> String {
    crate::value::escape_html(&format!("{}{}", MEDIA_URL, relative))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(template::Error),

    /// An error writing the output file.
    Io { path: PathBuf, err: io::Error },
}

impl From<template::Error> for Error {
    /// Converts a [`template::Error`] into an [`Error`]. This allows us to
    /// use the `?` operator for fallible template operations.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Io { path, err } => write!(f, "Writing '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(err) => Some(err),
            Error::Io { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::article;
    use crate::repository::Content;
    use crate::unit::enumerate;
    use url::Url;

    /// Renders the context fields a test cares about as `key=value` lines.
    struct Probe;

    impl PageRenderer for Probe {
        fn render(&self, template: &str, context: Value) -> template::Result<String> {
            let mut out = format!("template={}\n", template);
            if let Value::Object(m) = context {
                let mut keys: Vec<&String> = m.keys().collect();
                keys.sort();
                for key in keys {
                    out.push_str(&format!("{}={}\n", key, show(&m[key])));
                }
            }
            Ok(out)
        }
    }

    fn show(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Nil => "nil".to_owned(),
            Value::Array(items) => format!("[{}]", items.iter().map(show).collect::<Vec<_>>().join(",")),
            Value::Object(m) => {
                let mut keys: Vec<&String> = m.keys().collect();
                keys.sort();
                let fields: Vec<String> = keys.iter().map(|k| format!("{}:{}", k, show(&m[*k]))).collect();
                format!("{{{}}}", fields.join(" "))
            }
            other => format!("{}", other),
        }
    }

    fn render(content: Content, file_name: &str) -> String {
        let snapshot = Snapshot::capture(&content).unwrap();
        let render_config = RenderConfig::new(Url::parse("https://example.org/").unwrap());
        let writer = Writer {
            renderer: &Probe,
            render_config: &render_config,
            snapshot: &snapshot,
            site_title: "<洞府>",
            bio: "bio",
            output_directory: Path::new("/nonexistent"),
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };
        let units = enumerate(&snapshot, 2).unwrap();
        let unit = units.iter().find(|u| u.file_name == file_name).unwrap();
        writer.render_unit(unit).unwrap()
    }

    #[test]
    fn common_fields_are_present_and_escaped() {
        let out = render(Content::default(), "about.html");
        assert!(out.contains("template=about\n"), "{}", out);
        assert!(out.contains("is_static=true\n"), "{}", out);
        assert!(out.contains("current_page=about\n"), "{}", out);
        assert!(out.contains("site_title=&lt;洞府&gt;\n"), "{}", out);
        assert!(out.contains("media_url=media/\n"), "{}", out);
    }

    #[test]
    fn list_pages_link_their_neighbours() {
        let content = Content {
            articles: (1..=5).map(|id| article(id, id as u32)).collect(),
            ..Content::default()
        };
        let out = render(content, "list_page_2.html");
        assert!(out.contains("has_next:true"), "{}", out);
        assert!(out.contains("prev_url:list.html"), "{}", out);
        assert!(out.contains("next_url:list_page_3.html"), "{}", out);
        assert!(out.contains("number:2"), "{}", out);
        assert!(out.contains("url:article_3.html"), "{}", out);
        assert!(out.contains("url:article_2.html"), "{}", out);
        assert!(!out.contains("url:article_1.html"), "{}", out);
    }

    #[test]
    fn detail_pages_carry_sanitized_body_and_visible_comments() {
        let mut a = article(7, 1);
        a.title = "<script>x</script>".to_owned();
        a.body = "# Title\n\n<script>alert(1)</script>\n\nBody text".to_owned();
        let comment = |id: u64, hidden: bool| Comment {
            id,
            article_id: 7,
            nickname: format!("nick{}", id),
            city: "城".to_owned(),
            body: format!("<b>comment {}</b>", id),
            created_at: a.published_at,
            hidden,
            avatar: "avatars/icon_01.png".to_owned(),
        };
        let content = Content {
            comments: vec![comment(1, false), comment(2, true)],
            articles: vec![a.clone()],
            ..Content::default()
        };

        let out = render(content, "article_7.html");
        assert!(out.contains("<h1>Title</h1>"), "{}", out);
        assert!(!out.contains("<script"), "{}", out);
        assert!(out.contains("title:&lt;script&gt;x&lt;/script&gt;"), "{}", out);
        assert!(out.contains("nickname:nick1"), "{}", out);
        assert!(!out.contains("nick2"), "{}", out);
        assert!(out.contains("body:&lt;b&gt;comment 1&lt;/b&gt;"), "{}", out);
        assert!(out.contains("avatar_url:media/avatars/icon_01.png"), "{}", out);
        assert!(out.contains("prev_url=nil"), "{}", out);
    }

    #[test]
    fn sitemap_bypasses_the_renderer() {
        let content = Content {
            articles: vec![article(4, 3)],
            ..Content::default()
        };
        let out = render(content, "sitemap.xml");
        assert!(out.starts_with("<?xml"), "{}", out);
        assert!(out.contains("<loc>https://example.org/article_4.html</loc>"), "{}", out);
        assert!(out.contains("<lastmod>2024-06-01</lastmod>"), "{}", out);
    }

    #[test]
    fn tags_mark_the_active_filter() {
        let mut a = article(1, 1);
        a.tags = vec![2];
        let content = Content {
            tags: vec![
                Tag { id: 1, name: "go".to_owned() },
                Tag { id: 2, name: "rust".to_owned() },
            ],
            articles: vec![a],
            ..Content::default()
        };
        let out = render(content, "list_tag_rust.html");
        assert!(
            out.contains("tags=[{active:false name:go url:list_tag_go.html},{active:true name:rust url:list_tag_rust.html}]"),
            "{}",
            out
        );
        assert!(out.contains("active_tag={name:rust url:list_tag_rust.html}"), "{}", out);
    }
}
