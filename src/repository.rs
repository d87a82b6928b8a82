//! The read side of the blog database. [`Repository`] is the query interface
//! the generator consumes; [`Content`] implements it over a YAML export of the
//! database; [`Snapshot`] is the immutable view of every query result that a
//! single generation run works from.

use crate::model::{article_order, Article, BoardMessage, Comment, Tag};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The read-only queries the generator needs from the content store.
pub trait Repository {
    /// Every visible article, newest first (see [`article_order`]).
    fn visible_articles_ordered(&self) -> Result<Vec<Article>>;

    /// Every tag, ordered by name.
    fn all_tags(&self) -> Result<Vec<Tag>>;

    /// The visible comments under an article, oldest first.
    fn visible_comments(&self, article_id: u64) -> Result<Vec<Comment>>;

    /// Every visible board message, newest first.
    fn visible_board_messages(&self) -> Result<Vec<BoardMessage>>;
}

/// All records of the blog database, as exported by the admin console into a
/// YAML file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub articles: Vec<Article>,

    #[serde(default)]
    pub comments: Vec<Comment>,

    #[serde(default)]
    pub board_messages: Vec<BoardMessage>,
}

impl Content {
    /// Loads and validates a content export.
    pub fn from_file(path: &Path) -> Result<Content> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let content: Content = serde_yaml::from_reader(file).map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })?;
        content.validate()?;
        Ok(content)
    }

    /// Checks that tag names are unique and that every article refers only to
    /// known tags.
    pub fn validate(&self) -> Result<()> {
        let mut names: HashSet<&str> = HashSet::new();
        for tag in &self.tags {
            if !names.insert(&tag.name) {
                return Err(Error::DuplicateTag(tag.name.clone()));
            }
        }

        let ids: HashSet<u64> = self.tags.iter().map(|t| t.id).collect();
        for article in &self.articles {
            if let Some(tag) = article.tags.iter().find(|t| !ids.contains(t)) {
                return Err(Error::UnknownTag {
                    article: article.id,
                    tag: *tag,
                });
            }
        }
        Ok(())
    }
}

impl Repository for Content {
    fn visible_articles_ordered(&self) -> Result<Vec<Article>> {
        let mut articles: Vec<Article> =
            self.articles.iter().filter(|a| !a.hidden).cloned().collect();
        articles.sort_by(article_order);
        Ok(articles)
    }

    fn all_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn visible_comments(&self, article_id: u64) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.article_id == article_id && !c.hidden)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    fn visible_board_messages(&self) -> Result<Vec<BoardMessage>> {
        let mut messages: Vec<BoardMessage> = self
            .board_messages
            .iter()
            .filter(|m| !m.hidden)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(messages)
    }
}

/// The result of every [`Repository`] query a run needs, captured once
/// before anything is written. Nothing in a [`Snapshot`] changes after
/// [`Snapshot::capture`] returns.
#[derive(Debug)]
pub struct Snapshot {
    /// Visible articles, newest first.
    pub articles: Vec<Article>,

    /// All tags, ordered by name.
    pub tags: Vec<Tag>,

    /// Visible board messages, newest first.
    pub board_messages: Vec<BoardMessage>,

    comments: HashMap<u64, Vec<Comment>>,
}

impl Snapshot {
    /// Runs every query against `repository`. Any failing query fails the
    /// whole capture.
    pub fn capture<R: Repository + ?Sized>(repository: &R) -> Result<Snapshot> {
        let articles: Vec<Article> = repository
            .visible_articles_ordered()?
            .into_iter()
            .filter(|a| !a.hidden)
            .collect();
        let tags = repository.all_tags()?;

        let mut comments = HashMap::with_capacity(articles.len());
        for article in &articles {
            let visible: Vec<Comment> = repository
                .visible_comments(article.id)?
                .into_iter()
                .filter(|c| !c.hidden)
                .collect();
            comments.insert(article.id, visible);
        }

        let board_messages = repository
            .visible_board_messages()?
            .into_iter()
            .filter(|m| !m.hidden)
            .collect();

        Ok(Snapshot {
            articles,
            tags,
            board_messages,
            comments,
        })
    }

    /// The visible comments under an article.
    pub fn comments(&self, article_id: u64) -> &[Comment] {
        match self.comments.get(&article_id) {
            Some(comments) => comments,
            None => &[],
        }
    }

    /// The tags attached to an article, ordered by name.
    pub fn tags_of(&self, article: &Article) -> Vec<&Tag> {
        self.tags.iter().filter(|t| article.has_tag(t.id)).collect()
    }

    /// The visible articles carrying a tag, newest first.
    pub fn articles_tagged(&self, tag: &Tag) -> Vec<&Article> {
        self.articles.iter().filter(|a| a.has_tag(tag.id)).collect()
    }
}

/// The result of a fallible repository operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to read from the content store. Any such failure
/// leaves the generator without a snapshot and aborts the run.
#[derive(Debug)]
pub enum Error {
    /// Returned when the content file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the content file isn't valid YAML or has the wrong shape.
    Parse {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned when two tags share a name.
    DuplicateTag(String),

    /// Returned when an article refers to a tag ID that doesn't exist.
    UnknownTag { article: u64, tag: u64 },

    /// Returned by other [`Repository`] implementations when the store can't
    /// be queried.
    Unavailable(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening content file '{}': {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Parsing content file '{}': {}", path.display(), err)
            }
            Error::DuplicateTag(name) => write!(f, "Duplicate tag name '{}'", name),
            Error::UnknownTag { article, tag } => {
                write!(f, "Article {} refers to unknown tag {}", article, tag)
            }
            Error::Unavailable(msg) => write!(f, "Content store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { path: _, err } => Some(err),
            Error::Parse { path: _, err } => Some(err),
            Error::DuplicateTag(_) => None,
            Error::UnknownTag { .. } => None,
            Error::Unavailable(_) => None,
        }
    }
}
