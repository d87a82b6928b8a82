//! Loads the project configuration from `dongfu.yaml` and the theme
//! description from `theme/theme.yaml`, and defines [`RenderConfig`], the
//! immutable rendering settings threaded through a generation run.

use crate::markdown;
use crate::sanitize::Policy;
use pulldown_cmark::Options;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "dongfu.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

fn default_content() -> PathBuf {
    PathBuf::from("content.yaml")
}

fn default_output() -> PathBuf {
    PathBuf::from("docs")
}

fn default_static() -> Vec<PathBuf> {
    vec![PathBuf::from("static"), PathBuf::from("staticfiles")]
}

fn default_media() -> PathBuf {
    PathBuf::from("media")
}

#[derive(Deserialize)]
struct Project {
    site_title: String,
    base_url: Url,

    #[serde(default)]
    bio: String,

    #[serde(default)]
    index_page_size: PageSize,

    #[serde(default = "default_content")]
    content: PathBuf,

    #[serde(default = "default_output")]
    output_directory: PathBuf,

    #[serde(default = "default_static")]
    static_directories: Vec<PathBuf>,

    #[serde(default = "default_media")]
    media_directory: PathBuf,

    #[serde(default)]
    threads: Option<usize>,
}

/// The template files for each kind of page. Each page template is the
/// concatenation of its files, in order, so a theme can share a base layout
/// between pages.
#[derive(Clone, Debug, Deserialize)]
pub struct Theme {
    pub index: Vec<PathBuf>,
    pub list: Vec<PathBuf>,
    pub detail: Vec<PathBuf>,
    pub about: Vec<PathBuf>,
    pub board: Vec<PathBuf>,
}

impl Theme {
    fn resolve(self, theme_dir: &Path) -> Theme {
        let join = |files: Vec<PathBuf>| -> Vec<PathBuf> {
            files.iter().map(|f| theme_dir.join(f)).collect()
        };
        Theme {
            index: join(self.index),
            list: join(self.list),
            detail: join(self.detail),
            about: join(self.about),
            board: join(self.board),
        }
    }
}

/// The resolved project configuration. All paths are absolute or relative to
/// the working directory, never to the project file.
#[derive(Clone, Debug)]
pub struct Config {
    /// The directory holding the project file.
    pub project_root: PathBuf,

    pub site_title: String,
    pub bio: String,
    pub base_url: Url,
    pub index_page_size: usize,
    pub content_file: PathBuf,
    pub output_directory: PathBuf,

    /// Copied onto `{output_directory}/static` in order; later directories
    /// win when two contain the same file.
    pub static_directories: Vec<PathBuf>,

    pub media_directory: PathBuf,
    pub theme_directory: PathBuf,
    pub theme: Theme,

    /// The size of the render worker pool; `0` lets the pool pick one thread
    /// per CPU.
    pub threads: usize,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for [`PROJECT_FILE`] and
    /// loads the first one found. `output_directory` and `threads` override
    /// the values in the project file.
    pub fn from_directory(
        dir: &Path,
        output_directory: Option<&Path>,
        threads: Option<usize>,
    ) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory, threads)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory, threads),
                None => Err(Error::ProjectNotFound),
            }
        }
    }

    /// Loads the project file at `path` and the theme under
    /// `{project_root}/theme/theme.yaml`.
    pub fn from_project_file(
        path: &Path,
        output_directory: Option<&Path>,
        threads: Option<usize>,
    ) -> Result<Config> {
        let project: Project = parse_yaml(path)?;
        let project_root = match path.parent() {
            Some(root) => root,
            None => return Err(Error::ProjectNotFound),
        };

        let theme_dir = project_root.join("theme");
        let theme: Theme = parse_yaml(&theme_dir.join("theme.yaml"))?;

        Ok(Config {
            project_root: project_root.to_owned(),
            site_title: project.site_title,
            bio: project.bio,
            base_url: project.base_url,
            index_page_size: project.index_page_size.0.max(1),
            content_file: project_root.join(project.content),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join(project.output_directory),
            },
            static_directories: project
                .static_directories
                .iter()
                .map(|dir| project_root.join(dir))
                .collect(),
            media_directory: project_root.join(project.media_directory),
            theme: theme.resolve(&theme_dir),
            theme_directory: theme_dir,
            threads: threads.or(project.threads).unwrap_or(0),
        })
    }

    /// The inputs a run must never delete: the project root (which holds the
    /// project file), the content file, and the theme directory.
    pub fn protected_paths(&self) -> Vec<PathBuf> {
        vec![
            self.project_root.clone(),
            self.content_file.clone(),
            self.theme_directory.clone(),
        ]
    }

    /// Builds the [`RenderConfig`] for one run.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig::new(self.base_url.clone())
    }
}

fn parse_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })?;
    serde_yaml::from_reader(file).map_err(|err| Error::Parse {
        path: path.to_owned(),
        err,
    })
}

/// Settings that decide how content is turned into HTML and URLs. Built once
/// per run and passed by reference wherever it's needed; nothing mutates it
/// after construction.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// The absolute URL the site is served from. Always ends with `/` and
    /// never has a query or fragment.
    pub base_url: Url,

    /// The Markdown extensions enabled for article bodies.
    pub extensions: Options,

    /// The allow-list applied to rendered Markdown.
    pub policy: Policy,
}

impl RenderConfig {
    /// Builds the standard configuration for a site served from `base_url`.
    pub fn new(base_url: Url) -> RenderConfig {
        RenderConfig {
            base_url: with_trailing_slash(base_url),
            extensions: markdown::extensions(),
            policy: Policy::default(),
        }
    }
}

// Page file names are appended to the base URL, so it must be a bare
// directory URL.
fn with_trailing_slash(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// The result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the project or theme configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no ancestor of the starting directory has a project file.
    ProjectNotFound,

    /// Returned when a configuration file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when a configuration file isn't valid.
    Parse {
        path: PathBuf,
        err: serde_yaml::Error,
    },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectNotFound => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::Open { path, err } => write!(f, "Opening '{}': {}", path.display(), err),
            Error::Parse { path, err } => write!(f, "Parsing '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectNotFound => None,
            Error::Open { path: _, err } => Some(err),
            Error::Parse { path: _, err } => Some(err),
        }
    }
}
