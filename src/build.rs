//! Exports the [`build_site`] function which stitches together the high-level
//! steps of a static export: capturing a content [`Snapshot`], cleaning the
//! output directory, rendering every output unit ([`crate::unit`],
//! [`crate::write`]), copying static assets and media ([`crate::assets`]),
//! and finally dropping the `.nojekyll` marker.
//!
//! Pages are rendered independently on a worker pool. A page that fails to
//! render doesn't stop the others: every failure is collected and reported
//! together once the rest of the site has been written.

use crate::assets;
use crate::config::{self, Config, RenderConfig};
use crate::repository::{self, Content, Snapshot};
use crate::template::{self, PageRenderer, Templates};
use crate::unit::{self, Collision};
use crate::write::{self, Writer};
use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// The marker file that tells GitHub Pages not to run Jekyll over the tree.
pub const MARKER_FILE: &str = ".nojekyll";

/// Builds the site described by a [`Config`]: loads the content export and
/// the theme, then runs a [`Generator`] dated with today's UTC date.
pub fn build_site(config: &Config) -> Result<Manifest> {
    let content = Content::from_file(&config.content_file)?;
    let snapshot = Snapshot::capture(&content)?;
    let templates = Templates::load(&config.theme)?;
    let render_config = config.render_config();
    let protected_paths = config.protected_paths();

    Generator {
        output_directory: &config.output_directory,
        protected_paths: &protected_paths,
        renderer: &templates,
        render_config: &render_config,
        site_title: &config.site_title,
        bio: &config.bio,
        index_page_size: config.index_page_size,
        static_directories: &config.static_directories,
        media_directory: &config.media_directory,
        threads: config.threads,
        today: Utc::now().date_naive(),
    }
    .generate(&snapshot)
}

/// Everything one export needs apart from the content itself.
pub struct Generator<'a, R: PageRenderer + ?Sized> {
    /// The output root. It is deleted and recreated by every run.
    pub output_directory: &'a Path,

    /// Inputs the output directory must not be or contain, such as the
    /// project root and the content file.
    pub protected_paths: &'a [PathBuf],

    pub renderer: &'a R,
    pub render_config: &'a RenderConfig,
    pub site_title: &'a str,
    pub bio: &'a str,

    /// The number of articles per list page.
    pub index_page_size: usize,

    /// Copied onto `{output_directory}/static`, later directories winning.
    pub static_directories: &'a [PathBuf],

    /// Copied onto `{output_directory}/media`.
    pub media_directory: &'a Path,

    /// The render pool size; `0` means one thread per CPU.
    pub threads: usize,

    /// The run date, used by the sitemap. Two runs with the same snapshot and
    /// the same date produce identical trees.
    pub today: NaiveDate,
}

impl<R: PageRenderer + ?Sized> Generator<'_, R> {
    /// Exports `snapshot` into the output directory.
    pub fn generate(&self, snapshot: &Snapshot) -> Result<Manifest> {
        let units = unit::enumerate(snapshot, self.index_page_size)?;
        self.check_output_directory()?;

        // Blow away the old output so nothing from a previous run (a deleted
        // article, a renamed tag) survives.
        rmdir(self.output_directory)?;
        std::fs::create_dir_all(self.output_directory).map_err(|err| Error::Clean {
            path: self.output_directory.to_owned(),
            err,
        })?;
        info!(
            output = %self.output_directory.display(),
            articles = snapshot.articles.len(),
            tags = snapshot.tags.len(),
            pages = units.len(),
            "Generating site"
        );

        let writer = Writer {
            renderer: self.renderer,
            render_config: self.render_config,
            snapshot,
            site_title: self.site_title,
            bio: self.bio,
            output_directory: self.output_directory,
            today: self.today,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(Error::ThreadPool)?;
        let outcomes: Vec<(String, write::Result<PathBuf>)> = pool.install(|| {
            units
                .par_iter()
                .map(|unit| (unit.file_name.clone(), writer.write_unit(unit)))
                .collect()
        });

        let mut pages = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (file_name, outcome) in outcomes {
            match outcome {
                Ok(_) => pages.push(file_name),
                Err(error) => {
                    warn!(file = %file_name, error = %error, "Failed to render page");
                    failures.push(PageFailure { file_name, error });
                }
            }
        }
        info!(written = pages.len(), failed = failures.len(), "Rendered pages");

        let static_files = assets::copy_overlay(
            self.static_directories,
            &self.output_directory.join("static"),
        )?;
        info!(files = static_files, "Copied static assets");

        let media_files = assets::copy_overlay(
            &[self.media_directory],
            &self.output_directory.join("media"),
        )?;
        info!(files = media_files, "Copied media");

        let marker = self.output_directory.join(MARKER_FILE);
        std::fs::write(&marker, b"").map_err(|err| Error::Marker { path: marker, err })?;

        if !failures.is_empty() {
            return Err(Error::Pages(failures));
        }
        info!(output = %self.output_directory.display(), "Site generated");
        Ok(Manifest {
            pages,
            static_files,
            media_files,
        })
    }

    // Refuse to clean a directory that holds our own inputs, e.g. an output
    // directory accidentally set to the project root. Paths are compared
    // after resolving `..` and symlinks.
    fn check_output_directory(&self) -> Result<()> {
        let output = resolve(self.output_directory)?;
        for protected in self.protected_paths {
            if resolve(protected)?.starts_with(&output) {
                return Err(self.unsafe_output(protected));
            }
        }

        let sources = self
            .static_directories
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(self.media_directory));
        for source in sources {
            let resolved = resolve(source)?;
            if resolved.starts_with(&output) || output.starts_with(&resolved) {
                return Err(self.unsafe_output(source));
            }
        }
        Ok(())
    }

    fn unsafe_output(&self, input: &Path) -> Error {
        Error::UnsafeOutput {
            output: self.output_directory.to_owned(),
            input: input.to_owned(),
        }
    }
}

/// Returns the absolute form of `path` with symlinks and `..` resolved. The
/// path doesn't need to exist: its nearest existing ancestor is
/// canonicalized and the remaining components are applied to that.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = match path.is_absolute() {
        true => path.to_owned(),
        false => std::env::current_dir()
            .map_err(|err| Error::Resolve {
                path: path.to_owned(),
                err,
            })?
            .join(path),
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for component in missing.iter().rev() {
                    match component {
                        Component::ParentDir => {
                            resolved.pop();
                        }
                        Component::Normal(name) => resolved.push(name),
                        _ => {}
                    }
                }
                return Ok(resolved);
            }
            Err(err) => match (existing.parent(), existing.components().next_back()) {
                (Some(parent), Some(last)) => {
                    missing.push(last);
                    existing = parent;
                }
                _ => {
                    return Err(Error::Resolve {
                        path: path.to_owned(),
                        err,
                    })
                }
            },
        }
    }
}

/// What a successful export wrote.
#[derive(Debug, PartialEq)]
pub struct Manifest {
    /// The file names of every rendered page, in enumeration order.
    pub pages: Vec<String>,

    /// The number of distinct files copied into `static/`.
    pub static_files: usize,

    /// The number of distinct files copied into `media/`.
    pub media_files: usize,
}

/// A page that couldn't be rendered or written.
#[derive(Debug)]
pub struct PageFailure {
    pub file_name: String,
    pub error: write::Error,
}

/// The result of building a site.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can come from loading
/// configuration, content, or the theme, from cleaning the output directory,
/// from rendering pages, and from copying assets.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading the project configuration.
    Config(config::Error),

    /// Returned when the content store can't be read.
    Repository(repository::Error),

    /// Returned for errors loading the theme templates.
    Template(template::Error),

    /// Returned when two pages would be written to the same file.
    Collision(Collision),

    /// Returned when cleaning the output directory would delete one of the
    /// inputs, or when the output lies inside a static or media source.
    UnsafeOutput { output: PathBuf, input: PathBuf },

    /// Returned when a path can't be resolved for the output check.
    Resolve { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when the render worker pool can't be started.
    ThreadPool(rayon::ThreadPoolBuildError),

    /// Returned for errors copying static assets or media.
    Assets(assets::Error),

    /// Returned for I/O problems writing the `.nojekyll` marker.
    Marker { path: PathBuf, err: std::io::Error },

    /// Returned after every other page has been written when one or more
    /// pages failed.
    Pages(Vec<PageFailure>),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => err.fmt(f),
            Error::Repository(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
            Error::Collision(err) => err.fmt(f),
            Error::UnsafeOutput { output, input } => write!(
                f,
                "Refusing to clean '{}': it overlaps input '{}'",
                output.display(),
                input.display()
            ),
            Error::Resolve { path, err } => {
                write!(f, "Resolving path '{}': {}", path.display(), err)
            }
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::ThreadPool(err) => write!(f, "Starting render workers: {}", err),
            Error::Assets(err) => err.fmt(f),
            Error::Marker { path, err } => write!(f, "Writing '{}': {}", path.display(), err),
            Error::Pages(failures) => {
                write!(f, "{} page(s) failed to render:", failures.len())?;
                for failure in failures {
                    write!(f, "\n  {}: {}", failure.file_name, failure.error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::Repository(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::Collision(err) => Some(err),
            Error::UnsafeOutput { .. } => None,
            Error::Resolve { path: _, err } => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::ThreadPool(err) => Some(err),
            Error::Assets(err) => Some(err),
            Error::Marker { path: _, err } => Some(err),
            Error::Pages(_) => None,
        }
    }
}

impl From<config::Error> for Error {
    /// Converts [`config::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: config::Error) -> Error {
        Error::Config(err)
    }
}

impl From<repository::Error> for Error {
    /// Converts [`repository::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: repository::Error) -> Error {
        Error::Repository(err)
    }
}

impl From<template::Error> for Error {
    /// Converts [`template::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl From<Collision> for Error {
    /// Converts [`Collision`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: Collision) -> Error {
        Error::Collision(err)
    }
}

impl From<assets::Error> for Error {
    /// Converts [`assets::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: assets::Error) -> Error {
        Error::Assets(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}
