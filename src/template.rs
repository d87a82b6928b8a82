//! The page templating collaborator. [`PageRenderer`] is the interface the
//! generator renders through; [`Templates`] implements it with `gtmpl`
//! (Go-style) templates loaded from the theme directory.

use crate::config::Theme;
use gtmpl::{Context, Template};
use gtmpl_value::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The template names the generator renders with.
pub const INDEX: &str = "index";
pub const LIST: &str = "list";
pub const DETAIL: &str = "detail";
pub const ABOUT: &str = "about";
pub const BOARD: &str = "board";

/// Renders a named template against a context. Implementations must be
/// deterministic: the same name and context always produce the same output.
/// Pages are rendered from several worker threads at once, hence `Sync`.
pub trait PageRenderer: Sync {
    fn render(&self, template: &str, context: Value) -> Result<String>;
}

/// A set of named `gtmpl` templates. Each template is parsed afresh for every
/// page so that no parser state is shared between renders.
pub struct Templates {
    sources: HashMap<String, String>,
}

impl Templates {
    /// Loads every page template of a theme. Each template's files are
    /// concatenated in order before parsing.
    pub fn load(theme: &Theme) -> Result<Templates> {
        let mut sources = HashMap::new();
        for (name, files) in &[
            (INDEX, &theme.index),
            (LIST, &theme.list),
            (DETAIL, &theme.detail),
            (ABOUT, &theme.about),
            (BOARD, &theme.board),
        ] {
            sources.insert(name.to_string(), concat_files(files.iter())?);
        }
        Templates::from_sources(sources)
    }

    /// Builds a template set from in-memory sources, keyed by template name.
    /// Every source is parsed once up front so syntax errors surface before
    /// any page is rendered.
    pub fn from_sources(sources: HashMap<String, String>) -> Result<Templates> {
        for (name, source) in &sources {
            parse(name, source)?;
        }
        Ok(Templates { sources })
    }
}

impl PageRenderer for Templates {
    fn render(&self, name: &str, context: Value) -> Result<String> {
        let source = match self.sources.get(name) {
            Some(source) => source,
            None => return Err(Error::UnknownTemplate(name.to_owned())),
        };
        let template = parse(name, source)?;
        let context = Context::from(context).map_err(|err| Error::Execute {
            template: name.to_owned(),
            message: err.to_string(),
        })?;

        let mut out: Vec<u8> = Vec::new();
        template
            .execute(&mut out, &context)
            .map_err(|err| Error::Execute {
                template: name.to_owned(),
                message: err.to_string(),
            })?;
        String::from_utf8(out).map_err(|err| Error::Execute {
            template: name.to_owned(),
            message: err.to_string(),
        })
    }
}

fn parse(name: &str, source: &str) -> Result<Template> {
    let mut template = Template::default();
    template.parse(source).map_err(|err| Error::Parse {
        template: name.to_owned(),
        message: err.to_string(),
    })?;
    Ok(template)
}

// Loads the template file contents and concatenates them, separated by a
// space.
fn concat_files<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<String> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(template_file)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|err| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err,
            })?;
        contents.push(' ');
    }
    Ok(contents)
}

/// The result of a templating operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading or executing a template.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template sources.
    Parse { template: String, message: String },

    /// Returned when a page asks for a template the theme doesn't define.
    UnknownTemplate(String),

    /// Returned for errors executing a template against a context.
    Execute { template: String, message: String },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::Parse { template, message } => {
                write!(f, "Parsing template '{}': {}", template, message)
            }
            Error::UnknownTemplate(name) => write!(f, "Unknown template '{}'", name),
            Error::Execute { template, message } => {
                write!(f, "Executing template '{}': {}", template, message)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            _ => None,
        }
    }
}
