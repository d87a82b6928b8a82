//! An allow-list HTML cleaner. Rendered Markdown may contain raw HTML written
//! by the author, so everything that comes out of
//! [`crate::markdown::to_html`] passes through [`Policy::clean`]
//! before it reaches a page.
//!
//! Disallowed tags and attributes are removed rather than escaped. The text
//! inside a disallowed tag is kept, except for elements like `<script>` whose
//! content is never meant to be read as text; those are dropped whole.
//! Parsing and serialization are done by `ammonia` (on top of `html5ever`),
//! so malformed input is handled the way a browser would read it.

use ammonia::Builder;
use std::collections::{HashMap, HashSet};

/// The small set of tags that is always safe to render.
const BASELINE_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "blockquote", "code", "em", "i", "li", "ol", "strong", "ul",
];

/// The block-level tags Markdown output needs on top of [`BASELINE_TAGS`].
const STRUCTURAL_TAGS: &[&str] = &[
    "p", "pre", "code", "img", "h1", "h2", "h3", "h4", "h5", "h6", "table", "thead", "tbody",
    "tr", "th", "td", "blockquote",
];

/// Elements removed together with everything inside them.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea",
];

/// Describes which tags, attributes, and URL schemes survive [`Policy::clean`].
/// A policy is built once and never changes afterwards.
#[derive(Clone, Debug)]
pub struct Policy {
    tags: HashSet<&'static str>,
    generic_attributes: HashSet<&'static str>,
    tag_attributes: HashMap<&'static str, HashSet<&'static str>>,
    dropped_elements: HashSet<&'static str>,
    url_schemes: HashSet<&'static str>,
}

impl Default for Policy {
    /// The policy used for article bodies: the baseline and structural tags,
    /// `class` and `id` everywhere, and `src`/`alt` on images. Image sources
    /// must be `http`, `https`, or relative.
    fn default() -> Self {
        let mut tag_attributes = HashMap::new();
        tag_attributes.insert("img", ["src", "alt"].iter().copied().collect());
        Policy {
            tags: BASELINE_TAGS
                .iter()
                .chain(STRUCTURAL_TAGS.iter())
                .copied()
                .collect(),
            generic_attributes: ["class", "id"].iter().copied().collect(),
            tag_attributes,
            dropped_elements: DROPPED_ELEMENTS.iter().copied().collect(),
            url_schemes: ["http", "https"].iter().copied().collect(),
        }
    }
}

impl Policy {
    /// Returns true if `tag` (lowercase) survives cleaning.
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Cleans an HTML fragment according to the policy. Runs in time linear
    /// in the input, whatever the input looks like.
    pub fn clean(&self, html: &str) -> String {
        self.builder().clean(html).to_string()
    }

    fn builder(&self) -> Builder<'static> {
        let mut builder = Builder::empty();
        builder
            .tags(self.tags.clone())
            .generic_attributes(self.generic_attributes.clone())
            .tag_attributes(self.tag_attributes.clone())
            .clean_content_tags(self.dropped_elements.clone())
            .url_schemes(self.url_schemes.clone())
            .link_rel(None)
            .strip_comments(true);
        builder
    }
}
