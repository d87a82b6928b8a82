//! The library code for the `dongfu` static blog exporter. A run turns the
//! content of a blog (articles, tags, comments, and board messages) into a
//! self-contained tree of plain files that can be served without any server
//! code, e.g. from GitHub Pages.
//!
//! The architecture breaks down into three steps:
//!
//! 1. Capturing an immutable [`repository::Snapshot`] of the visible content
//!    from a [`repository::Repository`]
//! 2. Enumerating the output units ([`unit`]): one file per page, with a
//!    fixed file-name scheme
//! 3. Rendering every unit to disk ([`write`], [`build`]) and copying static
//!    assets and media alongside ([`assets`])
//!
//! Article bodies are Markdown. They are rendered by [`markdown::to_html`]
//! and cleaned by an allow-list ([`sanitize`]) before they reach a template.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod assets;
pub mod build;
pub mod config;
pub mod markdown;
pub mod model;
pub mod repository;
pub mod sanitize;
pub mod sitemap;
pub mod template;
pub mod unit;
pub mod value;
pub mod write;
