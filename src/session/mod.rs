//! Browser-session abstraction consumed by the downloader and the watcher.
//!
//! The traversal code only needs a handful of primitives: navigate, settle,
//! query elements, interact, and expose cookies. [`Session`] captures that
//! contract behind an object-safe async trait so the walkers can run against
//! the bundled [`HttpSession`] or a scripted stand-in in tests.

mod http;

pub use http::HttpSession;

use crate::errors::AppResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// How to address elements on the current page.
#[derive(Debug, Clone, Copy)]
pub enum Locator<'a> {
    /// CSS selector
    Css(&'a str),
    /// `id` attribute value
    Id(&'a str),
    /// `name` attribute value
    Name(&'a str),
}

/// A queried element: a snapshot of its text and attributes, plus an opaque
/// id the owning session uses to re-resolve the node for interactions.
///
/// Snapshots go stale on navigation; interacting with a stale element is a
/// session error, matching how a real driver treats detached nodes.
#[derive(Debug, Clone)]
pub struct Element {
    id: u64,
    text: String,
    attrs: HashMap<String, String>,
}

impl Element {
    pub fn new(id: u64, text: String, attrs: HashMap<String, String>) -> Self {
        Self { id, text, attrs }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// The `href` attribute, or the empty string when absent. Rows without a
    /// link deliberately yield `""` so callers can branch on emptiness.
    pub fn href(&self) -> &str {
        self.attr("href").unwrap_or("")
    }
}

/// The session-driver contract.
///
/// `visit` on a non-HTML resource behaves like a browser download: the bytes
/// land in the configured download folder as a side effect and the current
/// page does not change.
#[async_trait]
pub trait Session: Send {
    /// Navigates to `url`, following the download side-channel for non-HTML
    /// responses.
    async fn visit(&mut self, url: &str) -> AppResult<()>;

    /// Lets the page settle. A no-op for drivers without script execution.
    async fn wait(&mut self);

    /// Queries the current page. An empty result is not an error.
    async fn find(&mut self, locator: Locator<'_>) -> AppResult<Vec<Element>>;

    /// Queries within a previously returned element.
    async fn find_within(&mut self, locator: Locator<'_>, scope: &Element)
        -> AppResult<Vec<Element>>;

    /// Records `value` for a form control, to be sent on the next submit.
    async fn fill(&mut self, element: &Element, value: &str) -> AppResult<()>;

    /// Follows an anchor or submits the enclosing form of a control.
    async fn click(&mut self, element: &Element) -> AppResult<()>;

    /// Hover. Only meaningful for script-driven pages; may be a no-op.
    async fn mouse_over(&mut self, element: &Element) -> AppResult<()>;

    /// Raw HTML of the current page.
    fn page_html(&self) -> String;

    /// Navigates one step back in history.
    async fn back(&mut self) -> AppResult<()>;

    /// Re-fetches the current page.
    async fn reload(&mut self) -> AppResult<()>;

    /// Cookie snapshot as a plain name/value map, suitable for replaying on
    /// plain HTTP requests.
    fn cookies(&self) -> HashMap<String, String>;
}
