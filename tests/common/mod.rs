//! Common test utilities for integration tests

use async_trait::async_trait;
use doclib_sync::constants::{LISTING_ROW_SELECTOR, NEXT_PAGE_SELECTOR, ROW_LINK_SELECTOR};
use doclib_sync::errors::{AppError, AppResult};
use doclib_sync::session::{Element, Locator, Session};
use doclib_sync::config::Settings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A scripted page served by [`FakeSession`].
///
/// `rows` model the document-library listing (one entry per `<tr>`; `None`
/// is a row whose link cell has no anchor). `anchors` model a plain
/// directory-index page for the watcher. `next` is the URL the pagination
/// control leads to, when present.
#[derive(Debug, Default, Clone)]
pub struct FakePage {
    pub rows: Vec<Option<(String, String)>>,
    pub anchors: Vec<(String, String)>,
    pub next: Option<String>,
    pub login_form: bool,
    pub html: String,
}

#[allow(dead_code)]
impl FakePage {
    pub fn listing(rows: &[Option<(&str, &str)>]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|r| r.map(|(t, h)| (t.to_string(), h.to_string())))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_next(mut self, url: &str) -> Self {
        self.next = Some(url.to_string());
        self
    }

    pub fn index(anchors: &[(&str, &str)]) -> Self {
        Self {
            anchors: anchors
                .iter()
                .map(|(t, h)| (t.to_string(), h.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn login() -> Self {
        Self {
            login_form: true,
            ..Self::default()
        }
    }
}

/// What a fake element refers to on the current page.
#[derive(Debug, Clone)]
enum FakeTarget {
    Row(usize),
    Anchor(usize),
    NextControl,
    LoginControl,
}

/// In-memory [`Session`] implementation driven by scripted pages.
///
/// Visiting a URL with a scripted page navigates to it; visiting anything
/// else is treated as a triggered download and recorded (and written to
/// `download_dir` when one is set, so file-appearance polls can succeed).
#[derive(Default)]
pub struct FakeSession {
    pages: HashMap<String, FakePage>,
    current: String,
    history: Vec<String>,
    pub visited: Vec<String>,
    pub downloads: Vec<String>,
    pub filled: Vec<(String, String)>,
    pub clicks: u32,
    pub backs: u32,
    pub reloads: u32,
    pub cookie_map: HashMap<String, String>,
    pub download_dir: Option<PathBuf>,
    fail_remaining: HashMap<String, u32>,
    elements: HashMap<u64, FakeTarget>,
    next_element_id: u64,
}

#[allow(dead_code)]
impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, url: &str, mut page: FakePage) {
        if page.html.is_empty() {
            page.html = format!("<html data-url=\"{url}\"></html>");
        }
        self.pages.insert(url.to_string(), page);
    }

    /// Makes the next `count` visits to `url` fail with a session error.
    pub fn fail_visits(&mut self, url: &str, count: u32) {
        self.fail_remaining.insert(url.to_string(), count);
    }

    pub fn with_cookies(mut self, cookies: &[(&str, &str)]) -> Self {
        self.cookie_map = cookies
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    fn page(&self) -> Option<&FakePage> {
        self.pages.get(&self.current)
    }

    fn register(&mut self, target: FakeTarget) -> u64 {
        let id = self.next_element_id;
        self.next_element_id += 1;
        self.elements.insert(id, target);
        id
    }

    fn element(&mut self, target: FakeTarget, text: &str, href: Option<&str>) -> Element {
        let id = self.register(target);
        let mut attrs = HashMap::new();
        if let Some(href) = href {
            attrs.insert("href".to_string(), href.to_string());
        }
        Element::new(id, text.to_string(), attrs)
    }

    fn navigate(&mut self, url: &str) -> AppResult<()> {
        self.visited.push(url.to_string());

        if let Some(remaining) = self.fail_remaining.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AppError::SessionError(format!(
                    "simulated navigation failure for {url}"
                )));
            }
        }

        if self.pages.contains_key(url) {
            if !self.current.is_empty() {
                self.history.push(self.current.clone());
            }
            self.current = url.to_string();
        } else {
            // Not a scripted page: behaves like a browser download.
            self.downloads.push(url.to_string());
            if let Some(dir) = &self.download_dir {
                let name = url.rsplit('/').next().unwrap_or("download");
                std::fs::create_dir_all(dir).unwrap();
                std::fs::write(dir.join(name), b"payload").unwrap();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn visit(&mut self, url: &str) -> AppResult<()> {
        self.navigate(url)
    }

    async fn wait(&mut self) {}

    async fn find(&mut self, locator: Locator<'_>) -> AppResult<Vec<Element>> {
        let Some(page) = self.page().cloned() else {
            return Ok(Vec::new());
        };
        match locator {
            Locator::Css(LISTING_ROW_SELECTOR) => Ok((0..page.rows.len())
                .map(|i| self.element(FakeTarget::Row(i), "", None))
                .collect()),
            Locator::Css(NEXT_PAGE_SELECTOR) => Ok(match page.next {
                Some(_) => vec![self.element(FakeTarget::NextControl, "Next", None)],
                None => Vec::new(),
            }),
            Locator::Css("a") => Ok(page
                .anchors
                .iter()
                .enumerate()
                .map(|(i, (text, href))| {
                    self.element(FakeTarget::Anchor(i), text, Some(href.as_str()))
                })
                .collect::<Vec<_>>()),
            Locator::Id("username") | Locator::Id("password") => Ok(if page.login_form {
                vec![self.element(FakeTarget::LoginControl, "", None)]
            } else {
                Vec::new()
            }),
            Locator::Name(_) => Ok(if page.login_form {
                vec![self.element(FakeTarget::LoginControl, "", None)]
            } else {
                Vec::new()
            }),
            _ => Ok(Vec::new()),
        }
    }

    async fn find_within(
        &mut self,
        locator: Locator<'_>,
        scope: &Element,
    ) -> AppResult<Vec<Element>> {
        let target = self
            .elements
            .get(&scope.id())
            .cloned()
            .ok_or_else(|| AppError::SessionError("stale element reference".into()))?;
        let Some(page) = self.page().cloned() else {
            return Ok(Vec::new());
        };
        match (locator, target) {
            (Locator::Css(ROW_LINK_SELECTOR), FakeTarget::Row(i)) => {
                Ok(match page.rows.get(i).cloned().flatten() {
                    Some((text, href)) => {
                        vec![self.element(FakeTarget::Anchor(i), &text, Some(href.as_str()))]
                    }
                    None => Vec::new(),
                })
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn fill(&mut self, element: &Element, value: &str) -> AppResult<()> {
        self.filled
            .push((element.text().to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&mut self, element: &Element) -> AppResult<()> {
        self.clicks += 1;
        let target = self
            .elements
            .get(&element.id())
            .cloned()
            .ok_or_else(|| AppError::SessionError("stale element reference".into()))?;
        match target {
            FakeTarget::NextControl => {
                let next = self
                    .page()
                    .and_then(|p| p.next.clone())
                    .ok_or_else(|| AppError::SessionError("no next page".into()))?;
                self.navigate(&next)
            }
            FakeTarget::Anchor(i) => {
                let href = self
                    .page()
                    .and_then(|p| p.anchors.get(i).map(|(_, h)| h.clone()))
                    .unwrap_or_default();
                self.navigate(&href)
            }
            FakeTarget::LoginControl => Ok(()),
            FakeTarget::Row(_) => Err(AppError::SessionError("rows are not clickable".into())),
        }
    }

    async fn mouse_over(&mut self, _element: &Element) -> AppResult<()> {
        Ok(())
    }

    fn page_html(&self) -> String {
        self.page().map(|p| p.html.clone()).unwrap_or_default()
    }

    async fn back(&mut self) -> AppResult<()> {
        self.backs += 1;
        if let Some(previous) = self.history.pop() {
            self.current = previous;
        }
        Ok(())
    }

    async fn reload(&mut self) -> AppResult<()> {
        self.reloads += 1;
        Ok(())
    }

    fn cookies(&self) -> HashMap<String, String> {
        self.cookie_map.clone()
    }
}

/// Settings fixture with fast retry/poll knobs for tests.
#[allow(dead_code)]
pub fn test_settings(instance: &Path, download_folder: &Path) -> Settings {
    Settings {
        site_url: "https://docs.example.com/login".to_string(),
        username: "operator".to_string(),
        password: "secret".to_string(),
        browser_profile: String::new(),
        download_folder: download_folder.to_path_buf(),
        email_host: "smtp.example.com".to_string(),
        email_port: 465,
        email_user: "ops@example.com".to_string(),
        email_password: "mail-secret".to_string(),
        max_retries: 2,
        retry_initial_delay_ms: 1,
        retry_max_delay_ms: 4,
        poll_interval_ms: 1,
        poll_timeout_ms: 100,
        instance_path: instance.to_path_buf(),
    }
}
