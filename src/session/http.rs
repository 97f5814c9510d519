//! Plain-HTTP session driver.
//!
//! Implements the [`Session`] contract with reqwest and scraper: pages are
//! fetched and parsed, anchors and form submits become further requests, and
//! non-HTML responses are written into the download folder the way a browser
//! auto-saves attachments. No script execution happens; pages are considered
//! settled as soon as they are fetched.

use super::{Element, Locator, Session};
use crate::constants::USER_AGENTS;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, trace, warn};
use url::Url;

/// Re-resolvable address of a queried element: selector, match index, and an
/// optional scope chain for `find_within` results.
#[derive(Debug, Clone)]
struct ElementLoc {
    selector: String,
    index: usize,
    scope: Option<Box<ElementLoc>>,
}

/// What a click on a resolved element should do.
enum ClickAction {
    Follow(String),
    Submit {
        action: Url,
        method: String,
        fields: Vec<(String, String)>,
    },
}

pub struct HttpSession {
    client: reqwest::Client,
    download_folder: PathBuf,
    cookies: HashMap<String, String>,
    current_url: Option<Url>,
    history: Vec<Url>,
    html: String,
    elements: HashMap<u64, ElementLoc>,
    next_element_id: u64,
    form_values: HashMap<String, String>,
}

impl HttpSession {
    /// Creates a session whose downloads land in `download_folder`.
    pub fn new(download_folder: PathBuf) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENTS[0])
            .build()?;

        Ok(Self {
            client,
            download_folder,
            cookies: HashMap::new(),
            current_url: None,
            history: Vec::new(),
            html: String::new(),
            elements: HashMap::new(),
            next_element_id: 0,
            form_values: HashMap::new(),
        })
    }

    fn resolve_url(&self, url: &str) -> AppResult<Url> {
        if url.is_empty() {
            return Err(AppError::UrlError("empty link".into()));
        }
        match Url::parse(url) {
            Ok(u) => Ok(u),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .current_url
                    .as_ref()
                    .ok_or_else(|| AppError::UrlError(format!("relative link '{url}' with no page loaded")))?;
                Ok(base.join(url)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Some(pairs.join("; "))
    }

    fn capture_cookies(&mut self, response: &reqwest::Response) {
        for header in response.headers().get_all(SET_COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else { continue };
            if let Some((name, value)) = pair.split_once('=') {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }

    async fn fetch(&self, url: Url) -> AppResult<reqwest::Response> {
        let mut request = self.client.get(url);
        if let Some(cookies) = self.cookie_header() {
            request = request.header(COOKIE, cookies);
        }
        let response = request.send().await?;
        response.error_for_status().map_err(AppError::from)
    }

    /// Routes a response either into the download folder (non-HTML) or into
    /// the current page state.
    async fn handle_response(
        &mut self,
        response: reqwest::Response,
        push_history: bool,
    ) -> AppResult<()> {
        self.capture_cookies(&response);

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let is_download = disposition
            .as_deref()
            .map(|d| d.contains("attachment"))
            .unwrap_or(false)
            || !content_type.contains("html");

        if is_download {
            let filename = filename_for(&final_url, disposition.as_deref());
            let target = self.download_folder.join(&filename);
            tokio::fs::create_dir_all(&self.download_folder).await?;
            let bytes = response.bytes().await?;
            tokio::fs::write(&target, &bytes).await?;
            debug!(
                file = %target.display(),
                size = bytes.len(),
                "Saved download"
            );
            // The page does not change when a download is triggered.
            return Ok(());
        }

        if push_history {
            if let Some(previous) = self.current_url.take() {
                self.history.push(previous);
            }
        }
        self.current_url = Some(final_url);
        self.html = response.text().await?;
        // Old element snapshots and pending form values are stale now.
        self.elements.clear();
        self.form_values.clear();
        Ok(())
    }

    fn register(&mut self, loc: ElementLoc) -> u64 {
        let id = self.next_element_id;
        self.next_element_id += 1;
        self.elements.insert(id, loc);
        id
    }

    fn loc_of(&self, element: &Element) -> AppResult<ElementLoc> {
        self.elements
            .get(&element.id())
            .cloned()
            .ok_or_else(|| AppError::SessionError("stale element reference".into()))
    }

    /// Queries the current page and snapshots the matches.
    fn select_snapshots(
        &mut self,
        css: &str,
        scope: Option<ElementLoc>,
    ) -> AppResult<Vec<Element>> {
        let selector = Selector::parse(css)
            .map_err(|_| AppError::SessionError(format!("invalid selector: {css}")))?;
        let document = Html::parse_document(&self.html);

        let snapshots: Vec<(String, HashMap<String, String>)> = match &scope {
            Some(parent_loc) => match resolve_loc(&document, parent_loc) {
                Some(parent) => parent.select(&selector).map(snapshot).collect(),
                None => Vec::new(),
            },
            None => document.select(&selector).map(snapshot).collect(),
        };
        drop(document);

        let mut elements = Vec::with_capacity(snapshots.len());
        for (index, (text, attrs)) in snapshots.into_iter().enumerate() {
            let id = self.register(ElementLoc {
                selector: css.to_string(),
                index,
                scope: scope.clone().map(Box::new),
            });
            elements.push(Element::new(id, text, attrs));
        }
        Ok(elements)
    }

    /// Works out what clicking the element means: follow its href, or submit
    /// its enclosing form with the values recorded by `fill`.
    fn click_action(&self, loc: &ElementLoc) -> AppResult<ClickAction> {
        let document = Html::parse_document(&self.html);
        let element = resolve_loc(&document, loc)
            .ok_or_else(|| AppError::SessionError("element no longer on page".into()))?;

        if element.value().name() == "a" {
            let href = element
                .value()
                .attr("href")
                .ok_or_else(|| AppError::SessionError("anchor has no href".into()))?;
            return Ok(ClickAction::Follow(href.to_string()));
        }

        let form = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "form")
            .ok_or_else(|| AppError::SessionError("control has no enclosing form".into()))?;

        let input_selector = Selector::parse("input, textarea")
            .map_err(|_| AppError::SessionError("invalid form control selector".into()))?;
        let mut fields = Vec::new();
        for control in form.select(&input_selector) {
            let Some(name) = control.value().attr("name") else {
                continue;
            };
            let value = self
                .form_values
                .get(name)
                .cloned()
                .or_else(|| control.value().attr("value").map(str::to_string))
                .unwrap_or_default();
            fields.push((name.to_string(), value));
        }

        let method = form
            .value()
            .attr("method")
            .unwrap_or("get")
            .to_ascii_lowercase();
        let action = match form.value().attr("action") {
            Some(action) if !action.is_empty() => self.resolve_url(action)?,
            _ => self
                .current_url
                .clone()
                .ok_or_else(|| AppError::SessionError("form submit with no page loaded".into()))?,
        };

        Ok(ClickAction::Submit {
            action,
            method,
            fields,
        })
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn visit(&mut self, url: &str) -> AppResult<()> {
        let url = self.resolve_url(url)?;
        trace!(%url, "Visiting");
        let response = self.fetch(url).await?;
        self.handle_response(response, true).await
    }

    async fn wait(&mut self) {
        // Pages are settled once fetched; nothing renders after the fact.
    }

    async fn find(&mut self, locator: Locator<'_>) -> AppResult<Vec<Element>> {
        let css = locator_to_css(locator);
        self.select_snapshots(&css, None)
    }

    async fn find_within(
        &mut self,
        locator: Locator<'_>,
        scope: &Element,
    ) -> AppResult<Vec<Element>> {
        let css = locator_to_css(locator);
        let scope_loc = self.loc_of(scope)?;
        self.select_snapshots(&css, Some(scope_loc))
    }

    async fn fill(&mut self, element: &Element, value: &str) -> AppResult<()> {
        let loc = self.loc_of(element)?;
        let key = {
            let document = Html::parse_document(&self.html);
            let control = resolve_loc(&document, &loc)
                .ok_or_else(|| AppError::SessionError("element no longer on page".into()))?;
            control
                .value()
                .attr("name")
                .or_else(|| control.value().attr("id"))
                .map(str::to_string)
                .ok_or_else(|| AppError::SessionError("control has neither name nor id".into()))?
        };
        self.form_values.insert(key, value.to_string());
        Ok(())
    }

    async fn click(&mut self, element: &Element) -> AppResult<()> {
        let loc = self.loc_of(element)?;
        let action = self.click_action(&loc)?;
        match action {
            ClickAction::Follow(href) => self.visit(&href).await,
            ClickAction::Submit {
                action,
                method,
                fields,
            } => {
                debug!(%action, method, "Submitting form");
                let mut request = if method == "post" {
                    self.client.post(action).form(&fields)
                } else {
                    self.client.get(action).query(&fields)
                };
                if let Some(cookies) = self.cookie_header() {
                    request = request.header(COOKIE, cookies);
                }
                let response = request.send().await?.error_for_status()?;
                self.handle_response(response, true).await
            }
        }
    }

    async fn mouse_over(&mut self, _element: &Element) -> AppResult<()> {
        Ok(())
    }

    fn page_html(&self) -> String {
        self.html.clone()
    }

    async fn back(&mut self) -> AppResult<()> {
        let Some(previous) = self.history.pop() else {
            warn!("Back requested with empty history");
            return Ok(());
        };
        let response = self.fetch(previous).await?;
        self.handle_response(response, false).await
    }

    async fn reload(&mut self) -> AppResult<()> {
        let Some(current) = self.current_url.clone() else {
            return Err(AppError::SessionError("reload with no page loaded".into()));
        };
        let response = self.fetch(current).await?;
        self.handle_response(response, false).await
    }

    fn cookies(&self) -> HashMap<String, String> {
        self.cookies.clone()
    }
}

fn locator_to_css(locator: Locator<'_>) -> String {
    match locator {
        Locator::Css(css) => css.to_string(),
        Locator::Id(id) => format!(r#"[id="{id}"]"#),
        Locator::Name(name) => format!(r#"[name="{name}"]"#),
    }
}

fn snapshot(element: ElementRef<'_>) -> (String, HashMap<String, String>) {
    let text = element.text().collect::<Vec<_>>().join("").trim().to_string();
    let attrs = element
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    (text, attrs)
}

fn resolve_loc<'a>(document: &'a Html, loc: &ElementLoc) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(&loc.selector).ok()?;
    match &loc.scope {
        Some(parent) => resolve_loc(document, parent)?
            .select(&selector)
            .nth(loc.index),
        None => document.select(&selector).nth(loc.index),
    }
}

/// Filename for a saved download: `Content-Disposition` filename when given,
/// otherwise the last path segment of the final URL.
fn filename_for(url: &Url, disposition: Option<&str>) -> String {
    if let Some(disposition) = disposition {
        for part in disposition.split(';') {
            let part = part.trim();
            if let Some(name) = part.strip_prefix("filename=") {
                let name = name.trim_matches('"');
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
    }
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("download")
        .to_string()
}
