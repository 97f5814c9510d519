use super::classify::is_file;
use super::relocate::relocate_downloads;
use crate::config::Settings;
use crate::constants::{
    LISTING_ROW_SELECTOR, LOGIN_PASSWORD_ID, LOGIN_SUBMIT_NAME, LOGIN_USERNAME_ID,
    NEXT_PAGE_SELECTOR, ROW_LINK_SELECTOR,
};
use crate::errors::{AppError, AppResult};
use crate::session::{Element, Locator, Session};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A directory waiting to be listed. `level` is the traversal depth passed
/// along for bookkeeping: children of a node at level L are queued at
/// L+1+sibling_index, so the value grows monotonically across the whole
/// traversal rather than per branch. Only level 0 gates relevant-directory
/// creation.
#[derive(Debug)]
struct PendingDir {
    link: String,
    level: u32,
}

/// A subdirectory discovered while listing. Rows whose link cell has no
/// anchor are recorded with empty name and link; that bookkeeping is part of
/// the observable contract and is kept as-is.
#[derive(Debug)]
struct ChildDir {
    name: String,
    link: String,
}

/// Walks a document-library folder hierarchy through a [`Session`],
/// triggering downloads of recognized file types and tracking the per-run
/// "relevant directory" used for later file relocation.
pub struct FileDownloader<'a> {
    session: &'a mut dyn Session,
    settings: &'a Settings,
    downloaded: u64,
}

impl<'a> FileDownloader<'a> {
    pub fn new(session: &'a mut dyn Session, settings: &'a Settings) -> Self {
        Self {
            session,
            settings,
            downloaded: 0,
        }
    }

    /// Logs into the configured site.
    ///
    /// If the page has no `username` field the session is assumed to be
    /// authenticated already and the call returns silently. There is no
    /// explicit success verification; a bad login surfaces later as empty
    /// listings.
    pub async fn login(&mut self) -> AppResult<()> {
        info!(url = %self.settings.site_url, "Visiting login page");
        self.session.visit(&self.settings.site_url).await?;
        self.session.wait().await;

        let username_fields = self.session.find(Locator::Id(LOGIN_USERNAME_ID)).await?;
        let Some(username_field) = username_fields.first() else {
            debug!("No login form present; assuming existing session");
            return Ok(());
        };
        self.session
            .fill(username_field, &self.settings.username)
            .await?;

        let password_fields = self.session.find(Locator::Id(LOGIN_PASSWORD_ID)).await?;
        let password_field = password_fields.first().ok_or_else(|| {
            AppError::SessionError("login page has a username field but no password field".into())
        })?;
        self.session
            .fill(password_field, &self.settings.password)
            .await?;

        let submits = self.session.find(Locator::Name(LOGIN_SUBMIT_NAME)).await?;
        let submit = submits
            .first()
            .ok_or_else(|| AppError::SessionError("login page has no submit control".into()))?;
        self.session.click(submit).await?;
        self.session.wait().await;

        info!("Logged in");
        Ok(())
    }

    /// Lists `link` and everything below it depth-first, downloading file
    /// rows along the way.
    ///
    /// Returns the name of the relevant directory for this run: the first
    /// subdirectory discovered at the top level, whose local directory is
    /// created under the instance path. Later top-level siblings never
    /// replace it. `None` when the top level has no subdirectories.
    pub async fn list(&mut self, link: &str) -> AppResult<Option<String>> {
        let mut relevant_dir = None;
        let mut stack = vec![PendingDir {
            link: link.to_string(),
            level: 0,
        }];

        while let Some(dir) = stack.pop() {
            if dir.link.is_empty() {
                // Queued from a row without an anchor; nothing to visit.
                warn!(level = dir.level, "Skipping queued entry with empty link");
                continue;
            }

            let children = self.list_directory(&dir).await?;

            if dir.level == 0 && !children.is_empty() {
                let name = children[0].name.clone();
                let path = self.settings.instance_path.join(&name);
                if !path.exists() {
                    fs::create_dir_all(&path)?;
                }
                info!(dir = %name, "Recorded relevant directory");
                relevant_dir = Some(name);
            }

            // Reverse push so the first discovered child is listed first.
            for (sibling, child) in children.into_iter().enumerate().rev() {
                stack.push(PendingDir {
                    link: child.link,
                    level: dir.level + 1 + sibling as u32,
                });
            }
        }

        Ok(relevant_dir)
    }

    /// Lists a single directory across all of its pages, downloading file
    /// rows and collecting subdirectory rows.
    async fn list_directory(&mut self, dir: &PendingDir) -> AppResult<Vec<ChildDir>> {
        debug!(level = dir.level, url = %dir.link, "Listing directory");
        self.session.visit(&dir.link).await?;
        self.session.wait().await;

        let mut children = Vec::new();

        loop {
            let mut rows = self.session.find(Locator::Css(LISTING_ROW_SELECTOR)).await?;
            let mut i = 0;
            while i < rows.len() {
                let anchors = self
                    .session
                    .find_within(Locator::Css(ROW_LINK_SELECTOR), &rows[i])
                    .await?;
                let (text, href) = match anchors.first() {
                    Some(anchor) => (anchor.text().to_string(), anchor.href().to_string()),
                    // No anchor in the link cell: empty name/link, which
                    // classifies as a subdirectory below.
                    None => (String::new(), String::new()),
                };

                if is_file(&href) {
                    info!(url = %href, "Downloading");
                    let recovered = self.download_with_recovery(&href).await?;
                    self.downloaded += 1;
                    if recovered {
                        // Recovery reloaded the listing; row snapshots are stale.
                        rows = self.session.find(Locator::Css(LISTING_ROW_SELECTOR)).await?;
                    }
                } else {
                    children.push(ChildDir {
                        name: text,
                        link: href,
                    });
                }

                i += 1;
            }

            let next_controls = self.session.find(Locator::Css(NEXT_PAGE_SELECTOR)).await?;
            match next_controls.first() {
                Some(control) => self.advance_page(control).await?,
                None => break,
            }
        }

        Ok(children)
    }

    /// Navigates the session to a file link so the download lands in the
    /// download folder. On navigation failure, runs the recovery sequence
    /// (back, wait, reload) and retries with exponential backoff, up to the
    /// configured attempt count.
    ///
    /// Returns whether any recovery ran, in which case the caller's row
    /// snapshots refer to a reloaded page.
    async fn download_with_recovery(&mut self, href: &str) -> AppResult<bool> {
        let mut attempt = 0;
        let mut recovered = false;

        loop {
            match self.session.visit(href).await {
                Ok(()) => {
                    self.session.wait().await;
                    return Ok(recovered);
                }
                Err(e) => {
                    if attempt >= self.settings.max_retries {
                        warn!(url = %href, attempts = attempt + 1, "Download recovery exhausted");
                        return Err(AppError::RetryExhausted {
                            url: href.to_string(),
                            attempts: attempt + 1,
                        });
                    }
                    let delay_ms = backoff_delay(
                        attempt,
                        self.settings.retry_initial_delay_ms,
                        self.settings.retry_max_delay_ms,
                    );
                    warn!(
                        url = %href,
                        attempt = attempt + 1,
                        delay_ms = delay_ms,
                        error = %e,
                        "Download navigation failed, recovering"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    self.session.back().await?;
                    self.session.wait().await;
                    self.session.reload().await?;
                    recovered = true;
                    attempt += 1;
                }
            }
        }
    }

    /// Clicks the next-page control and polls until the rendered page content
    /// changes, bounded by the configured poll timeout.
    async fn advance_page(&mut self, control: &Element) -> AppResult<()> {
        let before = self.session.page_html();
        self.session.click(control).await?;
        self.session.mouse_over(control).await?;

        let deadline = Instant::now() + Duration::from_millis(self.settings.poll_timeout_ms);
        while self.session.page_html() == before {
            if Instant::now() >= deadline {
                return Err(AppError::Timeout {
                    waiting_for: "next listing page to render".into(),
                    timeout_ms: self.settings.poll_timeout_ms,
                });
            }
            tokio::time::sleep(Duration::from_millis(self.settings.poll_interval_ms)).await;
        }

        self.session.wait().await;
        debug!("Advanced to next listing page");
        Ok(())
    }

    /// Relocates everything in the download folder into the relevant
    /// directory under the instance path. Returns the number of files moved.
    pub fn move_files(&self, relevant_dir: &str) -> AppResult<u64> {
        let destination = self.settings.instance_path.join(relevant_dir);
        relocate_downloads(&self.settings.download_folder, &destination)
    }

    /// Cookie snapshot from the session, for handing to plain HTTP callers.
    pub fn get_cookies(&self) -> HashMap<String, String> {
        self.session.cookies()
    }

    /// Number of files downloaded this run.
    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    /// Logs the per-run download count.
    pub fn statistics(&self) {
        info!(downloaded = self.downloaded, "Files downloaded this run");
    }
}

/// Exponential backoff delay in milliseconds: `min(initial * 2^attempt, max)`.
fn backoff_delay(attempt: u32, initial_delay_ms: u64, max_delay_ms: u64) -> u64 {
    initial_delay_ms
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(max_delay_ms)
}
