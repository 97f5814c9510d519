//! Month-keyed web-directory watching.
//!
//! [`DirectoryWatcher`] fetches the current month's listing page over plain
//! HTTP (replaying cookies captured by the session driver), detects change
//! against a saved snapshot, and can enumerate and fetch the month's folder
//! tree through a [`Session`].
//!
//! Change detection compares byte lengths only. Content edits that keep the
//! length identical are invisible to it; this is a known limitation of the
//! snapshot scheme, kept as the contract.

use crate::config::Settings;
use crate::constants::{MONTHS, URL_TO_WATCH, USER_AGENTS};
use crate::downloader::relocate_downloads;
use crate::errors::{AppError, AppResult};
use crate::session::{Locator, Session};
use chrono::{Datelike, Local};
use reqwest::header::COOKIE;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Outcome of a snapshot comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Unchanged,
    Changed,
}

/// Builds the month-keyed remote root and local directory name for a given
/// date: `{base}{year}/{MM}_{MONTH_NAME}/` and `{year}-{MM}`.
pub fn month_roots(base: &str, year: i32, month: u32) -> (String, String) {
    let name = MONTHS[(month as usize) - 1];
    let remote = format!("{base}{year}/{month:02}_{name}/");
    let local = format!("{year}-{month:02}");
    (remote, local)
}

/// Second-to-last path segment of a folder href; directory listings end their
/// folder links with a trailing slash, so this is the folder's own name.
pub fn folder_segment(href: &str) -> Option<&str> {
    let segments: Vec<&str> = href.split('/').collect();
    if segments.len() < 2 {
        return None;
    }
    let segment = segments[segments.len() - 2];
    (!segment.is_empty()).then_some(segment)
}

/// Length-only change check between the stored snapshot text and the current
/// page text.
pub fn detect_change(previous: &str, current: &str) -> Change {
    if previous.len() != current.len() {
        Change::Changed
    } else {
        Change::Unchanged
    }
}

pub struct DirectoryWatcher<'a> {
    settings: &'a Settings,
    cookies: HashMap<String, String>,
    text: String,
    current_root: String,
    current_local_root: String,
}

impl<'a> DirectoryWatcher<'a> {
    /// Creates a watcher. `cookies` are typically the session cookies
    /// captured after login, replayed on the plain HTTP fetch.
    pub fn new(settings: &'a Settings, cookies: HashMap<String, String>) -> Self {
        Self {
            settings,
            cookies,
            text: String::new(),
            current_root: String::new(),
            current_local_root: String::new(),
        }
    }

    fn refresh_roots(&mut self) {
        let now = Local::now();
        let (remote, local) = month_roots(URL_TO_WATCH, now.year(), now.month());
        self.current_root = remote;
        self.current_local_root = local;
    }

    /// The month-keyed URL the watcher currently points at.
    pub fn current_root(&self) -> &str {
        &self.current_root
    }

    /// Fetches the current month's listing page and stores its text.
    ///
    /// # Errors
    ///
    /// Any non-200 response is an error; callers treat a failed read as
    /// "skip this cycle" rather than a change.
    pub async fn read(&mut self) -> AppResult<()> {
        self.refresh_roots();

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENTS[0])
            .build()?;
        let mut request = client.get(&self.current_root);
        if !self.cookies.is_empty() {
            let pairs: Vec<String> = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            request = request.header(COOKIE, pairs.join("; "));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AppError::NetworkError(format!(
                "GET {} returned {}",
                self.current_root,
                response.status()
            )));
        }

        self.text = response.text().await?;
        debug!(url = %self.current_root, bytes = self.text.len(), "Read watched page");
        Ok(())
    }

    /// Compares the current text against the stored snapshot.
    ///
    /// With no prior snapshot, the current text becomes the baseline and no
    /// change is reported. Otherwise only byte lengths are compared.
    pub fn compare(&self) -> AppResult<Change> {
        let snapshot = self.settings.snapshot_file();
        if !snapshot.exists() {
            self.save()?;
            info!(file = %snapshot.display(), "No snapshot yet, saved baseline");
            return Ok(Change::Unchanged);
        }

        let previous = fs::read_to_string(&snapshot)?;
        Ok(detect_change(&previous, &self.text))
    }

    /// Overwrites the snapshot file with the current text.
    pub fn save(&self) -> AppResult<()> {
        fs::write(self.settings.snapshot_file(), &self.text)?;
        Ok(())
    }

    /// Text of the last successful [`read`](Self::read).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the stored page text. Lets callers run [`compare`](Self::compare)
    /// and [`save`](Self::save) against text obtained out of band.
    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    /// Enumerates the month root's subfolders through the session.
    ///
    /// The first anchor on the page is the parent-directory link and is
    /// skipped. A local directory is created per folder under the month's
    /// local root. Returns the folder hrefs; no traversal happens here.
    pub async fn list_folders(&mut self, session: &mut dyn Session) -> AppResult<Vec<String>> {
        self.refresh_roots();
        session.visit(&self.current_root).await?;
        session.wait().await;

        let base_path = self.settings.instance_path.join(&self.current_local_root);
        let anchors = session.find(Locator::Css("a")).await?;

        let mut folders = Vec::new();
        for anchor in anchors.iter().skip(1) {
            let href = anchor.href().to_string();
            if let Some(segment) = folder_segment(&href) {
                let path = base_path.join(segment);
                if !path.exists() {
                    fs::create_dir_all(&path)?;
                }
            }
            folders.push(href);
        }

        info!(folders = folders.len(), root = %self.current_root, "Enumerated month folders");
        Ok(folders)
    }

    /// Visits every file link in `folder_url` (again skipping the leading
    /// parent-directory anchor) to trigger downloads, waiting for each file
    /// to appear in the download folder before moving on. Returns the local
    /// destination directory for this folder.
    pub async fn fetch_folder(
        &mut self,
        session: &mut dyn Session,
        folder_url: &str,
    ) -> AppResult<PathBuf> {
        self.refresh_roots();
        session.visit(folder_url).await?;
        session.wait().await;

        let base_path = self.settings.instance_path.join(&self.current_local_root);
        let destination = base_path.join(folder_segment(folder_url).unwrap_or_default());

        let anchors = session.find(Locator::Css("a")).await?;
        let links: Vec<String> = anchors
            .iter()
            .skip(1)
            .map(|a| a.href().to_string())
            .collect();

        for link in links {
            debug!(url = %link, "Fetching file");
            session.visit(&link).await?;

            let name = link.rsplit('/').next().unwrap_or("");
            let expected = self.settings.download_folder.join(name);
            self.wait_for_download(&expected).await?;
            session.wait().await;
        }

        Ok(destination)
    }

    /// Bounded poll for a download landing on disk.
    async fn wait_for_download(&self, expected: &Path) -> AppResult<()> {
        let deadline = Instant::now() + Duration::from_millis(self.settings.poll_timeout_ms);
        while !expected.exists() {
            if Instant::now() >= deadline {
                return Err(AppError::Timeout {
                    waiting_for: format!("download to appear at {}", expected.display()),
                    timeout_ms: self.settings.poll_timeout_ms,
                });
            }
            tokio::time::sleep(Duration::from_millis(self.settings.poll_interval_ms)).await;
        }
        Ok(())
    }

    /// Relocates downloads into an explicit destination directory, with the
    /// same skip rules as the downloader's relocation step.
    pub fn move_files(&self, destination: &Path) -> AppResult<u64> {
        relocate_downloads(&self.settings.download_folder, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_roots_builds_padded_segments() {
        let (remote, local) = month_roots("https://example.com/base/", 2026, 8);
        assert_eq!(remote, "https://example.com/base/2026/08_AGOSTO/");
        assert_eq!(local, "2026-08");
    }

    #[test]
    fn month_roots_december_unpadded_year_boundary() {
        let (remote, local) = month_roots("https://example.com/base/", 2025, 12);
        assert_eq!(remote, "https://example.com/base/2025/12_DEZEMBRO/");
        assert_eq!(local, "2025-12");
    }

    #[test]
    fn folder_segment_takes_second_to_last() {
        assert_eq!(
            folder_segment("https://example.com/2026/08_AGOSTO/folder1/"),
            Some("folder1")
        );
        assert_eq!(
            folder_segment("https://example.com/a/b/file.zip"),
            Some("b")
        );
    }

    #[test]
    fn folder_segment_handles_degenerate_hrefs() {
        assert_eq!(folder_segment(""), None);
        assert_eq!(folder_segment("plain"), None);
        assert_eq!(folder_segment("//"), None);
    }

    #[test]
    fn detect_change_is_length_only() {
        assert_eq!(detect_change("abc", "abcd"), Change::Changed);
        assert_eq!(detect_change("abc", "xyz"), Change::Unchanged);
        assert_eq!(detect_change("", ""), Change::Unchanged);
    }
}
