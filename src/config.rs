use crate::constants::{SETTINGS_FILE, SETTINGS_TEMPLATE_FILE};
use crate::errors::{AppError, AppResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime settings, loaded once at startup and immutable for the run.
///
/// The on-disk format is JSON with `//` and `/* */` comments permitted;
/// comments are stripped before the text reaches serde. Retry and polling
/// knobs are optional in the file and fall back to defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Login URL of the document-management site
    pub site_url: String,
    /// Site account username
    pub username: String,
    /// Site account password
    pub password: String,
    /// Browser profile directory handed to the session driver
    #[serde(default)]
    pub browser_profile: String,
    /// Flat folder the browser drops downloads into before relocation
    pub download_folder: PathBuf,
    /// SMTP relay host
    pub email_host: String,
    /// SMTP port; 465 selects implicit TLS, 587 selects STARTTLS
    pub email_port: u16,
    /// Mail account, used as both sender and recipient
    pub email_user: String,
    /// Mail account password
    pub email_password: String,

    /// Maximum recovery attempts after a failed download navigation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial delay in milliseconds before the first retry
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    /// Maximum delay in milliseconds between retries
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Interval between poll probes (pagination refresh, download appearance)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on any single poll before it errors out
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Directory holding settings, the snapshot file and per-run folders.
    /// Supplied by the caller, never read from the file itself.
    #[serde(skip)]
    pub instance_path: PathBuf,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    10000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_poll_timeout_ms() -> u64 {
    30000
}

impl Settings {
    /// Loads settings from `<instance_path>/settings.json`.
    ///
    /// On first run the file does not exist yet; it is seeded from the
    /// `settings.json.example` template next to the instance directory and a
    /// `ConfigError` is returned so the operator fills in credentials before
    /// anything talks to the network.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file was just bootstrapped, if neither
    /// file nor template exist, or if the (comment-stripped) JSON fails to
    /// deserialize. Returns `IoError` on filesystem failures.
    pub fn load(instance_path: &Path) -> AppResult<Self> {
        let settings_file = instance_path.join(SETTINGS_FILE);

        if !settings_file.exists() {
            return Self::bootstrap(instance_path, &settings_file);
        }

        let raw = fs::read_to_string(&settings_file)?;
        let stripped = strip_json_comments(&raw);
        let mut settings: Settings = serde_json::from_str(&stripped)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse settings: {e}")))?;
        settings.instance_path = instance_path.to_path_buf();

        if settings.poll_interval_ms == 0 {
            return Err(AppError::ConfigError(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        Ok(settings)
    }

    fn bootstrap(instance_path: &Path, settings_file: &Path) -> AppResult<Self> {
        let template = instance_path
            .parent()
            .map(|p| p.join(SETTINGS_TEMPLATE_FILE))
            .filter(|p| p.exists());

        match template {
            Some(template) => {
                fs::create_dir_all(instance_path)?;
                fs::copy(&template, settings_file)?;
                Err(AppError::ConfigError(format!(
                    "Created {} from template; fill in credentials and run again",
                    settings_file.display()
                )))
            }
            None => Err(AppError::ConfigError(format!(
                "No settings file at {} and no {} template found",
                settings_file.display(),
                SETTINGS_TEMPLATE_FILE
            ))),
        }
    }

    /// Absolute path of the snapshot file used for change detection.
    pub fn snapshot_file(&self) -> PathBuf {
        self.instance_path.join(crate::constants::SNAPSHOT_FILE)
    }

    /// Absolute path of the HTML notification template.
    pub fn notification_template(&self) -> PathBuf {
        self.instance_path
            .join(crate::constants::NOTIFICATION_TEMPLATE)
    }
}

/// Strips `//` line comments and `/* */` block comments from JSON text.
///
/// Comment markers inside string literals are left alone. Newlines inside
/// removed regions are preserved so parse errors still point at the right
/// line.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        if c == '\n' {
                            out.push('\n');
                        }
                        prev = c;
                    }
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }

    out
}
