use crate::config::Settings;
use crate::constants::ROOT_DIRS;
use crate::downloader::FileDownloader;
use crate::errors::{AppError, AppResult};
use crate::notify;
use crate::session::HttpSession;
use crate::watcher::{Change, DirectoryWatcher};
use clap::{Arg, ArgAction, Command};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

fn instance_arg() -> Arg<'static> {
    Arg::new("instance")
        .short('i')
        .long("instance")
        .help("Instance directory holding settings.json, the snapshot and per-run folders")
        .default_value("instance")
        .action(ArgAction::Set)
}

/// Parses command-line arguments and runs the selected workflow.
///
/// Subcommands:
/// - `download`: log in, walk every configured document-library root,
///   download recognized files and relocate them into the relevant directory
/// - `watch`: fetch the watched month-keyed page, compare against the
///   snapshot, notify and re-baseline on change
/// - `sync`: both, reusing the download session's cookies for the watch
pub async fn cli() -> AppResult<()> {
    let cmd = Command::new("doclib-sync")
        .version(APP_VERSION)
        .author(APP_AUTHOR)
        .about(APP_ABOUT)
        .subcommand(
            Command::new("download")
                .about("Log in and download new document-library files")
                .arg(instance_arg()),
        )
        .subcommand(
            Command::new("watch")
                .about("Check the watched month directory and notify on change")
                .arg(instance_arg()),
        )
        .subcommand(
            Command::new("sync")
                .about("Download files, then check the watched directory")
                .arg(instance_arg()),
        );

    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("download", sub)) => {
            let settings = load_settings(sub)?;
            run_download(&settings).await?;
        }
        Some(("watch", sub)) => {
            let settings = load_settings(sub)?;
            run_watch(&settings, HashMap::new()).await?;
        }
        Some(("sync", sub)) => {
            let settings = load_settings(sub)?;
            let cookies = run_download(&settings).await?;
            run_watch(&settings, cookies).await?;
        }
        _ => {
            cmd_for_help
                .print_help()
                .map_err(|e| AppError::IoError(format!("Failed to print help: {e}")))?;
        }
    }

    Ok(())
}

fn load_settings(sub: &clap::ArgMatches) -> AppResult<Settings> {
    let instance = sub
        .get_one::<String>("instance")
        .expect("instance has default_value");
    Settings::load(Path::new(instance))
}

/// Walks every configured root, relocates the downloads, and returns the
/// session cookies for reuse by the watcher.
async fn run_download(settings: &Settings) -> AppResult<HashMap<String, String>> {
    let mut session = HttpSession::new(settings.download_folder.clone())?;
    let mut downloader = FileDownloader::new(&mut session, settings);

    downloader.login().await?;

    for root in ROOT_DIRS {
        info!(root, "Walking document library");
        match downloader.list(root).await? {
            Some(relevant_dir) => {
                let moved = downloader.move_files(&relevant_dir)?;
                info!(moved, dir = %relevant_dir, "Relocated downloads");
            }
            None => warn!(root, "No subdirectories discovered at top level"),
        }
    }

    downloader.statistics();
    Ok(downloader.get_cookies())
}

/// One watch cycle: read, compare, notify + re-baseline on change.
///
/// A failed read is logged and skipped rather than escalated; the next run
/// gets another chance.
async fn run_watch(settings: &Settings, cookies: HashMap<String, String>) -> AppResult<()> {
    let mut watcher = DirectoryWatcher::new(settings, cookies);

    if let Err(e) = watcher.read().await {
        warn!(error = %e, "Failed to read watched directory, skipping this cycle");
        return Ok(());
    }

    match watcher.compare()? {
        Change::Changed => {
            info!(url = %watcher.current_root(), "Change detected");
            notify::send_notification(settings).await?;
            watcher.save()?;
        }
        Change::Unchanged => {
            info!(url = %watcher.current_root(), "No change detected");
        }
    }

    Ok(())
}
