//! doclib-sync library
//!
//! This crate provides the core functionality for the `doclib-sync` binary.
//! Keep the crate root minimal — implementation and tests live in their modules.
//!
//! ## Overview
//!
//! The library is organized into modules that cover the two halves of the tool:
//!
//! - [`downloader`] - Logs into the document-management site, walks its nested
//!   library folders depth-first and consolidates downloaded files locally
//! - [`watcher`] - Detects changes on a month-keyed public listing page and can
//!   enumerate/fetch the month's folder tree
//! - [`session`] - The browser-session seam: an object-safe trait plus a plain
//!   HTTP implementation the walkers run against
//! - [`notify`] - SMTP notification sent when the watched page changes
//! - [`config`] - Settings loaded from a JSON-with-comments file
//! - [`cli`] - Command-line interface orchestrating download and watch runs
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! A full run logs in, walks each configured root, relocates the downloads,
//! then checks the watched directory:
//!
//! ```no_run
//! use doclib_sync::{cli, errors::AppResult};
//!
//! # async fn example() -> AppResult<()> {
//! cli::cli().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod errors;
pub mod notify;
pub mod session;
pub mod watcher;
