//! Document-library traversal and download consolidation.
//!
//! The main entry point is [`FileDownloader`]: log in, [`FileDownloader::list`]
//! each configured root, then [`FileDownloader::move_files`] into the relevant
//! directory the listing returned. [`is_file`] is the extension allow-list the
//! traversal classifies rows with, and [`relocate_downloads`] is the shared
//! relocation step.

mod classify;
mod relocate;
mod traversal;

// Re-export public API
pub use classify::is_file;
pub use relocate::relocate_downloads;
pub use traversal::FileDownloader;
