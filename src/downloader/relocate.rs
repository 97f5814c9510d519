use crate::constants::APPLICATION_FILES;
use crate::errors::AppResult;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Moves downloaded files out of the flat download folder into `destination`.
///
/// Reserved application filenames stay put, existing destination files are
/// never overwritten, and anything that is not a plain file is left alone.
/// Returns the number of files moved.
pub fn relocate_downloads(download_folder: &Path, destination: &Path) -> AppResult<u64> {
    let mut moved = 0;

    for entry in fs::read_dir(download_folder)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            warn!(entry = ?file_name, "Skipping non-UTF-8 filename");
            continue;
        };

        if APPLICATION_FILES.contains(&name) {
            continue;
        }

        let target = destination.join(name);
        if target.exists() {
            debug!(file = name, "Destination already has this file, skipping");
            continue;
        }

        let source = entry.path();
        if !source.is_file() {
            continue;
        }

        // Rename first; fall back to copy+remove when the destination sits
        // on another filesystem.
        if fs::rename(&source, &target).is_err() {
            fs::copy(&source, &target)?;
            fs::remove_file(&source)?;
        }
        debug!(file = name, dest = %destination.display(), "Relocated");
        moved += 1;
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::relocate_downloads;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn moves_plain_files_and_counts_them() {
        let tmp = TempDir::new().unwrap();
        let downloads = tmp.path().join("downloads");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&downloads).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(downloads.join("a.zip"), b"a").unwrap();
        fs::write(downloads.join("b.xlsx"), b"b").unwrap();

        let moved = relocate_downloads(&downloads, &dest).unwrap();

        assert_eq!(moved, 2);
        assert!(dest.join("a.zip").exists());
        assert!(dest.join("b.xlsx").exists());
        assert!(!downloads.join("a.zip").exists());
    }

    #[test]
    fn reserved_application_files_stay_put() {
        let tmp = TempDir::new().unwrap();
        let downloads = tmp.path().join("downloads");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&downloads).unwrap();
        fs::create_dir_all(&dest).unwrap();
        for name in ["__init__", "web-dirs", "notification.html", "settings.json"] {
            fs::write(downloads.join(name), b"x").unwrap();
        }
        fs::write(downloads.join("real.zip"), b"x").unwrap();

        let moved = relocate_downloads(&downloads, &dest).unwrap();

        assert_eq!(moved, 1);
        assert!(downloads.join("web-dirs").exists());
        assert!(downloads.join("settings.json").exists());
        assert!(!dest.join("notification.html").exists());
    }

    #[test]
    fn never_overwrites_existing_destination_files() {
        let tmp = TempDir::new().unwrap();
        let downloads = tmp.path().join("downloads");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&downloads).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(downloads.join("a.zip"), b"new").unwrap();
        fs::write(dest.join("a.zip"), b"old").unwrap();

        let moved = relocate_downloads(&downloads, &dest).unwrap();

        assert_eq!(moved, 0);
        assert_eq!(fs::read(dest.join("a.zip")).unwrap(), b"old");
        // The source is left in the download folder, same as before.
        assert!(downloads.join("a.zip").exists());
    }

    #[test]
    fn directories_in_the_download_folder_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let downloads = tmp.path().join("downloads");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(downloads.join("subdir")).unwrap();
        fs::create_dir_all(&dest).unwrap();

        let moved = relocate_downloads(&downloads, &dest).unwrap();

        assert_eq!(moved, 0);
        assert!(downloads.join("subdir").exists());
    }
}
