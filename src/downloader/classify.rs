use crate::constants::ALLOWED_EXTENSIONS;

/// Classifies a link as a downloadable file by its suffix.
///
/// A link is a file iff it ends with one of the allow-listed extensions,
/// lowercase only. Everything else is treated as a navigable subdirectory.
/// Deliberately naive: a directory whose name ends in `.zip` would be
/// misclassified, and an uppercase `.ZIP` is not a file. This exact check is
/// the contract; callers depend on it.
pub fn is_file(link: &str) -> bool {
    ALLOWED_EXTENSIONS
        .iter()
        .any(|ext| link.ends_with(&format!(".{ext}")))
}
