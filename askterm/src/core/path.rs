//! Pure path rewriting used by file actions and prompt rendering.

use std::path::{Path, PathBuf};

/// Expand a leading `~` (alone or followed by a separator) against `home`.
///
/// Paths without the shorthand, `~user` forms, and calls without a known
/// home directory are returned unchanged.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return home.to_path_buf();
    }
    match path
        .strip_prefix("~/")
        .or_else(|| path.strip_prefix("~\\"))
    {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Replace a leading `home` in `path` with `~`.
pub fn mask_home(path: &Path, home: Option<&Path>) -> String {
    if let Some(home) = home
        && let Ok(rest) = path.strip_prefix(home)
    {
        if rest.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// Target for the single retry after the user declined an overwrite.
///
/// `name` is resolved against the original file's directory. When it names
/// a directory the original file name is kept; when it has no extension the
/// original extension is carried over.
pub fn retry_path(original: &Path, name: &Path, name_is_dir: bool) -> PathBuf {
    let parent = original.parent().unwrap_or_else(|| Path::new(""));
    let candidate = parent.join(name);
    if name_is_dir {
        return match original.file_name() {
            Some(file_name) => candidate.join(file_name),
            None => candidate,
        };
    }
    match (candidate.extension(), original.extension()) {
        (None, Some(ext)) => candidate.with_extension(ext),
        _ => candidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_rewrites_tilde_prefix() {
        let home = Path::new("/home/me");
        assert_eq!(
            expand_home("~/notes.txt", Some(home)),
            PathBuf::from("/home/me/notes.txt")
        );
        assert_eq!(expand_home("~", Some(home)), PathBuf::from("/home/me"));
    }

    #[test]
    fn expand_home_leaves_other_paths() {
        let home = Path::new("/home/me");
        assert_eq!(expand_home("/tmp/a", Some(home)), PathBuf::from("/tmp/a"));
        assert_eq!(expand_home("~bob/a", Some(home)), PathBuf::from("~bob/a"));
        assert_eq!(expand_home("~/a", None), PathBuf::from("~/a"));
    }

    #[test]
    fn mask_home_hides_home_prefix() {
        let home = Path::new("/home/me");
        assert_eq!(mask_home(Path::new("/home/me/src"), Some(home)), "~/src");
        assert_eq!(mask_home(Path::new("/home/me"), Some(home)), "~");
        assert_eq!(mask_home(Path::new("/opt/x"), Some(home)), "/opt/x");
    }

    #[test]
    fn retry_path_is_relative_to_original_directory() {
        let original = Path::new("/home/me/notes.txt");
        assert_eq!(
            retry_path(original, Path::new("notes2.txt"), false),
            PathBuf::from("/home/me/notes2.txt")
        );
    }

    #[test]
    fn retry_path_carries_extension() {
        let original = Path::new("/home/me/notes.txt");
        assert_eq!(
            retry_path(original, Path::new("draft"), false),
            PathBuf::from("/home/me/draft.txt")
        );
    }

    #[test]
    fn retry_path_into_directory_keeps_file_name() {
        let original = Path::new("/home/me/notes.txt");
        assert_eq!(
            retry_path(original, Path::new("archive"), true),
            PathBuf::from("/home/me/archive/notes.txt")
        );
    }
}
