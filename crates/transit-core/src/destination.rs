//! Destination resolution for staged files.
//!
//! Every acquisition and derive transformation places its output through
//! [`find_destination`]. With overwrite disabled, an existing `name.ext` is
//! never clobbered: `-1`, `-2`, … is appended to the name until a free path is
//! found. The existence check and the later write are not atomic, so two
//! pipelines sharing a directory can still race.

use std::path::{Path, PathBuf};

const MAX_FILE_NAME_LEN: usize = 255;

/// Resolve the path a file called `name.ext` should be written to inside `dir`.
///
/// An empty `ext` produces a path without an extension.
pub fn find_destination(dir: &Path, name: &str, ext: &str, overwrite: bool) -> PathBuf {
    let file_name = |suffix: Option<u32>| {
        let base = match suffix {
            Some(n) => format!("{}-{}", name, n),
            None => name.to_string(),
        };
        if ext.is_empty() {
            base
        } else {
            format!("{}.{}", base, ext)
        }
    };

    let mut candidate = dir.join(file_name(None));
    if overwrite {
        return candidate;
    }

    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(file_name(Some(counter)));
        counter += 1;
    }

    if counter > 1 {
        tracing::debug!(
            dir = %dir.display(),
            name = %name,
            resolved = %candidate.display(),
            "Destination taken, appended suffix"
        );
    }

    candidate
}

/// Split a raw file name into `(name, extension)`.
///
/// Only the final path component is considered. The extension is lowercased;
/// dot-files such as `.env` have no extension.
pub fn split_file_name(raw: &str) -> (String, String) {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim();

    match base.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() && !ext.is_empty() => {
            (name.to_string(), ext.to_lowercase())
        }
        Some((name, _)) if !name.is_empty() => (name.to_string(), String::new()),
        _ => (base.to_string(), String::new()),
    }
}

/// Reduce a client-supplied file name to a safe basename.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`. Names longer than the
/// filesystem limit are cut from the stem so the extension survives.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let mut s: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim_matches(['.', '_']).is_empty() {
        return "file".to_string();
    }

    // ASCII only from here, so byte and char lengths agree
    if s.len() > MAX_FILE_NAME_LEN {
        s = match s.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_FILE_NAME_LEN / 2 => {
                let keep = MAX_FILE_NAME_LEN - ext.len() - 1;
                format!("{}.{}", &stem[..keep.min(stem.len())], ext)
            }
            _ => s[..MAX_FILE_NAME_LEN].to_string(),
        };
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_find_destination_free_path() {
        let dir = tempdir().unwrap();
        let dest = find_destination(dir.path(), "foo", "jpg", false);
        assert_eq!(dest, dir.path().join("foo.jpg"));
    }

    #[test]
    fn test_find_destination_appends_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.jpg"), b"a").unwrap();
        assert_eq!(
            find_destination(dir.path(), "foo", "jpg", false),
            dir.path().join("foo-1.jpg")
        );

        fs::write(dir.path().join("foo-1.jpg"), b"b").unwrap();
        assert_eq!(
            find_destination(dir.path(), "foo", "jpg", false),
            dir.path().join("foo-2.jpg")
        );
    }

    #[test]
    fn test_find_destination_overwrite_keeps_base() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.jpg"), b"a").unwrap();
        fs::write(dir.path().join("foo-1.jpg"), b"b").unwrap();
        assert_eq!(
            find_destination(dir.path(), "foo", "jpg", true),
            dir.path().join("foo.jpg")
        );
    }

    #[test]
    fn test_find_destination_without_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("README"), b"a").unwrap();
        assert_eq!(
            find_destination(dir.path(), "README", "", false),
            dir.path().join("README-1")
        );
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            split_file_name("photo.JPG"),
            ("photo".to_string(), "jpg".to_string())
        );
        assert_eq!(
            split_file_name("archive.tar.gz"),
            ("archive.tar".to_string(), "gz".to_string())
        );
        assert_eq!(
            split_file_name("/tmp/uploads/cat.png"),
            ("cat".to_string(), "png".to_string())
        );
        assert_eq!(
            split_file_name("C:\\Users\\me\\dog.gif"),
            ("dog".to_string(), "gif".to_string())
        );
        assert_eq!(split_file_name("README"), ("README".to_string(), String::new()));
        assert_eq!(split_file_name(".env"), (".env".to_string(), String::new()));
        assert_eq!(split_file_name("trailing."), ("trailing".to_string(), String::new()));
    }

    #[test]
    fn test_sanitize_replaces_non_ascii() {
        let name = sanitize_file_name("café日本.jpg");
        assert!(name.is_ascii());
        assert_eq!(name, "caf___.jpg");
    }

    #[test]
    fn test_sanitize_double_dot_keeps_extension() {
        assert_eq!(
            split_file_name(&sanitize_file_name("my..photo.JPG")),
            ("my..photo".to_string(), "jpg".to_string())
        );
    }

    #[test]
    fn test_sanitize_caps_length_in_bytes() {
        let raw = format!("{}.jpg", "日".repeat(300));
        let name = sanitize_file_name(&raw);
        assert_eq!(name.len(), MAX_FILE_NAME_LEN);
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("a..b.jpg"), "a..b.jpg");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name("???"), "file");
        assert_eq!(sanitize_file_name(""), "file");
    }
}
