//! Image lifecycle handling: attaching uploads to records, reconciling a
//! record's stored reference list against disk, and formatting stored relative
//! paths into absolute URLs on the way out.
//!
//! File cleanup is best-effort by contract: a missing file or a permission
//! error is logged and swallowed, and must never fail the owning database
//! mutation.

use chrono::Utc;
use log::{error, info, warn};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A file received in a multipart request, already size- and type-checked.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub original_name: String,
    pub data: Vec<u8>,
}

/// Image reference lists arrive in two shapes: a JSON-encoded array inside a
/// text value (form fields, the database column) or an actual array. Both
/// normalize into one canonical ordered list of non-empty path strings before
/// any lifecycle logic touches them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPathList {
    Text(String),
    List(Vec<serde_json::Value>),
}

impl RawPathList {
    pub fn normalize(self) -> Vec<String> {
        let values = match self {
            RawPathList::Text(text) => {
                match serde_json::from_str::<Vec<serde_json::Value>>(&text) {
                    Ok(values) => values,
                    Err(e) => {
                        warn!("Failed to parse image list: {}", e);
                        return Vec::new();
                    }
                }
            }
            RawPathList::List(values) => values,
        };
        values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect()
    }
}

/// Parses the serialized reference list stored in an `images` column.
pub fn parse_stored(column: Option<&str>) -> Vec<String> {
    match column {
        Some(text) => RawPathList::Text(text.to_string()).normalize(),
        None => Vec::new(),
    }
}

/// Serializes a reference list for storage.
pub fn serialize_paths(paths: &[String]) -> String {
    serde_json::to_string(paths).unwrap_or_else(|_| "[]".to_string())
}

pub fn ensure_upload_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Collision-resistant filename: prefix, millisecond timestamp, random suffix,
/// original extension.
pub fn unique_filename(prefix: &str, original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    format!(
        "{}-{}-{}{}",
        prefix,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        ext
    )
}

/// Writes uploaded files into `dir` under generated names and returns the
/// relative URL paths to store, in upload order. A write failure here fails
/// the request; attach is not best-effort.
pub fn store_uploads(
    dir: &Path,
    url_prefix: &str,
    filename_prefix: &str,
    uploads: &[UploadedImage],
) -> io::Result<Vec<String>> {
    ensure_upload_dir(dir)?;
    let mut paths = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let filename = unique_filename(filename_prefix, &upload.original_name);
        fs::write(dir.join(&filename), &upload.data)?;
        paths.push(format!("{}{}", url_prefix, filename));
    }
    Ok(paths)
}

/// Reduces a full URL back to its path component; relative paths pass through.
pub fn strip_host(path: &str) -> String {
    if let Some(idx) = path.find("://") {
        let rest = &path[idx + 3..];
        match rest.find('/') {
            Some(slash) => rest[slash..].to_string(),
            None => "/".to_string(),
        }
    } else {
        path.to_string()
    }
}

fn file_path_for(dir: &Path, relative: &str) -> Option<PathBuf> {
    let filename = relative.rsplit('/').next().filter(|f| !f.is_empty())?;
    Some(dir.join(filename))
}

/// Removes the file a stored reference points at, if it still exists.
/// Failures are logged and swallowed.
pub fn remove_file_quietly(dir: &Path, relative: &str) {
    let Some(file_path) = file_path_for(dir, relative) else {
        return;
    };
    if file_path.exists() {
        match fs::remove_file(&file_path) {
            Ok(()) => info!("Deleted image file: {}", file_path.display()),
            Err(e) => error!("Error deleting image file {}: {}", file_path.display(), e),
        }
    }
}

/// Deletes every file referenced by `current` but absent from `retained`.
/// Used on update, after the caller has normalized both lists to relative
/// paths.
pub fn reconcile(dir: &Path, current: &[String], retained: &[String]) {
    for path in current.iter().filter(|p| !retained.contains(p)) {
        remove_file_quietly(dir, path);
    }
}

/// Cascade removal of every file a deleted record referenced.
pub fn remove_all(dir: &Path, paths: &[String]) {
    for path in paths {
        remove_file_quietly(dir, path);
    }
}

/// Prefixes a relative path with the request's scheme+host; paths that already
/// carry a scheme pass through unchanged.
pub fn absolute_url(path: &str, base_url: &str) -> String {
    if path.starts_with("http") {
        return path.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    }
}

/// Turns a stored `images` column into the list of absolute URLs returned to
/// callers. Malformed column content or non-string entries degrade to being
/// skipped, never an error.
pub fn format_image_urls(column: Option<&str>, base_url: &str) -> Vec<String> {
    parse_stored(column)
        .iter()
        .map(|path| absolute_url(path, base_url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"img").unwrap();
    }

    #[test]
    fn unique_filename_keeps_prefix_and_extension() {
        let name = unique_filename("property", "living room.JPG");
        assert!(name.starts_with("property-"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn unique_filename_handles_missing_extension() {
        let name = unique_filename("agent", "headshot");
        assert!(name.starts_with("agent-"));
        assert!(!name.contains('.'));
    }

    #[test]
    fn unique_filenames_do_not_collide() {
        let a = unique_filename("property", "a.png");
        let b = unique_filename("property", "a.png");
        assert_ne!(a, b);
    }

    #[test]
    fn normalize_accepts_encoded_text_and_arrays() {
        let from_text = RawPathList::Text(r#"["/uploads/properties/a.jpg","/uploads/properties/b.jpg"]"#.into());
        let from_list = RawPathList::List(vec![
            serde_json::json!("/uploads/properties/a.jpg"),
            serde_json::json!("/uploads/properties/b.jpg"),
        ]);
        assert_eq!(from_text.normalize(), from_list.normalize());
    }

    #[test]
    fn normalize_filters_non_string_entries() {
        let raw = RawPathList::List(vec![
            serde_json::json!("/uploads/properties/a.jpg"),
            serde_json::json!(null),
            serde_json::json!(7),
            serde_json::json!(""),
        ]);
        assert_eq!(raw.normalize(), vec!["/uploads/properties/a.jpg".to_string()]);
    }

    #[test]
    fn normalize_degrades_bad_json_to_empty() {
        assert!(RawPathList::Text("not json".into()).normalize().is_empty());
    }

    #[test]
    fn stored_list_round_trips() {
        let paths = vec![
            "/uploads/properties/a.jpg".to_string(),
            "/uploads/properties/b.jpg".to_string(),
        ];
        let column = serialize_paths(&paths);
        assert_eq!(parse_stored(Some(&column)), paths);
    }

    #[test]
    fn strip_host_reduces_urls_to_paths() {
        assert_eq!(
            strip_host("https://example.com/uploads/properties/a.jpg"),
            "/uploads/properties/a.jpg"
        );
        assert_eq!(strip_host("http://example.com"), "/");
        assert_eq!(strip_host("/uploads/properties/a.jpg"), "/uploads/properties/a.jpg");
    }

    #[test]
    fn reconcile_removes_only_dropped_files() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "b.jpg");
        let current = vec![
            "/uploads/properties/a.jpg".to_string(),
            "/uploads/properties/b.jpg".to_string(),
        ];
        let retained = vec!["/uploads/properties/a.jpg".to_string()];

        reconcile(dir.path(), &current, &retained);

        assert!(dir.path().join("a.jpg").exists());
        assert!(!dir.path().join("b.jpg").exists());
    }

    #[test]
    fn reconcile_is_idempotent_when_everything_is_retained() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        let current = vec!["/uploads/properties/a.jpg".to_string()];

        reconcile(dir.path(), &current, &current);
        reconcile(dir.path(), &current, &current);

        assert!(dir.path().join("a.jpg").exists());
    }

    #[test]
    fn remove_all_tolerates_missing_files() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        let paths = vec![
            "/uploads/properties/a.jpg".to_string(),
            "/uploads/properties/already-gone.jpg".to_string(),
        ];

        remove_all(dir.path(), &paths);

        assert!(!dir.path().join("a.jpg").exists());
    }

    #[test]
    fn store_uploads_returns_relative_paths_in_order() {
        let dir = tempdir().unwrap();
        let uploads = vec![
            UploadedImage { original_name: "front.jpg".into(), data: vec![1] },
            UploadedImage { original_name: "back.png".into(), data: vec![2] },
        ];

        let paths = store_uploads(dir.path(), "/uploads/properties/", "property", &uploads).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with(".jpg"));
        assert!(paths[1].ends_with(".png"));
        for path in &paths {
            assert!(path.starts_with("/uploads/properties/property-"));
            let filename = path.rsplit('/').next().unwrap();
            assert!(dir.path().join(filename).exists());
        }
    }

    #[test]
    fn format_image_urls_prefixes_and_passes_through() {
        let column = r#"["/uploads/properties/a.jpg","http://cdn.example.com/b.jpg","c.jpg"]"#;
        let urls = format_image_urls(Some(column), "http://localhost:8080");
        assert_eq!(
            urls,
            vec![
                "http://localhost:8080/uploads/properties/a.jpg",
                "http://cdn.example.com/b.jpg",
                "http://localhost:8080/c.jpg",
            ]
        );
    }

    #[test]
    fn format_image_urls_never_fails_on_bad_column() {
        assert!(format_image_urls(None, "http://localhost").is_empty());
        assert!(format_image_urls(Some("{broken"), "http://localhost").is_empty());
    }
}
