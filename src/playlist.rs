// Playlist module
// Builds the simulated slideshow's file list from paths, directories and piped input

use crate::cli::ParsedArgs;
use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions the host's image slideshow accepts
pub const IMAGE_EXTENSIONS: [&str; 8] = ["bmp", "tga", "png", "jpeg", "jpg", "gif", "psd", "webp"];

/// Check the extension against the slideshow's accepted image types
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Split piped input into paths, one per non-empty line
pub fn parse_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Image files directly inside `dir`, sorted by path
fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in: {}", dir.display()))?
            .path();
        if path.is_file() && is_image_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    debug!("Found {} image(s) in {}", files.len(), dir.display());
    Ok(files)
}

/// Expand directories and drop non-image files, keeping the given order
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(scan_directory(path)?);
        } else if is_image_file(path) {
            files.push(path.clone());
        } else {
            warn!("Skipping non-image path: {}", path.display());
        }
    }
    Ok(files
        .into_iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect())
}

/// Build the playlist from the parsed arguments
pub fn load_playlist(args: &ParsedArgs) -> Result<Vec<String>> {
    let mut paths = args.paths.clone();
    if let Some(ref list) = args.piped_list {
        paths.extend(parse_list(list));
    }

    let files = collect_files(&paths)?;
    if files.is_empty() {
        bail!("No image files found in the given paths");
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_image_extensions() {
        assert!(is_image_file(Path::new("/a/b.PNG")));
        assert!(is_image_file(Path::new("c.jpeg")));
        assert!(is_image_file(Path::new("layers.psd")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("README")));
    }

    #[test]
    fn test_parse_list() {
        let paths = parse_list("  /a/one.png\n\n/b/two.jpg  \r\n");
        assert_eq!(
            paths,
            vec![PathBuf::from("/a/one.png"), PathBuf::from("/b/two.jpg")]
        );
    }

    #[test]
    fn test_directory_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.jpg", "a.png", "b.txt", "B.WEBP"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = collect_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| {
                Path::new(f)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["B.WEBP", "a.png", "c.jpg"]);
    }

    #[test]
    fn test_explicit_files_keep_order() {
        let files = collect_files(&[
            PathBuf::from("/z/last.png"),
            PathBuf::from("/a/skip.doc"),
            PathBuf::from("/a/first.gif"),
        ])
        .unwrap();
        assert_eq!(files, vec!["/z/last.png", "/a/first.gif"]);
    }

    #[test]
    fn test_empty_playlist_is_an_error() {
        let args = ParsedArgs {
            paths: vec![PathBuf::from("/nothing/here.txt")],
            piped_list: Some("\n".to_string()),
            trigger: crate::script::Trigger::Signals,
            poll_interval: std::time::Duration::from_millis(200),
            slide_duration: std::time::Duration::from_millis(1000),
            steps: None,
        };
        assert!(load_playlist(&args).is_err());
    }

    #[test]
    fn test_missing_path_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        // Not a directory and not an image: skipped, not an error
        assert!(collect_files(&[gone]).unwrap().is_empty());
    }
}
