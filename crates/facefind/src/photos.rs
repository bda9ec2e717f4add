//! Photo enumeration and decoding.

use facefind_core::{EmbedderError, ProfileError};
use image::{ImageError, ImageReader, RgbImage};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions treated as photos (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Why a single photo produced no result. The batch carries on.
#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("decoding {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: ImageError,
    },
    #[error("extracting faces from {path}: {source}")]
    Extraction {
        path: String,
        #[source]
        source: EmbedderError,
    },
    #[error("matching faces from {path}: {source}")]
    Matching {
        path: String,
        #[source]
        source: ProfileError,
    },
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Every photo under `root`, recursively, sorted by path.
///
/// Fails only if `root` itself cannot be read; unreadable sub-directories are
/// logged and skipped.
pub fn collect_images(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let entries = std::fs::read_dir(root)?;
    walk(entries, &mut found);
    found.sort();
    Ok(found)
}

fn walk(entries: std::fs::ReadDir, found: &mut Vec<PathBuf>) {
    for entry in entries.flatten() {
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            match std::fs::read_dir(&path) {
                Ok(sub) => walk(sub, found),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable directory")
                }
            }
        } else if path.is_file() && is_image(&path) {
            found.push(path);
        }
    }
}

/// Decode a photo into RGB, sniffing the format from its contents.
pub fn decode(path: &Path) -> Result<RgbImage, PhotoError> {
    let decode_err = |source: ImageError| PhotoError::Decode {
        path: path.display().to_string(),
        source,
    };

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| decode_err(ImageError::IoError(e)))?;
    let image = reader.decode().map_err(decode_err)?;
    Ok(image.to_rgb8())
}

/// `<stem>_annotated<.ext>` for a source photo path.
pub fn annotated_file_name(photo: &Path) -> Option<OsString> {
    let stem = photo.file_stem()?;
    let mut name = OsString::from(stem);
    name.push("_annotated");
    if let Some(ext) = photo.extension() {
        name.push(".");
        name.push(ext);
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_image_valid() {
        assert!(is_image(Path::new("test.jpg")));
        assert!(is_image(Path::new("photo.PNG")));
        assert!(is_image(Path::new("image.webp")));
        assert!(is_image(Path::new("dir/scan.JpEg")));
        assert!(is_image(Path::new("old.bmp")));
    }

    #[test]
    fn test_is_image_invalid() {
        assert!(!is_image(Path::new("document.pdf")));
        assert!(!is_image(Path::new("script.py")));
        assert!(!is_image(Path::new("README")));
        assert!(!is_image(Path::new("archive.jpg.zip")));
    }

    #[test]
    fn test_collect_images_recursive_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        for f in ["z.jpg", "b/nested/x.PNG", "a/y.webp", "a/notes.txt", "b/c.gif"] {
            fs::write(root.join(f), b"x").unwrap();
        }

        let found = collect_images(root).unwrap();
        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a/y.webp"),
                PathBuf::from("b/nested/x.PNG"),
                PathBuf::from("z.jpg"),
            ]
        );
    }

    #[test]
    fn test_collect_images_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_images(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(matches!(decode(&path), Err(PhotoError::Decode { .. })));
    }

    #[test]
    fn test_decode_sniffs_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("real.png");
        RgbImage::from_pixel(4, 3, image::Rgb([1, 2, 3])).save(&png).unwrap();
        // Misleading extension: content wins.
        let renamed = dir.path().join("real.jpg");
        fs::rename(&png, &renamed).unwrap();
        let decoded = decode(&renamed).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(0, 0), &image::Rgb([1, 2, 3]));
    }

    #[test]
    fn test_annotated_file_name() {
        assert_eq!(
            annotated_file_name(Path::new("a/b/IMG_1.JPG")),
            Some(OsString::from("IMG_1_annotated.JPG"))
        );
        assert_eq!(
            annotated_file_name(Path::new("party.final.png")),
            Some(OsString::from("party.final_annotated.png"))
        );
        assert_eq!(
            annotated_file_name(Path::new("noext")),
            Some(OsString::from("noext_annotated"))
        );
    }
}
