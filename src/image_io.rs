use std::fs;
use std::path::{Path, PathBuf};
use image::{ImageFormat, RgbImage};

use crate::errors::{AnnotatorError, Result};

/// File extensions picked up when scanning an input folder
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    /// File name including extension, used to name outputs
    pub filename: String,
}

/// Check whether a path has one of the supported image extensions (any case)
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Get all supported image files directly inside a directory, sorted by path
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(AnnotatorError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(AnnotatorError::InvalidConfiguration(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut image_files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            image_files.push(path);
        }
    }
    image_files.sort();

    Ok(image_files)
}

/// Decode an image file into 8-bit RGB.
///
/// Any failure is reported as [`AnnotatorError::UnreadableInput`] so a batch can skip it.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();
    let unreadable = |reason: String| AnnotatorError::UnreadableInput {
        path: path.to_path_buf(),
        reason,
    };

    let filename = path.file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| unreadable("file name is not valid UTF-8".to_string()))?
        .to_string();

    let img = image::open(path).map_err(|e| unreadable(e.to_string()))?;

    Ok(InputImage {
        image: img.to_rgb8(),
        path: path.to_path_buf(),
        filename,
    })
}

/// Save an RGB image, choosing the encoder from the extension (PNG when unknown)
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    image.save_with_format(path, format)?;
    Ok(())
}
