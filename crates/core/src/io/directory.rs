//! Loading a directory of per-image TIFF or `.npy` files into one stack

use super::geotiff::read_multiband;
use super::npy::read_npy_image;
use crate::error::{Error, Result};
use crate::stack::ImageStack;
use ndarray::Array3;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: [&str; 3] = ["tif", "tiff", "npy"];

/// List the image files of a directory, sorted by file name.
///
/// Directory listing order is platform dependent, so the result is always
/// sorted to keep image indices stable.
pub fn list_image_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::MissingResource(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if is_image && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load every TIFF and `.npy` image of a directory into an [`ImageStack`].
///
/// Images are concatenated in sorted file-name order and must all share the
/// same `(band, row, col)` shape.
pub fn load_image_dir<P: AsRef<Path>>(dir: P) -> Result<ImageStack> {
    let dir = dir.as_ref();
    let files = list_image_files(dir)?;
    if files.is_empty() {
        return Err(Error::MissingResource(dir.join("*.tif")));
    }

    let images = files
        .iter()
        .map(|path| {
            debug!("reading {}", path.display());
            read_image(path)
        })
        .collect::<Result<Vec<_>>>()?;

    ImageStack::from_images(images)?.with_sources(files)
}

/// Read one image file, dispatching on its extension.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Array3<f64>> {
    let path = path.as_ref();
    let is_npy = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("npy"));
    if is_npy {
        read_npy_image(path)
    } else {
        read_multiband(path)
    }
}
