use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tilestitch_core::tiles::Mosaic;

use crate::{TileStitchError, TileStitchResult};

/// Path of the world file belonging to `image_path`.
#[must_use]
pub fn world_file_path(image_path: &Path) -> PathBuf {
    image_path.with_extension("pgw")
}

/// Writes the mosaic as PNG to `path` and its world file next to it.
///
/// Returns the path of the world file. An empty mosaic writes nothing.
pub fn write_mosaic(mosaic: &Mosaic, path: &Path) -> TileStitchResult<PathBuf> {
    let contents = mosaic
        .world_file()
        .ok_or_else(|| TileStitchError::EmptyMosaic(path.to_path_buf()))?;
    mosaic
        .image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| TileStitchError::ImageWriteError(e, path.to_path_buf()))?;

    let world_file = world_file_path(path);
    fs::write(&world_file, contents)
        .map_err(|e| TileStitchError::WorldFileWriteError(e, world_file.clone()))?;
    Ok(world_file)
}
