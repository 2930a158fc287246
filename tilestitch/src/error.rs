use std::io;
use std::path::PathBuf;

use tilestitch_core::tiles::MosaicError;

use crate::config::ConfigFileError;

/// A convenience [`Result`] for the tilestitch crate.
pub type TileStitchResult<T> = Result<T, TileStitchError>;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum TileStitchError {
    #[error(transparent)]
    ConfigFileError(#[from] ConfigFileError),

    #[error(transparent)]
    MosaicError(#[from] MosaicError),

    #[error("Unable to write image {1}: {0}")]
    ImageWriteError(#[source] image::ImageError, PathBuf),

    #[error("Nothing to write to {0}: the view covers no tiles")]
    EmptyMosaic(PathBuf),

    #[error("Unable to write world file {1}: {0}")]
    WorldFileWriteError(#[source] io::Error, PathBuf),
}
