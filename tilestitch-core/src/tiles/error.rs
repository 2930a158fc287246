use crate::tiles::client::TransportError;

/// Errors that abort the rendering of a mosaic.
///
/// Per-tile HTTP failures are not errors: they are absorbed by painting an
/// error tile. Everything in here is fatal for the whole request.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum MosaicError {
    /// The source computed a resolution that cannot be used to walk a grid.
    #[error("Tile source reported resolution {0}, but it must be a finite positive number")]
    InvalidResolution(f64),

    /// The source declared tiles without area.
    #[error("Tile pixel size {0}x{1} is invalid, both dimensions must be positive")]
    InvalidTileSize(u32, u32),

    /// The view would need more tiles than allowed.
    #[error("The view needs {0}x{1} tiles which exceeds the limit of {2} tiles")]
    TooManyTiles(u64, u64, usize),

    /// A URL could not be parsed.
    #[error("Unable to parse URL {1}: {0}")]
    InvalidUrl(#[source] url::ParseError, String),

    /// The transport could not execute a tile request.
    #[error("Tile request {0} failed: {1}")]
    TransportFailed(String, #[source] TransportError),

    /// The transport could not be created.
    #[error("Unable to create the tile client: {0}")]
    ClientInitFailed(#[from] TransportError),

    /// A successful response did not contain a decodable image.
    #[error("Unable to decode the image returned by {0}: {1}")]
    DecodeFailed(String, #[source] image::ImageError),

    /// The output raster could not be allocated.
    #[error("Unable to allocate a {0}x{1} pixel raster")]
    RasterAllocationFailed(u64, u64),

    /// A fetch result pointed outside of the planned grid.
    #[error("Tile at column {0}, row {1} is outside of the {2}x{3} tile grid")]
    TileOutsideGrid(u32, u32, u32, u32),

    /// A tile task panicked or was cancelled.
    #[error("Tile task did not complete: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    /// Errors of the [`wmts`](crate::tiles::wmts) source.
    #[cfg(feature = "wmts")]
    #[error(transparent)]
    WmtsError(#[from] super::wmts::WmtsError),

    /// Errors of the [`xyz`](crate::tiles::xyz) source.
    #[cfg(feature = "xyz")]
    #[error(transparent)]
    XyzError(#[from] super::xyz::XyzError),

    /// Errors raised by tile sources not implemented in this crate.
    #[error(transparent)]
    OtherError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A convenience [`Result`] for the mosaic engine.
pub type MosaicResult<T> = Result<T, MosaicError>;
