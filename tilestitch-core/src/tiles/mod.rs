//! Tile mosaic engine.
//!
//! Rendering a view is a strictly forward pipeline:
//! - [`plan`] computes a [`GridPlan`] aligned to the source's native tile grid
//! - [`fetch_tiles`] loads every cell concurrently through a [`TileClient`]
//! - [`assemble`] paints the results into one georeferenced [`Mosaic`]
//!
//! [`render`] runs all three. Each remote tiling protocol is a [`TileSource`]:
//!   - [x] [`wmts`] (key-value-pair `GetTile`)
//!   - [x] [`xyz`] (URL templates, including TMS row order)

mod error;
pub use error::{MosaicError, MosaicResult};

mod view;
pub use view::{Crs, MapView};

mod source;
pub use source::{
    BoxedSource, DEFAULT_MAX_RASTER_PIXELS, HttpMethod, TileRequest, TileSize, TileSource,
    allocate_transparent, solid_tile,
};

mod grid;
pub use grid::{Cell, DEFAULT_MAX_TILES, GridPlan, plan, plan_with_limit};

mod client;
#[cfg(feature = "reqwest")]
pub use client::ReqwestClient;
pub use client::{TileClient, TileResponse, TransportError};

mod fetch;
pub use fetch::{ERROR_TILE_COLOR, FetchOptions, FetchResult, TileOutcome, error_tile, fetch_tiles};

mod mosaic;
pub use mosaic::{Mosaic, MosaicStats, assemble};

mod render;
pub use render::render;

/// Query string helpers for building tile URLs.
pub mod uri;

#[cfg(feature = "wmts")]
/// WMTS key-value-pair [`TileSource`].
pub mod wmts;

#[cfg(feature = "xyz")]
/// `{z}/{x}/{y}` URL template [`TileSource`].
pub mod xyz;
