//! Core engine of tilestitch.
//!
//! Given a [`MapView`](tiles::MapView) and a tiled raster source, the engine
//! plans a tile grid aligned with the source's own tiling, fetches every tile
//! concurrently and stitches the results into one georeferenced
//! [`Mosaic`](tiles::Mosaic).
//!
//! ```no_run
//! # async fn run() -> tilestitch_core::tiles::MosaicResult<()> {
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tilestitch_core::tiles::xyz::{XyzConfig, XyzSource};
//! use tilestitch_core::tiles::{Crs, FetchOptions, MapView, ReqwestClient, render};
//! use tilestitch_utils::Envelope;
//!
//! let source = XyzSource::new(XyzConfig::web_mercator(
//!     "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
//!     12,
//! ))?;
//! let view = MapView::new(
//!     Envelope::new(-8_240_000.0, 4_970_000.0, -8_230_000.0, 4_980_000.0),
//!     Crs::new("EPSG:3857"),
//!     800,
//!     800,
//!     96.0,
//! );
//! let client = Arc::new(ReqwestClient::new(Duration::from_secs(30), "tilestitch")?);
//! let mosaic = render(&view, &source, client, &FetchOptions::default()).await?;
//! println!("{}x{} px covering {}", mosaic.width(), mosaic.height(), mosaic.envelope);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

/// Configuration helpers shared by the tools built on this crate.
pub mod config;

/// Tile grid planning, fetching and mosaic assembly.
pub mod tiles;
