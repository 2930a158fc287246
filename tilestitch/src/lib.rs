//! Command line driver of the tilestitch mosaic engine.
//!
//! Reads a YAML [`Config`](config::Config), lets command line [`Args`](config::args::Args)
//! override it, renders the view with [`tilestitch_core`] and writes a PNG plus
//! its world file.
#![forbid(unsafe_code)]

pub mod config;
pub mod logging;
pub mod output;

mod error;
pub use error::{TileStitchError, TileStitchResult};

mod stitch;
pub use stitch::stitch;
