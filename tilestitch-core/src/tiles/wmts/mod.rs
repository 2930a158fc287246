//! WMTS sources using the key-value-pair `GetTile` encoding.
//!
//! The tile matrix is described directly in the configuration (scale
//! denominator and extent), no capabilities document is read.

mod error;
pub use error::WmtsError;

mod source;
pub use source::{WMTS_DPI, WmtsConfig, WmtsSource};
