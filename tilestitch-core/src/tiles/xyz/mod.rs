//! Sources addressed with `{z}/{x}/{y}` URL templates, such as OpenStreetMap
//! style slippy map servers and TMS endpoints (`{-y}`).

mod error;
pub use error::XyzError;

mod source;
pub use source::{WEB_MERCATOR_HALF_WORLD, XyzConfig, XyzSource, web_mercator_resolutions};
