/// Errors in the configuration of an [`XyzSource`](super::XyzSource).
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum XyzError {
    /// The template does not produce valid URLs.
    #[error("Invalid URL template {1}: {0}")]
    InvalidTemplate(#[source] url::ParseError, String),

    /// The template lacks a placeholder needed to address tiles.
    #[error("URL template {0} has no {1} placeholder")]
    MissingPlaceholder(String, &'static str),

    /// The zoom level has no configured resolution.
    #[error("Zoom level {0} is out of range, only {1} resolutions are configured")]
    ZoomOutOfRange(u8, usize),

    /// The configured resolution cannot be used.
    #[error("Resolution {0} of zoom level {1} must be a finite positive number")]
    InvalidResolution(f64, u8),

    /// The extent has no area.
    #[error("Extent {0} has no area")]
    EmptyExtent(tilestitch_utils::Envelope),
}
