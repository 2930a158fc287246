use tilestitch_utils::Envelope;

/// Errors in the configuration of a [`WmtsSource`](super::WmtsSource).
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum WmtsError {
    /// The base URL is not a valid absolute URL.
    #[error("Invalid WMTS base URL {1}: {0}")]
    InvalidBaseUrl(#[source] url::ParseError, String),

    /// A mandatory parameter is empty.
    #[error("WMTS parameter {0} must not be empty")]
    MissingParameter(&'static str),

    /// The scale denominator cannot produce a usable resolution.
    #[error("WMTS scale denominator {0} must be a finite positive number")]
    InvalidScaleDenominator(f64),

    /// The tile matrix extent has no area.
    #[error("WMTS extent {0} has no area")]
    EmptyExtent(Envelope),
}
