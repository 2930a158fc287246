use std::path::PathBuf;

use tilestitch_utils::Envelope;

pub type ConfigFileResult<T> = Result<T, ConfigFileError>;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error("Unable to load config file {1}: {0}")]
    ConfigLoadError(#[source] std::io::Error, PathBuf),

    #[error("Unable to parse config file {1}: {0}")]
    ConfigParseError(#[source] subst::yaml::Error, PathBuf),

    #[error("Unable to serialize the configuration: {0}")]
    ConfigSerializeError(#[source] serde_yaml::Error),

    #[error("Unable to write config file {1}: {0}")]
    ConfigWriteError(#[source] std::io::Error, PathBuf),

    #[error(
        "No tile source configured. Add a 'source' section with 'type: wmts' or 'type: xyz' to the config file."
    )]
    NoSource,

    #[error("The view needs either 'bbox' or both 'center' and 'scale'")]
    MissingViewArea,

    #[error("The view cannot have both 'bbox' and 'center'")]
    AmbiguousViewArea,

    #[error("The view needs 'width', 'height' or both")]
    MissingViewSize,

    #[error("The view bbox {0} has no area")]
    EmptyViewBbox(Envelope),

    #[error("The view {0} must be positive, but is {1}")]
    InvalidViewValue(&'static str, f64),

    #[error("The concurrency must be at least 1")]
    InvalidConcurrency,
}
