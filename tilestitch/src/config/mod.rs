pub mod args;

mod error;
pub use error::{ConfigFileError, ConfigFileResult};

mod file;
pub use file::*;
