use std::collections::{BTreeSet, HashMap};
use std::ffi::OsStr;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use subst::VariableMap;
use tilestitch_core::tiles::wmts::{WmtsConfig, WmtsSource};
use tilestitch_core::tiles::xyz::{XyzConfig, XyzSource};
use tilestitch_core::tiles::{
    BoxedSource, Crs, FetchOptions, MapView, MosaicResult, ReqwestClient, TileClient,
};
use tilestitch_utils::{Coordinate, Envelope, Scale};
use tracing::{info, warn};

use crate::TileStitchResult;
use crate::config::{ConfigFileError, ConfigFileResult};

pub type UnrecognizedValues = HashMap<String, serde_yaml::Value>;
pub type UnrecognizedKeys = BTreeSet<String>;

/// Sent as `User-Agent` unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("tilestitch/", env!("CARGO_PKG_VERSION"));

/// Rendering DPI of a view without an explicit `dpi`.
pub const DEFAULT_DPI: f64 = 96.0;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of tile requests in flight, the number of CPUs if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Maximum number of tiles a single view may need.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tiles: Option<usize>,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,

    #[serde(default)]
    pub view: ViewConfig,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

/// Settings of the HTTP client used for all tile requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout of a single tile request, e.g. `30s` or `2m`.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
            unrecognized: UnrecognizedValues::new(),
        }
    }
}

impl HttpConfig {
    pub fn create_client(&self) -> MosaicResult<Arc<dyn TileClient>> {
        let client = ReqwestClient::new(self.timeout, &self.user_agent)?;
        Ok(Arc::new(client))
    }
}

/// The tile server to read from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Wmts(WmtsConfig),
    Xyz(XyzConfig),
}

impl SourceConfig {
    pub fn resolve(&self) -> MosaicResult<BoxedSource> {
        Ok(match self {
            Self::Wmts(cfg) => Box::new(WmtsSource::new(cfg.clone())?),
            Self::Xyz(cfg) => Box::new(XyzSource::new(cfg.clone())?),
        })
    }
}

/// The area to render, either as `bbox` or as `center` plus `scale`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// `[min_x, min_y, max_x, max_y]` in units of `crs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Envelope>,

    /// `[x, y]` in units of `crs`, requires `scale`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,

    /// Scale denominator, e.g. `25000` for 1:25000.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,

    #[serde(default)]
    pub crs: Crs,

    /// Output width in pixels. Derived from `height` and the bbox if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Output height in pixels. Derived from `width` and the bbox if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<f64>,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl ViewConfig {
    pub fn to_map_view(&self) -> ConfigFileResult<MapView> {
        let dpi = self.dpi.unwrap_or(DEFAULT_DPI);
        check_positive("dpi", dpi)?;

        match (self.bbox, self.center, self.scale) {
            (Some(_), Some(_), _) => Err(ConfigFileError::AmbiguousViewArea),
            (Some(bbox), None, _) => {
                if bbox.is_empty() {
                    return Err(ConfigFileError::EmptyViewBbox(bbox));
                }
                let (width, height) = self.pixel_size(Some(bbox.width() / bbox.height()))?;
                Ok(MapView::new(bbox, self.crs.clone(), width, height, dpi))
            }
            (None, Some([x, y]), Some(scale)) => {
                check_positive("scale", scale)?;
                let (width, height) = self.pixel_size(None)?;
                Ok(MapView::from_center(
                    Coordinate::new(x, y),
                    Scale::new(scale),
                    self.crs.clone(),
                    width,
                    height,
                    dpi,
                ))
            }
            _ => Err(ConfigFileError::MissingViewArea),
        }
    }

    /// Output size, filling in a missing dimension from the `aspect` ratio if known.
    fn pixel_size(&self, aspect: Option<f64>) -> ConfigFileResult<(u32, u32)> {
        let (width, height) = match (self.width, self.height, aspect) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, Some(aspect)) => (w, (f64::from(w) / aspect).round() as u32),
            (None, Some(h), Some(aspect)) => ((f64::from(h) * aspect).round() as u32, h),
            _ => return Err(ConfigFileError::MissingViewSize),
        };
        check_positive("width", f64::from(width))?;
        check_positive("height", f64::from(height))?;
        Ok((width, height))
    }
}

fn check_positive(name: &'static str, value: f64) -> ConfigFileResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigFileError::InvalidViewValue(name, value))
    }
}

/// Everything needed to render one mosaic, resolved from a [`Config`].
#[derive(Debug)]
pub struct RenderJob {
    pub view: MapView,
    pub source: BoxedSource,
    pub options: FetchOptions,
}

impl Config {
    /// Validate the config, warning about and returning all unrecognized keys.
    pub fn finalize(&mut self) -> ConfigFileResult<UnrecognizedKeys> {
        let mut res = UnrecognizedKeys::new();
        copy_unrecognized_keys_from_config(&mut res, "", &self.unrecognized);
        copy_unrecognized_keys_from_config(&mut res, "http.", &self.http.unrecognized);
        copy_unrecognized_keys_from_config(&mut res, "view.", &self.view.unrecognized);

        for key in &res {
            warn!(
                "Ignoring unrecognized configuration key '{key}'. Please check your configuration file for typos."
            );
        }

        if self.concurrency == Some(0) {
            return Err(ConfigFileError::InvalidConcurrency);
        }
        if self.source.is_none() {
            return Err(ConfigFileError::NoSource);
        }
        Ok(res)
    }

    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions {
        let defaults = FetchOptions::default();
        FetchOptions {
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            max_tiles: self.max_tiles.unwrap_or(defaults.max_tiles),
        }
    }

    pub fn resolve(&self) -> TileStitchResult<RenderJob> {
        let source = self.source.as_ref().ok_or(ConfigFileError::NoSource)?;
        Ok(RenderJob {
            view: self.view.to_map_view()?,
            source: source.resolve()?,
            options: self.fetch_options(),
        })
    }

    pub fn save_to_file(&self, file_name: &Path) -> ConfigFileResult<()> {
        let yaml = serde_yaml::to_string(&self).map_err(ConfigFileError::ConfigSerializeError)?;
        if file_name.as_os_str() == OsStr::new("-") {
            info!("Current tilestitch configuration:");
            println!("\n\n{yaml}\n");
            Ok(())
        } else {
            info!(
                "Saving config to {}, use --config to load it",
                file_name.display()
            );
            File::create(file_name)
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))?
                .write_all(yaml.as_bytes())
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))?;
            Ok(())
        }
    }
}

pub fn copy_unrecognized_keys_from_config(
    result: &mut UnrecognizedKeys,
    prefix: &str,
    unrecognized: &UnrecognizedValues,
) {
    result.extend(unrecognized.keys().map(|k| format!("{prefix}{k}")));
}

/// Read a YAML config file, substituting `${VAR}` references from `env`.
pub fn read_config<'a, M>(file_name: &Path, env: &'a M) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    let mut file =
        File::open(file_name).map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    parse_config(&contents, env, file_name)
}

pub fn parse_config<'a, M>(contents: &str, env: &'a M, file_name: &Path) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    subst::yaml::from_str(contents, env)
        .map_err(|e| ConfigFileError::ConfigParseError(e, file_name.into()))
}
