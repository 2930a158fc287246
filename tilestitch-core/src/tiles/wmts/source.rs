use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tilestitch_utils::{Coordinate, DataFormat, Envelope, Scale};
use url::Url;

use crate::tiles::source::snap_down;
use crate::tiles::uri::{QueryParams, add_params, set_query_params};
use crate::tiles::wmts::WmtsError;
use crate::tiles::{
    Crs, DEFAULT_MAX_RASTER_PIXELS, MosaicResult, TileRequest, TileSize, TileSource,
    allocate_transparent, solid_tile,
};

/// DPI of the OGC standardized rendering pixel (0.28 mm).
pub const WMTS_DPI: f64 = 25.4 / 0.28;

fn default_style() -> String {
    "default".to_string()
}

fn default_image_format() -> String {
    "image/png".to_string()
}

/// Configuration of one WMTS layer at one tile matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmtsConfig {
    /// `GetTile` endpoint, may already carry query parameters.
    pub base_url: String,
    /// Layer identifier.
    pub layer: String,
    /// Style identifier, `default` if unset.
    #[serde(default = "default_style")]
    pub style: String,
    /// Tile matrix set identifier.
    pub tile_matrix_set: String,
    /// Identifier of the tile matrix to use.
    pub tile_matrix: String,
    /// Scale denominator of [`tile_matrix`](Self::tile_matrix).
    pub scale_denominator: f64,
    /// Extent of the tile matrix, its top-left corner is the matrix origin.
    pub extent: Envelope,
    /// Tile size in pixels, 256x256 if unset.
    #[serde(default)]
    pub tile_size: TileSize,
    /// Mime type sent as `FORMAT`.
    #[serde(default = "default_image_format")]
    pub image_format: String,
    /// Extra query parameters sent with every request (dimensions, API keys, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_params: BTreeMap<String, String>,
    /// Extra HTTP headers sent with every request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// RGBA color painted outside of the extent. Transparent if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_tile_color: Option<[u8; 4]>,
    /// Largest mosaic that may be allocated, in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_raster_pixels: Option<u64>,
}

/// A WMTS layer requested with `REQUEST=GetTile` key-value pairs.
#[derive(Debug, Clone)]
pub struct WmtsSource {
    config: WmtsConfig,
    base_url: Url,
    placeholder: Option<Arc<RgbaImage>>,
}

impl WmtsSource {
    /// Validates the configuration and creates the source.
    pub fn new(config: WmtsConfig) -> Result<Self, WmtsError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| WmtsError::InvalidBaseUrl(e, config.base_url.clone()))?;
        for (name, value) in [
            ("layer", &config.layer),
            ("tile_matrix_set", &config.tile_matrix_set),
            ("tile_matrix", &config.tile_matrix),
        ] {
            if value.trim().is_empty() {
                return Err(WmtsError::MissingParameter(name));
            }
        }
        let denominator = config.scale_denominator;
        if !denominator.is_finite() || denominator <= 0.0 {
            return Err(WmtsError::InvalidScaleDenominator(denominator));
        }
        if config.extent.is_empty() {
            return Err(WmtsError::EmptyExtent(config.extent));
        }
        if DataFormat::parse(&config.image_format).is_none() {
            warn!(
                "WMTS layer {} uses format {} which may not be decodable",
                config.layer, config.image_format
            );
        }

        let placeholder = config
            .missing_tile_color
            .map(|c| Arc::new(solid_tile(config.tile_size, Rgba(c))));
        debug!(
            "WMTS layer {} at matrix {}/{} from {base_url}",
            config.layer, config.tile_matrix_set, config.tile_matrix
        );
        Ok(Self {
            config,
            base_url,
            placeholder,
        })
    }

    /// The configuration the source was created from.
    #[must_use]
    pub fn config(&self) -> &WmtsConfig {
        &self.config
    }
}

impl TileSource for WmtsSource {
    fn tile_pixel_size(&self) -> TileSize {
        self.config.tile_size
    }

    fn layer_dpi(&self) -> f64 {
        WMTS_DPI
    }

    fn resolution(&self, crs: &Crs, layer_dpi: f64) -> f64 {
        Scale::new(self.config.scale_denominator).to_resolution(crs.unit(), layer_dpi)
    }

    fn source_extent(&self) -> Envelope {
        self.config.extent
    }

    /// WMTS tile matrices grow down and to the right from the top-left corner.
    fn grid_origin(&self, view: &Envelope, tile_size: Coordinate) -> Coordinate {
        let extent = self.config.extent;
        Coordinate::new(
            snap_down(view.min_x, extent.min_x, tile_size.x),
            snap_down(view.min_y, extent.max_y, tile_size.y),
        )
    }

    fn common_uri(&self) -> MosaicResult<Url> {
        let params: QueryParams = self.config.custom_params.iter().collect();
        let overrides: HashSet<String> = self.config.custom_params.keys().cloned().collect();
        Ok(add_params(&self.base_url, &params, &overrides))
    }

    fn tile_request(
        &self,
        common_uri: &Url,
        _bounds: &Envelope,
        _tile_size: TileSize,
        column: i64,
        row: i64,
    ) -> MosaicResult<TileRequest> {
        let mut params = QueryParams::from_url(common_uri);
        let config = &self.config;
        let (row, column) = (row.to_string(), column.to_string());
        for (key, value) in [
            ("SERVICE", "WMTS"),
            ("REQUEST", "GetTile"),
            ("VERSION", "1.0.0"),
            ("LAYER", config.layer.as_str()),
            ("STYLE", config.style.as_str()),
            ("TILEMATRIXSET", config.tile_matrix_set.as_str()),
            ("TILEMATRIX", config.tile_matrix.as_str()),
            ("TILEROW", row.as_str()),
            ("TILECOL", column.as_str()),
            ("FORMAT", config.image_format.as_str()),
        ] {
            params.add_override(key, value);
        }

        let mut request = TileRequest::get(set_query_params(common_uri, &params));
        for (name, value) in &config.headers {
            request = request.with_header(name, value);
        }
        Ok(request)
    }

    fn placeholder_image(&self) -> Option<Arc<RgbaImage>> {
        self.placeholder.clone()
    }

    fn allocate_raster(&self, width: u32, height: u32) -> MosaicResult<RgbaImage> {
        let max_pixels = self
            .config
            .max_raster_pixels
            .unwrap_or(DEFAULT_MAX_RASTER_PIXELS);
        allocate_transparent(width, height, max_pixels)
    }
}
