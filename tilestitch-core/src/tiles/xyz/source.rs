use std::collections::BTreeMap;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use log::debug;
use serde::{Deserialize, Serialize};
use tilestitch_utils::{Coordinate, Envelope};
use url::Url;

use crate::tiles::source::snap_down;
use crate::tiles::xyz::XyzError;
use crate::tiles::{
    Crs, DEFAULT_MAX_RASTER_PIXELS, MosaicError, MosaicResult, TileRequest, TileSize, TileSource,
    allocate_transparent, solid_tile,
};

/// Half the width of the `EPSG:3857` world square, in meters.
pub const WEB_MERCATOR_HALF_WORLD: f64 = 20_037_508.342_789_244;

const MAX_WEB_MERCATOR_ZOOM: i32 = 24;

/// Resolutions of the usual 256 pixel `EPSG:3857` pyramid, zoom 0 first.
#[must_use]
pub fn web_mercator_resolutions() -> Vec<f64> {
    (0..=MAX_WEB_MERCATOR_ZOOM)
        .map(|z| 2.0 * WEB_MERCATOR_HALF_WORLD / 256.0 / 2_f64.powi(z))
        .collect()
}

fn web_mercator_extent() -> Envelope {
    Envelope::new(
        -WEB_MERCATOR_HALF_WORLD,
        -WEB_MERCATOR_HALF_WORLD,
        WEB_MERCATOR_HALF_WORLD,
        WEB_MERCATOR_HALF_WORLD,
    )
}

fn default_layer_dpi() -> f64 {
    96.0
}

/// Configuration of a URL template source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XyzConfig {
    /// Tile URL with `{z}`, `{x}` and `{y}` or `{-y}` placeholders.
    pub url_template: String,
    /// World units per pixel of every zoom level, zoom 0 first.
    #[serde(default = "web_mercator_resolutions")]
    pub resolutions: Vec<f64>,
    /// Zoom level to fetch.
    pub zoom: u8,
    /// Extent of the tile pyramid; tile `0/0/0` is at its top-left corner.
    #[serde(default = "web_mercator_extent")]
    pub extent: Envelope,
    /// Tile size in pixels, 256x256 if unset.
    #[serde(default)]
    pub tile_size: TileSize,
    /// DPI the resolutions relate to when converted to map scales.
    #[serde(default = "default_layer_dpi")]
    pub layer_dpi: f64,
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

impl XyzConfig {
    /// A source on the standard web mercator pyramid.
    #[must_use]
    pub fn web_mercator(url_template: impl Into<String>, zoom: u8) -> Self {
        Self {
            url_template: url_template.into(),
            resolutions: web_mercator_resolutions(),
            zoom,
            extent: web_mercator_extent(),
            tile_size: TileSize::default(),
            layer_dpi: default_layer_dpi(),
            headers: BTreeMap::new(),
            missing_tile_color: None,
            max_raster_pixels: None,
        }
    }
}

/// A tile pyramid addressed by URL templates.
#[derive(Debug, Clone)]
pub struct XyzSource {
    config: XyzConfig,
    resolution: f64,
    /// Number of tile rows at the configured zoom, including a partial bottom row.
    matrix_height: i64,
    placeholder: Option<Arc<RgbaImage>>,
}

impl XyzSource {
    /// Validates the configuration and creates the source.
    pub fn new(config: XyzConfig) -> Result<Self, XyzError> {
        let template = &config.url_template;
        if !template.contains("{z}") {
            return Err(XyzError::MissingPlaceholder(template.clone(), "{z}"));
        }
        if !template.contains("{x}") {
            return Err(XyzError::MissingPlaceholder(template.clone(), "{x}"));
        }
        if !template.contains("{y}") && !template.contains("{-y}") {
            return Err(XyzError::MissingPlaceholder(template.clone(), "{y}"));
        }
        Url::parse(&expand(template, 0, 0, 0, 0))
            .map_err(|e| XyzError::InvalidTemplate(e, template.clone()))?;

        let resolution = *config
            .resolutions
            .get(usize::from(config.zoom))
            .ok_or(XyzError::ZoomOutOfRange(config.zoom, config.resolutions.len()))?;
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(XyzError::InvalidResolution(resolution, config.zoom));
        }
        if config.extent.is_empty() {
            return Err(XyzError::EmptyExtent(config.extent));
        }

        let tile_height = resolution * f64::from(config.tile_size.height);
        // the epsilon keeps whole tile counts from rounding up
        let matrix_height = (config.extent.height() / tile_height - 1e-9).ceil() as i64;
        let placeholder = config
            .missing_tile_color
            .map(|c| Arc::new(solid_tile(config.tile_size, Rgba(c))));
        debug!(
            "XYZ source {} at zoom {} ({resolution} units/px, {matrix_height} rows)",
            config.url_template, config.zoom
        );
        Ok(Self {
            config,
            resolution,
            matrix_height,
            placeholder,
        })
    }

    /// The configuration the source was created from.
    #[must_use]
    pub fn config(&self) -> &XyzConfig {
        &self.config
    }
}

fn expand(template: &str, zoom: u8, x: i64, y: i64, flipped_y: i64) -> String {
    template
        .replace("{z}", &zoom.to_string())
        .replace("{x}", &x.to_string())
        .replace("{-y}", &flipped_y.to_string())
        .replace("{y}", &y.to_string())
}

impl TileSource for XyzSource {
    fn tile_pixel_size(&self) -> TileSize {
        self.config.tile_size
    }

    fn layer_dpi(&self) -> f64 {
        self.config.layer_dpi
    }

    /// Resolutions are configured in world units, so neither argument matters.
    fn resolution(&self, _crs: &Crs, _layer_dpi: f64) -> f64 {
        self.resolution
    }

    fn source_extent(&self) -> Envelope {
        self.config.extent
    }

    /// Rows are numbered down from the top of the extent, so the grid hangs from it.
    fn grid_origin(&self, view: &Envelope, tile_size: Coordinate) -> Coordinate {
        let extent = self.config.extent;
        Coordinate::new(
            snap_down(view.min_x, extent.min_x, tile_size.x),
            snap_down(view.min_y, extent.max_y, tile_size.y),
        )
    }

    /// The part of the template before the first placeholder.
    fn common_uri(&self) -> MosaicResult<Url> {
        let template = &self.config.url_template;
        let prefix = template.find('{').map_or(template.as_str(), |i| &template[..i]);
        Url::parse(prefix).map_err(|e| MosaicError::InvalidUrl(e, prefix.to_string()))
    }

    fn tile_request(
        &self,
        _common_uri: &Url,
        _bounds: &Envelope,
        _tile_size: TileSize,
        column: i64,
        row: i64,
    ) -> MosaicResult<TileRequest> {
        let flipped = self.matrix_height - 1 - row;
        let url = expand(&self.config.url_template, self.config.zoom, column, row, flipped);
        let url = Url::parse(&url).map_err(|e| MosaicError::InvalidUrl(e, url))?;

        let mut request = TileRequest::get(url);
        for (name, value) in &self.config.headers {
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

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;
    use crate::tiles::{MapView, plan};

    fn view(envelope: Envelope) -> MapView {
        MapView::new(envelope, Crs::new("EPSG:3857"), 256, 256, 96.0)
    }

    #[rstest]
    #[case::xyz("https://tiles.test/{z}/{x}/{y}.png", "https://tiles.test/1/1/0.png")]
    #[case::tms("https://tiles.test/tms/{z}/{x}/{-y}.png", "https://tiles.test/tms/1/1/1.png")]
    #[case::query("https://tiles.test/t?z={z}&x={x}&y={y}", "https://tiles.test/t?z=1&x=1&y=0")]
    fn test_tile_urls(#[case] template: &str, #[case] expected: &str) {
        let source = XyzSource::new(XyzConfig::web_mercator(template, 1)).unwrap();
        // the north-east quarter of the world is tile 1/1/0
        let grid = plan(
            &view(Envelope::new(1000.0, 1000.0, 2000.0, 2000.0)),
            &source,
        )
        .unwrap();
        assert_eq!(grid.len(), 1);
        let cell = grid.cell(0, 0).unwrap();

        let common = source.common_uri().unwrap();
        let request = source
            .tile_request(&common, &cell.bounds, grid.tile_pixel_size, cell.source_col, cell.source_row)
            .unwrap();
        assert_eq!(request.url.as_str(), expected);
    }

    #[test]
    fn test_web_mercator_resolutions() {
        let resolutions = web_mercator_resolutions();
        assert_eq!(resolutions.len(), 25);
        assert_relative_eq!(resolutions[0], 156_543.033_928_040_97, max_relative = 1e-12);
        assert_relative_eq!(resolutions[1] * 2.0, resolutions[0]);
    }

    #[test]
    fn test_common_uri_is_template_prefix() {
        let source =
            XyzSource::new(XyzConfig::web_mercator("https://tiles.test/osm/{z}/{x}/{y}.png", 3))
                .unwrap();
        assert_eq!(source.common_uri().unwrap().as_str(), "https://tiles.test/osm/");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: XyzConfig =
            serde_yaml::from_str("url_template: https://tiles.test/{z}/{x}/{y}.png\nzoom: 4\n")
                .unwrap();
        assert_eq!(config, XyzConfig::web_mercator("https://tiles.test/{z}/{x}/{y}.png", 4));
    }

    #[rstest]
    #[case("https://tiles.test/{x}/{y}.png", "{z}")]
    #[case("https://tiles.test/{z}/{y}.png", "{x}")]
    #[case("https://tiles.test/{z}/{x}.png", "{y}")]
    fn test_missing_placeholder(#[case] template: &str, #[case] placeholder: &str) {
        let err = XyzSource::new(XyzConfig::web_mercator(template, 1)).unwrap_err();
        assert!(matches!(err, XyzError::MissingPlaceholder(_, p) if p == placeholder));
    }

    #[test]
    fn test_invalid_config() {
        let err = XyzSource::new(XyzConfig::web_mercator("{z}/{x}/{y}.png", 1)).unwrap_err();
        assert!(matches!(err, XyzError::InvalidTemplate(..)));

        let err =
            XyzSource::new(XyzConfig::web_mercator("https://t.test/{z}/{x}/{y}", 25)).unwrap_err();
        assert!(matches!(err, XyzError::ZoomOutOfRange(25, 25)));

        let mut config = XyzConfig::web_mercator("https://t.test/{z}/{x}/{y}", 0);
        config.resolutions = vec![-1.0];
        let err = XyzSource::new(config).unwrap_err();
        assert!(matches!(err, XyzError::InvalidResolution(_, 0)));
    }

    /// 300 unit tiles on a 1000 unit square: the bottom row is cut at y = 0.
    fn partial_row_source(template: &str) -> XyzSource {
        let mut config = XyzConfig::web_mercator(template, 0);
        config.extent = Envelope::new(0.0, 0.0, 1000.0, 1000.0);
        config.resolutions = vec![300.0 / 256.0];
        XyzSource::new(config).unwrap()
    }

    #[rstest]
    #[case::top(Envelope::new(750.0, 750.0, 800.0, 800.0), 700.0, 0, "https://t.test/0/2/0/3.png")]
    #[case::middle(Envelope::new(750.0, 450.0, 800.0, 500.0), 400.0, 1, "https://t.test/0/2/1/2.png")]
    #[case::bottom(Envelope::new(750.0, 150.0, 800.0, 200.0), 100.0, 2, "https://t.test/0/2/2/1.png")]
    fn test_grid_hangs_from_top_of_extent(
        #[case] envelope: Envelope,
        #[case] min_y: f64,
        #[case] source_row: i64,
        #[case] expected: &str,
    ) {
        let source = partial_row_source("https://t.test/{z}/{x}/{y}/{-y}.png");
        let grid = plan(&view(envelope), &source).unwrap();
        assert_eq!(grid.len(), 1);
        let cell = grid.cell(0, 0).unwrap();
        assert_eq!(cell.bounds, Envelope::new(600.0, min_y, 900.0, min_y + 300.0));
        assert_eq!((cell.source_col, cell.source_row), (2, source_row));
        assert!(cell.visible);

        let common = source.common_uri().unwrap();
        let request = source
            .tile_request(&common, &cell.bounds, grid.tile_pixel_size, cell.source_col, cell.source_row)
            .unwrap();
        assert_eq!(request.url.as_str(), expected);
    }

    #[test]
    fn test_partial_bottom_row_is_not_fetched() {
        let source = partial_row_source("https://t.test/{z}/{x}/{y}.png");
        let grid = plan(&view(Envelope::new(750.0, 50.0, 800.0, 80.0)), &source).unwrap();
        let cell = grid.cell(0, 0).unwrap();
        assert_eq!(cell.bounds.min_y, -200.0);
        assert_eq!(cell.source_row, 3);
        assert!(!cell.visible);
    }

    #[test]
    fn test_outside_world_is_placeholder() {
        let mut config = XyzConfig::web_mercator("https://t.test/{z}/{x}/{y}", 2);
        config.missing_tile_color = Some([200, 200, 200, 255]);
        let source = XyzSource::new(config).unwrap();

        let east = WEB_MERCATOR_HALF_WORLD * 1.6;
        let grid = plan(
            &view(Envelope::new(east, 0.0, east + 1.0, 1.0)),
            &source,
        )
        .unwrap();
        assert_eq!(grid.visible_count(), 0);
        assert_eq!(
            source.placeholder_image().unwrap().get_pixel(0, 0).0,
            [200, 200, 200, 255]
        );
    }
}
