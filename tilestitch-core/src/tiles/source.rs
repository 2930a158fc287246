use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tilestitch_utils::{Coordinate, Envelope};
use url::Url;

use crate::tiles::{Crs, MosaicError, MosaicResult};

/// Largest raster (in pixels) the default [`TileSource::allocate_raster`] hands out.
///
/// `1 << 28` RGBA pixels is one GiB of memory.
pub const DEFAULT_MAX_RASTER_PIXELS: u64 = 1 << 28;

/// Pixel dimensions of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl TileSize {
    /// Creates a tile size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square tiles, the common case.
    #[must_use]
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::square(256)
    }
}

/// HTTP method of a tile request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// Everything the transport needs to fetch one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Full tile URL.
    pub url: Url,
    /// Extra request headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
}

impl TileRequest {
    /// A plain `GET` request without extra headers.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
        }
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl Display for TileRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Capabilities a remote tiled raster source must provide to be mosaicked.
///
/// There is one implementation per tiling protocol. All methods are cheap and
/// synchronous; network access happens only through the
/// [`TileClient`](crate::tiles::TileClient) executing the built [`TileRequest`]s.
pub trait TileSource: Send + Sync + Debug {
    /// Pixel dimensions of one tile.
    fn tile_pixel_size(&self) -> TileSize;

    /// DPI the source's scales are defined for.
    fn layer_dpi(&self) -> f64;

    /// World units per tile pixel in the given CRS at `layer_dpi`.
    fn resolution(&self, crs: &Crs, layer_dpi: f64) -> f64;

    /// Area for which the source has imagery.
    fn source_extent(&self) -> Envelope;

    /// Minimum corner of the tile containing the view's minimum corner.
    ///
    /// The default implementation snaps onto a grid anchored at the minimum
    /// corner of [`source_extent`](Self::source_extent). Sources whose grid is
    /// anchored elsewhere (e.g. at the top-left) should override it.
    fn grid_origin(&self, view: &Envelope, tile_size: Coordinate) -> Coordinate {
        let extent = self.source_extent();
        Coordinate::new(
            snap_down(view.min_x, extent.min_x, tile_size.x),
            snap_down(view.min_y, extent.min_y, tile_size.y),
        )
    }

    /// URI shared by all tile requests, also used as the mosaic's provenance label.
    fn common_uri(&self) -> MosaicResult<Url>;

    /// Builds the request for the tile at the source's own `column`/`row`.
    fn tile_request(
        &self,
        common_uri: &Url,
        bounds: &Envelope,
        tile_size: TileSize,
        column: i64,
        row: i64,
    ) -> MosaicResult<TileRequest>;

    /// Image used for cells outside of [`source_extent`](Self::source_extent).
    ///
    /// `None` leaves those cells transparent.
    fn placeholder_image(&self) -> Option<Arc<RgbaImage>> {
        None
    }

    /// Allocates the output raster.
    fn allocate_raster(&self, width: u32, height: u32) -> MosaicResult<RgbaImage> {
        allocate_transparent(width, height, DEFAULT_MAX_RASTER_PIXELS)
    }
}

/// Boxed tile source trait object.
pub type BoxedSource = Box<dyn TileSource>;

/// Largest grid line `<= value` of the grid anchored at `anchor` with spacing `step`.
pub(crate) fn snap_down(value: f64, anchor: f64, step: f64) -> f64 {
    anchor + ((value - anchor) / step).floor() * step
}

/// Allocates a transparent RGBA raster of at most `max_pixels` pixels.
pub fn allocate_transparent(width: u32, height: u32, max_pixels: u64) -> MosaicResult<RgbaImage> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > max_pixels {
        return Err(MosaicError::RasterAllocationFailed(
            u64::from(width),
            u64::from(height),
        ));
    }
    Ok(RgbaImage::new(width, height))
}

/// A tile of one flat color.
#[must_use]
pub fn solid_tile(size: TileSize, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(size.width, size.height, color)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[derive(Debug)]
    struct Anchored(Envelope);

    impl TileSource for Anchored {
        fn tile_pixel_size(&self) -> TileSize {
            TileSize::square(10)
        }
        fn layer_dpi(&self) -> f64 {
            96.0
        }
        fn resolution(&self, _crs: &Crs, _layer_dpi: f64) -> f64 {
            1.0
        }
        fn source_extent(&self) -> Envelope {
            self.0
        }
        fn common_uri(&self) -> MosaicResult<Url> {
            Ok(Url::parse("http://tiles.test/").unwrap())
        }
        fn tile_request(
            &self,
            common_uri: &Url,
            _bounds: &Envelope,
            _tile_size: TileSize,
            _column: i64,
            _row: i64,
        ) -> MosaicResult<TileRequest> {
            Ok(TileRequest::get(common_uri.clone()))
        }
    }

    #[rstest]
    #[case(Envelope::new(0.0, 0.0, 5.0, 5.0), Coordinate::new(0.0, 0.0))]
    #[case(Envelope::new(15.0, 27.0, 40.0, 40.0), Coordinate::new(10.0, 20.0))]
    #[case(Envelope::new(-3.0, -11.0, 5.0, 5.0), Coordinate::new(-10.0, -20.0))]
    #[case(Envelope::new(30.0, 30.0, 35.0, 35.0), Coordinate::new(30.0, 30.0))]
    fn test_default_grid_origin_snaps_to_extent_grid(
        #[case] view: Envelope,
        #[case] expected: Coordinate,
    ) {
        let source = Anchored(Envelope::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(
            source.grid_origin(&view, Coordinate::new(10.0, 10.0)),
            expected
        );
    }

    #[test]
    fn test_grid_origin_follows_extent_anchor() {
        let source = Anchored(Envelope::new(3.0, -2.0, 100.0, 100.0));
        assert_eq!(
            source.grid_origin(&Envelope::new(14.0, 9.0, 30.0, 30.0), Coordinate::new(10.0, 10.0)),
            Coordinate::new(13.0, 8.0)
        );
    }

    #[test]
    fn test_allocate_transparent_limits() {
        let raster = allocate_transparent(20, 10, 200).unwrap();
        assert_eq!(raster.dimensions(), (20, 10));
        assert!(raster.pixels().all(|p| p.0 == [0, 0, 0, 0]));

        assert!(matches!(
            allocate_transparent(20, 11, 200),
            Err(MosaicError::RasterAllocationFailed(20, 11))
        ));
    }

    #[test]
    fn test_request_display() {
        let request = TileRequest::get(Url::parse("http://tiles.test/1/2/3.png").unwrap())
            .with_header("Referer", "http://print.test/");
        assert_eq!(request.to_string(), "GET http://tiles.test/1/2/3.png");
        assert_eq!(
            request.headers,
            vec![("Referer".to_string(), "http://print.test/".to_string())]
        );
    }
}
