use std::fmt::Write as _;

use image::RgbaImage;
use image::imageops::replace;
use tilestitch_utils::Envelope;
use url::Url;

use crate::tiles::{Crs, FetchResult, GridPlan, MosaicError, MosaicResult, TileOutcome, TileSource};

/// How the cells of a mosaic were filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MosaicStats {
    /// Tiles downloaded successfully.
    pub fetched: usize,
    /// Tiles replaced by an error tile.
    pub failed: usize,
    /// Cells outside of the source extent.
    pub placeholders: usize,
}

/// The stitched raster of one view, with its georeferencing.
#[derive(Debug, Clone)]
pub struct Mosaic {
    /// The stitched raster.
    pub image: RgbaImage,
    /// World bounds covered by [`image`](Self::image).
    pub envelope: Envelope,
    /// CRS of [`envelope`](Self::envelope).
    pub crs: Crs,
    /// Where the tiles came from.
    pub label: Url,
    /// How the cells were filled.
    pub stats: MosaicStats,
}

impl Mosaic {
    /// Raster width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Raster height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// World units per pixel along x and y, `None` for an empty raster.
    #[must_use]
    pub fn pixel_size(&self) -> Option<(f64, f64)> {
        if self.width() == 0 || self.height() == 0 {
            return None;
        }
        Some((
            self.envelope.width() / f64::from(self.width()),
            self.envelope.height() / f64::from(self.height()),
        ))
    }

    /// ESRI world file contents georeferencing [`image`](Self::image).
    ///
    /// The six lines are the pixel width, two zero rotation terms, the negated
    /// pixel height and the center of the upper-left pixel. An empty raster
    /// cannot be georeferenced and has none.
    #[must_use]
    pub fn world_file(&self) -> Option<String> {
        let (px, py) = self.pixel_size()?;
        let mut out = String::new();
        for value in [
            px,
            0.0,
            0.0,
            -py,
            self.envelope.min_x + px / 2.0,
            self.envelope.max_y - py / 2.0,
        ] {
            let _ = writeln!(out, "{value}");
        }
        Some(out)
    }
}

/// Paints every fetched tile into one raster.
///
/// The raster is allocated through [`TileSource::allocate_raster`] and is
/// exactly `columns * tile width` by `rows * tile height` pixels. Tiles are
/// copied at their cell's pixel offset without scaling, later results
/// overwriting earlier ones. Results without an image leave their area
/// transparent.
pub fn assemble(
    results: Vec<FetchResult>,
    plan: &GridPlan,
    source: &dyn TileSource,
) -> MosaicResult<Mosaic> {
    let tile = plan.tile_pixel_size;
    let width = u64::from(plan.columns) * u64::from(tile.width);
    let height = u64::from(plan.rows) * u64::from(tile.height);
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(MosaicError::RasterAllocationFailed(width, height));
    };
    let mut image = source.allocate_raster(w, h)?;

    let mut stats = MosaicStats::default();
    for result in results {
        if result.col >= plan.columns || result.row >= plan.rows {
            return Err(MosaicError::TileOutsideGrid(
                result.col,
                result.row,
                plan.columns,
                plan.rows,
            ));
        }
        match result.outcome {
            TileOutcome::Fetched => stats.fetched += 1,
            TileOutcome::Failed { .. } => stats.failed += 1,
            TileOutcome::Placeholder => stats.placeholders += 1,
        }
        if let Some(tile_image) = result.image {
            let x = i64::from(result.col) * i64::from(tile.width);
            let y = i64::from(result.row) * i64::from(tile.height);
            replace(&mut image, tile_image.as_ref(), x, y);
        }
    }

    Ok(Mosaic {
        image,
        envelope: plan.envelope(),
        crs: plan.crs.clone(),
        label: source.common_uri()?,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::Rgba;
    use insta::assert_snapshot;

    use super::*;
    use crate::tiles::{MapView, TileRequest, TileSize, allocate_transparent, plan, solid_tile};

    #[derive(Debug)]
    struct SmallSource {
        max_pixels: u64,
    }

    impl TileSource for SmallSource {
        fn tile_pixel_size(&self) -> TileSize {
            TileSize::new(4, 2)
        }
        fn layer_dpi(&self) -> f64 {
            96.0
        }
        fn resolution(&self, _crs: &Crs, _layer_dpi: f64) -> f64 {
            0.5
        }
        fn source_extent(&self) -> Envelope {
            Envelope::new(0.0, 0.0, 100.0, 100.0)
        }
        fn common_uri(&self) -> MosaicResult<Url> {
            Ok(Url::parse("http://tiles.test/wmts").unwrap())
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
        fn allocate_raster(&self, width: u32, height: u32) -> MosaicResult<RgbaImage> {
            allocate_transparent(width, height, self.max_pixels)
        }
    }

    const SOURCE: SmallSource = SmallSource { max_pixels: 1 << 20 };

    fn three_by_two() -> GridPlan {
        // tiles are 2x1 world units
        let view = MapView::new(
            Envelope::new(10.0, 20.0, 16.0, 22.0),
            Crs::new("EPSG:2056"),
            12,
            4,
            96.0,
        );
        plan(&view, &SOURCE).unwrap()
    }

    fn result(row: u32, col: u32, color: Option<[u8; 4]>, outcome: TileOutcome) -> FetchResult {
        FetchResult {
            image: color.map(|c| Arc::new(solid_tile(TileSize::new(4, 2), Rgba(c)))),
            col,
            row,
            outcome,
        }
    }

    #[test]
    fn test_assemble_paints_at_offsets() {
        let grid = three_by_two();
        assert_eq!((grid.columns, grid.rows), (3, 2));

        let results = vec![
            result(0, 0, Some([255, 0, 0, 255]), TileOutcome::Fetched),
            result(1, 2, Some([0, 255, 0, 255]), TileOutcome::Fetched),
            result(0, 2, Some([255, 155, 155, 255]), TileOutcome::Failed { status: 500 }),
            result(1, 0, None, TileOutcome::Placeholder),
        ];
        let mosaic = assemble(results, &grid, &SOURCE).unwrap();

        assert_eq!((mosaic.width(), mosaic.height()), (12, 4));
        assert_eq!(mosaic.image.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(mosaic.image.get_pixel(3, 1).0, [255, 0, 0, 255]);
        assert_eq!(mosaic.image.get_pixel(4, 0).0, [0, 0, 0, 0]);
        assert_eq!(mosaic.image.get_pixel(8, 1).0, [255, 155, 155, 255]);
        assert_eq!(mosaic.image.get_pixel(11, 3).0, [0, 255, 0, 255]);
        assert_eq!(mosaic.image.get_pixel(0, 2).0, [0, 0, 0, 0]);

        assert_eq!(mosaic.envelope, Envelope::new(10.0, 20.0, 16.0, 22.0));
        assert_eq!(mosaic.crs, Crs::new("EPSG:2056"));
        assert_eq!(mosaic.label.as_str(), "http://tiles.test/wmts");
        assert_eq!(
            mosaic.stats,
            MosaicStats {
                fetched: 2,
                failed: 1,
                placeholders: 1
            }
        );
    }

    #[test]
    fn test_result_outside_grid() {
        let grid = three_by_two();
        let err = assemble(
            vec![result(2, 0, Some([0, 0, 0, 255]), TileOutcome::Fetched)],
            &grid,
            &SOURCE,
        )
        .unwrap_err();
        assert!(matches!(err, MosaicError::TileOutsideGrid(0, 2, 3, 2)));
    }

    #[test]
    fn test_allocation_failure() {
        let grid = three_by_two();
        let err = assemble(Vec::new(), &grid, &SmallSource { max_pixels: 10 }).unwrap_err();
        assert!(matches!(err, MosaicError::RasterAllocationFailed(12, 4)));
    }

    #[test]
    fn test_world_file() {
        let mosaic = assemble(Vec::new(), &three_by_two(), &SOURCE).unwrap();
        assert_eq!(mosaic.pixel_size(), Some((0.5, 0.5)));
        assert_snapshot!(mosaic.world_file().unwrap(), @r"
        0.5
        0
        0
        -0.5
        10.25
        21.75
        ");
    }

    #[test]
    fn test_empty_view_has_no_world_file() {
        let view = MapView::new(
            Envelope::new(10.0, 20.0, 10.0, 20.0),
            Crs::new("EPSG:2056"),
            0,
            0,
            96.0,
        );
        let grid = plan(&view, &SOURCE).unwrap();
        assert!(grid.is_empty());

        let mosaic = assemble(Vec::new(), &grid, &SOURCE).unwrap();
        assert_eq!((mosaic.width(), mosaic.height()), (0, 0));
        assert_eq!(mosaic.pixel_size(), None);
        assert_eq!(mosaic.world_file(), None);
    }
}
