use tilestitch_utils::{Coordinate, Envelope};

use crate::tiles::{Crs, MapView, MosaicError, MosaicResult, TileSize, TileSource};

/// Default upper bound on the number of cells a single plan may contain.
pub const DEFAULT_MAX_TILES: usize = 10_000;

/// One tile position of a [`GridPlan`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// World bounds of the tile.
    pub bounds: Envelope,
    /// Column in the mosaic, increasing eastward.
    pub col: u32,
    /// Row in the mosaic, row 0 is the northernmost.
    pub row: u32,
    /// Column in the source's own tile matrix.
    pub source_col: i64,
    /// Row in the source's own tile matrix, counted from the top of its extent.
    pub source_row: i64,
    /// Whether the tile is fetched, or replaced by the source's placeholder.
    pub visible: bool,
}

/// The tile grid covering a view, aligned with the source's native tiling.
///
/// Cells are stored row-major from the top-left, so the cell at `(row, col)`
/// lives at index `row * columns + col`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    /// Lower-left corner of the lower-left cell.
    pub origin: Coordinate,
    /// Tile size in world units.
    pub tile_size: Coordinate,
    /// Tile size in pixels.
    pub tile_pixel_size: TileSize,
    /// World units per pixel.
    pub resolution: f64,
    /// CRS of the view the grid was planned for.
    pub crs: Crs,
    /// Number of cells per row.
    pub columns: u32,
    /// Number of cells per column.
    pub rows: u32,
    cells: Vec<Cell>,
}

impl GridPlan {
    /// All cells, row-major from the top-left.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cell at the given mosaic position.
    #[must_use]
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.index(row, col).and_then(|i| self.cells.get(i))
    }

    /// Arena index of the cell at `(row, col)`.
    #[must_use]
    pub fn index(&self, row: u32, col: u32) -> Option<usize> {
        if row < self.rows && col < self.columns {
            Some(row as usize * self.columns as usize + col as usize)
        } else {
            None
        }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the view had no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// World bounds covered by all cells together.
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        Envelope::new(
            self.origin.x,
            self.origin.y,
            self.origin.x + f64::from(self.columns) * self.tile_size.x,
            self.origin.y + f64::from(self.rows) * self.tile_size.y,
        )
    }

    /// Number of cells that will be requested from the source.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.cells.iter().filter(|c| c.visible).count()
    }
}

/// Plans the tile grid for `view` with at most [`DEFAULT_MAX_TILES`] cells.
pub fn plan(view: &MapView, source: &dyn TileSource) -> MosaicResult<GridPlan> {
    plan_with_limit(view, source, DEFAULT_MAX_TILES)
}

/// Plans the tile grid for `view`, failing if it needs more than `max_tiles` cells.
///
/// The grid starts at the source's [`grid_origin`](TileSource::grid_origin)
/// and extends east and north until it covers the view's maximum corner.
pub fn plan_with_limit(
    view: &MapView,
    source: &dyn TileSource,
    max_tiles: usize,
) -> MosaicResult<GridPlan> {
    let resolution = source.resolution(&view.crs, source.layer_dpi());
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(MosaicError::InvalidResolution(resolution));
    }
    let tile_pixel_size = source.tile_pixel_size();
    if tile_pixel_size.width == 0 || tile_pixel_size.height == 0 {
        return Err(MosaicError::InvalidTileSize(
            tile_pixel_size.width,
            tile_pixel_size.height,
        ));
    }

    let tile_size = Coordinate::new(
        f64::from(tile_pixel_size.width) * resolution,
        f64::from(tile_pixel_size.height) * resolution,
    );
    let origin = source.grid_origin(&view.envelope, tile_size);

    let mut grid = GridPlan {
        origin,
        tile_size,
        tile_pixel_size,
        resolution,
        crs: view.crs.clone(),
        columns: 0,
        rows: 0,
        cells: Vec::new(),
    };
    if view.envelope.is_empty() {
        return Ok(grid);
    }

    let limit = max_tiles as u64;
    let columns = count_steps(origin.x, view.envelope.max_x, tile_size.x, limit);
    let rows = count_steps(origin.y, view.envelope.max_y, tile_size.y, limit);
    let too_many = match (columns, rows) {
        (Some(c), Some(r)) => c.saturating_mul(r) > limit,
        _ => true,
    };
    if too_many {
        return Err(MosaicError::TooManyTiles(
            columns.unwrap_or(u64::MAX),
            rows.unwrap_or(u64::MAX),
            max_tiles,
        ));
    }
    // both are at most max_tiles here
    let columns = u32::try_from(columns.unwrap_or_default()).unwrap_or(u32::MAX);
    let rows = u32::try_from(rows.unwrap_or_default()).unwrap_or(u32::MAX);

    let extent = source.source_extent();
    let mut cells = Vec::with_capacity(columns as usize * rows as usize);
    for row in 0..rows {
        let min_y = origin.y + f64::from(rows - 1 - row) * tile_size.y;
        for col in 0..columns {
            let min_x = origin.x + f64::from(col) * tile_size.x;
            let bounds = Envelope::new(min_x, min_y, min_x + tile_size.x, min_y + tile_size.y);
            cells.push(Cell {
                bounds,
                col,
                row,
                source_col: ((bounds.min_x - extent.min_x) / tile_size.x).round() as i64,
                source_row: ((extent.max_y - bounds.max_y) / tile_size.y).round() as i64,
                visible: is_visible(&extent, &bounds),
            });
        }
    }

    grid.columns = columns;
    grid.rows = rows;
    grid.cells = cells;
    Ok(grid)
}

/// Only the lower-left corner of the tile is tested against the extent.
///
/// A tile sticking out of the extent to the north or east is still fetched,
/// while one sticking out to the south or west is not. Sources rely on this
/// when their extent does not end on a tile boundary.
fn is_visible(extent: &Envelope, bounds: &Envelope) -> bool {
    extent.contains(bounds.min())
}

/// Number of `step`s from `start` needed to reach or pass `end`.
///
/// Returns `None` when the count exceeds `limit`.
fn count_steps(start: f64, end: f64, step: f64, limit: u64) -> Option<u64> {
    if start >= end {
        return Some(0);
    }
    let estimate = ((end - start) / step).ceil();
    if !estimate.is_finite() || estimate > limit as f64 + 1.0 {
        return None;
    }
    let mut steps = estimate as u64;
    // cell positions are computed as start + k * step, so count with the same formula
    while steps > 0 && start + (steps - 1) as f64 * step >= end {
        steps -= 1;
    }
    while start + steps as f64 * step < end {
        steps += 1;
    }
    (steps <= limit).then_some(steps)
}
