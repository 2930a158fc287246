use std::sync::Arc;

use tracing::{Instrument as _, info, info_span};

use crate::tiles::{
    FetchOptions, MapView, Mosaic, MosaicResult, TileClient, TileSource, assemble, fetch_tiles,
    plan_with_limit,
};

/// Renders `view` from `source`: plans the grid, fetches all tiles and stitches them.
pub async fn render(
    view: &MapView,
    source: &dyn TileSource,
    client: Arc<dyn TileClient>,
    options: &FetchOptions,
) -> MosaicResult<Mosaic> {
    let grid = plan_with_limit(view, source, options.max_tiles)?;
    info!(
        "Planned {}x{} tiles ({} to fetch) at {} units/px covering {} for a 1:{:.0} view",
        grid.columns,
        grid.rows,
        grid.visible_count(),
        grid.resolution,
        grid.envelope(),
        view.scale().denominator()
    );

    let span = info_span!("fetch", crs = %view.crs);
    let results = fetch_tiles(&grid, source, client, options)
        .instrument(span)
        .await?;
    let mosaic = assemble(results, &grid, source)?;
    info!(
        "Assembled {}x{} px mosaic from {}: {} fetched, {} failed, {} placeholders",
        mosaic.width(),
        mosaic.height(),
        mosaic.label,
        mosaic.stats.fetched,
        mosaic.stats.failed,
        mosaic.stats.placeholders
    );
    Ok(mosaic)
}
