use std::sync::Arc;

use image::{ImageFormat, Rgba, RgbaImage};
use tilestitch_utils::DataFormat;
use tokio::sync::Semaphore;
use tokio::task::{JoinSet, spawn_blocking};
use tracing::{Instrument as _, Span, debug, error};

use crate::tiles::{
    DEFAULT_MAX_TILES, GridPlan, MosaicError, MosaicResult, TileClient, TileRequest, TileSize,
    TileSource, solid_tile,
};

/// Fill color of tiles the server answered with an HTTP error.
pub const ERROR_TILE_COLOR: Rgba<u8> = Rgba([255, 155, 155, 255]);

/// How the image of a [`FetchResult`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Downloaded and decoded.
    Fetched,
    /// The server answered with a non-2xx status, the image is an error tile.
    Failed {
        /// HTTP status of the response.
        status: u16,
    },
    /// The cell is outside the source extent, the image is the source's placeholder.
    Placeholder,
}

/// The image for one cell of a [`GridPlan`].
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Image to paint, `None` leaves the cell transparent.
    pub image: Option<Arc<RgbaImage>>,
    /// Mosaic column of the cell.
    pub col: u32,
    /// Mosaic row of the cell.
    pub row: u32,
    /// Where the image came from.
    pub outcome: TileOutcome,
}

/// Tuning of the fetch phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Maximum number of tile requests in flight.
    pub concurrency: usize,
    /// Maximum number of cells a plan may have.
    pub max_tiles: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get(),
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

/// The image painted in place of tiles the server failed to deliver.
#[must_use]
pub fn error_tile(size: TileSize) -> Arc<RgbaImage> {
    Arc::new(solid_tile(size, ERROR_TILE_COLOR))
}

/// Loads the image of every cell of `plan`.
///
/// Visible cells are requested concurrently through `client`, at most
/// [`FetchOptions::concurrency`] at a time. Invisible cells get the source's
/// placeholder without any request. The results are returned in the plan's
/// cell order.
///
/// A tile answered with an HTTP error status is replaced by an
/// [`error_tile`]. A transport or decoding failure of any tile fails the whole
/// call, and the remaining requests are cancelled.
pub async fn fetch_tiles(
    plan: &GridPlan,
    source: &dyn TileSource,
    client: Arc<dyn TileClient>,
    options: &FetchOptions,
) -> MosaicResult<Vec<FetchResult>> {
    if plan.is_empty() {
        return Ok(Vec::new());
    }
    let mut results: Vec<Option<FetchResult>> = vec![None; plan.len()];

    let common_uri = source.common_uri()?;
    let placeholder = source.placeholder_image();
    let error_image = error_tile(plan.tile_pixel_size);
    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, cell) in plan.cells().iter().enumerate() {
        if !cell.visible {
            debug!(
                "Tile {},{} at {} is outside of the source extent, using the placeholder",
                cell.col, cell.row, cell.bounds
            );
            results[index] = Some(FetchResult {
                image: placeholder.clone(),
                col: cell.col,
                row: cell.row,
                outcome: TileOutcome::Placeholder,
            });
            continue;
        }

        let request = source.tile_request(
            &common_uri,
            &cell.bounds,
            plan.tile_pixel_size,
            cell.source_col,
            cell.source_row,
        )?;
        let client = Arc::clone(&client);
        let permits = Arc::clone(&permits);
        let error_image = Arc::clone(&error_image);
        let (col, row) = (cell.col, cell.row);
        tasks.spawn(
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| MosaicError::OtherError(Box::new(e)))?;
                let (image, outcome) = load_tile(client.as_ref(), &request, error_image).await?;
                Ok::<_, MosaicError>((
                    index,
                    FetchResult {
                        image: Some(image),
                        col,
                        row,
                        outcome,
                    },
                ))
            }
            .instrument(Span::current()),
        );
    }

    // returning early drops the set, which aborts the tasks still running
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined??;
        results[index] = Some(result);
    }

    Ok(results.into_iter().flatten().collect())
}

async fn load_tile(
    client: &dyn TileClient,
    request: &TileRequest,
    error_image: Arc<RgbaImage>,
) -> MosaicResult<(Arc<RgbaImage>, TileOutcome)> {
    debug!("Loading tile {request}");
    let response = client
        .execute(request)
        .await
        .map_err(|e| MosaicError::TransportFailed(request.url.to_string(), e))?;

    if !response.is_success() {
        error!(
            "Error while getting tile {}: {} {}",
            request.url, response.status, response.status_text
        );
        return Ok((
            error_image,
            TileOutcome::Failed {
                status: response.status,
            },
        ));
    }

    let url = request.url.to_string();
    let image = spawn_blocking(move || {
        decode_tile(&response.body).map_err(|e| MosaicError::DecodeFailed(url, e))
    })
    .await??;
    Ok((Arc::new(image), TileOutcome::Fetched))
}

fn decode_tile(body: &[u8]) -> image::ImageResult<RgbaImage> {
    let format = DataFormat::detect(body).and_then(|f| ImageFormat::from_mime_type(f.content_type()));
    let image = match format {
        Some(format) => image::load_from_memory_with_format(body, format)?,
        None => image::load_from_memory(body)?,
    };
    Ok(image.into_rgba8())
}
