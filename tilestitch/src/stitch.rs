use std::path::Path;
use std::sync::Arc;

use tilestitch_core::tiles::{Mosaic, TileClient, render};
use tracing::info;

use crate::TileStitchResult;
use crate::config::RenderJob;
use crate::output::write_mosaic;

/// Renders `job` through `client` and writes the mosaic to `output`.
pub async fn stitch(
    job: &RenderJob,
    client: Arc<dyn TileClient>,
    output: &Path,
) -> TileStitchResult<Mosaic> {
    let mosaic = render(&job.view, job.source.as_ref(), client, &job.options).await?;
    let world_file = write_mosaic(&mosaic, output)?;
    info!(
        "Wrote {}x{} px mosaic covering {} ({}) to {} and {}",
        mosaic.width(),
        mosaic.height(),
        mosaic.envelope,
        mosaic.crs,
        output.display(),
        world_file.display()
    );
    Ok(mosaic)
}
