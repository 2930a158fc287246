use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use tilestitch_core::tiles::Crs;
use tilestitch_utils::Envelope;

use crate::config::Config;

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug, PartialEq, Default)]
#[command(
    about,
    version,
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=tilestitch=debug. Use TILESTITCH_FORMAT to pick the log format: full, compact, bare, pretty or json.",
    styles = HELP_STYLES
)]
pub struct Args {
    #[command(flatten)]
    pub meta: MetaArgs,
    #[command(flatten)]
    pub view: ViewArgs,
    #[command(flatten)]
    pub fetch: FetchArgs,
}

// None of these params will be transferred to the config
#[derive(Parser, Debug, Clone, PartialEq, Default)]
pub struct MetaArgs {
    /// Path to the config file with the tile source and the view.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// PNG file to write. The world file is written next to it with a `.pgw` extension.
    #[arg(short, long, default_value = "mosaic.png")]
    pub output: PathBuf,
    /// Save resulting config to a file or use "-" to print to stdout.
    #[arg(long)]
    pub save_config: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone, PartialEq, Default)]
pub struct ViewArgs {
    /// Area to render as `min_x,min_y,max_x,max_y`. Replaces any `center` of the config file.
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<Envelope>,
    /// CRS code of the bbox, e.g. `EPSG:3857`.
    #[arg(long)]
    pub crs: Option<String>,
    /// Output width in pixels.
    #[arg(long)]
    pub width: Option<u32>,
    /// Output height in pixels.
    #[arg(long)]
    pub height: Option<u32>,
    /// Rendering DPI.
    #[arg(long)]
    pub dpi: Option<f64>,
}

#[derive(Parser, Debug, Clone, PartialEq, Default)]
pub struct FetchArgs {
    /// Maximum number of tile requests in flight. Defaults to the number of CPUs.
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,
    /// Refuse views needing more tiles than this.
    #[arg(long)]
    pub max_tiles: Option<usize>,
}

impl Args {
    /// Apply command line overrides on top of a config read from a file.
    pub fn merge_into_config(&self, config: &mut Config) {
        self.view.merge_into_config(config);
        if self.fetch.concurrency.is_some() {
            config.concurrency = self.fetch.concurrency;
        }
        if self.fetch.max_tiles.is_some() {
            config.max_tiles = self.fetch.max_tiles;
        }
    }
}

impl ViewArgs {
    fn merge_into_config(&self, config: &mut Config) {
        let view = &mut config.view;
        if self.bbox.is_some() {
            view.bbox = self.bbox;
            view.center = None;
            view.scale = None;
        }
        if let Some(crs) = &self.crs {
            view.crs = Crs::new(crs);
        }
        if self.width.is_some() || self.height.is_some() {
            // a single given dimension is derived again from the bbox
            view.width = self.width;
            view.height = self.height;
        }
        if self.dpi.is_some() {
            view.dpi = self.dpi;
        }
    }
}
