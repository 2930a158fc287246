use std::{env, process};

use clap::Parser;
use log::{Level, log_enabled};
use tilestitch::TileStitchResult;
use tilestitch::config::args::Args;
use tilestitch::config::{Config, read_config};
use tilestitch::logging::{ensure_core_log_level_matches, init_tracing};
use tilestitch::stitch;
use tilestitch_core::config::env::OsEnv;
use tracing::{debug, error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn load_config(args: &Args) -> TileStitchResult<Config> {
    let env = OsEnv::default();
    let mut config = if let Some(ref cfg_filename) = args.meta.config {
        info!("Using {}", cfg_filename.display());
        read_config(cfg_filename, &env)?
    } else {
        info!("Config file is not specified, the view and source must come from the command line");
        Config::default()
    };
    let requested = env.requested();
    if !requested.is_empty() {
        debug!("Config file references environment variables {}", requested.join(", "));
    }

    args.merge_into_config(&mut config);
    config.finalize()?;
    Ok(config)
}

async fn start(args: Args) -> TileStitchResult<()> {
    info!("Starting tilestitch v{VERSION}");

    let config = load_config(&args)?;
    if let Some(file_name) = &args.meta.save_config {
        config.save_to_file(file_name)?;
    } else {
        info!("Use --save-config to save or print the resulting configuration.");
    }

    let job = config.resolve()?;
    let client = config.http.create_client()?;
    let mosaic = stitch(&job, client, &args.meta.output).await?;
    info!(
        "{} tiles fetched, {} failed, {} outside of the source",
        mosaic.stats.fetched, mosaic.stats.failed, mosaic.stats.placeholders
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let filter = ensure_core_log_level_matches(env::var("RUST_LOG").ok(), "tilestitch=");
    if let Err(e) = init_tracing(&filter, env::var("TILESTITCH_FORMAT").ok()) {
        eprintln!("Unable to initialize logging: {e}");
    }

    let args = Args::parse();
    if let Err(e) = start(args).await {
        // Ensure the message is printed, even if the logging is disabled
        if log_enabled!(Level::Error) {
            error!("{e}");
        } else {
            eprintln!("{e}");
        }
        process::exit(1);
    }
}
