//! Logging initialization for tilestitch using `tracing` and `tracing-subscriber`.
//!
//! Logging is configured by two environment variables:
//! - `RUST_LOG`: an [`EnvFilter`] directive controlling levels
//! - `TILESTITCH_FORMAT`: the [`LogFormat`] (json, full, compact, bare, pretty)

use std::error::Error;
use std::io::stderr;
use std::str::FromStr;

use log::LevelFilter as LogLevelFilter;
use tracing::Level;
use tracing::dispatcher::set_global_default;
use tracing::level_filters::LevelFilter;
use tracing_log::{InterestCacheConfig, LogTracer};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit human-readable, single-line logs.
    /// See [format::Full](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/format/struct.Full.html#example-output)
    Full,

    /// A variant of the full-format, optimized for short line lengths (default).
    /// See [format::Compact](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/format/struct.Compact.html#example-output)
    Compact,

    /// A very bare format without timestamps, targets or ANSI colors.
    Bare,

    /// Excessively pretty, multi-line logs for local development/debugging.
    /// See [format::Pretty](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/format/struct.Pretty.html#example-output)
    Pretty,

    /// Output newline-delimited (structured) JSON logs.
    /// See [format::Json](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/format/struct.Json.html#example-output)
    Json,
}

impl LogFormat {
    /// Install the global subscriber for the selected format.
    ///
    /// Uses `tracing::dispatcher::set_global_default` directly instead of
    /// `SubscriberInitExt::init()`, because the latter would also try to install
    /// its own `LogTracer` and conflict with [`init_log_bridge`].
    pub fn init(self, env_filter: EnvFilter) -> Result<(), Box<dyn Error + Send + Sync>> {
        // Logs go to stderr, stdout is reserved for `--save-config -`
        let dispatch = match self {
            Self::Full => tracing_subscriber::fmt()
                .with_writer(stderr)
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Compact => tracing_subscriber::fmt()
                .with_writer(stderr)
                .compact()
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Pretty => tracing_subscriber::fmt()
                .with_writer(stderr)
                .pretty()
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Bare => tracing_subscriber::fmt()
                .with_writer(stderr)
                .compact()
                .with_span_events(FmtSpan::NONE)
                .without_time()
                .with_target(false)
                .with_ansi(false)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Json => tracing_subscriber::fmt()
                .with_writer(stderr)
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
        };
        set_global_default(dispatch)?;
        Ok(())
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" | "verbose" => Ok(Self::Pretty),
            "bare" => Ok(Self::Bare),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Valid options: json, full, compact, bare or pretty"
            )),
        }
    }
}

/// Maps the most verbose level enabled by `env_filter` to a `log` level.
fn log_level_hint(env_filter: &EnvFilter) -> Option<LogLevelFilter> {
    let level = env_filter.max_level_hint().and_then(LevelFilter::into_level)?;
    Some(match level {
        Level::TRACE => LogLevelFilter::Trace,
        Level::DEBUG => LogLevelFilter::Debug,
        Level::INFO => LogLevelFilter::Info,
        Level::WARN => LogLevelFilter::Warn,
        Level::ERROR => LogLevelFilter::Error,
    })
}

/// Forward `log` records of dependencies into `tracing`.
fn init_log_bridge(env_filter: &EnvFilter) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut builder = LogTracer::builder().with_interest_cache(InterestCacheConfig::default());
    if let Some(max_level) = log_level_hint(env_filter) {
        builder = builder.with_max_level(max_level);
    }
    builder.init()?;
    Ok(())
}

/// Initialize the global tracing subscriber for the given filter and format.
///
/// An unparsable filter falls back to `debug`, an unknown format to
/// [`LogFormat::default`]. Fails only if a global logger was already set.
pub fn init_tracing(filter: &str, format: Option<String>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let env_filter = EnvFilter::from_str(filter).unwrap_or_else(|_| {
        eprintln!("Warning: Invalid filter string '{filter}' passed. Since you passed a filter, you likely want to debug us, so we set the filter to debug");
        EnvFilter::new("debug")
    });

    let log_format = format
        .and_then(|s| {
            s.parse::<LogFormat>()
                .map_err(|e| {
                    eprintln!("Warning: {e}");
                    eprintln!(
                        "Falling back to default format ({:?})",
                        LogFormat::default()
                    );
                })
                .ok()
        })
        .unwrap_or_default();

    init_log_bridge(&env_filter)?;
    log_format.init(env_filter)
}

/// Mirrors the level given to `replacement` (e.g. `tilestitch=`) onto
/// `tilestitch_core`, unless the core crate has its own directive.
///
/// Without any `RUST_LOG`, both crates log at `info`.
#[must_use]
pub fn ensure_core_log_level_matches(
    env_filter: Option<String>,
    replacement: &'static str,
) -> String {
    let Some(rust_log) = env_filter else {
        return format!("{replacement}info,tilestitch_core=info");
    };
    if !rust_log.contains("tilestitch_core=")
        && let Some(level) = rust_log
            .split(',')
            .find_map(|s| s.strip_prefix(replacement))
    {
        return format!("{rust_log},tilestitch_core={level}");
    }
    rust_log
}
