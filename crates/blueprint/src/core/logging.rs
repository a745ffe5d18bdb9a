//! Logging setup
//!
//! Stores, the codec and the hub emit `tracing` events. Nothing is printed
//! until a subscriber is installed with [`init_logging`]:
//!
//! ```rust
//! use blueprint::core::logging::init_logging;
//!
//! let _ = init_logging(Some("debug"), Some("pretty"));
//! ```
//!
//! Unset arguments fall back to `BLUEPRINT_LOG_LEVEL` (then `RUST_LOG`) and
//! `BLUEPRINT_LOG_FORMAT`. The level accepts any `EnvFilter` directive list,
//! so a single module can be turned up:
//!
//! ```bash
//! BLUEPRINT_LOG_LEVEL="warn,blueprint::core::codec=debug" blueprint list documents
//! ```
//!
//! Events are written to stderr. On `wasm32` they go to the browser console
//! through `tracing-wasm` and the format is ignored.

use std::str::FromStr;

#[cfg(not(target_arch = "wasm32"))]
use tracing::Subscriber;
#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

#[cfg(target_arch = "wasm32")]
use tracing_wasm::WASMLayerConfig;

const DEFAULT_LEVEL: &str = "info";

/// Output format of log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One line per event, no targets
    #[default]
    Compact,
    /// Multi-line with source locations and span activity
    Pretty,
    /// One JSON object per event, with the current span
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logging settings after resolving arguments against the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directives such as `info` or `warn,blueprint=debug`
    pub directives: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// Explicit arguments win over `BLUEPRINT_LOG_LEVEL`, which wins over
    /// `RUST_LOG`; blank variables count as unset
    pub fn resolve(level: Option<&str>, format: Option<&str>) -> Result<Self, String> {
        let directives = level
            .map(str::to_string)
            .or_else(|| env_value("BLUEPRINT_LOG_LEVEL"))
            .or_else(|| env_value("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

        let format = match format.map(str::to_string).or_else(|| env_value("BLUEPRINT_LOG_FORMAT")) {
            Some(name) => name.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self { directives, format })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Install the global subscriber
///
/// Fails on an unknown format, on directives `EnvFilter` cannot parse, and
/// when a global subscriber is already installed.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(target_arch = "wasm32")]
    {
        let _ = (level, format);
        tracing_wasm::set_as_global_default_with_config(WASMLayerConfig::default());
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let settings = LogSettings::resolve(level, format)?;
        let filter = EnvFilter::try_new(&settings.directives)
            .map_err(|e| format!("Invalid log level '{}': {}", settings.directives, e))?;

        Registry::default()
            .with(filter)
            .with(output_layer(settings.format))
            .try_init()?;
        Ok(())
    }
}

/// Stderr layer for `format`
#[cfg(not(target_arch = "wasm32"))]
fn output_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span> + 'static,
{
    let layer = fmt::layer().with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => layer.compact().with_target(false).boxed(),
        LogFormat::Pretty => layer
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::ACTIVE)
            .boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    }
}
