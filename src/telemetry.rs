//! Log output for the service.
//!
//! Two environment variables shape it:
//! - `LOG_LEVEL`: an `EnvFilter` directive string, e.g. `debug` or
//!   `info,challenge=trace,tower_http=warn`. Unset or invalid falls back to
//!   [`DEFAULT_FILTER`].
//! - `LOG_FORMAT`: `pretty` (default, human readable with source locations)
//!   or `json` (one object per line with the active span list, for shipping).
//!
//! Targets in use: `gamesearch_ux` (service, upstream, sessions) and
//! `challenge` (tutorial progression).

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,challenge=debug,gamesearch_ux=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Unknown values keep the pretty output rather than failing startup.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn filter(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());
    let builder = tracing_subscriber::fmt().with_env_filter(filter(level.as_deref())).with_target(true);

    match format {
        LogFormat::Json => builder.json().with_current_span(true).with_span_list(true).init(),
        LogFormat::Pretty => builder.with_file(true).with_line_number(true).init(),
    }
    tracing::debug!(target: "gamesearch_ux", ?format, "Tracing initialized");
}
