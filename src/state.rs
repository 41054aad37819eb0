//! Application state shared by all connections: page texts, upstream client,
//! and where the page shell lives. Per-page state lives in `Session`.

use tracing::{info, instrument};

use crate::config::{load_ux_config_from_env, UxConfig};
use crate::upstream::Upstream;

const DEFAULT_STATIC_DIR: &str = "./static";

#[derive(Clone)]
pub struct AppState {
    pub config: UxConfig,
    pub upstream: Upstream,
    pub static_dir: String,
}

impl AppState {
    /// Build state from env: load the TOML texts and the upstream client.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let config = load_ux_config_from_env().unwrap_or_default();
        let upstream = Upstream::from_env()?;
        let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.into());

        info!(
            target: "gamesearch_ux",
            base_url = %upstream.base_url,
            render_mode = ?upstream.render_mode,
            %static_dir,
            "Upstream configured"
        );
        Ok(Self::new(config, upstream, static_dir))
    }

    pub fn new(config: UxConfig, upstream: Upstream, static_dir: String) -> Self {
        Self { config, upstream, static_dir }
    }
}
