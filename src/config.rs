//! Loading page texts (hints + user-facing messages) from TOML.
//!
//! Every field has a default, so a config file only needs the entries it
//! overrides:
//!
//! ```toml
//! [hints]
//! elden_ring = "Find Elden Ring using the tag filter."
//!
//! [messages]
//! fetch_error = "Search is unavailable right now."
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Stage;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct UxConfig {
  #[serde(default)]
  pub hints: Hints,
  #[serde(default)]
  pub messages: Messages,
}

/// Hint shown in `feedback-label-container` while a stage is the current one.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Hints {
  pub flappy_bird: String,
  pub albion_online: String,
  pub organized_theft: String,
  pub elden_ring: String,
  pub free_search: String,
}

impl Default for Hints {
  fn default() -> Self {
    Self {
      flappy_bird: "Look for Flappy Bird.".into(),
      albion_online: "Look for Albion Online. Suggestion... It belongs to the \"MMORPG\" category.".into(),
      organized_theft: "Look for Organized Theft. Suggestion... It is an \"HTML5\" game and it is yet \"To Be Released\".".into(),
      elden_ring: "Look for Elden Ring. Suggestion... some of its tags are \"Souls-like\", \"Dark Fantasy\" and \"Open World\"".into(),
      free_search: "Look for your favorite game!".into(),
    }
  }
}

impl Hints {
  /// Hint for the current stage; `None` means the tutorial moved on to free search.
  pub fn for_stage(&self, stage: Option<Stage>) -> &str {
    match stage {
      Some(Stage::FlappyBird) => &self.flappy_bird,
      Some(Stage::AlbionOnline) => &self.albion_online,
      Some(Stage::OrganizedTheft) => &self.organized_theft,
      Some(Stage::EldenRing) => &self.elden_ring,
      None => &self.free_search,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Messages {
  pub fetch_error: String,
  pub feedback_error: String,
  pub feedback_success: String,
  pub no_results: String,
}

impl Default for Messages {
  fn default() -> Self {
    Self {
      fetch_error: "Error fetching data.".into(),
      feedback_error: "Error submitting feedback.".into(),
      feedback_success: "Feedback submitted successfully!".into(),
      no_results: "No results found".into(),
    }
  }
}

/// Attempt to load `UxConfig` from UX_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_ux_config_from_env() -> Option<UxConfig> {
  let path = std::env::var("UX_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<UxConfig>(&s) {
      Ok(cfg) => {
        info!(target: "gamesearch_ux", %path, "Loaded page config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "gamesearch_ux", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "gamesearch_ux", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
