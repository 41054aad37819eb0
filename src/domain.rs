//! Domain models: tutorial stages, search input, and task outcomes.

use serde::{Deserialize, Serialize};

/// One sequential challenge of the tutorial, in the order they unlock.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  FlappyBird,
  AlbionOnline,
  OrganizedTheft,
  EldenRing,
}

impl Stage {
  pub const ALL: [Stage; 4] = [
    Stage::FlappyBird,
    Stage::AlbionOnline,
    Stage::OrganizedTheft,
    Stage::EldenRing,
  ];

  pub fn index(self) -> usize {
    match self {
      Stage::FlappyBird => 0,
      Stage::AlbionOnline => 1,
      Stage::OrganizedTheft => 2,
      Stage::EldenRing => 3,
    }
  }

  /// Stage that must be completed before this one can be attempted.
  pub fn predecessor(self) -> Option<Stage> {
    self.index().checked_sub(1).map(|i| Stage::ALL[i])
  }

  pub fn next(self) -> Option<Stage> {
    Stage::ALL.get(self.index() + 1).copied()
  }

  /// Slug used by the page markup (`<slug>-challenge-container`, `<slug>-icon`).
  pub fn slug(self) -> &'static str {
    match self {
      Stage::FlappyBird => "flappy-bird",
      Stage::AlbionOnline => "albion-online",
      Stage::OrganizedTheft => "organized-theft",
      Stage::EldenRing => "elden-ring",
    }
  }

  /// Key used in the feedback redirect and payload (`task_<key>`).
  pub fn task_key(self) -> &'static str {
    match self {
      Stage::FlappyBird => "flappy_bird",
      Stage::AlbionOnline => "albion_online",
      Stage::OrganizedTheft => "organized_theft",
      Stage::EldenRing => "elden_ring",
    }
  }
}

/// Slug of the final, ungated milestone.
pub const FREE_SEARCH_SLUG: &str = "free-search";
pub const FREE_SEARCH_TASK_KEY: &str = "free_search";

/// Tags a user must filter by to finish the Elden Ring stage.
pub const ELDEN_RING_TAGS: [&str; 3] = ["souls-like", "dark fantasy", "open world"];

/// What the page sends along with a search: the query and the select filters.
/// Missing filters deserialize as empty strings and simply never match.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SearchInput {
  pub query: String,
  #[serde(default)] pub status: String,
  #[serde(default)] pub category: String,
  #[serde(default)] pub platform: String,
}

/// How a stage was left behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Succeeded,
  Skipped,
}

/// Completion indicators reported with the feedback.
/// `true` only for stages finished by a successful search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcomes {
  #[serde(default)] pub flappy_bird: bool,
  #[serde(default)] pub albion_online: bool,
  #[serde(default)] pub organized_theft: bool,
  #[serde(default)] pub elden_ring: bool,
  #[serde(default)] pub free_search: bool,
}

impl TaskOutcomes {
  /// Pairs of (`task_key`, flag) in tutorial order, free search last.
  pub fn entries(&self) -> [(&'static str, bool); 5] {
    [
      (Stage::FlappyBird.task_key(), self.flappy_bird),
      (Stage::AlbionOnline.task_key(), self.albion_online),
      (Stage::OrganizedTheft.task_key(), self.organized_theft),
      (Stage::EldenRing.task_key(), self.elden_ring),
      (FREE_SEARCH_TASK_KEY, self.free_search),
    ]
  }
}
