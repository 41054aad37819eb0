//! Tutorial progression: four gated stages followed by a free-search milestone.
//!
//! The track is a plain value owned by one session. It never touches the page;
//! every operation returns a `Transition` that the session turns into patches.
//!
//! Rules:
//!   - a stage is evaluated only when its predecessor is complete and it is not;
//!     that stage is the track's `current` one
//!   - failed evaluations of the current stage are counted; more than
//!     `RETRY_THRESHOLD` of them make the skip control available
//!   - the retry counter resets whenever the current stage changes
//!   - once all stages are done, searches count towards the free-search milestone,
//!     which trips once the counter exceeds `FREE_SEARCH_THRESHOLD`

use tracing::{debug, info, instrument};

use crate::domain::{Outcome, SearchInput, Stage, TaskOutcomes, ELDEN_RING_TAGS};

/// Failed attempts tolerated before the skip control shows up.
pub const RETRY_THRESHOLD: u32 = 3;
/// Post-tutorial searches needed, exclusive: the 4th one trips the milestone.
pub const FREE_SEARCH_THRESHOLD: u32 = 3;

/// Result of feeding the track one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
  /// Nothing changed (gated, already complete, or skip not available).
  Ignored,
  /// The current stage was evaluated and did not match.
  Missed { stage: Stage, retries: u32, skip_available: bool },
  /// A stage was completed; `next` is the stage whose hint should show now.
  Completed { stage: Stage, outcome: Outcome, next: Option<Stage> },
  /// A post-tutorial search was counted without reaching the milestone.
  FreeSearchCounted { count: u32 },
  /// The free-search milestone tripped; the tutorial is over.
  FreeSearchCompleted,
}

#[derive(Clone, Debug, Default)]
pub struct ChallengeTrack {
  outcomes: [Option<Outcome>; 4],
  current: usize,
  retries: u32,
  free_searches: u32,
  free_search_done: bool,
}

impl ChallengeTrack {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stage currently waiting to be solved, `None` once all four are done.
  pub fn current(&self) -> Option<Stage> {
    Stage::ALL.get(self.current).copied()
  }

  pub fn outcome(&self, stage: Stage) -> Option<Outcome> {
    self.outcomes[stage.index()]
  }

  pub fn is_completed(&self, stage: Stage) -> bool {
    self.outcome(stage).is_some()
  }

  pub fn all_stages_completed(&self) -> bool {
    self.current().is_none()
  }

  pub fn retries(&self) -> u32 {
    self.retries
  }

  pub fn skip_available(&self) -> bool {
    self.current().is_some() && self.retries > RETRY_THRESHOLD
  }

  pub fn free_searches(&self) -> u32 {
    self.free_searches
  }

  pub fn free_search_completed(&self) -> bool {
    self.free_search_done
  }

  /// Evaluate one stage against a search.
  /// No-op when the stage is already complete or its predecessor is not.
  #[instrument(level = "debug", skip(self, input, tags))]
  pub fn check(&mut self, stage: Stage, input: &SearchInput, tags: &[String]) -> Transition {
    if self.is_completed(stage) {
      return Transition::Ignored;
    }
    if let Some(prev) = stage.predecessor() {
      if !self.is_completed(prev) {
        return Transition::Ignored;
      }
    }

    if stage_matches(stage, input, tags) {
      info!(target: "challenge", stage = stage.slug(), retries = self.retries, "Stage solved");
      return self.complete(stage, Outcome::Succeeded);
    }

    self.retries += 1;
    let skip_available = self.retries > RETRY_THRESHOLD;
    debug!(target: "challenge", stage = stage.slug(), retries = self.retries, skip_available, "Stage missed");
    Transition::Missed { stage, retries: self.retries, skip_available }
  }

  /// Give up on the current stage. Only allowed after enough failed attempts.
  #[instrument(level = "debug", skip(self))]
  pub fn skip(&mut self) -> Transition {
    let Some(stage) = self.current() else {
      return Transition::Ignored;
    };
    if !self.skip_available() {
      debug!(target: "challenge", stage = stage.slug(), retries = self.retries, "Skip refused");
      return Transition::Ignored;
    }
    info!(target: "challenge", stage = stage.slug(), retries = self.retries, "Stage skipped");
    self.complete(stage, Outcome::Skipped)
  }

  /// Count a post-tutorial search.
  #[instrument(level = "debug", skip(self))]
  pub fn check_free_search(&mut self) -> Transition {
    if self.free_search_done || !self.all_stages_completed() {
      return Transition::Ignored;
    }
    self.free_searches += 1;
    if self.free_searches > FREE_SEARCH_THRESHOLD {
      self.free_search_done = true;
      info!(target: "challenge", count = self.free_searches, "Free search milestone reached");
      Transition::FreeSearchCompleted
    } else {
      Transition::FreeSearchCounted { count: self.free_searches }
    }
  }

  /// Per-search entry point: evaluates the current stage, or counts a free
  /// search once the tutorial is through. A query that solves a stage is
  /// not also counted as a free search.
  pub fn observe(&mut self, input: &SearchInput, tags: &[String]) -> Transition {
    match self.current() {
      Some(stage) => self.check(stage, input, tags),
      None => self.check_free_search(),
    }
  }

  pub fn task_outcomes(&self) -> TaskOutcomes {
    let ok = |s: Stage| self.outcome(s) == Some(Outcome::Succeeded);
    TaskOutcomes {
      flappy_bird: ok(Stage::FlappyBird),
      albion_online: ok(Stage::AlbionOnline),
      organized_theft: ok(Stage::OrganizedTheft),
      elden_ring: ok(Stage::EldenRing),
      free_search: self.free_search_done,
    }
  }

  fn complete(&mut self, stage: Stage, outcome: Outcome) -> Transition {
    self.outcomes[stage.index()] = Some(outcome);
    self.current = stage.index() + 1;
    self.retries = 0;
    Transition::Completed { stage, outcome, next: stage.next() }
  }
}

/// Stage predicate over the lower-cased query and filters.
pub fn stage_matches(stage: Stage, input: &SearchInput, tags: &[String]) -> bool {
  let query = input.query.to_lowercase();
  match stage {
    Stage::FlappyBird => query.contains("flappy") && query.contains("bird"),
    Stage::AlbionOnline => {
      query.contains("albion") && input.category.to_lowercase().contains("mmorpg")
    }
    Stage::OrganizedTheft => {
      query.contains("organized")
        && query.contains("theft")
        && input.platform.to_lowercase().contains("html5")
        && input.status.to_lowercase().contains("to be released")
    }
    Stage::EldenRing => {
      query.contains("elden") && query.contains("ring") && has_all_tags(tags, &ELDEN_RING_TAGS)
    }
  }
}

/// Case-insensitive superset test.
fn has_all_tags(tags: &[String], wanted: &[&str]) -> bool {
  wanted
    .iter()
    .all(|w| tags.iter().any(|t| t.to_lowercase() == w.to_lowercase()))
}
