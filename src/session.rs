//! Page session: everything one open page owns for its lifetime.
//!
//! A session is created per WebSocket connection and dropped with it, so a
//! reload starts from scratch. It holds the tutorial track and the tag set,
//! turns page events into upstream calls and state transitions, and answers
//! with the DOM patches that render the outcome.

use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::challenge::{ChallengeTrack, Transition};
use crate::domain::{Outcome, SearchInput, FREE_SEARCH_SLUG};
use crate::feedback::{redirect_url, tasks_from_query, FeedbackPayload};
use crate::highlight::highlight_words;
use crate::protocol::{ClientWsMessage, DomPatch, ServerWsMessage};
use crate::state::AppState;
use crate::tags::{TagEntry, TagSet};
use crate::upstream::SearchResults;
use crate::util::escape_html;

pub const ITEMS_CONTAINER: &str = "items-container";
pub const HINT_LABEL: &str = "feedback-label-container";
pub const FEEDBACK_BUTTON: &str = "feedback-button-container";
pub const SKIP_BUTTON: &str = "skip-button-container";
pub const TAG_INPUT: &str = "tagInput";
pub const TAG_CONTAINER: &str = "tagContainer";
pub const FEEDBACK_MESSAGE: &str = "feedback_message";

const CONFIRMED_ICON: &str =
  r#"<img src="/public/ui/confirmed.svg" alt="Challenge completed" class="w-full h-full object-cover"/>"#;
const FAILED_ICON: &str =
  r#"<img src="/public/ui/failed.svg" alt="Challenge skipped" class="w-full h-full object-cover"/>"#;

pub struct Session {
  pub id: Uuid,
  state: Arc<AppState>,
  track: ChallengeTrack,
  tags: TagSet,
}

impl Session {
  pub fn new(state: Arc<AppState>) -> Self {
    Self { id: Uuid::new_v4(), state, track: ChallengeTrack::new(), tags: TagSet::new() }
  }

  #[cfg(test)]
  pub fn track(&self) -> &ChallengeTrack {
    &self.track
  }

  #[cfg(test)]
  pub fn tags(&self) -> &TagSet {
    &self.tags
  }

  /// Patches that put a freshly loaded page in its starting state.
  pub fn initial_patches(&self) -> Vec<DomPatch> {
    vec![
      self.hint_patch(),
      DomPatch::hide(SKIP_BUTTON),
      DomPatch::hide(FEEDBACK_BUTTON),
    ]
  }

  /// Dispatch one page event. Every event gets exactly one reply.
  #[instrument(level = "info", skip(self, msg), fields(session = %self.id))]
  pub async fn handle(&mut self, msg: ClientWsMessage) -> ServerWsMessage {
    let patches = match msg {
      ClientWsMessage::Ping => return ServerWsMessage::Pong,
      ClientWsMessage::Search(input) => self.search(input).await,
      ClientWsMessage::TagEntered { text } => self.enter_tag(&text),
      ClientWsMessage::TagRemoved { chip_id } => self.remove_tag(&chip_id),
      ClientWsMessage::Skip => self.skip(),
      ClientWsMessage::OpenFeedback => self.open_feedback(),
      ClientWsMessage::SubmitFeedback { forms, location_search } => {
        self.submit_feedback(&forms, location_search.as_deref()).await
      }
    };
    ServerWsMessage::Patches { patches }
  }

  /// Run a search: fetch results, highlight them, then advance the tutorial.
  /// A blank query does nothing at all.
  #[instrument(level = "info", skip(self, input), fields(session = %self.id, query_len = input.query.len()))]
  pub async fn search(&mut self, input: SearchInput) -> Vec<DomPatch> {
    if input.query.is_empty() {
      return Vec::new();
    }

    let tags = self.tags.values();
    let result = self
      .state
      .upstream
      .search(&input.query, &tags, &input.status, &input.category, &input.platform)
      .await;

    let html = match result {
      Ok(SearchResults::Html(html)) => html,
      Ok(SearchResults::NoResults) => {
        return vec![DomPatch::set_html(ITEMS_CONTAINER, self.no_results_html())];
      }
      Err(e) => {
        error!(target: "gamesearch_ux", session = %self.id, error = %e, "Search failed");
        return vec![DomPatch::alert(self.state.config.messages.fetch_error.clone())];
      }
    };

    let mut patches = vec![DomPatch::set_html(ITEMS_CONTAINER, highlight_words(&html, &input.query))];
    let transition = self.track.observe(&input, &tags);
    debug!(
      target: "gamesearch_ux",
      session = %self.id,
      tags = self.tags.len(),
      retries = self.track.retries(),
      free_searches = self.track.free_searches(),
      ?transition,
      "Search evaluated"
    );
    patches.extend(self.transition_patches(transition));
    patches
  }

  /// Enter pressed in the tag box.
  pub fn enter_tag(&mut self, text: &str) -> Vec<DomPatch> {
    let clear = DomPatch::SetValue { id: TAG_INPUT.into(), value: String::new() };
    match self.tags.enter(text) {
      TagEntry::Empty => Vec::new(),
      TagEntry::Duplicate => vec![clear],
      TagEntry::Added { chip_id } => {
        let mut patches = Vec::with_capacity(2);
        if let Some(html) = self.tags.chip_html(&chip_id) {
          patches.push(DomPatch::AppendHtml { id: TAG_CONTAINER.into(), html });
        }
        patches.push(clear);
        patches
      }
    }
  }

  pub fn remove_tag(&mut self, chip_id: &str) -> Vec<DomPatch> {
    match self.tags.remove(chip_id) {
      Some(_) => {
        if self.tags.is_empty() {
          debug!(target: "gamesearch_ux", session = %self.id, "Tag filter cleared");
        }
        vec![DomPatch::RemoveElement { id: chip_id.to_string() }]
      }
      None => {
        warn!(target: "gamesearch_ux", session = %self.id, %chip_id, "Remove for unknown chip");
        Vec::new()
      }
    }
  }

  pub fn skip(&mut self) -> Vec<DomPatch> {
    let transition = self.track.skip();
    self.transition_patches(transition)
  }

  /// Leave for the feedback page once the tutorial is over.
  pub fn open_feedback(&self) -> Vec<DomPatch> {
    if !self.track.free_search_completed() {
      warn!(target: "gamesearch_ux", session = %self.id, "Feedback requested before the tutorial ended");
      return Vec::new();
    }
    vec![DomPatch::Navigate { url: redirect_url(&self.track.task_outcomes()) }]
  }

  /// Merge the feedback forms and post them upstream. Task flags come from the
  /// feedback page's query string when given, else from this session's track.
  #[instrument(level = "info", skip(self, forms, location_search), fields(session = %self.id, forms = forms.len()))]
  pub async fn submit_feedback(
    &self,
    forms: &[BTreeMap<String, String>],
    location_search: Option<&str>,
  ) -> Vec<DomPatch> {
    let tasks = location_search
      .and_then(tasks_from_query)
      .unwrap_or_else(|| self.track.task_outcomes());
    let payload = FeedbackPayload::merge(forms, &tasks);
    info!(target: "gamesearch_ux", session = %self.id, answers = payload.answered(), "Submitting feedback");

    match self.state.upstream.submit_feedback(&payload).await {
      Ok(()) => vec![DomPatch::set_html(
        FEEDBACK_MESSAGE,
        format!(
          r#"<p class="text-green-400">{}</p>"#,
          escape_html(&self.state.config.messages.feedback_success)
        ),
      )],
      Err(e) => {
        error!(target: "gamesearch_ux", session = %self.id, error = %e, "Feedback submission failed");
        vec![DomPatch::alert(self.state.config.messages.feedback_error.clone())]
      }
    }
  }

  fn transition_patches(&self, transition: Transition) -> Vec<DomPatch> {
    match transition {
      Transition::Ignored | Transition::FreeSearchCounted { .. } => Vec::new(),
      Transition::Missed { skip_available, .. } => {
        if skip_available { vec![DomPatch::show(SKIP_BUTTON)] } else { Vec::new() }
      }
      Transition::Completed { stage, outcome, .. } => {
        let mut patches = marker_patches(stage.slug(), outcome);
        patches.push(DomPatch::hide(SKIP_BUTTON));
        patches.push(self.hint_patch());
        patches
      }
      Transition::FreeSearchCompleted => {
        let mut patches = marker_patches(FREE_SEARCH_SLUG, Outcome::Succeeded);
        patches.push(DomPatch::hide(HINT_LABEL));
        patches.push(DomPatch::show(FEEDBACK_BUTTON));
        patches
      }
    }
  }

  fn hint_patch(&self) -> DomPatch {
    let hint = self.state.config.hints.for_stage(self.track.current());
    DomPatch::set_html(HINT_LABEL, format!(r#"<p class="text-black">{}</p>"#, escape_html(hint)))
  }

  fn no_results_html(&self) -> String {
    format!(
      r#"<div class="w-full flex items-center justify-center"><h1 class="text-2xl font-medium">{}</h1></div>"#,
      escape_html(&self.state.config.messages.no_results)
    )
  }
}

/// Container + icon patches marking a milestone as done (or skipped).
fn marker_patches(slug: &str, outcome: Outcome) -> Vec<DomPatch> {
  let container = format!("{slug}-challenge-container");
  let (class, icon) = match outcome {
    Outcome::Succeeded => ("completed", CONFIRMED_ICON),
    Outcome::Skipped => ("failed", FAILED_ICON),
  };
  vec![
    DomPatch::remove_class(container.clone(), "not-completed"),
    DomPatch::add_class(container, class),
    DomPatch::set_html(format!("{slug}-icon"), icon),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::http::StatusCode;

  use crate::config::UxConfig;
  use crate::domain::Stage;
  use crate::upstream::tests::{client, spawn_stub, Seen, StubReplies};
  use crate::upstream::RenderMode;

  async fn session_with(replies: StubReplies, mode: RenderMode) -> (Session, Seen) {
    let (base, seen) = spawn_stub(replies).await;
    let state = AppState::new(UxConfig::default(), client(&base, mode), "./static".into());
    (Session::new(Arc::new(state)), seen)
  }

  fn q(query: &str) -> SearchInput {
    SearchInput { query: query.into(), ..Default::default() }
  }

  /// Search input that solves `stage`.
  fn solving_input(stage: Stage) -> SearchInput {
    let base = |q: &str| SearchInput { query: q.into(), ..Default::default() };
    match stage {
      Stage::FlappyBird => base("flappy bird"),
      Stage::AlbionOnline => SearchInput { category: "MMORPG".into(), ..base("albion online") },
      Stage::OrganizedTheft => SearchInput {
        platform: "HTML5".into(),
        status: "To Be Released".into(),
        ..base("organized theft")
      },
      Stage::EldenRing => base("elden ring"),
    }
  }

  fn has(patches: &[DomPatch], p: &DomPatch) -> bool {
    patches.iter().any(|x| x == p)
  }

  async fn finish_tutorial(s: &mut Session) {
    for tag in ["Souls-like", "Dark Fantasy", "Open World"] {
      s.enter_tag(tag);
    }
    for stage in Stage::ALL {
      s.search(solving_input(stage)).await;
    }
    assert!(s.track().all_stages_completed());
  }

  #[tokio::test]
  async fn empty_query_makes_no_request() {
    let (mut s, seen) = session_with(StubReplies::default(), RenderMode::Documents).await;
    assert!(s.search(q("")).await.is_empty());
    assert!(seen.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn search_renders_highlighted_results_and_completes_stage() {
    let replies = StubReplies { render: "<p>Flappy Bird</p>".into(), ..Default::default() };
    let (mut s, _) = session_with(replies, RenderMode::Documents).await;
    let patches = s.search(q("flappy bird")).await;

    assert_eq!(
      patches[0],
      DomPatch::set_html(
        ITEMS_CONTAINER,
        r#"<p><span class="highlight-match">Flappy</span> <span class="highlight-match">Bird</span></p>"#
      )
    );
    assert!(has(&patches, &DomPatch::add_class("flappy-bird-challenge-container", "completed")));
    assert!(has(&patches, &DomPatch::remove_class("flappy-bird-challenge-container", "not-completed")));
    assert!(has(&patches, &DomPatch::hide(SKIP_BUTTON)));
    let hint = patches.iter().find_map(|p| match p {
      DomPatch::SetHtml { id, html } if id == HINT_LABEL => Some(html.clone()),
      _ => None,
    });
    assert!(hint.unwrap().contains("Albion Online"));
  }

  #[tokio::test]
  async fn upstream_failure_alerts_and_keeps_state() {
    let replies = StubReplies { query: (StatusCode::INTERNAL_SERVER_ERROR, "boom".into()), ..Default::default() };
    let (mut s, _) = session_with(replies, RenderMode::Documents).await;
    let patches = s.search(q("flappy bird")).await;
    assert_eq!(patches, vec![DomPatch::alert("Error fetching data.")]);
    assert!(!s.track().is_completed(Stage::FlappyBird));
  }

  #[tokio::test]
  async fn no_results_shows_message_without_challenge_check() {
    let replies = StubReplies { query: (StatusCode::OK, "[]".into()), ..Default::default() };
    let (mut s, seen) = session_with(replies, RenderMode::Documents).await;
    let patches = s.search(q("flappy bird")).await;
    assert_eq!(patches.len(), 1);
    match &patches[0] {
      DomPatch::SetHtml { id, html } => {
        assert_eq!(id, ITEMS_CONTAINER);
        assert!(html.contains("No results found"));
      }
      other => panic!("unexpected {other:?}"),
    }
    assert!(!s.track().is_completed(Stage::FlappyBird));
    assert_eq!(seen.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn search_sends_session_tags_upstream() {
    let (mut s, seen) = session_with(StubReplies::default(), RenderMode::Documents).await;
    s.enter_tag("RPG");
    s.search(q("zelda")).await;
    assert_eq!(seen.lock().unwrap()[0].1["tags"], serde_json::json!(["RPG"]));
  }

  #[tokio::test]
  async fn skip_shows_after_four_misses_and_marks_failed() {
    let (mut s, _) = session_with(StubReplies::default(), RenderMode::Direct).await;
    for _ in 0..3 {
      let patches = s.search(q("tetris")).await;
      assert!(!has(&patches, &DomPatch::show(SKIP_BUTTON)));
      assert!(s.skip().is_empty());
    }
    let patches = s.search(q("tetris")).await;
    assert!(has(&patches, &DomPatch::show(SKIP_BUTTON)));

    let patches = s.skip();
    assert!(has(&patches, &DomPatch::add_class("flappy-bird-challenge-container", "failed")));
    assert!(has(&patches, &DomPatch::hide(SKIP_BUTTON)));
    assert_eq!(s.track().current(), Some(Stage::AlbionOnline));
    assert!(!s.track().task_outcomes().flappy_bird);
  }

  #[tokio::test]
  async fn free_search_reveals_feedback_button_then_redirects() {
    let (mut s, _) = session_with(StubReplies::default(), RenderMode::Documents).await;
    finish_tutorial(&mut s).await;
    assert!(s.open_feedback().is_empty());

    for _ in 0..3 {
      let patches = s.search(q("hades")).await;
      assert!(!has(&patches, &DomPatch::show(FEEDBACK_BUTTON)));
    }
    let patches = s.search(q("hades")).await;
    assert!(has(&patches, &DomPatch::show(FEEDBACK_BUTTON)));
    assert!(has(&patches, &DomPatch::hide(HINT_LABEL)));
    assert!(has(&patches, &DomPatch::add_class("free-search-challenge-container", "completed")));

    let later = s.search(q("hades")).await;
    assert_eq!(later.len(), 1);

    assert_eq!(
      s.open_feedback(),
      vec![DomPatch::Navigate {
        url: "/feedback?task_flappy_bird=true&task_albion_online=true&task_organized_theft=true&task_elden_ring=true&task_free_search=true".into()
      }]
    );
  }

  #[tokio::test]
  async fn tag_events_follow_set_semantics() {
    let (mut s, _) = session_with(StubReplies::default(), RenderMode::Documents).await;
    let first = s.enter_tag("RPG");
    assert_eq!(first.len(), 2);
    assert!(matches!(&first[0], DomPatch::AppendHtml { id, .. } if id == TAG_CONTAINER));
    assert_eq!(s.enter_tag("RPG"), vec![DomPatch::SetValue { id: TAG_INPUT.into(), value: String::new() }]);
    assert_eq!(s.tags().len(), 1);
    assert!(s.enter_tag("  ").is_empty());

    let chip = match &first[0] {
      DomPatch::AppendHtml { html, .. } => html.split('"').nth(1).unwrap().to_string(),
      _ => unreachable!(),
    };
    assert_eq!(s.remove_tag(&chip), vec![DomPatch::RemoveElement { id: chip.clone() }]);
    assert!(s.remove_tag(&chip).is_empty());
    s.enter_tag("RPG");
    assert_eq!(s.tags().values(), vec!["RPG".to_string()]);
  }

  #[tokio::test]
  async fn feedback_is_merged_and_confirmed() {
    let (s, seen) = session_with(StubReplies::default(), RenderMode::Documents).await;
    let forms = vec![
      BTreeMap::from([("clear_vs_confusing".to_string(), "2".to_string())]),
      BTreeMap::from([("easy_to_use_question".to_string(), "".to_string())]),
    ];
    let patches = s
      .submit_feedback(&forms, Some("?task_flappy_bird=true&task_albion_online=false"))
      .await;
    assert!(matches!(&patches[0], DomPatch::SetHtml { id, .. } if id == FEEDBACK_MESSAGE));

    let seen = seen.lock().unwrap();
    let body = &seen[0].1["feedback"];
    assert_eq!(body["clear_vs_confusing"], "2");
    assert!(body.get("easy_to_use_question").is_none());
    assert_eq!(body["task_flappy_bird_completed"], "true");
    assert_eq!(body["task_elden_ring_completed"], "false");
  }

  #[tokio::test]
  async fn feedback_failure_alerts() {
    let replies = StubReplies { feedback: StatusCode::BAD_GATEWAY, ..Default::default() };
    let (s, _) = session_with(replies, RenderMode::Documents).await;
    assert_eq!(s.submit_feedback(&[], None).await, vec![DomPatch::alert("Error submitting feedback.")]);
  }

  #[tokio::test]
  async fn handle_answers_ping_and_wraps_patches() {
    let (mut s, _) = session_with(StubReplies::default(), RenderMode::Documents).await;
    assert!(matches!(s.handle(ClientWsMessage::Ping).await, ServerWsMessage::Pong));
    match s.handle(ClientWsMessage::Skip).await {
      ServerWsMessage::Patches { patches } => assert!(patches.is_empty()),
      other => panic!("unexpected {other:?}"),
    }
  }
}
