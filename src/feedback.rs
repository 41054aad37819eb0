//! Feedback hand-off: the redirect after the tutorial and the consolidated payload.
//!
//! The feedback page has three forms (UEQ, SUS, usability). Their fields are
//! merged into one flat map together with the task completion flags, e.g.
//! `task_elden_ring_completed = "true"`.

use std::collections::BTreeMap;

use axum::{extract::Query, http::Uri};
use serde::{Deserialize, Serialize};

use crate::domain::TaskOutcomes;

/// Flat field name -> value mapping posted to the feedback endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeedbackPayload(BTreeMap<String, String>);

impl FeedbackPayload {
  /// Merge form sections in order (later sections win on key clashes), drop
  /// unanswered (blank) fields and append the task completion flags.
  pub fn merge<'a, I>(forms: I, tasks: &TaskOutcomes) -> Self
  where
    I: IntoIterator<Item = &'a BTreeMap<String, String>>,
  {
    let mut fields = BTreeMap::new();
    for form in forms {
      for (k, v) in form {
        if v.trim().is_empty() {
          fields.remove(k);
        } else {
          fields.insert(k.clone(), v.clone());
        }
      }
    }
    for (key, done) in tasks.entries() {
      fields.insert(format!("task_{key}_completed"), done.to_string());
    }
    Self(fields)
  }

  /// Number of answered form fields, task flags excluded.
  pub fn answered(&self) -> usize {
    self.0.keys().filter(|k| !is_task_flag(k)).count()
  }

  #[cfg(test)]
  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }
}

fn is_task_flag(key: &str) -> bool {
  key.starts_with("task_") && key.ends_with("_completed")
}

/// Where the page goes once the tutorial is finished.
pub fn redirect_url(tasks: &TaskOutcomes) -> String {
  let query = tasks
    .entries()
    .iter()
    .map(|(key, done)| format!("task_{key}={done}"))
    .collect::<Vec<_>>()
    .join("&");
  format!("/feedback?{query}")
}

#[derive(Deserialize)]
struct RedirectQuery {
  #[serde(default)] task_flappy_bird: bool,
  #[serde(default)] task_albion_online: bool,
  #[serde(default)] task_organized_theft: bool,
  #[serde(default)] task_elden_ring: bool,
  #[serde(default)] task_free_search: bool,
}

/// Read the task flags back from the feedback page's query string
/// (with or without the leading `?`). Unknown or malformed input yields `None`.
pub fn tasks_from_query(search: &str) -> Option<TaskOutcomes> {
  let uri: Uri = format!("/feedback?{}", search.trim_start_matches('?')).parse().ok()?;
  let Query(q) = Query::<RedirectQuery>::try_from_uri(&uri).ok()?;
  Some(TaskOutcomes {
    flappy_bird: q.task_flappy_bird,
    albion_online: q.task_albion_online,
    organized_theft: q.task_organized_theft,
    elden_ring: q.task_elden_ring,
    free_search: q.task_free_search,
  })
}
