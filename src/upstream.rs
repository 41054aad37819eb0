//! HTTP client for the upstream search site: query, render and feedback endpoints.
//!
//! Two deployment modes share one search flow (`RenderMode`):
//!   - `direct`: `/query` answers with ready HTML
//!   - `documents`: `/query` answers with a JSON array of documents which is then
//!     posted to `/render/documents` for HTML
//!
//! Failures are never retried; the caller decides how to surface them.
//! We log sizes and statuses, not bodies.

use std::{str::FromStr, time::Duration};

use reqwest::{header::USER_AGENT, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::feedback::FeedbackPayload;
use crate::util::trunc_for_log;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// The only failure class of the page: the upstream could not be reached or refused.
#[derive(Debug, Error)]
pub enum UpstreamError {
  #[error("request to {endpoint} failed: {source}")]
  Transport {
    endpoint: &'static str,
    #[source]
    source: reqwest::Error,
  },
  #[error("{endpoint} answered HTTP {status}: {body}")]
  Status {
    endpoint: &'static str,
    status: StatusCode,
    body: String,
  },
  #[error("could not read {endpoint} response: {source}")]
  Decode {
    endpoint: &'static str,
    #[source]
    source: reqwest::Error,
  },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
  Direct,
  #[default]
  Documents,
}

impl FromStr for RenderMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "direct" | "html" => Ok(RenderMode::Direct),
      "documents" | "render" => Ok(RenderMode::Documents),
      other => Err(format!("unknown render mode '{other}' (expected 'direct' or 'documents')")),
    }
  }
}

/// Body of `POST /query`. Filters are only sent in `documents` mode.
#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
  pub query: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags: Option<&'a [String]>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub platform: Option<&'a str>,
}

#[derive(Serialize)]
struct RenderRequest<'a> {
  documents: &'a Value,
}

#[derive(Serialize)]
struct FeedbackRequest<'a> {
  feedback: &'a FeedbackPayload,
}

/// What a search produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchResults {
  Html(String),
  /// `/query` returned an empty document list; nothing to render.
  NoResults,
}

#[derive(Clone)]
pub struct Upstream {
  pub client: reqwest::Client,
  pub base_url: String,
  pub render_mode: RenderMode,
}

impl Upstream {
  pub fn new(base_url: &str, render_mode: RenderMode, timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      render_mode,
    })
  }

  /// Build from UPSTREAM_BASE_URL, RENDER_MODE and UPSTREAM_TIMEOUT_SECS.
  pub fn from_env() -> Result<Self, reqwest::Error> {
    let base_url = std::env::var("UPSTREAM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let render_mode = match std::env::var("RENDER_MODE") {
      Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
        warn!(target: "gamesearch_ux", error = %e, "Invalid RENDER_MODE; using 'documents'");
        RenderMode::Documents
      }),
      Err(_) => RenderMode::default(),
    };
    let timeout = std::env::var("UPSTREAM_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Self::new(&base_url, render_mode, Duration::from_secs(timeout))
  }

  /// Run the configured search flow and return HTML ready for the results container.
  #[instrument(level = "info", skip(self, query, tags), fields(mode = ?self.render_mode, query_len = query.len(), tags = tags.len()))]
  pub async fn search(
    &self,
    query: &str,
    tags: &[String],
    status: &str,
    category: &str,
    platform: &str,
  ) -> Result<SearchResults, UpstreamError> {
    match self.render_mode {
      RenderMode::Direct => {
        let req = QueryRequest { query, tags: None, status: None, category: None, platform: None };
        let html = self.post_text("/query", &req).await?;
        Ok(SearchResults::Html(html))
      }
      RenderMode::Documents => {
        let req = QueryRequest {
          query,
          tags: Some(tags),
          status: Some(status),
          category: Some(category),
          platform: Some(platform),
        };
        let documents = self.post_json("/query", &req).await?;
        if documents.as_array().is_some_and(|docs| docs.is_empty()) {
          info!(target: "gamesearch_ux", "Query returned no documents");
          return Ok(SearchResults::NoResults);
        }
        let html = self.post_text("/render/documents", &RenderRequest { documents: &documents }).await?;
        Ok(SearchResults::Html(html))
      }
    }
  }

  /// Post the consolidated feedback. Only the status is looked at.
  #[instrument(level = "info", skip(self, payload), fields(answers = payload.answered()))]
  pub async fn submit_feedback(&self, payload: &FeedbackPayload) -> Result<(), UpstreamError> {
    self.post("/feedback", &FeedbackRequest { feedback: payload }).await?;
    Ok(())
  }

  async fn post<B: Serialize + ?Sized>(
    &self,
    endpoint: &'static str,
    body: &B,
  ) -> Result<reqwest::Response, UpstreamError> {
    let url = format!("{}{}", self.base_url, endpoint);
    let start = std::time::Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "gamesearch-ux/0.1")
      .json(body)
      .send()
      .await
      .map_err(|source| UpstreamError::Transport { endpoint, source })?;

    let status = res.status();
    debug!(target: "gamesearch_ux", endpoint, %status, elapsed = ?start.elapsed(), "Upstream answered");
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      return Err(UpstreamError::Status { endpoint, status, body: trunc_for_log(&body, 200) });
    }
    Ok(res)
  }

  async fn post_text<B: Serialize + ?Sized>(&self, endpoint: &'static str, body: &B) -> Result<String, UpstreamError> {
    let text = self
      .post(endpoint, body)
      .await?
      .text()
      .await
      .map_err(|source| UpstreamError::Decode { endpoint, source })?;
    debug!(target: "gamesearch_ux", endpoint, bytes = text.len(), "Upstream HTML received");
    Ok(text)
  }

  async fn post_json<B: Serialize + ?Sized>(&self, endpoint: &'static str, body: &B) -> Result<Value, UpstreamError> {
    self
      .post(endpoint, body)
      .await?
      .json::<Value>()
      .await
      .map_err(|source| UpstreamError::Decode { endpoint, source })
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  use std::sync::{Arc, Mutex};

  use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
  use tokio::net::TcpListener;

  /// Requests seen by the stub, as (path, JSON body).
  pub type Seen = Arc<Mutex<Vec<(String, Value)>>>;

  /// How the stub upstream answers.
  #[derive(Clone)]
  pub struct StubReplies {
    pub query: (StatusCode, String),
    pub render: String,
    pub feedback: StatusCode,
  }

  impl Default for StubReplies {
    fn default() -> Self {
      Self {
        query: (StatusCode::OK, r#"[{"name":"Elden Ring"}]"#.into()),
        render: "<div class=\"card\">Elden Ring</div>".into(),
        feedback: StatusCode::OK,
      }
    }
  }

  /// Start an in-process upstream on an ephemeral port; returns its base URL.
  pub async fn spawn_stub(replies: StubReplies) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let state = (replies, seen.clone());

    async fn query(State((r, seen)): State<(StubReplies, Seen)>, Json(body): Json<Value>) -> (StatusCode, String) {
      seen.lock().unwrap().push(("/query".into(), body));
      r.query
    }
    async fn render(State((r, seen)): State<(StubReplies, Seen)>, Json(body): Json<Value>) -> String {
      seen.lock().unwrap().push(("/render/documents".into(), body));
      r.render
    }
    async fn feedback(State((r, seen)): State<(StubReplies, Seen)>, Json(body): Json<Value>) -> StatusCode {
      seen.lock().unwrap().push(("/feedback".into(), body));
      r.feedback
    }

    let app = Router::new()
      .route("/query", post(query))
      .route("/render/documents", post(render))
      .route("/feedback", post(feedback))
      .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
  }

  pub fn client(base: &str, mode: RenderMode) -> Upstream {
    Upstream::new(base, mode, Duration::from_secs(5)).unwrap()
  }

  #[tokio::test]
  async fn documents_mode_queries_then_renders() {
    let (base, seen) = spawn_stub(StubReplies::default()).await;
    let up = client(&base, RenderMode::Documents);
    let tags = vec!["RPG".to_string()];
    let res = up.search("elden", &tags, "Released", "Action", "Windows").await.unwrap();
    assert_eq!(res, SearchResults::Html("<div class=\"card\">Elden Ring</div>".into()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "/query");
    assert_eq!(
      seen[0].1,
      serde_json::json!({"query":"elden","tags":["RPG"],"status":"Released","category":"Action","platform":"Windows"})
    );
    assert_eq!(seen[1].0, "/render/documents");
    assert_eq!(seen[1].1, serde_json::json!({"documents":[{"name":"Elden Ring"}]}));
  }

  #[tokio::test]
  async fn empty_document_list_skips_render() {
    let replies = StubReplies { query: (StatusCode::OK, "[]".into()), ..Default::default() };
    let (base, seen) = spawn_stub(replies).await;
    let res = client(&base, RenderMode::Documents).search("zzz", &[], "", "", "").await.unwrap();
    assert_eq!(res, SearchResults::NoResults);
    assert_eq!(seen.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn direct_mode_sends_query_only() {
    let replies = StubReplies { query: (StatusCode::OK, "<p>cards</p>".into()), ..Default::default() };
    let (base, seen) = spawn_stub(replies).await;
    let res = client(&base, RenderMode::Direct).search("flappy", &[], "x", "y", "z").await.unwrap();
    assert_eq!(res, SearchResults::Html("<p>cards</p>".into()));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, serde_json::json!({"query":"flappy"}));
  }

  #[tokio::test]
  async fn non_success_status_is_an_error() {
    let replies = StubReplies { query: (StatusCode::BAD_REQUEST, "Missing \"query\" field".into()), ..Default::default() };
    let (base, _) = spawn_stub(replies).await;
    let err = client(&base, RenderMode::Direct).search("q", &[], "", "", "").await.unwrap_err();
    assert!(matches!(
      err,
      UpstreamError::Status { endpoint: "/query", status, .. } if status == reqwest::StatusCode::BAD_REQUEST
    ));
  }

  #[tokio::test]
  async fn unreachable_upstream_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = client(&format!("http://{addr}"), RenderMode::Direct)
      .search("q", &[], "", "", "")
      .await
      .unwrap_err();
    assert!(matches!(err, UpstreamError::Transport { .. }));
  }

  #[test]
  fn render_mode_parses_both_spellings() {
    assert_eq!("direct".parse::<RenderMode>(), Ok(RenderMode::Direct));
    assert_eq!(" Documents ".parse::<RenderMode>(), Ok(RenderMode::Documents));
    assert!("xml".parse::<RenderMode>().is_err());
  }
}
