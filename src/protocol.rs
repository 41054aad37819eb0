//! Public protocol structs for the page <-> service WebSocket (serde ready).
//! The page forwards raw UI events and applies the patches it gets back in order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::SearchInput;

/// Events the page sends over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Enter pressed in `search-input` (or a programmatic search).
    Search(SearchInput),
    /// Enter pressed in `tagInput`.
    TagEntered {
        text: String,
    },
    /// Remove button of a chip clicked.
    TagRemoved {
        #[serde(rename = "chipId")]
        chip_id: String,
    },
    /// Skip control clicked.
    Skip,
    /// Feedback button clicked.
    OpenFeedback,
    /// Feedback page forms submitted.
    SubmitFeedback {
        #[serde(default)]
        forms: Vec<BTreeMap<String, String>>,
        /// `location.search` of the feedback page, carrying the task flags.
        #[serde(default, rename = "locationSearch")]
        location_search: Option<String>,
    },
}

/// Messages the service sends back.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Patches { patches: Vec<DomPatch> },
    Error { message: String },
}

/// One DOM mutation, addressed by element id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DomPatch {
    SetHtml { id: String, html: String },
    AppendHtml { id: String, html: String },
    RemoveElement { id: String },
    AddClass { id: String, class: String },
    RemoveClass { id: String, class: String },
    SetValue { id: String, value: String },
    Alert { message: String },
    Navigate { url: String },
}

impl DomPatch {
    pub fn set_html(id: impl Into<String>, html: impl Into<String>) -> Self {
        DomPatch::SetHtml { id: id.into(), html: html.into() }
    }

    pub fn add_class(id: impl Into<String>, class: &str) -> Self {
        DomPatch::AddClass { id: id.into(), class: class.into() }
    }

    pub fn remove_class(id: impl Into<String>, class: &str) -> Self {
        DomPatch::RemoveClass { id: id.into(), class: class.into() }
    }

    pub fn show(id: impl Into<String>) -> Self {
        Self::remove_class(id, "hidden")
    }

    pub fn hide(id: impl Into<String>) -> Self {
        Self::add_class(id, "hidden")
    }

    pub fn alert(message: impl Into<String>) -> Self {
        DomPatch::Alert { message: message.into() }
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
