use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::GameDocument;

/// Identifier of the single shared game document.
pub const GAME_DOC_ID: &str = "game:current";

/// Path of the change-feed endpoint inside the database.
pub const CHANGES_PATH: &str = "_changes";

/// Envelope pairing the shared game document with CouchDB bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameEnvelope {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameDocument,
}

impl CouchGameEnvelope {
    /// Wrap a fresh document that has never been stored.
    pub fn new(game: GameDocument) -> Self {
        Self {
            id: GAME_DOC_ID.to_string(),
            rev: None,
            game,
        }
    }
}

/// Subset of a `_changes` long-poll response.
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    pub results: Vec<ChangeRow>,
    /// Opaque resume cursor; a string on CouchDB 2+, a number on 1.x.
    pub last_seq: Value,
}

/// One row of the `_changes` feed.
#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Render a `last_seq` cursor into the `since` query parameter.
pub fn seq_to_string(seq: &Value) -> String {
    match seq {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
