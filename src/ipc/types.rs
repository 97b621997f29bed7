use rusqlite::Connection;
use serde::Deserialize;
use std::path::PathBuf;

/// One stdin line: `{ "id": ..., "method": ..., "params": { ... } }`.
/// `params` defaults to null so bare method calls stay valid.
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Session state shared across handlers: the selected workspace directory
/// and the open database for it, both absent until `workspace.select`.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}
