use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Read-only sender id → display name table, loaded once at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasTable {
    #[serde(rename = "senderNames", default)]
    sender_names: HashMap<String, String>,
}

impl AliasTable {
    pub fn new(sender_names: HashMap<String, String>) -> Self {
        Self { sender_names }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Loads the alias file. A missing or malformed file is logged and
    /// degrades to an empty table so senders show up by their raw id.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "error reading alias file");
                return Self::default();
            }
        };
        match Self::from_json_str(&raw) {
            Ok(table) => {
                info!(path = %path.display(), aliases = table.len(), "loaded sender aliases");
                table
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "error parsing alias file");
                Self::default()
            }
        }
    }

    /// Display name for `sender`, or `sender` itself when it has no alias.
    pub fn resolve<'a>(&'a self, sender: &'a str) -> &'a str {
        self.sender_names
            .get(sender)
            .map(String::as_str)
            .unwrap_or(sender)
    }

    pub fn len(&self) -> usize {
        self.sender_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender_names.is_empty()
    }
}
