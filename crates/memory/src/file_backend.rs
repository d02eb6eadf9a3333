//! File-based session store: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded `SessionTurn`. Turns are loaded into memory
//! on creation; appends add one line, clears rewrite the file.
//!
//! Storage location: `~/.conductor/sessions/turns.jsonl` unless configured.

use async_trait::async_trait;
use conductor_core::error::SessionError;
use conductor_core::session::{SessionStore, SessionTurn};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed session store using JSONL (one JSON object per line).
pub struct FileSessionStore {
    path: PathBuf,
    turns: Arc<RwLock<Vec<SessionTurn>>>,
}

impl FileSessionStore {
    /// Create a new file-based store at the given path.
    ///
    /// If the file exists, turns are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf) -> Self {
        let turns = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = turns.len(), "File session store loaded");
        Self {
            path,
            turns: Arc::new(RwLock::new(turns)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load turns from a JSONL file.
    fn load_from_disk(path: &Path) -> Vec<SessionTurn> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(), // File doesn't exist yet, start empty
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<SessionTurn>(line) {
                Ok(turn) => Some(turn),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted session turn");
                    None
                }
            })
            .collect()
    }

    fn ensure_parent(&self) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SessionError::Storage(format!("Failed to create session directory: {e}"))
            })?;
        }
        Ok(())
    }

    fn encode(turn: &SessionTurn) -> Result<String, SessionError> {
        serde_json::to_string(turn).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    /// Rewrite the whole file from the in-memory turns.
    fn rewrite(&self, turns: &[SessionTurn]) -> Result<(), SessionError> {
        self.ensure_parent()?;

        let mut content = String::new();
        for turn in turns {
            content.push_str(&Self::encode(turn)?);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| SessionError::Storage(format!("Failed to write session file: {e}")))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, turn: SessionTurn) -> Result<(), SessionError> {
        let line = Self::encode(&turn)?;
        let mut turns = self.turns.write().await;

        self.ensure_parent()?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SessionError::Storage(format!("Failed to open session file: {e}")))?;
        writeln!(file, "{line}")
            .map_err(|e| SessionError::Storage(format!("Failed to append session turn: {e}")))?;

        turns.push(turn);
        Ok(())
    }

    async fn history(&self, session_key: &str, limit: usize) -> Result<Vec<SessionTurn>, SessionError> {
        let turns = self.turns.read().await;
        let mut recent: Vec<SessionTurn> = turns
            .iter()
            .rev()
            .filter(|t| t.session_key == session_key)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn clear(&self, session_key: &str) -> Result<bool, SessionError> {
        let mut turns = self.turns.write().await;
        let len_before = turns.len();
        turns.retain(|t| t.session_key != session_key);
        let removed = turns.len() < len_before;
        if removed {
            self.rewrite(&turns)?;
        }
        Ok(removed)
    }

    async fn session_count(&self) -> Result<usize, SessionError> {
        let turns = self.turns.read().await;
        let keys: HashSet<&str> = turns.iter().map(|t| t.session_key.as_str()).collect();
        Ok(keys.len())
    }
}
