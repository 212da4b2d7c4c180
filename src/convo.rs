use crate::datam::{Role, Turn, Usage};
use crate::error::{ChatbotError, Result};
use crate::knowledge::UseCase;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_MAX_PAIRS: usize = 10;

/// Counts reported by [`ConversationState::summary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
}

/// The rolling conversation history: user/assistant turns in strict
/// alternation, capped at `max_pairs` exchanges.
///
/// Turns are only added and removed in pairs, so the length is always even.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    turns: Vec<Turn>,
    max_pairs: usize,
}

impl ConversationState {
    pub fn new(max_pairs: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_pairs,
        }
    }

    /// Records one exchange, dropping the oldest exchanges beyond capacity.
    pub fn append(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::assistant(assistant_text));

        let cap = 2 * self.max_pairs;
        if self.turns.len() > cap {
            let excess = self.turns.len() - cap;
            self.turns.drain(..excess);
        }
    }

    /// A copy of the current turns.
    pub fn history(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_pairs(&self) -> usize {
        self.max_pairs
    }

    pub fn summary(&self) -> HistorySummary {
        let user_messages = self.turns.iter().filter(|t| t.role == Role::User).count();
        HistorySummary {
            total_messages: self.turns.len(),
            user_messages,
            assistant_messages: self.turns.len() - user_messages,
        }
    }

    /// Turns grouped as `(user, assistant)` exchanges, oldest first.
    pub fn exchanges(&self) -> Vec<(String, String)> {
        self.turns
            .chunks_exact(2)
            .map(|pair| (pair[0].content.clone(), pair[1].content.clone()))
            .collect()
    }

    /// Replaces the history with `turns`, keeping only well-formed
    /// user/assistant pairs and then the newest `max_pairs` of them.
    pub fn restore(&mut self, turns: &[Turn]) {
        self.turns.clear();
        for pair in turns.chunks_exact(2) {
            if pair[0].role == Role::User && pair[1].role == Role::Assistant {
                self.append(pair[0].content.clone(), pair[1].content.clone());
            }
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAIRS)
    }
}

/// A saved conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub use_case: UseCase,
    /// The chat model that produced the assistant turns.
    pub model_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub usage: Usage,
}

impl Conversation {
    pub fn new(use_case: UseCase, model_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            use_case,
            model_name: model_name.into(),
            created_at: now,
            updated_at: now,
            turns: Vec::new(),
            usage: Usage::default(),
        }
    }

    /// Loads a conversation from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| {
            ChatbotError::Chat(format!("Invalid conversation file {}: {}", path.display(), e))
        })
    }

    /// Saves the transcript and returns the file written.
    ///
    /// If `path` is an existing directory, the file is named
    /// `convo-<id>.json` inside it. Otherwise `path` is used as the file
    /// path, creating parent directories as needed.
    pub fn save(&mut self, path: &Path) -> Result<PathBuf> {
        self.updated_at = Utc::now();
        let data = serde_json::to_string_pretty(&self)?;

        let file_path = if path.is_dir() {
            path.join(format!("convo-{}.json", self.id))
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            path.to_path_buf()
        };
        fs::write(&file_path, data)?;
        Ok(file_path)
    }
}
