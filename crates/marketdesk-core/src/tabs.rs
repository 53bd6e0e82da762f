//! Tab store - the ordered collection of query-result tabs
//!
//! Tabs are newest-first; the active pointer always names an existing tab or
//! nothing. Every mutation persists the full sequence to one JSON file so a
//! reload reproduces the session exactly. `clear_all` removes the file
//! entirely rather than writing an empty array.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::exchange::Exchange;
use crate::news::{NewsRecord, QueryMode};

/// One query result, created by the orchestrator on a successful fetch.
/// Immutable after creation except for deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTab {
    /// Time-derived id, unique within the session
    pub id: String,
    pub title: String,
    pub data: Vec<NewsRecord>,
    /// ISO-8601 creation time
    pub timestamp: String,
    pub query_mode: QueryMode,
    /// Exchange id for exchange-specific queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// The resolved exchange record, attached for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_data: Option<Exchange>,
}

/// Confirm-or-abort gate for destructive clearing. The confirmation surface
/// itself (dialog, prompt) is the frontend's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Aborted,
}

/// Owns the tab sequence, the active pointer, and their persisted copy
#[derive(Debug)]
pub struct TabStore {
    /// Newest-first
    tabs: Vec<QueryTab>,
    active_tab_id: Option<String>,
    storage_path: PathBuf,
}

impl TabStore {
    /// Create an empty store persisting to `storage_path`
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            tabs: Vec::new(),
            active_tab_id: None,
            storage_path: storage_path.into(),
        }
    }

    /// Default storage file: `<data_dir>/marketdesk/tabs.json`
    pub fn default_storage_path() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("marketdesk"))
            .unwrap_or_else(|| PathBuf::from(".marketdesk"))
            .join("tabs.json")
    }

    /// Load a previously persisted tab sequence. Invoked once at session
    /// start. A missing file means no tabs; a malformed file is logged and
    /// treated the same way - never fatal.
    pub fn load_from_storage(&mut self) {
        let json = match fs::read_to_string(&self.storage_path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no persisted tabs at {:?}", self.storage_path);
                return;
            }
            Err(e) => {
                warn!("failed to read persisted tabs {:?}: {}", self.storage_path, e);
                return;
            }
        };

        match serde_json::from_str::<Vec<QueryTab>>(&json) {
            Ok(tabs) => {
                debug!(count = tabs.len(), "restored persisted tabs");
                self.active_tab_id = tabs.first().map(|t| t.id.clone());
                self.tabs = tabs;
            }
            Err(e) => {
                warn!("failed to parse persisted tabs, starting empty: {}", e);
            }
        }
    }

    /// Prepend a tab and make it active
    pub fn add_tab(&mut self, tab: QueryTab) -> Result<()> {
        if self.tabs.iter().any(|t| t.id == tab.id) {
            return Err(Error::Validation(format!("duplicate tab id: {}", tab.id)));
        }
        self.active_tab_id = Some(tab.id.clone());
        self.tabs.insert(0, tab);
        self.persist()
    }

    /// Remove a tab. Closing the active tab selects the new first tab, or
    /// nothing when the store becomes empty; closing any other tab leaves the
    /// active pointer alone. Returns whether a tab was removed.
    pub fn close_tab(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.tabs.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        self.tabs.remove(index);

        if self.active_tab_id.as_deref() == Some(id) {
            self.active_tab_id = self.tabs.first().map(|t| t.id.clone());
        }

        self.persist()?;
        Ok(true)
    }

    /// Make an existing tab active. Returns false for unknown ids.
    pub fn select_tab(&mut self, id: &str) -> bool {
        if self.tabs.iter().any(|t| t.id == id) {
            self.active_tab_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Destructively empty the store and delete the persisted copy.
    /// Gated on an explicit confirmation; aborting is a no-op.
    /// Returns whether the store was cleared.
    pub fn clear_all(&mut self, confirmation: Confirmation) -> Result<bool> {
        if confirmation == Confirmation::Aborted {
            return Ok(false);
        }

        self.tabs.clear();
        self.active_tab_id = None;

        match fs::remove_file(&self.storage_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(true)
    }

    pub fn tabs(&self) -> &[QueryTab] {
        &self.tabs
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.active_tab_id.as_deref()
    }

    pub fn active_tab(&self) -> Option<&QueryTab> {
        let id = self.active_tab_id.as_deref()?;
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Serialize the full sequence and write it atomically (tmp + rename).
    /// Runs on every mutation, including ones that leave the store empty, so
    /// the persisted copy never goes stale.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.tabs)?;
        let tmp_path = self.storage_path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)?;
        fs::rename(&tmp_path, &self.storage_path)?;
        Ok(())
    }
}
