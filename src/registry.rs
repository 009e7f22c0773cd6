//! Fragment and name bookkeeping for one compilation unit.
//!
//! Fragments are caller-owned text threaded through unchanged; the registry
//! records the first definition site of every action/tag name so duplicates
//! are detectable with a usable diagnostic position.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════════════
// CODE FRAGMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A raw guard/body/adapter fragment plus its source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFragment {
    pub code: String,
    pub file: String,
    pub line: u32,
}

impl CodeFragment {
    pub fn new(code: &str, file: &str, line: u32) -> Self {
        Self {
            code: code.to_string(),
            file: file.to_string(),
            line,
        }
    }

    /// A fragment with no printable content is treated as absent and falls
    /// back to the backend's trivial default.
    pub fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAME REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Maps each registered name to its first definition position. Later
/// registrations never overwrite the stored position.
#[derive(Debug, Default)]
pub struct NameRegistry {
    entries: HashMap<String, (String, u32)>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registers `name` unless already present. Returns the position of the
    /// earlier definition when there is one.
    pub fn register(&mut self, name: &str, file: &str, line: u32) -> Option<(String, u32)> {
        if let Some((f, l)) = self.entries.get(name) {
            return Some((f.clone(), *l));
        }
        self.entries
            .insert(name.to_string(), (file.to_string(), line));
        None
    }

    pub fn position_of(&self, name: &str) -> Option<(&str, u32)> {
        self.entries.get(name).map(|(f, l)| (f.as_str(), *l))
    }
}
