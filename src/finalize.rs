//! Finishing-pass bookkeeping shared by every backend.
//!
//! During event processing the compiler accumulates the unit's
//! side-collections here; at `finalize()` each backend relocates them into
//! the fixed anchor positions of its output idiom (the unit initializer and
//! the lifecycle dispatch tables). Assembly is structural: text exists only
//! once the backend renders its declaration records.

use crate::validate::ActionClass;
use crate::registry::CodeFragment;
use serde::{Deserialize, Serialize};

/// Side-collections of one compilation unit, in registration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitLayout {
    pub unit_name: String,
    pub variables: Vec<CodeFragment>,
    pub initial_state_hooks: Vec<String>,
    pub adapter_init_hooks: Vec<String>,
    pub adapter_exit_hooks: Vec<String>,
    pub action_names: Vec<String>,
    pub action_classes: Vec<ActionClass>,
    pub tag_names: Vec<String>,
}

impl Default for UnitLayout {
    fn default() -> Self {
        Self {
            // Units that never see begin_unit still need a loadable name.
            unit_name: "TestModel".to_string(),
            variables: Vec::new(),
            initial_state_hooks: Vec::new(),
            adapter_init_hooks: Vec::new(),
            adapter_exit_hooks: Vec::new(),
            action_names: Vec::new(),
            action_classes: Vec::new(),
            tag_names: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Re-indents a fragment to the nesting level of its emission site. Blank
/// lines stay blank so the fragment's own layout survives.
pub fn indent_block(code: &str, indent: &str) -> String {
    code.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `'a', 'b', 'c'` style list bodies for the registry collections.
pub fn quoted_csv(items: &[String], quote: char) -> String {
    items
        .iter()
        .map(|s| format!("{q}{s}{q}", q = quote, s = s))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_preserves_blank_lines() {
        let out = indent_block("a = 1\n\nb = 2", "    ");
        assert_eq!(out, "    a = 1\n\n    b = 2");
    }

    #[test]
    fn test_quoted_csv() {
        let items = vec!["iA".to_string(), "iB".to_string()];
        assert_eq!(quoted_csv(&items, '\''), "'iA', 'iB'");
        assert_eq!(quoted_csv(&[], '"'), "");
    }

    #[test]
    fn test_default_layout_has_fallback_name() {
        assert_eq!(UnitLayout::default().unit_name, "TestModel");
    }
}
