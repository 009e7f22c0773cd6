//! Nested composition scopes for the action-model compiler.
//!
//! Serial blocks fire their members in strict registration order through a
//! rotating cursor; parallel blocks fire each member at most once per
//! activation cycle through a remaining-to-fire set. Blocks live in an arena
//! addressed by index, with a single stack of currently-open indices; opening
//! pushes a new arena entry and closing pops back to the parent, so the saved
//! state can never fall out of sync.
//!
//! The arena doubles as the reference semantics of the generated composition
//! code: `can_fire`/`fire` implement exactly the rotation the block-capable
//! backends render in their target language.

use crate::validate::CompilerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCK MODEL
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Serial,
    Parallel,
}

impl BlockKind {
    fn prefix(&self) -> &'static str {
        match self {
            BlockKind::Serial => "serial",
            BlockKind::Parallel => "parallel",
        }
    }
}

/// One guard a declaration depends on: the synthetic guard routine of an
/// enclosing block, checked for a specific member key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub guard: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    /// Per-kind sequence id, 1-based, never reused.
    pub seq: u32,
    pub single: bool,
    pub depth: u32,
    pub parent: Option<usize>,
    /// Member key of this block inside its parent, e.g. `serial2`.
    pub key: String,
    /// Step routine of the enclosing block, invoked when this block
    /// completes a full cycle.
    pub parent_step: Option<String>,
    /// Member keys in registration order: leaf action/tag names and the keys
    /// of directly nested blocks.
    pub members: Vec<String>,
    /// Guard chain inherited from enclosing blocks, outermost first.
    pub requires: Vec<Requirement>,
    // Firing-rotation state. Mirrors the initial state the backends emit.
    cursor: usize,
    fired: Vec<bool>,
    exhausted: bool,
}

impl Block {
    pub fn guard_name(&self) -> String {
        format!("{}_guard", self.key)
    }

    pub fn step_name(&self) -> String {
        format!("{}_step", self.key)
    }

    /// Whether the block's guard currently holds for `key`. An empty block
    /// is vacuously unsatisfiable; an exhausted one permanently so.
    fn permits(&self, key: &str) -> bool {
        if self.exhausted || self.members.is_empty() {
            return false;
        }
        match self.kind {
            BlockKind::Serial => self.members[self.cursor] == key,
            BlockKind::Parallel => self
                .members
                .iter()
                .zip(&self.fired)
                .any(|(m, fired)| m == key && !fired),
        }
    }

    /// Advances past `key`. Returns true when this completes a full cycle.
    /// Both kinds converge on the same terminal state: `single` blocks flip
    /// to `exhausted` instead of resetting.
    fn advance(&mut self, key: &str) -> bool {
        match self.kind {
            BlockKind::Serial => {
                self.cursor += 1;
                if self.cursor >= self.members.len() {
                    self.cursor = 0;
                    if self.single {
                        self.exhausted = true;
                    }
                    true
                } else {
                    false
                }
            }
            BlockKind::Parallel => {
                if let Some(i) = self
                    .members
                    .iter()
                    .zip(&self.fired)
                    .position(|(m, fired)| m == key && !fired)
                {
                    self.fired[i] = true;
                }
                if self.fired.iter().all(|f| *f) {
                    for f in &mut self.fired {
                        *f = false;
                    }
                    if self.single {
                        self.exhausted = true;
                    }
                    true
                } else {
                    false
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARENA
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct BlockArena {
    blocks: Vec<Block>,
    open: Vec<usize>,
    serial_seq: u32,
    parallel_seq: u32,
    /// Leaf name -> innermost owning block.
    owner: HashMap<String, usize>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_depth(&self) -> usize {
        self.open.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn open_block(&mut self, kind: BlockKind, single: bool) -> &Block {
        let seq = match kind {
            BlockKind::Serial => {
                self.serial_seq += 1;
                self.serial_seq
            }
            BlockKind::Parallel => {
                self.parallel_seq += 1;
                self.parallel_seq
            }
        };
        let key = format!("{}{}", kind.prefix(), seq);
        let parent = self.open.last().copied();
        let (requires, parent_step) = match parent {
            Some(p) => {
                let pb = &mut self.blocks[p];
                pb.members.push(key.clone());
                pb.fired.push(false);
                let mut chain = pb.requires.clone();
                chain.push(Requirement {
                    guard: pb.guard_name(),
                    key: key.clone(),
                });
                (chain, Some(pb.step_name()))
            }
            None => (Vec::new(), None),
        };
        let idx = self.blocks.len();
        self.blocks.push(Block {
            kind,
            seq,
            single,
            depth: self.open.len() as u32 + 1,
            parent,
            key,
            parent_step,
            members: Vec::new(),
            requires,
            cursor: 0,
            fired: Vec::new(),
            exhausted: false,
        });
        self.open.push(idx);
        &self.blocks[idx]
    }

    pub fn close_block(&mut self) -> Result<&Block, CompilerError> {
        let idx = self
            .open
            .pop()
            .ok_or_else(|| CompilerError::protocol("close_block with no open block"))?;
        Ok(&self.blocks[idx])
    }

    /// Registers a leaf action/tag name with the innermost open block, if
    /// any, and returns the guard chain plus the step routine the leaf's
    /// body must invoke.
    pub fn register_member(&mut self, name: &str) -> (Vec<Requirement>, Option<String>) {
        match self.open.last().copied() {
            Some(idx) => {
                let block = &mut self.blocks[idx];
                block.members.push(name.to_string());
                block.fired.push(false);
                self.owner.insert(name.to_string(), idx);
                let mut chain = block.requires.clone();
                chain.push(Requirement {
                    guard: block.guard_name(),
                    key: name.to_string(),
                });
                (chain, Some(block.step_name()))
            }
            None => (Vec::new(), None),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FIRING SIMULATION
    // ═══════════════════════════════════════════════════════════════════════

    /// True when every enclosing block currently permits `name`, transitively
    /// to the outermost block. Names registered outside any block always fire.
    pub fn can_fire(&self, name: &str) -> bool {
        let Some(&idx) = self.owner.get(name) else {
            return true;
        };
        let mut key = name.to_string();
        let mut current = Some(idx);
        while let Some(i) = current {
            let block = &self.blocks[i];
            if !block.permits(&key) {
                return false;
            }
            key = block.key.clone();
            current = block.parent;
        }
        true
    }

    /// Fires `name` if permitted, advancing the owning block and, on each
    /// completed cycle, its ancestors. Returns false when rejected.
    pub fn fire(&mut self, name: &str) -> bool {
        if !self.can_fire(name) {
            return false;
        }
        if let Some(&idx) = self.owner.get(name) {
            let mut key = name.to_string();
            let mut current = Some(idx);
            while let Some(i) = current {
                let completed = self.blocks[i].advance(&key);
                if !completed {
                    break;
                }
                key = self.blocks[i].key.clone();
                current = self.blocks[i].parent;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_ids_are_per_kind() {
        let mut arena = BlockArena::new();
        assert_eq!(arena.open_block(BlockKind::Serial, false).seq, 1);
        assert_eq!(arena.open_block(BlockKind::Parallel, false).seq, 1);
        assert_eq!(arena.open_block(BlockKind::Serial, false).seq, 2);
        assert_eq!(arena.blocks()[2].key, "serial2");
    }

    #[test]
    fn test_close_without_open_is_protocol_violation() {
        let mut arena = BlockArena::new();
        let err = arena.close_block().unwrap_err();
        assert_eq!(err.code, crate::validate::ERR_PROTOCOL_VIOLATION);
    }

    #[test]
    fn test_member_requirement_chain() {
        let mut arena = BlockArena::new();
        arena.open_block(BlockKind::Serial, false);
        arena.open_block(BlockKind::Parallel, false);
        let (chain, step) = arena.register_member("iGo");
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].guard, "serial1_guard");
        assert_eq!(chain[0].key, "parallel1");
        assert_eq!(chain[1].guard, "parallel1_guard");
        assert_eq!(chain[1].key, "iGo");
        assert_eq!(step.as_deref(), Some("parallel1_step"));
    }

    #[test]
    fn test_empty_block_is_unsatisfiable() {
        let mut arena = BlockArena::new();
        arena.open_block(BlockKind::Serial, false);
        arena.open_block(BlockKind::Parallel, false);
        arena.close_block().unwrap();
        arena.register_member("iA");
        arena.close_block().unwrap();
        // serial1's cursor sits on the memberless parallel1, which can never
        // complete, so iA behind it can never fire.
        assert!(!arena.can_fire("iA"));
    }
}
