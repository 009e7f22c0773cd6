//! Codegen core for the action-model compiler.
//!
//! One `Compiler` instance consumes the structural event sequence produced by
//! the grammar-directed parser and drives exactly one backend emitter. Text
//! is produced only at `finalize()`; until then everything is accumulated as
//! structured `Declaration` records plus the unit's side-collections.

use crate::finalize::UnitLayout;
use crate::registry::{CodeFragment, NameRegistry};
use crate::scope::{Block, BlockArena, BlockKind, Requirement};
use crate::validate::{
    verify_decl_name, verify_unit_name, ActionClass, CompilerError, ERR_DUPLICATE_NAME,
    ERR_MISSING_HANDLER,
};
use serde::{Deserialize, Serialize};
use std::mem;
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATION RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NameKind {
    Action,
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    InputAction,
    ObservationAction,
    Tag,
    /// Lifecycle hook routine; `name` is the generated hook name and `body`
    /// carries its fragment.
    Hook,
}

/// One emitted declaration. Fragments left as `None` fall back to the
/// backend's trivial defaults (always-true guard, no-op body/adapter).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub index: u32,
    pub guard: Option<CodeFragment>,
    pub body: Option<CodeFragment>,
    pub adapter: Option<CodeFragment>,
    /// Synthetic block guards this declaration depends on, outermost first.
    pub requires: Vec<Requirement>,
    /// Step routine of the innermost enclosing block, invoked by the body.
    pub advances: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMITTER INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Composition structure events forwarded to the backend as they happen.
#[derive(Debug)]
pub enum StructuralEvent<'a> {
    OpenBlock {
        kind: BlockKind,
        seq: u32,
        single: bool,
    },
    CloseBlock {
        block: &'a Block,
    },
}

/// One concrete output idiom. Selected once at construction; every backend
/// consumes the same event stream.
pub trait Emitter {
    fn record_structural_event(&mut self, event: &StructuralEvent<'_>)
        -> Result<(), CompilerError>;
    fn emit_fragment(&mut self, decl: &Declaration) -> Result<(), CompilerError>;
    fn finalize(&mut self, layout: &UnitLayout) -> Result<String, CompilerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    Python,
    Lua,
    C,
    /// Collector variant: enumerates declared action names instead of
    /// producing executable declarations.
    ActionNames,
    /// Collector variant for tag names.
    TagNames,
}

impl Target {
    pub fn create_emitter(self) -> Box<dyn Emitter> {
        match self {
            Target::Python => Box::new(crate::emit_python::PythonEmitter::new()),
            Target::Lua => Box::new(crate::emit_lua::LuaEmitter::new()),
            Target::C => Box::new(crate::emit_c::CEmitter::new()),
            Target::ActionNames => {
                Box::new(crate::collectors::NameCollector::new(NameKind::Action))
            }
            Target::TagNames => Box::new(crate::collectors::NameCollector::new(NameKind::Tag)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER (EVENT INTERFACE)
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Clone)]
struct FragmentTriple {
    guard: Option<CodeFragment>,
    body: Option<CodeFragment>,
    adapter: Option<CodeFragment>,
}

struct GroupMember {
    name: String,
    index: u32,
    class: ActionClass,
    requires: Vec<Requirement>,
    advances: Option<String>,
}

struct OpenGroup {
    kind: NameKind,
    members: Vec<GroupMember>,
}

/// Single-use, single-threaded translation state for one compilation unit.
/// `finalize` consumes the instance, so a second terminal call is
/// unrepresentable.
pub struct Compiler {
    emitter: Box<dyn Emitter>,
    registry: NameRegistry,
    arena: BlockArena,
    layout: UnitLayout,
    groups: Vec<OpenGroup>,
    saved: Vec<FragmentTriple>,
    current: FragmentTriple,
    action_seq: u32,
    tag_seq: u32,
    initial_state_seq: u32,
    adapter_init_seq: u32,
    adapter_exit_seq: u32,
}

impl Compiler {
    pub fn new(target: Target) -> Self {
        Self::with_emitter(target.create_emitter())
    }

    pub fn with_emitter(emitter: Box<dyn Emitter>) -> Self {
        Self {
            emitter,
            registry: NameRegistry::new(),
            arena: BlockArena::new(),
            layout: UnitLayout::default(),
            groups: Vec::new(),
            saved: Vec::new(),
            current: FragmentTriple::default(),
            action_seq: 0,
            tag_seq: 0,
            initial_state_seq: 0,
            adapter_init_seq: 0,
            adapter_exit_seq: 0,
        }
    }

    pub fn begin_unit(&mut self, name: &str, file: &str, line: u32) -> Result<(), CompilerError> {
        verify_unit_name(name, file, line)?;
        self.layout.unit_name = name.to_string();
        Ok(())
    }

    pub fn declare_variables(&mut self, fragment: CodeFragment) {
        self.layout.variables.push(fragment);
    }

    pub fn declare_init_state(&mut self, fragment: CodeFragment) -> Result<(), CompilerError> {
        self.initial_state_seq += 1;
        let name = format!("initial_state{}", self.initial_state_seq);
        self.layout.initial_state_hooks.push(name.clone());
        self.emit_hook(name, self.initial_state_seq, fragment)
    }

    pub fn declare_adapter_init(&mut self, fragment: CodeFragment) -> Result<(), CompilerError> {
        self.adapter_init_seq += 1;
        let name = format!("adapter_init{}", self.adapter_init_seq);
        self.layout.adapter_init_hooks.push(name.clone());
        self.emit_hook(name, self.adapter_init_seq, fragment)
    }

    pub fn declare_adapter_exit(&mut self, fragment: CodeFragment) -> Result<(), CompilerError> {
        self.adapter_exit_seq += 1;
        let name = format!("adapter_exit{}", self.adapter_exit_seq);
        self.layout.adapter_exit_hooks.push(name.clone());
        self.emit_hook(name, self.adapter_exit_seq, fragment)
    }

    fn emit_hook(
        &mut self,
        name: String,
        index: u32,
        fragment: CodeFragment,
    ) -> Result<(), CompilerError> {
        let body = if fragment.is_blank() {
            None
        } else {
            Some(fragment)
        };
        self.emitter.emit_fragment(&Declaration {
            kind: DeclarationKind::Hook,
            name,
            index,
            guard: None,
            body,
            adapter: None,
            requires: Vec::new(),
            advances: None,
        })
    }

    /// Registers an action or tag name. `first` opens a new alias group and
    /// saves the enclosing group's fragments; `first = false` adds an alias
    /// to the group opened by the most recent `first = true`. Returns the
    /// assigned 1-based index.
    pub fn begin_name(
        &mut self,
        name: &str,
        first: bool,
        kind: NameKind,
        file: &str,
        line: u32,
    ) -> Result<u32, CompilerError> {
        verify_decl_name(name, file, line)?;
        if let Some((prev_file, prev_line)) = self.registry.register(name, file, line) {
            // duplicate_check pre-registers at the definition site itself;
            // any other position is a real redefinition.
            if prev_file != file || prev_line != line {
                let context = format!("first defined at {}:{}", prev_file, prev_line);
                return Err(CompilerError::with_context(
                    ERR_DUPLICATE_NAME,
                    &format!("Name '{}' is already defined.", name),
                    file,
                    line,
                    1,
                    Some(context),
                ));
            }
        }

        if first {
            self.saved.push(mem::take(&mut self.current));
            self.groups.push(OpenGroup {
                kind,
                members: Vec::new(),
            });
        }
        match self.groups.last() {
            None => {
                return Err(CompilerError::protocol(
                    "begin_name alias with no open group",
                ))
            }
            Some(group) if group.kind != kind => {
                return Err(CompilerError::protocol(
                    "begin_name alias kind differs from the open group",
                ))
            }
            Some(_) => {}
        }

        let index = match kind {
            NameKind::Action => {
                self.action_seq += 1;
                self.layout.action_names.push(name.to_string());
                self.layout.action_classes.push(ActionClass::of(name));
                self.action_seq
            }
            NameKind::Tag => {
                self.tag_seq += 1;
                self.layout.tag_names.push(name.to_string());
                self.tag_seq
            }
        };
        let (requires, advances) = self.arena.register_member(name);
        if let Some(group) = self.groups.last_mut() {
            group.members.push(GroupMember {
                name: name.to_string(),
                index,
                class: ActionClass::of(name),
                requires,
                advances,
            });
        }
        Ok(index)
    }

    pub fn set_guard(&mut self, fragment: CodeFragment) -> Result<(), CompilerError> {
        self.set_fragment("set_guard", |triple| &mut triple.guard, fragment)
    }

    pub fn set_body(&mut self, fragment: CodeFragment) -> Result<(), CompilerError> {
        self.set_fragment("set_body", |triple| &mut triple.body, fragment)
    }

    pub fn set_adapter(&mut self, fragment: CodeFragment) -> Result<(), CompilerError> {
        self.set_fragment("set_adapter", |triple| &mut triple.adapter, fragment)
    }

    fn set_fragment(
        &mut self,
        what: &str,
        slot: impl FnOnce(&mut FragmentTriple) -> &mut Option<CodeFragment>,
        fragment: CodeFragment,
    ) -> Result<(), CompilerError> {
        if self.groups.is_empty() {
            return Err(CompilerError::protocol(&format!(
                "{} outside an action/tag group",
                what
            )));
        }
        *slot(&mut self.current) = if fragment.is_blank() {
            None
        } else {
            Some(fragment)
        };
        Ok(())
    }

    pub fn end_action_group(&mut self) -> Result<(), CompilerError> {
        self.end_group(NameKind::Action)
    }

    pub fn end_tag_group(&mut self) -> Result<(), CompilerError> {
        self.end_group(NameKind::Tag)
    }

    fn end_group(&mut self, expected: NameKind) -> Result<(), CompilerError> {
        let group = self.groups.pop().ok_or_else(|| {
            CompilerError::protocol("group close with no open action/tag group")
        })?;
        if group.kind != expected {
            return Err(CompilerError::protocol(
                "group close kind differs from the open group",
            ));
        }
        for member in &group.members {
            let kind = match (group.kind, member.class) {
                (NameKind::Tag, _) => DeclarationKind::Tag,
                (NameKind::Action, ActionClass::Input) => DeclarationKind::InputAction,
                (NameKind::Action, ActionClass::Observation) => {
                    DeclarationKind::ObservationAction
                }
            };
            // Tags are observed, never invoked: they have no body and never
            // advance a block cycle.
            let advances = match group.kind {
                NameKind::Action => member.advances.clone(),
                NameKind::Tag => None,
            };
            self.emitter.emit_fragment(&Declaration {
                kind,
                name: member.name.clone(),
                index: member.index,
                guard: self.current.guard.clone(),
                body: match group.kind {
                    NameKind::Action => self.current.body.clone(),
                    NameKind::Tag => None,
                },
                adapter: self.current.adapter.clone(),
                requires: member.requires.clone(),
                advances,
            })?;
        }
        self.current = self.saved.pop().ok_or_else(|| {
            CompilerError::new(
                ERR_MISSING_HANDLER,
                "saved fragment stack underflow on group close",
                "<driver>",
                0,
                0,
            )
        })?;
        Ok(())
    }

    pub fn open_block(&mut self, kind: BlockKind, single: bool) -> Result<(), CompilerError> {
        let seq = self.arena.open_block(kind, single).seq;
        self.emitter
            .record_structural_event(&StructuralEvent::OpenBlock { kind, seq, single })
    }

    pub fn close_block(&mut self) -> Result<(), CompilerError> {
        let block = self.arena.close_block()?;
        self.emitter
            .record_structural_event(&StructuralEvent::CloseBlock { block })
    }

    /// Reports whether `name` is already registered, registering it at
    /// (file, line) when it is not. The first definition position is kept
    /// for diagnostics either way; deciding whether a duplicate is fatal is
    /// the caller's business.
    pub fn duplicate_check(&mut self, name: &str, file: &str, line: u32) -> bool {
        self.registry.register(name, file, line).is_some()
    }

    pub fn position_of(&self, name: &str) -> Option<(&str, u32)> {
        self.registry.position_of(name)
    }

    /// Terminal call: checks stack discipline and hands the accumulated
    /// layout to the backend. Consumes the compiler.
    pub fn finalize(mut self) -> Result<String, CompilerError> {
        if !self.groups.is_empty() {
            return Err(CompilerError::protocol(&format!(
                "finalize with {} unclosed action/tag group(s)",
                self.groups.len()
            )));
        }
        if self.arena.open_depth() > 0 {
            return Err(CompilerError::protocol(&format!(
                "finalize with {} unclosed composition block(s)",
                self.arena.open_depth()
            )));
        }
        debug!(
            unit = %self.layout.unit_name,
            actions = self.layout.action_names.len(),
            tags = self.layout.tag_names.len(),
            blocks = self.arena.blocks().len(),
            "finalizing unit"
        );
        self.emitter.finalize(&self.layout)
    }
}
