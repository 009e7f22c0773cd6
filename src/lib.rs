//! # Action-Model Compiler Core (Ground Truth)
//!
//! ## Translation Invariants
//!
//! 1. **Indices**: action and tag indices are separate counters, strictly
//!    increasing from 1, assigned in definition order, never reused.
//!
//! 2. **Stack Discipline**: alias groups and composition blocks close in
//!    exact reverse order of opening. An out-of-order close is a protocol
//!    violation (driver bug), not recoverable data.
//!
//! 3. **Fragment Scoping**: opening an alias group saves the enclosing
//!    (guard, body, adapter) triple; closing restores it. Nested group
//!    fragments never leak outward.
//!
//! 4. **Defaults**: an omitted guard/body/adapter is emitted as the
//!    backend's trivial default (always-true guard, no-op body/adapter),
//!    never left empty.
//!
//! 5. **Composition Semantics**: serial blocks rotate a cursor over their
//!    members in registration order; parallel blocks drain a
//!    remaining-to-fire set per cycle. Both reset on cycle completion unless
//!    `single`, in which case they converge on one permanently-exhausted
//!    terminal state. Inner blocks require their outer block's guard and
//!    advance it on every completed cycle, to arbitrary depth.
//!
//! 6. **Single Use**: one instance per compilation unit; `finalize()`
//!    consumes the instance and produces the entire output text. Text is
//!    never built incrementally during event processing.
//!
//! 7. **Classification**: a leading `o` in an action name marks an
//!    observation; its adapter returns the `-1` sentinel instead of the
//!    action index.

mod codegen;
mod collectors;
mod emit_c;
mod emit_lua;
mod emit_python;
mod finalize;
mod protocol;
mod registry;
mod scope;
mod validate;

#[cfg(test)]
mod rotation_tests;

pub use codegen::{
    Compiler, Declaration, DeclarationKind, Emitter, NameKind, StructuralEvent, Target,
};
pub use finalize::UnitLayout;

// Internal Rust-to-Rust API plus the JSON host boundary for external drivers.
pub use protocol::{
    compile_event_stream, compile_events_json, CompileOptions, CompileResult, Event,
};
pub use registry::{CodeFragment, NameRegistry};
pub use scope::{Block, BlockArena, BlockKind, Requirement};
pub use validate::*;
