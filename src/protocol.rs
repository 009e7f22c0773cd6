//! Wire protocol between the grammar-directed parser and the codegen core.
//!
//! The ordered event sequence *is* the protocol: this module materializes it
//! as a serde enum so an out-of-process driver can deliver the stream as
//! JSON, and provides the internal Rust-to-Rust driver entry points.

use crate::codegen::{Compiler, NameKind, Target};
use crate::registry::CodeFragment;
use crate::scope::BlockKind;
use crate::validate::{CompilerError, ERR_INVALID_EVENT};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    BeginUnit {
        name: String,
        file: String,
        line: u32,
    },
    DeclareVariables {
        fragment: CodeFragment,
    },
    DeclareInitState {
        fragment: CodeFragment,
    },
    DeclareAdapterInit {
        fragment: CodeFragment,
    },
    DeclareAdapterExit {
        fragment: CodeFragment,
    },
    BeginName {
        name: String,
        first: bool,
        kind: NameKind,
        file: String,
        line: u32,
    },
    SetGuard {
        fragment: CodeFragment,
    },
    SetBody {
        fragment: CodeFragment,
    },
    SetAdapter {
        fragment: CodeFragment,
    },
    EndActionGroup,
    EndTagGroup,
    OpenBlock {
        kind: BlockKind,
        #[serde(default)]
        single: bool,
    },
    CloseBlock,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS / RESULT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub target: Target,
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub output: String,
    pub errors: Vec<CompilerError>,
    pub has_errors: bool,
}

impl CompileResult {
    fn failure(error: CompilerError) -> Self {
        Self {
            output: String::new(),
            errors: vec![error],
            has_errors: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DRIVERS
// ═══════════════════════════════════════════════════════════════════════════════

fn apply_event(compiler: &mut Compiler, event: Event) -> Result<(), CompilerError> {
    match event {
        Event::BeginUnit { name, file, line } => compiler.begin_unit(&name, &file, line),
        Event::DeclareVariables { fragment } => {
            compiler.declare_variables(fragment);
            Ok(())
        }
        Event::DeclareInitState { fragment } => compiler.declare_init_state(fragment),
        Event::DeclareAdapterInit { fragment } => compiler.declare_adapter_init(fragment),
        Event::DeclareAdapterExit { fragment } => compiler.declare_adapter_exit(fragment),
        Event::BeginName {
            name,
            first,
            kind,
            file,
            line,
        } => compiler.begin_name(&name, first, kind, &file, line).map(|_| ()),
        Event::SetGuard { fragment } => compiler.set_guard(fragment),
        Event::SetBody { fragment } => compiler.set_body(fragment),
        Event::SetAdapter { fragment } => compiler.set_adapter(fragment),
        Event::EndActionGroup => compiler.end_action_group(),
        Event::EndTagGroup => compiler.end_tag_group(),
        Event::OpenBlock { kind, single } => compiler.open_block(kind, single),
        Event::CloseBlock => compiler.close_block(),
    }
}

/// Runs one complete event sequence through a fresh compiler. Every error is
/// fatal for the unit; the failed result carries the diagnostic with the
/// offending input position.
pub fn compile_event_stream(options: &CompileOptions, events: Vec<Event>) -> CompileResult {
    let mut compiler = Compiler::new(options.target);
    for event in events {
        if let Err(error) = apply_event(&mut compiler, event) {
            return CompileResult::failure(error);
        }
    }
    match compiler.finalize() {
        Ok(output) => CompileResult {
            output,
            errors: Vec::new(),
            has_errors: false,
        },
        Err(error) => CompileResult::failure(error),
    }
}

/// JSON host boundary: the event stream as a JSON array.
pub fn compile_events_json(options: &CompileOptions, events_json: &str) -> CompileResult {
    match serde_json::from_str::<Vec<Event>>(events_json) {
        Ok(events) => compile_event_stream(options, events),
        Err(e) => CompileResult::failure(CompilerError::new(
            ERR_INVALID_EVENT,
            &format!("Invalid event stream: {}", e),
            &options.file_path,
            0,
            0,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_event_stream_compiles() {
        let events = r#"[
            { "event": "beginUnit", "name": "WireModel", "file": "m.aml", "line": 1 },
            { "event": "beginName", "name": "iGo", "first": true, "kind": "action", "file": "m.aml", "line": 2 },
            { "event": "setGuard", "fragment": { "code": "return self.ready", "file": "m.aml", "line": 3 } },
            { "event": "endActionGroup" }
        ]"#;
        let options = CompileOptions {
            target: Target::Python,
            file_path: "m.aml".to_string(),
        };
        let result = compile_events_json(&options, events);
        assert!(!result.has_errors, "{:?}", result.errors);
        assert!(result.output.contains("class WireModel:"));
        assert!(result.output.contains("def action1guard(self):"));
        assert!(result.output.contains("return self.ready"));
    }

    #[test]
    fn test_malformed_stream_is_reported() {
        let options = CompileOptions {
            target: Target::Python,
            file_path: "m.aml".to_string(),
        };
        let result = compile_events_json(&options, "[ { \"event\": \"noSuchEvent\" } ]");
        assert!(result.has_errors);
        assert_eq!(result.errors[0].code, ERR_INVALID_EVENT);
    }

    #[test]
    fn test_protocol_violation_aborts_run() {
        let options = CompileOptions {
            target: Target::Lua,
            file_path: "m.aml".to_string(),
        };
        let result = compile_event_stream(&options, vec![Event::CloseBlock]);
        assert!(result.has_errors);
        assert_eq!(
            result.errors[0].code,
            crate::validate::ERR_PROTOCOL_VIOLATION
        );
        assert!(result.output.is_empty());
    }
}
