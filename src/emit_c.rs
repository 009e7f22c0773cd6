//! C backend: flat declarations only.
//!
//! Known limitation: this backend has no counterpart for serial/parallel
//! composition. Block open/close events are accepted and ignored so the same
//! event stream drives every backend; the generated header records how many
//! blocks were dropped and a warning is logged once per unit. Everything
//! else (declarations, registries, lifecycle dispatch) is fully supported.

use crate::codegen::{Declaration, DeclarationKind, Emitter, StructuralEvent};
use crate::finalize::{indent_block, quoted_csv, UnitLayout};
use crate::registry::CodeFragment;
use crate::validate::{CompilerError, WARN_UNSUPPORTED_COMPOSITION};
use tracing::warn;

const IND: &str = "    ";

pub struct CEmitter {
    decls: Vec<Declaration>,
    ignored_blocks: u32,
}

impl CEmitter {
    pub fn new() -> Self {
        Self {
            decls: Vec::new(),
            ignored_blocks: 0,
        }
    }

    fn push_fragment(out: &mut String, frag: &CodeFragment, indent: &str) {
        out.push_str(&format!("#line {} \"{}\"\n", frag.line, frag.file));
        out.push_str(&indent_block(&frag.code, indent));
        out.push('\n');
    }

    fn render_action(out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\nstatic int action{}_guard(void) {{\n", decl.index));
        match &decl.guard {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => out.push_str(&format!("{}return 1;\n", IND)),
        }
        out.push_str("}\n");

        out.push_str(&format!("\nstatic void action{}_body(void) {{\n", decl.index));
        if let Some(frag) = &decl.body {
            Self::push_fragment(out, frag, IND);
        }
        out.push_str("}\n");

        out.push_str(&format!(
            "\nstatic int action{}_adapter(void) {{\n",
            decl.index
        ));
        if let Some(frag) = &decl.adapter {
            Self::push_fragment(out, frag, IND);
        }
        match decl.kind {
            DeclarationKind::ObservationAction => {
                out.push_str(&format!("{}return -1;\n", IND));
            }
            _ => out.push_str(&format!("{}return {};\n", IND, decl.index)),
        }
        out.push_str("}\n");
    }

    fn render_tag(out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\nstatic int tag{}_guard(void) {{\n", decl.index));
        match &decl.guard {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => out.push_str(&format!("{}return 1;\n", IND)),
        }
        out.push_str("}\n");

        out.push_str(&format!("\nstatic void tag{}_adapter(void) {{\n", decl.index));
        if let Some(frag) = &decl.adapter {
            Self::push_fragment(out, frag, IND);
        }
        out.push_str("}\n");
    }

    fn render_hook(out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\nstatic int {}(void) {{\n", decl.name));
        if let Some(frag) = &decl.body {
            Self::push_fragment(out, frag, IND);
        }
        // Nonzero is the explicit continue sentinel for hooks.
        out.push_str(&format!("{}return 1;\n", IND));
        out.push_str("}\n");
    }

    fn render_dispatcher(out: &mut String, routine: &str, hooks: &[String]) {
        if hooks.is_empty() {
            out.push_str(&format!("\nint {}(void) {{\n{}return 1;\n}}\n", routine, IND));
            return;
        }
        out.push_str(&format!(
            "\nstatic aml_hook_fn {}_hooks[] = {{ {} }};\n",
            routine,
            hooks.join(", ")
        ));
        out.push_str(&format!(
            "\nint {r}(void) {{\n\
             {i}int i;\n\
             {i}for (i = 0; i < {n}; ++i) {{\n\
             {i}{i}int ret = {r}_hooks[i]();\n\
             {i}{i}if (!ret) {{\n\
             {i}{i}{i}return ret;\n\
             {i}{i}}}\n\
             {i}}}\n\
             {i}return 1;\n}}\n",
            r = routine,
            n = hooks.len(),
            i = IND
        ));
    }
}

impl Default for CEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for CEmitter {
    fn record_structural_event(
        &mut self,
        event: &StructuralEvent<'_>,
    ) -> Result<(), CompilerError> {
        if let StructuralEvent::OpenBlock { kind, seq, .. } = event {
            if self.ignored_blocks == 0 {
                warn!(
                    code = WARN_UNSUPPORTED_COMPOSITION,
                    "C backend ignores composition blocks; first ignored: {:?} #{}", kind, seq
                );
            }
            self.ignored_blocks += 1;
        }
        Ok(())
    }

    fn emit_fragment(&mut self, decl: &Declaration) -> Result<(), CompilerError> {
        self.decls.push(decl.clone());
        Ok(())
    }

    fn finalize(&mut self, layout: &UnitLayout) -> Result<String, CompilerError> {
        let mut out = String::new();
        out.push_str(&format!(
            "/* Generated action-model unit: {} */\n/* Target idiom: c (flat declarations) */\n",
            layout.unit_name
        ));
        if self.ignored_blocks > 0 {
            out.push_str(&format!(
                "/* {}: {} composition block(s) ignored by this backend */\n",
                WARN_UNSUPPORTED_COMPOSITION, self.ignored_blocks
            ));
        }
        out.push('\n');
        out.push_str("typedef int (*aml_hook_fn)(void);\n\n");

        for frag in &layout.variables {
            Self::push_fragment(&mut out, frag, "");
        }

        if !layout.action_names.is_empty() {
            out.push_str(&format!(
                "static const char *action_names[] = {{ {} }};\n",
                quoted_csv(&layout.action_names, '"')
            ));
            let classes: Vec<String> = layout
                .action_classes
                .iter()
                .map(|c| c.as_str().to_string())
                .collect();
            out.push_str(&format!(
                "static const char *action_types[] = {{ {} }};\n",
                quoted_csv(&classes, '"')
            ));
        }
        out.push_str(&format!(
            "static const int action_count = {};\n",
            layout.action_names.len()
        ));
        if !layout.tag_names.is_empty() {
            out.push_str(&format!(
                "static const char *tag_names[] = {{ {} }};\n",
                quoted_csv(&layout.tag_names, '"')
            ));
        }
        out.push_str(&format!(
            "static const int tag_count = {};\n",
            layout.tag_names.len()
        ));

        for decl in &self.decls {
            match decl.kind {
                DeclarationKind::InputAction | DeclarationKind::ObservationAction => {
                    Self::render_action(&mut out, decl)
                }
                DeclarationKind::Tag => Self::render_tag(&mut out, decl),
                DeclarationKind::Hook => Self::render_hook(&mut out, decl),
            }
        }

        Self::render_dispatcher(&mut out, "initial_state", &layout.initial_state_hooks);
        Self::render_dispatcher(&mut out, "adapter_init", &layout.adapter_init_hooks);
        Self::render_dispatcher(&mut out, "adapter_exit", &layout.adapter_exit_hooks);

        Ok(out)
    }
}
