//! Python backend: renders the unit as a loadable Python class.
//!
//! Full composition support: serial/parallel synthetic guard/step routines
//! are emitted as methods and their cursor/remaining bookkeeping as instance
//! state in `__init__`, which is also the anchor point for the relocated
//! side-collections.

use crate::codegen::{Declaration, DeclarationKind, Emitter, StructuralEvent};
use crate::finalize::{indent_block, quoted_csv, UnitLayout};
use crate::registry::CodeFragment;
use crate::scope::{Block, BlockKind};
use crate::validate::CompilerError;

const IND: &str = "        ";

pub struct PythonEmitter {
    decls: Vec<Declaration>,
    blocks: Vec<Block>,
}

impl PythonEmitter {
    pub fn new() -> Self {
        Self {
            decls: Vec::new(),
            blocks: Vec::new(),
        }
    }

    fn push_fragment(out: &mut String, frag: &CodeFragment, indent: &str) {
        out.push_str(&format!("{}# {}:{}\n", indent, frag.file, frag.line));
        out.push_str(&indent_block(&frag.code, indent));
        out.push('\n');
    }

    fn push_requires(out: &mut String, decl: &Declaration) {
        for req in &decl.requires {
            out.push_str(&format!(
                "{}if not self.{}('{}'):\n{}    return False\n",
                IND, req.guard, req.key, IND
            ));
        }
    }

    fn render_action(&self, out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\n    def action{}guard(self):\n", decl.index));
        Self::push_requires(out, decl);
        match &decl.guard {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => out.push_str(&format!("{}return True\n", IND)),
        }

        out.push_str(&format!("\n    def action{}body(self):\n", decl.index));
        if let Some(step) = &decl.advances {
            out.push_str(&format!("{}self.{}('{}')\n", IND, step, decl.name));
        }
        match &decl.body {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => {
                if decl.advances.is_none() {
                    out.push_str(&format!("{}pass\n", IND));
                }
            }
        }

        out.push_str(&format!("\n    def action{}adapter(self):\n", decl.index));
        if let Some(frag) = &decl.adapter {
            Self::push_fragment(out, frag, IND);
        }
        match decl.kind {
            DeclarationKind::ObservationAction => {
                // Observations never report themselves as performed.
                out.push_str(&format!("{}return -1\n", IND));
            }
            _ => out.push_str(&format!("{}return {}\n", IND, decl.index)),
        }
    }

    fn render_tag(&self, out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\n    def tag{}guard(self):\n", decl.index));
        Self::push_requires(out, decl);
        match &decl.guard {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => out.push_str(&format!("{}return True\n", IND)),
        }

        out.push_str(&format!("\n    def tag{}adapter(self):\n", decl.index));
        match &decl.adapter {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => out.push_str(&format!("{}pass\n", IND)),
        }
    }

    fn render_hook(&self, out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\n    def {}(self):\n", decl.name));
        match &decl.body {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => out.push_str(&format!("{}pass\n", IND)),
        }
    }

    fn render_block_state(out: &mut String, block: &Block) {
        let members = quoted_csv(&block.members, '\'');
        match block.kind {
            BlockKind::Serial => {
                out.push_str(&format!("{}self.{}_members = [{}]\n", IND, block.key, members));
                out.push_str(&format!("{}self.{}_cursor = 0\n", IND, block.key));
                out.push_str(&format!("{}self.{}_exhausted = False\n", IND, block.key));
            }
            BlockKind::Parallel => {
                out.push_str(&format!("{}self.{}_members = [{}]\n", IND, block.key, members));
                out.push_str(&format!(
                    "{}self.{}_remaining = list(self.{}_members)\n",
                    IND, block.key, block.key
                ));
                out.push_str(&format!("{}self.{}_exhausted = False\n", IND, block.key));
            }
        }
    }

    fn render_block_routines(out: &mut String, block: &Block) {
        let key = &block.key;
        match block.kind {
            BlockKind::Serial => {
                out.push_str(&format!("\n    def {}(self, key):\n", block.guard_name()));
                out.push_str(&format!(
                    "{i}if self.{k}_exhausted:\n{i}    return False\n\
                     {i}if not self.{k}_members:\n{i}    return False\n\
                     {i}return self.{k}_members[self.{k}_cursor] == key\n",
                    i = IND,
                    k = key
                ));

                out.push_str(&format!("\n    def {}(self, key):\n", block.step_name()));
                out.push_str(&format!(
                    "{i}if self.{k}_exhausted:\n{i}    return\n\
                     {i}self.{k}_cursor += 1\n\
                     {i}if self.{k}_cursor >= len(self.{k}_members):\n\
                     {i}    self.{k}_cursor = 0\n",
                    i = IND,
                    k = key
                ));
                if block.single {
                    out.push_str(&format!("{}    self.{}_exhausted = True\n", IND, key));
                }
                if let Some(parent_step) = &block.parent_step {
                    out.push_str(&format!("{}    self.{}('{}')\n", IND, parent_step, key));
                }
            }
            BlockKind::Parallel => {
                out.push_str(&format!("\n    def {}(self, key):\n", block.guard_name()));
                out.push_str(&format!(
                    "{i}if self.{k}_exhausted:\n{i}    return False\n\
                     {i}return key in self.{k}_remaining\n",
                    i = IND,
                    k = key
                ));

                out.push_str(&format!("\n    def {}(self, key):\n", block.step_name()));
                out.push_str(&format!(
                    "{i}if key in self.{k}_remaining:\n\
                     {i}    self.{k}_remaining.remove(key)\n\
                     {i}if not self.{k}_remaining:\n",
                    i = IND,
                    k = key
                ));
                if block.single {
                    out.push_str(&format!("{}    self.{}_exhausted = True\n", IND, key));
                } else {
                    out.push_str(&format!(
                        "{}    self.{}_remaining = list(self.{}_members)\n",
                        IND, key, key
                    ));
                }
                if let Some(parent_step) = &block.parent_step {
                    out.push_str(&format!("{}    self.{}('{}')\n", IND, parent_step, key));
                }
            }
        }
    }

    fn render_dispatcher(out: &mut String, routine: &str, hook_list: &str) {
        out.push_str(&format!(
            "\n    def {}(self):\n\
             {i}for name in self.{}:\n\
             {i}    ret = getattr(self, name)()\n\
             {i}    if not ret and ret is not None:\n\
             {i}        return ret\n\
             {i}return True\n",
            routine,
            hook_list,
            i = IND
        ));
    }
}

impl Default for PythonEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for PythonEmitter {
    fn record_structural_event(
        &mut self,
        event: &StructuralEvent<'_>,
    ) -> Result<(), CompilerError> {
        if let StructuralEvent::CloseBlock { block } = event {
            // Member lists are final at close; snapshot for emission.
            self.blocks.push((*block).clone());
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
            "# Generated action-model unit: {}\n# Target idiom: python\n\n",
            layout.unit_name
        ));
        out.push_str(&format!("class {}:\n", layout.unit_name));

        // Initializer: relocated side-collections, then composition state.
        out.push_str("    def __init__(self):\n");
        for frag in &layout.variables {
            Self::push_fragment(&mut out, frag, IND);
        }
        out.push_str(&format!(
            "{}self.action_names = [{}]\n",
            IND,
            quoted_csv(&layout.action_names, '\'')
        ));
        let classes: Vec<String> = layout
            .action_classes
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();
        out.push_str(&format!(
            "{}self.action_types = [{}]\n",
            IND,
            quoted_csv(&classes, '\'')
        ));
        out.push_str(&format!(
            "{}self.tag_names = [{}]\n",
            IND,
            quoted_csv(&layout.tag_names, '\'')
        ));
        out.push_str(&format!(
            "{}self.initial_state_hooks = [{}]\n",
            IND,
            quoted_csv(&layout.initial_state_hooks, '\'')
        ));
        out.push_str(&format!(
            "{}self.adapter_init_hooks = [{}]\n",
            IND,
            quoted_csv(&layout.adapter_init_hooks, '\'')
        ));
        out.push_str(&format!(
            "{}self.adapter_exit_hooks = [{}]\n",
            IND,
            quoted_csv(&layout.adapter_exit_hooks, '\'')
        ));
        for block in &self.blocks {
            Self::render_block_state(&mut out, block);
        }

        for decl in &self.decls {
            match decl.kind {
                DeclarationKind::InputAction | DeclarationKind::ObservationAction => {
                    self.render_action(&mut out, decl)
                }
                DeclarationKind::Tag => self.render_tag(&mut out, decl),
                DeclarationKind::Hook => self.render_hook(&mut out, decl),
            }
        }

        for block in &self.blocks {
            Self::render_block_routines(&mut out, block);
        }

        Self::render_dispatcher(&mut out, "initial_state", "initial_state_hooks");
        Self::render_dispatcher(&mut out, "adapter_init", "adapter_init_hooks");
        Self::render_dispatcher(&mut out, "adapter_exit", "adapter_exit_hooks");

        Ok(out)
    }
}
