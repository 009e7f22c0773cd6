//! Lua backend: renders the unit as a module table.
//!
//! Structurally equivalent to the Python backend (full composition support);
//! registries live at module level and variable fragments in `M.init()`,
//! the idiom's initializer anchor. Parallel remaining-sets are keyed tables
//! with an explicit pending counter because `#` does not count map entries.

use crate::codegen::{Declaration, DeclarationKind, Emitter, StructuralEvent};
use crate::finalize::{indent_block, quoted_csv, UnitLayout};
use crate::registry::CodeFragment;
use crate::scope::{Block, BlockKind};
use crate::validate::CompilerError;

const IND: &str = "  ";

pub struct LuaEmitter {
    decls: Vec<Declaration>,
    blocks: Vec<Block>,
}

impl LuaEmitter {
    pub fn new() -> Self {
        Self {
            decls: Vec::new(),
            blocks: Vec::new(),
        }
    }

    fn push_fragment(out: &mut String, frag: &CodeFragment, indent: &str) {
        out.push_str(&format!("{}-- {}:{}\n", indent, frag.file, frag.line));
        out.push_str(&indent_block(&frag.code, indent));
        out.push('\n');
    }

    fn push_requires(out: &mut String, decl: &Declaration) {
        for req in &decl.requires {
            out.push_str(&format!(
                "{}if not M.{}(\"{}\") then return false end\n",
                IND, req.guard, req.key
            ));
        }
    }

    fn render_action(out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\nfunction M.action{}guard()\n", decl.index));
        Self::push_requires(out, decl);
        match &decl.guard {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => out.push_str(&format!("{}return true\n", IND)),
        }
        out.push_str("end\n");

        out.push_str(&format!("\nfunction M.action{}body()\n", decl.index));
        if let Some(step) = &decl.advances {
            out.push_str(&format!("{}M.{}(\"{}\")\n", IND, step, decl.name));
        }
        if let Some(frag) = &decl.body {
            Self::push_fragment(out, frag, IND);
        }
        out.push_str("end\n");

        out.push_str(&format!("\nfunction M.action{}adapter()\n", decl.index));
        if let Some(frag) = &decl.adapter {
            Self::push_fragment(out, frag, IND);
        }
        match decl.kind {
            DeclarationKind::ObservationAction => out.push_str(&format!("{}return -1\n", IND)),
            _ => out.push_str(&format!("{}return {}\n", IND, decl.index)),
        }
        out.push_str("end\n");
    }

    fn render_tag(out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\nfunction M.tag{}guard()\n", decl.index));
        Self::push_requires(out, decl);
        match &decl.guard {
            Some(frag) => Self::push_fragment(out, frag, IND),
            None => out.push_str(&format!("{}return true\n", IND)),
        }
        out.push_str("end\n");

        out.push_str(&format!("\nfunction M.tag{}adapter()\n", decl.index));
        if let Some(frag) = &decl.adapter {
            Self::push_fragment(out, frag, IND);
        }
        out.push_str("end\n");
    }

    fn render_hook(out: &mut String, decl: &Declaration) {
        out.push_str(&format!("\nfunction M.{}()\n", decl.name));
        if let Some(frag) = &decl.body {
            Self::push_fragment(out, frag, IND);
        }
        out.push_str("end\n");
    }

    fn render_block_state(out: &mut String, block: &Block) {
        let key = &block.key;
        out.push_str(&format!(
            "{}M.{}_members = {{ {} }}\n",
            IND,
            key,
            quoted_csv(&block.members, '"')
        ));
        match block.kind {
            BlockKind::Serial => {
                out.push_str(&format!("{}M.{}_cursor = 1\n", IND, key));
            }
            BlockKind::Parallel => {
                out.push_str(&format!("{i}M.{k}_remaining = {{}}\n", i = IND, k = key));
                out.push_str(&format!(
                    "{i}for _, name in ipairs(M.{k}_members) do M.{k}_remaining[name] = true end\n",
                    i = IND,
                    k = key
                ));
                out.push_str(&format!(
                    "{i}M.{k}_pending = #M.{k}_members\n",
                    i = IND,
                    k = key
                ));
            }
        }
        out.push_str(&format!("{}M.{}_exhausted = false\n", IND, key));
    }

    fn render_block_routines(out: &mut String, block: &Block) {
        let key = &block.key;
        match block.kind {
            BlockKind::Serial => {
                out.push_str(&format!("\nfunction M.{}(key)\n", block.guard_name()));
                out.push_str(&format!(
                    "{i}if M.{k}_exhausted then return false end\n\
                     {i}if #M.{k}_members == 0 then return false end\n\
                     {i}return M.{k}_members[M.{k}_cursor] == key\n",
                    i = IND,
                    k = key
                ));
                out.push_str("end\n");

                out.push_str(&format!("\nfunction M.{}(key)\n", block.step_name()));
                out.push_str(&format!(
                    "{i}if M.{k}_exhausted then return end\n\
                     {i}M.{k}_cursor = M.{k}_cursor + 1\n\
                     {i}if M.{k}_cursor > #M.{k}_members then\n\
                     {i}{i}M.{k}_cursor = 1\n",
                    i = IND,
                    k = key
                ));
                if block.single {
                    out.push_str(&format!("{i}{i}M.{}_exhausted = true\n", key, i = IND));
                }
                if let Some(parent_step) = &block.parent_step {
                    out.push_str(&format!("{i}{i}M.{}(\"{}\")\n", parent_step, key, i = IND));
                }
                out.push_str(&format!("{}end\nend\n", IND));
            }
            BlockKind::Parallel => {
                out.push_str(&format!("\nfunction M.{}(key)\n", block.guard_name()));
                out.push_str(&format!(
                    "{i}if M.{k}_exhausted then return false end\n\
                     {i}return M.{k}_remaining[key] == true\n",
                    i = IND,
                    k = key
                ));
                out.push_str("end\n");

                out.push_str(&format!("\nfunction M.{}(key)\n", block.step_name()));
                out.push_str(&format!(
                    "{i}if M.{k}_remaining[key] then\n\
                     {i}{i}M.{k}_remaining[key] = nil\n\
                     {i}{i}M.{k}_pending = M.{k}_pending - 1\n\
                     {i}end\n\
                     {i}if M.{k}_pending == 0 then\n",
                    i = IND,
                    k = key
                ));
                if block.single {
                    out.push_str(&format!("{i}{i}M.{}_exhausted = true\n", key, i = IND));
                } else {
                    out.push_str(&format!(
                        "{i}{i}for _, name in ipairs(M.{k}_members) do M.{k}_remaining[name] = true end\n\
                         {i}{i}M.{k}_pending = #M.{k}_members\n",
                        i = IND,
                        k = key
                    ));
                }
                if let Some(parent_step) = &block.parent_step {
                    out.push_str(&format!("{i}{i}M.{}(\"{}\")\n", parent_step, key, i = IND));
                }
                out.push_str(&format!("{}end\nend\n", IND));
            }
        }
    }

    fn render_dispatcher(out: &mut String, routine: &str, hook_list: &str) {
        out.push_str(&format!(
            "\nfunction M.{}()\n\
             {i}for _, name in ipairs(M.{}) do\n\
             {i}{i}local ret = M[name]()\n\
             {i}{i}if ret == false then return ret end\n\
             {i}end\n\
             {i}return true\nend\n",
            routine,
            hook_list,
            i = IND
        ));
    }
}

impl Default for LuaEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for LuaEmitter {
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
            "-- Generated action-model unit: {}\n-- Target idiom: lua\n\nlocal M = {{}}\n\n",
            layout.unit_name
        ));

        out.push_str(&format!(
            "M.action_names = {{ {} }}\n",
            quoted_csv(&layout.action_names, '"')
        ));
        let classes: Vec<String> = layout
            .action_classes
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();
        out.push_str(&format!(
            "M.action_types = {{ {} }}\n",
            quoted_csv(&classes, '"')
        ));
        out.push_str(&format!(
            "M.tag_names = {{ {} }}\n",
            quoted_csv(&layout.tag_names, '"')
        ));
        out.push_str(&format!(
            "M.initial_state_hooks = {{ {} }}\n",
            quoted_csv(&layout.initial_state_hooks, '"')
        ));
        out.push_str(&format!(
            "M.adapter_init_hooks = {{ {} }}\n",
            quoted_csv(&layout.adapter_init_hooks, '"')
        ));
        out.push_str(&format!(
            "M.adapter_exit_hooks = {{ {} }}\n",
            quoted_csv(&layout.adapter_exit_hooks, '"')
        ));

        out.push_str("\nfunction M.init()\n");
        for frag in &layout.variables {
            Self::push_fragment(&mut out, frag, IND);
        }
        for block in &self.blocks {
            Self::render_block_state(&mut out, block);
        }
        out.push_str("end\n");

        for decl in &self.decls {
            match decl.kind {
                DeclarationKind::InputAction | DeclarationKind::ObservationAction => {
                    Self::render_action(&mut out, decl)
                }
                DeclarationKind::Tag => Self::render_tag(&mut out, decl),
                DeclarationKind::Hook => Self::render_hook(&mut out, decl),
            }
        }

        for block in &self.blocks {
            Self::render_block_routines(&mut out, block);
        }

        Self::render_dispatcher(&mut out, "initial_state", "initial_state_hooks");
        Self::render_dispatcher(&mut out, "adapter_init", "adapter_init_hooks");
        Self::render_dispatcher(&mut out, "adapter_exit", "adapter_exit_hooks");

        out.push_str("\nreturn M\n");
        Ok(out)
    }
}
