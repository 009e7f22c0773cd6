//! Trivial collector backends: instead of producing executable declarations
//! they enumerate the declared action or tag names, one per line, under the
//! same event interface as the real emitters.

use crate::codegen::{Declaration, DeclarationKind, Emitter, NameKind, StructuralEvent};
use crate::finalize::UnitLayout;
use crate::validate::CompilerError;

pub struct NameCollector {
    kind: NameKind,
    names: Vec<String>,
}

impl NameCollector {
    pub fn new(kind: NameKind) -> Self {
        Self {
            kind,
            names: Vec::new(),
        }
    }
}

impl Emitter for NameCollector {
    fn record_structural_event(
        &mut self,
        _event: &StructuralEvent<'_>,
    ) -> Result<(), CompilerError> {
        Ok(())
    }

    fn emit_fragment(&mut self, decl: &Declaration) -> Result<(), CompilerError> {
        let matches = match (self.kind, decl.kind) {
            (NameKind::Action, DeclarationKind::InputAction)
            | (NameKind::Action, DeclarationKind::ObservationAction)
            | (NameKind::Tag, DeclarationKind::Tag) => true,
            _ => false,
        };
        if matches {
            self.names.push(decl.name.clone());
        }
        Ok(())
    }

    fn finalize(&mut self, _layout: &UnitLayout) -> Result<String, CompilerError> {
        let mut out = self.names.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{Compiler, NameKind, Target};

    #[test]
    fn test_action_collector_lists_names_in_order() {
        let mut c = Compiler::new(Target::ActionNames);
        c.begin_name("iCreate", true, NameKind::Action, "m.aml", 1)
            .unwrap();
        c.end_action_group().unwrap();
        c.begin_name("oVerify", true, NameKind::Action, "m.aml", 2)
            .unwrap();
        c.end_action_group().unwrap();
        c.begin_name("tReady", true, NameKind::Tag, "m.aml", 3)
            .unwrap();
        c.end_tag_group().unwrap();
        assert_eq!(c.finalize().unwrap(), "iCreate\noVerify\n");
    }

    #[test]
    fn test_tag_collector_ignores_actions() {
        let mut c = Compiler::new(Target::TagNames);
        c.begin_name("iCreate", true, NameKind::Action, "m.aml", 1)
            .unwrap();
        c.end_action_group().unwrap();
        c.begin_name("tReady", true, NameKind::Tag, "m.aml", 2)
            .unwrap();
        c.end_tag_group().unwrap();
        assert_eq!(c.finalize().unwrap(), "tReady\n");
    }
}
