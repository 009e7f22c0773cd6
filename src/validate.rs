use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_DUPLICATE_NAME: &str = "AML-ERR-DUP-001";
pub const ERR_PROTOCOL_VIOLATION: &str = "AML-ERR-PROTO-001";
pub const ERR_MISSING_HANDLER: &str = "AML-ERR-STACK-001";
pub const ERR_INVALID_NAME: &str = "AML-ERR-NAME-001";
pub const ERR_INVALID_EVENT: &str = "AML-ERR-WIRE-001";
pub const WARN_UNSUPPORTED_COMPOSITION: &str = "AML-WARN-COMP-001";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_DUPLICATE_NAME => "Every action and tag name is defined exactly once per unit.",
        ERR_PROTOCOL_VIOLATION => {
            "Groups and composition blocks close in exact reverse order of opening."
        }
        ERR_MISSING_HANDLER => "Saved fragment state is popped only with a matching open group.",
        ERR_INVALID_NAME => "Unit, action and tag names are well-formed identifiers.",
        ERR_INVALID_EVENT => "The event stream is a well-formed wire-protocol sequence.",
        WARN_UNSUPPORTED_COMPOSITION => {
            "The flat backend emits every declaration it receives; composition is ignored."
        }
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_context(code, message, file, line, column, None)
    }

    pub fn with_context(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
    ) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
        }
    }

    /// Protocol violations are driver bugs, not data problems; they usually
    /// carry no useful source position.
    pub fn protocol(message: &str) -> Self {
        Self::new(ERR_PROTOCOL_VIOLATION, message, "<driver>", 0, 0)
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}:{}:{})",
            self.code, self.message, self.file, self.line, self.column
        )?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  {}", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilerError {}

// ═══════════════════════════════════════════════════════════════════════════════
// NAME VALIDATION & CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref UNIT_NAME_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref DECL_NAME_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_:.\-]*$").unwrap();
}

/// Classification of an action by its naming convention: a leading `o` marks
/// an observation (never reports itself as performed), everything else is an
/// input action (its adapter reports the action index on success).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionClass {
    Input,
    Observation,
}

impl ActionClass {
    pub fn of(name: &str) -> Self {
        if name.starts_with('o') {
            ActionClass::Observation
        } else {
            ActionClass::Input
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionClass::Input => "input",
            ActionClass::Observation => "observation",
        }
    }
}

pub fn verify_unit_name(name: &str, file: &str, line: u32) -> Result<(), CompilerError> {
    if UNIT_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(CompilerError::new(
            ERR_INVALID_NAME,
            &format!("Unit name '{}' is not a valid identifier.", name),
            file,
            line,
            1,
        ))
    }
}

pub fn verify_decl_name(name: &str, file: &str, line: u32) -> Result<(), CompilerError> {
    if DECL_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(CompilerError::new(
            ERR_INVALID_NAME,
            &format!("Action/tag name '{}' is not a valid identifier.", name),
            file,
            line,
            1,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_prefix() {
        assert_eq!(ActionClass::of("iCreate"), ActionClass::Input);
        assert_eq!(ActionClass::of("oVerifyScreen"), ActionClass::Observation);
        // No leading convention marker still counts as input.
        assert_eq!(ActionClass::of("reset"), ActionClass::Input);
    }

    #[test]
    fn test_unit_name_rules() {
        assert!(verify_unit_name("LoginModel", "m.aml", 1).is_ok());
        assert!(verify_unit_name("_internal2", "m.aml", 1).is_ok());
        assert!(verify_unit_name("2fast", "m.aml", 1).is_err());
        assert!(verify_unit_name("has space", "m.aml", 1).is_err());
        assert!(verify_unit_name("", "m.aml", 1).is_err());
    }

    #[test]
    fn test_decl_name_rules() {
        assert!(verify_decl_name("iCreate", "m.aml", 3).is_ok());
        assert!(verify_decl_name("oMenu:open", "m.aml", 3).is_ok());
        assert!(verify_decl_name("", "m.aml", 3).is_err());
        assert!(verify_decl_name("i name", "m.aml", 3).is_err());
    }

    #[test]
    fn test_error_carries_guarantee() {
        let err = CompilerError::new(ERR_DUPLICATE_NAME, "dup", "m.aml", 7, 1);
        assert!(err.guarantee.contains("exactly once"));
        assert!(format!("{}", err).contains("m.aml:7:1"));
    }
}
