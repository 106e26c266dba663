// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error kinds, fatal error wrappers, and runtime warnings.
//!
//! Every failure is fatal to the run that raised it: compile failures carry
//! a 1-based source line, runtime failures carry the instruction index at
//! which the dispatch loop stopped. Warnings never alter control flow; they
//! are recorded on the VM state and optionally streamed to standard output.

use std::fmt;

/// Categories of script errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptErrorKind {
    Syntax,
    Argument,
    Type,
    Math,
    System,
}

impl ScriptErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ScriptErrorKind::Syntax => "Syntax",
            ScriptErrorKind::Argument => "Argument",
            ScriptErrorKind::Type => "Type",
            ScriptErrorKind::Math => "Math",
            ScriptErrorKind::System => "System",
        }
    }
}

/// A script error with a kind and message.
#[derive(Debug, Clone)]
pub struct ScriptError {
    kind: ScriptErrorKind,
    message: String,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
        }
    }

    pub fn kind(&self) -> ScriptErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ERROR: {}", self.kind.label(), self.message)
    }
}

impl std::error::Error for ScriptError {}

/// A fatal error raised while assembling a program.
#[derive(Debug, Clone)]
pub struct CompileError {
    line: u32,
    error: ScriptError,
}

impl CompileError {
    pub fn new(line: u32, error: ScriptError) -> Self {
        Self { line, error }
    }

    /// 1-based source line the failure was raised on.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn error(&self) -> &ScriptError {
        &self.error
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In line {},\n{}", self.line, self.error)
    }
}

impl std::error::Error for CompileError {}

/// A fatal error raised while running a program.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pc: usize,
    error: ScriptError,
}

impl RuntimeError {
    pub fn new(pc: usize, error: ScriptError) -> Self {
        Self { pc, error }
    }

    /// Instruction index at which the dispatch loop stopped.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn error(&self) -> &ScriptError {
        &self.error
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In instruction number {},\n{}", self.pc, self.error)
    }
}

impl std::error::Error for RuntimeError {}

/// A diagnostic emitted during execution without stopping it.
#[derive(Debug, Clone)]
pub struct RuntimeWarning {
    pub pc: usize,
    pub message: String,
}

impl fmt::Display for RuntimeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WARNING:\nIn instruction number {},\n{}", self.pc, self.message)
    }
}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg} {p}"),
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_error_carries_category_label() {
        let err = ScriptError::new(ScriptErrorKind::Type, "Type mismatch", None);
        assert_eq!(err.to_string(), "Type ERROR: Type mismatch");
        assert_eq!(err.kind(), ScriptErrorKind::Type);
    }

    #[test]
    fn format_error_appends_parameter() {
        assert_eq!(format_error("Unknown instruction", Some("frob")), "Unknown instruction frob");
        assert_eq!(format_error("Missing \"", None), "Missing \"");
    }

    #[test]
    fn compile_error_prefixes_one_based_line() {
        let err = CompileError::new(
            3,
            ScriptError::new(ScriptErrorKind::Syntax, "Unknown instruction", Some("frob")),
        );
        assert_eq!(err.to_string(), "In line 3,\nSyntax ERROR: Unknown instruction frob");
    }

    #[test]
    fn runtime_error_prefixes_instruction_index() {
        let err = RuntimeError::new(
            7,
            ScriptError::new(ScriptErrorKind::Math, "Division by zero", None),
        );
        assert_eq!(
            err.to_string(),
            "In instruction number 7,\nMath ERROR: Division by zero"
        );
    }

    #[test]
    fn warning_renders_with_instruction_index() {
        let warning = RuntimeWarning {
            pc: 2,
            message: "Unnecessary cast int->int".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "WARNING:\nIn instruction number 2,\nUnnecessary cast int->int"
        );
    }
}
