// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Line parser and program assembler.
//!
//! Assembly is two linear passes. The first walks source lines, splits each
//! into a mnemonic and an operand field, classifies the operands, and checks
//! the operand count against the instruction table. The second extracts
//! label-defining lines into the label table and rewrites them to `nop`, so
//! the dispatch loop never sees a label mnemonic.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::core::error::{CompileError, ScriptError, ScriptErrorKind};
use crate::core::value::{classify, Value};
use crate::tokenizer::tokenize_operands;

/// One compiled instruction: a mnemonic and its classified operands.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub mnemonic: String,
    pub operands: Vec<Value>,
}

/// A compiled program: the instruction list plus the label table mapping
/// label names (sigil included) to instruction indices.
#[derive(Debug, Clone)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

impl Program {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Render a diagnostic listing of the program and its label table.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (idx, instr) in self.instructions.iter().enumerate() {
            let _ = write!(out, "{idx}: {}", instr.mnemonic);
            for operand in &instr.operands {
                let _ = write!(out, " {operand}<{}>,", operand.kind());
            }
            out.push('\n');
        }
        out.push_str("Label table:\n");
        let mut names: Vec<(&String, &usize)> = self.labels.iter().collect();
        names.sort();
        for (name, idx) in names {
            let _ = writeln!(out, "{name} -> {idx}");
        }
        out
    }
}

/// Assemble source text into a program.
///
/// `arity_of` resolves a mnemonic to its expected operand count, or `None`
/// for an unregistered mnemonic. Errors carry the 1-based source line.
pub(crate) fn assemble<F>(source: &str, arity_of: F) -> Result<Program, CompileError>
where
    F: Fn(&str) -> Option<usize>,
{
    let mut instructions = Vec::new();
    for (idx, raw_line) in source.split('\n').enumerate() {
        let line = raw_line.trim_start_matches([' ', '\t', '\n']);
        parse_line(line, &arity_of, &mut instructions)
            .map_err(|error| CompileError::new(idx as u32 + 1, error))?;
    }
    Ok(extract_labels(instructions))
}

fn parse_line<F>(
    line: &str,
    arity_of: &F,
    out: &mut Vec<Instruction>,
) -> Result<(), ScriptError>
where
    F: Fn(&str) -> Option<usize>,
{
    match line.split_once(' ') {
        None => {
            if let Some(arity) = arity_of(line) {
                check_operand_count(0, arity)?;
                out.push(Instruction {
                    mnemonic: line.to_string(),
                    operands: Vec::new(),
                });
            } else if line.starts_with('@') {
                out.push(Instruction {
                    mnemonic: line.to_string(),
                    operands: Vec::new(),
                });
            } else if !line.is_empty() {
                return Err(ScriptError::new(
                    ScriptErrorKind::Syntax,
                    "Unknown instruction",
                    Some(line),
                ));
            }
        }
        Some((mnemonic, operand_field)) => {
            if let Some(arity) = arity_of(mnemonic) {
                let operands: Vec<Value> = tokenize_operands(operand_field)?
                    .iter()
                    .map(|token| classify(token))
                    .collect();
                check_operand_count(operands.len(), arity)?;
                out.push(Instruction {
                    mnemonic: mnemonic.to_string(),
                    operands,
                });
            } else if mnemonic.starts_with('@') {
                return Err(ScriptError::new(
                    ScriptErrorKind::Syntax,
                    "Expected newline after label definition",
                    None,
                ));
            } else {
                return Err(ScriptError::new(
                    ScriptErrorKind::Syntax,
                    "Unknown instruction",
                    Some(mnemonic),
                ));
            }
        }
    }
    Ok(())
}

fn check_operand_count(given: usize, expected: usize) -> Result<(), ScriptError> {
    if given > expected {
        return Err(ScriptError::new(
            ScriptErrorKind::Syntax,
            &format!("Too many arguments({expected} expected but {given} given)"),
            None,
        ));
    }
    if given < expected {
        return Err(ScriptError::new(
            ScriptErrorKind::Syntax,
            &format!("Too few arguments({expected} expected but {given} given)"),
            None,
        ));
    }
    Ok(())
}

/// Second pass: record label positions and neutralize their lines to `nop`.
/// A redefined label keeps the last position.
fn extract_labels(mut instructions: Vec<Instruction>) -> Program {
    let mut labels = HashMap::new();
    for (idx, instr) in instructions.iter_mut().enumerate() {
        if instr.mnemonic.starts_with('@') {
            let name = std::mem::replace(&mut instr.mnemonic, "nop".to_string());
            labels.insert(name, idx);
        }
    }
    Program {
        instructions,
        labels,
    }
}
