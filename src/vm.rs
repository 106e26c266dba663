// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! VM state, instruction table, argument resolution, and the dispatch loop.
//!
//! A [`ScriptVm`] owns two things: the instruction table (mnemonic →
//! handler + arity) and the mutable [`VmState`] handlers operate on. The
//! table is consulted by the assembler for arity checks and by the dispatch
//! loop for handler lookup; handlers receive the state handle explicitly
//! rather than capturing the VM.
//!
//! A single VM is strictly single-threaded. Hosts that want parallel
//! execution construct independent VMs; variables persist across `run`
//! calls on the same VM, the label table is rebound by each `run`.

use std::collections::HashMap;

use crate::compiler::{self, Program};
use crate::core::error::{
    CompileError, RuntimeError, RuntimeWarning, ScriptError, ScriptErrorKind,
};
use crate::core::value::{classify, KindMask, Scalar, Value};

mod builtins;

/// An instruction handler. Arity is enforced at assembly time, so a handler
/// may index its operand slice directly.
pub type Handler = Box<dyn Fn(&mut VmState, &[Value]) -> Result<(), ScriptError>>;

struct InstructionDesc {
    handler: Handler,
    arity: usize,
}

/// Mutable execution state shared by every handler invocation.
pub struct VmState {
    pc: usize,
    labels: HashMap<String, usize>,
    variables: HashMap<String, Value>,
    print_warnings: bool,
    warnings: Vec<RuntimeWarning>,
}

impl VmState {
    fn new() -> Self {
        Self {
            pc: 0,
            labels: HashMap::new(),
            variables: HashMap::new(),
            print_warnings: true,
            warnings: Vec::new(),
        }
    }

    /// Current instruction index.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Resolve an operand against a kind mask.
    ///
    /// An unresolved symbol is chased through the variable table first; the
    /// returned value is never `Undet` and its kind always satisfies the
    /// mask.
    pub fn resolve(&self, arg: &Value, mask: KindMask) -> Result<Value, ScriptError> {
        if let Value::Undet(symbol) = arg {
            let bound = self.variables.get(symbol).ok_or_else(|| {
                ScriptError::new(ScriptErrorKind::Argument, "Unbound symbol", Some(symbol))
            })?;
            return self.resolve(bound, mask);
        }
        if !mask.contains(arg.kind()) {
            return Err(ScriptError::new(
                ScriptErrorKind::Type,
                "Type mismatch",
                None,
            ));
        }
        Ok(arg.clone())
    }

    /// Extract a destination symbol name from an operand, with no
    /// indirection. Anything other than an unresolved symbol is rejected.
    pub fn bare_symbol<'a>(&self, arg: &'a Value) -> Result<&'a str, ScriptError> {
        match arg {
            Value::Undet(name) => Ok(name),
            _ => Err(ScriptError::new(
                ScriptErrorKind::Type,
                "Type mismatch",
                None,
            )),
        }
    }

    /// Bind a variable. A bound name only rebinds to the same kind; a fresh
    /// name must itself classify as a symbol, not a literal.
    pub fn assign(&mut self, name: &str, value: impl Into<Scalar>) -> Result<(), ScriptError> {
        let value = value.into().into_value();
        match self.variables.get(name) {
            Some(bound) => {
                if bound.kind() != value.kind() {
                    return Err(ScriptError::new(
                        ScriptErrorKind::Type,
                        "Type mismatch",
                        None,
                    ));
                }
            }
            None => {
                if !matches!(classify(name), Value::Undet(_)) {
                    return Err(ScriptError::new(
                        ScriptErrorKind::Type,
                        "Invalid symbol name",
                        Some(name),
                    ));
                }
            }
        }
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Look up a bound variable.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Instruction index of a label in the running program.
    pub fn label_index(&self, label: &str) -> Result<usize, ScriptError> {
        self.labels.get(label).copied().ok_or_else(|| {
            ScriptError::new(ScriptErrorKind::Argument, "Unset label", Some(label))
        })
    }

    /// Jump to a label. The dispatch loop still advances the program
    /// counter after the handler returns, so execution continues at the
    /// instruction following the label's placeholder.
    pub fn jump_to(&mut self, label: &str) -> Result<(), ScriptError> {
        self.pc = self.label_index(label)?;
        Ok(())
    }

    /// Record a warning and stream it to standard output unless suppressed.
    pub fn warn(&mut self, message: &str) {
        let warning = RuntimeWarning {
            pc: self.pc,
            message: message.to_string(),
        };
        if self.print_warnings {
            println!("{warning}");
        }
        self.warnings.push(warning);
    }

    pub fn set_print_warnings(&mut self, enabled: bool) {
        self.print_warnings = enabled;
    }

    /// Warnings recorded so far, across runs.
    pub fn warnings(&self) -> &[RuntimeWarning] {
        &self.warnings
    }
}

/// A script VM: instruction table plus execution state.
pub struct ScriptVm {
    table: HashMap<String, InstructionDesc>,
    state: VmState,
}

impl ScriptVm {
    /// Create a VM with the built-in instruction set registered.
    pub fn new() -> Self {
        let mut vm = Self {
            table: HashMap::new(),
            state: VmState::new(),
        };
        builtins::register_builtins(&mut vm);
        vm
    }

    /// Register a handler under a mnemonic. Host handlers and built-ins
    /// live in the same table and dispatch identically; registering an
    /// existing mnemonic replaces it.
    pub fn register_handler(
        &mut self,
        mnemonic: &str,
        arity: usize,
        handler: impl Fn(&mut VmState, &[Value]) -> Result<(), ScriptError> + 'static,
    ) {
        self.table.insert(
            mnemonic.to_string(),
            InstructionDesc {
                handler: Box::new(handler),
                arity,
            },
        );
    }

    /// Compile source text against the current instruction table.
    pub fn compile(&self, source: &str) -> Result<Program, CompileError> {
        compiler::assemble(source, |mnemonic| {
            self.table.get(mnemonic).map(|desc| desc.arity)
        })
    }

    /// Run a compiled program to completion.
    ///
    /// The program's label table is bound into the VM state for the
    /// duration of the run; variables persist from previous runs.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.state.pc = 0;
        self.state.labels = program.labels().clone();

        while self.state.pc < program.instructions().len() {
            let instr = &program.instructions()[self.state.pc];
            let desc = self.table.get(instr.mnemonic.as_str()).ok_or_else(|| {
                RuntimeError::new(
                    self.state.pc,
                    ScriptError::new(
                        ScriptErrorKind::System,
                        "No handler registered for",
                        Some(&instr.mnemonic),
                    ),
                )
            })?;
            (desc.handler)(&mut self.state, &instr.operands)
                .map_err(|error| RuntimeError::new(self.state.pc, error))?;
            self.state.pc += 1;
        }
        Ok(())
    }

    pub fn state(&self) -> &VmState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut VmState {
        &mut self.state
    }
}

impl Default for ScriptVm {
    fn default() -> Self {
        Self::new()
    }
}
