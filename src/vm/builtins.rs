// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Built-in instruction set.
//!
//! Operand conventions follow the surface language: arithmetic, comparison,
//! boolean, and concatenation instructions take the destination symbol
//! last; cast instructions (`int`, `float`, `bool`, `str`) take it first.

use super::{ScriptVm, VmState};
use crate::core::error::{ScriptError, ScriptErrorKind};
use crate::core::value::{Kind, KindMask, Scalar, Value};

pub(super) fn register_builtins(vm: &mut ScriptVm) {
    vm.register_handler("nop", 0, |_, _| Ok(()));
    vm.register_handler("let", 2, inst_let);

    vm.register_handler("add", 3, |state, args| numeric_op(state, args, NumericOp::Add));
    vm.register_handler("sub", 3, |state, args| numeric_op(state, args, NumericOp::Sub));
    vm.register_handler("mul", 3, |state, args| numeric_op(state, args, NumericOp::Mul));
    vm.register_handler("div", 3, |state, args| numeric_op(state, args, NumericOp::Div));
    vm.register_handler("div_r", 3, |state, args| {
        numeric_op(state, args, NumericOp::DivTrue)
    });
    vm.register_handler("mod", 3, |state, args| numeric_op(state, args, NumericOp::Mod));
    vm.register_handler("pow", 3, |state, args| numeric_op(state, args, NumericOp::Pow));

    vm.register_handler("cmp", 4, inst_cmp);

    vm.register_handler("and", 3, |state, args| bool_op(state, args, BoolOp::And));
    vm.register_handler("or", 3, |state, args| bool_op(state, args, BoolOp::Or));
    vm.register_handler("xor", 3, |state, args| bool_op(state, args, BoolOp::Xor));
    vm.register_handler("not", 2, inst_not);

    vm.register_handler("int", 2, inst_int);
    vm.register_handler("float", 2, inst_float);
    vm.register_handler("bool", 2, inst_bool);
    vm.register_handler("str", 2, inst_str);
    vm.register_handler("cat", 3, inst_cat);

    vm.register_handler("goto", 1, inst_goto);
    vm.register_handler("when", 2, inst_when);

    vm.register_handler("dump", 0, inst_dump);
}

fn diverged() -> ScriptError {
    ScriptError::new(
        ScriptErrorKind::System,
        "Operand kinds diverged after resolution",
        None,
    )
}

fn inst_let(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let name = state.bare_symbol(&args[0])?;
    let value = state.resolve(&args[1], KindMask::ANY)?;
    state.assign(name, Scalar::from_resolved(value))
}

#[derive(Clone, Copy)]
enum NumericOp {
    Add,
    Sub,
    Mul,
    /// Floor division; stays INT for INT inputs.
    Div,
    /// True division; always produces FLOAT.
    DivTrue,
    /// Remainder computed through i64 conversion, even for floats.
    Mod,
    Pow,
}

fn numeric_op(state: &mut VmState, args: &[Value], op: NumericOp) -> Result<(), ScriptError> {
    let a = state.resolve(&args[0], KindMask::NUMERIC)?;
    let b = state.resolve(&args[1], a.kind().mask())?;
    let (a_val, b_val) = match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => (*x as f64, *y as f64),
        (Value::Float(x), Value::Float(y)) => (*x, *y),
        _ => return Err(diverged()),
    };

    let mut true_division = false;
    let result = match op {
        NumericOp::Add => a_val + b_val,
        NumericOp::Sub => a_val - b_val,
        NumericOp::Mul => a_val * b_val,
        NumericOp::Div => {
            check_divisor(b_val)?;
            (a_val / b_val).floor()
        }
        NumericOp::DivTrue => {
            check_divisor(b_val)?;
            true_division = true;
            a_val / b_val
        }
        NumericOp::Mod => {
            check_divisor(b_val)?;
            ((a_val as i64) % (b_val as i64)) as f64
        }
        NumericOp::Pow => a_val.powf(b_val),
    };

    let name = state.bare_symbol(&args[2])?;
    if a.kind() == Kind::Int && !true_division {
        state.assign(name, result as i64)
    } else {
        state.assign(name, result)
    }
}

fn check_divisor(value: f64) -> Result<(), ScriptError> {
    if value == 0.0 {
        return Err(ScriptError::new(
            ScriptErrorKind::Math,
            "Division by zero",
            None,
        ));
    }
    Ok(())
}

fn compare<T: PartialOrd>(op: &str, left: &T, right: &T) -> Result<bool, ScriptError> {
    let outcome = match op {
        ">" => left > right,
        ">=" => left >= right,
        "==" => left == right,
        "<=" => left <= right,
        "<" => left < right,
        "!=" => left != right,
        _ => {
            return Err(ScriptError::new(
                ScriptErrorKind::Argument,
                "Unknown operator",
                Some(op),
            ))
        }
    };
    Ok(outcome)
}

fn inst_cmp(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let a = state.resolve(
        &args[0],
        KindMask::ANY.without(Kind::Bool).without(Kind::Label),
    )?;
    let op = state.resolve(&args[1], KindMask::STR)?;
    let c = state.resolve(&args[2], a.kind().mask())?;
    let Value::Str(op) = op else {
        return Err(diverged());
    };

    let outcome = if let (Value::Str(left), Value::Str(right)) = (&a, &c) {
        compare(&op, left, right)?
    } else {
        let (left, right) = match (&a, &c) {
            (Value::Int(x), Value::Int(y)) => (*x as f64, *y as f64),
            (Value::Float(x), Value::Float(y)) => (*x, *y),
            _ => return Err(diverged()),
        };
        compare(&op, &left, &right)?
    };

    let name = state.bare_symbol(&args[3])?;
    state.assign(name, outcome)
}

#[derive(Clone, Copy)]
enum BoolOp {
    And,
    Or,
    Xor,
}

fn bool_op(state: &mut VmState, args: &[Value], op: BoolOp) -> Result<(), ScriptError> {
    let a = state.resolve(&args[0], KindMask::BOOL)?;
    let b = state.resolve(&args[1], KindMask::BOOL)?;
    let (Value::Bool(a), Value::Bool(b)) = (a, b) else {
        return Err(diverged());
    };

    let outcome = match op {
        BoolOp::And => a && b,
        BoolOp::Or => a || b,
        BoolOp::Xor => a != b,
    };

    let name = state.bare_symbol(&args[2])?;
    state.assign(name, outcome)
}

fn inst_not(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let operand = state.resolve(&args[0], KindMask::BOOL)?;
    let Value::Bool(operand) = operand else {
        return Err(diverged());
    };
    let name = state.bare_symbol(&args[1])?;
    state.assign(name, !operand)
}

fn inst_int(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let operand = state.resolve(&args[1], KindMask::NUMERIC)?;
    let result = match operand {
        Value::Int(v) => {
            state.warn("Unnecessary cast int->int");
            v
        }
        // Truncates toward zero.
        Value::Float(v) => v as i64,
        _ => return Err(diverged()),
    };
    let name = state.bare_symbol(&args[0])?;
    state.assign(name, result)
}

fn inst_float(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let operand = state.resolve(&args[1], KindMask::NUMERIC)?;
    let result = match operand {
        Value::Float(v) => {
            state.warn("Unnecessary cast float->float");
            v
        }
        Value::Int(v) => v as f64,
        _ => return Err(diverged()),
    };
    let name = state.bare_symbol(&args[0])?;
    state.assign(name, result)
}

fn inst_bool(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let operand = state.resolve(&args[1], KindMask::ANY.without(Kind::Label))?;
    let result = match operand {
        Value::Int(v) => v != 0,
        Value::Float(v) => v != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Bool(v) => {
            state.warn("Unnecessary cast bool->bool");
            v
        }
        _ => return Err(diverged()),
    };
    let name = state.bare_symbol(&args[0])?;
    state.assign(name, result)
}

fn inst_str(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let operand = state.resolve(&args[1], KindMask::ANY.without(Kind::Label))?;
    let result = match operand {
        Value::Str(s) => {
            state.warn("Unnecessary cast str->str");
            s
        }
        Value::Label(_) | Value::Undet(_) => return Err(diverged()),
        other => other.to_string(),
    };
    let name = state.bare_symbol(&args[0])?;
    state.assign(name, result)
}

fn inst_cat(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let a = state.resolve(&args[0], KindMask::STR)?;
    let b = state.resolve(&args[1], KindMask::STR)?;
    let (Value::Str(mut a), Value::Str(b)) = (a, b) else {
        return Err(diverged());
    };
    a.push_str(&b);

    let name = state.bare_symbol(&args[2])?;
    state.assign(name, a)
}

fn inst_goto(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let target = state.resolve(&args[0], KindMask::LABEL)?;
    let Value::Label(name) = target else {
        return Err(diverged());
    };
    state.jump_to(&name)
}

fn inst_when(state: &mut VmState, args: &[Value]) -> Result<(), ScriptError> {
    let target = state.resolve(&args[1], KindMask::LABEL)?;
    let criteria = state.resolve(&args[0], KindMask::BOOL)?;
    let Value::Label(name) = target else {
        return Err(diverged());
    };
    let Value::Bool(criteria) = criteria else {
        return Err(diverged());
    };

    // The label must exist even when the branch is not taken.
    let index = state.label_index(&name)?;
    if criteria {
        state.pc = index;
    }
    Ok(())
}

fn inst_dump(state: &mut VmState, _args: &[Value]) -> Result<(), ScriptError> {
    println!("Dump begin ---");
    println!("Variable Symbol Table:");
    let mut names: Vec<&String> = state.variables.keys().collect();
    names.sort();
    for name in names {
        let value = &state.variables[name];
        println!("{name} -> {value} <type: {}>", value.kind());
    }
    println!("Dump end ---");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::error::ScriptErrorKind;
    use crate::core::value::Value;
    use crate::vm::ScriptVm;

    fn run_program(source: &str) -> ScriptVm {
        let mut vm = ScriptVm::new();
        vm.state_mut().set_print_warnings(false);
        let program = vm.compile(source).expect("source should compile");
        vm.run(&program).expect("program should run");
        vm
    }

    fn run_err(source: &str) -> (usize, String) {
        let mut vm = ScriptVm::new();
        vm.state_mut().set_print_warnings(false);
        let program = vm.compile(source).expect("source should compile");
        let err = vm.run(&program).expect_err("program should fail");
        (err.pc(), err.error().message().to_string())
    }

    fn variable(vm: &ScriptVm, name: &str) -> Value {
        vm.state()
            .variable(name)
            .unwrap_or_else(|| panic!("variable {name} should be bound"))
            .clone()
    }

    #[test]
    fn let_binds_literals_of_every_kind() {
        let vm = run_program(
            "let i, 42\nlet f, 2.5\nlet b, true\nlet s, \"hi\"\nlet l, @somewhere",
        );
        assert_eq!(variable(&vm, "i"), Value::Int(42));
        assert_eq!(variable(&vm, "f"), Value::Float(2.5));
        assert_eq!(variable(&vm, "b"), Value::Bool(true));
        assert_eq!(variable(&vm, "s"), Value::Str("hi".to_string()));
        // A resolved label collapses to its textual name.
        assert_eq!(variable(&vm, "l"), Value::Str("@somewhere".to_string()));
    }

    #[test]
    fn let_through_symbol_copies_the_bound_value() {
        let vm = run_program("let x, 7\nlet y, x");
        assert_eq!(variable(&vm, "y"), Value::Int(7));
    }

    #[test]
    fn arithmetic_stays_int_for_int_inputs() {
        let vm = run_program("add 2, 3, a\nsub 2, 5, b\nmul 4, 3, c\npow 2, 10, d");
        assert_eq!(variable(&vm, "a"), Value::Int(5));
        assert_eq!(variable(&vm, "b"), Value::Int(-3));
        assert_eq!(variable(&vm, "c"), Value::Int(12));
        assert_eq!(variable(&vm, "d"), Value::Int(1024));
    }

    #[test]
    fn arithmetic_on_floats_stays_float() {
        let vm = run_program("add 1.5, 2.25, x");
        assert_eq!(variable(&vm, "x"), Value::Float(3.75));
    }

    #[test]
    fn mixed_kind_arithmetic_is_a_type_error() {
        let (_, message) = run_err("add 1, 2.5, x");
        assert_eq!(message, "Type mismatch");
    }

    #[test]
    fn div_floors_and_div_r_widens() {
        let vm = run_program("div 7, 2, q\ndiv_r 7, 2, r\ndiv -7, 2, s");
        assert_eq!(variable(&vm, "q"), Value::Int(3));
        assert_eq!(variable(&vm, "r"), Value::Float(3.5));
        assert_eq!(variable(&vm, "s"), Value::Int(-4));
    }

    #[test]
    fn mod_truncates_through_integer_conversion() {
        let vm = run_program("mod 7, 3, a\nmod -7, 3, b\nmod 7.9, 2.5, c");
        assert_eq!(variable(&vm, "a"), Value::Int(1));
        assert_eq!(variable(&vm, "b"), Value::Int(-1));
        // Float operands are truncated to integers first: 7 % 2 = 1.
        assert_eq!(variable(&vm, "c"), Value::Float(1.0));
    }

    #[test]
    fn zero_divisor_is_fatal_for_all_division_forms() {
        for source in ["div 1, 0, x", "div_r 1, 0, x", "mod 1, 0, x"] {
            let (_, message) = run_err(source);
            assert_eq!(message, "Division by zero");
        }
    }

    #[test]
    fn cmp_compares_numbers_and_strings() {
        let vm = run_program(
            "cmp 1, \"<\", 3, a\n\
             cmp 3, \">=\", 3, b\n\
             cmp 2.5, \"!=\", 2.5, c\n\
             cmp \"abc\", \"<\", \"abd\", d\n\
             cmp \"x\", \"==\", \"x\", e",
        );
        assert_eq!(variable(&vm, "a"), Value::Bool(true));
        assert_eq!(variable(&vm, "b"), Value::Bool(true));
        assert_eq!(variable(&vm, "c"), Value::Bool(false));
        assert_eq!(variable(&vm, "d"), Value::Bool(true));
        assert_eq!(variable(&vm, "e"), Value::Bool(true));
    }

    #[test]
    fn cmp_rejects_unknown_operators_and_bool_operands() {
        let (_, message) = run_err("cmp 1, \"<>\", 2, x");
        assert_eq!(message, "Unknown operator <>");
        let (_, message) = run_err("cmp true, \"==\", true, x");
        assert_eq!(message, "Type mismatch");
    }

    #[test]
    fn boolean_instructions_cover_the_truth_table() {
        let vm = run_program(
            "and true, false, a\nor true, false, b\nxor true, true, c\nxor true, false, d\nnot false, e",
        );
        assert_eq!(variable(&vm, "a"), Value::Bool(false));
        assert_eq!(variable(&vm, "b"), Value::Bool(true));
        assert_eq!(variable(&vm, "c"), Value::Bool(false));
        assert_eq!(variable(&vm, "d"), Value::Bool(true));
        assert_eq!(variable(&vm, "e"), Value::Bool(true));
    }

    #[test]
    fn not_is_an_involution() {
        let vm = run_program("not true, a\nnot a, b");
        assert_eq!(variable(&vm, "a"), Value::Bool(false));
        assert_eq!(variable(&vm, "b"), Value::Bool(true));
    }

    #[test]
    fn casts_put_the_destination_first() {
        let vm = run_program("int i, 3.9\nint j, -3.9\nfloat f, 2\nbool b, 1\nstr s, 42");
        assert_eq!(variable(&vm, "i"), Value::Int(3));
        assert_eq!(variable(&vm, "j"), Value::Int(-3));
        assert_eq!(variable(&vm, "f"), Value::Float(2.0));
        assert_eq!(variable(&vm, "b"), Value::Bool(true));
        assert_eq!(variable(&vm, "s"), Value::Str("42".to_string()));
    }

    #[test]
    fn bool_cast_truth_rules() {
        let vm = run_program(
            "bool a, 0\nbool b, 7\nbool c, 0.0\nbool d, 0.1\nbool e, \"\"\nbool f, \"x\"",
        );
        assert_eq!(variable(&vm, "a"), Value::Bool(false));
        assert_eq!(variable(&vm, "b"), Value::Bool(true));
        assert_eq!(variable(&vm, "c"), Value::Bool(false));
        assert_eq!(variable(&vm, "d"), Value::Bool(true));
        assert_eq!(variable(&vm, "e"), Value::Bool(false));
        assert_eq!(variable(&vm, "f"), Value::Bool(true));
    }

    #[test]
    fn str_cast_formats_every_storable_kind() {
        let vm = run_program("str a, 42\nstr b, 2.5\nstr c, 3.0\nstr d, true\nstr e, false");
        assert_eq!(variable(&vm, "a"), Value::Str("42".to_string()));
        assert_eq!(variable(&vm, "b"), Value::Str("2.5".to_string()));
        assert_eq!(variable(&vm, "c"), Value::Str("3".to_string()));
        assert_eq!(variable(&vm, "d"), Value::Str("true".to_string()));
        assert_eq!(variable(&vm, "e"), Value::Str("false".to_string()));
    }

    #[test]
    fn redundant_casts_warn_and_pass_through() {
        let vm = run_program("int a, 1\nfloat b, 1.0\nbool c, true\nstr d, \"x\"");
        assert_eq!(variable(&vm, "a"), Value::Int(1));
        assert_eq!(variable(&vm, "b"), Value::Float(1.0));
        assert_eq!(variable(&vm, "c"), Value::Bool(true));
        assert_eq!(variable(&vm, "d"), Value::Str("x".to_string()));
        let messages: Vec<&str> = vm
            .state()
            .warnings()
            .iter()
            .map(|warning| warning.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Unnecessary cast int->int",
                "Unnecessary cast float->float",
                "Unnecessary cast bool->bool",
                "Unnecessary cast str->str",
            ]
        );
    }

    #[test]
    fn cast_rejects_labels() {
        let (_, message) = run_err("bool x, @somewhere");
        assert_eq!(message, "Type mismatch");
    }

    #[test]
    fn cat_concatenates_and_preserves_identity() {
        let vm = run_program("let s, \"ab\"\ncat s, \"cd\", t\ncat s, \"\", u");
        assert_eq!(variable(&vm, "t"), Value::Str("abcd".to_string()));
        assert_eq!(variable(&vm, "u"), Value::Str("ab".to_string()));
    }

    #[test]
    fn goto_skips_to_the_instruction_after_the_label() {
        let vm = run_program("goto @skip\nlet x, 1\n@skip\nlet y, 2");
        assert!(vm.state().variable("x").is_none());
        assert_eq!(variable(&vm, "y"), Value::Int(2));
    }

    #[test]
    fn goto_unknown_label_is_fatal() {
        let (pc, message) = run_err("goto @nope");
        assert_eq!(pc, 0);
        assert_eq!(message, "Unset label @nope");
    }

    #[test]
    fn when_jumps_only_on_true_but_always_checks_the_label() {
        let vm = run_program("when false, @end\nlet x, 1\n@end");
        assert_eq!(variable(&vm, "x"), Value::Int(1));

        let (_, message) = run_err("when false, @missing");
        assert_eq!(message, "Unset label @missing");
    }

    #[test]
    fn counting_loop_terminates_at_bound() {
        let vm = run_program(
            "let i, 0\n@loop\nadd i, 1, i\ncmp i, \"<\", 3, c\nwhen c, @loop",
        );
        assert_eq!(variable(&vm, "i"), Value::Int(3));
        assert_eq!(variable(&vm, "c"), Value::Bool(false));
    }

    #[test]
    fn destination_must_be_a_bare_symbol() {
        let (_, message) = run_err("let 42, 1");
        assert_eq!(message, "Type mismatch");
        let (_, message) = run_err("add 1, 2, 3");
        assert_eq!(message, "Type mismatch");
    }

    #[test]
    fn rebinding_with_a_different_kind_is_fatal() {
        let (pc, message) = run_err("let x, 42\nlet x, \"hi\"");
        assert_eq!(pc, 1);
        assert_eq!(message, "Type mismatch");
    }

    #[test]
    fn errors_carry_their_category() {
        let mut vm = ScriptVm::new();
        let program = vm.compile("div 1, 0, x").expect("source should compile");
        let err = vm.run(&program).expect_err("division should fail");
        assert_eq!(err.error().kind(), ScriptErrorKind::Math);
    }
}
