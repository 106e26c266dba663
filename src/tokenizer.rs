// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Tokenizer for the operand field of a script line.
//!
//! Operands are comma-separated. A quoted token (double or single quotes)
//! keeps its quotes so the classifier can tell it apart from a bare symbol;
//! the comma that follows a quoted token is consumed instead of emitting an
//! empty token. Spaces outside quotes never reach a token.

use crate::core::error::{ScriptError, ScriptErrorKind};

/// Split the operand field into raw tokens.
///
/// Quote handling: a quote opening mid-token is an error, a quote left open
/// at end of line is an error. Bytes between a closed quoted token and the
/// next comma are dropped.
pub fn tokenize_operands(text: &str) -> Result<Vec<String>, ScriptError> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut double_quote = false;
    let mut single_quote = false;
    // Set right after a quoted token closes; suppresses the separator that
    // would otherwise emit an empty token.
    let mut quote_just_closed = false;

    for c in text.chars() {
        if double_quote {
            buf.push(c);
            if c == '"' {
                tokens.push(std::mem::take(&mut buf));
                double_quote = false;
                quote_just_closed = true;
            }
        } else if single_quote {
            buf.push(c);
            if c == '\'' {
                tokens.push(std::mem::take(&mut buf));
                single_quote = false;
                quote_just_closed = true;
            }
        } else if c == ',' {
            if quote_just_closed {
                quote_just_closed = false;
            } else {
                tokens.push(std::mem::take(&mut buf));
            }
        } else if c == '"' || c == '\'' {
            if !buf.is_empty() {
                return Err(ScriptError::new(
                    ScriptErrorKind::Syntax,
                    &format!("Expected , before {c}"),
                    None,
                ));
            }
            buf.push(c);
            if c == '"' {
                double_quote = true;
            } else {
                single_quote = true;
            }
        } else if c != ' ' && !quote_just_closed {
            buf.push(c);
        }
    }

    if double_quote {
        return Err(ScriptError::new(ScriptErrorKind::Syntax, "Missing \"", None));
    }
    if single_quote {
        return Err(ScriptError::new(ScriptErrorKind::Syntax, "Missing '", None));
    }
    if !buf.is_empty() {
        tokens.push(buf);
    }

    Ok(tokens)
}
