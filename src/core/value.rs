// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Tagged value model and operand classification.
//!
//! Every operand of a compiled instruction is a [`Value`]. Handlers declare
//! which kinds they accept through a [`KindMask`]; the resolver checks the
//! mask and hands back a value the handler can match on directly. `Undet`
//! carries the raw text of a token that is not a literal and is interpreted
//! as a variable name at resolve time.

use std::fmt;
use std::ops::BitOr;

/// Kind identities. Discriminants are bit positions so a mask can name a
/// union of kinds; `Undet` carries no bit and never satisfies a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    Undet = 0,
    Int = 1,
    Float = 2,
    Bool = 4,
    Str = 8,
    Label = 16,
}

impl Kind {
    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn mask(self) -> KindMask {
        KindMask(self as u8)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Kind::Undet => "undet",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Bool => "bool",
            Kind::Str => "str",
            Kind::Label => "label",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Union of kinds accepted by an argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindMask(u8);

impl KindMask {
    pub const NONE: KindMask = KindMask(0);
    pub const INT: KindMask = Kind::Int.mask();
    pub const FLOAT: KindMask = Kind::Float.mask();
    pub const BOOL: KindMask = Kind::Bool.mask();
    pub const STR: KindMask = Kind::Str.mask();
    pub const LABEL: KindMask = Kind::Label.mask();
    pub const NUMERIC: KindMask = KindMask(Kind::Int.bits() | Kind::Float.bits());
    pub const ANY: KindMask = KindMask(
        Kind::Int.bits() | Kind::Float.bits() | Kind::Bool.bits() | Kind::Str.bits() | Kind::Label.bits(),
    );

    pub const fn contains(self, kind: Kind) -> bool {
        kind.bits() & self.0 != 0
    }

    pub const fn without(self, kind: Kind) -> KindMask {
        KindMask(self.0 & !kind.bits())
    }
}

impl BitOr for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: KindMask) -> KindMask {
        KindMask(self.0 | rhs.0)
    }
}

/// A classified operand or stored variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// A label reference; the payload keeps the leading `@` sigil.
    Label(String),
    /// An unresolved symbolic reference holding the raw token text.
    Undet(String),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Bool(_) => Kind::Bool,
            Value::Str(_) => Kind::Str,
            Value::Label(_) => Kind::Label,
            Value::Undet(_) => Kind::Undet,
        }
    }
}

/// Display text: base-10 for ints, shortest round-trip decimal for floats,
/// `true`/`false` for bools, raw text for everything else.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Label(name) | Value::Undet(name) => f.write_str(name),
        }
    }
}

/// Classify one whitespace-trimmed operand token.
///
/// Priority order: label sigil, quoted string (quotes stripped), boolean
/// literal, base-10 signed integer, float, and finally an unresolved symbol.
/// Quoted tokens arrive from the tokenizer with both quotes still attached.
pub fn classify(token: &str) -> Value {
    if token.starts_with('@') {
        return Value::Label(token.to_string());
    }
    if token.starts_with('"') || token.starts_with('\'') {
        // Drop the surrounding quotes; the tokenizer guarantees the closing
        // quote matches the opening one.
        let inner = &token[1..];
        let inner = match inner.char_indices().next_back() {
            Some((idx, _)) => &inner[..idx],
            None => "",
        };
        return Value::Str(inner.to_string());
    }
    if token == "true" || token == "false" {
        return Value::Bool(token == "true");
    }
    if let Ok(value) = token.parse::<i64>() {
        return Value::Int(value);
    }
    if let Ok(value) = token.parse::<f64>() {
        return Value::Float(value);
    }
    Value::Undet(token.to_string())
}

/// Host-facing scalar accepted by variable assignment.
///
/// Only the four storable kinds are representable; a host cannot hand the
/// variable store a label or an unresolved symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Scalar {
    /// Collapse a resolved value into its storable form. Label references
    /// store as their textual name, sigil included.
    pub fn from_resolved(value: Value) -> Scalar {
        match value {
            Value::Int(v) => Scalar::Int(v),
            Value::Float(v) => Scalar::Float(v),
            Value::Bool(v) => Scalar::Bool(v),
            Value::Str(s) => Scalar::Str(s),
            Value::Label(name) | Value::Undet(name) => Scalar::Str(name),
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Scalar::Int(v) => Value::Int(v),
            Scalar::Float(v) => Value::Float(v),
            Scalar::Bool(v) => Value::Bool(v),
            Scalar::Str(s) => Value::Str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Scalar {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Scalar {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Scalar {
        Scalar::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Scalar {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Scalar {
        Scalar::Str(value)
    }
}
