// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and diagnostic rendering.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use serde_json::json;

use crate::core::error::{CompileError, RuntimeError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "opscript",
    version = VERSION,
    about = "Line-oriented scripting VM with a host-extensible instruction table"
)]
pub struct Cli {
    #[arg(value_name = "SCRIPT", help = "Script source file to compile and run")]
    pub script: PathBuf,
    #[arg(
        short = 'd',
        long = "dump-program",
        action = ArgAction::SetTrue,
        long_help = "Print the compiled program listing and label table, then exit without running."
    )]
    pub dump_program: bool,
    #[arg(
        short = 'w',
        long = "no-warn",
        action = ArgAction::SetTrue,
        long_help = "Suppress runtime warning output."
    )]
    pub no_warn: bool,
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Select diagnostic output format. text is default; json emits one machine-readable object per fatal diagnostic."
    )]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Render a fatal compile diagnostic in the selected format.
pub fn render_compile_diagnostic(format: OutputFormat, error: &CompileError) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => json!({
            "severity": "error",
            "phase": "compile",
            "line": error.line(),
            "kind": error.error().kind().label(),
            "message": error.error().message(),
        })
        .to_string(),
    }
}

/// Render a fatal runtime diagnostic in the selected format.
pub fn render_runtime_diagnostic(format: OutputFormat, error: &RuntimeError) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => json!({
            "severity": "error",
            "phase": "run",
            "instruction": error.pc(),
            "kind": error.error().kind().label(),
            "message": error.error().message(),
        })
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ScriptError, ScriptErrorKind};
    use clap::Parser;

    #[test]
    fn parses_flags_and_defaults() {
        let cli = Cli::try_parse_from(["opscript", "demo.ops"]).expect("args should parse");
        assert_eq!(cli.script, PathBuf::from("demo.ops"));
        assert!(!cli.dump_program);
        assert!(!cli.no_warn);
        assert_eq!(cli.format, OutputFormat::Text);

        let cli = Cli::try_parse_from(["opscript", "-d", "-w", "--format", "json", "demo.ops"])
            .expect("args should parse");
        assert!(cli.dump_program);
        assert!(cli.no_warn);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn missing_script_argument_is_rejected() {
        assert!(Cli::try_parse_from(["opscript"]).is_err());
    }

    #[test]
    fn json_compile_diagnostic_is_machine_readable() {
        let error = CompileError::new(
            4,
            ScriptError::new(ScriptErrorKind::Syntax, "Unknown instruction", Some("frob")),
        );
        let rendered = render_compile_diagnostic(OutputFormat::Json, &error);
        let parsed: serde_json::Value =
            serde_json::from_str(&rendered).expect("diagnostic should be valid JSON");
        assert_eq!(parsed["phase"], "compile");
        assert_eq!(parsed["line"], 4);
        assert_eq!(parsed["kind"], "Syntax");
        assert_eq!(parsed["message"], "Unknown instruction frob");
    }

    #[test]
    fn text_runtime_diagnostic_matches_the_error_display() {
        let error = RuntimeError::new(
            2,
            ScriptError::new(ScriptErrorKind::Argument, "Unset label", Some("@nope")),
        );
        assert_eq!(
            render_runtime_diagnostic(OutputFormat::Text, &error),
            "In instruction number 2,\nArgument ERROR: Unset label @nope"
        );
    }
}
