// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for opscript.

use std::fs;
use std::process::ExitCode;

use clap::Parser;

use opscript::cli::{render_compile_diagnostic, render_runtime_diagnostic, Cli};
use opscript::core::value::KindMask;
use opscript::vm::ScriptVm;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.script) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to read {}: {err}", cli.script.display());
            return ExitCode::from(2);
        }
    };

    let mut vm = ScriptVm::new();
    vm.register_handler("print", 1, |state, args| {
        let value = state.resolve(&args[0], KindMask::ANY)?;
        println!("{value}");
        Ok(())
    });
    vm.state_mut().set_print_warnings(!cli.no_warn);

    let program = match vm.compile(&source) {
        Ok(program) => program,
        Err(err) => {
            println!("{}", render_compile_diagnostic(cli.format, &err));
            return ExitCode::FAILURE;
        }
    };

    if cli.dump_program {
        print!("{}", program.listing());
        return ExitCode::SUCCESS;
    }

    match vm.run(&program) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{}", render_runtime_diagnostic(cli.format, &err));
            ExitCode::FAILURE
        }
    }
}
