//! Cub CLI - run a script, inspect its tokens, tree and bytecode

use clap::Parser;
use serde::Serialize;
use std::process;

mod config;
mod logging;
mod platform;

use crate::config::Cli;
use crate::platform::print_error_with_source;
use cub_api::{init_config, Completion, CubError, ExternalReply, Runner, VmState};
use cub_core::{Compiler, Instruction};
use cub_log::{debug, info};

/// JSON shape of `--bytecode`
#[derive(Serialize)]
struct BytecodeDump<'a> {
    functions: Vec<FunctionEntry<'a>>,
    instructions: &'a [Instruction],
}

#[derive(Serialize)]
struct FunctionEntry<'a> {
    id: usize,
    name: &'a str,
    arguments: &'a [String],
    returns: bool,
}

fn bytecode_json(program: &[Instruction], compiler: &Compiler) -> serde_json::Result<String> {
    let functions = (0..)
        .map_while(|id| compiler.function_signature(id).map(|s| (id, s)))
        .map(|(id, signature)| FunctionEntry {
            id,
            name: &signature.name,
            arguments: &signature.argument_names,
            returns: signature.returns,
        })
        .collect();
    serde_json::to_string_pretty(&BytecodeDump {
        functions,
        instructions: program,
    })
}

fn main() {
    let cli = Cli::parse();

    let logger = match logging::build_logger(&cli) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Error: cannot set up logging: {e}");
            process::exit(1);
        }
    };

    let source = match std::fs::read_to_string(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", cli.file.display(), e);
            process::exit(1);
        }
    };

    let run_config = cli.run_config(logger.clone());
    init_config(run_config.clone());
    info!(logger, "running {}", cli.file.display());

    let mut runner = Runner::new(run_config);
    runner.register_external_function("print", &["value"], false, |args| {
        if let Some(value) = args.get("value") {
            println!("{value}");
        }
        ExternalReply::Done(Completion::done())
    });

    if let Err(e) = execute(&cli, &mut runner, &source) {
        print_error_with_source(&e, &source);
        process::exit(1);
    }
    debug!(logger, "done");
}

fn execute(cli: &Cli, runner: &mut Runner, source: &str) -> Result<(), CubError> {
    if cli.tokens {
        println!("[Tokens]");
        for token in runner.tokenize(source)? {
            println!("{:>5}..{:<5} {}", token.range.start, token.range.end, token.kind);
        }
    }

    if cli.ast {
        println!("[Syntax Tree]");
        for node in runner.parse(source)? {
            print!("{}", node.tree());
        }
    }

    if cli.bytecode {
        let output = runner.compile(source)?;
        match bytecode_json(&output.program, &output.compiler) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                return Err(CubError::RunFailed {
                    reason: format!("cannot serialize bytecode: {e}"),
                })
            }
        }
    }

    let vm = runner.run_program(source)?;
    if vm.state() == VmState::AwaitingExternal {
        return Err(CubError::Suspended);
    }
    if vm.was_aborted() {
        eprintln!("run stopped by an external function");
    }

    for name in &cli.get {
        let value = runner.register_value(&vm, name)?;
        println!("{name} = {}", runner.describe(&value));
    }
    Ok(())
}
