//! Helpers for end-to-end tests: source in, finished VM out

#![allow(dead_code)]

use cub_core::{parse, tokenize, Compiler, Instruction, Value, Vm, VmState};

/// A finished (or parked) run together with the compiler that produced it
pub struct Run {
    pub compiler: Compiler,
    pub vm: Vm,
    pub state: VmState,
}

impl std::fmt::Debug for Run {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Run").field("state", &self.state).finish_non_exhaustive()
    }
}

impl Run {
    /// Value of a top-level variable
    pub fn get(&self, name: &str) -> Option<&Value> {
        let register = self.compiler.register_for(name)?;
        self.vm.register_value(register).ok()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }
}

#[derive(Debug)]
pub enum ExecError {
    Lexer(String),
    Parser(String),
    Compiler(String),
    Runtime(String),
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecError::Lexer(msg) => write!(f, "Lexer error: {}", msg),
            ExecError::Parser(msg) => write!(f, "Parser error: {}", msg),
            ExecError::Compiler(msg) => write!(f, "Compiler error: {}", msg),
            ExecError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for ExecError {}

/// Compile with an existing compiler so tests can pre-declare externals
pub fn compile_with(compiler: &mut Compiler, code: &str) -> Result<Vec<Instruction>, ExecError> {
    let tokens = tokenize(code).map_err(|e| ExecError::Lexer(e.to_string()))?;
    let nodes = parse(tokens).map_err(|e| ExecError::Parser(e.describe_in(code)))?;
    compiler
        .compile(&nodes)
        .map_err(|e| ExecError::Compiler(e.to_string()))
}

pub fn compile_code(code: &str) -> Result<(Compiler, Vec<Instruction>), ExecError> {
    let mut compiler = Compiler::new();
    let program = compile_with(&mut compiler, code)?;
    Ok((compiler, program))
}

/// Full pipeline with no externals
pub fn run_code(code: &str) -> Result<Run, ExecError> {
    let (compiler, program) = compile_code(code)?;
    let mut vm = Vm::new(program).map_err(|e| ExecError::Runtime(e.to_string()))?;
    let state = vm
        .interpret()
        .map_err(|e| ExecError::Runtime(e.to_string()))?;
    Ok(Run { compiler, vm, state })
}

/// Run and read one numeric variable
pub fn eval_number(code: &str, name: &str) -> f64 {
    let run = run_code(code).unwrap_or_else(|e| panic!("{e}\n--- source ---\n{code}"));
    run.number(name)
        .unwrap_or_else(|| panic!("'{name}' is not a number after:\n{code}"))
}
