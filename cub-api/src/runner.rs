//! Lexer → parser → compiler → VM

use cub_core::compiler::ast::Node;
use cub_core::runtime::bytecode::disassemble;
use cub_core::{
    Compiler, ExternalArguments, ExternalFunction, ExternalReply, FunctionSignature, Instruction,
    Lexer, Parser, Token, Value, Vm, VmState,
};
use cub_log::{debug, info, Level};
use std::time::Instant;

use crate::prelude::prelude_nodes;
use crate::types::{describe_value, CompileOutput};
use crate::{CubError, RunConfig};

/// Owns the configuration and the host functions; every compile starts from
/// a fresh compiler so runs never see each other's registers.
pub struct Runner {
    config: RunConfig,
    externals: Vec<(FunctionSignature, ExternalFunction)>,
    /// Symbol tables of the most recent `compile_source`
    compiler: Option<Compiler>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Runner {
            config,
            externals: Vec::new(),
            compiler: None,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Make a host function callable from source. Returns its function id,
    /// the same id a compile of this runner assigns to the signature.
    /// Registering an existing signature again replaces the callback.
    pub fn register_external_function<F>(
        &mut self,
        name: &str,
        argument_names: &[&str],
        returns: bool,
        callback: F,
    ) -> usize
    where
        F: FnMut(&ExternalArguments) -> ExternalReply + 'static,
    {
        let argument_names: Vec<String> = argument_names.iter().map(|a| a.to_string()).collect();
        let signature = FunctionSignature::new(name, argument_names.clone(), returns);
        let function = ExternalFunction::new(argument_names, callback);

        if let Some(id) = self.externals.iter().position(|(s, _)| *s == signature) {
            debug!(self.config.logger, "replacing external function {} (#{})", name, id);
            self.externals[id].1 = function;
            return id;
        }
        self.externals.push((signature, function));
        debug!(self.config.logger, "registered external function {}", name);
        self.externals.len() - 1
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, CubError> {
        let _span = self.config.logger.enter_span("lexer");
        Ok(Lexer::with_logger(source, self.config.logger.clone()).tokenize()?)
    }

    pub fn parse(&self, source: &str) -> Result<Vec<Node>, CubError> {
        let tokens = self.tokenize(source)?;
        let _span = self.config.logger.enter_span("parser");
        Ok(Parser::with_logger(tokens, self.config.logger.clone()).parse()?)
    }

    /// Compile prelude (if enabled) and `source` with a fresh compiler
    pub fn compile(&self, source: &str) -> Result<CompileOutput, CubError> {
        let logger = self.config.logger.clone();
        let started = Instant::now();
        let nodes = self.parse(source)?;

        let _span = logger.enter_span("compiler");
        let mut compiler = Compiler::new_with_config(self.config.compiler.clone(), logger.clone());
        for (signature, _) in &self.externals {
            compiler.declare_function(signature.clone());
        }

        let mut program = Vec::new();
        if self.config.use_prelude {
            let prelude = prelude_nodes()?;
            program = compiler
                .compile(&prelude)
                .map_err(|e| CubError::StdlibFailed(Box::new(e.into())))?;
        }

        program.extend(compiler.compile(&nodes)?);
        info!(
            logger,
            "compiled {} instructions in {:?}",
            program.len(),
            started.elapsed()
        );

        if self.config.dump_bytecode {
            info!(logger, "bytecode:\n{}", disassemble(&program));
        }
        Ok(CompileOutput { program, compiler })
    }

    /// Compile and keep the symbol tables for `register_value`
    pub fn compile_source(&mut self, source: &str) -> Result<Vec<Instruction>, CubError> {
        let CompileOutput { program, compiler } = self.compile(source)?;
        self.compiler = Some(compiler);
        Ok(program)
    }

    /// Compiler of the latest `compile_source`, `run_program` or `run`
    pub fn compiler(&self) -> Option<&Compiler> {
        self.compiler.as_ref()
    }

    /// Run to completion or to a deferred external call. The VM is returned
    /// in `Finished` or `AwaitingExternal`; faults become `CubError::Runtime`.
    pub fn run_program(&mut self, source: &str) -> Result<Vm, CubError> {
        let started = Instant::now();
        let program = self.compile_source(source)?;

        let logger = self.config.logger.clone();
        let _span = logger.enter_span("vm");
        let mut vm = Vm::new_with_logger(program, self.config.logger.clone())?
            .with_limits(self.config.limits.clone());

        if let Some(compiler) = &self.compiler {
            for (signature, function) in &self.externals {
                if let Some(id) = compiler.function_id(signature) {
                    vm.register_external(id, function.clone());
                }
            }
        }

        info!(logger, "running");
        let interpret_started = Instant::now();
        let state = vm.interpret()?;
        let interpret_time = interpret_started.elapsed();
        info!(logger, "run stopped in state {:?}", state);
        info!(
            logger,
            "total time {:?}, interpret time {:?}, {} instructions executed",
            started.elapsed(),
            interpret_time,
            vm.instructions_executed()
        );
        self.log_machine(&vm);
        Ok(vm)
    }

    /// Stack and registers at the end of a run, registers by variable name
    fn log_machine(&self, vm: &Vm) {
        let logger = &self.config.logger;
        if !logger.is_enabled(Level::Debug) {
            return;
        }
        let stack: Vec<String> = vm.stack().iter().map(|value| self.describe(value)).collect();
        debug!(logger, "stack: [{}]", stack.join(", "));
        for (&register, value) in vm.registers() {
            let value = self.describe(value);
            match self.compiler.as_ref().and_then(|c| c.variable_name(register)) {
                Some(name) => debug!(logger, "register {}: {} = {}", register, name, value),
                None => debug!(logger, "register {}: {}", register, value),
            }
        }
    }

    /// Run `source` and read the top-level variable `name`
    pub fn run(&mut self, source: &str, name: &str) -> Result<Value, CubError> {
        let vm = self.run_program(source)?;
        match vm.state() {
            VmState::AwaitingExternal => return Err(CubError::Suspended),
            _ if vm.was_aborted() => {
                return Err(CubError::RunFailed {
                    reason: "stopped by an external function".to_string(),
                })
            }
            _ => {}
        }
        self.register_value(&vm, name)
    }

    /// Current value of a top-level variable in `vm`
    pub fn register_value(&self, vm: &Vm, name: &str) -> Result<Value, CubError> {
        let not_found = || CubError::RegisterNotFound {
            name: name.to_string(),
        };
        let register = self
            .compiler
            .as_ref()
            .and_then(|compiler| compiler.register_for(name))
            .ok_or_else(not_found)?;
        vm.register_value(register).cloned().map_err(|_| not_found())
    }

    /// Render a value using the latest compiler's names
    pub fn describe(&self, value: &Value) -> String {
        match &self.compiler {
            Some(compiler) => describe_value(value, compiler),
            None => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cub_core::Completion;

    fn runner() -> Runner {
        Runner::new(RunConfig::default())
    }

    #[test]
    fn test_run_reads_variable() {
        assert_eq!(runner().run("x = 1 + 2", "x"), Ok(Value::Number(3.0)));
    }

    #[test]
    fn test_prelude_functions() {
        let mut runner = runner();
        let source = "a = abs(-3)\nb = min(4, 2)\nc = max(4, 2)\nd = clamp(12, 0, 10)\ne = sign(-7)";
        let vm = runner.run_program(source).unwrap();
        for (name, expected) in [("a", 3.0), ("b", 2.0), ("c", 4.0), ("d", 10.0), ("e", -1.0)] {
            assert_eq!(runner.register_value(&vm, name), Ok(Value::Number(expected)), "{name}");
        }
    }

    #[test]
    fn test_without_prelude() {
        let mut runner = Runner::new(RunConfig {
            use_prelude: false,
            ..RunConfig::default()
        });
        assert!(matches!(runner.run("x = abs(1)", "x"), Err(CubError::Compile(_))));
    }

    #[test]
    fn test_source_overrides_prelude() {
        let source = "function abs(x) returns { return 100 }\ny = abs(-1)";
        assert_eq!(runner().run(source, "y"), Ok(Value::Number(100.0)));
    }

    #[test]
    fn test_missing_variable() {
        let mut runner = runner();
        assert_eq!(
            runner.run("x = 1", "y"),
            Err(CubError::RegisterNotFound { name: "y".into() })
        );
    }

    #[test]
    fn test_external_id_matches_compiler() {
        let mut runner = runner();
        let first = runner.register_external_function("a", &[], false, |_| ExternalReply::Done(Completion::done()));
        let second = runner.register_external_function("b", &["x"], true, |_| ExternalReply::Done(Completion::done()));
        let again = runner.register_external_function("a", &[], false, |_| ExternalReply::Done(Completion::abort()));
        assert_eq!((first, second, again), (0, 1, 0));

        runner.compile_source("").unwrap();
        let compiler = runner.compiler().unwrap();
        let signature = FunctionSignature::new("b", vec!["x".into()], true);
        assert_eq!(compiler.function_id(&signature), Some(second));
    }

    #[test]
    fn test_external_function() {
        let mut runner = runner();
        runner.register_external_function("half", &["n"], true, |args| {
            ExternalReply::Done(Completion::with_value(args.number("n").unwrap_or(0.0) / 2.0))
        });
        assert_eq!(runner.run("x = half(9)", "x"), Ok(Value::Number(4.5)));
    }

    #[test]
    fn test_suspended_and_aborted() {
        let mut runner = runner();
        runner.register_external_function("later", &[], true, |_| ExternalReply::Deferred);
        runner.register_external_function("quit", &[], false, |_| ExternalReply::Done(Completion::abort()));

        assert_eq!(runner.run("x = later()", "x"), Err(CubError::Suspended));
        assert!(matches!(runner.run("x = 1\nquit()", "x"), Err(CubError::RunFailed { .. })));

        let mut vm = runner.run_program("x = later() + 1").unwrap();
        assert_eq!(vm.state(), VmState::AwaitingExternal);
        assert_eq!(vm.resume(Completion::with_value(1.0)), Ok(VmState::Finished));
        assert_eq!(runner.register_value(&vm, "x"), Ok(Value::Number(2.0)));
    }

    #[test]
    fn test_describe_struct() {
        let mut runner = runner();
        let value = runner.run("struct P { name, age }\np = P(\"cub\", 3)", "p").unwrap();
        assert_eq!(runner.describe(&value), "{name: \"cub\", age: 3}");
    }

    #[test]
    fn test_runtime_fault() {
        assert!(matches!(
            runner().run("x = 0\ny = 1 / x", "y"),
            Err(CubError::Runtime(cub_core::VmError::DivisionByZero))
        ));
    }
}
