//! Lowering of control flow, declarations and jumps

use super::{CompileError, CompileResult, Compiler, FunctionSignature, LoopContext};
use crate::compiler::ast::{Conditional, Do, For, Function, Node, StructPrototype, While};
use crate::runtime::bytecode::{Instruction, Label, Opcode};
use crate::runtime::value::Value;
use cub_log::trace;

impl Compiler {
    /// Lower a loop body with its own break/continue bookkeeping
    fn lower_loop_body(&mut self, node: &Node, body: &Node) -> CompileResult<(Vec<Instruction>, LoopContext)> {
        self.loops.push(LoopContext::default());
        let code = self.lower(body, Some(node));
        let context = self.loops.pop().unwrap_or_default();
        Ok((code?, context))
    }

    pub(crate) fn lower_loop_jump(&mut self, is_break: bool) -> CompileResult<Vec<Instruction>> {
        if self.loops.is_empty() {
            return Err(if is_break {
                CompileError::BreakOutsideLoop
            } else {
                CompileError::ContinueOutsideLoop
            });
        }

        let label = self.take_label();
        if let Some(context) = self.loops.last_mut() {
            if is_break {
                context.breaks.push(label);
            } else {
                context.continues.push(label);
            }
        }
        // target filled in by the enclosing loop
        let jump = Instruction::new(label, Opcode::Goto);
        let comment = if is_break { "break" } else { "continue" };
        Ok(vec![self.annotate(jump, || comment.to_string())])
    }

    pub(crate) fn lower_conditional(
        &mut self,
        node: &Node,
        conditional: &Conditional,
    ) -> CompileResult<Vec<Instruction>> {
        let mut code = self.lower(conditional.condition(), Some(node))?;
        let branch = self.take_label();
        let body = self.lower(conditional.body(), Some(node))?;

        match conditional.else_body() {
            None => {
                let end = self.peek_label();
                code.push(Instruction::new(branch, Opcode::IfFalse).with_target(end));
                code.extend(body);
            }
            Some(else_body) => {
                let skip = self.take_label();
                let else_code = self.lower(else_body, Some(node))?;
                let end = self.peek_label();
                code.push(Instruction::new(branch, Opcode::IfFalse).with_target(skip + 1));
                code.extend(body);
                code.push(Instruction::new(skip, Opcode::Goto).with_target(end));
                code.extend(else_code);
            }
        }
        Ok(code)
    }

    pub(crate) fn lower_while(&mut self, node: &Node, w: &While) -> CompileResult<Vec<Instruction>> {
        let start = self.peek_label();
        let mut code = self.lower(w.condition(), Some(node))?;
        let branch = self.take_label();
        let (body, context) = self.lower_loop_body(node, w.body())?;
        let back = self.take_label();
        let end = self.peek_label();

        code.push(Instruction::new(branch, Opcode::IfFalse).with_target(end));
        code.extend(body);
        code.push(Instruction::new(back, Opcode::Goto).with_target(start));
        context.patch(&mut code, end, start);
        Ok(code)
    }

    pub(crate) fn lower_repeat_while(&mut self, node: &Node, w: &While) -> CompileResult<Vec<Instruction>> {
        let start = self.peek_label();
        let (mut code, context) = self.lower_loop_body(node, w.body())?;
        let check = self.peek_label();
        code.extend(self.lower(w.condition(), Some(node))?);
        code.push(self.emit(Opcode::IfTrue).with_target(start));
        let end = self.peek_label();

        context.patch(&mut code, end, check);
        Ok(code)
    }

    /// The count lives in a hidden register that is cleared on exit
    pub(crate) fn lower_do(&mut self, node: &Node, d: &Do) -> CompileResult<Vec<Instruction>> {
        let mut code = self.lower(d.amount(), Some(node))?;
        let counter = self.allocate_register();
        let store = self.emit(Opcode::RegisterStore).with_index(counter);
        code.push(self.annotate(store, || "do counter".to_string()));

        let check = self.peek_label();
        code.push(self.emit(Opcode::RegisterLoad).with_index(counter));
        code.push(self.emit(Opcode::PushConst).with_value(Value::Number(0.0)));
        code.push(self.emit(Opcode::Gt));
        let branch = self.take_label();

        let (body, context) = self.lower_loop_body(node, d.body())?;

        let step = self.peek_label();
        let mut tail = vec![
            self.emit(Opcode::RegisterLoad).with_index(counter),
            self.emit(Opcode::PushConst).with_value(Value::Number(1.0)),
            self.emit(Opcode::Sub),
            self.emit(Opcode::RegisterUpdate).with_index(counter),
            self.emit(Opcode::Goto).with_target(check),
        ];
        let exit = self.peek_label();
        tail.push(self.emit(Opcode::RegisterClear).with_index(counter));

        code.push(Instruction::new(branch, Opcode::IfFalse).with_target(exit));
        code.extend(body);
        code.extend(tail);
        context.patch(&mut code, exit, step);
        Ok(code)
    }

    pub(crate) fn lower_for(&mut self, node: &Node, f: &For) -> CompileResult<Vec<Instruction>> {
        let mut code = self.lower(f.assignment(), Some(node))?;
        let start = self.peek_label();
        code.extend(self.lower(f.condition(), Some(node))?);
        let branch = self.take_label();
        let (body, context) = self.lower_loop_body(node, f.body())?;

        let step = self.peek_label();
        // the interval is a statement; a bare expression there gets popped
        let interval = self.lower(f.interval(), None)?;
        let back = self.take_label();
        let end = self.peek_label();

        code.push(Instruction::new(branch, Opcode::IfFalse).with_target(end));
        code.extend(body);
        code.extend(interval);
        code.push(Instruction::new(back, Opcode::Goto).with_target(start));
        context.patch(&mut code, end, step);
        Ok(code)
    }

    pub(crate) fn lower_return(&mut self, node: &Node, value: Option<&Node>) -> CompileResult<Vec<Instruction>> {
        let mut code = match value {
            Some(value) => self.lower(value, Some(node))?,
            None => Vec::new(),
        };
        code.push(self.emit(Opcode::ExitVirtual));
        Ok(code)
    }

    /// `VirtualHeader(id, after, owned...)`, argument stores, body, `VirtualEnd`
    pub(crate) fn lower_function(&mut self, node: &Node, function: &Function) -> CompileResult<Vec<Instruction>> {
        let prototype = &function.prototype;
        let id = self.declare_function(FunctionSignature::new(
            &prototype.name,
            prototype.argument_names.clone(),
            prototype.returns,
        ));
        trace!(self.logger, "lowering function {} as #{}", prototype.name, id);

        let header = self.take_label();
        let outer_loops = std::mem::take(&mut self.loops);
        self.push_scope();

        let body = self.lower_function_body(node, &prototype.argument_names, function.body());

        let scope = self.pop_scope();
        self.loops = outer_loops;
        let mut body = body?;
        body.push(self.emit(Opcode::VirtualEnd));

        let header = self.function_header(header, id, scope.owned(), &prototype.name);
        let mut code = vec![header];
        code.extend(body);
        Ok(code)
    }

    fn lower_function_body(
        &mut self,
        node: &Node,
        argument_names: &[String],
        body: &Node,
    ) -> CompileResult<Vec<Instruction>> {
        // arguments were pushed in order, so they pop in reverse
        let (mut code, _) = self.store_arguments(argument_names);
        code.extend(self.lower(body, Some(node))?);
        Ok(code)
    }

    /// Stores for the pushed arguments, plus each argument's register in
    /// declaration order
    fn store_arguments(&mut self, argument_names: &[String]) -> (Vec<Instruction>, Vec<usize>) {
        let mut code = Vec::with_capacity(argument_names.len());
        let mut registers = vec![0; argument_names.len()];
        for (position, name) in argument_names.iter().enumerate().rev() {
            let register = self.declare_local(name);
            registers[position] = register;
            let store = self.emit(Opcode::RegisterStore).with_index(register);
            code.push(self.annotate(store, || name.clone()));
        }
        (code, registers)
    }

    fn function_header(&self, label: Label, id: usize, owned: &[usize], name: &str) -> Instruction {
        let mut header = Instruction::new(label, Opcode::VirtualHeader)
            .with_index(id)
            .with_target(self.peek_label());
        for &register in owned {
            header = header.with_index(register);
        }
        self.annotate(header, || name.to_string())
    }

    /// A struct is a constructor function taking one argument per member
    pub(crate) fn lower_struct(&mut self, prototype: &StructPrototype) -> Vec<Instruction> {
        let id = self.declare_function(FunctionSignature::new(
            &prototype.name,
            prototype.members.clone(),
            true,
        ));
        trace!(self.logger, "lowering struct {} as #{}", prototype.name, id);

        let header = self.take_label();
        self.push_scope();

        let (mut code, registers) = self.store_arguments(&prototype.members);
        code.push(self.emit(Opcode::StructInit));
        for (name, register) in prototype.members.iter().zip(registers) {
            let member = self.members.declare(name);
            code.push(self.emit(Opcode::RegisterLoad).with_index(register));
            let set = self.emit(Opcode::StructSet).with_index(member);
            code.push(self.annotate(set, || name.clone()));
        }
        code.push(self.emit(Opcode::ExitVirtual));

        let scope = self.pop_scope();
        code.push(self.emit(Opcode::VirtualEnd));

        let header = self.function_header(header, id, scope.owned(), &prototype.name);
        let mut out = vec![header];
        out.extend(code);
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::parse;
    use crate::runtime::bytecode::{Instruction, Opcode, Operand};
    use crate::runtime::compiler::{CompileError, Compiler};

    fn compile(source: &str) -> Result<Vec<Instruction>, CompileError> {
        Compiler::new().compile(&parse(tokenize(source).unwrap()).unwrap())
    }

    fn assert_consecutive(code: &[Instruction]) {
        for pair in code.windows(2) {
            assert_eq!(pair[0].label + 1, pair[1].label, "{pair:?}");
        }
    }

    fn targets(code: &[Instruction]) -> Vec<usize> {
        code.iter()
            .filter_map(|i| i.operands.iter().find_map(|o| match o {
                Operand::Label(l) => Some(*l),
                _ => None,
            }))
            .collect()
    }

    #[test]
    fn test_if_else_targets() {
        let code = compile("x = 1\nif x < 2 { x = 3 } else { x = 4 }").unwrap();
        assert_consecutive(&code);
        // 0 push 1 / 1 store / 2 load / 3 push / 4 lt / 5 if_false / 6 push / 7 update / 8 goto / 9 push / 10 update
        assert_eq!(code[5].shape(), (Opcode::IfFalse, &[Operand::Label(9)][..]));
        assert_eq!(code[8].shape(), (Opcode::Goto, &[Operand::Label(11)][..]));
    }

    #[test]
    fn test_while_targets() {
        let code = compile("x = 0\nwhile x < 3 { x += 1 }").unwrap();
        assert_consecutive(&code);
        let if_false = code.iter().find(|i| i.opcode == Opcode::IfFalse).unwrap();
        assert_eq!(if_false.label_operand(0), Some(code.len()));
        assert_eq!(code.last().unwrap().shape(), (Opcode::Goto, &[Operand::Label(2)][..]));
    }

    #[test]
    fn test_break_and_continue_are_patched() {
        let code = compile("x = 0\nwhile true { if x > 2 { break }\nx += 1\ncontinue }").unwrap();
        assert_consecutive(&code);
        let gotos: Vec<_> = code
            .iter()
            .filter(|i| i.opcode == Opcode::Goto)
            .map(|i| i.label_operand(0))
            .collect();
        // break, continue, loop back edge
        assert_eq!(gotos, vec![Some(code.len()), Some(2), Some(2)]);
    }

    #[test]
    fn test_nested_loop_break_targets_inner_loop() {
        let code = compile("while true { while false { break } }").unwrap();
        let inner_exit = code
            .iter()
            .filter(|i| i.opcode == Opcode::IfFalse)
            .nth(1)
            .and_then(|i| i.label_operand(0))
            .unwrap();
        let brk = code.iter().find(|i| i.comment == "break").unwrap();
        assert_eq!(brk.label_operand(0), Some(inner_exit));
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(compile("break").unwrap_err(), CompileError::BreakOutsideLoop);
        assert_eq!(compile("continue").unwrap_err(), CompileError::ContinueOutsideLoop);
        // a function body does not inherit the loop around it
        assert_eq!(
            compile("while true { function f() { break } }").unwrap_err(),
            CompileError::BreakOutsideLoop
        );
    }

    #[test]
    fn test_do_uses_hidden_register() {
        let code = compile("do 3 times { }").unwrap();
        assert_consecutive(&code);
        assert_eq!(code.last().unwrap().shape(), (Opcode::RegisterClear, &[Operand::Index(0)][..]));
        for target in targets(&code) {
            assert!(target <= code.len());
        }
    }

    #[test]
    fn test_repeat_while_jumps_back_to_body() {
        let code = compile("x = 0\nrepeat { x += 1 } while x < 3").unwrap();
        assert_consecutive(&code);
        assert_eq!(code.last().unwrap().shape(), (Opcode::IfTrue, &[Operand::Label(2)][..]));
    }

    #[test]
    fn test_for_loop_shape() {
        let code = compile("for i = 0, i < 3, i += 1 { continue }").unwrap();
        assert_consecutive(&code);
        let cont = code.iter().find(|i| i.comment == "continue").unwrap();
        // continue jumps to the interval, right after itself
        assert_eq!(cont.label_operand(0), Some(cont.label + 1));
    }

    #[test]
    fn test_function_header() {
        let code = compile("function add(a, b) returns { c = a + b\nreturn c }").unwrap();
        assert_consecutive(&code);
        let header = &code[0];
        assert_eq!(header.opcode, Opcode::VirtualHeader);
        assert_eq!(header.index_operand(0), Some(0));
        assert_eq!(header.label_operand(1), Some(code.len()));
        // b, a, c
        assert_eq!(header.indices_from(2), vec![0, 1, 2]);
        assert_eq!(code[1].comment, "b");
        assert_eq!(code.last().unwrap().opcode, Opcode::VirtualEnd);
    }

    #[test]
    fn test_call_before_declaration() {
        assert!(compile("x = twice(2)\nfunction twice(n) returns { return n * 2 }").is_ok());
    }

    #[test]
    fn test_struct_constructor() {
        let code = compile("struct Point { x, y }").unwrap();
        assert_consecutive(&code);
        let opcodes: Vec<_> = code.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::VirtualHeader,
                Opcode::RegisterStore,
                Opcode::RegisterStore,
                Opcode::StructInit,
                Opcode::RegisterLoad,
                Opcode::StructSet,
                Opcode::RegisterLoad,
                Opcode::StructSet,
                Opcode::ExitVirtual,
                Opcode::VirtualEnd,
            ]
        );
    }

    #[test]
    fn test_struct_constructor_loads_argument_registers() {
        let code = compile("a = 1\nb = 2\nstruct Pair { a, b }").unwrap();
        let stores: Vec<_> = code
            .iter()
            .skip_while(|i| i.opcode != Opcode::VirtualHeader)
            .filter(|i| i.opcode == Opcode::RegisterStore)
            .filter_map(|i| i.index_operand(0))
            .collect();
        let loads: Vec<_> = code
            .iter()
            .filter(|i| i.opcode == Opcode::RegisterLoad)
            .filter_map(|i| i.index_operand(0))
            .collect();
        // arguments are stored last-first, members are set first-last
        assert_eq!(loads, stores.iter().rev().copied().collect::<Vec<_>>());
        // the globals `a` and `b` hold registers 0 and 1
        assert!(loads.iter().all(|&r| r >= 2));
    }
}
