//! Whole-pipeline guarantees: compile shapes, fallible construction,
//! determinism and compile-time failures

mod common;
use common::{compile_code, compile_with, run_code, ExecError};
use cub_core::compiler::ast::{Assignment, BinaryOp, BinaryOperator, Body, Call, Node, NodeError};
use cub_core::{
    Completion, Compiler, Counter, CounterError, ExternalFunction, ExternalReply, FunctionSignature,
    Opcode, Vm, VmState,
};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_assignment_reads_back() {
    for (source, expected) in [
        ("x = 1 + 2", 3.0),
        ("x = 7", 7.0),
        ("y = 2\nx = y * y", 4.0),
        ("x = (1 + 2) * (3 + 4)", 21.0),
    ] {
        let run = run_code(source).unwrap();
        assert_eq!(run.number("x"), Some(expected), "{source}");
    }
}

#[test]
fn test_shorthand_matches_long_form() {
    for (short, long) in [
        ("x = 0\nx += 1", "x = 0\nx = x + 1"),
        ("x = 3\nx -= 2", "x = 3\nx = x - 2"),
        ("x = 3\nx *= x", "x = 3\nx = x * x"),
        ("x = 9\nx /= 3", "x = 9\nx = x / 3"),
        ("x = 2\nx ^= 3", "x = 2\nx = x ^ 3"),
    ] {
        let (_, a) = compile_code(short).unwrap();
        let (_, b) = compile_code(long).unwrap();
        let a: Vec<_> = a.iter().map(|i| i.shape()).collect();
        let b: Vec<_> = b.iter().map(|i| i.shape()).collect();
        assert_eq!(a, b, "{short}");
    }
}

#[test]
fn test_member_assignment_needs_assigned_root() {
    for source in ["a.b = 5", "a.b.c = 5", "a.b.c.d = 5", "x = 1\na.x = 2"] {
        match compile_code(source) {
            Err(ExecError::Compiler(message)) => {
                assert!(message.contains("unexpected"), "{source}: {message}")
            }
            other => panic!("{source}: expected a compile error, got {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn test_member_access_needs_declared_member() {
    for source in [
        "struct S { b }\na = S(1)\na.typo = 5\nx = a.typo",
        "struct S { b }\na = S(1)\nx = a.nope",
    ] {
        match compile_code(source) {
            Err(ExecError::Compiler(message)) => {
                assert!(message.contains("unexpected"), "{source}: {message}")
            }
            other => panic!("{source}: expected a compile error, got {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn test_member_assignment_end_to_end() {
    let run = run_code("struct Box { b }\na = Box(1)\na.b = 5\nresult = a.b").unwrap();
    assert_eq!(run.number("result"), Some(5.0));

    let b = (0..4).find(|&id| run.compiler.member_name(id) == Some("b")).unwrap();
    let a = run.get("a").unwrap();
    assert_eq!(a.member(b).and_then(|v| v.as_number()), Some(5.0));
}

#[test]
fn test_assignment_value_kinds() {
    let target = || Node::Variable("x".into());
    let accepted = [
        Node::Number(1.0),
        Node::Str("s".into()),
        Node::Variable("y".into()),
        Node::StructMember {
            variable: Box::new(Node::Variable("y".into())),
            name: "z".into(),
        },
        Node::Call(Call {
            callee: "f".into(),
            arguments: Vec::new(),
        }),
        Node::BinaryOp(
            BinaryOp::new(BinaryOperator::Add, Node::Number(1.0), Some(Node::Number(2.0))).unwrap(),
        ),
    ];
    for value in accepted {
        assert!(Assignment::new(target(), value.clone()).is_ok(), "{value:?}");
    }

    // boolean literals are a documented limitation: `x = true` does not parse
    let rejected = [
        Node::Boolean(true),
        Node::Body(Body::default()),
        Node::Break,
        Node::Continue,
        Node::Return(None),
    ];
    for value in rejected {
        assert!(
            matches!(Assignment::new(target(), value.clone()), Err(NodeError::InvalidAssignmentValue(_))),
            "{value:?}"
        );
    }
}

#[test]
fn test_boolean_literal_assignment_is_a_parse_error() {
    assert!(matches!(compile_code("x = true"), Err(ExecError::Parser(_))));
    assert!(compile_code("x = 1 == 1").is_ok());
}

#[test]
fn test_counter_round_trip() {
    for start in [0u64, 3, 100] {
        let mut counter = Counter::new(start);
        for _ in 0..10 {
            counter.increment();
        }
        for _ in 0..10 {
            counter.decrement().unwrap();
        }
        assert_eq!(counter.value(), start);
    }

    let mut counter = Counter::new(1);
    assert_eq!(counter.decrement(), Ok(()));
    assert_eq!(counter.decrement(), Err(CounterError::Underflow));
    assert_eq!(counter.value(), 0);
}

#[test]
fn test_rerun_is_deterministic() {
    let source = "
        struct P { a, b }
        function f(n) returns { if n < 1 { return 0 }
            return n + f(n - 1) }
        p = P(f(5), \"s\")
        q = p.a * 2
    ";
    let (_, program) = compile_code(source).unwrap();

    let mut first = Vm::new(program.clone()).unwrap();
    let mut second = Vm::new(program).unwrap();
    assert_eq!(first.interpret(), Ok(VmState::Finished));
    assert_eq!(second.interpret(), Ok(VmState::Finished));
    assert_eq!(first.registers(), second.registers());
    assert_eq!(first.pc_trace(), second.pc_trace());

    let before = first.registers().clone();
    first.reset();
    assert!(first.registers().is_empty());
    first.interpret().unwrap();
    assert_eq!(first.registers(), &before);
}

/// Host counter starting from zero on every run
fn next_ticket() -> ExternalFunction {
    let issued = Rc::new(Cell::new(0.0));
    ExternalFunction::new(vec!["step".into()], move |args| {
        issued.set(issued.get() + args.number("step").unwrap_or(1.0));
        ExternalReply::Done(Completion::with_value(issued.get()))
    })
}

#[test]
fn test_rerun_with_external_is_deterministic() {
    let mut compiler = Compiler::new();
    let id = compiler.declare_function(FunctionSignature::new("ticket", vec!["step".into()], true));
    let program = compile_with(
        &mut compiler,
        "total = 0\nfor i = 0, i < 4, i += 1 { total += ticket(i + 1) }\nlast = ticket(0)",
    )
    .unwrap();

    let run = || {
        let mut vm = Vm::new(program.clone()).unwrap();
        vm.register_external(id, next_ticket());
        assert_eq!(vm.interpret(), Ok(VmState::Finished));
        vm
    };
    let first = run();
    let second = run();
    assert_eq!(first.registers(), second.registers());
    assert_eq!(first.pc_trace(), second.pc_trace());

    // tickets 1, 3, 6, 10 sum to 20
    let total = compiler.register_for("total").unwrap();
    assert_eq!(first.register_value(total).ok().and_then(|v| v.as_number()), Some(20.0));
    let last = compiler.register_for("last").unwrap();
    assert_eq!(first.register_value(last).ok().and_then(|v| v.as_number()), Some(10.0));
}

#[test]
fn test_rerun_with_deferred_external_is_deterministic() {
    let mut compiler = Compiler::new();
    let id = compiler.declare_function(FunctionSignature::new("ask", Vec::new(), true));
    let program = compile_with(&mut compiler, "a = ask()\nb = a * 2").unwrap();

    let run = || {
        let mut vm = Vm::new(program.clone()).unwrap();
        vm.register_external(id, ExternalFunction::new(Vec::new(), |_| ExternalReply::Deferred));
        assert_eq!(vm.interpret(), Ok(VmState::AwaitingExternal));
        assert_eq!(vm.resume(Completion::with_value(21.0)), Ok(VmState::Finished));
        vm
    };
    let first = run();
    let second = run();
    assert_eq!(first.registers(), second.registers());
    assert_eq!(first.pc_trace(), second.pc_trace());
}

#[test]
fn test_unresolved_call_fails_at_compile_time() {
    for source in ["nothing()", "x = nothing(1, 2)", "function f(a) { }\nf(1, 2)"] {
        assert!(
            matches!(compile_code(source), Err(ExecError::Compiler(ref m)) if m.contains("unknown function")),
            "{source}"
        );
    }
}

#[test]
fn test_undefined_variable_fails_at_compile_time() {
    assert!(matches!(compile_code("x = y + 1"), Err(ExecError::Compiler(_))));
}

#[test]
fn test_labels_strictly_increase() {
    let (_, program) = compile_code(
        "function f(a) returns { return a }\nx = 0\nwhile x < 3 { x += f(1) }\ndo 2 times { x -= 1 }",
    )
    .unwrap();
    assert!(program.windows(2).all(|w| w[0].label < w[1].label));
    assert!(program.iter().any(|i| i.opcode == Opcode::VirtualHeader));
}
