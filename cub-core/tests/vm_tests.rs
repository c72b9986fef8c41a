//! End-to-end execution: source through lexer, parser, compiler and VM

mod common;
use common::{eval_number, run_code};
use cub_core::{Value, VmState};

// ===== expressions =====

#[test]
fn test_basic_arithmetic() {
    assert_eq!(eval_number("x = 1 + 2", "x"), 3.0);
    assert_eq!(eval_number("x = 10 - 3", "x"), 7.0);
    assert_eq!(eval_number("x = 4 * 5", "x"), 20.0);
    assert_eq!(eval_number("x = 20 / 8", "x"), 2.5);
    assert_eq!(eval_number("x = 2 ^ 10", "x"), 1024.0);
}

#[test]
fn test_operator_precedence() {
    assert_eq!(eval_number("x = 2 + 3 * 4", "x"), 14.0);
    assert_eq!(eval_number("x = (2 + 3) * 4", "x"), 20.0);
    assert_eq!(eval_number("x = 2 * 3 ^ 2", "x"), 18.0);
    assert_eq!(eval_number("x = 10 - 4 - 3", "x"), 3.0);
    assert_eq!(eval_number("x = 64 / 4 / 2", "x"), 8.0);
}

#[test]
fn test_negative_values() {
    assert_eq!(eval_number("x = -5", "x"), -5.0);
    assert_eq!(eval_number("y = 4\nx = -y", "x"), -4.0);
    assert_eq!(eval_number("x = 3 - -2", "x"), 5.0);
    assert_eq!(eval_number("x = -2 ^ 2", "x"), -4.0);
    assert_eq!(eval_number("x = -2 * 3", "x"), -6.0);
}

#[test]
fn test_comparison_and_logic() {
    let run = run_code("a = 1 < 2\nb = 2 <= 1\nc = 1 < 2 && 3 > 4\nd = 1 < 2 || 3 > 4\ne = !(1 == 1)").unwrap();
    assert_eq!(run.get("a"), Some(&Value::Bool(true)));
    assert_eq!(run.get("b"), Some(&Value::Bool(false)));
    assert_eq!(run.get("c"), Some(&Value::Bool(false)));
    assert_eq!(run.get("d"), Some(&Value::Bool(true)));
    assert_eq!(run.get("e"), Some(&Value::Bool(false)));
}

#[test]
fn test_string_values() {
    let run = run_code("greeting = \"hello, \" + \"cub\"\nlabel = \"n = \" + 3\nsame = \"a\" == \"a\"").unwrap();
    assert_eq!(run.get("greeting"), Some(&Value::from("hello, cub")));
    assert_eq!(run.get("label"), Some(&Value::from("n = 3")));
    assert_eq!(run.get("same"), Some(&Value::Bool(true)));
}

#[test]
fn test_shorthand_assignment() {
    let code = "x = 10\nx += 5\nx -= 3\nx *= 2\nx /= 4\nx ^= 2";
    assert_eq!(eval_number(code, "x"), 36.0);
}

// ===== control flow =====

#[test]
fn test_if_else_chain() {
    let code = "x = 5\nif x < 3 { y = 1 } else if x < 6 { y = 2 } else { y = 3 }";
    // y is first assigned inside a branch body; it still lives in the top-level scope
    assert_eq!(eval_number(code, "y"), 2.0);
}

#[test]
fn test_while_loop() {
    assert_eq!(eval_number("i = 0\ntotal = 0\nwhile i < 5 { i += 1\ntotal += i }", "total"), 15.0);
}

#[test]
fn test_repeat_runs_body_first() {
    assert_eq!(eval_number("i = 10\nrepeat { i += 1 } while i < 5", "i"), 11.0);
}

#[test]
fn test_do_times() {
    assert_eq!(eval_number("x = 1\ndo 4 times { x *= 2 }", "x"), 16.0);
    assert_eq!(eval_number("x = 1\ndo 0 times { x *= 2 }", "x"), 1.0);
}

#[test]
fn test_for_loop() {
    assert_eq!(eval_number("total = 0\nfor i = 1, i <= 4, i += 1 { total += i }", "total"), 10.0);
}

#[test]
fn test_break_and_continue() {
    let code = "
        total = 0
        i = 0
        while true {
            i += 1
            if i > 6 { break }
            if i == 3 { continue }
            total += i
        }
    ";
    assert_eq!(eval_number(code, "total"), 18.0);
}

#[test]
fn test_break_only_leaves_inner_loop() {
    let code = "
        count = 0
        for i = 0, i < 3, i += 1 {
            for j = 0, j < 10, j += 1 {
                if j == 2 { break }
                count += 1
            }
        }
    ";
    assert_eq!(eval_number(code, "count"), 6.0);
}

#[test]
fn test_top_level_return_halts() {
    assert_eq!(eval_number("x = 1\nreturn\nx = 2", "x"), 1.0);
}

// ===== functions =====

#[test]
fn test_function_call() {
    let code = "function add(a, b) returns { return a + b }\nx = add(2, 3)";
    assert_eq!(eval_number(code, "x"), 5.0);
}

#[test]
fn test_call_before_declaration() {
    let code = "x = twice(21)\nfunction twice(n) returns { return n * 2 }";
    assert_eq!(eval_number(code, "x"), 42.0);
}

#[test]
fn test_function_writes_global() {
    let code = "counter = 0\nfunction bump() { counter += 1 }\nbump()\nbump()";
    assert_eq!(eval_number(code, "counter"), 2.0);
}

#[test]
fn test_function_locals_do_not_leak() {
    let run = run_code("function f() returns { tmp = 7\nreturn tmp }\nx = f()").unwrap();
    assert_eq!(run.number("x"), Some(7.0));
    assert_eq!(run.get("tmp"), None);
}

#[test]
fn test_recursion() {
    let code = "
        function fact(n) returns {
            if n <= 1 { return 1 }
            return n * fact(n - 1)
        }
        x = fact(6)
    ";
    assert_eq!(eval_number(code, "x"), 720.0);

    let code = "
        function fib(n) returns {
            if n < 2 { return n }
            return fib(n - 1) + fib(n - 2)
        }
        x = fib(10)
    ";
    assert_eq!(eval_number(code, "x"), 55.0);
}

#[test]
fn test_overload_by_arity() {
    let code = "
        function area(s) returns { return s * s }
        function area(w, h) returns { return w * h }
        x = area(3) + area(2, 5)
    ";
    assert_eq!(eval_number(code, "x"), 19.0);
}

#[test]
fn test_function_reference_value() {
    let run = run_code("function f() { }\ng = f").unwrap();
    assert!(matches!(run.get("g"), Some(Value::Function(_))));
}

#[test]
fn test_runaway_recursion_faults() {
    let err = run_code("function down(n) returns { return down(n + 1) }\nx = down(0)").unwrap_err();
    assert!(err.to_string().contains("call depth"), "{err}");
}

// ===== structs =====

#[test]
fn test_struct_construction_and_access() {
    let code = "struct Point { x, y }\np = Point(3, 4)\nd = p.x * p.x + p.y * p.y";
    assert_eq!(eval_number(code, "d"), 25.0);
}

#[test]
fn test_nested_member_assignment() {
    let code = "
        struct Inner { v }
        struct Outer { inner, tag }
        o = Outer(Inner(1), 2)
        o.inner.v = 9
        v = o.inner.v
        tag = o.tag
    ";
    let run = run_code(code).unwrap();
    assert_eq!(run.number("v"), Some(9.0));
    assert_eq!(run.number("tag"), Some(2.0));
}

// ===== faults =====

#[test]
fn test_division_by_zero_faults() {
    let err = run_code("x = 1\ny = x / 0").unwrap_err();
    assert!(err.to_string().contains("division by zero"), "{err}");
}

#[test]
fn test_type_mismatch_faults() {
    let err = run_code("x = 1 < 2\ny = x * 3").unwrap_err();
    assert!(err.to_string().starts_with("Runtime error"), "{err}");
}

#[test]
fn test_finished_state_and_empty_stack() {
    let run = run_code("x = 1\nx + 1\ny = x").unwrap();
    assert_eq!(run.state, VmState::Finished);
    assert!(run.vm.stack().is_empty());
    assert!(!run.vm.pc_trace().is_empty());
}
