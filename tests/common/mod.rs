//! Helpers for workspace-level end-to-end tests

#![allow(dead_code)]

use cub::{CubError, Runner, Value};

pub fn run(source: &str, name: &str) -> Result<Value, CubError> {
    Runner::default().run(source, name)
}

pub fn number(source: &str, name: &str) -> f64 {
    match run(source, name) {
        Ok(Value::Number(n)) => n,
        other => panic!("expected a number for '{name}', got {other:?}\n{source}"),
    }
}
