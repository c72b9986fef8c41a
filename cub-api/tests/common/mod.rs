//! Shared helpers for cub-api integration tests

#![allow(dead_code)]

use cub_api::{CubError, RunConfig, Runner, Value};
use cub_log::{Level, LogRingBuffer, Logger};
use std::sync::Arc;

pub fn run(source: &str, name: &str) -> Result<Value, CubError> {
    Runner::default().run(source, name)
}

pub fn number(source: &str, name: &str) -> f64 {
    match run(source, name) {
        Ok(Value::Number(n)) => n,
        other => panic!("expected a number for '{name}', got {other:?}"),
    }
}

/// Runner whose logs land in the returned ring buffer
pub fn logged_runner(level: Level) -> (Runner, Arc<LogRingBuffer>) {
    let ring = LogRingBuffer::new(1024);
    let logger = Logger::new(level).with_sink(ring.clone());
    let config = RunConfig {
        logger,
        ..RunConfig::default()
    };
    (Runner::new(config), ring)
}
