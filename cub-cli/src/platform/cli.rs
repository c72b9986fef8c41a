//! Error display with source context

use cub_api::CubError;

/// Lines shown on each side of the error line
const CONTEXT_LINES: usize = 2;

pub fn print_error_with_source(e: &CubError, source: &str) {
    eprintln!("error[{}]: {}", e.phase().as_str(), e);
    if let Some((line, column)) = e.position_in(source) {
        print_source_context(source, line, column);
    }
}

pub fn print_source_context(source: &str, error_line: usize, error_col: usize) {
    if let Some(context) = source_context(source, error_line, error_col) {
        eprint!("{context}");
    }
}

/// Numbered lines around `error_line` with a caret under `error_col`
pub fn source_context(source: &str, error_line: usize, error_col: usize) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    if error_line == 0 || error_line > lines.len() {
        return None;
    }

    let start = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end = (error_line + CONTEXT_LINES).min(lines.len());
    let width = end.to_string().len();

    let mut out = String::new();
    for number in start..=end {
        out.push_str(&format!("{number:>width$} | {}\n", lines[number - 1]));
        if number == error_line {
            let marker = " ".repeat(error_col.saturating_sub(1));
            out.push_str(&format!("{} | {marker}^\n", " ".repeat(width)));
        }
    }
    Some(out)
}
