//! Terminal output

mod cli;

pub use cli::{print_error_with_source, print_source_context, source_context};
