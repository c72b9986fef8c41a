//! Input/output types of the runner

use cub_core::{Compiler, Instruction, Value};

/// A compiled program together with the compiler that owns its symbol tables
pub struct CompileOutput {
    pub program: Vec<Instruction>,
    pub compiler: Compiler,
}

/// Render a value with struct members and functions named through `compiler`
pub fn describe_value(value: &Value, compiler: &Compiler) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Struct(members) => {
            let fields: Vec<String> = members
                .iter()
                .map(|(id, member)| {
                    let name = compiler
                        .member_name(*id)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("#{id}"));
                    let rendered = match member {
                        Value::String(s) => format!("{s:?}"),
                        other => describe_value(other, compiler),
                    };
                    format!("{name}: {rendered}")
                })
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
        Value::Function(id) => match compiler.function_signature(*id) {
            Some(signature) => format!("<function {}/{}>", signature.name, signature.arity()),
            None => format!("<function #{id}>"),
        },
        other => other.to_string(),
    }
}
