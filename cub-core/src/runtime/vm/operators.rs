//! Arithmetic, boolean and comparison opcodes

use super::VmError;
use crate::runtime::bytecode::Opcode;
use crate::runtime::value::Value;

fn mismatch(opcode: Opcode, expected: &'static str, lhs: &Value, rhs: &Value) -> VmError {
    VmError::TypeMismatch {
        operation: opcode.name(),
        expected,
        found: format!("{} and {}", lhs.type_name(), rhs.type_name()),
    }
}

/// Apply a two-operand opcode
pub(crate) fn binary(opcode: Opcode, lhs: Value, rhs: Value) -> Result<Value, VmError> {
    match opcode {
        Opcode::Eq => return Ok(Value::Bool(lhs == rhs)),
        Opcode::Neq => return Ok(Value::Bool(lhs != rhs)),
        _ => {}
    }

    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (*a, *b);
            let value = match opcode {
                Opcode::Add => Value::Number(a + b),
                Opcode::Sub => Value::Number(a - b),
                Opcode::Mul => Value::Number(a * b),
                Opcode::Div if b == 0.0 => return Err(VmError::DivisionByZero),
                Opcode::Div => Value::Number(a / b),
                Opcode::Pow => Value::Number(a.powf(b)),
                Opcode::Lt => Value::Bool(a < b),
                Opcode::Le => Value::Bool(a <= b),
                Opcode::Gt => Value::Bool(a > b),
                Opcode::Ge => Value::Bool(a >= b),
                _ => return Err(mismatch(opcode, "booleans", &lhs, &rhs)),
            };
            Ok(value)
        }
        (Value::Bool(a), Value::Bool(b)) => match opcode {
            Opcode::And => Ok(Value::Bool(*a && *b)),
            Opcode::Or => Ok(Value::Bool(*a || *b)),
            _ => Err(mismatch(opcode, "numbers", &lhs, &rhs)),
        },
        (Value::String(a), Value::String(b)) => match opcode {
            Opcode::Add => Ok(Value::String(format!("{a}{b}"))),
            Opcode::Lt => Ok(Value::Bool(a < b)),
            Opcode::Le => Ok(Value::Bool(a <= b)),
            Opcode::Gt => Ok(Value::Bool(a > b)),
            Opcode::Ge => Ok(Value::Bool(a >= b)),
            _ => Err(mismatch(opcode, "numbers", &lhs, &rhs)),
        },
        // string concatenation formats the other side
        (Value::String(_), _) | (_, Value::String(_)) if opcode == Opcode::Add => {
            Ok(Value::String(format!("{lhs}{rhs}")))
        }
        _ => {
            let expected = match opcode {
                Opcode::And | Opcode::Or => "booleans",
                _ => "numbers",
            };
            Err(mismatch(opcode, expected, &lhs, &rhs))
        }
    }
}

pub(crate) fn not(value: Value) -> Result<Value, VmError> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(VmError::TypeMismatch {
            operation: Opcode::Not.name(),
            expected: "a boolean",
            found: other.type_name().to_string(),
        }),
    }
}
