//! Logical functions

use super::numbers;
use crudegraph_core::{CellError, ErrorKind, Value};

/// Truthiness of a condition operand
///
/// Booleans are used as-is. Numbers are truthy when nonzero (spreadsheet
/// compatibility); NaN has no truth value and is a `#VALUE!`.
fn truthiness(value: &Value) -> Result<bool, CellError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Number(n) if n.is_nan() => Err(CellError::new(
            ErrorKind::TypeMismatch,
            "condition is not a number",
        )),
        Value::Number(n) => Ok(*n != 0.0),
        Value::Error(e) => Err(e.clone()),
    }
}

/// IF / SELECT function
///
/// Only the chosen branch is returned, so an error in the other branch does
/// not leak into the result. A missing `else` branch yields FALSE.
pub fn fn_select(args: &[Value]) -> Value {
    let condition = match args.first() {
        Some(condition) => condition,
        None => return Value::error(ErrorKind::TypeMismatch, "IF requires a condition"),
    };

    match truthiness(condition) {
        Ok(true) => args.get(1).cloned().unwrap_or(Value::Boolean(true)),
        Ok(false) => args.get(2).cloned().unwrap_or(Value::Boolean(false)),
        Err(e) => Value::Error(e),
    }
}

/// AND function
pub fn fn_and(args: &[Value]) -> Value {
    let mut result = true;
    for arg in args {
        match truthiness(arg) {
            Ok(b) => result &= b,
            Err(e) => return Value::Error(e),
        }
    }
    Value::Boolean(result)
}

/// OR function
pub fn fn_or(args: &[Value]) -> Value {
    let mut result = false;
    for arg in args {
        match truthiness(arg) {
            Ok(b) => result |= b,
            Err(e) => return Value::Error(e),
        }
    }
    Value::Boolean(result)
}

/// NOT function
pub fn fn_not(args: &[Value]) -> Value {
    match args.first().map(truthiness) {
        Some(Ok(b)) => Value::Boolean(!b),
        Some(Err(e)) => Value::Error(e),
        None => Value::error(ErrorKind::TypeMismatch, "NOT requires 1 argument"),
    }
}

/// IFERROR(value, value_if_error)
///
/// Error-tolerant: the first operand's error does not propagate.
pub fn fn_iferror(args: &[Value]) -> Value {
    match (args.first(), args.get(1)) {
        (Some(Value::Error(_)), Some(fallback)) => fallback.clone(),
        (Some(value), _) => value.clone(),
        (None, _) => Value::error(ErrorKind::TypeMismatch, "IFERROR requires 2 arguments"),
    }
}

/// ISERROR(value)
pub fn fn_iserror(args: &[Value]) -> Value {
    Value::Boolean(args.first().map_or(false, Value::is_error))
}

fn compare(args: &[Value], op: fn(f64, f64) -> bool) -> Value {
    match numbers(args) {
        Ok(ns) if ns.len() == 2 => Value::Boolean(op(ns[0], ns[1])),
        Ok(_) => Value::error(ErrorKind::TypeMismatch, "comparison requires 2 arguments"),
        Err(e) => Value::Error(e),
    }
}

/// GT(a, b): a > b
pub fn fn_gt(args: &[Value]) -> Value {
    compare(args, |a, b| a > b)
}

/// GE(a, b): a >= b
pub fn fn_ge(args: &[Value]) -> Value {
    compare(args, |a, b| a >= b)
}

/// LT(a, b): a < b
pub fn fn_lt(args: &[Value]) -> Value {
    compare(args, |a, b| a < b)
}

/// LE(a, b): a <= b
pub fn fn_le(args: &[Value]) -> Value {
    compare(args, |a, b| a <= b)
}

/// EQ(a, b): a == b
pub fn fn_eq(args: &[Value]) -> Value {
    compare(args, |a, b| a == b)
}

/// NE(a, b): a != b
pub fn fn_ne(args: &[Value]) -> Value {
    compare(args, |a, b| a != b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(kind: ErrorKind) -> Value {
        Value::from(kind)
    }

    #[test]
    fn test_select_boolean_condition() {
        let args = [Value::Boolean(true), Value::Number(3.0), Value::Number(10.0)];
        assert_eq!(fn_select(&args), Value::Number(3.0));

        let args = [Value::Boolean(false), Value::Number(3.0), Value::Number(10.0)];
        assert_eq!(fn_select(&args), Value::Number(10.0));
    }

    #[test]
    fn test_select_numeric_condition() {
        // Zero is falsy, anything else truthy
        let args = [Value::Number(0.0), Value::Number(3.0), Value::Number(10.0)];
        assert_eq!(fn_select(&args), Value::Number(10.0));

        let args = [Value::Number(-0.5), Value::Number(3.0), Value::Number(10.0)];
        assert_eq!(fn_select(&args), Value::Number(3.0));

        let args = [Value::Number(f64::NAN), Value::Number(3.0), Value::Number(10.0)];
        assert_eq!(fn_select(&args).error_kind(), Some(ErrorKind::TypeMismatch));
    }

    #[test]
    fn test_select_error_condition() {
        let args = [err(ErrorKind::NotAvailable), Value::Number(3.0), Value::Number(10.0)];
        assert_eq!(fn_select(&args).error_kind(), Some(ErrorKind::NotAvailable));
    }

    #[test]
    fn test_select_unchosen_branch_error_is_ignored() {
        let args = [Value::Boolean(true), Value::Number(3.0), err(ErrorKind::DivideByZero)];
        assert_eq!(fn_select(&args), Value::Number(3.0));
    }

    #[test]
    fn test_select_missing_else() {
        let args = [Value::Boolean(false), Value::Number(3.0)];
        assert_eq!(fn_select(&args), Value::Boolean(false));
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(
            fn_and(&[Value::Boolean(true), Value::Number(2.0)]),
            Value::Boolean(true)
        );
        assert_eq!(
            fn_and(&[Value::Boolean(true), Value::Number(0.0)]),
            Value::Boolean(false)
        );
        assert_eq!(
            fn_or(&[Value::Boolean(false), Value::Number(0.0)]),
            Value::Boolean(false)
        );
        assert_eq!(
            fn_or(&[Value::Number(0.0), err(ErrorKind::Domain)]).error_kind(),
            Some(ErrorKind::Domain)
        );
        assert_eq!(fn_not(&[Value::Number(0.0)]), Value::Boolean(true));
    }

    #[test]
    fn test_iferror() {
        let args = [err(ErrorKind::DivideByZero), Value::Number(0.0)];
        assert_eq!(fn_iferror(&args), Value::Number(0.0));

        let args = [Value::Number(7.0), Value::Number(0.0)];
        assert_eq!(fn_iferror(&args), Value::Number(7.0));

        assert_eq!(fn_iserror(&[err(ErrorKind::NotAvailable)]), Value::Boolean(true));
        assert_eq!(fn_iserror(&[Value::Number(1.0)]), Value::Boolean(false));
    }

    #[test]
    fn test_comparisons() {
        let args = [Value::Number(2.0), Value::Number(1.0)];
        assert_eq!(fn_gt(&args), Value::Boolean(true));
        assert_eq!(fn_ge(&args), Value::Boolean(true));
        assert_eq!(fn_lt(&args), Value::Boolean(false));
        assert_eq!(fn_le(&args), Value::Boolean(false));
        assert_eq!(fn_eq(&args), Value::Boolean(false));
        assert_eq!(fn_ne(&args), Value::Boolean(true));

        // Booleans coerce to 0/1
        assert_eq!(
            fn_eq(&[Value::Boolean(true), Value::Number(1.0)]),
            Value::Boolean(true)
        );
    }
}
