//! Math functions
//!
//! Unless noted otherwise, an error operand short-circuits the function and
//! the leftmost error is returned unchanged. Booleans count as 0/1.

use super::{finite, numbers};
use crudegraph_core::{ErrorKind, Value};

/// SUM function
pub fn fn_sum(args: &[Value]) -> Value {
    match numbers(args) {
        Ok(ns) => finite(ns.iter().sum()),
        Err(e) => Value::Error(e),
    }
}

/// AVERAGE function
pub fn fn_average(args: &[Value]) -> Value {
    match numbers(args) {
        Ok(ns) if ns.is_empty() => Value::from(ErrorKind::EmptyOperands),
        Ok(ns) => finite(ns.iter().sum::<f64>() / ns.len() as f64),
        Err(e) => Value::Error(e),
    }
}

/// MIN function
pub fn fn_min(args: &[Value]) -> Value {
    match numbers(args) {
        Ok(ns) => ns
            .into_iter()
            .reduce(f64::min)
            .map_or(Value::from(ErrorKind::EmptyOperands), finite),
        Err(e) => Value::Error(e),
    }
}

/// MAX function
pub fn fn_max(args: &[Value]) -> Value {
    match numbers(args) {
        Ok(ns) => ns
            .into_iter()
            .reduce(f64::max)
            .map_or(Value::from(ErrorKind::EmptyOperands), finite),
        Err(e) => Value::Error(e),
    }
}

/// PRODUCT function
pub fn fn_product(args: &[Value]) -> Value {
    match numbers(args) {
        Ok(ns) => finite(ns.iter().product()),
        Err(e) => Value::Error(e),
    }
}

/// SUMVALID function
///
/// Error-tolerant sum: error operands are skipped. `#EMPTY!` when nothing
/// is left to add.
pub fn fn_sumvalid(args: &[Value]) -> Value {
    let ns: Vec<f64> = args.iter().filter_map(Value::as_number).collect();
    if ns.is_empty() {
        Value::from(ErrorKind::EmptyOperands)
    } else {
        finite(ns.iter().sum())
    }
}

fn binary(args: &[Value], op: fn(f64, f64) -> Value) -> Value {
    match numbers(args) {
        Ok(ns) if ns.len() == 2 => op(ns[0], ns[1]),
        Ok(ns) => Value::error(
            ErrorKind::TypeMismatch,
            format!("expected 2 operands, got {}", ns.len()),
        ),
        Err(e) => Value::Error(e),
    }
}

fn unary(args: &[Value], op: fn(f64) -> Value) -> Value {
    match numbers(args) {
        Ok(ns) if ns.len() == 1 => op(ns[0]),
        Ok(ns) => Value::error(
            ErrorKind::TypeMismatch,
            format!("expected 1 operand, got {}", ns.len()),
        ),
        Err(e) => Value::Error(e),
    }
}

/// ADD(a, b)
pub fn fn_add(args: &[Value]) -> Value {
    binary(args, |a, b| finite(a + b))
}

/// SUB(a, b)
pub fn fn_sub(args: &[Value]) -> Value {
    binary(args, |a, b| finite(a - b))
}

/// MUL(a, b)
pub fn fn_mul(args: &[Value]) -> Value {
    binary(args, |a, b| finite(a * b))
}

/// DIV(a, b)
pub fn fn_div(args: &[Value]) -> Value {
    binary(args, |a, b| {
        if b == 0.0 {
            Value::from(ErrorKind::DivideByZero)
        } else {
            finite(a / b)
        }
    })
}

/// NEG(a)
pub fn fn_neg(args: &[Value]) -> Value {
    unary(args, |a| finite(-a))
}

/// POWER(base, exponent)
pub fn fn_power(args: &[Value]) -> Value {
    binary(args, |base, exponent| {
        if base == 0.0 && exponent < 0.0 {
            Value::from(ErrorKind::DivideByZero)
        } else {
            finite(base.powf(exponent))
        }
    })
}

/// SQRT(a)
pub fn fn_sqrt(args: &[Value]) -> Value {
    unary(args, |a| {
        if a < 0.0 {
            Value::error(ErrorKind::InvalidNumber, "square root of a negative number")
        } else {
            finite(a.sqrt())
        }
    })
}

/// ABS(a)
pub fn fn_abs(args: &[Value]) -> Value {
    unary(args, |a| finite(a.abs()))
}

/// ROUND(value, [digits])
///
/// Rounds half away from zero; digits are truncated toward zero and may be
/// negative. The scaled value is first snapped to 15 significant digits so
/// that decimal halves such as `1.005` round up.
pub fn fn_round(args: &[Value]) -> Value {
    let ns = match numbers(args) {
        Ok(ns) => ns,
        Err(e) => return Value::Error(e),
    };

    let value = match ns.first() {
        Some(v) => *v,
        None => return Value::error(ErrorKind::TypeMismatch, "ROUND requires a value"),
    };
    let digits = ns
        .get(1)
        .copied()
        .unwrap_or(0.0)
        .trunc()
        .clamp(-MAX_ROUND_DIGITS, MAX_ROUND_DIGITS) as i32;

    let factor = 10f64.powi(digits.abs());
    let scaled = if digits >= 0 { value * factor } else { value / factor };

    // Nothing below the rounding position survives at double precision
    if !scaled.is_finite() || scaled.abs() >= 1e15 {
        return Value::Number(value);
    }

    let rounded = snap_significant(scaled).round();
    let result = if digits >= 0 {
        rounded / factor
    } else {
        rounded * factor
    };
    finite(result)
}

const MAX_ROUND_DIGITS: f64 = 308.0;

/// Round to 15 significant digits, the precision spreadsheets display
fn snap_significant(n: f64) -> f64 {
    if n == 0.0 {
        return n;
    }
    let magnitude = n.abs().log10().floor() as i32;
    let precision = 10f64.powi(14 - magnitude);
    if !precision.is_finite() {
        return n;
    }
    (n * precision).round() / precision
}
