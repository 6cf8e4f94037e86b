//! JSON encoding of values (requires the `serde` feature)

use crudegraph_core::{CellName, ErrorKind, Operand, Value};

#[test]
fn test_value_json_shape() {
    let v: Value = serde_json::from_str("1.5").unwrap();
    assert_eq!(v, Value::Number(1.5));

    let v: Value = serde_json::from_str("true").unwrap();
    assert_eq!(v, Value::Boolean(true));

    let v: Value = serde_json::from_str(r#"{"error": "DivideByZero"}"#).unwrap();
    assert_eq!(v.error_kind(), Some(ErrorKind::DivideByZero));

    let v: Value = serde_json::from_str(r##"{"error": "#N/A", "message": "no data"}"##).unwrap();
    assert_eq!(v, Value::error(ErrorKind::NotAvailable, "no data"));
    assert_eq!(
        serde_json::to_string(&v).unwrap(),
        r##"{"error":"#N/A","message":"no data"}"##
    );
}

#[test]
fn test_cell_name_is_a_plain_string() {
    let name: CellName = serde_json::from_str(r#""sulfur_wt""#).unwrap();
    assert_eq!(name.as_str(), "sulfur_wt");
    assert_eq!(serde_json::to_string(&name).unwrap(), r#""sulfur_wt""#);
}

#[test]
fn test_operands_from_json() {
    let operands: Vec<Operand> = serde_json::from_str(r#"["feed_rate", 2.5, true]"#).unwrap();
    assert_eq!(
        operands,
        vec![
            Operand::cell("feed_rate"),
            Operand::Literal(Value::Number(2.5)),
            Operand::Literal(Value::Boolean(true)),
        ]
    );
}
