//! Expression evaluation against a single row.
//!
//! Evaluation is a pure function of the expression, the row and its schema.
//! Column references are checked once per statement with [validate] before
//! any row is scanned; [evaluate] then resolves them by exact name.

use std::cmp::Ordering;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{Error, Result};
use crate::table::Schema;
use crate::value::Value;

/// Fails with a semantic error if `expr` references a column missing from `schema`.
pub fn validate(expr: &Expr, schema: &Schema) -> Result<()> {
    for name in expr.column_refs() {
        schema.resolve(name)?;
    }
    Ok(())
}

/// Evaluates `expr` with `row` bound to the columns of `schema`.
pub fn evaluate(expr: &Expr, row: &[Value], schema: &Schema) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Column(name) => {
            let idx = schema.resolve(name)?;
            row.get(idx).cloned().ok_or_else(|| {
                Error::semantic(format!("row has no value for column {name}"))
            })
        }
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, row, schema)?;
            evaluate_unary(*op, value)
        }
        Expr::Binary { left, op, right } => match op {
            BinaryOp::And => evaluate_and(left, right, row, schema),
            BinaryOp::Or => evaluate_or(left, right, row, schema),
            _ => {
                let left = evaluate(left, row, schema)?;
                let right = evaluate(right, row, schema)?;
                evaluate_binary(*op, &left, &right)
            }
        },
        Expr::IsNull { expr, negated } => {
            let value = evaluate(expr, row, schema)?;
            Ok(Value::Boolean(value.is_null() != *negated))
        }
    }
}

/// Evaluates an expression that has no row binding, such as a `VALUES` item.
pub fn evaluate_constant(expr: &Expr) -> Result<Value> {
    if let Some(name) = expr.column_refs().first() {
        return Err(Error::semantic(format!(
            "column {name} cannot be referenced here"
        )));
    }
    evaluate(expr, &[], &Schema::new(vec![]))
}

/// Evaluates a `WHERE` predicate: only `TRUE` keeps the row.
pub fn matches(predicate: Option<&Expr>, row: &[Value], schema: &Schema) -> Result<bool> {
    match predicate {
        None => Ok(true),
        Some(expr) => match evaluate(expr, row, schema)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(Error::type_error(format!(
                "WHERE clause must be BOOLEAN, got {}",
                other.type_name()
            ))),
        },
    }
}

/// Interprets a value as a three-valued truth: `None` is unknown.
fn truth(value: &Value, context: &str) -> Result<Option<bool>> {
    match value {
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(Error::type_error(format!(
            "{context} expects BOOLEAN operands, got {}",
            other.type_name()
        ))),
    }
}

fn truth_value(truth: Option<bool>) -> Value {
    truth.map_or(Value::Null, Value::Boolean)
}

fn evaluate_and(left: &Expr, right: &Expr, row: &[Value], schema: &Schema) -> Result<Value> {
    let l = truth(&evaluate(left, row, schema)?, "AND")?;
    if l == Some(false) {
        return Ok(Value::Boolean(false));
    }
    let r = truth(&evaluate(right, row, schema)?, "AND")?;
    Ok(match (l, r) {
        (_, Some(false)) => Value::Boolean(false),
        (Some(true), Some(true)) => Value::Boolean(true),
        _ => Value::Null,
    })
}

fn evaluate_or(left: &Expr, right: &Expr, row: &[Value], schema: &Schema) -> Result<Value> {
    let l = truth(&evaluate(left, row, schema)?, "OR")?;
    if l == Some(true) {
        return Ok(Value::Boolean(true));
    }
    let r = truth(&evaluate(right, row, schema)?, "OR")?;
    Ok(match (l, r) {
        (_, Some(true)) => Value::Boolean(true),
        (Some(false), Some(false)) => Value::Boolean(false),
        _ => Value::Null,
    })
}

fn evaluate_unary(op: UnaryOp, value: Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(truth_value(truth(&value, "NOT")?.map(|b| !b))),
        UnaryOp::Negate => match value {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| Error::Arithmetic(format!("integer overflow negating {i}"))),
            other => Err(Error::type_error(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
    }
}

fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    if op.is_comparison() {
        let ordering = left.compare(right)?;
        return Ok(truth_value(ordering.map(|ord| compare_holds(op, ord))));
    }

    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => arithmetic(op, *l, *r).map(Value::Integer),
        (Value::Null, Value::Integer(_) | Value::Null) | (Value::Integer(_), Value::Null) => {
            Ok(Value::Null)
        }
        _ => Err(Error::type_error(format!(
            "operator {op} expects INTEGER operands, got {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn compare_holds(op: BinaryOp, ord: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::NotEq => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::LtEq => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::GtEq => ord != Ordering::Less,
        _ => false,
    }
}

/// Checked `i64` arithmetic: overflow and division by zero are errors.
fn arithmetic(op: BinaryOp, l: i64, r: i64) -> Result<i64> {
    let result = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(Error::Arithmetic("division by zero".into()));
            }
            l.checked_div(r)
        }
        _ => {
            return Err(Error::type_error(format!(
                "operator {op} is not arithmetic"
            )));
        }
    };
    result.ok_or_else(|| Error::Arithmetic(format!("integer overflow in {l} {op} {r}")))
}
