//! The built-in operator catalog.

use crate::sql::expr::{lit_bool, lit_str, unsatisfiable, Expr, ExprExt};
use crate::types::{DataType, Value};

use super::Operator;

/// Escape character used in every generated LIKE pattern.
const LIKE_ESCAPE: char = '\\';

pub(super) fn catalog() -> Vec<Operator> {
    vec![
        Operator::new("$eq", 1, |c, t, a| compare(c, t, a, ExprExt::eq)),
        Operator::new("$ne", 1, |c, t, a| compare(c, t, a, ExprExt::ne)),
        Operator::new("$gt", 1, |c, t, a| compare(c, t, a, ExprExt::gt)),
        Operator::new("$lt", 1, |c, t, a| compare(c, t, a, ExprExt::lt)),
        Operator::new("$gte", 1, |c, t, a| compare(c, t, a, ExprExt::gte)),
        Operator::new("$lte", 1, |c, t, a| compare(c, t, a, ExprExt::lte)),
        Operator::new("$starts", 1, |c, t, a| pattern(c, t, a, Pattern::Prefix)),
        Operator::new("$ends", 1, |c, t, a| pattern(c, t, a, Pattern::Suffix)),
        Operator::new("$cont", 1, |c, t, a| pattern(c, t, a, Pattern::Contains)),
        Operator::new("$excl", 1, |c, t, a| pattern(c, t, a, Pattern::Excludes)),
        Operator::new("$in", 1, |c, t, a| membership(c, t, a, false)),
        Operator::new("$notin", 1, |c, t, a| membership(c, t, a, true)),
        Operator::new("$isnull", 0, |c, _, _| c.clone().is_null()),
        Operator::new("$notnull", 0, |c, _, _| c.clone().is_not_null()),
        Operator::new("$istrue", 0, |c, t, _| truth(c, t, true)),
        Operator::new("$isfalse", 0, |c, t, _| truth(c, t, false)),
        Operator::new("$between", 2, between),
    ]
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

/// Coerce the first argument of a non-array column.
fn scalar_arg(data_type: DataType, args: &[String]) -> Option<Value> {
    if data_type.is_array() {
        return None;
    }
    args.first().and_then(|raw| data_type.coerce(raw))
}

fn compare(column: &Expr, data_type: DataType, args: &[String], op: fn(Expr, Expr) -> Expr) -> Expr {
    match scalar_arg(data_type, args) {
        Some(value) => op(column.clone(), value.to_expr()),
        None => unsatisfiable(),
    }
}

#[derive(Clone, Copy)]
enum Pattern {
    Prefix,
    Suffix,
    Contains,
    Excludes,
}

fn pattern(column: &Expr, data_type: DataType, args: &[String], kind: Pattern) -> Expr {
    let textual = data_type.scalar().is_some_and(|s| s.is_textual());
    let Some(arg) = args.first().filter(|_| textual) else {
        return unsatisfiable();
    };

    let escaped = escape_like(arg);
    let column = column.clone();
    match kind {
        Pattern::Prefix => column.like_escape(lit_str(&format!("{}%", escaped)), LIKE_ESCAPE),
        Pattern::Suffix => column.like_escape(lit_str(&format!("%{}", escaped)), LIKE_ESCAPE),
        Pattern::Contains => column.like_escape(lit_str(&format!("%{}%", escaped)), LIKE_ESCAPE),
        Pattern::Excludes => {
            column.not_like_escape(lit_str(&format!("%{}%", escaped)), LIKE_ESCAPE)
        }
    }
}

fn membership(column: &Expr, data_type: DataType, args: &[String], negated: bool) -> Expr {
    if data_type.is_array() || args.is_empty() {
        return unsatisfiable();
    }
    let Some(values) = data_type.coerce_all(args) else {
        return unsatisfiable();
    };

    let values = values.iter().map(Value::to_expr).collect();
    if negated {
        column.clone().not_in_list(values)
    } else {
        column.clone().in_list(values)
    }
}

fn truth(column: &Expr, data_type: DataType, expected: bool) -> Expr {
    if data_type == DataType::BOOL {
        column.clone().eq(lit_bool(expected))
    } else {
        unsatisfiable()
    }
}

fn between(column: &Expr, data_type: DataType, args: &[String]) -> Expr {
    if data_type.is_array() {
        return unsatisfiable();
    }
    let low = args.first().and_then(|raw| data_type.coerce(raw));
    let high = args.get(1).and_then(|raw| data_type.coerce(raw));
    match (low, high) {
        (Some(low), Some(high)) => column.clone().between(low, high),
        _ => unsatisfiable(),
    }
}
