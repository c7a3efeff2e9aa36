//! Compiles a parsed filter into a parameterized SQL predicate.
//!
//! `eq`/`ne` on nullable fields compile to SQLite's null-safe `IS`/`IS NOT`,
//! so `ne` keeps rows holding NULL. On those fields the value `null` (any
//! case) matches NULL itself. Ordering comparators follow SQL three-valued
//! logic and never match NULL.

use super::parser::{Clause, Comparator, FilterExpr};
use super::FilterError;
use crate::config::FilterOptions;
use crate::model::entity::{
    resolve_field, Entity, FieldKind, FieldSpec, FieldValue, DELETED_COLUMN,
};
use rusqlite::types::Value;

/// `WHERE` fragment plus positional parameters, scoped to one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    sql: String,
    params: Vec<Value>,
}

impl Predicate {
    /// Default read scope: rows not soft-deleted.
    pub fn active_only() -> Self {
        Self {
            sql: format!("{} = 0", quote_ident(DELETED_COLUMN)),
            params: Vec::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Binds `expr` against `E`'s fields and AND-s every clause together.
///
/// Adds `deleted = 0` unless some clause filters on `deleted` itself.
pub fn compile<E: Entity>(
    expr: &FilterExpr,
    options: FilterOptions,
) -> Result<Predicate, FilterError> {
    let mut conditions = Vec::with_capacity(expr.clauses().len() + 1);
    let mut params = Vec::with_capacity(expr.clauses().len());

    if !expr.targets_field(DELETED_COLUMN) {
        conditions.push(Predicate::active_only().sql);
    }

    for clause in expr.clauses() {
        let spec = resolve_field::<E>(&clause.field).ok_or_else(|| FilterError::UnknownField {
            clause: clause.source().to_string(),
            entity: E::TYPE_NAME,
            field: clause.field.clone(),
        })?;
        let (condition, param) = compile_clause(clause, &spec, options)?;
        conditions.push(condition);
        params.push(param);
    }

    Ok(Predicate {
        sql: conditions.join(" AND "),
        params,
    })
}

fn compile_clause(
    clause: &Clause,
    spec: &FieldSpec,
    options: FilterOptions,
) -> Result<(String, Value), FilterError> {
    let column = quote_ident(spec.name);
    let unsupported = || FilterError::UnsupportedComparator {
        clause: clause.source().to_string(),
        field: clause.field.clone(),
        comparator: clause.comparator,
        kind: spec.kind,
    };

    if clause.comparator == Comparator::Like {
        if spec.kind != FieldKind::Text {
            return Err(unsupported());
        }
        return Ok(if options.case_sensitive_like {
            (
                format!("instr({column}, ?) > 0"),
                Value::Text(clause.value.clone()),
            )
        } else {
            (
                format!("{column} LIKE ? ESCAPE '\\'"),
                Value::Text(format!("%{}%", escape_like(&clause.value))),
            )
        });
    }

    if clause.comparator.is_ordering() && spec.kind == FieldKind::Bool {
        return Err(unsupported());
    }

    let null_safe =
        spec.nullable && matches!(clause.comparator, Comparator::Eq | Comparator::Ne);
    if null_safe && is_null_literal(&clause.value) {
        return Ok((
            format!("{column} {} ?", null_safe_operator(clause.comparator)),
            Value::Null,
        ));
    }

    let value = FieldValue::parse_as(spec.kind, &clause.value).ok_or_else(|| {
        FilterError::InvalidValue {
            clause: clause.source().to_string(),
            field: clause.field.clone(),
            expected: spec.kind,
        }
    })?;

    let operator = if null_safe {
        null_safe_operator(clause.comparator)
    } else {
        sql_operator(clause.comparator)
    };
    Ok((format!("{column} {operator} ?"), value.into_sql_value()))
}

fn is_null_literal(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("null")
}

fn null_safe_operator(comparator: Comparator) -> &'static str {
    match comparator {
        Comparator::Ne => "IS NOT",
        _ => "IS",
    }
}

fn sql_operator(comparator: Comparator) -> &'static str {
    match comparator {
        Comparator::Eq => "=",
        Comparator::Ne => "!=",
        Comparator::Lt => "<",
        Comparator::Le => "<=",
        Comparator::Gt => ">",
        Comparator::Ge => ">=",
        Comparator::Like => "LIKE",
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}
