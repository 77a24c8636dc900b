//! C9 — Query Executor (spec §4.9).
//!
//! Storage-agnostic: operates over rows already materialized as
//! `serde_json::Value` by whatever assembled them from the repository
//! (modules, functions, CPG nodes, or call references, per `QuerySpec.from`
//! — spec §6 egress). Four phases run in order: filter (`where` clauses and,
//! for `CpgNodes`, the structural `cpg_pattern`), sort (`order_by`,
//! stable), paginate (`offset`/`limit`), project (`select`).
//!
//! Grounded on the teacher's query-executor tests under
//! `features/query_engine` (deleted during trimming — no runtime
//! counterpart survived in the teacher, only the test-shape convention of
//! driving a pure function off a closed spec struct) and on
//! `shared::models::query`'s already-complete `QuerySpec` schema.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use crate::errors::CoreError;
use crate::shared::models::{CompareOp, QuerySpec, Select, SortDirection, WhereClause};

/// Runs `spec` over `rows`, returning the projected, paginated result set.
pub fn execute(spec: &QuerySpec, mut rows: Vec<Value>) -> Result<Vec<Value>, CoreError> {
    rows = filter_rows(spec, rows)?;
    sort_rows(&mut rows, spec);
    rows = paginate(rows, spec.offset, spec.limit);
    Ok(rows.into_iter().map(|row| project(&row, &spec.select)).collect())
}

fn filter_rows(spec: &QuerySpec, rows: Vec<Value>) -> Result<Vec<Value>, CoreError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut keep = true;
        for clause in &spec.r#where {
            if !matches_where(&row, clause)? {
                keep = false;
                break;
            }
        }
        if keep {
            if let Some(pattern) = &spec.cpg_pattern {
                keep = matches_cpg_pattern(&row, pattern);
            }
        }
        if keep {
            out.push(row);
        }
    }
    Ok(out)
}

fn matches_cpg_pattern(row: &Value, pattern: &crate::shared::models::CpgPattern) -> bool {
    let node_ok = match &pattern.node_type {
        Some(expected) => get_field(row, "node_type").and_then(Value::as_str) == Some(expected.as_str()),
        None => true,
    };
    let edge_ok = match &pattern.edge_kind {
        Some(expected) => get_field(row, "edge_kind").and_then(Value::as_str) == Some(expected.as_str()),
        None => true,
    };
    node_ok && edge_ok
}

fn matches_where(row: &Value, clause: &WhereClause) -> Result<bool, CoreError> {
    let field = get_field(row, &clause.field_path);
    let matched = match clause.op {
        CompareOp::Eq => field.map(|f| f == &clause.value).unwrap_or(false),
        CompareOp::Neq => field.map(|f| f != &clause.value).unwrap_or(true),
        CompareOp::Lt => cmp_values(field, Some(&clause.value)) == Some(Ordering::Less),
        CompareOp::Lte => matches!(cmp_values(field, Some(&clause.value)), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => cmp_values(field, Some(&clause.value)) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(cmp_values(field, Some(&clause.value)), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::In => match (field, &clause.value) {
            (Some(f), Value::Array(candidates)) => candidates.iter().any(|c| c == f),
            _ => false,
        },
        CompareOp::Nin => match (field, &clause.value) {
            (Some(f), Value::Array(candidates)) => !candidates.iter().any(|c| c == f),
            _ => true,
        },
        CompareOp::Contains => match field {
            Some(Value::Array(items)) => items.iter().any(|i| i == &clause.value),
            Some(Value::String(s)) => clause.value.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
            _ => false,
        },
        CompareOp::StartsWith => match (field.and_then(Value::as_str), clause.value.as_str()) {
            (Some(s), Some(prefix)) => s.starts_with(prefix),
            _ => false,
        },
        CompareOp::EndsWith => match (field.and_then(Value::as_str), clause.value.as_str()) {
            (Some(s), Some(suffix)) => s.ends_with(suffix),
            _ => false,
        },
        CompareOp::MatchesRegex => match (field.and_then(Value::as_str), clause.value.as_str()) {
            (Some(s), Some(pattern)) => {
                let re = Regex::new(pattern).map_err(|e| CoreError::Query(format!("invalid regex {pattern:?}: {e}")))?;
                re.is_match(s)
            }
            _ => false,
        },
    };
    Ok(matched)
}

/// Dotted-path field lookup (`"a.b.0.c"`), descending through objects and,
/// for numeric segments, arrays.
fn get_field<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Option<Ordering> {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Some(Value::String(a)), Some(Value::String(b))) => Some(a.cmp(b)),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => Some(a.cmp(b)),
        _ => None,
    }
}

fn sort_rows(rows: &mut [Value], spec: &QuerySpec) {
    if spec.order_by.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for ob in &spec.order_by {
            let fa = get_field(a, &ob.field_path);
            let fb = get_field(b, &ob.field_path);
            let ord = cmp_values(fa, fb).unwrap_or(Ordering::Equal);
            let ord = match ob.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn paginate(rows: Vec<Value>, offset: Option<usize>, limit: Option<usize>) -> Vec<Value> {
    let skipped: Vec<Value> = match offset {
        Some(n) => rows.into_iter().skip(n).collect(),
        None => rows,
    };
    match limit {
        Some(n) => skipped.into_iter().take(n).collect(),
        None => skipped,
    }
}

fn project(row: &Value, select: &Select) -> Value {
    match select {
        Select::All => row.clone(),
        Select::Fields(fields) => {
            let mut out = serde_json::Map::new();
            for field in fields {
                if let Some(v) = get_field(row, field) {
                    out.insert(field.clone(), v.clone());
                }
            }
            Value::Object(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{OrderBy, QueryFrom};
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"name": "alpha", "complexity": 3}),
            json!({"name": "beta", "complexity": 9}),
            json!({"name": "gamma", "complexity": 1}),
        ]
    }

    #[test]
    fn eq_filters_rows() {
        let mut spec = QuerySpec::new(QueryFrom::Functions);
        spec.r#where = vec![WhereClause { field_path: "name".to_string(), op: CompareOp::Eq, value: json!("beta") }];
        let out = execute(&spec, rows()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "beta");
    }

    #[test]
    fn gt_filters_numerically() {
        let mut spec = QuerySpec::new(QueryFrom::Functions);
        spec.r#where = vec![WhereClause { field_path: "complexity".to_string(), op: CompareOp::Gt, value: json!(2) }];
        let out = execute(&spec, rows()).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn order_by_descending_sorts_stable() {
        let mut spec = QuerySpec::new(QueryFrom::Functions);
        spec.order_by = vec![OrderBy { field_path: "complexity".to_string(), direction: SortDirection::Descending }];
        let out = execute(&spec, rows()).unwrap();
        assert_eq!(out[0]["name"], "beta");
        assert_eq!(out[2]["name"], "gamma");
    }

    #[test]
    fn offset_and_limit_paginate() {
        let mut spec = QuerySpec::new(QueryFrom::Functions);
        spec.order_by = vec![OrderBy { field_path: "name".to_string(), direction: SortDirection::Ascending }];
        spec.offset = Some(1);
        spec.limit = Some(1);
        let out = execute(&spec, rows()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "beta");
    }

    #[test]
    fn select_fields_projects_subset() {
        let mut spec = QuerySpec::new(QueryFrom::Functions);
        spec.select = Select::Fields(vec!["name".to_string()]);
        let out = execute(&spec, rows()).unwrap();
        assert!(out[0].get("complexity").is_none());
        assert!(out[0].get("name").is_some());
    }

    #[test]
    fn invalid_regex_is_a_query_error() {
        let mut spec = QuerySpec::new(QueryFrom::Functions);
        spec.r#where = vec![WhereClause { field_path: "name".to_string(), op: CompareOp::MatchesRegex, value: json!("[") }];
        let err = execute(&spec, rows()).unwrap_err();
        assert_eq!(err.kind(), "query_error");
    }

    #[test]
    fn starts_with_matches_prefix() {
        let mut spec = QuerySpec::new(QueryFrom::Functions);
        spec.r#where = vec![WhereClause { field_path: "name".to_string(), op: CompareOp::StartsWith, value: json!("al") }];
        let out = execute(&spec, rows()).unwrap();
        assert_eq!(out.len(), 1);
    }
}
