//! Compiles filters into SQL predicates against the `country` table.
//!
//! Column naming is fixed for compatibility with existing databases: a fact
//! with id `F` lives in column `country_<lowercase(F)>`. Bounds are bound as
//! positional parameters; the clause text is otherwise the plain shape
//! `SELECT country_id FROM country WHERE (...) OR (...)`.

use crate::error::{AtlasError, AtlasResult};
use crate::facts::{Fact, NumericFact};
use crate::filter::{Condition, ConditionValue, Filter};
use atlas_types::{FactAtom, FactKind};
use tracing::debug;

pub const TABLE_NAME: &str = "country";
pub const ID_COLUMN: &str = "country_id";
pub const COLUMN_PREFIX: &str = "country_";

/// Storage column for a fact id
pub fn column_for(fact_id: &str) -> String {
    format!("{COLUMN_PREFIX}{}", fact_id.to_lowercase())
}

/// A single SQL cell, used for both bound parameters and result rows
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Real(r) => Some(*r),
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Null => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Interpret the cell as a country id
    pub fn to_id(&self) -> Option<String> {
        match self {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

/// SQL text with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// A compiled WHERE clause. `clause == None` matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub clause: Option<String>,
    pub params: Vec<SqlValue>,
}

impl Predicate {
    pub fn is_match_all(&self) -> bool {
        self.clause.is_none()
    }
}

/// Compile one condition into a parenthesized fragment.
///
/// `ConditionValue::None` yields `Ok(None)`. Only constant numeric facts are
/// compiled; anything else is a shape error.
pub fn compile_condition(condition: &Condition) -> AtlasResult<Option<Predicate>> {
    let fact = &condition.fact;
    if !condition.value.is_active() {
        return Ok(None);
    }

    match fact.kind() {
        FactKind::Constant(FactAtom::Numeric) => {
            let column = fact.column_name();
            let ConditionValue::Numeric { range, lower_open, .. } = &condition.value else {
                return Err(AtlasError::shape_for_fact(
                    fact.id(),
                    format!(
                        "Condition fact type {} and condition value {:?} are not matching",
                        fact.kind(),
                        condition.value
                    ),
                ));
            };

            let mut clause = String::new();
            let mut params = Vec::with_capacity(2);
            if *lower_open {
                clause.push_str(&format!("{column} IS NULL OR "));
            } else {
                clause.push_str(&format!("{column} >= ? AND "));
                params.push(SqlValue::Real(range.lower));
            }
            clause.push_str(&format!("{column} <= ?"));
            params.push(SqlValue::Real(range.upper));

            Ok(Some(Predicate { clause: Some(format!("({clause})")), params }))
        }
        kind => Err(AtlasError::shape_for_fact(
            fact.id(),
            format!("Condition of fact type {kind} cannot be converted"),
        )),
    }
}

/// OR over conjunctions, AND within each; conjunctions without active
/// conditions are dropped.
pub fn compile_filter(filter: &Filter) -> AtlasResult<Predicate> {
    let mut disjuncts = Vec::new();
    let mut params = Vec::new();

    for conjunction in &filter.conjunctions {
        let mut fragments = Vec::new();
        for condition in &conjunction.conditions {
            if let Some(fragment) = compile_condition(condition)? {
                fragments.extend(fragment.clause);
                params.extend(fragment.params);
            }
        }
        if !fragments.is_empty() {
            disjuncts.push(format!("({})", fragments.join(" AND ")));
        }
    }

    if disjuncts.is_empty() {
        return Ok(Predicate::default());
    }
    Ok(Predicate { clause: Some(disjuncts.join(" OR ")), params })
}

/// `SELECT country_id FROM country [WHERE ...]`
pub fn select_ids_query(filter: &Filter) -> AtlasResult<SqlQuery> {
    let predicate = compile_filter(filter)?;
    let sql = match &predicate.clause {
        Some(clause) => format!("SELECT {ID_COLUMN} FROM {TABLE_NAME} WHERE {clause}"),
        None => format!("SELECT {ID_COLUMN} FROM {TABLE_NAME}"),
    };
    debug!(sql = %sql, params = predicate.params.len(), "Compiled id query");
    Ok(SqlQuery { sql, params: predicate.params })
}

/// Single-row fetch of the given fact columns, in the given order
pub fn hydrate_query(facts: &[&Fact], id: &str) -> SqlQuery {
    let columns: Vec<String> =
        std::iter::once(ID_COLUMN.to_string()).chain(facts.iter().map(|f| f.column_name())).collect();
    SqlQuery {
        sql: format!("SELECT {} FROM {TABLE_NAME} WHERE {ID_COLUMN} = ?", columns.join(", ")),
        params: vec![SqlValue::Text(id.to_string())],
    }
}

/// Whole-set rank query, ascending by value, absent values excluded
pub fn rank_query(fact: &NumericFact) -> SqlQuery {
    let column = column_for(&fact.id);
    SqlQuery {
        sql: format!(
            "SELECT {ID_COLUMN}, {column} FROM {TABLE_NAME} WHERE {column} NOT NULL ORDER BY {column} ASC"
        ),
        params: Vec::new(),
    }
}
