//! Filter model: a disjunction of conjunctions of conditions over facts.
//!
//! Filters are plain values compared structurally, so re-deriving the same
//! filter from fresh UI input compares equal and downstream recomputation can
//! be skipped. `Filter::matches` is the in-memory reference semantics of the
//! SQL predicate produced by [`crate::query::compile_filter`].

use crate::country::Country;
use crate::error::{AtlasError, AtlasResult};
use crate::facts::{Fact, FactRegistry};
use atlas_types::{DomainValue, ValueRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The constraint a condition places on its fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValue {
    /// Value within `range`. An open lower bound admits countries with no
    /// value at all; the upper bound always applies.
    Numeric { range: ValueRange, lower_open: bool, upper_open: bool },
    /// Label is one of the set
    Categorical(BTreeSet<String>),
    Boolean(bool),
    /// No constraint
    None,
}

impl ConditionValue {
    pub fn is_active(&self) -> bool {
        !matches!(self, ConditionValue::None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub fact: Fact,
    pub value: ConditionValue,
}

impl Condition {
    pub fn new(fact: Fact, value: ConditionValue) -> Self {
        Self { fact, value }
    }

    /// Closed numeric range condition
    pub fn numeric(fact: Fact, lower: f64, upper: f64) -> Self {
        Self::new(
            fact,
            ConditionValue::Numeric {
                range: ValueRange::new(lower, upper),
                lower_open: false,
                upper_open: false,
            },
        )
    }

    /// Numeric range whose lower bound also admits unknown values
    pub fn numeric_lower_open(fact: Fact, lower: f64, upper: f64) -> Self {
        Self::new(
            fact,
            ConditionValue::Numeric {
                range: ValueRange::new(lower, upper),
                lower_open: true,
                upper_open: false,
            },
        )
    }

    pub fn matches(&self, country: &Country) -> bool {
        let value = country.value(&self.fact);
        match &self.value {
            ConditionValue::None => true,
            ConditionValue::Numeric { range, lower_open, .. } => {
                match value.and_then(DomainValue::as_f64) {
                    None => *lower_open,
                    Some(v) if *lower_open => v <= range.upper,
                    Some(v) => v >= range.lower && v <= range.upper,
                }
            }
            ConditionValue::Categorical(labels) => {
                value.and_then(DomainValue::as_label).is_some_and(|label| labels.contains(label))
            }
            ConditionValue::Boolean(expected) => {
                value.and_then(DomainValue::as_f64).is_some_and(|v| (v != 0.0) == *expected)
            }
        }
    }
}

/// Conditions joined by AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conjunction {
    pub conditions: Vec<Condition>,
}

impl Conjunction {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// Conditions that constrain anything
    pub fn active_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(|c| c.value.is_active())
    }

    pub fn is_empty(&self) -> bool {
        self.active_conditions().next().is_none()
    }

    pub fn matches(&self, country: &Country) -> bool {
        self.active_conditions().all(|c| c.matches(country))
    }
}

/// Conjunctions joined by OR
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conjunctions: Vec<Conjunction>,
}

impl Filter {
    /// The filter that matches every country
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(conjunctions: Vec<Conjunction>) -> Self {
        Self { conjunctions }
    }

    /// A filter made of a single condition
    pub fn single(condition: Condition) -> Self {
        Self::new(vec![Conjunction::new(vec![condition])])
    }

    /// Conjunctions that survive compilation. Conjunctions without active
    /// conditions are dropped from the disjunction rather than matching all.
    pub fn usable_conjunctions(&self) -> impl Iterator<Item = &Conjunction> {
        self.conjunctions.iter().filter(|c| !c.is_empty())
    }

    pub fn is_match_all(&self) -> bool {
        self.usable_conjunctions().next().is_none()
    }

    pub fn matches(&self, country: &Country) -> bool {
        self.is_match_all() || self.usable_conjunctions().any(|c| c.matches(country))
    }
}

/// Serialized form of a filter, naming facts by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub conjunctions: Vec<ConjunctionSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConjunctionSpec {
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub fact: String,
    pub value: ConditionValue,
}

impl FilterSpec {
    pub fn from_json(text: &str) -> AtlasResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Bind fact ids against the registry
    pub fn resolve(&self, registry: &FactRegistry) -> AtlasResult<Filter> {
        let conjunctions = self
            .conjunctions
            .iter()
            .map(|conjunction| {
                let conditions = conjunction
                    .conditions
                    .iter()
                    .map(|spec| {
                        let fact = registry.get(&spec.fact).ok_or_else(|| {
                            AtlasError::shape_for_fact(&spec.fact, format!("Filter names unknown fact '{}'", spec.fact))
                        })?;
                        Ok(Condition::new(fact.clone(), spec.value.clone()))
                    })
                    .collect::<AtlasResult<Vec<_>>>()?;
                Ok(Conjunction::new(conditions))
            })
            .collect::<AtlasResult<Vec<_>>>()?;

        Ok(Filter::new(conjunctions))
    }
}

impl From<&Filter> for FilterSpec {
    fn from(filter: &Filter) -> Self {
        Self {
            conjunctions: filter
                .conjunctions
                .iter()
                .map(|conjunction| ConjunctionSpec {
                    conditions: conjunction
                        .conditions
                        .iter()
                        .map(|c| ConditionSpec { fact: c.fact.id().to_string(), value: c.value.clone() })
                        .collect(),
                })
                .collect(),
        }
    }
}
