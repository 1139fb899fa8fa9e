//! Fact descriptors and the fact registry
//!
//! A fact is a typed, named attribute of a country. The registry holds a
//! heterogeneous, ordered list of facts as a closed enum; callers needing
//! kind-specific fields recover the concrete descriptor with a pattern match
//! that yields `None` on a kind mismatch.

use crate::error::{AtlasError, AtlasResult};
use crate::query::column_for;
use atlas_types::{
    Alignment, DomainValue, FactAtom, FactKind, FormattedValue, Temporality, format_abbreviated,
    format_truncated,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use tracing::info;

/// Display precision used when a numeric fact does not set one
pub const DEFAULT_ROUND_DIGITS: u32 = 2;

/// Where a fact is offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactUsage {
    pub filter: bool,
    pub map: bool,
    pub table: bool,
}

impl Default for FactUsage {
    fn default() -> Self {
        Self { filter: true, map: true, table: true }
    }
}

/// Descriptor of a numeric fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericFact {
    pub id: String,
    #[serde(default)]
    pub temporality: Temporality,
    /// Treat the value space as ranks rather than a linear interval
    #[serde(default)]
    pub distribute_by_rank: bool,
    /// Truncation precision for display
    #[serde(default)]
    pub round_digits: Option<u32>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Format with K/M/B suffixes
    #[serde(default)]
    pub abbreviate: bool,
    /// Display hint only
    #[serde(default)]
    pub column_width: Option<u32>,
    #[serde(default)]
    pub usage: FactUsage,
}

impl NumericFact {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            temporality: Temporality::Constant,
            distribute_by_rank: false,
            round_digits: None,
            unit: None,
            abbreviate: false,
            column_width: None,
            usage: FactUsage::default(),
        }
    }

    #[must_use]
    pub fn by_rank(mut self) -> Self {
        self.distribute_by_rank = true;
        self
    }

    #[must_use]
    pub fn with_round_digits(mut self, digits: u32) -> Self {
        self.round_digits = Some(digits);
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn abbreviated(mut self) -> Self {
        self.abbreviate = true;
        self
    }

    fn format_number(&self, value: f64) -> FormattedValue {
        let places = self.round_digits.unwrap_or(DEFAULT_ROUND_DIGITS);
        let value =
            if self.abbreviate { format_abbreviated(value, places) } else { format_truncated(value, places) };
        FormattedValue { value, unit: self.unit.clone(), alignment: Alignment::Right }
    }
}

/// Descriptor of a categorical fact.
///
/// The stored domain value is the label; the label's position in
/// `category_labels` is its image code. An empty label list means the store
/// holds raw labels that are not known up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalFact {
    pub id: String,
    #[serde(default)]
    pub temporality: Temporality,
    #[serde(default)]
    pub category_labels: Vec<String>,
    #[serde(default)]
    pub column_width: Option<u32>,
    #[serde(default)]
    pub usage: FactUsage,
}

impl CategoricalFact {
    pub fn new<I, S>(id: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            temporality: Temporality::Constant,
            category_labels: labels.into_iter().map(Into::into).collect(),
            column_width: None,
            usage: FactUsage::default(),
        }
    }

    /// Position of `label` in the category list
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.category_labels.iter().position(|l| l == label)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.category_labels.get(index).map(String::as_str)
    }
}

/// A fact of any kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Fact {
    Numeric(NumericFact),
    Categorical(CategoricalFact),
}

/// Implemented by the concrete descriptors that can be recovered from a [`Fact`]
pub trait ConcreteFact {
    /// Borrow the concrete descriptor if `fact` is of this kind
    fn recover(fact: &Fact) -> Option<&Self>;
}

impl ConcreteFact for NumericFact {
    fn recover(fact: &Fact) -> Option<&Self> {
        match fact {
            Fact::Numeric(numeric) => Some(numeric),
            Fact::Categorical(_) => None,
        }
    }
}

impl ConcreteFact for CategoricalFact {
    fn recover(fact: &Fact) -> Option<&Self> {
        match fact {
            Fact::Categorical(categorical) => Some(categorical),
            Fact::Numeric(_) => None,
        }
    }
}

impl Fact {
    pub fn id(&self) -> &str {
        match self {
            Fact::Numeric(f) => &f.id,
            Fact::Categorical(f) => &f.id,
        }
    }

    pub fn kind(&self) -> FactKind {
        match self {
            Fact::Numeric(f) => FactKind::new(f.temporality, FactAtom::Numeric),
            Fact::Categorical(f) => FactKind::new(f.temporality, FactAtom::Categorical),
        }
    }

    pub fn usage(&self) -> FactUsage {
        match self {
            Fact::Numeric(f) => f.usage,
            Fact::Categorical(f) => f.usage,
        }
    }

    pub fn column_width(&self) -> Option<u32> {
        match self {
            Fact::Numeric(f) => f.column_width,
            Fact::Categorical(f) => f.column_width,
        }
    }

    /// Storage column backing this fact
    pub fn column_name(&self) -> String {
        column_for(self.id())
    }

    /// Recover the concrete descriptor, `None` if the kind does not match
    pub fn recover<T: ConcreteFact>(&self) -> Option<&T> {
        T::recover(self)
    }

    pub fn as_numeric(&self) -> Option<&NumericFact> {
        self.recover()
    }

    pub fn as_categorical(&self) -> Option<&CategoricalFact> {
        self.recover()
    }

    /// Format a value of this fact for display.
    ///
    /// Returns `None` when the value's tag does not match the fact's kind.
    pub fn format(&self, value: &DomainValue) -> Option<FormattedValue> {
        match (self, value) {
            (Fact::Numeric(fact), DomainValue::Numeric(n)) => Some(fact.format_number(*n)),
            (Fact::Categorical(_), DomainValue::Categorical(label)) => Some(FormattedValue {
                value: label.clone(),
                unit: None,
                alignment: Alignment::Left,
            }),
            _ => None,
        }
    }
}

impl From<NumericFact> for Fact {
    fn from(fact: NumericFact) -> Self {
        Fact::Numeric(fact)
    }
}

impl From<CategoricalFact> for Fact {
    fn from(fact: CategoricalFact) -> Self {
        Fact::Categorical(fact)
    }
}

// Facts are identified by id alone.

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialEq for NumericFact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NumericFact {}

impl Hash for NumericFact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialEq for CategoricalFact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CategoricalFact {}

impl Hash for CategoricalFact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Immutable, ordered set of facts with globally unique ids.
///
/// Built once at startup and shared by reference with every consumer.
#[derive(Debug, Clone)]
pub struct FactRegistry {
    facts: Vec<Fact>,
}

impl FactRegistry {
    /// Build a registry, rejecting duplicate ids
    pub fn new(facts: Vec<Fact>) -> AtlasResult<Self> {
        let mut seen = HashSet::with_capacity(facts.len());
        for fact in &facts {
            if !seen.insert(fact.id()) {
                return Err(AtlasError::configuration(
                    "facts",
                    format!("Fact id '{}' is registered more than once", fact.id()),
                ));
            }
        }

        info!(fact_count = facts.len(), "Fact registry constructed");
        Ok(Self { facts })
    }

    /// The facts shipped with the application
    pub fn builtin() -> Self {
        Self {
            facts: vec![
                NumericFact::new("Population").by_rank().with_round_digits(0).into(),
                NumericFact::new("Area").with_round_digits(0).with_unit("km²").into(),
            ],
        }
    }

    pub fn all(&self) -> &[Fact] {
        &self.facts
    }

    pub fn get(&self, id: &str) -> Option<&Fact> {
        self.facts.iter().find(|f| f.id() == id)
    }

    /// Look up a fact, treating an unknown id as a shape error
    pub fn require(&self, id: &str) -> AtlasResult<&Fact> {
        self.get(id).ok_or_else(|| AtlasError::shape_for_fact(id, format!("Unknown fact '{id}'")))
    }

    pub fn filter_facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter().filter(|f| f.usage().filter)
    }

    pub fn map_facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter().filter(|f| f.usage().map)
    }

    pub fn table_facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter().filter(|f| f.usage().table)
    }

    /// Facts selected when hydrating a country: table and map facts,
    /// deduplicated and sorted by id for a stable column order
    pub fn hydration_facts(&self) -> Vec<&Fact> {
        let mut facts: Vec<&Fact> = self.facts.iter().filter(|f| f.usage().table || f.usage().map).collect();
        facts.sort_by(|a, b| a.id().cmp(b.id()));
        facts.dedup_by(|a, b| a.id() == b.id());
        facts
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl Default for FactRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_fact() -> Fact {
        CategoricalFact::new("Type", ["Sovereign", "Country", "Dependency", "Other"]).into()
    }

    #[test]
    fn test_equality_and_hash_by_id_only() {
        let a: Fact = NumericFact::new("Area").with_round_digits(0).into();
        let b: Fact = NumericFact::new("Area").by_rank().with_unit("km²").into();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_recover_matching_and_mismatching_kind() {
        let numeric: Fact = NumericFact::new("Population").by_rank().into();
        assert!(numeric.recover::<NumericFact>().is_some_and(|f| f.distribute_by_rank));
        assert!(numeric.recover::<CategoricalFact>().is_none());

        let categorical = kind_fact();
        assert_eq!(categorical.as_categorical().map(|f| f.category_labels.len()), Some(4));
        assert!(categorical.as_numeric().is_none());
    }

    #[test]
    fn test_column_name_convention() {
        assert_eq!(Fact::from(NumericFact::new("Population")).column_name(), "country_population");
        assert_eq!(Fact::from(NumericFact::new("GDPPerCapita")).column_name(), "country_gdppercapita");
    }

    #[test]
    fn test_numeric_format_truncates_with_default_digits() {
        let fact: Fact = NumericFact::new("Density").with_unit("/km²").into();
        let formatted = fact.format(&DomainValue::Numeric(3.14159)).unwrap();
        assert_eq!(formatted.value, "3.14");
        assert_eq!(formatted.unit.as_deref(), Some("/km²"));
        assert_eq!(formatted.alignment, Alignment::Right);
    }

    #[test]
    fn test_numeric_format_without_fraction() {
        let fact: Fact = NumericFact::new("Population").with_round_digits(0).into();
        assert_eq!(fact.format(&DomainValue::Numeric(83_166_711.9)).unwrap().value, "83166711");
    }

    #[test]
    fn test_abbreviated_format() {
        let fact: Fact = NumericFact::new("Population").with_round_digits(1).abbreviated().into();
        assert_eq!(fact.format(&DomainValue::Numeric(83_166_711.0)).unwrap().value, "83.1M");
    }

    #[test]
    fn test_format_rejects_mismatched_tag() {
        let numeric: Fact = NumericFact::new("Area").into();
        assert!(numeric.format(&DomainValue::Categorical("x".into())).is_none());
        assert!(kind_fact().format(&DomainValue::Numeric(1.0)).is_none());

        let label = kind_fact().format(&DomainValue::Categorical("Other".into())).unwrap();
        assert_eq!(label.value, "Other");
        assert_eq!(label.alignment, Alignment::Left);
    }

    #[test]
    fn test_registry_rejects_duplicate_ids() {
        let result = FactRegistry::new(vec![
            NumericFact::new("Area").into(),
            NumericFact::new("Area").by_rank().into(),
        ]);
        assert!(matches!(result, Err(AtlasError::Configuration { .. })));
    }

    #[test]
    fn test_hydration_facts_union_sorted() {
        let mut hidden = NumericFact::new("Hidden");
        hidden.usage = FactUsage { filter: true, map: false, table: false };
        let mut table_only = NumericFact::new("Area");
        table_only.usage = FactUsage { filter: false, map: false, table: true };

        let registry = FactRegistry::new(vec![
            NumericFact::new("Population").into(),
            hidden.into(),
            table_only.into(),
            kind_fact(),
        ])
        .unwrap();

        let ids: Vec<&str> = registry.hydration_facts().iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["Area", "Population", "Type"]);
        assert_eq!(registry.filter_facts().count(), 3);
        assert_eq!(registry.map_facts().count(), 2);
    }

    #[test]
    fn test_registry_from_serialized_facts() {
        let facts: Vec<Fact> = serde_json::from_value(serde_json::json!([
            { "kind": "Numeric", "id": "Population", "distribute_by_rank": true, "round_digits": 0 },
            { "kind": "Categorical", "id": "Type", "category_labels": ["Sovereign", "Other"] }
        ]))
        .unwrap();

        let registry = FactRegistry::new(facts).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("Population").and_then(Fact::as_numeric).is_some_and(|f| f.distribute_by_rank));
        assert_eq!(registry.get("Type").map(Fact::kind), Some(FactKind::Constant(FactAtom::Categorical)));
        assert!(registry.require("Missing").is_err());
    }
}
